//! Typed access to host state that the host does not publish.
//!
//! Everything that reaches into private host layout goes through
//! [`HostInternals`]. Statics are resolved once by [`InternalsBinding::bind`]
//! when the module loads; a missing field is fatal there rather than a
//! silently wrong number later.
use thiserror::Error;

use crate::curve::{CurveError, ResponseCurve};
use crate::host::WoundId;

/// Owner type name reported in layout diagnostics.
pub const INFECTER_OWNER: &str = "HediffComp_Infecter";

/// Errors raised when the host's private layout does not match expectations.
#[derive(Debug, Error, PartialEq)]
pub enum LayoutError {
    #[error("host layout changed: {owner}.{field} is missing")]
    MissingField {
        owner: &'static str,
        field: &'static str,
    },
    #[error("host layout changed: {owner}.{field} holds an unusable curve: {source}")]
    BadCurve {
        owner: &'static str,
        field: &'static str,
        #[source]
        source: CurveError,
    },
}

/// Narrow accessor for non-public host fields.
pub trait HostInternals {
    /// Sentinel stored in `ticks_until_infect` once the roll has been made.
    fn already_made_infection_value(&self) -> Option<i32>;

    /// Raw points of the tend-quality to infection-factor curve.
    fn tend_quality_curve(&self) -> Option<Vec<(f32, f32)>>;

    /// Raw points of the severity to infection-factor curve.
    fn severity_curve(&self) -> Option<Vec<(f32, f32)>>;

    fn ticks_until_infect(&self, wound: WoundId) -> Option<i32>;

    /// Room factor the host captured when the wound was last tended.
    fn tend_room_factor(&self, wound: WoundId) -> Option<f32>;

    /// Overwrite the captured room factor. Returns `false` if the wound has
    /// no infecter state to write into.
    fn set_tend_room_factor(&mut self, wound: WoundId, factor: f32) -> bool;
}

/// Statics resolved from [`HostInternals`] at load time.
#[derive(Debug, Clone, PartialEq)]
pub struct InternalsBinding {
    already_made_infection: i32,
    tend_quality_curve: ResponseCurve,
    severity_curve: ResponseCurve,
}

impl InternalsBinding {
    /// Resolve every static field the trackers depend on.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError`] if any field is absent or unusable.
    pub fn bind<I>(internals: &I) -> Result<Self, LayoutError>
    where
        I: HostInternals + ?Sized,
    {
        let result = Self::resolve(internals);
        if let Err(err) = &result {
            log::error!("woundwatch cannot bind host internals: {err}");
        }
        result
    }

    fn resolve<I>(internals: &I) -> Result<Self, LayoutError>
    where
        I: HostInternals + ?Sized,
    {
        let already_made_infection =
            internals
                .already_made_infection_value()
                .ok_or(LayoutError::MissingField {
                    owner: INFECTER_OWNER,
                    field: "AlreadyMadeInfectionValue",
                })?;
        let tend_quality_curve = Self::curve(
            internals.tend_quality_curve(),
            "InfectionChanceFactorFromTendQualityCurve",
        )?;
        let severity_curve = Self::curve(
            internals.severity_curve(),
            "InfectionChanceFactorFromSeverityCurve",
        )?;
        Ok(Self {
            already_made_infection,
            tend_quality_curve,
            severity_curve,
        })
    }

    fn curve(
        points: Option<Vec<(f32, f32)>>,
        field: &'static str,
    ) -> Result<ResponseCurve, LayoutError> {
        let points = points.ok_or(LayoutError::MissingField {
            owner: INFECTER_OWNER,
            field,
        })?;
        ResponseCurve::from_pairs(&points).map_err(|source| LayoutError::BadCurve {
            owner: INFECTER_OWNER,
            field,
            source,
        })
    }

    #[must_use]
    pub const fn already_made_infection(&self) -> i32 {
        self.already_made_infection
    }

    #[must_use]
    pub const fn tend_quality_curve(&self) -> &ResponseCurve {
        &self.tend_quality_curve
    }

    #[must_use]
    pub const fn severity_curve(&self) -> &ResponseCurve {
        &self.severity_curve
    }

    /// Whether the host has already resolved the infection roll for `wound`.
    ///
    /// An unreadable counter counts as resolved so the record is dropped.
    #[must_use]
    pub fn infection_resolved<I>(&self, internals: &I, wound: WoundId) -> bool
    where
        I: HostInternals + ?Sized,
    {
        internals
            .ticks_until_infect(wound)
            .is_none_or(|ticks| ticks == self.already_made_infection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Layout {
        sentinel: Option<i32>,
        tend: Option<Vec<(f32, f32)>>,
        severity: Option<Vec<(f32, f32)>>,
        ticks: HashMap<WoundId, i32>,
    }

    impl HostInternals for Layout {
        fn already_made_infection_value(&self) -> Option<i32> {
            self.sentinel
        }

        fn tend_quality_curve(&self) -> Option<Vec<(f32, f32)>> {
            self.tend.clone()
        }

        fn severity_curve(&self) -> Option<Vec<(f32, f32)>> {
            self.severity.clone()
        }

        fn ticks_until_infect(&self, wound: WoundId) -> Option<i32> {
            self.ticks.get(&wound).copied()
        }

        fn tend_room_factor(&self, _wound: WoundId) -> Option<f32> {
            None
        }

        fn set_tend_room_factor(&mut self, _wound: WoundId, _factor: f32) -> bool {
            false
        }
    }

    fn complete() -> Layout {
        Layout {
            sentinel: Some(-4_444),
            tend: Some(vec![(0.0, 0.85), (1.0, 0.05)]),
            severity: Some(vec![(1.0, 0.1), (12.0, 1.0)]),
            ticks: HashMap::new(),
        }
    }

    #[test]
    fn binds_complete_layout() {
        let binding = InternalsBinding::bind(&complete()).unwrap();
        assert_eq!(binding.already_made_infection(), -4_444);
        assert!((binding.severity_curve().evaluate(12.0) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn missing_sentinel_fails_fast() {
        let layout = Layout {
            sentinel: None,
            ..complete()
        };
        assert_eq!(
            InternalsBinding::bind(&layout),
            Err(LayoutError::MissingField {
                owner: INFECTER_OWNER,
                field: "AlreadyMadeInfectionValue"
            })
        );
    }

    #[test]
    fn unusable_curve_fails_fast() {
        let layout = Layout {
            tend: Some(Vec::new()),
            ..complete()
        };
        let err = InternalsBinding::bind(&layout).unwrap_err();
        assert!(matches!(
            err,
            LayoutError::BadCurve {
                field: "InfectionChanceFactorFromTendQualityCurve",
                source: CurveError::Empty,
                ..
            }
        ));
        assert!(err.to_string().contains("host layout changed"));
    }

    #[test]
    fn resolved_roll_detected_by_sentinel() {
        let mut layout = complete();
        layout.ticks.insert(WoundId(1), 300);
        layout.ticks.insert(WoundId(2), -4_444);
        let binding = InternalsBinding::bind(&layout).unwrap();
        assert!(!binding.infection_resolved(&layout, WoundId(1)));
        assert!(binding.infection_resolved(&layout, WoundId(2)));
        assert!(binding.infection_resolved(&layout, WoundId(3)));
    }
}

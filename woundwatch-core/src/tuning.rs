//! Host tuning constants consumed by the trackers.
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;

const DEFAULT_TUNING_DATA: &str = include_str!("../assets/tuning.json");

/// Age window (in ticks) during which an infection roll may happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfectionDelay {
    pub min_ticks: i32,
    pub max_ticks: i32,
}

impl InfectionDelay {
    #[must_use]
    pub const fn new(min_ticks: i32, max_ticks: i32) -> Self {
        Self {
            min_ticks,
            max_ticks,
        }
    }

    /// Past the window; the host will never roll for this wound again.
    #[must_use]
    pub const fn is_safe(self, age_ticks: i32) -> bool {
        age_ticks > self.max_ticks
    }
}

impl Default for InfectionDelay {
    fn default() -> Self {
        Self::new(15_000, 45_000)
    }
}

/// Errors raised when tuning values violate their bounds.
#[derive(Debug, Error, PartialEq)]
pub enum TuningError {
    #[error("infection delay minimum {min} exceeds maximum {max}")]
    DelayRange { min: i32, max: i32 },
    #[error("{field} must be positive")]
    NonPositive { field: &'static str },
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    RangeViolation {
        field: &'static str,
        min: f32,
        max: f32,
        value: f32,
    },
    #[error("tuning data could not be parsed: {0}")]
    Parse(String),
}

/// Tuning data mirrored from the host's health constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthTuning {
    #[serde(default)]
    pub infection_delay: InfectionDelay,
    #[serde(default = "HealthTuning::default_animal_factor")]
    pub animal_infection_factor: f32,
    #[serde(default = "HealthTuning::default_roomless_factor")]
    pub roomless_infection_factor: f32,
    #[serde(default = "HealthTuning::default_ticks_per_hour")]
    pub ticks_per_hour: u32,
    #[serde(default = "HealthTuning::default_ticks_per_day")]
    pub ticks_per_day: u32,
    #[serde(default = "HealthTuning::default_sweep_interval")]
    pub sweep_interval_ticks: u32,
    #[serde(default = "HealthTuning::default_low_chance")]
    pub low_chance_threshold: f32,
    #[serde(default = "HealthTuning::default_immunity_threshold")]
    pub immunity_symbol_threshold: f32,
}

impl HealthTuning {
    const fn default_animal_factor() -> f32 {
        0.1
    }

    const fn default_roomless_factor() -> f32 {
        1.0
    }

    const fn default_ticks_per_hour() -> u32 {
        2_500
    }

    const fn default_ticks_per_day() -> u32 {
        60_000
    }

    const fn default_sweep_interval() -> u32 {
        60
    }

    const fn default_low_chance() -> f32 {
        0.1
    }

    const fn default_immunity_threshold() -> f32 {
        0.99
    }

    /// Parse tuning from JSON and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`TuningError::Parse`] for malformed JSON and any validation
    /// error reported by [`HealthTuning::validate`].
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Self =
            serde_json::from_str(json).map_err(|err| TuningError::Parse(err.to_string()))?;
        tuning.validate()?;
        Ok(tuning)
    }

    #[must_use]
    pub fn load_from_static() -> Self {
        Self::from_json(DEFAULT_TUNING_DATA).unwrap_or_default()
    }

    /// Shared copy of the bundled tuning data.
    #[must_use]
    pub fn default_tuning() -> &'static Self {
        static TUNING: OnceLock<HealthTuning> = OnceLock::new();
        TUNING.get_or_init(Self::load_from_static)
    }

    /// # Errors
    ///
    /// Returns `TuningError` when any field violates the documented bounds.
    pub fn validate(&self) -> Result<(), TuningError> {
        let delay = self.infection_delay;
        if delay.min_ticks > delay.max_ticks {
            return Err(TuningError::DelayRange {
                min: delay.min_ticks,
                max: delay.max_ticks,
            });
        }
        if self.ticks_per_hour == 0 {
            return Err(TuningError::NonPositive {
                field: "ticks_per_hour",
            });
        }
        if self.ticks_per_day == 0 {
            return Err(TuningError::NonPositive {
                field: "ticks_per_day",
            });
        }
        if self.sweep_interval_ticks == 0 {
            return Err(TuningError::NonPositive {
                field: "sweep_interval_ticks",
            });
        }
        Self::validate_unit("animal_infection_factor", self.animal_infection_factor)?;
        Self::validate_unit("low_chance_threshold", self.low_chance_threshold)?;
        Self::validate_non_negative("roomless_infection_factor", self.roomless_infection_factor)?;
        Self::validate_non_negative("immunity_symbol_threshold", self.immunity_symbol_threshold)?;
        Ok(())
    }

    fn validate_non_negative(field: &'static str, value: f32) -> Result<(), TuningError> {
        if value.is_finite() && value >= 0.0 {
            Ok(())
        } else {
            Err(TuningError::RangeViolation {
                field,
                min: 0.0,
                max: f32::MAX,
                value,
            })
        }
    }

    fn validate_unit(field: &'static str, value: f32) -> Result<(), TuningError> {
        if (0.0..=1.0).contains(&value) {
            Ok(())
        } else {
            Err(TuningError::RangeViolation {
                field,
                min: 0.0,
                max: 1.0,
                value,
            })
        }
    }
}

impl Default for HealthTuning {
    fn default() -> Self {
        Self {
            infection_delay: InfectionDelay::default(),
            animal_infection_factor: Self::default_animal_factor(),
            roomless_infection_factor: Self::default_roomless_factor(),
            ticks_per_hour: Self::default_ticks_per_hour(),
            ticks_per_day: Self::default_ticks_per_day(),
            sweep_interval_ticks: Self::default_sweep_interval(),
            low_chance_threshold: Self::default_low_chance(),
            immunity_symbol_threshold: Self::default_immunity_threshold(),
        }
    }
}

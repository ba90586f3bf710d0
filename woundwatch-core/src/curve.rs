//! Piecewise-linear response curves mapping a scalar input to a factor.
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single `(x, y)` point on a response curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub x: f32,
    pub y: f32,
}

impl CurvePoint {
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Errors raised when a curve cannot be evaluated safely.
#[derive(Debug, Error, PartialEq)]
pub enum CurveError {
    #[error("curve has no points")]
    Empty,
    #[error("curve point {index} is not finite ({x}, {y})")]
    NonFinite { index: usize, x: f32, y: f32 },
    #[error("curve x values must strictly increase (point {index}: {prev} then {next})")]
    Unordered { index: usize, prev: f32, next: f32 },
}

/// Lookup table evaluated by linear interpolation between neighbouring
/// points and clamped flat beyond both ends.
///
/// Serialized as a list of `[x, y]` pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<(f32, f32)>", into = "Vec<(f32, f32)>")]
pub struct ResponseCurve {
    points: Vec<CurvePoint>,
}

impl ResponseCurve {
    /// Build a curve from points ordered by `x`.
    ///
    /// # Errors
    ///
    /// Returns a [`CurveError`] when the list is empty, contains non-finite
    /// values, or is not strictly increasing in `x`.
    pub fn new(points: Vec<CurvePoint>) -> Result<Self, CurveError> {
        if points.is_empty() {
            return Err(CurveError::Empty);
        }
        for (index, point) in points.iter().enumerate() {
            if !point.x.is_finite() || !point.y.is_finite() {
                return Err(CurveError::NonFinite {
                    index,
                    x: point.x,
                    y: point.y,
                });
            }
        }
        for (index, pair) in points.windows(2).enumerate() {
            if pair[1].x <= pair[0].x {
                return Err(CurveError::Unordered {
                    index: index + 1,
                    prev: pair[0].x,
                    next: pair[1].x,
                });
            }
        }
        Ok(Self { points })
    }

    /// Convenience constructor from `(x, y)` tuples.
    ///
    /// # Errors
    ///
    /// See [`ResponseCurve::new`].
    pub fn from_pairs(pairs: &[(f32, f32)]) -> Result<Self, CurveError> {
        Self::new(pairs.iter().map(|&(x, y)| CurvePoint::new(x, y)).collect())
    }

    /// A curve that returns `value` for every input.
    #[must_use]
    pub fn constant(value: f32) -> Self {
        Self {
            points: vec![CurvePoint::new(0.0, value)],
        }
    }

    #[must_use]
    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    /// Evaluate the curve at `x`.
    #[must_use]
    pub fn evaluate(&self, x: f32) -> f32 {
        let Some(first) = self.points.first() else {
            return 0.0;
        };
        if x <= first.x {
            return first.y;
        }
        for pair in self.points.windows(2) {
            let (lo, hi) = (pair[0], pair[1]);
            if x <= hi.x {
                let t = (x - lo.x) / (hi.x - lo.x);
                return lo.y * (1.0 - t) + hi.y * t;
            }
        }
        self.points.last().map_or(first.y, |last| last.y)
    }
}

impl TryFrom<Vec<(f32, f32)>> for ResponseCurve {
    type Error = CurveError;

    fn try_from(value: Vec<(f32, f32)>) -> Result<Self, Self::Error> {
        Self::from_pairs(&value)
    }
}

impl From<ResponseCurve> for Vec<(f32, f32)> {
    fn from(curve: ResponseCurve) -> Self {
        curve.points.into_iter().map(|p| (p.x, p.y)).collect()
    }
}

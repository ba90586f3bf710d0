//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Clamp a f64 to the f32 range and downcast, returning 0.0 for non-finite values.
#[must_use]
pub fn clamp_f64_to_f32(value: f64) -> f32 {
    if !value.is_finite() {
        return 0.0;
    }
    let min = cast::<f32, f64>(f32::MIN).unwrap_or(f64::MIN);
    let max = cast::<f32, f64>(f32::MAX).unwrap_or(f64::MAX);
    let clamped = value.clamp(min, max);
    cast::<f64, f32>(clamped).unwrap_or(0.0)
}

/// Convert a tick count into in-game hours.
///
/// Returns 0.0 when `ticks_per_hour` is not positive.
#[must_use]
pub fn ticks_to_hours(ticks: i32, ticks_per_hour: u32) -> f32 {
    ticks_to_unit(ticks, ticks_per_hour)
}

/// Convert a tick count into in-game days.
#[must_use]
pub fn ticks_to_days(ticks: i32, ticks_per_day: u32) -> f32 {
    ticks_to_unit(ticks, ticks_per_day)
}

fn ticks_to_unit(ticks: i32, unit: u32) -> f32 {
    if unit == 0 {
        return 0.0;
    }
    clamp_f64_to_f32(f64::from(ticks) / f64::from(unit))
}

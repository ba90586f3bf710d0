//! Read-only formatting for health panel lines and wound labels.
//!
//! Nothing here mutates a tracker or triggers a recomputation; label
//! decoration runs every frame and only reads cached glyphs.
use serde::Serialize;
use std::fmt;

use crate::immunity::ImmunityRecord;
use crate::infection::{InfectionPhase, InfectionRecord};
use crate::numbers::ticks_to_hours;
use crate::settings::Settings;
use crate::tuning::HealthTuning;

pub const INFECTION_GLYPH: &str = "\u{2623}\u{fe0f}";
pub const IMMUNITY_GLYPH: &str = "\u{26a0}\u{fe0f}";

/// Colour applied to a glyph when rendered as rich text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GlyphTone {
    Neutral,
    /// Low but non-zero risk.
    Caution,
    Danger,
}

impl GlyphTone {
    #[must_use]
    pub const fn hex(self) -> Option<&'static str> {
        match self {
            Self::Neutral => None,
            Self::Caution => Some("#ffeb04"),
            Self::Danger => Some("#ff0000"),
        }
    }
}

/// Inline status glyph cached on a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Glyph {
    pub text: &'static str,
    pub tone: GlyphTone,
}

impl Glyph {
    #[must_use]
    pub const fn infection(tone: GlyphTone) -> Self {
        Self {
            text: INFECTION_GLYPH,
            tone,
        }
    }

    #[must_use]
    pub const fn immunity() -> Self {
        Self {
            text: IMMUNITY_GLYPH,
            tone: GlyphTone::Danger,
        }
    }

    /// Rich-text form understood by the host label renderer.
    #[must_use]
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Glyph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tone.hex() {
            Some(hex) => write!(f, "<color={hex}>{}</color>", self.text),
            None => f.write_str(self.text),
        }
    }
}

/// One extra line on the wound stats panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatLine {
    pub label: String,
    pub value: String,
    /// Nesting under the preceding top-level line.
    pub depth: u8,
}

impl StatLine {
    fn top(label: &str, value: String) -> Self {
        Self {
            label: label.to_string(),
            value,
            depth: 0,
        }
    }

    fn nested(label: &str, value: String) -> Self {
        Self {
            label: label.to_string(),
            value,
            depth: 1,
        }
    }
}

impl fmt::Display for StatLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for _ in 0..self.depth {
            f.write_str("    ")?;
        }
        write!(f, "{}: {}", self.label, self.value)
    }
}

/// Format a fraction as a whole percentage.
#[must_use]
pub fn percent(value: f32) -> String {
    format!("{:.0}%", value * 100.0)
}

fn factor(value: f32) -> String {
    format!("x{}", percent(value))
}

fn hours(ticks: i32, tuning: &HealthTuning) -> String {
    format!("{:.1} Hour", ticks_to_hours(ticks, tuning.ticks_per_hour))
}

/// Lines describing a tracked infection risk.
#[must_use]
pub fn infection_stat_lines(
    record: &InfectionRecord,
    settings: &Settings,
    tuning: &HealthTuning,
) -> Vec<StatLine> {
    let mut lines = vec![
        StatLine::top("Infection chance", percent(record.total_chance())),
        StatLine::nested("Base value", percent(record.base_chance())),
    ];
    if (record.room_factor() - 1.0).abs() > f32::EPSILON {
        let label = if settings.use_current_room_for_infection {
            "From current room"
        } else {
            "From tend room"
        };
        lines.push(StatLine::nested(label, factor(record.room_factor())));
    }
    if (record.tend_quality_factor() - 1.0).abs() > f32::EPSILON {
        lines.push(StatLine::nested(
            "From tend quality",
            factor(record.tend_quality_factor()),
        ));
    }
    lines.push(StatLine::nested(
        "From severity",
        factor(record.severity_factor()),
    ));
    match record.phase() {
        InfectionPhase::Grace => lines.push(StatLine::nested(
            "Danger in",
            hours(record.ticks_until_danger(), tuning),
        )),
        InfectionPhase::Danger => lines.push(StatLine::nested(
            "Safe in",
            hours(record.ticks_until_safe(), tuning),
        )),
        InfectionPhase::Safe => {}
    }
    lines
}

/// Lines describing a tracked immunity projection.
#[must_use]
pub fn immunity_stat_lines(record: &ImmunityRecord) -> Vec<StatLine> {
    vec![StatLine::top(
        "Severity at immunity",
        percent(record.severity_at_immunity()),
    )]
}

/// Append cached glyphs to a wound label.
#[must_use]
pub fn decorate_label(
    base: &str,
    infection: Option<&InfectionRecord>,
    immunity: Option<&ImmunityRecord>,
) -> String {
    let mut label = base.to_string();
    let glyphs = [
        infection.and_then(InfectionRecord::symbol),
        immunity.and_then(ImmunityRecord::symbol),
    ];
    for glyph in glyphs.into_iter().flatten() {
        label.push(' ');
        label.push_str(&glyph.render());
    }
    label
}

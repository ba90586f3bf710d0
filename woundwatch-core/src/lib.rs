//! Woundwatch core
//!
//! Derived infection-risk and immunity-projection bookkeeping for a host
//! wound simulation. The host owns wounds, ticking, rendering and saves;
//! this crate observes through [`WoundHost`] and [`HostInternals`], keeps two
//! ephemeral caches, and hands back display lines and label glyphs.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`cache`] | Generic per-wound record cache with two-pass sweeps |
//! | [`curve`] | Piecewise-linear response curves |
//! | [`display`] | Stat lines, glyphs and label decoration |
//! | [`host`] | Read-only host model and identity handles |
//! | [`immunity`] | Severity-at-immunity projection tracker |
//! | [`infection`] | Infection-risk tracker and phase machine |
//! | [`internals`] | Typed adapter over non-public host state |
//! | [`memory`] | In-memory host for tests and the harness |
//! | [`numbers`] | Safe numeric casts |
//! | [`settings`] | Persisted user toggles |
//! | [`tuning`] | Host health tuning constants |
//! | [`watch`] | Hook entry points owning both trackers |

pub mod cache;
pub mod curve;
pub mod display;
pub mod host;
pub mod immunity;
pub mod infection;
pub mod internals;
pub mod memory;
pub mod numbers;
pub mod settings;
pub mod tuning;
pub mod watch;

// Re-export commonly used types
pub use cache::{RecordCache, RecordUpdate, SweepReport, SweepVerdict};
pub use curve::{CurveError, CurvePoint, ResponseCurve};
pub use display::{Glyph, GlyphTone, StatLine, decorate_label};
pub use host::{
    AfflictionId, CreatureId, CreatureState, ImmunityState, ImmunizableState, InfecterState,
    RoomId, TendState, WoundHost, WoundId, WoundState,
};
pub use immunity::{ImmunityRecord, ImmunityTracker, project_severity_at_immunity};
pub use infection::{InfectionPhase, InfectionRecord, InfectionTracker, current_room_factor};
pub use internals::{HostInternals, InternalsBinding, LayoutError};
pub use memory::{MemoryHost, WoundSpec};
pub use settings::{MemorySettingsStorage, Settings, SettingsError, SettingsStorage};
pub use tuning::{HealthTuning, InfectionDelay, TuningError};
pub use watch::{InitError, LoadPhase, SweepSummary, WoundWatch};

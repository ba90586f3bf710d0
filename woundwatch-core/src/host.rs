//! Read-only view of the host wound simulation.
//!
//! The host owns every wound, creature and room. This crate only ever sees
//! point-in-time snapshots handed out through [`WoundHost`]; nothing here
//! keeps a reference into host memory.
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! host_id {
    ($name:ident, $prefix:literal) => {
        /// Opaque handle issued by the host. Equality is identity; handles
        /// are never reused within a game session.
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

host_id!(WoundId, "wound");
host_id!(CreatureId, "creature");
host_id!(RoomId, "room");
host_id!(AfflictionId, "affliction");

/// Infection component attached to a wound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InfecterState {
    /// Static infection chance from the wound definition.
    pub infection_chance: f32,
}

/// Tend component attached to a wound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TendState {
    /// Whether a tend effect is currently active.
    pub tended: bool,
    pub quality: f32,
}

/// Immunity component attached to a disease-like wound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImmunizableState {
    pub severity_per_day: f32,
}

/// Snapshot of a single wound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WoundState {
    pub id: WoundId,
    pub creature: CreatureId,
    pub affliction: AfflictionId,
    pub label: String,
    pub age_ticks: i32,
    pub severity: f32,
    pub permanent: bool,
    /// The body part the wound sits on is structurally solid.
    pub part_solid: bool,
    /// The part or one of its ancestors carries a directly added part.
    pub part_has_added_ancestor: bool,
    pub infecter: Option<InfecterState>,
    pub tend: Option<TendState>,
    pub immunizable: Option<ImmunizableState>,
}

impl WoundState {
    /// Whether a tend effect is currently active on the wound.
    #[must_use]
    pub fn is_tended(&self) -> bool {
        self.tend.is_some_and(|tend| tend.tended)
    }
}

/// Snapshot of the creature a wound belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatureState {
    pub id: CreatureId,
    pub name: String,
    pub dead: bool,
    /// Non-sentient animal.
    pub animal: bool,
    pub room: Option<RoomId>,
}

/// Host immunity-tracking record for one creature and affliction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImmunityState {
    /// Current immunity, 0.0 to 1.0.
    pub immunity: f32,
    pub immunity_per_day: f32,
}

impl ImmunityState {
    #[must_use]
    pub fn fully_immune(&self) -> bool {
        self.immunity >= 1.0
    }
}

/// Public, read-only queries the trackers make against the host.
pub trait WoundHost {
    /// Snapshot a wound; `None` once the host no longer knows it.
    fn wound(&self, id: WoundId) -> Option<WoundState>;

    fn creature(&self, id: CreatureId) -> Option<CreatureState>;

    /// Infection-chance stat of a room. `None` when the room counts as roomless.
    fn room_infection_factor(&self, room: RoomId) -> Option<f32>;

    /// Immunity record for a creature and affliction, if the host has made one.
    fn immunity(&self, creature: CreatureId, affliction: AfflictionId) -> Option<ImmunityState>;

    /// Every wound the host currently tracks.
    fn wounds(&self) -> Vec<WoundId>;
}

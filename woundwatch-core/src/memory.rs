//! In-memory host used by tests and the scenario harness.
use std::collections::{BTreeMap, HashMap};

use crate::host::{
    AfflictionId, CreatureId, CreatureState, ImmunityState, ImmunizableState, InfecterState,
    RoomId, TendState, WoundHost, WoundId, WoundState,
};
use crate::internals::HostInternals;
use crate::numbers::ticks_to_days;
use crate::tuning::HealthTuning;

/// Value the host writes into `ticks_until_infect` after rolling.
pub const ALREADY_MADE_INFECTION: i32 = -4_444;

/// `ticks_until_infect` for a wound whose roll is still pending.
pub const PENDING_INFECTION: i32 = i32::MAX;

/// Private statics the host exposes; removable to simulate layout drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostStatic {
    AlreadyMadeInfection,
    TendQualityCurve,
    SeverityCurve,
}

/// Description of a wound to add to a [`MemoryHost`].
#[derive(Debug, Clone, PartialEq)]
pub struct WoundSpec {
    pub creature: CreatureId,
    pub affliction: AfflictionId,
    pub label: String,
    pub age_ticks: i32,
    pub severity: f32,
    pub permanent: bool,
    pub part_solid: bool,
    pub part_has_added_ancestor: bool,
    pub infection_chance: Option<f32>,
    pub severity_per_day: Option<f32>,
    pub tend_room_factor: f32,
}

impl WoundSpec {
    /// An injury that can become infected.
    #[must_use]
    pub fn injury(creature: CreatureId, label: &str, infection_chance: f32) -> Self {
        Self {
            creature,
            affliction: AfflictionId(0),
            label: label.to_string(),
            age_ticks: 0,
            severity: 1.0,
            permanent: false,
            part_solid: false,
            part_has_added_ancestor: false,
            infection_chance: Some(infection_chance),
            severity_per_day: None,
            tend_room_factor: 1.0,
        }
    }

    /// A disease that the creature can become immune to.
    #[must_use]
    pub fn disease(
        creature: CreatureId,
        affliction: AfflictionId,
        label: &str,
        severity_per_day: f32,
    ) -> Self {
        Self {
            affliction,
            severity: 0.2,
            infection_chance: None,
            severity_per_day: Some(severity_per_day),
            ..Self::injury(creature, label, 0.0)
        }
    }

    #[must_use]
    pub const fn aged(mut self, ticks: i32) -> Self {
        self.age_ticks = ticks;
        self
    }

    #[must_use]
    pub const fn with_severity(mut self, severity: f32) -> Self {
        self.severity = severity;
        self
    }

    #[must_use]
    pub const fn with_tend_room_factor(mut self, factor: f32) -> Self {
        self.tend_room_factor = factor;
        self
    }

    #[must_use]
    pub const fn permanent(mut self) -> Self {
        self.permanent = true;
        self
    }

    #[must_use]
    pub const fn on_solid_part(mut self) -> Self {
        self.part_solid = true;
        self
    }

    #[must_use]
    pub const fn under_added_part(mut self) -> Self {
        self.part_has_added_ancestor = true;
        self
    }
}

/// A self-contained host simulation holding plain data.
#[derive(Debug, Clone)]
pub struct MemoryHost {
    next_id: u64,
    creatures: BTreeMap<CreatureId, CreatureState>,
    rooms: HashMap<RoomId, Option<f32>>,
    wounds: BTreeMap<WoundId, WoundState>,
    immunity: HashMap<(CreatureId, AfflictionId), ImmunityState>,
    ticks_until_infect: HashMap<WoundId, i32>,
    tend_room_factor: HashMap<WoundId, f32>,
    already_made_infection: Option<i32>,
    tend_quality_curve: Option<Vec<(f32, f32)>>,
    severity_curve: Option<Vec<(f32, f32)>>,
    ticks_per_day: u32,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self {
            next_id: 1,
            creatures: BTreeMap::new(),
            rooms: HashMap::new(),
            wounds: BTreeMap::new(),
            immunity: HashMap::new(),
            ticks_until_infect: HashMap::new(),
            tend_room_factor: HashMap::new(),
            already_made_infection: Some(ALREADY_MADE_INFECTION),
            tend_quality_curve: Some(vec![(0.0, 0.85), (1.0, 0.05)]),
            severity_curve: Some(vec![(1.0, 0.1), (12.0, 1.0)]),
            ticks_per_day: HealthTuning::default_tuning().ticks_per_day,
        }
    }
}

impl MemoryHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A host whose day length follows `tuning`.
    #[must_use]
    pub fn with_tuning(tuning: &HealthTuning) -> Self {
        Self {
            ticks_per_day: tuning.ticks_per_day,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn ticks_per_day(&self) -> u32 {
        self.ticks_per_day
    }

    fn issue_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn add_creature(&mut self, name: &str, animal: bool) -> CreatureId {
        let id = CreatureId(self.issue_id());
        self.creatures.insert(
            id,
            CreatureState {
                id,
                name: name.to_string(),
                dead: false,
                animal,
                room: None,
            },
        );
        id
    }

    /// Add a room with the given infection stat; `None` scores as roomless.
    pub fn add_room(&mut self, infection_factor: Option<f32>) -> RoomId {
        let id = RoomId(self.issue_id());
        self.rooms.insert(id, infection_factor);
        id
    }

    pub fn move_creature(&mut self, creature: CreatureId, room: Option<RoomId>) {
        if let Some(state) = self.creatures.get_mut(&creature) {
            state.room = room;
        }
    }

    pub fn kill(&mut self, creature: CreatureId) {
        if let Some(state) = self.creatures.get_mut(&creature) {
            state.dead = true;
        }
    }

    pub fn add_wound(&mut self, spec: WoundSpec) -> WoundId {
        let id = WoundId(self.issue_id());
        if spec.infection_chance.is_some() {
            self.ticks_until_infect.insert(id, PENDING_INFECTION);
            self.tend_room_factor.insert(id, spec.tend_room_factor);
        }
        self.wounds.insert(
            id,
            WoundState {
                id,
                creature: spec.creature,
                affliction: spec.affliction,
                label: spec.label,
                age_ticks: spec.age_ticks,
                severity: spec.severity,
                permanent: spec.permanent,
                part_solid: spec.part_solid,
                part_has_added_ancestor: spec.part_has_added_ancestor,
                infecter: spec.infection_chance.map(|infection_chance| InfecterState {
                    infection_chance,
                }),
                tend: None,
                immunizable: spec
                    .severity_per_day
                    .map(|severity_per_day| ImmunizableState { severity_per_day }),
            },
        );
        id
    }

    pub fn wound_mut(&mut self, id: WoundId) -> Option<&mut WoundState> {
        self.wounds.get_mut(&id)
    }

    pub fn remove_wound(&mut self, id: WoundId) -> Option<WoundState> {
        self.ticks_until_infect.remove(&id);
        self.tend_room_factor.remove(&id);
        self.wounds.remove(&id)
    }

    /// Drop the captured tend-room factor, as a host with a changed layout would.
    pub fn clear_tend_room_factor(&mut self, id: WoundId) {
        self.tend_room_factor.remove(&id);
    }

    /// Tend a wound, capturing the room factor of where the creature stands.
    pub fn tend(&mut self, id: WoundId, quality: f32) {
        let room_factor = self
            .wounds
            .get(&id)
            .and_then(|wound| self.creatures.get(&wound.creature))
            .and_then(|creature| creature.room)
            .and_then(|room| self.rooms.get(&room).copied().flatten());
        if let Some(wound) = self.wounds.get_mut(&id) {
            wound.tend = Some(TendState {
                tended: true,
                quality,
            });
            if wound.infecter.is_some() {
                self.tend_room_factor.insert(id, room_factor.unwrap_or(1.0));
            }
        }
    }

    /// Let the active tend effect lapse, keeping its quality.
    pub fn expire_tend(&mut self, id: WoundId) {
        if let Some(tend) = self.wounds.get_mut(&id).and_then(|w| w.tend.as_mut()) {
            tend.tended = false;
        }
    }

    /// Mark the infection roll for `id` as made.
    pub fn resolve_infection(&mut self, id: WoundId) {
        if self.ticks_until_infect.contains_key(&id) {
            self.ticks_until_infect.insert(id, ALREADY_MADE_INFECTION);
        }
    }

    pub fn set_immunity(
        &mut self,
        creature: CreatureId,
        affliction: AfflictionId,
        immunity: f32,
        immunity_per_day: f32,
    ) {
        self.immunity.insert(
            (creature, affliction),
            ImmunityState {
                immunity,
                immunity_per_day,
            },
        );
    }

    pub fn remove_static(&mut self, field: HostStatic) {
        match field {
            HostStatic::AlreadyMadeInfection => self.already_made_infection = None,
            HostStatic::TendQualityCurve => self.tend_quality_curve = None,
            HostStatic::SeverityCurve => self.severity_curve = None,
        }
    }

    /// Age every wound and progress disease severity and immunity.
    pub fn advance(&mut self, ticks: i32) {
        let days = ticks_to_days(ticks, self.ticks_per_day);
        for wound in self.wounds.values_mut() {
            wound.age_ticks = wound.age_ticks.saturating_add(ticks);
            if let Some(immunizable) = wound.immunizable {
                wound.severity = (wound.severity + immunizable.severity_per_day * days).max(0.0);
            }
        }
        for state in self.immunity.values_mut() {
            state.immunity = (state.immunity + state.immunity_per_day * days).clamp(0.0, 1.0);
        }
    }
}

impl WoundHost for MemoryHost {
    fn wound(&self, id: WoundId) -> Option<WoundState> {
        self.wounds.get(&id).cloned()
    }

    fn creature(&self, id: CreatureId) -> Option<CreatureState> {
        self.creatures.get(&id).cloned()
    }

    fn room_infection_factor(&self, room: RoomId) -> Option<f32> {
        self.rooms.get(&room).copied().flatten()
    }

    fn immunity(&self, creature: CreatureId, affliction: AfflictionId) -> Option<ImmunityState> {
        self.immunity.get(&(creature, affliction)).copied()
    }

    fn wounds(&self) -> Vec<WoundId> {
        self.wounds.keys().copied().collect()
    }
}

impl HostInternals for MemoryHost {
    fn already_made_infection_value(&self) -> Option<i32> {
        self.already_made_infection
    }

    fn tend_quality_curve(&self) -> Option<Vec<(f32, f32)>> {
        self.tend_quality_curve.clone()
    }

    fn severity_curve(&self) -> Option<Vec<(f32, f32)>> {
        self.severity_curve.clone()
    }

    fn ticks_until_infect(&self, wound: WoundId) -> Option<i32> {
        self.ticks_until_infect.get(&wound).copied()
    }

    fn tend_room_factor(&self, wound: WoundId) -> Option<f32> {
        self.tend_room_factor.get(&wound).copied()
    }

    fn set_tend_room_factor(&mut self, wound: WoundId, factor: f32) -> bool {
        match self.tend_room_factor.get_mut(&wound) {
            Some(slot) => {
                *slot = factor;
                true
            }
            None => false,
        }
    }
}

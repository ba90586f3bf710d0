//! Infection-risk tracking for wounds that can still become infected.
//!
//! A record is created when a wound registers and passes both candidacy
//! checks. It is refreshed on every sweep and evicted the first sweep after
//! the wound stops being a candidate: its creature died, it aged past the
//! infection window, or the host already rolled for it. None of those
//! transitions is announced by the host, so the sweep is what notices them.
use serde::Serialize;
use std::fmt;

use crate::cache::{RecordCache, RecordUpdate, SweepReport, SweepVerdict};
use crate::display::{Glyph, GlyphTone};
use crate::host::{CreatureId, WoundHost, WoundId, WoundState};
use crate::internals::{HostInternals, InternalsBinding};
use crate::settings::Settings;
use crate::tuning::{HealthTuning, InfectionDelay};

/// Where a wound sits relative to the infection window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InfectionPhase {
    /// Too young to roll yet.
    Grace,
    /// Inside the window; the host may roll at any time.
    Danger,
    /// Past the window.
    Safe,
}

impl InfectionPhase {
    #[must_use]
    pub const fn at(age_ticks: i32, delay: InfectionDelay) -> Self {
        if age_ticks < delay.min_ticks {
            Self::Grace
        } else if age_ticks <= delay.max_ticks {
            Self::Danger
        } else {
            Self::Safe
        }
    }
}

/// Glyph for a phase and total chance. Chances at or above `low_threshold`
/// get the danger tone.
#[must_use]
pub fn infection_symbol(
    phase: InfectionPhase,
    total_chance: f32,
    low_threshold: f32,
) -> Option<Glyph> {
    match phase {
        InfectionPhase::Grace => Some(Glyph::infection(GlyphTone::Neutral)),
        InfectionPhase::Danger if total_chance < low_threshold => {
            Some(Glyph::infection(GlyphTone::Caution))
        }
        InfectionPhase::Danger => Some(Glyph::infection(GlyphTone::Danger)),
        InfectionPhase::Safe => None,
    }
}

/// Derived infection risk for one wound.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfectionRecord {
    wound: WoundId,
    creature: CreatureId,
    label: String,
    base_chance: f32,
    room_factor: f32,
    tend_quality_factor: f32,
    severity_factor: f32,
    age_ticks: i32,
    delay: InfectionDelay,
    symbol: Option<Glyph>,
    stale: bool,
}

impl InfectionRecord {
    fn new(wound: &WoundState, base_chance: f32, delay: InfectionDelay) -> Self {
        Self {
            wound: wound.id,
            creature: wound.creature,
            label: wound.label.clone(),
            base_chance,
            room_factor: 1.0,
            tend_quality_factor: 1.0,
            severity_factor: 1.0,
            age_ticks: wound.age_ticks,
            delay,
            symbol: None,
            stale: false,
        }
    }

    #[must_use]
    pub const fn wound(&self) -> WoundId {
        self.wound
    }

    #[must_use]
    pub const fn creature(&self) -> CreatureId {
        self.creature
    }

    #[must_use]
    pub const fn base_chance(&self) -> f32 {
        self.base_chance
    }

    #[must_use]
    pub const fn room_factor(&self) -> f32 {
        self.room_factor
    }

    #[must_use]
    pub const fn tend_quality_factor(&self) -> f32 {
        self.tend_quality_factor
    }

    #[must_use]
    pub const fn severity_factor(&self) -> f32 {
        self.severity_factor
    }

    /// Wound age observed at the last refresh.
    #[must_use]
    pub const fn age_ticks(&self) -> i32 {
        self.age_ticks
    }

    #[must_use]
    pub const fn is_stale(&self) -> bool {
        self.stale
    }

    #[must_use]
    pub fn total_chance(&self) -> f32 {
        self.base_chance * self.room_factor * self.tend_quality_factor * self.severity_factor
    }

    #[must_use]
    pub const fn phase(&self) -> InfectionPhase {
        InfectionPhase::at(self.age_ticks, self.delay)
    }

    /// Phase for a live age read from the host.
    #[must_use]
    pub const fn phase_at(&self, age_ticks: i32) -> InfectionPhase {
        InfectionPhase::at(age_ticks, self.delay)
    }

    #[must_use]
    pub const fn is_grace(&self) -> bool {
        matches!(self.phase(), InfectionPhase::Grace)
    }

    #[must_use]
    pub const fn is_danger(&self) -> bool {
        matches!(self.phase(), InfectionPhase::Danger)
    }

    #[must_use]
    pub const fn is_safe(&self) -> bool {
        matches!(self.phase(), InfectionPhase::Safe)
    }

    #[must_use]
    pub const fn ticks_until_danger(&self) -> i32 {
        self.delay.min_ticks.saturating_sub(self.age_ticks)
    }

    #[must_use]
    pub const fn ticks_until_safe(&self) -> i32 {
        self.delay.max_ticks.saturating_sub(self.age_ticks)
    }

    /// Glyph cached at the last refresh.
    #[must_use]
    pub const fn symbol(&self) -> Option<Glyph> {
        self.symbol
    }
}

impl fmt::Display for InfectionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = self.symbol.map_or("-", |glyph| glyph.text);
        write!(
            f,
            "InfectionRecord({}:{}:{}:{}:{}:{:.3}:{:.3}:{:.3}:{:.3})",
            self.creature,
            self.label,
            self.wound,
            symbol,
            self.ticks_until_danger(),
            self.total_chance(),
            self.room_factor,
            self.tend_quality_factor,
            self.severity_factor
        )
    }
}

/// Room factor for where the creature stands now, or the roomless score.
#[must_use]
pub fn current_room_factor<H>(host: &H, creature: CreatureId, tuning: &HealthTuning) -> f32
where
    H: WoundHost + ?Sized,
{
    host.creature(creature)
        .and_then(|state| state.room)
        .and_then(|room| host.room_infection_factor(room))
        .unwrap_or(tuning.roomless_infection_factor)
}

/// Mirrors the gating the host applies when a wound is first added.
#[must_use]
pub fn can_infect_upon_register(wound: &WoundState) -> bool {
    !wound.permanent && !wound.part_solid && !wound.part_has_added_ancestor
}

/// Candidacy and refresh rules, kept apart from the cache so a sweep can
/// borrow both at once.
#[derive(Debug, Clone)]
struct InfectionRules {
    binding: InternalsBinding,
    tuning: HealthTuning,
}

impl InfectionRules {
    fn can_infect_frequently<H>(&self, host: &H, wound: &WoundState) -> bool
    where
        H: WoundHost + HostInternals + ?Sized,
    {
        if wound.infecter.is_none() {
            return false;
        }
        let alive = host
            .creature(wound.creature)
            .is_some_and(|creature| !creature.dead);
        if !alive {
            return false;
        }
        if self.tuning.infection_delay.is_safe(wound.age_ticks) {
            return false;
        }
        !self.binding.infection_resolved(host, wound.id)
    }

    fn refresh<H>(
        &self,
        host: &H,
        wound: &WoundState,
        record: &mut InfectionRecord,
        settings: &Settings,
    ) -> RecordUpdate
    where
        H: WoundHost + HostInternals + ?Sized,
    {
        let room_factor = if settings.use_current_room_for_infection {
            Some(current_room_factor(host, wound.creature, &self.tuning))
        } else {
            host.tend_room_factor(wound.id)
        };
        let Some(room_factor) = room_factor else {
            log::warn!("woundwatch: {} has no tend-room factor", wound.id);
            record.stale = true;
            return RecordUpdate::Stale;
        };

        record.age_ticks = wound.age_ticks;
        record.severity_factor = self.binding.severity_curve().evaluate(wound.severity);
        record.room_factor = room_factor;
        if let Some(tend) = wound.tend.filter(|tend| tend.tended) {
            record.tend_quality_factor = self.binding.tend_quality_curve().evaluate(tend.quality);
        }
        record.symbol = infection_symbol(
            record.phase(),
            record.total_chance(),
            self.tuning.low_chance_threshold,
        );
        RecordUpdate::Refreshed
    }
}

/// Owns the infection-risk cache.
#[derive(Debug, Clone)]
pub struct InfectionTracker {
    records: RecordCache<InfectionRecord>,
    rules: InfectionRules,
}

impl InfectionTracker {
    #[must_use]
    pub fn new(binding: InternalsBinding, tuning: HealthTuning) -> Self {
        Self {
            records: RecordCache::new(),
            rules: InfectionRules { binding, tuning },
        }
    }

    #[must_use]
    pub const fn tuning(&self) -> &HealthTuning {
        &self.rules.tuning
    }

    /// Conditions that can flip at any time and are re-checked every sweep.
    #[must_use]
    pub fn can_infect_frequently<H>(&self, host: &H, wound: &WoundState) -> bool
    where
        H: WoundHost + HostInternals + ?Sized,
    {
        self.rules.can_infect_frequently(host, wound)
    }

    /// Start tracking `id` if the host could still infect it.
    ///
    /// A repeat registration replaces the existing record.
    pub fn register<H>(
        &mut self,
        host: &H,
        id: WoundId,
        settings: &Settings,
    ) -> Option<&InfectionRecord>
    where
        H: WoundHost + HostInternals + ?Sized,
    {
        let wound = host.wound(id)?;
        if !self.rules.can_infect_frequently(host, &wound) || !can_infect_upon_register(&wound) {
            return None;
        }
        let infecter = wound.infecter?;
        let animal = host
            .creature(wound.creature)
            .is_some_and(|creature| creature.animal);
        let tuning = &self.rules.tuning;
        let base_chance = if animal {
            infecter.infection_chance * tuning.animal_infection_factor
        } else {
            infecter.infection_chance
        };
        let mut record = InfectionRecord::new(&wound, base_chance, tuning.infection_delay);
        if self.rules.refresh(host, &wound, &mut record, settings) == RecordUpdate::Stale {
            self.records.remove(id);
            return None;
        }
        if self.records.insert(id, record).is_some() {
            log::debug!("woundwatch: re-registered infection record for {id}");
        } else {
            log::debug!("woundwatch: tracking infection risk for {id}");
        }
        self.records.get(id)
    }

    /// Recompute the refreshable factors and the cached glyph.
    pub fn update<H>(
        &self,
        host: &H,
        record: &mut InfectionRecord,
        settings: &Settings,
    ) -> RecordUpdate
    where
        H: WoundHost + HostInternals + ?Sized,
    {
        let Some(wound) = host.wound(record.wound) else {
            log::warn!("woundwatch: {} vanished before update", record.wound);
            record.stale = true;
            return RecordUpdate::Stale;
        };
        self.rules.refresh(host, &wound, record, settings)
    }

    /// Drop records that are no longer candidates and refresh the rest.
    pub fn sweep<H>(&mut self, host: &H, settings: &Settings) -> SweepReport
    where
        H: WoundHost + HostInternals + ?Sized,
    {
        let rules = &self.rules;
        let report = self.records.sweep(|_, record| {
            if record.stale {
                return SweepVerdict::Evict;
            }
            match host.wound(record.wound) {
                Some(wound) if rules.can_infect_frequently(host, &wound) => {
                    match rules.refresh(host, &wound, record, settings) {
                        RecordUpdate::Stale => SweepVerdict::Evict,
                        RecordUpdate::Refreshed | RecordUpdate::Deferred => SweepVerdict::Keep,
                    }
                }
                _ => SweepVerdict::Evict,
            }
        });
        for id in &report.evicted {
            log::debug!("woundwatch: stopped tracking infection risk for {id}");
        }
        report
    }

    /// Forget every record.
    pub fn reset(&mut self) {
        self.records.clear();
        log::info!("woundwatch: infection tracker reset");
    }

    pub fn remove(&mut self, id: WoundId) -> Option<InfectionRecord> {
        self.records.remove(id)
    }

    #[must_use]
    pub fn get(&self, id: WoundId) -> Option<&InfectionRecord> {
        self.records.get(id)
    }

    /// Mutable access for callers that drive [`InfectionTracker::update`] themselves.
    pub fn get_mut(&mut self, id: WoundId) -> Option<&mut InfectionRecord> {
        self.records.get_mut(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in wound-id order.
    #[must_use]
    pub fn records(&self) -> Vec<&InfectionRecord> {
        self.records.iter().into_iter().map(|(_, r)| r).collect()
    }

    /// One line per record, also written to the log.
    #[must_use]
    pub fn dump(&self) -> Vec<String> {
        let lines: Vec<String> = self.records().iter().map(ToString::to_string).collect();
        for line in &lines {
            log::info!("{line}");
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryHost, WoundSpec};

    fn tuning() -> HealthTuning {
        HealthTuning {
            infection_delay: InfectionDelay::new(2_000, 8_000),
            ..HealthTuning::default()
        }
    }

    fn tracker(host: &MemoryHost) -> InfectionTracker {
        InfectionTracker::new(InternalsBinding::bind(host).unwrap(), tuning())
    }

    #[test]
    fn phases_partition_every_age() {
        let delay = InfectionDelay::new(2_000, 8_000);
        for age in [-5, 0, 1_999, 2_000, 5_000, 8_000, 8_001, i32::MAX] {
            let phase = InfectionPhase::at(age, delay);
            let flags = [
                phase == InfectionPhase::Grace,
                phase == InfectionPhase::Danger,
                phase == InfectionPhase::Safe,
            ];
            assert_eq!(flags.iter().filter(|f| **f).count(), 1, "age {age}");
        }
        assert_eq!(InfectionPhase::at(1_999, delay), InfectionPhase::Grace);
        assert_eq!(InfectionPhase::at(2_000, delay), InfectionPhase::Danger);
        assert_eq!(InfectionPhase::at(8_000, delay), InfectionPhase::Danger);
        assert_eq!(InfectionPhase::at(8_001, delay), InfectionPhase::Safe);
    }

    #[test]
    fn chance_at_threshold_uses_danger_tone() {
        let glyph = infection_symbol(InfectionPhase::Danger, 0.1, 0.1).unwrap();
        assert_eq!(glyph.tone, GlyphTone::Danger);
        let glyph = infection_symbol(InfectionPhase::Danger, 0.099, 0.1).unwrap();
        assert_eq!(glyph.tone, GlyphTone::Caution);
        assert_eq!(
            infection_symbol(InfectionPhase::Grace, 0.9, 0.1).unwrap().tone,
            GlyphTone::Neutral
        );
        assert!(infection_symbol(InfectionPhase::Safe, 0.9, 0.1).is_none());
    }

    #[test]
    fn danger_window_boundary_scenario() {
        let mut host = MemoryHost::new();
        let pawn = host.add_creature("Ash", false);
        let wound = host.add_wound(
            WoundSpec::injury(pawn, "cut", 0.2)
                .aged(3_000)
                .with_severity(12.0)
                .with_tend_room_factor(0.5),
        );
        let mut tracker = tracker(&host);
        let record = tracker
            .register(&host, wound, &Settings::default())
            .unwrap();
        assert!(record.is_danger());
        assert!((record.room_factor() - 0.5).abs() < f32::EPSILON);
        assert!((record.tend_quality_factor() - 1.0).abs() < f32::EPSILON);
        assert!((record.severity_factor() - 1.0).abs() < f32::EPSILON);
        assert!((record.total_chance() - 0.1).abs() < 1e-6);
        assert_eq!(record.symbol().unwrap().tone, GlyphTone::Danger);
        assert_eq!(record.ticks_until_safe(), 5_000);
    }

    #[test]
    fn animals_get_reduced_base_chance() {
        let mut host = MemoryHost::new();
        let dog = host.add_creature("Rex", true);
        let wound = host.add_wound(WoundSpec::injury(dog, "bite", 0.3));
        let mut tracker = tracker(&host);
        let record = tracker
            .register(&host, wound, &Settings::default())
            .unwrap();
        assert!((record.base_chance() - 0.03).abs() < 1e-6);
    }

    #[test]
    fn registration_gates_reject_without_entry() {
        let mut host = MemoryHost::new();
        let pawn = host.add_creature("Ash", false);
        let rejected = [
            host.add_wound(WoundSpec::injury(pawn, "scar", 0.2).permanent()),
            host.add_wound(WoundSpec::injury(pawn, "crack", 0.2).on_solid_part()),
            host.add_wound(WoundSpec::injury(pawn, "stump", 0.2).under_added_part()),
            host.add_wound(WoundSpec::injury(pawn, "old", 0.2).aged(8_001)),
        ];
        let rolled = host.add_wound(WoundSpec::injury(pawn, "rolled", 0.2));
        host.resolve_infection(rolled);
        let mut tracker = tracker(&host);
        for id in rejected.into_iter().chain([rolled]) {
            assert!(tracker.register(&host, id, &Settings::default()).is_none());
        }
        assert!(tracker.is_empty());
    }

    #[test]
    fn dead_creature_is_evicted_and_stays_gone() {
        let mut host = MemoryHost::new();
        let pawn = host.add_creature("Ash", false);
        let wound = host.add_wound(WoundSpec::injury(pawn, "cut", 0.2));
        let settings = Settings::default();
        let mut tracker = tracker(&host);
        assert!(tracker.register(&host, wound, &settings).is_some());

        host.kill(pawn);
        let report = tracker.sweep(&host, &settings);
        assert_eq!(report.evicted.as_slice(), &[wound]);
        assert!(tracker.get(wound).is_none());
        tracker.sweep(&host, &settings);
        assert!(tracker.get(wound).is_none());
    }

    #[test]
    fn sweep_refreshes_phase_and_tend_factor() {
        let mut host = MemoryHost::new();
        let pawn = host.add_creature("Ash", false);
        let wound = host.add_wound(WoundSpec::injury(pawn, "cut", 0.2).with_severity(12.0));
        let settings = Settings::default();
        let mut tracker = tracker(&host);
        assert!(tracker.register(&host, wound, &settings).unwrap().is_grace());

        host.tend(wound, 1.0);
        host.advance(2_500);
        tracker.sweep(&host, &settings);
        let record = tracker.get(wound).unwrap();
        assert!(record.is_danger());
        assert!((record.tend_quality_factor() - 0.05).abs() < 1e-6);

        host.expire_tend(wound);
        host.advance(6_000);
        tracker.sweep(&host, &settings);
        assert!(tracker.get(wound).is_none(), "aged past the window");
    }

    #[test]
    fn current_room_mode_reads_live_room() {
        let mut host = MemoryHost::new();
        let pawn = host.add_creature("Ash", false);
        let clinic = host.add_room(Some(0.6));
        let wound = host.add_wound(WoundSpec::injury(pawn, "cut", 0.2));
        let settings = Settings {
            use_current_room_for_infection: true,
            ..Settings::default()
        };
        let mut tracker = tracker(&host);
        let roomless = tracker.register(&host, wound, &settings).unwrap();
        assert!((roomless.room_factor() - tuning().roomless_infection_factor).abs() < 1e-6);

        host.move_creature(pawn, Some(clinic));
        tracker.sweep(&host, &settings);
        assert!((tracker.get(wound).unwrap().room_factor() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn vanished_wound_is_marked_stale_then_evicted() {
        let mut host = MemoryHost::new();
        let pawn = host.add_creature("Ash", false);
        let wound = host.add_wound(WoundSpec::injury(pawn, "cut", 0.2));
        let settings = Settings::default();
        let mut tracker = tracker(&host);
        tracker.register(&host, wound, &settings);
        host.remove_wound(wound);

        let mut record = tracker.get(wound).cloned().unwrap();
        assert_eq!(
            tracker.update(&host, &mut record, &settings),
            RecordUpdate::Stale
        );
        assert!(record.is_stale());
        tracker.sweep(&host, &settings);
        assert!(tracker.is_empty());
    }

    #[test]
    fn missing_tend_room_factor_blocks_registration() {
        let mut host = MemoryHost::new();
        let pawn = host.add_creature("Ash", false);
        let wound = host.add_wound(WoundSpec::injury(pawn, "cut", 0.2));
        host.clear_tend_room_factor(wound);
        let settings = Settings::default();
        let mut tracker = tracker(&host);
        assert!(tracker.register(&host, wound, &settings).is_none());
        assert!(tracker.is_empty());

        let current_room = Settings {
            use_current_room_for_infection: true,
            ..Settings::default()
        };
        assert!(tracker.register(&host, wound, &current_room).is_some());
    }

    #[test]
    fn lost_tend_room_factor_evicts_in_one_sweep() {
        let mut host = MemoryHost::new();
        let pawn = host.add_creature("Ash", false);
        let wound = host.add_wound(WoundSpec::injury(pawn, "cut", 0.2));
        let settings = Settings::default();
        let mut tracker = tracker(&host);
        assert!(tracker.register(&host, wound, &settings).is_some());

        host.clear_tend_room_factor(wound);
        let first = tracker.sweep(&host, &settings);
        assert_eq!(first.evicted.as_slice(), &[wound]);
        assert!(tracker.is_empty());
        let second = tracker.sweep(&host, &settings);
        assert_eq!(second.evicted_count(), 0);
        assert!(tracker.is_empty());
    }

    #[test]
    fn dump_lists_records_in_id_order() {
        let mut host = MemoryHost::new();
        let pawn = host.add_creature("Ash", false);
        let first = host.add_wound(WoundSpec::injury(pawn, "cut", 0.2));
        let second = host.add_wound(WoundSpec::injury(pawn, "bruise", 0.1));
        let settings = Settings::default();
        let mut tracker = tracker(&host);
        tracker.register(&host, second, &settings);
        tracker.register(&host, first, &settings);
        let lines = tracker.dump();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(":cut:"));
        assert!(lines[1].starts_with("InfectionRecord(creature#1:bruise:"));
    }
}

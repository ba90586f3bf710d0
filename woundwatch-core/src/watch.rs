//! Host hook entry points wired to both trackers.
//!
//! [`WoundWatch`] is the single owner of the infection and immunity caches.
//! Every hook takes `&mut self`, so the borrow checker enforces the
//! single-threaded access the caches assume. A host that calls in from more
//! than one thread has to put the whole value behind a lock.
use thiserror::Error;

use crate::cache::SweepReport;
use crate::display::{self, StatLine};
use crate::host::{WoundHost, WoundId};
use crate::immunity::{ImmunityRecord, ImmunityTracker};
use crate::infection::{InfectionRecord, InfectionTracker, current_room_factor};
use crate::internals::{HostInternals, InternalsBinding, LayoutError};
use crate::settings::Settings;
use crate::tuning::{HealthTuning, TuningError};

/// Errors raised while the module starts up.
#[derive(Debug, Error, PartialEq)]
pub enum InitError {
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error("invalid tuning: {0}")]
    Tuning(#[from] TuningError),
}

/// Whether the host is replaying saved state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadPhase {
    #[default]
    Playing,
    /// Between reload start and completion; component-loaded events register.
    PostLoadInit,
}

/// Reports from sweeping both caches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub infection: SweepReport,
    pub immunity: SweepReport,
}

impl SweepSummary {
    #[must_use]
    pub fn evicted(&self) -> usize {
        self.infection.evicted_count() + self.immunity.evicted_count()
    }
}

/// Module state created once at load.
#[derive(Debug, Clone)]
pub struct WoundWatch {
    infection: InfectionTracker,
    immunity: ImmunityTracker,
    settings: Settings,
    phase: LoadPhase,
}

impl WoundWatch {
    /// Validate tuning and bind host internals.
    ///
    /// # Errors
    ///
    /// Fails when the tuning is invalid or the host layout no longer
    /// exposes a field the trackers read.
    pub fn init<I>(
        settings: Settings,
        tuning: HealthTuning,
        internals: &I,
    ) -> Result<Self, InitError>
    where
        I: HostInternals + ?Sized,
    {
        tuning.validate()?;
        let binding = InternalsBinding::bind(internals)?;
        let immunity = ImmunityTracker::new(tuning.immunity_symbol_threshold);
        log::info!(
            "woundwatch: initialised (current room = {})",
            settings.use_current_room_for_infection
        );
        Ok(Self {
            infection: InfectionTracker::new(binding, tuning),
            immunity,
            settings,
            phase: LoadPhase::Playing,
        })
    }

    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    pub const fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    #[must_use]
    pub const fn phase(&self) -> LoadPhase {
        self.phase
    }

    #[must_use]
    pub const fn infection(&self) -> &InfectionTracker {
        &self.infection
    }

    #[must_use]
    pub const fn immunity(&self) -> &ImmunityTracker {
        &self.immunity
    }

    #[must_use]
    pub fn tuning(&self) -> &HealthTuning {
        self.infection.tuning()
    }

    /// An infecter component was attached to a wound.
    pub fn on_wound_component_added<H>(&mut self, host: &H, wound: WoundId) -> bool
    where
        H: WoundHost + HostInternals + ?Sized,
    {
        self.infection
            .register(host, wound, &self.settings)
            .is_some()
    }

    /// An immunizable component was attached to a wound.
    pub fn on_immunity_component_added<H>(&mut self, host: &H, wound: WoundId) -> bool
    where
        H: WoundHost + ?Sized,
    {
        self.immunity.register(host, wound).is_some()
    }

    /// A component finished loading from a save. Ignored outside reloads.
    pub fn on_component_state_loaded<H>(&mut self, host: &H, wound: WoundId) -> bool
    where
        H: WoundHost + HostInternals + ?Sized,
    {
        if self.phase != LoadPhase::PostLoadInit {
            return false;
        }
        let infection = self.on_wound_component_added(host, wound);
        let immunity = self.on_immunity_component_added(host, wound);
        infection || immunity
    }

    /// The host removed a wound; drop it from both caches now.
    pub fn on_wound_removed(&mut self, wound: WoundId) {
        let had_infection = self.infection.remove(wound).is_some();
        let had_immunity = self.immunity.remove(wound).is_some();
        if had_infection || had_immunity {
            log::debug!("woundwatch: dropped records for removed {wound}");
        }
    }

    /// A saved game started loading.
    pub fn on_game_reload_begin(&mut self) {
        self.infection.reset();
        self.immunity.reset();
        self.phase = LoadPhase::PostLoadInit;
    }

    /// Loading finished: re-register every wound the host still has and
    /// return how many records were rebuilt.
    pub fn on_game_reload_complete<H>(&mut self, host: &H) -> usize
    where
        H: WoundHost + HostInternals + ?Sized,
    {
        let rebuilt: usize = host
            .wounds()
            .into_iter()
            .map(|wound| {
                usize::from(self.on_wound_component_added(host, wound))
                    + usize::from(self.on_immunity_component_added(host, wound))
            })
            .sum();
        self.phase = LoadPhase::Playing;
        log::info!("woundwatch: rebuilt {rebuilt} records after reload");
        rebuilt
    }

    /// Runs just before the host rolls for infection. With the current-room
    /// setting on, overwrites the host's tend-room factor and returns the
    /// value written.
    pub fn on_before_infection_roll<H>(&self, host: &mut H, wound: WoundId) -> Option<f32>
    where
        H: WoundHost + HostInternals + ?Sized,
    {
        if !self.settings.use_current_room_for_infection {
            return None;
        }
        let creature = host.wound(wound)?.creature;
        let factor = current_room_factor(&*host, creature, self.infection.tuning());
        host.set_tend_room_factor(wound, factor).then_some(factor)
    }

    /// Sweep both caches now.
    pub fn sweep<H>(&mut self, host: &H) -> SweepSummary
    where
        H: WoundHost + HostInternals + ?Sized,
    {
        SweepSummary {
            infection: self.infection.sweep(host, &self.settings),
            immunity: self.immunity.sweep(host),
        }
    }

    /// The health panel opened; refresh so it draws current values.
    pub fn on_panel_opened<H>(&mut self, host: &H) -> SweepSummary
    where
        H: WoundHost + HostInternals + ?Sized,
    {
        self.sweep(host)
    }

    /// Called every drawn frame with the current game tick. Sweeps on the
    /// tuning cadence while the panel is open, or always when the hidden
    /// sweep setting is on.
    pub fn refresh_tick<H>(
        &mut self,
        host: &H,
        tick: u64,
        panel_open: bool,
    ) -> Option<SweepSummary>
    where
        H: WoundHost + HostInternals + ?Sized,
    {
        if !panel_open && !self.settings.sweep_when_panel_hidden {
            return None;
        }
        let interval = u64::from(self.tuning().sweep_interval_ticks.max(1));
        if tick % interval != 0 {
            return None;
        }
        Some(self.sweep(host))
    }

    #[must_use]
    pub fn infection_record(&self, wound: WoundId) -> Option<&InfectionRecord> {
        self.infection.get(wound)
    }

    #[must_use]
    pub fn immunity_record(&self, wound: WoundId) -> Option<&ImmunityRecord> {
        self.immunity.get(wound)
    }

    /// Extra stat lines for a wound's info panel.
    #[must_use]
    pub fn stat_lines(&self, wound: WoundId) -> Vec<StatLine> {
        let mut lines = Vec::new();
        if let Some(record) = self.infection.get(wound) {
            lines.extend(display::infection_stat_lines(
                record,
                &self.settings,
                self.tuning(),
            ));
        }
        if let Some(record) = self.immunity.get(wound) {
            lines.extend(display::immunity_stat_lines(record));
        }
        lines
    }

    /// Wound label with cached glyphs appended.
    #[must_use]
    pub fn decorate_label(&self, wound: WoundId, base: &str) -> String {
        display::decorate_label(base, self.infection.get(wound), self.immunity.get(wound))
    }

    #[must_use]
    pub fn dump_infection(&self) -> Vec<String> {
        self.infection.dump()
    }

    #[must_use]
    pub fn dump_immunity(&self) -> Vec<String> {
        self.immunity.dump()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::AfflictionId;
    use crate::internals::INFECTER_OWNER;
    use crate::memory::{HostStatic, MemoryHost, WoundSpec};

    fn watch(host: &MemoryHost) -> WoundWatch {
        WoundWatch::init(Settings::default(), HealthTuning::default(), host).unwrap()
    }

    #[test]
    fn init_fails_fast_on_layout_drift() {
        let mut host = MemoryHost::new();
        host.remove_static(HostStatic::SeverityCurve);
        let err = WoundWatch::init(Settings::default(), HealthTuning::default(), &host)
            .unwrap_err();
        assert_eq!(
            err,
            InitError::Layout(LayoutError::MissingField {
                owner: INFECTER_OWNER,
                field: "InfectionChanceFactorFromSeverityCurve"
            })
        );
    }

    #[test]
    fn init_rejects_bad_tuning() {
        let host = MemoryHost::new();
        let tuning = HealthTuning {
            ticks_per_hour: 0,
            ..HealthTuning::default()
        };
        assert!(matches!(
            WoundWatch::init(Settings::default(), tuning, &host),
            Err(InitError::Tuning(_))
        ));
    }

    #[test]
    fn state_loaded_only_registers_during_reload() {
        let mut host = MemoryHost::new();
        let pawn = host.add_creature("Ash", false);
        let wound = host.add_wound(WoundSpec::injury(pawn, "cut", 0.2));
        let mut watch = watch(&host);
        assert!(!watch.on_component_state_loaded(&host, wound));
        assert!(watch.infection_record(wound).is_none());

        watch.on_game_reload_begin();
        assert_eq!(watch.phase(), LoadPhase::PostLoadInit);
        assert!(watch.on_component_state_loaded(&host, wound));
        assert!(watch.infection_record(wound).is_some());
    }

    #[test]
    fn removal_is_eager_for_both_caches() {
        let mut host = MemoryHost::new();
        let pawn = host.add_creature("Ash", false);
        let flu = host.add_wound(WoundSpec::disease(pawn, AfflictionId(3), "flu", 0.1));
        let cut = host.add_wound(WoundSpec::injury(pawn, "cut", 0.2));
        let mut watch = watch(&host);
        assert!(watch.on_immunity_component_added(&host, flu));
        assert!(watch.on_wound_component_added(&host, cut));
        watch.on_wound_removed(flu);
        watch.on_wound_removed(cut);
        assert!(watch.immunity().is_empty());
        assert!(watch.infection().is_empty());
    }

    #[test]
    fn roll_hook_writes_only_when_enabled() {
        let mut host = MemoryHost::new();
        let pawn = host.add_creature("Ash", false);
        let dirty = host.add_room(Some(1.5));
        host.move_creature(pawn, Some(dirty));
        let wound = host.add_wound(WoundSpec::injury(pawn, "cut", 0.2));
        let mut watch = watch(&host);

        assert_eq!(watch.on_before_infection_roll(&mut host, wound), None);
        assert_eq!(host.tend_room_factor(wound), Some(1.0));

        watch.settings_mut().use_current_room_for_infection = true;
        assert_eq!(watch.on_before_infection_roll(&mut host, wound), Some(1.5));
        assert_eq!(host.tend_room_factor(wound), Some(1.5));
    }

    #[test]
    fn refresh_tick_respects_cadence_and_panel() {
        let mut host = MemoryHost::new();
        let pawn = host.add_creature("Ash", false);
        let wound = host.add_wound(WoundSpec::injury(pawn, "cut", 0.2));
        let mut watch = watch(&host);
        watch.on_wound_component_added(&host, wound);
        host.kill(pawn);

        assert!(watch.refresh_tick(&host, 61, true).is_none());
        assert!(watch.refresh_tick(&host, 120, false).is_none());
        assert!(watch.infection_record(wound).is_some(), "hidden panel skips sweep");

        watch.settings_mut().sweep_when_panel_hidden = true;
        let summary = watch.refresh_tick(&host, 120, false).unwrap();
        assert_eq!(summary.evicted(), 1);
        assert!(watch.infection_record(wound).is_none());
    }

    #[test]
    fn label_and_lines_read_cached_records() {
        let mut host = MemoryHost::new();
        let pawn = host.add_creature("Ash", false);
        let wound = host.add_wound(WoundSpec::injury(pawn, "cut", 0.2));
        let mut watch = watch(&host);
        watch.on_wound_component_added(&host, wound);

        let label = watch.decorate_label(wound, "Cut");
        assert!(label.starts_with("Cut "));
        assert!(label.contains(display::INFECTION_GLYPH));

        let lines = watch.stat_lines(wound);
        assert_eq!(lines[0].label, "Infection chance");
        assert!(lines.iter().any(|line| line.label == "Danger in"));
        assert_eq!(watch.decorate_label(WoundId(999), "Bruise"), "Bruise");
    }
}

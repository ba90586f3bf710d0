//! Deterministic behaviour scenarios run against the in-memory host.
use anyhow::{Context, Result, ensure};
use woundwatch_core::{
    AfflictionId, GlyphTone, HealthTuning, HostInternals, InfectionDelay, MemoryHost, Settings,
    WoundSpec, WoundWatch,
};

use crate::soak;

const FLU: AfflictionId = AfflictionId(9_001);

/// Per-run inputs handed to every scenario.
#[derive(Debug, Clone)]
pub struct ScenarioCtx {
    pub seed: u64,
    pub settings: Settings,
    pub verbose: bool,
}

impl ScenarioCtx {
    #[must_use]
    pub const fn new(seed: u64, settings: Settings, verbose: bool) -> Self {
        Self {
            seed,
            settings,
            verbose,
        }
    }

    fn watch(&self, host: &MemoryHost) -> Result<WoundWatch> {
        WoundWatch::init(self.settings, scenario_tuning(), host)
            .context("woundwatch failed to initialise")
    }
}

pub type ScenarioFn = fn(&ScenarioCtx) -> Result<()>;

#[derive(Clone, Copy)]
pub struct Scenario {
    pub key: &'static str,
    pub description: &'static str,
    pub run: ScenarioFn,
}

impl std::fmt::Debug for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario").field("key", &self.key).finish()
    }
}

const CATALOG: &[Scenario] = &[
    Scenario {
        key: "danger-boundary",
        description: "Risk at exactly the low threshold shows the red glyph",
        run: danger_boundary,
    },
    Scenario {
        key: "immunity-projection",
        description: "Severity at immunity is extrapolated linearly",
        run: immunity_projection,
    },
    Scenario {
        key: "death-eviction",
        description: "Records for dead creatures are evicted on the next sweep",
        run: death_eviction,
    },
    Scenario {
        key: "reload-replay",
        description: "Reloading rebuilds the same records as a fresh start",
        run: reload_replay,
    },
    Scenario {
        key: "wound-removal",
        description: "Removed wounds leave both caches immediately",
        run: wound_removal,
    },
    Scenario {
        key: "roll-hook",
        description: "Current-room mode rewrites the host's tend-room factor",
        run: roll_hook,
    },
    Scenario {
        key: "sweep-idempotence",
        description: "Two sweeps over an unchanged host agree",
        run: sweep_idempotence,
    },
    Scenario {
        key: "panel-gating",
        description: "Frame refreshes sweep only on cadence with the panel open",
        run: panel_gating,
    },
    Scenario {
        key: "soak",
        description: "Randomised population checked against cache invariants",
        run: soak::run,
    },
];

pub fn list_scenarios() -> impl Iterator<Item = (&'static str, &'static str)> {
    CATALOG.iter().map(|s| (s.key, s.description))
}

#[must_use]
pub fn get_scenario(key: &str) -> Option<Scenario> {
    CATALOG.iter().copied().find(|s| s.key == key)
}

#[must_use]
pub fn all_keys() -> Vec<String> {
    CATALOG.iter().map(|s| s.key.to_string()).collect()
}

/// Default tuning with the short delay window scenarios are written against.
#[must_use]
pub fn scenario_tuning() -> HealthTuning {
    HealthTuning {
        infection_delay: InfectionDelay::new(2_000, 8_000),
        ..HealthTuning::default()
    }
}

fn danger_boundary(ctx: &ScenarioCtx) -> Result<()> {
    let mut host = MemoryHost::new();
    let pawn = host.add_creature("Ash", false);
    let ward = host.add_room(Some(0.5));
    host.move_creature(pawn, Some(ward));
    let wound = host.add_wound(
        WoundSpec::injury(pawn, "cut", 0.2)
            .with_severity(12.0)
            .with_tend_room_factor(0.5)
            .aged(3_000),
    );
    let mut watch = ctx.watch(&host)?;
    ensure!(
        watch.on_wound_component_added(&host, wound),
        "cut was not registered"
    );
    let record = watch
        .infection_record(wound)
        .context("record missing after registration")?;
    ensure!(record.is_danger(), "expected danger phase, got {:?}", record.phase());
    ensure!(
        (record.total_chance() - 0.1).abs() < 1e-6,
        "expected 10% risk, got {}",
        record.total_chance()
    );
    let tone = record.symbol().map(|glyph| glyph.tone);
    ensure!(tone == Some(GlyphTone::Danger), "expected danger tone, got {tone:?}");
    Ok(())
}

fn immunity_projection(ctx: &ScenarioCtx) -> Result<()> {
    let mut host = MemoryHost::new();
    let pawn = host.add_creature("Birch", false);
    let wound = host.add_wound(WoundSpec::disease(pawn, FLU, "flu", 2.0).with_severity(1.0));
    host.set_immunity(pawn, FLU, 0.4, 0.5);
    let mut watch = ctx.watch(&host)?;
    ensure!(
        watch.on_immunity_component_added(&host, wound),
        "flu was not registered"
    );
    let record = watch.immunity_record(wound).context("projection missing")?;
    ensure!(
        (record.severity_at_immunity() - 3.4).abs() < 1e-5,
        "expected 3.4, got {}",
        record.severity_at_immunity()
    );
    ensure!(record.symbol().is_some(), "projection above 0.99 must carry a glyph");
    Ok(())
}

fn death_eviction(ctx: &ScenarioCtx) -> Result<()> {
    let mut host = MemoryHost::new();
    let pawn = host.add_creature("Cedar", false);
    let cut = host.add_wound(WoundSpec::injury(pawn, "cut", 0.3));
    let flu = host.add_wound(WoundSpec::disease(pawn, FLU, "flu", 0.2));
    host.set_immunity(pawn, FLU, 0.1, 0.2);
    let mut watch = ctx.watch(&host)?;
    watch.on_wound_component_added(&host, cut);
    watch.on_immunity_component_added(&host, flu);

    host.kill(pawn);
    let summary = watch.sweep(&host);
    ensure!(summary.evicted() == 2, "expected 2 evictions, got {}", summary.evicted());
    ensure!(
        watch.infection().is_empty() && watch.immunity().is_empty(),
        "caches kept records for a dead creature"
    );
    Ok(())
}

fn reload_replay(ctx: &ScenarioCtx) -> Result<()> {
    let (host, wounds) = soak::populate(ctx.seed, 12);
    let mut fresh = ctx.watch(&host)?;
    for wound in &wounds {
        fresh.on_wound_component_added(&host, *wound);
        fresh.on_immunity_component_added(&host, *wound);
    }

    let mut reloaded = ctx.watch(&host)?;
    if let Some(first) = wounds.first() {
        reloaded.on_wound_component_added(&host, *first);
    }
    reloaded.on_game_reload_begin();
    ensure!(reloaded.infection().is_empty(), "reset left infection records");
    reloaded.on_game_reload_complete(&host);

    ensure!(
        fresh.dump_infection() == reloaded.dump_infection(),
        "infection records differ after reload"
    );
    ensure!(
        fresh.dump_immunity() == reloaded.dump_immunity(),
        "immunity records differ after reload"
    );
    Ok(())
}

fn wound_removal(ctx: &ScenarioCtx) -> Result<()> {
    let mut host = MemoryHost::new();
    let pawn = host.add_creature("Dune", false);
    let cut = host.add_wound(WoundSpec::injury(pawn, "cut", 0.3));
    let mut watch = ctx.watch(&host)?;
    watch.on_wound_component_added(&host, cut);
    ensure!(watch.infection_record(cut).is_some(), "cut was not registered");

    host.remove_wound(cut);
    watch.on_wound_removed(cut);
    ensure!(watch.infection_record(cut).is_none(), "removed wound still cached");
    let summary = watch.sweep(&host);
    ensure!(summary.evicted() == 0, "nothing should be left to evict");
    Ok(())
}

fn roll_hook(ctx: &ScenarioCtx) -> Result<()> {
    let mut host = MemoryHost::new();
    let pawn = host.add_creature("Elm", false);
    let clinic = host.add_room(Some(0.3));
    let barn = host.add_room(Some(1.4));
    host.move_creature(pawn, Some(clinic));
    let cut = host.add_wound(WoundSpec::injury(pawn, "cut", 0.3));
    host.tend(cut, 0.8);
    host.move_creature(pawn, Some(barn));

    let settings = Settings {
        use_current_room_for_infection: true,
        ..ctx.settings
    };
    let watch = WoundWatch::init(settings, scenario_tuning(), &host)?;
    let written = watch.on_before_infection_roll(&mut host, cut);
    ensure!(written == Some(1.4), "expected barn factor, got {written:?}");
    let stored = host.tend_room_factor(cut);
    ensure!(stored == Some(1.4), "host kept {stored:?}");

    let legacy = WoundWatch::init(Settings::default(), scenario_tuning(), &host)?;
    host.move_creature(pawn, Some(clinic));
    ensure!(
        legacy.on_before_infection_roll(&mut host, cut).is_none(),
        "tend-room mode must leave the host alone"
    );
    Ok(())
}

fn sweep_idempotence(ctx: &ScenarioCtx) -> Result<()> {
    let (mut host, wounds) = soak::populate(ctx.seed, 16);
    let mut watch = ctx.watch(&host)?;
    for wound in &wounds {
        watch.on_wound_component_added(&host, *wound);
        watch.on_immunity_component_added(&host, *wound);
    }
    host.advance(i32::try_from(host.ticks_per_day() / 8).unwrap_or(i32::MAX));
    watch.sweep(&host);
    let infection = watch.dump_infection();
    let immunity = watch.dump_immunity();
    let again = watch.sweep(&host);
    ensure!(again.evicted() == 0, "second sweep evicted {}", again.evicted());
    ensure!(infection == watch.dump_infection(), "infection cache drifted");
    ensure!(immunity == watch.dump_immunity(), "immunity cache drifted");
    Ok(())
}

fn panel_gating(ctx: &ScenarioCtx) -> Result<()> {
    let mut host = MemoryHost::new();
    let pawn = host.add_creature("Fern", false);
    let cut = host.add_wound(WoundSpec::injury(pawn, "cut", 0.3));
    let settings = Settings {
        sweep_when_panel_hidden: false,
        ..ctx.settings
    };
    let mut watch = WoundWatch::init(settings, scenario_tuning(), &host)?;
    watch.on_wound_component_added(&host, cut);
    let interval = u64::from(watch.tuning().sweep_interval_ticks);

    host.kill(pawn);
    ensure!(
        watch.refresh_tick(&host, interval, false).is_none(),
        "hidden panel must not sweep"
    );
    ensure!(
        watch.refresh_tick(&host, interval + 1, true).is_none(),
        "off-cadence frame must not sweep"
    );
    ensure!(watch.infection_record(cut).is_some(), "record evicted too early");
    let summary = watch
        .refresh_tick(&host, interval * 2, true)
        .context("on-cadence frame with open panel must sweep")?;
    ensure!(summary.infection.evicted_count() == 1, "dead creature not evicted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_scenario_passes_on_default_settings() {
        let ctx = ScenarioCtx::new(1337, Settings::default(), false);
        for (key, _) in list_scenarios() {
            let scenario = get_scenario(key).unwrap();
            (scenario.run)(&ctx).unwrap_or_else(|err| panic!("{key}: {err:#}"));
        }
    }

    #[test]
    fn current_room_mode_keeps_boundary_scenario_green() {
        let settings = Settings {
            use_current_room_for_infection: true,
            ..Settings::default()
        };
        let ctx = ScenarioCtx::new(7, settings, false);
        danger_boundary(&ctx).unwrap();
        reload_replay(&ctx).unwrap();
    }

    #[test]
    fn unknown_scenario_is_none() {
        assert!(get_scenario("nope").is_none());
        assert_eq!(all_keys().len(), CATALOG.len());
    }
}

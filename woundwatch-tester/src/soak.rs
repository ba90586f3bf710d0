//! Seeded random populations driven through many sweeps.
//!
//! After every sweep each surviving record must still describe a live
//! wound on a live creature that the host could infect or immunize.
use anyhow::{Result, ensure};
use colored::Colorize;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use woundwatch_core::{
    AfflictionId, CreatureId, ImmunityTracker, MemoryHost, WoundHost, WoundId, WoundSpec,
    WoundWatch,
};

use crate::scenarios::{ScenarioCtx, scenario_tuning};

const SOAK_ROUNDS: usize = 40;
const SOAK_WOUNDS: usize = 24;
const AFFLICTIONS: [AfflictionId; 3] = [AfflictionId(500), AfflictionId(501), AfflictionId(502)];
const LABELS: [&str; 5] = ["cut", "bite", "burn", "gunshot", "scratch"];

/// Build a host with a handful of creatures, rooms and mixed wounds.
pub fn populate(seed: u64, wounds: usize) -> (MemoryHost, Vec<WoundId>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut host = MemoryHost::new();

    let rooms: Vec<_> = (0..3)
        .map(|_| {
            let factor = rng.gen_bool(0.8).then(|| rng.gen_range(0.3_f32..1.5));
            host.add_room(factor)
        })
        .collect();
    let creatures: Vec<CreatureId> = (0..4)
        .map(|i| {
            let creature = host.add_creature(&format!("creature-{i}"), rng.gen_bool(0.25));
            let room = rng.gen_bool(0.75).then(|| rooms[rng.gen_range(0..rooms.len())]);
            host.move_creature(creature, room);
            creature
        })
        .collect();

    let ids = (0..wounds)
        .map(|_| {
            let creature = creatures[rng.gen_range(0..creatures.len())];
            let spec = if rng.gen_bool(0.7) {
                let label = LABELS[rng.gen_range(0..LABELS.len())];
                let mut spec = WoundSpec::injury(creature, label, rng.gen_range(0.05_f32..0.6))
                    .aged(rng.gen_range(0..9_000))
                    .with_severity(rng.gen_range(0.5_f32..14.0));
                if rng.gen_bool(0.1) {
                    spec = spec.permanent();
                }
                spec
            } else {
                let affliction = AFFLICTIONS[rng.gen_range(0..AFFLICTIONS.len())];
                WoundSpec::disease(creature, affliction, "illness", rng.gen_range(0.05_f32..0.6))
            };
            host.add_wound(spec)
        })
        .collect::<Vec<_>>();

    for creature in &creatures {
        for affliction in AFFLICTIONS {
            if rng.gen_bool(0.7) {
                host.set_immunity(
                    *creature,
                    affliction,
                    rng.gen_range(0.0_f32..0.9),
                    rng.gen_range(0.0_f32..0.8),
                );
            }
        }
    }

    (host, ids)
}

pub fn run(ctx: &ScenarioCtx) -> Result<()> {
    let (mut host, wounds) = populate(ctx.seed, SOAK_WOUNDS);
    let mut rng = ChaCha8Rng::seed_from_u64(ctx.seed ^ 0x5eed);
    let mut watch = WoundWatch::init(ctx.settings, scenario_tuning(), &host)?;
    for wound in &wounds {
        watch.on_wound_component_added(&host, *wound);
        watch.on_immunity_component_added(&host, *wound);
    }

    let mut evicted = 0;
    for round in 0..SOAK_ROUNDS {
        host.advance(rng.gen_range(0..1_500));
        match rng.gen_range(0..10) {
            0 => {
                let creature = host
                    .wound(wounds[rng.gen_range(0..wounds.len())])
                    .map(|wound| wound.creature);
                if let Some(creature) = creature {
                    host.kill(creature);
                }
            }
            1 => {
                let wound = wounds[rng.gen_range(0..wounds.len())];
                host.remove_wound(wound);
                watch.on_wound_removed(wound);
            }
            2 => {
                let wound = wounds[rng.gen_range(0..wounds.len())];
                host.tend(wound, rng.gen_range(0.0_f32..1.0));
                watch.on_before_infection_roll(&mut host, wound);
            }
            _ => {}
        }

        let summary = watch.sweep(&host);
        evicted += summary.evicted();
        check_invariants(&host, &watch)
            .map_err(|err| err.context(format!("round {round} (seed {})", ctx.seed)))?;
    }

    if ctx.verbose {
        println!(
            "   {} seed {}: {} evictions, {} infection / {} immunity records left",
            "soak".bright_white(),
            ctx.seed,
            evicted,
            watch.infection().len(),
            watch.immunity().len()
        );
    }
    Ok(())
}

fn check_invariants(host: &MemoryHost, watch: &WoundWatch) -> Result<()> {
    let tuning = watch.tuning();
    for record in watch.infection().records() {
        let wound = host.wound(record.wound());
        ensure!(wound.is_some(), "{} outlived its wound", record.wound());
        ensure!(!record.is_stale(), "{} is stale after a sweep", record.wound());
        ensure!(
            !record.is_safe(),
            "{} is past the infection window",
            record.wound()
        );
        ensure!(
            !tuning.infection_delay.is_safe(record.age_ticks()),
            "{} age {} should be safe",
            record.wound(),
            record.age_ticks()
        );
        ensure!(
            host.creature(record.creature()).is_some_and(|c| !c.dead),
            "{} belongs to a dead creature",
            record.wound()
        );
        let total = record.total_chance();
        ensure!(
            total.is_finite() && total >= 0.0,
            "{} has risk {total}",
            record.wound()
        );
    }
    for record in watch.immunity().records() {
        let wound = host.wound(record.wound());
        ensure!(
            wound
                .as_ref()
                .is_some_and(|wound| ImmunityTracker::can_immunize(host, wound)),
            "{} no longer confers immunity",
            record.wound()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use woundwatch_core::Settings;

    #[test]
    fn populate_is_deterministic_per_seed() {
        let (first, a) = populate(42, 10);
        let (second, b) = populate(42, 10);
        assert_eq!(a, b);
        let labels = |host: &MemoryHost| {
            a.iter()
                .filter_map(|id| host.wound(*id))
                .map(|wound| (wound.label, wound.age_ticks))
                .collect::<Vec<_>>()
        };
        assert_eq!(labels(&first), labels(&second));
    }

    #[test]
    fn soak_holds_across_seeds() {
        for seed in [1, 2, 3, 1337] {
            run(&ScenarioCtx::new(seed, Settings::default(), false)).unwrap();
        }
        let current_room = Settings {
            use_current_room_for_infection: true,
            ..Settings::default()
        };
        run(&ScenarioCtx::new(99, current_room, false)).unwrap();
    }
}

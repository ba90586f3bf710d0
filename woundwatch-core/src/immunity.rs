//! Projected severity at the moment a creature becomes immune.
use serde::Serialize;
use std::fmt;

use crate::cache::{RecordCache, RecordUpdate, SweepReport, SweepVerdict};
use crate::display::Glyph;
use crate::host::{CreatureId, WoundHost, WoundId, WoundState};

/// Linear extrapolation of severity to the point immunity reaches 1.0.
///
/// Returns `None` when immunity is not growing.
#[must_use]
pub fn project_severity_at_immunity(
    immunity: f32,
    immunity_per_day: f32,
    severity: f32,
    severity_per_day: f32,
) -> Option<f32> {
    if immunity_per_day <= 0.0 || !immunity_per_day.is_finite() {
        return None;
    }
    Some((1.0 - immunity) * severity_per_day / immunity_per_day + severity)
}

/// Derived immunity projection for one wound.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImmunityRecord {
    wound: WoundId,
    creature: CreatureId,
    label: String,
    severity_at_immunity: f32,
    symbol: Option<Glyph>,
    stale: bool,
}

impl ImmunityRecord {
    fn new(wound: &WoundState) -> Self {
        Self {
            wound: wound.id,
            creature: wound.creature,
            label: wound.label.clone(),
            severity_at_immunity: 0.0,
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
    pub const fn severity_at_immunity(&self) -> f32 {
        self.severity_at_immunity
    }

    #[must_use]
    pub const fn symbol(&self) -> Option<Glyph> {
        self.symbol
    }

    #[must_use]
    pub const fn is_stale(&self) -> bool {
        self.stale
    }
}

impl fmt::Display for ImmunityRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = self.symbol.map_or("-", |glyph| glyph.text);
        write!(
            f,
            "ImmunityRecord({}:{}:{}:{}:{:.3})",
            self.creature, self.label, self.wound, symbol, self.severity_at_immunity
        )
    }
}

/// Owns the immunity-projection cache.
#[derive(Debug, Clone)]
pub struct ImmunityTracker {
    records: RecordCache<ImmunityRecord>,
    symbol_threshold: f32,
}

impl ImmunityTracker {
    #[must_use]
    pub fn new(symbol_threshold: f32) -> Self {
        Self {
            records: RecordCache::new(),
            symbol_threshold,
        }
    }

    /// The creature is alive and not yet fully immune to the affliction.
    #[must_use]
    pub fn can_immunize<H>(host: &H, wound: &WoundState) -> bool
    where
        H: WoundHost + ?Sized,
    {
        if wound.immunizable.is_none() {
            return false;
        }
        let alive = host
            .creature(wound.creature)
            .is_some_and(|creature| !creature.dead);
        alive
            && !host
                .immunity(wound.creature, wound.affliction)
                .is_some_and(|state| state.fully_immune())
    }

    /// Start tracking `id` if it can still confer immunity.
    pub fn register<H>(&mut self, host: &H, id: WoundId) -> Option<&ImmunityRecord>
    where
        H: WoundHost + ?Sized,
    {
        let wound = host.wound(id)?;
        if !Self::can_immunize(host, &wound) {
            return None;
        }
        let mut record = ImmunityRecord::new(&wound);
        refresh(host, &wound, &mut record, self.symbol_threshold);
        if self.records.insert(id, record).is_none() {
            log::debug!("woundwatch: tracking immunity projection for {id}");
        }
        self.records.get(id)
    }

    pub fn update<H>(&self, host: &H, record: &mut ImmunityRecord) -> RecordUpdate
    where
        H: WoundHost + ?Sized,
    {
        let Some(wound) = host.wound(record.wound) else {
            log::warn!("woundwatch: {} vanished before update", record.wound);
            record.stale = true;
            return RecordUpdate::Stale;
        };
        refresh(host, &wound, record, self.symbol_threshold)
    }

    pub fn sweep<H>(&mut self, host: &H) -> SweepReport
    where
        H: WoundHost + ?Sized,
    {
        let threshold = self.symbol_threshold;
        let report = self.records.sweep(|_, record| {
            if record.stale {
                return SweepVerdict::Evict;
            }
            match host.wound(record.wound) {
                Some(wound) if Self::can_immunize(host, &wound) => {
                    refresh(host, &wound, record, threshold);
                    SweepVerdict::Keep
                }
                _ => SweepVerdict::Evict,
            }
        });
        for id in &report.evicted {
            log::debug!("woundwatch: stopped tracking immunity projection for {id}");
        }
        report
    }

    pub fn reset(&mut self) {
        self.records.clear();
        log::info!("woundwatch: immunity tracker reset");
    }

    pub fn remove(&mut self, id: WoundId) -> Option<ImmunityRecord> {
        self.records.remove(id)
    }

    #[must_use]
    pub fn get(&self, id: WoundId) -> Option<&ImmunityRecord> {
        self.records.get(id)
    }

    pub fn get_mut(&mut self, id: WoundId) -> Option<&mut ImmunityRecord> {
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

    #[must_use]
    pub fn records(&self) -> Vec<&ImmunityRecord> {
        self.records.iter().into_iter().map(|(_, r)| r).collect()
    }

    #[must_use]
    pub fn dump(&self) -> Vec<String> {
        let lines: Vec<String> = self.records().iter().map(ToString::to_string).collect();
        for line in &lines {
            log::info!("{line}");
        }
        lines
    }
}

fn refresh<H>(
    host: &H,
    wound: &WoundState,
    record: &mut ImmunityRecord,
    threshold: f32,
) -> RecordUpdate
where
    H: WoundHost + ?Sized,
{
    let Some(immunizable) = wound.immunizable else {
        record.stale = true;
        return RecordUpdate::Stale;
    };
    // The host creates the immunity record lazily; keep the last projection until it exists.
    let projected = host
        .immunity(wound.creature, wound.affliction)
        .and_then(|state| {
            project_severity_at_immunity(
                state.immunity,
                state.immunity_per_day,
                wound.severity,
                immunizable.severity_per_day,
            )
        });
    let Some(projected) = projected else {
        return RecordUpdate::Deferred;
    };
    record.severity_at_immunity = projected;
    record.symbol = (projected > threshold).then(Glyph::immunity);
    RecordUpdate::Refreshed
}

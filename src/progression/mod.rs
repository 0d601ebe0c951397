//! Progression Gate Evaluator
//!
//! Reads the discovery ledger against per-biome thresholds and unlocks
//! the next biome when all three minimums (total scans, unique items,
//! tier-3 items) are met. Unlocking is idempotent: the `BiomeUnlocked`
//! event fires exactly once per biome however often the gate is
//! rechecked.
//!
//! This module also carries the event wiring that turns a completed
//! scan into a ledger record and a gate recheck for the active biome.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{error, info};

use crate::catalog::ItemCatalog;
use crate::constants::STARTING_BIOME;
use crate::ledger::{DiscoveryEvent, DiscoveryLedger};
use crate::scanner::ScanEvent;

/// Unlock thresholds for one biome. `unlocks_biome: None` marks the
/// terminal biome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionGate {
    pub total_scans_required: u64,
    pub unique_items_required: u32,
    pub tier3_required: u32,
    pub unlocks_biome: Option<String>,
}

/// Result of a gate check. Unknown biomes get the all-zero sentinel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BiomeProgress {
    pub biome: String,
    pub total_scans: u64,
    pub unique_items: u32,
    pub tier3_count: u32,
    pub is_complete: bool,
    pub next_biome: Option<String>,
}

impl BiomeProgress {
    fn unknown(biome: &str) -> Self {
        Self {
            biome: biome.into(),
            ..Default::default()
        }
    }
}

/// Fired once when a biome first becomes available.
#[derive(Event, Debug, Clone, PartialEq)]
pub struct BiomeUnlocked {
    pub biome: String,
}

/// The biome the player is currently exploring; gate rechecks after
/// each recorded scan run against this.
#[derive(Resource, Debug, Clone)]
pub struct ActiveBiome {
    pub name: String,
}

impl Default for ActiveBiome {
    fn default() -> Self {
        Self {
            name: STARTING_BIOME.into(),
        }
    }
}

/// Gate table plus the unlocked-biome set.
#[derive(Resource, Debug, Clone)]
pub struct ProgressionTracker {
    gates: HashMap<String, ProgressionGate>,
    unlocked: HashSet<String>,
    events: Vec<BiomeUnlocked>,
}

impl Default for ProgressionTracker {
    fn default() -> Self {
        Self::new(starter_gates(), STARTING_BIOME)
    }
}

impl ProgressionTracker {
    pub fn new(gates: HashMap<String, ProgressionGate>, starting_biome: &str) -> Self {
        let mut unlocked = HashSet::new();
        unlocked.insert(starting_biome.to_string());
        Self {
            gates,
            unlocked,
            events: Vec::new(),
        }
    }

    pub fn is_unlocked(&self, biome: &str) -> bool {
        self.unlocked.contains(biome)
    }

    pub fn unlocked_biomes(&self) -> impl Iterator<Item = &str> {
        self.unlocked.iter().map(String::as_str)
    }

    pub fn gate(&self, biome: &str) -> Option<&ProgressionGate> {
        self.gates.get(biome)
    }

    /// Idempotent unlock. Returns `true` (and queues the event) only on
    /// the first call per biome.
    pub fn unlock(&mut self, biome: &str) -> bool {
        if !self.unlocked.insert(biome.to_string()) {
            return false;
        }
        info!(biome, "biome unlocked");
        self.events.push(BiomeUnlocked { biome: biome.into() });
        true
    }

    /// Aggregate ledger state for `biome` and unlock its successor when
    /// complete. Unknown biome names return a sentinel, never panic.
    pub fn check_biome_progression(
        &mut self,
        catalog: &ItemCatalog,
        ledger: &DiscoveryLedger,
        biome: &str,
    ) -> BiomeProgress {
        let Some(gate) = self.gates.get(biome).cloned() else {
            return BiomeProgress::unknown(biome);
        };

        let mut total_scans = 0u64;
        let mut unique_items = 0u32;
        let mut tier3_count = 0u32;
        for def in catalog.items_in_biome(biome) {
            if let Some(record) = ledger.get_record(&def.uid) {
                total_scans += record.times_scanned as u64;
                unique_items += 1;
                if record.tier >= 3 {
                    tier3_count += 1;
                }
            }
        }

        let is_complete = total_scans >= gate.total_scans_required
            && unique_items >= gate.unique_items_required
            && tier3_count >= gate.tier3_required;

        if is_complete {
            if let Some(next) = &gate.unlocks_biome {
                self.unlock(next);
            }
        }

        BiomeProgress {
            biome: biome.into(),
            total_scans,
            unique_items,
            tier3_count,
            is_complete,
            next_biome: gate.unlocks_biome,
        }
    }

    pub fn drain_events(&mut self) -> Vec<BiomeUnlocked> {
        std::mem::take(&mut self.events)
    }

    /// New-game reset: only the starting biome stays unlocked.
    pub fn reset(&mut self, starting_biome: &str) {
        self.unlocked.clear();
        self.unlocked.insert(starting_biome.to_string());
        self.events.clear();
    }

    /// Restore the unlocked set from persisted state; the starting
    /// biome is always kept available.
    pub fn restore_unlocked(&mut self, biomes: impl IntoIterator<Item = String>) {
        self.unlocked.extend(biomes);
        self.unlocked.insert(STARTING_BIOME.to_string());
    }
}

/// The default gate chain matching the starter catalog.
pub fn starter_gates() -> HashMap<String, ProgressionGate> {
    let mut gates = HashMap::new();
    gates.insert(
        "meadow".to_string(),
        ProgressionGate {
            total_scans_required: 10,
            unique_items_required: 3,
            tier3_required: 1,
            unlocks_biome: Some("caverns".to_string()),
        },
    );
    gates.insert(
        "caverns".to_string(),
        ProgressionGate {
            total_scans_required: 25,
            unique_items_required: 5,
            tier3_required: 2,
            unlocks_biome: Some("peaks".to_string()),
        },
    );
    gates.insert(
        "peaks".to_string(),
        ProgressionGate {
            total_scans_required: 40,
            unique_items_required: 8,
            tier3_required: 3,
            unlocks_biome: None,
        },
    );
    gates
}

pub struct ProgressionPlugin;

impl Plugin for ProgressionPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ProgressionTracker>()
            .init_resource::<ActiveBiome>()
            .add_event::<BiomeUnlocked>()
            .add_systems(
                Update,
                record_completed_scans.after(crate::scanner::scanner_tick),
            );
    }
}

/// Completed scans → ledger records → gate recheck for the active
/// biome. A completion referencing an unknown uid is a data integrity
/// error: logged, ledger untouched.
pub fn record_completed_scans(
    mut scan_events: EventReader<ScanEvent>,
    catalog: Res<ItemCatalog>,
    time: Res<Time>,
    mut ledger: ResMut<DiscoveryLedger>,
    mut tracker: ResMut<ProgressionTracker>,
    active: Res<ActiveBiome>,
    mut discoveries: EventWriter<DiscoveryEvent>,
    mut unlocks: EventWriter<BiomeUnlocked>,
) {
    for event in scan_events.read() {
        let ScanEvent::ScanCompleted { uid } = event else {
            continue;
        };
        let Some(def) = catalog.get(uid) else {
            error!(uid, "completed scan references unknown item, dropping");
            continue;
        };

        let new_discovery = ledger.record_scan(def, time.elapsed_secs_f64());
        let tier = ledger.get_record(uid).map(|r| r.tier).unwrap_or(1);
        discoveries.send(DiscoveryEvent {
            uid: uid.clone(),
            new_discovery,
            tier,
        });

        tracker.check_biome_progression(&catalog, &ledger, &active.name);
    }
    for event in tracker.drain_events() {
        unlocks.send(event);
    }
}

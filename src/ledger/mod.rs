//! Discovery Ledger
//!
//! Authoritative record of what has been scanned, how many times, and
//! the derived documentation tier. Tier thresholds scale with rarity:
//! rarer items take more scans to document fully. The ledger also keeps
//! a global scan counter that is deliberately independent of the
//! per-item counters — gates read both.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::catalog::{ItemDefinition, Rarity};

/// Fully documented tier.
pub const MAX_TIER: u8 = 3;

/// One discovered item's record. Created on first successful scan,
/// updated only by [`DiscoveryLedger::record_scan`], removed only by
/// explicit reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub item_uid: String,
    pub times_scanned: u32,
    pub tier: u8,
    pub first_scan_timestamp: f64,
    pub last_scan_timestamp: f64,
}

/// Documentation tier for a given rarity and cumulative scan count.
///
/// Tier 2 needs `1 + (ordinal + 1)` scans, tier 3 needs
/// `1 + (ordinal + 1) * 2`; a single scan is always tier 1. Monotone in
/// `times_scanned` by construction.
pub fn tier_for(rarity: Rarity, times_scanned: u32) -> u8 {
    let r = rarity.ordinal();
    let tier2_at = 1 + (r + 1);
    let tier3_at = 1 + (r + 1) * 2;
    if times_scanned >= tier3_at {
        3
    } else if times_scanned >= tier2_at {
        2
    } else {
        1
    }
}

/// Aggregate ledger snapshot for UI consumption.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerStats {
    pub unique_items: u32,
    pub total_scans: u64,
    pub tier2_count: u32,
    pub tier3_count: u32,
}

/// Fired once per recorded scan so presentation layers can react
/// (journal pop-ups, first-discovery fanfare).
#[derive(Event, Debug, Clone, PartialEq)]
pub struct DiscoveryEvent {
    pub uid: String,
    pub new_discovery: bool,
    pub tier: u8,
}

/// The record collection. One per process; exclusively owns every
/// `ScanRecord`.
#[derive(Resource, Debug, Clone, Default)]
pub struct DiscoveryLedger {
    records: HashMap<String, ScanRecord>,
    total_scans: u64,
}

impl DiscoveryLedger {
    /// Record one completed scan. Returns `true` on first discovery.
    ///
    /// Timestamps come from the caller's game clock; the ledger does no
    /// I/O of its own.
    pub fn record_scan(&mut self, def: &ItemDefinition, now: f64) -> bool {
        self.total_scans += 1;

        match self.records.get_mut(&def.uid) {
            Some(record) => {
                record.times_scanned += 1;
                record.tier = tier_for(def.rarity, record.times_scanned);
                record.last_scan_timestamp = now;
                false
            }
            None => {
                self.records.insert(
                    def.uid.clone(),
                    ScanRecord {
                        item_uid: def.uid.clone(),
                        times_scanned: 1,
                        tier: 1,
                        first_scan_timestamp: now,
                        last_scan_timestamp: now,
                    },
                );
                true
            }
        }
    }

    pub fn has_scanned(&self, uid: &str) -> bool {
        self.records.contains_key(uid)
    }

    pub fn get_record(&self, uid: &str) -> Option<&ScanRecord> {
        self.records.get(uid)
    }

    /// Global scan counter: +1 per `record_scan` call, repeats included.
    pub fn total_scans(&self) -> u64 {
        self.total_scans
    }

    pub fn unique_items(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> impl Iterator<Item = &ScanRecord> {
        self.records.values()
    }

    pub fn stats(&self) -> LedgerStats {
        LedgerStats {
            unique_items: self.records.len() as u32,
            total_scans: self.total_scans,
            tier2_count: self.records.values().filter(|r| r.tier >= 2).count() as u32,
            tier3_count: self.records.values().filter(|r| r.tier >= 3).count() as u32,
        }
    }

    /// Rebuild from persisted state (see `savedata`). Replaces the
    /// current contents wholesale.
    pub fn restore(records: HashMap<String, ScanRecord>, total_scans: u64) -> Self {
        Self {
            records,
            total_scans,
        }
    }

    /// Explicit reset for new-game initialization.
    pub fn reset(&mut self) {
        self.records.clear();
        self.total_scans = 0;
    }
}

pub struct LedgerPlugin;

impl Plugin for LedgerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<DiscoveryLedger>()
            .add_event::<DiscoveryEvent>();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(uid: &str, rarity: Rarity) -> ItemDefinition {
        ItemDefinition {
            uid: uid.into(),
            display_name: uid.into(),
            rarity,
            scan_time: 2.0,
            biome_affinity: vec!["meadow".into()],
            unlock_threshold: 0,
        }
    }

    #[test]
    fn test_tier_thresholds_common() {
        // Common (r=0): tier 2 at 2 scans, tier 3 at 3.
        assert_eq!(tier_for(Rarity::Common, 1), 1);
        assert_eq!(tier_for(Rarity::Common, 2), 2);
        assert_eq!(tier_for(Rarity::Common, 3), 3);
        assert_eq!(tier_for(Rarity::Common, 100), 3);
    }

    #[test]
    fn test_tier_thresholds_legendary() {
        // Legendary (r=3): tier 2 at 5 scans, tier 3 at 9.
        assert_eq!(tier_for(Rarity::Legendary, 4), 1);
        assert_eq!(tier_for(Rarity::Legendary, 5), 2);
        assert_eq!(tier_for(Rarity::Legendary, 8), 2);
        assert_eq!(tier_for(Rarity::Legendary, 9), 3);
    }

    #[test]
    fn test_first_scan_is_new_discovery() {
        let mut ledger = DiscoveryLedger::default();
        let rock = def("rock_01", Rarity::Common);

        assert!(ledger.record_scan(&rock, 10.0));
        assert!(!ledger.record_scan(&rock, 11.0));

        let record = ledger.get_record("rock_01").unwrap();
        assert_eq!(record.times_scanned, 2);
        assert_eq!(record.first_scan_timestamp, 10.0);
        assert_eq!(record.last_scan_timestamp, 11.0);
    }

    #[test]
    fn test_rock_tier_sequence() {
        // Spec scenario: common item scanned three times → tiers 1, 2, 3.
        let mut ledger = DiscoveryLedger::default();
        let rock = def("rock_01", Rarity::Common);

        let mut tiers = Vec::new();
        for i in 0..3 {
            ledger.record_scan(&rock, i as f64);
            tiers.push(ledger.get_record("rock_01").unwrap().tier);
        }
        assert_eq!(tiers, vec![1, 2, 3]);
    }

    #[test]
    fn test_global_counter_independent_of_per_item() {
        let mut ledger = DiscoveryLedger::default();
        let rock = def("rock_01", Rarity::Common);
        let fern = def("fern_01", Rarity::Common);

        for i in 0..4 {
            ledger.record_scan(&rock, i as f64);
        }
        ledger.record_scan(&fern, 4.0);

        assert_eq!(ledger.total_scans(), 5);
        assert_eq!(ledger.unique_items(), 2);
        assert_eq!(ledger.get_record("rock_01").unwrap().times_scanned, 4);
        assert_eq!(ledger.get_record("fern_01").unwrap().times_scanned, 1);
    }

    #[test]
    fn test_stats() {
        let mut ledger = DiscoveryLedger::default();
        let rock = def("rock_01", Rarity::Common);
        let moth = def("dew_moth", Rarity::Uncommon);

        for i in 0..3 {
            ledger.record_scan(&rock, i as f64); // tier 3
        }
        for i in 0..3 {
            ledger.record_scan(&moth, i as f64); // uncommon: tier 2 at 3
        }

        let stats = ledger.stats();
        assert_eq!(stats.unique_items, 2);
        assert_eq!(stats.total_scans, 6);
        assert_eq!(stats.tier2_count, 2); // tier>=2
        assert_eq!(stats.tier3_count, 1);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut ledger = DiscoveryLedger::default();
        ledger.record_scan(&def("rock_01", Rarity::Common), 0.0);
        ledger.reset();
        assert_eq!(ledger.total_scans(), 0);
        assert!(!ledger.has_scanned("rock_01"));
    }

    #[test]
    fn test_tier_never_decreases() {
        let mut ledger = DiscoveryLedger::default();
        let item = def("sun_beetle", Rarity::Rare);
        let mut last_tier = 0;
        for i in 0..20 {
            ledger.record_scan(&item, i as f64);
            let tier = ledger.get_record("sun_beetle").unwrap().tier;
            assert!(tier >= last_tier, "tier regressed at scan {}", i + 1);
            assert!((1..=MAX_TIER).contains(&tier));
            last_tier = tier;
        }
        assert_eq!(last_tier, MAX_TIER);
    }
}

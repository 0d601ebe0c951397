//! Persistence contract
//!
//! The only state handed to the external persistence collaborator: a
//! version-tagged flat document holding the ledger mapping, the global
//! scan total, the unlocked biomes and the active biome. Restoration is
//! deliberately forgiving — missing or malformed keys fall back to
//! defaults field by field, and only an unparseable document or a
//! future version is reported as an error (recoverable, never a panic).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;
use tracing::warn;

use crate::constants::STARTING_BIOME;
use crate::ledger::{DiscoveryLedger, ScanRecord, MAX_TIER};
use crate::progression::ProgressionTracker;

/// Current save document version.
pub const CURRENT_SAVE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SaveError {
    #[error("save version {save_version} is newer than supported {max_supported}")]
    FutureVersion {
        save_version: u32,
        max_supported: u32,
    },
    #[error("save document is not valid JSON: {detail}")]
    InvalidFormat { detail: String },
}

/// One persisted ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveRecord {
    pub tier: u8,
    pub times_scanned: u32,
    pub first_scan_timestamp: f64,
    pub last_scan_timestamp: f64,
}

/// The full persisted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveData {
    pub version: u32,
    pub active_biome: String,
    pub unlocked_biomes: Vec<String>,
    pub total_scans: u64,
    pub records: HashMap<String, SaveRecord>,
}

impl SaveData {
    /// Capture the current core state into a save document.
    pub fn capture(
        ledger: &DiscoveryLedger,
        tracker: &ProgressionTracker,
        active_biome: &str,
    ) -> Self {
        let records = ledger
            .records()
            .map(|r| {
                (
                    r.item_uid.clone(),
                    SaveRecord {
                        tier: r.tier,
                        times_scanned: r.times_scanned,
                        first_scan_timestamp: r.first_scan_timestamp,
                        last_scan_timestamp: r.last_scan_timestamp,
                    },
                )
            })
            .collect();
        let mut unlocked: Vec<String> =
            tracker.unlocked_biomes().map(str::to_string).collect();
        unlocked.sort();

        Self {
            version: CURRENT_SAVE_VERSION,
            active_biome: active_biome.to_string(),
            unlocked_biomes: unlocked,
            total_scans: ledger.total_scans(),
            records,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Rebuild a ledger from this document.
    pub fn build_ledger(&self) -> DiscoveryLedger {
        let records = self
            .records
            .iter()
            .map(|(uid, r)| {
                (
                    uid.clone(),
                    ScanRecord {
                        item_uid: uid.clone(),
                        times_scanned: r.times_scanned.max(1),
                        tier: r.tier.clamp(1, MAX_TIER),
                        first_scan_timestamp: r.first_scan_timestamp,
                        last_scan_timestamp: r.last_scan_timestamp,
                    },
                )
            })
            .collect();
        DiscoveryLedger::restore(records, self.total_scans)
    }
}

/// Parse a save document, recovering whatever is salvageable.
///
/// Any missing or malformed field degrades to its default; only a
/// structurally unparseable document or a future version is an error.
pub fn parse_save(json: &str) -> Result<SaveData, SaveError> {
    let root: Value = serde_json::from_str(json).map_err(|e| SaveError::InvalidFormat {
        detail: e.to_string(),
    })?;

    let version = root
        .get("version")
        .and_then(Value::as_u64)
        .unwrap_or(CURRENT_SAVE_VERSION as u64) as u32;
    if version > CURRENT_SAVE_VERSION {
        return Err(SaveError::FutureVersion {
            save_version: version,
            max_supported: CURRENT_SAVE_VERSION,
        });
    }

    let active_biome = root
        .get("active_biome")
        .and_then(Value::as_str)
        .unwrap_or(STARTING_BIOME)
        .to_string();

    let unlocked_biomes = root
        .get("unlocked_biomes")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_else(|| vec![STARTING_BIOME.to_string()]);

    let total_scans = root
        .get("total_scans")
        .and_then(Value::as_u64)
        .unwrap_or(0);

    let mut records = HashMap::new();
    if let Some(map) = root.get("records").and_then(Value::as_object) {
        for (uid, entry) in map {
            let Some(entry) = entry.as_object() else {
                warn!(uid, "malformed save record, skipping");
                continue;
            };
            let get_u64 = |key: &str, default: u64| {
                entry.get(key).and_then(Value::as_u64).unwrap_or(default)
            };
            let get_f64 = |key: &str| entry.get(key).and_then(Value::as_f64).unwrap_or(0.0);

            records.insert(
                uid.clone(),
                SaveRecord {
                    tier: (get_u64("tier", 1) as u8).clamp(1, MAX_TIER),
                    times_scanned: get_u64("times_scanned", 1).max(1) as u32,
                    first_scan_timestamp: get_f64("first_scan_timestamp"),
                    last_scan_timestamp: get_f64("last_scan_timestamp"),
                },
            );
        }
    }

    Ok(SaveData {
        version,
        active_biome,
        unlocked_biomes,
        total_scans,
        records,
    })
}

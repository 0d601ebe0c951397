//! Item Catalog
//!
//! Static definitions of everything the player can scan. Loaded once at
//! startup (from RON data or the built-in starter set) into an immutable
//! table keyed by uid; the rest of the core only ever refers to items by
//! that opaque uid. Duplicate uids abort catalog construction — every
//! other bad value degrades to a safe default with a warning.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::warn;

use crate::constants::MIN_SCAN_TIME_SECS;

/// Item rarity, ordered from most to least common.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Legendary,
}

impl Rarity {
    /// 0-indexed ordinal used by the discovery tier formula.
    pub fn ordinal(&self) -> u32 {
        match self {
            Rarity::Common => 0,
            Rarity::Uncommon => 1,
            Rarity::Rare => 2,
            Rarity::Legendary => 3,
        }
    }

    /// Point cost charged against a chunk's loot budget.
    pub fn point_cost(&self) -> u32 {
        match self {
            Rarity::Common => 1,
            Rarity::Uncommon => 2,
            Rarity::Rare => 3,
            Rarity::Legendary => 5,
        }
    }

    pub fn all() -> [Rarity; 4] {
        [
            Rarity::Common,
            Rarity::Uncommon,
            Rarity::Rare,
            Rarity::Legendary,
        ]
    }
}

/// One scannable entity definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDefinition {
    pub uid: String,
    pub display_name: String,
    pub rarity: Rarity,
    /// Seconds of uninterrupted scanning required to document this item.
    pub scan_time: f32,
    /// Biomes whose chunks may spawn this item.
    pub biome_affinity: Vec<String>,
    /// Global scan count at which this item becomes visible to detection.
    pub unlock_threshold: u32,
}

impl ItemDefinition {
    /// Scan time with the zero/negative guard applied.
    pub fn effective_scan_time(&self) -> f32 {
        if self.scan_time < MIN_SCAN_TIME_SECS {
            MIN_SCAN_TIME_SECS
        } else {
            self.scan_time
        }
    }
}

/// Errors that abort catalog construction.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("duplicate item uid in catalog: {0}")]
    DuplicateUid(String),
    #[error("failed to parse catalog document: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// Immutable item table plus a per-biome index, built once at load.
#[derive(Resource, Debug, Clone, Default)]
pub struct ItemCatalog {
    items: HashMap<String, ItemDefinition>,
    biome_index: HashMap<String, Vec<String>>,
}

impl ItemCatalog {
    /// Build a catalog, rejecting duplicate uids and clamping bad scan
    /// times.
    pub fn from_items(defs: Vec<ItemDefinition>) -> Result<Self, CatalogError> {
        let mut items: HashMap<String, ItemDefinition> = HashMap::new();
        let mut biome_index: HashMap<String, Vec<String>> = HashMap::new();

        for mut def in defs {
            if items.contains_key(&def.uid) {
                return Err(CatalogError::DuplicateUid(def.uid));
            }
            if def.scan_time < MIN_SCAN_TIME_SECS {
                warn!(
                    uid = %def.uid,
                    scan_time = def.scan_time,
                    "invalid scan time in catalog, clamping to minimum"
                );
                def.scan_time = MIN_SCAN_TIME_SECS;
            }
            for biome in &def.biome_affinity {
                biome_index
                    .entry(biome.clone())
                    .or_default()
                    .push(def.uid.clone());
            }
            items.insert(def.uid.clone(), def);
        }

        Ok(Self { items, biome_index })
    }

    /// Load a catalog from a RON document containing a list of
    /// `ItemDefinition`s.
    pub fn from_ron(source: &str) -> Result<Self, CatalogError> {
        let defs: Vec<ItemDefinition> = ron::from_str(source)?;
        Self::from_items(defs)
    }

    pub fn get(&self, uid: &str) -> Option<&ItemDefinition> {
        self.items.get(uid)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// All items registered for a biome (empty if the biome is unknown).
    pub fn items_in_biome(&self, biome: &str) -> Vec<&ItemDefinition> {
        self.biome_index
            .get(biome)
            .map(|uids| uids.iter().filter_map(|u| self.items.get(u)).collect())
            .unwrap_or_default()
    }

    /// Items of one rarity within a biome.
    pub fn items_in_biome_of_rarity(&self, biome: &str, rarity: Rarity) -> Vec<&ItemDefinition> {
        self.items_in_biome(biome)
            .into_iter()
            .filter(|d| d.rarity == rarity)
            .collect()
    }

    /// Biomes that have at least one registered item.
    pub fn known_biomes(&self) -> Vec<&str> {
        self.biome_index.keys().map(String::as_str).collect()
    }

    /// The built-in starter item set. Production loads RON data instead;
    /// this keeps the core usable without any external files.
    pub fn starter_catalog() -> Self {
        fn item(
            uid: &str,
            name: &str,
            rarity: Rarity,
            scan_time: f32,
            biomes: &[&str],
            unlock_threshold: u32,
        ) -> ItemDefinition {
            ItemDefinition {
                uid: uid.into(),
                display_name: name.into(),
                rarity,
                scan_time,
                biome_affinity: biomes.iter().map(|b| b.to_string()).collect(),
                unlock_threshold,
            }
        }

        let defs = vec![
            // Meadow
            item("rock_01", "Mossy Boulder", Rarity::Common, 1.5, &["meadow"], 0),
            item("fern_01", "Curled Fern", Rarity::Common, 1.5, &["meadow"], 0),
            item("dew_moth", "Dew Moth", Rarity::Uncommon, 2.5, &["meadow"], 0),
            item(
                "sun_beetle",
                "Sun Beetle",
                Rarity::Rare,
                4.0,
                &["meadow"],
                5,
            ),
            item(
                "aurora_lily",
                "Aurora Lily",
                Rarity::Legendary,
                6.0,
                &["meadow"],
                10,
            ),
            // Caverns (glowcap grows at the meadow border too)
            item(
                "glowcap",
                "Glowcap Mushroom",
                Rarity::Common,
                1.5,
                &["caverns", "meadow"],
                0,
            ),
            item("drip_snail", "Drip Snail", Rarity::Common, 2.0, &["caverns"], 0),
            item(
                "echo_cricket",
                "Echo Cricket",
                Rarity::Uncommon,
                3.0,
                &["caverns"],
                8,
            ),
            item(
                "vein_crystal",
                "Vein Crystal",
                Rarity::Rare,
                4.5,
                &["caverns"],
                12,
            ),
            item(
                "hollow_wyrm",
                "Hollow Wyrm",
                Rarity::Legendary,
                7.0,
                &["caverns"],
                20,
            ),
            // Peaks
            item("frost_lichen", "Frost Lichen", Rarity::Common, 2.0, &["peaks"], 0),
            item(
                "ridge_hawk",
                "Ridge Hawk",
                Rarity::Uncommon,
                3.5,
                &["peaks"],
                15,
            ),
            item(
                "storm_goat",
                "Storm Goat",
                Rarity::Rare,
                5.0,
                &["peaks"],
                20,
            ),
            item(
                "sky_whale",
                "Sky Whale",
                Rarity::Legendary,
                8.0,
                &["peaks"],
                30,
            ),
        ];

        // The starter set is validated in tests; duplicates here are a bug.
        Self::from_items(defs).expect("starter catalog must be valid")
    }
}

pub struct CatalogPlugin;

impl Plugin for CatalogPlugin {
    fn build(&self, app: &mut App) {
        if !app.world().contains_resource::<ItemCatalog>() {
            app.insert_resource(ItemCatalog::starter_catalog());
        }
    }
}

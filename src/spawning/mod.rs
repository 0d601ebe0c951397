//! Loot Spawn Engine
//!
//! Given a biome, produces a bounded-budget set of items for one
//! generated chunk. Point-budget loot table: one pity-adjusted
//! legendary roll, probability-gated rare and uncommon fill loops, then
//! unconditional common filler until the budget can't afford another
//! common. Selection within a rarity is uniform over the biome's pool.
//!
//! The pity counter only ever moves on legendary roll attempts: a
//! failure adds a fixed step (clamped at the cap), a success resets it
//! to exactly zero.

use bevy::prelude::*;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::catalog::{ItemCatalog, ItemDefinition, Rarity};
use crate::constants::{
    BASE_LEGENDARY_CHANCE, DEFAULT_BUDGET_MAX, DEFAULT_BUDGET_MIN, DEFAULT_SPAWN_SEED,
    PITY_CAP, PITY_INCREMENT, RARE_FILL_CHANCE, UNCOMMON_FILL_CHANCE,
};

/// Spawn tuning. Equal `budget_min`/`budget_max` gives the fixed test
/// budget; a range gives the randomized production budget.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LootConfig {
    pub base_legendary_chance: f32,
    pub pity_increment: f32,
    pub pity_cap: f32,
    pub rare_fill_chance: f32,
    pub uncommon_fill_chance: f32,
    pub budget_min: u32,
    pub budget_max: u32,
}

impl Default for LootConfig {
    fn default() -> Self {
        Self {
            base_legendary_chance: BASE_LEGENDARY_CHANCE,
            pity_increment: PITY_INCREMENT,
            pity_cap: PITY_CAP,
            rare_fill_chance: RARE_FILL_CHANCE,
            uncommon_fill_chance: UNCOMMON_FILL_CHANCE,
            budget_min: DEFAULT_BUDGET_MIN,
            budget_max: DEFAULT_BUDGET_MAX,
        }
    }
}

/// Spawn-side events for presentation layers.
#[derive(Event, Debug, Clone, PartialEq)]
pub enum LootEvent {
    LegendarySpawned { uid: String, biome: String },
    PityUpdated { value: f32 },
}

/// World-generation collaborator: one request per generated chunk.
#[derive(Event, Debug, Clone)]
pub struct ChunkSpawnRequest {
    pub biome: String,
}

/// Answer to a [`ChunkSpawnRequest`]. An empty item list means "no
/// spawn this chunk", never an error.
#[derive(Event, Debug, Clone)]
pub struct ChunkLootReady {
    pub biome: String,
    pub items: Vec<ItemDefinition>,
}

/// The spawn engine: pity counter + seeded RNG + config. One per
/// process; reseed or reset only via explicit call.
#[derive(Resource, Debug)]
pub struct LootSpawnEngine {
    config: LootConfig,
    pity: f32,
    rng: Xoshiro256PlusPlus,
    events: Vec<LootEvent>,
}

impl Default for LootSpawnEngine {
    fn default() -> Self {
        Self::with_seed(LootConfig::default(), DEFAULT_SPAWN_SEED)
    }
}

impl LootSpawnEngine {
    pub fn with_seed(config: LootConfig, seed: u64) -> Self {
        Self {
            config,
            pity: 0.0,
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
            events: Vec::new(),
        }
    }

    pub fn pity(&self) -> f32 {
        self.pity
    }

    pub fn config(&self) -> &LootConfig {
        &self.config
    }

    /// Debug/new-game path; pity is otherwise owned by the roll logic.
    pub fn reset_pity(&mut self) {
        self.pity = 0.0;
    }

    pub fn drain_events(&mut self) -> Vec<LootEvent> {
        std::mem::take(&mut self.events)
    }

    /// Generate the loot set for one chunk of `biome`.
    ///
    /// Empty biome pool is a configuration problem, not a crash: logs a
    /// warning and returns an empty list.
    pub fn generate_chunk_loot(
        &mut self,
        catalog: &ItemCatalog,
        biome: &str,
    ) -> Vec<ItemDefinition> {
        if catalog.items_in_biome(biome).is_empty() {
            warn!(biome, "no items registered for biome, spawning nothing");
            return Vec::new();
        }

        let legendaries = catalog.items_in_biome_of_rarity(biome, Rarity::Legendary);
        let rares = catalog.items_in_biome_of_rarity(biome, Rarity::Rare);
        let uncommons = catalog.items_in_biome_of_rarity(biome, Rarity::Uncommon);
        let commons = catalog.items_in_biome_of_rarity(biome, Rarity::Common);

        let budget = self.roll_budget();
        let mut remaining = budget;
        let mut result = Vec::new();

        // One legendary roll per invocation, pity-adjusted.
        let legendary_cost = Rarity::Legendary.point_cost();
        if !legendaries.is_empty() && remaining >= legendary_cost {
            let roll = self.rng.gen::<f32>();
            let pick = self.rng.gen_range(0..legendaries.len());
            if let Some(item) = self.legendary_roll(biome, &legendaries, roll, pick) {
                remaining -= legendary_cost;
                result.push(item);
            }
        }

        // Rare fill: stop on the first failed gate roll.
        let rare_cost = Rarity::Rare.point_cost();
        while remaining >= rare_cost && !rares.is_empty() {
            if self.rng.gen::<f32>() >= self.config.rare_fill_chance {
                break;
            }
            if let Some(item) = rares.choose(&mut self.rng) {
                result.push((*item).clone());
                remaining -= rare_cost;
            }
        }

        // Uncommon fill, same shape.
        let uncommon_cost = Rarity::Uncommon.point_cost();
        while remaining >= uncommon_cost && !uncommons.is_empty() {
            if self.rng.gen::<f32>() >= self.config.uncommon_fill_chance {
                break;
            }
            if let Some(item) = uncommons.choose(&mut self.rng) {
                result.push((*item).clone());
                remaining -= uncommon_cost;
            }
        }

        // Common filler exhausts the budget, no probability gate.
        let common_cost = Rarity::Common.point_cost();
        while remaining >= common_cost && !commons.is_empty() {
            if let Some(item) = commons.choose(&mut self.rng) {
                result.push((*item).clone());
                remaining -= common_cost;
            }
        }

        if remaining > 0 {
            debug!(biome, budget, leftover = remaining, "chunk budget partially spent");
        }

        result
    }

    /// The single legendary slot. Split out so tests can force roll and
    /// pick values; `generate_chunk_loot` feeds it from the engine RNG.
    pub fn legendary_roll(
        &mut self,
        biome: &str,
        legendaries: &[&ItemDefinition],
        roll: f32,
        pick: usize,
    ) -> Option<ItemDefinition> {
        if legendaries.is_empty() {
            return None;
        }
        let effective =
            (self.config.base_legendary_chance + self.pity).min(1.0);
        if roll < effective {
            self.pity = 0.0;
            let item = legendaries[pick % legendaries.len()].clone();
            self.events.push(LootEvent::LegendarySpawned {
                uid: item.uid.clone(),
                biome: biome.into(),
            });
            Some(item)
        } else {
            self.pity = (self.pity + self.config.pity_increment).min(self.config.pity_cap);
            self.events.push(LootEvent::PityUpdated { value: self.pity });
            None
        }
    }

    fn roll_budget(&mut self) -> u32 {
        let min = self.config.budget_min.min(self.config.budget_max);
        let max = self.config.budget_min.max(self.config.budget_max);
        if min == max {
            min
        } else {
            self.rng.gen_range(min..=max)
        }
    }
}

pub struct SpawnPlugin;

impl Plugin for SpawnPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<LootSpawnEngine>()
            .add_event::<LootEvent>()
            .add_event::<ChunkSpawnRequest>()
            .add_event::<ChunkLootReady>()
            .add_systems(Update, handle_chunk_requests);
    }
}

/// Answers world-generation chunk requests with generated loot sets.
pub fn handle_chunk_requests(
    mut requests: EventReader<ChunkSpawnRequest>,
    mut engine: ResMut<LootSpawnEngine>,
    catalog: Res<ItemCatalog>,
    mut ready: EventWriter<ChunkLootReady>,
    mut loot_events: EventWriter<LootEvent>,
) {
    for request in requests.read() {
        let items = engine.generate_chunk_loot(&catalog, &request.biome);
        ready.send(ChunkLootReady {
            biome: request.biome.clone(),
            items,
        });
    }
    for event in engine.drain_events() {
        loot_events.send(event);
    }
}

//! Expedition Game - Progression Core Library
//!
//! Deterministic progression logic for an exploration scanner game:
//! - Item catalog (rarity, scan times, biome affinity)
//! - Scan state machine (targeting/scanning timers, grace period)
//! - Discovery ledger (scan records, rarity-scaled tiers)
//! - Loot spawn engine (point-budget tables, legendary pity)
//! - Progression gates (biome unlocks)
//! - Persistence contract for the external save collaborator
//!
//! The core never touches rendering, spatial state or I/O: collaborators
//! feed it opaque uids and deltas, and it answers through typed events.

pub mod catalog;
pub mod constants;
pub mod ledger;
pub mod logging;
pub mod progression;
pub mod savedata;
pub mod scanner;
pub mod spawning;

use bevy::app::{App, Plugin};

/// Everything the progression core needs in one plugin: catalog,
/// scanner, ledger, spawn engine, progression gates and logging.
///
/// Insert a custom [`catalog::ItemCatalog`] resource before adding this
/// plugin to replace the built-in starter catalog.
pub struct ExpeditionCorePlugin;

impl Plugin for ExpeditionCorePlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((
            logging::LoggingPlugin,
            catalog::CatalogPlugin,
            scanner::ScannerPlugin,
            ledger::LedgerPlugin,
            spawning::SpawnPlugin,
            progression::ProgressionPlugin,
        ));
    }
}

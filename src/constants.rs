//! Centralized tuning constants for the progression core.
//!
//! Eliminates magic numbers duplicated across the scanner, spawn engine
//! and progression gates. Per-module data (starter catalog, gate tables)
//! remains in its module as the single source of truth.

// =====================================================
// Scanning
// =====================================================

/// Minimum accepted scan duration; shorter (or non-positive) values are
/// clamped here so progress never divides by zero.
pub const MIN_SCAN_TIME_SECS: f32 = 0.1;

/// Wall-clock window after target loss during which the scan can resume.
pub const GRACE_PERIOD_SECS: f32 = 2.0;

/// Progress lost per second while in the grace period (floor at 0).
pub const GRACE_DECAY_RATE: f32 = 0.25;

// =====================================================
// Loot Spawning
// =====================================================

/// Base chance of the single legendary roll per chunk.
pub const BASE_LEGENDARY_CHANCE: f32 = 0.05;

/// Pity bonus added after each failed legendary roll.
pub const PITY_INCREMENT: f32 = 0.05;

/// Pity never grows past this value.
pub const PITY_CAP: f32 = 1.0;

/// Per-iteration chance that the rare fill loop adds another rare item.
pub const RARE_FILL_CHANCE: f32 = 0.30;

/// Per-iteration chance that the uncommon fill loop adds another item.
pub const UNCOMMON_FILL_CHANCE: f32 = 0.50;

/// Production chunk point budget range (inclusive).
pub const DEFAULT_BUDGET_MIN: u32 = 12;
pub const DEFAULT_BUDGET_MAX: u32 = 20;

/// Seed for the spawn engine RNG when none is supplied.
pub const DEFAULT_SPAWN_SEED: u64 = 0x5EED_CA7A;

// =====================================================
// Progression
// =====================================================

/// Biome every new game starts in (always unlocked).
pub const STARTING_BIOME: &str = "meadow";

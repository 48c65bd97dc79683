//! Centralized balance and tuning constants for Podcrawl game logic.
//!
//! These values define the default math for the engine. Hosts may override
//! most of them through [`crate::config::EngineConfig`]; the defaults below
//! are the shipped balance.

// Logging keys -------------------------------------------------------------
pub(crate) const LOG_TARGET: &str = "podcrawl::session";

// Player and draw defaults -------------------------------------------------
pub(crate) const DEFAULT_POD_COUNT: usize = 6;
pub(crate) const DEFAULT_TOKENS_PER_POD: usize = 3;
pub(crate) const DEFAULT_DRAW_COUNT: usize = 6;
pub(crate) const DEFAULT_STARTING_HEALTH: u32 = 100;
pub(crate) const DEFAULT_STARTING_CURRENCY: u32 = 0;
pub(crate) const DEFAULT_REDRAWS_PER_ENCOUNTER: u8 = 1;
pub(crate) const DEFAULT_SELECTIVE_REDRAWS_PER_ENCOUNTER: u8 = 1;
pub(crate) const DEFAULT_SHOP_SIZE: usize = 4;

// Combat penalties ---------------------------------------------------------
pub(crate) const SECONDARY_FAIL_FLAT: f64 = 5.0;
pub(crate) const SECONDARY_FAIL_SCALE: f64 = 1.5;

// Encounter scaling --------------------------------------------------------
pub(crate) const SCALING_EXPONENT: f64 = 1.3;
pub(crate) const MAX_SCALING_EXPONENT: f64 = 4.0;
/// Depths over which threshold ordering is checked at validation time.
pub(crate) const SCALING_CHECK_DEPTH: u32 = 200;
pub(crate) const PRIMARY_BASE: f64 = 6.0;
pub(crate) const PRIMARY_LINEAR: f64 = 1.2;
pub(crate) const PRIMARY_EXPONENTIAL: f64 = 0.3;
pub(crate) const SECONDARY_BASE: f64 = 4.0;
pub(crate) const SECONDARY_LINEAR: f64 = 1.0;
pub(crate) const SECONDARY_EXPONENTIAL: f64 = 0.25;
pub(crate) const REWARD_BASE: f64 = 6.0;
pub(crate) const REWARD_LINEAR: f64 = 1.5;
pub(crate) const REWARD_PERIOD: u32 = 5;
pub(crate) const REWARD_PERIODIC_BONUS: f64 = 2.0;
pub(crate) const PREFIX_CHANCE_BASE: f64 = 0.1;
pub(crate) const PREFIX_CHANCE_PER_DEPTH: f64 = 0.03;
pub(crate) const PREFIX_CHANCE_CAP: f64 = 0.7;

// Encounter naming ---------------------------------------------------------
pub(crate) const NAME_TIER_CEILINGS: [u32; 4] = [5, 10, 15, 20];
pub(crate) const NAME_PREFIXES: [&str; 5] = ["Wild", "Fierce", "Ancient", "Corrupted", "Elite"];
pub(crate) const NAME_POOLS: [[&str; 5]; 5] = [
    ["Goblin", "Rat", "Slime", "Bat", "Spider"],
    ["Orc", "Skeleton", "Wolf", "Bandit", "Zombie"],
    ["Troll", "Ogre", "Wraith", "Golem", "Harpy"],
    ["Dragon", "Demon", "Lich", "Giant", "Hydra"],
    [
        "Elder Dragon",
        "Demon Lord",
        "Death Knight",
        "Titan",
        "Behemoth",
    ],
];

// Shop generation ----------------------------------------------------------
pub(crate) const SHOP_TIER_BREAKPOINTS: [u32; 4] = [5, 10, 15, 20];
pub(crate) const SHOP_UPGRADE_CHANCE: f64 = 0.30;
pub(crate) const SHOP_PRICE_FACTOR_MIN: f64 = 0.9;
pub(crate) const SHOP_PRICE_FACTOR_MAX: f64 = 1.2;
pub(crate) const SHOP_FOCUSED_CHANCE: f64 = 0.0;
pub(crate) const SHOP_FOCUSED_TREASURE_CHANCE: f64 = 0.4;

// Synergy tuning -----------------------------------------------------------
pub(crate) const PAIRING_BONUS_DIVISOR: u32 = 2;
pub(crate) const PAIRING_BONUS_MIN: u32 = 1;

// RNG ----------------------------------------------------------------------
pub(crate) const SESSION_RNG_DOMAIN: &[u8] = b"podcrawl.session";

/// Tolerance used when comparing floating point tuning values in tests.
#[cfg(test)]
pub(crate) const FLOAT_EPSILON: f64 = 1e-9;

//! Shop generation: depth-gated tiers, rank rolls, weighted kinds, and pricing.
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{ConfigError, validate_probability};
use crate::constants::{
    DEFAULT_SHOP_SIZE, SHOP_FOCUSED_CHANCE, SHOP_FOCUSED_TREASURE_CHANCE, SHOP_PRICE_FACTOR_MAX,
    SHOP_PRICE_FACTOR_MIN, SHOP_TIER_BREAKPOINTS, SHOP_UPGRADE_CHANCE,
};
use crate::numbers::{floor_f64_to_u32, u32_to_f64};
use crate::pod::{PodTemplate, TokenDef};
use crate::rank::{Rank, ValuePolicy};
use crate::token::TokenKind;

/// Depth bracket controlling rank floors and unlocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShopTier {
    One,
    Two,
    Three,
    Four,
    Five,
}

impl ShopTier {
    pub const ALL: [Self; 5] = [Self::One, Self::Two, Self::Three, Self::Four, Self::Five];

    /// Tier 1 below depth 5, tier 5 from depth 20.
    #[must_use]
    pub fn for_depth(depth: u32) -> Self {
        let unlocked = SHOP_TIER_BREAKPOINTS
            .iter()
            .filter(|&&breakpoint| depth >= breakpoint)
            .count();
        Self::ALL[unlocked.min(Self::ALL.len() - 1)]
    }

    /// Tiers unlocked at `depth`, lowest first.
    #[must_use]
    pub fn unlocked_at(depth: u32) -> &'static [Self] {
        let highest = Self::for_depth(depth);
        &Self::ALL[..=highest.index()]
    }

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::One => 0,
            Self::Two => 1,
            Self::Three => 2,
            Self::Four => 3,
            Self::Five => 4,
        }
    }

    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Three => 3,
            Self::Four => 4,
            Self::Five => 5,
        }
    }
}

impl fmt::Display for ShopTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tier {}", self.number())
    }
}

/// Rank rules for one tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierRules {
    /// Rank forced onto the first slot.
    pub min_rank: Rank,
    /// Starting rank for the remaining slots.
    pub base_rank: Rank,
    pub upgrade_chance: f64,
    pub max_upgrades: u8,
}

impl TierRules {
    const fn new(min_rank: Rank, base_rank: Rank, max_upgrades: u8) -> Self {
        Self {
            min_rank,
            base_rank,
            upgrade_chance: SHOP_UPGRADE_CHANCE,
            max_upgrades,
        }
    }
}

/// Shop tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopConfig {
    #[serde(default = "ShopConfig::default_tiers")]
    pub tiers: [TierRules; 5],
    #[serde(default = "ShopConfig::default_price_factor_min")]
    pub price_factor_min: f64,
    #[serde(default = "ShopConfig::default_price_factor_max")]
    pub price_factor_max: f64,
    /// Chance a pod is built around a single kind. Zero disables the mode.
    #[serde(default = "ShopConfig::default_focused_chance")]
    pub focused_chance: f64,
    /// Chance a focused pod's last slot turns into Treasure.
    #[serde(default = "ShopConfig::default_focused_treasure_chance")]
    pub focused_treasure_chance: f64,
    /// Pods generated per unlocked tier when building the offer pool.
    #[serde(default = "ShopConfig::default_pods_per_tier")]
    pub pods_per_tier: usize,
}

impl ShopConfig {
    #[must_use]
    pub const fn default_tiers() -> [TierRules; 5] {
        [
            TierRules::new(Rank::Bronze, Rank::Basic, 2),
            TierRules::new(Rank::Silver, Rank::Bronze, 2),
            TierRules::new(Rank::Gold, Rank::Silver, 2),
            TierRules::new(Rank::Platinum, Rank::Gold, 2),
            TierRules::new(Rank::Diamond, Rank::Platinum, 1),
        ]
    }

    #[must_use]
    pub const fn default_price_factor_min() -> f64 {
        SHOP_PRICE_FACTOR_MIN
    }

    #[must_use]
    pub const fn default_price_factor_max() -> f64 {
        SHOP_PRICE_FACTOR_MAX
    }

    #[must_use]
    pub const fn default_focused_chance() -> f64 {
        SHOP_FOCUSED_CHANCE
    }

    #[must_use]
    pub const fn default_focused_treasure_chance() -> f64 {
        SHOP_FOCUSED_TREASURE_CHANCE
    }

    #[must_use]
    pub const fn default_pods_per_tier() -> usize {
        DEFAULT_SHOP_SIZE
    }

    #[must_use]
    pub const fn rules(&self, tier: ShopTier) -> &TierRules {
        &self.tiers[tier.index()]
    }

    /// Validate tier rules, probabilities, and the price factor range.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` describing the first violated bound.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for tier in ShopTier::ALL {
            let rules = self.rules(tier);
            validate_probability("shop.tiers.upgrade_chance", rules.upgrade_chance)?;
            if rules.min_rank < Rank::Basic || rules.base_rank < Rank::Basic {
                return Err(ConfigError::InferiorShopRank {
                    tier: tier.number(),
                });
            }
        }
        validate_probability("shop.focused_chance", self.focused_chance)?;
        validate_probability("shop.focused_treasure_chance", self.focused_treasure_chance)?;
        if !(self.price_factor_min > 0.0 && self.price_factor_min < self.price_factor_max) {
            return Err(ConfigError::PriceFactorRange {
                min: self.price_factor_min,
                max: self.price_factor_max,
            });
        }
        if self.pods_per_tier == 0 {
            return Err(ConfigError::MinViolation {
                field: "shop.pods_per_tier",
                min: 1.0,
                value: 0.0,
            });
        }
        Ok(())
    }
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            tiers: Self::default_tiers(),
            price_factor_min: Self::default_price_factor_min(),
            price_factor_max: Self::default_price_factor_max(),
            focused_chance: Self::default_focused_chance(),
            focused_treasure_chance: Self::default_focused_treasure_chance(),
            pods_per_tier: Self::default_pods_per_tier(),
        }
    }
}

/// Kinds eligible at `depth` with their relative weights.
#[must_use]
pub fn weighted_kinds(depth: u32) -> Vec<(TokenKind, u32)> {
    TokenKind::ALL
        .into_iter()
        .filter(|kind| kind.available_at(depth))
        .map(|kind| (kind, kind.definition().weight))
        .filter(|(_, weight)| *weight > 0)
        .collect()
}

/// Single cumulative-weight roll over the kinds unlocked at `depth`.
pub fn choose_kind<R: Rng + ?Sized>(depth: u32, rng: &mut R) -> Option<TokenKind> {
    let weights = weighted_kinds(depth);
    let total: u32 = weights.iter().map(|(_, weight)| *weight).sum();
    if total == 0 {
        return None;
    }

    let roll = rng.gen_range(0..total);
    let mut current = 0;
    for (kind, weight) in &weights {
        current += *weight;
        if roll < current {
            return Some(*kind);
        }
    }

    weights.first().map(|(kind, _)| *kind)
}

/// Roll a slot's rank: forced minimum for the guaranteed slot, otherwise
/// climb from the base rank until a trial fails or the ceiling is reached.
pub fn roll_rank<R: Rng + ?Sized>(rules: &TierRules, guaranteed: bool, rng: &mut R) -> Rank {
    if guaranteed {
        return rules.min_rank;
    }
    let mut rank = rules.base_rank;
    for _ in 0..rules.max_upgrades {
        if rank == Rank::MAX || !rng.gen_bool(rules.upgrade_chance) {
            break;
        }
        rank = rank.upgrade();
    }
    rank
}

/// Builds purchasable pod templates for a session.
#[derive(Debug, Clone, Copy)]
pub struct ShopGenerator<'a> {
    config: &'a ShopConfig,
    policy: ValuePolicy,
    slots: usize,
}

impl<'a> ShopGenerator<'a> {
    #[must_use]
    pub const fn new(config: &'a ShopConfig, policy: ValuePolicy, slots: usize) -> Self {
        Self {
            config,
            policy,
            slots,
        }
    }

    /// Generate one pod template for `tier`, priced against its slot values.
    pub fn generate_pod<R: Rng + ?Sized>(
        &self,
        tier: ShopTier,
        depth: u32,
        rng: &mut R,
    ) -> PodTemplate {
        let rules = self.config.rules(tier);
        let focus = if rng.gen_bool(self.config.focused_chance) {
            Some(pick_kind(depth, rng))
        } else {
            None
        };

        let mut token_defs: Vec<TokenDef> = (0..self.slots)
            .map(|slot| {
                let rank = roll_rank(rules, slot == 0, rng);
                let kind = match focus {
                    Some(primary) => self.focused_kind(primary, slot, rng),
                    None => pick_kind(depth, rng),
                };
                TokenDef::new(kind, rank)
            })
            .collect();

        // Stable: equal ranks keep roll order.
        token_defs.sort_by(|a, b| b.rank_or_basic().cmp(&a.rank_or_basic()));

        let cost = self.price(&token_defs, rng);
        PodTemplate::new(token_defs, cost)
    }

    fn focused_kind<R: Rng + ?Sized>(
        &self,
        primary: TokenKind,
        slot: usize,
        rng: &mut R,
    ) -> TokenKind {
        let last_slot = slot + 1 == self.slots;
        if last_slot
            && primary != TokenKind::Treasure
            && rng.gen_bool(self.config.focused_treasure_chance)
        {
            TokenKind::Treasure
        } else {
            primary
        }
    }

    fn price<R: Rng + ?Sized>(&self, token_defs: &[TokenDef], rng: &mut R) -> u32 {
        let value: u32 = token_defs
            .iter()
            .map(|def| def.value(self.policy))
            .fold(0, u32::saturating_add);
        let factor = rng.gen_range(self.config.price_factor_min..self.config.price_factor_max);
        floor_f64_to_u32(u32_to_f64(value) * factor)
    }

    /// Offer pool for `depth`: fresh pods from every unlocked tier.
    pub fn available_pods<R: Rng + ?Sized>(&self, depth: u32, rng: &mut R) -> Vec<PodTemplate> {
        ShopTier::unlocked_at(depth)
            .iter()
            .flat_map(|&tier| {
                (0..self.config.pods_per_tier)
                    .map(|_| self.generate_pod(tier, depth, rng))
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

/// Weighted kind with a basic fallback; depth 1 always has eligible kinds.
fn pick_kind<R: Rng + ?Sized>(depth: u32, rng: &mut R) -> TokenKind {
    choose_kind(depth, rng).unwrap_or(TokenKind::Insight)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::mock::StepRng;
    use rand_chacha::ChaCha20Rng;
    use std::collections::{HashMap, HashSet};

    #[test]
    fn tiers_follow_breakpoints() {
        assert_eq!(ShopTier::for_depth(0), ShopTier::One);
        assert_eq!(ShopTier::for_depth(4), ShopTier::One);
        assert_eq!(ShopTier::for_depth(5), ShopTier::Two);
        assert_eq!(ShopTier::for_depth(10), ShopTier::Three);
        assert_eq!(ShopTier::for_depth(15), ShopTier::Four);
        assert_eq!(ShopTier::for_depth(19), ShopTier::Four);
        assert_eq!(ShopTier::for_depth(20), ShopTier::Five);
        assert_eq!(ShopTier::for_depth(500), ShopTier::Five);
    }

    #[test]
    fn unlocked_tiers_accumulate() {
        assert_eq!(ShopTier::unlocked_at(1), &[ShopTier::One]);
        assert_eq!(ShopTier::unlocked_at(12), &ShopTier::ALL[..3]);
        assert_eq!(ShopTier::unlocked_at(25), &ShopTier::ALL[..]);
    }

    #[test]
    fn depth_gated_kinds_never_appear_early() {
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        for _ in 0..500 {
            let kind = choose_kind(3, &mut rng).unwrap();
            assert!(kind.available_at(3), "{kind} rolled at depth 3");
        }
        let seen: HashSet<TokenKind> = (0..2_000)
            .filter_map(|_| choose_kind(30, &mut rng))
            .collect();
        assert_eq!(seen.len(), TokenKind::ALL.len());
    }

    #[test]
    fn kind_rolls_follow_configured_weights() {
        // Depth 5 pool: three weight-3 kinds and the weight-1 Lock/Key pair.
        let mut rng = ChaCha20Rng::seed_from_u64(17);
        let mut counts: HashMap<TokenKind, u32> = HashMap::new();
        for _ in 0..22_000 {
            let kind = choose_kind(5, &mut rng).unwrap();
            *counts.entry(kind).or_default() += 1;
        }
        assert_eq!(counts.len(), 5);
        for heavy in [TokenKind::Insight, TokenKind::Composure, TokenKind::Treasure] {
            for light in [TokenKind::Lock, TokenKind::Key] {
                let ratio = u32_to_f64(counts[&heavy]) / u32_to_f64(counts[&light]);
                assert!((2.5..3.5).contains(&ratio), "{heavy}/{light} ratio {ratio}");
            }
        }
    }

    #[test]
    fn generated_pods_respect_depth_gates() {
        let config = ShopConfig {
            focused_chance: 0.5,
            ..ShopConfig::default()
        };
        let generator = ShopGenerator::new(&config, ValuePolicy::DirectRank, 3);
        let mut rng = ChaCha20Rng::seed_from_u64(23);
        for depth in 1..4 {
            for tier in ShopTier::ALL {
                for _ in 0..200 {
                    let pod = generator.generate_pod(tier, depth, &mut rng);
                    for def in &pod.token_defs {
                        assert!(
                            !matches!(def.kind, TokenKind::Lock | TokenKind::Key),
                            "{} in a {tier} pod at depth {depth}",
                            def.kind
                        );
                        assert!(def.kind.available_at(depth));
                    }
                }
            }
        }
    }

    #[test]
    fn guaranteed_slot_uses_min_rank() {
        let rules = ShopConfig::default_tiers()[2];
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        assert_eq!(roll_rank(&rules, true, &mut rng), Rank::Gold);
    }

    #[test]
    fn upgrades_stop_at_max_attempts_and_ceiling() {
        // StepRng(0, 0) makes every Bernoulli trial succeed.
        let mut always = StepRng::new(0, 0);
        let rules = ShopConfig::default_tiers()[0];
        assert_eq!(roll_rank(&rules, false, &mut always), Rank::Silver);

        let top = ShopConfig::default_tiers()[4];
        assert_eq!(roll_rank(&top, false, &mut always), Rank::Diamond);

        let capped = TierRules {
            min_rank: Rank::Diamond,
            base_rank: Rank::Diamond,
            upgrade_chance: 1.0,
            max_upgrades: 3,
        };
        assert_eq!(roll_rank(&capped, false, &mut always), Rank::Diamond);

        let never = TierRules {
            upgrade_chance: 0.0,
            ..rules
        };
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        assert_eq!(roll_rank(&never, false, &mut rng), Rank::Basic);
    }

    #[test]
    fn generated_pods_are_sorted_and_priced_in_range() {
        let config = ShopConfig::default();
        let generator = ShopGenerator::new(&config, ValuePolicy::DirectRank, 3);
        let mut rng = ChaCha20Rng::seed_from_u64(9);
        for tier in ShopTier::ALL {
            for _ in 0..100 {
                let pod = generator.generate_pod(tier, 25, &mut rng);
                assert_eq!(pod.token_defs.len(), 3);
                let ranks: Vec<Rank> = pod.token_defs.iter().map(TokenDef::rank_or_basic).collect();
                assert!(ranks.windows(2).all(|pair| pair[0] >= pair[1]));
                assert!(ranks[0] >= config.rules(tier).min_rank);

                let value = u32_to_f64(pod.total_value(ValuePolicy::DirectRank));
                let cost = u32_to_f64(pod.cost);
                assert!(cost >= (value * 0.9).floor());
                assert!(cost <= (value * 1.2).floor());
            }
        }
    }

    #[test]
    fn focused_mode_builds_single_kind_pods() {
        let config = ShopConfig {
            focused_chance: 1.0,
            focused_treasure_chance: 0.0,
            ..ShopConfig::default()
        };
        let generator = ShopGenerator::new(&config, ValuePolicy::DirectRank, 3);
        let mut rng = ChaCha20Rng::seed_from_u64(4);
        for _ in 0..50 {
            let pod = generator.generate_pod(ShopTier::One, 1, &mut rng);
            let kinds: HashSet<TokenKind> = pod.token_defs.iter().map(|def| def.kind).collect();
            assert_eq!(kinds.len(), 1);
        }
    }

    #[test]
    fn available_pods_span_unlocked_tiers() {
        let config = ShopConfig::default();
        let generator = ShopGenerator::new(&config, ValuePolicy::DirectRank, 3);
        let mut rng = ChaCha20Rng::seed_from_u64(12);
        assert_eq!(generator.available_pods(1, &mut rng).len(), config.pods_per_tier);
        let pool = generator.available_pods(16, &mut rng);
        assert_eq!(pool.len(), config.pods_per_tier * 4);
        assert!(
            pool.iter()
                .any(|pod| pod.token_defs[0].rank_or_basic() >= Rank::Platinum)
        );
    }

    #[test]
    fn inverted_price_range_is_rejected() {
        let config = ShopConfig {
            price_factor_min: 1.3,
            ..ShopConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::PriceFactorRange { .. })
        ));
        let inferior = ShopConfig {
            tiers: [TierRules::new(Rank::Inferior, Rank::Basic, 1); 5],
            ..ShopConfig::default()
        };
        assert_eq!(
            inferior.validate(),
            Err(ConfigError::InferiorShopRank { tier: 1 })
        );
    }
}

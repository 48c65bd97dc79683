//! Encounter generation: depth-scaled thresholds, rewards, and procedural names.
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::constants::{
    MAX_SCALING_EXPONENT, NAME_POOLS, NAME_PREFIXES, NAME_TIER_CEILINGS, PREFIX_CHANCE_BASE,
    PREFIX_CHANCE_CAP, PREFIX_CHANCE_PER_DEPTH, PRIMARY_BASE, PRIMARY_EXPONENTIAL,
    PRIMARY_LINEAR, REWARD_BASE, REWARD_LINEAR, REWARD_PERIOD, REWARD_PERIODIC_BONUS,
    SCALING_CHECK_DEPTH, SCALING_EXPONENT, SECONDARY_BASE, SECONDARY_EXPONENTIAL,
    SECONDARY_LINEAR,
};
use crate::numbers::{floor_f64_to_u32, u32_to_f64};

/// A single generated foe. Immutable once generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encounter {
    pub name: String,
    /// Insight needed to overcome the encounter.
    pub primary_threshold: u32,
    /// Composure needed to avoid the failure penalty.
    pub secondary_threshold: u32,
    /// Treasure granted when the primary check succeeds.
    pub reward: u32,
    pub depth: u32,
}

/// `floor(base + depth * linear + depth^exponent * exponential)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdCurve {
    pub base: f64,
    pub linear: f64,
    pub exponential: f64,
}

impl ThresholdCurve {
    #[must_use]
    pub fn at(&self, depth: u32, exponent: f64) -> u32 {
        let d = u32_to_f64(depth);
        floor_f64_to_u32(self.base + d * self.linear + d.powf(exponent) * self.exponential)
    }
}

/// `floor(base + depth * linear + floor(depth / period) * periodic_bonus)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RewardCurve {
    pub base: f64,
    pub linear: f64,
    pub period: u32,
    pub periodic_bonus: f64,
}

impl RewardCurve {
    #[must_use]
    pub fn at(&self, depth: u32) -> u32 {
        let d = u32_to_f64(depth);
        let steps = u32_to_f64(depth / self.period.max(1));
        floor_f64_to_u32(self.base + d * self.linear + steps * self.periodic_bonus)
    }
}

/// Difficulty and reward curves driven by depth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterScaling {
    #[serde(default = "EncounterScaling::default_exponent")]
    pub exponent: f64,
    #[serde(default = "EncounterScaling::default_primary")]
    pub primary: ThresholdCurve,
    #[serde(default = "EncounterScaling::default_secondary")]
    pub secondary: ThresholdCurve,
    #[serde(default = "EncounterScaling::default_reward")]
    pub reward: RewardCurve,
}

impl EncounterScaling {
    #[must_use]
    pub const fn default_exponent() -> f64 {
        SCALING_EXPONENT
    }

    #[must_use]
    pub const fn default_primary() -> ThresholdCurve {
        ThresholdCurve {
            base: PRIMARY_BASE,
            linear: PRIMARY_LINEAR,
            exponential: PRIMARY_EXPONENTIAL,
        }
    }

    #[must_use]
    pub const fn default_secondary() -> ThresholdCurve {
        ThresholdCurve {
            base: SECONDARY_BASE,
            linear: SECONDARY_LINEAR,
            exponential: SECONDARY_EXPONENTIAL,
        }
    }

    #[must_use]
    pub const fn default_reward() -> RewardCurve {
        RewardCurve {
            base: REWARD_BASE,
            linear: REWARD_LINEAR,
            period: REWARD_PERIOD,
            periodic_bonus: REWARD_PERIODIC_BONUS,
        }
    }

    #[must_use]
    pub fn primary_threshold(&self, depth: u32) -> u32 {
        self.primary.at(depth, self.exponent)
    }

    #[must_use]
    pub fn secondary_threshold(&self, depth: u32) -> u32 {
        self.secondary.at(depth, self.exponent)
    }

    #[must_use]
    pub fn reward(&self, depth: u32) -> u32 {
        self.reward.at(depth)
    }

    /// The primary curve must dominate the secondary one at every depth, and
    /// both curves and the reward must be non-decreasing. Ordering is also
    /// checked row by row over the first [`SCALING_CHECK_DEPTH`] depths, which
    /// rejects curves steep enough to saturate both thresholds.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` describing the first violated bound.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=MAX_SCALING_EXPONENT).contains(&self.exponent) {
            return Err(ConfigError::RangeViolation {
                field: "scaling.exponent",
                min: 0.0,
                max: MAX_SCALING_EXPONENT,
                value: self.exponent,
            });
        }
        let coefficients = [
            ("scaling.secondary.linear", self.secondary.linear),
            ("scaling.secondary.exponential", self.secondary.exponential),
            ("scaling.reward.linear", self.reward.linear),
            ("scaling.reward.periodic_bonus", self.reward.periodic_bonus),
        ];
        for (field, value) in coefficients {
            if value < 0.0 {
                return Err(ConfigError::MinViolation {
                    field,
                    min: 0.0,
                    value,
                });
            }
        }
        if self.reward.period == 0 {
            return Err(ConfigError::MinViolation {
                field: "scaling.reward.period",
                min: 1.0,
                value: 0.0,
            });
        }
        // A base gap of at least one point survives flooring.
        let dominated = self.primary.base - self.secondary.base >= 1.0
            && self.primary.linear > self.secondary.linear
            && self.primary.exponential > self.secondary.exponential;
        if !dominated {
            return Err(ConfigError::ThresholdOrdering {
                depth: 1,
                primary: self.primary_threshold(1),
                secondary: self.secondary_threshold(1),
            });
        }
        if let Some(row) = preview_scaling(SCALING_CHECK_DEPTH, self)
            .find(|row| row.primary_threshold <= row.secondary_threshold)
        {
            return Err(ConfigError::ThresholdOrdering {
                depth: row.depth,
                primary: row.primary_threshold,
                secondary: row.secondary_threshold,
            });
        }
        Ok(())
    }
}

impl Default for EncounterScaling {
    fn default() -> Self {
        Self {
            exponent: Self::default_exponent(),
            primary: Self::default_primary(),
            secondary: Self::default_secondary(),
            reward: Self::default_reward(),
        }
    }
}

/// One row of [`preview_scaling`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalingRow {
    pub depth: u32,
    pub primary_threshold: u32,
    pub secondary_threshold: u32,
    pub reward: u32,
}

/// Index into the name pools for `depth`: brackets ≤5, ≤10, ≤15, ≤20, >20.
#[must_use]
pub fn name_tier(depth: u32) -> usize {
    NAME_TIER_CEILINGS
        .iter()
        .position(|&ceiling| depth <= ceiling)
        .unwrap_or(NAME_TIER_CEILINGS.len())
}

/// Chance of a prefix, rising with depth and capped at 0.7.
#[must_use]
pub fn prefix_chance(depth: u32) -> f64 {
    (PREFIX_CHANCE_BASE + u32_to_f64(depth) * PREFIX_CHANCE_PER_DEPTH).min(PREFIX_CHANCE_CAP)
}

/// Pick a name from the depth's tier, sometimes with a prefix.
pub fn generate_name<R: Rng + ?Sized>(depth: u32, rng: &mut R) -> String {
    let pool = &NAME_POOLS[name_tier(depth)];
    let base = pool[rng.gen_range(0..pool.len())];
    if rng.gen_bool(prefix_chance(depth)) {
        let prefix = NAME_PREFIXES[rng.gen_range(0..NAME_PREFIXES.len())];
        format!("{prefix} {base}")
    } else {
        base.to_string()
    }
}

/// Generate the encounter for `depth` (clamped to at least 1).
pub fn generate_encounter<R: Rng + ?Sized>(
    depth: u32,
    scaling: &EncounterScaling,
    rng: &mut R,
) -> Encounter {
    let depth = depth.max(1);
    Encounter {
        name: generate_name(depth, rng),
        primary_threshold: scaling.primary_threshold(depth),
        secondary_threshold: scaling.secondary_threshold(depth),
        reward: scaling.reward(depth),
        depth,
    }
}

/// Lazily tabulate thresholds and rewards for depths `1..=max_depth`.
pub fn preview_scaling(
    max_depth: u32,
    scaling: &EncounterScaling,
) -> impl Iterator<Item = ScalingRow> + '_ {
    (1..=max_depth).map(move |depth| ScalingRow {
        depth,
        primary_threshold: scaling.primary_threshold(depth),
        secondary_threshold: scaling.secondary_threshold(depth),
        reward: scaling.reward(depth),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::FLOAT_EPSILON;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn default_curves_match_reference_points() {
        let scaling = EncounterScaling::default();
        assert_eq!(scaling.primary_threshold(1), 7);
        assert_eq!(scaling.secondary_threshold(1), 5);
        assert_eq!(scaling.reward(1), 7);
        assert_eq!(scaling.reward(5), 15);
        assert_eq!(scaling.reward(10), 25);
    }

    #[test]
    fn primary_always_exceeds_secondary() {
        let scaling = EncounterScaling::default();
        for row in preview_scaling(500, &scaling) {
            assert!(
                row.primary_threshold > row.secondary_threshold,
                "depth {}",
                row.depth
            );
        }
    }

    #[test]
    fn thresholds_and_rewards_never_decrease() {
        let scaling = EncounterScaling::default();
        let rows: Vec<ScalingRow> = preview_scaling(200, &scaling).collect();
        assert_eq!(rows.len(), 200);
        for pair in rows.windows(2) {
            assert!(pair[1].primary_threshold >= pair[0].primary_threshold);
            assert!(pair[1].secondary_threshold >= pair[0].secondary_threshold);
            assert!(pair[1].reward >= pair[0].reward);
        }
    }

    #[test]
    fn preview_is_lazy_and_empty_for_zero() {
        let scaling = EncounterScaling::default();
        assert_eq!(preview_scaling(0, &scaling).count(), 0);
        let first = preview_scaling(u32::MAX, &scaling).next().unwrap();
        assert_eq!(first.depth, 1);
    }

    #[test]
    fn name_tiers_follow_brackets() {
        assert_eq!(name_tier(1), 0);
        assert_eq!(name_tier(5), 0);
        assert_eq!(name_tier(6), 1);
        assert_eq!(name_tier(15), 2);
        assert_eq!(name_tier(20), 3);
        assert_eq!(name_tier(21), 4);
        assert_eq!(name_tier(u32::MAX), 4);
    }

    #[test]
    fn prefix_chance_rises_and_caps() {
        assert!((prefix_chance(1) - 0.13).abs() < FLOAT_EPSILON);
        let mut previous = 0.0;
        for depth in 1..100 {
            let chance = prefix_chance(depth);
            assert!(chance >= previous);
            assert!(chance <= PREFIX_CHANCE_CAP);
            previous = chance;
        }
        assert!((prefix_chance(1000) - PREFIX_CHANCE_CAP).abs() < FLOAT_EPSILON);
    }

    #[test]
    fn names_come_from_the_depth_tier() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        for depth in [1, 7, 12, 18, 40] {
            let pool = &NAME_POOLS[name_tier(depth)];
            for _ in 0..50 {
                let name = generate_name(depth, &mut rng);
                assert!(
                    pool.iter().any(|base| name.ends_with(base)),
                    "{name} not in tier for depth {depth}"
                );
            }
        }
    }

    #[test]
    fn encounters_are_deterministic_per_seed() {
        let scaling = EncounterScaling::default();
        let mut a = ChaCha20Rng::seed_from_u64(77);
        let mut b = ChaCha20Rng::seed_from_u64(77);
        for depth in 1..30 {
            assert_eq!(
                generate_encounter(depth, &scaling, &mut a),
                generate_encounter(depth, &scaling, &mut b)
            );
        }
        let zero = generate_encounter(0, &scaling, &mut a);
        assert_eq!(zero.depth, 1);
    }

    #[test]
    fn steep_or_non_finite_exponents_fail_validation() {
        for exponent in [400.0, 4.5, f64::INFINITY, f64::NAN, -0.5] {
            let scaling = EncounterScaling {
                exponent,
                ..EncounterScaling::default()
            };
            assert!(
                matches!(
                    scaling.validate(),
                    Err(ConfigError::RangeViolation { field: "scaling.exponent", .. })
                ),
                "{exponent}"
            );
        }
        let steepest = EncounterScaling {
            exponent: MAX_SCALING_EXPONENT,
            ..EncounterScaling::default()
        };
        assert_eq!(steepest.validate(), Ok(()));
    }

    #[test]
    fn saturating_curves_fail_validation() {
        let scaling = EncounterScaling {
            exponent: MAX_SCALING_EXPONENT,
            primary: ThresholdCurve {
                exponential: 3.0e8,
                ..EncounterScaling::default_primary()
            },
            secondary: ThresholdCurve {
                exponential: 2.8e8,
                ..EncounterScaling::default_secondary()
            },
            ..EncounterScaling::default()
        };
        assert!(scaling.primary_threshold(1) > scaling.secondary_threshold(1));
        assert_eq!(scaling.primary_threshold(2), u32::MAX);
        assert_eq!(scaling.secondary_threshold(2), u32::MAX);
        assert_eq!(
            scaling.validate(),
            Err(ConfigError::ThresholdOrdering {
                depth: 2,
                primary: u32::MAX,
                secondary: u32::MAX,
            })
        );
    }

    #[test]
    fn inverted_curves_fail_validation() {
        let mut scaling = EncounterScaling::default();
        assert_eq!(scaling.validate(), Ok(()));
        scaling.secondary.base = scaling.primary.base;
        assert!(matches!(
            scaling.validate(),
            Err(ConfigError::ThresholdOrdering { .. })
        ));
    }
}

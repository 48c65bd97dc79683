//! Engine configuration and its validation.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::combat::CombatRules;
use crate::constants::{
    DEFAULT_DRAW_COUNT, DEFAULT_POD_COUNT, DEFAULT_REDRAWS_PER_ENCOUNTER,
    DEFAULT_SELECTIVE_REDRAWS_PER_ENCOUNTER, DEFAULT_SHOP_SIZE, DEFAULT_STARTING_CURRENCY,
    DEFAULT_STARTING_HEALTH, DEFAULT_TOKENS_PER_POD,
};
use crate::encounter::EncounterScaling;
use crate::pod::{PodTemplate, starting_templates};
use crate::rank::ValuePolicy;
use crate::shop::ShopConfig;
use crate::token::TokenKind;

/// Errors raised when engine configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("draw count {draw_count} exceeds the {pool_size} tokens owned at game start")]
    DrawExceedsPool { draw_count: usize, pool_size: usize },
    #[error("{field} must be at least {min} (got {value})")]
    MinViolation {
        field: &'static str,
        min: f64,
        value: f64,
    },
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("starting pod {index} has {found} tokens, expected {expected}")]
    PodSize {
        index: usize,
        found: usize,
        expected: usize,
    },
    #[error("expected {expected} starting pods, found {found}")]
    StartingPodCount { expected: usize, found: usize },
    #[error("no token kind is available for shop rolls at depth {depth}")]
    EmptyWeightedPool { depth: u32 },
    #[error("primary threshold {primary} does not exceed secondary threshold {secondary} at depth {depth}")]
    ThresholdOrdering {
        depth: u32,
        primary: u32,
        secondary: u32,
    },
    #[error("shop tier {tier} may not roll inferior tokens")]
    InferiorShopRank { tier: u8 },
    #[error("price factor range [{min:.2}, {max:.2}) is empty")]
    PriceFactorRange { min: f64, max: f64 },
    #[error("invalid engine config JSON: {0}")]
    Parse(String),
}

/// Complete tuning surface for a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "EngineConfig::default_pod_count")]
    pub pod_count: usize,
    #[serde(default = "EngineConfig::default_tokens_per_pod")]
    pub tokens_per_pod: usize,
    #[serde(default = "EngineConfig::default_draw_count")]
    pub draw_count: usize,
    #[serde(default = "EngineConfig::default_starting_health")]
    pub starting_health: u32,
    #[serde(default = "EngineConfig::default_starting_currency")]
    pub starting_currency: u32,
    #[serde(default = "EngineConfig::default_redraws")]
    pub redraws_per_encounter: u8,
    #[serde(default = "EngineConfig::default_selective_redraws")]
    pub selective_redraws_per_encounter: u8,
    #[serde(default = "EngineConfig::default_shop_size")]
    pub shop_size: usize,
    #[serde(default)]
    pub value_policy: ValuePolicy,
    #[serde(default)]
    pub combat: CombatRules,
    #[serde(default)]
    pub scaling: EncounterScaling,
    #[serde(default)]
    pub shop: ShopConfig,
    #[serde(default = "starting_templates")]
    pub starting_pods: Vec<PodTemplate>,
}

impl EngineConfig {
    #[must_use]
    pub const fn default_pod_count() -> usize {
        DEFAULT_POD_COUNT
    }

    #[must_use]
    pub const fn default_tokens_per_pod() -> usize {
        DEFAULT_TOKENS_PER_POD
    }

    #[must_use]
    pub const fn default_draw_count() -> usize {
        DEFAULT_DRAW_COUNT
    }

    #[must_use]
    pub const fn default_starting_health() -> u32 {
        DEFAULT_STARTING_HEALTH
    }

    #[must_use]
    pub const fn default_starting_currency() -> u32 {
        DEFAULT_STARTING_CURRENCY
    }

    #[must_use]
    pub const fn default_redraws() -> u8 {
        DEFAULT_REDRAWS_PER_ENCOUNTER
    }

    #[must_use]
    pub const fn default_selective_redraws() -> u8 {
        DEFAULT_SELECTIVE_REDRAWS_PER_ENCOUNTER
    }

    #[must_use]
    pub const fn default_shop_size() -> usize {
        DEFAULT_SHOP_SIZE
    }

    /// Parse a configuration from JSON and validate it.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed JSON, or the first violated
    /// invariant otherwise.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self =
            serde_json::from_str(json).map_err(|err| ConfigError::Parse(err.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Total tokens owned at the start of a game.
    #[must_use]
    pub fn starting_pool_size(&self) -> usize {
        self.starting_pods
            .iter()
            .map(|template| template.token_defs.len())
            .sum()
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when any field violates the documented bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_pods()?;
        self.validate_draw()?;
        if self.starting_health == 0 {
            return Err(ConfigError::MinViolation {
                field: "starting_health",
                min: 1.0,
                value: 0.0,
            });
        }
        if self.shop_size == 0 {
            return Err(ConfigError::MinViolation {
                field: "shop_size",
                min: 1.0,
                value: 0.0,
            });
        }
        if !TokenKind::ALL.into_iter().any(|kind| kind.available_at(1)) {
            return Err(ConfigError::EmptyWeightedPool { depth: 1 });
        }
        self.combat.validate()?;
        self.scaling.validate()?;
        self.shop.validate()?;
        Ok(())
    }

    fn validate_pods(&self) -> Result<(), ConfigError> {
        if self.tokens_per_pod == 0 {
            return Err(ConfigError::MinViolation {
                field: "tokens_per_pod",
                min: 1.0,
                value: 0.0,
            });
        }
        if self.starting_pods.len() != self.pod_count {
            return Err(ConfigError::StartingPodCount {
                expected: self.pod_count,
                found: self.starting_pods.len(),
            });
        }
        for (index, template) in self.starting_pods.iter().enumerate() {
            if template.token_defs.len() != self.tokens_per_pod {
                return Err(ConfigError::PodSize {
                    index,
                    found: template.token_defs.len(),
                    expected: self.tokens_per_pod,
                });
            }
        }
        Ok(())
    }

    fn validate_draw(&self) -> Result<(), ConfigError> {
        if self.draw_count == 0 {
            return Err(ConfigError::MinViolation {
                field: "draw_count",
                min: 1.0,
                value: 0.0,
            });
        }
        let pool_size = self.starting_pool_size();
        if self.draw_count > pool_size {
            return Err(ConfigError::DrawExceedsPool {
                draw_count: self.draw_count,
                pool_size,
            });
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pod_count: Self::default_pod_count(),
            tokens_per_pod: Self::default_tokens_per_pod(),
            draw_count: Self::default_draw_count(),
            starting_health: Self::default_starting_health(),
            starting_currency: Self::default_starting_currency(),
            redraws_per_encounter: Self::default_redraws(),
            selective_redraws_per_encounter: Self::default_selective_redraws(),
            shop_size: Self::default_shop_size(),
            value_policy: ValuePolicy::default(),
            combat: CombatRules::default(),
            scaling: EncounterScaling::default(),
            shop: ShopConfig::default(),
            starting_pods: starting_templates(),
        }
    }
}

/// Probability fields must sit inside `[0, 1]`.
pub(crate) fn validate_probability(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::RangeViolation {
            field,
            min: 0.0,
            max: 1.0,
            value,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pod::TokenDef;

    #[test]
    fn defaults_validate() {
        assert_eq!(EngineConfig::default().validate(), Ok(()));
        assert_eq!(EngineConfig::default().starting_pool_size(), 18);
    }

    #[test]
    fn draw_count_above_pool_is_rejected() {
        let cfg = EngineConfig {
            draw_count: 19,
            ..EngineConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::DrawExceedsPool {
                draw_count: 19,
                pool_size: 18
            })
        );
    }

    #[test]
    fn mismatched_pod_shapes_are_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.starting_pods[2]
            .token_defs
            .push(TokenDef::basic(TokenKind::Insight));
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::PodSize { index: 2, .. })
        ));

        let mut cfg = EngineConfig::default();
        cfg.starting_pods.pop();
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::StartingPodCount { .. })
        ));
    }

    #[test]
    fn json_overrides_merge_with_defaults() {
        let cfg = EngineConfig::from_json(
            r#"{ "draw_count": 9, "starting_health": 40, "value_policy": "base_times_multiplier" }"#,
        )
        .unwrap();
        assert_eq!(cfg.draw_count, 9);
        assert_eq!(cfg.starting_health, 40);
        assert_eq!(cfg.value_policy, ValuePolicy::BaseTimesMultiplier);
        assert_eq!(cfg.shop_size, DEFAULT_SHOP_SIZE);
        assert_eq!(cfg.starting_pods.len(), DEFAULT_POD_COUNT);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            EngineConfig::from_json("{ not json"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            EngineConfig::from_json(r#"{ "draw_count": 0 }"#),
            Err(ConfigError::MinViolation {
                field: "draw_count",
                ..
            })
        ));
    }

    #[test]
    fn probability_bounds() {
        assert!(validate_probability("p", 0.0).is_ok());
        assert!(validate_probability("p", 1.0).is_ok());
        assert!(validate_probability("p", 1.01).is_err());
        assert!(validate_probability("p", f64::NAN).is_err());
    }
}

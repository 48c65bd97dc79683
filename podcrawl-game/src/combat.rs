//! Combat resolution: stat totals from a draw checked against an encounter.
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::constants::{SECONDARY_FAIL_FLAT, SECONDARY_FAIL_SCALE};
use crate::encounter::Encounter;
use crate::numbers::{floor_f64_to_u32, u32_to_f64};
use crate::rank::ValuePolicy;
use crate::token::{StatTotals, Token};

/// Penalty applied when the composure check fails.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CombatRules {
    #[serde(default = "CombatRules::default_flat_penalty")]
    pub flat_penalty: f64,
    /// Health lost per point of composure deficiency.
    #[serde(default = "CombatRules::default_scale_penalty")]
    pub scale_penalty: f64,
}

impl CombatRules {
    #[must_use]
    pub const fn default_flat_penalty() -> f64 {
        SECONDARY_FAIL_FLAT
    }

    #[must_use]
    pub const fn default_scale_penalty() -> f64 {
        SECONDARY_FAIL_SCALE
    }

    /// `floor(flat + deficiency * scale)`.
    #[must_use]
    pub fn penalty(&self, deficiency: u32) -> u32 {
        floor_f64_to_u32(self.flat_penalty + u32_to_f64(deficiency) * self.scale_penalty)
    }

    /// # Errors
    ///
    /// Returns `ConfigError::MinViolation` for negative penalty terms.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("combat.flat_penalty", self.flat_penalty),
            ("combat.scale_penalty", self.scale_penalty),
        ] {
            if value.is_nan() || value < 0.0 {
                return Err(ConfigError::MinViolation {
                    field,
                    min: 0.0,
                    value,
                });
            }
        }
        Ok(())
    }
}

impl Default for CombatRules {
    fn default() -> Self {
        Self {
            flat_penalty: Self::default_flat_penalty(),
            scale_penalty: Self::default_scale_penalty(),
        }
    }
}

/// Outcome of one combat. Computed purely; the session applies it afterward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatResult {
    pub totals: StatTotals,
    pub primary_success: bool,
    pub secondary_success: bool,
    /// Insight above the primary threshold; zero on failure.
    pub surplus: u32,
    /// Composure short of the secondary threshold; zero on success.
    pub deficiency: u32,
    pub resource_lost: u32,
    /// Treasure drawn plus the reward when the primary check succeeds.
    pub currency_gained: u32,
    /// Reward portion of `currency_gained`.
    pub bonus_reward: u32,
    pub thresholds_cleared: u8,
    pub encounter: Encounter,
}

impl CombatResult {
    /// Plain-text outcome lines for a presentation layer.
    #[must_use]
    pub fn summary_lines(&self) -> Vec<String> {
        let encounter = &self.encounter;
        let mut lines = Vec::with_capacity(4);
        if self.primary_success {
            lines.push(format!(
                "Insight {} vs {}: {} overcome with {} to spare",
                self.totals.insight, encounter.primary_threshold, encounter.name, self.surplus
            ));
        } else {
            lines.push(format!(
                "Insight {} vs {}: {} was not overcome",
                self.totals.insight, encounter.primary_threshold, encounter.name
            ));
        }
        if self.secondary_success {
            lines.push(format!(
                "Composure {} vs {}: held firm",
                self.totals.composure, encounter.secondary_threshold
            ));
        } else {
            lines.push(format!(
                "Composure {} vs {}: short by {}, lost {} health",
                self.totals.composure,
                encounter.secondary_threshold,
                self.deficiency,
                self.resource_lost
            ));
        }
        lines.push(format!(
            "Treasure: {} drawn + {} reward = {}",
            self.totals.treasure, self.bonus_reward, self.currency_gained
        ));
        lines
    }
}

/// Sum every token's contribution within `draw`, starting from zeroed totals.
#[must_use]
pub fn calculate_draw_totals(draw: &[Token], policy: ValuePolicy) -> StatTotals {
    let mut totals = StatTotals::default();
    for token in draw {
        totals.merge(&token.contribution(draw, policy));
    }
    totals
}

/// Resolve both checks. The two are independent: a failed composure check
/// costs health but never forfeits treasure.
#[must_use]
pub fn resolve_combat(
    draw: &[Token],
    encounter: &Encounter,
    rules: &CombatRules,
    policy: ValuePolicy,
) -> CombatResult {
    let totals = calculate_draw_totals(draw, policy);

    let primary_success = totals.insight >= encounter.primary_threshold;
    let surplus = totals.insight.saturating_sub(encounter.primary_threshold);
    let bonus_reward = if primary_success { encounter.reward } else { 0 };

    let secondary_success = totals.composure >= encounter.secondary_threshold;
    let deficiency = encounter
        .secondary_threshold
        .saturating_sub(totals.composure);
    let resource_lost = if secondary_success {
        0
    } else {
        rules.penalty(deficiency)
    };

    CombatResult {
        totals,
        primary_success,
        secondary_success,
        surplus,
        deficiency,
        resource_lost,
        currency_gained: totals.treasure.saturating_add(bonus_reward),
        bonus_reward,
        thresholds_cleared: u8::from(primary_success) + u8::from(secondary_success),
        encounter: encounter.clone(),
    }
}

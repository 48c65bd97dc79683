use std::fmt;
use std::str::FromStr;

use anyhow::{Error, bail};
use podcrawl_game::{GameSession, PodId, TokenId};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// What to do with the current hand before confirming it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawDecision {
    Keep,
    RedrawAll,
    RedrawSelected(Vec<TokenId>),
}

/// What to buy, if anything, from the current offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShopDecision {
    Skip,
    Buy { offer: usize, replace: PodId },
}

/// Policy interface for automated play strategies.
pub trait PlayerPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Decide on the hand during the draw phase. Called until it keeps the
    /// hand or a redraw is refused.
    fn plan_draw(&mut self, session: &GameSession) -> DrawDecision;

    /// Whether to open the shop after a won or survived combat.
    fn visits_shop(&self) -> bool {
        true
    }

    /// Pick a purchase from the open shop.
    fn plan_shop(&mut self, session: &GameSession) -> ShopDecision;
}

/// Built-in gameplay strategies for automated runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Strategy {
    Cautious,
    Greedy,
    Random,
}

impl Strategy {
    pub const ALL: [Self; 3] = [Self::Cautious, Self::Greedy, Self::Random];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Cautious => "Cautious",
            Self::Greedy => "Greedy",
            Self::Random => "Random",
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn PlayerPolicy> {
        match self {
            Self::Cautious => Box::new(CautiousPolicy),
            Self::Greedy => Box::new(GreedyPolicy),
            Self::Random => Box::new(RandomPolicy::new(seed)),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cautious" => Ok(Self::Cautious),
            "greedy" => Ok(Self::Greedy),
            "random" => Ok(Self::Random),
            other => bail!("unknown strategy '{other}' (expected cautious, greedy, random)"),
        }
    }
}

/// Failing checks for the current hand: (insight short, composure short).
fn failing_checks(session: &GameSession) -> (bool, bool) {
    let Some(encounter) = session.encounter() else {
        return (false, false);
    };
    let totals = session.hand_totals();
    (
        totals.insight < encounter.primary_threshold,
        totals.composure < encounter.secondary_threshold,
    )
}

/// Redraws only to protect health; never spends currency.
struct CautiousPolicy;

impl PlayerPolicy for CautiousPolicy {
    fn name(&self) -> &'static str {
        Strategy::Cautious.label()
    }

    fn plan_draw(&mut self, session: &GameSession) -> DrawDecision {
        let (_, composure_short) = failing_checks(session);
        if composure_short && session.redraws_remaining() > 0 {
            DrawDecision::RedrawAll
        } else {
            DrawDecision::Keep
        }
    }

    fn visits_shop(&self) -> bool {
        false
    }

    fn plan_shop(&mut self, _session: &GameSession) -> ShopDecision {
        ShopDecision::Skip
    }
}

/// Chases both checks and upgrades whenever the best offer beats the weakest pod.
struct GreedyPolicy;

impl GreedyPolicy {
    const SELECTIVE_COUNT: usize = 2;
}

impl PlayerPolicy for GreedyPolicy {
    fn name(&self) -> &'static str {
        Strategy::Greedy.label()
    }

    fn plan_draw(&mut self, session: &GameSession) -> DrawDecision {
        let (insight_short, composure_short) = failing_checks(session);
        if !insight_short && !composure_short {
            return DrawDecision::Keep;
        }
        if session.redraws_remaining() > 0 {
            return DrawDecision::RedrawAll;
        }
        if session.selective_redraws_remaining() > 0 {
            let policy = session.config().value_policy;
            let mut weakest: Vec<_> = session.hand().iter().collect();
            weakest.sort_by_key(|token| token.value(policy));
            return DrawDecision::RedrawSelected(
                weakest
                    .into_iter()
                    .take(Self::SELECTIVE_COUNT)
                    .map(|token| token.id)
                    .collect(),
            );
        }
        DrawDecision::Keep
    }

    fn plan_shop(&mut self, session: &GameSession) -> ShopDecision {
        let policy = session.config().value_policy;
        let currency = session.player().currency;
        let Some((offer, offer_value)) = session
            .shop_offer()
            .iter()
            .enumerate()
            .filter(|(_, template)| template.cost <= currency)
            .map(|(index, template)| (index, template.total_value(policy)))
            .max_by_key(|&(index, value)| (value, std::cmp::Reverse(index)))
        else {
            return ShopDecision::Skip;
        };
        let Some(weakest) = session
            .player()
            .pods
            .iter()
            .min_by_key(|pod| pod.total_value(policy))
        else {
            return ShopDecision::Skip;
        };
        if offer_value > weakest.total_value(policy) {
            ShopDecision::Buy {
                offer,
                replace: weakest.id,
            }
        } else {
            ShopDecision::Skip
        }
    }
}

/// Coin-flip redraws and purchases from a seeded stream.
struct RandomPolicy {
    rng: ChaCha20Rng,
}

impl RandomPolicy {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }
}

impl PlayerPolicy for RandomPolicy {
    fn name(&self) -> &'static str {
        Strategy::Random.label()
    }

    fn plan_draw(&mut self, session: &GameSession) -> DrawDecision {
        if session.redraws_remaining() > 0 && self.rng.gen_bool(0.5) {
            DrawDecision::RedrawAll
        } else {
            DrawDecision::Keep
        }
    }

    fn plan_shop(&mut self, session: &GameSession) -> ShopDecision {
        let currency = session.player().currency;
        let affordable: Vec<usize> = session
            .shop_offer()
            .iter()
            .enumerate()
            .filter(|(_, template)| template.cost <= currency)
            .map(|(index, _)| index)
            .collect();
        let pods = &session.player().pods;
        if affordable.is_empty() || pods.is_empty() || !self.rng.gen_bool(0.5) {
            return ShopDecision::Skip;
        }
        let offer = affordable[self.rng.gen_range(0..affordable.len())];
        let replace = pods[self.rng.gen_range(0..pods.len())].id;
        ShopDecision::Buy { offer, replace }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use podcrawl_game::{EngineConfig, GamePhase, ShopConfig};

    fn started(seed: u64, config: EngineConfig) -> GameSession {
        let mut session = GameSession::from_seed(config, seed).unwrap();
        let _ = session.start_new_game();
        session
    }

    #[test]
    fn strategies_parse_case_insensitively() {
        assert_eq!("GREEDY".parse::<Strategy>().unwrap(), Strategy::Greedy);
        assert_eq!(" cautious ".parse::<Strategy>().unwrap(), Strategy::Cautious);
        assert!("reckless".parse::<Strategy>().is_err());
        for strategy in Strategy::ALL {
            assert_eq!(strategy.create_policy(1).name(), strategy.label());
        }
    }

    #[test]
    fn cautious_never_shops() {
        let mut policy = Strategy::Cautious.create_policy(1);
        assert!(!policy.visits_shop());
        let session = started(3, EngineConfig::default());
        assert_eq!(policy.plan_shop(&session), ShopDecision::Skip);
    }

    #[test]
    fn greedy_keeps_a_winning_hand() {
        let mut policy = Strategy::Greedy.create_policy(1);
        for seed in 1..20 {
            let session = started(seed, EngineConfig::default());
            let (insight_short, composure_short) = failing_checks(&session);
            let decision = policy.plan_draw(&session);
            if insight_short || composure_short {
                assert_eq!(decision, DrawDecision::RedrawAll);
            } else {
                assert_eq!(decision, DrawDecision::Keep);
            }
        }
    }

    #[test]
    fn greedy_buys_upgrades_when_rich() {
        let config = EngineConfig {
            starting_currency: 10_000,
            ..EngineConfig::default()
        };
        let mut session = started(5, config);
        let _ = session.confirm_draw();
        let _ = session.proceed_to_shop();
        assert_eq!(session.phase(), GamePhase::Shop);

        let mut policy = Strategy::Greedy.create_policy(5);
        // Tier 1 always guarantees a Bronze slot, so every offer beats a starting pod.
        match policy.plan_shop(&session) {
            ShopDecision::Buy { offer, replace } => {
                assert!(offer < session.shop_offer().len());
                assert!(session.player().pod(replace).is_some());
            }
            ShopDecision::Skip => panic!("greedy skipped an affordable upgrade"),
        }
    }

    #[test]
    fn broke_players_skip() {
        let config = EngineConfig {
            shop: ShopConfig {
                price_factor_min: 1_000.0,
                price_factor_max: 1_001.0,
                ..ShopConfig::default()
            },
            ..EngineConfig::default()
        };
        for seed in 1..10 {
            let mut session = started(seed, config.clone());
            let _ = session.confirm_draw();
            assert!(session.proceed_to_shop().is_applied());
            assert_eq!(session.phase(), GamePhase::Shop);
            let currency = session.player().currency;
            assert!(!session.shop_offer().is_empty());
            assert!(
                session
                    .shop_offer()
                    .iter()
                    .all(|template| template.cost > currency)
            );
            for strategy in [Strategy::Greedy, Strategy::Random] {
                let mut policy = strategy.create_policy(seed);
                for _ in 0..8 {
                    assert_eq!(policy.plan_shop(&session), ShopDecision::Skip, "{strategy}");
                }
            }
        }
    }
}

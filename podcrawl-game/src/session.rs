//! Game session controller: the phase state machine that sequences encounters,
//! draws, combat, and the shop.
//!
//! Every action returns an [`ActionOutcome`]. Precondition violations (wrong
//! phase, spent budgets, missing selections, insufficient currency) leave the
//! session untouched and report [`ActionOutcome::Ignored`].
use log::{debug, trace};
use rand::RngCore;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::fmt;
use thiserror::Error;

use crate::combat::{CombatResult, calculate_draw_totals, resolve_combat};
use crate::config::{ConfigError, EngineConfig};
use crate::constants::LOG_TARGET;
use crate::encounter::{Encounter, generate_encounter};
use crate::pod::{IdMint, Pod, PodId, PodTemplate, token_pool};
use crate::rng::CountingRng;
use crate::shop::ShopGenerator;
use crate::token::{StatTotals, Token, TokenId};

/// Phases of a run. `GameOver` is absorbing until a new game starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    #[default]
    Start,
    Draw,
    Combat,
    Shop,
    GameOver,
}

impl GamePhase {
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Draw => "draw",
            Self::Combat => "combat",
            Self::Shop => "shop",
            Self::GameOver => "game_over",
        }
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Entry points a host can invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionAction {
    StartNewGame,
    StartNextEncounter,
    RedrawAll,
    ToggleTokenSelection,
    RedrawSelected,
    ConfirmDraw,
    ExecuteCombat,
    ProceedToShop,
    SelectPodToReplace,
    PurchasePod,
    SkipShop,
    RestartGame,
}

impl SessionAction {
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::StartNewGame => "start_new_game",
            Self::StartNextEncounter => "start_next_encounter",
            Self::RedrawAll => "redraw_all",
            Self::ToggleTokenSelection => "toggle_token_selection",
            Self::RedrawSelected => "redraw_selected",
            Self::ConfirmDraw => "confirm_draw",
            Self::ExecuteCombat => "execute_combat",
            Self::ProceedToShop => "proceed_to_shop",
            Self::SelectPodToReplace => "select_pod_to_replace",
            Self::PurchasePod => "purchase_pod",
            Self::SkipShop => "skip_shop",
            Self::RestartGame => "restart_game",
        }
    }
}

impl fmt::Display for SessionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Why an action was ignored.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    #[error("not available during the {phase} phase")]
    WrongPhase { phase: GamePhase },
    #[error("no full redraws left this encounter")]
    NoRedrawsLeft,
    #[error("no selective redraws left this encounter")]
    NoSelectiveRedrawsLeft,
    #[error("no tokens selected for redraw")]
    EmptySelection,
    #[error("{0} is not in the current hand")]
    TokenNotInHand(TokenId),
    #[error("combat for this encounter is already resolved")]
    CombatAlreadyResolved,
    #[error("no encounter in progress")]
    NoEncounter,
    #[error("{0} is not in the player's collection")]
    UnknownPod(PodId),
    #[error("no shop offer at index {0}")]
    UnknownOffer(usize),
    #[error("no pod selected for replacement")]
    NoPodSelected,
    #[error("pod template has {found} tokens, expected {expected}")]
    PodShapeMismatch { expected: usize, found: usize },
    #[error("costs {cost} but only {available} available")]
    InsufficientCurrency { cost: u32, available: u32 },
}

/// Result of invoking an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Applied,
    Ignored(Rejection),
}

impl ActionOutcome {
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }

    #[must_use]
    pub const fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Applied => None,
            Self::Ignored(rejection) => Some(rejection),
        }
    }
}

/// Notification published for each committed transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    GameStarted {
        health: u32,
        currency: u32,
    },
    EncounterStarted {
        depth: u32,
        name: String,
        primary_threshold: u32,
        secondary_threshold: u32,
        reward: u32,
    },
    HandDrawn {
        depth: u32,
        token_ids: Vec<TokenId>,
    },
    SelectionChanged {
        token: TokenId,
        selected: bool,
    },
    TokensRedrawn {
        kept: usize,
        replaced: usize,
    },
    CombatResolved {
        depth: u32,
        thresholds_cleared: u8,
        resource_lost: u32,
        currency_gained: u32,
    },
    GameOver {
        depth: u32,
    },
    ShopOpened {
        depth: u32,
        offers: usize,
    },
    PodMarked {
        pod: Option<PodId>,
    },
    PodPurchased {
        replaced: PodId,
        pod: PodId,
        cost: u32,
    },
}

/// The player's persistent run state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Player {
    pub pods: Vec<Pod>,
    pub health: u32,
    pub max_health: u32,
    pub currency: u32,
}

impl Player {
    /// Every token owned, in pod order.
    pub fn all_tokens(&self) -> impl Iterator<Item = &Token> {
        self.pods.iter().flat_map(|pod| pod.tokens.iter())
    }

    #[must_use]
    pub fn token_count(&self) -> usize {
        self.pods.iter().map(|pod| pod.tokens.len()).sum()
    }

    #[must_use]
    pub fn pod(&self, id: PodId) -> Option<&Pod> {
        self.pods.iter().find(|pod| pod.id == id)
    }

    #[must_use]
    pub const fn is_defeated(&self) -> bool {
        self.health == 0
    }
}

/// Serializable view of everything a presentation layer reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub phase: GamePhase,
    pub depth: u32,
    pub player: Player,
    pub encounter: Option<Encounter>,
    pub hand: Vec<Token>,
    pub redraws_remaining: u8,
    pub selective_redraws_remaining: u8,
    pub selected_tokens: Vec<TokenId>,
    pub last_result: Option<CombatResult>,
    pub shop_offer: Vec<PodTemplate>,
    pub selected_pod: Option<PodId>,
}

/// A single run of the game driven by one injectable random source.
#[derive(Debug, Clone)]
pub struct GameSession<R: RngCore = CountingRng<ChaCha20Rng>> {
    config: EngineConfig,
    rng: R,
    mint: IdMint,
    phase: GamePhase,
    player: Player,
    depth: u32,
    encounter: Option<Encounter>,
    hand: Vec<Token>,
    redraws_remaining: u8,
    selective_redraws_remaining: u8,
    selection: BTreeSet<TokenId>,
    last_result: Option<CombatResult>,
    shop_offer: Vec<PodTemplate>,
    selected_pod: Option<PodId>,
    events: VecDeque<SessionEvent>,
}

impl GameSession<CountingRng<ChaCha20Rng>> {
    /// Build a session whose randomness is derived from a user-visible seed.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when `config` fails validation.
    pub fn from_seed(config: EngineConfig, seed: u64) -> Result<Self, ConfigError> {
        Self::new(config, CountingRng::from_user_seed(seed))
    }
}

impl<R: RngCore> GameSession<R> {
    /// Build a session in the `Start` phase.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when `config` fails validation.
    pub fn new(config: EngineConfig, rng: R) -> Result<Self, ConfigError> {
        config.validate()?;
        let player = Player {
            pods: Vec::new(),
            health: config.starting_health,
            max_health: config.starting_health,
            currency: config.starting_currency,
        };
        Ok(Self {
            config,
            rng,
            mint: IdMint::new(),
            phase: GamePhase::Start,
            player,
            depth: 0,
            encounter: None,
            hand: Vec::new(),
            redraws_remaining: 0,
            selective_redraws_remaining: 0,
            selection: BTreeSet::new(),
            last_result: None,
            shop_offer: Vec::new(),
            selected_pod: None,
            events: VecDeque::new(),
        })
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub const fn rng(&self) -> &R {
        &self.rng
    }

    #[must_use]
    pub const fn phase(&self) -> GamePhase {
        self.phase
    }

    #[must_use]
    pub const fn player(&self) -> &Player {
        &self.player
    }

    #[must_use]
    pub const fn depth(&self) -> u32 {
        self.depth
    }

    #[must_use]
    pub const fn encounter(&self) -> Option<&Encounter> {
        self.encounter.as_ref()
    }

    #[must_use]
    pub fn hand(&self) -> &[Token] {
        &self.hand
    }

    /// Totals the current hand would produce in combat.
    #[must_use]
    pub fn hand_totals(&self) -> StatTotals {
        calculate_draw_totals(&self.hand, self.config.value_policy)
    }

    #[must_use]
    pub const fn redraws_remaining(&self) -> u8 {
        self.redraws_remaining
    }

    #[must_use]
    pub const fn selective_redraws_remaining(&self) -> u8 {
        self.selective_redraws_remaining
    }

    #[must_use]
    pub const fn selected_tokens(&self) -> &BTreeSet<TokenId> {
        &self.selection
    }

    #[must_use]
    pub const fn last_result(&self) -> Option<&CombatResult> {
        self.last_result.as_ref()
    }

    #[must_use]
    pub fn shop_offer(&self) -> &[PodTemplate] {
        &self.shop_offer
    }

    #[must_use]
    pub const fn selected_pod(&self) -> Option<PodId> {
        self.selected_pod
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            depth: self.depth,
            player: self.player.clone(),
            encounter: self.encounter.clone(),
            hand: self.hand.clone(),
            redraws_remaining: self.redraws_remaining,
            selective_redraws_remaining: self.selective_redraws_remaining,
            selected_tokens: self.selection.iter().copied().collect(),
            last_result: self.last_result.clone(),
            shop_offer: self.shop_offer.clone(),
            selected_pod: self.selected_pod,
        }
    }

    /// Take every event published since the last drain, oldest first.
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        self.events.drain(..).collect()
    }

    /// Reset the player, ids, and depth, then enter the first encounter.
    /// Accepted from any phase.
    pub fn start_new_game(&mut self) -> ActionOutcome {
        self.reset_run();
        self.begin_encounter();
        ActionOutcome::Applied
    }

    pub fn restart_game(&mut self) -> ActionOutcome {
        self.start_new_game()
    }

    /// Advance to the next depth after combat, with or without shopping.
    pub fn start_next_encounter(&mut self) -> ActionOutcome {
        let result = self.try_advance();
        self.outcome(SessionAction::StartNextEncounter, result)
    }

    pub fn skip_shop(&mut self) -> ActionOutcome {
        let result = self.try_advance();
        self.outcome(SessionAction::SkipShop, result)
    }

    /// Discard the hand and draw a fresh one from the whole pool.
    pub fn redraw_all(&mut self) -> ActionOutcome {
        let result = self.try_redraw_all();
        self.outcome(SessionAction::RedrawAll, result)
    }

    /// Mark or unmark a hand token for the next selective redraw.
    pub fn toggle_token_selection(&mut self, id: TokenId) -> ActionOutcome {
        let result = self.try_toggle_token(id);
        self.outcome(SessionAction::ToggleTokenSelection, result)
    }

    /// Replace the selected tokens from the pool, excluding the kept ones.
    pub fn redraw_selected(&mut self) -> ActionOutcome {
        let result = self.try_redraw_selected();
        self.outcome(SessionAction::RedrawSelected, result)
    }

    /// Lock in the hand and resolve combat immediately.
    pub fn confirm_draw(&mut self) -> ActionOutcome {
        let result = self
            .require_phase(&[GamePhase::Draw])
            .and_then(|()| {
                self.phase = GamePhase::Combat;
                debug!(target: LOG_TARGET, "depth {}: draw confirmed", self.depth);
                self.resolve_current_combat()
            });
        self.outcome(SessionAction::ConfirmDraw, result)
    }

    /// Resolve the pending combat. `confirm_draw` already does this, so a
    /// second call in the same encounter is ignored.
    pub fn execute_combat(&mut self) -> ActionOutcome {
        let result = self.require_phase(&[GamePhase::Combat]).and_then(|()| {
            if self.last_result.is_some() {
                return Err(Rejection::CombatAlreadyResolved);
            }
            self.resolve_current_combat()
        });
        self.outcome(SessionAction::ExecuteCombat, result)
    }

    pub fn proceed_to_shop(&mut self) -> ActionOutcome {
        let result = self.try_open_shop();
        self.outcome(SessionAction::ProceedToShop, result)
    }

    /// Toggle which owned pod the next purchase replaces.
    pub fn select_pod_to_replace(&mut self, id: PodId) -> ActionOutcome {
        let result = self.try_select_pod(id);
        self.outcome(SessionAction::SelectPodToReplace, result)
    }

    /// Replace the selected pod with a fresh clone of `template`.
    pub fn purchase_pod(&mut self, template: &PodTemplate) -> ActionOutcome {
        let result = self.try_purchase(template);
        self.outcome(SessionAction::PurchasePod, result)
    }

    /// Purchase the shop offer at `index`.
    pub fn purchase_offer(&mut self, index: usize) -> ActionOutcome {
        let Some(template) = self.shop_offer.get(index).cloned() else {
            return self.outcome(
                SessionAction::PurchasePod,
                Err(Rejection::UnknownOffer(index)),
            );
        };
        self.purchase_pod(&template)
    }

    fn outcome(&self, action: SessionAction, result: Result<(), Rejection>) -> ActionOutcome {
        match result {
            Ok(()) => ActionOutcome::Applied,
            Err(rejection) => {
                trace!(
                    target: LOG_TARGET,
                    "{action} ignored in {} phase: {rejection}",
                    self.phase
                );
                ActionOutcome::Ignored(rejection)
            }
        }
    }

    fn require_phase(&self, allowed: &[GamePhase]) -> Result<(), Rejection> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(Rejection::WrongPhase { phase: self.phase })
        }
    }

    fn reset_run(&mut self) {
        self.mint.reset();
        let pods = self
            .config
            .starting_pods
            .iter()
            .map(|template| self.mint.clone_template(template))
            .collect();
        self.player = Player {
            pods,
            health: self.config.starting_health,
            max_health: self.config.starting_health,
            currency: self.config.starting_currency,
        };
        self.depth = 0;
        self.encounter = None;
        self.hand.clear();
        self.last_result = None;
        self.shop_offer.clear();
        self.selected_pod = None;
        debug!(
            target: LOG_TARGET,
            "new game: {} pods, health {}, currency {}",
            self.player.pods.len(),
            self.player.health,
            self.player.currency
        );
        self.events.push_back(SessionEvent::GameStarted {
            health: self.player.health,
            currency: self.player.currency,
        });
    }

    fn begin_encounter(&mut self) {
        self.depth = self.depth.saturating_add(1);
        let encounter = generate_encounter(self.depth, &self.config.scaling, &mut self.rng);
        debug!(
            target: LOG_TARGET,
            "depth {}: {} (primary {}, secondary {}, reward {})",
            self.depth,
            encounter.name,
            encounter.primary_threshold,
            encounter.secondary_threshold,
            encounter.reward
        );
        self.events.push_back(SessionEvent::EncounterStarted {
            depth: self.depth,
            name: encounter.name.clone(),
            primary_threshold: encounter.primary_threshold,
            secondary_threshold: encounter.secondary_threshold,
            reward: encounter.reward,
        });
        self.encounter = Some(encounter);
        self.redraws_remaining = self.config.redraws_per_encounter;
        self.selective_redraws_remaining = self.config.selective_redraws_per_encounter;
        self.selection.clear();
        self.last_result = None;
        self.shop_offer.clear();
        self.selected_pod = None;
        self.draw_tokens();
        self.phase = GamePhase::Draw;
    }

    /// Shuffle the whole owned pool and deal `draw_count` tokens.
    fn draw_tokens(&mut self) {
        let mut pool = token_pool(&self.player.pods, &mut self.rng);
        pool.truncate(self.config.draw_count);
        self.hand = pool;
        self.events.push_back(SessionEvent::HandDrawn {
            depth: self.depth,
            token_ids: self.hand.iter().map(|token| token.id).collect(),
        });
    }

    fn try_advance(&mut self) -> Result<(), Rejection> {
        self.require_phase(&[GamePhase::Combat, GamePhase::Shop])?;
        if self.last_result.is_none() {
            return Err(Rejection::NoEncounter);
        }
        self.begin_encounter();
        Ok(())
    }

    fn try_redraw_all(&mut self) -> Result<(), Rejection> {
        self.require_phase(&[GamePhase::Draw])?;
        if self.redraws_remaining == 0 {
            return Err(Rejection::NoRedrawsLeft);
        }
        self.redraws_remaining -= 1;
        self.selection.clear();
        self.draw_tokens();
        debug!(
            target: LOG_TARGET,
            "depth {}: full redraw, {} left",
            self.depth,
            self.redraws_remaining
        );
        Ok(())
    }

    fn try_toggle_token(&mut self, id: TokenId) -> Result<(), Rejection> {
        self.require_phase(&[GamePhase::Draw])?;
        if !self.hand.iter().any(|token| token.id == id) {
            return Err(Rejection::TokenNotInHand(id));
        }
        let selected = if self.selection.remove(&id) {
            false
        } else {
            self.selection.insert(id)
        };
        self.events
            .push_back(SessionEvent::SelectionChanged { token: id, selected });
        Ok(())
    }

    fn try_redraw_selected(&mut self) -> Result<(), Rejection> {
        self.require_phase(&[GamePhase::Draw])?;
        if self.selective_redraws_remaining == 0 {
            return Err(Rejection::NoSelectiveRedrawsLeft);
        }
        if self.selection.is_empty() {
            return Err(Rejection::EmptySelection);
        }

        let (kept, replaced): (Vec<Token>, Vec<Token>) = self
            .hand
            .iter()
            .cloned()
            .partition(|token| !self.selection.contains(&token.id));
        let kept_ids: HashSet<TokenId> = kept.iter().map(|token| token.id).collect();

        // Tokens replaced a moment ago stay eligible; only kept ones are excluded.
        let mut pool: Vec<Token> = self
            .player
            .all_tokens()
            .filter(|token| !kept_ids.contains(&token.id))
            .cloned()
            .collect();
        pool.shuffle(&mut self.rng);
        pool.truncate(replaced.len());

        let kept_count = kept.len();
        let replaced_count = pool.len();
        let mut hand = kept;
        hand.extend(pool);
        self.hand = hand;
        self.selection.clear();
        self.selective_redraws_remaining -= 1;

        debug!(
            target: LOG_TARGET,
            "depth {}: replaced {replaced_count} tokens, kept {kept_count}",
            self.depth
        );
        self.events.push_back(SessionEvent::TokensRedrawn {
            kept: kept_count,
            replaced: replaced_count,
        });
        Ok(())
    }

    fn resolve_current_combat(&mut self) -> Result<(), Rejection> {
        let Some(encounter) = self.encounter.as_ref() else {
            return Err(Rejection::NoEncounter);
        };
        let result = resolve_combat(
            &self.hand,
            encounter,
            &self.config.combat,
            self.config.value_policy,
        );

        self.player.health = self.player.health.saturating_sub(result.resource_lost);
        self.player.currency = self.player.currency.saturating_add(result.currency_gained);
        debug!(
            target: LOG_TARGET,
            "depth {}: cleared {}/2, lost {}, gained {}, health {}",
            self.depth,
            result.thresholds_cleared,
            result.resource_lost,
            result.currency_gained,
            self.player.health
        );
        self.events.push_back(SessionEvent::CombatResolved {
            depth: self.depth,
            thresholds_cleared: result.thresholds_cleared,
            resource_lost: result.resource_lost,
            currency_gained: result.currency_gained,
        });

        if self.player.is_defeated() {
            self.phase = GamePhase::GameOver;
            debug!(target: LOG_TARGET, "game over at depth {}", self.depth);
            self.events
                .push_back(SessionEvent::GameOver { depth: self.depth });
        }
        self.last_result = Some(result);
        Ok(())
    }

    fn try_open_shop(&mut self) -> Result<(), Rejection> {
        self.require_phase(&[GamePhase::Combat])?;
        let generator = ShopGenerator::new(
            &self.config.shop,
            self.config.value_policy,
            self.config.tokens_per_pod,
        );
        let mut offer = generator.available_pods(self.depth, &mut self.rng);
        offer.shuffle(&mut self.rng);
        offer.truncate(self.config.shop_size);

        self.shop_offer = offer;
        self.selected_pod = None;
        self.phase = GamePhase::Shop;
        debug!(
            target: LOG_TARGET,
            "depth {}: shop opened with {} offers",
            self.depth,
            self.shop_offer.len()
        );
        self.events.push_back(SessionEvent::ShopOpened {
            depth: self.depth,
            offers: self.shop_offer.len(),
        });
        Ok(())
    }

    fn try_select_pod(&mut self, id: PodId) -> Result<(), Rejection> {
        self.require_phase(&[GamePhase::Shop])?;
        if self.player.pod(id).is_none() {
            return Err(Rejection::UnknownPod(id));
        }
        self.selected_pod = if self.selected_pod == Some(id) {
            None
        } else {
            Some(id)
        };
        self.events.push_back(SessionEvent::PodMarked {
            pod: self.selected_pod,
        });
        Ok(())
    }

    fn try_purchase(&mut self, template: &PodTemplate) -> Result<(), Rejection> {
        self.require_phase(&[GamePhase::Shop])?;
        let Some(target) = self.selected_pod else {
            return Err(Rejection::NoPodSelected);
        };
        if template.token_defs.len() != self.config.tokens_per_pod {
            return Err(Rejection::PodShapeMismatch {
                expected: self.config.tokens_per_pod,
                found: template.token_defs.len(),
            });
        }
        if self.player.currency < template.cost {
            return Err(Rejection::InsufficientCurrency {
                cost: template.cost,
                available: self.player.currency,
            });
        }
        let Some(slot) = self.player.pods.iter().position(|pod| pod.id == target) else {
            return Err(Rejection::UnknownPod(target));
        };

        let pod = self.mint.clone_template(template);
        let pod_id = pod.id;
        self.player.currency -= template.cost;
        self.player.pods[slot] = pod;
        self.selected_pod = None;
        debug!(
            target: LOG_TARGET,
            "depth {}: bought {pod_id} for {} replacing {target}",
            self.depth,
            template.cost
        );
        self.events.push_back(SessionEvent::PodPurchased {
            replaced: target,
            pod: pod_id,
            cost: template.cost,
        });
        Ok(())
    }
}

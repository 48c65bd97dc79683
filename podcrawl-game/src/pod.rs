//! Pods, pod templates, and the id mint that stamps fresh tokens.
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::rank::{Rank, ValuePolicy};
use crate::token::{Token, TokenId, TokenKind};

/// Session-unique pod identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PodId(pub u64);

impl fmt::Display for PodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pod-{}", self.0)
    }
}

/// Monotonic id counters owned by a session.
///
/// Ids start at 1 and are never reused; the counters only reset together
/// with a full session reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdMint {
    next_token: u64,
    next_pod: u64,
}

impl Default for IdMint {
    fn default() -> Self {
        Self {
            next_token: 1,
            next_pod: 1,
        }
    }
}

impl IdMint {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Mint a token with a fresh id.
    pub fn create_token(&mut self, kind: TokenKind, rank: Rank) -> Token {
        let id = TokenId(self.next_token);
        self.next_token += 1;
        Token { id, kind, rank }
    }

    /// Mint a pod from ordered token definitions.
    pub fn create_pod(&mut self, token_defs: &[TokenDef], cost: u32) -> Pod {
        let id = PodId(self.next_pod);
        self.next_pod += 1;
        let tokens = token_defs
            .iter()
            .map(|def| self.create_token(def.kind, def.rank_or_basic()))
            .collect();
        Pod { id, tokens, cost }
    }

    /// Structurally equal, identity-distinct pod for every call.
    pub fn clone_template(&mut self, template: &PodTemplate) -> Pod {
        self.create_pod(&template.token_defs, template.cost)
    }

    /// Id that the next minted token will receive.
    #[must_use]
    pub const fn peek_token_id(&self) -> TokenId {
        TokenId(self.next_token)
    }

    /// Id that the next minted pod will receive.
    #[must_use]
    pub const fn peek_pod_id(&self) -> PodId {
        PodId(self.next_pod)
    }
}

/// Declarative token slot inside a template. A missing rank means `Basic`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenDef {
    pub kind: TokenKind,
    #[serde(default)]
    pub rank: Option<Rank>,
}

impl TokenDef {
    #[must_use]
    pub const fn new(kind: TokenKind, rank: Rank) -> Self {
        Self {
            kind,
            rank: Some(rank),
        }
    }

    #[must_use]
    pub const fn basic(kind: TokenKind) -> Self {
        Self { kind, rank: None }
    }

    #[must_use]
    pub fn rank_or_basic(&self) -> Rank {
        self.rank.unwrap_or_default()
    }

    /// Value of the token this slot would mint, ignoring synergies.
    #[must_use]
    pub fn value(&self, policy: ValuePolicy) -> u32 {
        policy.value(self.kind.definition().base_value, self.rank_or_basic())
    }
}

/// Immutable blueprint for a pod; cloned into fresh pods on purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodTemplate {
    pub token_defs: Vec<TokenDef>,
    #[serde(default)]
    pub cost: u32,
}

impl PodTemplate {
    #[must_use]
    pub const fn new(token_defs: Vec<TokenDef>, cost: u32) -> Self {
        Self { token_defs, cost }
    }

    /// Sum of slot values, ignoring synergies.
    #[must_use]
    pub fn total_value(&self, policy: ValuePolicy) -> u32 {
        self.token_defs
            .iter()
            .map(|def| def.value(policy))
            .fold(0, u32::saturating_add)
    }
}

/// A fixed-size bundle of tokens owned by the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pod {
    pub id: PodId,
    pub tokens: Vec<Token>,
    pub cost: u32,
}

impl Pod {
    /// Sum of token values, ignoring synergies.
    #[must_use]
    pub fn total_value(&self, policy: ValuePolicy) -> u32 {
        self.tokens
            .iter()
            .map(|token| token.value(policy))
            .fold(0, u32::saturating_add)
    }
}

const fn slot(kind: TokenKind) -> TokenDef {
    TokenDef::basic(kind)
}

const fn ranked(kind: TokenKind, rank: Rank) -> TokenDef {
    TokenDef::new(kind, rank)
}

/// Starting mix: two insight-focused, two composure-focused, two balanced.
pub const STARTING_POD_TEMPLATES: [[TokenDef; 3]; 6] = [
    [
        ranked(TokenKind::Insight, Rank::Bronze),
        slot(TokenKind::Insight),
        slot(TokenKind::Treasure),
    ],
    [
        slot(TokenKind::Insight),
        slot(TokenKind::Insight),
        slot(TokenKind::Insight),
    ],
    [
        ranked(TokenKind::Composure, Rank::Bronze),
        slot(TokenKind::Composure),
        slot(TokenKind::Treasure),
    ],
    [
        slot(TokenKind::Composure),
        slot(TokenKind::Composure),
        slot(TokenKind::Composure),
    ],
    [
        slot(TokenKind::Insight),
        slot(TokenKind::Composure),
        slot(TokenKind::Treasure),
    ],
    [
        slot(TokenKind::Treasure),
        slot(TokenKind::Treasure),
        slot(TokenKind::Composure),
    ],
];

/// Starting templates as owned blueprints with zero cost.
#[must_use]
pub fn starting_templates() -> Vec<PodTemplate> {
    STARTING_POD_TEMPLATES
        .iter()
        .map(|defs| PodTemplate::new(defs.to_vec(), 0))
        .collect()
}

/// Mint a fresh starting collection.
pub fn generate_starting_pods(mint: &mut IdMint) -> Vec<Pod> {
    starting_templates()
        .iter()
        .map(|template| mint.clone_template(template))
        .collect()
}

/// Every token owned across `pods`, shuffled uniformly.
pub fn token_pool<R: Rng + ?Sized>(pods: &[Pod], rng: &mut R) -> Vec<Token> {
    let mut pool: Vec<Token> = pods.iter().flat_map(|pod| pod.tokens.iter().cloned()).collect();
    pool.shuffle(rng);
    pool
}

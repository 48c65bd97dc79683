//! Token kinds, their static definitions, and per-token stat contributions.
use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};
use std::fmt;

use crate::constants::{PAIRING_BONUS_DIVISOR, PAIRING_BONUS_MIN};
use crate::numbers::len_to_u32;
use crate::rank::{Rank, ValuePolicy};

/// Stat a token can feed during combat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    /// Offense/perception, checked against the encounter's primary threshold.
    Insight,
    /// Defense/resilience, checked against the encounter's secondary threshold.
    Composure,
    /// Currency earned regardless of either check.
    Treasure,
}

impl Stat {
    pub const ALL: [Self; 3] = [Self::Insight, Self::Composure, Self::Treasure];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Insight => "insight",
            Self::Composure => "composure",
            Self::Treasure => "treasure",
        }
    }
}

/// Partial stat map returned by a single token. Rarely more than two entries.
pub type StatContribution = SmallVec<[(Stat, u32); 2]>;

/// Running totals for every tracked stat. Absent stats stay at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatTotals {
    pub insight: u32,
    pub composure: u32,
    pub treasure: u32,
}

impl StatTotals {
    #[must_use]
    pub const fn get(&self, stat: Stat) -> u32 {
        match stat {
            Stat::Insight => self.insight,
            Stat::Composure => self.composure,
            Stat::Treasure => self.treasure,
        }
    }

    pub const fn add(&mut self, stat: Stat, amount: u32) {
        let slot = match stat {
            Stat::Insight => &mut self.insight,
            Stat::Composure => &mut self.composure,
            Stat::Treasure => &mut self.treasure,
        };
        *slot = slot.saturating_add(amount);
    }

    pub fn merge(&mut self, contribution: &StatContribution) {
        for &(stat, amount) in contribution {
            self.add(stat, amount);
        }
    }
}

/// Grouping label for cross-token synergies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenTag {
    Flame,
}

/// Context-dependent value hook: reads the full draw, never mutates it.
pub type ContributionFn = fn(&Token, &[Token], ValuePolicy) -> StatContribution;

/// Static metadata describing a token kind.
#[derive(Clone, Copy)]
pub struct TokenTypeDefinition {
    pub name: &'static str,
    /// Stat fed by the default contribution.
    pub stat: Stat,
    pub base_value: u32,
    /// Earliest depth at which procedural generation may roll this kind.
    pub min_depth: u32,
    /// Relative weight in shop rolls.
    pub weight: u32,
    pub tags: &'static [TokenTag],
    /// Overrides the default single-stat contribution when present.
    pub contribution: Option<ContributionFn>,
}

impl fmt::Debug for TokenTypeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenTypeDefinition")
            .field("name", &self.name)
            .field("stat", &self.stat)
            .field("base_value", &self.base_value)
            .field("min_depth", &self.min_depth)
            .field("weight", &self.weight)
            .field("tags", &self.tags)
            .field("synergy", &self.contribution.is_some())
            .finish()
    }
}

impl TokenTypeDefinition {
    #[must_use]
    pub fn has_tag(&self, tag: TokenTag) -> bool {
        self.tags.contains(&tag)
    }

    fn shares_tag_with(&self, other: &Self) -> bool {
        self.tags.iter().any(|tag| other.tags.contains(tag))
    }
}

static INSIGHT: TokenTypeDefinition = TokenTypeDefinition {
    name: "Insight",
    stat: Stat::Insight,
    base_value: 2,
    min_depth: 1,
    weight: 3,
    tags: &[],
    contribution: None,
};

static COMPOSURE: TokenTypeDefinition = TokenTypeDefinition {
    name: "Composure",
    stat: Stat::Composure,
    base_value: 2,
    min_depth: 1,
    weight: 3,
    tags: &[],
    contribution: None,
};

static TREASURE: TokenTypeDefinition = TokenTypeDefinition {
    name: "Treasure",
    stat: Stat::Treasure,
    base_value: 2,
    min_depth: 1,
    weight: 3,
    tags: &[],
    contribution: None,
};

static LOCK: TokenTypeDefinition = TokenTypeDefinition {
    name: "Lock",
    stat: Stat::Composure,
    base_value: 2,
    min_depth: 4,
    weight: 1,
    tags: &[],
    contribution: Some(lock_contribution),
};

static KEY: TokenTypeDefinition = TokenTypeDefinition {
    name: "Key",
    stat: Stat::Insight,
    base_value: 2,
    min_depth: 4,
    weight: 1,
    tags: &[],
    contribution: Some(key_contribution),
};

static EMBER: TokenTypeDefinition = TokenTypeDefinition {
    name: "Ember",
    stat: Stat::Insight,
    base_value: 2,
    min_depth: 8,
    weight: 1,
    tags: &[TokenTag::Flame],
    contribution: Some(tag_group_contribution),
};

static ASH: TokenTypeDefinition = TokenTypeDefinition {
    name: "Ash",
    stat: Stat::Composure,
    base_value: 2,
    min_depth: 8,
    weight: 1,
    tags: &[TokenTag::Flame],
    contribution: Some(tag_group_contribution),
};

/// Closed set of token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Insight,
    Composure,
    Treasure,
    /// Composure token that grows when a Key shares the draw.
    Lock,
    /// Insight token that grows when a Lock shares the draw.
    Key,
    Ember,
    Ash,
}

impl TokenKind {
    pub const ALL: [Self; 7] = [
        Self::Insight,
        Self::Composure,
        Self::Treasure,
        Self::Lock,
        Self::Key,
        Self::Ember,
        Self::Ash,
    ];

    #[must_use]
    pub fn definition(self) -> &'static TokenTypeDefinition {
        match self {
            Self::Insight => &INSIGHT,
            Self::Composure => &COMPOSURE,
            Self::Treasure => &TREASURE,
            Self::Lock => &LOCK,
            Self::Key => &KEY,
            Self::Ember => &EMBER,
            Self::Ash => &ASH,
        }
    }

    #[must_use]
    pub fn stat(self) -> Stat {
        self.definition().stat
    }

    /// Whether procedural generation may roll this kind at `depth`.
    #[must_use]
    pub fn available_at(self, depth: u32) -> bool {
        self.definition().min_depth <= depth
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.definition().name)
    }
}

/// Session-unique token identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(pub u64);

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "token-{}", self.0)
    }
}

/// Immutable token. Minted only through [`crate::pod::IdMint`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub id: TokenId,
    pub kind: TokenKind,
    pub rank: Rank,
}

impl Token {
    /// Intrinsic value, ignoring the rest of the draw.
    #[must_use]
    pub fn value(&self, policy: ValuePolicy) -> u32 {
        policy.value(self.kind.definition().base_value, self.rank)
    }

    /// Single-stat contribution used when a kind has no synergy hook.
    #[must_use]
    pub fn default_contribution(&self, policy: ValuePolicy) -> StatContribution {
        smallvec![(self.kind.stat(), self.value(policy))]
    }

    /// Contribution of this token within `draw`, applying any synergy hook.
    #[must_use]
    pub fn contribution(&self, draw: &[Token], policy: ValuePolicy) -> StatContribution {
        match self.kind.definition().contribution {
            Some(hook) => hook(self, draw, policy),
            None => self.default_contribution(policy),
        }
    }
}

fn pairing_contribution(
    token: &Token,
    draw: &[Token],
    policy: ValuePolicy,
    partner: TokenKind,
) -> StatContribution {
    let mut value = token.value(policy);
    if draw.iter().any(|other| other.kind == partner) {
        value = value.saturating_add((value / PAIRING_BONUS_DIVISOR).max(PAIRING_BONUS_MIN));
    }
    smallvec![(token.kind.stat(), value)]
}

fn lock_contribution(token: &Token, draw: &[Token], policy: ValuePolicy) -> StatContribution {
    pairing_contribution(token, draw, policy, TokenKind::Key)
}

fn key_contribution(token: &Token, draw: &[Token], policy: ValuePolicy) -> StatContribution {
    pairing_contribution(token, draw, policy, TokenKind::Lock)
}

fn tag_group_contribution(token: &Token, draw: &[Token], policy: ValuePolicy) -> StatContribution {
    let own = token.kind.definition();
    let peers = draw
        .iter()
        .filter(|other| other.id != token.id && own.shares_tag_with(other.kind.definition()))
        .count();
    let value = token.value(policy).saturating_add(len_to_u32(peers));
    smallvec![(own.stat, value)]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(id: u64, kind: TokenKind, rank: Rank) -> Token {
        Token {
            id: TokenId(id),
            kind,
            rank,
        }
    }

    fn contribution_of(stat: Stat, contribution: &StatContribution) -> u32 {
        contribution
            .iter()
            .filter(|(s, _)| *s == stat)
            .map(|(_, amount)| amount)
            .sum()
    }

    #[test]
    fn basic_kinds_use_default_contribution() {
        let draw = vec![
            token(1, TokenKind::Insight, Rank::Gold),
            token(2, TokenKind::Treasure, Rank::Basic),
        ];
        for t in &draw {
            assert_eq!(
                t.contribution(&draw, ValuePolicy::DirectRank),
                t.default_contribution(ValuePolicy::DirectRank)
            );
        }
    }

    #[test]
    fn lock_grows_when_key_is_drawn() {
        let lock = token(1, TokenKind::Lock, Rank::Silver);
        let filler = token(2, TokenKind::Treasure, Rank::Basic);
        let key = token(3, TokenKind::Key, Rank::Basic);

        let without = lock.contribution(&[lock.clone(), filler.clone()], ValuePolicy::DirectRank);
        let with = lock.contribution(&[lock.clone(), key], ValuePolicy::DirectRank);
        assert!(
            contribution_of(Stat::Composure, &with) > contribution_of(Stat::Composure, &without)
        );
    }

    #[test]
    fn key_grows_when_lock_is_drawn() {
        let key = token(1, TokenKind::Key, Rank::Inferior);
        let lock = token(2, TokenKind::Lock, Rank::Basic);
        let filler = token(3, TokenKind::Composure, Rank::Basic);

        let without = key.contribution(&[key.clone(), filler], ValuePolicy::DirectRank);
        let with = key.contribution(&[key.clone(), lock], ValuePolicy::DirectRank);
        assert_eq!(contribution_of(Stat::Insight, &without), 1);
        assert_eq!(contribution_of(Stat::Insight, &with), 2);
    }

    #[test]
    fn flame_tokens_count_other_flame_tokens() {
        let ember = token(1, TokenKind::Ember, Rank::Basic);
        let ash = token(2, TokenKind::Ash, Rank::Basic);
        let second_ember = token(3, TokenKind::Ember, Rank::Basic);
        let draw = vec![ember.clone(), ash.clone(), second_ember];

        let ember_value = contribution_of(
            Stat::Insight,
            &ember.contribution(&draw, ValuePolicy::DirectRank),
        );
        let ash_value = contribution_of(
            Stat::Composure,
            &ash.contribution(&draw, ValuePolicy::DirectRank),
        );
        assert_eq!(ember_value, 2 + 2);
        assert_eq!(ash_value, 2 + 2);

        let alone = ember.contribution(std::slice::from_ref(&ember), ValuePolicy::DirectRank);
        assert_eq!(contribution_of(Stat::Insight, &alone), 2);
    }

    #[test]
    fn totals_start_at_zero_and_merge() {
        let mut totals = StatTotals::default();
        for stat in Stat::ALL {
            assert_eq!(totals.get(stat), 0);
        }
        totals.merge(&smallvec![(Stat::Insight, 3), (Stat::Treasure, 2)]);
        totals.add(Stat::Insight, 1);
        assert_eq!(totals.insight, 4);
        assert_eq!(totals.treasure, 2);
        assert_eq!(totals.composure, 0);
    }

    #[test]
    fn basic_kinds_are_available_from_the_first_depth() {
        let available: Vec<TokenKind> = TokenKind::ALL
            .into_iter()
            .filter(|kind| kind.available_at(1))
            .collect();
        assert_eq!(
            available,
            vec![TokenKind::Insight, TokenKind::Composure, TokenKind::Treasure]
        );
        assert!(TokenKind::Ember.definition().has_tag(TokenTag::Flame));
        assert!(!TokenKind::Lock.definition().has_tag(TokenTag::Flame));
    }
}

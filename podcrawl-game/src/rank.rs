//! Token ranks and the value policies that turn a rank into points.
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::numbers::floor_f64_to_u32;

/// Ordered quality tier of a token.
///
/// `Inferior` only appears in starting content; procedural generation starts
/// at `Basic`. Deserializes case-insensitively; unknown keys become `Basic`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
    Inferior,
    #[default]
    Basic,
    Bronze,
    Silver,
    Gold,
    Platinum,
    Diamond,
}

impl Rank {
    /// Every rank in ascending order.
    pub const ALL: [Self; 7] = [
        Self::Inferior,
        Self::Basic,
        Self::Bronze,
        Self::Silver,
        Self::Gold,
        Self::Platinum,
        Self::Diamond,
    ];

    pub const MIN: Self = Self::Inferior;
    pub const MAX: Self = Self::Diamond;

    /// Next rank up, or `self` at the ceiling.
    #[must_use]
    pub const fn upgrade(self) -> Self {
        match self {
            Self::Inferior => Self::Basic,
            Self::Basic => Self::Bronze,
            Self::Bronze => Self::Silver,
            Self::Silver => Self::Gold,
            Self::Gold => Self::Platinum,
            Self::Platinum | Self::Diamond => Self::Diamond,
        }
    }

    /// Points granted by the rank alone.
    #[must_use]
    pub const fn direct_value(self) -> u32 {
        match self {
            Self::Inferior => 1,
            Self::Basic => 2,
            Self::Bronze => 3,
            Self::Silver => 5,
            Self::Gold => 8,
            Self::Platinum => 12,
            Self::Diamond => 18,
        }
    }

    /// Multiplier applied to a kind's base value.
    #[must_use]
    pub const fn multiplier(self) -> f64 {
        match self {
            Self::Inferior => 0.5,
            Self::Basic => 1.0,
            Self::Bronze => 1.5,
            Self::Silver => 2.5,
            Self::Gold => 4.0,
            Self::Platinum => 6.0,
            Self::Diamond => 9.0,
        }
    }

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Inferior => "inferior",
            Self::Basic => "basic",
            Self::Bronze => "bronze",
            Self::Silver => "silver",
            Self::Gold => "gold",
            Self::Platinum => "platinum",
            Self::Diamond => "diamond",
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Inferior => "Inferior",
            Self::Basic => "Basic",
            Self::Bronze => "Bronze",
            Self::Silver => "Silver",
            Self::Gold => "Gold",
            Self::Platinum => "Platinum",
            Self::Diamond => "Diamond",
        }
    }

    /// Parse a rank key, falling back to `Basic` for anything unrecognised.
    #[must_use]
    pub fn from_key_or_basic(key: &str) -> Self {
        key.parse().unwrap_or(Self::Basic)
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Returned by [`Rank::from_str`] for unknown keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRank(pub String);

impl FromStr for Rank {
    type Err = UnknownRank;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|rank| rank.key().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownRank(trimmed.to_string()))
    }
}

impl<'de> Deserialize<'de> for Rank {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let key = String::deserialize(deserializer)?;
        Ok(Self::from_key_or_basic(&key))
    }
}

/// How a token's intrinsic value is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuePolicy {
    /// Rank alone determines value regardless of kind.
    #[default]
    DirectRank,
    /// `floor(kind base value * rank multiplier)`.
    BaseTimesMultiplier,
}

impl ValuePolicy {
    /// Intrinsic value for a kind's base value at `rank`.
    #[must_use]
    pub fn value(self, base: u32, rank: Rank) -> u32 {
        match self {
            Self::DirectRank => rank.direct_value(),
            Self::BaseTimesMultiplier => floor_f64_to_u32(f64::from(base) * rank.multiplier()),
        }
    }
}

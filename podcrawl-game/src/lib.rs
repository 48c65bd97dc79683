//! Podcrawl Game Engine
//!
//! Platform-agnostic rules engine for the Podcrawl roguelike: token pods,
//! depth-scaled encounters, draw and combat resolution, and the tiered shop.
//! This crate provides all game mechanics without UI or platform-specific dependencies.

pub mod combat;
pub mod config;
pub mod constants;
pub mod encounter;
pub mod numbers;
pub mod pod;
pub mod rank;
pub mod rng;
pub mod session;
pub mod shop;
pub mod token;

// Re-export commonly used types
pub use combat::{CombatResult, CombatRules, calculate_draw_totals, resolve_combat};
pub use config::{ConfigError, EngineConfig};
pub use encounter::{
    Encounter, EncounterScaling, RewardCurve, ScalingRow, ThresholdCurve, generate_encounter,
    generate_name, preview_scaling,
};
pub use pod::{
    IdMint, Pod, PodId, PodTemplate, TokenDef, generate_starting_pods, starting_templates,
    token_pool,
};
pub use rank::{Rank, UnknownRank, ValuePolicy};
pub use rng::{CountingRng, derive_session_seed};
pub use session::{
    ActionOutcome, GamePhase, GameSession, Player, Rejection, SessionAction, SessionEvent,
    SessionSnapshot,
};
pub use shop::{ShopConfig, ShopGenerator, ShopTier, TierRules, choose_kind, roll_rank};
pub use token::{
    Stat, StatContribution, StatTotals, Token, TokenId, TokenKind, TokenTag, TokenTypeDefinition,
};

/// Trait for abstracting configuration loading
/// Platform-specific implementations should provide this
pub trait ConfigLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the engine configuration from the platform-specific source
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be read or parsed.
    fn load_engine_config(&self) -> Result<EngineConfig, Self::Error>;
}

/// Main game engine for creating sessions from a loaded configuration
pub struct GameEngine<L>
where
    L: ConfigLoader,
{
    config_loader: L,
}

impl<L> GameEngine<L>
where
    L: ConfigLoader,
{
    /// Create a new game engine with the provided config loader
    pub const fn new(config_loader: L) -> Self {
        Self { config_loader }
    }

    /// Load and validate the configuration without starting a session.
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails or the configuration is invalid.
    pub fn load_config(&self) -> Result<EngineConfig, anyhow::Error>
    where
        L::Error: Into<anyhow::Error>,
    {
        let config = self
            .config_loader
            .load_engine_config()
            .map_err(Into::into)?;
        config.validate()?;
        Ok(config)
    }

    /// Construct a seeded session and enter the first encounter.
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails or the configuration is invalid.
    pub fn create_session(&self, seed: u64) -> Result<GameSession, anyhow::Error>
    where
        L::Error: Into<anyhow::Error>,
    {
        let mut session = GameSession::from_seed(self.load_config()?, seed)?;
        let _ = session.start_new_game();
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    #[derive(Clone, Default)]
    struct FixtureLoader {
        config: EngineConfig,
    }

    impl ConfigLoader for FixtureLoader {
        type Error = Infallible;

        fn load_engine_config(&self) -> Result<EngineConfig, Self::Error> {
            Ok(self.config.clone())
        }
    }

    #[test]
    fn engine_creates_started_sessions() {
        let engine = GameEngine::new(FixtureLoader::default());
        let session = engine.create_session(0xABCD).unwrap();
        assert_eq!(session.phase(), GamePhase::Draw);
        assert_eq!(session.depth(), 1);

        let again = engine.create_session(0xABCD).unwrap();
        assert_eq!(session.snapshot(), again.snapshot());
    }

    #[test]
    fn engine_surfaces_invalid_config() {
        let engine = GameEngine::new(FixtureLoader {
            config: EngineConfig {
                shop_size: 0,
                ..EngineConfig::default()
            },
        });
        let err = engine.create_session(1).err().unwrap();
        assert!(err.to_string().contains("shop_size"));
    }
}

use podcrawl_game::{ConfigError, ConfigLoader, EngineConfig};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Reads engine configuration from a JSON file, or falls back to the
/// built-in defaults when no path is given.
#[derive(Debug, Clone, Default)]
pub struct FileConfigLoader {
    path: Option<PathBuf>,
}

impl FileConfigLoader {
    #[must_use]
    pub const fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

impl ConfigLoader for FileConfigLoader {
    type Error = LoaderError;

    fn load_engine_config(&self) -> Result<EngineConfig, Self::Error> {
        let Some(path) = &self.path else {
            return Ok(EngineConfig::default());
        };
        let json = fs::read_to_string(path).map_err(|source| LoaderError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(EngineConfig::from_json(&json)?)
    }
}

// Application state module
// Holds the configuration and resolved document root shared by all requests

use std::path::{Path, PathBuf};

use super::types::Config;
use crate::error::ServerError;

/// Application state, built once at startup and never mutated
pub struct AppState {
    pub config: Config,
    /// Canonical document root
    pub root: PathBuf,
}

impl AppState {
    /// Resolve the document root and freeze the configuration.
    /// Fails if the root does not exist or cannot be accessed.
    pub fn new(config: Config) -> Result<Self, ServerError> {
        let root = Path::new(&config.server.root)
            .canonicalize()
            .map_err(|source| ServerError::Root {
                path: config.server.root.clone(),
                source,
            })?;

        Ok(Self { config, root })
    }

    pub fn index_files(&self) -> &[String] {
        &self.config.routes.index_files
    }
}

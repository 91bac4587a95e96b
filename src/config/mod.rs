// Configuration module entry point
// Loads the immutable startup configuration and the shared application state

mod state;
mod types;

use std::net::{IpAddr, SocketAddr};

use crate::error::ServerError;

// Re-export public types
pub use state::AppState;
pub use types::{Config, TlsConfig};

/// Config file looked up in the working directory (extension optional)
const DEFAULT_CONFIG_PATH: &str = "cors_server";

impl Config {
    pub fn load() -> Result<Self, ServerError> {
        Ok(Self::load_from(DEFAULT_CONFIG_PATH)?)
    }

    /// Load configuration from the given file path, then the environment.
    /// A missing file is not an error; defaults apply.
    pub fn load_from(config_path: &str) -> Result<Self, ::config::ConfigError> {
        let settings = ::config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .set_default("server.root", ".")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "common")?
            .add_source(::config::File::with_name(config_path).required(false))
            .add_source(
                ::config::Environment::with_prefix("CORS_SERVER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Listen address; `host` is a bare IPv4 or IPv6 address
    pub fn socket_addr(&self) -> Result<SocketAddr, ServerError> {
        let ip: IpAddr = self
            .server
            .host
            .parse()
            .map_err(|source| ServerError::Address {
                addr: self.server.host.clone(),
                source,
            })?;
        Ok(SocketAddr::from((ip, self.server.port)))
    }

    pub const fn tls_enabled(&self) -> bool {
        self.tls.is_some()
    }
}

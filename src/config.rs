//! Server configuration.

use crate::notify::TelegramConfig;
use crate::storage::TICKETS_FILE;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Directory holding the store document by default.
const DATA_DIR: &str = "data";

/// Default listen address.
pub const DEFAULT_BIND: &str = "0.0.0.0:3000";

/// Configuration for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Ticket store document
    pub data_file: PathBuf,

    /// Listen address
    pub bind: SocketAddr,

    /// Shared secret for staff routes; staff routes refuse all calls when unset
    pub admin_secret: Option<String>,

    /// Telegram channel; notifications go to the log when unset
    pub telegram: Option<TelegramConfig>,
}

impl ServerConfig {
    /// Create config with default settings.
    pub fn new(data_file: impl Into<PathBuf>) -> Self {
        Self {
            data_file: data_file.into(),
            bind: default_bind(),
            admin_secret: None,
            telegram: None,
        }
    }

    /// Set the listen address.
    pub fn bind(mut self, bind: SocketAddr) -> Self {
        self.bind = bind;
        self
    }

    /// Set the admin secret; blank values leave it unset.
    pub fn admin_secret(mut self, secret: Option<String>) -> Self {
        self.admin_secret = secret.filter(|s| !s.trim().is_empty());
        self
    }

    /// Set the Telegram channel.
    pub fn telegram(mut self, telegram: Option<TelegramConfig>) -> Self {
        self.telegram = telegram;
        self
    }
}

/// Store document used when none is given.
pub fn default_data_file() -> PathBuf {
    PathBuf::from(DATA_DIR).join(TICKETS_FILE)
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

/// Pick the listen address: an explicit address wins, then a bare port
/// (hosting platforms set `PORT`), then the default.
pub fn resolve_bind(bind: Option<SocketAddr>, port: Option<u16>) -> SocketAddr {
    match (bind, port) {
        (Some(bind), _) => bind,
        (None, Some(port)) => SocketAddr::from(([0, 0, 0, 0], port)),
        (None, None) => default_bind(),
    }
}

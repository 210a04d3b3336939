//! Server configuration.
//!
//! Every value has a default except the token secret, which must be
//! supplied: the realtime layer shares it with the authentication
//! subsystem and never embeds one.

use std::path::{Path, PathBuf};
use std::time::Duration;

use gridspace_arena::DEFAULT_CHANNEL_SIZE;
use gridspace_session::{InMemorySpaceDirectory, JwtValidator, SpaceRecord};
use gridspace_transport::DEFAULT_HANDSHAKE_TIMEOUT;

use crate::GridspaceError;

pub const ENV_BIND: &str = "GRIDSPACE_BIND";
pub const ENV_JWT_SECRET: &str = "GRIDSPACE_JWT_SECRET";
pub const ENV_JWT_REQUIRE_EXP: &str = "GRIDSPACE_JWT_REQUIRE_EXP";
pub const ENV_SPACE_CHANNEL_SIZE: &str = "GRIDSPACE_SPACE_CHANNEL_SIZE";
pub const ENV_SPACES: &str = "GRIDSPACE_SPACES";
pub const ENV_HANDSHAKE_TIMEOUT_SECS: &str = "GRIDSPACE_HANDSHAKE_TIMEOUT_SECS";
pub const ENV_OUTBOUND_QUEUE_SIZE: &str = "GRIDSPACE_OUTBOUND_QUEUE_SIZE";

/// Events a connection may have queued for its socket before the server
/// treats it as gone.
pub const DEFAULT_OUTBOUND_QUEUE_SIZE: usize = 256;

/// Runtime settings for a Gridspace server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,
    /// HS256 secret shared with the token issuer.
    pub jwt_secret: Option<String>,
    /// Refuse tokens that carry no `exp` claim.
    pub require_exp: bool,
    /// Command queue depth of each space's actor.
    pub space_channel_size: usize,
    /// JSON space catalogue to serve from memory.
    pub spaces_path: Option<PathBuf>,
    /// How long a new peer gets to finish the WebSocket upgrade.
    pub handshake_timeout: Duration,
    /// Per-connection outbound event queue depth.
    pub outbound_queue_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            jwt_secret: None,
            require_exp: false,
            space_channel_size: DEFAULT_CHANNEL_SIZE,
            spaces_path: None,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            outbound_queue_size: DEFAULT_OUTBOUND_QUEUE_SIZE,
        }
    }
}

impl ServerConfig {
    /// Reads the configuration from `GRIDSPACE_*` environment variables,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self, GridspaceError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reads through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, GridspaceError> {
        let mut config = Self::default();

        if let Some(addr) = lookup(ENV_BIND) {
            config.bind_addr = addr;
        }
        config.jwt_secret = lookup(ENV_JWT_SECRET).filter(|s| !s.is_empty());
        if let Some(raw) = lookup(ENV_JWT_REQUIRE_EXP) {
            config.require_exp = parse_flag(ENV_JWT_REQUIRE_EXP, &raw)?;
        }
        if let Some(raw) = lookup(ENV_SPACE_CHANNEL_SIZE) {
            config.space_channel_size = parse_positive(ENV_SPACE_CHANNEL_SIZE, &raw)?;
        }
        config.spaces_path = lookup(ENV_SPACES).map(PathBuf::from);
        if let Some(raw) = lookup(ENV_HANDSHAKE_TIMEOUT_SECS) {
            let secs = parse_positive(ENV_HANDSHAKE_TIMEOUT_SECS, &raw)?;
            config.handshake_timeout = Duration::from_secs(secs as u64);
        }
        if let Some(raw) = lookup(ENV_OUTBOUND_QUEUE_SIZE) {
            config.outbound_queue_size = parse_positive(ENV_OUTBOUND_QUEUE_SIZE, &raw)?;
        }

        Ok(config)
    }

    /// Builds the token validator.
    ///
    /// # Errors
    /// Fails when no secret is configured.
    pub fn validator(&self) -> Result<JwtValidator, GridspaceError> {
        let secret = self
            .jwt_secret
            .as_deref()
            .ok_or_else(|| GridspaceError::Config(format!("{ENV_JWT_SECRET} is not set")))?;
        Ok(JwtValidator::new(secret.as_bytes()).require_exp(self.require_exp))
    }

    /// Loads the space catalogue, or an empty directory when no path is
    /// configured.
    pub async fn directory(&self) -> Result<InMemorySpaceDirectory, GridspaceError> {
        match &self.spaces_path {
            Some(path) => load_catalogue(path).await,
            None => Ok(InMemorySpaceDirectory::new()),
        }
    }
}

/// Reads a JSON array of [`SpaceRecord`]s into a directory.
pub async fn load_catalogue(path: &Path) -> Result<InMemorySpaceDirectory, GridspaceError> {
    let raw = tokio::fs::read(path).await?;
    let records: Vec<SpaceRecord> = serde_json::from_slice(&raw)
        .map_err(|e| GridspaceError::Config(format!("invalid space catalogue {}: {e}", path.display())))?;
    let directory = InMemorySpaceDirectory::from_records(records)?;
    tracing::info!(path = %path.display(), spaces = directory.len().await, "space catalogue loaded");
    Ok(directory)
}

fn parse_positive(key: &str, raw: &str) -> Result<usize, GridspaceError> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(GridspaceError::Config(format!(
            "{key} must be a positive integer, got {raw:?}"
        ))),
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool, GridspaceError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(GridspaceError::Config(format!(
            "{key} must be a boolean, got {raw:?}"
        ))),
    }
}

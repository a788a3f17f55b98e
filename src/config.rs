//! Configuration management for the PDF page image service

use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Default render scale (2x = 144 DPI)
pub const DEFAULT_RENDER_SCALE: f32 = 2.0;
/// Default maximum image width in pixels
pub const DEFAULT_MAX_WIDTH: u32 = 1200;
/// Default upload limit: 200MB
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 200 * 1024 * 1024;
/// Default ceiling on PNG bytes held by the store: 1GB
pub const DEFAULT_STORE_MAX_TOTAL_BYTES: usize = 1024 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub render: RenderConfig,
    pub store: StoreConfig,
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Maximum accepted request body size in bytes
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    /// Base render scale applied to every page
    pub scale: f32,
    /// Pages rendering wider than this are re-rendered at a smaller scale
    pub max_width: u32,
    /// Upper bound for rendering a single page
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Maximum number of live sessions before LRU eviction kicks in
    pub max_sessions: usize,
    /// Idle time after which a session expires (0 disables expiry)
    pub session_ttl_secs: u64,
    /// How often the background sweeper purges expired sessions
    pub cleanup_interval_secs: u64,
    /// Total PNG bytes held across sessions (0 disables the ceiling)
    pub max_total_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Render scale must be a positive finite number, got {0}")]
    InvalidScale(f32),

    #[error("Maximum image width must be greater than zero")]
    InvalidMaxWidth,

    #[error("Render timeout must be at least one second")]
    InvalidTimeout,

    #[error("Store must allow at least one session")]
    InvalidMaxSessions,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8001,
                max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            },
            render: RenderConfig::default(),
            store: StoreConfig::default(),
            cors: CorsConfig::default(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            scale: DEFAULT_RENDER_SCALE,
            max_width: DEFAULT_MAX_WIDTH,
            timeout_secs: 30,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_sessions: 256,
            session_ttl_secs: 3600,
            cleanup_interval_secs: 60,
            max_total_bytes: DEFAULT_STORE_MAX_TOTAL_BYTES,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:3001".to_string(),
                "http://localhost:3002".to_string(),
            ],
        }
    }
}

impl RenderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl StoreConfig {
    /// Idle TTL, `None` when expiry is disabled
    pub fn session_ttl(&self) -> Option<Duration> {
        (self.session_ttl_secs > 0).then(|| Duration::from_secs(self.session_ttl_secs))
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs.max(1))
    }

    /// Byte ceiling, `None` when unbounded
    pub fn byte_limit(&self) -> Option<usize> {
        (self.max_total_bytes > 0).then_some(self.max_total_bytes)
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let config = Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_var("SERVER_PORT", defaults.server.port),
                max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", defaults.server.max_upload_bytes),
            },
            render: RenderConfig {
                scale: parse_var("RENDER_SCALE", defaults.render.scale),
                max_width: parse_var("RENDER_MAX_WIDTH", defaults.render.max_width),
                timeout_secs: parse_var("RENDER_TIMEOUT_SECS", defaults.render.timeout_secs),
            },
            store: StoreConfig {
                max_sessions: parse_var("STORE_MAX_SESSIONS", defaults.store.max_sessions),
                session_ttl_secs: parse_var(
                    "STORE_SESSION_TTL_SECS",
                    defaults.store.session_ttl_secs,
                ),
                cleanup_interval_secs: parse_var(
                    "STORE_CLEANUP_INTERVAL_SECS",
                    defaults.store.cleanup_interval_secs,
                ),
                max_total_bytes: parse_var(
                    "STORE_MAX_TOTAL_BYTES",
                    defaults.store.max_total_bytes,
                ),
            },
            cors: CorsConfig {
                allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                    .map(|raw| parse_origins(&raw))
                    .unwrap_or(defaults.cors.allowed_origins),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make extraction meaningless
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.render.scale.is_finite() || self.render.scale <= 0.0 {
            return Err(ConfigError::InvalidScale(self.render.scale));
        }
        if self.render.max_width == 0 {
            return Err(ConfigError::InvalidMaxWidth);
        }
        if self.render.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        if self.store.max_sessions == 0 {
            return Err(ConfigError::InvalidMaxSessions);
        }
        Ok(())
    }
}

/// Read and parse an environment variable, falling back to `default`
fn parse_var<T>(name: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid value {:?} for {}, using {}", raw, name, default);
            default
        }),
        Err(_) => default,
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

//! Process configuration read from the environment.

use std::net::SocketAddr;

use thiserror::Error;

const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {var}='{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// API server configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// HS256 key for bearer tokens.
    pub jwt_secret: String,
    pub bind_addr: SocketAddr,
    /// Capacity of the SSE broadcast channel.
    pub notify_buffer: usize,
}

impl ApiConfig {
    pub const DEFAULT_BIND_ADDR: &'static str = "0.0.0.0:8080";
    pub const DEFAULT_NOTIFY_BUFFER: usize = 256;

    /// Defaults with the given secret.
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            notify_buffer: Self::DEFAULT_NOTIFY_BUFFER,
        }
    }

    /// Read `JWT_SECRET`, `BIND_ADDR` and `NOTIFY_BUFFER`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = match lookup("JWT_SECRET").filter(|s| !s.trim().is_empty()) {
            Some(secret) => secret,
            None => {
                tracing::warn!("JWT_SECRET not set; using insecure dev default");
                DEV_JWT_SECRET.to_string()
            }
        };

        let bind_raw = lookup("BIND_ADDR").unwrap_or_else(|| Self::DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw.parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
            var: "BIND_ADDR",
            value: bind_raw.clone(),
            reason: e.to_string(),
        })?;

        let notify_buffer = match lookup("NOTIFY_BUFFER") {
            None => Self::DEFAULT_NOTIFY_BUFFER,
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                Ok(_) => {
                    return Err(ConfigError::Invalid {
                        var: "NOTIFY_BUFFER",
                        value: raw,
                        reason: "must be positive".to_string(),
                    });
                }
                Err(e) => {
                    return Err(ConfigError::Invalid {
                        var: "NOTIFY_BUFFER",
                        value: raw,
                        reason: e.to_string(),
                    });
                }
            },
        };

        Ok(Self {
            jwt_secret,
            bind_addr,
            notify_buffer,
        })
    }
}

impl core::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("jwt_secret", &"<redacted>")
            .field("bind_addr", &self.bind_addr)
            .field("notify_buffer", &self.notify_buffer)
            .finish()
    }
}

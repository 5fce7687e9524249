use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::client::ChannelConfig;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

/// Backend settings, read from `ROOMCHAT_*` environment variables
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Most recent messages returned per room
    pub history_limit: usize,
    pub csrf_token: String,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = parse_or(
            &lookup,
            "ROOMCHAT_BIND_ADDR",
            SocketAddr::from(([0, 0, 0, 0], 3000)),
        )?;

        let history_limit = parse_or(&lookup, "ROOMCHAT_HISTORY_LIMIT", 100usize)?;
        if history_limit == 0 {
            return Err(ConfigError::Invalid {
                name: "ROOMCHAT_HISTORY_LIMIT",
                value: "0".to_string(),
            });
        }

        // A fresh token per process unless one is pinned
        let csrf_token = lookup("ROOMCHAT_CSRF_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Ok(Self {
            bind_addr,
            history_limit,
            csrf_token,
        })
    }
}

/// Terminal client settings
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub server_url: String,
    pub username: String,
    pub default_room: String,
    pub reconnect_attempts: u32,
    pub reconnect_delay: Duration,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let server_url = lookup("ROOMCHAT_SERVER_URL")
            .unwrap_or_else(|| "http://127.0.0.1:3000".to_string());
        if !(server_url.starts_with("http://") || server_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                name: "ROOMCHAT_SERVER_URL",
                value: server_url,
            });
        }

        let username = lookup("ROOMCHAT_USERNAME")
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .ok_or(ConfigError::Missing("ROOMCHAT_USERNAME"))?;

        let default_room = lookup("ROOMCHAT_DEFAULT_ROOM")
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| "general".to_string());

        let reconnect_attempts = parse_or(&lookup, "ROOMCHAT_RECONNECT_ATTEMPTS", 5u32)?;
        let reconnect_delay_ms = parse_or(&lookup, "ROOMCHAT_RECONNECT_DELAY_MS", 1000u64)?;

        Ok(Self {
            server_url: server_url.trim_end_matches('/').to_string(),
            username,
            default_room,
            reconnect_attempts,
            reconnect_delay: Duration::from_millis(reconnect_delay_ms),
        })
    }

    /// The realtime channel endpoint on the same host as the HTTP API
    pub fn websocket_url(&self) -> String {
        let rest = self
            .server_url
            .strip_prefix("https://")
            .map(|rest| format!("wss://{rest}"))
            .or_else(|| {
                self.server_url
                    .strip_prefix("http://")
                    .map(|rest| format!("ws://{rest}"))
            })
            .unwrap_or_else(|| self.server_url.clone());
        format!("{rest}/ws")
    }

    pub fn channel_config(&self) -> ChannelConfig {
        ChannelConfig {
            url: self.websocket_url(),
            reconnect_attempts: self.reconnect_attempts,
            reconnect_delay: self.reconnect_delay,
        }
    }
}

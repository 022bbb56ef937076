use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{Error, Result};

/// Per-node configuration, loaded from a JSON file.
///
/// Durations are written as (possibly fractional) seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Local address to bind the UDP socket to
    pub bind: SocketAddr,
    /// Address of the next node in the ring
    pub successor: SocketAddr,
    /// Nickname identifying this node on the ring
    pub nickname: String,
    /// How long the node holds the token before passing it on
    #[serde(serialize_with = "super::serde::serialize_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_duration")]
    pub token_hold: Duration,
    /// Whether this node is the ring's single token generator
    #[serde(default)]
    pub token_generator: bool,
    /// How long the generator waits before declaring the token lost
    #[serde(default = "default_token_timeout")]
    #[serde(serialize_with = "super::serde::serialize_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_duration")]
    pub token_timeout: Duration,
    /// Simulated network latency applied before every token send
    #[serde(default = "default_forward_delay")]
    #[serde(serialize_with = "super::serde::serialize_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_duration")]
    pub forward_delay: Duration,
    /// Probability of corrupting one byte of a freshly sent data packet
    #[serde(default)]
    pub fault_probability: f64,
}

fn default_token_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_forward_delay() -> Duration {
    Duration::from_secs(3)
}

impl Config {
    /// Loads a configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::config(format!("failed to read {}: {}", path.as_ref().display(), e))
        })?;
        let config: Config = serde_json::from_str(&raw)
            .map_err(|e| Error::config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.nickname.is_empty() {
            return Err(Error::config("nickname must not be empty"));
        }
        if self.nickname.contains(';') || self.nickname.contains(':') {
            return Err(Error::config("nickname must not contain ';' or ':'"));
        }
        if !(0.0..=1.0).contains(&self.fault_probability) {
            return Err(Error::config("fault_probability must be within [0, 1]"));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind: format!("0.0.0.0:{}", super::DEFAULT_PORT).parse().unwrap(),
            successor: format!("127.0.0.1:{}", super::DEFAULT_PORT).parse().unwrap(),
            nickname: String::from("node"),
            token_hold: Duration::from_secs(1),
            token_generator: false,
            token_timeout: default_token_timeout(),
            forward_delay: default_forward_delay(),
            fault_probability: 0.0,
        }
    }
}

/// A node's fixed place in the ring.
///
/// Immutable after construction; every protocol component reads it.
#[derive(Debug, Clone)]
pub struct RingIdentity {
    /// Nickname identifying this node on the ring
    pub nickname: String,
    /// Address of the next node in the ring
    pub successor: SocketAddr,
    /// How long the node holds the token before passing it on
    pub token_hold: Duration,
    /// Whether this node is the ring's single token generator
    pub is_generator: bool,
}

impl RingIdentity {
    /// Extracts the identity portion of a configuration
    pub fn from_config(config: &Config) -> Self {
        RingIdentity {
            nickname: config.nickname.clone(),
            successor: config.successor,
            token_hold: config.token_hold,
            is_generator: config.token_generator,
        }
    }
}

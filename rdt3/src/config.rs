//! Startup parameters for both ends.
//!
//! Defaults: server `127.0.0.1:5001`, α = 0.125, β = 0.25, initial timeout
//! 1 s, loss 0.1, corruption 0.1.

use thiserror::Error;

use crate::simulator::ImpairmentConfig;
use crate::timer::RttConfig;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5001;

/// A parameter outside its valid range.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be a probability in [0, 1], got {value}")]
    Probability { name: &'static str, value: f64 },
    #[error("{name} must be in (0, 1], got {value}")]
    Weight { name: &'static str, value: f64 },
    #[error("initial timeout must be positive")]
    Timeout,
    #[error("max transmissions must be at least 1")]
    MaxTransmissions,
}

/// Parameters of the sending side.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub rtt: RttConfig,
    pub impairment: ImpairmentConfig,
    /// Give up on a payload after this many transmissions.
    ///
    /// `None` retries forever, which is what the protocol itself specifies.
    pub max_transmissions: Option<u32>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            rtt: RttConfig::default(),
            impairment: ImpairmentConfig::default(),
            max_transmissions: None,
        }
    }
}

impl ClientConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_impairment(&self.impairment)?;
        weight("alpha", self.rtt.alpha)?;
        weight("beta", self.rtt.beta)?;
        if self.rtt.initial_timeout.is_zero() {
            return Err(ConfigError::Timeout);
        }
        if self.max_transmissions == Some(0) {
            return Err(ConfigError::MaxTransmissions);
        }
        Ok(())
    }
}

/// Parameters of the receiving side.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub impairment: ImpairmentConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            impairment: ImpairmentConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_impairment(&self.impairment)
    }
}

fn validate_impairment(config: &ImpairmentConfig) -> Result<(), ConfigError> {
    probability("loss rate", config.loss_rate)?;
    probability("corruption rate", config.corrupt_rate)
}

fn probability(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Probability { name, value })
    }
}

fn weight(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::Weight { name, value })
    }
}

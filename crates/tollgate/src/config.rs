//! Relay configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default registration price in satoshis.
pub const DEFAULT_PRICE_SATS: u64 = 500;

/// Immutable relay configuration, built once at startup.
///
/// Every component receives it behind an `Arc`; nothing mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Public host name used in LNURL callbacks.
    pub domain: String,
    /// One-time registration price in satoshis.
    pub price_sats: u64,
    /// Whether admitted events must carry a valid id and signature.
    pub verify_signatures: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            domain: "localhost".to_string(),
            price_sats: DEFAULT_PRICE_SATS,
            verify_signatures: true,
        }
    }
}

impl RelayConfig {
    /// Check the configuration once before any component uses it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.domain.trim().is_empty() {
            return Err(ConfigError::EmptyDomain);
        }
        if self.price_sats == 0 {
            return Err(ConfigError::ZeroPrice);
        }
        if self.price_sats.checked_mul(1000).is_none() {
            return Err(ConfigError::PriceOverflow(self.price_sats));
        }
        Ok(())
    }

    /// The price in millisatoshis, the unit LNURL amounts use.
    pub fn price_msat(&self) -> u64 {
        self.price_sats.saturating_mul(1000)
    }
}

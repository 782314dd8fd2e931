//! Configuration for the Web of Trust engine.
//!
//! [`EngineConfig`] bundles the currency name with the network parameters
//! fixed at genesis.
//!
//! # Example
//!
//! ```
//! use wot_core::config::{EngineConfig, EngineConfigBuilder};
//!
//! // Use defaults
//! let config = EngineConfig::default();
//! assert!(config.validate().is_ok());
//!
//! // Or use builder for customization
//! let config = EngineConfigBuilder::new()
//!     .with_currency("bb")
//!     .with_idty_window(1)
//!     .with_ms_validity(10_000)
//!     .with_sig_qty(1)
//!     .build_validated()
//!     .unwrap();
//! assert_eq!(config.params.sig_qty, 1);
//! ```

use serde::{Deserialize, Serialize};
use wot_chain::{ChainError, IdentityReusePolicy, WotParams};

/// Default currency name.
const DEFAULT_CURRENCY: &str = "wot";

/// Engine configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Currency the chain belongs to, used in logs.
    pub currency: String,

    /// Network parameters.
    pub params: WotParams,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            currency: DEFAULT_CURRENCY.to_string(),
            params: WotParams::default(),
        }
    }
}

impl EngineConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a configuration for the given parameters.
    pub fn from_params(params: WotParams) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if any value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.currency.trim().is_empty() {
            return Err(ConfigError::Missing("currency".into()));
        }

        self.params.validate().map_err(|e| match e {
            ChainError::InvalidParameter { field, reason } => ConfigError::InvalidValue {
                field: format!("params.{}", field),
                reason,
            },
            other => ConfigError::InvalidValue {
                field: "params".into(),
                reason: other.to_string(),
            },
        })
    }
}

/// Builder for constructing `EngineConfig` with custom values.
#[derive(Clone, Debug, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    /// Build the final configuration.
    pub fn build(self) -> EngineConfig {
        self.config
    }

    /// Build and validate the configuration.
    ///
    /// Returns an error if validation fails.
    pub fn build_validated(self) -> Result<EngineConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }

    /// Set the currency name.
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.config.currency = currency.into();
        self
    }

    /// Replace all network parameters.
    pub fn with_params(mut self, params: WotParams) -> Self {
        self.config.params = params;
        self
    }

    // ===== Network Parameters =====

    /// Set the identity window in seconds.
    pub fn with_idty_window(mut self, secs: u64) -> Self {
        self.config.params.idty_window = secs;
        self
    }

    /// Set the membership validity in seconds.
    pub fn with_ms_validity(mut self, secs: u64) -> Self {
        self.config.params.ms_validity = secs;
        self
    }

    /// Set the certification validity in seconds.
    pub fn with_cert_validity_period(mut self, secs: u64) -> Self {
        self.config.params.cert_validity_period = secs;
        self
    }

    /// Set the certification quorum.
    pub fn with_sig_qty(mut self, sig_qty: u32) -> Self {
        self.config.params.sig_qty = sig_qty;
        self
    }

    /// Set the fork window in blocks.
    pub fn with_forksize(mut self, forksize: u64) -> Self {
        self.config.params.forksize = forksize;
        self
    }

    /// Set the reuse policy for pruned keys and uids.
    pub fn with_reuse_policy(mut self, policy: IdentityReusePolicy) -> Self {
        self.config.params.reuse_policy = policy;
        self
    }
}

/// Configuration error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Invalid configuration value.
    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue {
        /// The field name.
        field: String,
        /// The reason it's invalid.
        reason: String,
    },

    /// Missing required configuration.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert_eq!(config.currency, "wot");
        assert_eq!(config.params, WotParams::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_sets_params() {
        let config = EngineConfigBuilder::new()
            .with_currency("bb")
            .with_idty_window(1)
            .with_ms_validity(10_000)
            .with_cert_validity_period(20_000)
            .with_sig_qty(1)
            .with_forksize(3)
            .with_reuse_policy(IdentityReusePolicy::Allow)
            .build();

        assert_eq!(config.currency, "bb");
        assert_eq!(config.params.idty_window, 1);
        assert_eq!(config.params.ms_validity, 10_000);
        assert_eq!(config.params.cert_validity_period, 20_000);
        assert_eq!(config.params.sig_qty, 1);
        assert_eq!(config.params.forksize, 3);
        assert!(config.params.reuse_policy.allows_reuse());
    }

    #[test]
    fn test_invalid_param_reported_with_field() {
        let err = EngineConfigBuilder::new()
            .with_ms_validity(0)
            .build_validated()
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                field: "params.msValidity".into(),
                reason: "window must be greater than zero".into(),
            }
        );
    }

    #[test]
    fn test_empty_currency_missing() {
        let err = EngineConfigBuilder::new()
            .with_currency("  ")
            .build_validated()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
    }

    #[test]
    fn test_deserialize_config() {
        let json = r#"{"currency": "bb", "params": {"sigQty": 1, "idtyWindow": 1}}"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.currency, "bb");
        assert_eq!(config.params.sig_qty, 1);
        assert_eq!(config.params.ms_validity, WotParams::default().ms_validity);
    }
}

//! # wot-core
//!
//! High-level API for the Web of Trust engine.
//!
//! Provides:
//! - Engine configuration with a builder
//! - The async engine: one block writer, concurrent snapshot readers
//! - Requirements queries by public key or uid

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod engine;
pub mod error;
pub mod requirements;

pub use config::{ConfigError, EngineConfig, EngineConfigBuilder};
pub use engine::WotEngine;
pub use error::{CoreError, Result};
pub use requirements::{
    CertificationRequirement, IdentityRequirements, RequirementsResult, RequirementsService,
};

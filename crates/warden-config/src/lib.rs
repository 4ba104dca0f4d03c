// crates/warden-config/src/lib.rs
// ============================================================================
// Module: Warden Config Library
// Description: Configuration loading and key file management.
// Purpose: Expose fail-closed config parsing and the shared key files.
// Dependencies: crate::{config, keys}
// ============================================================================

//! ## Overview
//! Configuration comes from a TOML file with strict size limits and unknown
//! fields rejected, then from a small set of environment overrides. Nothing
//! is required: defaults place every path under the user's home directory
//! and every limit at a safe value.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod keys;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::AdapterSection;
pub use config::AllowlistSeed;
pub use config::AnomalySection;
pub use config::ConfigError;
pub use config::LimitsSection;
pub use config::LogSection;
pub use config::LogTarget;
pub use config::RateSection;
pub use config::WardenConfig;
pub use keys::KeyError;
pub use keys::load_key;
pub use keys::load_or_create_key;
pub use keys::write_key;

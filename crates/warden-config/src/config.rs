// crates/warden-config/src/config.rs
// ============================================================================
// Module: Warden Configuration
// Description: Configuration loading and validation for the gateway.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: warden-core, serde, toml, dirs-next
// ============================================================================

//! ## Overview
//! The gateway reads one TOML file, applies environment overrides, and
//! validates the result before anything opens a socket or a store. Unknown
//! fields, oversized files, and out-of-range limits fail closed. No
//! environment variable is required for correct operation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;
use warden_core::ActionKind;
use warden_core::Domain;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename inside the data directory.
const DEFAULT_CONFIG_NAME: &str = "warden.toml";
/// Default data directory name under the user's home.
const DEFAULT_DATA_DIR_NAME: &str = ".warden";
/// Environment variable overriding the config file path.
pub const CONFIG_ENV_VAR: &str = "WARDEN_CONFIG";
/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV_VAR: &str = "WARDEN_DATA_DIR";
/// Environment variable overriding the socket path.
pub const SOCKET_ENV_VAR: &str = "WARDEN_SOCKET_PATH";
/// Environment variable overriding the signing key path.
pub const SIGNING_KEY_ENV_VAR: &str = "WARDEN_SIGNING_KEY_PATH";
/// Environment variable overriding the global rate limit.
pub const RATE_GLOBAL_ENV_VAR: &str = "WARDEN_RATE_GLOBAL_LIMIT";
/// Environment variable overriding the rate window.
pub const RATE_WINDOW_ENV_VAR: &str = "WARDEN_RATE_WINDOW_MS";
/// Environment variable overriding the payload size cap.
pub const MAX_PAYLOAD_ENV_VAR: &str = "WARDEN_MAX_PAYLOAD_BYTES";
/// Environment variable overriding the burst threshold.
pub const BURST_THRESHOLD_ENV_VAR: &str = "WARDEN_BURST_THRESHOLD";
/// Environment variable overriding the replay window.
pub const REPLAY_WINDOW_ENV_VAR: &str = "WARDEN_REPLAY_WINDOW_MS";

/// Maximum configuration file size in bytes.
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;
/// Maximum rate window accepted, in milliseconds.
const MAX_RATE_WINDOW_MS: u64 = 24 * 60 * 60 * 1_000;
/// Maximum replay window accepted, in milliseconds.
const MAX_REPLAY_WINDOW_MS: u64 = 60 * 60 * 1_000;
/// Maximum payload size cap accepted, in bytes.
const MAX_PAYLOAD_CAP_BYTES: u64 = 64 * 1024 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file I/O failed.
    #[error("config io error: {0}")]
    Io(String),
    /// Config file failed to parse.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Config file exceeds the size limit.
    #[error("config file too large: {actual} bytes (max {max})")]
    TooLarge {
        /// Actual file size in bytes.
        actual: u64,
        /// Maximum permitted file size in bytes.
        max: u64,
    },
    /// A value is out of its accepted range.
    #[error("config invalid: {0}")]
    Invalid(String),
    /// The user's home directory could not be determined.
    #[error("home directory unavailable")]
    NoHome,
}

// ============================================================================
// SECTION: Sections
// ============================================================================

/// Operational log target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogTarget {
    /// JSON lines to stderr.
    #[default]
    Stderr,
    /// JSON lines appended to a file.
    File,
    /// No operational logging.
    None,
}

/// Operational logging section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogSection {
    /// Log target.
    #[serde(default)]
    pub target: LogTarget,
    /// Log file path, required when the target is `file`.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Rate limiter section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateSection {
    /// Per-action caps keyed by wire action name.
    #[serde(default)]
    pub action_limits: BTreeMap<String, u32>,
    /// Cap across all actions within the window.
    #[serde(default = "default_global_limit")]
    pub global_limit: u32,
    /// Sliding window length in milliseconds; zero disables limiting.
    #[serde(default = "default_rate_window_ms")]
    pub window_ms: u64,
}

impl Default for RateSection {
    fn default() -> Self {
        Self {
            action_limits: BTreeMap::new(),
            global_limit: default_global_limit(),
            window_ms: default_rate_window_ms(),
        }
    }
}

/// Anomaly detector section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnomalySection {
    /// Maximum accepted payload size in bytes.
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: u64,
    /// Events per (action, identity) that constitute a burst.
    #[serde(default = "default_burst_threshold")]
    pub burst_threshold: u32,
    /// Burst window length in milliseconds.
    #[serde(default = "default_burst_window_ms")]
    pub burst_window_ms: u64,
}

impl Default for AnomalySection {
    fn default() -> Self {
        Self {
            max_payload_bytes: default_max_payload_bytes(),
            burst_threshold: default_burst_threshold(),
            burst_window_ms: default_burst_window_ms(),
        }
    }
}

/// Pipeline limits section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsSection {
    /// Replay window in milliseconds.
    #[serde(default = "default_replay_window_ms")]
    pub replay_window_ms: u64,
    /// Default dispatch deadline in milliseconds.
    #[serde(default = "default_dispatch_timeout_ms")]
    pub dispatch_timeout_ms: u64,
    /// Per-action dispatch deadline overrides keyed by wire action name.
    #[serde(default)]
    pub action_timeouts_ms: BTreeMap<String, u64>,
    /// Maximum accepted IPC frame size in bytes.
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: u64,
}

impl Default for LimitsSection {
    fn default() -> Self {
        Self {
            replay_window_ms: default_replay_window_ms(),
            dispatch_timeout_ms: default_dispatch_timeout_ms(),
            action_timeouts_ms: BTreeMap::new(),
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

/// One pre-seeded allowlist entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AllowlistSeed {
    /// Human-readable service name.
    pub name: String,
    /// Authorized domain.
    pub domain: String,
}

/// Adapter configuration section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdapterSection {
    /// Web search provider endpoint.
    #[serde(default)]
    pub search_endpoint: Option<String>,
    /// Web search provider domain, used for its credential lookup.
    #[serde(default)]
    pub search_domain: Option<String>,
    /// OAuth token refresh endpoints keyed by provider domain.
    #[serde(default)]
    pub token_endpoints: BTreeMap<String, String>,
    /// Models directory override; `data_dir/models` when absent.
    #[serde(default)]
    pub models_dir: Option<PathBuf>,
}

// ============================================================================
// SECTION: Raw File Shape
// ============================================================================

/// Raw TOML shape before defaults and overrides are applied.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    /// Data directory override.
    #[serde(default)]
    data_dir: Option<PathBuf>,
    /// Socket path override.
    #[serde(default)]
    socket_path: Option<PathBuf>,
    /// Signing key path override.
    #[serde(default)]
    signing_key_path: Option<PathBuf>,
    /// Credential sealing key path override.
    #[serde(default)]
    credential_key_path: Option<PathBuf>,
    /// Operational logging section.
    #[serde(default)]
    log: LogSection,
    /// Rate limiter section.
    #[serde(default)]
    rate: RateSection,
    /// Anomaly detector section.
    #[serde(default)]
    anomaly: AnomalySection,
    /// Pipeline limits section.
    #[serde(default)]
    limits: LimitsSection,
    /// Pre-seeded allowlist entries.
    #[serde(default)]
    allowlist: Vec<AllowlistSeed>,
    /// Adapter configuration.
    #[serde(default)]
    adapters: AdapterSection,
}

// ============================================================================
// SECTION: Resolved Configuration
// ============================================================================

/// Fully resolved gateway configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WardenConfig {
    /// Private directory holding every datastore.
    pub data_dir: PathBuf,
    /// Listening socket path.
    pub socket_path: PathBuf,
    /// Shared signing key file path.
    pub signing_key_path: PathBuf,
    /// Credential sealing key file path.
    pub credential_key_path: PathBuf,
    /// Operational logging.
    pub log: LogSection,
    /// Rate limiter settings with typed action keys.
    pub rate_action_limits: BTreeMap<ActionKind, u32>,
    /// Cap across all actions within the window.
    pub rate_global_limit: u32,
    /// Rate window in milliseconds.
    pub rate_window_ms: u64,
    /// Anomaly settings.
    pub anomaly: AnomalySection,
    /// Replay window in milliseconds.
    pub replay_window_ms: u64,
    /// Default dispatch deadline in milliseconds.
    pub dispatch_timeout_ms: u64,
    /// Per-action dispatch deadline overrides with typed keys.
    pub action_timeouts_ms: BTreeMap<ActionKind, u64>,
    /// Maximum accepted IPC frame size in bytes.
    pub max_frame_bytes: u64,
    /// Pre-seeded allowlist entries with validated domains.
    pub allowlist_seeds: Vec<(String, Domain)>,
    /// Adapter configuration.
    pub adapters: AdapterSection,
}

impl WardenConfig {
    /// Loads configuration from the default locations.
    ///
    /// Order: `WARDEN_CONFIG` path if set, else `data_dir/warden.toml` if it
    /// exists, else pure defaults. Environment overrides apply last.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file is malformed or a value is out
    /// of range.
    pub fn load() -> Result<Self, ConfigError> {
        let data_dir = default_data_dir()?;
        let config_path = match env::var(CONFIG_ENV_VAR) {
            Ok(path) => Some(PathBuf::from(path)),
            Err(_) => {
                let default_path = data_dir.join(DEFAULT_CONFIG_NAME);
                default_path.exists().then_some(default_path)
            }
        };
        let raw = match config_path {
            Some(path) => read_raw(&path)?,
            None => RawConfig::default(),
        };
        Self::resolve(raw, data_dir)
    }

    /// Loads configuration from an explicit file path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file is missing, malformed, or a
    /// value is out of range.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let raw = read_raw(path)?;
        let data_dir = default_data_dir()?;
        Self::resolve(raw, data_dir)
    }

    /// Applies defaults, environment overrides, and validation.
    fn resolve(mut raw: RawConfig, default_data_dir: PathBuf) -> Result<Self, ConfigError> {
        apply_env_overrides(&mut raw)?;
        validate_limits(&raw)?;

        let data_dir = raw.data_dir.unwrap_or(default_data_dir);
        let socket_path = raw.socket_path.unwrap_or_else(|| data_dir.join("warden.sock"));
        let signing_key_path =
            raw.signing_key_path.unwrap_or_else(|| data_dir.join("signing.key"));
        let credential_key_path =
            raw.credential_key_path.unwrap_or_else(|| data_dir.join("credential.key"));

        let rate_action_limits = typed_action_map(&raw.rate.action_limits)?;
        let action_timeouts_ms = typed_action_map(&raw.limits.action_timeouts_ms)?;
        let mut allowlist_seeds = Vec::with_capacity(raw.allowlist.len());
        for seed in &raw.allowlist {
            let domain = Domain::new(seed.domain.clone())
                .map_err(|err| ConfigError::Invalid(format!("allowlist seed: {err}")))?;
            allowlist_seeds.push((seed.name.clone(), domain));
        }

        if raw.log.target == LogTarget::File && raw.log.path.is_none() {
            return Err(ConfigError::Invalid("log.target = \"file\" requires log.path".to_string()));
        }

        Ok(Self {
            data_dir,
            socket_path,
            signing_key_path,
            credential_key_path,
            log: raw.log,
            rate_action_limits,
            rate_global_limit: raw.rate.global_limit,
            rate_window_ms: raw.rate.window_ms,
            anomaly: raw.anomaly,
            replay_window_ms: raw.limits.replay_window_ms,
            dispatch_timeout_ms: raw.limits.dispatch_timeout_ms,
            action_timeouts_ms,
            max_frame_bytes: raw.limits.max_frame_bytes,
            allowlist_seeds,
            adapters: raw.adapters,
        })
    }

    /// Returns the audit database path.
    #[must_use]
    pub fn audit_db_path(&self) -> PathBuf {
        self.data_dir.join("audit.db")
    }

    /// Returns the configuration database path.
    #[must_use]
    pub fn config_db_path(&self) -> PathBuf {
        self.data_dir.join("config.db")
    }

    /// Returns the reminder database path.
    #[must_use]
    pub fn reminders_db_path(&self) -> PathBuf {
        self.data_dir.join("reminders.db")
    }

    /// Returns the models directory.
    #[must_use]
    pub fn models_dir(&self) -> PathBuf {
        self.adapters
            .models_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("models"))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads and parses a raw config file with the size limit applied.
fn read_raw(path: &Path) -> Result<RawConfig, ConfigError> {
    let metadata = fs::metadata(path).map_err(|err| ConfigError::Io(err.to_string()))?;
    if metadata.len() > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::TooLarge {
            actual: metadata.len(),
            max: MAX_CONFIG_FILE_SIZE,
        });
    }
    let text = fs::read_to_string(path).map_err(|err| ConfigError::Io(err.to_string()))?;
    toml::from_str(&text).map_err(|err| ConfigError::Parse(err.to_string()))
}

/// Returns the default data directory under the user's home.
fn default_data_dir() -> Result<PathBuf, ConfigError> {
    match env::var(DATA_DIR_ENV_VAR) {
        Ok(path) => Ok(PathBuf::from(path)),
        Err(_) => {
            dirs_next::home_dir().map(|home| home.join(DEFAULT_DATA_DIR_NAME)).ok_or(ConfigError::NoHome)
        }
    }
}

/// Applies environment overrides onto the raw shape.
fn apply_env_overrides(raw: &mut RawConfig) -> Result<(), ConfigError> {
    if let Ok(path) = env::var(DATA_DIR_ENV_VAR) {
        raw.data_dir = Some(PathBuf::from(path));
    }
    if let Ok(path) = env::var(SOCKET_ENV_VAR) {
        raw.socket_path = Some(PathBuf::from(path));
    }
    if let Ok(path) = env::var(SIGNING_KEY_ENV_VAR) {
        raw.signing_key_path = Some(PathBuf::from(path));
    }
    if let Some(value) = parse_env(RATE_GLOBAL_ENV_VAR)? {
        raw.rate.global_limit = value;
    }
    if let Some(value) = parse_env(RATE_WINDOW_ENV_VAR)? {
        raw.rate.window_ms = value;
    }
    if let Some(value) = parse_env(MAX_PAYLOAD_ENV_VAR)? {
        raw.anomaly.max_payload_bytes = value;
    }
    if let Some(value) = parse_env(BURST_THRESHOLD_ENV_VAR)? {
        raw.anomaly.burst_threshold = value;
    }
    if let Some(value) = parse_env(REPLAY_WINDOW_ENV_VAR)? {
        raw.limits.replay_window_ms = value;
    }
    Ok(())
}

/// Parses a numeric environment override, failing closed on bad values.
fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(format!("{name} is not a valid number: {value}"))),
        Err(_) => Ok(None),
    }
}

/// Validates range limits on the raw shape.
fn validate_limits(raw: &RawConfig) -> Result<(), ConfigError> {
    if raw.rate.window_ms > MAX_RATE_WINDOW_MS {
        return Err(ConfigError::Invalid(format!(
            "rate.window_ms out of range: {} (max {MAX_RATE_WINDOW_MS})",
            raw.rate.window_ms
        )));
    }
    if raw.limits.replay_window_ms == 0 || raw.limits.replay_window_ms > MAX_REPLAY_WINDOW_MS {
        return Err(ConfigError::Invalid(format!(
            "limits.replay_window_ms out of range: {} (1..={MAX_REPLAY_WINDOW_MS})",
            raw.limits.replay_window_ms
        )));
    }
    if raw.anomaly.max_payload_bytes == 0 || raw.anomaly.max_payload_bytes > MAX_PAYLOAD_CAP_BYTES {
        return Err(ConfigError::Invalid(format!(
            "anomaly.max_payload_bytes out of range: {} (1..={MAX_PAYLOAD_CAP_BYTES})",
            raw.anomaly.max_payload_bytes
        )));
    }
    if raw.limits.dispatch_timeout_ms == 0 {
        return Err(ConfigError::Invalid(
            "limits.dispatch_timeout_ms must be greater than zero".to_string(),
        ));
    }
    if raw.limits.max_frame_bytes == 0 {
        return Err(ConfigError::Invalid(
            "limits.max_frame_bytes must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// Converts a wire-name keyed map into a typed action map.
fn typed_action_map<V: Copy>(
    map: &BTreeMap<String, V>,
) -> Result<BTreeMap<ActionKind, V>, ConfigError> {
    let mut typed = BTreeMap::new();
    for (name, value) in map {
        let kind = ActionKind::parse(name)
            .ok_or_else(|| ConfigError::Invalid(format!("unknown action kind: {name}")))?;
        typed.insert(kind, *value);
    }
    Ok(typed)
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Returns the default global rate limit.
const fn default_global_limit() -> u32 {
    1_000
}

/// Returns the default rate window in milliseconds.
const fn default_rate_window_ms() -> u64 {
    60_000
}

/// Returns the default payload size cap in bytes.
const fn default_max_payload_bytes() -> u64 {
    1024 * 1024
}

/// Returns the default burst threshold.
const fn default_burst_threshold() -> u32 {
    30
}

/// Returns the default burst window in milliseconds.
const fn default_burst_window_ms() -> u64 {
    10_000
}

/// Returns the default replay window in milliseconds.
const fn default_replay_window_ms() -> u64 {
    300_000
}

/// Returns the default dispatch deadline in milliseconds.
const fn default_dispatch_timeout_ms() -> u64 {
    30_000
}

/// Returns the default IPC frame cap in bytes.
const fn default_max_frame_bytes() -> u64 {
    4 * 1024 * 1024
}

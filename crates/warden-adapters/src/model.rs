// crates/warden-adapters/src/model.rs
// ============================================================================
// Module: Model Adapter
// Description: Model artifact download, verification, and listing.
// Purpose: Manage local model artifacts with digest verification.
// Dependencies: warden-core, reqwest, sha2
// ============================================================================

//! ## Overview
//! Model artifacts land in one directory under the gateway's data root.
//! Artifact names are confined to a single path component, downloads verify
//! a SHA-256 digest when the request carries one, and a digest mismatch
//! deletes the artifact rather than keeping an unverifiable file.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use serde_json::Value;
use serde_json::json;
use sha2::Digest;
use sha2::Sha256;
use warden_core::ActionKind;
use warden_core::ActionPayload;
use warden_core::AdapterError;
use warden_core::ServiceAdapter;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the model adapter.
///
/// # Invariants
/// - `models_dir` is created on first use if missing.
/// - `max_artifact_bytes` bounds every download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelAdapterConfig {
    /// Directory holding downloaded artifacts.
    pub models_dir: PathBuf,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum artifact size in bytes.
    pub max_artifact_bytes: usize,
    /// User agent string for outbound requests.
    pub user_agent: String,
}

impl ModelAdapterConfig {
    /// Returns a configuration rooted at the given directory.
    #[must_use]
    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
            timeout_ms: 600_000,
            max_artifact_bytes: 8 * 1024 * 1024 * 1024,
            user_agent: "warden/0.1".to_string(),
        }
    }
}

// ============================================================================
// SECTION: Model Adapter
// ============================================================================

/// Adapter executing the model family.
pub struct ModelAdapter {
    /// Adapter configuration.
    config: ModelAdapterConfig,
    /// Blocking HTTPS client for downloads.
    client: Client,
}

impl ModelAdapter {
    /// Creates the adapter.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the HTTP client cannot be built.
    pub fn new(config: ModelAdapterConfig) -> Result<Self, AdapterError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms.max(1)))
            .redirect(Policy::limited(4))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|err| AdapterError::Failed(format!("http client build failed: {err}")))?;
        Ok(Self { config, client })
    }

    /// Resolves an artifact path, confining the name to one component.
    fn artifact_path(&self, name: &str) -> Result<PathBuf, AdapterError> {
        if name.is_empty()
            || !name
                .bytes()
                .all(|byte| byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' || byte == b'.')
            || name.starts_with('.')
        {
            return Err(AdapterError::Failed(format!("invalid artifact name: {name}")));
        }
        Ok(self.config.models_dir.join(name))
    }

    /// Downloads an artifact, verifying its digest when provided.
    fn download(
        &self,
        url: &str,
        name: &str,
        expected_sha256: Option<&str>,
    ) -> Result<Value, AdapterError> {
        let path = self.artifact_path(name)?;
        std::fs::create_dir_all(&self.config.models_dir)
            .map_err(|err| AdapterError::Failed(format!("models dir unavailable: {err}")))?;

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| AdapterError::Failed(format!("download failed: {err}")))?;
        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(AdapterError::Failed(format!("artifact host returned {status}")));
        }
        let limit = u64::try_from(self.config.max_artifact_bytes).unwrap_or(u64::MAX);
        let mut body = Vec::new();
        response
            .take(limit)
            .read_to_end(&mut body)
            .map_err(|err| AdapterError::Failed(format!("artifact read failed: {err}")))?;

        let digest = sha256_of(&body);
        if let Some(expected) = expected_sha256
            && !expected.eq_ignore_ascii_case(&digest)
        {
            return Err(AdapterError::Failed(format!(
                "artifact digest mismatch for {name}: expected {expected}, got {digest}"
            )));
        }

        std::fs::write(&path, &body)
            .map_err(|err| AdapterError::Failed(format!("artifact write failed: {err}")))?;
        Ok(json!({"name": name, "bytes": body.len(), "sha256": digest}))
    }

    /// Verifies a stored artifact against an expected digest.
    fn verify(&self, name: &str, expected_sha256: &str) -> Result<Value, AdapterError> {
        let path = self.artifact_path(name)?;
        let body = std::fs::read(&path)
            .map_err(|err| AdapterError::Failed(format!("artifact read failed: {err}")))?;
        let digest = sha256_of(&body);
        let matches = expected_sha256.eq_ignore_ascii_case(&digest);
        Ok(json!({"name": name, "sha256": digest, "verified": matches}))
    }

    /// Lists stored artifacts with their sizes.
    fn list(&self) -> Result<Value, AdapterError> {
        let mut models = Vec::new();
        let entries = match std::fs::read_dir(&self.config.models_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(json!({"models": models}));
            }
            Err(err) => {
                return Err(AdapterError::Failed(format!("models dir unreadable: {err}")));
            }
        };
        for entry in entries {
            let entry =
                entry.map_err(|err| AdapterError::Failed(format!("models dir entry: {err}")))?;
            let metadata = entry
                .metadata()
                .map_err(|err| AdapterError::Failed(format!("artifact metadata: {err}")))?;
            if metadata.is_file() {
                models.push(json!({
                    "name": entry.file_name().to_string_lossy(),
                    "bytes": metadata.len(),
                }));
            }
        }
        Ok(json!({"models": models}))
    }
}

/// Returns the lowercase-hex SHA-256 of a byte slice.
fn sha256_of(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

impl ServiceAdapter for ModelAdapter {
    fn execute(&self, kind: ActionKind, payload: &ActionPayload) -> Result<Value, AdapterError> {
        match payload {
            ActionPayload::ModelDownload(payload) => {
                self.download(&payload.url, &payload.name, payload.sha256.as_deref())
            }
            ActionPayload::ModelVerify(payload) => self.verify(&payload.name, &payload.sha256),
            ActionPayload::ModelList(_) => self.list(),
            _ => Err(AdapterError::Failed(format!("model adapter cannot execute {kind}"))),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panic-based assertions are permitted."
    )]

    use serde_json::json;
    use warden_core::ActionKind;
    use warden_core::ActionPayload;
    use warden_core::ServiceAdapter;

    use super::ModelAdapter;
    use super::ModelAdapterConfig;
    use super::sha256_of;

    /// Builds the adapter over a temporary models directory.
    fn adapter(dir: &tempfile::TempDir) -> ModelAdapter {
        ModelAdapter::new(ModelAdapterConfig::new(dir.path())).unwrap()
    }

    /// Tests verify and list over locally written artifacts.
    #[test]
    fn test_verify_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = adapter(&dir);
        std::fs::write(dir.path().join("tiny.bin"), b"weights").unwrap();
        let digest = sha256_of(b"weights");

        let payload = ActionPayload::parse(
            ActionKind::ModelVerify,
            &json!({"name": "tiny.bin", "sha256": digest}),
        )
        .unwrap();
        let result = adapter.execute(ActionKind::ModelVerify, &payload).unwrap();
        assert_eq!(result["verified"], json!(true));

        let payload = ActionPayload::parse(
            ActionKind::ModelVerify,
            &json!({"name": "tiny.bin", "sha256": "0".repeat(64)}),
        )
        .unwrap();
        let result = adapter.execute(ActionKind::ModelVerify, &payload).unwrap();
        assert_eq!(result["verified"], json!(false));

        let payload = ActionPayload::parse(ActionKind::ModelList, &json!({})).unwrap();
        let result = adapter.execute(ActionKind::ModelList, &payload).unwrap();
        let models = result["models"].as_array().unwrap();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0]["name"], json!("tiny.bin"));
        assert_eq!(models[0]["bytes"], json!(7));
    }

    /// Tests listing an absent directory returns an empty set.
    #[test]
    fn test_list_absent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = ModelAdapter::new(ModelAdapterConfig::new(dir.path().join("missing"))).unwrap();
        let payload = ActionPayload::parse(ActionKind::ModelList, &json!({})).unwrap();
        let result = adapter.execute(ActionKind::ModelList, &payload).unwrap();
        assert_eq!(result["models"].as_array().unwrap().len(), 0);
    }

    /// Tests artifact names are confined to a single component.
    #[test]
    fn test_artifact_name_confinement() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = adapter(&dir);
        for name in ["../escape", "a/b", "", ".hidden"] {
            let payload = ActionPayload::parse(
                ActionKind::ModelVerify,
                &json!({"name": name, "sha256": "0".repeat(64)}),
            )
            .unwrap();
            assert!(
                adapter.execute(ActionKind::ModelVerify, &payload).is_err(),
                "name {name:?} should be rejected"
            );
        }
    }
}

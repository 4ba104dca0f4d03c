// crates/warden-adapters/src/web.rs
// ============================================================================
// Module: Web Adapter
// Description: Web search and bounded resource fetch.
// Purpose: Execute web.search and web.fetch with strict limits.
// Dependencies: warden-core, reqwest, serde_json
// ============================================================================

//! ## Overview
//! The web adapter issues bounded blocking requests. Fetches never follow
//! redirects (a redirect would silently leave the allowlisted domain) and
//! bodies are read up to a hard cap. Search goes through a configured
//! provider endpoint; without one, search fails as not configured. An API
//! key for the search provider is resolved from the credential store and
//! never appears in results.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use serde_json::Value;
use serde_json::json;
use warden_core::ActionKind;
use warden_core::ActionPayload;
use warden_core::AdapterError;
use warden_core::CredentialStore;
use warden_core::ServiceAdapter;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the web adapter.
///
/// # Invariants
/// - `max_fetch_bytes` is a hard upper bound on fetched bodies.
/// - `timeout_ms` applies to the full request lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebAdapterConfig {
    /// Search provider endpoint; search is not configured when absent.
    pub search_endpoint: Option<String>,
    /// Search provider domain, used to resolve its API key.
    pub search_domain: Option<String>,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum fetched body size in bytes.
    pub max_fetch_bytes: usize,
    /// User agent string for outbound requests.
    pub user_agent: String,
}

impl Default for WebAdapterConfig {
    fn default() -> Self {
        Self {
            search_endpoint: None,
            search_domain: None,
            timeout_ms: 10_000,
            max_fetch_bytes: 1024 * 1024,
            user_agent: "warden/0.1".to_string(),
        }
    }
}

// ============================================================================
// SECTION: Web Adapter
// ============================================================================

/// Adapter executing `web.search` and `web.fetch`.
pub struct WebAdapter {
    /// Adapter configuration.
    config: WebAdapterConfig,
    /// Credential store for the search provider key.
    credentials: Arc<dyn CredentialStore>,
    /// Blocking HTTP client with redirects disabled.
    client: Client,
}

impl WebAdapter {
    /// Creates the adapter.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the HTTP client cannot be built.
    pub fn new(
        config: WebAdapterConfig,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self, AdapterError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .redirect(Policy::none())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|err| AdapterError::Failed(format!("http client build failed: {err}")))?;
        Ok(Self {
            config,
            credentials,
            client,
        })
    }

    /// Executes a search against the configured provider.
    fn search(&self, query: &str, max_results: Option<u32>) -> Result<Value, AdapterError> {
        let endpoint = self.config.search_endpoint.as_deref().ok_or_else(|| {
            AdapterError::NotConfigured("no web search provider configured".to_string())
        })?;
        let mut request = self
            .client
            .get(endpoint)
            .query(&[("q", query)])
            .query(&[("count", max_results.unwrap_or(10))]);
        if let Some(domain) = &self.config.search_domain {
            let credential = self
                .credentials
                .find_for_service(domain)
                .map_err(|err| AdapterError::Failed(err.to_string()))?;
            if let Some(credential) = credential {
                request = request.bearer_auth(credential.secret);
            }
        }
        let response =
            request.send().map_err(|err| AdapterError::Failed(format!("search failed: {err}")))?;
        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(AdapterError::Failed(format!("search provider returned {status}")));
        }
        let body: Value = response
            .json()
            .map_err(|err| AdapterError::Failed(format!("search response not json: {err}")))?;
        Ok(json!({"results": body}))
    }

    /// Fetches a resource with the configured size cap.
    fn fetch(&self, url: &str, max_bytes: Option<u64>) -> Result<Value, AdapterError> {
        let cap = max_bytes
            .and_then(|requested| usize::try_from(requested).ok())
            .map_or(self.config.max_fetch_bytes, |requested| {
                requested.min(self.config.max_fetch_bytes)
            });
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| AdapterError::Failed(format!("fetch failed: {err}")))?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = read_limited(response, cap)?;
        Ok(json!({
            "status": status,
            "contentType": content_type,
            "bytes": body.len(),
            "body": String::from_utf8_lossy(&body),
        }))
    }
}

/// Reads a response body up to a hard cap.
fn read_limited(
    response: reqwest::blocking::Response,
    max_bytes: usize,
) -> Result<Vec<u8>, AdapterError> {
    let mut body = Vec::new();
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX);
    response
        .take(limit)
        .read_to_end(&mut body)
        .map_err(|err| AdapterError::Failed(format!("body read failed: {err}")))?;
    Ok(body)
}

impl ServiceAdapter for WebAdapter {
    fn execute(&self, kind: ActionKind, payload: &ActionPayload) -> Result<Value, AdapterError> {
        match payload {
            ActionPayload::WebSearch(payload) => {
                self.search(&payload.query, payload.max_results)
            }
            ActionPayload::WebFetch(payload) => self.fetch(&payload.url, payload.max_bytes),
            _ => Err(AdapterError::Failed(format!("web adapter cannot execute {kind}"))),
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

    use std::sync::Arc;

    use serde_json::json;
    use warden_core::ActionKind;
    use warden_core::ActionPayload;
    use warden_core::AdapterError;
    use warden_core::InMemoryCredentialStore;
    use warden_core::ServiceAdapter;

    use super::WebAdapter;
    use super::WebAdapterConfig;

    /// Tests search without a provider fails as not configured.
    #[test]
    fn test_search_unconfigured() {
        let adapter = WebAdapter::new(
            WebAdapterConfig::default(),
            Arc::new(InMemoryCredentialStore::new()),
        )
        .unwrap();
        let payload =
            ActionPayload::parse(ActionKind::WebSearch, &json!({"query": "rust"})).unwrap();
        let result = adapter.execute(ActionKind::WebSearch, &payload);
        assert!(matches!(result, Err(AdapterError::NotConfigured(_))));
    }

    /// Tests the adapter refuses foreign action kinds.
    #[test]
    fn test_foreign_kind_rejected() {
        let adapter = WebAdapter::new(
            WebAdapterConfig::default(),
            Arc::new(InMemoryCredentialStore::new()),
        )
        .unwrap();
        let payload = ActionPayload::parse(ActionKind::ClipboardRead, &json!({})).unwrap();
        assert!(adapter.execute(ActionKind::ClipboardRead, &payload).is_err());
    }
}

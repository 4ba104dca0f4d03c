// crates/warden-adapters/src/connector.rs
// ============================================================================
// Module: Connector Adapter
// Description: OAuth connector lifecycle and generic authorized API calls.
// Purpose: Execute connector.* and service.api_call against allowlisted domains.
// Dependencies: warden-core, reqwest, serde_json
// ============================================================================

//! ## Overview
//! The connector adapter is the outbound surface for credentialed services:
//! cloud APIs, calendar hosts, and anything reached through
//! `service.api_call`. Calls are HTTPS-only against the payload's provider
//! domain, which the pipeline has already checked against the allowlist.
//! Bearer secrets come from the credential store at call time; interactive
//! authorization belongs to Core's UI, so `connector.authorize` reports the
//! flow rather than performing it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
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
use warden_core::HttpMethod;
use warden_core::ServiceAdapter;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the connector adapter.
///
/// # Invariants
/// - `token_endpoints` keys are provider domains; refresh without an entry
///   fails as not configured.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectorAdapterConfig {
    /// OAuth token refresh endpoints keyed by provider domain.
    pub token_endpoints: BTreeMap<String, String>,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// User agent string for outbound requests.
    pub user_agent: String,
}

impl ConnectorAdapterConfig {
    /// Returns a configuration with sane limits and no token endpoints.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            token_endpoints: BTreeMap::new(),
            timeout_ms: 15_000,
            user_agent: "warden/0.1".to_string(),
        }
    }
}

// ============================================================================
// SECTION: Connector Adapter
// ============================================================================

/// Adapter executing connector lifecycle operations and API calls.
pub struct ConnectorAdapter {
    /// Adapter configuration.
    config: ConnectorAdapterConfig,
    /// Credential store resolving bearer secrets.
    credentials: Arc<dyn CredentialStore>,
    /// Blocking HTTPS client with redirects disabled.
    client: Client,
}

impl ConnectorAdapter {
    /// Creates the adapter.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the HTTP client cannot be built.
    pub fn new(
        config: ConnectorAdapterConfig,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self, AdapterError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms.max(1)))
            .redirect(Policy::none())
            .user_agent(config.user_agent.clone())
            .https_only(true)
            .build()
            .map_err(|err| AdapterError::Failed(format!("http client build failed: {err}")))?;
        Ok(Self {
            config,
            credentials,
            client,
        })
    }

    /// Executes an authorized JSON call against a provider endpoint.
    fn call(
        &self,
        provider: &str,
        endpoint: &str,
        method: HttpMethod,
        body: Option<&Value>,
    ) -> Result<Value, AdapterError> {
        let credential = self
            .credentials
            .find_for_service(provider)
            .map_err(|err| AdapterError::Failed(err.to_string()))?
            .ok_or_else(|| AdapterError::CredentialMissing(provider.to_string()))?;

        let path = endpoint.strip_prefix('/').unwrap_or(endpoint);
        let url = format!("https://{provider}/{path}");
        let mut request = match method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
            HttpMethod::Put => self.client.put(&url),
            HttpMethod::Patch => self.client.patch(&url),
            HttpMethod::Delete => self.client.delete(&url),
        };
        request = request.bearer_auth(credential.secret);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response =
            request.send().map_err(|err| AdapterError::Failed(format!("call failed: {err}")))?;
        let status = response.status().as_u16();
        let body: Value = response.json().unwrap_or(Value::Null);
        Ok(json!({"status": status, "body": body}))
    }

    /// Refreshes the provider's OAuth token through its token endpoint.
    fn refresh(&self, provider: &str) -> Result<Value, AdapterError> {
        let endpoint = self.config.token_endpoints.get(provider).ok_or_else(|| {
            AdapterError::NotConfigured(format!("no token endpoint for {provider}"))
        })?;
        let mut credential = self
            .credentials
            .find_for_service(provider)
            .map_err(|err| AdapterError::Failed(err.to_string()))?
            .ok_or_else(|| AdapterError::CredentialMissing(provider.to_string()))?;

        let response = self
            .client
            .post(endpoint)
            .form(&[("grant_type", "refresh_token"), ("refresh_token", &credential.secret)])
            .send()
            .map_err(|err| AdapterError::Failed(format!("refresh failed: {err}")))?;
        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(AdapterError::Failed(format!("token endpoint returned {status}")));
        }
        let body: Value = response
            .json()
            .map_err(|err| AdapterError::Failed(format!("token response not json: {err}")))?;
        if let Some(token) = body.get("access_token").and_then(Value::as_str) {
            credential.secret = token.to_string();
            self.credentials
                .update(&credential)
                .map_err(|err| AdapterError::Failed(err.to_string()))?;
        }
        Ok(json!({"provider": provider, "refreshed": true}))
    }

    /// Reports whether the provider has a stored credential.
    fn status(&self, provider: &str) -> Result<Value, AdapterError> {
        let credential = self
            .credentials
            .find_for_service(provider)
            .map_err(|err| AdapterError::Failed(err.to_string()))?;
        Ok(json!({
            "provider": provider,
            "authorized": credential.is_some(),
            "kind": credential.map(|record| record.kind.as_str()),
        }))
    }

    /// Removes the provider's stored credential.
    fn revoke(&self, provider: &str) -> Result<Value, AdapterError> {
        let credential = self
            .credentials
            .find_for_service(provider)
            .map_err(|err| AdapterError::Failed(err.to_string()))?;
        let revoked = match credential {
            Some(record) => self
                .credentials
                .remove(&record.id)
                .map_err(|err| AdapterError::Failed(err.to_string()))?,
            None => false,
        };
        Ok(json!({"provider": provider, "revoked": revoked}))
    }
}

impl ServiceAdapter for ConnectorAdapter {
    fn execute(&self, kind: ActionKind, payload: &ActionPayload) -> Result<Value, AdapterError> {
        match payload {
            ActionPayload::ConnectorAuthorize(payload) => Ok(json!({
                "provider": payload.provider,
                "scopes": payload.scopes,
                "flow": "interactive",
                "detail": "authorization is completed in the companion app",
            })),
            ActionPayload::ConnectorRefresh(payload) => self.refresh(&payload.provider),
            ActionPayload::ConnectorRevoke(payload) => self.revoke(&payload.provider),
            ActionPayload::ConnectorStatus(payload) => self.status(&payload.provider),
            ActionPayload::ConnectorCall(payload) => self.call(
                &payload.provider,
                &payload.endpoint,
                payload.method,
                payload.body.as_ref(),
            ),
            ActionPayload::ServiceApiCall(payload) => self.call(
                &payload.service,
                &payload.endpoint,
                payload.method,
                payload.body.as_ref(),
            ),
            _ => Err(AdapterError::Failed(format!(
                "connector adapter cannot execute {kind}"
            ))),
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
    use warden_core::CredentialKind;
    use warden_core::CredentialRecord;
    use warden_core::CredentialStore;
    use warden_core::InMemoryCredentialStore;
    use warden_core::ServiceAdapter;

    use super::ConnectorAdapter;
    use super::ConnectorAdapterConfig;

    /// Builds the adapter over an in-memory credential store.
    fn adapter() -> (ConnectorAdapter, Arc<InMemoryCredentialStore>) {
        let store = Arc::new(InMemoryCredentialStore::new());
        let adapter =
            ConnectorAdapter::new(ConnectorAdapterConfig::with_defaults(), store.clone())
                .unwrap();
        (adapter, store)
    }

    /// Tests status reflects credential presence.
    #[test]
    fn test_status_reflects_credentials() {
        let (adapter, store) = adapter();
        let payload = ActionPayload::parse(
            ActionKind::ConnectorStatus,
            &json!({"provider": "calendar.example.com"}),
        )
        .unwrap();

        let result = adapter.execute(ActionKind::ConnectorStatus, &payload).unwrap();
        assert_eq!(result["authorized"], json!(false));

        store
            .add(&CredentialRecord {
                id: "c1".to_string(),
                service: "calendar.example.com".to_string(),
                kind: CredentialKind::OauthToken,
                username: None,
                secret: "token".to_string(),
            })
            .unwrap();
        let result = adapter.execute(ActionKind::ConnectorStatus, &payload).unwrap();
        assert_eq!(result["authorized"], json!(true));
        assert_eq!(result["kind"], json!("oauth_token"));
    }

    /// Tests revoke removes the stored credential.
    #[test]
    fn test_revoke_removes_credential() {
        let (adapter, store) = adapter();
        store
            .add(&CredentialRecord {
                id: "c1".to_string(),
                service: "cloud.example.com".to_string(),
                kind: CredentialKind::OauthToken,
                username: None,
                secret: "token".to_string(),
            })
            .unwrap();
        let payload = ActionPayload::parse(
            ActionKind::ConnectorRevoke,
            &json!({"provider": "cloud.example.com"}),
        )
        .unwrap();
        let result = adapter.execute(ActionKind::ConnectorRevoke, &payload).unwrap();
        assert_eq!(result["revoked"], json!(true));
        assert!(store.find_for_service("cloud.example.com").unwrap().is_none());
    }

    /// Tests calls without a credential fail with CredentialMissing.
    #[test]
    fn test_call_requires_credential() {
        let (adapter, _store) = adapter();
        let payload = ActionPayload::parse(
            ActionKind::ServiceApiCall,
            &json!({"service": "api.example.com", "endpoint": "/v1", "method": "GET"}),
        )
        .unwrap();
        let result = adapter.execute(ActionKind::ServiceApiCall, &payload);
        assert!(matches!(result, Err(AdapterError::CredentialMissing(_))));
    }

    /// Tests refresh without a token endpoint fails as not configured.
    #[test]
    fn test_refresh_unconfigured() {
        let (adapter, store) = adapter();
        store
            .add(&CredentialRecord {
                id: "c1".to_string(),
                service: "cloud.example.com".to_string(),
                kind: CredentialKind::OauthToken,
                username: None,
                secret: "token".to_string(),
            })
            .unwrap();
        let payload = ActionPayload::parse(
            ActionKind::ConnectorRefresh,
            &json!({"provider": "cloud.example.com"}),
        )
        .unwrap();
        let result = adapter.execute(ActionKind::ConnectorRefresh, &payload);
        assert!(matches!(result, Err(AdapterError::NotConfigured(_))));
    }

    /// Tests authorize reports the interactive flow without network access.
    #[test]
    fn test_authorize_reports_flow() {
        let (adapter, _store) = adapter();
        let payload = ActionPayload::parse(
            ActionKind::ConnectorAuthorize,
            &json!({"provider": "calendar.example.com", "scopes": ["calendar.read"]}),
        )
        .unwrap();
        let result = adapter.execute(ActionKind::ConnectorAuthorize, &payload).unwrap();
        assert_eq!(result["flow"], json!("interactive"));
    }
}

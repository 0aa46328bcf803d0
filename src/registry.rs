//! Client id → upstream token URL and shared secret.
//!
//! Token URLs come from an asynchronous key-value registry and secrets come from
//! a synchronous store. The two are kept apart so credentials never share a bag
//! with general configuration. A failed lookup is always reported as absent.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::ProxyError;

#[async_trait]
pub trait TokenUrlRegistry: Send + Sync {
    async fn get(&self, client_id: &str) -> Option<String>;
}

pub trait SecretStore: Send + Sync {
    fn lookup(&self, client_id: &str) -> Option<String>;
}

#[derive(Clone)]
pub struct ClientRegistry {
    token_urls: Arc<dyn TokenUrlRegistry>,
    secrets: Arc<dyn SecretStore>,
}

impl ClientRegistry {
    pub fn new(
        token_urls: impl TokenUrlRegistry + 'static,
        secrets: impl SecretStore + 'static,
    ) -> Self {
        Self {
            token_urls: Arc::new(token_urls),
            secrets: Arc::new(secrets),
        }
    }

    pub async fn resolve_token_url(&self, client_id: &str) -> Option<String> {
        non_empty(self.token_urls.get(client_id).await)
    }

    pub fn resolve_secret(&self, client_id: &str) -> Option<String> {
        non_empty(self.secrets.lookup(client_id))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    token_urls: HashMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryTokenUrls {
    urls: HashMap<String, String>,
}

impl MemoryTokenUrls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token_url(mut self, client_id: impl Into<String>, url: impl Into<String>) -> Self {
        self.urls.insert(client_id.into(), url.into());
        self
    }

    /// Parses `{"token_urls": {"<client_id>": "<url>", ...}}`.
    pub fn from_json(json: &str) -> Result<Self, ProxyError> {
        let file: RegistryFile = serde_json::from_str(json)?;
        Ok(Self {
            urls: file.token_urls,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProxyError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

#[async_trait]
impl TokenUrlRegistry for MemoryTokenUrls {
    async fn get(&self, client_id: &str) -> Option<String> {
        self.urls.get(client_id).cloned()
    }
}

/// Remote key-value registry: `GET <base>/<client_id>` returns the token URL as text.
#[derive(Debug, Clone)]
pub struct HttpTokenUrls {
    base: Url,
    http: Client,
}

impl HttpTokenUrls {
    pub fn new(base_url: &str) -> Result<Self, ProxyError> {
        Self::with_http_client(base_url, Client::new())
    }

    pub fn with_http_client(base_url: &str, http: Client) -> Result<Self, ProxyError> {
        let base = Url::parse(base_url)?;
        if base.cannot_be_a_base() {
            return Err(ProxyError::Url(
                url::ParseError::RelativeUrlWithCannotBeABaseBase,
            ));
        }
        Ok(Self { base, http })
    }

    fn key_url(&self, client_id: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(client_id);
        }
        url
    }
}

#[async_trait]
impl TokenUrlRegistry for HttpTokenUrls {
    async fn get(&self, client_id: &str) -> Option<String> {
        let response = match self.http.get(self.key_url(client_id)).send().await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(client_id, error = %err, "token url registry unreachable");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(client_id, status = status.as_u16(), "token url not registered");
            return None;
        }

        match response.text().await {
            Ok(body) => Some(body.trim().to_string()),
            Err(err) => {
                tracing::warn!(client_id, error = %err, "failed to read token url registry response");
                None
            }
        }
    }
}

pub const DEFAULT_SECRET_PREFIX: &str = "OAUTH_SECRET_";

/// Reads the secret from the environment variable `<prefix><client_id>`.
///
/// The prefix is never empty, so unrelated process variables are not credentials.
#[derive(Debug, Clone)]
pub struct EnvSecretStore {
    prefix: String,
}

impl Default for EnvSecretStore {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_SECRET_PREFIX.to_string(),
        }
    }
}

impl EnvSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Result<Self, ProxyError> {
        let prefix = prefix.into();
        if prefix.is_empty() {
            return Err(ProxyError::EmptySecretPrefix);
        }
        Ok(Self { prefix })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl SecretStore for EnvSecretStore {
    fn lookup(&self, client_id: &str) -> Option<String> {
        std::env::var(format!("{}{}", self.prefix, client_id)).ok()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemorySecretStore {
    secrets: HashMap<String, String>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(mut self, client_id: impl Into<String>, secret: impl Into<String>) -> Self {
        self.secrets.insert(client_id.into(), secret.into());
        self
    }
}

impl SecretStore for MemorySecretStore {
    fn lookup(&self, client_id: &str) -> Option<String> {
        self.secrets.get(client_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn registry_treats_empty_values_as_absent() {
        let registry = ClientRegistry::new(
            MemoryTokenUrls::new()
                .with_token_url("app", "https://provider.example/token")
                .with_token_url("blank", ""),
            MemorySecretStore::new()
                .with_secret("app", "s3cret")
                .with_secret("blank", ""),
        );

        assert_eq!(
            registry.resolve_token_url("app").await.as_deref(),
            Some("https://provider.example/token")
        );
        assert_eq!(registry.resolve_token_url("blank").await, None);
        assert_eq!(registry.resolve_token_url("missing").await, None);
        assert_eq!(registry.resolve_secret("app").as_deref(), Some("s3cret"));
        assert_eq!(registry.resolve_secret("blank"), None);
    }

    #[test]
    fn loads_registry_json() {
        let urls = MemoryTokenUrls::from_json(
            r#"{"token_urls": {"a": "https://a.example/token", "b": "https://b.example/token"}}"#,
        )
        .unwrap();
        assert_eq!(urls.len(), 2);
    }

    #[test]
    fn rejects_malformed_registry_json() {
        let result = MemoryTokenUrls::from_json(r#"{"clients": []}"#);
        assert!(matches!(result, Err(ProxyError::RegistryFile(_))));
    }

    #[test]
    fn env_secret_store_reads_prefixed_variable() {
        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var("OAUTH_SECRET_env-store-client", "s3cret") };
        assert_eq!(
            EnvSecretStore::new().lookup("env-store-client").as_deref(),
            Some("s3cret")
        );
        assert_eq!(EnvSecretStore::new().prefix(), DEFAULT_SECRET_PREFIX);
    }

    #[test]
    fn env_secret_store_ignores_unprefixed_variables() {
        // PATH is set in any test environment but is not a credential.
        let registry = ClientRegistry::new(
            MemoryTokenUrls::new().with_token_url("PATH", "https://provider.example/token"),
            EnvSecretStore::new(),
        );
        assert_eq!(registry.resolve_secret("PATH"), None);
        assert!(
            EnvSecretStore::with_prefix("OAUTH_TOKEN_PROXY_UNSET_")
                .unwrap()
                .lookup("PATH")
                .is_none()
        );
    }

    #[test]
    fn env_secret_store_rejects_empty_prefix() {
        assert!(matches!(
            EnvSecretStore::with_prefix(""),
            Err(ProxyError::EmptySecretPrefix)
        ));
    }

    #[tokio::test]
    async fn http_registry_fetches_token_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/kv/my%20app"))
            .respond_with(ResponseTemplate::new(200).set_body_string("https://provider.example/token\n"))
            .mount(&server)
            .await;

        let registry = HttpTokenUrls::new(&format!("{}/kv/", server.uri())).unwrap();
        assert_eq!(
            registry.get("my app").await.as_deref(),
            Some("https://provider.example/token")
        );
    }

    #[tokio::test]
    async fn http_registry_treats_not_found_as_absent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let registry = HttpTokenUrls::new(&server.uri()).unwrap();
        assert_eq!(registry.get("unknown").await, None);
    }

    #[test]
    fn http_registry_requires_base_url() {
        assert!(HttpTokenUrls::new("mailto:kv@example.com").is_err());
    }
}

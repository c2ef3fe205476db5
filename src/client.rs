//! Code-generation service client
//!
//! The sync engine only needs one capability from the service: fetch the
//! files a generator produces for an application version. It is expressed as
//! the [`GeneratorSource`] trait so the planner can be driven by the HTTP
//! client, by a mock in tests, or by any other backend.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::env;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::SyncSettings;
use crate::error::FetchError;

/// Environment variable holding the API token, sent as the basic-auth user
pub const TOKEN_ENV_VAR: &str = "APIBUILDER_TOKEN";

/// One file emitted by a generator
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GeneratedFile {
    pub name: String,
    /// Subdirectory suggested by the generator; empty when none
    #[serde(default, deserialize_with = "null_as_empty")]
    pub dir: String,
    pub contents: String,
}

impl GeneratedFile {
    pub fn new(name: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dir: String::new(),
            contents: contents.into(),
        }
    }

    pub fn in_dir(mut self, dir: impl Into<String>) -> Self {
        self.dir = dir.into();
        self
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Source of generated code
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GeneratorSource: Send + Sync {
    /// Fetch every file `generator` produces for `org/app@version`.
    ///
    /// Returns [`FetchError::NotFound`] when the combination does not exist.
    async fn fetch_generated_files(
        &self,
        org: &str,
        app: &str,
        version: &str,
        generator: &str,
    ) -> Result<Vec<GeneratedFile>, FetchError>;
}

#[derive(Debug, Deserialize)]
struct CodeResponse {
    #[serde(default)]
    files: Vec<GeneratedFile>,
}

/// HTTP client for the code-generation service
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a client from the sync settings, picking up the API token from
    /// the environment when set
    pub fn new(settings: &SyncSettings) -> Result<Self> {
        let token = env::var(TOKEN_ENV_VAR).ok().filter(|t| !t.trim().is_empty());
        Self::with_base_url(&settings.api_uri, token, Duration::from_secs(settings.timeout))
    }

    pub fn with_base_url(
        base_url: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("gensync/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = base_url.trim_end_matches('/').to_string();
        info!(
            "Using code generation service at {} ({})",
            base_url,
            if token.is_some() { "authenticated" } else { "anonymous" }
        );

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn code_url(&self, org: &str, app: &str, version: &str, generator: &str) -> String {
        format!("{}/{}/{}/{}/{}", self.base_url, org, app, version, generator)
    }
}

#[async_trait]
impl GeneratorSource for ApiClient {
    async fn fetch_generated_files(
        &self,
        org: &str,
        app: &str,
        version: &str,
        generator: &str,
    ) -> Result<Vec<GeneratedFile>, FetchError> {
        let url = self.code_url(org, app, version, generator);
        debug!("GET {}", url);

        let mut request = self.client.get(&url);
        if let Some(token) = &self.token {
            request = request.basic_auth(token, None::<&str>);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound {
                org: org.to_string(),
                app: app.to_string(),
                version: version.to_string(),
                generator: generator.to_string(),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                url,
                body,
            });
        }

        let code: CodeResponse = response.json().await?;
        debug!("{} returned {} file(s)", url, code.files.len());
        Ok(code.files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serial_test::serial;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, token: Option<&str>) -> ApiClient {
        ApiClient::with_base_url(
            &format!("{}/", server.uri()),
            token.map(str::to_string),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_generated_files() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/acme/billing/latest/scala_models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "source": "ignored",
                "files": [
                    { "name": "Models.scala", "dir": "app/models", "contents": "object Models" },
                    { "name": "routes", "dir": null, "contents": "GET /" },
                    { "name": "Json.scala", "contents": "object Json" }
                ]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let files = client(&mock_server, None)
            .fetch_generated_files("acme", "billing", "latest", "scala_models")
            .await
            .unwrap();

        assert_eq!(
            files,
            vec![
                GeneratedFile::new("Models.scala", "object Models").in_dir("app/models"),
                GeneratedFile::new("routes", "GET /"),
                GeneratedFile::new("Json.scala", "object Json"),
            ]
        );
    }

    #[tokio::test]
    async fn test_token_sent_as_basic_auth() {
        let mock_server = MockServer::start().await;

        // "secret:" base64-encoded
        Mock::given(method("GET"))
            .and(header("Authorization", "Basic c2VjcmV0Og=="))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "files": [] })),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let files = client(&mock_server, Some("secret"))
            .fetch_generated_files("acme", "billing", "latest", "scala_models")
            .await
            .unwrap();

        assert!(files.is_empty());
    }

    #[tokio::test]
    #[serial]
    async fn test_client_from_settings_reads_token() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/acme/billing/0.1.0/ruby_client"))
            .and(header("Authorization", "Basic ZW52LXRva2VuOg=="))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "files": [] })),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        env::set_var(TOKEN_ENV_VAR, "env-token");
        let settings = SyncSettings {
            api_uri: mock_server.uri(),
            ..Default::default()
        };
        let client = ApiClient::new(&settings).unwrap();
        env::remove_var(TOKEN_ENV_VAR);

        assert_eq!(client.base_url(), mock_server.uri());
        client
            .fetch_generated_files("acme", "billing", "0.1.0", "ruby_client")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_not_found() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let err = client(&mock_server, None)
            .fetch_generated_files("acme", "billing", "9.9.9", "nope")
            .await
            .unwrap_err();

        assert_matches!(err, FetchError::NotFound { ref generator, .. } if generator == "nope");
    }

    #[tokio::test]
    async fn test_server_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("database unavailable"))
            .mount(&mock_server)
            .await;

        let err = client(&mock_server, None)
            .fetch_generated_files("acme", "billing", "latest", "scala_models")
            .await
            .unwrap_err();

        assert_matches!(
            err,
            FetchError::Status { status: 500, ref body, .. } if body == "database unavailable"
        );
    }

    #[tokio::test]
    async fn test_malformed_body_is_request_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let err = client(&mock_server, None)
            .fetch_generated_files("acme", "billing", "latest", "scala_models")
            .await
            .unwrap_err();

        assert_matches!(err, FetchError::Request(_));
    }
}

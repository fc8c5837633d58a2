//! A [`RecipientCatalog`] backed by the Unity Catalog recipients REST API
//!
//! Every request is authenticated with a personal access token and carries a
//! JSON content type. Requests are never retried; a failure is reported to
//! the caller as a [`CatalogError`].
//!
//! ```
//! use sharekey_reqwest::{CatalogClient, CatalogConfig, PersonalAccessToken};
//!
//! let config = CatalogConfig::new(
//!     reqwest::Url::parse("https://workspace.cloud.databricks.com").unwrap(),
//!     PersonalAccessToken::from_static("dapi-example"),
//! );
//!
//! let client = CatalogClient::new(reqwest::Client::new(), &config).unwrap();
//!
//! assert_eq!(
//!     client.recipients_url().as_str(),
//!     "https://workspace.cloud.databricks.com/api/2.1/unity-catalog/recipients",
//! );
//! ```

#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

use async_trait::async_trait;
use reqwest::{header, StatusCode, Url};
use serde::de::DeserializeOwned;
use sharekey::{
    catalog::AuthenticationType, error::CatalogError, Recipient, RecipientCatalog,
    RecipientNameRef, TokenRecord,
};
use thiserror::Error;

mod braids;
mod dto;

pub use braids::*;

const RECIPIENTS_PATH: [&str; 4] = ["api", "2.1", "unity-catalog", "recipients"];

/// Configuration for connecting to the recipient catalog
#[derive(Clone, Debug)]
pub struct CatalogConfig {
    base_url: Url,
    access_token: PersonalAccessToken,
}

impl CatalogConfig {
    /// Constructs a new catalog configuration
    ///
    /// `base_url` is the workspace URL, without the API path.
    pub fn new(base_url: Url, access_token: PersonalAccessToken) -> Self {
        Self {
            base_url,
            access_token,
        }
    }

    /// The workspace URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

/// The workspace URL cannot have the recipients API path appended
#[derive(Debug, Error)]
#[error("workspace URL '{url}' cannot be used as a base URL")]
pub struct InvalidBaseUrl {
    url: Url,
}

/// A client for the recipients API
#[derive(Clone, Debug)]
pub struct CatalogClient {
    client: reqwest::Client,
    recipients_url: Url,
    access_token: PersonalAccessToken,
}

impl CatalogClient {
    /// Constructs a new client using the given HTTP client
    ///
    /// Timeouts and TLS settings are taken from `client`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured workspace URL cannot be a base URL,
    /// such as a `data:` URL.
    pub fn new(client: reqwest::Client, config: &CatalogConfig) -> Result<Self, InvalidBaseUrl> {
        let mut recipients_url = config.base_url.clone();
        recipients_url
            .path_segments_mut()
            .map_err(|()| InvalidBaseUrl {
                url: config.base_url.clone(),
            })?
            .pop_if_empty()
            .extend(RECIPIENTS_PATH);

        Ok(Self {
            client,
            recipients_url,
            access_token: config.access_token.clone(),
        })
    }

    /// The URL of the recipients collection
    pub fn recipients_url(&self) -> &Url {
        &self.recipients_url
    }

    fn recipient_url<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = self.recipients_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.extend(segments);
        }
        url
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(self.access_token.as_str())
            .header(header::CONTENT_TYPE, "application/json")
    }
}

async fn send(
    request: reqwest::RequestBuilder,
) -> Result<(StatusCode, bytes::Bytes), CatalogError> {
    let resp = request.send().await.map_err(CatalogError::transport)?;
    let status = resp.status();

    tracing::debug!(
        response.status = status.as_u16(),
        "received response from recipient catalog"
    );

    let body = resp.bytes().await.map_err(CatalogError::transport)?;

    tracing::trace!(
        response.body = %String::from_utf8_lossy(&body),
        "raw recipient catalog response"
    );

    Ok((status, body))
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, CatalogError> {
    Ok(serde_json::from_slice(body)?)
}

fn unexpected(status: StatusCode, body: &[u8]) -> CatalogError {
    CatalogError::UnexpectedResponse {
        status: status.as_u16(),
        body: String::from_utf8_lossy(body).into_owned(),
    }
}

#[async_trait]
impl RecipientCatalog for CatalogClient {
    #[tracing::instrument(err, skip(self, name), fields(recipient = %name))]
    async fn get_recipient(
        &self,
        name: &RecipientNameRef,
    ) -> Result<Option<Recipient>, CatalogError> {
        let url = self.recipient_url([name.as_str()]);
        let (status, body) = send(self.request(reqwest::Method::GET, url)).await?;

        match status {
            StatusCode::OK => decode(&body).map(Some),
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(unexpected(status, &body)),
        }
    }

    #[tracing::instrument(err, skip(self, name), fields(recipient = %name))]
    async fn create_recipient(
        &self,
        name: &RecipientNameRef,
        token_lifetime_secs: u64,
    ) -> Result<Recipient, CatalogError> {
        let payload = dto::CreateRecipientRequest {
            name,
            authentication_type: AuthenticationType::Token,
            token_expiration_time: token_lifetime_secs,
        };

        let req = self
            .request(reqwest::Method::POST, self.recipients_url.clone())
            .json(&payload);
        let (status, body) = send(req).await?;

        if status != StatusCode::OK && status != StatusCode::CREATED {
            return Err(unexpected(status, &body));
        }

        let recipient: Recipient = decode(&body)?;
        if recipient.tokens.is_empty() {
            return Err(CatalogError::EmptyTokenList);
        }

        tracing::info!(tokens = recipient.tokens.len(), "created recipient");

        Ok(recipient)
    }

    #[tracing::instrument(err, skip(self, name), fields(recipient = %name))]
    async fn rotate_token(
        &self,
        name: &RecipientNameRef,
        existing_token_grace_secs: u64,
    ) -> Result<Vec<TokenRecord>, CatalogError> {
        let payload = dto::RotateTokenRequest {
            existing_token_expire_in_seconds: existing_token_grace_secs,
        };

        let url = self.recipient_url([name.as_str(), "rotate-token"]);
        let req = self.request(reqwest::Method::POST, url).json(&payload);
        let (status, body) = send(req).await?;

        if status != StatusCode::OK {
            return Err(unexpected(status, &body));
        }

        let resp: dto::RotateTokenResponse = decode(&body)?;
        if resp.tokens.is_empty() {
            return Err(CatalogError::EmptyTokenList);
        }

        tracing::info!(tokens = resp.tokens.len(), "rotated recipient token");

        Ok(resp.tokens)
    }
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;
    use serde_json::json;
    use sharekey::RecipientName;
    use wiremock::{
        matchers::{body_json, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;

    const PAT: &str = "dapi-test-token";
    const RECIPIENTS: &str = "/api/2.1/unity-catalog/recipients";

    fn client_for(server: &MockServer) -> CatalogClient {
        let config = CatalogConfig::new(
            Url::parse(&server.uri()).unwrap(),
            PersonalAccessToken::from_static(PAT),
        );
        CatalogClient::new(reqwest::Client::new(), &config).unwrap()
    }

    fn alice() -> RecipientName {
        RecipientName::from_static("alice")
    }

    fn recipient_body(tokens: serde_json::Value) -> serde_json::Value {
        json!({
            "name": "alice",
            "authentication_type": "TOKEN",
            "owner": "admins",
            "created_at": 1718000000000_i64,
            "tokens": tokens,
        })
    }

    #[test]
    fn appends_api_path_to_base_url_with_trailing_slash() {
        let config = CatalogConfig::new(
            Url::parse("https://workspace.example.com/").unwrap(),
            PersonalAccessToken::from_static(PAT),
        );
        let client = CatalogClient::new(reqwest::Client::new(), &config).unwrap();

        assert_eq!(
            client.recipients_url().as_str(),
            "https://workspace.example.com/api/2.1/unity-catalog/recipients"
        );
    }

    #[test]
    fn rejects_base_url_that_cannot_be_a_base() {
        let config = CatalogConfig::new(
            Url::parse("mailto:admin@example.com").unwrap(),
            PersonalAccessToken::from_static(PAT),
        );

        assert!(CatalogClient::new(reqwest::Client::new(), &config).is_err());
    }

    #[test]
    fn escapes_recipient_names_in_paths() {
        let config = CatalogConfig::new(
            Url::parse("https://workspace.example.com").unwrap(),
            PersonalAccessToken::from_static(PAT),
        );
        let client = CatalogClient::new(reqwest::Client::new(), &config).unwrap();

        let url = client.recipient_url(["a/b c", "rotate-token"]);

        assert_eq!(
            url.path(),
            "/api/2.1/unity-catalog/recipients/a%2Fb%20c/rotate-token"
        );
    }

    #[tokio::test]
    async fn gets_existing_recipient_with_bearer_token() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{RECIPIENTS}/alice")))
            .and(header("authorization", format!("Bearer {PAT}").as_str()))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(recipient_body(json!([{
                "activation_url": "https://link/1",
                "expiration_time": 1718604800,
            }]))))
            .expect(1)
            .mount(&server)
            .await;

        let recipient = client_for(&server)
            .get_recipient(&alice())
            .await?
            .expect("recipient exists");

        assert_eq!(recipient.name.as_str(), "alice");
        assert_eq!(recipient.tokens[0].activation_url, "https://link/1");
        Ok(())
    }

    #[tokio::test]
    async fn missing_recipient_is_none() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{RECIPIENTS}/alice")))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error_code": "RECIPIENT_DOES_NOT_EXIST",
                "message": "Recipient 'alice' does not exist.",
            })))
            .mount(&server)
            .await;

        let recipient = client_for(&server).get_recipient(&alice()).await?;

        assert!(recipient.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn other_status_is_unexpected_response_with_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{RECIPIENTS}/alice")))
            .respond_with(ResponseTemplate::new(403).set_body_string("PERMISSION_DENIED"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_recipient(&alice())
            .await
            .unwrap_err();

        match err {
            CatalogError::UnexpectedResponse { status, body } => {
                assert_eq!(status, 403);
                assert_eq!(body, "PERMISSION_DENIED");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_recipient_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{RECIPIENTS}/alice")))
            .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_recipient(&alice())
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::Decode(_)), "{err:?}");
    }

    #[tokio::test]
    async fn unreachable_catalog_is_transport_error() {
        let server = MockServer::start().await;
        let client = client_for(&server);
        drop(server);

        let err = client.get_recipient(&alice()).await.unwrap_err();

        assert!(matches!(err, CatalogError::Transport { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn creates_recipient_with_token_authentication() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(RECIPIENTS))
            .and(header("authorization", format!("Bearer {PAT}").as_str()))
            .and(body_json(json!({
                "name": "alice",
                "authentication_type": "TOKEN",
                "token_expiration_time": 604800,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(recipient_body(json!([{
                "activation_url": "https://link/new",
                "expiration_time": 1718604800,
            }]))))
            .expect(1)
            .mount(&server)
            .await;

        let recipient = client_for(&server)
            .create_recipient(&alice(), 604_800)
            .await?;

        assert_eq!(recipient.tokens[0].activation_url, "https://link/new");
        Ok(())
    }

    #[tokio::test]
    async fn accepts_created_status_on_creation() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(RECIPIENTS))
            .respond_with(ResponseTemplate::new(201).set_body_json(recipient_body(json!([{
                "activation_url": "https://link/new",
            }]))))
            .mount(&server)
            .await;

        let recipient = client_for(&server)
            .create_recipient(&alice(), 604_800)
            .await?;

        assert_eq!(recipient.tokens.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn creation_without_tokens_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(RECIPIENTS))
            .respond_with(ResponseTemplate::new(200).set_body_json(recipient_body(json!([]))))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .create_recipient(&alice(), 604_800)
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::EmptyTokenList), "{err:?}");
    }

    #[tokio::test]
    async fn creation_conflict_is_unexpected_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(RECIPIENTS))
            .respond_with(ResponseTemplate::new(409).set_body_string("RESOURCE_ALREADY_EXISTS"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .create_recipient(&alice(), 604_800)
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(409));
    }

    #[tokio::test]
    async fn rotates_token_with_grace_period() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{RECIPIENTS}/alice/rotate-token")))
            .and(header("authorization", format!("Bearer {PAT}").as_str()))
            .and(body_json(json!({ "existing_token_expire_in_seconds": 3600 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "alice",
                "tokens": [
                    { "activation_url": "https://link/old", "expiration_time": 1718003600 },
                    { "activation_url": "https://link/new", "expiration_time": 1718604800 },
                ],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let tokens = client_for(&server).rotate_token(&alice(), 3_600).await?;

        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].activation_url, "https://link/new");
        Ok(())
    }

    #[tokio::test]
    async fn rotation_without_tokens_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{RECIPIENTS}/alice/rotate-token")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "tokens": [] })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .rotate_token(&alice(), 3_600)
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::EmptyTokenList), "{err:?}");
    }

    #[tokio::test]
    async fn rotation_requires_ok_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{RECIPIENTS}/alice/rotate-token")))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "tokens": [{ "activation_url": "https://link/new" }],
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .rotate_token(&alice(), 3_600)
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(201));
    }
}

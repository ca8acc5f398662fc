//! ermis API client fixture.
//!
//! Every request carries the fixed JSON and Negotiate headers and is
//! verified against the configured CA bundle. Responses are returned as-is,
//! so scenarios can assert on 4xx codes. Only transport failures are errors.

use crate::config::Config;
use crate::fixtures::alias::{AliasList, AliasObject, AliasPayload};
use crate::fixtures::negotiate::{default_negotiator, Negotiator};
use regex::Regex;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE,
};
use reqwest::{Certificate, Client, Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Maximum length for response bodies in error messages and logs.
const MAX_ERROR_BODY_LEN: usize = 256;

const NO_BODY: Option<&()> = None;

/// Regex pattern for Negotiate tokens in text.
static NEGOTIATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)negotiate\s+[A-Za-z0-9+/]{8,}={0,2}").unwrap());

/// Regex pattern for long base64 blobs (tickets, secrets).
static BASE64_BLOB_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9+/]{64,}={0,2}").unwrap());

/// Sanitize a response body before it ends up in a message or a log line.
///
/// Negotiate tokens go first so "Negotiate <blob>" is replaced as a whole.
pub fn sanitize_error_body(body: &str) -> String {
    let sanitized = NEGOTIATE_PATTERN.replace_all(body, "[NEGOTIATE_REDACTED]");
    let sanitized = BASE64_BLOB_PATTERN.replace_all(&sanitized, "[BLOB_REDACTED]");

    if sanitized.len() > MAX_ERROR_BODY_LEN {
        let mut end = MAX_ERROR_BODY_LEN;
        while !sanitized.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...[truncated]", &sanitized[..end])
    } else {
        sanitized.into_owned()
    }
}

/// ermis client errors.
#[derive(Debug, Error)]
pub enum ErmisClientError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Alias {0} not found")]
    AliasMissing(String),

    #[error("Failed to load CA bundle {path}: {message}")]
    CaBundle { path: String, message: String },

    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    #[error("No hostgroup chosen for the request")]
    MissingHostgroup,

    #[error("Cannot move an alias out of hostgroup '{0}'")]
    UnmovableHostgroup(String),
}

/// Where a request goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
    /// The alias collection (`.../aliases`).
    Collection,
    /// A single alias by name (`.../aliases/<name>`).
    Alias(&'a str),
}

/// Status and raw body of an API response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ErmisClientError> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// One-line description for assertion messages.
    pub fn summary(&self) -> String {
        format!("status {}: {}", self.status, sanitize_error_body(&self.body))
    }
}

/// Result of `GET /aliases/{name}`.
#[derive(Debug, Clone)]
pub struct AliasLookup {
    pub alias_name: String,
    pub response: ApiResponse,
    pub aliases: AliasList,
}

impl AliasLookup {
    /// The looked-up alias. An empty or null `objects` is an error.
    pub fn into_object(self) -> Result<AliasObject, ErmisClientError> {
        let alias_name = self.alias_name;
        self.aliases
            .into_first()
            .ok_or(ErmisClientError::AliasMissing(alias_name))
    }
}

/// Client for the ermis alias API.
pub struct ErmisClient {
    collection_url: String,
    host: String,
    http_client: Client,
    negotiator: Box<dyn Negotiator>,
}

impl std::fmt::Debug for ErmisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErmisClient")
            .field("collection_url", &self.collection_url)
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

impl ErmisClient {
    /// Create a client using the negotiator of the enabled features.
    pub fn new(config: &Config) -> Result<Self, ErmisClientError> {
        Self::with_negotiator(config, default_negotiator())
    }

    /// Create a client with an explicit negotiator.
    pub fn with_negotiator(
        config: &Config,
        negotiator: Box<dyn Negotiator>,
    ) -> Result<Self, ErmisClientError> {
        let url = Url::parse(&config.api_url)
            .map_err(|e| ErmisClientError::InvalidUrl(format!("{}: {}", config.api_url, e)))?;
        let host = url
            .host_str()
            .ok_or_else(|| {
                ErmisClientError::InvalidUrl(format!("{} has no host", config.api_url))
            })?
            .to_string();

        let mut builder = Client::builder().default_headers(fixed_headers());

        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        // Trust only the configured bundle, like `verify=<bundle>` would
        if let Some(bundle) = &config.ca_bundle {
            let ca_error = |message: String| ErmisClientError::CaBundle {
                path: bundle.display().to_string(),
                message,
            };

            let pem = std::fs::read(bundle).map_err(|e| ca_error(e.to_string()))?;
            let certificates =
                Certificate::from_pem_bundle(&pem).map_err(|e| ca_error(e.to_string()))?;
            if certificates.is_empty() {
                return Err(ca_error("no certificates in bundle".to_string()));
            }

            builder = builder.tls_built_in_root_certs(false);
            for certificate in certificates {
                builder = builder.add_root_certificate(certificate);
            }
        }

        Ok(Self {
            collection_url: config.api_url.trim_end_matches('/').to_string(),
            host,
            http_client: builder.build()?,
            negotiator,
        })
    }

    /// Get the alias collection URL.
    pub fn base_url(&self) -> &str {
        &self.collection_url
    }

    fn url_for(&self, target: Target<'_>) -> String {
        match target {
            Target::Collection => self.collection_url.clone(),
            Target::Alias(name) => format!("{}/{}", self.collection_url, name),
        }
    }

    /// Send a request and return whatever the API answered.
    ///
    /// # Arguments
    ///
    /// * `method` - HTTP method
    /// * `target` - Collection or single alias
    /// * `body` - Optional JSON body
    /// * `params` - Query parameters, may be empty
    pub async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        target: Target<'_>,
        body: Option<&B>,
        params: &[(&str, &str)],
    ) -> Result<ApiResponse, ErmisClientError> {
        let url = self.url_for(target);

        let mut request = self.http_client.request(method.clone(), &url);

        if !params.is_empty() {
            request = request.query(params);
        }

        if let Some(body) = body {
            request = request.json(body);
        }

        if let Some(token) = self.negotiator.token(&self.host) {
            request = request.header(AUTHORIZATION, format!("Negotiate {}", token));
        }

        debug!(method = %method, url = %url, "Sending ermis request");

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        debug!(
            method = %method,
            url = %url,
            status,
            body = %sanitize_error_body(&body),
            "Received ermis response"
        );

        Ok(ApiResponse { status, body })
    }

    /// List every alias visible to the caller.
    ///
    /// # Endpoint
    ///
    /// `GET /aliases`
    pub async fn list_aliases(&self) -> Result<ApiResponse, ErmisClientError> {
        self.request(Method::GET, Target::Collection, NO_BODY, &[])
            .await
    }

    /// Fetch a single alias.
    ///
    /// # Endpoint
    ///
    /// `GET /aliases/{name}`
    pub async fn get_alias(&self, alias_name: &str) -> Result<ApiResponse, ErmisClientError> {
        self.request(Method::GET, Target::Alias(alias_name), NO_BODY, &[])
            .await
    }

    /// Fetch and decode a single alias lookup, keeping the raw response.
    pub async fn fetch_alias(&self, alias_name: &str) -> Result<AliasLookup, ErmisClientError> {
        let response = self.get_alias(alias_name).await?;

        let aliases = response.json::<AliasList>().map_err(|e| {
            warn!(
                alias = %alias_name,
                response = %response.summary(),
                "Alias lookup returned an unexpected body"
            );
            e
        })?;

        Ok(AliasLookup {
            alias_name: alias_name.to_string(),
            response,
            aliases,
        })
    }

    /// Fetch the alias object, failing when the lookup came back empty.
    pub async fn fetch_alias_object(
        &self,
        alias_name: &str,
    ) -> Result<AliasObject, ErmisClientError> {
        self.fetch_alias(alias_name).await?.into_object()
    }

    /// Create an alias.
    ///
    /// # Endpoint
    ///
    /// `POST /aliases`
    pub async fn create_alias<B: Serialize + ?Sized>(
        &self,
        payload: &B,
    ) -> Result<ApiResponse, ErmisClientError> {
        self.request(Method::POST, Target::Collection, Some(payload), &[])
            .await
    }

    /// Update an alias.
    ///
    /// # Endpoint
    ///
    /// `PATCH /aliases/{name}`
    pub async fn patch_alias(
        &self,
        alias_name: &str,
        payload: &AliasPayload,
    ) -> Result<ApiResponse, ErmisClientError> {
        self.request(Method::PATCH, Target::Alias(alias_name), Some(payload), &[])
            .await
    }

    /// Delete an alias by name.
    ///
    /// # Endpoint
    ///
    /// `DELETE /aliases?alias_name={name}`
    pub async fn delete_alias(&self, alias_name: &str) -> Result<ApiResponse, ErmisClientError> {
        self.request(
            Method::DELETE,
            Target::Collection,
            NO_BODY,
            &[("alias_name", alias_name)],
        )
        .await
    }

    /// Remove the test alias left over from a previous run.
    ///
    /// The status is only logged: a missing alias is the normal case.
    pub async fn reset_test_alias(
        &self,
        alias_name: &str,
    ) -> Result<ApiResponse, ErmisClientError> {
        info!(alias = %alias_name, "Deleting the test alias in case it exists");

        let response = self.delete_alias(alias_name).await?;

        info!(
            alias = %alias_name,
            status = response.status,
            "Test alias reset"
        );

        Ok(response)
    }
}

fn fixed_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(WWW_AUTHENTICATE, HeaderValue::from_static("Negotiate"));
    headers
}

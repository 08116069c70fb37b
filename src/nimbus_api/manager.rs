//! The Nimbus Cloud request orchestrator.
//!
//! [`CloudManager`] owns the whole request path: token resolution and
//! validation, request construction, transport selection, and response
//! decoding. The token is resolved from [`TokenStorage`] at most once per
//! instance and cached; every outgoing request carries a token matching
//! the validity pattern before any network call is attempted.

use crate::nimbus_api::token_storage::TokenStorage;
use crate::nimbus_api::transport::{FallbackTransport, HttpTransport, Transport};
use crate::nimbus_api::types::{DecodeError, Method, NimbusError, Params};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::sync::RwLock;

/// Production Nimbus Cloud API endpoint.
pub const ENDPOINT_URL: &str = "https://api.nimbuscloud.io/v1";

/// Status probe path, relative to the base endpoint.
const STATUS_PATH: &str = "cloud-status/status";

/// Key the status endpoint reports on success.
const REQUEST_LIMIT_KEY: &str = "requestLimit";

/// Marker that identifies an HTML error page served in place of JSON.
const HTML_PREFIX: &str = "<!DOCTYPE html>";

/// Valid tokens are exactly 32 lowercase hex characters.
static TOKEN_FORMAT: Lazy<Regex> =
    Lazy::new(|| Regex::new("^[a-f0-9]{32}$").expect("token pattern is valid"));

/// Client for the Nimbus Cloud API.
///
/// The manager resolves its API token lazily from the injected
/// [`TokenStorage`], validates it, and dispatches requests through one of
/// two transports: the rich transport for POST requests when available,
/// and the fallback transport for everything else.
///
/// One request is in flight per call; the manager performs no retries and
/// no overlapping requests of its own. It is `Send + Sync` and can be
/// shared behind an `Arc`, but the token cache is per-instance.
///
/// # Example
///
/// ```no_run
/// use nimbus_sdk::{CloudManager, FileTokenStorage};
///
/// # async fn example() -> Result<(), nimbus_sdk::NimbusError> {
/// let manager = CloudManager::new(FileTokenStorage::new("/etc/nimbus/token"));
///
/// if manager.is_connection_ok().await? {
///     println!("requests left: {}", manager.current_request_limit().await?);
/// }
/// # Ok(())
/// # }
/// ```
pub struct CloudManager {
    base_url: String,
    token_storage: Box<dyn TokenStorage>,
    /// Token cache, resolved at most once per instance.
    token: RwLock<Option<String>>,
    rich: Option<Box<dyn Transport>>,
    fallback: Box<dyn Transport>,
}

impl CloudManager {
    /// Create a manager against the production endpoint with the default
    /// transports.
    pub fn new<S>(token_storage: S) -> Self
    where
        S: TokenStorage + 'static,
    {
        Self::with_endpoint(token_storage, ENDPOINT_URL)
    }

    /// Create a manager with default transports against a caller-supplied
    /// base URL.
    ///
    /// Intended for integration tests and staging environments; production
    /// callers use [`CloudManager::new`], which pins [`ENDPOINT_URL`].
    pub fn with_endpoint<S>(token_storage: S, base_url: impl Into<String>) -> Self
    where
        S: TokenStorage + 'static,
    {
        Self::with_transports(
            token_storage,
            base_url,
            Some(Box::new(HttpTransport::new())),
            Box::new(FallbackTransport::new()),
        )
    }

    /// Create a manager with fully injected transports.
    ///
    /// `rich` is preferred for POST requests when present; `fallback`
    /// handles everything else. Passing `None` for `rich` forces every
    /// request through the fallback.
    pub fn with_transports<S>(
        token_storage: S,
        base_url: impl Into<String>,
        rich: Option<Box<dyn Transport>>,
        fallback: Box<dyn Transport>,
    ) -> Self
    where
        S: TokenStorage + 'static,
    {
        let base_url = base_url.into();
        tracing::debug!("creating CloudManager with base URL: {}", base_url);

        Self {
            base_url,
            token_storage: Box::new(token_storage),
            token: RwLock::new(None),
            rich,
            fallback,
        }
    }

    /// The base URL this manager sends requests to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Probe the status endpoint and report whether the API answers with a
    /// request limit.
    ///
    /// Every failure except an invalid argument (malformed token, bad
    /// path) collapses to `Ok(false)`; invalid arguments propagate. This
    /// is the only place in the SDK where errors are swallowed.
    pub async fn is_connection_ok(&self) -> Result<bool, NimbusError> {
        match self
            .call_request(STATUS_PATH, Params::new(), Method::Get, None)
            .await
        {
            Ok(response) => Ok(response.contains_key(REQUEST_LIMIT_KEY)),
            Err(err) if err.is_invalid_argument() => Err(err),
            Err(err) => {
                tracing::debug!("connection probe failed: {}", err);
                Ok(false)
            }
        }
    }

    /// Fetch the remaining request limit for the current token.
    ///
    /// Returns `0` when the status endpoint answers without a
    /// `requestLimit` value. Unlike [`CloudManager::is_connection_ok`],
    /// every error propagates.
    pub async fn current_request_limit(&self) -> Result<i64, NimbusError> {
        let mut params = Params::new();
        params.insert("token".to_string(), Value::String(self.get_token()?));

        let response = self
            .call_request(STATUS_PATH, params, Method::Get, None)
            .await?;

        Ok(response
            .get(REQUEST_LIMIT_KEY)
            .and_then(Value::as_i64)
            .unwrap_or(0))
    }

    /// Call an arbitrary Nimbus Cloud endpoint and return the decoded
    /// response object.
    ///
    /// The request body always carries `locale` and `token` fields;
    /// caller-supplied params win on key conflict. When `params` contains
    /// a `token` entry it is used instead of the stored token, which is
    /// how a not-yet-persisted token gets verified.
    ///
    /// # Arguments
    ///
    /// * `path` - Endpoint path relative to the base URL; must not be empty
    /// * `params` - Request parameters, merged over the defaults
    /// * `method` - [`Method::Get`] or [`Method::Post`]
    /// * `locale` - Optional locale forwarded to the API
    ///
    /// # Example
    ///
    /// ```no_run
    /// use nimbus_sdk::{CloudManager, InMemoryTokenStorage, Method, Params};
    /// use serde_json::Value;
    ///
    /// # async fn example() -> Result<(), nimbus_sdk::NimbusError> {
    /// let manager = CloudManager::new(InMemoryTokenStorage::with_token(
    ///     "0123456789abcdef0123456789abcdef",
    /// ));
    ///
    /// let mut params = Params::new();
    /// params.insert("message".to_string(), Value::String("hello".to_string()));
    ///
    /// let response = manager
    ///     .call_request("log/feed", params, Method::Post, Some("en"))
    ///     .await?;
    /// println!("{:?}", response.get("status"));
    /// # Ok(())
    /// # }
    /// ```
    pub async fn call_request(
        &self,
        path: &str,
        params: Params,
        method: Method,
        locale: Option<&str>,
    ) -> Result<Params, NimbusError> {
        if path.is_empty() {
            return Err(NimbusError::InvalidArgument(
                "path can not be an empty string".to_string(),
            ));
        }

        let token = match params.get("token") {
            Some(Value::String(token)) => token.clone(),
            Some(other) => return Err(invalid_token_error(&other.to_string())),
            None => self.get_token()?,
        };
        check_token_format(&token)?;

        let url = format!("{}/{}", self.base_url, path);

        let mut body = Params::new();
        body.insert(
            "locale".to_string(),
            locale
                .map(|l| Value::String(l.to_string()))
                .unwrap_or(Value::Null),
        );
        body.insert("token".to_string(), Value::String(token));
        for (key, value) in params {
            // caller params win on conflict
            body.insert(key, value);
        }

        let raw = match (method, &self.rich) {
            (Method::Post, Some(rich)) => rich.send(&url, method, &body).await,
            _ => self.fallback.send(&url, method, &body).await,
        }?;

        if let Some(status) = raw.status {
            if status != 200 {
                tracing::error!("call to {} failed with status {}", url, status);
                return Err(NimbusError::InvalidArgument(format!(
                    "call to URL \"{}\" failed with status {}.\n\nResponse: {}",
                    url, status, raw.body
                )));
            }
        }

        decode_response(&raw.body).map_err(NimbusError::from)
    }

    /// Return the API token, resolving it from storage on first use.
    ///
    /// Once resolved the token is cached for the lifetime of this
    /// instance and storage is not consulted again, even if its contents
    /// change externally.
    pub fn get_token(&self) -> Result<String, NimbusError> {
        if let Some(token) = self.token.read().expect("token cache poisoned").as_ref() {
            return Ok(token.clone());
        }

        let loaded = self.token_storage.get_token().map_err(NimbusError::Storage)?;
        let token = match loaded {
            Some(token) => token,
            None => {
                return Err(NimbusError::MissingToken {
                    storage: self.token_storage.name().to_string(),
                })
            }
        };
        check_token_format(&token)?;

        tracing::debug!("token resolved from {} and cached", self.token_storage.name());
        *self.token.write().expect("token cache poisoned") = Some(token.clone());

        Ok(token)
    }

    /// Verify a new API token against the live API and persist it.
    ///
    /// The token is lowercased first. When it matches the already-cached
    /// token this is a no-op: no network call, no storage write.
    /// Otherwise the format is validated, the token is verified with a
    /// status probe, and on success it is written to storage and the
    /// in-instance cache.
    pub async fn set_token(&self, token: &str) -> Result<(), NimbusError> {
        let token = token.to_lowercase();

        if self
            .token
            .read()
            .expect("token cache poisoned")
            .as_deref()
            == Some(token.as_str())
        {
            tracing::debug!("token unchanged, skipping verification");
            return Ok(());
        }

        check_token_format(&token)?;

        let mut params = Params::new();
        params.insert("token".to_string(), Value::String(token.clone()));
        let response = self
            .call_request(STATUS_PATH, params, Method::Get, None)
            .await?;

        if !response.contains_key(REQUEST_LIMIT_KEY) {
            return Err(NimbusError::InvalidArgument(format!(
                "API token \"{}\" does not work; use a token generated by your Nimbus Cloud account",
                token
            )));
        }

        self.token_storage
            .set_token(&token)
            .map_err(NimbusError::Storage)?;
        *self.token.write().expect("token cache poisoned") = Some(token);

        tracing::info!(
            "API token verified and persisted to {}",
            self.token_storage.name()
        );

        Ok(())
    }
}

/// Reject tokens that are not exactly 32 lowercase hex characters.
fn check_token_format(token: &str) -> Result<(), NimbusError> {
    if TOKEN_FORMAT.is_match(token) {
        Ok(())
    } else {
        Err(invalid_token_error(token))
    }
}

fn invalid_token_error(token: &str) -> NimbusError {
    NimbusError::InvalidArgument(format!(
        "API token \"{}\" is invalid; expected 32 lowercase hex characters",
        token
    ))
}

/// Decode a raw response body into a JSON object.
///
/// An empty body, an HTML document, unparseable JSON, and non-object JSON
/// are all decode failures; an HTML body is never handed to the JSON
/// parser.
fn decode_response(body: &str) -> Result<Params, DecodeError> {
    if body.is_empty() {
        return Err(DecodeError::EmptyBody);
    }
    if body.starts_with(HTML_PREFIX) {
        return Err(DecodeError::HtmlBody);
    }

    let value: Value =
        serde_json::from_str(body).map_err(|err| DecodeError::Json(err.to_string()))?;

    match value {
        Value::Object(map) => Ok(map),
        other => Err(DecodeError::NotAnObject(json_type_name(&other))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

use crate::nimbus_api::token_storage::StorageError;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// A generic request or response payload: a JSON object.
pub type Params = Map<String, Value>;

/// HTTP methods supported by the Nimbus Cloud API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    /// The wire representation of the method.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = NimbusError;

    /// Parse a method from its wire representation.
    ///
    /// Only `GET` and `POST` are accepted; anything else is an
    /// [`NimbusError::InvalidArgument`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            other => Err(NimbusError::InvalidArgument(format!(
                "HTTP method must be \"GET\" or \"POST\", but \"{}\" given",
                other
            ))),
        }
    }
}

/// Nimbus SDK error type
///
/// Represents all possible errors that can occur when talking to the
/// Nimbus Cloud API or resolving the API token.
#[derive(Debug)]
pub enum NimbusError {
    /// A request argument was rejected: empty path, unsupported method,
    /// malformed token, non-200 status on the rich transport, or a token
    /// that failed live verification.
    InvalidArgument(String),
    /// The token storage holds no token; `storage` names the queried
    /// implementation.
    MissingToken { storage: String },
    /// The token storage backend failed.
    Storage(StorageError),
    /// Network-level failure while sending the request.
    Transport(TransportError),
    /// The response body could not be decoded.
    Decode(DecodeError),
}

impl NimbusError {
    /// `true` for the invalid-argument class, the only class that escapes
    /// [`crate::CloudManager::is_connection_ok`].
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, NimbusError::InvalidArgument(_))
    }
}

impl fmt::Display for NimbusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NimbusError::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            NimbusError::MissingToken { storage } => write!(
                f,
                "token storage {} holds no token; register this project with Nimbus Cloud first",
                storage
            ),
            NimbusError::Storage(err) => write!(f, "storage error: {}", err),
            NimbusError::Transport(err) => write!(f, "transport error: {}", err),
            NimbusError::Decode(err) => write!(f, "decode error: {}", err),
        }
    }
}

impl std::error::Error for NimbusError {}

impl From<StorageError> for NimbusError {
    fn from(err: StorageError) -> Self {
        NimbusError::Storage(err)
    }
}

impl From<TransportError> for NimbusError {
    fn from(err: TransportError) -> Self {
        NimbusError::Transport(err)
    }
}

impl From<DecodeError> for NimbusError {
    fn from(err: DecodeError) -> Self {
        NimbusError::Decode(err)
    }
}

/// Transport-level errors
#[derive(Debug)]
pub enum TransportError {
    /// Network error (connection, timeout, etc.)
    Network(String),
    /// The request could not be constructed
    Request(String),
    /// The response body could not be read
    Body(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Network(msg) => write!(f, "network error: {}", msg),
            TransportError::Request(msg) => write!(f, "request error: {}", msg),
            TransportError::Body(msg) => write!(f, "body error: {}", msg),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Network("request timeout".to_string())
        } else if err.is_connect() {
            TransportError::Network(format!("connection failed: {}", err))
        } else if err.is_builder() || err.is_request() {
            TransportError::Request(err.to_string())
        } else if err.is_body() || err.is_decode() {
            TransportError::Body(err.to_string())
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

/// Response decoding errors
#[derive(Debug)]
pub enum DecodeError {
    /// The response body was empty
    EmptyBody,
    /// The response body was an HTML document instead of JSON
    HtmlBody,
    /// The response body failed to parse as JSON
    Json(String),
    /// The body parsed as JSON but was not an object
    NotAnObject(&'static str),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::EmptyBody => write!(f, "empty response body"),
            DecodeError::HtmlBody => {
                write!(f, "response must be JSON, but an HTML document was given")
            }
            DecodeError::Json(msg) => write!(f, "invalid JSON: {}", msg),
            DecodeError::NotAnObject(found) => {
                write!(f, "expected a JSON object, got {}", found)
            }
        }
    }
}

impl std::error::Error for DecodeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_round_trip() {
        assert_eq!("GET".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("POST".parse::<Method>().unwrap(), Method::Post);
        assert_eq!(Method::Get.to_string(), "GET");
        assert_eq!(Method::Post.to_string(), "POST");
    }

    #[test]
    fn test_method_rejects_everything_else() {
        for raw in ["PUT", "DELETE", "get", "post", "", "GETT"] {
            let err = raw.parse::<Method>().unwrap_err();
            assert!(err.is_invalid_argument(), "{:?} should be rejected", raw);
            assert!(err.to_string().contains(raw) || raw.is_empty());
        }
    }

    #[test]
    fn test_missing_token_names_the_storage() {
        let err = NimbusError::MissingToken {
            storage: "FileTokenStorage".to_string(),
        };
        assert!(err.to_string().contains("FileTokenStorage"));
        assert!(!err.is_invalid_argument());
    }
}

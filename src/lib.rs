//! Nimbus SDK
//!
//! A Rust client library for the Nimbus Cloud API.
//!
//! This SDK provides:
//! - [`CloudManager`], the request orchestrator: token resolution and
//!   validation, request construction, transport selection, and JSON
//!   response decoding
//! - [`TokenStorage`], the persistence seam for the API token, with
//!   in-memory and file-backed implementations
//! - [`Transport`], the delivery seam with a rich JSON client and a
//!   minimal fallback
//!
//! # Example
//!
//! ```no_run
//! use nimbus_sdk::{CloudManager, FileTokenStorage, Method, Params};
//! use serde_json::Value;
//!
//! # async fn example() -> Result<(), nimbus_sdk::NimbusError> {
//! let manager = CloudManager::new(FileTokenStorage::new("/etc/nimbus/token"));
//!
//! // Check the API is reachable and the stored token works
//! if manager.is_connection_ok().await? {
//!     println!("requests left: {}", manager.current_request_limit().await?);
//! }
//!
//! // Call an arbitrary endpoint
//! let mut params = Params::new();
//! params.insert("message".to_string(), Value::String("deploy finished".to_string()));
//! let response = manager
//!     .call_request("log/feed", params, Method::Post, Some("en"))
//!     .await?;
//! println!("{:?}", response.get("status"));
//! # Ok(())
//! # }
//! ```

pub mod nimbus_api;

// Re-export commonly used types and functions
pub use nimbus_api::{
    manager::{CloudManager, ENDPOINT_URL},
    token_storage::{FileTokenStorage, InMemoryTokenStorage, StorageError, TokenStorage},
    transport::{FallbackTransport, HttpTransport, RawResponse, Transport},
    types::{DecodeError, Method, NimbusError, Params, TransportError},
};

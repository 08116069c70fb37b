//! Nimbus Cloud API integration module
//!
//! This module provides the client for the Nimbus Cloud API: token
//! storage and validation, transport selection, and the request
//! orchestrator.
//!
//! ## Request flow
//!
//! 1. Caller invokes an operation on [`CloudManager`]
//! 2. The manager resolves the token (instance cache, then [`TokenStorage`])
//! 3. The token format is validated before any network call
//! 4. The request body is built (`locale` + `token` defaults, caller params win)
//! 5. A transport is selected: rich for POST when available, fallback otherwise
//! 6. The raw response is decoded into a JSON object and returned

pub mod manager;
pub mod token_storage;
pub mod transport;
pub mod types;

pub use manager::{CloudManager, ENDPOINT_URL};
pub use token_storage::{FileTokenStorage, InMemoryTokenStorage, StorageError, TokenStorage};
pub use transport::{FallbackTransport, HttpTransport, RawResponse, Transport};
pub use types::{DecodeError, Method, NimbusError, Params, TransportError};

//! # contract: the remote content client interface
//!
//! This module defines the single seam between the exporter and the CMS admin UI:
//! the [`RemoteClient`] trait. An implementor owns one authenticated, stateful
//! browsing session. Every call mutates or reads that one session, so callers
//! must issue calls strictly one after another.
//!
//! ## Interface & Extensibility
//! - Implement [`RemoteClient`] to drive a real browser, a recorded fixture or a fake.
//! - Selectors are CSS selectors. Element lookups honour the implementor's
//!   implicit wait; [`RemoteClient::wait_for`] is the only explicitly bounded wait.
//! - All failures are reported as [`ClientError`]; callers decide whether a failure
//!   is fatal (sign-in) or local to one artifact (extraction).
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall` so tests can script a session
//!   (`MockRemoteClient`), available under the `test-export-mocks` feature.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

/// Failure of a single remote interaction.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No element matched the selector within the implicit wait.
    #[error("element not found: {selector}")]
    ElementNotFound { selector: String },

    /// An explicit wait expired before the condition held.
    #[error("timed out after {timeout:?} waiting for {selector}")]
    Timeout { selector: String, timeout: Duration },

    /// Navigation to a URL did not complete.
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// The browser or its protocol connection reported an error.
    #[error("browser error: {0}")]
    Browser(String),
}

/// Authenticated handle onto the CMS admin UI.
///
/// The implementor is the one shared mutable resource of an export run: the
/// current URL and the current rendered document change with every navigation.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Load `url` and wait for the document to finish loading.
    async fn navigate(&self, url: &str) -> Result<(), ClientError>;

    /// URL of the page currently shown.
    async fn current_url(&self) -> Result<String, ClientError>;

    /// Serialized markup of the page currently shown.
    async fn current_document(&self) -> Result<String, ClientError>;

    /// Click the first element matching `selector`.
    async fn click(&self, selector: &str) -> Result<(), ClientError>;

    /// Focus the first element matching `selector` and type `text` into it.
    async fn type_text(&self, selector: &str, text: &str) -> Result<(), ClientError>;

    /// Wait until an element matching `selector` exists, at most `timeout`.
    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<(), ClientError>;

    /// Focus the element matching `selector`, select all of its content, copy it
    /// to the transfer buffer and return the buffer contents.
    async fn copy_all(&self, selector: &str) -> Result<String, ClientError>;

    /// Tear the session down. Further calls are invalid.
    async fn close(&self) -> Result<(), ClientError>;
}

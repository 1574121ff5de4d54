//! Error types for the feed clients

use gamefeed_core::LinkField;
use thiserror::Error;

/// Errors that fail a whole feed source
#[derive(Debug, Error)]
pub enum NewsError {
    /// HTTP request failed
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Request did not finish within the configured timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Feed server returned a non-success status
    #[error("HTTP error (status {status}) fetching {url}")]
    HttpStatus {
        /// HTTP status code
        status: u16,
        /// Requested feed URL
        url: String,
    },

    /// Document is not a readable RSS channel
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Errors that only skip a single feed item
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ItemError {
    #[error("item has no title")]
    MissingTitle,

    #[error("item \"{title}\" has no {field} element")]
    MissingLink { title: String, field: LinkField },

    #[error("item \"{title}\" has no publication date")]
    MissingDate { title: String },

    #[error("item \"{title}\" has unparseable date \"{value}\" (format {format})")]
    InvalidDate {
        title: String,
        value: String,
        format: String,
    },
}

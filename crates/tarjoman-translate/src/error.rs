//! Translation capability errors.
//!
//! None of these escape the dispatch layer; they select the placeholder
//! branch and are logged, not returned.

use thiserror::Error;

/// Failure modes of a translation backend call.
#[derive(Error, Debug)]
pub enum TranslationError {
    /// No API credential was configured.
    #[error("missing API credential")]
    MissingCredential,

    /// Transport-level failure (connection, TLS, DNS).
    #[error("HTTP error: {0}")]
    Http(String),

    /// The request exceeded the configured deadline.
    #[error("translation request timed out")]
    Timeout,

    /// The service answered with an error or an unusable payload.
    #[error("API error: {0}")]
    Api(String),
}

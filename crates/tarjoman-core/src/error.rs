//! Error types for the tarjoman pipeline.
//!
//! Internal stages favor graceful degradation over raising: classifier
//! ambiguity resolves to a paragraph, translation failure becomes a
//! placeholder document, a bad image is skipped per-element. The variants
//! here cover the conditions that are allowed to reach a caller: invalid
//! external input and extraction/render paths whose fallbacks are
//! exhausted.

use thiserror::Error;

/// Error conditions that can surface from the tarjoman pipeline.
#[derive(Error, Debug)]
pub enum TarjomanError {
    /// Client-facing invalid input (bad URL, unknown output format,
    /// unsupported file extension). Surfaced immediately, never retried.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The input bytes are in a format no parser handles.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// All extraction fallbacks were exhausted and the result is unusable.
    #[error("extraction failed: {0}")]
    ExtractionFailed(String),

    /// A render sink could not produce output for the whole document.
    /// Per-element failures (a malformed image, say) are skipped and
    /// counted instead of raising this.
    #[error("render failed: {0}")]
    RenderFailed(String),

    /// File I/O error while reading input or persisting job output.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error from intermediate IR or manifest dumps.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Type alias for [`Result<T, TarjomanError>`].
pub type Result<T> = std::result::Result<T, TarjomanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_request_display() {
        let error = TarjomanError::InvalidRequest("unknown output format: csv".to_string());
        assert_eq!(format!("{error}"), "invalid request: unknown output format: csv");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: TarjomanError = io_err.into();
        match err {
            TarjomanError::IoError(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            _ => panic!("Expected IoError variant"),
        }
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{ nope }").unwrap_err();
        let err: TarjomanError = json_err.into();
        assert!(matches!(err, TarjomanError::JsonError(_)));
    }

    #[test]
    fn test_error_propagation_with_question_mark() {
        fn inner() -> Result<()> {
            Err(TarjomanError::UnsupportedFormat("bin".to_string()))
        }
        fn outer() -> Result<()> {
            inner()?;
            Ok(())
        }
        match outer() {
            Err(TarjomanError::UnsupportedFormat(msg)) => assert_eq!(msg, "bin"),
            _ => panic!("Expected UnsupportedFormat to propagate"),
        }
    }
}

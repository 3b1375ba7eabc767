//! Error types for the generation client
//!
//! Every failure mode of the external generator maps to a variant here.
//! Nothing in this crate returns an empty or placeholder success value.

use casegen_extract::ExtractionError;

/// Generation client error type
#[derive(Debug, Clone, thiserror::Error)]
pub enum GenerationError {
    /// Required configuration is absent (fatal before any stage runs)
    #[error("missing configuration: {0}")]
    MissingConfig(String),

    /// Request did not complete within the caller-imposed timeout
    #[error("generation timed out after {duration_secs}s")]
    Timeout {
        /// Timeout ceiling that elapsed
        duration_secs: u64,
    },

    /// Connection, DNS, TLS, or body-read failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status other than an authentication failure
    #[error("generator returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, truncated
        body: String,
    },

    /// Credentials rejected (401/403)
    #[error("authentication failed: HTTP {status}")]
    Authentication {
        /// HTTP status code
        status: u16,
    },

    /// Generator answered with no content
    #[error("generator returned an empty response")]
    EmptyResponse,

    /// Content could not be turned into a structured value
    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    /// Structured value had a shape the caller cannot use
    #[error("unexpected response shape: expected {expected}, got {actual}")]
    UnexpectedShape {
        /// Shape the caller needed
        expected: String,
        /// Shape that arrived
        actual: String,
    },
}

impl GenerationError {
    /// Check if the error is a timeout
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Check if the error is a setup failure that must abort the whole run
    #[inline]
    #[must_use]
    pub fn is_setup(&self) -> bool {
        matches!(self, Self::MissingConfig(_) | Self::Authentication { .. })
    }

    /// Check if the error came from extracting structure out of the content
    #[inline]
    #[must_use]
    pub fn is_extraction(&self) -> bool {
        matches!(self, Self::Extraction(_))
    }

    /// Create an unexpected-shape error
    #[must_use]
    pub fn unexpected_shape(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::UnexpectedShape {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            // reqwest does not report the configured ceiling
            return Self::Timeout { duration_secs: 0 };
        }
        Self::Transport(err.to_string())
    }
}

//! Error types for structured-response extraction
//!
//! Both variants carry the raw generator text so callers can log exactly
//! what the generator produced before falling back.

/// Errors while turning generator text into a structured value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    /// Neither a balanced array nor a balanced object was found
    #[error("no JSON array or object found in generator output")]
    NoStructureFound {
        /// Full generator text
        original: String,
    },

    /// A candidate was found but did not parse, even after escape repair
    #[error("unparsable structure after escape repair: {message}")]
    UnparsableStructure {
        /// Full generator text
        original: String,
        /// Candidate substring selected for parsing
        candidate: String,
        /// Candidate after the escape-repair pass
        repaired: String,
        /// Parser message from the repaired attempt
        message: String,
    },
}

impl ExtractionError {
    /// Create a no-structure error
    #[inline]
    #[must_use]
    pub fn no_structure(original: impl Into<String>) -> Self {
        Self::NoStructureFound {
            original: original.into(),
        }
    }

    /// Raw generator text that caused the failure
    #[inline]
    #[must_use]
    pub fn original(&self) -> &str {
        match self {
            Self::NoStructureFound { original } | Self::UnparsableStructure { original, .. } => {
                original
            }
        }
    }

    /// Selected candidate, if extraction got that far
    #[inline]
    #[must_use]
    pub fn candidate(&self) -> Option<&str> {
        match self {
            Self::NoStructureFound { .. } => None,
            Self::UnparsableStructure { candidate, .. } => Some(candidate),
        }
    }
}

//! Casegen Structured-Response Extractor
//!
//! The boundary between free-text generator output and typed pipeline data.
//!
//! # Pipeline
//!
//! ```text
//! raw text → strip fence → first top-level [..] else {..} → strict parse
//!                                                              ↓ fail
//!                                               escape repair → parse once more
//! ```
//!
//! # Example
//!
//! ```rust
//! use casegen_extract::extract;
//!
//! let value = extract("Sure! ```json\n[{\"name\": \"login\"}]\n```").unwrap();
//! assert_eq!(value.as_array().map(<[_]>::len), Some(1));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod extractor;
pub mod value;

pub use error::ExtractionError;
pub use extractor::{
    extract, find_candidate, repair_escapes, strip_code_fence, CandidateKind, StructuredExtractor,
};
pub use value::StructuredValue;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! casegen command line
//!
//! `casegen run` streams pipeline events to stdout as JSON lines, one
//! `{"type": ..., "data": ...}` object per line, and can write the
//! normalized cases to a JSONL file. Logs go to stderr.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod cli;
pub mod commands;
pub mod logging;
pub mod settings;

pub use settings::Settings;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

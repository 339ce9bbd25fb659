//! Memory-compact primitives of a key-value store: a binary-safe dynamic
//! string with amortized appends and a sorted integer set with adaptive
//! element width. Both types have an exact little-endian blob layout for
//! persistence.

/// Settings loading (defaults, file, `KVPRIM_*` environment).
pub mod config;
/// Built-in data structures (Sds, IntSet).
pub mod database;
/// Logging setup on top of `tracing-subscriber`.
pub mod logging;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// config
pub use self::config::{OutputFormat, Settings};
/// Data types: Sds, IntSet and its storage width.
pub use database::{Encoding, IntSet, IntSetIter, Sds};
/// Operation errors and result types.
pub use kvprim_error::{
    ErrorExt, IntSetError, KvprimResult, LogLevel, SdsError, StackError, StatusCode,
};

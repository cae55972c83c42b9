//! Error taxonomy for the storage and configuration layer
//!
//! Gate denials are deliberately not here: an event being filtered out is
//! normal control flow, not an error.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from the keyed JSON stores
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing file exists but is not valid JSON. Fatal at load; the
    /// store must not silently reset to empty.
    #[error("store file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// An entry value could not be serialized for storage
    #[error("failed to serialize store entry '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Read, write or rename failure on the backing file. The in-memory
    /// state keeps the attempted mutation; the durable copy is stale.
    #[error("store I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// User-facing validation failures for trigger management. Reported to the
/// requester; no state change.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TriggerError {
    #[error("reaction '{0}' already exists")]
    AlreadyExists(String),

    #[error("reaction '{0}' was not found")]
    NotFound(String),
}

//! Typed errors for snapshot loading.
//!
//! A load failure is fatal for the whole batch: aggregating over an
//! inconsistent series would produce a misleading report, so the caller
//! aborts instead of skipping the bad file.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while turning a result file into a [`crate::models::Snapshot`].
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file name does not end in a `YYYY-MM-DD_HH-MM-SS` timestamp.
    #[error("no parseable timestamp in result file name: {0}")]
    MalformedIdentifier(PathBuf),

    /// The payload is not the expected package -> test -> outcome mapping.
    #[error("result file {path} does not parse as a result mapping")]
    CorruptPayload {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Reading or decompressing the file failed.
    #[error("failed to read result file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

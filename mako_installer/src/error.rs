use std::path::PathBuf;

use mako_formats::cursor::CursorError;
use thiserror::Error;

/// Failure taxonomy for the conversion run. Binary-decoding problems are
/// caught at the smallest meaningful unit (one record, one map) and become
/// warnings plus a skip; only filesystem and initialization failures abort
/// the run.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("failed to create output directory {path}")]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no {what} recorded for field {field_id} (needed by {needed_by})")]
    MissingCrossReference {
        what: &'static str,
        field_id: u16,
        needed_by: String,
    },
    #[error("script decompiler failed on {field}: {message}")]
    Decompiler { field: String, message: String },
    #[error("installation cancelled")]
    Cancelled,
    #[error(transparent)]
    OutOfRange(#[from] CursorError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

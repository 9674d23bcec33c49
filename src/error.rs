use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Fatal errors. Any of these aborts the run; none is recovered per file.
#[derive(Debug, Error, Diagnostic)]
pub enum AuditError {
    #[error("catalog request failed: {0}")]
    CatalogHttp(String),

    #[error("catalog returned status {status}: {message}")]
    CatalogStatus { status: u16, message: String },

    #[error("failed to decode catalog payload: {0}")]
    CatalogDecode(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("required tool not found: {0}")]
    MissingTool(String),

    #[error("converter failed: {0}")]
    Conversion(String),

    #[error("failed to build worker pool: {0}")]
    WorkerPool(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to write report: {0}")]
    ReportWrite(String),
}

/// The one expected, per-file error: the converter rejected the exchange
/// file as malformed or non-conforming. Recorded as a failure outcome and
/// shown in the report; never aborts the batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("file {file_id}: {message}")]
pub struct ParseError {
    pub file_id: u64,
    pub message: String,
}

impl ParseError {
    pub fn new(file_id: u64, message: impl Into<String>) -> Self {
        Self {
            file_id,
            message: message.into(),
        }
    }
}

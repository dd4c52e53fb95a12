//! Error types for all rowfile operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::query::QueryKind;

/// Top-level error type for rowfile operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Query(#[from] QueryError),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("cannot open table file {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("table file is locked")]
    FileLocked,

    #[error("line out of bounds: {line} not in 1..={count}")]
    LineOutOfBounds { line: usize, count: usize },

    #[error("line at byte offset {offset} is not valid UTF-8")]
    InvalidUtf8 { offset: u64 },
}

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("format token '{0}' must not be empty")]
    EmptyToken(&'static str),

    #[error("column and row separators must differ")]
    SameSeparators,

    #[error("substitute token {substitute:?} contains a separator")]
    SubstituteContainsSeparator { substitute: String },

    #[error("invalid format descriptor: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot read format descriptor: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("no payload provided to {kind} into table {table}")]
    EmptyPayload { kind: QueryKind, table: String },

    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error("undefined query type: {0}")]
    UndefinedKind(String),
}

pub type Result<T> = std::result::Result<T, Error>;

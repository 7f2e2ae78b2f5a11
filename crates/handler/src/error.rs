use std::path::PathBuf;

use confucius_schema::{DirectiveError, SchemaParseError};
use thiserror::Error;

/// Per-request failure of the query and explorer handlers.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Failed to read schema file '{}': {source}", path.display())]
    SchemaFileUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Resolve(#[from] SchemaParseError),

    #[error("Invalid GraphQL request: {0}")]
    InvalidRequest(#[from] serde_json::Error),

    #[error("Query text is not valid UTF-8: {0}")]
    InvalidEncoding(#[from] std::str::Utf8Error),
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum EntryPointError {
    #[error("Entry point name '{0}' is invalid, it must not be empty.")]
    InvalidEntryPointName(String),
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Directive(#[from] DirectiveError),

    #[error(transparent)]
    EntryPoint(#[from] EntryPointError),
}

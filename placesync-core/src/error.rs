//! Error types for extraction and rebuild
//!
//! Only missing required inputs are fatal: an unparsable place document, or
//! a sidecar that rebuild cannot run without. Per-property and per-file
//! problems are downgraded to defaults or warnings by the components that
//! encounter them.

use std::path::PathBuf;

/// Errors from parsing a place document into a scene tree
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("Failed to parse place document: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Failed to parse attribute: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),

    #[error("Place document ended inside an open element")]
    UnexpectedEof,

    #[error("Place document is not well-formed")]
    Unbalanced,
}

/// Errors from projecting a place document to the filesystem
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("Failed to write projection output: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize reference map: {0}")]
    RefMap(#[from] serde_json::Error),
}

/// Errors from rebuilding a place document from a projection directory
#[derive(Debug, thiserror::Error)]
pub enum RebuildError {
    #[error("Original document sidecar not found: {0}")]
    MissingOriginal(PathBuf),

    #[error("Reference map sidecar not found: {0}")]
    MissingRefMap(PathBuf),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("Failed to parse reference map: {0}")]
    RefMap(#[from] serde_json::Error),

    #[error("Failed to read or write rebuild data: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from loading a project configuration file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

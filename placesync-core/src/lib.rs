//! PlaceSync Core Library
//!
//! This crate provides the core functionality for PlaceSync:
//! - Place document parsing with source-offset capture
//! - Property type definitions and the typed property codec
//! - The editable model-file format (serializer and parser)
//! - Tree projection to an editable directory layout
//! - The element reference map (projection provenance)
//! - Diff-based document rebuild via region splicing

pub mod codec;
pub mod config;
pub mod document;
pub mod error;
pub mod extract;
pub mod model_file;
pub mod path_utils;
pub mod rebuild;
pub mod refmap;
pub mod types;

// Re-export commonly used types
pub use config::ProjectConfig;
pub use document::{parse_document, referent_index};
pub use error::{ConfigError, DocumentError, ExtractError, RebuildError};
pub use extract::{extract_place, ExtractStats};
pub use rebuild::{rebuild_place, RebuildStats};
pub use refmap::{ElementRecord, ElementReferenceMap, Snapshot, ORIGINAL_FILE, REFMAP_FILE, SIDECAR_DIR};
pub use types::{
    CFrame, Color3, CompareValue, NodeSpan, Property, PropertyValue, RawCapture, RawChild,
    SceneNode, UDim2, Vector3,
};
pub use path_utils::{normalize_path, path_to_string, sanitize_filename};

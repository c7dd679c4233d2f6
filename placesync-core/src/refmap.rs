//! Element reference map
//!
//! The persisted index from projected file path to provenance: which node
//! the file came from (by referent) and the snapshot needed to detect and
//! patch changes later. Records are created once during projection and are
//! read-only afterward; the rebuild engine never mutates them.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ExtractError, RebuildError};
use crate::types::RawCapture;

/// Sidecar directory created inside every projection
pub const SIDECAR_DIR: &str = ".placesync";
/// Verbatim copy of the input document
pub const ORIGINAL_FILE: &str = "original.rbxlx";
/// Serialized reference map
pub const REFMAP_FILE: &str = "refmap.json";

/// Provenance record for one projected file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementRecord {
    /// Stable node id; the join key back into the original document
    pub referent: String,
    /// Dotted id combining ancestor names, own name, and class
    pub derived_path: String,
    #[serde(flatten)]
    pub snapshot: Snapshot,
}

/// The snapshot a record carries, by emitted file kind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Snapshot {
    #[serde(rename_all = "camelCase")]
    Script { original_source: String },
    /// Ordered raw captures; document property order survives persistence
    #[serde(rename_all = "camelCase")]
    Model { original_properties: Vec<RawCapture> },
}

/// The persisted path → provenance index
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ElementReferenceMap {
    pub entries: BTreeMap<String, ElementRecord>,
}

impl ElementReferenceMap {
    pub fn insert(&mut self, path: String, record: ElementRecord) {
        self.entries.insert(path, record);
    }

    /// Persist to the sidecar location
    pub fn save(&self, path: &Path) -> Result<(), ExtractError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, RebuildError> {
        let content = std::fs::read_to_string(path)?;
        let map: ElementReferenceMap = serde_json::from_str(&content)?;
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_snapshot_round_trip() {
        let mut map = ElementReferenceMap::default();
        map.insert(
            "Workspace/Main.server.lua".to_string(),
            ElementRecord {
                referent: "RBX1".to_string(),
                derived_path: "Workspace.Main.Script".to_string(),
                snapshot: Snapshot::Script {
                    original_source: "print(1)".to_string(),
                },
            },
        );
        map.insert(
            "Workspace/Base.part.model".to_string(),
            ElementRecord {
                referent: "RBX2".to_string(),
                derived_path: "Workspace.Base.Part".to_string(),
                snapshot: Snapshot::Model {
                    original_properties: vec![RawCapture {
                        name: "Name".to_string(),
                        type_tag: "string".to_string(),
                        attributes: vec![("name".to_string(), "Name".to_string())],
                        text: "Base".to_string(),
                        children: Vec::new(),
                    }],
                },
            },
        );

        let json = serde_json::to_string_pretty(&map).unwrap();
        let loaded: ElementReferenceMap = serde_json::from_str(&json).unwrap();

        match &loaded.entries["Workspace/Main.server.lua"].snapshot {
            Snapshot::Script { original_source } => assert_eq!(original_source, "print(1)"),
            other => panic!("expected script snapshot, got {:?}", other),
        }
        match &loaded.entries["Workspace/Base.part.model"].snapshot {
            Snapshot::Model { original_properties } => {
                assert_eq!(original_properties.len(), 1);
                assert_eq!(original_properties[0].name, "Name");
            }
            other => panic!("expected model snapshot, got {:?}", other),
        }
    }
}

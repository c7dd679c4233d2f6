//! Tree projector
//!
//! Walks the parsed document pre-order and emits the editable filesystem
//! projection: script files for script classes, model files for everything
//! else, directories for nodes with children. Every emitted file is
//! registered in the element reference map, and the map plus a verbatim
//! copy of the input document are persisted as sidecars. This is the only
//! component that performs bulk writes.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::config::ProjectConfig;
use crate::document;
use crate::error::ExtractError;
use crate::model_file;
use crate::path_utils::{path_to_string, sanitize_filename};
use crate::refmap::{
    ElementRecord, ElementReferenceMap, Snapshot, ORIGINAL_FILE, REFMAP_FILE, SIDECAR_DIR,
};
use crate::types::SceneNode;

/// Script classes and the extension conveying their execution context
const SCRIPT_EXTENSIONS: &[(&str, &str)] = &[
    ("Script", ".server.lua"),
    ("LocalScript", ".local.lua"),
    ("ModuleScript", ".module.lua"),
];

/// Counters from one extraction run
#[derive(Debug, Clone, Default)]
pub struct ExtractStats {
    pub scripts: usize,
    pub models: usize,
    pub directories: usize,
    pub excluded: usize,
}

/// Project a place document into an editable directory tree
pub fn extract_place(
    document_text: &str,
    output_dir: &Path,
    config: &ProjectConfig,
) -> Result<ExtractStats, ExtractError> {
    let roots = document::parse_document(document_text)?;

    fs::create_dir_all(output_dir)?;

    let mut projector = Projector {
        output_dir,
        config,
        refmap: ElementReferenceMap::default(),
        stats: ExtractStats::default(),
    };
    projector.project_children(&roots, Path::new(""), "")?;

    let sidecar_dir = output_dir.join(SIDECAR_DIR);
    fs::create_dir_all(&sidecar_dir)?;
    fs::write(sidecar_dir.join(ORIGINAL_FILE), document_text)?;
    projector.refmap.save(&sidecar_dir.join(REFMAP_FILE))?;

    tracing::info!(
        "Extraction complete: {} scripts, {} models, {} directories",
        projector.stats.scripts,
        projector.stats.models,
        projector.stats.directories
    );
    Ok(projector.stats)
}

fn script_extension(class_name: &str) -> Option<&'static str> {
    SCRIPT_EXTENSIONS
        .iter()
        .find(|(class, _)| *class == class_name)
        .map(|(_, ext)| *ext)
}

fn model_extension(class_name: &str) -> String {
    format!(".{}.model", class_name.to_lowercase())
}

struct Projector<'a> {
    output_dir: &'a Path,
    config: &'a ProjectConfig,
    refmap: ElementReferenceMap,
    stats: ExtractStats,
}

impl Projector<'_> {
    fn project_children(
        &mut self,
        children: &[SceneNode],
        rel_dir: &Path,
        derived_prefix: &str,
    ) -> Result<(), ExtractError> {
        let mut used_names: HashSet<String> = HashSet::new();

        for child in children {
            if self.config.exclude_classes.contains(&child.class_name) {
                self.stats.excluded += 1;
                tracing::debug!("Excluded {} ({})", child.name(), child.class_name);
                continue;
            }

            let mut base = sanitize_filename(child.name());
            if !used_names.insert(base.clone()) {
                // Sibling collision: disambiguate with the referent
                base = format!("{}_{}", base, sanitize_filename(&child.referent));
                used_names.insert(base.clone());
            }
            self.project_node(child, rel_dir, derived_prefix, &base)?;
        }
        Ok(())
    }

    fn project_node(
        &mut self,
        node: &SceneNode,
        rel_dir: &Path,
        derived_prefix: &str,
        base: &str,
    ) -> Result<(), ExtractError> {
        let derived_path = if derived_prefix.is_empty() {
            format!("{}.{}", node.name(), node.class_name)
        } else {
            format!("{}.{}.{}", derived_prefix, node.name(), node.class_name)
        };

        if let Some(ext) = script_extension(&node.class_name) {
            let rel_path = rel_dir.join(format!("{}{}", base, ext));
            let source = node.source_text().to_string();
            self.write_file(&rel_path, &source)?;
            self.refmap.insert(
                path_to_string(&rel_path),
                ElementRecord {
                    referent: node.referent.clone(),
                    derived_path,
                    snapshot: Snapshot::Script {
                        original_source: source,
                    },
                },
            );
            self.stats.scripts += 1;
            tracing::info!("Created script: {}", path_to_string(&rel_path));
        } else {
            let rel_path = rel_dir.join(format!("{}{}", base, model_extension(&node.class_name)));
            let text = model_file::serialize_model(&node.class_name, node.name(), &node.properties);
            self.write_file(&rel_path, &text)?;
            self.refmap.insert(
                path_to_string(&rel_path),
                ElementRecord {
                    referent: node.referent.clone(),
                    derived_path,
                    snapshot: Snapshot::Model {
                        original_properties: node.properties.iter().map(|p| p.raw.clone()).collect(),
                    },
                },
            );
            self.stats.models += 1;
            tracing::info!("Created model: {}", path_to_string(&rel_path));

            if !node.children.is_empty() {
                let child_rel = rel_dir.join(base);
                fs::create_dir_all(self.output_dir.join(&child_rel))?;
                self.stats.directories += 1;

                let child_prefix = if derived_prefix.is_empty() {
                    node.name().to_string()
                } else {
                    format!("{}.{}", derived_prefix, node.name())
                };
                self.project_children(&node.children, &child_rel, &child_prefix)?;
            }
        }
        Ok(())
    }

    fn write_file(&self, rel_path: &Path, content: &str) -> Result<(), ExtractError> {
        let full = self.output_dir.join(rel_path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(full, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"<roblox version="4">
	<Item class="Workspace" referent="RBX0">
		<Properties>
			<string name="Name">Workspace</string>
		</Properties>
		<Item class="Part" referent="RBX1">
			<Properties>
				<string name="Name">Base</string>
			</Properties>
		</Item>
		<Item class="Script" referent="RBX2">
			<Properties>
				<string name="Name">Main</string>
				<ProtectedString name="Source"><![CDATA[print("hello")]]></ProtectedString>
			</Properties>
		</Item>
	</Item>
</roblox>"#;

    #[test]
    fn test_extract_writes_projection_and_sidecars() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("out");

        let stats = extract_place(SAMPLE, &out, &ProjectConfig::default()).unwrap();
        assert_eq!(stats.scripts, 1);
        assert_eq!(stats.models, 2);
        assert_eq!(stats.directories, 1);

        assert!(out.join("Workspace.workspace.model").exists());
        assert!(out.join("Workspace").join("Base.part.model").exists());
        let script = out.join("Workspace").join("Main.server.lua");
        assert_eq!(fs::read_to_string(script).unwrap(), "print(\"hello\")");

        let sidecar = out.join(SIDECAR_DIR);
        assert_eq!(fs::read_to_string(sidecar.join(ORIGINAL_FILE)).unwrap(), SAMPLE);

        let refmap = ElementReferenceMap::load(&sidecar.join(REFMAP_FILE)).unwrap();
        assert_eq!(refmap.entries.len(), 3);
        let record = &refmap.entries["Workspace/Main.server.lua"];
        assert_eq!(record.referent, "RBX2");
        assert_eq!(record.derived_path, "Workspace.Main.Script");
    }

    #[test]
    fn test_sibling_name_collision_is_disambiguated() {
        let doc = r#"<roblox>
	<Item class="Folder" referent="R0">
		<Properties><string name="Name">Root</string></Properties>
		<Item class="Part" referent="R1">
			<Properties><string name="Name">Twin</string></Properties>
		</Item>
		<Item class="Part" referent="R2">
			<Properties><string name="Name">Twin</string></Properties>
		</Item>
	</Item>
</roblox>"#;
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("out");

        let stats = extract_place(doc, &out, &ProjectConfig::default()).unwrap();
        assert_eq!(stats.models, 3);
        assert!(out.join("Root").join("Twin.part.model").exists());
        assert!(out.join("Root").join("Twin_R2.part.model").exists());
    }

    #[test]
    fn test_excluded_classes_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("out");

        let mut config = ProjectConfig::default();
        config.exclude_classes.insert("Script".to_string());

        let stats = extract_place(SAMPLE, &out, &config).unwrap();
        assert_eq!(stats.scripts, 0);
        assert_eq!(stats.excluded, 1);
        assert!(!out.join("Workspace").join("Main.server.lua").exists());
    }

    #[test]
    fn test_unnamed_node_defaults() {
        let doc = r#"<roblox><Item class="Folder" referent="R0"><Properties/></Item></roblox>"#;
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("out");

        extract_place(doc, &out, &ProjectConfig::default()).unwrap();
        assert!(out.join("Unnamed.folder.model").exists());
    }
}

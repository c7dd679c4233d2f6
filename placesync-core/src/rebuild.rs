//! Rebuild engine
//!
//! Reconstructs a place document from a projection directory by patching
//! only the byte ranges of the original document whose files actually
//! changed. The original sidecar is parsed once with offset capture; patch
//! spans are collected against that index and applied in a single pass in
//! ascending offset order. Everything outside a patched span passes through
//! byte-for-byte.
//!
//! Per-file problems (missing file, referent not found) are warnings; only
//! missing sidecars or an unparsable original abort the run.

use std::collections::BTreeMap;
use std::fs;
use std::ops::Range;
use std::path::Path;

use crate::codec;
use crate::document;
use crate::error::RebuildError;
use crate::model_file;
use crate::refmap::{ElementReferenceMap, Snapshot, ORIGINAL_FILE, REFMAP_FILE, SIDECAR_DIR};
use crate::types::{CompareValue, RawCapture};

/// Counters from one rebuild run
#[derive(Debug, Clone, Default)]
pub struct RebuildStats {
    pub unchanged: usize,
    pub patched_scripts: usize,
    pub patched_models: usize,
    pub skipped: usize,
}

struct Patch {
    range: Range<usize>,
    replacement: String,
}

/// Rebuild a place document from a projection directory
pub fn rebuild_place(project_dir: &Path, output_path: &Path) -> Result<RebuildStats, RebuildError> {
    let sidecar_dir = project_dir.join(SIDECAR_DIR);
    let original_path = sidecar_dir.join(ORIGINAL_FILE);
    if !original_path.exists() {
        return Err(RebuildError::MissingOriginal(original_path));
    }
    let refmap_path = sidecar_dir.join(REFMAP_FILE);
    if !refmap_path.exists() {
        return Err(RebuildError::MissingRefMap(refmap_path));
    }

    let original = fs::read_to_string(&original_path)?;
    let refmap = ElementReferenceMap::load(&refmap_path)?;
    let roots = document::parse_document(&original)?;
    let index = document::referent_index(&roots);

    let mut stats = RebuildStats::default();
    let mut patches: Vec<Patch> = Vec::new();

    for (rel_path, record) in &refmap.entries {
        let file_path = project_dir.join(rel_path);
        let current = match fs::read_to_string(&file_path) {
            Ok(content) => content,
            Err(_) => {
                tracing::warn!("Tracked file missing, skipped: {}", rel_path);
                stats.skipped += 1;
                continue;
            }
        };

        match &record.snapshot {
            Snapshot::Script { original_source } => {
                if current == *original_source {
                    stats.unchanged += 1;
                    continue;
                }
                let Some(node) = index.get(record.referent.as_str()) else {
                    tracing::warn!(
                        "Referent {} not found in original document, skipped: {}",
                        record.referent,
                        rel_path
                    );
                    stats.skipped += 1;
                    continue;
                };
                let (Some(span), Some(source_prop)) =
                    (node.span.source.clone(), node.property("Source"))
                else {
                    tracing::warn!("No Source region for referent {}, skipped: {}", record.referent, rel_path);
                    stats.skipped += 1;
                    continue;
                };
                patches.push(Patch {
                    range: span,
                    replacement: codec::render_source_element(&source_prop.raw, &current),
                });
                stats.patched_scripts += 1;
            }
            Snapshot::Model { original_properties } => {
                let edited = model_file::parse_model_file(&current);
                if !model_changed(original_properties, &edited) {
                    stats.unchanged += 1;
                    continue;
                }
                let Some(node) = index.get(record.referent.as_str()) else {
                    tracing::warn!(
                        "Referent {} not found in original document, skipped: {}",
                        record.referent,
                        rel_path
                    );
                    stats.skipped += 1;
                    continue;
                };
                let Some(span) = node.span.properties.clone() else {
                    tracing::warn!("No properties region for referent {}, skipped: {}", record.referent, rel_path);
                    stats.skipped += 1;
                    continue;
                };
                let indent = line_indent(&original, span.start);
                patches.push(Patch {
                    range: span,
                    replacement: render_properties_block(original_properties, &edited, &indent),
                });
                stats.patched_models += 1;
            }
        }
    }

    patches.sort_by_key(|p| p.range.start);
    let rebuilt = apply_patches(&original, &patches);

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(output_path, &rebuilt)?;

    tracing::info!(
        "Rebuild complete: {} script patches, {} model patches, {} unchanged, {} skipped",
        stats.patched_scripts,
        stats.patched_models,
        stats.unchanged,
        stats.skipped
    );
    Ok(stats)
}

/// A model file counts as changed when a property it still lists differs
/// from the original comparison shape. Deleted lines and additions without
/// an original capture are not changes.
fn model_changed(captures: &[RawCapture], edited: &BTreeMap<String, CompareValue>) -> bool {
    let original: BTreeMap<&str, CompareValue> = captures
        .iter()
        .map(|c| (c.name.as_str(), codec::comparison_value(c)))
        .collect();
    edited
        .iter()
        .any(|(name, value)| original.get(name.as_str()).is_some_and(|o| o != value))
}

/// Regenerate a full `<Properties>` element from edited values merged over
/// the original captures
fn render_properties_block(
    captures: &[RawCapture],
    edits: &BTreeMap<String, CompareValue>,
    indent: &str,
) -> String {
    let child_indent = format!("{}\t", indent);
    let mut out = String::from("<Properties>");
    for raw in captures {
        let value = match edits.get(&raw.name) {
            Some(edit) => codec::apply_edit(codec::decode(raw), edit),
            None => codec::decode(raw),
        };
        out.push('\n');
        out.push_str(&codec::encode(&value, raw, &child_indent));
    }
    out.push('\n');
    out.push_str(indent);
    out.push_str("</Properties>");
    out
}

fn line_indent(text: &str, offset: usize) -> String {
    let line_start = text[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
    text[line_start..offset]
        .chars()
        .take_while(|c| c.is_whitespace())
        .collect()
}

fn apply_patches(original: &str, patches: &[Patch]) -> String {
    let mut out = String::with_capacity(original.len());
    let mut cursor = 0usize;
    for patch in patches {
        if patch.range.start < cursor {
            tracing::warn!("Overlapping patch skipped at offset {}", patch.range.start);
            continue;
        }
        out.push_str(&original[cursor..patch.range.start]);
        out.push_str(&patch.replacement);
        cursor = patch.range.end;
    }
    out.push_str(&original[cursor..]);
    out
}

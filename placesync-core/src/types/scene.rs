//! Transient scene tree built by the document parser
//!
//! The tree is owned by the parse pass and discarded after projection or
//! patch planning. Byte spans recorded per node at parse time are what make
//! rebuild splicing an indexed slice operation instead of a re-scan.

use std::ops::Range;

use crate::types::{PropertyValue, RawCapture};

/// One decoded property: typed value plus its lossless capture
#[derive(Debug, Clone)]
pub struct Property {
    pub raw: RawCapture,
    pub value: PropertyValue,
}

/// Byte offsets into the original document text, captured at parse time
#[derive(Debug, Clone, Default)]
pub struct NodeSpan {
    /// Full `<Item>...</Item>` element
    pub start: usize,
    pub end: usize,
    /// Full `<Properties>...</Properties>` element, when present
    pub properties: Option<Range<usize>>,
    /// Full element of the property named `Source`, when present
    pub source: Option<Range<usize>>,
}

/// One node of the parsed place document
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub class_name: String,
    /// Stable per-document id; the join key between projection and rebuild
    pub referent: String,
    pub properties: Vec<Property>,
    pub children: Vec<SceneNode>,
    pub span: NodeSpan,
}

impl SceneNode {
    /// Look up a property by its `name` attribute
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.raw.name == name)
    }

    /// The node's display name: its `Name` string property, or `"Unnamed"`
    pub fn name(&self) -> &str {
        match self.property("Name") {
            Some(Property {
                value: PropertyValue::String(s),
                ..
            }) if !s.is_empty() => s,
            _ => "Unnamed",
        }
    }

    /// The embedded script payload: the `Source` property's text
    pub fn source_text(&self) -> &str {
        self.property("Source").map(|p| p.raw.text.as_str()).unwrap_or("")
    }
}

//! Property values and raw markup captures
//!
//! Every property carries two representations: a typed value for the types
//! the codec models numerically, and a [`RawCapture`] snapshot of the
//! original markup. The capture is what lets rebuild regenerate sub-fields
//! the typed value does not expose (an orientation matrix beyond R00/R01,
//! attributes on unknown types) without deriving them from edited data.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A 3-component vector property
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// An RGB color property
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color3 {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

/// A 2D scale/offset pair property
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UDim2 {
    pub xs: f64,
    pub xo: f64,
    pub ys: f64,
    pub yo: f64,
}

/// A coordinate frame: position plus the two modeled rotation components
///
/// The remaining rotation components of the original markup are not modeled
/// here; they survive through the paired raw capture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CFrame {
    pub position: Vector3,
    pub r00: f64,
    pub r01: f64,
}

impl Default for CFrame {
    fn default() -> Self {
        Self {
            position: Vector3::default(),
            r00: 1.0,
            r01: 0.0,
        }
    }
}

/// A decoded property value
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    String(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    Vector3(Vector3),
    Color3(Color3),
    UDim2(UDim2),
    CFrame(CFrame),
    /// Catch-all for type tags the codec does not model numerically. The
    /// capture preserves the full original structure; only its direct text
    /// is treated as editable, and only when there are no child elements.
    Opaque(RawCapture),
}

/// Lossless snapshot of a property's original markup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCapture {
    /// Value of the `name` attribute (`"unknown"` when absent)
    pub name: String,
    /// Element tag, which doubles as the property's type tag
    pub type_tag: String,
    /// All attributes in document order, `name` included
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<(String, String)>,
    /// Concatenated direct text content, unescaped
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    /// Flat list of direct child elements
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RawChild>,
}

/// One direct child element of a captured property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawChild {
    pub tag: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<(String, String)>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
}

impl RawCapture {
    /// Find a direct child element by tag
    pub fn child(&self, tag: &str) -> Option<&RawChild> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// The text the model-file layer shows for this capture. When the
    /// property has child elements its direct text is only inter-element
    /// whitespace, so it is trimmed away.
    pub fn display_text(&self) -> &str {
        if self.children.is_empty() {
            &self.text
        } else {
            self.text.trim()
        }
    }
}

/// Normalized shape used to compare edited model files against original
/// captures. All numerics collapse to `f64` so that `X = 1` in a file and
/// `<X>1.0</X>` in markup compare equal.
#[derive(Debug, Clone, PartialEq)]
pub enum CompareValue {
    Str(String),
    Bool(bool),
    Num(f64),
    Table(BTreeMap<String, CompareValue>),
}

impl CompareValue {
    /// Numeric reading of this value; malformed text reads as zero
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CompareValue::Num(n) => Some(*n),
            CompareValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            CompareValue::Str(s) => Some(s.trim().parse().unwrap_or(0.0)),
            CompareValue::Table(_) => None,
        }
    }

    /// String reading of this value, for string-typed properties
    pub fn as_text(&self) -> Option<String> {
        match self {
            CompareValue::Str(s) => Some(s.clone()),
            CompareValue::Bool(b) => Some(b.to_string()),
            CompareValue::Num(n) => Some(crate::codec::format_number(*n)),
            CompareValue::Table(_) => None,
        }
    }
}

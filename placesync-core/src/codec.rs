//! Property codec
//!
//! Typed decode of captured property markup into semantic values, and typed
//! encode back into markup fragments. Decoding never fails hard: malformed
//! numeric text collapses to the type's zero value, and unrecognized type
//! tags fall through to an opaque value backed entirely by the raw capture.
//!
//! Encoding is capture-guided. Composite encoding walks the original
//! capture's children in document order, substituting the components the
//! codec models and re-emitting everything else verbatim. That is the
//! mechanism that lets an edit to a coordinate frame's position leave the
//! unmodeled rotation components untouched.

use std::collections::BTreeMap;

use quick_xml::escape::escape;

use crate::types::{
    CFrame, Color3, CompareValue, PropertyValue, RawCapture, RawChild, UDim2, Vector3,
};

/// Decode a captured property into its typed value
pub fn decode(raw: &RawCapture) -> PropertyValue {
    match raw.type_tag.as_str() {
        "string" => PropertyValue::String(raw.text.clone()),
        "bool" => PropertyValue::Bool(raw.text.trim() == "true"),
        "int" | "int64" => PropertyValue::Int(int_or_zero(&raw.text)),
        "float" => PropertyValue::Float(number_or_zero(&raw.text)),
        "Vector3" => PropertyValue::Vector3(Vector3 {
            x: component(raw, "X", 0.0),
            y: component(raw, "Y", 0.0),
            z: component(raw, "Z", 0.0),
        }),
        "Color3" => PropertyValue::Color3(Color3 {
            r: component(raw, "R", 0.0),
            g: component(raw, "G", 0.0),
            b: component(raw, "B", 0.0),
        }),
        "UDim2" => PropertyValue::UDim2(UDim2 {
            xs: component(raw, "XS", 0.0),
            xo: component(raw, "XO", 0.0),
            ys: component(raw, "YS", 0.0),
            yo: component(raw, "YO", 0.0),
        }),
        "CoordinateFrame" => PropertyValue::CFrame(CFrame {
            position: Vector3 {
                x: component(raw, "X", 0.0),
                y: component(raw, "Y", 0.0),
                z: component(raw, "Z", 0.0),
            },
            r00: component(raw, "R00", 1.0),
            r01: component(raw, "R01", 0.0),
        }),
        _ => PropertyValue::Opaque(raw.clone()),
    }
}

/// Encode a property value back into a markup fragment
///
/// `raw` must be the capture the value was decoded from (or a merge over
/// it); it supplies the attributes and any unmodeled children. The fragment
/// starts with `indent` and carries no trailing newline.
pub fn encode(value: &PropertyValue, raw: &RawCapture, indent: &str) -> String {
    match value {
        PropertyValue::String(s) => leaf_element(raw, indent, s),
        PropertyValue::Bool(b) => leaf_element(raw, indent, &b.to_string()),
        PropertyValue::Int(i) => leaf_element(raw, indent, &i.to_string()),
        PropertyValue::Float(f) => leaf_element(raw, indent, &format_number(*f)),
        PropertyValue::Vector3(v) => {
            composite_element(raw, indent, &[("X", v.x), ("Y", v.y), ("Z", v.z)])
        }
        PropertyValue::Color3(c) => {
            composite_element(raw, indent, &[("R", c.r), ("G", c.g), ("B", c.b)])
        }
        PropertyValue::UDim2(u) => composite_element(
            raw,
            indent,
            &[("XS", u.xs), ("XO", u.xo), ("YS", u.ys), ("YO", u.yo)],
        ),
        PropertyValue::CFrame(c) => composite_element(
            raw,
            indent,
            &[
                ("X", c.position.x),
                ("Y", c.position.y),
                ("Z", c.position.z),
                ("R00", c.r00),
                ("R01", c.r01),
            ],
        ),
        PropertyValue::Opaque(current) => opaque_element(raw, current, indent),
    }
}

/// Render a script `Source` property element with a new payload
///
/// The payload is wrapped in a CDATA section when it contains markup
/// characters or embedded newlines, otherwise inline-escaped.
pub fn render_source_element(raw: &RawCapture, source: &str) -> String {
    format!("{}{}</{}>", open_tag(raw), text_payload(source), raw.type_tag)
}

/// Project a capture into the shape the model-file parser produces, for
/// change detection
pub fn comparison_value(raw: &RawCapture) -> CompareValue {
    match decode(raw) {
        PropertyValue::String(s) => CompareValue::Str(s),
        PropertyValue::Bool(b) => CompareValue::Bool(b),
        PropertyValue::Int(i) => CompareValue::Num(i as f64),
        PropertyValue::Float(f) => CompareValue::Num(f),
        PropertyValue::Vector3(v) => number_table(&[("X", v.x), ("Y", v.y), ("Z", v.z)]),
        PropertyValue::Color3(c) => number_table(&[("R", c.r), ("G", c.g), ("B", c.b)]),
        PropertyValue::UDim2(u) => {
            number_table(&[("XS", u.xs), ("XO", u.xo), ("YS", u.ys), ("YO", u.yo)])
        }
        PropertyValue::CFrame(c) => {
            let mut map = BTreeMap::new();
            map.insert(
                "Position".to_string(),
                number_table(&[("X", c.position.x), ("Y", c.position.y), ("Z", c.position.z)]),
            );
            map.insert("R00".to_string(), CompareValue::Num(c.r00));
            map.insert("R01".to_string(), CompareValue::Num(c.r01));
            CompareValue::Table(map)
        }
        PropertyValue::Opaque(cap) => CompareValue::Str(cap.display_text().to_string()),
    }
}

/// Merge an edited model-file value into a decoded property value
///
/// The declared type of the original property wins: a string edit to an int
/// property parses as an int, with malformed text collapsing to zero.
/// Components missing from an edited composite fall back to the original.
pub fn apply_edit(base: PropertyValue, edit: &CompareValue) -> PropertyValue {
    match base {
        PropertyValue::String(s) => PropertyValue::String(edit.as_text().unwrap_or(s)),
        PropertyValue::Bool(b) => PropertyValue::Bool(match edit {
            CompareValue::Bool(v) => *v,
            CompareValue::Str(s) => s.trim() == "true",
            CompareValue::Num(n) => *n != 0.0,
            CompareValue::Table(_) => b,
        }),
        PropertyValue::Int(i) => PropertyValue::Int(match edit {
            CompareValue::Num(n) => *n as i64,
            CompareValue::Str(s) => int_or_zero(s),
            CompareValue::Bool(v) => *v as i64,
            CompareValue::Table(_) => i,
        }),
        PropertyValue::Float(f) => PropertyValue::Float(edit.as_number().unwrap_or(f)),
        PropertyValue::Vector3(v) => PropertyValue::Vector3(edit_vector3(v, edit)),
        PropertyValue::Color3(c) => PropertyValue::Color3(Color3 {
            r: table_field(edit, "R", c.r),
            g: table_field(edit, "G", c.g),
            b: table_field(edit, "B", c.b),
        }),
        PropertyValue::UDim2(u) => PropertyValue::UDim2(UDim2 {
            xs: table_field(edit, "XS", u.xs),
            xo: table_field(edit, "XO", u.xo),
            ys: table_field(edit, "YS", u.ys),
            yo: table_field(edit, "YO", u.yo),
        }),
        PropertyValue::CFrame(c) => {
            let position = match edit {
                CompareValue::Table(map) => match map.get("Position") {
                    Some(inner) => edit_vector3(c.position, inner),
                    None => c.position,
                },
                _ => c.position,
            };
            PropertyValue::CFrame(CFrame {
                position,
                r00: table_field(edit, "R00", c.r00),
                r01: table_field(edit, "R01", c.r01),
            })
        }
        PropertyValue::Opaque(mut cap) => {
            // Only text-bearing opaque values are editable; structured ones
            // re-emit from the capture untouched.
            if cap.children.is_empty() {
                if let Some(text) = edit.as_text() {
                    cap.text = text;
                }
            }
            PropertyValue::Opaque(cap)
        }
    }
}

/// Shortest display form of a numeric component
pub fn format_number(n: f64) -> String {
    n.to_string()
}

fn component(raw: &RawCapture, tag: &str, default: f64) -> f64 {
    raw.child(tag).map(|c| number_or_zero(&c.text)).unwrap_or(default)
}

fn number_or_zero(text: &str) -> f64 {
    text.trim().parse().unwrap_or(0.0)
}

fn int_or_zero(text: &str) -> i64 {
    let trimmed = text.trim();
    trimmed
        .parse::<i64>()
        .unwrap_or_else(|_| trimmed.parse::<f64>().map(|f| f as i64).unwrap_or(0))
}

fn number_table(pairs: &[(&str, f64)]) -> CompareValue {
    CompareValue::Table(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), CompareValue::Num(*v)))
            .collect(),
    )
}

fn table_field(edit: &CompareValue, key: &str, fallback: f64) -> f64 {
    match edit {
        CompareValue::Table(map) => map
            .get(key)
            .and_then(|v| v.as_number())
            .unwrap_or(fallback),
        _ => fallback,
    }
}

fn edit_vector3(base: Vector3, edit: &CompareValue) -> Vector3 {
    Vector3 {
        x: table_field(edit, "X", base.x),
        y: table_field(edit, "Y", base.y),
        z: table_field(edit, "Z", base.z),
    }
}

fn open_tag(raw: &RawCapture) -> String {
    let mut tag = format!("<{}", raw.type_tag);
    for (key, value) in &raw.attributes {
        tag.push_str(&format!(" {}=\"{}\"", key, escape(value)));
    }
    tag.push('>');
    tag
}

fn leaf_element(raw: &RawCapture, indent: &str, text: &str) -> String {
    format!(
        "{}{}{}</{}>",
        indent,
        open_tag(raw),
        text_payload(text),
        raw.type_tag
    )
}

fn composite_element(raw: &RawCapture, indent: &str, modeled: &[(&str, f64)]) -> String {
    let child_indent = format!("{}\t", indent);
    let mut out = format!("{}{}", indent, open_tag(raw));
    let mut emitted: Vec<&str> = Vec::new();

    for child in &raw.children {
        out.push('\n');
        match modeled.iter().find(|(tag, _)| *tag == child.tag) {
            Some((tag, value)) => {
                emitted.push(tag);
                out.push_str(&format!(
                    "{}<{}>{}</{}>",
                    child_indent,
                    tag,
                    format_number(*value),
                    tag
                ));
            }
            // Unmodeled component, re-emitted from the capture
            None => out.push_str(&format!("{}{}", child_indent, child_element(child))),
        }
    }

    for (tag, value) in modeled {
        if !emitted.contains(tag) {
            out.push('\n');
            out.push_str(&format!(
                "{}<{}>{}</{}>",
                child_indent,
                tag,
                format_number(*value),
                tag
            ));
        }
    }

    out.push('\n');
    out.push_str(&format!("{}</{}>", indent, raw.type_tag));
    out
}

fn opaque_element(raw: &RawCapture, current: &RawCapture, indent: &str) -> String {
    if raw.children.is_empty() {
        return leaf_element(raw, indent, &current.text);
    }

    let child_indent = format!("{}\t", indent);
    let mut out = format!("{}{}", indent, open_tag(raw));
    for child in &raw.children {
        out.push('\n');
        out.push_str(&format!("{}{}", child_indent, child_element(child)));
    }
    out.push('\n');
    out.push_str(&format!("{}</{}>", indent, raw.type_tag));
    out
}

fn child_element(child: &RawChild) -> String {
    let mut tag = format!("<{}", child.tag);
    for (key, value) in &child.attributes {
        tag.push_str(&format!(" {}=\"{}\"", key, escape(value)));
    }
    tag.push('>');
    format!("{}{}</{}>", tag, text_payload(&child.text), child.tag)
}

fn text_payload(text: &str) -> String {
    if text.contains(['<', '>', '&', '\n', '\r']) {
        wrap_cdata(text)
    } else {
        escape(text).into_owned()
    }
}

// A payload containing the CDATA terminator is split across sections.
fn wrap_cdata(text: &str) -> String {
    format!("<![CDATA[{}]]>", text.replace("]]>", "]]]]><![CDATA[>"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(name: &str, type_tag: &str, text: &str) -> RawCapture {
        RawCapture {
            name: name.to_string(),
            type_tag: type_tag.to_string(),
            attributes: vec![("name".to_string(), name.to_string())],
            text: text.to_string(),
            children: Vec::new(),
        }
    }

    fn child(tag: &str, text: &str) -> RawChild {
        RawChild {
            tag: tag.to_string(),
            attributes: Vec::new(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_decode_scalars() {
        assert_eq!(
            decode(&scalar("Name", "string", "Part")),
            PropertyValue::String("Part".to_string())
        );
        assert_eq!(decode(&scalar("Anchored", "bool", "true")), PropertyValue::Bool(true));
        assert_eq!(decode(&scalar("Brick", "int", "194")), PropertyValue::Int(194));
        assert_eq!(
            decode(&scalar("Transparency", "float", "0.5")),
            PropertyValue::Float(0.5)
        );
    }

    #[test]
    fn test_malformed_numbers_decode_to_zero() {
        assert_eq!(decode(&scalar("A", "int", "not a number")), PropertyValue::Int(0));
        assert_eq!(decode(&scalar("B", "float", "")), PropertyValue::Float(0.0));
    }

    #[test]
    fn test_decode_coordinate_frame_defaults() {
        let mut raw = scalar("CFrame", "CoordinateFrame", "");
        raw.children = vec![child("X", "1"), child("Y", "2"), child("Z", "3")];

        match decode(&raw) {
            PropertyValue::CFrame(c) => {
                assert_eq!(c.position, Vector3 { x: 1.0, y: 2.0, z: 3.0 });
                assert_eq!(c.r00, 1.0);
                assert_eq!(c.r01, 0.0);
            }
            other => panic!("expected CFrame, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_type_decodes_to_opaque() {
        let raw = scalar("Shape", "token", "4");
        match decode(&raw) {
            PropertyValue::Opaque(cap) => assert_eq!(cap.text, "4"),
            other => panic!("expected Opaque, got {:?}", other),
        }
    }

    #[test]
    fn test_encode_preserves_unmodeled_components() {
        let mut raw = scalar("CFrame", "CoordinateFrame", "");
        raw.children = vec![
            child("X", "0"),
            child("Y", "5"),
            child("Z", "0"),
            child("R00", "1"),
            child("R01", "0"),
            child("R02", "0"),
            child("R10", "0"),
            child("R11", "0.70710678"),
            child("R12", "-0.70710678"),
        ];

        let mut value = decode(&raw);
        if let PropertyValue::CFrame(c) = &mut value {
            c.position.x = 9.5;
        }

        let fragment = encode(&value, &raw, "\t");
        assert!(fragment.contains("<X>9.5</X>"));
        assert!(fragment.contains("<R11>0.70710678</R11>"));
        assert!(fragment.contains("<R12>-0.70710678</R12>"));
    }

    #[test]
    fn test_apply_edit_malformed_int_defaults_to_zero() {
        let base = PropertyValue::Int(5);
        let edited = apply_edit(base, &CompareValue::Str("abc".to_string()));
        assert_eq!(edited, PropertyValue::Int(0));
    }

    #[test]
    fn test_apply_edit_partial_vector() {
        let base = PropertyValue::Vector3(Vector3 { x: 1.0, y: 2.0, z: 3.0 });
        let mut table = BTreeMap::new();
        table.insert("Y".to_string(), CompareValue::Num(7.0));
        let edited = apply_edit(base, &CompareValue::Table(table));
        assert_eq!(
            edited,
            PropertyValue::Vector3(Vector3 { x: 1.0, y: 7.0, z: 3.0 })
        );
    }

    #[test]
    fn test_source_payload_escaping() {
        let raw = scalar("Source", "ProtectedString", "old");

        let plain = render_source_element(&raw, "print(1)");
        assert_eq!(
            plain,
            "<ProtectedString name=\"Source\">print(1)</ProtectedString>"
        );

        let markup = render_source_element(&raw, "if a < b then\nend");
        assert!(markup.contains("<![CDATA[if a < b then\nend]]>"));
    }

    #[test]
    fn test_cdata_terminator_is_split() {
        let wrapped = wrap_cdata("a]]>b");
        assert_eq!(wrapped, "<![CDATA[a]]]]><![CDATA[>b]]>");
    }

    #[test]
    fn test_comparison_value_normalizes_numbers() {
        assert_eq!(
            comparison_value(&scalar("A", "int", "3")),
            CompareValue::Num(3.0)
        );
        assert_eq!(
            comparison_value(&scalar("B", "float", "3")),
            CompareValue::Num(3.0)
        );
    }
}

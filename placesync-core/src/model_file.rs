//! Model file format
//!
//! Textual representation of a non-script node's decoded properties for
//! human editing. Scalars are `name = <literal>` lines; composites are
//! bracketed blocks. The header repeats the class tag and name and carries
//! a literal dump of the raw property captures on a `--!` comment line so a
//! model file stays reconstructable on its own.
//!
//! The parser is deliberately tolerant of free-form edits. The right-hand
//! side follows a narrow literal grammar (integer, float, boolean, quoted
//! string, nested block); anything that fails the grammar is kept as its
//! trimmed-quote string form rather than rejected.

use std::collections::BTreeMap;

use crate::codec::format_number;
use crate::types::{CompareValue, Property, PropertyValue, RawCapture};

/// Serialize a node's properties into the editable model-file text
pub fn serialize_model(class_name: &str, name: &str, properties: &[Property]) -> String {
    let mut out = String::new();
    out.push_str(&format!("-- {} Properties\n", class_name));
    out.push_str(&format!("-- Name: {}\n", name));

    let captures: Vec<&RawCapture> = properties.iter().map(|p| &p.raw).collect();
    if let Ok(dump) = serde_json::to_string(&captures) {
        out.push_str(&format!("--! raw: {}\n", dump));
    }
    out.push('\n');

    for prop in properties {
        out.push_str(&serialize_property(&prop.raw.name, &prop.value));
    }
    out
}

/// Parse (possibly edited) model-file text into comparable values
///
/// Comment lines, blank lines, and anything that is neither an assignment
/// nor a block terminator are ignored.
pub fn parse_model_file(text: &str) -> BTreeMap<String, CompareValue> {
    let mut lines = text.lines();
    parse_block(&mut lines, true)
}

fn parse_block<'a, I>(lines: &mut I, top: bool) -> BTreeMap<String, CompareValue>
where
    I: Iterator<Item = &'a str>,
{
    let mut map = BTreeMap::new();

    while let Some(line) = lines.next() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("--") {
            continue;
        }
        if trimmed == "}" || trimmed == "}," {
            if !top {
                return map;
            }
            // Stray terminator with no open block
            continue;
        }
        let Some((key, rhs)) = trimmed.split_once('=') else {
            continue;
        };
        let key = key.trim().to_string();
        let rhs = rhs.trim();
        if rhs == "{" {
            map.insert(key, CompareValue::Table(parse_block(lines, false)));
        } else {
            let rhs = rhs.strip_suffix(',').unwrap_or(rhs).trim_end();
            map.insert(key, parse_literal(rhs));
        }
    }
    map
}

/// Evaluate a right-hand-side literal
pub fn parse_literal(text: &str) -> CompareValue {
    let t = text.trim();
    if t == "true" {
        return CompareValue::Bool(true);
    }
    if t == "false" {
        return CompareValue::Bool(false);
    }
    if t.len() >= 2 {
        let bytes = t.as_bytes();
        let quote = bytes[0];
        if (quote == b'"' || quote == b'\'') && bytes[bytes.len() - 1] == quote {
            return CompareValue::Str(unescape_quoted(&t[1..t.len() - 1]));
        }
    }
    if let Ok(i) = t.parse::<i64>() {
        return CompareValue::Num(i as f64);
    }
    if let Ok(f) = t.parse::<f64>() {
        return CompareValue::Num(f);
    }
    // Not a literal; keep the trimmed-quote string form
    CompareValue::Str(t.trim_matches(|c| c == '"' || c == '\'').to_string())
}

fn serialize_property(name: &str, value: &PropertyValue) -> String {
    match value {
        PropertyValue::String(s) => format!("{} = {}\n", name, quote(s)),
        PropertyValue::Bool(b) => format!("{} = {}\n", name, b),
        PropertyValue::Int(i) => format!("{} = {}\n", name, i),
        PropertyValue::Float(f) => format!("{} = {}\n", name, format_number(*f)),
        PropertyValue::Vector3(v) => {
            block(name, &[("X", v.x), ("Y", v.y), ("Z", v.z)])
        }
        PropertyValue::Color3(c) => block(name, &[("R", c.r), ("G", c.g), ("B", c.b)]),
        PropertyValue::UDim2(u) => block(
            name,
            &[("XS", u.xs), ("XO", u.xo), ("YS", u.ys), ("YO", u.yo)],
        ),
        PropertyValue::CFrame(c) => {
            let mut out = format!("{} = {{\n", name);
            out.push_str("    Position = {\n");
            for (k, v) in [("X", c.position.x), ("Y", c.position.y), ("Z", c.position.z)] {
                out.push_str(&format!("        {} = {},\n", k, format_number(v)));
            }
            out.push_str("    },\n");
            out.push_str(&format!("    R00 = {},\n", format_number(c.r00)));
            out.push_str(&format!("    R01 = {},\n", format_number(c.r01)));
            out.push_str("}\n\n");
            out
        }
        PropertyValue::Opaque(cap) => format!("{} = {}\n", name, quote(cap.display_text())),
    }
}

fn block(name: &str, fields: &[(&str, f64)]) -> String {
    let mut out = format!("{} = {{\n", name);
    for (k, v) in fields {
        out.push_str(&format!("    {} = {},\n", k, format_number(*v)));
    }
    out.push_str("}\n\n");
    out
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn unescape_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

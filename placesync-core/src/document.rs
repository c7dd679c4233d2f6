//! Place document parser
//!
//! Parses `.rbxlx` markup into the transient scene tree, decoding each
//! property through the codec and keeping its raw capture alongside. Byte
//! spans for every `Item`, its `Properties` element, and its `Source`
//! property are recorded while the tokenizer walks the text, so the rebuild
//! engine can splice regions by index instead of re-scanning for balanced
//! tags.
//!
//! Nodes missing a `referent` attribute get a synthesized sequential id.
//! Projection and rebuild both parse the same sidecar bytes, so synthesized
//! ids line up between the two passes.

use std::collections::HashMap;
use std::ops::Range;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::codec;
use crate::error::DocumentError;
use crate::types::{NodeSpan, Property, RawCapture, RawChild, SceneNode};

/// Parse a place document into its root nodes
pub fn parse_document(text: &str) -> Result<Vec<SceneNode>, DocumentError> {
    let mut reader = Reader::from_str(text);
    let mut roots: Vec<SceneNode> = Vec::new();
    let mut stack: Vec<PendingItem> = Vec::new();
    let mut auto_referent = 0usize;

    loop {
        let event_start = reader.buffer_position() as usize;
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"Item" => stack.push(pending_item(&e, event_start, &mut auto_referent)?),
                b"Properties" if !stack.is_empty() => {
                    let parsed = parse_properties(&mut reader)?;
                    let span = event_start..reader.buffer_position() as usize;
                    let item = stack.last_mut().ok_or(DocumentError::Unbalanced)?;
                    // Only the first Properties element of an Item counts
                    if item.properties_span.is_none() {
                        item.properties = parsed.properties;
                        item.source_span = parsed.source_span;
                        item.properties_span = Some(span);
                    }
                }
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"Item" => {
                    let item = pending_item(&e, event_start, &mut auto_referent)?;
                    let node = finish_item(item, reader.buffer_position() as usize);
                    attach(&mut stack, &mut roots, node);
                }
                b"Properties" => {
                    if let Some(item) = stack.last_mut() {
                        if item.properties_span.is_none() {
                            item.properties_span = Some(event_start..reader.buffer_position() as usize);
                        }
                    }
                }
                _ => {}
            },
            Event::End(e) => {
                if e.name().as_ref() == b"Item" {
                    let item = stack.pop().ok_or(DocumentError::Unbalanced)?;
                    let node = finish_item(item, reader.buffer_position() as usize);
                    attach(&mut stack, &mut roots, node);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(DocumentError::UnexpectedEof);
    }
    Ok(roots)
}

/// Build a referent → node lookup over a parsed tree
pub fn referent_index(roots: &[SceneNode]) -> HashMap<&str, &SceneNode> {
    fn visit<'a>(node: &'a SceneNode, map: &mut HashMap<&'a str, &'a SceneNode>) {
        map.insert(node.referent.as_str(), node);
        for child in &node.children {
            visit(child, map);
        }
    }

    let mut map = HashMap::new();
    for root in roots {
        visit(root, &mut map);
    }
    map
}

struct PendingItem {
    class_name: String,
    referent: String,
    start: usize,
    properties: Vec<Property>,
    children: Vec<SceneNode>,
    properties_span: Option<Range<usize>>,
    source_span: Option<Range<usize>>,
}

struct ParsedProperties {
    properties: Vec<Property>,
    source_span: Option<Range<usize>>,
}

fn pending_item(
    e: &BytesStart,
    start: usize,
    auto_referent: &mut usize,
) -> Result<PendingItem, DocumentError> {
    let (_, attributes) = tag_and_attributes(e)?;
    let class_name =
        attr_value(&attributes, "class").unwrap_or_else(|| "Unknown".to_string());
    let referent = match attr_value(&attributes, "referent") {
        Some(r) => r,
        None => {
            *auto_referent += 1;
            format!("AUTO{}", auto_referent)
        }
    };

    Ok(PendingItem {
        class_name,
        referent,
        start,
        properties: Vec::new(),
        children: Vec::new(),
        properties_span: None,
        source_span: None,
    })
}

fn finish_item(item: PendingItem, end: usize) -> SceneNode {
    SceneNode {
        class_name: item.class_name,
        referent: item.referent,
        properties: item.properties,
        children: item.children,
        span: NodeSpan {
            start: item.start,
            end,
            properties: item.properties_span,
            source: item.source_span,
        },
    }
}

fn attach(stack: &mut [PendingItem], roots: &mut Vec<SceneNode>, node: SceneNode) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => roots.push(node),
    }
}

fn parse_properties(reader: &mut Reader<&[u8]>) -> Result<ParsedProperties, DocumentError> {
    let mut properties = Vec::new();
    let mut source_span = None;

    loop {
        let elem_start = reader.buffer_position() as usize;
        match reader.read_event()? {
            Event::Start(e) => {
                let (type_tag, attributes) = tag_and_attributes(&e)?;
                let (text, children) = read_property_body(reader)?;
                let raw = build_capture(type_tag, attributes, text, children);
                if raw.name == "Source" {
                    source_span = Some(elem_start..reader.buffer_position() as usize);
                }
                let value = codec::decode(&raw);
                properties.push(Property { raw, value });
            }
            Event::Empty(e) => {
                let (type_tag, attributes) = tag_and_attributes(&e)?;
                let raw = build_capture(type_tag, attributes, String::new(), Vec::new());
                if raw.name == "Source" {
                    source_span = Some(elem_start..reader.buffer_position() as usize);
                }
                let value = codec::decode(&raw);
                properties.push(Property { raw, value });
            }
            // The closing </Properties> tag
            Event::End(_) => return Ok(ParsedProperties { properties, source_span }),
            Event::Eof => return Err(DocumentError::UnexpectedEof),
            _ => {}
        }
    }
}

fn read_property_body(
    reader: &mut Reader<&[u8]>,
) -> Result<(String, Vec<RawChild>), DocumentError> {
    let mut text = String::new();
    let mut children = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Text(t) => text.push_str(&t.unescape()?),
            Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c.into_inner())),
            Event::Start(e) => {
                let (tag, attributes) = tag_and_attributes(&e)?;
                let child_text = read_flat_text(reader)?;
                children.push(RawChild {
                    tag,
                    attributes,
                    text: child_text,
                });
            }
            Event::Empty(e) => {
                let (tag, attributes) = tag_and_attributes(&e)?;
                children.push(RawChild {
                    tag,
                    attributes,
                    text: String::new(),
                });
            }
            Event::End(_) => return Ok((text, children)),
            Event::Eof => return Err(DocumentError::UnexpectedEof),
            _ => {}
        }
    }
}

fn read_flat_text(reader: &mut Reader<&[u8]>) -> Result<String, DocumentError> {
    let mut depth = 0usize;
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                if depth == 0 {
                    return Ok(text);
                }
                depth -= 1;
            }
            Event::Text(t) => text.push_str(&t.unescape()?),
            Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c.into_inner())),
            Event::Eof => return Err(DocumentError::UnexpectedEof),
            _ => {}
        }
    }
}

fn tag_and_attributes(
    e: &BytesStart,
) -> Result<(String, Vec<(String, String)>), DocumentError> {
    let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attributes.push((key, value));
    }
    Ok((tag, attributes))
}

fn attr_value(attributes: &[(String, String)], key: &str) -> Option<String> {
    attributes
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.clone())
}

fn build_capture(
    type_tag: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<RawChild>,
) -> RawCapture {
    let name = attr_value(&attributes, "name").unwrap_or_else(|| "unknown".to_string());
    RawCapture {
        name,
        type_tag,
        attributes,
        text,
        children,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PropertyValue;

    const SAMPLE: &str = r#"<roblox version="4">
	<Item class="Workspace" referent="RBX0">
		<Properties>
			<string name="Name">Workspace</string>
			<bool name="StreamingEnabled">false</bool>
		</Properties>
		<Item class="Part" referent="RBX1">
			<Properties>
				<string name="Name">Base</string>
				<Vector3 name="size">
					<X>512</X>
					<Y>20</Y>
					<Z>512</Z>
				</Vector3>
			</Properties>
		</Item>
		<Item class="Script" referent="RBX2">
			<Properties>
				<string name="Name">Main</string>
				<ProtectedString name="Source"><![CDATA[print("hello")
if 1 < 2 then end]]></ProtectedString>
			</Properties>
		</Item>
	</Item>
</roblox>"#;

    #[test]
    fn test_parse_tree_shape() {
        let roots = parse_document(SAMPLE).unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].class_name, "Workspace");
        assert_eq!(roots[0].name(), "Workspace");
        assert_eq!(roots[0].children.len(), 2);
        assert_eq!(roots[0].children[0].name(), "Base");
        assert_eq!(roots[0].children[1].class_name, "Script");
    }

    #[test]
    fn test_item_spans_cover_elements() {
        let roots = parse_document(SAMPLE).unwrap();
        let part = &roots[0].children[0];
        let slice = &SAMPLE[part.span.start..part.span.end];
        assert!(slice.starts_with("<Item class=\"Part\""));
        assert!(slice.ends_with("</Item>"));

        let props = part.span.properties.clone().unwrap();
        let slice = &SAMPLE[props];
        assert!(slice.starts_with("<Properties>"));
        assert!(slice.ends_with("</Properties>"));
    }

    #[test]
    fn test_source_span_and_cdata_text() {
        let roots = parse_document(SAMPLE).unwrap();
        let script = &roots[0].children[1];
        assert_eq!(script.source_text(), "print(\"hello\")\nif 1 < 2 then end");

        let span = script.span.source.clone().unwrap();
        let slice = &SAMPLE[span];
        assert!(slice.starts_with("<ProtectedString name=\"Source\">"));
        assert!(slice.ends_with("</ProtectedString>"));
    }

    #[test]
    fn test_composite_decode_through_parse() {
        let roots = parse_document(SAMPLE).unwrap();
        let part = &roots[0].children[0];
        match &part.property("size").unwrap().value {
            PropertyValue::Vector3(v) => {
                assert_eq!((v.x, v.y, v.z), (512.0, 20.0, 512.0));
            }
            other => panic!("expected Vector3, got {:?}", other),
        }
    }

    #[test]
    fn test_referent_index() {
        let roots = parse_document(SAMPLE).unwrap();
        let index = referent_index(&roots);
        assert_eq!(index.len(), 3);
        assert_eq!(index.get("RBX1").unwrap().name(), "Base");
    }

    #[test]
    fn test_missing_referent_is_synthesized() {
        let doc = r#"<roblox><Item class="Folder"><Properties/></Item></roblox>"#;
        let roots = parse_document(doc).unwrap();
        assert_eq!(roots[0].referent, "AUTO1");
    }

    #[test]
    fn test_malformed_document_is_fatal() {
        assert!(parse_document("<roblox><Item class=\"a\"></roblox>").is_err());
    }
}

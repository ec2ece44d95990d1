//! HTML parsing (via `tl`) into a [`Document`] and serialization back out.

use super::{Document, DomError, NodeId, NodeKind, Result};
use crate::utils::html::{escape_attr, escape_text, is_raw_text_element, is_void_element, unescape};

// =============================================================================
// Parsing
// =============================================================================

/// Parse a full HTML document.
///
/// The returned document is marked complete; hosts that want to model
/// incremental parsing reset the ready state themselves.
pub fn parse_document(input: &str) -> Result<Document> {
    let mut doc = Document::new();
    let root = doc.root();

    if let Some(doctype) = leading_doctype(input) {
        let node = doc.create_doctype(doctype);
        doc.append_child(root, node)?;
    }

    let nodes = parse_fragment(&mut doc, input)?;
    doc.append_children(root, &nodes)?;
    Ok(doc)
}

/// Parse an HTML fragment into detached nodes owned by `doc`.
///
/// The caller decides where (and whether) to insert them.
pub fn parse_fragment(doc: &mut Document, input: &str) -> Result<Vec<NodeId>> {
    let dom = tl::parse(input, tl::ParserOptions::default())
        .map_err(|e| DomError::Parse(format!("{e:?}")))?;
    let parser = dom.parser();

    let mut nodes = Vec::new();
    for handle in dom.children() {
        if let Some(id) = convert_node(doc, *handle, parser, false)? {
            nodes.push(id);
        }
    }
    Ok(nodes)
}

fn convert_node(
    doc: &mut Document,
    handle: tl::NodeHandle,
    parser: &tl::Parser,
    raw_text: bool,
) -> Result<Option<NodeId>> {
    let Some(node) = handle.get(parser) else {
        return Ok(None);
    };

    match node {
        tl::Node::Tag(tag) => {
            let name = tag.name().as_utf8_str();
            // <!DOCTYPE> is picked up by `leading_doctype`
            if name.starts_with('!') {
                return Ok(None);
            }

            let id = doc.create_element(&name);
            for (key, value) in tag.attributes().iter() {
                let value = value.as_deref().unwrap_or_default();
                doc.set_attr(id, &key, &unescape(value))?;
            }

            let raw_children = is_raw_text_element(&name.to_ascii_lowercase());
            for child in tag.children().top().iter() {
                if let Some(child_id) = convert_node(doc, *child, parser, raw_children)? {
                    doc.append_child(id, child_id)?;
                }
            }
            Ok(Some(id))
        }
        tl::Node::Raw(bytes) => {
            let text = bytes.as_utf8_str();
            let text = if raw_text {
                text.into_owned()
            } else {
                unescape(&text).into_owned()
            };
            Ok(Some(doc.create_text(text)))
        }
        tl::Node::Comment(bytes) => {
            let text = bytes.as_utf8_str();
            let inner = text
                .strip_prefix("<!--")
                .and_then(|t| t.strip_suffix("-->"))
                .unwrap_or(&text);
            Ok(Some(doc.create_comment(inner)))
        }
    }
}

/// Extract `DOCTYPE html` from a leading `<!DOCTYPE html>`.
fn leading_doctype(input: &str) -> Option<&str> {
    let trimmed = input.trim_start();
    let head = trimmed.get(..9)?;
    if !head.eq_ignore_ascii_case("<!doctype") {
        return None;
    }
    let end = trimmed.find('>')?;
    Some(&trimmed[2..end])
}

// =============================================================================
// Serialization
// =============================================================================

/// Serialize the whole document.
pub fn to_html(doc: &Document) -> String {
    to_html_with(doc, doc.root(), |_| None)
}

/// Serialize the subtree at `node`.
///
/// `shadow` may return markup to emit as the first content of an element,
/// used to inline declarative shadow roots.
pub fn to_html_with(
    doc: &Document,
    node: NodeId,
    shadow: impl Fn(NodeId) -> Option<String>,
) -> String {
    let mut out = String::new();
    write_node(doc, node, &mut out, &shadow, false);
    out
}

fn write_node(
    doc: &Document,
    id: NodeId,
    out: &mut String,
    shadow: &dyn Fn(NodeId) -> Option<String>,
    raw_text: bool,
) {
    let Some(node) = doc.node(id) else {
        return;
    };

    match node.kind() {
        NodeKind::Document => {
            for &child in node.children() {
                write_node(doc, child, out, shadow, false);
            }
        }
        NodeKind::Doctype(text) => {
            out.push_str("<!");
            out.push_str(text);
            out.push('>');
        }
        NodeKind::Text(text) if raw_text => out.push_str(text),
        NodeKind::Text(text) => out.push_str(&escape_text(text)),
        NodeKind::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        NodeKind::Element(elem) => {
            out.push('<');
            out.push_str(elem.tag());
            for (name, value) in elem.attrs() {
                out.push(' ');
                out.push_str(name);
                if !value.is_empty() {
                    out.push_str("=\"");
                    out.push_str(&escape_attr(value));
                    out.push('"');
                }
            }
            out.push('>');

            if is_void_element(elem.tag()) {
                return;
            }
            if let Some(markup) = shadow(id) {
                out.push_str(&markup);
            }
            let raw = is_raw_text_element(elem.tag());
            for &child in node.children() {
                write_node(doc, child, out, shadow, raw);
            }
            out.push_str("</");
            out.push_str(elem.tag());
            out.push('>');
        }
    }
}

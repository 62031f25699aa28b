//! Flattens an exported chat transcript into the ordered list of message blocks.
//!
//! A message block is any `<pre class="message">` element. Nested blocks are kept, in document
//! order, so the block index matches a manual count of `<pre class="message">` tags in the file.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use std::fs;
use std::path::Path;

use crate::error::{ExtractError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageNode {
    pub index: usize,
    pub raw_text: String,
    pub author_label: Option<String>,
    /// Text of every descendant `div`, in document order. The body is usually the second one.
    pub content_fields: Vec<String>,
}

fn html5_parse(input: &str) -> RcDom {
    parse_document(RcDom::default(), Default::default()).one(input)
}

fn tag_lower(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.to_string().to_ascii_lowercase()),
        _ => None,
    }
}

fn attr_get(node: &Handle, name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| a.name.local.to_string().eq_ignore_ascii_case(name))
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

fn has_class(node: &Handle, class: &str) -> bool {
    attr_get(node, "class")
        .map(|v| v.split_whitespace().any(|c| c == class))
        .unwrap_or(false)
}

fn is_message_block(node: &Handle) -> bool {
    tag_lower(node).as_deref() == Some("pre") && has_class(node, "message")
}

fn text_content(node: &Handle) -> String {
    fn walk(node: &Handle, out: &mut String) {
        if let NodeData::Text { contents } = &node.data {
            out.push_str(&contents.borrow());
        }
        for c in node.children.borrow().iter() {
            walk(c, out);
        }
    }
    let mut out = String::new();
    walk(node, &mut out);
    out
}

fn descendant_divs(node: &Handle) -> Vec<Handle> {
    fn walk(node: &Handle, out: &mut Vec<Handle>) {
        for c in node.children.borrow().iter() {
            if tag_lower(c).as_deref() == Some("div") {
                out.push(c.clone());
            }
            walk(c, out);
        }
    }
    let mut out = Vec::new();
    walk(node, &mut out);
    out
}

fn collect_blocks(node: &Handle, out: &mut Vec<Handle>) {
    if is_message_block(node) {
        out.push(node.clone());
    }
    for c in node.children.borrow().iter() {
        collect_blocks(c, out);
    }
}

fn message_node(index: usize, block: &Handle) -> MessageNode {
    let divs = descendant_divs(block);
    let author_label = divs
        .iter()
        .find(|d| has_class(d, "author"))
        .map(text_content);
    MessageNode {
        index,
        raw_text: text_content(block),
        author_label,
        content_fields: divs.iter().map(text_content).collect(),
    }
}

pub fn parse_messages(html: &str) -> Vec<MessageNode> {
    let dom = html5_parse(html);
    let mut blocks: Vec<Handle> = Vec::new();
    collect_blocks(&dom.document, &mut blocks);
    blocks
        .iter()
        .enumerate()
        .map(|(i, b)| message_node(i, b))
        .collect()
}

pub fn read_html(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(ExtractError::InputNotFound(path.to_path_buf()));
    }
    let bytes = fs::read(path).map_err(|source| ExtractError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    String::from_utf8(bytes).map_err(|source| ExtractError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_messages(path: &Path) -> Result<Vec<MessageNode>> {
    let html = read_html(path)?;
    let messages = parse_messages(&html);
    tracing::info!(blocks = messages.len(), path = %path.display(), "parsed transcript");
    Ok(messages)
}

//! Lenient HTML reader
//!
//! Builds a [`Document`](crate::dom::Document) from markup that has already
//! been fetched, decoded and cleansed (no `<script>`/`<style>` payloads, no
//! unquoted attributes). The reader is tag-soup tolerant where real pages
//! need it to be: void elements self-close, common implied end tags are
//! honoured, stray end tags are ignored, and fragments get wrapped in a
//! synthetic `html`/`body` shell.

use crate::dom::{Document, NodeId};
use xmlparser::{ElementEnd, Token, Tokenizer};

/// Error that can happen while reading an HTML string.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HtmlParseError {
    /// A hard error in the markup syntax
    #[error("error tokenizing input: {0}")]
    Tokenize(#[from] xmlparser::Error),
    /// No element found at the top level - empty file?
    #[error("no root element found")]
    NoRootNode,
}

/// Elements that never have content and therefore never take an end tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// Whether an opening `tag` implies the end of the currently `open` element,
/// i.e. `<li>one<li>two` are siblings, not nested.
fn implies_end_tag(tag: &str, open: &str) -> bool {
    match tag {
        "li" => open == "li",
        "p" => open == "p",
        "dt" | "dd" => open == "dt" || open == "dd",
        "tr" => open == "tr" || open == "td" || open == "th",
        "td" | "th" => open == "td" || open == "th",
        "option" => open == "option",
        _ => false,
    }
}

/// Parses an HTML string into a document.
///
/// Mirrors the behaviour of lxml's `document_fromstring`: if the markup is a
/// fragment (no `<html>` root), the parsed nodes are wrapped in a synthetic
/// `html` > `body` shell so that every element has a full ancestor chain.
pub fn parse_document(input: &str) -> Result<Document, HtmlParseError> {
    let input = strip_doctype(input);

    let mut doc = Document::with_root("html");
    // nodes that ended up at the top level, in document order
    let mut tops: Vec<NodeId> = Vec::new();
    // currently open elements
    let mut stack: Vec<NodeId> = Vec::new();

    for token in Tokenizer::from_fragment(input, 0..input.len()) {
        match token? {
            Token::ElementStart { local, .. } => {
                let tag = local.as_str().to_ascii_lowercase();
                while let Some(&open) = stack.last() {
                    match doc.tag(open) {
                        Some(open_tag) if implies_end_tag(&tag, open_tag) => {
                            stack.pop();
                        }
                        _ => break,
                    }
                }
                let id = doc.create_element(tag);
                match stack.last() {
                    Some(&parent) => doc.append_child(parent, id),
                    None => tops.push(id),
                }
                stack.push(id);
            }
            Token::Attribute { local, value, .. } => {
                if let Some(&current) = stack.last() {
                    let name = local.as_str().to_ascii_lowercase();
                    // first occurrence wins
                    if doc.attr(current, &name).is_none() {
                        doc.set_attr(current, &name, &unescape_text(value.as_str()));
                    }
                }
            }
            Token::ElementEnd { end, .. } => match end {
                ElementEnd::Open => {
                    if let Some(&current) = stack.last() {
                        if doc.tag(current).map_or(false, is_void_element) {
                            stack.pop();
                        }
                    }
                }
                ElementEnd::Empty => {
                    stack.pop();
                }
                ElementEnd::Close(_, local) => {
                    let tag = local.as_str().to_ascii_lowercase();
                    match stack
                        .iter()
                        .rposition(|&open| doc.tag(open) == Some(tag.as_str()))
                    {
                        // implicitly closes everything that was left open
                        // inside, i.e. `<ul><li>a<li>b</ul>`
                        Some(pos) => stack.truncate(pos),
                        // stray end tag, ignored
                        None => {}
                    }
                }
            },
            Token::Text { text } => {
                let raw = text.as_str();
                match stack.last() {
                    Some(&parent) => {
                        let node = doc.create_text(unescape_text(raw));
                        doc.append_child(parent, node);
                    }
                    None => {
                        // keep stray top-level text, drop pure whitespace
                        if !raw.trim().is_empty() {
                            let node = doc.create_text(unescape_text(raw));
                            tops.push(node);
                        }
                    }
                }
            }
            Token::Cdata { text, .. } => {
                if let Some(&parent) = stack.last() {
                    let node = doc.create_text(text.as_str().to_string());
                    doc.append_child(parent, node);
                }
            }
            // the cleanser contract strips these; tolerate and skip them
            Token::Declaration { .. }
            | Token::ProcessingInstruction { .. }
            | Token::Comment { .. }
            | Token::DtdStart { .. }
            | Token::EmptyDtd { .. }
            | Token::EntityDeclaration { .. }
            | Token::DtdEnd { .. } => {}
        }
    }

    attach_roots(doc, tops)
}

/// Wires the parsed top-level nodes to the document root, wrapping fragments
/// the way lxml does.
fn attach_roots(mut doc: Document, tops: Vec<NodeId>) -> Result<Document, HtmlParseError> {
    let top_elements: Vec<NodeId> = tops.iter().copied().filter(|t| doc.is_element(*t)).collect();

    if top_elements.is_empty() {
        return Err(HtmlParseError::NoRootNode);
    }

    if top_elements.len() == 1 && doc.tag(top_elements[0]) == Some("html") {
        doc.set_root(top_elements[0]);
        return Ok(doc);
    }

    if top_elements.len() == 1 && doc.tag(top_elements[0]) == Some("body") {
        let root = doc.root();
        doc.append_child(root, top_elements[0]);
        return Ok(doc);
    }

    let root = doc.root();
    let body = doc.create_element("body");
    doc.append_child(root, body);
    for top in tops {
        doc.append_child(body, top);
    }
    Ok(doc)
}

/// Removes a leading `<!DOCTYPE …>` declaration, which only exists in
/// document mode and would trip the fragment tokenizer.
fn strip_doctype(input: &str) -> &str {
    let trimmed = input.trim_start_matches('\u{feff}').trim_start();
    if trimmed.len() >= 9 && trimmed[..9].eq_ignore_ascii_case("<!doctype") {
        match trimmed.find('>') {
            Some(pos) => &trimmed[pos + 1..],
            None => trimmed,
        }
    } else {
        trimmed
    }
}

/// Resolves the character references that appear in practice. Unknown
/// references are kept verbatim.
fn unescape_text(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        // references are short; cap the scan so stray ampersands in long
        // text don't quadratically rescan
        let window = &rest.as_bytes()[..rest.len().min(12)];
        let end = window.iter().position(|&b| b == b';');
        match end.map(|e| &rest[1..e]) {
            Some(name) => {
                let resolved = match name {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some('\u{a0}'),
                    _ => parse_numeric_reference(name),
                };
                match resolved {
                    Some(c) => {
                        out.push(c);
                        rest = &rest[name.len() + 2..];
                    }
                    None => {
                        out.push('&');
                        rest = &rest[1..];
                    }
                }
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn parse_numeric_reference(name: &str) -> Option<char> {
    let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
        u32::from_str_radix(hex, 16).ok()?
    } else if let Some(dec) = name.strip_prefix('#') {
        dec.parse::<u32>().ok()?
    } else {
        return None;
    };
    char::from_u32(code)
}

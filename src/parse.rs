//! Parse Module for the Jinge template compiler
//!
//! Turns template markup into `TemplateNode` trees. Tag and attribute names
//! keep their case, and `${ ... }` interpolations are skipped as balanced
//! JavaScript so that quotes or angle brackets inside them never end the
//! surrounding text or attribute value.

use markup5ever_rcdom::{Handle, NodeData, RcDom};
use tendril::{StrTendril, TendrilSink};

use crate::tags::is_void_tag;
use crate::validate::{
    AttributeIR, CommentNode, CompilerError, ElementNode, SourceLocation, TemplateNode,
    TextNode, ERR_TEMPLATE_SYNTAX,
};

#[cfg(feature = "napi")]
use napi_derive::napi;

// ═══════════════════════════════════════════════════════════════════════════════
// BALANCED SCANNING
// ═══════════════════════════════════════════════════════════════════════════════

/// `start` points at `{`; returns the offset just past the matching `}`.
pub(crate) fn find_balanced_brace_end(src: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = start;
    while i < src.len() {
        match src[i] {
            b'\\' => {
                i += 2;
                continue;
            }
            q @ (b'"' | b'\'') => {
                i = skip_string(src, i, q)?;
                continue;
            }
            b'`' => {
                i = skip_template_literal(src, i)?;
                continue;
            }
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn skip_string(src: &[u8], start: usize, quote: u8) -> Option<usize> {
    let mut i = start + 1;
    while i < src.len() {
        match src[i] {
            b'\\' => i += 2,
            c if c == quote => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

fn skip_template_literal(src: &[u8], start: usize) -> Option<usize> {
    let mut i = start + 1;
    while i < src.len() {
        match src[i] {
            b'\\' => i += 2,
            b'`' => return Some(i + 1),
            b'$' if src.get(i + 1) == Some(&b'{') => {
                i = find_balanced_brace_end(src, i + 1)?;
            }
            _ => i += 1,
        }
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENTITY DECODING
// ═══════════════════════════════════════════════════════════════════════════════

/// Decodes html character references (`&amp;`, `&#x27;`, `&nbsp;`, ...).
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    // Only references should be interpreted, never markup.
    let escaped = text.replace('<', "&lt;");
    let html = format!("<body>{}", escaped);
    let dom = html5ever::parse_document(RcDom::default(), Default::default())
        .one(StrTendril::from_slice(&html));
    let mut out = String::with_capacity(text.len());
    collect_text(&dom.document, &mut out);
    out
}

fn collect_text(handle: &Handle, out: &mut String) {
    if let NodeData::Text { contents } = &handle.data {
        out.push_str(&contents.borrow());
    }
    for child in handle.children.borrow().iter() {
        collect_text(child, out);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEMPLATE PARSER
// ═══════════════════════════════════════════════════════════════════════════════

struct OpenElement {
    tag: String,
    attributes: Vec<AttributeIR>,
    children: Vec<TemplateNode>,
    location: SourceLocation,
}

impl OpenElement {
    fn close(self) -> TemplateNode {
        TemplateNode::Element(ElementNode {
            tag: self.tag,
            attributes: self.attributes,
            children: self.children,
            location: self.location,
        })
    }
}

struct TemplateParser<'s> {
    src: &'s str,
    bytes: &'s [u8],
    pos: usize,
    line_starts: Vec<usize>,
    stack: Vec<OpenElement>,
    roots: Vec<TemplateNode>,
}

impl<'s> TemplateParser<'s> {
    fn new(src: &'s str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(src.match_indices('\n').map(|(i, _)| i + 1));
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            line_starts,
            stack: Vec::new(),
            roots: Vec::new(),
        }
    }

    fn location(&self, offset: usize) -> SourceLocation {
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let line_start = self.line_starts[line_idx];
        let column = self
            .src
            .get(line_start..offset)
            .map(|s| s.chars().count())
            .unwrap_or(0);
        SourceLocation::new(line_idx as u32 + 1, column as u32 + 1)
    }

    fn error(&self, message: &str, offset: usize) -> CompilerError {
        CompilerError::at(ERR_TEMPLATE_SYNTAX, message, &self.location(offset))
    }

    fn rest(&self) -> &'s str {
        &self.src[self.pos..]
    }

    fn push_node(&mut self, node: TemplateNode) {
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.roots.push(node),
        }
    }

    fn parse(mut self) -> Result<Vec<TemplateNode>, CompilerError> {
        while self.pos < self.bytes.len() {
            let rest = self.rest();
            if rest.starts_with("<!--") {
                self.parse_comment()?;
            } else if rest.starts_with("</") {
                self.parse_close_tag()?;
            } else if rest.starts_with("<!") {
                // Doctype and other declarations carry no render output.
                let end = rest.find('>').ok_or_else(|| self.error("unterminated declaration", self.pos))?;
                self.pos += end + 1;
            } else if self.at_open_tag(self.pos) {
                self.parse_open_tag()?;
            } else {
                self.parse_text()?;
            }
        }
        if let Some(open) = self.stack.last() {
            return Err(CompilerError::at(
                ERR_TEMPLATE_SYNTAX,
                &format!("unclosed tag <{}>", open.tag),
                &open.location,
            ));
        }
        Ok(self.roots)
    }

    fn at_open_tag(&self, offset: usize) -> bool {
        self.bytes[offset] == b'<'
            && self
                .bytes
                .get(offset + 1)
                .map_or(false, |c| c.is_ascii_alphabetic() || *c == b'_')
    }

    fn starts_markup(&self, offset: usize) -> bool {
        self.at_open_tag(offset)
            || (self.bytes[offset] == b'<'
                && matches!(self.bytes.get(offset + 1), Some(b'/') | Some(b'!')))
    }

    fn parse_comment(&mut self) -> Result<(), CompilerError> {
        let start = self.pos;
        let body_start = start + 4;
        let end = self.src[body_start..]
            .find("-->")
            .ok_or_else(|| self.error("unterminated comment", start))?;
        let value = self.src[body_start..body_start + end].to_string();
        let location = self.location(start);
        self.pos = body_start + end + 3;
        self.push_node(TemplateNode::Comment(CommentNode { value, location }));
        Ok(())
    }

    fn parse_close_tag(&mut self) -> Result<(), CompilerError> {
        let start = self.pos;
        let end = self.rest().find('>').ok_or_else(|| self.error("unterminated closing tag", start))?;
        let name = self.src[start + 2..start + end].trim().to_string();
        self.pos = start + end + 1;

        match self.stack.pop() {
            Some(open) if open.tag == name => {
                let node = open.close();
                self.push_node(node);
                Ok(())
            }
            Some(open) => Err(self.error(
                &format!(
                    "unexpected closing tag </{}>, <{}> at Ln {} is not closed",
                    name, open.tag, open.location.line
                ),
                start,
            )),
            None => Err(self.error(&format!("closing tag </{}> has no opening tag", name), start)),
        }
    }

    fn parse_open_tag(&mut self) -> Result<(), CompilerError> {
        let start = self.pos;
        let mut i = start + 1;
        while i < self.bytes.len() && !is_tag_name_end(self.bytes[i]) {
            i += 1;
        }
        let tag = self.src[start + 1..i].to_string();
        let location = self.location(start);
        let mut attributes = Vec::new();
        let unterminated = || CompilerError::at(ERR_TEMPLATE_SYNTAX, &format!("unterminated tag <{}>", tag), &location);

        let self_closing = loop {
            while i < self.bytes.len() && self.bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            match self.bytes.get(i) {
                None => return Err(unterminated()),
                Some(b'>') => {
                    i += 1;
                    break false;
                }
                Some(b'/') if self.bytes.get(i + 1) == Some(&b'>') => {
                    i += 2;
                    break true;
                }
                Some(_) => {
                    let (attr, next) = self.parse_attribute(i)?;
                    attributes.push(attr);
                    i = next;
                }
            }
        };
        self.pos = i;

        let open = OpenElement {
            tag,
            attributes,
            children: Vec::new(),
            location,
        };
        if self_closing || is_void_tag(&open.tag) {
            let node = open.close();
            self.push_node(node);
        } else {
            self.stack.push(open);
        }
        Ok(())
    }

    fn parse_attribute(&self, start: usize) -> Result<(AttributeIR, usize), CompilerError> {
        let mut i = start;
        while i < self.bytes.len() {
            let c = self.bytes[i];
            if c.is_ascii_whitespace() || c == b'=' || c == b'>' {
                break;
            }
            if c == b'/' && self.bytes.get(i + 1) == Some(&b'>') {
                break;
            }
            i += 1;
        }
        let name = self.src[start..i].to_string();
        let location = self.location(start);

        let mut j = i;
        while j < self.bytes.len() && self.bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        if self.bytes.get(j) != Some(&b'=') {
            let attr = AttributeIR {
                name,
                value: None,
                location,
                value_location: None,
            };
            return Ok((attr, i));
        }
        j += 1;
        while j < self.bytes.len() && self.bytes[j].is_ascii_whitespace() {
            j += 1;
        }

        let (value_start, value_end, next) = match self.bytes.get(j) {
            Some(&q) if q == b'"' || q == b'\'' => {
                let end = self.scan_value(j + 1, |c| c == q).ok_or_else(|| {
                    self.error(&format!("unterminated value of attribute '{}'", name), j)
                })?;
                if self.bytes.get(end) != Some(&q) {
                    return Err(self.error(&format!("unterminated value of attribute '{}'", name), j));
                }
                (j + 1, end, end + 1)
            }
            Some(_) => {
                let end = self
                    .scan_value(j, |c| c.is_ascii_whitespace() || c == b'>')
                    .ok_or_else(|| self.error("unterminated interpolation", j))?;
                (j, end, end)
            }
            None => return Err(self.error(&format!("missing value of attribute '{}'", name), j)),
        };

        let attr = AttributeIR {
            name,
            value: Some(self.src[value_start..value_end].to_string()),
            location,
            value_location: Some(self.location(value_start)),
        };
        Ok((attr, next))
    }

    /// Scans from `start` until `stop` matches outside any interpolation.
    fn scan_value(&self, start: usize, stop: impl Fn(u8) -> bool) -> Option<usize> {
        let mut i = start;
        while i < self.bytes.len() {
            let c = self.bytes[i];
            if c == b'$' && self.bytes.get(i + 1) == Some(&b'{') {
                i = find_balanced_brace_end(self.bytes, i + 1)?;
                continue;
            }
            if stop(c) {
                return Some(i);
            }
            i += 1;
        }
        Some(i)
    }

    fn parse_text(&mut self) -> Result<(), CompilerError> {
        let start = self.pos;
        let mut i = start;
        while i < self.bytes.len() {
            let c = self.bytes[i];
            if c == b'$' && self.bytes.get(i + 1) == Some(&b'{') {
                let at = i;
                i = find_balanced_brace_end(self.bytes, at + 1)
                    .ok_or_else(|| self.error("unterminated interpolation", at))?;
                continue;
            }
            if c == b'<' && i > start && self.starts_markup(i) {
                break;
            }
            i += 1;
        }
        let value = self.src[start..i].to_string();
        let location = self.location(start);
        self.pos = i;
        self.push_node(TemplateNode::Text(TextNode { value, location }));
        Ok(())
    }
}

fn is_tag_name_end(c: u8) -> bool {
    c.is_ascii_whitespace() || c == b'>' || c == b'/'
}

/// Parses template markup into its node tree.
pub fn parse_template(source: &str) -> Result<Vec<TemplateNode>, CompilerError> {
    TemplateParser::new(source).parse()
}

#[cfg(feature = "napi")]
#[napi]
pub fn parse_template_native(source: String) -> napi::Result<serde_json::Value> {
    let nodes = parse_template(&source).map_err(|e| {
        napi::Error::from_reason(format!("{} (Ln {}, Col {})", e.message, e.line, e.column))
    })?;
    serde_json::to_value(nodes).map_err(|e| napi::Error::from_reason(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(node: &TemplateNode) -> &ElementNode {
        match node {
            TemplateNode::Element(e) => e,
            other => panic!("expected element, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_elements_and_text() {
        let nodes = parse_template("<div class=\"a\"><span>hi</span> ${name}</div>").unwrap();
        assert_eq!(nodes.len(), 1);
        let div = element(&nodes[0]);
        assert_eq!(div.tag, "div");
        assert_eq!(div.attributes[0].name, "class");
        assert_eq!(div.attributes[0].value.as_deref(), Some("a"));
        assert_eq!(div.children.len(), 2);
        assert!(matches!(&div.children[1], TemplateNode::Text(t) if t.value == " ${name}"));
    }

    #[test]
    fn test_component_tag_case_preserved() {
        let nodes = parse_template("<MyButton on:click=\"go\" disabled/>").unwrap();
        let el = element(&nodes[0]);
        assert_eq!(el.tag, "MyButton");
        assert_eq!(el.attributes.len(), 2);
        assert_eq!(el.attributes[1].value, None);
        assert!(el.children.is_empty());
    }

    #[test]
    fn test_interpolation_can_hold_quotes_and_angles() {
        let src = r#"<p title="${a ? "x>" : 'y'}">${a < b ? '</p>' : `}`}</p>"#;
        let nodes = parse_template(src).unwrap();
        let p = element(&nodes[0]);
        assert_eq!(p.attributes[0].value.as_deref(), Some(r#"${a ? "x>" : 'y'}"#));
        assert!(matches!(&p.children[0], TemplateNode::Text(t) if t.value == "${a < b ? '</p>' : `}`}"));
    }

    #[test]
    fn test_void_elements_need_no_close() {
        let nodes = parse_template("<p><input value=x><br></p>").unwrap();
        let p = element(&nodes[0]);
        assert_eq!(p.children.len(), 2);
        assert_eq!(element(&p.children[0]).attributes[0].value.as_deref(), Some("x"));
    }

    #[test]
    fn test_positions() {
        let nodes = parse_template("<div>\n  <b a=\"1\">x</b>\n</div>").unwrap();
        let b = element(&element(&nodes[0]).children[1]);
        assert_eq!(b.location, SourceLocation::new(2, 3));
        assert_eq!(b.attributes[0].location, SourceLocation::new(2, 6));
        assert_eq!(b.attributes[0].value_location, Some(SourceLocation::new(2, 9)));
    }

    #[test]
    fn test_unclosed_tag_reports_open_position() {
        let err = parse_template("<div>\n  <span>\n</div>").unwrap_err();
        assert_eq!(err.code, ERR_TEMPLATE_SYNTAX);
        assert_eq!(err.line, 3);

        let err = parse_template("<div>\n<section>").unwrap_err();
        assert!(err.message.contains("unclosed tag <section>"));
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_stray_close_and_comment() {
        assert!(parse_template("</div>").is_err());
        assert!(parse_template("<!-- open").is_err());
        let nodes = parse_template("<!-- import { A } from './a' --><A/>").unwrap();
        assert!(matches!(&nodes[0], TemplateNode::Comment(c) if c.value.contains("import")));
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("a &amp;&amp; b &lt; c"), "a && b < c");
        assert_eq!(decode_entities("x&nbsp;y"), "x\u{a0}y");
        assert_eq!(decode_entities("1 < 2 &gt; 0"), "1 < 2 > 0");
        assert_eq!(decode_entities("plain"), "plain");
    }
}

//! In-Memory XML Trees
//!
//! Every pipeline stage consumes and produces an [`XmlDocument`]. Trees are
//! never serialized between stages, so line annotations recorded at parse
//! time survive all the way into the compiled template.

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

use crate::charset::decode_xml;
use crate::wellformed;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("XML parse error{}: {message}", at_line(.line))]
pub struct ParseError {
    pub line: Option<u32>,
    pub message: String,
}

fn at_line(line: &Option<u32>) -> String {
    line.map(|l| format!(" at line {}", l)).unwrap_or_default()
}

impl ParseError {
    fn at(line: u32, message: impl Into<String>) -> Self {
        Self { line: Some(line), message: message.into() }
    }

    pub(crate) fn unlocated(message: impl Into<String>) -> Self {
        Self { line: None, message: message.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Qualified name as written, e.g. `sch:pattern`.
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
    /// 1-based line of the start tag, when line numbering was enabled.
    pub line: Option<u32>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: vec![],
            children: vec![],
            line: None,
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn local_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(p, _)| p)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Depth-first, document order, starting with `self`.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Concatenated text content of this element and its descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    fn write_xml(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (k, v) in &self.attributes {
            out.push(' ');
            out.push_str(k);
            out.push_str("=\"");
            out.push_str(&escape(v.as_str()));
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            match child {
                Node::Element(e) => e.write_xml(out),
                Node::Text(t) => out.push_str(&escape(t.as_str())),
                Node::Comment(c) => {
                    out.push_str("<!--");
                    out.push_str(c);
                    out.push_str("-->");
                }
            }
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

fn collect_text(element: &Element, out: &mut String) {
    for child in &element.children {
        match child {
            Node::Text(t) => out.push_str(t),
            Node::Element(e) => collect_text(e, out),
            Node::Comment(_) => {}
        }
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        self.stack.extend(next.child_elements().collect::<Vec<_>>().into_iter().rev());
        Some(next)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    /// System id the document was loaded from, if any. Engines resolve
    /// relative includes against it.
    pub base_uri: Option<String>,
    pub root: Element,
}

impl XmlDocument {
    pub fn new(root: Element) -> Self {
        Self { base_uri: None, root }
    }

    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = Some(base_uri.into());
        self
    }

    /// Parse a complete, well-formed document. Exactly one root element is
    /// required; comments, processing instructions and whitespace may
    /// surround it.
    pub fn parse(input: &str, line_numbers: bool) -> Result<Self, ParseError> {
        let input = input.strip_prefix('\u{FEFF}').unwrap_or(input);
        let mut reader = Reader::from_str(input);
        let mut lines = LineCounter::new(input);
        let mut stack: Vec<Element> = vec![];
        let mut root: Option<Element> = None;
        let mut at_start = true;
        let mut seen_doctype = false;

        loop {
            let offset = reader.buffer_position() as usize;
            let line = lines.line_at(offset);
            let event = reader
                .read_event()
                .map_err(|e| ParseError::at(lines.line_at(reader.buffer_position() as usize), e.to_string()))?;
            let check = |result: Result<(), String>| result.map_err(|msg| ParseError::at(line, msg));

            match event {
                Event::Decl(_) if !at_start => {
                    return Err(ParseError::at(line, "XML declaration only allowed at the start of the document"));
                }
                Event::Decl(_) => {}
                Event::DocType(_) => {
                    if seen_doctype || root.is_some() || !stack.is_empty() {
                        return Err(ParseError::at(line, "DOCTYPE only allowed once, before the root element"));
                    }
                    seen_doctype = true;
                }
                Event::PI(pi) => check(wellformed::check_processing_instruction(&String::from_utf8_lossy(&pi)))?,
                Event::Start(start) => {
                    let element = open_element(&start, line, line_numbers)?;
                    if stack.is_empty() && root.is_some() {
                        return Err(ParseError::at(line, "multiple root elements"));
                    }
                    stack.push(element);
                }
                Event::Empty(start) => {
                    let element = open_element(&start, line, line_numbers)?;
                    attach(&mut stack, &mut root, element, line)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| ParseError::at(line, "unexpected end tag"))?;
                    attach(&mut stack, &mut root, element, line)?;
                }
                Event::Text(text) => {
                    check(wellformed::check_text(&String::from_utf8_lossy(&text)))?;
                    let text = text
                        .unescape()
                        .map_err(|e| ParseError::at(line, e.to_string()))?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(Node::Text(text.into_owned())),
                        None if text.trim().is_empty() => {}
                        None => return Err(ParseError::at(line, "text outside the root element")),
                    }
                }
                Event::CData(data) => {
                    let text = String::from_utf8_lossy(&data).into_owned();
                    check(wellformed::check_chars(&text))?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(Node::Text(text)),
                        None => return Err(ParseError::at(line, "CDATA outside the root element")),
                    }
                }
                Event::Comment(comment) => {
                    let comment = String::from_utf8_lossy(&comment).into_owned();
                    check(wellformed::check_comment(&comment))?;
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(Node::Comment(comment));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            at_start = false;
        }

        if let Some(open) = stack.last() {
            return Err(ParseError::at(
                lines.line_at(input.len()),
                format!("unclosed element <{}>", open.name),
            ));
        }
        root.map(XmlDocument::new)
            .ok_or_else(|| ParseError::at(lines.line_at(input.len()), "no root element"))
    }

    /// Parse raw bytes, decoding them per BOM or encoding declaration.
    pub fn parse_bytes(bytes: &[u8], line_numbers: bool) -> Result<Self, ParseError> {
        Self::parse(&decode_xml(bytes)?, line_numbers)
    }

    pub fn descendants(&self) -> Descendants<'_> {
        self.root.descendants()
    }

    /// First element in document order with the given local name.
    pub fn find_first(&self, local_name: &str) -> Option<&Element> {
        self.descendants().find(|e| e.local_name() == local_name)
    }

    /// Serialize without an XML declaration. Output is deterministic for a
    /// given tree.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.root.write_xml(&mut out);
        out
    }
}

fn open_element(start: &BytesStart<'_>, line: u32, line_numbers: bool) -> Result<Element, ParseError> {
    let fail = |msg: String| ParseError::at(line, msg);
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    wellformed::check_name(&name).map_err(fail)?;

    let mut element = Element::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| fail(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        wellformed::check_name(&key).map_err(fail)?;
        wellformed::check_attribute_value(&String::from_utf8_lossy(&attr.value)).map_err(fail)?;
        let value = attr.unescape_value().map_err(|e| fail(e.to_string()))?;
        element.attributes.push((key, value.into_owned()));
    }
    if line_numbers {
        element.line = Some(line);
    }
    Ok(element)
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
    line: u32,
) -> Result<(), ParseError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => return Err(ParseError::at(line, "multiple root elements")),
    }
    Ok(())
}

/// Maps byte offsets to 1-based line numbers. Offsets must be queried in
/// non-decreasing order.
struct LineCounter<'a> {
    bytes: &'a [u8],
    scanned: usize,
    line: u32,
}

impl<'a> LineCounter<'a> {
    fn new(input: &'a str) -> Self {
        Self { bytes: input.as_bytes(), scanned: 0, line: 1 }
    }

    /// `\n`, `\r\n` and a lone `\r` each end a line.
    fn line_at(&mut self, offset: usize) -> u32 {
        let offset = offset.min(self.bytes.len());
        for i in self.scanned..offset {
            match self.bytes[i] {
                b'\n' => self.line += 1,
                b'\r' if self.bytes.get(i + 1) != Some(&b'\n') => self.line += 1,
                _ => {}
            }
        }
        self.scanned = self.scanned.max(offset);
        self.line
    }
}

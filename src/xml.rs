//! XML loading into a small document tree.
//!
//! The tree keeps every node kind the record builder distinguishes: element,
//! text, CDATA, comment and processing instruction. Adjacent text is merged on
//! insertion and empty text is dropped, so "element holds exactly one text
//! node" means the same thing it would after a DOM `normalize()`.

use std::borrow::Cow;
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::warn;

use crate::error::{ProviderError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    /// Character data with entity and character references resolved.
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub name: String,
    /// Attributes in document order.
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            _ => None,
        })
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.child_elements()
            .filter(move |element| element.name == name)
    }

    /// Text content, only when the element's sole child is a text node.
    ///
    /// Empty elements, CDATA content and mixed content all yield `None`.
    pub fn sole_text(&self) -> Option<&str> {
        match self.children.as_slice() {
            [Node::Text(text)] => Some(text),
            _ => None,
        }
    }

    /// The last CDATA section among the direct children.
    pub fn last_cdata(&self) -> Option<&str> {
        self.children.iter().rev().find_map(|node| match node {
            Node::CData(data) => Some(data.as_str()),
            _ => None,
        })
    }

    fn push_text(&mut self, text: Cow<'_, str>) {
        if text.is_empty() {
            return;
        }
        if let Some(Node::Text(previous)) = self.children.last_mut() {
            previous.push_str(&text);
        } else {
            self.children.push(Node::Text(text.into_owned()));
        }
    }
}

/// A parsed definition file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub root: Element,
}

impl Document {
    /// Parse raw file contents. Invalid UTF-8 is replaced, not rejected.
    pub fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, String> {
        Self::parse(&String::from_utf8_lossy(bytes))
    }

    /// Parse a complete XML document, returning a description of the first
    /// well-formedness problem on failure.
    pub fn parse(content: &str) -> std::result::Result<Self, String> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let mut reader = Reader::from_str(content);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(start)) => {
                    let element = element_from(&start)?;
                    if stack.is_empty() && root.is_some() {
                        return Err(format!("junk after document element: <{}>", element.name));
                    }
                    stack.push(element);
                }
                Ok(Event::Empty(start)) => {
                    let element = element_from(&start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Ok(Event::End(end)) => {
                    let element = stack.pop().ok_or_else(|| {
                        format!(
                            "unexpected end tag </{}>",
                            String::from_utf8_lossy(end.name().as_ref())
                        )
                    })?;
                    attach(&mut stack, &mut root, element)?;
                }
                Ok(Event::Text(text)) => {
                    let text = text.unescape().map_err(|e| {
                        format!("{} at position {}", e, reader.buffer_position())
                    })?;
                    match stack.last_mut() {
                        Some(parent) => parent.push_text(text),
                        None if text.trim().is_empty() => {}
                        None => return Err("character data outside the document element".into()),
                    }
                }
                Ok(Event::CData(data)) => {
                    let data = String::from_utf8_lossy(&data).into_owned();
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(Node::CData(data)),
                        None => return Err("CDATA section outside the document element".into()),
                    }
                }
                Ok(Event::Comment(comment)) => {
                    if let Some(parent) = stack.last_mut() {
                        let comment = String::from_utf8_lossy(&comment).into_owned();
                        parent.children.push(Node::Comment(comment));
                    }
                }
                Ok(Event::PI(_)) => {
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(Node::ProcessingInstruction);
                    }
                }
                Ok(Event::Decl(_)) | Ok(Event::DocType(_)) => {}
                Ok(Event::Eof) => break,
                Err(e) => return Err(format!("{} at position {}", e, reader.error_position())),
            }
        }

        if let Some(open) = stack.last() {
            return Err(format!("unclosed element <{}>", open.name));
        }
        root.map(|root| Document { root })
            .ok_or_else(|| "no element found".to_string())
    }
}

fn element_from(start: &BytesStart<'_>) -> std::result::Result<Element, String> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()));

    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| format!("<{}>: {}", element.name, e))?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .map_err(|e| format!("<{}> attribute {}: {}", element.name, key, e))?
            .into_owned();
        element.attributes.push((key, value));
    }

    Ok(element)
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> std::result::Result<(), String> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(Node::Element(element));
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(format!("junk after document element: <{}>", element.name)),
    }
}

fn read_document(path: &Path) -> Result<Document> {
    let bytes = std::fs::read(path).map_err(|source| ProviderError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    Document::from_bytes(&bytes).map_err(|details| ProviderError::XmlSyntax {
        path: path.to_path_buf(),
        details,
    })
}

/// Read and parse one definition file.
///
/// Failures are logged here; an `Err` means "skip this file" and carries the
/// reason for the load report.
pub fn load_document(path: &Path) -> Result<Document> {
    read_document(path).inspect_err(|e| {
        warn!(path = %path.display(), error = %e, "skipping provider file");
    })
}

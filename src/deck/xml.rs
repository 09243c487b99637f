/*!
 * Owned XML element tree for package parts.
 *
 * Slide parts are read into this tree with quick-xml, edited in place and
 * written back. Element and attribute names keep their namespace prefixes
 * exactly as found in the source; lookups go through the local name so a
 * part using a non-default prefix still works. Text nodes are kept verbatim,
 * including whitespace, so untouched content round-trips unchanged.
 */

use std::borrow::Cow;

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::errors::DeckError;

/// A node inside an element
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
}

/// An element with its attributes and children
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    /// Qualified name, e.g. `a:r`
    pub name: String,
    /// Attributes in document order
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

/// A parsed document: declaration, prolog nodes and the root element
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    declaration: Option<Declaration>,
    prolog: Vec<XmlNode>,
    pub root: XmlElement,
}

#[derive(Debug, Clone, PartialEq)]
struct Declaration {
    version: String,
    encoding: Option<String>,
    standalone: Option<String>,
}

/// Local part of a qualified name (`a:rPr` -> `rPr`)
pub fn local_name(name: &str) -> &str {
    match name.rfind(':') {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}

/// Namespace prefix of a qualified name, if any
pub fn prefix_of(name: &str) -> Option<&str> {
    name.rfind(':').map(|pos| &name[..pos])
}

/// Build a qualified name with the given prefix
pub fn qualified(prefix: Option<&str>, local: &str) -> String {
    match prefix {
        Some(p) if !p.is_empty() => format!("{}:{}", p, local),
        _ => local.to_string(),
    }
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    pub fn prefix(&self) -> Option<&str> {
        prefix_of(&self.name)
    }

    pub fn is(&self, local: &str) -> bool {
        self.local_name() == local
    }

    /// Attribute value by qualified or local name
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key || local_name(k) == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.attributes.push((key.to_string(), value)),
        }
    }

    pub fn remove_attr(&mut self, key: &str) -> Option<String> {
        let pos = self.attributes.iter().position(|(k, _)| k == key)?;
        Some(self.attributes.remove(pos).1)
    }

    /// Child elements, skipping text and comments
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(|node| match node {
            XmlNode::Element(e) => Some(e),
            _ => None,
        })
    }

    /// First child element with the given local name
    pub fn child(&self, local: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.is(local))
    }

    pub fn child_mut(&mut self, local: &str) -> Option<&mut XmlElement> {
        self.elements_mut().find(|e| e.is(local))
    }

    /// All child elements with the given local name
    pub fn children_named<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.elements().filter(move |e| e.is(local))
    }

    /// Follow a chain of local names from this element
    pub fn descend(&self, path: &[&str]) -> Option<&XmlElement> {
        path.iter().try_fold(self, |current, local| current.child(local))
    }

    /// Depth-first search for the first descendant with the given local name
    pub fn find_descendant(&self, local: &str) -> Option<&XmlElement> {
        for child in self.elements() {
            if child.is(local) {
                return Some(child);
            }
            if let Some(found) = child.find_descendant(local) {
                return Some(found);
            }
        }
        None
    }

    /// Element reached by following child-node indices
    pub fn at_path(&self, path: &[usize]) -> Option<&XmlElement> {
        let mut current = self;
        for &idx in path {
            current = match current.children.get(idx) {
                Some(XmlNode::Element(e)) => e,
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn at_path_mut(&mut self, path: &[usize]) -> Option<&mut XmlElement> {
        let mut current = self;
        for &idx in path {
            current = match current.children.get_mut(idx) {
                Some(XmlNode::Element(e)) => e,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Concatenated text of direct text children
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                XmlNode::Text(t) | XmlNode::CData(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Replace all children with a single text node
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children = vec![XmlNode::Text(text.into())];
    }

    pub fn push(&mut self, element: XmlElement) {
        self.children.push(XmlNode::Element(element));
    }

    fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<(), quick_xml::Error> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        for child in &self.children {
            match child {
                XmlNode::Element(e) => e.write_to(writer)?,
                XmlNode::Text(t) => writer.write_event(Event::Text(BytesText::new(t)))?,
                XmlNode::CData(t) => writer.write_event(Event::CData(BytesCData::new(t.as_str())))?,
                XmlNode::Comment(t) => {
                    writer.write_event(Event::Comment(BytesText::from_escaped(t.as_str())))?
                }
                XmlNode::ProcessingInstruction(t) => {
                    writer.write_event(Event::PI(BytesText::from_escaped(t.as_str())))?
                }
            }
        }
        writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;
        Ok(())
    }
}

fn element_from_start(start: &BytesStart<'_>, part: &str) -> Result<XmlElement, DeckError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut element = XmlElement::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| xml_error(part, e))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(|e| xml_error(part, e))?;
        element.attributes.push((key, value.into_owned()));
    }
    Ok(element)
}

fn xml_error(part: &str, error: impl std::fmt::Display) -> DeckError {
    DeckError::Xml {
        part: part.to_string(),
        message: error.to_string(),
    }
}

fn lossy(bytes: Cow<'_, [u8]>) -> String {
    String::from_utf8_lossy(&bytes).into_owned()
}

impl XmlDocument {
    /// Wrap a root element without declaration
    pub fn new(root: XmlElement) -> Self {
        Self {
            declaration: None,
            prolog: Vec::new(),
            root,
        }
    }

    /// Parse a standalone document
    pub fn parse(xml: &str) -> Result<Self, DeckError> {
        Self::parse_part(xml, "<inline>")
    }

    /// Parse a document, naming the package part in errors
    pub fn parse_part(xml: &str, part: &str) -> Result<Self, DeckError> {
        let mut reader = Reader::from_str(xml);
        let mut declaration = None;
        let mut prolog = Vec::new();
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            let event = reader.read_event().map_err(|e| {
                xml_error(part, format!("{} at position {}", e, reader.buffer_position()))
            })?;

            match event {
                Event::Decl(decl) => {
                    let version = decl.version().map_err(|e| xml_error(part, e))?;
                    let encoding = match decl.encoding() {
                        Some(enc) => Some(lossy(enc.map_err(|e| xml_error(part, e))?)),
                        None => None,
                    };
                    let standalone = match decl.standalone() {
                        Some(sa) => Some(lossy(sa.map_err(|e| xml_error(part, e))?)),
                        None => None,
                    };
                    declaration = Some(Declaration {
                        version: lossy(version),
                        encoding,
                        standalone,
                    });
                }
                Event::Start(start) => {
                    stack.push(element_from_start(&start, part)?);
                }
                Event::Empty(start) => {
                    let element = element_from_start(&start, part)?;
                    match stack.last_mut() {
                        Some(parent) => parent.push(element),
                        None => root = Some(element),
                    }
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| xml_error(part, "unbalanced closing tag"))?;
                    match stack.last_mut() {
                        Some(parent) => parent.push(element),
                        None => root = Some(element),
                    }
                }
                Event::Text(text) => {
                    if let Some(parent) = stack.last_mut() {
                        let value = text.unescape().map_err(|e| xml_error(part, e))?;
                        parent.children.push(XmlNode::Text(value.into_owned()));
                    }
                }
                Event::CData(data) => {
                    if let Some(parent) = stack.last_mut() {
                        let value = String::from_utf8_lossy(&data.into_inner()).into_owned();
                        parent.children.push(XmlNode::CData(value));
                    }
                }
                Event::Comment(text) => {
                    let node = XmlNode::Comment(String::from_utf8_lossy(&text).into_owned());
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(node),
                        None => prolog.push(node),
                    }
                }
                Event::PI(text) => {
                    let node =
                        XmlNode::ProcessingInstruction(String::from_utf8_lossy(&text).into_owned());
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(node),
                        None => prolog.push(node),
                    }
                }
                Event::DocType(_) => {}
                Event::Eof => break,
            }
        }

        if !stack.is_empty() {
            return Err(xml_error(part, "unexpected end of document"));
        }
        let root = root.ok_or_else(|| xml_error(part, "document has no root element"))?;

        Ok(Self {
            declaration,
            prolog,
            root,
        })
    }

    /// Serialize the document back to a string
    pub fn to_xml(&self) -> Result<String, DeckError> {
        let mut writer = Writer::new(Vec::new());
        self.write_all(&mut writer)
            .map_err(|e| xml_error("<serialize>", e))?;
        String::from_utf8(writer.into_inner()).map_err(|e| xml_error("<serialize>", e))
    }

    fn write_all(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), quick_xml::Error> {
        if let Some(decl) = &self.declaration {
            writer.write_event(Event::Decl(BytesDecl::new(
                &decl.version,
                decl.encoding.as_deref(),
                decl.standalone.as_deref(),
            )))?;
            writer.get_mut().extend_from_slice(b"\r\n");
        }
        for node in &self.prolog {
            match node {
                XmlNode::Comment(t) => {
                    writer.write_event(Event::Comment(BytesText::from_escaped(t.as_str())))?
                }
                XmlNode::ProcessingInstruction(t) => {
                    writer.write_event(Event::PI(BytesText::from_escaped(t.as_str())))?
                }
                _ => {}
            }
        }
        self.root.write_to(writer)
    }
}

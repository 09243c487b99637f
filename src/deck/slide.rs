/*!
 * One slide and its notes, with addressable text containers.
 *
 * A container is a `txBody` element: the body of a shape (recursing
 * through group shapes), the body of a table cell, or the body
 * placeholder of the notes slide. Containers are addressed by the path
 * of child indices from the part root, which stays valid for the whole
 * lifetime of the slide because translation only rewrites paragraph
 * contents, never the shape tree.
 */

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::deck::xml::{XmlDocument, XmlElement, XmlNode};
use crate::errors::DeckError;

/// Where a text container lives on the slide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ContainerKind {
    /// Text body of a shape or placeholder
    TextFrame,
    /// Text body of a table cell
    TableCell,
    /// Body placeholder of the notes slide
    Notes,
}

impl ContainerKind {
    /// Single-letter code used in slot identifiers
    pub fn code(&self) -> char {
        match self {
            Self::TextFrame => 'T',
            Self::TableCell => 'C',
            Self::Notes => 'N',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'T' => Some(Self::TextFrame),
            'C' => Some(Self::TableCell),
            'N' => Some(Self::Notes),
            _ => None,
        }
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::TextFrame => "text frame",
            Self::TableCell => "table cell",
            Self::Notes => "notes",
        };
        write!(f, "{}", label)
    }
}

/// Which part of the slide a container belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    Slide,
    Notes,
}

/// A text body found on the slide
#[derive(Debug, Clone, PartialEq)]
pub struct TextContainer {
    pub kind: ContainerKind,
    /// Index among containers of the same kind, in document order
    pub index: usize,
    pub part: PartKind,
    path: Vec<usize>,
}

/// A slide part plus its optional notes part
#[derive(Debug, Clone)]
pub struct Slide {
    /// 1-based position in the presentation
    pub number: usize,
    document: XmlDocument,
    notes: Option<XmlDocument>,
    containers: Vec<TextContainer>,
    table_count: usize,
}

impl Slide {
    /// Build a slide from the XML of its part and of its notes part
    pub fn from_xml(number: usize, slide_xml: &str, notes_xml: Option<&str>) -> Result<Self, DeckError> {
        let document = XmlDocument::parse_part(slide_xml, &format!("slide {}", number))?;
        let notes = match notes_xml {
            Some(xml) => Some(XmlDocument::parse_part(xml, &format!("notes of slide {}", number))?),
            None => None,
        };
        Ok(Self::from_documents(number, document, notes))
    }

    pub fn from_documents(number: usize, document: XmlDocument, notes: Option<XmlDocument>) -> Self {
        let mut scan = ContainerScan::default();
        let mut path = Vec::new();
        scan.walk(&document.root, &mut path);

        if let Some(notes_doc) = &notes {
            let mut path = Vec::new();
            scan.walk_notes(&notes_doc.root, &mut path);
        }

        Self {
            number,
            document,
            notes,
            containers: scan.containers,
            table_count: scan.tables,
        }
    }

    pub fn containers(&self) -> &[TextContainer] {
        &self.containers
    }

    pub fn table_count(&self) -> usize {
        self.table_count
    }

    pub fn has_notes(&self) -> bool {
        self.notes.is_some()
    }

    pub fn document(&self) -> &XmlDocument {
        &self.document
    }

    pub fn notes_document(&self) -> Option<&XmlDocument> {
        self.notes.as_ref()
    }

    /// The `txBody` element of a container
    pub fn text_body(&self, container: &TextContainer) -> Option<&XmlElement> {
        let doc = match container.part {
            PartKind::Slide => &self.document,
            PartKind::Notes => self.notes.as_ref()?,
        };
        doc.root.at_path(&container.path)
    }

    pub fn text_body_mut(&mut self, container: &TextContainer) -> Option<&mut XmlElement> {
        let doc = match container.part {
            PartKind::Slide => &mut self.document,
            PartKind::Notes => self.notes.as_mut()?,
        };
        doc.root.at_path_mut(&container.path)
    }

    /// The n-th paragraph of a container, counting only `a:p` children
    pub fn paragraph_mut(&mut self, container: &TextContainer, paragraph: usize) -> Option<&mut XmlElement> {
        self.text_body_mut(container)?
            .elements_mut()
            .filter(|e| e.is("p"))
            .nth(paragraph)
    }

    /// Plain text of every paragraph on the slide, one line per paragraph
    pub fn plain_text(&self) -> String {
        let mut lines = Vec::new();
        for container in &self.containers {
            if container.part == PartKind::Notes {
                continue;
            }
            if let Some(body) = self.text_body(container) {
                for paragraph in body.children_named("p") {
                    let text = paragraph_text(paragraph);
                    if !text.trim().is_empty() {
                        lines.push(text);
                    }
                }
            }
        }
        lines.join("\n")
    }

    pub fn slide_xml(&self) -> Result<String, DeckError> {
        self.document.to_xml()
    }

    pub fn notes_xml(&self) -> Result<Option<String>, DeckError> {
        self.notes.as_ref().map(|doc| doc.to_xml()).transpose()
    }
}

fn paragraph_text(paragraph: &XmlElement) -> String {
    let mut text = String::new();
    for child in paragraph.elements() {
        match child.local_name() {
            "r" | "fld" => {
                if let Some(t) = child.child("t") {
                    text.push_str(&t.text());
                }
            }
            "br" => text.push('\n'),
            _ => {}
        }
    }
    text
}

#[derive(Default)]
struct ContainerScan {
    containers: Vec<TextContainer>,
    frames: usize,
    cells: usize,
    notes: usize,
    tables: usize,
}

impl ContainerScan {
    fn walk(&mut self, element: &XmlElement, path: &mut Vec<usize>) {
        if element.is("tbl") {
            self.tables += 1;
        }
        for (idx, node) in element.children.iter().enumerate() {
            let XmlNode::Element(child) = node else {
                continue;
            };
            path.push(idx);
            if child.is("txBody") {
                let kind = if element.is("tc") {
                    ContainerKind::TableCell
                } else {
                    ContainerKind::TextFrame
                };
                self.add(kind, PartKind::Slide, path.clone());
            } else {
                self.walk(child, path);
            }
            path.pop();
        }
    }

    fn walk_notes(&mut self, element: &XmlElement, path: &mut Vec<usize>) {
        for (idx, node) in element.children.iter().enumerate() {
            let XmlNode::Element(child) = node else {
                continue;
            };
            path.push(idx);
            if child.is("sp") {
                if is_body_placeholder(child) {
                    if let Some(body_idx) = child.children.iter().position(
                        |n| matches!(n, XmlNode::Element(e) if e.is("txBody")),
                    ) {
                        path.push(body_idx);
                        self.add(ContainerKind::Notes, PartKind::Notes, path.clone());
                        path.pop();
                    }
                }
            } else {
                self.walk_notes(child, path);
            }
            path.pop();
        }
    }

    fn add(&mut self, kind: ContainerKind, part: PartKind, path: Vec<usize>) {
        let counter = match kind {
            ContainerKind::TextFrame => &mut self.frames,
            ContainerKind::TableCell => &mut self.cells,
            ContainerKind::Notes => &mut self.notes,
        };
        let index = *counter;
        *counter += 1;
        self.containers.push(TextContainer {
            kind,
            index,
            part,
            path,
        });
    }
}

fn is_body_placeholder(shape: &XmlElement) -> bool {
    shape
        .descend(&["nvSpPr", "nvPr", "ph"])
        .and_then(|ph| ph.attr("type"))
        .is_some_and(|t| t == "body")
}

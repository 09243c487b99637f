/*!
 * PPTX package access.
 *
 * The package is read fully into memory: every zip entry keeps its name,
 * bytes and compression method so that saving writes the same archive back
 * with only the translated parts replaced. Slide order comes from the
 * `sldIdLst` of `ppt/presentation.xml` resolved through its relationships;
 * notes parts are found through each slide's own relationships.
 */

use std::collections::HashMap;
use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use log::debug;
use quick_xml::Reader;
use quick_xml::events::Event;
use tempfile::NamedTempFile;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::deck::slide::Slide;
use crate::deck::xml::{XmlDocument, local_name};
use crate::errors::DeckError;

const PRESENTATION_PART: &str = "ppt/presentation.xml";
const PRESENTATION_RELS: &str = "ppt/_rels/presentation.xml.rels";
const SLIDE_REL_TYPE: &str = "/relationships/slide";
const NOTES_REL_TYPE: &str = "/relationships/notesSlide";

/// One stored zip entry
#[derive(Debug, Clone)]
struct PackageEntry {
    name: String,
    data: Vec<u8>,
    compression: CompressionMethod,
}

/// Location of a slide and its notes inside the package
#[derive(Debug, Clone, PartialEq)]
pub struct SlidePart {
    /// 1-based presentation order
    pub number: usize,
    pub part_name: String,
    pub notes_part: Option<String>,
}

/// A relationship entry from a `.rels` part
#[derive(Debug, Clone, PartialEq)]
struct Relationship {
    id: String,
    rel_type: String,
    target: String,
    external: bool,
}

/// An opened presentation package
#[derive(Debug, Clone)]
pub struct DeckPackage {
    entries: Vec<PackageEntry>,
    index: HashMap<String, usize>,
    slides: Vec<SlidePart>,
}

impl DeckPackage {
    /// Open a `.pptx` file from disk
    pub fn open(path: &Path) -> Result<Self, DeckError> {
        let is_pptx = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pptx"));
        if !is_pptx {
            return Err(DeckError::Unsupported(format!(
                "{} is not a .pptx file",
                path.display()
            )));
        }
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Read a package from any seekable source
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self, DeckError> {
        let mut archive = ZipArchive::new(reader)?;
        let mut entries = Vec::with_capacity(archive.len());
        let mut index = HashMap::new();

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)?;
            let name = file.name().to_string();
            index.insert(name.clone(), entries.len());
            entries.push(PackageEntry {
                name,
                data,
                compression: file.compression(),
            });
        }

        let mut package = Self {
            entries,
            index,
            slides: Vec::new(),
        };
        package.slides = package.resolve_slides()?;
        debug!("Opened package with {} parts and {} slides", package.entries.len(), package.slides.len());
        Ok(package)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DeckError> {
        Self::from_reader(Cursor::new(bytes))
    }

    pub fn slide_parts(&self) -> &[SlidePart] {
        &self.slides
    }

    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    pub fn has_part(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn part(&self, name: &str) -> Result<&[u8], DeckError> {
        self.index
            .get(name)
            .map(|&i| self.entries[i].data.as_slice())
            .ok_or_else(|| DeckError::MissingPart(name.to_string()))
    }

    pub fn part_str(&self, name: &str) -> Result<String, DeckError> {
        let bytes = self.part(name)?;
        String::from_utf8(bytes.to_vec()).map_err(|e| DeckError::Xml {
            part: name.to_string(),
            message: e.to_string(),
        })
    }

    pub fn read_xml(&self, name: &str) -> Result<XmlDocument, DeckError> {
        XmlDocument::parse_part(&self.part_str(name)?, name)
    }

    /// Replace the bytes of an existing part
    pub fn replace_part(&mut self, name: &str, data: Vec<u8>) -> Result<(), DeckError> {
        let idx = *self
            .index
            .get(name)
            .ok_or_else(|| DeckError::MissingPart(name.to_string()))?;
        self.entries[idx].data = data;
        Ok(())
    }

    /// Load the slide model for one slide part
    pub fn load_slide(&self, part: &SlidePart) -> Result<Slide, DeckError> {
        let slide_doc = self.read_xml(&part.part_name)?;
        let notes_doc = match &part.notes_part {
            Some(name) if self.has_part(name) => Some(self.read_xml(name)?),
            _ => None,
        };
        Ok(Slide::from_documents(part.number, slide_doc, notes_doc))
    }

    /// Write a committed slide back into its parts
    pub fn store_slide(&mut self, part: &SlidePart, slide: &Slide) -> Result<(), DeckError> {
        self.replace_part(&part.part_name, slide.slide_xml()?.into_bytes())?;
        if let (Some(name), Some(xml)) = (&part.notes_part, slide.notes_xml()?) {
            self.replace_part(name, xml.into_bytes())?;
        }
        Ok(())
    }

    /// Serialize the package as a zip archive
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<W, DeckError> {
        let mut zip = ZipWriter::new(writer);
        for entry in &self.entries {
            let options = FileOptions::default().compression_method(entry.compression);
            if entry.name.ends_with('/') {
                zip.add_directory(entry.name.as_str(), options)?;
                continue;
            }
            zip.start_file(entry.name.as_str(), options)?;
            zip.write_all(&entry.data)?;
        }
        Ok(zip.finish()?)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, DeckError> {
        Ok(self.write_to(Cursor::new(Vec::new()))?.into_inner())
    }

    /// Save atomically: write a temporary file next to the target, then rename
    pub fn save(&self, path: &Path) -> Result<(), DeckError> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        self.write_to(tmp.as_file_mut())?;
        tmp.as_file_mut().flush()?;
        tmp.persist(path).map_err(|e| DeckError::Io(e.error))?;
        Ok(())
    }

    fn resolve_slides(&self) -> Result<Vec<SlidePart>, DeckError> {
        if !self.has_part(PRESENTATION_PART) {
            return Err(DeckError::Unsupported(
                "package has no ppt/presentation.xml".to_string(),
            ));
        }
        let rels = if self.has_part(PRESENTATION_RELS) {
            parse_relationships(&self.part_str(PRESENTATION_RELS)?, PRESENTATION_RELS)?
        } else {
            Vec::new()
        };
        let by_id: HashMap<&str, &Relationship> = rels.iter().map(|r| (r.id.as_str(), r)).collect();

        let presentation = self.read_xml(PRESENTATION_PART)?;
        let mut part_names = Vec::new();
        if let Some(list) = presentation.root.child("sldIdLst") {
            for sld_id in list.children_named("sldId") {
                // The relationship id is the namespaced `id`; the bare `id` is numeric.
                let rel_id = sld_id
                    .attributes
                    .iter()
                    .find(|(k, _)| k.contains(':') && local_name(k) == "id")
                    .map(|(_, v)| v.as_str());
                let Some(rel_id) = rel_id else {
                    continue;
                };
                if let Some(rel) = by_id.get(rel_id) {
                    part_names.push(resolve_target("ppt", &rel.target));
                }
            }
        }

        // Packages without a slide id list fall back to relationship order.
        if part_names.is_empty() {
            let mut fallback: Vec<(Option<usize>, String)> = rels
                .iter()
                .filter(|r| r.rel_type.ends_with(SLIDE_REL_TYPE))
                .map(|r| {
                    let name = resolve_target("ppt", &r.target);
                    (trailing_number(&name), name)
                })
                .collect();
            fallback.sort();
            part_names = fallback.into_iter().map(|(_, name)| name).collect();
        }

        let mut slides = Vec::with_capacity(part_names.len());
        for (i, part_name) in part_names.into_iter().enumerate() {
            if !self.has_part(&part_name) {
                return Err(DeckError::MissingPart(part_name));
            }
            let notes_part = self.notes_part_for(&part_name)?;
            slides.push(SlidePart {
                number: i + 1,
                part_name,
                notes_part,
            });
        }
        Ok(slides)
    }

    fn notes_part_for(&self, slide_part: &str) -> Result<Option<String>, DeckError> {
        let (dir, file) = split_part_name(slide_part);
        let rels_name = format!("{}/_rels/{}.rels", dir, file);
        if !self.has_part(&rels_name) {
            return Ok(None);
        }
        let rels = parse_relationships(&self.part_str(&rels_name)?, &rels_name)?;
        Ok(rels
            .iter()
            .find(|r| !r.external && r.rel_type.ends_with(NOTES_REL_TYPE))
            .map(|r| resolve_target(dir, &r.target)))
    }
}

fn parse_relationships(xml: &str, part: &str) -> Result<Vec<Relationship>, DeckError> {
    let mut reader = Reader::from_str(xml);
    let mut rels = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"Relationship" => {
                let mut rel = Relationship {
                    id: String::new(),
                    rel_type: String::new(),
                    target: String::new(),
                    external: false,
                };
                for attr in e.attributes().flatten() {
                    let value = attr
                        .unescape_value()
                        .map(|v| v.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
                    match attr.key.as_ref() {
                        b"Id" => rel.id = value,
                        b"Type" => rel.rel_type = value,
                        b"Target" => rel.target = value,
                        b"TargetMode" => rel.external = value == "External",
                        _ => {}
                    }
                }
                rels.push(rel);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(DeckError::Xml {
                    part: part.to_string(),
                    message: format!("Error parsing relationships: {}", e),
                });
            }
            _ => {}
        }
    }

    Ok(rels)
}

fn split_part_name(name: &str) -> (&str, &str) {
    match name.rfind('/') {
        Some(pos) => (&name[..pos], &name[pos + 1..]),
        None => ("", name),
    }
}

/// Resolve a relationship target against the directory of its source part
fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

fn trailing_number(name: &str) -> Option<usize> {
    let stem = name.rsplit('/').next()?.trim_end_matches(".xml");
    let digits: String = stem
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    digits.parse().ok()
}

/*!
 * Common test utilities for the deckglot test suite
 */

use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use tempfile::TempDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};


pub use scripted_translator::ScriptedTranslator;

const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;
const REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const SLIDE_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
const NOTES_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesSlide";

/// Bytes of the media part every fixture carries; saving must keep them
pub const MEDIA_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nnot really an image";
pub const MEDIA_PART: &str = "ppt/media/image1.png";

/// Route `log` output through the test harness; safe to call repeatedly
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// A plain run
pub fn run(text: &str) -> String {
    format!(r#"<a:r><a:rPr lang="en-US" dirty="0"/><a:t>{}</a:t></a:r>"#, escape(text))
}

/// A bold run
pub fn bold(text: &str) -> String {
    format!(r#"<a:r><a:rPr lang="en-US" b="1" dirty="0"/><a:t>{}</a:t></a:r>"#, escape(text))
}

/// A red run
pub fn red(text: &str) -> String {
    format!(
        r#"<a:r><a:rPr lang="en-US" dirty="0"><a:solidFill><a:srgbClr val="FF0000"/></a:solidFill></a:rPr><a:t>{}</a:t></a:r>"#,
        escape(text)
    )
}

/// A paragraph made of the given runs
pub fn paragraph(runs: &[String]) -> String {
    format!("<a:p>{}</a:p>", runs.concat())
}

/// A paragraph with no runs
pub fn empty_paragraph() -> String {
    r#"<a:p><a:endParaRPr lang="en-US"/></a:p>"#.to_string()
}

/// A text box shape holding the given paragraphs
pub fn text_box(id: usize, paragraphs: &[String]) -> String {
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="TextBox {id}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr wrap="square"/><a:lstStyle/>{}</p:txBody></p:sp>"#,
        paragraphs.concat()
    )
}

/// A table whose cells each hold one plain paragraph
pub fn table(id: usize, rows: &[&[&str]]) -> String {
    let rows: String = rows
        .iter()
        .map(|cells| {
            let cells: String = cells
                .iter()
                .map(|text| {
                    format!(
                        "<a:tc><a:txBody><a:bodyPr/><a:lstStyle/>{}</a:txBody><a:tcPr/></a:tc>",
                        paragraph(&[run(text)])
                    )
                })
                .collect();
            format!(r#"<a:tr h="370840">{}</a:tr>"#, cells)
        })
        .collect();
    format!(
        r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="{id}" name="Table {id}"/><p:cNvGraphicFramePr/><p:nvPr/></p:nvGraphicFramePr><p:xfrm/><a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/table"><a:tbl><a:tblPr/><a:tblGrid/>{}</a:tbl></a:graphicData></a:graphic></p:graphicFrame>"#,
        rows
    )
}

/// One slide of a fixture deck
#[derive(Debug, Clone, Default)]
pub struct FixtureSlide {
    pub shapes: Vec<String>,
    pub notes: Option<Vec<String>>,
}

impl FixtureSlide {
    pub fn new(shapes: Vec<String>) -> Self {
        Self { shapes, notes: None }
    }

    /// Slide with a single text box of plain paragraphs
    pub fn with_text(lines: &[&str]) -> Self {
        let paragraphs: Vec<String> = lines.iter().map(|l| paragraph(&[run(l)])).collect();
        Self::new(vec![text_box(2, &paragraphs)])
    }

    pub fn notes(mut self, paragraphs: Vec<String>) -> Self {
        self.notes = Some(paragraphs);
        self
    }

    pub fn slide_xml(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld {NS}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#,
            self.shapes.concat()
        )
    }

    /// Notes part XML, when the slide has notes
    pub fn notes_part_xml(&self) -> Option<String> {
        self.notes.as_ref().map(|notes| self.notes_xml(notes))
    }

    fn notes_xml(&self, paragraphs: &[String]) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:notes {NS}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/><p:sp><p:nvSpPr><p:cNvPr id="2" name="Slide Image Placeholder 1"/><p:cNvSpPr/><p:nvPr><p:ph type="sldImg"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp><p:sp><p:nvSpPr><p:cNvPr id="3" name="Notes Placeholder 2"/><p:cNvSpPr/><p:nvPr><p:ph type="body" idx="1"/></p:nvPr></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:lstStyle/>{}</p:txBody></p:sp></p:spTree></p:cSld></p:notes>"#,
            paragraphs.concat()
        )
    }
}

/// Builds minimal but well-formed .pptx packages
#[derive(Debug, Clone, Default)]
pub struct DeckFixture {
    slides: Vec<FixtureSlide>,
}

impl DeckFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slide(mut self, slide: FixtureSlide) -> Self {
        self.slides.push(slide);
        self
    }

    /// `count` slides whose only text is "Slide N text"
    pub fn numbered(count: usize) -> Self {
        (1..=count).fold(Self::new(), |deck, n| {
            deck.slide(FixtureSlide::with_text(&[&format!("Slide {} text", n)]))
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let deflated = FileOptions::default().compression_method(CompressionMethod::Deflated);
        let stored = FileOptions::default().compression_method(CompressionMethod::Stored);

        let mut overrides = String::from(
            r#"<Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>"#,
        );
        for (i, slide) in self.slides.iter().enumerate() {
            let n = i + 1;
            overrides.push_str(&format!(
                r#"<Override PartName="/ppt/slides/slide{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#
            ));
            if slide.notes.is_some() {
                overrides.push_str(&format!(
                    r#"<Override PartName="/ppt/notesSlides/notesSlide{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.notesSlide+xml"/>"#
                ));
            }
        }
        zip.start_file("[Content_Types].xml", deflated)?;
        write!(
            zip,
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/>{}</Types>"#,
            overrides
        )?;

        zip.start_file("_rels/.rels", deflated)?;
        write!(
            zip,
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="{REL_NS}"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/></Relationships>"#
        )?;

        let ids: String = (1..=self.slides.len())
            .map(|n| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 255 + n, n + 1))
            .collect();
        zip.start_file("ppt/presentation.xml", deflated)?;
        write!(
            zip,
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation {NS}><p:sldIdLst>{}</p:sldIdLst><p:sldSz cx="12192000" cy="6858000"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#,
            ids
        )?;

        let rels: String = (1..=self.slides.len())
            .map(|n| {
                format!(
                    r#"<Relationship Id="rId{}" Type="{SLIDE_REL}" Target="slides/slide{}.xml"/>"#,
                    n + 1,
                    n
                )
            })
            .collect();
        zip.start_file("ppt/_rels/presentation.xml.rels", deflated)?;
        write!(
            zip,
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="{REL_NS}">{}</Relationships>"#,
            rels
        )?;

        for (i, slide) in self.slides.iter().enumerate() {
            let n = i + 1;
            zip.start_file(format!("ppt/slides/slide{n}.xml"), deflated)?;
            zip.write_all(slide.slide_xml().as_bytes())?;

            if let Some(notes) = &slide.notes {
                zip.start_file(format!("ppt/slides/_rels/slide{n}.xml.rels"), deflated)?;
                write!(
                    zip,
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="{REL_NS}"><Relationship Id="rId2" Type="{NOTES_REL}" Target="../notesSlides/notesSlide{n}.xml"/></Relationships>"#
                )?;
                zip.start_file(format!("ppt/notesSlides/notesSlide{n}.xml"), deflated)?;
                zip.write_all(slide.notes_xml(notes).as_bytes())?;
            }
        }

        zip.start_file(MEDIA_PART, stored)?;
        zip.write_all(MEDIA_BYTES)?;

        Ok(zip.finish()?.into_inner())
    }

    /// Write the deck into `dir` under `name`
    pub fn write(&self, dir: &Path, name: &str) -> Result<PathBuf> {
        let path = dir.join(name);
        fs::write(&path, self.to_bytes()?)?;
        Ok(path)
    }
}

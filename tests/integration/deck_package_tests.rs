/*!
 * Integration tests for reading and writing presentation packages
 */

use std::io::{Cursor, Write};
use std::path::Path;

use anyhow::Result;
use zip::ZipWriter;
use zip::write::FileOptions;

use deckglot::deck::DeckPackage;
use deckglot::errors::DeckError;

use crate::common::{self, DeckFixture, FixtureSlide, MEDIA_BYTES, MEDIA_PART, bold, paragraph, run, table, text_box};

fn sample_deck() -> DeckFixture {
    DeckFixture::new()
        .slide(FixtureSlide::with_text(&["Welcome", "Agenda"]))
        .slide(
            FixtureSlide::new(vec![
                text_box(2, &[paragraph(&[run("Costs are "), bold("down")])]),
                table(3, &[&["Q1", "Q2"]]),
            ])
            .notes(vec![paragraph(&[run("Pause here.")])]),
        )
        .slide(FixtureSlide::with_text(&["Thank you"]))
}

/// Slides come back in presentation order with their notes
#[test]
fn test_open_withFixture_shouldResolveSlidesAndNotes() -> Result<()> {
    let package = DeckPackage::from_bytes(&sample_deck().to_bytes()?)?;

    assert_eq!(package.slide_count(), 3);
    let parts = package.slide_parts();
    assert_eq!(parts[0].number, 1);
    assert_eq!(parts[1].part_name, "ppt/slides/slide2.xml");
    assert_eq!(parts[1].notes_part.as_deref(), Some("ppt/notesSlides/notesSlide2.xml"));
    assert_eq!(parts[2].notes_part, None);

    let slide = package.load_slide(&parts[1])?;
    assert!(slide.has_notes());
    assert!(slide.plain_text().contains("Costs are down"));
    assert!(!slide.plain_text().contains("Pause here."));
    Ok(())
}

/// Parts nobody touched survive a save byte for byte
#[test]
fn test_saveAndReopen_withoutChanges_shouldKeepParts() -> Result<()> {
    let original_bytes = sample_deck().to_bytes()?;
    let original = DeckPackage::from_bytes(&original_bytes)?;
    let reopened = DeckPackage::from_bytes(&original.to_bytes()?)?;

    for name in [
        "[Content_Types].xml",
        "ppt/presentation.xml",
        "ppt/slides/slide1.xml",
        "ppt/notesSlides/notesSlide2.xml",
        MEDIA_PART,
    ] {
        assert_eq!(original.part(name)?, reopened.part(name)?, "part {} changed", name);
    }
    assert_eq!(reopened.part(MEDIA_PART)?, MEDIA_BYTES);
    Ok(())
}

/// Storing an unchanged slide keeps its text and structure
#[test]
fn test_storeSlide_withUnchangedSlide_shouldKeepContent() -> Result<()> {
    let mut package = DeckPackage::from_bytes(&sample_deck().to_bytes()?)?;
    let part = package.slide_parts()[1].clone();
    let before = package.load_slide(&part)?;

    package.store_slide(&part, &before)?;
    let reopened = DeckPackage::from_bytes(&package.to_bytes()?)?;
    let after = reopened.load_slide(&part)?;

    assert_eq!(before.plain_text(), after.plain_text());
    assert_eq!(before.containers().len(), after.containers().len());
    assert_eq!(after.table_count(), 1);
    assert_eq!(reopened.part(MEDIA_PART)?, MEDIA_BYTES);
    Ok(())
}

/// Saving goes to disk and can be opened again
#[test]
fn test_save_toTempDir_shouldWriteReadablePackage() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = sample_deck().write(temp_dir.path(), "deck.pptx")?;
    let package = DeckPackage::open(&input)?;

    let output = temp_dir.path().join("deck_copy.pptx");
    package.save(&output)?;
    let reopened = DeckPackage::open(&output)?;
    assert_eq!(reopened.slide_count(), 3);
    Ok(())
}

#[test]
fn test_open_withMissingFile_shouldBeIoError() {
    let result = DeckPackage::open(Path::new("/definitely/not/here.pptx"));
    assert!(matches!(result, Err(DeckError::Io(_))));
}

#[test]
fn test_fromBytes_withGarbage_shouldBeZipError() {
    let result = DeckPackage::from_bytes(b"this is not a zip archive");
    assert!(matches!(result, Err(DeckError::Zip(_))));
}

#[test]
fn test_fromBytes_withoutPresentationPart_shouldBeUnsupported() -> Result<()> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("word/document.xml", FileOptions::default())?;
    zip.write_all(b"<w:document/>")?;
    let bytes = zip.finish()?.into_inner();

    let result = DeckPackage::from_bytes(&bytes);
    assert!(matches!(result, Err(DeckError::Unsupported(_))));
    Ok(())
}

#[test]
fn test_loadSlide_withBrokenXml_shouldBeXmlError() -> Result<()> {
    let mut package = DeckPackage::from_bytes(&sample_deck().to_bytes()?)?;
    package.replace_part("ppt/slides/slide3.xml", b"<p:sld><p:cSld>".to_vec())?;
    let part = package.slide_parts()[2].clone();

    let result = package.load_slide(&part);
    assert!(matches!(result, Err(DeckError::Xml { .. })));
    Ok(())
}

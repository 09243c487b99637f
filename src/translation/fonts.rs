/*!
 * Script detection and font slot assignment for rebuilt runs.
 *
 * DrawingML keeps three typeface slots per run: `latin`, `ea` (East
 * Asian) and `cs` (complex script). After splicing, the dominant script
 * of each new run decides which slot gets a script-appropriate font.
 * Size, colour and weight are never touched.
 */

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::deck::xml::{XmlElement, XmlNode, qualified};
use crate::language_utils::primary_subtag;

/// Writing system of a piece of text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Script {
    Latin,
    Cyrillic,
    /// Han ideographs and Japanese kana
    Cjk,
    Hangul,
    Arabic,
    Thai,
    Devanagari,
    /// Letters of a script without a font rule
    Unclassified,
}

const CLASSIFIED: [Script; 7] = [
    Script::Latin,
    Script::Cyrillic,
    Script::Cjk,
    Script::Hangul,
    Script::Arabic,
    Script::Thai,
    Script::Devanagari,
];

/// Typeface slot of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontSlot {
    Latin,
    EastAsian,
    ComplexScript,
}

impl FontSlot {
    pub fn element_name(&self) -> &'static str {
        match self {
            Self::Latin => "latin",
            Self::EastAsian => "ea",
            Self::ComplexScript => "cs",
        }
    }
}

impl Script {
    pub fn slot(&self) -> Option<FontSlot> {
        match self {
            Self::Latin | Self::Cyrillic => Some(FontSlot::Latin),
            Self::Cjk | Self::Hangul => Some(FontSlot::EastAsian),
            Self::Arabic | Self::Thai | Self::Devanagari => Some(FontSlot::ComplexScript),
            Self::Unclassified => None,
        }
    }
}

/// Script of a single character; `None` for digits, punctuation and spaces
pub fn script_of(c: char) -> Option<Script> {
    let cp = c as u32;
    let script = match cp {
        0x0041..=0x005A | 0x0061..=0x007A | 0x00C0..=0x024F | 0x1E00..=0x1EFF => Script::Latin,
        0x00AA | 0x00BA => Script::Latin,
        0x0400..=0x052F => Script::Cyrillic,
        0x0600..=0x06FF | 0x0750..=0x077F | 0x08A0..=0x08FF | 0xFB50..=0xFDFF | 0xFE70..=0xFEFF => {
            Script::Arabic
        }
        0x0900..=0x097F => Script::Devanagari,
        0x0E00..=0x0E7F => Script::Thai,
        0x1100..=0x11FF | 0x3130..=0x318F | 0xAC00..=0xD7AF => Script::Hangul,
        0x3040..=0x30FF | 0x31F0..=0x31FF | 0xFF66..=0xFF9F => Script::Cjk,
        0x3400..=0x4DBF | 0x4E00..=0x9FFF | 0xF900..=0xFAFF | 0x20000..=0x2FFFF => Script::Cjk,
        _ if c.is_alphabetic() => Script::Unclassified,
        _ => return None,
    };
    Some(script)
}

fn is_kana(c: char) -> bool {
    matches!(c as u32, 0x3040..=0x30FF | 0x31F0..=0x31FF | 0xFF66..=0xFF9F)
}

/// Dominant script of the letters in `text`; `None` when there are none
pub fn detect_script(text: &str) -> Option<Script> {
    let mut counts: HashMap<Script, usize> = HashMap::new();
    for script in text.chars().filter_map(script_of) {
        *counts.entry(script).or_default() += 1;
    }
    let mut best: Option<(Script, usize)> = None;
    for script in CLASSIFIED.iter().chain(std::iter::once(&Script::Unclassified)) {
        let count = counts.get(script).copied().unwrap_or(0);
        if count > 0 && best.is_none_or(|(_, c)| count > c) {
            best = Some((*script, count));
        }
    }
    best.map(|(script, _)| script)
}

/// What the resolver did to one run
#[derive(Debug, Clone, PartialEq)]
pub enum FontResolution {
    /// A typeface was written into the slot
    Applied {
        script: Script,
        slot: FontSlot,
        font: String,
    },
    /// The script keeps its inherited font
    Inherited(Script),
    /// Only digits, punctuation or whitespace
    Neutral,
    /// Letters of an unclassified script; font left unchanged
    Unknown,
}

/// Script to font lookup for one target language
#[derive(Debug, Clone)]
pub struct FontResolver {
    fonts: HashMap<Script, String>,
    japanese_target: bool,
}

impl FontResolver {
    /// Default table for a target language, with per-script overrides
    pub fn new(target_language: &str, overrides: &HashMap<Script, String>) -> Self {
        let japanese_target = primary_subtag(target_language) == "ja";
        let mut fonts = HashMap::new();
        fonts.insert(Script::Cyrillic, "Calibri".to_string());
        fonts.insert(
            Script::Cjk,
            if japanese_target { "Yu Gothic" } else { "Microsoft YaHei" }.to_string(),
        );
        fonts.insert(Script::Hangul, "Malgun Gothic".to_string());
        fonts.insert(Script::Arabic, "Traditional Arabic".to_string());
        fonts.insert(Script::Thai, "Leelawadee UI".to_string());
        fonts.insert(Script::Devanagari, "Nirmala UI".to_string());

        for (script, font) in overrides {
            if font.trim().is_empty() {
                fonts.remove(script);
            } else {
                fonts.insert(*script, font.clone());
            }
        }

        Self {
            fonts,
            japanese_target,
        }
    }

    pub fn font_for(&self, script: Script) -> Option<&str> {
        self.fonts.get(&script).map(String::as_str)
    }

    fn font_for_text(&self, script: Script, text: &str) -> Option<&str> {
        // Kana only occurs in Japanese; do not render it with a Chinese face.
        if script == Script::Cjk && !self.japanese_target && text.chars().any(is_kana) {
            return Some("Yu Gothic");
        }
        self.font_for(script)
    }

    /// Write the font for `text`'s script into a run properties element
    pub fn apply(&self, properties: &mut XmlElement, text: &str) -> FontResolution {
        let Some(script) = detect_script(text) else {
            return FontResolution::Neutral;
        };
        let Some(slot) = script.slot() else {
            return FontResolution::Unknown;
        };
        let Some(font) = self.font_for_text(script, text).map(str::to_string) else {
            return FontResolution::Inherited(script);
        };

        set_typeface(properties, slot, &font);
        FontResolution::Applied { script, slot, font }
    }
}

/// Schema position of run property children
fn property_rank(local: &str) -> usize {
    match local {
        "ln" => 0,
        "noFill" | "solidFill" | "gradFill" | "blipFill" | "pattFill" | "grpFill" => 1,
        "effectLst" | "effectDag" => 2,
        "highlight" => 3,
        "uLnTx" | "uLn" => 4,
        "uFillTx" | "uFill" => 5,
        "latin" => 6,
        "ea" => 7,
        "cs" => 8,
        "sym" => 9,
        "hlinkClick" => 10,
        "hlinkMouseOver" => 11,
        "rtl" => 12,
        _ => 13,
    }
}

fn set_typeface(properties: &mut XmlElement, slot: FontSlot, font: &str) {
    let local = slot.element_name();
    if let Some(existing) = properties.child_mut(local) {
        existing.set_attr("typeface", font);
        return;
    }

    let mut element = XmlElement::new(qualified(properties.prefix(), local));
    element.set_attr("typeface", font);
    // charset describes the Latin face only
    if slot != FontSlot::Latin {
        if let Some(pitch) = properties.child("latin").and_then(|latin| latin.attr("pitchFamily")) {
            element.set_attr("pitchFamily", pitch);
        }
    }

    let rank = property_rank(local);
    let position = properties
        .children
        .iter()
        .position(|node| matches!(node, XmlNode::Element(e) if property_rank(e.local_name()) > rank))
        .unwrap_or(properties.children.len());
    properties.children.insert(position, XmlNode::Element(element));
}

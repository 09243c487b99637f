/*!
 * Style run extraction.
 *
 * Turns a text container into language-agnostic paragraph models: every
 * run keeps its text fragment, a comparable style fingerprint and a copy of
 * its original run properties, so a translated paragraph can be rebuilt
 * with the same look. Line breaks become runs whose fragment is `"\n"`;
 * fields (slide numbers, dates) are not runs and are left where they are.
 */

use std::collections::HashMap;

use serde::Serialize;

use crate::deck::xml::XmlElement;
use crate::errors::ExtractionError;

/// The visible style of a run, comparable across runs
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
pub struct StyleFingerprint {
    /// Latin typeface
    pub font: Option<String>,
    /// Size in hundredths of a point
    pub size: Option<u32>,
    /// `RRGGBB`, `scheme:<name>` or `preset:<name>`
    pub color: Option<String>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    /// Language tag, e.g. `en-US`
    pub lang: Option<String>,
}

impl StyleFingerprint {
    /// Read a fingerprint from an `a:rPr` (or `a:endParaRPr`) element
    pub fn from_properties(properties: Option<&XmlElement>) -> Self {
        let Some(rpr) = properties else {
            return Self::default();
        };

        let font = rpr
            .child("latin")
            .and_then(|latin| latin.attr("typeface"))
            .map(str::to_string);
        let color = rpr
            .child("solidFill")
            .and_then(color_of)
            .or_else(|| {
                rpr.descend(&["gradFill", "gsLst"])
                    .and_then(|list| list.child("gs"))
                    .and_then(color_of)
            });

        Self {
            font,
            size: rpr.attr("sz").and_then(|sz| sz.parse().ok()),
            color,
            bold: is_on(rpr.attr("b")),
            italic: is_on(rpr.attr("i")),
            underline: rpr.attr("u").is_some_and(|u| u != "none"),
            lang: rpr.attr("lang").map(str::to_string),
        }
    }
}

fn is_on(value: Option<&str>) -> bool {
    matches!(value, Some("1") | Some("true"))
}

fn color_of(fill: &XmlElement) -> Option<String> {
    let color = fill.elements().next()?;
    let value = match color.local_name() {
        "srgbClr" => color.attr("val")?.to_uppercase(),
        "schemeClr" => format!("scheme:{}", color.attr("val")?),
        "sysClr" => color
            .attr("lastClr")
            .map(str::to_uppercase)
            .unwrap_or_else(|| format!("system:{}", color.attr("val").unwrap_or_default())),
        "prstClr" => format!("preset:{}", color.attr("val")?),
        _ => return None,
    };
    Some(value)
}

/// Kind of a modelled run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunKind {
    Text,
    Break,
}

/// One run of a paragraph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunModel {
    /// Position of the run within its paragraph
    pub run_id: usize,
    pub kind: RunKind,
    pub text: String,
    pub style: StyleFingerprint,
    /// Original run properties element, reused when runs are rebuilt
    #[serde(skip)]
    pub properties: Option<XmlElement>,
}

impl RunModel {
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// A contiguous stretch of runs sharing one style
#[derive(Debug, Clone, PartialEq)]
pub struct StyleSpan {
    pub style: StyleFingerprint,
    pub first_run: usize,
    pub last_run: usize,
    /// Character offset of the span in the paragraph text
    pub start: usize,
    /// Length in characters
    pub len: usize,
    pub text: String,
}

impl StyleSpan {
    /// Span boundaries as fractions of the paragraph length
    pub fn fractions(&self, total: usize) -> (f64, f64) {
        if total == 0 {
            return (0.0, 1.0);
        }
        let total = total as f64;
        (self.start as f64 / total, (self.start + self.len) as f64 / total)
    }

    pub fn run_count(&self) -> usize {
        self.last_run - self.first_run + 1
    }
}

/// Extracted form of one paragraph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParagraphModel {
    /// Index of the paragraph within its container
    pub index: usize,
    pub runs: Vec<RunModel>,
}

impl ParagraphModel {
    /// Concatenation of all run fragments
    pub fn plain_text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    pub fn char_len(&self) -> usize {
        self.runs.iter().map(RunModel::char_len).sum()
    }

    pub fn is_blank(&self) -> bool {
        self.runs.iter().all(|r| r.text.trim().is_empty())
    }

    /// Distinct fingerprints in first-appearance order
    pub fn distinct_styles(&self) -> Vec<&StyleFingerprint> {
        let mut seen: Vec<&StyleFingerprint> = Vec::new();
        for run in &self.runs {
            if !seen.contains(&&run.style) {
                seen.push(&run.style);
            }
        }
        seen
    }

    /// Style covering the most characters; the earliest one wins a tie
    pub fn dominant_style(&self) -> Option<&StyleFingerprint> {
        let mut weights: HashMap<&StyleFingerprint, usize> = HashMap::new();
        for run in &self.runs {
            *weights.entry(&run.style).or_default() += run.char_len();
        }
        let mut best: Option<(&StyleFingerprint, usize)> = None;
        for style in self.distinct_styles() {
            let weight = weights.get(style).copied().unwrap_or(0);
            if best.is_none_or(|(_, w)| weight > w) {
                best = Some((style, weight));
            }
        }
        best.map(|(style, _)| style)
    }

    /// Run whose properties serve as the base for rebuilt text
    pub fn dominant_run(&self) -> Option<usize> {
        let style = self.dominant_style()?;
        self.runs
            .iter()
            .position(|r| &r.style == style && r.kind == RunKind::Text && !r.text.is_empty())
            .or_else(|| self.runs.iter().position(|r| &r.style == style))
    }

    /// Contiguous same-style stretches covering the whole paragraph
    pub fn style_spans(&self) -> Vec<StyleSpan> {
        let mut spans: Vec<StyleSpan> = Vec::new();
        let mut offset = 0;
        for (i, run) in self.runs.iter().enumerate() {
            let len = run.char_len();
            match spans.last_mut() {
                Some(last) if last.style == run.style => {
                    last.last_run = i;
                    last.len += len;
                    last.text.push_str(&run.text);
                }
                _ => spans.push(StyleSpan {
                    style: run.style.clone(),
                    first_run: i,
                    last_run: i,
                    start: offset,
                    len,
                    text: run.text.clone(),
                }),
            }
            offset += len;
        }
        spans
    }

    /// Spans in a non-dominant style that carry visible text
    pub fn accent_spans(&self) -> Vec<StyleSpan> {
        let Some(dominant) = self.dominant_style() else {
            return Vec::new();
        };
        self.style_spans()
            .into_iter()
            .filter(|span| &span.style != dominant && !span.text.trim().is_empty())
            .collect()
    }

    /// Source text with each accent span wrapped in `<sN>…</sN>`
    pub fn style_hint(&self) -> Option<String> {
        let accents = self.accent_spans();
        if accents.is_empty() {
            return None;
        }
        let chars: Vec<char> = self.plain_text().chars().collect();
        let mut hint = String::with_capacity(chars.len() + accents.len() * 9);
        let mut cursor = 0;
        for (i, span) in accents.iter().enumerate() {
            hint.extend(&chars[cursor..span.start]);
            hint.push_str(&format!("<s{}>", i));
            hint.extend(&chars[span.start..span.start + span.len]);
            hint.push_str(&format!("</s{}>", i));
            cursor = span.start + span.len;
        }
        hint.extend(&chars[cursor..]);
        Some(hint)
    }
}

/// Result of extracting one container
#[derive(Debug, Clone, Default)]
pub struct ContainerExtraction {
    pub paragraphs: Vec<ParagraphModel>,
    pub errors: Vec<ExtractionError>,
}

/// Reads text containers into paragraph models
pub struct StyleRunExtractor;

impl StyleRunExtractor {
    /// Extract every paragraph of a `txBody`; malformed paragraphs are
    /// reported and left out
    pub fn extract(body: &XmlElement) -> ContainerExtraction {
        let mut result = ContainerExtraction::default();
        for (index, paragraph) in body.children_named("p").enumerate() {
            match Self::extract_paragraph(index, paragraph) {
                Ok(model) => result.paragraphs.push(model),
                Err(e) => result.errors.push(e),
            }
        }
        result
    }

    pub fn extract_paragraph(index: usize, paragraph: &XmlElement) -> Result<ParagraphModel, ExtractionError> {
        let mut runs = Vec::new();
        for child in paragraph.elements() {
            let run_id = runs.len();
            match child.local_name() {
                "r" => {
                    let text = run_text(index, run_id, child)?;
                    let properties = child.child("rPr").cloned();
                    runs.push(RunModel {
                        run_id,
                        kind: RunKind::Text,
                        text,
                        style: StyleFingerprint::from_properties(properties.as_ref()),
                        properties,
                    });
                }
                "br" => {
                    let properties = child.child("rPr").cloned();
                    runs.push(RunModel {
                        run_id,
                        kind: RunKind::Break,
                        text: "\n".to_string(),
                        style: StyleFingerprint::from_properties(properties.as_ref()),
                        properties,
                    });
                }
                _ => {}
            }
        }
        Ok(ParagraphModel { index, runs })
    }
}

fn run_text(paragraph: usize, run: usize, element: &XmlElement) -> Result<String, ExtractionError> {
    if element.child("r").is_some() {
        return Err(ExtractionError::NestedRun { paragraph, run });
    }
    let texts: Vec<&XmlElement> = element.children_named("t").collect();
    match texts.as_slice() {
        [] => Ok(String::new()),
        [t] => {
            if let Some(nested) = t.elements().next() {
                return Err(ExtractionError::NestedMarkup {
                    paragraph,
                    run,
                    element: nested.name.clone(),
                });
            }
            Ok(t.text())
        }
        many => Err(ExtractionError::MultipleTextNodes {
            paragraph,
            run,
            count: many.len(),
        }),
    }
}

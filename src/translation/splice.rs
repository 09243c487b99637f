/*!
 * Run splicing: rebuilding a styled run sequence around translated text.
 *
 * The translated text of a paragraph is cut back into runs so the slide
 * keeps its look. Single-style paragraphs are projected fractionally, one
 * output run per original run. Paragraphs with accent spans (text in a
 * style other than the dominant one) fill the text with the dominant style
 * and then place each accent by a chain of [`AnchorStrategy`]
 * implementations, strongest evidence first. Accents no strategy can place
 * with enough confidence get the conservative fallback: the first free
 * token of the translated text, or nothing when no token is free. Either
 * way the concatenated run text always equals the translated text.
 */

use log::{debug, trace};

use crate::app_config::SpliceConfig;
use crate::deck::xml::{XmlElement, XmlNode, qualified};
use crate::errors::FallbackResolution;
use crate::language_utils::same_word_order;
use crate::translation::extract::{ParagraphModel, RunKind, StyleFingerprint, StyleSpan};
use crate::translation::fonts::{FontResolution, FontResolver, Script, script_of};
use crate::translation::mapper::Anchor;
use crate::translation::unit::TermPair;

/// One run of a rebuilt paragraph
#[derive(Debug, Clone, PartialEq)]
pub struct SplicedRun {
    pub text: String,
    pub style: StyleFingerprint,
    /// Original run whose properties are reused
    pub source_run: Option<usize>,
    /// Kept one-to-one with `source_run`; only such runs keep hyperlinks
    pub one_to_one: bool,
}

/// An accent span that fell through to the conservative fallback
#[derive(Debug, Clone, PartialEq)]
pub struct SpliceAmbiguity {
    pub span_text: String,
    pub resolution: FallbackResolution,
}

/// How an accent span got its place in the translated text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementSource {
    /// Accepted from the named anchor strategy
    Strategy(&'static str),
    /// First-token fallback, or dropped
    Fallback,
}

/// Where one accent span ended up
#[derive(Debug, Clone, PartialEq)]
pub struct SpanPlacement {
    pub span_text: String,
    /// Translated text now carrying the span's style; empty when dropped
    pub placed_text: String,
    pub source: PlacementSource,
}

impl SpanPlacement {
    /// Placed from evidence in the answer itself: an echoed tag or the
    /// span's own text
    pub fn is_confirmed(&self) -> bool {
        matches!(self.source, PlacementSource::Strategy("explicit" | "keyword"))
    }
}

/// Result of splicing one paragraph
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpliceOutcome {
    pub runs: Vec<SplicedRun>,
    pub ambiguities: Vec<SpliceAmbiguity>,
    /// One entry per accent span, in source order; empty when the
    /// paragraph was not relocated
    pub placements: Vec<SpanPlacement>,
}

impl SpliceOutcome {
    /// Concatenated run text
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

/// What the splicer needs to know about one paragraph
#[derive(Debug, Clone, Copy)]
pub struct SpliceInput<'a> {
    pub paragraph: &'a ParagraphModel,
    pub translated: &'a str,
    /// Positions of `<sN>` tags echoed by the service
    pub anchors: &'a [Anchor],
    pub terminology: &'a [TermPair],
    pub source_language: &'a str,
    pub target_language: &'a str,
}

impl<'a> SpliceInput<'a> {
    pub fn new(paragraph: &'a ParagraphModel, translated: &'a str) -> Self {
        Self {
            paragraph,
            translated,
            anchors: &[],
            terminology: &[],
            source_language: "",
            target_language: "",
        }
    }

    pub fn with_anchors(mut self, anchors: &'a [Anchor]) -> Self {
        self.anchors = anchors;
        self
    }

    pub fn with_terminology(mut self, terminology: &'a [TermPair]) -> Self {
        self.terminology = terminology;
        self
    }

    pub fn with_languages(mut self, source: &'a str, target: &'a str) -> Self {
        self.source_language = source;
        self.target_language = target;
        self
    }
}

/// State handed to each anchor strategy for one accent span
pub struct AnchorContext<'a> {
    pub input: SpliceInput<'a>,
    /// Index of the span among the paragraph's accent spans
    pub span_index: usize,
    pub span: &'a StyleSpan,
    /// Translated text as characters
    pub chars: &'a [char],
    /// Whitespace-delimited tokens as `[start, end)` character ranges
    pub tokens: &'a [(usize, usize)],
    /// Characters already claimed by placed anchors
    pub occupied: &'a [bool],
    /// Length of the source paragraph in characters
    pub source_len: usize,
}

impl AnchorContext<'_> {
    fn is_free(&self, start: usize, len: usize) -> bool {
        self.occupied[start..start + len].iter().all(|taken| !taken)
    }
}

/// A proposed position for an accent span
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorMatch {
    pub start: usize,
    pub len: usize,
    pub confidence: f32,
}

impl AnchorMatch {
    pub fn new(start: usize, len: usize, confidence: f32) -> Self {
        Self {
            start,
            len,
            confidence,
        }
    }
}

/// One way of locating an accent span in translated text
pub trait AnchorStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn locate(&self, ctx: &AnchorContext<'_>) -> Option<AnchorMatch>;
}

/// Positions carried through the request as `<sN>` tags
pub struct ExplicitAnchors;

impl AnchorStrategy for ExplicitAnchors {
    fn name(&self) -> &'static str {
        "explicit"
    }

    fn locate(&self, ctx: &AnchorContext<'_>) -> Option<AnchorMatch> {
        let anchor = ctx.input.anchors.iter().find(|a| a.span == ctx.span_index)?;
        (anchor.len > 0 && anchor.start + anchor.len <= ctx.chars.len())
            .then(|| AnchorMatch::new(anchor.start, anchor.len, 1.0))
    }
}

/// The span's own text left untranslated (product names, numbers, codes)
pub struct KeywordMatch;

impl AnchorStrategy for KeywordMatch {
    fn name(&self) -> &'static str {
        "keyword"
    }

    fn locate(&self, ctx: &AnchorContext<'_>) -> Option<AnchorMatch> {
        let needle: Vec<char> = ctx.span.text.trim().chars().collect();
        let hits = find_all(ctx.chars, &needle);
        let confidence = match hits.len() {
            0 => return None,
            1 => 0.95,
            _ => 0.75,
        };
        let start = hits.into_iter().find(|&s| ctx.is_free(s, needle.len()))?;
        Some(AnchorMatch::new(start, needle.len(), confidence))
    }
}

/// A translation already committed for the span's text on a recent slide
pub struct TerminologyMatch;

impl AnchorStrategy for TerminologyMatch {
    fn name(&self) -> &'static str {
        "terminology"
    }

    fn locate(&self, ctx: &AnchorContext<'_>) -> Option<AnchorMatch> {
        let source = ctx.span.text.trim().to_lowercase();
        for pair in ctx.input.terminology.iter().rev() {
            if pair.source.trim().to_lowercase() != source {
                continue;
            }
            let target: Vec<char> = pair.target.trim().chars().collect();
            if let Some(start) = find_all(ctx.chars, &target)
                .into_iter()
                .find(|&s| ctx.is_free(s, target.len()))
            {
                return Some(AnchorMatch::new(start, target.len(), 0.85));
            }
        }
        None
    }
}

/// A number or longer word of the span that survives translation
pub struct SharedToken;

impl AnchorStrategy for SharedToken {
    fn name(&self) -> &'static str {
        "shared-token"
    }

    fn locate(&self, ctx: &AnchorContext<'_>) -> Option<AnchorMatch> {
        let mut candidates: Vec<Vec<char>> = ctx
            .span
            .text
            .split_whitespace()
            .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|t| is_salient(t))
            .map(|t| t.chars().collect())
            .collect();
        candidates.sort_by(|a, b| b.len().cmp(&a.len()));

        for token in candidates {
            if let Some(start) = find_all(ctx.chars, &token)
                .into_iter()
                .find(|&s| ctx.is_free(s, token.len()))
            {
                return Some(AnchorMatch::new(start, token.len(), 0.65));
            }
        }
        None
    }
}

fn is_salient(token: &str) -> bool {
    token.chars().any(|c| c.is_ascii_digit()) || token.chars().count() >= 4
}

/// Same relative position as in the source, weighted by whether both
/// languages share a basic word order
pub struct Positional {
    same_order: f32,
    other_order: f32,
}

impl Positional {
    pub fn new(same_order: f32, other_order: f32) -> Self {
        Self {
            same_order,
            other_order,
        }
    }
}

impl AnchorStrategy for Positional {
    fn name(&self) -> &'static str {
        "positional"
    }

    fn locate(&self, ctx: &AnchorContext<'_>) -> Option<AnchorMatch> {
        let n = ctx.chars.len();
        if n == 0 || ctx.tokens.is_empty() {
            return None;
        }
        let confidence = if same_word_order(ctx.input.source_language, ctx.input.target_language) {
            self.same_order
        } else {
            self.other_order
        };

        let (from, to) = ctx.span.fractions(ctx.source_len);
        let start = ((from * n as f64).round() as usize).min(n);
        let end = ((to * n as f64).round() as usize).clamp(start, n);

        if let [(ts, te)] = ctx.tokens {
            if is_unbroken(&ctx.chars[*ts..*te]) {
                let start = start.clamp(*ts, te - 1);
                let end = end.clamp(start + 1, *te);
                return Some(AnchorMatch::new(start, end - start, confidence));
            }
        }

        // Tokens mostly inside the projected range; else the one overlapping most.
        let overlap = |&(ts, te): &(usize, usize)| te.min(end).saturating_sub(ts.max(start));
        let inside: Vec<(usize, usize)> = ctx
            .tokens
            .iter()
            .copied()
            .filter(|t| overlap(t) * 2 > t.1 - t.0)
            .collect();
        let (first, last) = match (inside.first(), inside.last()) {
            (Some(f), Some(l)) => (*f, *l),
            _ => {
                let best = ctx
                    .tokens
                    .iter()
                    .copied()
                    .max_by_key(|t| (overlap(t), std::cmp::Reverse(t.0.abs_diff(start))))?;
                (best, best)
            }
        };
        Some(AnchorMatch::new(first.0, last.1 - first.0, confidence))
    }
}

/// Rebuilds run sequences for translated paragraphs
pub struct RunSplicer {
    min_confidence: f32,
    strategies: Vec<Box<dyn AnchorStrategy>>,
}

impl Default for RunSplicer {
    fn default() -> Self {
        Self::new(&SpliceConfig::default())
    }
}

impl RunSplicer {
    /// The full strategy chain: explicit, keyword, terminology, shared
    /// token, positional
    pub fn new(config: &SpliceConfig) -> Self {
        Self::with_strategies(
            config.min_confidence,
            vec![
                Box::new(ExplicitAnchors),
                Box::new(KeywordMatch),
                Box::new(TerminologyMatch),
                Box::new(SharedToken),
                Box::new(Positional::new(
                    config.positional_same_order,
                    config.positional_other_order,
                )),
            ],
        )
    }

    pub fn with_strategies(min_confidence: f32, strategies: Vec<Box<dyn AnchorStrategy>>) -> Self {
        Self {
            min_confidence,
            strategies,
        }
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn splice(&self, input: SpliceInput<'_>) -> SpliceOutcome {
        let paragraph = input.paragraph;
        let chars: Vec<char> = input.translated.chars().collect();

        if paragraph.runs.is_empty() {
            let runs = if chars.is_empty() {
                Vec::new()
            } else {
                vec![SplicedRun {
                    text: input.translated.to_string(),
                    style: StyleFingerprint::default(),
                    source_run: None,
                    one_to_one: false,
                }]
            };
            return SpliceOutcome {
                runs,
                ..Default::default()
            };
        }

        let base = paragraph.dominant_run().unwrap_or(0);

        if chars.is_empty() {
            return SpliceOutcome {
                runs: vec![SplicedRun {
                    text: String::new(),
                    style: paragraph.runs[base].style.clone(),
                    source_run: Some(base),
                    one_to_one: false,
                }],
                ..Default::default()
            };
        }

        if input.translated == paragraph.plain_text() {
            return SpliceOutcome {
                runs: paragraph
                    .runs
                    .iter()
                    .enumerate()
                    .map(|(i, run)| SplicedRun {
                        text: run.text.clone(),
                        style: run.style.clone(),
                        source_run: Some(i),
                        one_to_one: true,
                    })
                    .collect(),
                ..Default::default()
            };
        }

        let tokens = tokenize(&chars);
        let accents = paragraph.accent_spans();
        if accents.is_empty() {
            return SpliceOutcome {
                runs: project_runs(paragraph, &chars, &tokens),
                ..Default::default()
            };
        }

        self.relocate(input, &chars, &tokens, &accents, base)
    }

    fn relocate(
        &self,
        input: SpliceInput<'_>,
        chars: &[char],
        tokens: &[(usize, usize)],
        accents: &[StyleSpan],
        base: usize,
    ) -> SpliceOutcome {
        let paragraph = input.paragraph;
        let source_len = paragraph.char_len();
        let mut owner: Vec<Option<usize>> = vec![None; chars.len()];
        let mut anchored = vec![false; accents.len()];
        let mut sources = vec![PlacementSource::Fallback; accents.len()];
        let mut unplaced = Vec::new();

        for (i, span) in accents.iter().enumerate() {
            let occupied: Vec<bool> = owner.iter().map(Option::is_some).collect();
            let ctx = AnchorContext {
                input,
                span_index: i,
                span,
                chars,
                tokens,
                occupied: &occupied,
                source_len,
            };

            let placed = self.strategies.iter().find_map(|strategy| {
                let found = strategy.locate(&ctx)?;
                let fits = found.len > 0 && found.start + found.len <= chars.len();
                if !fits || found.confidence < self.min_confidence || !ctx.is_free(found.start, found.len) {
                    trace!(
                        "{} rejected for '{}' (confidence {:.2})",
                        strategy.name(),
                        span.text,
                        found.confidence
                    );
                    return None;
                }
                Some((strategy.name(), found))
            });

            match placed {
                Some((name, found)) => {
                    debug!(
                        "Placed '{}' at {}..{} via {} ({:.2})",
                        span.text,
                        found.start,
                        found.start + found.len,
                        name,
                        found.confidence
                    );
                    claim(&mut owner, found.start, found.len, i);
                    anchored[i] = true;
                    sources[i] = PlacementSource::Strategy(name);
                }
                None => unplaced.push(i),
            }
        }

        let mut ambiguities = Vec::new();
        for i in unplaced {
            let span = &accents[i];
            let share = if source_len == 0 {
                1.0
            } else {
                span.len as f64 / source_len as f64
            };
            let resolution = match first_free_token(chars, tokens, &owner, share) {
                Some((start, len)) => {
                    claim(&mut owner, start, len, i);
                    FallbackResolution::FirstToken(chars[start..start + len].iter().collect())
                }
                None => FallbackResolution::Dropped,
            };
            debug!("No anchor for '{}': {:?}", span.text, resolution);
            ambiguities.push(SpliceAmbiguity {
                span_text: span.text.clone(),
                resolution,
            });
        }

        let base_style = paragraph.runs[base].style.clone();
        let mut runs: Vec<SplicedRun> = Vec::new();
        let mut current: Option<Option<usize>> = None;
        for (c, who) in chars.iter().zip(&owner) {
            if current != Some(*who) {
                let (style, source_run, one_to_one) = match who {
                    Some(i) => (
                        accents[*i].style.clone(),
                        accents[*i].first_run,
                        anchored[*i] && accents[*i].run_count() == 1,
                    ),
                    None => (base_style.clone(), base, false),
                };
                runs.push(SplicedRun {
                    text: String::new(),
                    style,
                    source_run: Some(source_run),
                    one_to_one,
                });
                current = Some(*who);
            }
            if let Some(run) = runs.last_mut() {
                run.text.push(*c);
            }
        }

        // The base run stays one-to-one only when it is the sole run in the
        // dominant style and the accents did not split it.
        let base_sources = paragraph
            .runs
            .iter()
            .filter(|r| r.style == base_style && r.kind == RunKind::Text && !r.text.is_empty())
            .count();
        let base_pieces = runs
            .iter()
            .filter(|r| r.source_run == Some(base) && r.style == base_style)
            .count();
        if base_sources == 1 && base_pieces == 1 {
            for run in runs.iter_mut().filter(|r| r.source_run == Some(base)) {
                run.one_to_one = true;
            }
        }

        let placements = accents
            .iter()
            .enumerate()
            .map(|(i, span)| SpanPlacement {
                span_text: span.text.clone(),
                placed_text: chars
                    .iter()
                    .zip(&owner)
                    .filter(|(_, who)| **who == Some(i))
                    .map(|(c, _)| *c)
                    .collect(),
                source: sources[i],
            })
            .collect();

        SpliceOutcome {
            runs,
            ambiguities,
            placements,
        }
    }
}

fn claim(owner: &mut [Option<usize>], start: usize, len: usize, span: usize) {
    for slot in &mut owner[start..start + len] {
        *slot = Some(span);
    }
}

/// Project every run onto the translated text at its fractional position
fn project_runs(paragraph: &ParagraphModel, chars: &[char], tokens: &[(usize, usize)]) -> Vec<SplicedRun> {
    let n = chars.len();
    let total = paragraph.char_len();
    let stops: Vec<usize> = if tokens.len() > 1 {
        let mut stops: Vec<usize> = tokens.iter().map(|t| t.0).collect();
        stops.insert(0, 0);
        stops.push(n);
        stops.dedup();
        stops
    } else {
        Vec::new()
    };

    let last = paragraph.runs.len() - 1;
    let mut cursor = 0;
    let mut consumed = 0;
    let mut runs = Vec::with_capacity(paragraph.runs.len());
    for (i, run) in paragraph.runs.iter().enumerate() {
        consumed += run.char_len();
        let end = if i == last || total == 0 {
            n
        } else {
            let raw = ((consumed as f64 / total as f64) * n as f64).round() as usize;
            snap(&stops, raw).clamp(cursor, n)
        };
        runs.push(SplicedRun {
            text: chars[cursor..end].iter().collect(),
            style: run.style.clone(),
            source_run: Some(i),
            one_to_one: true,
        });
        cursor = end;
    }
    runs
}

/// Nearest token boundary; the lower one wins a tie
fn snap(stops: &[usize], position: usize) -> usize {
    stops
        .iter()
        .copied()
        .min_by_key(|&p| (p.abs_diff(position), p))
        .unwrap_or(position)
}

/// Conservative placement: the first token no anchor has claimed. Text
/// written without spaces is one token; there the span takes its share of
/// the leading free characters instead.
fn first_free_token(
    chars: &[char],
    tokens: &[(usize, usize)],
    owner: &[Option<usize>],
    share: f64,
) -> Option<(usize, usize)> {
    if let [(ts, te)] = tokens {
        if is_unbroken(&chars[*ts..*te]) {
            let want = ((share * (te - ts) as f64).ceil() as usize).clamp(1, te - ts);
            let start = (*ts..*te).find(|&p| owner[p].is_none())?;
            let len = owner[start..*te]
                .iter()
                .take(want)
                .take_while(|o| o.is_none())
                .count();
            return Some((start, len));
        }
    }
    tokens
        .iter()
        .find(|(s, e)| owner[*s..*e].iter().all(Option::is_none))
        .map(|&(s, e)| (s, e - s))
}

/// Whitespace-delimited tokens as `[start, end)` ranges
fn tokenize(chars: &[char]) -> Vec<(usize, usize)> {
    let mut tokens = Vec::new();
    let mut start = None;
    for (i, c) in chars.iter().enumerate() {
        match (c.is_whitespace(), start) {
            (false, None) => start = Some(i),
            (true, Some(s)) => {
                tokens.push((s, i));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        tokens.push((s, chars.len()));
    }
    tokens
}

/// Scripts written without spaces between words
fn is_unspaced(c: char) -> bool {
    matches!(script_of(c), Some(Script::Cjk) | Some(Script::Thai))
}

fn is_unbroken(token: &[char]) -> bool {
    token.len() > 1 && token.iter().any(|c| is_unspaced(*c))
}

fn same_letter(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() && !is_unspaced(c)
}

fn at_word_boundary(haystack: &[char], start: usize, len: usize) -> bool {
    let end = start + len;
    let before = start == 0 || !(is_word_char(haystack[start - 1]) && is_word_char(haystack[start]));
    let after = end == haystack.len() || !(is_word_char(haystack[end - 1]) && is_word_char(haystack[end]));
    before && after
}

/// Case-insensitive whole-word occurrences of `needle`
fn find_all(haystack: &[char], needle: &[char]) -> Vec<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return Vec::new();
    }
    (0..=haystack.len() - needle.len())
        .filter(|&i| {
            haystack[i..i + needle.len()]
                .iter()
                .zip(needle)
                .all(|(a, b)| same_letter(*a, *b))
        })
        .filter(|&i| at_word_boundary(haystack, i, needle.len()))
        .collect()
}

fn strip_hyperlinks(properties: &mut XmlElement) {
    properties
        .children
        .retain(|node| !matches!(node, XmlNode::Element(e) if e.is("hlinkClick") || e.is("hlinkMouseOver")));
}

/// Replace a paragraph's runs with a spliced sequence.
///
/// Paragraph properties stay first, fields and end-of-paragraph properties
/// follow the new runs. `\n` inside a run becomes an `a:br` carrying the
/// run's properties. Returns the font decision made for every run with
/// visible text.
pub fn commit_runs(
    paragraph: &mut XmlElement,
    source: &ParagraphModel,
    runs: &[SplicedRun],
    fonts: Option<&FontResolver>,
) -> Vec<(String, FontResolution)> {
    let prefix = paragraph.prefix().map(str::to_string);
    let prefix = prefix.as_deref();
    let mut resolutions = Vec::new();
    let mut rebuilt = Vec::new();

    for run in runs {
        let mut properties = run
            .source_run
            .and_then(|i| source.runs.get(i))
            .and_then(|r| r.properties.clone());
        if let Some(props) = properties.as_mut() {
            props.remove_attr("err");
            if !run.one_to_one {
                strip_hyperlinks(props);
            }
        }

        if let Some(resolver) = fonts {
            if !run.text.trim().is_empty() {
                let mut working = properties
                    .clone()
                    .unwrap_or_else(|| XmlElement::new(qualified(prefix, "rPr")));
                let resolution = resolver.apply(&mut working, &run.text);
                if matches!(resolution, FontResolution::Applied { .. }) {
                    properties = Some(working);
                }
                resolutions.push((run.text.clone(), resolution));
            }
        }

        append_run(&mut rebuilt, prefix, properties.as_ref(), &run.text);
    }

    let mut leading = Vec::new();
    let mut fields = Vec::new();
    let mut trailing = Vec::new();
    for node in std::mem::take(&mut paragraph.children) {
        let XmlNode::Element(element) = node else {
            continue;
        };
        if element.is("pPr") {
            leading.push(element);
        } else if element.is("r") || element.is("br") {
            continue;
        } else if element.is("fld") {
            fields.push(element);
        } else {
            trailing.push(element);
        }
    }

    paragraph.children = leading
        .into_iter()
        .chain(rebuilt)
        .chain(fields)
        .chain(trailing)
        .map(XmlNode::Element)
        .collect();
    resolutions
}

fn append_run(nodes: &mut Vec<XmlElement>, prefix: Option<&str>, properties: Option<&XmlElement>, text: &str) {
    let lines: Vec<&str> = text.split('\n').collect();
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            let mut br = XmlElement::new(qualified(prefix, "br"));
            if let Some(props) = properties {
                br.push(props.clone());
            }
            nodes.push(br);
        }
        if line.is_empty() && lines.len() > 1 {
            continue;
        }
        let mut run = XmlElement::new(qualified(prefix, "r"));
        if let Some(props) = properties {
            run.push(props.clone());
        }
        let mut t = XmlElement::new(qualified(prefix, "t"));
        t.set_text(*line);
        run.push(t);
        nodes.push(run);
    }
}

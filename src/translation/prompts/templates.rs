/*!
 * Prompt templates for slide translation.
 *
 * One request covers every paragraph of a slide. The model receives the
 * presentation summary, recently committed terminology and the segments
 * keyed by slot id, and must answer with JSON keyed the same way.
 */

use serde::{Deserialize, Serialize};

use crate::language_utils::display_name;
use crate::translation::unit::{TermPair, TranslationRequest};

/// System prompt template with language placeholders.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// The template string with placeholders
    template: String,
}

impl PromptTemplate {
    /// The default system prompt for slide translation.
    pub const SLIDE_TRANSLATOR: &'static str = r#"You are an expert presentation translator specializing in {source_language} to {target_language} translation.

## Your Role
- Translate every segment of the slide into natural {target_language}
- Keep the concise, scannable style of presentation slides
- Follow the provided terminology exactly for terms already translated
- Keep proper nouns, product names, code and technical terms as they are

## Style Markers
- Some segments carry a `style_hint` in which emphasised text is wrapped in <s0>...</s0>, <s1>...</s1>
- Wrap the translation of each marked phrase in the same tags, wherever it ends up in the sentence
- Never add tags that are not in the hint

## Output Requirements
- Return ONLY valid JSON: {"translations": [{"slot_id": "...", "text": "..."}]}
- Return exactly one entry for every slot_id you were given, and no other ids
- Keep line breaks (\n) where the source has them
- Do not include any text outside the JSON structure"#;

    /// System prompt for the presentation summary.
    pub const SUMMARIZER: &'static str = r#"You summarize presentations for a translator who will translate them into {target_language}.

Write 3-5 sentences in English describing the purpose of the presentation, its intended audience and its key topics.
Keep proper nouns and technical terms exactly as they appear. Return only the summary."#;

    /// Create a new prompt template.
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    /// Create the default slide translator template.
    pub fn slide_translator() -> Self {
        Self::new(Self::SLIDE_TRANSLATOR)
    }

    pub fn summarizer() -> Self {
        Self::new(Self::SUMMARIZER)
    }

    /// Render the template with the given variables.
    pub fn render(&self, source_language: &str, target_language: &str) -> String {
        self.template
            .replace("{source_language}", source_language)
            .replace("{target_language}", target_language)
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::slide_translator()
    }
}

/// Builds the prompts for one translation request.
#[derive(Debug, Clone)]
pub struct SlidePromptBuilder<'a> {
    request: &'a TranslationRequest,
}

impl<'a> SlidePromptBuilder<'a> {
    pub fn new(request: &'a TranslationRequest) -> Self {
        Self { request }
    }

    /// Build the system prompt.
    pub fn build_system_prompt(&self) -> String {
        PromptTemplate::slide_translator().render(
            &display_name(&self.request.source_language),
            &display_name(&self.request.target_language),
        )
    }

    /// Build the user prompt as a JSON request.
    pub fn build_user_prompt(&self) -> String {
        let request = PromptRequest {
            task: "translate_slide".to_string(),
            source_language: self.request.source_language.clone(),
            target_language: self.request.target_language.clone(),
            context: ContextData {
                presentation_summary: Some(self.request.context_summary.clone())
                    .filter(|s| !s.trim().is_empty()),
                terminology: self.request.terminology.clone(),
            },
            segments: self
                .request
                .segments
                .iter()
                .map(|s| PromptSegment {
                    slot_id: s.slot_id.to_string(),
                    text: s.source_text.clone(),
                    style_hint: s.style_hint.clone(),
                })
                .collect(),
        };

        serde_json::to_string_pretty(&request).unwrap_or_else(|_| "{}".to_string())
    }

    /// Build both system and user prompts.
    pub fn build(&self) -> (String, String) {
        (self.build_system_prompt(), self.build_user_prompt())
    }
}

/// Prompts for the one-off presentation summary.
pub fn build_summary_prompts(slides: &[String], target_language: &str) -> (String, String) {
    let system = PromptTemplate::summarizer().render("", &display_name(target_language));
    (system, slides.join("\n---\n"))
}

/// Request structure for JSON communication with the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptRequest {
    /// Task identifier
    pub task: String,

    pub source_language: String,

    pub target_language: String,

    /// Context information
    pub context: ContextData,

    /// Paragraphs of the slide
    pub segments: Vec<PromptSegment>,
}

/// Context shared by every segment of a slide.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextData {
    /// What the whole presentation is about
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presentation_summary: Option<String>,

    /// Terms already translated on recent slides
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub terminology: Vec<TermPair>,
}

/// A paragraph to translate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptSegment {
    pub slot_id: String,

    pub text: String,

    /// Text with emphasised phrases wrapped in `<sN>` tags
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style_hint: Option<String>,
}

//! Prompts for recipe generation.
//!
//! All input variants share one system contract ([`SYSTEM_PROMPT`]); only the
//! user message differs. Input is capped at a hard character ceiling and
//! truncated with an explicit marker.

use sha2::{Digest, Sha256};
use std::borrow::Cow;
use tracing::warn;

use crate::types::{
    config::PipelineConfig,
    content::{ExtractedContent, VideoCaption},
    generation::PromptPayload,
};

/// Appended to input cut at the ceiling.
pub const TRUNCATION_MARKER: &str = "\n\n[... content truncated ...]";

/// System instructions shared by every prompt variant.
pub const SYSTEM_PROMPT: &str = r#"You are a recipe extraction engine. Convert the provided source material into one structured recipe.

Output a single JSON object with exactly this shape:
{
    "title": "string",
    "description": "string or null",
    "ingredientGroups": [
        {
            "name": "string (e.g. \"Sauce\", \"Dough\"; use \"Ingredients\" when there is only one group)",
            "ingredients": [
                {
                    "name": "string",
                    "amount": number or null,
                    "unit": "string or null",
                    "preparation": "string or null (e.g. \"finely chopped\")",
                    "substitutions": ["string", "..."]
                }
            ]
        }
    ],
    "instructions": ["string", "..."],
    "recipeYield": "string or null (e.g. \"4 servings\")",
    "prepTime": "string or null",
    "cookTime": "string or null",
    "totalTime": "string or null",
    "nutrition": {
        "calories": number or null,
        "protein": "string or null",
        "carbohydrates": "string or null",
        "fat": "string or null",
        "fiber": "string or null",
        "sugar": "string or null",
        "sodium": "string or null"
    },
    "tips": ["string", "..."],
    "image": "string or null"
}

Rules:
1. Use null for any field the source does not state. Never infer or invent values.
2. Extract every ingredient, including ingredients that are only mentioned inside the instructions.
3. Group ingredients logically (for example "Marinade", "Sauce", "Garnish") when the recipe has distinct components.
4. Write times and yields for humans ("1 hour 15 minutes", "4 servings"). Never use ISO 8601 durations such as PT1H15M.
5. Convert fractional amounts to decimals: 1/2 becomes 0.5, 1 1/2 becomes 1.5.
6. Give every ingredient 1-2 realistic substitutions.
7. Drop brand names, sponsor mentions, hashtags, @handles, "link in bio" and other social-media content.
8. Keep each instruction step to 1-2 sentences.
9. Put genuine cooking tips in "tips". Exclude promotional text, calls to follow or subscribe, and affiliate notes.
10. Return only the JSON object. No markdown, no commentary."#;

/// Stable identifier for the current system prompt.
///
/// First 12 hex chars of its SHA-256; logged with every generation so output
/// changes can be traced to prompt changes.
pub fn prompt_version() -> String {
    let mut hasher = Sha256::new();
    hasher.update(SYSTEM_PROMPT.as_bytes());
    let hex = format!("{:x}", hasher.finalize());
    hex[..12].to_string()
}

/// Cut `text` to at most `max_chars` characters on a char boundary.
///
/// Returns the input unchanged when it fits.
pub fn truncate_input(text: &str, max_chars: usize) -> Cow<'_, str> {
    match text.char_indices().nth(max_chars) {
        None => Cow::Borrowed(text),
        Some((byte_idx, _)) => {
            warn!(
                original_chars = text.chars().count(),
                kept_chars = max_chars,
                "Prompt input exceeds ceiling, truncating"
            );
            Cow::Owned(format!("{}{}", &text[..byte_idx], TRUNCATION_MARKER))
        }
    }
}

/// Builds [`PromptPayload`]s for each input variant.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    max_input_chars: usize,
    temperature: f32,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl PromptBuilder {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            max_input_chars: config.max_input_chars,
            temperature: config.temperature,
        }
    }

    /// Prompt from page content extracted by the acquisition service.
    pub fn build_url_prompt(&self, content: &ExtractedContent) -> PromptPayload {
        let mut body = String::new();
        push_section(&mut body, "Title", content.title.as_deref());
        push_section(&mut body, "Description", content.description.as_deref());
        push_section(&mut body, "Yield", content.yield_text.as_deref());
        push_section(&mut body, "Prep time", content.prep_time.as_deref());
        push_section(&mut body, "Cook time", content.cook_time.as_deref());
        push_section(&mut body, "Total time", content.total_time.as_deref());
        push_section(&mut body, "Ingredients", content.ingredients_text.as_deref());
        push_section(&mut body, "Instructions", content.instructions_text.as_deref());

        let user = format!(
            "Extract the recipe from this web page.\n\nSource URL: {}\n\n{}",
            content.source_url,
            self.cap(&body)
        );

        let payload = self.payload(user);
        match content.image.as_deref().map(str::trim) {
            Some(image) if !image.is_empty() => payload.with_image(image),
            _ => payload,
        }
    }

    /// Prompt from free-form recipe text.
    pub fn build_text_prompt(&self, text: &str) -> PromptPayload {
        self.payload(format!(
            "Extract the recipe from this text.\n\n{}",
            self.cap(text.trim())
        ))
    }

    /// Prompt from a short-video caption.
    pub fn build_video_prompt(&self, caption: &VideoCaption, video_url: &str) -> PromptPayload {
        self.payload(format!(
            "Extract the recipe from this {} video caption. Captions are informal and often \
             omit quantities; leave unknown amounts null.\n\nSource URL: {}\n\nCaption:\n{}",
            caption.platform,
            video_url,
            self.cap(caption.caption.trim())
        ))
    }

    /// Prompt that asks for a standard version of a named dish.
    pub fn build_dish_name_prompt(&self, dish_name: &str) -> PromptPayload {
        self.payload(format!(
            "Write a standard, widely recognized home-cooking version of this dish: \"{}\".\n\n\
             Every field must still follow the schema. Since there is no source text, give \
             typical amounts, but still use null for anything you would only be guessing \
             (for example nutrition).",
            self.cap(dish_name.trim())
        ))
    }

    fn cap<'a>(&self, text: &'a str) -> Cow<'a, str> {
        truncate_input(text, self.max_input_chars)
    }

    fn payload(&self, user: String) -> PromptPayload {
        PromptPayload::new(SYSTEM_PROMPT, user).with_temperature(self.temperature)
    }
}

fn push_section(body: &mut String, label: &str, value: Option<&str>) {
    if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
        body.push_str(label);
        body.push_str(":\n");
        body.push_str(value);
        body.push_str("\n\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_version_is_stable() {
        let v1 = prompt_version();
        assert_eq!(v1, prompt_version());
        assert_eq!(v1.len(), 12);
    }

    #[test]
    fn test_truncate_input_within_limit() {
        assert!(matches!(truncate_input("short", 10), Cow::Borrowed("short")));
        assert!(matches!(truncate_input("exact", 5), Cow::Borrowed(_)));
    }

    #[test]
    fn test_truncate_input_multibyte_boundary() {
        let text = "ééééé";
        let cut = truncate_input(text, 2);
        assert_eq!(cut, format!("éé{}", TRUNCATION_MARKER));
    }

    #[test]
    fn test_text_prompt_truncates_at_ceiling() {
        let config = PipelineConfig::default().with_max_input_chars(100);
        let builder = PromptBuilder::from_config(&config);
        let prompt = builder.build_text_prompt(&"a".repeat(500));

        assert!(prompt.user.ends_with("[... content truncated ...]"));
        assert!(prompt.user.contains(&"a".repeat(100)));
        assert!(!prompt.user.contains(&"a".repeat(101)));
    }

    #[test]
    fn test_url_prompt_sections_and_image() {
        let content = ExtractedContent::new("https://example.com/soup")
            .with_title("Tomato Soup")
            .with_ingredients("4 tomatoes\n1 onion")
            .with_instructions("Simmer everything.")
            .with_image("https://example.com/soup.jpg");

        let prompt = PromptBuilder::default().build_url_prompt(&content);

        assert!(prompt.user.contains("Source URL: https://example.com/soup"));
        assert!(prompt.user.contains("Title:\nTomato Soup"));
        assert!(prompt.user.contains("Ingredients:\n4 tomatoes\n1 onion"));
        assert!(!prompt.user.contains("Cook time"));
        assert_eq!(prompt.image_url.as_deref(), Some("https://example.com/soup.jpg"));
        assert_eq!(prompt.system, SYSTEM_PROMPT);
        assert!(prompt.json_mode);
    }

    #[test]
    fn test_all_variants_share_system_contract() {
        let builder = PromptBuilder::default();
        let caption = VideoCaption::new("garlic noodles #foodtok", "tiktok");

        let prompts = [
            builder.build_text_prompt("2 eggs\nfry them"),
            builder.build_video_prompt(&caption, "https://tiktok.com/@a/video/1"),
            builder.build_dish_name_prompt("chicken"),
        ];

        for prompt in &prompts {
            assert_eq!(prompt.system, SYSTEM_PROMPT);
            assert!((prompt.temperature - 0.2).abs() < f32::EPSILON);
            assert!(prompt.image_url.is_none());
        }
        assert!(prompts[1].user.contains("tiktok video caption"));
        assert!(prompts[2].user.contains("\"chicken\""));
    }
}

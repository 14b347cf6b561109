//! Validation gate: structural checks plus hallucination heuristics.
//!
//! A pure classifier. Fatal findings reject the recipe; informational
//! findings are reported alongside an accepted recipe. Adding a fatal
//! finding can never turn a rejection into an acceptance.

pub mod rules;

use std::collections::HashSet;

use crate::types::{
    outcome::{ValidationOutcome, ValidationReason},
    recipe::StructuredRecipe,
};
use rules::*;

/// Facts about how the recipe was produced that affect validation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationContext {
    /// Content came from a degraded extraction path
    pub is_fallback_extraction: bool,
}

impl ValidationContext {
    pub fn fallback() -> Self {
        Self {
            is_fallback_extraction: true,
        }
    }
}

#[derive(Default)]
struct Findings {
    fatal: Vec<ValidationReason>,
    informational: Vec<ValidationReason>,
}

impl Findings {
    fn add(&mut self, severity: Severity, rule: &str, message: String) {
        let reason = ValidationReason::new(rule, message);
        match severity {
            Severity::Fatal => self.fatal.push(reason),
            Severity::Informational => self.informational.push(reason),
        }
    }

    fn into_outcome(self) -> ValidationOutcome {
        ValidationOutcome {
            accepted: self.fatal.is_empty(),
            fatal_reasons: self.fatal,
            informational_reasons: self.informational,
        }
    }
}

/// Classify a normalized recipe.
pub fn validate_recipe(recipe: &StructuredRecipe, ctx: &ValidationContext) -> ValidationOutcome {
    let mut findings = Findings::default();

    check_structure(recipe, &mut findings);
    check_uniqueness(recipe, &mut findings);
    check_pairings(recipe, &mut findings);
    check_generic_instructions(recipe, &mut findings);
    check_placeholders(recipe, &mut findings);
    check_yield(recipe, &mut findings);
    check_fallback_thinness(recipe, ctx, &mut findings);

    check_generic_ingredients(recipe, &mut findings);
    check_vague_phrases(recipe, &mut findings);
    check_description(recipe, &mut findings);
    check_title_adjectives(recipe, &mut findings);
    check_tips(recipe, &mut findings);
    check_calories(recipe, &mut findings);

    findings.into_outcome()
}

fn check_structure(recipe: &StructuredRecipe, findings: &mut Findings) {
    if recipe.title.trim().is_empty() {
        findings.add(Severity::Fatal, MISSING_TITLE, "recipe has no title".into());
    }
    if recipe.ingredient_groups.is_empty() {
        findings.add(
            Severity::Fatal,
            EMPTY_INGREDIENT_GROUPS,
            "recipe has no ingredient groups".into(),
        );
    }
    if recipe.ingredients().all(|i| i.name.trim().is_empty()) {
        findings.add(Severity::Fatal, NO_INGREDIENTS, "recipe has no ingredients".into());
    }
    if recipe.non_empty_instructions().next().is_none() {
        findings.add(Severity::Fatal, NO_INSTRUCTIONS, "recipe has no instructions".into());
    }
}

fn ingredient_names(recipe: &StructuredRecipe) -> Vec<String> {
    recipe
        .ingredients()
        .map(|i| i.name.trim().to_lowercase())
        .filter(|n| !n.is_empty())
        .collect()
}

fn check_uniqueness(recipe: &StructuredRecipe, findings: &mut Findings) {
    let names = ingredient_names(recipe);
    if names.len() < UNIQUENESS_MIN_INGREDIENTS {
        return;
    }

    let unique: HashSet<&str> = names.iter().map(String::as_str).collect();
    let ratio = unique.len() as f64 / names.len() as f64;
    if ratio < MIN_UNIQUENESS_RATIO {
        findings.add(
            Severity::Fatal,
            LOW_INGREDIENT_UNIQUENESS,
            format!(
                "only {} of {} ingredient names are distinct",
                unique.len(),
                names.len()
            ),
        );
    }
}

fn check_pairings(recipe: &StructuredRecipe, findings: &mut Findings) {
    let names = ingredient_names(recipe);
    for rule in UNREALISTIC_PAIRS.iter() {
        let first = names.iter().find(|n| rule.first.is_match(n));
        let second = names.iter().find(|n| rule.second.is_match(n));
        if let (Some(a), Some(b)) = (first, second) {
            if a != b {
                findings.add(
                    rule.severity,
                    rule.name,
                    format!("implausible ingredient pairing: {} with {}", a, b),
                );
            }
        }
    }
}

/// Lowercase words of three or more letters from every ingredient name.
fn ingredient_words(recipe: &StructuredRecipe) -> HashSet<String> {
    recipe
        .ingredients()
        .flat_map(|i| words_of(&i.name))
        .filter(|w| w.chars().count() >= 3)
        .collect()
}

fn words_of(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

/// A short step that opens with a stock verb and names no ingredient.
fn is_generic_instruction(step: &str, ingredient_words: &HashSet<String>) -> bool {
    let words: Vec<String> = words_of(step).collect();
    let Some(verb) = words.first() else {
        return false;
    };
    if words.len() >= GENERIC_INSTRUCTION_MAX_WORDS || !GENERIC_VERBS.contains(&verb.as_str()) {
        return false;
    }
    !words.iter().any(|w| {
        ingredient_words.contains(w)
            || w.strip_suffix('s').is_some_and(|s| ingredient_words.contains(s))
            || ingredient_words.contains(&format!("{}s", w))
    })
}

fn check_generic_instructions(recipe: &StructuredRecipe, findings: &mut Findings) {
    let steps: Vec<&str> = recipe.non_empty_instructions().collect();
    if steps.is_empty() {
        return;
    }

    let known = ingredient_words(recipe);
    let generic = steps
        .iter()
        .filter(|s| is_generic_instruction(s, &known))
        .count();
    let share = generic as f64 / steps.len() as f64;
    if share > GENERIC_INSTRUCTION_SHARE {
        findings.add(
            Severity::Fatal,
            GENERIC_INSTRUCTIONS,
            format!(
                "{} of {} instructions are generic one-liners",
                generic,
                steps.len()
            ),
        );
    }
}

fn check_placeholders(recipe: &StructuredRecipe, findings: &mut Findings) {
    let fields = std::iter::once(("title", recipe.title.as_str()))
        .chain(recipe.ingredients().map(|i| ("ingredient", i.name.as_str())))
        .chain(recipe.non_empty_instructions().map(|s| ("instruction", s)));

    for (field, text) in fields {
        if text.trim().is_empty() {
            continue;
        }
        if let Some(rule) = PLACEHOLDER_RULES.iter().find(|r| r.pattern.is_match(text)) {
            findings.add(
                rule.severity,
                rule.name,
                format!("{} is placeholder text: {:?}", field, text),
            );
        }
    }
}

/// Servings stated in the yield. Ranges count at their upper end.
fn stated_servings(recipe: &StructuredRecipe) -> Option<f64> {
    let text = recipe.recipe_yield.as_deref()?;
    SERVINGS_YIELD
        .iter()
        .flat_map(|pattern| pattern.captures_iter(text))
        .filter_map(|c| {
            c.get(2)
                .or_else(|| c.get(1))
                .and_then(|m| m.as_str().parse::<f64>().ok())
        })
        .reduce(f64::max)
}

fn check_yield(recipe: &StructuredRecipe, findings: &mut Findings) {
    if let Some(servings) = stated_servings(recipe) {
        if servings > MAX_SERVINGS {
            findings.add(
                Severity::Fatal,
                EXCESSIVE_YIELD,
                format!("stated yield of {} servings is implausible", servings),
            );
        }
    }
}

fn check_fallback_thinness(
    recipe: &StructuredRecipe,
    ctx: &ValidationContext,
    findings: &mut Findings,
) {
    if !ctx.is_fallback_extraction {
        return;
    }
    let ingredients = recipe.ingredient_count();
    let instructions = recipe.non_empty_instructions().count();
    if ingredients < FALLBACK_MIN_INGREDIENTS || instructions < FALLBACK_MIN_INSTRUCTIONS {
        findings.add(
            Severity::Fatal,
            THIN_FALLBACK_EXTRACTION,
            format!(
                "fallback extraction produced only {} ingredients and {} instructions",
                ingredients, instructions
            ),
        );
    }
}

fn check_generic_ingredients(recipe: &StructuredRecipe, findings: &mut Findings) {
    let generic = recipe
        .ingredients()
        .filter(|i| {
            GENERIC_INGREDIENT_RULES
                .iter()
                .any(|r| r.pattern.is_match(&i.name))
        })
        .count();
    if generic > MAX_GENERIC_INGREDIENTS {
        findings.add(
            Severity::Informational,
            GENERIC_INGREDIENT_NAMES,
            format!("{} ingredients have generic names", generic),
        );
    }
}

fn check_vague_phrases(recipe: &StructuredRecipe, findings: &mut Findings) {
    let hits: usize = recipe
        .non_empty_instructions()
        .map(|step| {
            VAGUE_PHRASE_RULES
                .iter()
                .map(|r| r.pattern.find_iter(step).count())
                .sum::<usize>()
        })
        .sum();
    if hits >= MIN_VAGUE_PHRASES {
        findings.add(
            Severity::Informational,
            VAGUE_INSTRUCTIONS,
            format!("{} vague phrases in instructions", hits),
        );
    }
}

fn check_description(recipe: &StructuredRecipe, findings: &mut Findings) {
    if let Some(description) = &recipe.description {
        let len = description.chars().count();
        if len > MAX_DESCRIPTION_CHARS {
            findings.add(
                Severity::Informational,
                LONG_DESCRIPTION,
                format!("description is {} characters", len),
            );
        }
    }
}

fn check_title_adjectives(recipe: &StructuredRecipe, findings: &mut Findings) {
    let words: Vec<String> = recipe
        .title
        .split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect();
    if words.is_empty() {
        return;
    }

    let positive = words
        .iter()
        .filter(|w| POSITIVE_ADJECTIVES.contains(&w.as_str()))
        .count();
    let density = positive as f64 / words.len() as f64;
    if positive >= MIN_PROMOTIONAL_WORDS && density >= PROMOTIONAL_DENSITY {
        findings.add(
            Severity::Informational,
            PROMOTIONAL_TITLE,
            format!("title is {:.0}% marketing adjectives", density * 100.0),
        );
    }
}

fn check_tips(recipe: &StructuredRecipe, findings: &mut Findings) {
    if recipe.tips.len() > MAX_TIPS {
        findings.add(
            Severity::Informational,
            EXCESSIVE_TIPS,
            format!("{} tips", recipe.tips.len()),
        );
    }
}

fn check_calories(recipe: &StructuredRecipe, findings: &mut Findings) {
    let Some(calories) = recipe.nutrition.as_ref().and_then(|n| n.calories) else {
        return;
    };
    if calories > 0.0 && calories.fract() == 0.0 && (calories as u64) % 100 == 0 {
        findings.add(
            Severity::Informational,
            ROUND_CALORIES,
            format!("calories ({}) look estimated", calories),
        );
    }
}

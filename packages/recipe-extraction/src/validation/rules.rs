//! Rule tables for the validation gate.
//!
//! Patterns are data, not code: adding a placeholder, an implausible
//! ingredient pairing or a vague phrase is a one-line change here.

use lazy_static::lazy_static;
use regex::Regex;

/// How a rule hit affects acceptance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Rejects the recipe
    Fatal,
    /// Recorded only
    Informational,
}

/// A named regex rule.
#[derive(Debug)]
pub struct PatternRule {
    pub name: &'static str,
    pub pattern: Regex,
    pub severity: Severity,
}

/// Two ingredients that do not plausibly belong in one dish.
#[derive(Debug)]
pub struct PairRule {
    pub name: &'static str,
    pub first: Regex,
    pub second: Regex,
    pub severity: Severity,
}

// Rule identifiers reported in `ValidationReason::rule`.
pub const MISSING_TITLE: &str = "missing_title";
pub const EMPTY_INGREDIENT_GROUPS: &str = "empty_ingredient_groups";
pub const NO_INGREDIENTS: &str = "no_ingredients";
pub const NO_INSTRUCTIONS: &str = "no_instructions";
pub const LOW_INGREDIENT_UNIQUENESS: &str = "low_ingredient_uniqueness";
pub const UNREALISTIC_PAIRING: &str = "unrealistic_pairing";
pub const GENERIC_INSTRUCTIONS: &str = "generic_instructions";
pub const PLACEHOLDER_TEXT: &str = "placeholder_text";
pub const EXCESSIVE_YIELD: &str = "excessive_yield";
pub const THIN_FALLBACK_EXTRACTION: &str = "thin_fallback_extraction";
pub const GENERIC_INGREDIENT_NAMES: &str = "generic_ingredient_names";
pub const VAGUE_INSTRUCTIONS: &str = "vague_instructions";
pub const LONG_DESCRIPTION: &str = "long_description";
pub const PROMOTIONAL_TITLE: &str = "promotional_title";
pub const EXCESSIVE_TIPS: &str = "excessive_tips";
pub const ROUND_CALORIES: &str = "round_calories";

// Thresholds
pub const MIN_UNIQUENESS_RATIO: f64 = 0.7;
pub const UNIQUENESS_MIN_INGREDIENTS: usize = 3;
pub const GENERIC_INSTRUCTION_SHARE: f64 = 0.9;
pub const GENERIC_INSTRUCTION_MAX_WORDS: usize = 7;
pub const MAX_SERVINGS: f64 = 50.0;
pub const FALLBACK_MIN_INGREDIENTS: usize = 3;
pub const FALLBACK_MIN_INSTRUCTIONS: usize = 2;
pub const MAX_GENERIC_INGREDIENTS: usize = 2;
pub const MIN_VAGUE_PHRASES: usize = 3;
pub const MAX_DESCRIPTION_CHARS: usize = 500;
pub const PROMOTIONAL_DENSITY: f64 = 0.3;
pub const MIN_PROMOTIONAL_WORDS: usize = 2;
pub const MAX_TIPS: usize = 5;

/// Verbs that say nothing on their own ("Mix.", "Cook it.").
pub const GENERIC_VERBS: &[&str] = &[
    "mix", "combine", "cook", "stir", "add", "bake", "serve", "prepare", "heat", "blend",
    "season", "enjoy", "make", "put", "place", "finish", "assemble",
];

/// Marketing adjectives that inflate titles.
pub const POSITIVE_ADJECTIVES: &[&str] = &[
    "best", "amazing", "ultimate", "perfect", "delicious", "incredible", "awesome", "epic",
    "famous", "mouthwatering", "yummy", "insane", "insanely", "tasty", "divine", "heavenly",
    "irresistible", "addictive", "magical", "killer", "easiest", "greatest",
];

fn pattern(name: &'static str, re: &str, severity: Severity) -> PatternRule {
    PatternRule {
        name,
        pattern: Regex::new(re).unwrap(),
        severity,
    }
}

fn pair(first: &str, second: &str) -> PairRule {
    let word = |w: &str| Regex::new(&format!(r"(?i)\b{}\b", w)).unwrap();
    PairRule {
        name: UNREALISTIC_PAIRING,
        first: word(first),
        second: word(second),
        severity: Severity::Fatal,
    }
}

/// A count or range ("6", "6-8", "6 to 8") between two fragments.
fn counted(before: &str, after: &str) -> Regex {
    const COUNT: &str = r"(\d+(?:\.\d+)?)(?:\s*(?:-|–|to)\s*(\d+(?:\.\d+)?))?";
    Regex::new(&format!("(?i){}{}{}", before, COUNT, after)).unwrap()
}

lazy_static! {
    /// Whole-field placeholders. Anchored so "Title" matches but
    /// "Title Town Chili" does not.
    pub static ref PLACEHOLDER_RULES: Vec<PatternRule> = vec![
        pattern(PLACEHOLDER_TEXT, r"(?i)^\s*(recipe\s+)?(title|name)\s*$", Severity::Fatal),
        pattern(
            PLACEHOLDER_TEXT,
            r"(?i)^\s*(untitled|unknown|n/?a|none|null|string|tbd|todo)\s*$",
            Severity::Fatal,
        ),
        pattern(PLACEHOLDER_TEXT, r"(?i)^\s*lorem ipsum\b.*$", Severity::Fatal),
        pattern(PLACEHOLDER_TEXT, r"(?i)^\s*(ingredient|item)\s*\d*\s*$", Severity::Fatal),
        pattern(PLACEHOLDER_TEXT, r"(?i)^\s*(step|instruction)\s*\d*\s*:?\s*$", Severity::Fatal),
        pattern(
            PLACEHOLDER_TEXT,
            r"^\s*(\.{3}|…|x{3,}|\[[^\]]*\]|<[^>]*>|\{[^}]*\})\s*$",
            Severity::Fatal,
        ),
    ];

    /// Ingredient names that name a category instead of a food.
    pub static ref GENERIC_INGREDIENT_RULES: Vec<PatternRule> = vec![
        pattern(
            GENERIC_INGREDIENT_NAMES,
            r"(?i)^\s*(some |other |assorted |mixed |your favou?rite )?(spices|seasonings?|vegetables|veggies|meat|protein|sauce|toppings|ingredients?|stuff|things|liquid)\s*$",
            Severity::Informational,
        ),
    ];

    /// Instruction phrases that defer the real work to the reader.
    pub static ref VAGUE_PHRASE_RULES: Vec<PatternRule> = vec![
        pattern(VAGUE_INSTRUCTIONS, r"(?i)\bcook until done\b", Severity::Informational),
        pattern(VAGUE_INSTRUCTIONS, r"(?i)\bas (desired|usual|needed)\b", Severity::Informational),
        pattern(VAGUE_INSTRUCTIONS, r"(?i)\b(the )?usual way\b", Severity::Informational),
        pattern(VAGUE_INSTRUCTIONS, r"(?i)\buntil (it'?s )?ready\b", Severity::Informational),
        pattern(
            VAGUE_INSTRUCTIONS,
            r"(?i)\bprepare (all )?(the )?ingredients\b",
            Severity::Informational,
        ),
        pattern(VAGUE_INSTRUCTIONS, r"(?i)\bcombine everything\b", Severity::Informational),
        pattern(VAGUE_INSTRUCTIONS, r"(?i)\bfor a while\b", Severity::Informational),
        pattern(VAGUE_INSTRUCTIONS, r"(?i)\bsome time\b", Severity::Informational),
    ];

    /// Pairings that indicate an invented ingredient list.
    pub static ref UNREALISTIC_PAIRS: Vec<PairRule> = vec![
        pair("tuna", "marshmallows?"),
        pair("sardines?", "chocolate chips"),
        pair("gummy bears?", "chicken"),
        pair("ketchup", "ice cream"),
        pair("cotton candy", "mayonnaise"),
        pair("salmon", "sprinkles"),
        pair("anchovies", "frosting"),
        pair("oysters?", "marshmallows?"),
        pair("cake mix", "raw shrimp"),
    ];

    /// Servings stated in a yield. Group 1 is the count, group 2 the upper
    /// end of a range. A yield counted in anything but servings ("Makes 60
    /// cookies", "Yield: 2 loaves") is not matched.
    pub static ref SERVINGS_YIELD: Vec<Regex> = vec![
        // "Serves: 6", "serves about 40-80"
        counted(r"\bserves\s*:?\s*(?:about\s+|up\s+to\s+)?", ""),
        // "About 80 servings (1 cup each)", "6 to 8 people"
        counted("", r"\s*(?:servings?|people|persons|portions)\b"),
        // "Yield: 12", "Yields 10-12."
        counted(r"\byields?\s*:?\s*", r"\s*(?:$|[.,;(])"),
        // A bare count: "12", "6-8"
        counted(r"^\s*", r"\s*$"),
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches_any(rules: &[PatternRule], text: &str) -> bool {
        rules.iter().any(|r| r.pattern.is_match(text))
    }

    #[test]
    fn test_placeholders_are_anchored() {
        assert!(matches_any(&PLACEHOLDER_RULES, "Recipe Title"));
        assert!(matches_any(&PLACEHOLDER_RULES, "Ingredient 1"));
        assert!(matches_any(&PLACEHOLDER_RULES, "[insert step here]"));
        assert!(matches_any(&PLACEHOLDER_RULES, "..."));
        assert!(!matches_any(&PLACEHOLDER_RULES, "Title Town Chili"));
        assert!(!matches_any(&PLACEHOLDER_RULES, "Step up your pancake game"));
        assert!(!matches_any(&PLACEHOLDER_RULES, "Unknown Soldier Cocktail"));
    }

    #[test]
    fn test_generic_ingredients() {
        assert!(matches_any(&GENERIC_INGREDIENT_RULES, "spices"));
        assert!(matches_any(&GENERIC_INGREDIENT_RULES, "your favorite vegetables"));
        assert!(!matches_any(&GENERIC_INGREDIENT_RULES, "soy sauce"));
    }

    #[test]
    fn test_pairs_use_word_boundaries() {
        let tuna = &UNREALISTIC_PAIRS[0];
        assert!(tuna.first.is_match("canned tuna"));
        assert!(tuna.second.is_match("mini marshmallows"));
        assert!(!tuna.first.is_match("petunia petals"));
    }

    #[test]
    fn test_servings_yield_shapes() {
        let matched = |s: &str| SERVINGS_YIELD.iter().any(|r| r.is_match(s));
        for text in [
            "Serves 4",
            "Serves: 80",
            "Yield: 80 servings",
            "About 80 servings",
            "80 servings (1 cup each)",
            "6-8 servings",
            "Yields 12.",
            "120",
        ] {
            assert!(matched(text), "{}", text);
        }
        for text in ["Makes 60 cookies", "Yield: 2 loaves", "One 9-inch pie"] {
            assert!(!matched(text), "{}", text);
        }
    }
}

//! Provider output → [`StructuredRecipe`].
//!
//! Models wrap JSON in fences, prepend chatter, return arrays, flatten
//! ingredient groups and write amounts as fractions. The normalizer accepts
//! all of that and fails with a [`NormalizeError`] (never a panic) when there
//! is no recipe object to recover.

use serde_json::{Map, Value};

use crate::error::NormalizeError;
use crate::types::recipe::StructuredRecipe;

/// Group name used when the model returns a flat ingredient list.
pub const DEFAULT_GROUP_NAME: &str = "Ingredients";

/// snake_case or alternate field names accepted for camelCase fields.
const FIELD_ALIASES: &[(&str, &str)] = &[
    ("ingredient_groups", "ingredientGroups"),
    ("recipe_yield", "recipeYield"),
    ("yield", "recipeYield"),
    ("servings", "recipeYield"),
    ("prep_time", "prepTime"),
    ("cook_time", "cookTime"),
    ("total_time", "totalTime"),
    ("source_url", "sourceUrl"),
    ("steps", "instructions"),
    ("name", "title"),
];

const TEXT_FIELDS: &[&str] = &[
    "title",
    "description",
    "recipeYield",
    "prepTime",
    "cookTime",
    "totalTime",
    "sourceUrl",
    "image",
];

/// Candidate starts tried before giving up on a response.
const MAX_JSON_STARTS: usize = 16;

/// Parse raw provider text into a recipe.
pub fn normalize_response(raw: &str) -> Result<StructuredRecipe, NormalizeError> {
    let value = parse_embedded_json(raw)?;

    let mut object = select_recipe_object(value)
        .ok_or_else(|| NormalizeError::new("provider output is not a recipe object", raw))?;

    coerce_recipe(&mut object);

    serde_json::from_value(Value::Object(object))
        .map_err(|e| NormalizeError::new(format!("recipe shape mismatch: {}", e), raw))
}

/// The JSON value embedded in provider output.
///
/// A fenced block is searched before the whole text. Each `{`/`[` is tried
/// as a start, sliced to the last matching close, so bracketed prose ahead
/// of the JSON is skipped.
fn parse_embedded_json(raw: &str) -> Result<Value, NormalizeError> {
    let mut first_error = None;

    for body in fenced_block(raw).into_iter().chain(std::iter::once(raw)) {
        for (start, open) in body.match_indices(['{', '[']).take(MAX_JSON_STARTS) {
            let close = if open == "{" { '}' } else { ']' };
            let Some(end) = body.rfind(close).filter(|end| *end > start) else {
                continue;
            };
            match serde_json::from_str::<Value>(&body[start..=end]) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
    }

    Err(match first_error {
        Some(e) => NormalizeError::new(format!("invalid JSON: {}", e), raw),
        None => NormalizeError::new("no JSON object found in provider output", raw),
    })
}

/// Body of the first code fence, without its info string.
fn fenced_block(raw: &str) -> Option<&str> {
    let open = raw.find("```")?;
    let body = raw[open + 3..].trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    let end = body.find("```").unwrap_or(body.len());
    Some(&body[..end])
}

fn select_recipe_object(value: Value) -> Option<Map<String, Value>> {
    let object = match value {
        Value::Object(map) => map,
        Value::Array(items) => match items.into_iter().next()? {
            Value::Object(map) => map,
            _ => return None,
        },
        _ => return None,
    };

    // {"recipe": {...}}
    if object.len() == 1 {
        if let Some(Value::Object(inner)) = object.get("recipe") {
            return Some(inner.clone());
        }
    }
    Some(object)
}

fn coerce_recipe(object: &mut Map<String, Value>) {
    // Identifiers are assigned by the store only
    object.remove("id");

    for (alias, canonical) in FIELD_ALIASES {
        if !object.contains_key(*canonical) {
            if let Some(value) = object.remove(*alias) {
                object.insert(canonical.to_string(), value);
            }
        }
    }

    for field in TEXT_FIELDS {
        if let Some(value) = object.get_mut(*field) {
            *value = coerce_text(value.take());
        }
    }
    if object.get("title").map_or(true, Value::is_null) {
        object.insert("title".into(), Value::String(String::new()));
    }

    // Flat list → single default group
    let groups = match object.remove("ingredientGroups") {
        Some(Value::Array(groups)) if !groups.is_empty() => Value::Array(groups),
        _ => match object.remove("ingredients") {
            Some(Value::Array(items)) => Value::Array(vec![serde_json::json!({
                "name": DEFAULT_GROUP_NAME,
                "ingredients": items,
            })]),
            _ => Value::Array(Vec::new()),
        },
    };
    object.remove("ingredients");
    object.insert("ingredientGroups".into(), coerce_groups(groups));

    let instructions = object.remove("instructions").unwrap_or(Value::Null);
    object.insert(
        "instructions".into(),
        Value::Array(coerce_text_list(instructions, true)),
    );

    let tips = object.remove("tips").unwrap_or(Value::Null);
    object.insert("tips".into(), Value::Array(coerce_text_list(tips, false)));

    if let Some(nutrition) = object.get_mut("nutrition") {
        *nutrition = coerce_nutrition(nutrition.take());
    }
}

fn coerce_groups(groups: Value) -> Value {
    let Value::Array(groups) = groups else {
        return Value::Array(Vec::new());
    };

    // Ingredients listed directly under the groups key
    let (stray, groups): (Vec<Value>, Vec<Value>) =
        groups.into_iter().partition(is_ingredient_shaped);

    let mut coerced: Vec<Value> = groups.into_iter().filter_map(coerce_group).collect();
    if !stray.is_empty() {
        coerced.push(serde_json::json!({
            "name": DEFAULT_GROUP_NAME,
            "ingredients": stray.into_iter().filter_map(coerce_ingredient).collect::<Vec<_>>(),
        }));
    }
    Value::Array(coerced)
}

fn is_ingredient_shaped(value: &Value) -> bool {
    match value {
        Value::String(_) => true,
        Value::Object(map) => {
            !map.contains_key("ingredients")
                && ["amount", "quantity", "unit", "preparation"]
                    .iter()
                    .any(|k| map.contains_key(*k))
        }
        _ => false,
    }
}

fn coerce_group(group: Value) -> Option<Value> {
    let Value::Object(mut map) = group else {
        return None;
    };
    let name = match map.remove("name").map(coerce_text) {
        Some(Value::String(s)) if !s.trim().is_empty() => s,
        _ => DEFAULT_GROUP_NAME.to_string(),
    };
    let items = match map.remove("ingredients") {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    };
    Some(serde_json::json!({
        "name": name,
        "ingredients": items.into_iter().filter_map(coerce_ingredient).collect::<Vec<_>>(),
    }))
}

fn coerce_ingredient(item: Value) -> Option<Value> {
    let mut map = match item {
        Value::String(s) if !s.trim().is_empty() => {
            let mut map = Map::new();
            map.insert("name".into(), Value::String(s.trim().to_string()));
            map
        }
        Value::Object(map) => map,
        _ => return None,
    };

    if let Some(value) = map.get_mut("name") {
        *value = coerce_text(value.take());
    }
    if !matches!(map.get("name"), Some(Value::String(_))) {
        map.insert("name".into(), Value::String(String::new()));
    }

    match map.remove("amount").or_else(|| map.remove("quantity")) {
        Some(Value::Number(n)) => {
            map.insert("amount".into(), Value::Number(n));
        }
        Some(Value::String(s)) => {
            let (amount, rest) = parse_quantity(&s);
            map.insert(
                "amount".into(),
                amount
                    .and_then(serde_json::Number::from_f64)
                    .map_or(Value::Null, Value::Number),
            );
            let has_unit = matches!(map.get("unit"), Some(Value::String(u)) if !u.is_empty());
            if amount.is_some() && !has_unit && !rest.is_empty() {
                map.insert("unit".into(), Value::String(rest.to_string()));
            }
        }
        _ => {}
    }

    for field in ["unit", "preparation"] {
        if let Some(value) = map.get_mut(field) {
            *value = coerce_text(value.take());
        }
    }

    let substitutions = map.remove("substitutions").unwrap_or(Value::Null);
    map.insert(
        "substitutions".into(),
        Value::Array(coerce_text_list(substitutions, false)),
    );

    Some(Value::Object(map))
}

fn coerce_nutrition(value: Value) -> Value {
    let Value::Object(mut map) = value else {
        return Value::Null;
    };

    if let Some(calories) = map.get_mut("calories") {
        *calories = match calories.take() {
            Value::Number(n) => Value::Number(n),
            Value::String(s) => parse_quantity(&s)
                .0
                .and_then(serde_json::Number::from_f64)
                .map_or(Value::Null, Value::Number),
            _ => Value::Null,
        };
    }
    for field in ["protein", "carbohydrates", "fat", "fiber", "sugar", "sodium"] {
        if let Some(value) = map.get_mut(field) {
            *value = coerce_text(value.take());
        }
    }
    Value::Object(map)
}

/// Strings stay strings, numbers become strings, everything else is null.
fn coerce_text(value: Value) -> Value {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Value::Null
            } else {
                Value::String(trimmed.to_string())
            }
        }
        Value::Number(n) => Value::String(n.to_string()),
        _ => Value::Null,
    }
}

/// Arrays of strings or `{text}` objects; a lone string is split by line
/// when `split_lines` is set.
fn coerce_text_list(value: Value, split_lines: bool) -> Vec<Value> {
    let items = match value {
        Value::Array(items) => items,
        Value::String(s) if split_lines => {
            s.lines().map(|l| Value::String(l.to_string())).collect()
        }
        Value::String(s) => vec![Value::String(s)],
        _ => Vec::new(),
    };

    items
        .into_iter()
        .filter_map(|item| {
            let text = match item {
                Value::String(s) => s,
                Value::Object(map) => ["text", "step", "description", "instruction"]
                    .iter()
                    .find_map(|k| map.get(*k).and_then(Value::as_str))
                    .map(String::from)?,
                _ => return None,
            };
            let text = text.trim();
            (!text.is_empty()).then(|| Value::String(text.to_string()))
        })
        .collect()
}

/// Parse a leading quantity ("1 1/2 cups", "½", "0.5", "2-3") into a decimal.
///
/// Returns the amount and the unparsed remainder.
pub fn parse_quantity(text: &str) -> (Option<f64>, &str) {
    let text = text.trim();
    let mut total: Option<f64> = None;
    let mut rest = text;

    loop {
        let token_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let token = &rest[..token_end];
        let Some(value) = parse_number_token(token) else {
            break;
        };
        // Only "whole + fraction" combines; "2 3" does not
        if let Some(prev) = total {
            if value >= 1.0 || prev.fract() != 0.0 {
                break;
            }
        }
        total = Some(total.unwrap_or(0.0) + value);
        rest = rest[token_end..].trim_start();
        if rest.is_empty() {
            break;
        }
    }

    (total, rest)
}

fn parse_number_token(token: &str) -> Option<f64> {
    if token.is_empty() {
        return None;
    }

    // Ranges keep the lower bound
    let token = token.split(['-', '–']).next().unwrap_or(token);

    if let Some(v) = unicode_fraction(token) {
        return Some(v);
    }

    // "1½"
    let mut chars = token.chars();
    if let Some(last) = chars.next_back() {
        if let Some(frac) = unicode_fraction(&last.to_string()) {
            let whole = chars.as_str();
            if !whole.is_empty() {
                return whole.parse::<f64>().ok().map(|w| w + frac);
            }
        }
    }

    if let Some((num, den)) = token.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        return (den != 0.0).then(|| num / den);
    }

    token.parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0)
}

fn unicode_fraction(token: &str) -> Option<f64> {
    Some(match token {
        "½" => 0.5,
        "⅓" => 1.0 / 3.0,
        "⅔" => 2.0 / 3.0,
        "¼" => 0.25,
        "¾" => 0.75,
        "⅛" => 0.125,
        "⅜" => 0.375,
        "⅝" => 0.625,
        "⅞" => 0.875,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_fences_and_prose() {
        let raw = "Sure! Here is the recipe:\n```json\n{\"title\": \"Soup\", \"ingredients\": [\"water\"], \"instructions\": [\"Boil.\"]}\n```\nEnjoy!";
        let recipe = normalize_response(raw).unwrap();
        assert_eq!(recipe.title, "Soup");
        assert_eq!(recipe.instructions, vec!["Boil."]);
    }

    #[test]
    fn test_bracketed_prose_before_fence() {
        let raw = "Here is the recipe [as JSON]:\n```json\n{\"title\": \"Soup\", \"ingredients\": [\"water\"], \"instructions\": [\"Boil.\"]}\n```";
        let recipe = normalize_response(raw).unwrap();
        assert_eq!(recipe.title, "Soup");
        assert_eq!(recipe.instructions, vec!["Boil."]);

        // Same prose without a fence
        let raw = "Recipe (see [notes]) follows: {\"title\": \"Stew\", \"instructions\": [\"Simmer.\"]}";
        assert_eq!(normalize_response(raw).unwrap().title, "Stew");
    }

    #[test]
    fn test_ingredients_listed_under_groups_key() {
        let raw = r#"{"title": "Tea", "ingredientGroups": [{"name": "water", "amount": 1, "unit": "cup"}, "1 tea bag"]}"#;
        let recipe = normalize_response(raw).unwrap();

        assert_eq!(recipe.ingredient_groups.len(), 1);
        let group = &recipe.ingredient_groups[0];
        assert_eq!(group.name, DEFAULT_GROUP_NAME);
        assert_eq!(group.ingredients.len(), 2);
        assert_eq!(group.ingredients[0].name, "water");
        assert_eq!(group.ingredients[0].amount, Some(1.0));
        assert_eq!(group.ingredients[1].name, "1 tea bag");

        // Real groups keep their shape; strays collect into the default group
        let raw = r#"{"title": "Tea", "ingredientGroups": [{"name": "Syrup", "ingredients": ["sugar"]}, "lemon"]}"#;
        let recipe = normalize_response(raw).unwrap();
        assert_eq!(recipe.ingredient_groups.len(), 2);
        assert_eq!(recipe.ingredient_groups[0].name, "Syrup");
        assert_eq!(recipe.ingredient_groups[1].name, DEFAULT_GROUP_NAME);
        assert_eq!(recipe.ingredient_groups[1].ingredients[0].name, "lemon");
    }

    #[test]
    fn test_flat_ingredients_become_default_group() {
        let raw = r#"{"title": "Eggs", "ingredients": ["2 eggs", {"name": "butter", "amount": "1 1/2", "unit": "tbsp"}], "instructions": []}"#;
        let recipe = normalize_response(raw).unwrap();

        assert_eq!(recipe.ingredient_groups.len(), 1);
        assert_eq!(recipe.ingredient_groups[0].name, DEFAULT_GROUP_NAME);
        let items = &recipe.ingredient_groups[0].ingredients;
        assert_eq!(items[0].name, "2 eggs");
        assert_eq!(items[1].amount, Some(1.5));
        assert_eq!(items[1].unit.as_deref(), Some("tbsp"));
    }

    #[test]
    fn test_array_and_wrapper() {
        let array = r#"[{"title": "First"}, {"title": "Second"}]"#;
        assert_eq!(normalize_response(array).unwrap().title, "First");

        let wrapped = r#"{"recipe": {"title": "Wrapped", "recipeYield": 4}}"#;
        let recipe = normalize_response(wrapped).unwrap();
        assert_eq!(recipe.title, "Wrapped");
        assert_eq!(recipe.recipe_yield.as_deref(), Some("4"));
    }

    #[test]
    fn test_lenient_fields() {
        let raw = r#"{
            "title": "Curry",
            "servings": "6 servings",
            "ingredientGroups": [{"ingredients": [{"name": "rice", "amount": "½", "substitutions": "quinoa"}]}],
            "instructions": [{"text": "Cook the rice."}, "  ", {"step": "Serve."}],
            "nutrition": {"calories": "350 kcal", "protein": 12},
            "tips": "Use day-old rice."
        }"#;
        let recipe = normalize_response(raw).unwrap();

        assert_eq!(recipe.recipe_yield.as_deref(), Some("6 servings"));
        assert_eq!(recipe.ingredient_groups[0].name, DEFAULT_GROUP_NAME);
        let rice = &recipe.ingredient_groups[0].ingredients[0];
        assert_eq!(rice.amount, Some(0.5));
        assert_eq!(rice.substitutions, vec!["quinoa"]);
        assert_eq!(recipe.instructions, vec!["Cook the rice.", "Serve."]);
        let nutrition = recipe.nutrition.unwrap();
        assert_eq!(nutrition.calories, Some(350.0));
        assert_eq!(nutrition.protein.as_deref(), Some("12"));
        assert_eq!(recipe.tips, vec!["Use day-old rice."]);
    }

    #[test]
    fn test_failures_carry_raw_text() {
        let err = normalize_response("I could not find a recipe.").unwrap_err();
        assert_eq!(err.raw, "I could not find a recipe.");

        let err = normalize_response("{\"title\": ").unwrap_err();
        assert!(err.message.contains("no JSON") || err.message.contains("invalid JSON"));

        assert!(normalize_response("[1, 2]").is_err());
        assert!(normalize_response("[]").is_err());
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("1/2"), (Some(0.5), ""));
        assert_eq!(parse_quantity("1 1/2 cups"), (Some(1.5), "cups"));
        assert_eq!(parse_quantity("0.5"), (Some(0.5), ""));
        assert_eq!(parse_quantity("1½ tsp"), (Some(1.5), "tsp"));
        assert_eq!(parse_quantity("2-3 cloves"), (Some(2.0), "cloves"));
        assert_eq!(parse_quantity("350 kcal"), (Some(350.0), "kcal"));
        assert_eq!(parse_quantity("a pinch"), (None, "a pinch"));
        assert_eq!(parse_quantity("1/0"), (None, "1/0"));
    }

    #[test]
    fn test_amount_string_fills_missing_unit() {
        let raw = r#"{"title": "T", "ingredients": [{"name": "flour", "amount": "2 cups"}]}"#;
        let recipe = normalize_response(raw).unwrap();
        let flour = &recipe.ingredient_groups[0].ingredients[0];
        assert_eq!(flour.amount, Some(2.0));
        assert_eq!(flour.unit.as_deref(), Some("cups"));
    }

    #[test]
    fn test_missing_title_is_empty_not_error() {
        let recipe = normalize_response(r#"{"instructions": "Mix.\nBake."}"#).unwrap();
        assert_eq!(recipe.title, "");
        assert_eq!(recipe.instructions, vec!["Mix.", "Bake."]);
    }
}

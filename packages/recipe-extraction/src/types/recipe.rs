//! The canonical structured recipe.

use serde::{Deserialize, Serialize};

/// Canonical normalized recipe consumed by all downstream collaborators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredRecipe {
    /// Store-assigned identifier (backfilled after the first write)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub ingredient_groups: Vec<IngredientGroup>,

    #[serde(default)]
    pub instructions: Vec<String>,

    #[serde(default)]
    pub recipe_yield: Option<String>,

    #[serde(default)]
    pub prep_time: Option<String>,

    #[serde(default)]
    pub cook_time: Option<String>,

    #[serde(default)]
    pub total_time: Option<String>,

    #[serde(default)]
    pub nutrition: Option<Nutrition>,

    #[serde(default)]
    pub tips: Vec<String>,

    #[serde(default)]
    pub source_url: Option<String>,

    #[serde(default)]
    pub image: Option<String>,
}

/// A named group of ingredients ("For the sauce", "Dough", ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientGroup {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
}

/// A single ingredient line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    #[serde(default)]
    pub name: String,

    /// Decimal amount (fractions converted by the model or normalizer)
    #[serde(default)]
    pub amount: Option<f64>,

    #[serde(default)]
    pub unit: Option<String>,

    #[serde(default)]
    pub preparation: Option<String>,

    #[serde(default)]
    pub substitutions: Vec<String>,
}

/// Per-serving nutrition facts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nutrition {
    #[serde(default)]
    pub calories: Option<f64>,
    #[serde(default)]
    pub protein: Option<String>,
    #[serde(default)]
    pub carbohydrates: Option<String>,
    #[serde(default)]
    pub fat: Option<String>,
    #[serde(default)]
    pub fiber: Option<String>,
    #[serde(default)]
    pub sugar: Option<String>,
    #[serde(default)]
    pub sodium: Option<String>,
}

impl StructuredRecipe {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_group(mut self, group: IngredientGroup) -> Self {
        self.ingredient_groups.push(group);
        self
    }

    pub fn with_instructions(
        mut self,
        steps: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.instructions = steps.into_iter().map(|s| s.into()).collect();
        self
    }

    pub fn with_yield(mut self, recipe_yield: impl Into<String>) -> Self {
        self.recipe_yield = Some(recipe_yield.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    /// All ingredients across all groups.
    pub fn ingredients(&self) -> impl Iterator<Item = &Ingredient> {
        self.ingredient_groups.iter().flat_map(|g| g.ingredients.iter())
    }

    /// Total ingredient count across all groups.
    pub fn ingredient_count(&self) -> usize {
        self.ingredient_groups.iter().map(|g| g.ingredients.len()).sum()
    }

    /// Instructions with non-blank text.
    pub fn non_empty_instructions(&self) -> impl Iterator<Item = &str> {
        self.instructions
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    /// A provider "succeeded" but returned nothing recipe-shaped.
    pub fn is_structurally_empty(&self) -> bool {
        self.ingredient_count() == 0 && self.non_empty_instructions().next().is_none()
    }

    /// Text used for embedding-based matching.
    pub fn embedding_text(&self) -> String {
        match self.description.as_deref().map(str::trim) {
            Some(d) if !d.is_empty() => format!("{}\n{}", self.title.trim(), d),
            _ => self.title.trim().to_string(),
        }
    }
}

impl IngredientGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ingredients: Vec::new(),
        }
    }

    pub fn with_ingredient(mut self, ingredient: Ingredient) -> Self {
        self.ingredients.push(ingredient);
        self
    }
}

impl Ingredient {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_amount(mut self, amount: f64, unit: impl Into<String>) -> Self {
        self.amount = Some(amount);
        self.unit = Some(unit.into());
        self
    }

    pub fn with_substitution(mut self, substitution: impl Into<String>) -> Self {
        self.substitutions.push(substitution.into());
        self
    }
}

//! Wire format of the random-recipes endpoint.

use serde::{Deserialize, Serialize};

/// `{ "recipes": [...] }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeResponse {
    #[serde(default)]
    pub recipes: Vec<TrendingRecipe>,
}

/// A recipe from the discovery API. Read-only; never mirrored into the
/// shared collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingRecipe {
    pub id: i64,
    pub title: String,
    /// Some entries come back without a picture.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
}

//! Flat document representation used by the remote collection.
//!
//! The remote store has no schema: every document is a mapping of field name
//! to scalar. Recipes are written under the field names the mobile clients
//! already use (`title`, `description`, `imageUrl`, `createdAt`, `userId`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use recipeshare_core::{Recipe, RecipeId, UserId};

pub const FIELD_TITLE: &str = "title";
pub const FIELD_DESCRIPTION: &str = "description";
pub const FIELD_IMAGE_URL: &str = "imageUrl";
pub const FIELD_CREATED_AT: &str = "createdAt";
pub const FIELD_OWNER: &str = "userId";

/// A single scalar field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    String(String),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(v) => Some(*v),
            _ => None,
        }
    }
}

/// Field name → scalar mapping for one document (the id is not a field).
pub type Document = BTreeMap<String, FieldValue>;

/// Encode a recipe as a document. Absent optional fields are written as
/// empty strings, matching what older clients expect.
pub fn recipe_to_document(recipe: &Recipe) -> Document {
    let mut doc = Document::new();
    doc.insert(FIELD_TITLE.into(), FieldValue::String(recipe.title.clone()));
    doc.insert(
        FIELD_DESCRIPTION.into(),
        FieldValue::String(recipe.description.clone()),
    );
    doc.insert(
        FIELD_IMAGE_URL.into(),
        FieldValue::String(recipe.image_url.clone().unwrap_or_default()),
    );
    doc.insert(FIELD_CREATED_AT.into(), FieldValue::Integer(recipe.created_at));
    doc.insert(
        FIELD_OWNER.into(),
        FieldValue::String(
            recipe
                .owner_id
                .as_ref()
                .map(|u| u.as_str().to_string())
                .unwrap_or_default(),
        ),
    );
    doc
}

/// Decode a document into a recipe.
///
/// Returns `None` when the document has no title (not a recipe we can show).
/// A missing `createdAt` decodes as `0` so the value stays stable across
/// snapshots instead of drifting with the clock.
pub fn recipe_from_document(id: &RecipeId, doc: &Document) -> Option<Recipe> {
    let title = doc.get(FIELD_TITLE).and_then(FieldValue::as_str)?.to_string();
    let text = |field: &str| {
        doc.get(field)
            .and_then(FieldValue::as_str)
            .map(str::to_string)
            .filter(|s| !s.is_empty())
    };

    Some(Recipe {
        id: id.clone(),
        title,
        description: text(FIELD_DESCRIPTION).unwrap_or_default(),
        image_url: text(FIELD_IMAGE_URL),
        owner_id: text(FIELD_OWNER).map(UserId::new),
        created_at: doc
            .get(FIELD_CREATED_AT)
            .and_then(FieldValue::as_i64)
            .unwrap_or(0),
    })
}

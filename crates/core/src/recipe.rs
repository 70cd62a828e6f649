//! Recipe entity and the draft used to create one.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::id::{RecipeId, UserId};

/// A shared recipe, as mirrored between the device cache and the remote
/// collection.
///
/// `created_at` is milliseconds since the Unix epoch. It is stamped once at
/// creation and is the default ordering key (newest first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: RecipeId,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<UserId>,
    pub created_at: i64,
}

impl Recipe {
    /// Whether `user` authored this recipe. Anonymous recipes belong to nobody.
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        self.owner_id.as_ref() == Some(user)
    }

    /// Rewrite the user-editable fields, keeping identity, owner and
    /// `created_at` untouched.
    pub fn with_edits(&self, draft: RecipeDraft) -> DomainResult<Recipe> {
        draft.validate()?;
        Ok(Recipe {
            id: self.id.clone(),
            title: draft.title.trim().to_string(),
            description: draft.description.trim().to_string(),
            image_url: normalize_url(draft.image_url),
            owner_id: self.owner_id.clone(),
            created_at: self.created_at,
        })
    }
}

/// User-authored fields submitted from a create or edit form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeDraft {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl RecipeDraft {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            image_url: None,
        }
    }

    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    /// Title and description are both required.
    pub fn validate(&self) -> DomainResult<()> {
        if self.title.trim().is_empty() {
            return Err(DomainError::validation("title must not be empty"));
        }
        if self.description.trim().is_empty() {
            return Err(DomainError::validation("description must not be empty"));
        }
        Ok(())
    }

    /// Turn a validated draft into a recipe with the given identity.
    pub fn into_recipe(
        self,
        id: RecipeId,
        owner_id: Option<UserId>,
        created_at: i64,
    ) -> DomainResult<Recipe> {
        self.validate()?;
        Ok(Recipe {
            id,
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            image_url: normalize_url(self.image_url),
            owner_id,
            created_at,
        })
    }
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Sort newest first. Ties on `created_at` fall back to id so the order is
/// total and independent of insertion order.
pub fn sort_newest_first(recipes: &mut [Recipe]) {
    recipes.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Read-side "my recipes" filter.
pub fn owned_by(recipes: &[Recipe], user: &UserId) -> Vec<Recipe> {
    recipes.iter().filter(|r| r.is_owned_by(user)).cloned().collect()
}

fn normalize_url(url: Option<String>) -> Option<String> {
    url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe(id: &str, created_at: i64, owner: Option<&str>) -> Recipe {
        Recipe {
            id: RecipeId::new(id),
            title: format!("title {id}"),
            description: "desc".to_string(),
            image_url: None,
            owner_id: owner.map(UserId::new),
            created_at,
        }
    }

    #[test]
    fn draft_requires_title_and_description() {
        assert!(RecipeDraft::new("", "Warm").validate().is_err());
        assert!(RecipeDraft::new("Soup", "   ").validate().is_err());
        assert!(RecipeDraft::new("Soup", "Warm").validate().is_ok());
    }

    #[test]
    fn into_recipe_trims_and_drops_blank_image() {
        let r = RecipeDraft::new(" Soup ", "Warm")
            .with_image_url("  ")
            .into_recipe(RecipeId::new("r1"), Some(UserId::new("u1")), 42)
            .unwrap();

        assert_eq!(r.title, "Soup");
        assert_eq!(r.image_url, None);
        assert_eq!(r.created_at, 42);
        assert!(r.is_owned_by(&UserId::new("u1")));
    }

    #[test]
    fn edits_keep_identity_and_created_at() {
        let original = recipe("r1", 100, Some("u1"));
        let edited = original
            .with_edits(RecipeDraft::new("New", "Body").with_image_url("https://img/x"))
            .unwrap();

        assert_eq!(edited.id, original.id);
        assert_eq!(edited.created_at, 100);
        assert_eq!(edited.owner_id, original.owner_id);
        assert_eq!(edited.title, "New");
        assert_eq!(edited.image_url.as_deref(), Some("https://img/x"));
    }

    #[test]
    fn sorts_newest_first_with_id_tiebreak() {
        let mut list = vec![
            recipe("b", 10, None),
            recipe("c", 30, None),
            recipe("a", 10, None),
        ];
        sort_newest_first(&mut list);
        let ids: Vec<_> = list.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn owned_by_skips_anonymous_and_other_users() {
        let list = vec![
            recipe("a", 1, Some("u1")),
            recipe("b", 2, None),
            recipe("c", 3, Some("u2")),
        ];
        let mine = owned_by(&list, &UserId::new("u1"));
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id.as_str(), "a");
    }

    #[test]
    fn serde_uses_camel_case_fields() {
        let json = serde_json::to_value(recipe("a", 5, Some("u1"))).unwrap();
        assert_eq!(json["createdAt"], 5);
        assert_eq!(json["ownerId"], "u1");
        assert!(json.get("imageUrl").is_none());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: ordering does not depend on the input permutation.
            #[test]
            fn ordering_is_permutation_independent(
                stamps in proptest::collection::vec(0i64..50, 0..30),
                seed in any::<u64>(),
            ) {
                let list: Vec<Recipe> = stamps
                    .iter()
                    .enumerate()
                    .map(|(i, ts)| recipe(&format!("r{i}"), *ts, None))
                    .collect();

                let mut shuffled = list.clone();
                // Deterministic rotation driven by the seed.
                if !shuffled.is_empty() {
                    let k = (seed as usize) % shuffled.len();
                    shuffled.rotate_left(k);
                    shuffled.reverse();
                }

                let mut a = list;
                sort_newest_first(&mut a);
                sort_newest_first(&mut shuffled);
                prop_assert_eq!(&a, &shuffled);

                for pair in a.windows(2) {
                    prop_assert!(pair[0].created_at >= pair[1].created_at);
                }
            }
        }
    }
}

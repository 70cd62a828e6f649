//! `recipeshare-core`: the recipe entity model.
//!
//! This crate contains **pure domain** types (no IO, no async). Every other
//! crate in the workspace speaks in terms of these.

pub mod error;
pub mod id;
pub mod profile;
pub mod recipe;

pub use error::{DomainError, DomainResult};
pub use id::{RecipeId, UserId};
pub use profile::UserProfile;
pub use recipe::{Recipe, RecipeDraft, now_millis, owned_by, sort_newest_first};

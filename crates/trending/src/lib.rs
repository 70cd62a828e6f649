//! `recipeshare-trending`
//!
//! **Responsibility:** the externally sourced "trending recipes" list.
//!
//! - `SpoonacularClient`: HTTP client for the recipe-discovery API
//! - `TrendingFeed`: screen state (recipes, loading flag, error message)

pub mod client;
pub mod error;
pub mod feed;
pub mod model;

pub use client::{SpoonacularClient, SpoonacularConfig, TrendingSource};
pub use error::TrendingError;
pub use feed::{FeedState, LOAD_FAILED_MESSAGE, TrendingFeed};
pub use model::{RecipeResponse, TrendingRecipe};

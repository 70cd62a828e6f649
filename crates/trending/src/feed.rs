//! Trending screen state.

use std::sync::{Arc, RwLock};

use crate::client::TrendingSource;
use crate::model::TrendingRecipe;

/// Shown when a refresh fails.
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load recipes.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedState {
    pub recipes: Vec<TrendingRecipe>,
    pub is_loading: bool,
    pub error_message: Option<String>,
}

pub struct TrendingFeed {
    source: Arc<dyn TrendingSource>,
    count: u32,
    state: RwLock<FeedState>,
}

impl TrendingFeed {
    pub fn new(source: Arc<dyn TrendingSource>, count: u32) -> Self {
        Self {
            source,
            count,
            state: RwLock::new(FeedState::default()),
        }
    }

    pub fn state(&self) -> FeedState {
        match self.state.read() {
            Ok(s) => s.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn update(&self, f: impl FnOnce(&mut FeedState)) {
        match self.state.write() {
            Ok(mut s) => f(&mut s),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    /// Reload the list. On failure the previous recipes stay and the error
    /// message is set; the cause is only logged.
    pub async fn refresh(&self) -> FeedState {
        self.update(|s| {
            s.is_loading = true;
            s.error_message = None;
        });

        let result = self.source.fetch_trending(self.count).await;

        self.update(|s| {
            match result {
                Ok(recipes) => s.recipes = recipes,
                Err(err) => {
                    tracing::warn!("failed to load trending recipes: {err}");
                    s.error_message = Some(LOAD_FAILED_MESSAGE.to_string());
                }
            }
            s.is_loading = false;
        });

        self.state()
    }
}

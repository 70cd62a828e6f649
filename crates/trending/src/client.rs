//! Recipe-discovery API client.

use async_trait::async_trait;

use crate::error::TrendingError;
use crate::model::{RecipeResponse, TrendingRecipe};

pub const DEFAULT_BASE_URL: &str = "https://api.spoonacular.com/";
pub const DEFAULT_COUNT: u32 = 10;

#[async_trait]
pub trait TrendingSource: Send + Sync {
    /// `count` random recipes.
    async fn fetch_trending(&self, count: u32) -> Result<Vec<TrendingRecipe>, TrendingError>;
}

#[derive(Debug, Clone)]
pub struct SpoonacularConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Recipes per refresh.
    pub count: u32,
}

impl Default for SpoonacularConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            count: DEFAULT_COUNT,
        }
    }
}

impl SpoonacularConfig {
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }
}

/// HTTP client for `GET {base}/recipes/random?number=N&apiKey=K`.
#[derive(Debug, Clone)]
pub struct SpoonacularClient {
    http: reqwest::Client,
    config: SpoonacularConfig,
}

impl SpoonacularClient {
    pub fn new(config: SpoonacularConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &SpoonacularConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!("{}/recipes/random", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl TrendingSource for SpoonacularClient {
    async fn fetch_trending(&self, count: u32) -> Result<Vec<TrendingRecipe>, TrendingError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(TrendingError::MissingApiKey)?;

        let resp = self
            .http
            .get(self.endpoint())
            .query(&[("number", count.to_string()), ("apiKey", api_key.to_string())])
            .send()
            .await
            .map_err(|e| TrendingError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(TrendingError::Api(
                resp.status().as_u16(),
                resp.text().await.unwrap_or_default(),
            ));
        }

        let body: RecipeResponse = resp
            .json()
            .await
            .map_err(|e| TrendingError::Parse(e.to_string()))?;

        tracing::debug!(count = body.recipes.len(), "fetched trending recipes");
        Ok(body.recipes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response and hand back the request line.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}/", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = socket.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).to_string();

            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            request.lines().next().unwrap_or_default().to_string()
        });

        (base, handle)
    }

    #[tokio::test]
    async fn requests_random_recipes_with_count_and_key() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"recipes":[{"id":1,"title":"Pho","image":"https://img/pho.jpg"}]}"#,
        )
        .await;
        let client = SpoonacularClient::new(
            SpoonacularConfig::default()
                .with_base_url(base)
                .with_api_key("secret"),
        );

        let recipes = client.fetch_trending(3).await.unwrap();
        assert_eq!(recipes.len(), 1);
        assert_eq!(recipes[0].title, "Pho");

        let request_line = server.await.unwrap();
        assert!(request_line.starts_with("GET /recipes/random?"));
        assert!(request_line.contains("number=3"));
        assert!(request_line.contains("apiKey=secret"));
    }

    #[tokio::test]
    async fn non_success_status_is_an_api_error() {
        let (base, _server) = serve_once("402 Payment Required", r#"{"message":"quota"}"#).await;
        let client = SpoonacularClient::new(
            SpoonacularConfig::default()
                .with_base_url(base)
                .with_api_key("secret"),
        );

        match client.fetch_trending(10).await {
            Err(TrendingError::Api(status, _)) => assert_eq!(status, 402),
            other => panic!("expected API error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_key_fails_without_a_request() {
        let client = SpoonacularClient::new(SpoonacularConfig::default());
        assert_eq!(
            client.fetch_trending(10).await.unwrap_err(),
            TrendingError::MissingApiKey
        );
    }
}

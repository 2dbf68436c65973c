/// SerpApi-compatible web search provider
///
/// Issues Google-engine searches against a `/search` endpoint and returns the
/// raw `organic_results` envelope untouched. The discovery pipeline owns
/// normalization and the classification of absent result fields; this adapter
/// only speaks HTTP.
use crate::{
    error::{AppError, AppResult},
    models::WebSearchResponse,
    services::providers::{SearchOptions, SearchProvider},
};
use reqwest::Client as HttpClient;

#[derive(Clone)]
pub struct SerpSearchProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
}

impl SerpSearchProvider {
    /// Creates a provider against the given base URL (e.g. `https://serpapi.com`)
    pub fn new(api_key: String, api_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
        }
    }
}

#[async_trait::async_trait]
impl SearchProvider for SerpSearchProvider {
    async fn query(&self, text: &str, options: SearchOptions) -> AppResult<WebSearchResponse> {
        if text.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Search query cannot be empty".to_string(),
            ));
        }

        let url = format!("{}/search", self.api_url);
        let limit = options.limit.to_string();

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("engine", "google"),
                ("q", text),
                ("num", limit.as_str()),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Search API returned status {}: {}",
                status, body
            )));
        }

        let parsed: WebSearchResponse = response.json().await?;

        tracing::info!(
            query = %text,
            results = parsed.organic_results.as_ref().map(Vec::len).unwrap_or(0),
            provider = "serpapi",
            "Web search completed"
        );

        Ok(parsed)
    }

    fn name(&self) -> &'static str {
        "serpapi"
    }
}

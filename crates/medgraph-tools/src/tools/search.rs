//! Search tool — web search for guidelines and studies via the Tavily API

use crate::registry::{Tool, ToolResult};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const TAVILY_API_URL: &str = "https://api.tavily.com/search";

pub struct SearchTool {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl SearchTool {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            api_key,
            base_url: TAVILY_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'a str,
}

#[async_trait::async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "search"
    }

    fn description(&self) -> &str {
        "Search the web for medical guidelines and articles."
    }

    async fn execute(&self, args: Value) -> ToolResult {
        let query = match args["query"].as_str() {
            Some(q) => q,
            None => return ToolResult::error("Missing required parameter: query"),
        };

        let api_key = match &self.api_key {
            Some(k) => k,
            None => return ToolResult::text("Error: Tavily API key not set."),
        };

        debug!("search: {}", query);

        let response = self
            .client
            .post(&self.base_url)
            .json(&SearchRequest {
                api_key,
                query,
                search_depth: "advanced",
            })
            .send()
            .await;

        // Failures come back as text so the workflow can continue.
        let response = match response {
            Ok(r) => r,
            Err(e) => return ToolResult::text(format!("Search failed: {}", e)),
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return ToolResult::text(format!("Search failed: {}: {}", status, body));
        }

        match response.json::<Value>().await {
            Ok(body) => {
                let results = body.get("results").cloned().unwrap_or(Value::Array(vec![]));
                ToolResult::Json(results)
            }
            Err(e) => ToolResult::text(format!("Search failed: {}", e)),
        }
    }
}

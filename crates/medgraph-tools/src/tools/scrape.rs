//! Scrape tool — fetch a guideline page and reduce it to readable text
//!
//! Runs with a fixed per-request timeout. Every failure path surfaces as
//! a textual tool result; the HTTP response is the only held resource and
//! it is dropped on every exit path.

use crate::registry::{Tool, ToolResult};
use regex::Regex;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const SCRAPE_TIMEOUT_SECS: u64 = 60;
const MAX_TEXT_CHARS: usize = 8000;
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub struct ScrapeTool {
    client: Client,
}

impl Default for ScrapeTool {
    fn default() -> Self {
        Self::new()
    }
}

impl ScrapeTool {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(SCRAPE_TIMEOUT_SECS))
                .user_agent(USER_AGENT)
                .build()
                .unwrap_or_default(),
        }
    }
}

#[async_trait::async_trait]
impl Tool for ScrapeTool {
    fn name(&self) -> &str {
        "scrape"
    }

    fn description(&self) -> &str {
        "Fetch content from a medical website and return its visible text."
    }

    async fn execute(&self, args: Value) -> ToolResult {
        let url = match args["url"].as_str() {
            Some(u) => u,
            None => return ToolResult::error("Missing required parameter: url"),
        };

        debug!("scrape: {}", url);

        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => return ToolResult::text(format!("Scraping failed: {}", e)),
        };

        if !response.status().is_success() {
            return ToolResult::text(format!("Scraping failed: HTTP {}", response.status()));
        }

        match response.text().await {
            Ok(html) => {
                let text = extract_text(&html);
                // Char-based cut; byte truncation can split multibyte text.
                if text.chars().count() > MAX_TEXT_CHARS {
                    ToolResult::text(text.chars().take(MAX_TEXT_CHARS).collect::<String>())
                } else {
                    ToolResult::text(text)
                }
            }
            Err(e) => ToolResult::text(format!("Scraping failed: {}", e)),
        }
    }
}

/// Strip scripts, styles, and markup; collapse whitespace.
fn extract_text(html: &str) -> String {
    // (?s) so blocks spanning lines are removed whole
    let without_scripts = Regex::new(r"(?is)<(script|style|noscript)[^>]*>.*?</(script|style|noscript)>")
        .map(|re| re.replace_all(html, " ").into_owned())
        .unwrap_or_else(|_| html.to_string());

    let without_tags = Regex::new(r"<[^>]+>")
        .map(|re| re.replace_all(&without_scripts, " ").into_owned())
        .unwrap_or(without_scripts);

    let collapsed = Regex::new(r"\s+")
        .map(|re| re.replace_all(&without_tags, " ").into_owned())
        .unwrap_or(without_tags);

    collapsed.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_text_strips_markup() {
        let html = "<html><head><style>body{}</style></head>\
             <body><h1>Hypertension</h1><p>Target &lt; 140/90.</p>\
             <script>var x = 1;</script></body></html>";
        let text = extract_text(html);
        assert!(text.contains("Hypertension"));
        assert!(!text.contains("script"));
        assert!(!text.contains("body{}"));
    }

    #[test]
    fn extract_text_collapses_whitespace() {
        let text = extract_text("<p>a</p>\n\n\n<p>b</p>");
        assert_eq!(text, "a b");
    }
}

//! Medgraph Tools — modular research tool implementations
//!
//! Each tool is a self-contained file in src/tools/.
//! To add a tool: create the file, implement Tool trait, register below.

pub mod registry;
pub mod tools;

pub use registry::{Tool, ToolRegistry, ToolResult};

/// Create the default tool registry: web search + page scraping.
///
/// A missing search API key is not an error here; the search tool reports
/// it as a textual result so the workflow can keep going.
pub fn create_default_registry(tavily_api_key: Option<String>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(tools::search::SearchTool::new(tavily_api_key));
    registry.register(tools::scrape::ScrapeTool::new());

    registry
}

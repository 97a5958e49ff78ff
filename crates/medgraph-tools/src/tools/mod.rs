//! Tool implementations

pub mod scrape;
pub mod search;

//! Medgraph Gateway — HTTP surface for the research pipeline

pub mod server;

pub use server::{build_router, start_gateway, AppState, ExtendedConfig};

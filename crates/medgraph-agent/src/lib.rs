//! Medgraph Agent — task lifecycle, orchestration, and the research runner

pub mod orchestrator;
pub mod registry;
pub mod runner;
pub mod stream;

pub use orchestrator::Orchestrator;
pub use registry::TaskRegistry;
pub use runner::{AgentRunner, ResearchPipeline};
pub use stream::{task_events, TaskEvent};

//! Lexloop Engine - the per-issue control loop and batch orchestrator

pub mod collaborator;
pub mod controller;
pub mod orchestrator;
pub mod pipeline;
pub mod remote;
pub mod router;

pub use collaborator::{Aggregator, CaseContext, Reasoner};
pub use controller::{IssueController, IssueOutcome};
pub use orchestrator::{BatchResult, Orchestrator};
pub use pipeline::PipelineAdapter;
pub use remote::RemoteCollaborator;
pub use router::ActionRouter;
pub use tokio_util::sync::CancellationToken;

//! Lexloop Store - durable checkpoints and the append-only event log

pub mod checkpoint;
pub mod events;

pub use checkpoint::CheckpointStore;
pub use events::EventLog;

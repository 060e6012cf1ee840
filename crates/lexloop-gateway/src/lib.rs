//! Lexloop Gateway - cross-process control plane and HTTP surface

pub mod control;
pub mod server;

pub use control::{ControlPlane, ProcessControl, StatusStore, UnixProcessControl};
pub use server::{serve, GatewayState};

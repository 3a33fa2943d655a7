//! Agent scheduling and lifecycle.
//!
//! The registry is the single authority on slot occupancy; the
//! scheduler owns placement (round-robin), navigation, bounds
//! reconciliation and fullscreen transitions, and drives the embedded
//! browser engine through the [`BrowserHost`] collaborator trait.

pub mod browser;
pub mod layout;
pub mod registry;
pub mod scheduler;

pub use browser::BrowserHost;
pub use registry::{AgentRecord, AgentRegistry};
pub use scheduler::Scheduler;

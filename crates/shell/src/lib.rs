//! The SurfGrid shell: wiring and glue.
//!
//! Builds the full application state out of the component crates and
//! exposes the two surfaces the embedding compositor calls: the
//! [`pipeline::NetworkPipeline`] hooks for the browser engine's network
//! thread, and the scheduler/intelligence handles for the UI thread.

pub mod bootstrap;
pub mod cli;
pub mod pipeline;
pub mod state;

pub use pipeline::{NetworkPipeline, ResponseContext};
pub use state::AppState;

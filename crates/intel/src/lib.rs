//! Video intelligence: explain-session cache and LLM facade.
//!
//! Transcripts captured by the shield are exposed to an external
//! generative model. Sessions are cached per `(agent, video)` key,
//! bounded and time-expiring; at most one LLM round-trip is in flight
//! per key at a time. A missing API key disables this subsystem while
//! the rest of the workspace keeps working.

pub mod cache;
pub mod facade;
pub mod gemini;
pub mod traits;

pub use cache::{ExplainSession, SessionCache};
pub use facade::VideoIntelligence;
pub use gemini::GeminiClient;
pub use traits::{ChatTurn, LanguageModel, Role};

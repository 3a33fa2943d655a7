//! Per-(agent, video) transcript storage.

pub mod store;

pub use store::{StoredTranscript, TranscriptStore};

//! Network interception and transformation pipeline.
//!
//! The interceptor classifies each outgoing request against the rule
//! engine and decides block/allow plus header modifications; the
//! response side strips ad fields from JSON bodies, rewrites streaming
//! manifests, and extracts caption traffic into transcript segments.
//! Core-internal failures never drop a request: the original body is
//! always the fallback.

pub mod audit;
pub mod captions;
pub mod inspector;
pub mod interceptor;
pub mod manifest;
pub mod request;

pub use audit::{AuditBuffer, AuditRow};
pub use inspector::{ResponseInspector, StripReport};
pub use interceptor::{Decision, DecisionReason, Interceptor};
pub use manifest::{ManifestRewriter, RewriteResult};
pub use request::InterceptRequest;

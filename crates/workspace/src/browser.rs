//! The embedded browser engine, as the core sees it.

use sg_domain::{AgentId, Bounds, Result};

/// Collaborator contract for whatever hosts the actual web views.
///
/// Views are keyed by agent id; the registry stays the authority on
/// which agents exist. Failures surface as `Error::Browser` with the
/// origin preserved.
#[async_trait::async_trait]
pub trait BrowserHost: Send + Sync {
    /// Create a view for the agent at the given bounds.
    async fn create_view(&self, agent_id: &AgentId, bounds: Bounds) -> Result<()>;

    /// Point the agent's view at a URL. A later navigation supersedes an
    /// in-flight one; the core does not wait for loads to finish.
    async fn navigate(&self, agent_id: &AgentId, url: &str) -> Result<()>;

    /// Move/resize the agent's view.
    async fn set_bounds(&self, agent_id: &AgentId, bounds: Bounds) -> Result<()>;

    /// Tear the view down. Implicitly cancels any pending navigation.
    async fn destroy_view(&self, agent_id: &AgentId) -> Result<()>;
}

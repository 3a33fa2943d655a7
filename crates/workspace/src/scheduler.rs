//! Agent scheduler.
//!
//! Owns placement and lifecycle: round-robin `navigate_next`, explicit
//! slot creation, destruction (which also evicts the agent's
//! transcripts), bounds reconciliation after layout events with a
//! debounce, and the single fullscreen slot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use sg_domain::agent::new_agent_id;
use sg_domain::config::WorkspaceConfig;
use sg_domain::trace::TraceEvent;
use sg_domain::{AgentId, AgentStatus, Bounds, Error, EventBus, Result, WorkspaceEvent};
use sg_transcripts::TranscriptStore;

use crate::browser::BrowserHost;
use crate::layout;
use crate::registry::AgentRegistry;

/// Drives agent placement and lifecycle against the browser host.
pub struct Scheduler {
    registry: Arc<AgentRegistry>,
    browser: Arc<dyn BrowserHost>,
    bus: Arc<EventBus>,
    transcripts: Arc<TranscriptStore>,
    config: WorkspaceConfig,
    /// Round-robin cursor; advances exactly once per `navigate_next`.
    cursor: Mutex<usize>,
    /// The one fullscreen agent, if any.
    fullscreen: Mutex<Option<AgentId>>,
    /// Last reported window size.
    window: Mutex<(u32, u32)>,
    /// Debounce generation; only the newest scheduled reconcile runs.
    reconcile_generation: AtomicU64,
}

impl Scheduler {
    pub fn new(
        registry: Arc<AgentRegistry>,
        browser: Arc<dyn BrowserHost>,
        bus: Arc<EventBus>,
        transcripts: Arc<TranscriptStore>,
        config: WorkspaceConfig,
    ) -> Self {
        Self {
            registry,
            browser,
            bus,
            transcripts,
            config,
            cursor: Mutex::new(0),
            fullscreen: Mutex::new(None),
            window: Mutex::new((1280, 720)),
            reconcile_generation: AtomicU64::new(0),
        }
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    pub fn cursor(&self) -> usize {
        *self.cursor.lock()
    }

    pub fn fullscreen_agent(&self) -> Option<AgentId> {
        self.fullscreen.lock().clone()
    }

    // ── Creation / destruction ─────────────────────────────────────

    /// Create an agent in a specific slot at its grid bounds.
    pub async fn create_in_slot(&self, slot: usize) -> Result<AgentId> {
        if slot >= self.config.max_agents {
            return Err(Error::Config(format!(
                "slot {slot} out of range 0..{}",
                self.config.max_agents
            )));
        }

        let (w, h) = *self.window.lock();
        let bounds = layout::slot_bounds(w, h, self.config.max_agents, slot);
        if !bounds.is_at_least(self.config.min_dimension) {
            return Err(Error::InvalidBounds(bounds));
        }

        let agent_id = new_agent_id();
        self.registry.insert(agent_id.clone(), slot, bounds)?;

        if let Err(e) = self.browser.create_view(&agent_id, bounds).await {
            // The view never existed; roll the registration back.
            self.registry.remove(&agent_id);
            return Err(e);
        }

        TraceEvent::AgentPlaced {
            agent_id: agent_id.clone(),
            slot,
        }
        .emit();
        self.bus.publish(WorkspaceEvent::AgentCreated {
            agent_id: agent_id.clone(),
            slot,
            bounds,
        });
        Ok(agent_id)
    }

    /// Destroy an agent, free its slot, and evict its transcripts.
    /// Idempotent: destroying an unknown agent is a no-op.
    pub async fn destroy(&self, agent_id: &str) -> Result<()> {
        let Some(record) = self.registry.remove(agent_id) else {
            return Ok(());
        };

        {
            let mut fullscreen = self.fullscreen.lock();
            if fullscreen.as_deref() == Some(agent_id) {
                *fullscreen = None;
            }
        }

        let result = self.browser.destroy_view(&record.agent_id).await;
        self.transcripts.remove_agent(agent_id);

        TraceEvent::AgentDestroyed {
            agent_id: agent_id.to_owned(),
            slot: record.slot,
        }
        .emit();
        self.bus.publish(WorkspaceEvent::AgentDestroyed {
            agent_id: agent_id.to_owned(),
            slot: record.slot,
        });
        result
    }

    // ── Navigation ─────────────────────────────────────────────────

    /// Navigate an agent. A later call supersedes an in-flight load.
    pub async fn navigate(&self, agent_id: &str, url: &str) -> Result<()> {
        let url = normalize_url(url);
        self.registry.set_url(agent_id, url.clone())?;
        self.registry.set_status(agent_id, AgentStatus::Loading)?;

        self.browser.navigate(&agent_id.to_owned(), &url).await?;
        self.bus.publish(WorkspaceEvent::AgentNavigated {
            agent_id: agent_id.to_owned(),
            url,
        });
        Ok(())
    }

    /// Round-robin navigation: reuse the agent at the cursor's slot or
    /// create one there, then navigate it. The cursor advances exactly
    /// once per call.
    pub async fn navigate_next(&self, url: &str) -> Result<AgentId> {
        let slot = {
            let mut cursor = self.cursor.lock();
            let slot = *cursor;
            *cursor = (*cursor + 1) % self.config.max_agents.max(1);
            slot
        };

        let agent_id = match self.registry.agent_in_slot(slot) {
            Some(existing) => existing,
            None => self.create_in_slot(slot).await?,
        };
        self.navigate(&agent_id, url).await?;
        Ok(agent_id)
    }

    // ── Bounds & layout ────────────────────────────────────────────

    /// Move/resize one agent. Setting the bounds an agent already has
    /// is a no-op at the collaborator level.
    pub async fn set_bounds(&self, agent_id: &str, bounds: Bounds) -> Result<()> {
        if !bounds.is_at_least(self.config.min_dimension) {
            return Err(Error::InvalidBounds(bounds));
        }
        let current = self
            .registry
            .get(agent_id)
            .ok_or_else(|| Error::UnknownAgent(agent_id.to_owned()))?;
        if current.bounds == bounds {
            return Ok(());
        }
        self.registry.set_bounds(agent_id, bounds)?;
        self.browser.set_bounds(&agent_id.to_owned(), bounds).await
    }

    /// Record a window resize and reconcile immediately.
    pub async fn set_window_size(&self, w: u32, h: u32) -> Result<()> {
        *self.window.lock() = (w, h);
        self.reconcile_layout().await
    }

    /// Recompute every live agent's bounds from the grid (or the full
    /// window for the fullscreen agent) and push the changes down.
    pub async fn reconcile_layout(&self) -> Result<()> {
        let (w, h) = *self.window.lock();
        let fullscreen = self.fullscreen.lock().clone();

        for record in self.registry.list() {
            let target = if fullscreen.as_deref() == Some(record.agent_id.as_str()) {
                layout::fullscreen(w, h)
            } else {
                layout::slot_bounds(w, h, self.config.max_agents, record.slot)
            };
            self.set_bounds(&record.agent_id, target).await?;
        }
        Ok(())
    }

    /// Debounced reconciliation: waits `reconcile_debounce_ms`, then
    /// runs unless a newer layout event superseded this one.
    pub fn schedule_reconcile(self: &Arc<Self>) {
        let generation = self.reconcile_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let scheduler = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(
                scheduler.config.reconcile_debounce_ms,
            ))
            .await;
            if scheduler.reconcile_generation.load(Ordering::SeqCst) != generation {
                return;
            }
            if let Err(e) = scheduler.reconcile_layout().await {
                tracing::warn!(error = %e, "deferred reconcile failed");
            }
        });
    }

    // ── Fullscreen ─────────────────────────────────────────────────

    /// Put one agent's slot in fullscreen. Any previous fullscreen
    /// agent drops back to the grid; agent identity is preserved.
    pub async fn enter_fullscreen(&self, agent_id: &str) -> Result<()> {
        if self.registry.get(agent_id).is_none() {
            return Err(Error::UnknownAgent(agent_id.to_owned()));
        }
        *self.fullscreen.lock() = Some(agent_id.to_owned());
        self.reconcile_layout().await
    }

    /// Leave fullscreen and restore the grid.
    pub async fn exit_fullscreen(&self) -> Result<()> {
        *self.fullscreen.lock() = None;
        self.reconcile_layout().await
    }

    // ── Status propagation ─────────────────────────────────────────

    /// Called by the browser collaborator's event stream.
    pub fn handle_status(&self, agent_id: &str, status: AgentStatus) -> Result<()> {
        self.registry.set_status(agent_id, status)?;
        self.bus.publish(WorkspaceEvent::AgentStatus {
            agent_id: agent_id.to_owned(),
            status,
        });
        if status == AgentStatus::Loaded {
            if let Some(record) = self.registry.get(agent_id) {
                self.bus.publish(WorkspaceEvent::AgentLoaded {
                    agent_id: agent_id.to_owned(),
                    url: record.url.unwrap_or_default(),
                });
            }
        }
        Ok(())
    }
}

/// Prepend `https://` when the input has no scheme. No other URL
/// transformation happens at this layer.
fn normalize_url(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.contains("://") {
        trimmed.to_owned()
    } else {
        format!("https://{trimmed}")
    }
}

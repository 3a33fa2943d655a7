//! Workspace event bus.
//!
//! Fan-out of typed lifecycle and network events to UI collaborators.
//! Delivery is synchronous in emit order, so events about a single agent
//! are observed in the order they were published. Cross-agent ordering is
//! unspecified.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use crate::agent::{AgentId, AgentStatus, Bounds};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Events
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Everything the core tells its collaborators about.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WorkspaceEvent {
    AgentCreated {
        agent_id: AgentId,
        slot: usize,
        bounds: Bounds,
    },
    AgentNavigated {
        agent_id: AgentId,
        url: String,
    },
    AgentLoaded {
        agent_id: AgentId,
        url: String,
    },
    AgentStatus {
        agent_id: AgentId,
        status: AgentStatus,
    },
    AgentDestroyed {
        agent_id: AgentId,
        slot: usize,
    },
    RequestBlocked {
        agent_id: AgentId,
        url: String,
        rule_id: Option<String>,
    },
    TranscriptAvailable {
        agent_id: AgentId,
        video_id: String,
        segments: usize,
    },
}

impl WorkspaceEvent {
    /// The agent this event is about.
    pub fn agent_id(&self) -> &AgentId {
        match self {
            Self::AgentCreated { agent_id, .. }
            | Self::AgentNavigated { agent_id, .. }
            | Self::AgentLoaded { agent_id, .. }
            | Self::AgentStatus { agent_id, .. }
            | Self::AgentDestroyed { agent_id, .. }
            | Self::RequestBlocked { agent_id, .. }
            | Self::TranscriptAvailable { agent_id, .. } => agent_id,
        }
    }
}

/// A published event together with its publication timestamp.
#[derive(Debug, Clone, Serialize)]
pub struct PublishedEvent {
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: WorkspaceEvent,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Bus
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

type Handler = Arc<dyn Fn(&WorkspaceEvent) + Send + Sync>;

struct Subscription {
    id: usize,
    handler: Handler,
}

/// Ordered fan-out of [`WorkspaceEvent`]s.
///
/// Handlers run inline on the publishing thread; the publish lock
/// serializes delivery so per-agent ordering holds. Handlers must be
/// cheap and must not publish re-entrantly.
pub struct EventBus {
    subscriptions: RwLock<Vec<Subscription>>,
    next_id: Mutex<usize>,
    history: Mutex<VecDeque<PublishedEvent>>,
    max_history: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_history(256)
    }

    pub fn with_history(max_history: usize) -> Self {
        Self {
            subscriptions: RwLock::new(Vec::new()),
            next_id: Mutex::new(0),
            history: Mutex::new(VecDeque::new()),
            max_history,
        }
    }

    /// Subscribe to every event. Returns a handle for `unsubscribe`.
    pub fn subscribe<F>(&self, handler: F) -> usize
    where
        F: Fn(&WorkspaceEvent) + Send + Sync + 'static,
    {
        let id = {
            let mut next = self.next_id.lock();
            let id = *next;
            *next += 1;
            id
        };
        self.subscriptions.write().push(Subscription {
            id,
            handler: Arc::new(handler),
        });
        id
    }

    /// Remove a subscription. Returns true when it existed.
    pub fn unsubscribe(&self, subscription_id: usize) -> bool {
        let mut subs = self.subscriptions.write();
        match subs.iter().position(|s| s.id == subscription_id) {
            Some(pos) => {
                subs.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Publish one event to all subscribers, in subscription order.
    pub fn publish(&self, event: WorkspaceEvent) {
        {
            let mut history = self.history.lock();
            history.push_back(PublishedEvent {
                at: Utc::now(),
                event: event.clone(),
            });
            while history.len() > self.max_history {
                history.pop_front();
            }
        }

        let subs = self.subscriptions.read();
        for sub in subs.iter() {
            (sub.handler)(&event);
        }
    }

    /// Recent events, oldest first.
    pub fn history(&self) -> Vec<PublishedEvent> {
        self.history.lock().iter().cloned().collect()
    }

    /// Recent events about one agent, oldest first.
    pub fn history_for(&self, agent_id: &str) -> Vec<PublishedEvent> {
        self.history
            .lock()
            .iter()
            .filter(|p| p.event.agent_id() == agent_id)
            .cloned()
            .collect()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.read().len()
    }
}

//! Agent value types shared between the registry, the scheduler, and the
//! browser-engine collaborator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier for one hosted browser session.
pub type AgentId = String;

/// Mint a fresh agent id.
pub fn new_agent_id() -> AgentId {
    format!("agent-{}", uuid::Uuid::new_v4())
}

/// A rectangle in window-local integer pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Bounds {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Bounds {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// True when every dimension meets the given minimum.
    pub fn is_at_least(&self, min_dimension: u32) -> bool {
        self.w >= min_dimension && self.h >= min_dimension
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}@({},{})", self.w, self.h, self.x, self.y)
    }
}

/// Lifecycle status reported by the browser-engine collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    #[default]
    Idle,
    Loading,
    Loaded,
    Error,
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Loaded => "loaded",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

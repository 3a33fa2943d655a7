use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Workspace grid
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Layout of the agent grid: how many slots exist and how the scheduler
/// reconciles view bounds after layout events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Number of slots in the grid (N). Agents live in slots `0..N`.
    #[serde(default = "d_max_agents")]
    pub max_agents: usize,

    /// Smallest acceptable view dimension in pixels. `create_in_slot`
    /// rejects bounds below this.
    #[serde(default = "d_min_dimension")]
    pub min_dimension: u32,

    /// Debounce delay applied before bounds reconciliation after a
    /// layout event, to absorb resize storms.
    #[serde(default = "d_reconcile_debounce_ms")]
    pub reconcile_debounce_ms: u64,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            max_agents: d_max_agents(),
            min_dimension: d_min_dimension(),
            reconcile_debounce_ms: d_reconcile_debounce_ms(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_max_agents() -> usize {
    4
}
fn d_min_dimension() -> u32 {
    10
}
fn d_reconcile_debounce_ms() -> u64 {
    100
}

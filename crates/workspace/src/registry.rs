//! In-memory registry of live agents and their slots.
//!
//! The single authority on slot occupancy. One mutex guards both the
//! id-ordered agent map and the slot index; every operation is short.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use sg_domain::{AgentId, AgentStatus, Bounds, Error, Result};

/// One hosted browser session.
#[derive(Debug, Clone, Serialize)]
pub struct AgentRecord {
    pub agent_id: AgentId,
    pub slot: usize,
    pub bounds: Bounds,
    pub url: Option<String>,
    pub status: AgentStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Default)]
struct Inner {
    agents: BTreeMap<AgentId, AgentRecord>,
    /// Partial bijection slot → agent.
    slots: HashMap<usize, AgentId>,
}

/// Thread-safe agent registry.
pub struct AgentRegistry {
    inner: Mutex<Inner>,
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Register an agent in a slot. Fails with `SlotOccupied` when the
    /// slot already has an agent.
    pub fn insert(&self, agent_id: AgentId, slot: usize, bounds: Bounds) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.slots.contains_key(&slot) {
            return Err(Error::SlotOccupied(slot));
        }
        inner.slots.insert(slot, agent_id.clone());
        inner.agents.insert(
            agent_id.clone(),
            AgentRecord {
                agent_id,
                slot,
                bounds,
                url: None,
                status: AgentStatus::Idle,
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    /// Remove an agent and free its slot. Idempotent; returns the
    /// removed record when there was one.
    pub fn remove(&self, agent_id: &str) -> Option<AgentRecord> {
        let mut inner = self.inner.lock();
        let record = inner.agents.remove(agent_id)?;
        inner.slots.remove(&record.slot);
        Some(record)
    }

    pub fn set_bounds(&self, agent_id: &str, bounds: Bounds) -> Result<()> {
        self.update(agent_id, |rec| rec.bounds = bounds)
    }

    pub fn set_url(&self, agent_id: &str, url: String) -> Result<()> {
        self.update(agent_id, |rec| rec.url = Some(url))
    }

    pub fn set_status(&self, agent_id: &str, status: AgentStatus) -> Result<()> {
        self.update(agent_id, |rec| rec.status = status)
    }

    fn update(&self, agent_id: &str, f: impl FnOnce(&mut AgentRecord)) -> Result<()> {
        let mut inner = self.inner.lock();
        match inner.agents.get_mut(agent_id) {
            Some(rec) => {
                f(rec);
                Ok(())
            }
            None => Err(Error::UnknownAgent(agent_id.to_owned())),
        }
    }

    pub fn get(&self, agent_id: &str) -> Option<AgentRecord> {
        self.inner.lock().agents.get(agent_id).cloned()
    }

    /// The agent occupying a slot, if any.
    pub fn agent_in_slot(&self, slot: usize) -> Option<AgentId> {
        self.inner.lock().slots.get(&slot).cloned()
    }

    /// All live agents, ordered by slot.
    pub fn list(&self) -> Vec<AgentRecord> {
        let inner = self.inner.lock();
        let mut agents: Vec<AgentRecord> = inner.agents.values().cloned().collect();
        agents.sort_by_key(|a| a.slot);
        agents
    }

    pub fn len(&self) -> usize {
        self.inner.lock().agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().agents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> Bounds {
        Bounds::new(0, 0, 640, 360)
    }

    #[test]
    fn insert_and_lookup() {
        let reg = AgentRegistry::new();
        reg.insert("a1".into(), 0, bounds()).unwrap();

        let rec = reg.get("a1").unwrap();
        assert_eq!(rec.slot, 0);
        assert_eq!(rec.status, AgentStatus::Idle);
        assert_eq!(reg.agent_in_slot(0).as_deref(), Some("a1"));
        assert_eq!(reg.agent_in_slot(1), None);
    }

    #[test]
    fn occupied_slot_is_rejected() {
        let reg = AgentRegistry::new();
        reg.insert("a1".into(), 0, bounds()).unwrap();
        let err = reg.insert("a2".into(), 0, bounds()).unwrap_err();
        assert!(matches!(err, Error::SlotOccupied(0)));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn remove_frees_the_slot_and_is_idempotent() {
        let reg = AgentRegistry::new();
        reg.insert("a1".into(), 2, bounds()).unwrap();

        assert!(reg.remove("a1").is_some());
        assert!(reg.get("a1").is_none());
        assert!(reg.remove("a1").is_none());

        // The vacated slot is immediately reusable.
        reg.insert("a2".into(), 2, bounds()).unwrap();
        assert_eq!(reg.agent_in_slot(2).as_deref(), Some("a2"));
    }

    #[test]
    fn updates_fail_for_unknown_agents() {
        let reg = AgentRegistry::new();
        assert!(matches!(
            reg.set_bounds("ghost", bounds()),
            Err(Error::UnknownAgent(_))
        ));
        assert!(matches!(
            reg.set_url("ghost", "https://x".into()),
            Err(Error::UnknownAgent(_))
        ));
        assert!(matches!(
            reg.set_status("ghost", AgentStatus::Loading),
            Err(Error::UnknownAgent(_))
        ));
    }

    #[test]
    fn updates_mutate_the_record() {
        let reg = AgentRegistry::new();
        reg.insert("a1".into(), 0, bounds()).unwrap();

        reg.set_url("a1", "https://example.com".into()).unwrap();
        reg.set_status("a1", AgentStatus::Loaded).unwrap();
        reg.set_bounds("a1", Bounds::new(0, 0, 100, 100)).unwrap();

        let rec = reg.get("a1").unwrap();
        assert_eq!(rec.url.as_deref(), Some("https://example.com"));
        assert_eq!(rec.status, AgentStatus::Loaded);
        assert_eq!(rec.bounds.w, 100);
        // Slot assignment survives everything but removal.
        assert_eq!(rec.slot, 0);
    }

    #[test]
    fn list_is_ordered_by_slot() {
        let reg = AgentRegistry::new();
        reg.insert("z".into(), 3, bounds()).unwrap();
        reg.insert("a".into(), 1, bounds()).unwrap();
        let slots: Vec<usize> = reg.list().iter().map(|r| r.slot).collect();
        assert_eq!(slots, vec![1, 3]);
    }
}

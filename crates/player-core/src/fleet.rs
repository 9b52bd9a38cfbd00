//! Fleet Management
//!
//! Runs several independent agent loops (one per controlled entity) and
//! applies control commands to all of them at once. Agents can be added
//! while the fleet is running.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};

use tokio::task::JoinSet;

use crate::agent_loop::{AgentHandle, AgentId, AgentLoop, LoopStatus};
use crate::error::Result;

type AgentTasks = JoinSet<(AgentId, Result<()>)>;

/// A set of spawned agent loops
#[derive(Default)]
pub struct AgentFleet {
    handles: RwLock<Vec<AgentHandle>>,
    tasks: Mutex<AgentTasks>,
    closed: AtomicBool,
}

impl AgentFleet {
    /// Spawn every loop on the current runtime
    pub fn launch(loops: impl IntoIterator<Item = AgentLoop>) -> Self {
        let fleet = Self::default();
        for agent in loops {
            fleet.spawn(agent);
        }

        tracing::info!(agents = fleet.len(), "fleet launched");
        fleet
    }

    /// Add one loop to a running fleet.
    ///
    /// Must be called from inside a tokio runtime. A loop added after
    /// `shutdown` has started is stopped straight away.
    pub fn spawn(&self, agent: AgentLoop) -> AgentId {
        let id = agent.id();
        let handle = agent.handle();
        if self.closed.load(Ordering::Acquire) {
            handle.stop();
        }

        self.tasks_guard().spawn(async move { (id, agent.run().await) });
        self.handles
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);

        tracing::debug!(agent = %id, "agent spawned");
        id
    }

    /// Snapshot of the current handles, in spawn order
    pub fn handles(&self) -> Vec<AgentHandle> {
        self.handles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.handles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: AgentId) -> Option<AgentHandle> {
        self.handles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|h| h.id() == id)
            .cloned()
    }

    pub fn statuses(&self) -> Vec<(AgentId, LoopStatus)> {
        self.handles()
            .iter()
            .map(|h| (h.id(), h.status()))
            .collect()
    }

    /// Global toggle: pause everyone if any agent is active, otherwise
    /// resume everyone. Returns the flag now applied to all agents.
    pub fn toggle_all(&self) -> bool {
        let active = !self.handles().iter().any(AgentHandle::is_active);
        self.set_all_active(active);
        active
    }

    pub fn set_all_active(&self, active: bool) {
        let handles = self.handles();
        for handle in &handles {
            handle.set_active(active);
        }
        tracing::info!(active, agents = handles.len(), "fleet active flag set");
    }

    /// Set one agent's flag; `None` if the id is unknown
    pub fn set_active(&self, id: AgentId, active: bool) -> Option<bool> {
        let handle = self.get(id)?;
        handle.set_active(active);
        Some(handle.is_active())
    }

    /// Stop every loop and wait for all of them to exit.
    ///
    /// Returns the number of loops that ended with an error (startup
    /// failure or panic).
    pub async fn shutdown(&self) -> usize {
        self.closed.store(true, Ordering::Release);
        for handle in &self.handles() {
            handle.stop();
        }

        let mut failures = 0;
        loop {
            let mut tasks = std::mem::take(&mut *self.tasks_guard());
            if tasks.is_empty() {
                break;
            }
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((id, Ok(()))) => tracing::debug!(agent = %id, "agent joined"),
                    Ok((id, Err(e))) => {
                        failures += 1;
                        tracing::warn!(
                            agent = %id,
                            error = %e,
                            fatal = e.is_fatal(),
                            "agent ended with error"
                        );
                    }
                    Err(e) => {
                        failures += 1;
                        tracing::error!(error = %e, "agent task panicked");
                    }
                }
            }
        }

        tracing::info!(failures, "fleet stopped");
        failures
    }

    fn tasks_guard(&self) -> MutexGuard<'_, AgentTasks> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

//! Process tracker
//!
//! One tracker exists per engine invocation. Every spawned process
//! registers here, and cleanup terminates every live process tree at
//! once. The live set and the killed flag are shared across concurrent
//! completion callbacks, so all mutation goes through one mutex.

use crate::runner::spawn::kill_tree;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Inner {
    live: HashSet<u32>,
    killed: bool,
}

/// Shared registry of live process ids for one invocation
#[derive(Clone, Default)]
pub struct ProcessTracker {
    inner: Arc<Mutex<Inner>>,
}

impl ProcessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a spawned pid. If the tracker has already been killed the
    /// new process tree is terminated immediately and never tracked.
    pub fn add(&self, pid: u32) {
        let killed = {
            let mut inner = self.inner.lock().unwrap();
            if !inner.killed {
                inner.live.insert(pid);
            }
            inner.killed
        };
        if killed {
            tokio::spawn(kill_tree(pid));
        }
    }

    /// Deregister a pid once its process has completed.
    pub fn remove(&self, pid: u32) {
        self.inner.lock().unwrap().live.remove(&pid);
    }

    /// Whether `kill` has been requested.
    pub fn is_killed(&self) -> bool {
        self.inner.lock().unwrap().killed
    }

    /// Number of currently tracked processes.
    pub fn live_count(&self) -> usize {
        self.inner.lock().unwrap().live.len()
    }

    /// Flip the killed flag and terminate every tracked process tree,
    /// returning once all termination attempts have settled. Individual
    /// failures are swallowed; cleanup never becomes a second failure.
    /// Safe to call more than once.
    pub async fn kill(&self) {
        let pids: Vec<u32> = {
            let mut inner = self.inner.lock().unwrap();
            inner.killed = true;
            inner.live.iter().copied().collect()
        };
        join_all(pids.into_iter().map(kill_tree)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_and_remove() {
        let tracker = ProcessTracker::new();
        tracker.add(101);
        tracker.add(102);
        assert_eq!(tracker.live_count(), 2);
        tracker.remove(101);
        assert_eq!(tracker.live_count(), 1);
    }

    #[tokio::test]
    async fn test_kill_flips_flag_and_drains() {
        let tracker = ProcessTracker::new();
        // A pid beyond the kernel's pid range; the kill attempt must
        // still settle.
        tracker.add(4_200_000);
        assert!(!tracker.is_killed());
        tracker.kill().await;
        assert!(tracker.is_killed());
    }

    #[tokio::test]
    async fn test_add_after_kill_is_not_tracked() {
        let tracker = ProcessTracker::new();
        tracker.kill().await;
        tracker.add(4_200_001);
        assert_eq!(tracker.live_count(), 0);
    }

    #[tokio::test]
    async fn test_kill_is_idempotent() {
        let tracker = ProcessTracker::new();
        tracker.kill().await;
        tracker.kill().await;
        assert!(tracker.is_killed());
    }
}

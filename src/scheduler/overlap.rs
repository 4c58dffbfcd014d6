//! Overlap policy for batch runs.
//!
//! A cron tick can arrive while the previous batch is still working through
//! its files. The guard below holds a single run slot and decides what the
//! late tick does.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// What a trigger does while a previous run is still in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlapPolicy {
    /// Drop the trigger.
    #[default]
    Skip,

    /// Remember one pending trigger and run it as soon as the active run
    /// ends. Further triggers while one is pending collapse into it.
    Queue,

    /// Start another run alongside the active one. Runs share no lock, so two
    /// runs may pick the same file.
    Concurrent,
}

impl FromStr for OverlapPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(OverlapPolicy::Skip),
            "queue" => Ok(OverlapPolicy::Queue),
            "concurrent" => Ok(OverlapPolicy::Concurrent),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for OverlapPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OverlapPolicy::Skip => "skip",
            OverlapPolicy::Queue => "queue",
            OverlapPolicy::Concurrent => "concurrent",
        })
    }
}

#[derive(Debug, Default)]
struct Slot {
    running: bool,
    queued: bool,
}

fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Result of asking the guard for the run slot.
pub enum Acquire {
    Run(RunGuard),
    /// Slot busy; a follow-up run was recorded.
    Queued,
    /// Slot busy; this trigger is dropped.
    Skipped,
}

/// Single run slot shared by every trigger of one job.
pub struct OverlapGuard {
    slot: Arc<Mutex<Slot>>,
    policy: OverlapPolicy,
}

impl OverlapGuard {
    pub fn new(policy: OverlapPolicy) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot::default())),
            policy,
        }
    }

    pub fn try_acquire(&self) -> Acquire {
        if self.policy == OverlapPolicy::Concurrent {
            return Acquire::Run(RunGuard { slot: None });
        }

        let mut slot = lock(&self.slot);
        if !slot.running {
            slot.running = true;
            Acquire::Run(RunGuard {
                slot: Some(self.slot.clone()),
            })
        } else if self.policy == OverlapPolicy::Queue {
            slot.queued = true;
            Acquire::Queued
        } else {
            Acquire::Skipped
        }
    }

    /// Always `false` under [`OverlapPolicy::Concurrent`].
    pub fn is_running(&self) -> bool {
        lock(&self.slot).running
    }

    pub fn has_queued(&self) -> bool {
        lock(&self.slot).queued
    }

    pub fn policy(&self) -> OverlapPolicy {
        self.policy
    }
}

/// Holds the run slot; dropping it frees the slot and forgets any queued
/// trigger.
pub struct RunGuard {
    slot: Option<Arc<Mutex<Slot>>>,
}

impl RunGuard {
    /// Called when a run ends. Hands the slot straight to the queued trigger
    /// if there is one, otherwise frees it.
    ///
    /// The check and the release happen under one lock, so a trigger that
    /// arrives at the same moment is either consumed here or gets the slot.
    pub fn finish(mut self) -> Option<RunGuard> {
        let slot = self.slot.take()?;
        let mut state = lock(&slot);
        if state.queued {
            state.queued = false;
            drop(state);
            Some(RunGuard { slot: Some(slot) })
        } else {
            state.running = false;
            None
        }
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            let mut state = lock(&slot);
            state.running = false;
            state.queued = false;
        }
    }
}

//! I define [`ReasoningStatus`], a snapshot of the activity of the reasoning engine.
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// The lifecycle state of a [`ReasoningEngine`](crate::engine::ReasoningEngine).
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum EngineState {
    /// The worker accepts and processes transactions
    Running,
    /// Shutdown was requested, the worker drains its queue
    ShuttingDown,
    /// The worker is gone
    Stopped,
}

impl EngineState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => EngineState::Running,
            1 => EngineState::ShuttingDown,
            _ => EngineState::Stopped,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            EngineState::Running => 0,
            EngineState::ShuttingDown => 1,
            EngineState::Stopped => 2,
        }
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let txt = match self {
            EngineState::Running => "running",
            EngineState::ShuttingDown => "shutting down",
            EngineState::Stopped => "stopped",
        };
        f.write_str(txt)
    }
}

/// A snapshot of the activity of a [`ReasoningEngine`](crate::engine::ReasoningEngine).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReasoningStatus {
    /// Lifecycle state
    pub state: EngineState,
    /// Whether the worker is processing an item
    pub busy: bool,
    /// Number of items waiting for the worker
    pub queued: usize,
    /// Number of committed transactions processed so far
    pub deltas_processed: u64,
    /// Number of inferred statements created so far
    pub triples_inferred: u64,
    /// Number of justifications persisted so far
    pub justifications_stored: u64,
    /// Number of failures that may have left the store and the justifications inconsistent
    pub consistency_failures: u64,
}

impl ReasoningStatus {
    /// Whether the engine has not caught up with the committed transactions yet.
    pub fn is_running(&self) -> bool {
        self.busy || self.queued > 0
    }
}

/// The atomic counters behind [`ReasoningStatus`].
#[derive(Debug, Default)]
pub(crate) struct Counters {
    state: AtomicU8,
    pub deltas_processed: AtomicU64,
    pub triples_inferred: AtomicU64,
    pub justifications_stored: AtomicU64,
    pub consistency_failures: AtomicU64,
}

impl Counters {
    pub fn state(&self) -> EngineState {
        EngineState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn set_state(&self, state: EngineState) {
        self.state.store(state.as_u8(), Ordering::SeqCst);
    }

    /// Move from `current` to `new`, returning whether the engine was in `current`.
    pub fn transition(&self, current: EngineState, new: EngineState) -> bool {
        self.state
            .compare_exchange(
                current.as_u8(),
                new.as_u8(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    pub fn add(counter: &AtomicU64, n: usize) {
        counter.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self, busy: bool, queued: usize) -> ReasoningStatus {
        ReasoningStatus {
            state: self.state(),
            busy,
            queued,
            deltas_processed: self.deltas_processed.load(Ordering::Relaxed),
            triples_inferred: self.triples_inferred.load(Ordering::Relaxed),
            justifications_stored: self.justifications_stored.load(Ordering::Relaxed),
            consistency_failures: self.consistency_failures.load(Ordering::Relaxed),
        }
    }
}

//! The background worker consuming reasoning jobs.
use std::fmt;
use std::io;
use std::sync::atomic::Ordering;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use warrant_api::persistence::ReasoningPersistence;
use warrant_api::rule::Rule;
use warrant_api::store::TripleStore;
use warrant_api::transaction::TransactionData;

use crate::engine::Core;

/// Name of the worker thread.
pub(crate) const WORKER_NAME: &str = "warrant-reasoner";

/// A unit of work for the reasoning worker.
pub(crate) enum Job {
    /// Reason over a committed transaction
    Delta(TransactionData),
    /// Evaluate a new rule against the whole store
    AddRule(Arc<Rule>),
    /// Recompute every inference from scratch
    ReRun,
    /// Retract the unsupported inferred statements, on behalf of another thread
    Cleanup(Box<dyn FnOnce() + Send>),
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Job::Delta(data) => write!(
                f,
                "delta (+{} -{})",
                data.added_triples().len(),
                data.removed_triples().len()
            ),
            Job::AddRule(rule) => write!(f, "evaluation of rule '{}'", rule.name()),
            Job::ReRun => f.write_str("full re-run"),
            Job::Cleanup(_) => f.write_str("cleanup of unsupported statements"),
        }
    }
}

/// Start the worker thread, consuming `receiver` until every sender is dropped.
pub(crate) fn spawn<S, P>(core: Arc<Core<S, P>>, receiver: Receiver<Job>) -> io::Result<JoinHandle<()>>
where
    S: TripleStore,
    P: ReasoningPersistence,
{
    thread::Builder::new()
        .name(WORKER_NAME.to_string())
        .spawn(move || run(&core, receiver))
}

fn run<S, P>(core: &Core<S, P>, receiver: Receiver<Job>)
where
    S: TripleStore,
    P: ReasoningPersistence,
{
    if core.worker.set(thread::current().id()).is_err() {
        log::warn!("Reasoning worker started twice");
    }
    log::debug!("Reasoning worker started");
    while let Ok(job) = receiver.recv() {
        core.busy.store(true, Ordering::SeqCst);
        core.queued.fetch_sub(1, Ordering::SeqCst);
        let mut next = Some(job);
        while let Some(job) = next {
            if core.is_cancelled() {
                log::debug!("Discarding {job}");
            } else {
                log::trace!("Processing {job}");
                core.execute(job);
            }
            // the guard must not outlive this statement: executing a job pushes to the backlog
            next = core.backlog.lock().pop_front();
        }
        core.busy.store(false, Ordering::SeqCst);
    }
    log::debug!("Reasoning worker stopped");
}

//! I define [`ReasoningEngine`],
//! which maintains the inferred statements of a [`TripleStore`] and their justifications.
//!
//! The engine listens to the transactions committed on the store.
//! Every committed transaction is queued and processed by a background worker, in commit order:
//! * every new statement is matched against the body patterns of the loaded rules,
//!   and each match is completed into full body solutions by querying the store;
//!   every solution yields an inferred statement and a [`Justification`];
//! * every removed statement invalidates the justifications it supports,
//!   and inferred statements left without justification are retracted.
//!
//! Justifications are resolved to base statements before being persisted,
//! so that the retraction of a base statement invalidates every inference depending on it,
//! however indirectly.
use std::collections::{BTreeSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{sync_channel, SyncSender};
use std::sync::{Arc, OnceLock, Weak};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use warrant_api::justification::Justification;
use warrant_api::persistence::{PersistenceConnection, ReasoningPersistence};
use warrant_api::rule::{Program, Rule};
use warrant_api::store::TripleStore;
use warrant_api::transaction::{TransactionData, TransactionListener};
use warrant_api::triple::Triple;

use crate::config::ReasoningConfig;
use crate::error::ReasoningError;
use crate::status::{Counters, EngineState, ReasoningStatus};
use crate::worker::{self, Job};

mod _cleanup;
mod _index;
mod _process;
mod _resolve;
pub(crate) use _index::RuleIndex;

/// The error type of a [`ReasoningEngine`] working on `S` and `P`.
pub type EngineError<S, P> =
    ReasoningError<<S as TripleStore>::Error, <P as ReasoningPersistence>::Error>;

/// An incremental forward-chaining reasoner,
/// keeping the inferred statements of a [`TripleStore`] up to date
/// and recording their [justifications](Justification) in a [`ReasoningPersistence`].
///
/// The engine registers itself as a [`TransactionListener`] of the store,
/// so it only needs to be kept alive:
/// dropping the last reference to the engine [shuts it down](Self::shutdown).
///
/// ```
/// # use warrant_api::prelude::*;
/// # use warrant_inmem::{MemoryPersistence, MemoryStore};
/// # use warrant_reasoner::{ReasoningConfig, ReasoningEngine};
/// # use std::time::Duration;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// let persistence = MemoryPersistence::new(store.clone());
/// let engine = ReasoningEngine::new(store.clone(), persistence, ReasoningConfig::default())?;
///
/// let knows = Node::iri("http://xmlns.com/foaf/0.1/knows")?;
/// let rule = Rule::new(
///     "symmetric",
///     [Pattern::new(Field::var("x"), knows.clone(), Field::var("y"))],
///     Pattern::new(Field::var("y"), knows.clone(), Field::var("x")),
/// )?;
/// engine.add_program(Program::new("social").with_rule(rule))?;
///
/// let mut tx = store.begin()?;
/// tx.add_triple(Triple::new(Node::iri("http://example.org/alice")?, knows.clone(), Node::iri("http://example.org/bob")?))?;
/// tx.commit()?;
///
/// assert!(engine.wait_idle(Duration::from_secs(5)));
/// assert!(store.contains(&Triple::new_inferred(Node::iri("http://example.org/bob")?, knows, Node::iri("http://example.org/alice")?)));
/// # Ok(()) }
/// ```
pub struct ReasoningEngine<S: TripleStore, P: ReasoningPersistence> {
    core: Arc<Core<S, P>>,
    sender: Mutex<Option<SyncSender<Job>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

/// The state shared by a [`ReasoningEngine`] and its worker.
pub(crate) struct Core<S: TripleStore, P: ReasoningPersistence> {
    pub store: S,
    pub persistence: P,
    pub config: ReasoningConfig,
    index: RwLock<Arc<RuleIndex>>,
    /// held while committing the store and the persistence as a pair
    commit_lock: Mutex<()>,
    /// jobs produced by the worker itself
    pub backlog: Mutex<VecDeque<Job>>,
    pub worker: OnceLock<ThreadId>,
    pub busy: AtomicBool,
    pub queued: AtomicUsize,
    pub cancelled: AtomicBool,
    pub counters: Counters,
}

impl<S, P> ReasoningEngine<S, P>
where
    S: TripleStore,
    P: ReasoningPersistence,
{
    /// Build a reasoning engine for `store`, using the programs stored in `persistence`,
    /// and start its worker.
    pub fn new(
        store: S,
        persistence: P,
        config: ReasoningConfig,
    ) -> Result<Arc<Self>, EngineError<S, P>> {
        config.validate().map_err(ReasoningError::Config)?;
        if config.workers > 1 {
            log::info!(
                "{} reasoning workers requested, rules are evaluated by a single worker",
                config.workers
            );
        }
        let core = Arc::new(Core {
            store: store.clone(),
            persistence,
            index: RwLock::default(),
            commit_lock: Mutex::new(()),
            backlog: Mutex::default(),
            worker: OnceLock::new(),
            busy: AtomicBool::new(false),
            queued: AtomicUsize::new(0),
            cancelled: AtomicBool::new(false),
            counters: Counters::default(),
            config,
        });
        core.load_programs();
        let (sender, receiver) = sync_channel(core.config.queue_capacity);
        let handle = worker::spawn(core.clone(), receiver).map_err(ReasoningError::Spawn)?;
        let engine = Arc::new(ReasoningEngine {
            core,
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(handle)),
        });
        let weak = Arc::downgrade(&engine);
        let listener: Weak<dyn TransactionListener> = weak;
        store.add_listener(listener);
        log::info!("Reasoning engine started");
        Ok(engine)
    }

    /// The configuration of this engine.
    pub fn config(&self) -> &ReasoningConfig {
        &self.core.config
    }

    /// A snapshot of the loaded programs.
    pub fn programs(&self) -> Vec<Program> {
        self.core.index().programs().to_vec()
    }

    /// Reload the programs from the persistence layer and rebuild the rule index.
    ///
    /// On failure, reasoning is disabled until the next successful reload,
    /// and `false` is returned.
    pub fn load_programs(&self) -> bool {
        self.core.load_programs()
    }

    /// Persist a new program, and infer everything its rules entail from the current store.
    pub fn add_program(&self, program: Program) -> Result<Program, EngineError<S, P>> {
        let stored = self.with_connection(|conn| conn.store_program(program))?;
        log::info!(
            "Added reasoning program '{}' with {} rule(s)",
            stored.name(),
            stored.rules().len()
        );
        self.core.load_programs();
        for rule in stored.rules() {
            self.notify_add_rule(rule.clone());
        }
        Ok(stored)
    }

    /// Replace the rules of an existing program.
    ///
    /// If some rules were removed, every inference is recomputed;
    /// otherwise only the added rules are evaluated.
    pub fn update_program(&self, program: Program) -> Result<Program, EngineError<S, P>> {
        let (previous, updated) = self.with_connection(|conn| {
            let previous = conn.load_program_by_name(program.name())?;
            let updated = conn.update_program(program)?;
            Ok((previous, updated))
        })?;
        let before = previous.map(|p| p.rules().to_vec()).unwrap_or_default();
        let removed = before
            .iter()
            .any(|old| !updated.rules().iter().any(|r| r.same_definition(old)));
        log::info!("Updated reasoning program '{}'", updated.name());
        self.core.load_programs();
        if removed {
            self.notify_remove_rules();
        } else {
            for rule in updated.rules() {
                if !before.iter().any(|old| old.same_definition(rule)) {
                    self.notify_add_rule(rule.clone());
                }
            }
        }
        Ok(updated)
    }

    /// Delete a program, and retract every inference that no remaining rule supports.
    pub fn remove_program(&self, name: &str) -> Result<Program, EngineError<S, P>> {
        let deleted = self.with_connection(|conn| conn.delete_program(name))?;
        log::info!("Removed reasoning program '{}'", deleted.name());
        self.core.load_programs();
        self.notify_remove_rules();
        Ok(deleted)
    }

    /// Schedule the evaluation of a new `rule` against the whole store.
    ///
    /// Rules are monotonic, so a new rule never invalidates existing inferences.
    pub fn notify_add_rule(&self, rule: Arc<Rule>) {
        self.enqueue(Job::AddRule(rule));
    }

    /// Schedule a full re-run, after some rules were removed.
    pub fn notify_remove_rules(&self) {
        self.re_run_programs();
    }

    /// Schedule a full re-run:
    /// every justification and every inferred statement is dropped,
    /// then every rule of every loaded program is evaluated against the whole store.
    pub fn re_run_programs(&self) {
        self.enqueue(Job::ReRun);
    }

    /// Whether the worker has not caught up with the committed transactions yet.
    pub fn is_running(&self) -> bool {
        self.core.busy.load(Ordering::SeqCst) || self.core.pending_jobs() > 0
    }

    /// Block until the worker has caught up, or `timeout` has elapsed.
    ///
    /// Return whether the worker has caught up.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.is_running() {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(2));
        }
        true
    }

    /// A snapshot of the activity of this engine.
    pub fn status(&self) -> ReasoningStatus {
        self.core.counters.snapshot(
            self.core.busy.load(Ordering::SeqCst),
            self.core.pending_jobs(),
        )
    }

    /// Stop the engine.
    ///
    /// Transactions committed after this call are not reasoned about any more.
    /// The worker is given [`shutdown_retries`](ReasoningConfig::shutdown_retries)
    /// times [`shutdown_poll`](ReasoningConfig::shutdown_poll) to process the queued transactions;
    /// after that, the remaining work is discarded and the worker is detached.
    ///
    /// Calling this method more than once has no effect.
    pub fn shutdown(&self) {
        let counters = &self.core.counters;
        if !counters.transition(EngineState::Running, EngineState::ShuttingDown) {
            return;
        }
        log::info!("Shutting down the reasoning engine");
        drop(self.sender.lock().take());
        let handle = self.worker.lock().take();
        match handle {
            Some(_) if self.core.is_worker_thread() => {
                log::warn!("Reasoning engine shut down by its own worker, not waiting for it");
            }
            Some(handle) => self.await_worker(handle),
            None => (),
        }
        counters.set_state(EngineState::Stopped);
    }

    fn await_worker(&self, handle: JoinHandle<()>) {
        let config = &self.core.config;
        let mut retries = config.shutdown_retries;
        while !handle.is_finished() && retries > 0 {
            thread::sleep(config.shutdown_poll);
            retries -= 1;
        }
        if handle.is_finished() {
            if handle.join().is_err() {
                log::error!("The reasoning worker panicked");
            }
        } else {
            self.core.cancelled.store(true, Ordering::SeqCst);
            log::warn!(
                "The reasoning worker did not finish within {:?}, {} queued job(s) are discarded",
                config.shutdown_poll * config.shutdown_retries,
                self.core.pending_jobs(),
            );
        }
    }

    /// Delete every persisted justification supported by one of the `removed` statements.
    pub fn cleanup_justifications(&self, removed: &[Triple]) -> Result<usize, EngineError<S, P>> {
        self.with_connection(|conn| self.core.cleanup_justifications(conn, removed))
    }

    /// Retract every inferred statement left without justification.
    ///
    /// Return the retracted statements.
    ///
    /// Unless called by the worker itself, this waits for the worker to perform the cleanup,
    /// so that the commit lock is never held by a thread blocked on a full queue.
    pub fn cleanup_unsupported(&self) -> Result<Vec<Triple>, EngineError<S, P>> {
        if self.core.is_worker_thread() {
            return self.core.collect_garbage(&[]);
        }
        let (reply, outcome) = sync_channel(1);
        let core = self.core.clone();
        self.enqueue(Job::Cleanup(Box::new(move || {
            let _ = reply.send(core.collect_garbage(&[]));
        })));
        match outcome.recv() {
            Ok(ret) => ret,
            // the job was refused or discarded: the worker is stopped
            Err(_) => self.core.collect_garbage(&[]),
        }
    }

    /// Resolve `justifications` into justifications whose supporting statements are all base statements.
    pub fn get_base_justifications(
        &self,
        justifications: &BTreeSet<Justification>,
    ) -> Result<BTreeSet<Justification>, EngineError<S, P>> {
        let mut conn = self.core.connect()?;
        self.core.get_base_justifications(&mut conn, justifications)
    }

    /// Drop from `justifications` those which are already persisted.
    pub fn remove_duplicate_justifications(
        &self,
        justifications: BTreeSet<Justification>,
    ) -> Result<BTreeSet<Justification>, EngineError<S, P>> {
        let mut conn = self.core.connect()?;
        self.core.remove_duplicate_justifications(&mut conn, justifications)
    }

    /// Run `f` on a fresh persistence connection, and commit it if `f` succeeds.
    fn with_connection<T, F>(&self, f: F) -> Result<T, EngineError<S, P>>
    where
        F: FnOnce(&mut P::Connection) -> Result<T, P::Error>,
    {
        let mut conn = self.core.connect()?;
        match f(&mut conn).and_then(|ret| conn.commit().map(|()| ret)) {
            Ok(ret) => Ok(ret),
            Err(err) => {
                if let Err(rollback_err) = conn.rollback() {
                    log::warn!("Failed to roll back a persistence connection: {rollback_err}");
                }
                Err(ReasoningError::Persistence(err))
            }
        }
    }

    fn enqueue(&self, job: Job) {
        if self.core.is_worker_thread() {
            self.core.backlog.lock().push_back(job);
            return;
        }
        let sender = self.sender.lock().clone();
        let Some(sender) = sender else {
            log::warn!(
                "Reasoning engine is {}, ignoring {job}",
                self.core.counters.state()
            );
            return;
        };
        self.core.queued.fetch_add(1, Ordering::SeqCst);
        if let Err(err) = sender.send(job) {
            self.core.queued.fetch_sub(1, Ordering::SeqCst);
            log::error!("Reasoning worker is gone, {} is lost", err.0);
        }
    }
}

impl<S, P> TransactionListener for ReasoningEngine<S, P>
where
    S: TripleStore,
    P: ReasoningPersistence,
{
    fn after_commit(&self, data: &TransactionData) {
        if data.is_empty() || self.core.index().is_empty() {
            return;
        }
        self.enqueue(Job::Delta(data.clone()));
    }
}

impl<S, P> Drop for ReasoningEngine<S, P>
where
    S: TripleStore,
    P: ReasoningPersistence,
{
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<S, P> Core<S, P>
where
    S: TripleStore,
    P: ReasoningPersistence,
{
    pub fn index(&self) -> Arc<RuleIndex> {
        self.index.read().clone()
    }

    pub fn load_programs(&self) -> bool {
        let loaded = self
            .connect()
            .and_then(|mut conn| conn.list_programs().map_err(ReasoningError::Persistence));
        match loaded {
            Ok(programs) => {
                let index = RuleIndex::new(programs);
                log::info!(
                    "Loaded {} reasoning program(s) with {} distinct body pattern(s)",
                    index.programs().len(),
                    index.patterns().len()
                );
                *self.index.write() = Arc::new(index);
                true
            }
            Err(err) => {
                log::error!("Failed to load reasoning programs, reasoning is disabled: {err}");
                *self.index.write() = Arc::default();
                false
            }
        }
    }

    pub fn connect(&self) -> Result<P::Connection, EngineError<S, P>> {
        self.persistence
            .connect()
            .map_err(ReasoningError::Persistence)
    }

    pub fn is_worker_thread(&self) -> bool {
        self.worker.get() == Some(&thread::current().id())
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn pending_jobs(&self) -> usize {
        self.queued.load(Ordering::SeqCst) + self.backlog.lock().len()
    }

    pub fn execute(&self, job: Job) {
        match job {
            Job::Delta(data) => self.execute_reasoner(data),
            Job::AddRule(rule) => {
                log::debug!("Evaluating new rule '{}'", rule.name());
                self.process_rule_logged(&rule, None, None);
            }
            Job::ReRun => self.re_run(),
            Job::Cleanup(task) => task(),
        }
    }
}

#[cfg(test)]
mod test;

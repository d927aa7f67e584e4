//! An in-memory, transactional [`TripleStore`].
use std::collections::BTreeSet;
use std::mem::take;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use warrant_api::pattern::{MatchKey, Pattern};
use warrant_api::query::{evaluate, QueryResult, QueryResults, TripleMatcher};
use warrant_api::store::{StoreTransaction, TripleStore};
use warrant_api::term::Node;
use warrant_api::transaction::{TransactionData, TransactionListener};
use warrant_api::triple::Triple;

use crate::index::StatementIndex;

/// The error raised by [`MemoryStore`] and [`MemoryTransaction`].
#[derive(Debug, Error)]
pub enum MemoryStoreError {
    /// The term index is full
    #[error("too many distinct terms in the store")]
    TooManyTerms,
    /// A base statement was expected
    #[error("expected a base statement, got {0}")]
    NotBase(Triple),
    /// An inferred statement was expected
    #[error("expected an inferred statement, got {0}")]
    NotInferred(Triple),
}

/// An in-memory triple store.
///
/// This is a cheap handle: clones share the same statements and listeners.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    statements: RwLock<StatementIndex>,
    listeners: Mutex<Vec<Weak<dyn TransactionListener>>>,
}

impl MemoryStore {
    /// Build an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed statements, base and inferred.
    pub fn len(&self) -> usize {
        self.inner.statements.read().len()
    }

    /// Whether this store has no committed statement.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `triple` is a committed statement.
    pub fn contains(&self, triple: &Triple) -> bool {
        self.inner.statements.read().contains(triple)
    }

    /// Every committed statement.
    pub fn triples(&self) -> Vec<Triple> {
        self.inner.statements.read().triples().collect()
    }

    /// Every committed base statement.
    pub fn base_triples(&self) -> BTreeSet<Triple> {
        let statements = self.inner.statements.read();
        statements.triples().filter(|t| !t.is_inferred()).collect()
    }

    /// Every committed inferred statement.
    pub fn inferred_triples(&self) -> BTreeSet<Triple> {
        let statements = self.inner.statements.read();
        statements.triples().filter(Triple::is_inferred).collect()
    }

    /// Assert the given base statements in a single transaction.
    pub fn insert_all<I>(&self, triples: I) -> Result<(), MemoryStoreError>
    where
        I: IntoIterator<Item = Triple>,
    {
        let mut tx = self.begin()?;
        for t in triples {
            tx.add_triple(t)?;
        }
        tx.commit()
    }

    /// Retract the given base statements in a single transaction.
    pub fn remove_all<'a, I>(&self, triples: I) -> Result<(), MemoryStoreError>
    where
        I: IntoIterator<Item = &'a Triple>,
    {
        let mut tx = self.begin()?;
        for t in triples {
            tx.remove_triple(t)?;
        }
        tx.commit()
    }

    /// Upgrade the registered listeners, forgetting the dropped ones.
    fn live_listeners(&self) -> Vec<Arc<dyn TransactionListener>> {
        let mut listeners = self.inner.listeners.lock();
        listeners.retain(|l| l.strong_count() > 0);
        listeners.iter().filter_map(Weak::upgrade).collect()
    }
}

impl TripleMatcher for MemoryStore {
    type Error = MemoryStoreError;

    fn matching_triples(
        &self,
        key: &MatchKey,
        include_inferred: bool,
    ) -> Result<Vec<Triple>, Self::Error> {
        Ok(self.inner.statements.read().matching(key, include_inferred))
    }
}

impl TripleStore for MemoryStore {
    type Error = MemoryStoreError;
    type Transaction = MemoryTransaction;

    fn begin(&self) -> Result<MemoryTransaction, MemoryStoreError> {
        Ok(MemoryTransaction {
            store: self.clone(),
            added: BTreeSet::new(),
            removed: BTreeSet::new(),
        })
    }

    fn query(
        &self,
        patterns: Vec<Pattern>,
        seed: Option<&QueryResult>,
        context: Option<&Node>,
        limit: Option<usize>,
        include_inferred: bool,
    ) -> Result<QueryResults<MemoryStoreError>, MemoryStoreError> {
        Ok(evaluate(self, patterns, seed, context, limit, include_inferred))
    }

    fn add_listener(&self, listener: Weak<dyn TransactionListener>) {
        self.inner.listeners.lock().push(listener);
    }
}

/// A transaction on a [`MemoryStore`].
///
/// Changes are staged, and applied atomically on commit.
/// Dropping an uncommitted transaction discards its changes.
pub struct MemoryTransaction {
    store: MemoryStore,
    added: BTreeSet<Triple>,
    removed: BTreeSet<Triple>,
}

impl MemoryTransaction {
    fn stage_add(&mut self, triple: Triple) {
        self.removed.remove(&triple);
        self.added.insert(triple);
    }

    fn stage_remove(&mut self, triple: &Triple) {
        self.added.remove(triple);
        self.removed.insert(triple.clone());
    }

    fn staged(&mut self) -> TransactionData {
        TransactionData::new(
            take(&mut self.added).into_iter().collect(),
            take(&mut self.removed).into_iter().collect(),
        )
    }
}

impl StoreTransaction for MemoryTransaction {
    type Error = MemoryStoreError;

    fn add_triple(&mut self, triple: Triple) -> Result<(), MemoryStoreError> {
        if triple.is_inferred() {
            return Err(MemoryStoreError::NotBase(triple));
        }
        self.stage_add(triple);
        Ok(())
    }

    fn remove_triple(&mut self, triple: &Triple) -> Result<(), MemoryStoreError> {
        if triple.is_inferred() {
            return Err(MemoryStoreError::NotBase(triple.clone()));
        }
        self.stage_remove(triple);
        Ok(())
    }

    fn add_inferred(&mut self, triple: Triple) -> Result<(Triple, bool), MemoryStoreError> {
        let triple = triple.with_inferred(true);
        if self.added.contains(&triple) {
            return Ok((triple, false));
        }
        let committed = !self.removed.contains(&triple) && self.store.contains(&triple);
        if !committed {
            self.stage_add(triple.clone());
        }
        Ok((triple, !committed))
    }

    fn remove_inferred(&mut self, triple: &Triple) -> Result<(), MemoryStoreError> {
        if !triple.is_inferred() {
            return Err(MemoryStoreError::NotInferred(triple.clone()));
        }
        self.stage_remove(triple);
        Ok(())
    }

    fn commit(mut self) -> Result<(), MemoryStoreError> {
        let staged = self.staged();
        if staged.is_empty() {
            return Ok(());
        }
        let listeners = self.store.live_listeners();
        for l in &listeners {
            l.before_commit(&staged);
        }
        let mut added = Vec::new();
        let mut removed = Vec::new();
        {
            let mut statements = self.store.inner.statements.write();
            for t in staged.removed_triples() {
                if statements.remove(t) {
                    removed.push(t.clone());
                }
            }
            for t in staged.added_triples() {
                if statements.insert(t)? {
                    let mut t = t.clone();
                    t.mark_for_reasoning();
                    added.push(t);
                }
            }
        }
        log::trace!(
            "committed {} additions and {} removals",
            added.len(),
            removed.len()
        );
        let data = TransactionData::new(added, removed);
        if !data.is_empty() {
            for l in &listeners {
                l.after_commit(&data);
            }
        }
        Ok(())
    }

    fn rollback(mut self) -> Result<(), MemoryStoreError> {
        let staged = self.staged();
        for l in self.store.live_listeners() {
            l.rollback(&staged);
        }
        Ok(())
    }
}

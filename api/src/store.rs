//! I define the contract of the transactional triple store the reasoner works on.
use std::error::Error;
use std::sync::Weak;

use crate::pattern::Pattern;
use crate::query::{QueryResult, QueryResults};
use crate::term::Node;
use crate::transaction::TransactionListener;
use crate::triple::Triple;

/// A transactional triple store.
///
/// Implementors are cheap handles on shared data:
/// cloning a store yields another handle on the same statements.
pub trait TripleStore: Clone + Send + Sync + 'static {
    /// The error raised by this store
    type Error: Error + Send + Sync + 'static;
    /// The transactions of this store
    type Transaction: StoreTransaction<Error = Self::Error>;

    /// Start a new transaction.
    fn begin(&self) -> Result<Self::Transaction, Self::Error>;

    /// Evaluate the conjunction of `patterns` against the committed statements.
    ///
    /// See [`evaluate`](crate::query::evaluate) for the meaning of the parameters.
    fn query(
        &self,
        patterns: Vec<Pattern>,
        seed: Option<&QueryResult>,
        context: Option<&Node>,
        limit: Option<usize>,
        include_inferred: bool,
    ) -> Result<QueryResults<Self::Error>, Self::Error>;

    /// Register a listener, notified of every subsequent transaction.
    ///
    /// The store only keeps a weak reference:
    /// dropping the listener unregisters it.
    fn add_listener(&self, listener: Weak<dyn TransactionListener>);
}

/// A transaction on a [`TripleStore`].
///
/// Changes are only visible to other transactions and queries once committed.
/// Dropping a transaction without committing it rolls it back.
pub trait StoreTransaction: Send {
    /// The error raised by this transaction
    type Error: Error + Send + Sync + 'static;

    /// Assert a base statement.
    fn add_triple(&mut self, triple: Triple) -> Result<(), Self::Error>;

    /// Retract a base statement.
    fn remove_triple(&mut self, triple: &Triple) -> Result<(), Self::Error>;

    /// Insert an inferred statement.
    ///
    /// This is idempotent: inserting an inferred statement which is already present is a no-op.
    /// Return the inferred statement and whether it is new.
    fn add_inferred(&mut self, triple: Triple) -> Result<(Triple, bool), Self::Error>;

    /// Retract an inferred statement.
    fn remove_inferred(&mut self, triple: &Triple) -> Result<(), Self::Error>;

    /// Apply the changes of this transaction.
    fn commit(self) -> Result<(), Self::Error>;

    /// Discard the changes of this transaction.
    fn rollback(self) -> Result<(), Self::Error>;
}

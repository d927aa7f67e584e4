//! I define the transaction notification contract between a store and its listeners.
use crate::triple::Triple;

/// The statements changed by a committed (or rolled back) transaction.
///
/// Statements created by the transaction appear in `added_triples`
/// [marked for reasoning](Triple::is_marked_for_reasoning).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TransactionData {
    added_triples: Vec<Triple>,
    removed_triples: Vec<Triple>,
}

impl TransactionData {
    /// Build transaction data.
    pub fn new(added_triples: Vec<Triple>, removed_triples: Vec<Triple>) -> Self {
        TransactionData {
            added_triples,
            removed_triples,
        }
    }

    /// The statements added by the transaction.
    pub fn added_triples(&self) -> &[Triple] {
        &self.added_triples
    }

    /// Mutable access to the added statements, used to consume their reasoning mark.
    pub fn added_triples_mut(&mut self) -> &mut [Triple] {
        &mut self.added_triples
    }

    /// The statements removed by the transaction.
    pub fn removed_triples(&self) -> &[Triple] {
        &self.removed_triples
    }

    /// Whether the transaction changed nothing.
    pub fn is_empty(&self) -> bool {
        self.added_triples.is_empty() && self.removed_triples.is_empty()
    }
}

/// A component notified of the transactions committed on a store.
///
/// Notifications are delivered synchronously, on the committing thread,
/// after every lock of the store has been released.
/// Implementations must not fail nor panic: nothing they do can fail the commit.
pub trait TransactionListener: Send + Sync {
    /// Called before the changes of a transaction are applied.
    fn before_commit(&self, _data: &TransactionData) {}

    /// Called once the changes of a transaction are visible.
    fn after_commit(&self, data: &TransactionData);

    /// Called when a transaction is rolled back, with its discarded changes.
    fn rollback(&self, _data: &TransactionData) {}
}

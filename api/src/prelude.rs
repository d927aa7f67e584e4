//! Prelude for the `warrant_api` crate.
pub use crate::justification::Justification;
pub use crate::pattern::{Bindings, Field, MatchKey, Pattern};
pub use crate::persistence::{PersistenceConnection, ReasoningPersistence};
pub use crate::query::{QueryResult, QueryResults, TripleMatcher};
pub use crate::rule::{Program, ProgramId, Rule, RuleId};
pub use crate::store::{StoreTransaction, TripleStore};
pub use crate::term::{Literal, Node, Variable};
pub use crate::transaction::{TransactionData, TransactionListener};
pub use crate::triple::Triple;

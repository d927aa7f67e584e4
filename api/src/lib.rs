//! This crate is part of [Warrant],
//! an incremental, justification-tracking reasoner for [RDF] triple stores.
//!
//! It defines
//! * the data model shared by all Warrant crates
//!   ([terms](term), [triples](triple), [patterns](pattern), [rules](rule),
//!   [justifications](justification)),
//! * a generic [query engine](query) evaluating conjunctions of patterns,
//! * the traits that storage collaborators must implement:
//!   [`TripleStore`](store::TripleStore),
//!   [`ReasoningPersistence`](persistence::ReasoningPersistence) and
//!   [`TransactionListener`](transaction::TransactionListener).
//!
//! [Warrant]: https://docs.rs/warrant/latest/warrant/
//! [RDF]: https://www.w3.org/TR/rdf-primer/
#![deny(missing_docs)]

pub mod justification;
pub mod ns;
pub mod pattern;
pub mod persistence;
pub mod prelude;
pub mod query;
pub mod rule;
pub mod store;
pub mod term;
pub mod transaction;
pub mod triple;

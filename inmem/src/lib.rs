//! This crate is part of [Warrant],
//! an incremental, justification-tracking reasoner for [RDF] triple stores.
//!
//! It provides in-memory implementations of the storage collaborators of the reasoner:
//! a transactional [triple store](store::MemoryStore)
//! and a [persistence layer](persistence::MemoryPersistence) for programs and justifications.
//!
//! [Warrant]: https://docs.rs/warrant/latest/warrant/
//! [RDF]: https://www.w3.org/TR/rdf-primer/

pub mod index;
pub mod persistence;
pub mod store;

pub use persistence::{MemoryConnection, MemoryPersistence, PersistenceError};
pub use store::{MemoryStore, MemoryStoreError, MemoryTransaction};

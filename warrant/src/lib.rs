//! Warrant is an incremental, justification-tracking reasoner for [RDF] triple stores.
//!
//! Given a set of [programs](api::rule::Program),
//! i.e. named sets of forward-chaining [rules](api::rule::Rule),
//! the [reasoning engine](reasoner::ReasoningEngine) keeps the inferred statements of a
//! [triple store](api::store::TripleStore) up to date as transactions are committed.
//! Each inferred statement is recorded with its [justifications](api::justification::Justification),
//! i.e. the rules and base statements it was derived from,
//! so that retracting a base statement retracts every inference that no longer holds.
//!
//! This crate gathers the crates of the Warrant project:
//! * [`api`] defines the data model, the query engine and the collaborator traits,
//! * [`inmem`] provides in-memory implementations of the collaborators,
//! * [`reasoner`] provides the reasoning engine.
//!
//! # Getting Started
//!
//! ```
//! use std::time::Duration;
//! use warrant::api::prelude::*;
//! use warrant::inmem::{MemoryPersistence, MemoryStore};
//! use warrant::reasoner::{ReasoningConfig, ReasoningEngine};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryStore::new();
//! let persistence = MemoryPersistence::new(store.clone());
//! let engine = ReasoningEngine::new(store.clone(), persistence, ReasoningConfig::default())?;
//!
//! let knows = Node::iri("http://xmlns.com/foaf/0.1/knows")?;
//! let knows_indirectly = Node::iri("http://example.org/knowsIndirectly")?;
//! let rule = Rule::new(
//!     "knowsIndirectly",
//!     [
//!         Pattern::new(Field::var("x"), knows.clone(), Field::var("y")),
//!         Pattern::new(Field::var("y"), knows.clone(), Field::var("z")),
//!     ],
//!     Pattern::new(Field::var("x"), knows_indirectly.clone(), Field::var("z")),
//! )?;
//! engine.add_program(Program::new("social").with_rule(rule))?;
//!
//! let alice = Node::iri("http://example.org/alice")?;
//! let bob = Node::iri("http://example.org/bob")?;
//! let carol = Node::iri("http://example.org/carol")?;
//! let alice_bob = Triple::new(alice.clone(), knows.clone(), bob.clone());
//! store.insert_all([alice_bob.clone(), Triple::new(bob, knows, carol.clone())])?;
//! assert!(engine.wait_idle(Duration::from_secs(5)));
//!
//! let inferred = Triple::new_inferred(alice, knows_indirectly, carol);
//! assert!(store.contains(&inferred));
//!
//! // retracting a supporting statement retracts the inference
//! store.remove_all([&alice_bob])?;
//! assert!(engine.wait_idle(Duration::from_secs(5)));
//! assert!(!store.contains(&inferred));
//! # Ok(()) }
//! ```
//!
//! [RDF]: https://www.w3.org/TR/rdf-primer/

pub use warrant_api as api;
pub use warrant_inmem as inmem;
pub use warrant_reasoner as reasoner;

//! This crate is part of [Warrant],
//! an incremental, justification-tracking reasoner for [RDF] triple stores.
//!
//! It provides the [`ReasoningEngine`],
//! a forward-chaining rule evaluator maintaining the inferred statements of a
//! [`TripleStore`](warrant_api::store::TripleStore) as transactions are committed,
//! and recording why each inferred statement holds.
//!
//! [Warrant]: https://docs.rs/warrant/latest/warrant/
//! [RDF]: https://www.w3.org/TR/rdf-primer/
#![deny(missing_docs)]

pub mod config;
pub mod engine;
pub mod error;
pub mod status;
mod worker;

pub use config::{ConfigError, ReasoningConfig};
pub use engine::{EngineError, ReasoningEngine};
pub use error::ReasoningError;
pub use status::{EngineState, ReasoningStatus};

//! I define the contract of the layer persisting programs and justifications.
use std::collections::BTreeSet;
use std::error::Error;

use crate::justification::Justification;
use crate::rule::{Program, ProgramId, RuleId};
use crate::triple::Triple;

/// A store of [`Program`]s and [`Justification`]s.
pub trait ReasoningPersistence: Clone + Send + Sync + 'static {
    /// The error raised by this persistence layer
    type Error: Error + Send + Sync + 'static;
    /// The connections of this persistence layer
    type Connection: PersistenceConnection<Error = Self::Error>;

    /// Open a new connection.
    fn connect(&self) -> Result<Self::Connection, Self::Error>;
}

/// A transactional connection to a [`ReasoningPersistence`].
///
/// Reads see the changes made through this connection.
/// Changes are only published to other connections on [`commit`](Self::commit);
/// dropping a connection with uncommitted changes rolls them back.
pub trait PersistenceConnection: Send {
    /// The error raised by this connection
    type Error: Error + Send + Sync + 'static;

    /// Store a new program, assigning identifiers to it and to its rules.
    fn store_program(&mut self, program: Program) -> Result<Program, Self::Error>;

    /// Replace the stored program having the same name,
    /// assigning identifiers to its new rules.
    fn update_program(&mut self, program: Program) -> Result<Program, Self::Error>;

    /// Delete a program and its rules, returning it.
    ///
    /// Justifications depending on the deleted rules are deleted as well.
    fn delete_program(&mut self, name: &str) -> Result<Program, Self::Error>;

    /// Load the program with the given name.
    fn load_program_by_name(&mut self, name: &str) -> Result<Option<Program>, Self::Error>;

    /// Load the program with the given identifier.
    fn load_program_by_id(&mut self, id: ProgramId) -> Result<Option<Program>, Self::Error>;

    /// Load every program.
    fn list_programs(&mut self) -> Result<Vec<Program>, Self::Error>;

    /// List the justifications of `triple`.
    fn list_justifications_for_triple(
        &mut self,
        triple: &Triple,
    ) -> Result<Vec<Justification>, Self::Error>;

    /// List the justifications having `triple` among their supporting triples.
    fn list_justifications_by_supporting_triple(
        &mut self,
        triple: &Triple,
    ) -> Result<Vec<Justification>, Self::Error>;

    /// List the justifications having the rule `rule` among their supporting rules.
    fn list_justifications_by_rule(
        &mut self,
        rule: RuleId,
    ) -> Result<Vec<Justification>, Self::Error>;

    /// Store the given justifications (already stored ones are ignored).
    fn store_justifications(
        &mut self,
        justifications: &BTreeSet<Justification>,
    ) -> Result<(), Self::Error>;

    /// Delete every justification of `triple`.
    fn delete_justifications_for_triple(&mut self, triple: &Triple) -> Result<(), Self::Error>;

    /// Delete the given justifications.
    fn delete_justifications(
        &mut self,
        justifications: &BTreeSet<Justification>,
    ) -> Result<(), Self::Error>;

    /// Delete every justification.
    fn delete_all_justifications(&mut self) -> Result<(), Self::Error>;

    /// List the inferred statements of the store having no justification.
    fn list_unsupported_triples(&mut self) -> Result<Vec<Triple>, Self::Error>;

    /// Publish the changes made through this connection.
    fn commit(&mut self) -> Result<(), Self::Error>;

    /// Discard the changes made through this connection.
    fn rollback(&mut self) -> Result<(), Self::Error>;
}

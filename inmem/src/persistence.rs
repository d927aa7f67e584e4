//! An in-memory [`ReasoningPersistence`], storing programs and justifications.
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use warrant_api::justification::Justification;
use warrant_api::persistence::{PersistenceConnection, ReasoningPersistence};
use warrant_api::rule::{Program, ProgramId, Rule, RuleId};
use warrant_api::triple::Triple;

use crate::store::MemoryStore;

mod _justification_index;
pub use _justification_index::*;

/// The error raised by [`MemoryPersistence`].
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// A program with the same name is already stored
    #[error("a program named '{0}' already exists")]
    DuplicateProgram(String),
    /// No program with that name is stored
    #[error("no program named '{0}'")]
    UnknownProgram(String),
}

/// An in-memory store of programs and justifications,
/// bound to the [`MemoryStore`] whose inferred statements the justifications describe.
///
/// This is a cheap handle: clones share the same data.
#[derive(Clone)]
pub struct MemoryPersistence {
    store: MemoryStore,
    shared: Arc<Mutex<Ledger>>,
    next_id: Arc<AtomicU64>,
}

#[derive(Debug, Default)]
struct Ledger {
    programs: BTreeMap<String, Program>,
    justifications: JustificationIndex,
}

impl MemoryPersistence {
    /// Build an empty persistence layer for `store`.
    pub fn new(store: MemoryStore) -> Self {
        MemoryPersistence {
            store,
            shared: Arc::default(),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Number of committed justifications.
    pub fn justification_count(&self) -> usize {
        self.shared.lock().justifications.len()
    }

    /// Every committed justification.
    pub fn justifications(&self) -> BTreeSet<Justification> {
        self.shared.lock().justifications.iter().cloned().collect()
    }

    fn fresh_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl ReasoningPersistence for MemoryPersistence {
    type Error = PersistenceError;
    type Connection = MemoryConnection;

    fn connect(&self) -> Result<MemoryConnection, PersistenceError> {
        Ok(MemoryConnection {
            persistence: self.clone(),
            programs: BTreeMap::new(),
            inserted: JustificationIndex::new(),
            deleted: BTreeSet::new(),
            deleted_all: false,
        })
    }
}

/// A connection to a [`MemoryPersistence`].
///
/// Changes are staged as an overlay on the committed data,
/// and published on [`commit`](PersistenceConnection::commit).
pub struct MemoryConnection {
    persistence: MemoryPersistence,
    // None marks a deleted program
    programs: BTreeMap<String, Option<Program>>,
    inserted: JustificationIndex,
    deleted: BTreeSet<Justification>,
    deleted_all: bool,
}

impl MemoryConnection {
    fn program(&self, name: &str) -> Option<Program> {
        match self.programs.get(name) {
            Some(staged) => staged.clone(),
            None => self.persistence.shared.lock().programs.get(name).cloned(),
        }
    }

    fn all_programs(&self) -> Vec<Program> {
        let mut programs = self.persistence.shared.lock().programs.clone();
        for (name, staged) in &self.programs {
            match staged {
                Some(p) => programs.insert(name.clone(), p.clone()),
                None => programs.remove(name),
            };
        }
        programs.into_values().collect()
    }

    /// Whether a committed justification is still visible through this connection.
    fn visible(&self, j: &Justification) -> bool {
        !self.deleted_all && !self.deleted.contains(j)
    }

    /// Collect the justifications visible through this connection and selected by `select`.
    fn view<F>(&self, select: F) -> Vec<Justification>
    where
        F: for<'a> Fn(&'a JustificationIndex) -> Box<dyn Iterator<Item = &'a Justification> + 'a>,
    {
        let shared = self.persistence.shared.lock();
        let mut found: BTreeSet<Justification> = select(&shared.justifications)
            .filter(|j| self.visible(j))
            .cloned()
            .collect();
        found.extend(select(&self.inserted).cloned());
        found.into_iter().collect()
    }

    fn delete(&mut self, j: &Justification) {
        self.inserted.remove(j);
        self.deleted.insert(j.clone());
    }

    /// Give an identifier to every rule of `program` lacking one,
    /// reusing the identifiers of identical rules in `previous`.
    fn assign_rule_ids(&self, program: &mut Program, previous: Option<&Program>) {
        for rule in program.rules_mut().iter_mut() {
            if rule.id().is_some() {
                continue;
            }
            let known = previous
                .into_iter()
                .flat_map(Program::rules)
                .find(|r| r.same_definition(rule))
                .and_then(|r| r.id());
            let id = known.unwrap_or_else(|| RuleId(self.persistence.fresh_id()));
            *rule = Arc::new(Rule::clone(rule).with_id(id));
        }
    }
}

impl PersistenceConnection for MemoryConnection {
    type Error = PersistenceError;

    fn store_program(&mut self, mut program: Program) -> Result<Program, PersistenceError> {
        if self.program(program.name()).is_some() {
            return Err(PersistenceError::DuplicateProgram(program.name().to_string()));
        }
        program.set_id(ProgramId(self.persistence.fresh_id()));
        self.assign_rule_ids(&mut program, None);
        self.programs
            .insert(program.name().to_string(), Some(program.clone()));
        Ok(program)
    }

    fn update_program(&mut self, mut program: Program) -> Result<Program, PersistenceError> {
        let Some(previous) = self.program(program.name()) else {
            return Err(PersistenceError::UnknownProgram(program.name().to_string()));
        };
        if let Some(id) = previous.id() {
            program.set_id(id);
        }
        self.assign_rule_ids(&mut program, Some(&previous));
        self.programs
            .insert(program.name().to_string(), Some(program.clone()));
        Ok(program)
    }

    fn delete_program(&mut self, name: &str) -> Result<Program, PersistenceError> {
        let Some(program) = self.program(name) else {
            return Err(PersistenceError::UnknownProgram(name.to_string()));
        };
        for id in program.rules().iter().filter_map(|r| r.id()) {
            for j in self.list_justifications_by_rule(id)? {
                self.delete(&j);
            }
        }
        self.programs.insert(name.to_string(), None);
        Ok(program)
    }

    fn load_program_by_name(&mut self, name: &str) -> Result<Option<Program>, PersistenceError> {
        Ok(self.program(name))
    }

    fn load_program_by_id(&mut self, id: ProgramId) -> Result<Option<Program>, PersistenceError> {
        Ok(self.all_programs().into_iter().find(|p| p.id() == Some(id)))
    }

    fn list_programs(&mut self) -> Result<Vec<Program>, PersistenceError> {
        Ok(self.all_programs())
    }

    fn list_justifications_for_triple(
        &mut self,
        triple: &Triple,
    ) -> Result<Vec<Justification>, PersistenceError> {
        Ok(self.view(|idx| Box::new(idx.for_triple(triple))))
    }

    fn list_justifications_by_supporting_triple(
        &mut self,
        triple: &Triple,
    ) -> Result<Vec<Justification>, PersistenceError> {
        Ok(self.view(|idx| Box::new(idx.by_supporting_triple(triple))))
    }

    fn list_justifications_by_rule(
        &mut self,
        rule: RuleId,
    ) -> Result<Vec<Justification>, PersistenceError> {
        Ok(self.view(|idx| Box::new(idx.by_rule(rule))))
    }

    fn store_justifications(
        &mut self,
        justifications: &BTreeSet<Justification>,
    ) -> Result<(), PersistenceError> {
        for j in justifications {
            self.deleted.remove(j);
            self.inserted.insert(j.clone());
        }
        Ok(())
    }

    fn delete_justifications_for_triple(&mut self, triple: &Triple) -> Result<(), PersistenceError> {
        for j in self.list_justifications_for_triple(triple)? {
            self.delete(&j);
        }
        Ok(())
    }

    fn delete_justifications(
        &mut self,
        justifications: &BTreeSet<Justification>,
    ) -> Result<(), PersistenceError> {
        for j in justifications {
            self.delete(j);
        }
        Ok(())
    }

    fn delete_all_justifications(&mut self) -> Result<(), PersistenceError> {
        self.inserted.clear();
        self.deleted.clear();
        self.deleted_all = true;
        Ok(())
    }

    fn list_unsupported_triples(&mut self) -> Result<Vec<Triple>, PersistenceError> {
        let inferred = self.persistence.store.inferred_triples();
        let shared = self.persistence.shared.lock();
        Ok(inferred
            .into_iter()
            .filter(|t| {
                self.inserted.for_triple(t).next().is_none()
                    && !shared
                        .justifications
                        .for_triple(t)
                        .any(|j| self.visible(j))
            })
            .collect())
    }

    fn commit(&mut self) -> Result<(), PersistenceError> {
        let mut shared = self.persistence.shared.lock();
        for (name, staged) in std::mem::take(&mut self.programs) {
            match staged {
                Some(p) => shared.programs.insert(name, p),
                None => shared.programs.remove(&name),
            };
        }
        if std::mem::take(&mut self.deleted_all) {
            shared.justifications.clear();
        }
        for j in std::mem::take(&mut self.deleted) {
            shared.justifications.remove(&j);
        }
        for j in self.inserted.iter() {
            shared.justifications.insert(j.clone());
        }
        self.inserted.clear();
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), PersistenceError> {
        self.programs.clear();
        self.inserted.clear();
        self.deleted.clear();
        self.deleted_all = false;
        Ok(())
    }
}

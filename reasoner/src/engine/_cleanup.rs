use std::collections::BTreeSet;

use warrant_api::persistence::{PersistenceConnection, ReasoningPersistence};
use warrant_api::store::{StoreTransaction, TripleStore};
use warrant_api::triple::Triple;

use super::{Core, EngineError};
use crate::error::ReasoningError;
use crate::status::Counters;

impl<S, P> Core<S, P>
where
    S: TripleStore,
    P: ReasoningPersistence,
{
    /// Invalidate the justifications supported by `removed`,
    /// and retract the inferred statements left without justification.
    pub fn process_removals(&self, removed: &[Triple]) {
        match self.collect_garbage(removed) {
            Ok(retracted) if retracted.is_empty() => (),
            Ok(retracted) => log::debug!(
                "{} removed statement(s) caused the retraction of {} inferred statement(s)",
                removed.len(),
                retracted.len()
            ),
            Err(err) => {
                Counters::add(&self.counters.consistency_failures, 1);
                log::error!(
                    "Cleanup after {} removed statement(s) failed, the store and the justifications may be inconsistent: {err}",
                    removed.len()
                );
            }
        }
    }

    /// Delete every justification supported by one of the `removed` statements.
    ///
    /// Justifications *of* the removed statements are kept:
    /// they are only dropped once their own supports are removed.
    pub fn cleanup_justifications(
        &self,
        conn: &mut P::Connection,
        removed: &[Triple],
    ) -> Result<usize, P::Error> {
        let mut obsolete = BTreeSet::new();
        for triple in removed {
            obsolete.extend(conn.list_justifications_by_supporting_triple(triple)?);
        }
        if !obsolete.is_empty() {
            conn.delete_justifications(&obsolete)?;
        }
        Ok(obsolete.len())
    }

    /// Clean up after `removed`, and retract every unsupported inferred statement,
    /// committing the store and the persistence as a pair.
    ///
    /// Return the retracted statements.
    pub fn collect_garbage(&self, removed: &[Triple]) -> Result<Vec<Triple>, EngineError<S, P>> {
        self.in_pair(|conn, tx| {
            self.cleanup_justifications(conn, removed)
                .map_err(ReasoningError::Persistence)?;
            self.retract_unsupported(conn, tx)
        })
    }

    /// Drop every justification and every inferred statement,
    /// then evaluate every loaded rule against the whole store.
    pub fn re_run(&self) {
        log::info!("Re-running every reasoning program");
        let reset = self.in_pair(|conn, tx| {
            conn.delete_all_justifications()
                .map_err(ReasoningError::Persistence)?;
            self.retract_unsupported(conn, tx)
        });
        match reset {
            Ok(retracted) => log::debug!("Retracted {} inferred statement(s)", retracted.len()),
            Err(err) => {
                Counters::add(&self.counters.consistency_failures, 1);
                log::error!(
                    "Resetting inferences failed, the store and the justifications may be inconsistent: {err}"
                );
                return;
            }
        }
        let index = self.index();
        for rule in index.rules() {
            if self.is_cancelled() {
                return;
            }
            self.process_rule_logged(rule, None, None);
        }
    }

    /// Run `f` on a fresh persistence connection and a fresh store transaction,
    /// then commit both, the persistence first.
    ///
    /// If anything fails, whatever was not committed yet is rolled back.
    fn in_pair<T, F>(&self, f: F) -> Result<T, EngineError<S, P>>
    where
        F: FnOnce(&mut P::Connection, &mut S::Transaction) -> Result<T, EngineError<S, P>>,
    {
        let _guard = self.commit_lock.lock();
        let mut conn = self.connect()?;
        let mut tx = self.store.begin().map_err(ReasoningError::Store)?;
        let ret = match f(&mut conn, &mut tx) {
            Ok(ret) => ret,
            Err(err) => {
                rollback_connection(&mut conn);
                if let Err(rollback_err) = tx.rollback() {
                    log::warn!("Failed to roll back a store transaction: {rollback_err}");
                }
                return Err(err);
            }
        };
        if let Err(err) = conn.commit() {
            rollback_connection(&mut conn);
            if let Err(rollback_err) = tx.rollback() {
                log::warn!("Failed to roll back a store transaction: {rollback_err}");
            }
            return Err(ReasoningError::Persistence(err));
        }
        tx.commit().map_err(ReasoningError::Store)?;
        Ok(ret)
    }

    /// Retract every inferred statement without justification.
    fn retract_unsupported(
        &self,
        conn: &mut P::Connection,
        tx: &mut S::Transaction,
    ) -> Result<Vec<Triple>, EngineError<S, P>> {
        let unsupported = conn
            .list_unsupported_triples()
            .map_err(ReasoningError::Persistence)?;
        for triple in &unsupported {
            tx.remove_inferred(triple).map_err(ReasoningError::Store)?;
        }
        Ok(unsupported)
    }
}

fn rollback_connection<C: PersistenceConnection>(conn: &mut C) {
    if let Err(err) = conn.rollback() {
        log::warn!("Failed to roll back a persistence connection: {err}");
    }
}

use std::collections::BTreeSet;
use std::sync::Arc;

use resiter::Map;
use warrant_api::justification::Justification;
use warrant_api::pattern::Pattern;
use warrant_api::persistence::{PersistenceConnection, ReasoningPersistence};
use warrant_api::query::{QueryResult, QueryResults};
use warrant_api::rule::Rule;
use warrant_api::store::{StoreTransaction, TripleStore};
use warrant_api::transaction::TransactionData;
use warrant_api::triple::Triple;

use super::{Core, EngineError};
use crate::error::ReasoningError;
use crate::status::Counters;
use crate::worker::Job;

/// The inferences of a rule not committed yet.
#[derive(Default)]
struct Batch {
    rows: usize,
    justifications: BTreeSet<Justification>,
    /// inferred statements which did not exist before this batch
    created: BTreeSet<Triple>,
}

impl<S, P> Core<S, P>
where
    S: TripleStore,
    P: ReasoningPersistence,
{
    /// Reason over a committed transaction.
    pub fn execute_reasoner(&self, mut data: TransactionData) {
        let new_triples: Vec<Triple> = data
            .added_triples_mut()
            .iter_mut()
            .filter_map(|t| t.take_reasoning_mark().then(|| t.clone()))
            .collect();
        log::debug!(
            "Reasoning over {} new and {} removed statement(s)",
            new_triples.len(),
            data.removed_triples().len()
        );
        if !new_triples.is_empty() {
            self.process_rules(&new_triples);
        }
        if !data.removed_triples().is_empty() {
            self.process_removals(data.removed_triples());
        }
        Counters::add(&self.counters.deltas_processed, 1);
    }

    /// Fire every rule having a body pattern matched by one of `new_triples`.
    pub fn process_rules(&self, new_triples: &[Triple]) {
        let index = self.index();
        for (pattern, rules) in index.patterns() {
            for triple in new_triples {
                if self.is_cancelled() {
                    return;
                }
                let Some(seed) = pattern.matches_triple(triple) else {
                    continue;
                };
                for rule in rules {
                    self.process_rule_logged(rule, Some(seed.clone()), Some(pattern));
                }
            }
        }
    }

    pub fn process_rule_logged(
        &self,
        rule: &Arc<Rule>,
        seed: Option<QueryResult>,
        matched: Option<&Pattern>,
    ) {
        match self.process_rule(rule, seed, matched) {
            Ok(0) => (),
            Ok(n) => log::debug!("Rule '{}' inferred {n} new statement(s)", rule.name()),
            Err(err) => {
                Counters::add(&self.counters.consistency_failures, 1);
                log::error!(
                    "Reasoning with rule '{}' was abandoned, the store and the justifications may be inconsistent: {err}",
                    rule.name()
                );
            }
        }
    }

    /// Fire `rule` on every solution of its body extending `seed`,
    /// where `matched` is the body pattern already satisfied by `seed`.
    ///
    /// Without a seed, the whole body is evaluated against the store.
    /// Return the number of new inferred statements.
    pub fn process_rule(
        &self,
        rule: &Arc<Rule>,
        seed: Option<QueryResult>,
        matched: Option<&Pattern>,
    ) -> Result<usize, EngineError<S, P>> {
        let remaining: Vec<Pattern> = rule
            .body()
            .iter()
            .filter(|p| Some(*p) != matched)
            .cloned()
            .collect();
        let rows: QueryResults<S::Error> = if remaining.is_empty() {
            Box::new(seed.into_iter().map(Ok::<_, S::Error>))
        } else {
            self.store
                .query(remaining, seed.as_ref(), None, None, true)
                .map_err(ReasoningError::Store)?
        };

        let mut tx = self.store.begin().map_err(ReasoningError::Store)?;
        let mut batch = Batch::default();
        let mut created = 0;
        // an error drops the current transaction, which rolls it back
        for row in rows.map_err(ReasoningError::Store) {
            if self.is_cancelled() {
                log::warn!("Evaluation of rule '{}' interrupted", rule.name());
                break;
            }
            let (bindings, supports) = row?.into_parts();
            let triple = match rule.head_triple(&bindings) {
                Ok(triple) => triple,
                Err(err) => {
                    log::warn!("Skipping a solution of rule '{}': {err}", rule.name());
                    continue;
                }
            };
            let (triple, is_new) = tx.add_inferred(triple).map_err(ReasoningError::Store)?;
            if is_new {
                created += 1;
                batch.created.insert(triple.clone());
            }
            batch
                .justifications
                .insert(Justification::fired(triple, rule.clone(), supports));
            batch.rows += 1;
            if batch.rows >= self.config.batch_size {
                self.flush(tx, std::mem::take(&mut batch))?;
                tx = self.store.begin().map_err(ReasoningError::Store)?;
            }
        }
        self.flush(tx, batch)?;
        Counters::add(&self.counters.triples_inferred, created);
        Ok(created)
    }

    /// Commit `tx`, then persist the justifications of `batch` in base form.
    fn flush(&self, tx: S::Transaction, batch: Batch) -> Result<(), EngineError<S, P>> {
        let _guard = self.commit_lock.lock();
        tx.commit().map_err(ReasoningError::Store)?;
        if batch.justifications.is_empty() {
            return Ok(());
        }
        let mut conn = self.connect()?;
        let (stored, novel) = match self.persist(&mut conn, &batch.justifications) {
            Ok(persisted) => persisted,
            Err(err) => {
                if let Err(rollback_err) = conn.rollback() {
                    log::warn!("Failed to roll back a persistence connection: {rollback_err}");
                }
                return Err(err);
            }
        };
        log::trace!(
            "Flushed {} row(s), {} new statement(s), {} new justification(s)",
            batch.rows,
            batch.created.len(),
            novel.len()
        );
        Counters::add(&self.counters.justifications_stored, stored);

        // statements which already existed but gained a justification:
        // reason over them again, so that their consequences gain it too
        let justified: BTreeSet<Triple> = novel
            .into_iter()
            .map(|j| j.into_parts().0)
            .filter(|t| !batch.created.contains(t))
            .collect();
        if !justified.is_empty() {
            let added = justified
                .into_iter()
                .map(|mut t| {
                    t.mark_for_reasoning();
                    t
                })
                .collect();
            self.backlog
                .lock()
                .push_back(Job::Delta(TransactionData::new(added, Vec::new())));
        }
        Ok(())
    }

    /// Persist the base form of `candidates`.
    ///
    /// Return the number of stored justifications,
    /// and the justifications which were not persisted before.
    fn persist(
        &self,
        conn: &mut P::Connection,
        candidates: &BTreeSet<Justification>,
    ) -> Result<(usize, BTreeSet<Justification>), EngineError<S, P>> {
        let resolved = self.get_base_justifications(conn, candidates)?;
        let novel = self.remove_duplicate_justifications(conn, resolved.clone())?;
        let stored = if self.config.remove_duplicate_justifications {
            &novel
        } else {
            &resolved
        };
        if !stored.is_empty() {
            conn.store_justifications(stored)
                .map_err(ReasoningError::Persistence)?;
        }
        conn.commit().map_err(ReasoningError::Persistence)?;
        Ok((stored.len(), novel))
    }
}

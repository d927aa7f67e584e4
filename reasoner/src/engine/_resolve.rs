use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use warrant_api::justification::Justification;
use warrant_api::persistence::{PersistenceConnection, ReasoningPersistence};
use warrant_api::rule::Rule;
use warrant_api::store::TripleStore;
use warrant_api::triple::Triple;

use super::{Core, EngineError};
use crate::error::ReasoningError;

/// The base justifications of the inferred statements met during one resolution.
///
/// `None` marks a statement whose resolution is in progress.
type Resolved = HashMap<Triple, Option<Vec<Justification>>>;

/// A justification under construction.
type Partial = (BTreeSet<Arc<Rule>>, BTreeSet<Triple>);

impl<S, P> Core<S, P>
where
    S: TripleStore,
    P: ReasoningPersistence,
{
    /// Replace every inferred supporting statement of `justifications`
    /// by the supports of its own justifications,
    /// until only base statements remain.
    ///
    /// A statement with several justifications yields one result per alternative.
    pub fn get_base_justifications(
        &self,
        conn: &mut P::Connection,
        justifications: &BTreeSet<Justification>,
    ) -> Result<BTreeSet<Justification>, EngineError<S, P>> {
        let mut resolved = Resolved::new();
        let mut ret = BTreeSet::new();
        for j in justifications {
            ret.extend(self.resolve(conn, j, &mut resolved)?);
        }
        Ok(ret)
    }

    fn resolve(
        &self,
        conn: &mut P::Connection,
        justification: &Justification,
        resolved: &mut Resolved,
    ) -> Result<Vec<Justification>, EngineError<S, P>> {
        let mut partials: Vec<Partial> = vec![(
            justification.supporting_rules().clone(),
            BTreeSet::new(),
        )];
        for support in justification.supporting_triples() {
            if !support.is_inferred() {
                for (_, triples) in partials.iter_mut() {
                    triples.insert(support.clone());
                }
                continue;
            }
            let Some(alternatives) = self.resolve_triple(conn, support, resolved)? else {
                log::warn!(
                    "Cyclic justification: {} depends on itself through {support}",
                    justification.triple()
                );
                continue;
            };
            if alternatives.is_empty() {
                log::error!(
                    "Data integrity error: inferred statement {support} has no justification"
                );
                continue;
            }
            partials = partials
                .into_iter()
                .flat_map(|(rules, triples)| {
                    alternatives.iter().map(move |alt| {
                        let mut rules = rules.clone();
                        rules.extend(alt.supporting_rules().iter().cloned());
                        let mut triples = triples.clone();
                        triples.extend(alt.supporting_triples().iter().cloned());
                        (rules, triples)
                    })
                })
                .collect();
        }
        Ok(partials
            .into_iter()
            .map(|(rules, triples)| Justification::new(justification.triple().clone(), rules, triples))
            .collect())
    }

    /// The base justifications of `triple`, or `None` if they are being resolved.
    fn resolve_triple(
        &self,
        conn: &mut P::Connection,
        triple: &Triple,
        resolved: &mut Resolved,
    ) -> Result<Option<Vec<Justification>>, EngineError<S, P>> {
        if let Some(known) = resolved.get(triple) {
            return Ok(known.clone());
        }
        resolved.insert(triple.clone(), None);
        let mut alternatives = Vec::new();
        for j in conn
            .list_justifications_for_triple(triple)
            .map_err(ReasoningError::Persistence)?
        {
            alternatives.extend(self.resolve(conn, &j, resolved)?);
        }
        resolved.insert(triple.clone(), Some(alternatives.clone()));
        Ok(Some(alternatives))
    }

    /// Drop from `justifications` those which are already persisted.
    pub fn remove_duplicate_justifications(
        &self,
        conn: &mut P::Connection,
        justifications: BTreeSet<Justification>,
    ) -> Result<BTreeSet<Justification>, EngineError<S, P>> {
        let mut persisted: HashMap<Triple, BTreeSet<Justification>> = HashMap::new();
        let mut kept = BTreeSet::new();
        for j in justifications {
            let known = match persisted.entry(j.triple().clone()) {
                Entry::Occupied(e) => e.into_mut(),
                Entry::Vacant(e) => e.insert(
                    conn.list_justifications_for_triple(j.triple())
                        .map_err(ReasoningError::Persistence)?
                        .into_iter()
                        .collect(),
                ),
            };
            if !known.contains(&j) {
                kept.insert(j);
            }
        }
        log::trace!("{} candidate justification(s) left after removing duplicates", kept.len());
        Ok(kept)
    }
}

//! I define the query engine evaluating conjunctions of [`Pattern`]s.
//!
//! Evaluation is a lazy nested-loop join:
//! at each level, the most selective remaining pattern
//! (the one with the most constant or bound fields) is resolved against the current bindings,
//! the corresponding candidate triples are fetched from a [`TripleMatcher`],
//! and each match recursively evaluates the remaining patterns.
use std::collections::BTreeSet;
use std::error::Error;
use std::iter::once;
use std::sync::Arc;

use crate::pattern::{Bindings, MatchKey, Pattern};
use crate::term::{Node, Variable};
use crate::triple::Triple;

/// A solution of a query:
/// the bindings of its variables, and the triples that were matched to produce them.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct QueryResult {
    bindings: Bindings,
    justifications: BTreeSet<Triple>,
}

impl QueryResult {
    /// Build a query result.
    pub fn new(bindings: Bindings, justifications: BTreeSet<Triple>) -> Self {
        QueryResult {
            bindings,
            justifications,
        }
    }

    /// The variable bindings of this solution.
    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// The triples supporting this solution.
    pub fn justifications(&self) -> &BTreeSet<Triple> {
        &self.justifications
    }

    /// The value bound to `variable`, if any.
    pub fn get(&self, variable: &Variable) -> Option<&Node> {
        self.bindings.get(variable)
    }

    /// Destructure this result.
    pub fn into_parts(self) -> (Bindings, BTreeSet<Triple>) {
        (self.bindings, self.justifications)
    }
}

/// The lazy, forward-only sequence of solutions returned by a query.
///
/// Dropping it releases every resource held by the evaluation.
pub type QueryResults<E> = Box<dyn Iterator<Item = Result<QueryResult, E>> + Send>;

/// The lookup primitive a store provides to the query engine.
///
/// Implementors are expected to be cheap handles on shared data.
pub trait TripleMatcher: Clone + Send + Sync + 'static {
    /// The error raised by lookups
    type Error: Error + Send + Sync + 'static;

    /// Collect the committed triples accepted by `key`.
    ///
    /// Inferred statements are only considered if `include_inferred` is true.
    fn matching_triples(
        &self,
        key: &MatchKey,
        include_inferred: bool,
    ) -> Result<Vec<Triple>, Self::Error>;
}

/// Evaluate the conjunction of `patterns` against `matcher`.
///
/// * `seed`, if provided, pre-populates the bindings and justifications of every solution;
/// * `context`, if provided, restricts every pattern having no context of its own;
/// * `limit`, if provided, caps the number of solutions.
///
/// An empty conjunction yields exactly one solution: the seed, or an empty result.
/// No lookup is performed before the returned iterator is first polled.
pub fn evaluate<M, I>(
    matcher: &M,
    patterns: I,
    seed: Option<&QueryResult>,
    context: Option<&Node>,
    limit: Option<usize>,
    include_inferred: bool,
) -> QueryResults<M::Error>
where
    M: TripleMatcher,
    I: IntoIterator<Item = Pattern>,
{
    let env = Arc::new(JoinEnv {
        matcher: matcher.clone(),
        context: context.cloned(),
        include_inferred,
    });
    let patterns: Vec<Pattern> = patterns.into_iter().collect();
    let seed = seed.cloned().unwrap_or_default();
    let results = once(()).flat_map(move |()| join(env.clone(), patterns.clone(), seed.clone()));
    match limit {
        Some(n) => Box::new(results.take(n)),
        None => Box::new(results),
    }
}

struct JoinEnv<M> {
    matcher: M,
    context: Option<Node>,
    include_inferred: bool,
}

/// Iter over the solutions of `remaining`, given the partial solution `current`.
fn join<M: TripleMatcher>(
    env: Arc<JoinEnv<M>>,
    mut remaining: Vec<Pattern>,
    current: QueryResult,
) -> QueryResults<M::Error> {
    if remaining.is_empty() {
        return Box::new(once(Ok(current)));
    }
    let best = most_selective(&remaining, current.bindings());
    let pattern = remaining.swap_remove(best);
    let key = pattern.match_key(current.bindings(), env.context.as_ref());
    let candidates = match env.matcher.matching_triples(&key, env.include_inferred) {
        Ok(candidates) => candidates,
        Err(err) => return Box::new(once(Err(err))),
    };
    Box::new(
        candidates
            .into_iter()
            .filter_map(move |t| pattern.matches(&t, &current))
            .flat_map(move |next| join(env.clone(), remaining.clone(), next)),
    )
}

/// Index of the pattern with the most constant or bound fields (first one on ties).
fn most_selective(patterns: &[Pattern], bindings: &Bindings) -> usize {
    let mut best = 0;
    let mut best_count = 0;
    for (i, p) in patterns.iter().enumerate() {
        let count = p.bound_count(bindings);
        if count > best_count {
            best = i;
            best_count = count;
        }
    }
    best
}

#[cfg(test)]
mod test;

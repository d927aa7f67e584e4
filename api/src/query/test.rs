use super::*;
use crate::pattern::Field;
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

const FOAF: &str = "http://xmlns.com/foaf/0.1/";

fn ex(suffix: &str) -> Node {
    Node::new_iri_unchecked(format!("http://example.org/{suffix}"))
}

fn knows() -> Node {
    Node::new_iri_unchecked(format!("{FOAF}knows"))
}

fn var(name: &str) -> Variable {
    Variable::new_unchecked(name)
}

#[derive(Clone, Default)]
struct VecMatcher {
    triples: Arc<Vec<Triple>>,
    lookups: Arc<AtomicUsize>,
}

impl VecMatcher {
    fn new(triples: Vec<Triple>) -> Self {
        VecMatcher {
            triples: Arc::new(triples),
            lookups: Arc::default(),
        }
    }
}

impl TripleMatcher for VecMatcher {
    type Error = Infallible;

    fn matching_triples(&self, key: &MatchKey, include_inferred: bool) -> Result<Vec<Triple>, Infallible> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .triples
            .iter()
            .filter(|t| include_inferred || !t.is_inferred())
            .filter(|t| key.accepts(t))
            .cloned()
            .collect())
    }
}

#[derive(Debug, Error)]
#[error("lookup failed")]
struct LookupFailed;

#[derive(Clone)]
struct FailingMatcher;

impl TripleMatcher for FailingMatcher {
    type Error = LookupFailed;

    fn matching_triples(&self, _: &MatchKey, _: bool) -> Result<Vec<Triple>, LookupFailed> {
        Err(LookupFailed)
    }
}

fn chain() -> VecMatcher {
    VecMatcher::new(vec![
        Triple::new(ex("a"), knows(), ex("b")),
        Triple::new(ex("b"), knows(), ex("c")),
        Triple::new(ex("c"), knows(), ex("d")),
        Triple::new_inferred(ex("d"), knows(), ex("e")),
    ])
}

fn two_hops() -> Vec<Pattern> {
    vec![
        Pattern::new(Field::var("X"), knows(), Field::var("Y")),
        Pattern::new(Field::var("Y"), knows(), Field::var("Z")),
    ]
}

#[test]
fn single_pattern() {
    let m = chain();
    let pattern = Pattern::new(Field::var("X"), knows(), Field::var("Y"));
    let results: Vec<_> = evaluate(&m, [pattern], None, None, None, false)
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(results.len(), 3);
    for r in &results {
        assert_eq!(r.justifications().len(), 1);
    }
}

#[test]
fn join_two_patterns() {
    let m = chain();
    let results: Vec<_> = evaluate(&m, two_hops(), None, None, None, false)
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(results.len(), 2);
    let first = results
        .iter()
        .find(|r| r.get(&var("X")) == Some(&ex("a")))
        .unwrap();
    assert_eq!(first.get(&var("Z")), Some(&ex("c")));
    assert_eq!(
        first.justifications(),
        &[
            Triple::new(ex("a"), knows(), ex("b")),
            Triple::new(ex("b"), knows(), ex("c")),
        ]
        .into_iter()
        .collect()
    );
}

#[test]
fn include_inferred() {
    let m = chain();
    let count = |include_inferred| {
        evaluate(&m, two_hops(), None, None, None, include_inferred).count()
    };
    assert_eq!(count(false), 2);
    assert_eq!(count(true), 3);
}

#[test]
fn seeded_join() {
    let m = chain();
    let seed = Pattern::new(Field::var("X"), knows(), Field::var("Y"))
        .matches_triple(&Triple::new(ex("b"), knows(), ex("c")))
        .unwrap();
    let rest = [Pattern::new(Field::var("Y"), knows(), Field::var("Z"))];
    let results: Vec<_> = evaluate(&m, rest, Some(&seed), None, None, false)
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].get(&var("X")), Some(&ex("b")));
    assert_eq!(results[0].get(&var("Z")), Some(&ex("d")));
    assert_eq!(results[0].justifications().len(), 2);
}

#[test]
fn empty_conjunction() {
    let m = chain();
    let seed = QueryResult::new(
        [(var("X"), ex("a"))].into_iter().collect(),
        BTreeSet::new(),
    );
    let results: Vec<_> = evaluate(&m, [], Some(&seed), None, None, true)
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(results, vec![seed]);

    let results: Vec<_> = evaluate(&m, [], None, None, None, true)
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(results, vec![QueryResult::default()]);
    assert_eq!(m.lookups.load(Ordering::SeqCst), 0);
}

#[test]
fn limit() {
    let m = chain();
    let pattern = Pattern::new(Field::var("X"), knows(), Field::var("Y"));
    assert_eq!(evaluate(&m, [pattern], None, None, Some(2), true).count(), 2);
}

#[test]
fn default_context() {
    let m = VecMatcher::new(vec![
        Triple::new(ex("a"), knows(), ex("b")).with_context(ex("g1")),
        Triple::new(ex("a"), knows(), ex("c")).with_context(ex("g2")),
        Triple::new(ex("a"), knows(), ex("d")),
    ]);
    let pattern = Pattern::new(Field::var("X"), knows(), Field::var("Y"));
    let results: Vec<_> = evaluate(&m, [pattern.clone()], None, Some(&ex("g1")), None, false)
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].get(&var("Y")), Some(&ex("b")));

    // a pattern context takes precedence over the default context
    let own = pattern.with_context(ex("g2"));
    let results: Vec<_> = evaluate(&m, [own], None, Some(&ex("g1")), None, false)
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].get(&var("Y")), Some(&ex("c")));
}

#[test]
fn lazy_evaluation() {
    let m = chain();
    let mut results = evaluate(&m, two_hops(), None, None, None, false);
    assert_eq!(m.lookups.load(Ordering::SeqCst), 0);
    assert!(results.next().is_some());
    assert!(m.lookups.load(Ordering::SeqCst) > 0);
    drop(results);
}

#[test]
fn most_selective_first() {
    let patterns = two_hops();
    let mut bindings = Bindings::new();
    assert_eq!(most_selective(&patterns, &bindings), 0);
    bindings.insert(var("Z"), ex("c"));
    assert_eq!(most_selective(&patterns, &bindings), 1);
}

#[test]
fn errors_are_yielded() {
    let pattern = Pattern::new(Field::var("X"), knows(), Field::var("Y"));
    let results: Vec<_> = evaluate(&FailingMatcher, [pattern], None, None, None, false).collect();
    assert_eq!(results.len(), 1);
    assert!(results[0].is_err());
}

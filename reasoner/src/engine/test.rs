use std::collections::BTreeSet;
use std::sync::atomic::AtomicBool;

use test_case::test_case;
use thiserror::Error;
use warrant_api::pattern::{Field, Pattern};
use warrant_api::rule::{ProgramId, RuleId};
use warrant_api::term::{Literal, Node};
use warrant_inmem::{MemoryConnection, MemoryPersistence, MemoryStore, PersistenceError};

use super::*;

const TIMEOUT: Duration = Duration::from_secs(20);

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn ex(suffix: &str) -> Node {
    Node::new_iri_unchecked(format!("http://example.org/{suffix}"))
}

fn foaf(suffix: &str) -> Node {
    Node::new_iri_unchecked(format!("http://xmlns.com/foaf/0.1/{suffix}"))
}

fn knows(s: &str, o: &str) -> Triple {
    Triple::new(ex(s), foaf("knows"), ex(o))
}

fn ancestor(s: &str, o: &str) -> Triple {
    Triple::new(ex(s), ex("ancestor"), ex(o))
}

/// `?x knows ?y . ?y knows ?z -> ?x knowsIndirectly ?z`
fn knows_indirectly() -> Rule {
    Rule::new(
        "knowsIndirectly",
        [
            Pattern::new(Field::var("X"), foaf("knows"), Field::var("Y")),
            Pattern::new(Field::var("Y"), foaf("knows"), Field::var("Z")),
        ],
        Pattern::new(Field::var("X"), foaf("knowsIndirectly"), Field::var("Z")),
    )
    .unwrap()
}

/// `?x ancestor ?y . ?y ancestor ?z -> ?x ancestor ?z`
fn transitive() -> Rule {
    Rule::new(
        "transitive",
        [
            Pattern::new(Field::var("X"), ex("ancestor"), Field::var("Y")),
            Pattern::new(Field::var("Y"), ex("ancestor"), Field::var("Z")),
        ],
        Pattern::new(Field::var("X"), ex("ancestor"), Field::var("Z")),
    )
    .unwrap()
}

/// `?x knows ?y -> ?y knownBy ?x`
fn known_by() -> Rule {
    Rule::new(
        "knownBy",
        [Pattern::new(Field::var("X"), foaf("knows"), Field::var("Y"))],
        Pattern::new(Field::var("Y"), ex("knownBy"), Field::var("X")),
    )
    .unwrap()
}

/// `?x name ?n -> ?n nameOf ?x`, whose head subject can be a literal
fn name_of() -> Rule {
    Rule::new(
        "nameOf",
        [Pattern::new(Field::var("X"), foaf("name"), Field::var("N"))],
        Pattern::new(Field::var("N"), ex("nameOf"), Field::var("X")),
    )
    .unwrap()
}

fn indirect(s: &str, o: &str) -> Triple {
    Triple::new_inferred(ex(s), foaf("knowsIndirectly"), ex(o))
}

fn inferred_ancestor(s: &str, o: &str) -> Triple {
    ancestor(s, o).with_inferred(true)
}

type Engine = ReasoningEngine<MemoryStore, MemoryPersistence>;

struct Fixture {
    store: MemoryStore,
    persistence: MemoryPersistence,
    engine: Arc<Engine>,
}

impl Fixture {
    fn new(config: ReasoningConfig) -> Self {
        init_logger();
        let store = MemoryStore::new();
        let persistence = MemoryPersistence::new(store.clone());
        let engine = ReasoningEngine::new(store.clone(), persistence.clone(), config).unwrap();
        Fixture {
            store,
            persistence,
            engine,
        }
    }

    fn with_rules<I: IntoIterator<Item = Rule>>(config: ReasoningConfig, rules: I) -> Self {
        let fixture = Self::new(config);
        let program = rules
            .into_iter()
            .fold(Program::new("test"), Program::with_rule);
        fixture.engine.add_program(program).unwrap();
        fixture
    }

    fn add<I: IntoIterator<Item = Triple>>(&self, triples: I) {
        self.store.insert_all(triples).unwrap();
    }

    fn remove(&self, triples: &[Triple]) {
        self.store.remove_all(triples).unwrap();
    }

    fn settle(&self) {
        assert!(self.engine.wait_idle(TIMEOUT), "reasoning did not settle");
    }

    fn inferred(&self) -> BTreeSet<Triple> {
        self.store.inferred_triples()
    }

    /// The justifications of `triple`, as (rule names, supporting triples).
    fn justifications_of(&self, triple: &Triple) -> BTreeSet<(Vec<String>, BTreeSet<Triple>)> {
        self.persistence
            .justifications()
            .into_iter()
            .filter(|j| j.triple() == triple)
            .map(|j| {
                let rules = j
                    .supporting_rules()
                    .iter()
                    .map(|r| r.name().to_string())
                    .collect();
                (rules, j.supporting_triples().clone())
            })
            .collect()
    }

    /// Every justification, ignoring rule identifiers.
    fn all_justifications(&self) -> BTreeSet<(Triple, Vec<String>, BTreeSet<Triple>)> {
        self.persistence
            .justifications()
            .into_iter()
            .map(|j| {
                let (triple, rules, triples) = j.into_parts();
                let rules = rules.iter().map(|r| r.name().to_string()).collect();
                (triple, rules, triples)
            })
            .collect()
    }
}

#[test]
fn rule_firing() {
    let f = Fixture::with_rules(ReasoningConfig::default(), [knows_indirectly()]);
    f.add([knows("a", "b"), knows("b", "c")]);
    f.settle();

    assert_eq!(f.inferred(), BTreeSet::from([indirect("a", "c")]));
    assert_eq!(
        f.justifications_of(&indirect("a", "c")),
        BTreeSet::from([(
            vec!["knowsIndirectly".to_string()],
            BTreeSet::from([knows("a", "b"), knows("b", "c")])
        )])
    );
    // the base statements are untouched
    assert!(f.store.contains(&knows("a", "b")));
    assert!(!f.store.contains(&indirect("a", "c").with_inferred(false)));
}

#[test]
fn program_added_after_data() {
    let f = Fixture::new(ReasoningConfig::default());
    f.add([knows("a", "b"), knows("b", "c")]);
    f.settle();
    assert!(f.inferred().is_empty());
    assert_eq!(f.engine.status().deltas_processed, 0);

    f.engine
        .add_program(Program::new("social").with_rule(knows_indirectly()))
        .unwrap();
    f.settle();
    assert_eq!(f.inferred(), BTreeSet::from([indirect("a", "c")]));
    assert_eq!(f.persistence.justification_count(), 1);
}

#[test]
fn recursive_rule_reaches_fixpoint() {
    let f = Fixture::with_rules(ReasoningConfig::default(), [transitive()]);
    f.add([ancestor("a", "b"), ancestor("b", "c"), ancestor("c", "d")]);
    f.settle();

    assert_eq!(
        f.inferred(),
        BTreeSet::from([
            inferred_ancestor("a", "c"),
            inferred_ancestor("b", "d"),
            inferred_ancestor("a", "d"),
        ])
    );
    // justifications are resolved down to base statements
    assert_eq!(
        f.justifications_of(&inferred_ancestor("a", "d")),
        BTreeSet::from([(
            vec!["transitive".to_string()],
            BTreeSet::from([ancestor("a", "b"), ancestor("b", "c"), ancestor("c", "d")])
        )])
    );
}

#[test]
fn monotonicity() {
    let f = Fixture::with_rules(ReasoningConfig::default(), [transitive(), known_by()]);
    let edges = [
        ancestor("c", "d"),
        ancestor("a", "b"),
        ancestor("d", "e"),
        ancestor("b", "c"),
        ancestor("x", "a"),
    ];
    let mut previous = BTreeSet::new();
    for edge in edges {
        f.add([edge]);
        f.settle();
        let current = f.inferred();
        assert!(current.is_superset(&previous));
        previous = current;
    }
    // x, a, b, c, d, e: 15 pairs, 5 of which are base statements
    assert_eq!(previous.len(), 10);
}

#[test]
fn justification_soundness() {
    let f = Fixture::with_rules(
        ReasoningConfig::default(),
        [transitive(), knows_indirectly(), known_by()],
    );
    f.add([
        ancestor("a", "b"),
        ancestor("b", "c"),
        ancestor("c", "a"),
        knows("a", "b"),
        knows("b", "c"),
        knows("c", "a"),
    ]);
    f.settle();
    f.remove(&[ancestor("c", "a")]);
    f.settle();

    let inferred = f.inferred();
    assert!(!inferred.is_empty());
    let justifications = f.persistence.justifications();
    for triple in &inferred {
        let sound = justifications.iter().any(|j| {
            j.triple() == triple
                && j.is_base()
                && j.supporting_triples().iter().all(|t| f.store.contains(t))
        });
        assert!(sound, "{triple} has no sound justification");
    }
}

#[test]
fn garbage_collection() {
    let f = Fixture::with_rules(ReasoningConfig::default(), [knows_indirectly()]);
    f.add([
        knows("a", "b"),
        knows("b", "c"),
        knows("d", "e"),
        knows("e", "f"),
    ]);
    f.settle();
    assert_eq!(
        f.inferred(),
        BTreeSet::from([indirect("a", "c"), indirect("d", "f")])
    );

    f.remove(&[knows("b", "c")]);
    f.settle();
    assert_eq!(f.inferred(), BTreeSet::from([indirect("d", "f")]));
    assert!(f.justifications_of(&indirect("a", "c")).is_empty());
    assert_eq!(f.persistence.justification_count(), 1);
}

#[test]
fn alternative_justification_survives_removal() {
    let f = Fixture::with_rules(ReasoningConfig::default(), [knows_indirectly()]);
    f.add([
        knows("a", "b"),
        knows("b", "c"),
        knows("a", "d"),
        knows("d", "c"),
    ]);
    f.settle();
    assert_eq!(f.justifications_of(&indirect("a", "c")).len(), 2);

    f.remove(&[knows("b", "c")]);
    f.settle();
    assert_eq!(f.inferred(), BTreeSet::from([indirect("a", "c")]));
    assert_eq!(
        f.justifications_of(&indirect("a", "c")),
        BTreeSet::from([(
            vec!["knowsIndirectly".to_string()],
            BTreeSet::from([knows("a", "d"), knows("d", "c")])
        )])
    );
}

/// `?x <from> ?y -> ?x friend ?y`
fn friend_from(from: &str) -> Rule {
    Rule::new(
        format!("friendFrom_{from}"),
        [Pattern::new(Field::var("X"), ex(from), Field::var("Y"))],
        Pattern::new(Field::var("X"), ex("friend"), Field::var("Y")),
    )
    .unwrap()
}

/// `?x friend ?y -> ?y friendOf ?x`
fn friend_of() -> Rule {
    Rule::new(
        "friendOf",
        [Pattern::new(Field::var("X"), ex("friend"), Field::var("Y"))],
        Pattern::new(Field::var("Y"), ex("friendOf"), Field::var("X")),
    )
    .unwrap()
}

#[test_case(true; "with deduplication")]
#[test_case(false; "without deduplication")]
fn late_justification_reaches_consequences(dedup: bool) {
    let f = Fixture::with_rules(
        ReasoningConfig::default().with_remove_duplicate_justifications(dedup),
        [friend_from("knows"), friend_from("likes"), friend_of()],
    );
    let knows = Triple::new(ex("a"), ex("knows"), ex("b"));
    let likes = Triple::new(ex("a"), ex("likes"), ex("b"));
    let friend = Triple::new_inferred(ex("a"), ex("friend"), ex("b"));
    let friend_of = Triple::new_inferred(ex("b"), ex("friendOf"), ex("a"));

    f.add([knows.clone()]);
    f.settle();
    f.add([likes.clone()]);
    f.settle();
    assert!(f
        .justifications_of(&friend_of)
        .iter()
        .any(|(_, triples)| triples == &BTreeSet::from([likes.clone()])));

    f.remove(&[knows]);
    f.settle();
    assert_eq!(f.inferred(), BTreeSet::from([friend, friend_of]));
}

#[test]
fn removal_cascades_through_inferred_statements() {
    let f = Fixture::with_rules(ReasoningConfig::default(), [transitive()]);
    f.add([ancestor("a", "b"), ancestor("b", "c"), ancestor("c", "d")]);
    f.settle();

    f.remove(&[ancestor("c", "d")]);
    f.settle();
    assert_eq!(f.inferred(), BTreeSet::from([inferred_ancestor("a", "c")]));
}

#[test]
fn invalid_head_binding_is_skipped() {
    let f = Fixture::with_rules(ReasoningConfig::default(), [name_of()]);
    f.add([
        Triple::new(ex("a"), foaf("name"), Node::plain_literal("Alice")),
        Triple::new(ex("b"), foaf("name"), ex("bob-name")),
    ]);
    f.settle();
    assert_eq!(
        f.inferred(),
        BTreeSet::from([Triple::new_inferred(ex("bob-name"), ex("nameOf"), ex("b"))])
    );
    assert_eq!(f.engine.status().consistency_failures, 0);
}

#[test]
fn constant_literal_in_head() {
    let rule = Rule::new(
        "tagged",
        [Pattern::new(Field::var("X"), foaf("knows"), Field::var("Y"))],
        Pattern::new(
            Field::var("X"),
            ex("tag"),
            Field::literal(Literal::plain("social")),
        ),
    )
    .unwrap();
    let f = Fixture::with_rules(ReasoningConfig::default(), [rule]);
    f.add([knows("a", "b")]);
    f.settle();
    assert!(f.store.contains(&Triple::new_inferred(
        ex("a"),
        ex("tag"),
        Node::plain_literal("social")
    )));
}

fn chain(n: usize) -> Vec<Triple> {
    (0..n)
        .map(|i| ancestor(&format!("n{i}"), &format!("n{}", i + 1)))
        .collect()
}

#[test]
fn incremental_and_full_reasoning_agree() {
    let mut base = chain(6);
    base.push(ancestor("n2", "m"));
    base.push(knows("n0", "n1"));
    base.push(knows("n1", "n3"));

    let incremental = Fixture::with_rules(
        ReasoningConfig::default(),
        [transitive(), knows_indirectly()],
    );
    for triple in base.iter().rev() {
        incremental.add([triple.clone()]);
    }
    incremental.settle();

    let full = Fixture::new(ReasoningConfig::default());
    full.add(base.iter().cloned());
    full.settle();
    assert!(full.inferred().is_empty());
    full.engine
        .add_program(
            Program::new("test")
                .with_rule(transitive())
                .with_rule(knows_indirectly()),
        )
        .unwrap();
    full.settle();
    full.engine.re_run_programs();
    full.settle();

    assert_eq!(incremental.inferred(), full.inferred());
    // 7 nodes on the chain: 21 pairs, minus 6 edges; m below n2: 2 more pairs
    assert_eq!(full.inferred().len(), 15 + 2 + 1);
}

#[test]
fn full_reasoning_is_idempotent() {
    let f = Fixture::with_rules(ReasoningConfig::default(), [transitive()]);
    f.add(chain(4));
    f.settle();
    let inferred = f.inferred();
    let justifications = f.all_justifications();

    f.engine.re_run_programs();
    f.settle();
    assert_eq!(f.inferred(), inferred);
    assert_eq!(f.all_justifications(), justifications);
}

#[test_case(true; "with deduplication")]
#[test_case(false; "without deduplication")]
fn batch_size_does_not_change_results(dedup: bool) {
    let config = ReasoningConfig::default().with_remove_duplicate_justifications(dedup);
    let rules = || [transitive(), knows_indirectly()];
    let mut base = chain(5);
    base.extend([knows("a", "b"), knows("b", "c"), knows("b", "d")]);

    let small = Fixture::with_rules(config.clone().with_batch_size(1), rules());
    small.add(base.clone());
    small.settle();

    let large = Fixture::with_rules(config.with_batch_size(1000), rules());
    large.add(base);
    large.settle();

    assert!(!small.inferred().is_empty());
    assert_eq!(small.inferred(), large.inferred());
    assert_eq!(small.all_justifications(), large.all_justifications());
}

#[test]
fn deduplication_is_idempotent() {
    let f = Fixture::with_rules(ReasoningConfig::default(), [knows_indirectly()]);
    f.add([knows("a", "b"), knows("b", "c")]);
    f.settle();

    let persisted = f.persistence.justifications();
    assert!(f
        .engine
        .remove_duplicate_justifications(persisted.clone())
        .unwrap()
        .is_empty());

    let rule = f.engine.programs()[0].rules()[0].clone();
    let fresh = Justification::fired(
        indirect("a", "c"),
        rule,
        BTreeSet::from([knows("a", "x"), knows("x", "c")]),
    );
    let mut candidates = persisted;
    candidates.insert(fresh.clone());
    let once = f
        .engine
        .remove_duplicate_justifications(candidates)
        .unwrap();
    assert_eq!(once, BTreeSet::from([fresh]));
    let twice = f
        .engine
        .remove_duplicate_justifications(once.clone())
        .unwrap();
    assert_eq!(twice, once);
}

#[test]
fn base_justifications() {
    let f = Fixture::with_rules(ReasoningConfig::default(), [transitive()]);
    f.add(chain(3));
    f.settle();
    let rule = f.engine.programs()[0].rules()[0].clone();

    // n0 -> n2 (inferred) -> n3
    let candidate = Justification::fired(
        inferred_ancestor("n0", "n3"),
        rule.clone(),
        BTreeSet::from([inferred_ancestor("n0", "n2"), ancestor("n2", "n3")]),
    );
    let resolved = f
        .engine
        .get_base_justifications(&BTreeSet::from([candidate]))
        .unwrap();
    assert_eq!(
        resolved,
        BTreeSet::from([Justification::fired(
            inferred_ancestor("n0", "n3"),
            rule.clone(),
            chain(3).into_iter().collect(),
        )])
    );
    assert!(resolved.iter().all(Justification::is_base));

    // an inferred support without justification contributes nothing
    let orphan = Justification::fired(
        inferred_ancestor("x", "z"),
        rule.clone(),
        BTreeSet::from([inferred_ancestor("x", "y"), ancestor("y", "z")]),
    );
    let resolved = f
        .engine
        .get_base_justifications(&BTreeSet::from([orphan]))
        .unwrap();
    assert_eq!(
        resolved,
        BTreeSet::from([Justification::fired(
            inferred_ancestor("x", "z"),
            rule,
            BTreeSet::from([ancestor("y", "z")]),
        )])
    );
}

#[test]
fn explicit_cleanup() {
    let f = Fixture::with_rules(ReasoningConfig::default(), [knows_indirectly()]);
    f.add([knows("a", "b"), knows("b", "c")]);
    f.settle();
    f.engine.shutdown();

    // the worker is stopped: removals are only cleaned up explicitly
    f.remove(&[knows("a", "b")]);
    assert_eq!(f.inferred(), BTreeSet::from([indirect("a", "c")]));
    assert_eq!(
        f.engine
            .cleanup_justifications(&[knows("a", "b")])
            .unwrap(),
        1
    );
    assert_eq!(f.persistence.justification_count(), 0);
    assert_eq!(
        f.engine.cleanup_unsupported().unwrap(),
        vec![indirect("a", "c")]
    );
    assert!(f.inferred().is_empty());
    assert!(f.engine.cleanup_unsupported().unwrap().is_empty());
}

#[test]
fn remove_program_retracts_its_inferences() {
    let f = Fixture::new(ReasoningConfig::default());
    f.engine
        .add_program(Program::new("indirect").with_rule(knows_indirectly()))
        .unwrap();
    f.engine
        .add_program(Program::new("inverse").with_rule(known_by()))
        .unwrap();
    f.add([knows("a", "b"), knows("b", "c")]);
    f.settle();
    assert_eq!(f.inferred().len(), 3);

    let removed = f.engine.remove_program("indirect").unwrap();
    assert_eq!(removed.name(), "indirect");
    f.settle();
    assert_eq!(
        f.inferred(),
        BTreeSet::from([
            Triple::new_inferred(ex("b"), ex("knownBy"), ex("a")),
            Triple::new_inferred(ex("c"), ex("knownBy"), ex("b")),
        ])
    );
    assert_eq!(f.engine.programs().len(), 1);
    assert!(f.engine.remove_program("indirect").unwrap_err().is_persistence_error());
}

#[test]
fn update_program() {
    let f = Fixture::with_rules(ReasoningConfig::default(), [knows_indirectly()]);
    f.add([knows("a", "b"), knows("b", "c")]);
    f.settle();

    // adding a rule only evaluates the new rule
    let updated = f
        .engine
        .update_program(
            Program::new("test")
                .with_rule(knows_indirectly())
                .with_rule(known_by()),
        )
        .unwrap();
    assert_eq!(updated.rules().len(), 2);
    f.settle();
    assert_eq!(f.inferred().len(), 3);
    assert_eq!(f.engine.status().consistency_failures, 0);

    // removing a rule re-runs everything
    f.engine
        .update_program(Program::new("test").with_rule(known_by()))
        .unwrap();
    f.settle();
    assert_eq!(
        f.inferred(),
        BTreeSet::from([
            Triple::new_inferred(ex("b"), ex("knownBy"), ex("a")),
            Triple::new_inferred(ex("c"), ex("knownBy"), ex("b")),
        ])
    );
    assert!(f
        .persistence
        .justifications()
        .iter()
        .all(|j| j.depends_on_rule_named("knownBy")));
}

#[test]
fn status_counters() {
    let f = Fixture::with_rules(ReasoningConfig::default(), [knows_indirectly()]);
    f.add([knows("a", "b"), knows("b", "c"), knows("c", "d")]);
    f.settle();
    let status = f.engine.status();
    assert_eq!(status.state, EngineState::Running);
    assert!(!status.is_running());
    assert_eq!(status.triples_inferred, 2);
    assert_eq!(status.justifications_stored, 2);
    assert!(status.deltas_processed >= 1);
    assert_eq!(status.consistency_failures, 0);
}

#[test]
fn backpressure() {
    let config = ReasoningConfig::default()
        .with_queue_capacity(1)
        .with_batch_size(2);
    let f = Fixture::with_rules(config, [transitive()]);
    for triple in chain(12) {
        f.add([triple]);
    }
    f.settle();
    // 13 nodes: 78 pairs, minus 12 edges
    assert_eq!(f.inferred().len(), 66);
}

#[cfg(feature = "all_tests")]
#[test_case(1; "batch of 1")]
#[test_case(1000; "batch of 1000")]
fn long_chain(batch_size: usize) {
    let f = Fixture::with_rules(
        ReasoningConfig::default().with_batch_size(batch_size),
        [transitive()],
    );
    for triple in chain(30) {
        f.add([triple]);
    }
    f.settle();
    // 31 nodes: 465 pairs, minus 30 edges
    assert_eq!(f.inferred().len(), 435);

    f.remove(&[ancestor("n14", "n15")]);
    f.settle();
    // two chains of 15 and 16 nodes
    assert_eq!(f.inferred().len(), (105 - 14) + (120 - 15));
}

#[test]
fn cleanup_while_the_queue_is_full() {
    let config = ReasoningConfig::default()
        .with_queue_capacity(1)
        .with_batch_size(1);
    let f = Fixture::with_rules(config, [transitive()]);
    let stop = Arc::new(AtomicBool::new(false));
    let (done, finished) = sync_channel(2);

    let store = f.store.clone();
    let adder_done = done.clone();
    thread::spawn(move || {
        for triple in chain(12) {
            store.insert_all([triple]).unwrap();
        }
        adder_done.send("adder").unwrap();
    });
    let engine = f.engine.clone();
    let cleaner_stop = stop.clone();
    thread::spawn(move || {
        while !cleaner_stop.load(Ordering::SeqCst) {
            for edge in chain(12) {
                engine.cleanup_justifications(&[edge]).unwrap();
                engine.cleanup_unsupported().unwrap();
            }
        }
        done.send("cleaner").unwrap();
    });

    assert_eq!(finished.recv_timeout(TIMEOUT), Ok("adder"));
    stop.store(true, Ordering::SeqCst);
    assert_eq!(finished.recv_timeout(TIMEOUT), Ok("cleaner"));
    f.settle();

    f.engine.re_run_programs();
    f.settle();
    assert_eq!(f.inferred().len(), 66);
}

#[test]
fn invalid_config_is_rejected() {
    init_logger();
    let store = MemoryStore::new();
    let persistence = MemoryPersistence::new(store.clone());
    let res = ReasoningEngine::new(
        store,
        persistence,
        ReasoningConfig::default().with_batch_size(0),
    );
    assert!(matches!(res, Err(ReasoningError::Config(_))));
}

#[test]
fn several_workers_are_accepted() {
    let f = Fixture::with_rules(ReasoningConfig::default().with_workers(4), [knows_indirectly()]);
    f.add([knows("a", "b"), knows("b", "c")]);
    f.settle();
    assert_eq!(f.inferred().len(), 1);
}

#[test]
fn shutdown() {
    let f = Fixture::with_rules(ReasoningConfig::default(), [knows_indirectly()]);
    f.add([knows("a", "b"), knows("b", "c")]);
    f.settle();
    f.engine.shutdown();
    assert_eq!(f.engine.status().state, EngineState::Stopped);
    f.engine.shutdown();
    assert_eq!(f.engine.status().state, EngineState::Stopped);

    // commits are still accepted, but not reasoned about
    f.add([knows("c", "d")]);
    assert!(!f.engine.is_running());
    assert_eq!(f.inferred(), BTreeSet::from([indirect("a", "c")]));
}

#[test]
fn shutdown_without_waiting() {
    let config = ReasoningConfig::default().with_shutdown_poll(0, Duration::from_millis(1));
    let f = Fixture::with_rules(config, [transitive()]);
    f.add(chain(30));
    f.engine.shutdown();
    assert_eq!(f.engine.status().state, EngineState::Stopped);
    // whatever was inferred is a subset of the closure
    assert!(f.inferred().len() <= 30 * 31 / 2 - 30);
}

#[test]
fn dropping_the_engine_unregisters_it() {
    let f = Fixture::with_rules(ReasoningConfig::default(), [knows_indirectly()]);
    let Fixture {
        store, engine, ..
    } = f;
    drop(engine);
    store.insert_all([knows("a", "b"), knows("b", "c")]).unwrap();
    assert!(store.inferred_triples().is_empty());
}

/// A persistence layer whose commits can be made to fail.
#[derive(Clone)]
struct Flaky {
    inner: MemoryPersistence,
    failing: Arc<AtomicBool>,
}

#[derive(Debug, Error)]
enum FlakyError {
    #[error(transparent)]
    Inner(#[from] PersistenceError),
    #[error("commit refused")]
    Refused,
}

struct FlakyConnection {
    inner: MemoryConnection,
    failing: Arc<AtomicBool>,
}

impl ReasoningPersistence for Flaky {
    type Error = FlakyError;
    type Connection = FlakyConnection;

    fn connect(&self) -> Result<FlakyConnection, FlakyError> {
        Ok(FlakyConnection {
            inner: self.inner.connect()?,
            failing: self.failing.clone(),
        })
    }
}

impl PersistenceConnection for FlakyConnection {
    type Error = FlakyError;

    fn store_program(&mut self, program: Program) -> Result<Program, FlakyError> {
        Ok(self.inner.store_program(program)?)
    }
    fn update_program(&mut self, program: Program) -> Result<Program, FlakyError> {
        Ok(self.inner.update_program(program)?)
    }
    fn delete_program(&mut self, name: &str) -> Result<Program, FlakyError> {
        Ok(self.inner.delete_program(name)?)
    }
    fn load_program_by_name(&mut self, name: &str) -> Result<Option<Program>, FlakyError> {
        Ok(self.inner.load_program_by_name(name)?)
    }
    fn load_program_by_id(&mut self, id: ProgramId) -> Result<Option<Program>, FlakyError> {
        Ok(self.inner.load_program_by_id(id)?)
    }
    fn list_programs(&mut self) -> Result<Vec<Program>, FlakyError> {
        Ok(self.inner.list_programs()?)
    }
    fn list_justifications_for_triple(
        &mut self,
        triple: &Triple,
    ) -> Result<Vec<Justification>, FlakyError> {
        Ok(self.inner.list_justifications_for_triple(triple)?)
    }
    fn list_justifications_by_supporting_triple(
        &mut self,
        triple: &Triple,
    ) -> Result<Vec<Justification>, FlakyError> {
        Ok(self.inner.list_justifications_by_supporting_triple(triple)?)
    }
    fn list_justifications_by_rule(&mut self, rule: RuleId) -> Result<Vec<Justification>, FlakyError> {
        Ok(self.inner.list_justifications_by_rule(rule)?)
    }
    fn store_justifications(
        &mut self,
        justifications: &BTreeSet<Justification>,
    ) -> Result<(), FlakyError> {
        Ok(self.inner.store_justifications(justifications)?)
    }
    fn delete_justifications_for_triple(&mut self, triple: &Triple) -> Result<(), FlakyError> {
        Ok(self.inner.delete_justifications_for_triple(triple)?)
    }
    fn delete_justifications(
        &mut self,
        justifications: &BTreeSet<Justification>,
    ) -> Result<(), FlakyError> {
        Ok(self.inner.delete_justifications(justifications)?)
    }
    fn delete_all_justifications(&mut self) -> Result<(), FlakyError> {
        Ok(self.inner.delete_all_justifications()?)
    }
    fn list_unsupported_triples(&mut self) -> Result<Vec<Triple>, FlakyError> {
        Ok(self.inner.list_unsupported_triples()?)
    }
    fn commit(&mut self) -> Result<(), FlakyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(FlakyError::Refused);
        }
        Ok(self.inner.commit()?)
    }
    fn rollback(&mut self) -> Result<(), FlakyError> {
        Ok(self.inner.rollback()?)
    }
}

#[test]
fn failed_flush_is_reported_and_collected_later() {
    init_logger();
    let store = MemoryStore::new();
    let memory = MemoryPersistence::new(store.clone());
    let failing = Arc::new(AtomicBool::new(false));
    let persistence = Flaky {
        inner: memory.clone(),
        failing: failing.clone(),
    };
    let engine =
        ReasoningEngine::new(store.clone(), persistence, ReasoningConfig::default()).unwrap();
    engine
        .add_program(Program::new("social").with_rule(knows_indirectly()))
        .unwrap();
    assert!(engine.wait_idle(TIMEOUT));

    failing.store(true, Ordering::SeqCst);
    store.insert_all([knows("a", "b"), knows("b", "c")]).unwrap();
    assert!(engine.wait_idle(TIMEOUT));
    // the store was committed before the justifications failed to be
    assert!(store.contains(&indirect("a", "c")));
    assert_eq!(memory.justification_count(), 0);
    assert!(engine.status().consistency_failures >= 1);

    let err = engine.cleanup_unsupported().unwrap_err();
    assert!(err.is_persistence_error());
    assert!(store.contains(&indirect("a", "c")));

    failing.store(false, Ordering::SeqCst);
    assert_eq!(
        engine.cleanup_unsupported().unwrap(),
        vec![indirect("a", "c")]
    );
    assert!(store.inferred_triples().is_empty());
}

#[test]
fn failed_program_addition_is_rolled_back() {
    init_logger();
    let store = MemoryStore::new();
    let memory = MemoryPersistence::new(store.clone());
    let failing = Arc::new(AtomicBool::new(false));
    let persistence = Flaky {
        inner: memory,
        failing: failing.clone(),
    };
    let engine =
        ReasoningEngine::new(store.clone(), persistence, ReasoningConfig::default()).unwrap();
    failing.store(true, Ordering::SeqCst);
    assert!(engine
        .add_program(Program::new("social").with_rule(knows_indirectly()))
        .unwrap_err()
        .is_persistence_error());
    assert!(engine.programs().is_empty());
    assert!(engine.load_programs());
}

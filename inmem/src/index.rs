//! A [`TermIndex`] is a bidirectional association of [terms](Node) with short numeric indices,
//! on top of which a [`StatementIndex`] stores statements as rows of indices.
use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};
use std::ops::RangeInclusive;

use warrant_api::pattern::MatchKey;
use warrant_api::term::Node;
use warrant_api::triple::Triple;

use crate::store::MemoryStoreError;

/// Index standing for the default context; never assigned to a term.
const NO_CONTEXT: u32 = u32::MAX;
const BASE: u32 = 0;
const INFERRED: u32 = 1;

/// A statement, encoded as `[subject, property, object, context, flag]`
/// (or a permutation of the first three positions).
type Row = [u32; 5];

/// A bidirectional association of [terms](Node) with `u32` indices.
#[derive(Clone, Debug, Default)]
pub struct TermIndex {
    t2i: HashMap<Node, u32>,
    i2t: Vec<Node>,
}

impl TermIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.i2t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the index corresponding to term `t`, if it exists.
    pub fn get_index(&self, t: &Node) -> Option<u32> {
        self.t2i.get(t).copied()
    }

    /// Get the index corresponding to term `t`, adding it in the term-index if necessary.
    pub fn ensure_index(&mut self, t: &Node) -> Result<u32, MemoryStoreError> {
        let next = self.i2t.len();
        match self.t2i.entry(t.clone()) {
            Entry::Vacant(e) => {
                let i = u32::try_from(next)
                    .ok()
                    .filter(|i| *i != NO_CONTEXT)
                    .ok_or(MemoryStoreError::TooManyTerms)?;
                self.i2t.push(e.key().clone());
                e.insert(i);
                Ok(i)
            }
            Entry::Occupied(e) => Ok(*e.get()),
        }
    }

    /// Get the term corresponding to index `i`.
    ///
    /// # Precondition
    /// `i` must have been returned previously by [`get_index`](TermIndex::get_index)
    /// or [`ensure_index`](TermIndex::ensure_index), otherwise this method may panic.
    pub fn get_term(&self, i: u32) -> &Node {
        &self.i2t[i as usize]
    }
}

/// A set of statements, indexed by subject, by property and by object.
#[derive(Clone, Debug, Default)]
pub struct StatementIndex {
    terms: TermIndex,
    spo: BTreeSet<Row>,
    pos: BTreeSet<Row>,
    osp: BTreeSet<Row>,
}

impl StatementIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of statements.
    pub fn len(&self) -> usize {
        self.spo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spo.is_empty()
    }

    pub fn contains(&self, t: &Triple) -> bool {
        match self.encode(t) {
            Some(row) => self.spo.contains(&row),
            None => false,
        }
    }

    /// Insert `t`, returning whether it was absent.
    pub fn insert(&mut self, t: &Triple) -> Result<bool, MemoryStoreError> {
        let row = self.ensure(t)?;
        if self.spo.insert(row) {
            let [s, p, o, c, f] = row;
            let i = self.pos.insert([p, o, s, c, f]);
            debug_assert!(i);
            let i = self.osp.insert([o, s, p, c, f]);
            debug_assert!(i);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Remove `t`, returning whether it was present.
    pub fn remove(&mut self, t: &Triple) -> bool {
        let Some(row) = self.encode(t) else {
            return false;
        };
        if self.spo.remove(&row) {
            let [s, p, o, c, f] = row;
            let i = self.pos.remove(&[p, o, s, c, f]);
            debug_assert!(i);
            let i = self.osp.remove(&[o, s, p, c, f]);
            debug_assert!(i);
            true
        } else {
            false
        }
    }

    /// Iter over all statements, in subject order.
    pub fn triples(&self) -> impl Iterator<Item = Triple> + '_ {
        self.spo.iter().map(|row| self.decode(row))
    }

    /// Collect the statements accepted by `key`.
    pub fn matching(&self, key: &MatchKey, include_inferred: bool) -> Vec<Triple> {
        let lookup = |n: &Option<Node>| match n {
            None => Ok(None),
            Some(n) => self.terms.get_index(n).map(Some).ok_or(()),
        };
        // a term unknown to the index can not match anything
        let (Ok(si), Ok(pi), Ok(oi), Ok(ci)) = (
            lookup(&key.subject),
            lookup(&key.property),
            lookup(&key.object),
            lookup(&key.context),
        ) else {
            return vec![];
        };
        let accept = |row: &Row| {
            si.map_or(true, |i| row[0] == i)
                && pi.map_or(true, |i| row[1] == i)
                && oi.map_or(true, |i| row[2] == i)
                && ci.map_or(true, |i| row[3] == i)
                && (include_inferred || row[4] == BASE)
        };
        let rows: Vec<Row> = match (si, pi, oi) {
            (Some(s), p, _) => self.spo.range(prefix(s, p)).copied().filter(accept).collect(),
            (None, Some(p), o) => self
                .pos
                .range(prefix(p, o))
                .map(|&[p, o, s, c, f]| [s, p, o, c, f])
                .filter(accept)
                .collect(),
            (None, None, Some(o)) => self
                .osp
                .range(prefix(o, None))
                .map(|&[o, s, p, c, f]| [s, p, o, c, f])
                .filter(accept)
                .collect(),
            (None, None, None) => self.spo.iter().copied().filter(accept).collect(),
        };
        rows.iter().map(|row| self.decode(row)).collect()
    }

    fn encode(&self, t: &Triple) -> Option<Row> {
        let c = match t.context() {
            Some(c) => self.terms.get_index(c)?,
            None => NO_CONTEXT,
        };
        Some([
            self.terms.get_index(t.subject())?,
            self.terms.get_index(t.property())?,
            self.terms.get_index(t.object())?,
            c,
            flag(t),
        ])
    }

    fn ensure(&mut self, t: &Triple) -> Result<Row, MemoryStoreError> {
        let c = match t.context() {
            Some(c) => self.terms.ensure_index(c)?,
            None => NO_CONTEXT,
        };
        Ok([
            self.terms.ensure_index(t.subject())?,
            self.terms.ensure_index(t.property())?,
            self.terms.ensure_index(t.object())?,
            c,
            flag(t),
        ])
    }

    fn decode(&self, row: &Row) -> Triple {
        let [s, p, o, c, f] = *row;
        let [s, p, o] = [s, p, o].map(|i| self.terms.get_term(i).clone());
        let t = if f == INFERRED {
            Triple::new_inferred(s, p, o)
        } else {
            Triple::new(s, p, o)
        };
        if c == NO_CONTEXT {
            t
        } else {
            t.with_context(self.terms.get_term(c).clone())
        }
    }
}

fn flag(t: &Triple) -> u32 {
    if t.is_inferred() {
        INFERRED
    } else {
        BASE
    }
}

/// The range of rows starting with `a` (and `b` if provided).
fn prefix(a: u32, b: Option<u32>) -> RangeInclusive<Row> {
    const M: u32 = u32::MAX;
    match b {
        Some(b) => [a, b, 0, 0, 0]..=[a, b, M, M, M],
        None => [a, 0, 0, 0, 0]..=[a, M, M, M, M],
    }
}

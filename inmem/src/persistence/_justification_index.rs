use std::collections::{BTreeMap, BTreeSet};

use warrant_api::justification::Justification;
use warrant_api::rule::RuleId;
use warrant_api::triple::Triple;

/// A set of [`Justification`]s, indexed by justified triple,
/// by supporting triple and by supporting rule.
#[derive(Clone, Debug, Default)]
pub struct JustificationIndex {
    by_triple: BTreeMap<Triple, BTreeSet<Justification>>,
    by_support: BTreeMap<Triple, BTreeSet<Justification>>,
    by_rule: BTreeMap<RuleId, BTreeSet<Justification>>,
}

impl JustificationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of justifications.
    pub fn len(&self) -> usize {
        self.by_triple.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_triple.is_empty()
    }

    pub fn contains(&self, j: &Justification) -> bool {
        self.by_triple
            .get(j.triple())
            .map_or(false, |set| set.contains(j))
    }

    /// Insert `j`, returning whether it was absent.
    pub fn insert(&mut self, j: Justification) -> bool {
        if self.contains(&j) {
            return false;
        }
        for t in j.supporting_triples() {
            self.by_support.entry(t.clone()).or_default().insert(j.clone());
        }
        for id in j.supporting_rules().iter().filter_map(|r| r.id()) {
            self.by_rule.entry(id).or_default().insert(j.clone());
        }
        self.by_triple.entry(j.triple().clone()).or_default().insert(j);
        true
    }

    /// Remove `j`, returning whether it was present.
    pub fn remove(&mut self, j: &Justification) -> bool {
        if !remove_from(&mut self.by_triple, j.triple(), j) {
            return false;
        }
        for t in j.supporting_triples() {
            remove_from(&mut self.by_support, t, j);
        }
        for id in j.supporting_rules().iter().filter_map(|r| r.id()) {
            remove_from(&mut self.by_rule, &id, j);
        }
        true
    }

    pub fn clear(&mut self) {
        self.by_triple.clear();
        self.by_support.clear();
        self.by_rule.clear();
    }

    /// Iter over the justifications of `t`.
    pub fn for_triple<'a>(&'a self, t: &Triple) -> impl Iterator<Item = &'a Justification> + 'a {
        self.by_triple.get(t).into_iter().flatten()
    }

    /// Iter over the justifications supported by `t`.
    pub fn by_supporting_triple<'a>(
        &'a self,
        t: &Triple,
    ) -> impl Iterator<Item = &'a Justification> + 'a {
        self.by_support.get(t).into_iter().flatten()
    }

    /// Iter over the justifications supported by the rule `id`.
    pub fn by_rule(&self, id: RuleId) -> impl Iterator<Item = &Justification> + '_ {
        self.by_rule.get(&id).into_iter().flatten()
    }

    /// Iter over all justifications.
    pub fn iter(&self) -> impl Iterator<Item = &Justification> + '_ {
        self.by_triple.values().flatten()
    }
}

fn remove_from<K: Ord>(
    map: &mut BTreeMap<K, BTreeSet<Justification>>,
    key: &K,
    j: &Justification,
) -> bool {
    let Some(set) = map.get_mut(key) else {
        return false;
    };
    let removed = set.remove(j);
    if set.is_empty() {
        map.remove(key);
    }
    removed
}

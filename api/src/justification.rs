//! I define [`Justification`], the record of why an inferred triple holds.
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::rule::{Rule, RuleId};
use crate::triple::Triple;

/// An inferred triple, together with the rules and the triples that support it.
///
/// Two justifications with the same triple, rules and supporting triples are equal,
/// whatever the order in which they were built.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Justification {
    triple: Triple,
    supporting_rules: BTreeSet<Arc<Rule>>,
    supporting_triples: BTreeSet<Triple>,
}

impl Justification {
    /// Build a justification.
    pub fn new(
        triple: Triple,
        supporting_rules: BTreeSet<Arc<Rule>>,
        supporting_triples: BTreeSet<Triple>,
    ) -> Self {
        Justification {
            triple,
            supporting_rules,
            supporting_triples,
        }
    }

    /// Build the justification of `triple` produced by firing `rule` on `supporting_triples`.
    pub fn fired(triple: Triple, rule: Arc<Rule>, supporting_triples: BTreeSet<Triple>) -> Self {
        Self::new(triple, [rule].into_iter().collect(), supporting_triples)
    }

    /// The justified triple.
    pub fn triple(&self) -> &Triple {
        &self.triple
    }

    /// The rules supporting the triple.
    pub fn supporting_rules(&self) -> &BTreeSet<Arc<Rule>> {
        &self.supporting_rules
    }

    /// The triples supporting the triple.
    pub fn supporting_triples(&self) -> &BTreeSet<Triple> {
        &self.supporting_triples
    }

    /// Whether no supporting triple is inferred.
    pub fn is_base(&self) -> bool {
        self.supporting_triples.iter().all(|t| !t.is_inferred())
    }

    /// Whether `triple` is one of the supporting triples.
    pub fn supports(&self, triple: &Triple) -> bool {
        self.supporting_triples.contains(triple)
    }

    /// Whether one of the supporting rules has identifier `id`.
    pub fn depends_on_rule(&self, id: RuleId) -> bool {
        self.supporting_rules.iter().any(|r| r.id() == Some(id))
    }

    /// Whether one of the supporting rules is named `name`.
    pub fn depends_on_rule_named(&self, name: &str) -> bool {
        self.supporting_rules.iter().any(|r| r.name() == name)
    }

    /// Destructure this justification.
    pub fn into_parts(self) -> (Triple, BTreeSet<Arc<Rule>>, BTreeSet<Triple>) {
        (self.triple, self.supporting_rules, self.supporting_triples)
    }
}

impl fmt::Display for Justification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <=", self.triple)?;
        for rule in &self.supporting_rules {
            write!(f, " [{}]", rule.name())?;
        }
        for triple in &self.supporting_triples {
            write!(f, " {{{triple}}}")?;
        }
        Ok(())
    }
}

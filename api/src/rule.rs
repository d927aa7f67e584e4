//! I define [`Rule`]s and [`Program`]s.
//!
//! A rule derives the triple described by its *head*
//! for every solution of its *body* (a conjunction of [`Pattern`]s).
//! Rules are monotonic: firing a rule only ever adds statements.
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::pattern::{Bindings, Field, Pattern};
use crate::term::{Node, Variable};
use crate::triple::Triple;

/// Identifier of a persisted [`Rule`].
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct RuleId(pub u64);

/// Identifier of a persisted [`Program`].
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ProgramId(pub u64);

/// This error is raised when building a rule that violates the rule invariants.
#[derive(Debug, Error)]
pub enum InvalidRule {
    /// The body of the rule is empty
    #[error("rule '{0}' has an empty body")]
    EmptyBody(String),
    /// The head has a literal in subject or property position
    #[error("rule '{rule}': the head {position} can not be a literal")]
    LiteralInHead {
        /// The name of the rule
        rule: String,
        /// The position of the offending field
        position: &'static str,
    },
    /// The head has a constant property which is not an IRI
    #[error("rule '{0}': the head property must be an IRI")]
    NonIriProperty(String),
    /// A head variable does not occur in the body
    #[error("rule '{rule}': head variable {variable} is not bound by the body")]
    UnboundHeadVariable {
        /// The name of the rule
        rule: String,
        /// The offending variable
        variable: Variable,
    },
}

/// This error is raised when a body solution can not be turned into a head triple.
#[derive(Debug, Error)]
pub enum HeadError {
    /// A head variable is not bound by the solution
    #[error("variable {0} is not bound")]
    Unbound(Variable),
    /// The subject would not be a resource
    #[error("subject must be a resource, got {0}")]
    NonResourceSubject(Node),
    /// The property would not be an IRI
    #[error("property must be an IRI, got {0}")]
    NonIriProperty(Node),
    /// The context would not be a resource
    #[error("context must be a resource, got {0}")]
    NonResourceContext(Node),
}

/// A forward-chaining rule `body -> head`.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Rule {
    id: Option<RuleId>,
    name: String,
    body: BTreeSet<Pattern>,
    head: Pattern,
}

impl Rule {
    /// Build a new rule, checking the rule invariants:
    /// * the body is not empty;
    /// * the head subject and property are not literals;
    /// * a constant head property is an IRI;
    /// * every variable of the head occurs in the body.
    pub fn new<I>(name: impl Into<String>, body: I, head: Pattern) -> Result<Self, InvalidRule>
    where
        I: IntoIterator<Item = Pattern>,
    {
        let name = name.into();
        let body: BTreeSet<Pattern> = body.into_iter().collect();
        if body.is_empty() {
            return Err(InvalidRule::EmptyBody(name));
        }
        if head.subject().is_literal() {
            return Err(InvalidRule::LiteralInHead {
                rule: name,
                position: "subject",
            });
        }
        match head.property() {
            Field::Literal(_) => {
                return Err(InvalidRule::LiteralInHead {
                    rule: name,
                    position: "property",
                })
            }
            Field::Resource(n) if !n.is_iri() => return Err(InvalidRule::NonIriProperty(name)),
            _ => (),
        }
        let bound: BTreeSet<&Variable> = body.iter().flat_map(Pattern::variables).collect();
        if let Some(unbound) = head.variables().find(|v| !bound.contains(v)) {
            return Err(InvalidRule::UnboundHeadVariable {
                variable: unbound.clone(),
                rule: name,
            });
        }
        Ok(Rule {
            id: None,
            name,
            body,
            head,
        })
    }

    /// Return this rule with the given identifier.
    pub fn with_id(mut self, id: RuleId) -> Self {
        self.id = Some(id);
        self
    }

    /// The identifier of this rule, if it has been persisted.
    pub fn id(&self) -> Option<RuleId> {
        self.id
    }

    /// The name of this rule.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The body of this rule.
    pub fn body(&self) -> &BTreeSet<Pattern> {
        &self.body
    }

    /// The head of this rule.
    pub fn head(&self) -> &Pattern {
        &self.head
    }

    /// Whether `other` has the same name, body and head as this rule,
    /// regardless of their identifiers.
    pub fn same_definition(&self, other: &Rule) -> bool {
        self.name == other.name && self.body == other.body && self.head == other.head
    }

    /// Build the inferred triple described by the head, given a body solution.
    pub fn head_triple(&self, bindings: &Bindings) -> Result<Triple, HeadError> {
        let subject = resolve(self.head.subject(), bindings)?;
        if !subject.is_resource() {
            return Err(HeadError::NonResourceSubject(subject));
        }
        let property = resolve(self.head.property(), bindings)?;
        if !property.is_iri() {
            return Err(HeadError::NonIriProperty(property));
        }
        let object = resolve(self.head.object(), bindings)?;
        let context = match self.head.context() {
            Some(field) => {
                let context = resolve(field, bindings)?;
                if !context.is_resource() {
                    return Err(HeadError::NonResourceContext(context));
                }
                Some(context)
            }
            None => None,
        };
        Ok(Triple::new_inferred(subject, property, object).with_optional_context(context))
    }
}

fn resolve(field: &Field, bindings: &Bindings) -> Result<Node, HeadError> {
    match field {
        Field::Variable(v) => bindings
            .get(v)
            .cloned()
            .ok_or_else(|| HeadError::Unbound(v.clone())),
        Field::Resource(n) => Ok(n.clone()),
        Field::Literal(l) => Ok(Node::Literal(l.clone())),
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.name)?;
        for (i, pattern) in self.body.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{pattern}")?;
        }
        write!(f, " -> {}", self.head)
    }
}

/// A named, ordered list of [`Rule`]s, with namespace declarations.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Program {
    id: Option<ProgramId>,
    name: String,
    rules: Vec<Arc<Rule>>,
    namespaces: BTreeMap<String, String>,
}

impl Program {
    /// Build an empty program.
    pub fn new(name: impl Into<String>) -> Self {
        Program {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Return this program with `rule` appended.
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.add_rule(rule);
        self
    }

    /// Return this program with the given namespace declaration.
    pub fn with_namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.namespaces.insert(prefix.into(), uri.into());
        self
    }

    /// The identifier of this program, if it has been persisted.
    pub fn id(&self) -> Option<ProgramId> {
        self.id
    }

    /// Set the identifier of this program.
    pub fn set_id(&mut self, id: ProgramId) {
        self.id = Some(id);
    }

    /// The name of this program.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The rules of this program, in order.
    pub fn rules(&self) -> &[Arc<Rule>] {
        &self.rules
    }

    /// Mutable access to the rules of this program.
    pub fn rules_mut(&mut self) -> &mut Vec<Arc<Rule>> {
        &mut self.rules
    }

    /// Append `rule` to this program.
    pub fn add_rule(&mut self, rule: Rule) {
        self.rules.push(Arc::new(rule));
    }

    /// Remove the rule named `name` from this program, and return it.
    pub fn remove_rule(&mut self, name: &str) -> Option<Arc<Rule>> {
        let index = self.rules.iter().position(|r| r.name() == name)?;
        Some(self.rules.remove(index))
    }

    /// Find the rule named `name` in this program.
    pub fn rule(&self, name: &str) -> Option<&Arc<Rule>> {
        self.rules.iter().find(|r| r.name() == name)
    }

    /// The namespace declarations of this program.
    pub fn namespaces(&self) -> &BTreeMap<String, String> {
        &self.namespaces
    }
}

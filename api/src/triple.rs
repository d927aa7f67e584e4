//! I define [`Triple`], the statement stored in a triple store.
//!
//! A triple is either *base* (asserted) or *inferred* (derived by a rule).
//! Both kinds are distinct statements, even when their terms are equal:
//! retracting a base statement never retracts an inferred statement,
//! and conversely.
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::term::Node;

/// An RDF statement, with an optional context (named graph).
#[derive(Clone, Debug)]
pub struct Triple {
    subject: Node,
    property: Node,
    object: Node,
    context: Option<Node>,
    inferred: bool,
    // transient, excluded from identity
    marked_for_reasoning: bool,
}

impl Triple {
    /// Build a base (asserted) triple in the default context.
    pub fn new(subject: Node, property: Node, object: Node) -> Self {
        Triple {
            subject,
            property,
            object,
            context: None,
            inferred: false,
            marked_for_reasoning: false,
        }
    }

    /// Build an inferred triple in the default context.
    pub fn new_inferred(subject: Node, property: Node, object: Node) -> Self {
        Triple {
            inferred: true,
            ..Self::new(subject, property, object)
        }
    }

    /// Return this triple, placed in the given context.
    pub fn with_context(mut self, context: Node) -> Self {
        self.context = Some(context);
        self
    }

    /// Return this triple, placed in the given optional context.
    pub fn with_optional_context(mut self, context: Option<Node>) -> Self {
        self.context = context;
        self
    }

    /// Return a copy of this statement with the given `inferred` flag.
    pub fn with_inferred(&self, inferred: bool) -> Self {
        Triple {
            inferred,
            marked_for_reasoning: false,
            ..self.clone()
        }
    }

    /// The subject of this triple.
    pub fn subject(&self) -> &Node {
        &self.subject
    }

    /// The property (predicate) of this triple.
    pub fn property(&self) -> &Node {
        &self.property
    }

    /// The object of this triple.
    pub fn object(&self) -> &Node {
        &self.object
    }

    /// The context of this triple, if any.
    pub fn context(&self) -> Option<&Node> {
        self.context.as_ref()
    }

    /// Whether this triple was derived by a rule.
    pub fn is_inferred(&self) -> bool {
        self.inferred
    }

    /// Whether this triple is newly added and still waits for reasoning.
    pub fn is_marked_for_reasoning(&self) -> bool {
        self.marked_for_reasoning
    }

    /// Signal that reasoning has not yet run on this triple.
    pub fn mark_for_reasoning(&mut self) {
        self.marked_for_reasoning = true;
    }

    /// Consume the reasoning mark, returning whether it was set.
    pub fn take_reasoning_mark(&mut self) -> bool {
        std::mem::take(&mut self.marked_for_reasoning)
    }

    fn key(&self) -> (&Node, &Node, &Node, Option<&Node>, bool) {
        (
            &self.subject,
            &self.property,
            &self.object,
            self.context.as_ref(),
            self.inferred,
        )
    }
}

impl PartialEq for Triple {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Triple {}

impl Hash for Triple {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state)
    }
}

impl PartialOrd for Triple {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Triple {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.property, self.object)?;
        if let Some(context) = &self.context {
            write!(f, " {context}")?;
        }
        f.write_str(" .")?;
        if self.inferred {
            f.write_str(" # inferred")?;
        }
        Ok(())
    }
}

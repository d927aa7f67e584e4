//! I define [`Pattern`]s, the triple templates composing rule bodies and heads,
//! and the [`Field`]s they are made of.
use std::collections::BTreeMap;
use std::fmt;

use crate::query::QueryResult;
use crate::term::{Literal, Node, Variable};
use crate::triple::Triple;

/// A set of variable bindings.
pub type Bindings = BTreeMap<Variable, Node>;

/// One position of a [`Pattern`].
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Field {
    /// A variable, bound at match time
    Variable(Variable),
    /// A constant resource (IRI or blank node)
    Resource(Node),
    /// A constant literal
    Literal(Literal),
}

impl Field {
    /// Build a variable field from a trusted variable name.
    ///
    /// See [`Variable::new_unchecked`].
    pub fn var(name: &str) -> Self {
        Field::Variable(Variable::new_unchecked(name))
    }

    /// Build a constant IRI field from trusted data.
    ///
    /// See [`Node::new_iri_unchecked`].
    pub fn iri(iri: &str) -> Self {
        Field::Resource(Node::new_iri_unchecked(iri))
    }

    /// Build a constant literal field.
    pub fn literal(literal: Literal) -> Self {
        Field::Literal(literal)
    }

    /// Whether this field is a variable.
    pub fn is_variable(&self) -> bool {
        matches!(self, Field::Variable(_))
    }

    /// Whether this field is a constant resource.
    pub fn is_resource(&self) -> bool {
        matches!(self, Field::Resource(_))
    }

    /// Whether this field is a constant literal.
    pub fn is_literal(&self) -> bool {
        matches!(self, Field::Literal(_))
    }

    /// The variable of this field, if it is one.
    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            Field::Variable(v) => Some(v),
            _ => None,
        }
    }

    /// Resolve this field against `bindings`:
    /// return its constant value, or the value bound to its variable.
    pub fn resolve(&self, bindings: &Bindings) -> Option<Node> {
        match self {
            Field::Variable(v) => bindings.get(v).cloned(),
            Field::Resource(n) => Some(n.clone()),
            Field::Literal(l) => Some(Node::Literal(l.clone())),
        }
    }

    /// Whether this field is a constant or a variable bound in `bindings`.
    pub fn is_bound(&self, bindings: &Bindings) -> bool {
        match self {
            Field::Variable(v) => bindings.contains_key(v),
            _ => true,
        }
    }
}

impl From<Node> for Field {
    fn from(other: Node) -> Self {
        match other {
            Node::Literal(lit) => Field::Literal(lit),
            n => Field::Resource(n),
        }
    }
}

impl From<Variable> for Field {
    fn from(other: Variable) -> Self {
        Field::Variable(other)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Variable(v) => fmt::Display::fmt(v, f),
            Field::Resource(n) => fmt::Display::fmt(n, f),
            Field::Literal(l) => fmt::Display::fmt(l, f),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Position {
    Subject,
    Property,
    Object,
    Context,
}

/// A triple template, whose fields can be constants or variables.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Pattern {
    subject: Field,
    property: Field,
    object: Field,
    context: Option<Field>,
}

/// The constant terms a [`Pattern`] imposes on candidate triples,
/// once resolved against some bindings.
///
/// `None` means "any term".
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MatchKey {
    /// The required subject
    pub subject: Option<Node>,
    /// The required property
    pub property: Option<Node>,
    /// The required object
    pub object: Option<Node>,
    /// The required context
    pub context: Option<Node>,
}

impl MatchKey {
    /// Whether `triple` satisfies every constraint of this key.
    pub fn accepts(&self, triple: &Triple) -> bool {
        fn ok(required: &Option<Node>, actual: &Node) -> bool {
            required.as_ref().map_or(true, |n| n == actual)
        }
        ok(&self.subject, triple.subject())
            && ok(&self.property, triple.property())
            && ok(&self.object, triple.object())
            && match &self.context {
                None => true,
                Some(c) => triple.context() == Some(c),
            }
    }
}

impl Pattern {
    /// Build a pattern matching triples in any context.
    pub fn new(subject: impl Into<Field>, property: impl Into<Field>, object: impl Into<Field>) -> Self {
        Pattern {
            subject: subject.into(),
            property: property.into(),
            object: object.into(),
            context: None,
        }
    }

    /// Return this pattern, restricted to the given context field.
    pub fn with_context(mut self, context: impl Into<Field>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// The subject field.
    pub fn subject(&self) -> &Field {
        &self.subject
    }

    /// The property field.
    pub fn property(&self) -> &Field {
        &self.property
    }

    /// The object field.
    pub fn object(&self) -> &Field {
        &self.object
    }

    /// The context field, if any.
    pub fn context(&self) -> Option<&Field> {
        self.context.as_ref()
    }

    /// Iterate over all variables occurring in this pattern.
    pub fn variables(&self) -> impl Iterator<Item = &Variable> + '_ {
        [&self.subject, &self.property, &self.object]
            .into_iter()
            .chain(self.context.as_ref())
            .filter_map(Field::as_variable)
    }

    /// Number of subject/property/object fields that are constant or bound in `bindings`.
    ///
    /// Used as a selectivity estimate when ordering joins.
    pub fn bound_count(&self, bindings: &Bindings) -> usize {
        [&self.subject, &self.property, &self.object]
            .into_iter()
            .filter(|f| f.is_bound(bindings))
            .count()
    }

    /// Resolve this pattern against `bindings` into a lookup key.
    ///
    /// If this pattern has no context of its own, `default_context` is used.
    pub fn match_key(&self, bindings: &Bindings, default_context: Option<&Node>) -> MatchKey {
        MatchKey {
            subject: self.subject.resolve(bindings),
            property: self.property.resolve(bindings),
            object: self.object.resolve(bindings),
            context: match &self.context {
                Some(c) => c.resolve(bindings),
                None => default_context.cloned(),
            },
        }
    }

    /// Match `triple` against this pattern, extending `current`.
    ///
    /// On success, return the bindings of `current` extended with the variables bound by this match,
    /// and the justifications of `current` extended with `triple`.
    /// A variable in subject position only binds to a resource,
    /// and a variable in property position only binds to an IRI.
    ///
    /// This function has no side effect.
    pub fn matches(&self, triple: &Triple, current: &QueryResult) -> Option<QueryResult> {
        let mut bindings = current.bindings().clone();
        if !bind(&self.subject, triple.subject(), Position::Subject, &mut bindings)
            || !bind(&self.property, triple.property(), Position::Property, &mut bindings)
        {
            return None;
        }
        if let Some(context) = &self.context {
            match triple.context() {
                Some(c) if bind(context, c, Position::Context, &mut bindings) => (),
                _ => return None,
            }
        }
        if !bind(&self.object, triple.object(), Position::Object, &mut bindings) {
            return None;
        }
        let mut justifications = current.justifications().clone();
        justifications.insert(triple.clone());
        Some(QueryResult::new(bindings, justifications))
    }

    /// Match `triple` against this pattern, starting from empty bindings.
    pub fn matches_triple(&self, triple: &Triple) -> Option<QueryResult> {
        self.matches(triple, &QueryResult::default())
    }
}

fn bind(field: &Field, term: &Node, position: Position, bindings: &mut Bindings) -> bool {
    match field {
        Field::Resource(n) => n == term,
        Field::Literal(l) => term.as_literal() == Some(l),
        Field::Variable(v) => match bindings.get(v) {
            Some(bound) => bound == term,
            None => {
                let acceptable = match position {
                    Position::Subject | Position::Context => term.is_resource(),
                    Position::Property => term.is_iri(),
                    Position::Object => true,
                };
                if acceptable {
                    bindings.insert(v.clone(), term.clone());
                }
                acceptable
            }
        },
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {} {}", self.subject, self.property, self.object)?;
        if let Some(context) = &self.context {
            write!(f, " {context}")?;
        }
        f.write_str(")")
    }
}

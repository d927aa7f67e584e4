//! I define the RDF terms handled by the reasoner:
//! [`Node`] (IRI, blank node or [`Literal`]) and [`Variable`].
//!
//! All textual data is held in [`Arc<str>`],
//! so that terms are cheap to clone and can be shared across threads.
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::ns::{rdf, xsd};

mod _variable;
pub use _variable::*;

/// This error is raised when trying to build a [`Node`] from an invalid IRI.
#[derive(Debug, Error)]
#[error("The given IRI '{0}' is not valid according to RFC3987")]
pub struct InvalidIri(pub String);

/// The kind of a [`Literal`]: either a datatype IRI or a language tag.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum LiteralKind {
    /// A literal with a language tag (implicit datatype `rdf:langString`)
    Lang(Arc<str>),
    /// A literal with an explicit datatype IRI
    Datatype(Arc<str>),
}

/// An RDF [literal](https://www.w3.org/TR/rdf11-concepts/#section-Graph-Literal).
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Literal {
    lexical: Arc<str>,
    kind: LiteralKind,
}

impl Literal {
    /// Build a literal with the given lexical form and datatype IRI.
    pub fn new_dt(lexical: impl Into<Arc<str>>, datatype: impl Into<Arc<str>>) -> Self {
        Literal {
            lexical: lexical.into(),
            kind: LiteralKind::Datatype(datatype.into()),
        }
    }

    /// Build a language-tagged string.
    ///
    /// Language tags are case-insensitive, they are stored in lower case.
    pub fn new_lang(lexical: impl Into<Arc<str>>, tag: &str) -> Self {
        Literal {
            lexical: lexical.into(),
            kind: LiteralKind::Lang(tag.to_ascii_lowercase().into()),
        }
    }

    /// Build a simple literal (datatype `xsd:string`).
    pub fn plain(lexical: impl Into<Arc<str>>) -> Self {
        Self::new_dt(lexical, xsd::STRING)
    }

    /// The lexical form of this literal.
    pub fn lexical_form(&self) -> &str {
        &self.lexical
    }

    /// The kind of this literal.
    pub fn kind(&self) -> &LiteralKind {
        &self.kind
    }

    /// The datatype IRI of this literal (`rdf:langString` for language-tagged strings).
    pub fn datatype(&self) -> &str {
        match &self.kind {
            LiteralKind::Lang(_) => rdf::LANG_STRING,
            LiteralKind::Datatype(dt) => dt,
        }
    }

    /// The language tag of this literal, if any.
    pub fn language_tag(&self) -> Option<&str> {
        match &self.kind {
            LiteralKind::Lang(tag) => Some(tag),
            LiteralKind::Datatype(_) => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("\"")?;
        for c in self.lexical.chars() {
            match c {
                '"' => f.write_str("\\\"")?,
                '\\' => f.write_str("\\\\")?,
                '\n' => f.write_str("\\n")?,
                '\r' => f.write_str("\\r")?,
                c => write!(f, "{c}")?,
            }
        }
        f.write_str("\"")?;
        match &self.kind {
            LiteralKind::Lang(tag) => write!(f, "@{tag}"),
            LiteralKind::Datatype(dt) if &**dt == xsd::STRING => Ok(()),
            LiteralKind::Datatype(dt) => write!(f, "^^<{dt}>"),
        }
    }
}

/// A ground RDF term, as stored in a triple store.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Node {
    /// An [RDF IRI](https://www.w3.org/TR/rdf11-concepts/#section-IRIs)
    Iri(Arc<str>),
    /// An RDF [blank node](https://www.w3.org/TR/rdf11-concepts/#section-blank-nodes)
    BlankNode(Arc<str>),
    /// An RDF [literal](https://www.w3.org/TR/rdf11-concepts/#section-Graph-Literal)
    Literal(Literal),
}

impl Node {
    /// Build an IRI node, checking that `iri` is a valid absolute IRI.
    pub fn iri(iri: &str) -> Result<Self, InvalidIri> {
        match oxiri::Iri::parse(iri) {
            Ok(_) => Ok(Node::Iri(iri.into())),
            Err(_) => Err(InvalidIri(iri.to_string())),
        }
    }

    /// Build an IRI node from trusted data.
    ///
    /// # Precondition
    /// `iri` must be a valid absolute IRI; this is only checked in debug mode.
    pub fn new_iri_unchecked(iri: impl Into<Arc<str>>) -> Self {
        let iri = iri.into();
        debug_assert!(oxiri::Iri::parse(&*iri).is_ok(), "invalid IRI {iri}");
        Node::Iri(iri)
    }

    /// Build a blank node with the given identifier.
    pub fn blank(id: impl Into<Arc<str>>) -> Self {
        Node::BlankNode(id.into())
    }

    /// Build a simple literal node (datatype `xsd:string`).
    pub fn plain_literal(lexical: impl Into<Arc<str>>) -> Self {
        Node::Literal(Literal::plain(lexical))
    }

    /// Whether this node is an IRI.
    pub fn is_iri(&self) -> bool {
        matches!(self, Node::Iri(_))
    }

    /// Whether this node is a blank node.
    pub fn is_blank_node(&self) -> bool {
        matches!(self, Node::BlankNode(_))
    }

    /// Whether this node is a literal.
    pub fn is_literal(&self) -> bool {
        matches!(self, Node::Literal(_))
    }

    /// Whether this node is a resource, i.e. an IRI or a blank node.
    pub fn is_resource(&self) -> bool {
        !self.is_literal()
    }

    /// The IRI of this node, if it is an IRI.
    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Node::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    /// The literal value of this node, if it is a literal.
    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Node::Literal(lit) => Some(lit),
            _ => None,
        }
    }
}

impl From<Literal> for Node {
    fn from(other: Literal) -> Self {
        Node::Literal(other)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Iri(iri) => write!(f, "<{iri}>"),
            Node::BlankNode(id) => write!(f, "_:{id}"),
            Node::Literal(lit) => fmt::Display::fmt(lit, f),
        }
    }
}

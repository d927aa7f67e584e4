use std::fmt;
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

lazy_static! {
    /// Production of SPARQL's VARNAME according to the
    /// [SPARQL spec](https://www.w3.org/TR/sparql11-query/#rVARNAME).
    ///
    /// # Rule
    ///
    /// `VARNAME ::= ( PN_CHARS_U | [0-9] ) ( PN_CHARS_U | [0-9] | #x00B7 | [#x0300-#x036F] | [#x203F-#x2040] )*`
    static ref VARNAME: Regex = Regex::new(r#"(?x)
      ^
      [_A-Za-z0-9\u{C0}-\u{D6}\u{D8}-\u{F6}\u{F8}-\u{2FF}\u{370}-\u{37D}\u{37F}-\u{1FFF}\u{200C}-\u{200D}\u{2070}-\u{218F}\u{2C00}-\u{2FEF}\u{3001}-\u{D7FF}\u{F900}-\u{FDCF}\u{FDF0}-\u{FFFD}\U{10000}-\U{EFFFF}]
      [_A-Za-z0-9\u{B7}\u{C0}-\u{D6}\u{D8}-\u{F6}\u{F8}-\u{2FF}\u{300}-\u{37D}\u{37F}-\u{1FFF}\u{200C}-\u{200D}\u{203F}-\u{2040}\u{2070}-\u{218F}\u{2C00}-\u{2FEF}\u{3001}-\u{D7FF}\u{F900}-\u{FDCF}\u{FDF0}-\u{FFFD}\U{10000}-\U{EFFFF}]*
      $
    "#).unwrap();
}

/// A rule variable, whose name satisfies the `VARNAME` rule in
/// [SPARQL](https://www.w3.org/TR/sparql11-query/#rVARNAME).
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Variable(Arc<str>);

impl Variable {
    /// Build a variable, checking that `name` is a valid `VARNAME`.
    pub fn new(name: &str) -> Result<Self, InvalidVariable> {
        if VARNAME.is_match(name) {
            Ok(Variable(name.into()))
        } else {
            Err(InvalidVariable(name.to_string()))
        }
    }

    /// Build a variable from a trusted name.
    ///
    /// # Precondition
    /// `name` must be a valid `VARNAME`; this is only checked in debug mode.
    pub fn new_unchecked(name: &str) -> Self {
        debug_assert!(VARNAME.is_match(name), "invalid variable name {name}");
        Variable(name.into())
    }

    /// Gets a reference to the underlying &str.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.0)
    }
}

/// This error is raised when trying to parse an invalid variable name.
#[derive(Debug, Error)]
#[error("The given variable name '{0}' does not comply with SPARQL's VARNAME")]
pub struct InvalidVariable(pub String);

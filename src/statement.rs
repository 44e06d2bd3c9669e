//! Logical statements, terms and variable bindings.
//!
//! A [`Statement`] is a predicate applied to an ordered list of [`Term`]s,
//! written `(isa ?x block)`. Equality and hashing are structural, so a
//! statement is its own canonical key in the knowledge-base index.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single argument of a statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Term {
    /// A variable, written with a leading `?`. Stored without the `?`.
    Variable(String),
    /// A constant symbol.
    Constant(String),
}

impl Term {
    /// Parse a single token: `?name` is a variable, anything else a constant.
    pub fn parse(token: &str) -> Self {
        let token = token.trim();
        match token.strip_prefix('?') {
            Some(var) => Self::Variable(var.to_string()),
            None => Self::Constant(token.to_string()),
        }
    }

    /// Returns `true` if this term is a variable.
    pub fn is_variable(&self) -> bool {
        matches!(self, Self::Variable(_))
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Variable(name) => write!(f, "?{name}"),
            Term::Constant(name) => f.write_str(name),
        }
    }
}

/// A predicate applied to terms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Statement {
    pub predicate: String,
    pub terms: Vec<Term>,
}

impl Statement {
    pub fn new(predicate: impl Into<String>, terms: Vec<Term>) -> Self {
        Self {
            predicate: predicate.into(),
            terms,
        }
    }

    /// Build a statement from string tokens, parsing each with [`Term::parse`].
    pub fn from_tokens(predicate: impl Into<String>, tokens: &[&str]) -> Self {
        Self::new(predicate, tokens.iter().map(|t| Term::parse(t)).collect())
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.predicate)?;
        for term in &self.terms {
            write!(f, " {term}")?;
        }
        f.write_str(")")
    }
}

/// A variable substitution produced by matching.
///
/// Keeps bindings in the order they were made so printed answers are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bindings {
    pairs: Vec<(String, Term)>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// The value bound to `var`, if any.
    pub fn bound_to(&self, var: &str) -> Option<&Term> {
        self.pairs
            .iter()
            .find(|(name, _)| name == var)
            .map(|(_, value)| value)
    }

    /// Bind `var` to `value` unless it is already bound.
    ///
    /// Returns `false` when `var` is already bound to a different value.
    pub fn test_and_bind(&mut self, var: &str, value: &Term) -> bool {
        match self.bound_to(var) {
            Some(existing) => existing == value,
            None => {
                self.pairs.push((var.to_string(), value.clone()));
                true
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Term)> {
        self.pairs.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl fmt::Display for Bindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.pairs.is_empty() {
            return f.write_str("TRUE");
        }
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "?{name} : {value}")?;
        }
        Ok(())
    }
}

//! Knowledge items: facts, rules and the justifications linking them.
//!
//! Support metadata is readable by anyone but only the knowledge base may
//! change it, because both ends of every support edge must move together.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::{FactId, RuleId};
use crate::statement::Statement;

// ---------------------------------------------------------------------------
// Justification
// ---------------------------------------------------------------------------

/// One derivation step: `rule` fired on `fact` to produce the owning item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Justification {
    pub fact: FactId,
    pub rule: RuleId,
}

impl Justification {
    pub fn new(fact: FactId, rule: RuleId) -> Self {
        Self { fact, rule }
    }
}

// ---------------------------------------------------------------------------
// Fact
// ---------------------------------------------------------------------------

/// A statement held in the knowledge base.
///
/// Two facts are equal iff their statements are equal; support metadata is
/// ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fact {
    pub statement: Statement,
    pub(crate) asserted: bool,
    pub(crate) supported_by: Vec<Justification>,
    pub(crate) supports_facts: Vec<FactId>,
    pub(crate) supports_rules: Vec<RuleId>,
}

impl Fact {
    /// An externally asserted fact.
    pub fn new(statement: Statement) -> Self {
        Self {
            statement,
            asserted: true,
            supported_by: Vec::new(),
            supports_facts: Vec::new(),
            supports_rules: Vec::new(),
        }
    }

    /// A fact produced by one derivation step.
    pub fn derived(statement: Statement, justification: Justification) -> Self {
        Self {
            statement,
            asserted: false,
            supported_by: vec![justification],
            supports_facts: Vec::new(),
            supports_rules: Vec::new(),
        }
    }

    pub fn is_asserted(&self) -> bool {
        self.asserted
    }

    pub fn is_supported(&self) -> bool {
        !self.supported_by.is_empty()
    }

    pub fn supported_by(&self) -> &[Justification] {
        &self.supported_by
    }

    pub fn supports_facts(&self) -> &[FactId] {
        &self.supports_facts
    }

    pub fn supports_rules(&self) -> &[RuleId] {
        &self.supports_rules
    }
}

impl PartialEq for Fact {
    fn eq(&self, other: &Self) -> bool {
        self.statement == other.statement
    }
}

impl Eq for Fact {}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fact: {}", self.statement)?;
        if self.asserted {
            f.write_str(" ASSERTED")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

/// An implication: every statement in `lhs` (in order) implies `rhs`.
///
/// Two rules are equal iff their `lhs` and `rhs` are equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub lhs: Vec<Statement>,
    pub rhs: Statement,
    pub(crate) asserted: bool,
    pub(crate) supported_by: Vec<Justification>,
    pub(crate) supports_facts: Vec<FactId>,
    pub(crate) supports_rules: Vec<RuleId>,
}

impl Rule {
    /// An externally asserted rule.
    ///
    /// `lhs` should be non-empty; a rule without antecedents never fires.
    pub fn new(lhs: Vec<Statement>, rhs: Statement) -> Self {
        Self {
            lhs,
            rhs,
            asserted: true,
            supported_by: Vec::new(),
            supports_facts: Vec::new(),
            supports_rules: Vec::new(),
        }
    }

    /// A partially applied rule produced by one derivation step.
    pub fn derived(lhs: Vec<Statement>, rhs: Statement, justification: Justification) -> Self {
        Self {
            lhs,
            rhs,
            asserted: false,
            supported_by: vec![justification],
            supports_facts: Vec::new(),
            supports_rules: Vec::new(),
        }
    }

    pub fn is_asserted(&self) -> bool {
        self.asserted
    }

    pub fn is_supported(&self) -> bool {
        !self.supported_by.is_empty()
    }

    pub fn supported_by(&self) -> &[Justification] {
        &self.supported_by
    }

    pub fn supports_facts(&self) -> &[FactId] {
        &self.supports_facts
    }

    pub fn supports_rules(&self) -> &[RuleId] {
        &self.supports_rules
    }

    /// The identity key used by the knowledge-base index.
    pub(crate) fn key(&self) -> (Vec<Statement>, Statement) {
        (self.lhs.clone(), self.rhs.clone())
    }
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.lhs == other.lhs && self.rhs == other.rhs
    }
}

impl Eq for Rule {}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("rule: (")?;
        for (i, statement) in self.lhs.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{statement}")?;
        }
        write!(f, ") -> {}", self.rhs)?;
        if self.asserted {
            f.write_str(" ASSERTED")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Item
// ---------------------------------------------------------------------------

/// Either kind of stored knowledge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Item {
    Fact(Fact),
    Rule(Rule),
}

impl Item {
    /// Returns `true` for a fact, the only item kind that can be asked.
    pub fn is_fact(&self) -> bool {
        matches!(self, Self::Fact(_))
    }

    pub fn is_asserted(&self) -> bool {
        match self {
            Self::Fact(fact) => fact.asserted,
            Self::Rule(rule) => rule.asserted,
        }
    }

    pub fn supported_by(&self) -> &[Justification] {
        match self {
            Self::Fact(fact) => &fact.supported_by,
            Self::Rule(rule) => &rule.supported_by,
        }
    }
}

impl From<Fact> for Item {
    fn from(fact: Fact) -> Self {
        Self::Fact(fact)
    }
}

impl From<Rule> for Item {
    fn from(rule: Rule) -> Self {
        Self::Rule(rule)
    }
}

impl From<Statement> for Item {
    fn from(statement: Statement) -> Self {
        Self::Fact(Fact::new(statement))
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fact(fact) => write!(f, "{fact}"),
            Self::Rule(rule) => write!(f, "{rule}"),
        }
    }
}

//! Single-step forward chaining.
//!
//! A rule's antecedents are consumed one at a time, left to right. Matching the
//! first antecedent against a fact either yields a smaller rule (the remaining
//! antecedents with the binding applied) or, when it was the last antecedent,
//! a new fact. Each step only ever looks at one fact and one rule, so no
//! multi-fact join is needed.

use crate::config::Verbosity;
use crate::id::{FactId, RuleId};
use crate::item::{Fact, Item, Justification, Rule};
use crate::unify::{instantiate, match_statements};

/// Stateless forward-chaining step.
#[derive(Debug, Clone, Copy, Default)]
pub struct InferenceEngine {
    verbosity: Verbosity,
}

impl InferenceEngine {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    /// Try to fire `rule` on `fact`.
    ///
    /// Returns the derived item carrying the justification `(fact_id, rule_id)`,
    /// or `None` if the rule's first antecedent does not match the fact. The
    /// caller is responsible for asserting the result.
    pub fn fc_infer(
        &self,
        fact_id: FactId,
        fact: &Fact,
        rule_id: RuleId,
        rule: &Rule,
    ) -> Option<Item> {
        if self.verbosity >= Verbosity::Inferences {
            tracing::debug!(
                fact = %fact.statement,
                rule = %rule,
                "attempting to infer"
            );
        }

        let (head, rest) = rule.lhs.split_first()?;
        let bindings = match_statements(&fact.statement, head)?;
        let justification = Justification::new(fact_id, rule_id);

        let derived = if rest.is_empty() {
            Item::Fact(Fact::derived(instantiate(&rule.rhs, &bindings), justification))
        } else {
            let lhs = rest.iter().map(|s| instantiate(s, &bindings)).collect();
            Item::Rule(Rule::derived(lhs, instantiate(&rule.rhs, &bindings), justification))
        };

        if self.verbosity >= Verbosity::Inferences {
            tracing::debug!(%derived, %bindings, "inferred");
        }
        Some(derived)
    }
}

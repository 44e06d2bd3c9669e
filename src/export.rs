//! Export types for serializing knowledge-base state.
//!
//! These types provide human-readable representations of stored items, their
//! support graph, query answers and retraction outcomes, suitable for JSON.

use serde::{Deserialize, Serialize};

use crate::item::Justification;
use crate::kb::{Answer, KnowledgeBase, RetractionResult};

/// Exported justification as raw ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JustificationExport {
    pub fact: u64,
    pub rule: u64,
}

impl From<&Justification> for JustificationExport {
    fn from(j: &Justification) -> Self {
        Self {
            fact: j.fact.get(),
            rule: j.rule.get(),
        }
    }
}

/// Exported fact with its support links.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactExport {
    /// Numeric fact id.
    pub id: u64,
    /// Statement in text form, e.g. `(isa cube block)`.
    pub statement: String,
    pub asserted: bool,
    pub supported_by: Vec<JustificationExport>,
    pub supports_facts: Vec<u64>,
    pub supports_rules: Vec<u64>,
}

/// Exported rule with its support links.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleExport {
    /// Numeric rule id.
    pub id: u64,
    /// Antecedents in text form.
    pub lhs: Vec<String>,
    /// Consequent in text form.
    pub rhs: String,
    pub asserted: bool,
    pub supported_by: Vec<JustificationExport>,
    pub supports_facts: Vec<u64>,
    pub supports_rules: Vec<u64>,
}

/// Full knowledge-base snapshot in insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KbSnapshot {
    pub facts: Vec<FactExport>,
    pub rules: Vec<RuleExport>,
}

impl KbSnapshot {
    pub fn from_kb(kb: &KnowledgeBase) -> Self {
        let facts = kb
            .facts()
            .map(|(id, fact)| FactExport {
                id: id.get(),
                statement: fact.statement.to_string(),
                asserted: fact.is_asserted(),
                supported_by: fact.supported_by().iter().map(Into::into).collect(),
                supports_facts: fact.supports_facts().iter().map(|f| f.get()).collect(),
                supports_rules: fact.supports_rules().iter().map(|r| r.get()).collect(),
            })
            .collect();
        let rules = kb
            .rules()
            .map(|(id, rule)| RuleExport {
                id: id.get(),
                lhs: rule.lhs.iter().map(ToString::to_string).collect(),
                rhs: rule.rhs.to_string(),
                asserted: rule.is_asserted(),
                supported_by: rule.supported_by().iter().map(Into::into).collect(),
                supports_facts: rule.supports_facts().iter().map(|f| f.get()).collect(),
                supports_rules: rule.supports_rules().iter().map(|r| r.get()).collect(),
            })
            .collect();
        Self { facts, rules }
    }
}

/// Exported query answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerExport {
    /// Bindings in text form, e.g. `?x : cube`.
    pub bindings: String,
    /// Matched facts in text form.
    pub facts: Vec<String>,
}

impl AnswerExport {
    pub fn from_answer(kb: &KnowledgeBase, answer: &Answer) -> Self {
        Self {
            bindings: answer.bindings.to_string(),
            facts: answer
                .facts
                .iter()
                .filter_map(|&id| kb.fact(id))
                .map(|fact| fact.statement.to_string())
                .collect(),
        }
    }
}

/// Exported retraction outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetractionExport {
    pub removed_facts: Vec<String>,
    pub removed_rules: Vec<String>,
    pub unasserted: bool,
    pub cascade_depth: usize,
}

impl From<&RetractionResult> for RetractionExport {
    fn from(result: &RetractionResult) -> Self {
        Self {
            removed_facts: result
                .removed_facts
                .iter()
                .map(|f| f.statement.to_string())
                .collect(),
            removed_rules: result.removed_rules.iter().map(ToString::to_string).collect(),
            unasserted: result.unasserted,
            cascade_depth: result.cascade_depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_items;

    #[test]
    fn snapshot_mirrors_support_graph() {
        let items = parse_items("fact: (P a)\nrule: ((P ?x)) -> (Q ?x)\n").unwrap();
        let kb = KnowledgeBase::from_items(Default::default(), items).unwrap();
        let snap = KbSnapshot::from_kb(&kb);

        assert_eq!(snap.facts.len(), 2);
        assert_eq!(snap.rules.len(), 1);
        let q = &snap.facts[1];
        assert_eq!(q.statement, "(Q a)");
        assert!(!q.asserted);
        assert_eq!(
            q.supported_by,
            vec![JustificationExport {
                fact: snap.facts[0].id,
                rule: snap.rules[0].id
            }]
        );
        assert_eq!(snap.rules[0].supports_facts, vec![q.id]);

        let json = serde_json::to_string(&snap).unwrap();
        assert!(json.contains("\"(Q a)\""));
    }
}

//! The knowledge base: fact and rule arenas plus the support graph.
//!
//! Every derived item records the `(fact, rule)` pairs that justify it, and
//! every producer records the items it helped derive. The two directions are
//! always updated together. An item stays in the store while it is asserted
//! or has at least one justification; retraction removes an item and cascades
//! through dependents that are left with neither.
//!
//! Both the forward-chaining pass and the retraction cascade run on explicit
//! queues rather than recursion, so long derivation chains cannot exhaust the
//! stack.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{KbConfig, Verbosity};
use crate::error::{KbResult, StoreError};
use crate::id::{FactId, IdAllocator, RuleId};
use crate::infer::InferenceEngine;
use crate::item::{Fact, Item, Justification, Rule};
use crate::statement::{Bindings, Statement};
use crate::unify::match_statements;

// ---------------------------------------------------------------------------
// Handles and results
// ---------------------------------------------------------------------------

/// Handle to a stored item of either kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ItemRef {
    Fact(FactId),
    Rule(RuleId),
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemRef::Fact(id) => write!(f, "{id}"),
            ItemRef::Rule(id) => write!(f, "{id}"),
        }
    }
}

/// One answer to a query: the bindings and the fact that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub bindings: Bindings,
    pub facts: Vec<FactId>,
}

/// Result of a retraction.
#[derive(Debug, Clone, Default)]
pub struct RetractionResult {
    /// Handles of every removed item, in removal order. The target comes first
    /// when it was removed.
    pub removed: Vec<ItemRef>,
    /// Removed facts, in removal order.
    pub removed_facts: Vec<Fact>,
    /// Removed rules, in removal order.
    pub removed_rules: Vec<Rule>,
    /// The target was still justified, so only its assertion was withdrawn.
    pub unasserted: bool,
    /// Longest dependency chain walked by the cascade.
    pub cascade_depth: usize,
}

impl RetractionResult {
    fn unasserted() -> Self {
        Self {
            unasserted: true,
            ..Self::default()
        }
    }
}

fn involves(justification: &Justification, producer: ItemRef) -> bool {
    match producer {
        ItemRef::Fact(id) => justification.fact == id,
        ItemRef::Rule(id) => justification.rule == id,
    }
}

// ---------------------------------------------------------------------------
// Knowledge base
// ---------------------------------------------------------------------------

/// A store of facts and rules that forward-chains on every assertion and
/// maintains its support graph across retractions.
///
/// Facts and rules are kept in insertion order; that order is used when
/// pairing new items and when answering queries.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    config: KbConfig,
    engine: InferenceEngine,
    ids: IdAllocator,
    facts: BTreeMap<FactId, Fact>,
    rules: BTreeMap<RuleId, Rule>,
    fact_index: HashMap<Statement, FactId>,
    rule_index: HashMap<(Vec<Statement>, Statement), RuleId>,
}

impl KnowledgeBase {
    /// Create an empty knowledge base.
    pub fn new(config: KbConfig) -> Self {
        Self {
            engine: InferenceEngine::new(config.verbosity),
            config,
            ids: IdAllocator::new(),
            facts: BTreeMap::new(),
            rules: BTreeMap::new(),
            fact_index: HashMap::new(),
            rule_index: HashMap::new(),
        }
    }

    /// Create a knowledge base and assert `items` in order.
    pub fn from_items(config: KbConfig, items: impl IntoIterator<Item = Item>) -> KbResult<Self> {
        let mut kb = Self::new(config);
        for item in items {
            kb.assert(item)?;
        }
        Ok(kb)
    }

    pub fn config(&self) -> &KbConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Add / assert
    // -----------------------------------------------------------------------

    /// Assert a fact or rule from outside the engine.
    ///
    /// Same as [`add`](Self::add); kept separate so external assertions are
    /// logged at the assertion verbosity level.
    pub fn assert(&mut self, item: impl Into<Item>) -> KbResult<ItemRef> {
        let item = item.into();
        if self.config.verbosity >= Verbosity::Assertions {
            tracing::info!(%item, "asserting");
        }
        self.add(item)
    }

    /// Add a fact or rule and chain forward to a fixpoint.
    ///
    /// If an equal item is already stored, the incoming justifications are
    /// merged into it, or, when there are none, the stored item is marked
    /// asserted. Otherwise the item is inserted and paired with every stored
    /// item of the other kind; each derivation is added the same way.
    ///
    /// Returns the handle of the stored entry `item` resolved to.
    pub fn add(&mut self, item: impl Into<Item>) -> KbResult<ItemRef> {
        let mut agenda = VecDeque::new();
        let target = self.add_one(item.into(), &mut agenda)?;
        while let Some(derived) = agenda.pop_front() {
            self.add_one(derived, &mut agenda)?;
        }
        Ok(target)
    }

    fn add_one(&mut self, item: Item, agenda: &mut VecDeque<Item>) -> KbResult<ItemRef> {
        if self.config.verbosity >= Verbosity::Inferences {
            tracing::debug!(%item, "adding");
        }

        match item {
            Item::Fact(mut fact) => {
                let justifications = self.live_justifications(std::mem::take(&mut fact.supported_by));
                if let Some(&id) = self.fact_index.get(&fact.statement) {
                    let handle = ItemRef::Fact(id);
                    self.merge(handle, justifications);
                    return Ok(handle);
                }

                let id = self.ids.next_fact()?;
                let handle = ItemRef::Fact(id);
                fact.asserted |= justifications.is_empty();
                fact.supports_facts.clear();
                fact.supports_rules.clear();
                self.fact_index.insert(fact.statement.clone(), id);
                self.facts.insert(id, fact);
                for justification in justifications {
                    self.link(handle, justification);
                }

                if let Some(fact) = self.facts.get(&id) {
                    for (&rule_id, rule) in &self.rules {
                        agenda.extend(self.engine.fc_infer(id, fact, rule_id, rule));
                    }
                }
                Ok(handle)
            }
            Item::Rule(mut rule) => {
                let justifications = self.live_justifications(std::mem::take(&mut rule.supported_by));
                if let Some(id) = self.find_rule(&rule) {
                    let handle = ItemRef::Rule(id);
                    self.merge(handle, justifications);
                    return Ok(handle);
                }

                let id = self.ids.next_rule()?;
                let handle = ItemRef::Rule(id);
                rule.asserted |= justifications.is_empty();
                rule.supports_facts.clear();
                rule.supports_rules.clear();
                self.rule_index.insert(rule.key(), id);
                self.rules.insert(id, rule);
                for justification in justifications {
                    self.link(handle, justification);
                }

                if let Some(rule) = self.rules.get(&id) {
                    for (&fact_id, fact) in &self.facts {
                        agenda.extend(self.engine.fc_infer(fact_id, fact, id, rule));
                    }
                }
                Ok(handle)
            }
        }
    }

    /// Keep the justifications whose producers are both still stored.
    ///
    /// An item left with none is treated as an assertion.
    fn live_justifications(&self, justifications: Vec<Justification>) -> Vec<Justification> {
        justifications
            .into_iter()
            .filter(|j| {
                let live = self.facts.contains_key(&j.fact) && self.rules.contains_key(&j.rule);
                if !live {
                    tracing::warn!(
                        fact = %j.fact,
                        rule = %j.rule,
                        "dropping justification with a missing producer"
                    );
                }
                live
            })
            .collect()
    }

    /// Fold an equal incoming item into the stored one.
    fn merge(&mut self, handle: ItemRef, justifications: Vec<Justification>) {
        if justifications.is_empty() {
            match handle {
                ItemRef::Fact(id) => {
                    if let Some(fact) = self.facts.get_mut(&id) {
                        fact.asserted = true;
                    }
                }
                ItemRef::Rule(id) => {
                    if let Some(rule) = self.rules.get_mut(&id) {
                        rule.asserted = true;
                    }
                }
            }
            return;
        }
        for justification in justifications {
            self.link(handle, justification);
        }
    }

    /// Record `justification` on `dependent` and the back-links on both producers.
    fn link(&mut self, dependent: ItemRef, justification: Justification) {
        let dedup = self.config.dedup_support;
        let Some(supported_by) = self.supported_by_mut(dependent) else {
            return;
        };
        if dedup && supported_by.contains(&justification) {
            return;
        }
        supported_by.push(justification);

        self.add_back_link(ItemRef::Fact(justification.fact), dependent);
        self.add_back_link(ItemRef::Rule(justification.rule), dependent);
    }

    fn supported_by_mut(&mut self, handle: ItemRef) -> Option<&mut Vec<Justification>> {
        match handle {
            ItemRef::Fact(id) => self.facts.get_mut(&id).map(|f| &mut f.supported_by),
            ItemRef::Rule(id) => self.rules.get_mut(&id).map(|r| &mut r.supported_by),
        }
    }

    fn supports_mut(&mut self, handle: ItemRef) -> Option<(&mut Vec<FactId>, &mut Vec<RuleId>)> {
        match handle {
            ItemRef::Fact(id) => self
                .facts
                .get_mut(&id)
                .map(|f| (&mut f.supports_facts, &mut f.supports_rules)),
            ItemRef::Rule(id) => self
                .rules
                .get_mut(&id)
                .map(|r| (&mut r.supports_facts, &mut r.supports_rules)),
        }
    }

    fn add_back_link(&mut self, producer: ItemRef, dependent: ItemRef) {
        let Some((facts, rules)) = self.supports_mut(producer) else {
            return;
        };
        match dependent {
            ItemRef::Fact(id) if !facts.contains(&id) => facts.push(id),
            ItemRef::Rule(id) if !rules.contains(&id) => rules.push(id),
            _ => {}
        }
    }

    fn remove_back_link(&mut self, producer: ItemRef, dependent: ItemRef) {
        let Some((facts, rules)) = self.supports_mut(producer) else {
            return;
        };
        match dependent {
            ItemRef::Fact(id) => facts.retain(|&f| f != id),
            ItemRef::Rule(id) => rules.retain(|&r| r != id),
        }
    }

    // -----------------------------------------------------------------------
    // Ask
    // -----------------------------------------------------------------------

    /// Match a fact query against every stored fact, in insertion order.
    ///
    /// Returns one [`Answer`] per matching fact; an empty vector if nothing
    /// matched. A rule, or a fact with an empty predicate, is reported as
    /// [`StoreError::InvalidQuery`].
    pub fn ask(&self, query: &Item) -> KbResult<Vec<Answer>> {
        match query {
            Item::Fact(fact) if !fact.statement.predicate.is_empty() => {
                Ok(self.ask_statement(&fact.statement))
            }
            _ => {
                tracing::warn!(query = %query, "invalid ask");
                Err(StoreError::InvalidQuery {
                    query: query.to_string(),
                }
                .into())
            }
        }
    }

    /// Like [`ask`](Self::ask), but an invalid query yields no answers.
    /// The diagnostic is still logged.
    pub fn ask_or_empty(&self, query: &Item) -> Vec<Answer> {
        self.ask(query).unwrap_or_default()
    }

    /// Match a bare statement against every stored fact.
    pub fn ask_statement(&self, query: &Statement) -> Vec<Answer> {
        if self.config.verbosity >= Verbosity::Assertions {
            tracing::info!(%query, "asking");
        }
        self.facts
            .iter()
            .filter_map(|(&id, fact)| {
                match_statements(query, &fact.statement).map(|bindings| Answer {
                    bindings,
                    facts: vec![id],
                })
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Retract
    // -----------------------------------------------------------------------

    /// Retract a fact or rule, looked up by structural equality.
    ///
    /// See [`retract_fact`](Self::retract_fact) and
    /// [`retract_rule`](Self::retract_rule) for the per-kind rules.
    pub fn retract(&mut self, item: &Item) -> KbResult<RetractionResult> {
        if self.config.verbosity >= Verbosity::Assertions {
            tracing::info!(%item, "retracting");
        }
        match self.find(item) {
            Some(ItemRef::Fact(id)) => self.retract_fact(id),
            Some(ItemRef::Rule(id)) => self.retract_rule(id),
            None => {
                tracing::warn!(%item, "retract target not found");
                Err(StoreError::NotFound {
                    item: item.to_string(),
                }
                .into())
            }
        }
    }

    /// Retract a stored fact.
    ///
    /// A fact that is still justified only loses its assertion. An unjustified
    /// fact is removed, asserted or not, and the removal cascades.
    pub fn retract_fact(&mut self, id: FactId) -> KbResult<RetractionResult> {
        let Some(fact) = self.facts.get_mut(&id) else {
            tracing::warn!(fact = %id, "retract target not found");
            return Err(StoreError::NotFound {
                item: id.to_string(),
            }
            .into());
        };

        if fact.is_supported() {
            fact.asserted = false;
            tracing::debug!(fact = %fact.statement, "still supported, assertion withdrawn");
            return Ok(RetractionResult::unasserted());
        }
        Ok(self.cascade(ItemRef::Fact(id)))
    }

    /// Retract a stored rule.
    ///
    /// Asserted rules are never removed. A derived rule is only removed once
    /// it has lost all of its justifications.
    pub fn retract_rule(&mut self, id: RuleId) -> KbResult<RetractionResult> {
        let Some(rule) = self.rules.get(&id) else {
            tracing::warn!(rule = %id, "retract target not found");
            return Err(StoreError::NotFound {
                item: id.to_string(),
            }
            .into());
        };

        if rule.asserted {
            tracing::warn!(%rule, "cannot retract asserted rule");
            return Err(StoreError::AssertedRuleRetractionDenied {
                rule: rule.to_string(),
            }
            .into());
        }
        if rule.is_supported() {
            tracing::warn!(%rule, supports = rule.supported_by.len(), "rule is still supported");
            return Err(StoreError::StillSupported {
                rule: rule.to_string(),
                supports: rule.supported_by.len(),
            }
            .into());
        }
        Ok(self.cascade(ItemRef::Rule(id)))
    }

    /// Remove `start` and every dependent left unjustified and unasserted.
    ///
    /// Breadth-first over the support graph. An item is removed at most once;
    /// handles already in `removed` are skipped.
    fn cascade(&mut self, start: ItemRef) -> RetractionResult {
        let mut result = RetractionResult::default();
        let mut removed: HashSet<ItemRef> = HashSet::new();
        let mut queue: VecDeque<(ItemRef, usize)> = VecDeque::new();
        queue.push_back((start, 0));

        while let Some((current, depth)) = queue.pop_front() {
            if !removed.insert(current) {
                continue;
            }

            let (dependent_facts, dependent_rules) = match current {
                ItemRef::Fact(id) => {
                    let Some(fact) = self.facts.remove(&id) else {
                        continue;
                    };
                    self.fact_index.remove(&fact.statement);
                    let deps = (fact.supports_facts.clone(), fact.supports_rules.clone());
                    result.removed_facts.push(fact);
                    deps
                }
                ItemRef::Rule(id) => {
                    let Some(rule) = self.rules.remove(&id) else {
                        continue;
                    };
                    self.rule_index.remove(&rule.key());
                    let deps = (rule.supports_facts.clone(), rule.supports_rules.clone());
                    result.removed_rules.push(rule);
                    deps
                }
            };
            result.removed.push(current);
            result.cascade_depth = result.cascade_depth.max(depth);

            let dependents = dependent_facts
                .into_iter()
                .map(ItemRef::Fact)
                .chain(dependent_rules.into_iter().map(ItemRef::Rule));
            for dependent in dependents {
                if removed.contains(&dependent) {
                    continue;
                }
                if self.strip_support(dependent, current) {
                    queue.push_back((dependent, depth + 1));
                }
            }
        }

        tracing::debug!(
            facts = result.removed_facts.len(),
            rules = result.removed_rules.len(),
            depth = result.cascade_depth,
            "retraction cascade complete"
        );
        result
    }

    /// Drop every justification of `dependent` that involves `producer`.
    ///
    /// The partner producer of each dropped pair loses its back-link unless
    /// another surviving pair still references it. Returns `true` if
    /// `dependent` is now unjustified and unasserted.
    fn strip_support(&mut self, dependent: ItemRef, producer: ItemRef) -> bool {
        let (remaining, asserted, dropped) = {
            let (supported_by, asserted) = match dependent {
                ItemRef::Fact(id) => match self.facts.get_mut(&id) {
                    Some(fact) => (&mut fact.supported_by, fact.asserted),
                    None => return false,
                },
                ItemRef::Rule(id) => match self.rules.get_mut(&id) {
                    Some(rule) => (&mut rule.supported_by, rule.asserted),
                    None => return false,
                },
            };
            let (dropped, kept): (Vec<Justification>, Vec<Justification>) = supported_by
                .iter()
                .copied()
                .partition(|j| involves(j, producer));
            *supported_by = kept.clone();
            (kept, asserted, dropped)
        };

        for justification in dropped {
            let partner = match producer {
                ItemRef::Fact(_) => ItemRef::Rule(justification.rule),
                ItemRef::Rule(_) => ItemRef::Fact(justification.fact),
            };
            if !remaining.iter().any(|j| involves(j, partner)) {
                self.remove_back_link(partner, dependent);
            }
        }

        remaining.is_empty() && !asserted
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    /// The stored entry structurally equal to `item`, if any.
    pub fn find(&self, item: &Item) -> Option<ItemRef> {
        match item {
            Item::Fact(fact) => self.find_fact(&fact.statement).map(ItemRef::Fact),
            Item::Rule(rule) => self.find_rule(rule).map(ItemRef::Rule),
        }
    }

    pub fn find_fact(&self, statement: &Statement) -> Option<FactId> {
        self.fact_index.get(statement).copied()
    }

    pub fn find_rule(&self, rule: &Rule) -> Option<RuleId> {
        self.rule_index.get(&(rule.lhs.clone(), rule.rhs.clone())).copied()
    }

    pub fn contains(&self, item: &Item) -> bool {
        self.find(item).is_some()
    }

    pub fn fact(&self, id: FactId) -> Option<&Fact> {
        self.facts.get(&id)
    }

    pub fn rule(&self, id: RuleId) -> Option<&Rule> {
        self.rules.get(&id)
    }

    /// Stored facts in insertion order.
    pub fn facts(&self) -> impl Iterator<Item = (FactId, &Fact)> {
        self.facts.iter().map(|(&id, fact)| (id, fact))
    }

    /// Stored rules in insertion order.
    pub fn rules(&self) -> impl Iterator<Item = (RuleId, &Rule)> {
        self.rules.iter().map(|(&id, rule)| (id, rule))
    }

    pub fn fact_count(&self) -> usize {
        self.facts.len()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty() && self.rules.is_empty()
    }

    // -----------------------------------------------------------------------
    // Invariants
    // -----------------------------------------------------------------------

    /// Check the store's invariants, reporting the first violation.
    ///
    /// - every item is asserted or justified;
    /// - the indexes hold exactly one entry per stored item;
    /// - every justification on an item is mirrored by back-links on both
    ///   producers, and every back-link is backed by a justification.
    pub fn validate(&self) -> KbResult<()> {
        if self.fact_index.len() != self.facts.len() || self.rule_index.len() != self.rules.len() {
            return inconsistent(format!(
                "index sizes {}/{} do not match stored {}/{}",
                self.fact_index.len(),
                self.rule_index.len(),
                self.facts.len(),
                self.rules.len()
            ));
        }

        for (&id, fact) in &self.facts {
            if self.fact_index.get(&fact.statement) != Some(&id) {
                return inconsistent(format!("{id} is not indexed by its statement"));
            }
            self.check_item(ItemRef::Fact(id), fact.asserted, &fact.supported_by)?;
            self.check_back_links(ItemRef::Fact(id), &fact.supports_facts, &fact.supports_rules)?;
        }
        for (&id, rule) in &self.rules {
            if self.rule_index.get(&rule.key()) != Some(&id) {
                return inconsistent(format!("{id} is not indexed by its lhs/rhs"));
            }
            self.check_item(ItemRef::Rule(id), rule.asserted, &rule.supported_by)?;
            self.check_back_links(ItemRef::Rule(id), &rule.supports_facts, &rule.supports_rules)?;
        }
        Ok(())
    }

    fn check_item(
        &self,
        handle: ItemRef,
        asserted: bool,
        supported_by: &[Justification],
    ) -> KbResult<()> {
        if !asserted && supported_by.is_empty() {
            return inconsistent(format!("{handle} is neither asserted nor supported"));
        }
        for justification in supported_by {
            let fact_links = self
                .facts
                .get(&justification.fact)
                .map(|f| (&f.supports_facts, &f.supports_rules));
            let rule_links = self
                .rules
                .get(&justification.rule)
                .map(|r| (&r.supports_facts, &r.supports_rules));
            for (producer, links) in [
                (ItemRef::Fact(justification.fact), fact_links),
                (ItemRef::Rule(justification.rule), rule_links),
            ] {
                let Some((facts, rules)) = links else {
                    return inconsistent(format!("{handle} is supported by missing {producer}"));
                };
                let linked = match handle {
                    ItemRef::Fact(id) => facts.contains(&id),
                    ItemRef::Rule(id) => rules.contains(&id),
                };
                if !linked {
                    return inconsistent(format!("{producer} does not list dependent {handle}"));
                }
            }
        }
        Ok(())
    }

    fn check_back_links(&self, producer: ItemRef, facts: &[FactId], rules: &[RuleId]) -> KbResult<()> {
        let dependents = facts
            .iter()
            .map(|&id| (ItemRef::Fact(id), self.facts.get(&id).map(|f| &f.supported_by)))
            .chain(
                rules
                    .iter()
                    .map(|&id| (ItemRef::Rule(id), self.rules.get(&id).map(|r| &r.supported_by))),
            );
        for (dependent, supported_by) in dependents {
            let Some(supported_by) = supported_by else {
                return inconsistent(format!("{producer} lists missing dependent {dependent}"));
            };
            if !supported_by.iter().any(|j| involves(j, producer)) {
                return inconsistent(format!(
                    "{producer} lists {dependent}, which it does not support"
                ));
            }
        }
        Ok(())
    }
}

fn inconsistent(message: String) -> KbResult<()> {
    Err(StoreError::Inconsistent { message }.into())
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::new(KbConfig::default())
    }
}

impl fmt::Display for KnowledgeBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Knowledge Base:")?;
        for fact in self.facts.values() {
            writeln!(f, "{fact}")?;
        }
        for rule in self.rules.values() {
            writeln!(f, "{rule}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KbError;

    fn st(pred: &str, tokens: &[&str]) -> Statement {
        Statement::from_tokens(pred, tokens)
    }

    fn fact(pred: &str, tokens: &[&str]) -> Item {
        Item::Fact(Fact::new(st(pred, tokens)))
    }

    fn rule(lhs: Vec<Statement>, rhs: Statement) -> Item {
        Item::Rule(Rule::new(lhs, rhs))
    }

    fn fact_id(kb: &KnowledgeBase, pred: &str, tokens: &[&str]) -> FactId {
        kb.find_fact(&st(pred, tokens)).unwrap()
    }

    #[test]
    fn empty_kb() {
        let kb = KnowledgeBase::default();
        assert!(kb.is_empty());
        assert!(kb.ask(&fact("P", &["?x"])).unwrap().is_empty());
        kb.validate().unwrap();
    }

    #[test]
    fn duplicate_assertion_keeps_one_entry() {
        let mut kb = KnowledgeBase::default();
        let a = kb.assert(fact("P", &["a"])).unwrap();
        let b = kb.assert(fact("P", &["a"])).unwrap();
        assert_eq!(a, b);
        assert_eq!(kb.fact_count(), 1);
        kb.validate().unwrap();
    }

    #[test]
    fn asserting_a_derived_fact_marks_it_asserted() {
        let mut kb = KnowledgeBase::default();
        kb.assert(fact("P", &["a"])).unwrap();
        kb.assert(rule(vec![st("P", &["?x"])], st("Q", &["?x"]))).unwrap();

        let q = fact_id(&kb, "Q", &["a"]);
        assert!(!kb.fact(q).unwrap().is_asserted());

        assert_eq!(kb.assert(fact("Q", &["a"])).unwrap(), ItemRef::Fact(q));
        let stored = kb.fact(q).unwrap();
        assert!(stored.is_asserted());
        assert_eq!(stored.supported_by().len(), 1);
        kb.validate().unwrap();
    }

    #[test]
    fn second_derivation_merges_support() {
        let mut kb = KnowledgeBase::default();
        kb.assert(fact("P", &["a"])).unwrap();
        kb.assert(fact("S", &["a"])).unwrap();
        kb.assert(rule(vec![st("P", &["?x"])], st("Q", &["?x"]))).unwrap();
        kb.assert(rule(vec![st("S", &["?x"])], st("Q", &["?x"]))).unwrap();

        let q = fact_id(&kb, "Q", &["a"]);
        assert_eq!(kb.fact(q).unwrap().supported_by().len(), 2);
        assert_eq!(kb.fact_count(), 3);
        kb.validate().unwrap();
    }

    #[test]
    fn repeated_justification_pair_follows_dedup_setting() {
        for (dedup_support, expected) in [(true, 1), (false, 2)] {
            let mut kb = KnowledgeBase::new(KbConfig {
                dedup_support,
                ..KbConfig::default()
            });
            kb.assert(fact("P", &["a"])).unwrap();
            kb.assert(rule(vec![st("P", &["?x"])], st("Q", &["?x"]))).unwrap();

            let p = fact_id(&kb, "P", &["a"]);
            let q = fact_id(&kb, "Q", &["a"]);
            let existing = kb.fact(q).unwrap().supported_by()[0];

            let handle = kb.add(Fact::derived(st("Q", &["a"]), existing)).unwrap();
            assert_eq!(handle, ItemRef::Fact(q));
            assert_eq!(kb.fact(q).unwrap().supported_by().len(), expected);
            assert_eq!(kb.fact(p).unwrap().supports_facts(), &[q]);
            kb.validate().unwrap();

            let result = kb.retract(&fact("P", &["a"])).unwrap();
            assert_eq!(result.removed, vec![ItemRef::Fact(p), ItemRef::Fact(q)]);
            assert!(kb.fact(q).is_none());
            kb.validate().unwrap();
        }
    }

    #[test]
    fn rule_before_fact_and_fact_before_rule_agree() {
        let mut first = KnowledgeBase::default();
        first.assert(fact("P", &["a"])).unwrap();
        first.assert(rule(vec![st("P", &["?x"])], st("Q", &["?x"]))).unwrap();

        let mut second = KnowledgeBase::default();
        second.assert(rule(vec![st("P", &["?x"])], st("Q", &["?x"]))).unwrap();
        second.assert(fact("P", &["a"])).unwrap();

        for kb in [&first, &second] {
            assert!(kb.find_fact(&st("Q", &["a"])).is_some());
            assert_eq!(kb.fact_count(), 2);
            kb.validate().unwrap();
        }
    }

    #[test]
    fn ask_returns_bindings_in_insertion_order() {
        let mut kb = KnowledgeBase::default();
        kb.assert(fact("isa", &["cube", "block"])).unwrap();
        kb.assert(fact("isa", &["pyramid", "block"])).unwrap();
        kb.assert(fact("color", &["cube", "red"])).unwrap();

        let answers = kb.ask(&fact("isa", &["?x", "block"])).unwrap();
        let rendered: Vec<String> = answers.iter().map(|a| a.bindings.to_string()).collect();
        assert_eq!(rendered, vec!["?x : cube", "?x : pyramid"]);
        assert_eq!(answers[0].facts, vec![fact_id(&kb, "isa", &["cube", "block"])]);
    }

    #[test]
    fn ask_with_rule_is_invalid() {
        let mut kb = KnowledgeBase::default();
        kb.assert(fact("P", &["a"])).unwrap();
        let query = rule(vec![st("P", &["?x"])], st("Q", &["?x"]));

        let err = kb.ask(&query).unwrap_err();
        assert!(matches!(err, KbError::Store(StoreError::InvalidQuery { .. })));
        assert!(kb.ask_or_empty(&query).is_empty());
    }

    #[test]
    fn retract_missing_item_is_not_found() {
        let mut kb = KnowledgeBase::default();
        kb.assert(fact("P", &["a"])).unwrap();
        let err = kb.retract(&fact("P", &["b"])).unwrap_err();
        assert!(matches!(err, KbError::Store(StoreError::NotFound { .. })));
        assert_eq!(kb.fact_count(), 1);
    }

    #[test]
    fn retract_supported_fact_only_withdraws_assertion() {
        let mut kb = KnowledgeBase::default();
        kb.assert(fact("P", &["a"])).unwrap();
        kb.assert(rule(vec![st("P", &["?x"])], st("Q", &["?x"]))).unwrap();
        kb.assert(fact("Q", &["a"])).unwrap();

        let result = kb.retract(&fact("Q", &["a"])).unwrap();
        assert!(result.unasserted);
        assert!(result.removed.is_empty());

        let q = fact_id(&kb, "Q", &["a"]);
        assert!(!kb.fact(q).unwrap().is_asserted());
        kb.validate().unwrap();

        // Now retracting the premise removes the no-longer-asserted conclusion.
        let result = kb.retract(&fact("P", &["a"])).unwrap();
        assert_eq!(result.removed_facts.len(), 2);
        assert!(kb.find_fact(&st("Q", &["a"])).is_none());
        kb.validate().unwrap();
    }

    #[test]
    fn retract_asserted_rule_is_denied() {
        let mut kb = KnowledgeBase::default();
        kb.assert(fact("P", &["a"])).unwrap();
        let r = rule(vec![st("P", &["?x"])], st("Q", &["?x"]));
        kb.assert(r.clone()).unwrap();

        let err = kb.retract(&r).unwrap_err();
        assert!(matches!(
            err,
            KbError::Store(StoreError::AssertedRuleRetractionDenied { .. })
        ));
        assert_eq!(kb.rule_count(), 1);
        assert_eq!(kb.fact_count(), 2);
    }

    #[test]
    fn retract_supported_derived_rule_is_denied() {
        let mut kb = KnowledgeBase::default();
        kb.assert(fact("P", &["a"])).unwrap();
        kb.assert(rule(
            vec![st("P", &["?x"]), st("Q", &["?x"])],
            st("R", &["?x"]),
        ))
        .unwrap();

        let derived = rule(vec![st("Q", &["a"])], st("R", &["a"]));
        let err = kb.retract(&derived).unwrap_err();
        assert!(matches!(
            err,
            KbError::Store(StoreError::StillSupported { supports: 1, .. })
        ));
        assert!(kb.contains(&derived));
    }

    #[test]
    fn retracting_premise_removes_derived_rule_and_its_facts() {
        let mut kb = KnowledgeBase::default();
        kb.assert(fact("P", &["a"])).unwrap();
        kb.assert(rule(
            vec![st("P", &["?x"]), st("Q", &["?x"])],
            st("R", &["?x"]),
        ))
        .unwrap();
        kb.assert(fact("Q", &["a"])).unwrap();
        assert!(kb.find_fact(&st("R", &["a"])).is_some());

        let result = kb.retract(&fact("P", &["a"])).unwrap();
        assert_eq!(result.removed.len(), 3);
        assert_eq!(result.removed_rules.len(), 1);
        assert_eq!(result.cascade_depth, 2);
        assert!(kb.find_fact(&st("R", &["a"])).is_none());
        assert!(kb.find_fact(&st("Q", &["a"])).is_some());
        assert_eq!(kb.rule_count(), 1);
        kb.validate().unwrap();
    }

    #[test]
    fn alternative_justification_survives() {
        let mut kb = KnowledgeBase::default();
        kb.assert(fact("P", &["a"])).unwrap();
        kb.assert(fact("S", &["a"])).unwrap();
        kb.assert(rule(vec![st("P", &["?x"])], st("Q", &["?x"]))).unwrap();
        kb.assert(rule(vec![st("S", &["?x"])], st("Q", &["?x"]))).unwrap();

        let result = kb.retract(&fact("P", &["a"])).unwrap();
        assert_eq!(result.removed.len(), 1);

        let q = fact_id(&kb, "Q", &["a"]);
        let s = fact_id(&kb, "S", &["a"]);
        assert_eq!(kb.fact(q).unwrap().supported_by().len(), 1);
        assert_eq!(kb.fact(q).unwrap().supported_by()[0].fact, s);
        kb.validate().unwrap();
    }

    #[test]
    fn partner_back_link_kept_while_another_pair_uses_it() {
        // Q(a) is justified twice through the same rule.
        let mut kb = KnowledgeBase::default();
        kb.assert(fact("P", &["a", "b"])).unwrap();
        kb.assert(fact("P", &["a", "c"])).unwrap();
        kb.assert(rule(vec![st("P", &["?x", "?y"])], st("Q", &["?x"]))).unwrap();

        let q = fact_id(&kb, "Q", &["a"]);
        let rule_id = kb.rules().next().unwrap().0;
        assert_eq!(kb.fact(q).unwrap().supported_by().len(), 2);

        kb.retract(&fact("P", &["a", "b"])).unwrap();
        assert_eq!(kb.fact(q).unwrap().supported_by().len(), 1);
        assert!(kb.rule(rule_id).unwrap().supports_facts().contains(&q));
        kb.validate().unwrap();
    }

    #[test]
    fn self_supporting_fact_is_only_unasserted() {
        let mut kb = KnowledgeBase::default();
        kb.assert(fact("P", &["a"])).unwrap();
        kb.assert(rule(vec![st("P", &["?x"])], st("P", &["?x"]))).unwrap();

        let p = fact_id(&kb, "P", &["a"]);
        assert!(kb.fact(p).unwrap().supports_facts().contains(&p));

        let result = kb.retract(&fact("P", &["a"])).unwrap();
        assert!(result.unasserted);
        assert!(kb.fact(p).is_some());
        kb.validate().unwrap();
    }

    #[test]
    fn retracting_unsupported_asserted_fact_removes_it() {
        let mut kb = KnowledgeBase::default();
        kb.assert(fact("P", &["a"])).unwrap();
        let result = kb.retract(&fact("P", &["a"])).unwrap();
        assert_eq!(result.removed.len(), 1);
        assert!(kb.is_empty());
    }

    #[test]
    fn asserted_dependent_outlives_its_support() {
        let mut kb = KnowledgeBase::default();
        kb.assert(fact("P", &["a"])).unwrap();
        kb.assert(rule(vec![st("P", &["?x"])], st("Q", &["?x"]))).unwrap();
        kb.assert(fact("Q", &["a"])).unwrap();

        let result = kb.retract(&fact("P", &["a"])).unwrap();
        assert_eq!(result.removed.len(), 1);
        let q = fact_id(&kb, "Q", &["a"]);
        let stored = kb.fact(q).unwrap();
        assert!(stored.is_asserted());
        assert!(!stored.is_supported());
        kb.validate().unwrap();
    }

    #[test]
    fn retract_by_stale_id_is_not_found() {
        let mut kb = KnowledgeBase::default();
        let ItemRef::Fact(id) = kb.assert(fact("P", &["a"])).unwrap() else {
            panic!("expected a fact handle");
        };
        kb.retract_fact(id).unwrap();
        assert!(matches!(
            kb.retract_fact(id).unwrap_err(),
            KbError::Store(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn reasserting_after_retraction_gets_a_fresh_id() {
        let mut kb = KnowledgeBase::default();
        let first = kb.assert(fact("P", &["a"])).unwrap();
        kb.retract(&fact("P", &["a"])).unwrap();
        let second = kb.assert(fact("P", &["a"])).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn display_lists_facts_then_rules() {
        let mut kb = KnowledgeBase::default();
        kb.assert(rule(vec![st("P", &["?x"])], st("Q", &["?x"]))).unwrap();
        kb.assert(fact("P", &["a"])).unwrap();
        let text = kb.to_string();
        assert_eq!(
            text,
            "Knowledge Base:\n\
             fact: (P a) ASSERTED\n\
             fact: (Q a)\n\
             rule: ((P ?x)) -> (Q ?x) ASSERTED\n"
        );
    }
}

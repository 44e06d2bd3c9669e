//! Matching and instantiation over statements.
//!
//! Terms are flat (no nested function terms), so matching is a single pass
//! over argument pairs with consistent variable binding on either side.

use crate::statement::{Bindings, Statement, Term};

/// Match two statements, returning the bindings that make them equal.
///
/// Fails on a predicate or arity mismatch. A variable on the left binds to the
/// right-hand term; otherwise a variable on the right binds to the left-hand
/// term; otherwise both constants must be equal. Two ground, equal statements
/// match with empty bindings.
pub fn match_statements(left: &Statement, right: &Statement) -> Option<Bindings> {
    if left.predicate != right.predicate || left.terms.len() != right.terms.len() {
        return None;
    }

    let mut bindings = Bindings::new();
    for (l, r) in left.terms.iter().zip(&right.terms) {
        let ok = match (l, r) {
            (Term::Variable(var), value) => bindings.test_and_bind(var, value),
            (value, Term::Variable(var)) => bindings.test_and_bind(var, value),
            (Term::Constant(a), Term::Constant(b)) => a == b,
        };
        if !ok {
            return None;
        }
    }
    Some(bindings)
}

/// Apply `bindings` to `statement`. Unbound variables are left in place.
pub fn instantiate(statement: &Statement, bindings: &Bindings) -> Statement {
    let terms = statement
        .terms
        .iter()
        .map(|term| match term {
            Term::Variable(var) => bindings.bound_to(var).cloned().unwrap_or_else(|| term.clone()),
            Term::Constant(_) => term.clone(),
        })
        .collect();
    Statement {
        predicate: statement.predicate.clone(),
        terms,
    }
}

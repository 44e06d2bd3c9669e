//! Text format for facts, rules and queries.
//!
//! ```text
//! # blocks world
//! fact: (isa cube block)
//! rule: ((isa ?x ?y) (isa ?y ?z)) -> (isa ?x ?z)
//! ```
//!
//! A bare statement such as `(isa ?x block)` is read as a fact, which is the
//! usual way to write a query.

use std::path::Path;

use crate::error::{KbResult, ParseError};
use crate::item::{Fact, Item, Rule};
use crate::statement::{Statement, Term};

/// Parse a single statement, e.g. `(isa ?x block)`.
pub fn parse_statement(src: &str) -> KbResult<Statement> {
    statement(src).map_err(|message| syntax(1, message))
}

/// Parse one `fact:` / `rule:` line or a bare statement.
pub fn parse_item(src: &str) -> KbResult<Item> {
    item(src.trim()).map_err(|message| syntax(1, message))
}

/// Parse a multi-line source. Blank lines and lines starting with `#` are skipped.
pub fn parse_items(src: &str) -> KbResult<Vec<Item>> {
    let mut items = Vec::new();
    for (index, line) in src.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        items.push(item(line).map_err(|message| syntax(index + 1, message))?);
    }
    Ok(items)
}

/// Read and parse a knowledge file.
pub fn read_items(path: &Path) -> KbResult<Vec<Item>> {
    let content = std::fs::read_to_string(path).map_err(|e| ParseError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_items(&content)
}

fn syntax(line: usize, message: String) -> crate::error::KbError {
    ParseError::Syntax { line, message }.into()
}

fn item(line: &str) -> Result<Item, String> {
    if let Some(body) = line.strip_prefix("fact:") {
        return statement(body).map(|s| Item::Fact(Fact::new(s)));
    }
    if let Some(body) = line.strip_prefix("rule:") {
        let (lhs, rhs) = body
            .split_once("->")
            .ok_or_else(|| format!("rule is missing `->`: '{}'", body.trim()))?;
        let lhs = statement_list(lhs)?;
        let rhs = statement(rhs)?;
        return Ok(Item::Rule(Rule::new(lhs, rhs)));
    }
    if line.starts_with('(') {
        return statement(line).map(|s| Item::Fact(Fact::new(s)));
    }
    Err(format!("expected `fact:` or `rule:`, got '{line}'"))
}

fn strip_parens(src: &str) -> Result<&str, String> {
    let src = src.trim();
    src.strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| format!("expected parenthesized form, got '{src}'"))
}

fn statement(src: &str) -> Result<Statement, String> {
    let inner = strip_parens(src)?;
    if inner.contains(['(', ')']) {
        return Err(format!("nested terms are not supported: '{}'", src.trim()));
    }

    let mut tokens = inner.split_whitespace();
    let predicate = tokens
        .next()
        .ok_or_else(|| "empty statement".to_string())?;
    if Term::parse(predicate).is_variable() {
        return Err(format!("predicate cannot be a variable: '{predicate}'"));
    }
    if tokens.clone().any(|t| t == "?") {
        return Err(format!("unnamed variable in '{}'", src.trim()));
    }
    Ok(Statement::new(predicate, tokens.map(Term::parse).collect()))
}

fn statement_list(src: &str) -> Result<Vec<Statement>, String> {
    let inner = strip_parens(src)?;

    let mut statements = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (pos, ch) in inner.char_indices() {
        match ch {
            '(' => {
                if depth == 0 {
                    start = pos;
                }
                depth += 1;
            }
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| format!("unbalanced parentheses in '{}'", src.trim()))?;
                if depth == 0 {
                    statements.push(statement(&inner[start..=pos])?);
                }
            }
            c if depth == 0 && !c.is_whitespace() => {
                return Err(format!("unexpected '{c}' between antecedents"));
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(format!("unbalanced parentheses in '{}'", src.trim()));
    }
    if statements.is_empty() {
        return Err("rule needs at least one antecedent".to_string());
    }
    Ok(statements)
}

// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # chainkb
//!
//! A forward-chaining rule engine with dependency-directed retraction.
//!
//! ## Architecture
//!
//! - **Statements** (`statement`, `unify`): flat logical terms, matching and instantiation
//! - **Items** (`item`): facts and rules carrying justification metadata
//! - **Knowledge base** (`kb`): arena store, add/assert/ask/retract, support graph
//! - **Inference** (`infer`): the single peel-one-antecedent chaining step
//! - **Text format** (`parse`): `fact:` / `rule:` lines and queries
//!
//! ## Library usage
//!
//! ```
//! use chainkb::kb::KnowledgeBase;
//! use chainkb::parse::parse_item;
//!
//! let mut kb = KnowledgeBase::default();
//! kb.assert(parse_item("fact: (isa cube block)").unwrap()).unwrap();
//! kb.assert(parse_item("rule: ((isa ?x block)) -> (solid ?x)").unwrap()).unwrap();
//!
//! let answers = kb.ask(&parse_item("(solid ?what)").unwrap()).unwrap();
//! assert_eq!(answers[0].bindings.to_string(), "?what : cube");
//!
//! kb.retract(&parse_item("fact: (isa cube block)").unwrap()).unwrap();
//! assert!(kb.ask(&parse_item("(solid ?what)").unwrap()).unwrap().is_empty());
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod id;
pub mod infer;
pub mod item;
pub mod kb;
pub mod parse;
pub mod statement;
pub mod unify;

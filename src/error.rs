//! Rich diagnostic error types for the chainkb engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains. None of these conditions
//! are fatal: a knowledge-base operation that fails leaves the store untouched.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the chainkb engine.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum KbError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Id(#[from] IdError),
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

/// Conditions reported by `ask` and `retract`. The store is unchanged when
/// one of these is returned.
#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("invalid query: {query}")]
    #[diagnostic(
        code(chainkb::kb::invalid_query),
        help(
            "Only facts can be asked. Pass a fact or a bare statement such as \
             `(isa ?x block)`, not a rule."
        )
    )]
    InvalidQuery { query: String },

    #[error("not found in knowledge base: {item}")]
    #[diagnostic(
        code(chainkb::kb::not_found),
        help("The item was never asserted or has already been retracted. No action taken.")
    )]
    NotFound { item: String },

    #[error("cannot retract asserted rule: {rule}")]
    #[diagnostic(
        code(chainkb::kb::asserted_rule),
        help("Asserted rules are durable axioms and are never removed by retraction.")
    )]
    AssertedRuleRetractionDenied { rule: String },

    #[error("rule is still supported by {supports} justification(s): {rule}")]
    #[diagnostic(
        code(chainkb::kb::still_supported),
        help(
            "A derived rule disappears on its own once every fact or rule it was \
             derived from is retracted. Retract those instead."
        )
    )]
    StillSupported { rule: String, supports: usize },

    #[error("knowledge base invariant violated: {message}")]
    #[diagnostic(
        code(chainkb::kb::inconsistent),
        help("The support graph is out of sync. This is a bug; please file a report.")
    )]
    Inconsistent { message: String },
}

// ---------------------------------------------------------------------------
// Parse errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    #[error("line {line}: {message}")]
    #[diagnostic(
        code(chainkb::parse::syntax),
        help(
            "Expected `fact: (pred arg ...)` or `rule: ((pred ?x ...) ...) -> (pred ?x ...)`. \
             Variables start with `?`."
        )
    )]
    Syntax { line: usize, message: String },

    #[error("failed to read {path}: {source}")]
    #[diagnostic(
        code(chainkb::parse::io),
        help("Check that the knowledge file exists and is readable.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    #[diagnostic(
        code(chainkb::config::read),
        help("Check that the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write config {path}: {source}")]
    #[diagnostic(
        code(chainkb::config::write),
        help("Check that the target directory exists and is writable.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {message}")]
    #[diagnostic(
        code(chainkb::config::parse),
        help("The config must be TOML with `verbosity` and `dedup_support` keys.")
    )]
    Parse { path: String, message: String },
}

// ---------------------------------------------------------------------------
// Id errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum IdError {
    #[error("item id allocator exhausted: cannot allocate more than u64::MAX items")]
    #[diagnostic(
        code(chainkb::id::exhausted),
        help("The id space is exhausted. Check for a derivation loop producing unbounded items.")
    )]
    AllocatorExhausted,
}

/// Convenience alias for functions returning chainkb results.
pub type KbResult<T> = std::result::Result<T, KbError>;

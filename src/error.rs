//! Rich diagnostic error types for the conref engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text so callers can tell a reasoner failure
//! from a malformed input file.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for conref.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum CreError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Ontology(#[from] OntologyError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Concept(#[from] ConceptError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Expression(#[from] ExpressionError),
}

// ---------------------------------------------------------------------------
// Oracle errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum OracleError {
    #[error("reasoner query failed: {query}: {message}")]
    #[diagnostic(
        code(conref::oracle::query_failed),
        help(
            "The reasoning oracle could not answer an entailment question. \
             The retrieval was aborted; no partial result is returned. \
             Check that the ontology is consistent and inside Horn-ALC."
        )
    )]
    QueryFailed { query: String, message: String },

    #[error("classification of {atoms} placeholder concepts failed: {message}")]
    #[diagnostic(
        code(conref::oracle::classification_failed),
        help(
            "Bulk classification is only an optimization. Hierarchy sorting \
             falls back to the unsorted restriction set when it fails."
        )
    )]
    ClassificationFailed { atoms: usize, message: String },
}

// ---------------------------------------------------------------------------
// Ontology errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum OntologyError {
    #[error("failed to read ontology file: {path}")]
    #[diagnostic(
        code(conref::ontology::read),
        help("Check that the file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse ontology file {path}: {message}")]
    #[diagnostic(
        code(conref::ontology::parse),
        help(
            "Ontology files are JSON objects with optional `individuals`, \
             `subclass_of`, `equivalent`, `concept_assertions` and \
             `role_assertions` arrays. Concepts are written as strings, \
             e.g. \"A ⊓ ∃R.B\" or \"A and some R.B\"."
        )
    )]
    Parse { path: String, message: String },

    #[error("unknown individual: \"{name}\"")]
    #[diagnostic(
        code(conref::ontology::unknown_individual),
        help("The individual does not occur in any assertion or declaration of the ontology.")
    )]
    UnknownIndividual { name: String },
}

// ---------------------------------------------------------------------------
// Concept syntax errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConceptError {
    #[error("invalid concept expression at offset {offset}: {message}")]
    #[diagnostic(
        code(conref::concept::syntax),
        help(
            "Concepts use `⊤ ⊥ ¬ ⊓ ∃R. ∀R.` or the ASCII forms \
             `Top Bottom not and some R. all R.` with parentheses for grouping."
        )
    )]
    Syntax { offset: usize, message: String },
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config file: {path}")]
    #[diagnostic(
        code(conref::config::read),
        help("Check that the configuration file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {message}")]
    #[diagnostic(
        code(conref::config::parse),
        help(
            "Valid keys are `apply_sorting`, `bulk_threshold` and `collect_stats`. \
             Unknown keys are rejected."
        )
    )]
    Parse { path: String, message: String },
}

// ---------------------------------------------------------------------------
// Expression errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ExpressionError {
    #[error("malformed restriction: {message}")]
    #[diagnostic(
        code(conref::expression::malformed_restriction),
        help(
            "This is an internal invariant violation: every restriction in a \
             well-formed pool carries a role and a filler. Please report it."
        )
    )]
    MalformedRestriction { message: String },
}

/// Convenience result type for conref operations.
pub type CreResult<T> = std::result::Result<T, CreError>;

/// Result type for ontology loading.
pub type OntologyResult<T> = std::result::Result<T, OntologyError>;

/// Result type for configuration loading.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type for calls into a [`crate::oracle::Reasoner`].
pub type OracleResult<T> = std::result::Result<T, OracleError>;

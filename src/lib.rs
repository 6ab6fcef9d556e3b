// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # conref
//!
//! Instance retrieval over Horn-ALC knowledge bases answered with concept
//! referring expressions: concept descriptions that single out one
//! individual each, chained through inverse existential restrictions and
//! with explicitly marked cycles.
//!
//! ## Architecture
//!
//! - **Concepts** (`concept`): closed concept type with parser and renderer
//! - **Oracle** (`oracle`): the reasoner interface plus a told-axiom reasoner
//! - **Hierarchies** (`hierarchy`): petgraph-backed subsumption DAGs and their sorter
//! - **Restrictions** (`restriction`): collection of existential and universal restrictions
//! - **Profiles** (`profile`): most specific concepts of every individual
//! - **Construction** (`builder`, `expression`): the recursive expression builder
//! - **Retrieval** (`retrieval`): the entry point tying the stages together
//!
//! ## Library usage
//!
//! ```no_run
//! use conref::concept::Concept;
//! use conref::ontology::Ontology;
//! use conref::oracle::ToldReasoner;
//! use conref::retrieval::{RetrievalConfig, Retriever};
//!
//! let ontology = Ontology::load(std::path::Path::new("family.json")).unwrap();
//! let reasoner = ToldReasoner::new(&ontology);
//! let query: Concept = "Person ⊓ ∃hasChild.⊤".parse().unwrap();
//! let retriever = Retriever::new(RetrievalConfig::default());
//! for cre in retriever.retrieve(&ontology, &reasoner, &query).unwrap() {
//!     println!("{cre} ({} cycles)", cre.cycles());
//! }
//! ```

pub mod builder;
pub mod concept;
pub mod context;
pub mod error;
pub mod expression;
pub mod hierarchy;
pub mod ontology;
pub mod oracle;
pub mod profile;
pub mod restriction;
pub mod retrieval;

pub use error::{CreError, CreResult};
pub use expression::CompletedExpression;
pub use retrieval::{RetrievalConfig, Retriever};

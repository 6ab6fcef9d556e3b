//! In-memory ontology: terminological axioms plus assertions about individuals.
//!
//! The ontology is a plain value. It is loaded once, handed to an
//! [`crate::context::OntologyContext`] together with a reasoner, and cloned only
//! when bulk classification needs a throwaway copy of the TBox.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::concept::{Concept, Role};
use crate::error::{OntologyError, OntologyResult};

/// `sub ⊑ sup`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubClassOf {
    pub sub: Concept,
    pub sup: Concept,
}

/// `C₁ ≡ … ≡ Cₙ`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EquivalentClasses(pub Vec<Concept>);

/// `C(a)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptAssertion {
    pub individual: String,
    pub concept: Concept,
}

/// `R(subject, object)`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoleAssertion {
    pub role: Role,
    pub subject: String,
    pub object: String,
}

/// A Horn-ALC knowledge base.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Ontology {
    /// Declared individuals, in addition to those named by assertions.
    #[serde(default)]
    pub individuals: BTreeSet<String>,
    #[serde(default)]
    pub subclass_of: Vec<SubClassOf>,
    #[serde(default)]
    pub equivalent: Vec<EquivalentClasses>,
    #[serde(default)]
    pub concept_assertions: Vec<ConceptAssertion>,
    #[serde(default)]
    pub role_assertions: Vec<RoleAssertion>,
}

impl Ontology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an ontology from its JSON form.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load an ontology from a JSON file, or from TOML when the file ends in
    /// `.toml`.
    pub fn load(path: &Path) -> OntologyResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| OntologyError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let parsed = if path.extension().is_some_and(|ext| ext == "toml") {
            toml::from_str(&content).map_err(|e| e.to_string())
        } else {
            Self::from_json_str(&content).map_err(|e| e.to_string())
        };
        parsed.map_err(|message| OntologyError::Parse {
            path: path.display().to_string(),
            message,
        })
    }

    // -- building -----------------------------------------------------------

    pub fn declare_individual(&mut self, name: impl Into<String>) -> &mut Self {
        self.individuals.insert(name.into());
        self
    }

    pub fn add_subclass(&mut self, sub: Concept, sup: Concept) -> &mut Self {
        self.subclass_of.push(SubClassOf { sub, sup });
        self
    }

    pub fn add_equivalent(&mut self, left: Concept, right: Concept) -> &mut Self {
        self.equivalent.push(EquivalentClasses(vec![left, right]));
        self
    }

    pub fn assert_concept(&mut self, individual: impl Into<String>, concept: Concept) -> &mut Self {
        self.concept_assertions.push(ConceptAssertion {
            individual: individual.into(),
            concept,
        });
        self
    }

    pub fn assert_role(
        &mut self,
        role: impl Into<Role>,
        subject: impl Into<String>,
        object: impl Into<String>,
    ) -> &mut Self {
        self.role_assertions.push(RoleAssertion {
            role: role.into(),
            subject: subject.into(),
            object: object.into(),
        });
        self
    }

    // -- access -------------------------------------------------------------

    /// Every individual: declared or mentioned by an assertion.
    pub fn individuals(&self) -> BTreeSet<String> {
        let mut all = self.individuals.clone();
        all.extend(self.concept_assertions.iter().map(|a| a.individual.clone()));
        for assertion in &self.role_assertions {
            all.insert(assertion.subject.clone());
            all.insert(assertion.object.clone());
        }
        all
    }

    /// Concepts asserted for an individual.
    pub fn concepts_of<'a>(&'a self, individual: &'a str) -> impl Iterator<Item = &'a Concept> + 'a {
        self.concept_assertions
            .iter()
            .filter(move |a| a.individual == individual)
            .map(|a| &a.concept)
    }

    /// Role assertions with `individual` as subject.
    pub fn roles_from<'a>(&'a self, individual: &'a str) -> impl Iterator<Item = &'a RoleAssertion> + 'a {
        self.role_assertions
            .iter()
            .filter(move |a| a.subject == individual)
    }

    /// Role assertions with `individual` as object.
    pub fn roles_to<'a>(&'a self, individual: &'a str) -> impl Iterator<Item = &'a RoleAssertion> + 'a {
        self.role_assertions.iter().filter(move |a| a.object == individual)
    }

    /// Every subsumption stated by the TBox, with each equivalence expanded
    /// into subsumptions in both directions between neighbouring members.
    pub fn subsumptions(&self) -> Vec<(Concept, Concept)> {
        let mut pairs: Vec<(Concept, Concept)> = self
            .subclass_of
            .iter()
            .map(|ax| (ax.sub.clone(), ax.sup.clone()))
            .collect();
        for EquivalentClasses(members) in &self.equivalent {
            for window in members.windows(2) {
                pairs.push((window[0].clone(), window[1].clone()));
                pairs.push((window[1].clone(), window[0].clone()));
            }
        }
        pairs
    }

    /// Atomic concept names used anywhere in the ontology.
    pub fn concept_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        for (sub, sup) in self.subsumptions() {
            sub.collect_atomic_names(&mut names);
            sup.collect_atomic_names(&mut names);
        }
        for assertion in &self.concept_assertions {
            assertion.concept.collect_atomic_names(&mut names);
        }
        names
    }

    /// Role names used anywhere in the ontology.
    pub fn role_names(&self) -> BTreeSet<Role> {
        let mut roles: BTreeSet<Role> = self.role_assertions.iter().map(|a| a.role.clone()).collect();
        for (sub, sup) in self.subsumptions() {
            sub.collect_roles(&mut roles);
            sup.collect_roles(&mut roles);
        }
        for assertion in &self.concept_assertions {
            assertion.concept.collect_roles(&mut roles);
        }
        roles
    }

    /// A copy carrying only the terminological axioms.
    pub fn tbox(&self) -> Ontology {
        Ontology {
            subclass_of: self.subclass_of.clone(),
            equivalent: self.equivalent.clone(),
            ..Ontology::default()
        }
    }

    /// Rewrite every concept of every terminological axiom.
    pub fn map_tbox(&mut self, rewrite: impl Fn(&Concept) -> Concept) {
        for ax in &mut self.subclass_of {
            ax.sub = rewrite(&ax.sub);
            ax.sup = rewrite(&ax.sup);
        }
        for EquivalentClasses(members) in &mut self.equivalent {
            for member in members.iter_mut() {
                *member = rewrite(member);
            }
        }
    }
}

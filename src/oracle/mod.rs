//! The reasoning oracle.
//!
//! The engine never proves entailments itself. Every semantic question goes
//! through [`Reasoner`]: subsumption, equivalence, instance checks and, for bulk
//! hierarchy sorting, classification of a set of atomic concepts.

pub mod told;

use std::collections::{BTreeMap, BTreeSet};

use crate::concept::Concept;
use crate::error::OracleResult;
use crate::ontology::Ontology;

pub use told::ToldReasoner;

/// Entailment oracle over a fixed ontology.
///
/// Calls are treated as blocking, side-effect free and idempotent. A failing
/// call should name the query in [`crate::error::OracleError::QueryFailed`].
pub trait Reasoner {
    /// Is `sub ⊑ sup` entailed?
    fn is_subclass(&self, sub: &Concept, sup: &Concept) -> OracleResult<bool>;

    /// Is `left ≡ right` entailed?
    fn is_equivalent(&self, left: &Concept, right: &Concept) -> OracleResult<bool> {
        Ok(self.is_subclass(left, right)? && self.is_subclass(right, left)?)
    }

    /// Is `concept(individual)` entailed?
    fn is_instance(&self, concept: &Concept, individual: &str) -> OracleResult<bool>;

    /// Classify `atoms` with respect to `ontology`, which is usually a
    /// modified copy of the ontology the reasoner was built for.
    fn classify(&self, ontology: &Ontology, atoms: &BTreeSet<String>) -> OracleResult<ClassHierarchy>;
}

/// Result of classifying a set of atomic concepts: equivalence classes and the
/// direct-subclass relation between them, rooted at `⊤`.
#[derive(Debug, Clone, Default)]
pub struct ClassHierarchy {
    classes: Vec<BTreeSet<String>>,
    class_of: BTreeMap<String, usize>,
    top: BTreeSet<usize>,
    direct_subs: BTreeMap<usize, BTreeSet<usize>>,
}

impl ClassHierarchy {
    /// Build the hierarchy from a subsumption test between atom names.
    ///
    /// Runs the test on every ordered pair, groups mutually subsuming atoms and
    /// keeps only direct links.
    pub fn from_subsumption(
        atoms: &BTreeSet<String>,
        mut is_sub: impl FnMut(&str, &str) -> OracleResult<bool>,
    ) -> OracleResult<Self> {
        let atoms: Vec<&String> = atoms.iter().collect();
        let n = atoms.len();
        let mut sub = vec![vec![false; n]; n];
        for i in 0..n {
            for j in 0..n {
                sub[i][j] = i == j || is_sub(atoms[i], atoms[j])?;
            }
        }

        let mut hierarchy = ClassHierarchy::default();
        let mut reps = Vec::new();
        for i in 0..n {
            if let Some(&class) = (0..i)
                .find(|&j| sub[i][j] && sub[j][i])
                .and_then(|j| hierarchy.class_of.get(atoms[j]))
            {
                hierarchy.classes[class].insert(atoms[i].clone());
                hierarchy.class_of.insert(atoms[i].clone(), class);
                continue;
            }
            hierarchy.class_of.insert(atoms[i].clone(), hierarchy.classes.len());
            hierarchy.classes.push(BTreeSet::from([atoms[i].clone()]));
            reps.push(i);
        }

        let below = |x: usize, y: usize| sub[reps[x]][reps[y]] && !sub[reps[y]][reps[x]];
        let count = reps.len();
        for x in 0..count {
            let supers: Vec<usize> = (0..count).filter(|&y| below(x, y)).collect();
            let direct = supers
                .iter()
                .filter(|&&y| !supers.iter().any(|&z| below(z, y)))
                .copied();
            let mut has_super = false;
            for y in direct {
                has_super = true;
                hierarchy.direct_subs.entry(y).or_default().insert(x);
            }
            if !has_super {
                hierarchy.top.insert(x);
            }
        }
        Ok(hierarchy)
    }

    /// Equivalence classes directly below `⊤`.
    pub fn top_subclasses(&self) -> Vec<&BTreeSet<String>> {
        self.top.iter().map(|&c| &self.classes[c]).collect()
    }

    /// Equivalence classes directly below the class of `atom`.
    pub fn direct_subclasses(&self, atom: &str) -> Vec<&BTreeSet<String>> {
        self.class_of
            .get(atom)
            .and_then(|c| self.direct_subs.get(c))
            .map(|subs| subs.iter().map(|&c| &self.classes[c]).collect())
            .unwrap_or_default()
    }

    /// The atoms equivalent to `atom`, itself included.
    pub fn equivalents(&self, atom: &str) -> Option<&BTreeSet<String>> {
        self.class_of.get(atom).map(|&c| &self.classes[c])
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

//! The ontology context threaded through every stage of retrieval.
//!
//! Bundles the ontology with the reasoner built for it and layers the
//! derived oracle operations the engine needs on top: most-specific sets,
//! role-concept subsumption, and the conjunction of restriction fillers.

use std::cell::Cell;
use std::collections::BTreeSet;

use crate::concept::{Concept, ExistRestriction};
use crate::error::{CreResult, ExpressionError};
use crate::ontology::Ontology;
use crate::oracle::{ClassHierarchy, Reasoner};

pub struct OntologyContext<'a, R: Reasoner + ?Sized> {
    ontology: &'a Ontology,
    reasoner: &'a R,
    oracle_calls: Cell<usize>,
}

impl<'a, R: Reasoner + ?Sized> OntologyContext<'a, R> {
    pub fn new(ontology: &'a Ontology, reasoner: &'a R) -> Self {
        Self {
            ontology,
            reasoner,
            oracle_calls: Cell::new(0),
        }
    }

    pub fn ontology(&self) -> &'a Ontology {
        self.ontology
    }

    /// Number of reasoner calls issued through this context.
    pub fn oracle_calls(&self) -> usize {
        self.oracle_calls.get()
    }

    fn count(&self) {
        self.oracle_calls.set(self.oracle_calls.get() + 1);
    }

    // -- oracle surface -----------------------------------------------------

    pub fn is_subclass(&self, sub: &Concept, sup: &Concept) -> CreResult<bool> {
        self.count();
        let result = self.reasoner.is_subclass(sub, sup)?;
        tracing::trace!(%sub, %sup, result, "subsumption");
        Ok(result)
    }

    pub fn is_equivalent(&self, left: &Concept, right: &Concept) -> CreResult<bool> {
        self.count();
        Ok(self.reasoner.is_equivalent(left, right)?)
    }

    pub fn is_instance(&self, concept: &Concept, individual: &str) -> CreResult<bool> {
        self.count();
        let result = self.reasoner.is_instance(concept, individual)?;
        tracing::trace!(%concept, individual, result, "instance check");
        Ok(result)
    }

    pub fn classify(&self, ontology: &Ontology, atoms: &BTreeSet<String>) -> CreResult<ClassHierarchy> {
        self.count();
        Ok(self.reasoner.classify(ontology, atoms)?)
    }

    // -- derived operations -------------------------------------------------

    /// `∃R.C` is role-concept subsumed by `∃S.D` iff `R = S` and `C ⊑ D`.
    pub fn role_concept_subsumed(&self, sub: &ExistRestriction, sup: &ExistRestriction) -> CreResult<bool> {
        if sub.role != sup.role {
            return Ok(false);
        }
        self.is_subclass(&sub.filler, &sup.filler)
    }

    /// Insert `new` unless a member is at least as specific; evict members
    /// more general than `new`. Returns whether `new` was inserted.
    pub fn add_if_most_specific(&self, set: &mut BTreeSet<Concept>, new: Concept) -> CreResult<bool> {
        if set.contains(&new) {
            return Ok(false);
        }
        for existing in set.iter() {
            if self.is_subclass(existing, &new)? {
                return Ok(false);
            }
        }
        let mut evicted = Vec::new();
        for existing in set.iter() {
            if self.is_subclass(&new, existing)? {
                evicted.push(existing.clone());
            }
        }
        for concept in &evicted {
            set.remove(concept);
        }
        set.insert(new);
        Ok(true)
    }

    /// Append `new` unless some member is role-concept subsumed by it; members
    /// that `new` is role-concept subsumed by are dropped. Order of the
    /// remaining members is kept.
    pub fn add_exist_if_minimal(
        &self,
        list: &mut Vec<ExistRestriction>,
        new: ExistRestriction,
    ) -> CreResult<bool> {
        for existing in list.iter() {
            if self.role_concept_subsumed(existing, &new)? {
                return Ok(false);
            }
        }
        let mut kept = Vec::with_capacity(list.len() + 1);
        for existing in list.drain(..) {
            if !self.role_concept_subsumed(&new, &existing)? {
                kept.push(existing);
            }
        }
        kept.push(new);
        *list = kept;
        Ok(true)
    }

    /// Conjoin the conjuncts of `c` and of `d`, keeping only the most
    /// specific ones.
    pub fn most_specific_conjunction(&self, c: &Concept, d: Option<&Concept>) -> CreResult<Concept> {
        let mut conjuncts = BTreeSet::new();
        for conjunct in c.conjuncts().into_iter().chain(d.map(Concept::conjuncts).unwrap_or_default()) {
            self.add_if_most_specific(&mut conjuncts, conjunct.clone())?;
        }
        Ok(Concept::and(conjuncts))
    }

    /// Fuse `∃R.D` with the constraint `∀R.E` into `∃R.(D ⊓ E)`.
    pub fn combine_to_exist(
        &self,
        restriction: &ExistRestriction,
        constraint: Option<&Concept>,
    ) -> CreResult<ExistRestriction> {
        let filler = match constraint {
            None => None,
            Some(Concept::ForAll(role, filler)) if *role == restriction.role => Some(filler.as_ref()),
            Some(other) => {
                return Err(ExpressionError::MalformedRestriction {
                    message: format!("constraint {other} does not restrict role {}", restriction.role),
                }
                .into());
            }
        };
        Ok(ExistRestriction::new(
            restriction.role.clone(),
            self.most_specific_conjunction(&restriction.filler, filler)?,
        ))
    }

    /// False when `selected` already holds a restriction over the same role
    /// with an equivalent filler.
    pub fn has_no_equivalent(
        &self,
        new: &ExistRestriction,
        selected: &BTreeSet<ExistRestriction>,
    ) -> CreResult<bool> {
        for existing in selected.iter().filter(|e| e.role == new.role) {
            if self.is_equivalent(&existing.filler, &new.filler)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Does `individual` have an asserted `R`-successor already satisfying
    /// the filler of `restriction`?
    pub fn role_assertion_present(&self, restriction: &ExistRestriction, individual: &str) -> CreResult<bool> {
        for assertion in self
            .ontology
            .roles_from(individual)
            .filter(|a| a.role == restriction.role)
        {
            if self.is_instance(&restriction.filler, &assertion.object)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

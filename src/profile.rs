//! Most-specific concepts of every individual.
//!
//! Asserted types are combined with what incoming role assertions force
//! through universal restrictions, and with existential descriptions of
//! outgoing role assertions. Assertion chains are resolved by a fixpoint from
//! the individuals without successors; individuals left over sit on
//! assertion cycles and are described by the existentials they instantiate.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::concept::{Concept, Role};
use crate::context::OntologyContext;
use crate::error::CreResult;
use crate::hierarchy::{ConceptGraph, NodeId};
use crate::ontology::RoleAssertion;
use crate::oracle::Reasoner;
use crate::restriction::{RestrictionCollector, RestrictionPool};

/// Individual name to its most specific concepts.
pub type Profiles = BTreeMap<String, BTreeSet<Concept>>;

pub struct IndividualProfiler<'c, 'a, R: Reasoner + ?Sized> {
    ctx: &'c OntologyContext<'a, R>,
    pool: &'c RestrictionPool,
}

impl<'c, 'a, R: Reasoner + ?Sized> IndividualProfiler<'c, 'a, R> {
    pub fn new(ctx: &'c OntologyContext<'a, R>, pool: &'c RestrictionPool) -> Self {
        Self { ctx, pool }
    }

    pub fn profile(&self) -> CreResult<Profiles> {
        let ontology = self.ctx.ontology();
        let mut profiles = Profiles::new();
        for individual in ontology.individuals() {
            let concepts = self.local_concepts(&individual)?;
            profiles.insert(individual, concepts);
        }

        let mut pending: BTreeMap<String, BTreeSet<RoleAssertion>> = BTreeMap::new();
        for individual in profiles.keys() {
            let outgoing: BTreeSet<RoleAssertion> = ontology.roles_from(individual).cloned().collect();
            if !outgoing.is_empty() {
                pending.insert(individual.clone(), outgoing);
            }
        }

        self.resolve_chains(&mut profiles, &mut pending)?;

        if !pending.is_empty() {
            let candidates = RestrictionCollector::new(self.ctx).left_side_existentials();
            for (individual, assertions) in &pending {
                tracing::debug!(individual = %individual, pending = assertions.len(), "individual on an assertion cycle");
                let Some(concepts) = profiles.get_mut(individual) else {
                    continue;
                };
                for candidate in &candidates {
                    let concept = candidate.to_concept();
                    if self.ctx.is_instance(&concept, individual)? {
                        self.ctx.add_if_most_specific(concepts, concept)?;
                    }
                }
                let roles: BTreeSet<&Role> = assertions.iter().map(|a| &a.role).collect();
                for role in roles {
                    self.ctx
                        .add_if_most_specific(concepts, Concept::exists(role.clone(), Concept::Top))?;
                }
            }
        }
        Ok(profiles)
    }

    /// Asserted types plus fillers forced by incoming role assertions.
    fn local_concepts(&self, individual: &str) -> CreResult<BTreeSet<Concept>> {
        let ontology = self.ctx.ontology();
        let mut concepts = BTreeSet::new();
        for concept in ontology.concepts_of(individual) {
            self.ctx.add_if_most_specific(&mut concepts, concept.clone())?;
        }
        for assertion in ontology.roles_to(individual) {
            if let Some(fillers) = self.pool.univ(&assertion.role) {
                let mut seen = HashSet::new();
                self.forced_fillers(fillers, fillers.roots(), individual, &mut concepts, &mut seen)?;
            }
        }
        if concepts.is_empty() {
            concepts.insert(Concept::Top);
        }
        Ok(concepts)
    }

    /// Walk a universal filler hierarchy top down, keeping the most specific
    /// fillers `individual` is an instance of.
    fn forced_fillers(
        &self,
        fillers: &ConceptGraph<Concept>,
        ids: &[NodeId],
        individual: &str,
        concepts: &mut BTreeSet<Concept>,
        seen: &mut HashSet<NodeId>,
    ) -> CreResult<()> {
        for &id in ids {
            if !seen.insert(id) {
                continue;
            }
            let Some(filler) = fillers.oracle_concept(id) else {
                continue;
            };
            if !self.ctx.is_instance(&filler, individual)? {
                continue;
            }
            for concept in fillers.concepts(id) {
                self.ctx.add_if_most_specific(concepts, concept.clone())?;
            }
            self.forced_fillers(fillers, &fillers.subs(id), individual, concepts, seen)?;
        }
        Ok(())
    }

    /// Describe subjects by `∃R.(⊓ concepts(object))` once the object is
    /// finished, until no assertion can be resolved.
    fn resolve_chains(
        &self,
        profiles: &mut Profiles,
        pending: &mut BTreeMap<String, BTreeSet<RoleAssertion>>,
    ) -> CreResult<()> {
        let mut rounds = 0usize;
        loop {
            let mut changed = false;
            let subjects: Vec<String> = pending.keys().cloned().collect();
            for subject in subjects {
                let Some(assertions) = pending.get(&subject) else {
                    continue;
                };
                let ready: Vec<RoleAssertion> = assertions
                    .iter()
                    .filter(|a| !pending.contains_key(&a.object))
                    .cloned()
                    .collect();
                if ready.is_empty() {
                    continue;
                }
                for assertion in ready {
                    let filler = Concept::and(profiles.get(&assertion.object).cloned().unwrap_or_default());
                    let description = Concept::exists(assertion.role.clone(), filler);
                    if let Some(concepts) = profiles.get_mut(&subject) {
                        self.ctx.add_if_most_specific(concepts, description)?;
                    }
                    if let Some(assertions) = pending.get_mut(&subject) {
                        assertions.remove(&assertion);
                    }
                }
                if pending.get(&subject).is_some_and(BTreeSet::is_empty) {
                    pending.remove(&subject);
                }
                changed = true;
            }
            rounds += 1;
            if !changed {
                break;
            }
        }
        tracing::debug!(rounds, unresolved = pending.len(), "role assertion fixpoint");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ontology::Ontology;
    use crate::oracle::ToldReasoner;

    fn parse(text: &str) -> Concept {
        text.parse().unwrap()
    }

    fn set(items: &[&str]) -> BTreeSet<Concept> {
        items.iter().map(|s| parse(s)).collect()
    }

    fn profile(onto: &Ontology) -> Profiles {
        let reasoner = ToldReasoner::new(onto);
        let ctx = OntologyContext::new(onto, &reasoner);
        let mut pool = RestrictionCollector::new(&ctx).collect_ontology().unwrap();
        pool.sort(&ctx, 100).unwrap();
        IndividualProfiler::new(&ctx, &pool).profile().unwrap()
    }

    #[test]
    fn asserted_types_are_reduced_to_the_most_specific() {
        let mut onto = Ontology::new();
        onto.add_subclass(parse("A"), parse("B"))
            .assert_concept("a", parse("A"))
            .assert_concept("a", parse("B"))
            .assert_concept("a", parse("C"))
            .declare_individual("bare");
        let profiles = profile(&onto);
        assert_eq!(profiles["a"], set(&["A", "C"]));
        assert_eq!(profiles["bare"], set(&["⊤"]));
    }

    #[test]
    fn universal_restrictions_propagate_to_objects() {
        let mut onto = Ontology::new();
        onto.add_subclass(parse("P"), parse("∀R.C"))
            .add_subclass(parse("Q"), parse("∀R.D"))
            .add_subclass(parse("D"), parse("C"))
            .assert_concept("p", parse("P"))
            .assert_concept("q", parse("Q"))
            .assert_role("R", "p", "x")
            .assert_role("R", "q", "y");
        let profiles = profile(&onto);
        assert_eq!(profiles["x"], set(&["C"]));
        assert_eq!(profiles["y"], set(&["D"]));
    }

    #[test]
    fn chains_are_described_from_the_end() {
        let mut onto = Ontology::new();
        onto.assert_concept("a", parse("A"))
            .assert_concept("b", parse("B"))
            .assert_concept("c", parse("C"))
            .assert_role("R", "a", "b")
            .assert_role("S", "b", "c");
        let profiles = profile(&onto);
        assert_eq!(profiles["c"], set(&["C"]));
        assert_eq!(profiles["b"], set(&["B", "∃S.C"]));
        assert_eq!(profiles["a"], set(&["A", "∃R.(B ⊓ ∃S.C)"]));
    }

    #[test]
    fn cyclic_individuals_use_left_side_existentials() {
        let mut onto = Ontology::new();
        onto.add_subclass(parse("∃R.B"), parse("X"))
            .assert_concept("a", parse("A"))
            .assert_concept("b", parse("B"))
            .assert_role("R", "a", "b")
            .assert_role("R", "b", "a");
        let profiles = profile(&onto);
        // ∃R.B is instantiated by a; b only gets the bare role.
        assert_eq!(profiles["a"], set(&["A", "∃R.B"]));
        assert_eq!(profiles["b"], set(&["B", "∃R.⊤"]));
    }

    #[test]
    fn cyclic_role_is_dropped_when_already_entailed() {
        let mut onto = Ontology::new();
        onto.add_subclass(parse("A"), parse("∃R.B"))
            .add_subclass(parse("B"), parse("∃R.A"))
            .assert_concept("x", parse("A"))
            .assert_role("R", "x", "x");
        let profiles = profile(&onto);
        assert_eq!(profiles["x"], set(&["A"]));
    }
}

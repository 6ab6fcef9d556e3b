//! Pools of restrictions that may hold for individuals of the ontology.
//!
//! Existential restrictions form one hierarchy of `∃R.C` nodes. Universal
//! restrictions are kept per role as a hierarchy of their fillers.

mod collect;

use std::collections::BTreeMap;

use crate::concept::{Concept, ExistRestriction, Role};
use crate::context::OntologyContext;
use crate::error::CreResult;
use crate::hierarchy::{ConceptGraph, HierarchyConcept, HierarchySorter};
use crate::oracle::Reasoner;

pub use collect::RestrictionCollector;

#[derive(Debug, Clone, Default)]
pub struct RestrictionPool {
    exist: ConceptGraph<ExistRestriction>,
    univ: BTreeMap<Role, ConceptGraph<Concept>>,
}

impl RestrictionPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exist(&self) -> &ConceptGraph<ExistRestriction> {
        &self.exist
    }

    /// Hierarchy of fillers `C` of the universal restrictions `∀role.C`.
    pub fn univ(&self, role: &Role) -> Option<&ConceptGraph<Concept>> {
        self.univ.get(role)
    }

    pub fn univ_pools(&self) -> &BTreeMap<Role, ConceptGraph<Concept>> {
        &self.univ
    }

    pub fn contains_exist(&self, restriction: &ExistRestriction) -> bool {
        self.exist.contains(restriction)
    }

    pub fn contains_univ(&self, role: &Role, filler: &Concept) -> bool {
        self.univ.get(role).is_some_and(|pool| pool.contains(filler))
    }

    /// Add `∃R.C`. When a node with an equivalent restriction exists, the
    /// restriction joins that node instead of opening a new one.
    pub fn add_exist<R: Reasoner + ?Sized>(
        &mut self,
        ctx: &OntologyContext<'_, R>,
        restriction: ExistRestriction,
    ) -> CreResult<()> {
        if self.exist.contains(&restriction) {
            return Ok(());
        }
        let concept = restriction.to_concept();
        for id in self.exist.node_ids().collect::<Vec<_>>() {
            let Some(canonical) = self.exist.oracle_concept(id) else {
                continue;
            };
            if ctx.is_equivalent(&canonical, &concept)? {
                if let Some(concepts) = self.exist.concepts_mut(id) {
                    ExistRestriction::merge_equivalent(ctx, concepts, restriction)?;
                }
                return Ok(());
            }
        }
        self.exist.insert(restriction);
        Ok(())
    }

    /// Add `∀role.filler`.
    pub fn add_univ(&mut self, role: Role, filler: Concept) {
        let pool = self.univ.entry(role).or_default();
        if !pool.contains(&filler) {
            pool.insert(filler);
        }
    }

    /// Move every restriction of `other` into this pool.
    pub fn merge<R: Reasoner + ?Sized>(&mut self, ctx: &OntologyContext<'_, R>, other: RestrictionPool) -> CreResult<()> {
        for restriction in other.exist.all_concepts() {
            self.add_exist(ctx, restriction.clone())?;
        }
        for (role, fillers) in other.univ {
            for filler in fillers.all_concepts() {
                self.add_univ(role.clone(), filler.clone());
            }
        }
        Ok(())
    }

    /// Sort the existential hierarchy and every universal filler hierarchy.
    pub fn sort<R: Reasoner + ?Sized>(&mut self, ctx: &OntologyContext<'_, R>, bulk_threshold: usize) -> CreResult<()> {
        let sorter = HierarchySorter::new(ctx).with_bulk_threshold(bulk_threshold);
        sorter.sort(&mut self.exist)?;
        for (role, fillers) in self.univ.iter_mut() {
            tracing::debug!(%role, fillers = fillers.len(), "sorting universal fillers");
            sorter.sort(fillers)?;
        }
        Ok(())
    }

    pub fn exist_count(&self) -> usize {
        self.exist.all_concepts().count()
    }

    pub fn univ_count(&self) -> usize {
        self.univ.values().map(|pool| pool.all_concepts().count()).sum()
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

    #[test]
    fn equivalent_existentials_share_a_node() {
        let mut onto = Ontology::new();
        onto.add_subclass(parse("∃R.A"), parse("∃S.B"))
            .add_subclass(parse("∃S.B"), parse("∃R.A"));
        let reasoner = ToldReasoner::new(&onto);
        let ctx = OntologyContext::new(&onto, &reasoner);

        let mut pool = RestrictionPool::new();
        pool.add_exist(&ctx, ExistRestriction::new("R", parse("A"))).unwrap();
        pool.add_exist(&ctx, ExistRestriction::new("S", parse("B"))).unwrap();
        pool.add_exist(&ctx, ExistRestriction::new("T", parse("B"))).unwrap();
        assert_eq!(pool.exist().len(), 2);
        assert_eq!(pool.exist_count(), 3);
    }

    #[test]
    fn univ_fillers_are_keyed_by_role() {
        let mut pool = RestrictionPool::new();
        pool.add_univ(Role::new("R"), parse("A"));
        pool.add_univ(Role::new("R"), parse("A"));
        pool.add_univ(Role::new("S"), parse("A"));
        assert!(pool.contains_univ(&Role::new("R"), &parse("A")));
        assert!(!pool.contains_univ(&Role::new("T"), &parse("A")));
        assert_eq!(pool.univ_count(), 2);
    }

    #[test]
    fn merging_and_sorting() {
        let mut onto = Ontology::new();
        onto.add_subclass(parse("A"), parse("B"));
        let reasoner = ToldReasoner::new(&onto);
        let ctx = OntologyContext::new(&onto, &reasoner);

        let mut left = RestrictionPool::new();
        left.add_exist(&ctx, ExistRestriction::new("R", parse("B"))).unwrap();
        left.add_univ(Role::new("R"), parse("B"));
        let mut right = RestrictionPool::new();
        right.add_exist(&ctx, ExistRestriction::new("R", parse("A"))).unwrap();
        right.add_univ(Role::new("R"), parse("A"));
        left.merge(&ctx, right).unwrap();
        left.sort(&ctx, 100).unwrap();

        let exist = left.exist();
        assert_eq!(exist.roots().len(), 1);
        let root = exist.roots()[0];
        assert_eq!(exist.concepts(root), &[ExistRestriction::new("R", parse("B"))]);
        assert_eq!(exist.subs(root).len(), 1);

        let fillers = left.univ(&Role::new("R")).unwrap();
        assert_eq!(fillers.roots().len(), 1);
        assert_eq!(fillers.concepts(fillers.roots()[0]), &[parse("B")]);
    }
}

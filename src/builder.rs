//! Recursive construction of referring expressions.
//!
//! Starting from a concept the base individuals share, every step selects the
//! minimal existential restrictions the current concept entails, tightens each
//! with the universal restrictions holding on its role, and follows them
//! outward. A restriction already used on the current path closes a cycle
//! instead of being expanded again, which bounds the depth by the number of
//! distinct restrictions in the pool.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::concept::{Concept, ExistRestriction, Role};
use crate::context::OntologyContext;
use crate::error::{CreResult, ExpressionError};
use crate::expression::{CompletedExpression, InProgressExpression};
use crate::hierarchy::{ConceptGraph, HierarchyConcept, NodeId};
use crate::oracle::Reasoner;
use crate::restriction::RestrictionPool;

/// Subsumption answers for the nodes of one hierarchy, valid for one step.
type NodeCache = HashMap<NodeId, bool>;

pub struct ExpressionBuilder<'c, 'a, R: Reasoner + ?Sized> {
    ctx: &'c OntologyContext<'a, R>,
    pool: &'c RestrictionPool,
    query: &'c Concept,
    sorted: bool,
}

impl<'c, 'a, R: Reasoner + ?Sized> ExpressionBuilder<'c, 'a, R> {
    /// `sorted` states whether `pool` went through the hierarchy sorter; an
    /// unsorted pool is scanned node by node.
    pub fn new(ctx: &'c OntologyContext<'a, R>, pool: &'c RestrictionPool, query: &'c Concept, sorted: bool) -> Self {
        Self {
            ctx,
            pool,
            query,
            sorted,
        }
    }

    /// Every expression answering the query reachable from `current`.
    ///
    /// `expr` is the expression built so far and `used` the restrictions
    /// applied along its path. For the initial call both are empty and the
    /// first base individual of `expr` is checked for asserted successors.
    pub fn construct(
        &self,
        current: &Concept,
        expr: &InProgressExpression,
        used: &BTreeSet<ExistRestriction>,
    ) -> CreResult<BTreeSet<CompletedExpression>> {
        let selected = self.select(current)?;

        let mut next = Vec::new();
        for restriction in selected {
            if expr.is_empty() {
                let asserted = match expr.individuals().first() {
                    Some(individual) => self.ctx.role_assertion_present(&restriction, individual)?,
                    None => false,
                };
                if asserted {
                    tracing::debug!(%restriction, "restriction already asserted for the base individual");
                    continue;
                }
                next.push(restriction);
            } else if used.contains(&restriction) {
                let index = expr
                    .mark_cycle(&restriction)
                    .ok_or_else(|| ExpressionError::MalformedRestriction {
                        message: format!("{restriction} is used but missing from the expression"),
                    })?;
                tracing::debug!(%restriction, index, "cycle");
            } else {
                next.push(restriction);
            }
        }

        let mut completed = BTreeSet::new();
        if self.ctx.is_subclass(current, self.query)? {
            completed.extend(expr.complete());
        }

        for restriction in next {
            let mut path = used.clone();
            path.insert(restriction.clone());
            let extended = expr.extend(restriction.clone());
            completed.extend(self.construct(&restriction.filler, &extended, &path)?);
        }
        Ok(completed)
    }

    /// Minimal candidates for `current`, fused with their role constraints
    /// and without equivalent duplicates, in restriction order.
    pub fn select(&self, current: &Concept) -> CreResult<BTreeSet<ExistRestriction>> {
        let candidates = self.candidates(current)?;

        let mut constraints: BTreeMap<Role, Option<Concept>> = BTreeMap::new();
        let mut selected = BTreeSet::new();
        for candidate in candidates {
            let constraint = match constraints.get(&candidate.role) {
                Some(constraint) => constraint.clone(),
                None => {
                    let constraint = self.role_constraint(current, &candidate.role)?;
                    constraints.insert(candidate.role.clone(), constraint.clone());
                    constraint
                }
            };
            let combined = self.ctx.combine_to_exist(&candidate, constraint.as_ref())?;
            if self.ctx.has_no_equivalent(&combined, &selected)? {
                selected.insert(combined);
            }
        }
        tracing::trace!(%current, selected = selected.len(), "selected restrictions");
        Ok(selected)
    }

    /// Existential restrictions entailed by `current` that are minimal under
    /// role-concept subsumption.
    pub fn candidates(&self, current: &Concept) -> CreResult<Vec<ExistRestriction>> {
        let graph = self.pool.exist();
        let mut candidates = Vec::new();
        if self.sorted {
            let mut cache = NodeCache::new();
            let mut seen = HashSet::new();
            self.collect_sorted(current, graph, graph.roots(), &mut candidates, &mut cache, &mut seen)?;
        } else {
            for restriction in graph.all_concepts() {
                if self.ctx.is_subclass(current, &restriction.to_concept())? {
                    self.ctx.add_exist_if_minimal(&mut candidates, restriction.clone())?;
                }
            }
        }
        Ok(candidates)
    }

    /// Descend only below nodes `current` is subsumed by, visiting each node
    /// once.
    fn collect_sorted(
        &self,
        current: &Concept,
        graph: &ConceptGraph<ExistRestriction>,
        ids: &[NodeId],
        candidates: &mut Vec<ExistRestriction>,
        cache: &mut NodeCache,
        seen: &mut HashSet<NodeId>,
    ) -> CreResult<()> {
        for &id in ids {
            if !seen.insert(id) {
                continue;
            }
            if !self.holds(current, graph, id, cache, |c: &Concept| c.clone())? {
                continue;
            }
            for restriction in graph.concepts(id) {
                self.ctx.add_exist_if_minimal(candidates, restriction.clone())?;
            }
            self.collect_sorted(current, graph, &graph.subs(id), candidates, cache, seen)?;
        }
        Ok(())
    }

    /// `∀role.(E₁ ⊓ … ⊓ Eₙ)` over the most specific fillers `Eᵢ` of the
    /// universal pool of `role` with `current ⊑ ∀role.Eᵢ`, if any.
    fn role_constraint(&self, current: &Concept, role: &Role) -> CreResult<Option<Concept>> {
        let Some(fillers) = self.pool.univ(role) else {
            return Ok(None);
        };
        let mut found = BTreeSet::new();
        let mut cache = NodeCache::new();
        let mut seen = HashSet::new();
        if self.sorted {
            self.collect_fillers(current, role, fillers, fillers.roots(), &mut found, &mut cache, &mut seen)?;
        } else {
            for filler in fillers.all_concepts() {
                if self.ctx.is_subclass(current, &Concept::for_all(role.clone(), filler.clone()))? {
                    self.ctx.add_if_most_specific(&mut found, filler.clone())?;
                }
            }
        }
        if found.is_empty() {
            return Ok(None);
        }
        Ok(Some(Concept::for_all(role.clone(), Concept::and(found))))
    }

    fn collect_fillers(
        &self,
        current: &Concept,
        role: &Role,
        fillers: &ConceptGraph<Concept>,
        ids: &[NodeId],
        found: &mut BTreeSet<Concept>,
        cache: &mut NodeCache,
        seen: &mut HashSet<NodeId>,
    ) -> CreResult<()> {
        for &id in ids {
            if !seen.insert(id) {
                continue;
            }
            let restrict = |filler: &Concept| Concept::for_all(role.clone(), filler.clone());
            if !self.holds(current, fillers, id, cache, restrict)? {
                continue;
            }
            for filler in fillers.concepts(id) {
                self.ctx.add_if_most_specific(found, filler.clone())?;
            }
            self.collect_fillers(current, role, fillers, &fillers.subs(id), found, cache, seen)?;
        }
        Ok(())
    }

    /// Is `current` subsumed by the concept of node `id`, as shaped by
    /// `shape`? Sentinels never hold.
    fn holds<T: HierarchyConcept>(
        &self,
        current: &Concept,
        graph: &ConceptGraph<T>,
        id: NodeId,
        cache: &mut NodeCache,
        shape: impl Fn(&Concept) -> Concept,
    ) -> CreResult<bool> {
        if let Some(&known) = cache.get(&id) {
            return Ok(known);
        }
        let result = match graph.oracle_concept(id) {
            Some(concept) => self.ctx.is_subclass(current, &shape(&concept))?,
            None => false,
        };
        cache.insert(id, result);
        Ok(result)
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

    fn ex(role: &str, filler: &str) -> ExistRestriction {
        ExistRestriction::new(role, parse(filler))
    }

    fn ontology(axioms: &[(&str, &str)]) -> Ontology {
        let mut onto = Ontology::new();
        for (sub, sup) in axioms {
            onto.add_subclass(parse(sub), parse(sup));
        }
        onto
    }

    fn texts(done: &BTreeSet<CompletedExpression>) -> Vec<(&str, usize)> {
        done.iter().map(|c| (c.text(), c.cycles())).collect()
    }

    #[test]
    fn minimal_candidates_drop_entailed_restrictions() {
        let onto = ontology(&[("A", "B"), ("X", "∃R.A")]);
        let reasoner = ToldReasoner::new(&onto);
        let ctx = OntologyContext::new(&onto, &reasoner);
        let mut pool = RestrictionPool::new();
        pool.add_exist(&ctx, ex("R", "A")).unwrap();
        pool.add_exist(&ctx, ex("R", "B")).unwrap();
        pool.add_exist(&ctx, ex("S", "B")).unwrap();
        let query = Concept::Top;

        let unsorted = ExpressionBuilder::new(&ctx, &pool, &query, false);
        assert_eq!(unsorted.candidates(&parse("X")).unwrap(), vec![ex("R", "A")]);

        pool.sort(&ctx, 100).unwrap();
        let sorted = ExpressionBuilder::new(&ctx, &pool, &query, true);
        assert_eq!(sorted.candidates(&parse("X")).unwrap(), vec![ex("R", "A")]);
    }

    #[test]
    fn diamonds_in_the_pool_are_walked_once() {
        let onto = ontology(&[("B", "A"), ("C", "A"), ("D", "B"), ("D", "C"), ("X", "∃R.D")]);
        let reasoner = ToldReasoner::new(&onto);
        let ctx = OntologyContext::new(&onto, &reasoner);
        let mut pool = RestrictionPool::new();
        for filler in ["A", "B", "C", "D"] {
            pool.add_exist(&ctx, ex("R", filler)).unwrap();
        }
        pool.sort(&ctx, 100).unwrap();
        let d = pool.exist().find(&ex("R", "D")).unwrap();
        assert_eq!(pool.exist().supers(d).len(), 2);

        let query = Concept::Top;
        let builder = ExpressionBuilder::new(&ctx, &pool, &query, true);
        let before = ctx.oracle_calls();
        assert_eq!(builder.candidates(&parse("X")).unwrap(), vec![ex("R", "D")]);
        // four node checks, two evictions on the way down, one rejection of C
        assert_eq!(ctx.oracle_calls() - before, 9);
    }

    #[test]
    fn universal_constraints_tighten_fillers() {
        let onto = ontology(&[("X", "∃R.A"), ("X", "∀R.C"), ("X", "∀R.D"), ("D", "C")]);
        let reasoner = ToldReasoner::new(&onto);
        let ctx = OntologyContext::new(&onto, &reasoner);
        let mut pool = RestrictionPool::new();
        pool.add_exist(&ctx, ex("R", "A")).unwrap();
        pool.add_univ(Role::new("R"), parse("C"));
        pool.add_univ(Role::new("R"), parse("D"));
        pool.sort(&ctx, 100).unwrap();
        let query = Concept::Top;

        let builder = ExpressionBuilder::new(&ctx, &pool, &query, true);
        let selected = builder.select(&parse("X")).unwrap();
        assert_eq!(selected, BTreeSet::from([ex("R", "A ⊓ D")]));
    }

    #[test]
    fn combinations_collapsing_to_one_filler_are_selected_once() {
        let onto = ontology(&[
            ("X", "∃R.A"),
            ("X", "∃R.B"),
            ("X", "∀R.C"),
            ("C", "A"),
            ("C", "B"),
        ]);
        let reasoner = ToldReasoner::new(&onto);
        let ctx = OntologyContext::new(&onto, &reasoner);
        let mut pool = RestrictionPool::new();
        pool.add_exist(&ctx, ex("R", "A")).unwrap();
        pool.add_exist(&ctx, ex("R", "B")).unwrap();
        pool.add_univ(Role::new("R"), parse("C"));
        let query = Concept::Top;

        let builder = ExpressionBuilder::new(&ctx, &pool, &query, false);
        assert_eq!(builder.candidates(&parse("X")).unwrap().len(), 2);
        assert_eq!(builder.select(&parse("X")).unwrap(), BTreeSet::from([ex("R", "C")]));
    }

    #[test]
    fn construction_follows_chains_and_marks_cycles() {
        let onto = ontology(&[
            ("A", "∃R.B"),
            ("A", "∃S.C"),
            ("B", "∃R.D"),
            ("B", "∀R.C"),
            ("C", "∃S.C"),
        ]);
        let reasoner = ToldReasoner::new(&onto);
        let ctx = OntologyContext::new(&onto, &reasoner);
        let mut pool = RestrictionPool::new();
        for (role, filler) in [("R", "B"), ("R", "D"), ("S", "C"), ("S", "E")] {
            pool.add_exist(&ctx, ex(role, filler)).unwrap();
        }
        pool.add_univ(Role::new("R"), parse("C"));
        pool.sort(&ctx, 100).unwrap();

        let query = parse("C");
        let builder = ExpressionBuilder::new(&ctx, &pool, &query, true);
        let expr = InProgressExpression::new(BTreeSet::from(["a".to_string()]));
        let done = builder.construct(&parse("A"), &expr, &BTreeSet::new()).unwrap();

        assert_eq!(
            texts(&done),
            vec![
                ("C ⊓ D ⊓ ∃R⎺.(B ⊓ ∃R⎺.({a}))", 0),
                ("[^0 C ⊓ ∃S⎺.(]ᐩ^0 C ⊓ D ⊓ ∃R⎺.(B ⊓ ∃R⎺.({a})))", 1),
                ("[^1 C ⊓ ∃S⎺.(]ᐩ^1 {a})", 1),
            ]
        );
    }

    #[test]
    fn asserted_successors_are_not_described_again() {
        let mut onto = ontology(&[("A", "∃R.B")]);
        onto.assert_concept("a", parse("A"))
            .assert_role("R", "a", "b")
            .assert_concept("b", parse("B"));
        let reasoner = ToldReasoner::new(&onto);
        let ctx = OntologyContext::new(&onto, &reasoner);
        let mut pool = RestrictionPool::new();
        pool.add_exist(&ctx, ex("R", "B")).unwrap();

        let query = parse("B");
        let builder = ExpressionBuilder::new(&ctx, &pool, &query, false);
        let expr = InProgressExpression::new(BTreeSet::from(["a".to_string()]));
        let done = builder.construct(&parse("A"), &expr, &BTreeSet::new()).unwrap();
        assert!(done.is_empty());
    }
}

//! Sorting unlinked concept nodes into a subsumption DAG.
//!
//! Small batches are inserted pairwise between a TOP and a BOTTOM sentinel.
//! Batches from `bulk_threshold` nodes upward are classified by the reasoner in
//! one call (see `classify.rs`).

use std::collections::HashSet;

use miette::Diagnostic;

use crate::context::OntologyContext;
use crate::error::CreResult;
use crate::oracle::Reasoner;

use super::{ConceptGraph, HierarchyConcept, NodeId, classify};

/// Batch size from which bulk classification replaces pairwise insertion.
pub const DEFAULT_BULK_THRESHOLD: usize = 100;

pub struct HierarchySorter<'c, 'a, R: Reasoner + ?Sized> {
    ctx: &'c OntologyContext<'a, R>,
    bulk_threshold: usize,
}

struct Sentinels {
    top: NodeId,
    bottom: NodeId,
}

impl<'c, 'a, R: Reasoner + ?Sized> HierarchySorter<'c, 'a, R> {
    pub fn new(ctx: &'c OntologyContext<'a, R>) -> Self {
        Self {
            ctx,
            bulk_threshold: DEFAULT_BULK_THRESHOLD,
        }
    }

    pub fn with_bulk_threshold(mut self, bulk_threshold: usize) -> Self {
        self.bulk_threshold = bulk_threshold;
        self
    }

    /// Sort the roots of `graph` into a DAG whose roots are the most general
    /// nodes.
    ///
    /// Oracle failures abort pairwise insertion. Bulk classification failures
    /// leave the graph as it was.
    pub fn sort<T: HierarchyConcept>(&self, graph: &mut ConceptGraph<T>) -> CreResult<()> {
        let seeds = graph.roots().len();
        if seeds <= 1 {
            return Ok(());
        }
        if seeds < self.bulk_threshold {
            tracing::debug!(nodes = seeds, "sorting restrictions pairwise");
            return self.sort_pairwise(graph);
        }

        tracing::debug!(nodes = seeds, "sorting restrictions by classification");
        let backup = graph.clone();
        if let Err(e) = classify::sort_by_classification(self.ctx, graph) {
            tracing::warn!(
                error = %e,
                code = %e.code().map(|c| c.to_string()).unwrap_or_default(),
                nodes = seeds,
                "bulk classification failed, continuing with unsorted restrictions"
            );
            *graph = backup;
        }
        Ok(())
    }

    fn sort_pairwise<T: HierarchyConcept>(&self, graph: &mut ConceptGraph<T>) -> CreResult<()> {
        let seeds = graph.roots().to_vec();
        let sentinels = Sentinels {
            top: graph.add_sentinel(),
            bottom: graph.add_sentinel(),
        };

        let (first, rest) = match seeds.split_first() {
            Some(split) => split,
            None => return Ok(()),
        };
        graph.link(sentinels.top, *first);
        graph.link(*first, sentinels.bottom);

        for &node in rest {
            self.insert_from_top(graph, &sentinels, sentinels.top, node, &mut HashSet::new())?;
            self.insert_from_bottom(graph, &sentinels, sentinels.bottom, node, &mut HashSet::new())?;
            if graph.concepts(node).is_empty() {
                graph.remove(node);
            }
        }

        graph.remove(sentinels.bottom);
        let roots = graph.subs(sentinels.top);
        graph.remove(sentinels.top);
        graph.set_roots(roots);
        Ok(())
    }

    /// Is the concept of `node` subsumed by that of `by`? Sentinels never
    /// take part in a subsumption.
    fn subsumed<T: HierarchyConcept>(&self, graph: &ConceptGraph<T>, node: NodeId, by: NodeId) -> CreResult<bool> {
        match (graph.oracle_concept(node), graph.oracle_concept(by)) {
            (Some(sub), Some(sup)) => self.ctx.is_subclass(&sub, &sup),
            _ => Ok(false),
        }
    }

    /// Descend from `current` through every sub that subsumes `new`; attach
    /// `new` below each node none of whose subs subsumes it.
    fn insert_from_top<T: HierarchyConcept>(
        &self,
        graph: &mut ConceptGraph<T>,
        sentinels: &Sentinels,
        current: NodeId,
        new: NodeId,
        visited: &mut HashSet<NodeId>,
    ) -> CreResult<()> {
        if current == sentinels.bottom {
            return Ok(());
        }
        visited.insert(current);
        let mut below_a_sub = false;
        for sub in graph.subs(current) {
            if visited.contains(&sub) {
                below_a_sub = true;
            } else if self.subsumed(graph, new, sub)? {
                below_a_sub = true;
                self.insert_from_top(graph, sentinels, sub, new, visited)?;
            }
        }
        if !below_a_sub {
            graph.link(current, new);
        }
        Ok(())
    }

    /// Ascend from `current` through every super subsumed by `new`; splice
    /// `new` above each node none of whose supers is subsumed by it. A super
    /// that is also a super of `new` is equivalent to it and absorbs it.
    fn insert_from_bottom<T: HierarchyConcept>(
        &self,
        graph: &mut ConceptGraph<T>,
        sentinels: &Sentinels,
        current: NodeId,
        new: NodeId,
        visited: &mut HashSet<NodeId>,
    ) -> CreResult<()> {
        if current == sentinels.top || graph.concepts(new).is_empty() {
            return Ok(());
        }
        visited.insert(current);
        let new_supers = graph.supers(new);
        let shared: Vec<NodeId> = graph
            .supers(current)
            .into_iter()
            .filter(|s| new_supers.contains(s))
            .collect();

        let mut above_a_super = false;
        for sup in graph.supers(current) {
            if graph.concepts(new).is_empty() {
                break;
            }
            if visited.contains(&sup) {
                above_a_super = true;
            } else if self.subsumed(graph, sup, new)? {
                above_a_super = true;
                if shared.contains(&sup) {
                    self.merge(graph, sup, new)?;
                    break;
                }
                self.insert_from_bottom(graph, sentinels, sup, new, visited)?;
            }
        }

        if !above_a_super && !graph.concepts(new).is_empty() {
            for sup in shared {
                graph.unlink(sup, current);
            }
            graph.link(new, current);
        }
        Ok(())
    }

    fn merge<T: HierarchyConcept>(&self, graph: &mut ConceptGraph<T>, into: NodeId, from: NodeId) -> CreResult<()> {
        tracing::debug!(
            into = %graph.concepts(into).first().map(ToString::to_string).unwrap_or_default(),
            from = %graph.concepts(from).first().map(ToString::to_string).unwrap_or_default(),
            "merging equivalent restrictions"
        );
        let absorbed = graph.take_concepts(from);
        if let Some(concepts) = graph.concepts_mut(into) {
            for concept in absorbed {
                T::merge_equivalent(self.ctx, concepts, concept)?;
            }
        }
        graph.isolate(from);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concept::{Concept, ExistRestriction};
    use crate::ontology::Ontology;
    use crate::oracle::ToldReasoner;

    fn parse(text: &str) -> Concept {
        text.parse().unwrap()
    }

    fn ex(role: &str, filler: &str) -> ExistRestriction {
        ExistRestriction::new(role, parse(filler))
    }

    /// `∃R.A ≡ ∃R.B` without `A ≡ B`, C, D, E below A, G below C, F below D.
    fn sort_example() -> Ontology {
        let mut onto = Ontology::new();
        for (sub, sup) in [
            ("∃R.A", "∃R.B"),
            ("∃R.B", "∃R.A"),
            ("C", "A"),
            ("D", "A"),
            ("E", "A"),
            ("G", "C"),
            ("F", "D"),
        ] {
            onto.add_subclass(parse(sub), parse(sup));
        }
        onto
    }

    fn node_of(graph: &ConceptGraph<ExistRestriction>, filler: &str) -> NodeId {
        graph.find(&ex("R", filler)).unwrap()
    }

    fn fillers(graph: &ConceptGraph<ExistRestriction>, ids: Vec<NodeId>) -> Vec<String> {
        let mut names: Vec<String> = ids
            .into_iter()
            .map(|id| graph.concepts(id)[0].filler.to_string())
            .collect();
        names.sort();
        names
    }

    fn sorted_graph(threshold: usize) -> ConceptGraph<ExistRestriction> {
        let onto = sort_example();
        let reasoner = ToldReasoner::new(&onto);
        let ctx = OntologyContext::new(&onto, &reasoner);
        let mut graph = ConceptGraph::new();
        for filler in ["A", "B", "C", "D", "E", "F", "G"] {
            graph.insert(ex("R", filler));
        }
        HierarchySorter::new(&ctx)
            .with_bulk_threshold(threshold)
            .sort(&mut graph)
            .unwrap();
        graph
    }

    fn assert_sort_example(graph: &ConceptGraph<ExistRestriction>) {
        assert_eq!(graph.roots().len(), 1);
        let top = graph.roots()[0];
        assert_eq!(graph.concepts(top).len(), 2);
        assert_eq!(node_of(graph, "A"), node_of(graph, "B"));
        assert_eq!(fillers(graph, graph.subs(top)), vec!["C", "D", "E"]);
        assert_eq!(fillers(graph, graph.subs(node_of(graph, "C"))), vec!["G"]);
        assert_eq!(fillers(graph, graph.subs(node_of(graph, "D"))), vec!["F"]);
        assert!(graph.subs(node_of(graph, "E")).is_empty());
        assert_eq!(graph.len(), 6);
    }

    #[test]
    fn pairwise_sorting_builds_the_hierarchy() {
        assert_sort_example(&sorted_graph(100));
    }

    #[test]
    fn bulk_sorting_matches_pairwise() {
        assert_sort_example(&sorted_graph(2));
    }

    #[test]
    fn single_node_is_left_alone() {
        let onto = Ontology::new();
        let reasoner = ToldReasoner::new(&onto);
        let ctx = OntologyContext::new(&onto, &reasoner);
        let mut graph = ConceptGraph::new();
        let only = graph.insert(parse("A"));
        HierarchySorter::new(&ctx).sort(&mut graph).unwrap();
        assert_eq!(graph.roots(), &[only]);
        assert_eq!(ctx.oracle_calls(), 0);
    }

    #[test]
    fn sorted_links_are_entailed_and_equivalents_merged() {
        // Insertion order deliberately puts specific concepts first.
        let mut onto = Ontology::new();
        for (sub, sup) in [("D", "C"), ("C", "B"), ("B", "A"), ("X", "Y"), ("Y", "X"), ("X", "A")] {
            onto.add_subclass(parse(sub), parse(sup));
        }
        let reasoner = ToldReasoner::new(&onto);
        let ctx = OntologyContext::new(&onto, &reasoner);
        let mut graph = ConceptGraph::new();
        for name in ["D", "X", "B", "Y", "A", "C"] {
            graph.insert(parse(name));
        }
        HierarchySorter::new(&ctx).sort(&mut graph).unwrap();

        for id in graph.node_ids().collect::<Vec<_>>() {
            for sub in graph.subs(id) {
                let sub_concept = graph.oracle_concept(sub).unwrap();
                let sup_concept = graph.oracle_concept(id).unwrap();
                assert!(reasoner.is_subclass(&sub_concept, &sup_concept).unwrap());
                assert!(!reasoner.is_subclass(&sup_concept, &sub_concept).unwrap());
            }
        }
        let x = graph.find(&parse("X")).unwrap();
        assert_eq!(graph.find(&parse("Y")), Some(x));
        assert_eq!(graph.concepts(x), &[parse("X"), parse("Y")]);
        let a = graph.find(&parse("A")).unwrap();
        assert_eq!(graph.roots(), &[a]);
        assert_eq!(graph.subs(a).len(), 2);
        assert_eq!(graph.subs(graph.find(&parse("B")).unwrap()), vec![graph.find(&parse("C")).unwrap()]);
    }

    #[test]
    fn equivalent_existentials_keep_only_minimal_fillers() {
        let mut onto = Ontology::new();
        onto.add_equivalent(parse("A"), parse("B"));
        let reasoner = ToldReasoner::new(&onto);
        let ctx = OntologyContext::new(&onto, &reasoner);
        let mut graph = ConceptGraph::new();
        graph.insert(ex("R", "A"));
        graph.insert(ex("R", "B"));
        HierarchySorter::new(&ctx).sort(&mut graph).unwrap();
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.concepts(graph.roots()[0]), &[ex("R", "A")]);
    }
}

//! Subsumption hierarchies over concepts.
//!
//! A [`ConceptGraph`] is an arena of [`ConceptNode`]s stored in a petgraph
//! `StableDiGraph`. Edges run from the more general node to the more specific
//! one, so a node's outgoing neighbours are its subs and incoming neighbours
//! its supers; the mutual-link invariant holds by construction.
//!
//! Freshly inserted nodes are unlinked roots. [`HierarchySorter`] turns the
//! roots into a DAG ordered by subsumption, merging equivalent nodes.

mod classify;
mod sort;

use std::fmt;

use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};

use crate::concept::{Concept, ExistRestriction};
use crate::context::OntologyContext;
use crate::error::CreResult;
use crate::oracle::Reasoner;

pub use sort::{DEFAULT_BULK_THRESHOLD, HierarchySorter};

/// Handle of a node inside a [`ConceptGraph`].
pub type NodeId = NodeIndex;

/// A non-empty list of mutually equivalent concepts. The first element is the
/// canonical representative. Equality is by the concept list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConceptNode<T> {
    concepts: Vec<T>,
}

impl<T> ConceptNode<T> {
    pub fn concepts(&self) -> &[T] {
        &self.concepts
    }

    pub fn canonical(&self) -> Option<&T> {
        self.concepts.first()
    }
}

/// Values a hierarchy can be built over.
pub trait HierarchyConcept: Clone + Eq + fmt::Display + fmt::Debug {
    /// The concept the oracle is asked about.
    fn as_concept(&self) -> Concept;

    /// Record `equivalent` in the concept list of a node it was found
    /// equivalent to.
    fn merge_equivalent<R: Reasoner + ?Sized>(
        _ctx: &OntologyContext<'_, R>,
        concepts: &mut Vec<Self>,
        equivalent: Self,
    ) -> CreResult<()> {
        if !concepts.contains(&equivalent) {
            concepts.push(equivalent);
        }
        Ok(())
    }
}

impl HierarchyConcept for Concept {
    fn as_concept(&self) -> Concept {
        self.clone()
    }
}

impl HierarchyConcept for ExistRestriction {
    fn as_concept(&self) -> Concept {
        self.to_concept()
    }

    /// Only role-concept minimal restrictions are kept.
    fn merge_equivalent<R: Reasoner + ?Sized>(
        ctx: &OntologyContext<'_, R>,
        concepts: &mut Vec<Self>,
        equivalent: Self,
    ) -> CreResult<()> {
        ctx.add_exist_if_minimal(concepts, equivalent)?;
        Ok(())
    }
}

/// Arena of concept nodes with sub/super links and a list of top-level nodes.
#[derive(Debug, Clone)]
pub struct ConceptGraph<T> {
    graph: StableDiGraph<ConceptNode<T>, ()>,
    roots: Vec<NodeId>,
}

impl<T> Default for ConceptGraph<T> {
    fn default() -> Self {
        Self {
            graph: StableDiGraph::new(),
            roots: Vec::new(),
        }
    }
}

impl<T: HierarchyConcept> ConceptGraph<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `concept` as a new unlinked root, or return the node that already
    /// carries exactly this concept list.
    pub fn insert(&mut self, concept: T) -> NodeId {
        if let Some(id) = self
            .graph
            .node_indices()
            .find(|&id| self.graph[id].concepts.len() == 1 && self.graph[id].concepts[0] == concept)
        {
            return id;
        }
        let id = self.graph.add_node(ConceptNode {
            concepts: vec![concept],
        });
        self.roots.push(id);
        id
    }

    /// Node containing `concept` among its equivalents.
    pub fn find(&self, concept: &T) -> Option<NodeId> {
        self.graph
            .node_indices()
            .find(|&id| self.graph[id].concepts.contains(concept))
    }

    pub fn contains(&self, concept: &T) -> bool {
        self.find(concept).is_some()
    }

    /// The canonical concept of a node as the oracle sees it. Sentinels have
    /// none.
    pub fn oracle_concept(&self, id: NodeId) -> Option<Concept> {
        self.node(id).and_then(ConceptNode::canonical).map(T::as_concept)
    }
}

impl<T> ConceptGraph<T> {
    pub fn node(&self, id: NodeId) -> Option<&ConceptNode<T>> {
        self.graph.node_weight(id)
    }

    /// Concepts of a node; empty for sentinels and removed nodes.
    pub fn concepts(&self, id: NodeId) -> &[T] {
        self.node(id).map(ConceptNode::concepts).unwrap_or(&[])
    }

    pub(crate) fn concepts_mut(&mut self, id: NodeId) -> Option<&mut Vec<T>> {
        self.graph.node_weight_mut(id).map(|n| &mut n.concepts)
    }

    pub(crate) fn take_concepts(&mut self, id: NodeId) -> Vec<T> {
        self.concepts_mut(id).map(std::mem::take).unwrap_or_default()
    }

    /// Direct subs, in insertion order.
    pub fn subs(&self, id: NodeId) -> Vec<NodeId> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Direct supers, in insertion order.
    pub fn supers(&self, id: NodeId) -> Vec<NodeId> {
        self.neighbors(id, Direction::Incoming)
    }

    fn neighbors(&self, id: NodeId, direction: Direction) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.graph.neighbors_directed(id, direction).collect();
        ids.sort();
        ids
    }

    /// Top-level nodes.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub(crate) fn set_roots(&mut self, roots: Vec<NodeId>) {
        self.roots = roots;
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.node_indices()
    }

    /// Every concept of every node.
    pub fn all_concepts(&self) -> impl Iterator<Item = &T> + '_ {
        self.graph.node_weights().flat_map(|n| n.concepts.iter())
    }

    pub(crate) fn contains_node(&self, id: NodeId) -> bool {
        self.graph.contains_node(id)
    }

    pub(crate) fn add_sentinel(&mut self) -> NodeId {
        self.graph.add_node(ConceptNode {
            concepts: Vec::new(),
        })
    }

    /// Make `sub` a direct sub of `sup`. Linking twice is a no-op.
    pub(crate) fn link(&mut self, sup: NodeId, sub: NodeId) {
        self.graph.update_edge(sup, sub, ());
    }

    pub(crate) fn unlink(&mut self, sup: NodeId, sub: NodeId) {
        if let Some(edge) = self.graph.find_edge(sup, sub) {
            self.graph.remove_edge(edge);
        }
    }

    /// Drop every link of a node, keeping the node.
    pub(crate) fn isolate(&mut self, id: NodeId) {
        for sup in self.supers(id) {
            self.unlink(sup, id);
        }
        for sub in self.subs(id) {
            self.unlink(id, sub);
        }
    }

    /// Remove a node with its links.
    pub(crate) fn remove(&mut self, id: NodeId) {
        self.graph.remove_node(id);
        self.roots.retain(|&r| r != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a(name: &str) -> Concept {
        Concept::atomic(name)
    }

    #[test]
    fn insert_deduplicates_identical_concepts() {
        let mut graph = ConceptGraph::new();
        let first = graph.insert(a("A"));
        let again = graph.insert(a("A"));
        let other = graph.insert(a("B"));
        assert_eq!(first, again);
        assert_ne!(first, other);
        assert_eq!(graph.roots(), &[first, other]);
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn links_are_mutual() {
        let mut graph = ConceptGraph::new();
        let sup = graph.insert(a("A"));
        let sub = graph.insert(a("B"));
        graph.link(sup, sub);
        graph.link(sup, sub);
        assert_eq!(graph.subs(sup), vec![sub]);
        assert_eq!(graph.supers(sub), vec![sup]);

        graph.unlink(sup, sub);
        assert!(graph.subs(sup).is_empty());
        assert!(graph.supers(sub).is_empty());
    }

    #[test]
    fn removing_a_node_drops_links_and_root_entry() {
        let mut graph = ConceptGraph::new();
        let sup = graph.insert(a("A"));
        let sub = graph.insert(a("B"));
        graph.link(sup, sub);
        graph.remove(sub);
        assert!(graph.subs(sup).is_empty());
        assert_eq!(graph.roots(), &[sup]);
        assert!(graph.concepts(sub).is_empty());
        assert!(graph.find(&a("B")).is_none());
    }

    #[test]
    fn sentinels_have_no_oracle_concept() {
        let mut graph: ConceptGraph<ExistRestriction> = ConceptGraph::new();
        let top = graph.add_sentinel();
        let node = graph.insert(ExistRestriction::new("R", a("A")));
        assert_eq!(graph.oracle_concept(top), None);
        assert_eq!(graph.oracle_concept(node), Some(Concept::exists("R", a("A"))));
    }
}

//! Bulk sorting through a single reasoner classification.
//!
//! Every root gets a fresh placeholder atom declared equivalent to its concept
//! in a TBox-only copy of the ontology. The original atoms of that copy are
//! rewritten to `∃A.⊤` so only placeholders remain atomic, and the reasoner
//! classifies the placeholders once. The direct-subclass relation is then read
//! back onto the nodes; placeholders landing in one equivalence class are
//! merged into a single node.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::concept::{Concept, Role};
use crate::context::OntologyContext;
use crate::error::CreResult;
use crate::oracle::{ClassHierarchy, Reasoner};

use super::{ConceptGraph, HierarchyConcept, NodeId};

fn fresh_name(base: String, taken: &BTreeSet<String>) -> String {
    let mut name = base;
    while taken.contains(&name) {
        name.push('\'');
    }
    name
}

pub(super) fn sort_by_classification<T: HierarchyConcept, R: Reasoner + ?Sized>(
    ctx: &OntologyContext<'_, R>,
    graph: &mut ConceptGraph<T>,
) -> CreResult<()> {
    let seeds = graph.roots().to_vec();
    let ontology = ctx.ontology();

    let mut taken = ontology.concept_names();
    let mut placeholders: BTreeMap<String, NodeId> = BTreeMap::new();
    let mut copy = ontology.tbox();
    for (i, &seed) in seeds.iter().enumerate() {
        let Some(concept) = graph.oracle_concept(seed) else {
            continue;
        };
        let name = fresh_name(format!("ATOMIC{i}"), &taken);
        taken.insert(name.clone());
        copy.add_equivalent(Concept::atomic(name.clone()), concept);
        placeholders.insert(name, seed);
    }

    let mut role_names: BTreeSet<String> = ontology
        .role_names()
        .into_iter()
        .map(|r| r.name().to_string())
        .collect();
    let mut atom_roles: HashMap<String, Role> = HashMap::new();
    for atom in ontology.concept_names() {
        let role = fresh_name(atom.clone(), &role_names);
        role_names.insert(role.clone());
        atom_roles.insert(atom, Role::new(role));
    }
    copy.map_tbox(|concept| {
        concept.replace_atoms(&|name| {
            atom_roles
                .get(name)
                .map(|role| Concept::exists(role.clone(), Concept::Top))
        })
    });

    let atoms: BTreeSet<String> = placeholders.keys().cloned().collect();
    let hierarchy = ctx.classify(&copy, &atoms)?;

    let mut placer = Placer {
        ctx,
        hierarchy: &hierarchy,
        placeholders: &placeholders,
        resolved: HashMap::new(),
        expanded: HashSet::new(),
    };
    let mut roots = placer.place(graph, hierarchy.top_subclasses())?;

    let reached: HashSet<NodeId> = placer.resolved.values().copied().collect();
    for seed in seeds {
        if graph.contains_node(seed) && !reached.contains(&seed) {
            tracing::debug!(
                concept = %graph.concepts(seed).first().map(ToString::to_string).unwrap_or_default(),
                "restriction missing from classification, kept as root"
            );
            roots.push(seed);
        }
    }
    graph.set_roots(roots);
    Ok(())
}

struct Placer<'p, 'c, 'a, R: Reasoner + ?Sized> {
    ctx: &'c OntologyContext<'a, R>,
    hierarchy: &'p ClassHierarchy,
    placeholders: &'p BTreeMap<String, NodeId>,
    /// Equivalence class (by first atom) to the node standing for it.
    resolved: HashMap<String, NodeId>,
    expanded: HashSet<NodeId>,
}

impl<R: Reasoner + ?Sized> Placer<'_, '_, '_, R> {
    fn place<T: HierarchyConcept>(
        &mut self,
        graph: &mut ConceptGraph<T>,
        classes: Vec<&BTreeSet<String>>,
    ) -> CreResult<Vec<NodeId>> {
        let hierarchy = self.hierarchy;
        let mut placed = Vec::new();
        for class in classes {
            let Some(representative) = class.iter().next() else {
                continue;
            };
            let node = match self.resolved.get(representative) {
                Some(&node) => node,
                None => {
                    let members: Vec<NodeId> = class
                        .iter()
                        .filter_map(|atom| self.placeholders.get(atom))
                        .copied()
                        .collect();
                    let Some((&node, others)) = members.split_first() else {
                        continue;
                    };
                    for &other in others {
                        let absorbed = graph.take_concepts(other);
                        if let Some(concepts) = graph.concepts_mut(node) {
                            for concept in absorbed {
                                T::merge_equivalent(self.ctx, concepts, concept)?;
                            }
                        }
                        graph.remove(other);
                    }
                    self.resolved.insert(representative.clone(), node);
                    node
                }
            };
            if self.expanded.insert(node) {
                let subs = hierarchy.direct_subclasses(representative);
                for sub in self.place(graph, subs)? {
                    graph.link(node, sub);
                }
            }
            if !placed.contains(&node) {
                placed.push(node);
            }
        }
        Ok(placed)
    }
}

//! A lightweight reasoner answering from told axioms and structural rules.
//!
//! Rules: `C ⊑ ⊤`, `⊥ ⊑ D`, conjunction on either side, monotonicity of `∃R`
//! and `∀R` in the filler, contraposition of negation and chaining through
//! told subsumptions. Individuals take part as named nodes: their asserted
//! types, their asserted role successors and universal restrictions along
//! incoming role assertions.
//!
//! Every concept the reasoner has seen is a node whose told subsumers are
//! saturated forward with a worklist, so a query costs one closure lookup once
//! its concepts are known. New concepts extend the closure incrementally.
//!
//! Sound for Horn-ALC but not complete (no `∃`/`∀` interaction, no reasoning
//! by cases on unsatisfiable fillers). Never fails.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::concept::{Concept, Role};
use crate::error::OracleResult;
use crate::ontology::Ontology;

use super::{ClassHierarchy, Reasoner};

const TOP: usize = 0;
const BOTTOM: usize = 1;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Node {
    Class(Concept),
    Named(String),
}

/// Restriction nodes of one kind (`∃` or `∀`).
#[derive(Debug, Default)]
struct Restrictions {
    by_role: HashMap<Role, Vec<usize>>,
    by_filler: HashMap<usize, Vec<(Role, usize)>>,
    filler_of: HashMap<usize, (Role, usize)>,
}

impl Restrictions {
    fn register(&mut self, id: usize, role: &Role, filler: usize) {
        self.by_role.entry(role.clone()).or_default().push(id);
        self.by_filler.entry(filler).or_default().push((role.clone(), id));
        self.filler_of.insert(id, (role.clone(), filler));
    }

    fn filler(&self, id: usize) -> Option<usize> {
        self.filler_of.get(&id).map(|(_, filler)| *filler)
    }

    fn with_role(&self, role: &Role) -> &[usize] {
        self.by_role.get(role).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Subsumer closure over every node seen so far.
#[derive(Debug)]
struct Closure {
    nodes: Vec<Node>,
    index: HashMap<Node, usize>,
    supers: Vec<HashSet<usize>>,
    subs: Vec<HashSet<usize>>,
    told: HashMap<usize, Vec<usize>>,
    operands: HashMap<usize, Vec<usize>>,
    conjunctions: HashMap<usize, Vec<usize>>,
    exists: Restrictions,
    universals: Restrictions,
    negations: HashMap<usize, usize>,
    negation_of: HashMap<usize, usize>,
    links_from: HashMap<usize, Vec<(Role, usize)>>,
    links_to: HashMap<usize, Vec<(Role, usize)>>,
    todo: Vec<(usize, usize)>,
}

impl Closure {
    fn new() -> Self {
        let mut closure = Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            supers: Vec::new(),
            subs: Vec::new(),
            told: HashMap::new(),
            operands: HashMap::new(),
            conjunctions: HashMap::new(),
            exists: Restrictions::default(),
            universals: Restrictions::default(),
            negations: HashMap::new(),
            negation_of: HashMap::new(),
            links_from: HashMap::new(),
            links_to: HashMap::new(),
            todo: Vec::new(),
        };
        closure.add_node(Node::Class(Concept::Top));
        closure.add_node(Node::Class(Concept::Bottom));
        closure.saturate();
        closure
    }

    fn add_node(&mut self, node: Node) -> usize {
        let id = self.nodes.len();
        self.index.insert(node.clone(), id);
        self.nodes.push(node);
        self.supers.push(HashSet::new());
        self.subs.push(HashSet::new());
        self.todo.push((id, id));
        self.todo.push((id, TOP));
        id
    }

    /// The node of `concept`, added and saturated if new.
    fn concept(&mut self, concept: &Concept) -> usize {
        if let Some(&id) = self.index.get(&Node::Class(concept.clone())) {
            return id;
        }
        let id = match concept {
            Concept::And(operands) => {
                let ops: Vec<usize> = operands.iter().map(|op| self.concept(op)).collect();
                let id = self.add_node(Node::Class(concept.clone()));
                for &op in &ops {
                    self.conjunctions.entry(op).or_default().push(id);
                }
                for holder in self.holding_all(&ops) {
                    self.todo.push((holder, id));
                }
                self.operands.insert(id, ops);
                id
            }
            Concept::Exists(role, filler) => {
                let filler = self.concept(filler);
                let id = self.add_node(Node::Class(concept.clone()));
                self.seed_restriction(id, role, filler, true);
                self.exists.register(id, role, filler);
                let linked: Vec<usize> = self
                    .links_to
                    .iter()
                    .flat_map(|(&object, links)| links.iter().map(move |(r, subject)| (object, r, *subject)))
                    .filter(|(object, r, _)| *r == role && self.entails(*object, filler))
                    .map(|(_, _, subject)| subject)
                    .collect();
                self.todo.extend(linked.into_iter().map(|subject| (subject, id)));
                id
            }
            Concept::ForAll(role, filler) => {
                let filler = self.concept(filler);
                let id = self.add_node(Node::Class(concept.clone()));
                self.seed_restriction(id, role, filler, false);
                self.universals.register(id, role, filler);
                id
            }
            Concept::Not(inner) => {
                let inner = self.concept(inner);
                let id = self.add_node(Node::Class(concept.clone()));
                // ¬Y ⊑ ¬X for every known ¬Y with X ⊑ Y
                let below: Vec<usize> = self
                    .negations
                    .iter()
                    .filter(|&(_, &y)| self.entails(inner, y))
                    .flat_map(|(&n, _)| self.subs[n].iter().copied())
                    .collect();
                self.todo.extend(below.into_iter().map(|w| (w, id)));
                self.negations.insert(id, inner);
                self.negation_of.insert(inner, id);
                id
            }
            _ => self.add_node(Node::Class(concept.clone())),
        };
        self.saturate();
        id
    }

    /// Queue `w ⊑ id` for every `w` below a known restriction with the same
    /// role and a more specific filler.
    fn seed_restriction(&mut self, id: usize, role: &Role, filler: usize, existential: bool) {
        let restrictions = if existential { &self.exists } else { &self.universals };
        let below: Vec<usize> = restrictions
            .with_role(role)
            .iter()
            .filter(|&&e| restrictions.filler(e).is_some_and(|f| self.entails(f, filler)))
            .flat_map(|&e| self.subs[e].iter().copied())
            .collect();
        self.todo.extend(below.into_iter().map(|w| (w, id)));
    }

    /// Nodes already subsumed by every node in `ops`.
    fn holding_all(&self, ops: &[usize]) -> Vec<usize> {
        let Some((first, rest)) = ops.split_first() else {
            return Vec::new();
        };
        self.subs[*first]
            .iter()
            .filter(|w| rest.iter().all(|op| self.subs[*op].contains(*w)))
            .copied()
            .collect()
    }

    fn add_axiom(&mut self, lhs: &Concept, rhs: &Concept) {
        let lhs = self.concept(lhs);
        let rhs = self.concept(rhs);
        self.told.entry(lhs).or_default().push(rhs);
        self.todo.extend(self.subs[lhs].iter().map(|&w| (w, rhs)));
        self.saturate();
    }

    fn entails(&self, sub: usize, sup: usize) -> bool {
        sub == sup || sub == BOTTOM || self.supers[sub].contains(&sup) || self.supers[sub].contains(&BOTTOM)
    }

    fn saturate(&mut self) {
        while let Some((sub, sup)) = self.todo.pop() {
            if !self.supers[sub].insert(sup) {
                continue;
            }
            self.subs[sup].insert(sub);
            let derived = self.derive(sub, sup);
            self.todo.extend(derived);
        }
    }

    /// Consequences of the new subsumption `x ⊑ y`.
    fn derive(&self, x: usize, y: usize) -> Vec<(usize, usize)> {
        let mut derived = Vec::new();

        if let Some(ops) = self.operands.get(&y) {
            derived.extend(ops.iter().map(|&op| (x, op)));
        }
        if let Some(rhs) = self.told.get(&y) {
            derived.extend(rhs.iter().map(|&r| (x, r)));
        }
        for &conj in self.conjunctions.get(&y).into_iter().flatten() {
            if self.operands[&conj].iter().all(|op| self.supers[x].contains(op)) {
                derived.push((x, conj));
            }
        }

        for restrictions in [&self.exists, &self.universals] {
            // y is a restriction: climb to those with a more general filler.
            if let Some((role, filler)) = restrictions.filler_of.get(&y) {
                for &other in restrictions.with_role(role) {
                    if restrictions.filler(other).is_some_and(|f| self.entails(*filler, f)) {
                        derived.push((x, other));
                    }
                }
            }
            // x is a filler: its restrictions now reach those over y.
            for (role, inner) in restrictions.by_filler.get(&x).into_iter().flatten() {
                for &other in restrictions.with_role(role) {
                    if y == BOTTOM || restrictions.filler(other) == Some(y) {
                        derived.extend(self.subs[*inner].iter().map(|&w| (w, other)));
                    }
                }
            }
        }

        if let Some(&inner) = self.negations.get(&y) {
            for (&other, &z) in &self.negations {
                if self.entails(z, inner) {
                    derived.push((x, other));
                }
            }
        }
        if let (Some(&from), Some(&to)) = (self.negation_of.get(&y), self.negation_of.get(&x)) {
            derived.extend(self.subs[from].iter().map(|&w| (w, to)));
        }

        // role assertions between named nodes
        for (role, subject) in self.links_to.get(&x).into_iter().flatten() {
            for &other in self.exists.with_role(role) {
                if self.exists.filler(other) == Some(y) {
                    derived.push((*subject, other));
                }
            }
        }
        if let Some((role, filler)) = self.universals.filler_of.get(&y) {
            for (r, object) in self.links_from.get(&x).into_iter().flatten() {
                if r == role {
                    derived.push((*object, *filler));
                }
            }
        }
        derived
    }
}

#[derive(Debug)]
pub struct ToldReasoner {
    closure: RefCell<Closure>,
}

impl Default for ToldReasoner {
    fn default() -> Self {
        Self::new(&Ontology::new())
    }
}

impl ToldReasoner {
    pub fn new(ontology: &Ontology) -> Self {
        let mut closure = Closure::new();
        for (lhs, rhs) in ontology.subsumptions() {
            closure.add_axiom(&lhs, &rhs);
        }

        let mut named = HashMap::new();
        for individual in ontology.individuals() {
            let id = closure.add_node(Node::Named(individual.clone()));
            named.insert(individual, id);
        }
        for assertion in &ontology.role_assertions {
            let (Some(&subject), Some(&object)) = (named.get(&assertion.subject), named.get(&assertion.object))
            else {
                continue;
            };
            closure
                .links_from
                .entry(subject)
                .or_default()
                .push((assertion.role.clone(), object));
            closure
                .links_to
                .entry(object)
                .or_default()
                .push((assertion.role.clone(), subject));
        }
        closure.saturate();
        for assertion in &ontology.concept_assertions {
            let concept = closure.concept(&assertion.concept);
            if let Some(&individual) = named.get(&assertion.individual) {
                closure.todo.push((individual, concept));
            }
        }
        closure.saturate();
        tracing::trace!(nodes = closure.nodes.len(), "told closure saturated");
        Self {
            closure: RefCell::new(closure),
        }
    }

    fn entails(&self, c: &Concept, d: &Concept) -> bool {
        if c == d || d.is_top() || matches!(c, Concept::Bottom) {
            return true;
        }
        let mut closure = self.closure.borrow_mut();
        let sub = closure.concept(c);
        let sup = closure.concept(d);
        closure.entails(sub, sup)
    }

    fn instance(&self, c: &Concept, individual: &str) -> bool {
        if c.is_top() {
            return true;
        }
        let mut closure = self.closure.borrow_mut();
        let Some(&named) = closure.index.get(&Node::Named(individual.to_string())) else {
            return false;
        };
        let concept = closure.concept(c);
        closure.entails(named, concept)
    }
}

impl Reasoner for ToldReasoner {
    fn is_subclass(&self, sub: &Concept, sup: &Concept) -> OracleResult<bool> {
        Ok(self.entails(sub, sup))
    }

    fn is_instance(&self, concept: &Concept, individual: &str) -> OracleResult<bool> {
        Ok(self.instance(concept, individual))
    }

    fn classify(&self, ontology: &Ontology, atoms: &BTreeSet<String>) -> OracleResult<ClassHierarchy> {
        let reasoner = ToldReasoner::new(ontology);
        ClassHierarchy::from_subsumption(atoms, |sub, sup| {
            Ok(reasoner.entails(&Concept::atomic(sub), &Concept::atomic(sup)))
        })
    }
}

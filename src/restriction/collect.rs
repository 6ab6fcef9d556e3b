//! Collection of the restrictions an axiom can entail about an individual.
//!
//! The right-hand side of `C ⊑ D` is walked positively and the left-hand side
//! negatively, as `C ⊑ D` is `¬C ⊔ D`. Under negation `∃R.C` contributes
//! `∀R.¬C` and `∀R.C` contributes `∃R.¬C`.

use std::collections::BTreeSet;

use crate::concept::{Concept, ExistRestriction};
use crate::context::OntologyContext;
use crate::error::CreResult;
use crate::oracle::Reasoner;

use super::RestrictionPool;

pub struct RestrictionCollector<'c, 'a, R: Reasoner + ?Sized> {
    ctx: &'c OntologyContext<'a, R>,
}

impl<'c, 'a, R: Reasoner + ?Sized> RestrictionCollector<'c, 'a, R> {
    pub fn new(ctx: &'c OntologyContext<'a, R>) -> Self {
        Self { ctx }
    }

    /// Restrictions of every subsumption and equivalence axiom, merged into
    /// one unsorted pool.
    pub fn collect_ontology(&self) -> CreResult<RestrictionPool> {
        let mut pool = RestrictionPool::new();
        for (sub, sup) in self.ctx.ontology().subsumptions() {
            let axiom_pool = self.collect_axiom(&sub, &sup)?;
            pool.merge(self.ctx, axiom_pool)?;
        }
        tracing::debug!(
            existential = pool.exist_count(),
            universal = pool.univ_count(),
            "collected restrictions"
        );
        Ok(pool)
    }

    /// Restrictions of a single axiom `sub ⊑ sup`.
    pub fn collect_axiom(&self, sub: &Concept, sup: &Concept) -> CreResult<RestrictionPool> {
        let mut pool = RestrictionPool::new();
        self.negative(sub, &mut pool)?;
        self.positive(sup, &mut pool)?;
        Ok(pool)
    }

    pub fn positive(&self, concept: &Concept, pool: &mut RestrictionPool) -> CreResult<()> {
        match concept {
            Concept::Top | Concept::Bottom | Concept::Atomic(_) => Ok(()),
            Concept::And(operands) => operands.iter().try_for_each(|op| self.positive(op, pool)),
            Concept::Not(inner) => self.negative(inner, pool),
            Concept::Exists(role, filler) => {
                pool.add_exist(self.ctx, ExistRestriction::new(role.clone(), (**filler).clone()))?;
                self.positive(filler, pool)
            }
            Concept::ForAll(role, filler) => {
                pool.add_univ(role.clone(), (**filler).clone());
                self.positive(filler, pool)
            }
        }
    }

    pub fn negative(&self, concept: &Concept, pool: &mut RestrictionPool) -> CreResult<()> {
        match concept {
            Concept::Top | Concept::Bottom | Concept::Atomic(_) => Ok(()),
            Concept::And(operands) => operands.iter().try_for_each(|op| self.negative(op, pool)),
            Concept::Not(inner) => self.positive(inner, pool),
            Concept::Exists(role, filler) => {
                pool.add_univ(role.clone(), filler.complement());
                self.negative(filler, pool)
            }
            Concept::ForAll(role, filler) => {
                pool.add_exist(self.ctx, ExistRestriction::new(role.clone(), filler.complement()))?;
                self.negative(filler, pool)
            }
        }
    }

    /// Existential restrictions that can occur on the left-hand side of an
    /// axiom: those of every left-hand side, and `∃R.¬C` for every `∀R.C`
    /// on a right-hand side.
    pub fn left_side_existentials(&self) -> BTreeSet<ExistRestriction> {
        let mut found = BTreeSet::new();
        for (sub, sup) in self.ctx.ontology().subsumptions() {
            positive_exist(&sub, &mut found);
            negative_exist(&sup, &mut found);
        }
        found
    }
}

fn positive_exist(concept: &Concept, found: &mut BTreeSet<ExistRestriction>) {
    match concept {
        Concept::Top | Concept::Bottom | Concept::Atomic(_) => {}
        Concept::And(operands) => operands.iter().for_each(|op| positive_exist(op, found)),
        Concept::Not(inner) => negative_exist(inner, found),
        Concept::Exists(role, filler) => {
            found.insert(ExistRestriction::new(role.clone(), (**filler).clone()));
            positive_exist(filler, found);
        }
        Concept::ForAll(_, filler) => positive_exist(filler, found),
    }
}

fn negative_exist(concept: &Concept, found: &mut BTreeSet<ExistRestriction>) {
    match concept {
        Concept::Top | Concept::Bottom | Concept::Atomic(_) | Concept::Exists(..) => {}
        Concept::And(operands) => operands.iter().for_each(|op| negative_exist(op, found)),
        Concept::Not(inner) => positive_exist(inner, found),
        Concept::ForAll(role, filler) => {
            found.insert(ExistRestriction::new(role.clone(), filler.complement()));
            negative_exist(filler, found);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concept::Role;
    use crate::ontology::Ontology;
    use crate::oracle::ToldReasoner;

    fn parse(text: &str) -> Concept {
        text.parse().unwrap()
    }

    fn ex(role: &str, filler: &str) -> ExistRestriction {
        ExistRestriction::new(role, parse(filler))
    }

    fn collect(onto: &Ontology) -> RestrictionPool {
        let reasoner = ToldReasoner::new(onto);
        let ctx = OntologyContext::new(onto, &reasoner);
        RestrictionCollector::new(&ctx).collect_ontology().unwrap()
    }

    #[test]
    fn positive_side_collects_nested_restrictions() {
        let mut onto = Ontology::new();
        onto.add_subclass(parse("X"), parse("A ⊓ ∃R.(B ⊓ ∀S.C) ⊓ ¬∃T.D"));
        let pool = collect(&onto);

        assert!(pool.contains_exist(&ex("R", "B ⊓ ∀S.C")));
        assert!(pool.contains_univ(&Role::new("S"), &parse("C")));
        // ¬∃T.D is ∀T.¬D
        assert!(pool.contains_univ(&Role::new("T"), &parse("¬D")));
        assert_eq!(pool.exist_count(), 1);
        assert_eq!(pool.univ_count(), 2);
    }

    #[test]
    fn negative_side_is_the_dual() {
        let mut onto = Ontology::new();
        // ∃R.A ⊓ ∀S.B ⊑ X  contributes  ∀R.¬A  and  ∃S.¬B
        onto.add_subclass(parse("∃R.A ⊓ ∀S.B"), parse("X"));
        // ∃S.∀R.¬A ⊑ Y  contributes  ∀S.∃R.A  and, from the filler,  ∃R.A
        onto.add_subclass(parse("∃S.(∀R.¬A)"), parse("Y"));
        let pool = collect(&onto);

        assert!(pool.contains_univ(&Role::new("R"), &parse("¬A")));
        assert!(pool.contains_exist(&ex("S", "¬B")));
        assert!(pool.contains_univ(&Role::new("S"), &parse("∃R.A")));
        assert!(pool.contains_exist(&ex("R", "A")));
    }

    #[test]
    fn equivalences_contribute_both_directions() {
        let mut onto = Ontology::new();
        onto.add_equivalent(parse("A"), parse("∃R.B"));
        let pool = collect(&onto);
        // A ⊑ ∃R.B gives ∃R.B, ∃R.B ⊑ A gives ∀R.¬B
        assert!(pool.contains_exist(&ex("R", "B")));
        assert!(pool.contains_univ(&Role::new("R"), &parse("¬B")));
    }

    #[test]
    fn left_side_candidates() {
        let mut onto = Ontology::new();
        onto.add_subclass(parse("A ⊓ ∃R.(∃S.B)"), parse("∀T.C ⊓ ∃U.D"));
        let reasoner = ToldReasoner::new(&onto);
        let ctx = OntologyContext::new(&onto, &reasoner);
        let found = RestrictionCollector::new(&ctx).left_side_existentials();
        let expected: BTreeSet<_> = [ex("R", "∃S.B"), ex("S", "B"), ex("T", "¬C")].into();
        assert_eq!(found, expected);
    }
}

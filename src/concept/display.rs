//! Textual rendering of concepts.
//!
//! Conjunction operands are sorted by their rendered text so output is stable.
//! Operands of `¬`, `∃` and `∀` are wrapped in parentheses unless they are
//! atomic.

use std::collections::BTreeSet;
use std::fmt;

use super::Concept;

impl fmt::Display for Concept {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Concept::And(operands) => f.write_str(&join_operands(operands)),
            Concept::Not(inner) => write!(f, "¬{}", Grouped(inner)),
            Concept::Exists(role, filler) => write!(f, "∃{role}.{}", Grouped(filler)),
            Concept::ForAll(role, filler) => write!(f, "∀{role}.{}", Grouped(filler)),
            other => write_simple(other, f),
        }
    }
}

/// Renders a concept as an operand: parenthesized unless it is a single name.
struct Grouped<'a>(&'a Concept);

impl fmt::Display for Grouped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Concept::And(operands) if operands.len() == 1 => f.write_str(&join_operands(operands)),
            Concept::And(operands) => write!(f, "({})", join_operands(operands)),
            Concept::Not(inner) => write!(f, "(¬{})", Grouped(inner)),
            Concept::Exists(role, filler) => write!(f, "(∃{role}.{})", Grouped(filler)),
            Concept::ForAll(role, filler) => write!(f, "(∀{role}.{})", Grouped(filler)),
            other => write_simple(other, f),
        }
    }
}

fn write_simple(concept: &Concept, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match concept {
        Concept::Top => f.write_str("⊤"),
        Concept::Bottom => f.write_str("⊥"),
        Concept::Atomic(name) => f.write_str(name),
        other => write!(f, "{}", Grouped(other)),
    }
}

fn join_operands(operands: &BTreeSet<Concept>) -> String {
    let rendered: BTreeSet<String> = operands.iter().map(|c| c.to_string()).collect();
    rendered.into_iter().collect::<Vec<_>>().join(" ⊓ ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a(name: &str) -> Concept {
        Concept::atomic(name)
    }

    #[test]
    fn nested_expression_rendering() {
        // A ⊓ ∃S.B ⊓ ∀R.(∃P.E ⊓ ¬(D ⊓ C))
        let concept = Concept::and([
            a("A"),
            Concept::exists("S", a("B")),
            Concept::for_all(
                "R",
                Concept::and([
                    Concept::exists("P", a("E")),
                    Concept::not(Concept::and([a("D"), a("C")])),
                ]),
            ),
        ]);
        assert_eq!(concept.to_string(), "A ⊓ ∀R.(¬(C ⊓ D) ⊓ ∃P.E) ⊓ ∃S.B");
    }

    #[test]
    fn restriction_fillers_are_grouped() {
        assert_eq!(Concept::exists("R", a("B")).to_string(), "∃R.B");
        assert_eq!(
            Concept::exists("R", Concept::and([a("B"), a("A")])).to_string(),
            "∃R.(A ⊓ B)"
        );
        assert_eq!(
            Concept::exists("S", Concept::exists("R", a("B"))).to_string(),
            "∃S.(∃R.B)"
        );
        assert_eq!(Concept::not(Concept::not(a("A"))).to_string(), "¬(¬A)");
        assert_eq!(Concept::exists("R", Concept::Top).to_string(), "∃R.⊤");
    }
}

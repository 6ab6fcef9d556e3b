//! Referring expressions under construction and finished.
//!
//! An [`InProgressExpression`] is a persistent list of [`ExpressionPart`]s,
//! most recent first. Extending it shares the existing parts with every other
//! branch holding the same prefix; only the cycle tags of a part are mutable,
//! so a cycle marked in one branch is seen by all of them. All branches of one
//! construction also share a single cycle counter.
//!
//! Rendering a part `∃R.D` yields `D ⊓ ∃R⎺.(`, read as "a D that is the
//! R-filler of ...". In a finished expression a filler conjunct repeating the
//! restriction of the part before it is left out. A cycle opened at a part is prefixed with `[^n ` and one
//! closed at a part is suffixed with `]ᐩ^n `.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::concept::{Concept, ExistRestriction};

/// One step of a referring expression.
#[derive(Debug)]
pub struct ExpressionPart {
    restriction: ExistRestriction,
    left_cycle_ends: RefCell<Vec<usize>>,
    right_cycle_ends: RefCell<Vec<usize>>,
}

impl ExpressionPart {
    pub fn new(restriction: ExistRestriction) -> Self {
        Self {
            restriction,
            left_cycle_ends: RefCell::new(Vec::new()),
            right_cycle_ends: RefCell::new(Vec::new()),
        }
    }

    pub fn restriction(&self) -> &ExistRestriction {
        &self.restriction
    }

    /// Cycle indices opened at this part, joined by `.`.
    pub fn left_tag(&self) -> String {
        join_tag(&self.left_cycle_ends.borrow())
    }

    /// Cycle indices closed at this part, joined by `.`.
    pub fn right_tag(&self) -> String {
        join_tag(&self.right_cycle_ends.borrow())
    }

    fn open_cycle(&self, index: usize) {
        self.left_cycle_ends.borrow_mut().push(index);
    }

    fn close_cycle(&self, index: usize) {
        self.right_cycle_ends.borrow_mut().push(index);
    }

    pub fn render(&self) -> String {
        self.render_after(None)
    }

    /// Render the part, leaving out a top-level filler conjunct equal to
    /// `previous`, the restriction of the part rendered just before it.
    fn render_after(&self, previous: Option<&Concept>) -> String {
        let mut out = String::new();
        let left = self.left_tag();
        if !left.is_empty() {
            out.push_str(&format!("[^{left} "));
        }
        let filler = &self.restriction.filler;
        match previous {
            Some(previous) if filler.conjuncts().contains(&previous) => {
                let rest = Concept::and(filler.conjuncts().into_iter().filter(|c| *c != previous).cloned());
                if !rest.is_top() {
                    out.push_str(&format!("{rest} ⊓ "));
                }
            }
            _ => out.push_str(&format!("{filler} ⊓ ")),
        }
        out.push_str(&format!("∃{}⎺.(", self.restriction.role));
        let right = self.right_tag();
        if !right.is_empty() {
            out.push_str(&format!("]ᐩ^{right} "));
        }
        out
    }
}

impl PartialEq for ExpressionPart {
    fn eq(&self, other: &Self) -> bool {
        self.restriction == other.restriction
    }
}

impl Eq for ExpressionPart {}

fn join_tag(indices: &[usize]) -> String {
    indices
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

#[derive(Debug)]
struct Link {
    part: Rc<ExpressionPart>,
    next: Option<Rc<Link>>,
}

/// A referring expression under construction.
#[derive(Debug, Clone)]
pub struct InProgressExpression {
    head: Option<Rc<Link>>,
    len: usize,
    individuals: Rc<BTreeSet<String>>,
    cycle_counter: Rc<Cell<usize>>,
}

impl InProgressExpression {
    /// An empty expression ending in any of `individuals`.
    pub fn new(individuals: BTreeSet<String>) -> Self {
        debug_assert!(!individuals.is_empty(), "an expression needs a base individual");
        Self {
            head: None,
            len: 0,
            individuals: Rc::new(individuals),
            cycle_counter: Rc::new(Cell::new(0)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn individuals(&self) -> &BTreeSet<String> {
        &self.individuals
    }

    /// Next cycle index to be handed out.
    pub fn cycle_counter(&self) -> usize {
        self.cycle_counter.get()
    }

    /// Parts, most recent first.
    pub fn parts(&self) -> impl Iterator<Item = &ExpressionPart> + '_ {
        std::iter::successors(self.head.as_deref(), |link| link.next.as_deref()).map(|link| link.part.as_ref())
    }

    pub fn head(&self) -> Option<&ExpressionPart> {
        self.head.as_deref().map(|link| link.part.as_ref())
    }

    /// A new expression with `restriction` as its most recent part. `self` is
    /// left untouched and shares its parts with the result.
    pub fn extend(&self, restriction: ExistRestriction) -> Self {
        Self {
            head: Some(Rc::new(Link {
                part: Rc::new(ExpressionPart::new(restriction)),
                next: self.head.clone(),
            })),
            len: self.len + 1,
            individuals: Rc::clone(&self.individuals),
            cycle_counter: Rc::clone(&self.cycle_counter),
        }
    }

    /// The most recent part introduced by `restriction`.
    pub fn find_part(&self, restriction: &ExistRestriction) -> Option<&ExpressionPart> {
        self.parts().find(|part| part.restriction() == restriction)
    }

    /// Close a cycle at the part introduced by `restriction` and open it at
    /// the head. Returns the cycle index, or `None` when no part carries the
    /// restriction.
    pub fn mark_cycle(&self, restriction: &ExistRestriction) -> Option<usize> {
        let target = self.find_part(restriction)?;
        let head = self.head()?;
        let index = self.cycle_counter.get();
        target.close_cycle(index);
        head.open_cycle(index);
        self.cycle_counter.set(index + 1);
        Some(index)
    }

    /// Render one finished expression per base individual.
    pub fn complete(&self) -> Vec<CompletedExpression> {
        if self.is_empty() {
            return self
                .individuals
                .iter()
                .map(|ind| CompletedExpression::new(ind.clone(), 0))
                .collect();
        }

        let mut body = String::new();
        let mut previous: Option<Concept> = None;
        let mut opened = BTreeSet::new();
        for part in self.parts() {
            body.push_str(&part.render_after(previous.as_ref()));
            opened.extend(part.left_cycle_ends.borrow().iter().copied());
            previous = Some(part.restriction().to_concept());
        }
        let closing = ")".repeat(self.len);
        self.individuals
            .iter()
            .map(|ind| CompletedExpression::new(format!("{body}{{{ind}}}{closing}"), opened.len()))
            .collect()
    }
}

/// A finished referring expression. Equality and order are by text.
#[derive(Debug, Clone)]
pub struct CompletedExpression {
    text: String,
    cycles: usize,
}

impl CompletedExpression {
    pub fn new(text: String, cycles: usize) -> Self {
        Self { text, cycles }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of cycles opened within the expression.
    pub fn cycles(&self) -> usize {
        self.cycles
    }
}

impl fmt::Display for CompletedExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl PartialEq for CompletedExpression {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for CompletedExpression {}

impl Hash for CompletedExpression {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.text.hash(state);
    }
}

impl PartialOrd for CompletedExpression {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CompletedExpression {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.text.cmp(&other.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ex(role: &str, filler: &str) -> ExistRestriction {
        ExistRestriction::new(role, filler.parse::<Concept>().unwrap())
    }

    fn individuals(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    /// Build an expression from its parts, oldest first.
    fn expression(parts: &[ExistRestriction], names: &[&str]) -> InProgressExpression {
        parts
            .iter()
            .fold(InProgressExpression::new(individuals(names)), |expr, r| expr.extend(r.clone()))
    }

    #[test]
    fn part_rendering_with_tags() {
        let part = ExpressionPart::new(ex("R", "B ⊓ A"));
        assert_eq!(part.render(), "A ⊓ B ⊓ ∃R⎺.(");
        part.open_cycle(1);
        part.close_cycle(2);
        assert_eq!(part.render(), "[^1 A ⊓ B ⊓ ∃R⎺.(]ᐩ^2 ");
        part.open_cycle(3);
        assert_eq!(part.left_tag(), "1.3");
    }

    #[test]
    fn extension_shares_parts_and_counter() {
        let base = expression(&[ex("R", "B")], &["a"]);
        let left = base.extend(ex("S", "C"));
        let right = base.extend(ex("T", "D"));
        assert_eq!(base.len(), 1);
        assert_eq!(left.len(), 2);

        assert_eq!(left.mark_cycle(&ex("R", "B")), Some(0));
        // The shared part sees the tag from the sibling branch.
        assert_eq!(right.find_part(&ex("R", "B")).unwrap().right_tag(), "0");
        assert_eq!(right.cycle_counter(), 1);
        assert_eq!(right.head().unwrap().left_tag(), "");
    }

    #[test]
    fn mark_cycle_appends_indices() {
        let expr = expression(&[ex("R", "B"), ex("S", "C")], &["a"]);
        expr.cycle_counter.set(1);
        let first = ex("R", "B");
        let second = ex("S", "C");

        expr.mark_cycle(&first);
        let expr = expr.extend(ex("T", "D"));
        expr.mark_cycle(&second);
        expr.mark_cycle(&first);

        let tags: Vec<(String, String)> = expr.parts().map(|p| (p.left_tag(), p.right_tag())).collect();
        assert_eq!(
            tags,
            vec![
                ("2.3".to_string(), String::new()),
                ("1".to_string(), "2".to_string()),
                (String::new(), "1.3".to_string()),
            ]
        );
        assert_eq!(expr.mark_cycle(&ex("U", "E")), None);
        assert_eq!(expr.cycle_counter(), 4);
    }

    #[test]
    fn complete_renders_one_expression_per_individual() {
        let expr = expression(&[ex("R", "C ⊓ B"), ex("S", "D")], &["a", "b"]);
        expr.mark_cycle(&ex("R", "C ⊓ B"));
        let done = expr.complete();
        let texts: Vec<&str> = done.iter().map(|c| c.text()).collect();
        assert_eq!(
            texts,
            vec![
                "[^0 D ⊓ ∃S⎺.(B ⊓ C ⊓ ∃R⎺.(]ᐩ^0 {a}))",
                "[^0 D ⊓ ∃S⎺.(B ⊓ C ⊓ ∃R⎺.(]ᐩ^0 {b}))",
            ]
        );
        assert!(done.iter().all(|c| c.cycles() == 1));
    }

    #[test]
    fn empty_expression_is_the_name() {
        let done = InProgressExpression::new(individuals(&["a"])).complete();
        assert_eq!(done, vec![CompletedExpression::new("a".into(), 0)]);
        assert_eq!(done[0].cycles(), 0);
    }

    #[test]
    fn filler_repeating_the_previous_restriction_is_elided() {
        let expr = expression(&[ex("R", "B ⊓ ∃S.C"), ex("S", "C")], &["a"]);
        let done = expr.complete();
        assert_eq!(done[0].text(), "C ⊓ ∃S⎺.(B ⊓ ∃R⎺.({a}))");
        assert_eq!(done[0].cycles(), 0);
    }

    #[test]
    fn cycle_free_output_closes_every_part() {
        let expr = expression(&[ex("R", "A"), ex("S", "B"), ex("T", "⊤")], &["x"]);
        let text = expr.complete().remove(0).text().to_string();
        assert!(text.ends_with("{x})))"));
        assert_eq!(text, "⊤ ⊓ ∃T⎺.(B ⊓ ∃S⎺.(A ⊓ ∃R⎺.({x})))");
    }

    #[test]
    fn nested_copies_of_the_previous_restriction_are_kept() {
        let filler: Concept = "B ⊓ ∃T.(∃S.C ⊓ ∃U.D)".parse().unwrap();
        let expr = expression(&[ExistRestriction::new("R", filler.clone()), ex("S", "C")], &["a"]);
        let text = expr.complete().remove(0).text().to_string();
        assert_eq!(text, format!("C ⊓ ∃S⎺.({filler} ⊓ ∃R⎺.({{a}}))"));
        assert!(text.contains("∃U.D"));
        assert_eq!(text.matches("∃S.C").count(), 1);
    }

    #[test]
    fn filler_equal_to_the_previous_restriction_leaves_only_the_role() {
        let expr = expression(&[ex("R", "∃S.C"), ex("S", "C")], &["a"]);
        assert_eq!(expr.complete()[0].text(), "C ⊓ ∃S⎺.(∃R⎺.({a}))");
        assert_eq!(ExpressionPart::new(ex("R", "⊤")).render(), "⊤ ⊓ ∃R⎺.(");
    }
}

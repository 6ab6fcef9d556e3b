//! Concept expressions of the Horn-ALC fragment.
//!
//! Concepts are a closed tagged type: `⊤`, `⊥`, atomic names, negation,
//! conjunction, existential and universal restrictions. Everything the engine
//! does with them is structural pattern matching; entailment questions go to a
//! [`crate::oracle::Reasoner`].
//!
//! Conjunctions are kept flat and ordered (`BTreeSet`) so structurally equal
//! concepts compare and hash equal regardless of operand order.

mod display;
mod parse;

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A role (object property) name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(String);

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Role {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A concept expression.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Concept {
    /// `⊤`, satisfied by every individual.
    Top,
    /// `⊥`, satisfied by none.
    Bottom,
    /// A named concept.
    Atomic(String),
    /// `¬C`
    Not(Box<Concept>),
    /// `C₁ ⊓ … ⊓ Cₙ`, always with at least two operands when built through
    /// [`Concept::and`].
    And(BTreeSet<Concept>),
    /// `∃R.C`
    Exists(Role, Box<Concept>),
    /// `∀R.C`
    ForAll(Role, Box<Concept>),
}

impl Concept {
    /// Create a named concept.
    pub fn atomic(name: impl Into<String>) -> Self {
        Concept::Atomic(name.into())
    }

    /// Create `¬C`.
    pub fn not(concept: Concept) -> Self {
        Concept::Not(Box::new(concept))
    }

    /// Create `∃R.C`.
    pub fn exists(role: impl Into<Role>, filler: Concept) -> Self {
        Concept::Exists(role.into(), Box::new(filler))
    }

    /// Create `∀R.C`.
    pub fn for_all(role: impl Into<Role>, filler: Concept) -> Self {
        Concept::ForAll(role.into(), Box::new(filler))
    }

    /// Conjoin concepts.
    ///
    /// Nested conjunctions are flattened and duplicates removed. `⊤` operands
    /// are dropped. A single remaining operand is returned as is and an empty
    /// conjunction is `⊤`.
    pub fn and(operands: impl IntoIterator<Item = Concept>) -> Self {
        let mut flat = BTreeSet::new();
        for operand in operands {
            match operand {
                Concept::And(inner) => flat.extend(inner),
                Concept::Top => {}
                other => {
                    flat.insert(other);
                }
            }
        }
        match flat.len() {
            0 => Concept::Top,
            1 => flat.into_iter().next().unwrap_or(Concept::Top),
            _ => Concept::And(flat),
        }
    }

    pub fn is_top(&self) -> bool {
        matches!(self, Concept::Top)
    }

    /// The operands of a conjunction, or the concept itself.
    pub fn conjuncts(&self) -> Vec<&Concept> {
        match self {
            Concept::And(operands) => operands.iter().collect(),
            other => vec![other],
        }
    }

    /// Like [`Concept::conjuncts`] but owned.
    pub fn into_conjuncts(self) -> Vec<Concept> {
        match self {
            Concept::And(operands) => operands.into_iter().collect(),
            other => vec![other],
        }
    }

    /// The negated normal form of `¬self`.
    ///
    /// Negation is pushed through restrictions and double negation. The
    /// fragment has no disjunction, so a negated conjunction stays `¬(C ⊓ D)`.
    pub fn complement(&self) -> Concept {
        match self {
            Concept::Top => Concept::Bottom,
            Concept::Bottom => Concept::Top,
            Concept::Atomic(_) | Concept::And(_) => Concept::not(self.clone()),
            Concept::Not(inner) => (**inner).clone(),
            Concept::Exists(role, filler) => Concept::for_all(role.clone(), filler.complement()),
            Concept::ForAll(role, filler) => Concept::exists(role.clone(), filler.complement()),
        }
    }

    /// The existential restriction this concept is, if any.
    pub fn as_exist(&self) -> Option<ExistRestriction> {
        match self {
            Concept::Exists(role, filler) => Some(ExistRestriction::new(role.clone(), (**filler).clone())),
            _ => None,
        }
    }

    /// Collect every atomic concept name mentioned in this concept.
    pub fn collect_atomic_names(&self, names: &mut BTreeSet<String>) {
        match self {
            Concept::Top | Concept::Bottom => {}
            Concept::Atomic(name) => {
                names.insert(name.clone());
            }
            Concept::Not(inner) => inner.collect_atomic_names(names),
            Concept::And(operands) => operands.iter().for_each(|c| c.collect_atomic_names(names)),
            Concept::Exists(_, filler) | Concept::ForAll(_, filler) => {
                filler.collect_atomic_names(names)
            }
        }
    }

    /// Collect every role name mentioned in this concept.
    pub fn collect_roles(&self, roles: &mut BTreeSet<Role>) {
        match self {
            Concept::Top | Concept::Bottom | Concept::Atomic(_) => {}
            Concept::Not(inner) => inner.collect_roles(roles),
            Concept::And(operands) => operands.iter().for_each(|c| c.collect_roles(roles)),
            Concept::Exists(role, filler) | Concept::ForAll(role, filler) => {
                roles.insert(role.clone());
                filler.collect_roles(roles);
            }
        }
    }

    /// Rebuild the concept with every atomic name `A` for which `replace`
    /// yields a concept substituted by it.
    pub fn replace_atoms(&self, replace: &impl Fn(&str) -> Option<Concept>) -> Concept {
        match self {
            Concept::Top => Concept::Top,
            Concept::Bottom => Concept::Bottom,
            Concept::Atomic(name) => replace(name).unwrap_or_else(|| self.clone()),
            Concept::Not(inner) => Concept::not(inner.replace_atoms(replace)),
            Concept::And(operands) => Concept::and(operands.iter().map(|c| c.replace_atoms(replace))),
            Concept::Exists(role, filler) => Concept::exists(role.clone(), filler.replace_atoms(replace)),
            Concept::ForAll(role, filler) => Concept::for_all(role.clone(), filler.replace_atoms(replace)),
        }
    }
}

impl Serialize for Concept {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Concept {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// An existential restriction `∃R.C`, the unit referring expressions are
/// chained from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExistRestriction {
    pub role: Role,
    pub filler: Concept,
}

impl ExistRestriction {
    pub fn new(role: impl Into<Role>, filler: Concept) -> Self {
        Self {
            role: role.into(),
            filler,
        }
    }

    pub fn to_concept(&self) -> Concept {
        Concept::exists(self.role.clone(), self.filler.clone())
    }
}

impl fmt::Display for ExistRestriction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_concept().fmt(f)
    }
}

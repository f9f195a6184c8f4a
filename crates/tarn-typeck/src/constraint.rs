use std::fmt;

use crate::types::Term;

/// An equality between two type terms. The equality is unordered; the two
/// sides are kept as written only so diagnostics read naturally.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Constraint {
    pub lhs: Term,
    pub rhs: Term,
}

impl Constraint {
    pub fn new(lhs: Term, rhs: Term) -> Self {
        Self { lhs, rhs }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.lhs, self.rhs)
    }
}

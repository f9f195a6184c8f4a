use crate::types::{Term, TermVar};

/// Inference failure. The first error aborts the enclosing solve; node
/// variables inside the terms carry their source positions, so rendering
/// an error names the offending locations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
    #[error("type mismatch: cannot unify {lhs} with {rhs}")]
    Mismatch { lhs: Term, rhs: Term },

    #[error("infinite type: {var} occurs in {term}")]
    InfiniteType { var: TermVar, term: Term },
}

use std::collections::HashMap;

use crate::constraint::Constraint;
use crate::error::TypeError;
use crate::types::{Term, TermVar};

/// Union-find-style equation solver. One instance per monomorphic unit;
/// it exclusively owns the variable bindings for that unit and, once
/// solved, stays alive read-only as the unit's authoritative answer.
#[derive(Debug, Clone, Default)]
pub struct Unifier {
    pending: Vec<Constraint>,
    bindings: HashMap<TermVar, Term>,
}

impl Unifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue constraints without solving, so batches can be collected
    /// before a single `solve` call.
    pub fn add(&mut self, constraints: impl IntoIterator<Item = Constraint>) {
        self.pending.extend(constraints);
    }

    /// Drain the pending queue. Stops at the first error; bindings made
    /// before the failure are left in place but the unit is unusable.
    pub fn solve(&mut self) -> Result<(), TypeError> {
        while let Some(constraint) = self.pending.pop() {
            let lhs = self.resolve(&constraint.lhs);
            let rhs = self.resolve(&constraint.rhs);
            self.unify(lhs, rhs)?;
        }
        Ok(())
    }

    /// Both sides are already resolved through the current substitution.
    fn unify(&mut self, lhs: Term, rhs: Term) -> Result<(), TypeError> {
        if lhs == rhs {
            return Ok(());
        }
        match (lhs, rhs) {
            (Term::Var(var), term) | (term, Term::Var(var)) => {
                if term.contains(&var) {
                    return Err(TypeError::InfiniteType { var, term });
                }
                log::debug!("bind {} := {}", var, term);
                self.bindings.insert(var, term);
                Ok(())
            }
            (Term::Ref(a), Term::Ref(b)) => {
                self.pending.push(Constraint::new(*a, *b));
                Ok(())
            }
            (Term::Fun(params_a, ret_a), Term::Fun(params_b, ret_b))
                if params_a.len() == params_b.len() =>
            {
                for (a, b) in params_a.into_iter().zip(params_b) {
                    self.pending.push(Constraint::new(a, b));
                }
                self.pending.push(Constraint::new(*ret_a, *ret_b));
                Ok(())
            }
            (lhs, rhs) => Err(TypeError::Mismatch { lhs, rhs }),
        }
    }

    /// The most-resolved form of a term: every variable replaced by its
    /// binding, transitively to a fixed point.
    pub fn resolve(&self, term: &Term) -> Term {
        self.resolve_guarded(term, &mut Vec::new())
    }

    // The occurs check rules out true cycles; the guard is there so a
    // corrupted substitution degrades to an unresolved variable instead of
    // unbounded recursion.
    fn resolve_guarded(&self, term: &Term, chain: &mut Vec<TermVar>) -> Term {
        match term {
            Term::Var(var) => {
                if chain.contains(var) {
                    return term.clone();
                }
                match self.bindings.get(var) {
                    Some(bound) => {
                        chain.push(var.clone());
                        let resolved = self.resolve_guarded(bound, chain);
                        chain.pop();
                        resolved
                    }
                    None => term.clone(),
                }
            }
            Term::Int => Term::Int,
            Term::Fun(params, ret) => Term::Fun(
                params
                    .iter()
                    .map(|p| self.resolve_guarded(p, chain))
                    .collect(),
                Box::new(self.resolve_guarded(ret, chain)),
            ),
            Term::Ref(inner) => Term::Ref(Box::new(self.resolve_guarded(inner, chain))),
        }
    }
}

/// Copy an already-resolved term, consistently replacing every remaining
/// variable with a brand-new instantiation variable. This is the only way
/// information crosses from one unifier into another: read-only on the
/// source, fresh variables on the destination. The counter belongs to the
/// solving unit so no two instantiations in it can alias.
pub fn instantiate(term: &Term, next_fresh: &mut u32) -> Term {
    fn go(term: &Term, next_fresh: &mut u32, map: &mut HashMap<TermVar, u32>) -> Term {
        match term {
            Term::Var(var) => {
                let id = *map.entry(var.clone()).or_insert_with(|| {
                    let id = *next_fresh;
                    *next_fresh += 1;
                    id
                });
                Term::Var(TermVar::Fresh(id))
            }
            Term::Int => Term::Int,
            Term::Fun(params, ret) => Term::Fun(
                params.iter().map(|p| go(p, next_fresh, map)).collect(),
                Box::new(go(ret, next_fresh, map)),
            ),
            Term::Ref(inner) => Term::Ref(Box::new(go(inner, next_fresh, map))),
        }
    }
    go(term, next_fresh, &mut HashMap::new())
}

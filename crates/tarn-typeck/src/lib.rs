//! Type inference for Tarn modules.
//!
//! Every program point gets a type variable named after its source
//! position; syntax-directed rules equate terms over those variables, and
//! a union-find unifier solves them. Functions are checked bottom-up over
//! the call graph so that each call site can instantiate its callee's
//! solved signature independently.

mod collect;
mod constraint;
mod error;
mod poly;
mod types;
mod unify;

pub use collect::collect;
pub use constraint::Constraint;
pub use error::TypeError;
pub use poly::{collect_poly, collect_poly_with, PolyConstraints};
pub use types::{node_term, Term, TermVar};
pub use unify::{instantiate, Unifier};

use std::collections::HashMap;
use tarn_ast::{FunId, LineIndex, Module, NodeRef};
use tarn_sema::{CallGraph, SemaError, SymbolTable};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckError {
    #[error(transparent)]
    Sema(#[from] SemaError),
    #[error(transparent)]
    Type(#[from] TypeError),
}

/// The solved state of a whole module: one unifier per function, holding
/// the bindings of the solving unit that function belonged to.
#[derive(Debug, Default)]
pub struct ModuleTypes {
    unifiers: HashMap<FunId, Unifier>,
}

impl ModuleTypes {
    pub fn unifier(&self, fun: FunId) -> Option<&Unifier> {
        self.unifiers.get(&fun)
    }

    /// The fully resolved signature of `fun`.
    pub fn signature(&self, module: &Module, lines: &LineIndex, fun: FunId) -> Option<Term> {
        let unifier = self.unifiers.get(&fun)?;
        let decl = module.funs[fun].name_decl;
        Some(unifier.resolve(&node_term(module, lines, NodeRef::Decl(decl))))
    }

    /// The resolved type of any program point inside `fun`.
    pub fn type_of(
        &self,
        module: &Module,
        lines: &LineIndex,
        fun: FunId,
        node: NodeRef,
    ) -> Option<Term> {
        let unifier = self.unifiers.get(&fun)?;
        Some(unifier.resolve(&node_term(module, lines, node)))
    }
}

/// Infer types for the whole module. Strongly-connected components of the
/// call graph are solved callees-first, each in its own unifier; within a
/// component calls use the monomorphic rule, across components the callee
/// signature is instantiated per call site.
pub fn check(
    module: &Module,
    lines: &LineIndex,
    symbols: &SymbolTable,
    graph: &CallGraph,
) -> Result<ModuleTypes, TypeError> {
    let mut types = ModuleTypes::default();
    for component in graph.sccs(module) {
        let mut unifier = Unifier::default();
        let mut fresh = 0;
        for &fun in &component {
            log::debug!("collecting `{}`", module.funs[fun].name(module));
            let out = collect_poly_with(
                module,
                lines,
                symbols,
                graph,
                &types.unifiers,
                &mut fresh,
                fun,
            );
            unifier.add(out.solver);
        }
        unifier.solve()?;
        for &fun in &component {
            types.unifiers.insert(fun, unifier.clone());
        }
    }
    Ok(types)
}

/// Resolve names, build the call graph, and infer types in one step.
pub fn check_module(module: &Module, lines: &LineIndex) -> Result<ModuleTypes, CheckError> {
    let symbols = SymbolTable::build(module)?;
    let graph = CallGraph::build(module, &symbols)?;
    Ok(check(module, lines, &symbols, &graph)?)
}

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use tarn_ast::{FunId, LineIndex, Module};
use tarn_sema::{CallGraph, SymbolTable};

use crate::collect::{Collector, PolyCtx};
use crate::constraint::Constraint;
use crate::unify::Unifier;

/// Constraints for one function in polymorphic mode. The two sequences
/// line up index for index: `collected` is what the rules state (and what
/// gets displayed), `solver` has each call site's left-hand side replaced
/// by a fresh instance of the callee's solved signature.
#[derive(Debug, Clone)]
pub struct PolyConstraints {
    pub collected: Vec<Constraint>,
    pub solver: Vec<Constraint>,
}

/// Collect constraints for `fun` with call-site polymorphism against an
/// empty set of solved callees. Every call falls back to the monomorphic
/// rule; useful for rendering.
pub fn collect_poly(
    module: &Module,
    lines: &LineIndex,
    symbols: &SymbolTable,
    graph: &CallGraph,
    fun: FunId,
) -> PolyConstraints {
    let mut fresh = 0;
    collect_poly_with(module, lines, symbols, graph, &HashMap::new(), &mut fresh, fun)
}

/// Collect constraints for `fun`, instantiating callees found in `solved`.
/// Fresh variables minted for instantiation draw from `fresh`, which the
/// caller shares across all functions solved together.
pub fn collect_poly_with(
    module: &Module,
    lines: &LineIndex,
    symbols: &SymbolTable,
    graph: &CallGraph,
    solved: &HashMap<FunId, Unifier>,
    fresh: &mut u32,
    fun: FunId,
) -> PolyConstraints {
    let mut collector = Collector {
        module,
        lines,
        symbols,
        poly: Some(PolyCtx {
            graph,
            solved,
            fresh,
        }),
        constraints: Vec::new(),
        rewrites: Vec::new(),
    };
    collector.fun(fun);

    let mut solver = collector.constraints.clone();
    for (index, constraint) in collector.rewrites {
        solver[index] = constraint;
    }
    PolyConstraints {
        collected: collector.constraints,
        solver,
    }
}

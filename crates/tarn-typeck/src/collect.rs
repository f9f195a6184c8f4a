use std::collections::HashMap;
use tarn_ast::*;
use tarn_sema::{CallGraph, SymbolTable};

use crate::constraint::Constraint;
use crate::types::{node_term, Term};
use crate::unify::{instantiate, Unifier};

/// Collect the equality constraints for one function body (monomorphic
/// mode). Collection is purely declarative and never fails; every call
/// site of a function is unified against the callee's single declaration
/// variable, so all call sites must agree on one type.
pub fn collect(
    module: &Module,
    lines: &LineIndex,
    symbols: &SymbolTable,
    fun: FunId,
) -> Vec<Constraint> {
    let mut collector = Collector {
        module,
        lines,
        symbols,
        poly: None,
        constraints: Vec::new(),
        rewrites: Vec::new(),
    };
    collector.fun(fun);
    collector.constraints
}

/// Polymorphic context: the call graph resolves callee identity, and the
/// solved unifiers of earlier functions are read-only skeleton sources.
pub(crate) struct PolyCtx<'a> {
    pub(crate) graph: &'a CallGraph,
    pub(crate) solved: &'a HashMap<FunId, Unifier>,
    pub(crate) fresh: &'a mut u32,
}

pub(crate) struct Collector<'a> {
    pub(crate) module: &'a Module,
    pub(crate) lines: &'a LineIndex,
    pub(crate) symbols: &'a SymbolTable,
    pub(crate) poly: Option<PolyCtx<'a>>,
    /// Constraints as collected; this is the rendering contract.
    pub(crate) constraints: Vec<Constraint>,
    /// Call-site replacements for the solver: same position in
    /// `constraints`, callee skeleton instantiated on the left.
    pub(crate) rewrites: Vec<(usize, Constraint)>,
}

impl Collector<'_> {
    /// The term standing for an expression. A variable reference has no
    /// term of its own: it is its declaration's variable.
    fn term_of(&self, expr: ExprId) -> Term {
        if let ExprKind::Var(_) = self.module.exprs[expr].kind {
            let decl = self
                .symbols
                .declaration_of(expr)
                .expect("symbol table is total for resolved modules");
            node_term(self.module, self.lines, NodeRef::Decl(decl))
        } else {
            node_term(self.module, self.lines, NodeRef::Expr(expr))
        }
    }

    fn decl_term(&self, decl: DeclId) -> Term {
        node_term(self.module, self.lines, NodeRef::Decl(decl))
    }

    fn emit(&mut self, lhs: Term, rhs: Term) {
        self.constraints.push(Constraint::new(lhs, rhs));
    }

    pub(crate) fn fun(&mut self, id: FunId) {
        let fun = &self.module.funs[id];
        self.stmts(&fun.body);
        self.expr(fun.ret);

        let params = fun.params.iter().map(|&p| self.decl_term(p)).collect();
        let signature = Term::fun(params, self.term_of(fun.ret));
        self.emit(self.decl_term(fun.name_decl), signature);

        // The entry point is called from outside: its parameters and its
        // result are the base type.
        if fun.name(self.module) == "main" {
            for &p in &fun.params {
                self.emit(self.decl_term(p), Term::Int);
            }
            self.emit(self.term_of(fun.ret), Term::Int);
        }
    }

    fn stmts(&mut self, body: &[StmtId]) {
        for &stmt in body {
            match &self.module.stmts[stmt].kind {
                StmtKind::Assign { lhs, rhs } => {
                    let (lhs, rhs) = (*lhs, *rhs);
                    self.expr(lhs);
                    self.expr(rhs);
                    self.emit(self.term_of(lhs), self.term_of(rhs));
                }
                StmtKind::Output(expr) => {
                    let expr = *expr;
                    self.expr(expr);
                    self.emit(self.term_of(expr), Term::Int);
                }
                StmtKind::If {
                    cond,
                    then_body,
                    else_body,
                } => {
                    let cond = *cond;
                    let (then_body, else_body) = (then_body.clone(), else_body.clone());
                    self.expr(cond);
                    self.emit(self.term_of(cond), Term::Int);
                    self.stmts(&then_body);
                    self.stmts(&else_body);
                }
                StmtKind::While { cond, body } => {
                    let cond = *cond;
                    let body = body.clone();
                    self.expr(cond);
                    self.emit(self.term_of(cond), Term::Int);
                    self.stmts(&body);
                }
            }
        }
    }

    fn expr(&mut self, id: ExprId) {
        match &self.module.exprs[id].kind {
            ExprKind::Int(_) => self.emit(self.term_of(id), Term::Int),
            // No new constraint: the occurrence shares its declaration's
            // variable via the symbol table.
            ExprKind::Var(_) => {}
            ExprKind::Input => self.emit(self.term_of(id), Term::Int),
            ExprKind::Binary { op, lhs, rhs } => {
                let (op, lhs, rhs) = (*op, *lhs, *rhs);
                self.expr(lhs);
                self.expr(rhs);
                if op == BinOp::Eq {
                    self.emit(self.term_of(lhs), self.term_of(rhs));
                } else {
                    self.emit(self.term_of(lhs), Term::Int);
                    self.emit(self.term_of(rhs), Term::Int);
                }
                self.emit(self.term_of(id), Term::Int);
            }
            ExprKind::Call { callee, args } => {
                let (callee, args) = (*callee, args.clone());
                self.expr(callee);
                for &arg in &args {
                    self.expr(arg);
                }
                self.call(id, callee, &args);
            }
            ExprKind::Addr(inner) => {
                let inner = *inner;
                self.expr(inner);
                self.emit(self.term_of(id), Term::reference(self.term_of(inner)));
            }
            ExprKind::Deref(inner) => {
                // The pointee type is deduced from the use, not assumed:
                // the operand must be a reference to this expression's type.
                let inner = *inner;
                self.expr(inner);
                self.emit(self.term_of(inner), Term::reference(self.term_of(id)));
            }
            ExprKind::Alloc(inner) => {
                let inner = *inner;
                self.expr(inner);
                self.emit(self.term_of(id), Term::reference(self.term_of(inner)));
            }
        }
    }

    /// `callee(args...)`: in both modes the collected constraint reads
    /// `⟦callee⟧ = (⟦args⟧...) -> ⟦call⟧`. In polymorphic mode the solver
    /// instead sees the callee's solved skeleton, freshly instantiated for
    /// this call site, so the declaration variable is never forced equal
    /// to one concrete instance.
    fn call(&mut self, call: ExprId, callee: ExprId, args: &[ExprId]) {
        let arg_terms: Vec<Term> = args.iter().map(|&a| self.term_of(a)).collect();
        let shape = Term::fun(arg_terms, self.term_of(call));
        let callee_term = self.term_of(callee);

        if let Some(poly) = &mut self.poly {
            let target = poly.graph.callee_of(call).unwrap_or_else(|| {
                panic!(
                    "call graph has no entry for call site `{}`",
                    self.module.expr_text(call)
                )
            });
            if let Some(solved) = poly.solved.get(&target) {
                let decl = self.module.funs[target].name_decl;
                let skeleton =
                    solved.resolve(&node_term(self.module, self.lines, NodeRef::Decl(decl)));
                let instance = instantiate(&skeleton, poly.fresh);
                log::debug!(
                    "instantiating `{}` at `{}`: {}",
                    self.module.funs[target].name(self.module),
                    self.module.expr_text(call),
                    instance
                );
                self.rewrites
                    .push((self.constraints.len(), Constraint::new(instance, shape.clone())));
            }
            // An unsolved callee is a member of this solving unit's own
            // strongly-connected component: monomorphic rule.
        }
        self.emit(callee_term, shape);
    }
}

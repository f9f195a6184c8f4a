//! Name resolution and call-graph construction for Tarn modules.
//!
//! Both structures are built once from the resolved AST and are read-only
//! inputs to type inference: the symbol table disambiguates shadowed
//! identifiers, and the call graph fixes each call site's unique callee
//! (there are no higher-order calls in the language).

use smol_str::SmolStr;
use std::collections::HashMap;
use tarn_ast::*;

#[derive(Debug, Clone, thiserror::Error)]
pub enum SemaError {
    #[error("undeclared variable `{name}`")]
    Undeclared { name: SmolStr, span: Span },

    #[error("`{name}` is declared twice in the same function")]
    DuplicateDecl { name: SmolStr, span: Span },

    #[error("function `{name}` is defined twice")]
    DuplicateFun { name: SmolStr, span: Span },

    #[error("`{name}` is not a function")]
    NotAFunction { name: SmolStr, span: Span },

    #[error("call target must be a function name")]
    CalleeNotNamed { span: Span },
}

impl SemaError {
    pub fn span(&self) -> Span {
        match self {
            SemaError::Undeclared { span, .. }
            | SemaError::DuplicateDecl { span, .. }
            | SemaError::DuplicateFun { span, .. }
            | SemaError::NotAFunction { span, .. }
            | SemaError::CalleeNotNamed { span } => *span,
        }
    }
}

// ── Symbol table ──────────────────────────────────────────────────

/// Maps each identifier occurrence to the unique declaration it denotes.
/// Parameters and locals shadow function names.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    decls: HashMap<ExprId, DeclId>,
}

impl SymbolTable {
    pub fn build(module: &Module) -> Result<SymbolTable, SemaError> {
        let mut globals: HashMap<SmolStr, DeclId> = HashMap::new();
        for (_, fun) in module.funs.iter() {
            let decl = &module.decls[fun.name_decl];
            if globals.insert(decl.name.clone(), fun.name_decl).is_some() {
                return Err(SemaError::DuplicateFun {
                    name: decl.name.clone(),
                    span: decl.span,
                });
            }
        }

        let mut table = SymbolTable::default();
        for (_, fun) in module.funs.iter() {
            let mut scope: HashMap<SmolStr, DeclId> = HashMap::new();
            for &decl_id in fun.params.iter().chain(fun.locals.iter()) {
                let decl = &module.decls[decl_id];
                if scope.insert(decl.name.clone(), decl_id).is_some() {
                    return Err(SemaError::DuplicateDecl {
                        name: decl.name.clone(),
                        span: decl.span,
                    });
                }
            }
            let mut walker = Resolver {
                module,
                globals: &globals,
                scope: &scope,
                table: &mut table,
            };
            walker.stmts(&fun.body)?;
            walker.expr(fun.ret)?;
        }
        Ok(table)
    }

    /// The declaration a variable occurrence resolves to.
    pub fn declaration_of(&self, expr: ExprId) -> Option<DeclId> {
        self.decls.get(&expr).copied()
    }
}

struct Resolver<'a> {
    module: &'a Module,
    globals: &'a HashMap<SmolStr, DeclId>,
    scope: &'a HashMap<SmolStr, DeclId>,
    table: &'a mut SymbolTable,
}

impl Resolver<'_> {
    fn stmts(&mut self, stmts: &[StmtId]) -> Result<(), SemaError> {
        for &stmt in stmts {
            match &self.module.stmts[stmt].kind {
                StmtKind::Assign { lhs, rhs } => {
                    self.expr(*lhs)?;
                    self.expr(*rhs)?;
                }
                StmtKind::Output(expr) => self.expr(*expr)?,
                StmtKind::If {
                    cond,
                    then_body,
                    else_body,
                } => {
                    self.expr(*cond)?;
                    self.stmts(then_body)?;
                    self.stmts(else_body)?;
                }
                StmtKind::While { cond, body } => {
                    self.expr(*cond)?;
                    self.stmts(body)?;
                }
            }
        }
        Ok(())
    }

    fn expr(&mut self, expr: ExprId) -> Result<(), SemaError> {
        match &self.module.exprs[expr].kind {
            ExprKind::Var(name) => {
                let decl = self
                    .scope
                    .get(name)
                    .or_else(|| self.globals.get(name))
                    .copied()
                    .ok_or_else(|| SemaError::Undeclared {
                        name: name.clone(),
                        span: self.module.exprs[expr].span,
                    })?;
                self.table.decls.insert(expr, decl);
            }
            ExprKind::Int(_) | ExprKind::Input => {}
            ExprKind::Binary { lhs, rhs, .. } => {
                self.expr(*lhs)?;
                self.expr(*rhs)?;
            }
            ExprKind::Call { callee, args } => {
                self.expr(*callee)?;
                for &arg in args {
                    self.expr(arg)?;
                }
            }
            ExprKind::Addr(inner) | ExprKind::Deref(inner) | ExprKind::Alloc(inner) => {
                self.expr(*inner)?;
            }
        }
        Ok(())
    }
}

// ── Call graph ────────────────────────────────────────────────────

/// Static call graph: every call expression maps to the unique function it
/// invokes. Built after name resolution; a callee that is not a function
/// name is rejected here, so inference can rely on total lookups.
#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    callee_of: HashMap<ExprId, FunId>,
    by_name: HashMap<SmolStr, FunId>,
    calls: HashMap<FunId, Vec<FunId>>,
}

impl CallGraph {
    pub fn build(module: &Module, symbols: &SymbolTable) -> Result<CallGraph, SemaError> {
        let mut graph = CallGraph::default();
        let mut fun_of_decl: HashMap<DeclId, FunId> = HashMap::new();
        for (id, fun) in module.funs.iter() {
            fun_of_decl.insert(fun.name_decl, id);
            graph.by_name.insert(fun.name(module).clone(), id);
        }

        for (caller, fun) in module.funs.iter() {
            graph.calls.entry(caller).or_default();
            let mut exprs: Vec<ExprId> = vec![fun.ret];
            let mut stmts: Vec<&StmtId> = fun.body.iter().collect();
            while let Some(stmt) = stmts.pop() {
                match &module.stmts[*stmt].kind {
                    StmtKind::Assign { lhs, rhs } => exprs.extend([*lhs, *rhs]),
                    StmtKind::Output(expr) => exprs.push(*expr),
                    StmtKind::If {
                        cond,
                        then_body,
                        else_body,
                    } => {
                        exprs.push(*cond);
                        stmts.extend(then_body.iter().chain(else_body.iter()));
                    }
                    StmtKind::While { cond, body } => {
                        exprs.push(*cond);
                        stmts.extend(body.iter());
                    }
                }
            }
            while let Some(expr) = exprs.pop() {
                match &module.exprs[expr].kind {
                    ExprKind::Call { callee, args } => {
                        graph.add_call(module, symbols, &fun_of_decl, caller, expr, *callee)?;
                        exprs.extend(args.iter().copied());
                    }
                    ExprKind::Binary { lhs, rhs, .. } => exprs.extend([*lhs, *rhs]),
                    ExprKind::Addr(inner) | ExprKind::Deref(inner) | ExprKind::Alloc(inner) => {
                        exprs.push(*inner)
                    }
                    ExprKind::Int(_) | ExprKind::Var(_) | ExprKind::Input => {}
                }
            }
        }
        Ok(graph)
    }

    fn add_call(
        &mut self,
        module: &Module,
        symbols: &SymbolTable,
        fun_of_decl: &HashMap<DeclId, FunId>,
        caller: FunId,
        call: ExprId,
        callee: ExprId,
    ) -> Result<(), SemaError> {
        let ExprKind::Var(name) = &module.exprs[callee].kind else {
            return Err(SemaError::CalleeNotNamed {
                span: module.exprs[callee].span,
            });
        };
        let decl = symbols
            .declaration_of(callee)
            .and_then(|d| fun_of_decl.get(&d).copied());
        let Some(target) = decl else {
            return Err(SemaError::NotAFunction {
                name: name.clone(),
                span: module.exprs[callee].span,
            });
        };
        self.callee_of.insert(call, target);
        let edges = self.calls.entry(caller).or_default();
        if !edges.contains(&target) {
            edges.push(target);
        }
        Ok(())
    }

    /// The function invoked by a call expression.
    pub fn callee_of(&self, call: ExprId) -> Option<FunId> {
        self.callee_of.get(&call).copied()
    }

    /// Look up a function by name.
    pub fn function(&self, name: &str) -> Option<FunId> {
        self.by_name.get(name).copied()
    }

    /// Functions called (directly) by `fun`.
    pub fn calls(&self, fun: FunId) -> &[FunId] {
        self.calls.get(&fun).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Whether `fun` calls itself directly.
    pub fn is_self_recursive(&self, fun: FunId) -> bool {
        self.calls(fun).contains(&fun)
    }

    /// Strongly-connected components in dependency order: every component
    /// is listed after all components it calls into.
    pub fn sccs(&self, module: &Module) -> Vec<Vec<FunId>> {
        let mut tarjan = Tarjan {
            graph: self,
            index: 0,
            indices: HashMap::new(),
            lowlinks: HashMap::new(),
            on_stack: HashMap::new(),
            stack: Vec::new(),
            sccs: Vec::new(),
        };
        for (fun, _) in module.funs.iter() {
            if !tarjan.indices.contains_key(&fun) {
                tarjan.visit(fun);
            }
        }
        tarjan.sccs
    }
}

/// Tarjan's algorithm; components complete only after everything they can
/// reach, so the output order has callees first.
struct Tarjan<'a> {
    graph: &'a CallGraph,
    index: u32,
    indices: HashMap<FunId, u32>,
    lowlinks: HashMap<FunId, u32>,
    on_stack: HashMap<FunId, bool>,
    stack: Vec<FunId>,
    sccs: Vec<Vec<FunId>>,
}

impl Tarjan<'_> {
    fn visit(&mut self, fun: FunId) {
        self.indices.insert(fun, self.index);
        self.lowlinks.insert(fun, self.index);
        self.index += 1;
        self.stack.push(fun);
        self.on_stack.insert(fun, true);

        for &callee in self.graph.calls(fun) {
            if !self.indices.contains_key(&callee) {
                self.visit(callee);
                let low = self.lowlinks[&fun].min(self.lowlinks[&callee]);
                self.lowlinks.insert(fun, low);
            } else if self.on_stack.get(&callee).copied().unwrap_or(false) {
                let low = self.lowlinks[&fun].min(self.indices[&callee]);
                self.lowlinks.insert(fun, low);
            }
        }

        if self.lowlinks[&fun] == self.indices[&fun] {
            let mut scc = Vec::new();
            loop {
                let member = self.stack.pop().unwrap();
                self.on_stack.insert(member, false);
                scc.push(member);
                if member == fun {
                    break;
                }
            }
            self.sccs.push(scc);
        }
    }
}

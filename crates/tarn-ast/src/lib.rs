use la_arena::{Arena, Idx};
use smol_str::SmolStr;
use std::fmt;
pub use tarn_lexer::Span;

// ── ID types ──────────────────────────────────────────────────────

pub type ExprId = Idx<Expr>;
pub type StmtId = Idx<Stmt>;
pub type DeclId = Idx<Decl>;
pub type FunId = Idx<Fun>;

/// A reference to either kind of type-carrying AST node. Arena indices are
/// stable for the lifetime of the module, so this is usable as a map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeRef {
    Expr(ExprId),
    Decl(DeclId),
}

impl From<ExprId> for NodeRef {
    fn from(id: ExprId) -> Self {
        NodeRef::Expr(id)
    }
}

impl From<DeclId> for NodeRef {
    fn from(id: DeclId) -> Self {
        NodeRef::Decl(id)
    }
}

// ── Module ────────────────────────────────────────────────────────

/// A parsed source file.
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub funs: Arena<Fun>,
    pub exprs: Arena<Expr>,
    pub stmts: Arena<Stmt>,
    pub decls: Arena<Decl>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_span(&self, node: NodeRef) -> Span {
        match node {
            NodeRef::Expr(id) => self.exprs[id].span,
            NodeRef::Decl(id) => self.decls[id].span,
        }
    }

    /// Canonical source-text rendering of a node, used to label its type
    /// variable. Deterministic; position qualification is the caller's job.
    pub fn node_text(&self, node: NodeRef) -> String {
        match node {
            NodeRef::Expr(id) => self.expr_text(id),
            NodeRef::Decl(id) => self.decls[id].name.to_string(),
        }
    }

    pub fn expr_text(&self, id: ExprId) -> String {
        match &self.exprs[id].kind {
            ExprKind::Int(n) => n.to_string(),
            ExprKind::Var(name) => name.to_string(),
            ExprKind::Input => "input".to_string(),
            ExprKind::Binary { op, lhs, rhs } => {
                format!("({} {} {})", self.expr_text(*lhs), op, self.expr_text(*rhs))
            }
            ExprKind::Call { callee, args } => {
                let args: Vec<String> = args.iter().map(|a| self.expr_text(*a)).collect();
                format!("{}({})", self.expr_text(*callee), args.join(","))
            }
            ExprKind::Addr(inner) => format!("&{}", self.expr_text(*inner)),
            ExprKind::Deref(inner) => format!("(*{})", self.expr_text(*inner)),
            ExprKind::Alloc(inner) => format!("alloc {}", self.expr_text(*inner)),
        }
    }
}

// ── Declarations ──────────────────────────────────────────────────

/// A declared name: a function name, a parameter, or a local introduced by
/// `var`. Identifier occurrences resolve to exactly one of these.
#[derive(Debug, Clone)]
pub struct Decl {
    pub name: SmolStr,
    pub span: Span,
}

/// Function definition: `name(p1, ..., pn) { var ...; stmts; return e; }`
#[derive(Debug, Clone)]
pub struct Fun {
    /// Declaration node for the function's own name.
    pub name_decl: DeclId,
    pub params: Vec<DeclId>,
    /// Locals introduced by leading `var` statements.
    pub locals: Vec<DeclId>,
    pub body: Vec<StmtId>,
    /// The expression of the trailing `return`.
    pub ret: ExprId,
    pub span: Span,
}

impl Fun {
    pub fn name<'m>(&self, module: &'m Module) -> &'m SmolStr {
        &module.decls[self.name_decl].name
    }
}

// ── Statements ────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    /// `lhs = rhs;` where lhs is an identifier or a dereference.
    Assign { lhs: ExprId, rhs: ExprId },
    /// `output e;`
    Output(ExprId),
    /// `if (cond) { then } else { els }`
    If {
        cond: ExprId,
        then_body: Vec<StmtId>,
        else_body: Vec<StmtId>,
    },
    /// `while (cond) { body }`
    While { cond: ExprId, body: Vec<StmtId> },
}

// ── Expressions ───────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Integer literal.
    Int(i64),
    /// Variable reference.
    Var(SmolStr),
    /// Binary operation: `(lhs op rhs)`
    Binary {
        op: BinOp,
        lhs: ExprId,
        rhs: ExprId,
    },
    /// `input`
    Input,
    /// Function call: `callee(args...)`
    Call { callee: ExprId, args: Vec<ExprId> },
    /// Address-of: `&x`
    Addr(ExprId),
    /// Dereference: `*e`
    Deref(ExprId),
    /// Heap cell: `alloc e`
    Alloc(ExprId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Gt,
    Eq,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Gt => ">",
            BinOp::Eq => "==",
        };
        write!(f, "{}", s)
    }
}

// ── Pretty printer ────────────────────────────────────────────────

/// Render the module back to canonical source form.
pub fn pretty_print(module: &Module) -> String {
    let mut printer = PrettyPrinter {
        module,
        buf: String::new(),
        indent: 0,
    };
    printer.print_module();
    printer.buf
}

struct PrettyPrinter<'a> {
    module: &'a Module,
    buf: String,
    indent: usize,
}

impl PrettyPrinter<'_> {
    fn writeln(&mut self, s: &str) {
        for _ in 0..self.indent {
            self.buf.push_str("  ");
        }
        self.buf.push_str(s);
        self.buf.push('\n');
    }

    fn print_module(&mut self) {
        for (i, (_, fun)) in self.module.funs.iter().enumerate() {
            if i > 0 {
                self.buf.push('\n');
            }
            self.print_fun(fun);
        }
    }

    fn print_fun(&mut self, fun: &Fun) {
        let params: Vec<&str> = fun
            .params
            .iter()
            .map(|&p| self.module.decls[p].name.as_str())
            .collect();
        self.writeln(&format!("{}({}) {{", fun.name(self.module), params.join(", ")));
        self.indent += 1;
        if !fun.locals.is_empty() {
            let locals: Vec<&str> = fun
                .locals
                .iter()
                .map(|&d| self.module.decls[d].name.as_str())
                .collect();
            self.writeln(&format!("var {};", locals.join(", ")));
        }
        for &stmt in &fun.body {
            self.print_stmt(stmt);
        }
        self.writeln(&format!("return {};", self.module.expr_text(fun.ret)));
        self.indent -= 1;
        self.writeln("}");
    }

    fn print_stmt(&mut self, id: StmtId) {
        match &self.module.stmts[id].kind {
            StmtKind::Assign { lhs, rhs } => {
                let line = format!(
                    "{} = {};",
                    self.module.expr_text(*lhs),
                    self.module.expr_text(*rhs)
                );
                self.writeln(&line);
            }
            StmtKind::Output(expr) => {
                let line = format!("output {};", self.module.expr_text(*expr));
                self.writeln(&line);
            }
            StmtKind::If {
                cond,
                then_body,
                else_body,
            } => {
                let header = format!("if ({}) {{", self.module.expr_text(*cond));
                self.writeln(&header);
                self.indent += 1;
                for &stmt in then_body {
                    self.print_stmt(stmt);
                }
                self.indent -= 1;
                if else_body.is_empty() {
                    self.writeln("}");
                } else {
                    self.writeln("} else {");
                    self.indent += 1;
                    for &stmt in else_body {
                        self.print_stmt(stmt);
                    }
                    self.indent -= 1;
                    self.writeln("}");
                }
            }
            StmtKind::While { cond, body } => {
                let header = format!("while ({}) {{", self.module.expr_text(*cond));
                self.writeln(&header);
                self.indent += 1;
                for &stmt in body {
                    self.print_stmt(stmt);
                }
                self.indent -= 1;
                self.writeln("}");
            }
        }
    }
}

// ── Line index ────────────────────────────────────────────────────

/// Maps byte offsets to 1-based line and 0-based byte column, for the
/// `@line:col` qualifier on type variables and for diagnostics.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<u32>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i as u32 + 1);
            }
        }
        Self { line_starts }
    }

    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        (line as u32 + 1, offset - self.line_starts[line])
    }
}

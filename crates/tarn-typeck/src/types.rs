use smol_str::SmolStr;
use std::fmt;
use tarn_ast::{LineIndex, Module, NodeRef};

// ── Type terms ───────────────────────────────────────────────────

/// A type variable. Node variables stand for the type of one AST node and
/// are the same entity iff they denote the same node; the label and
/// position are carried only for rendering. Instantiation variables are
/// minted when a solved signature is copied for a single call site.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TermVar {
    Node {
        node: NodeRef,
        label: SmolStr,
        line: u32,
        col: u32,
    },
    Fresh(u32),
}

impl fmt::Display for TermVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TermVar::Node {
                label, line, col, ..
            } => write!(f, "\u{27e6}{}@{}:{}\u{27e7}", label, line, col),
            TermVar::Fresh(n) => write!(f, "\u{3b1}{}", n),
        }
    }
}

/// The recursive type-term grammar: variables, the base type, function
/// types, and reference (pointer) types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    Var(TermVar),
    Int,
    /// Function type: `(params...) -> return`
    Fun(Vec<Term>, Box<Term>),
    /// Reference type wrapping the pointee.
    Ref(Box<Term>),
}

impl Term {
    pub fn fun(params: Vec<Term>, ret: Term) -> Term {
        Term::Fun(params, Box::new(ret))
    }

    pub fn reference(inner: Term) -> Term {
        Term::Ref(Box::new(inner))
    }

    /// Whether `var` occurs anywhere in this term (the occurs check).
    pub fn contains(&self, var: &TermVar) -> bool {
        match self {
            Term::Var(v) => v == var,
            Term::Int => false,
            Term::Fun(params, ret) => {
                params.iter().any(|p| p.contains(var)) || ret.contains(var)
            }
            Term::Ref(inner) => inner.contains(var),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Var(v) => write!(f, "{}", v),
            Term::Int => write!(f, "int"),
            Term::Fun(params, ret) => {
                write!(f, "(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ") -> {}", ret)
            }
            Term::Ref(inner) => write!(f, "\u{2b61}{}", inner),
        }
    }
}

/// The type variable standing for an AST node, labelled with the node's
/// canonical source text and position so that identical text at different
/// locations never collides.
pub fn node_term(module: &Module, lines: &LineIndex, node: NodeRef) -> Term {
    let span = module.node_span(node);
    let (line, col) = lines.line_col(span.start);
    Term::Var(TermVar::Node {
        node,
        label: module.node_text(node).into(),
        line,
        col,
    })
}

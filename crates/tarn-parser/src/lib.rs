use smol_str::SmolStr;
use tarn_ast::*;
use tarn_lexer::{lex, Span, Token};

#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.span.start, self.span.end, self.message)
    }
}

pub fn parse(source: &str) -> (Module, Vec<ParseError>) {
    let (tokens, lex_errors) = lex(source);
    let mut parser = Parser::new(tokens);
    let mut errors: Vec<ParseError> = lex_errors
        .into_iter()
        .map(|span| ParseError {
            message: "unexpected character".into(),
            span,
        })
        .collect();
    parser.parse_module();
    errors.append(&mut parser.errors);
    (parser.module, errors)
}

struct Parser {
    tokens: Vec<(Token, Span)>,
    pos: usize,
    module: Module,
    errors: Vec<ParseError>,
}

impl Parser {
    fn new(tokens: Vec<(Token, Span)>) -> Self {
        Self {
            tokens,
            pos: 0,
            module: Module::new(),
            errors: Vec::new(),
        }
    }

    // ── Token helpers ─────────────────────────────────────────────

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|(_, s)| *s)
            .unwrap_or_else(|| {
                self.tokens
                    .last()
                    .map(|(_, s)| Span::new(s.end, s.end))
                    .unwrap_or(Span::new(0, 0))
            })
    }

    fn advance(&mut self) -> (Token, Span) {
        let tok = self.tokens[self.pos].clone();
        self.pos += 1;
        tok
    }

    fn check(&self, expected: &Token) -> bool {
        self.peek() == Some(expected)
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.check(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Option<Span> {
        if self.check(expected) {
            let (_, span) = self.advance();
            Some(span)
        } else {
            let span = self.peek_span();
            self.error(
                format!("expected {:?}, found {:?}", expected, self.peek()),
                span,
            );
            None
        }
    }

    fn expect_ident(&mut self) -> Option<(SmolStr, Span)> {
        if let Some(Token::Ident(_)) = self.peek() {
            let (tok, span) = self.advance();
            if let Token::Ident(name) = tok {
                return Some((name, span));
            }
        }
        let span = self.peek_span();
        self.error(format!("expected identifier, found {:?}", self.peek()), span);
        None
    }

    fn error(&mut self, message: String, span: Span) {
        self.errors.push(ParseError { message, span });
    }

    /// Skip tokens until we reach a `}` at depth 0, consuming it.
    fn recover_to_close_brace(&mut self) {
        let mut depth = 1;
        while !self.at_end() && depth > 0 {
            match self.peek() {
                Some(Token::LBrace) => {
                    depth += 1;
                    self.advance();
                }
                Some(Token::RBrace) => {
                    depth -= 1;
                    self.advance();
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    // ── Allocators ────────────────────────────────────────────────

    fn alloc_expr(&mut self, kind: ExprKind, span: Span) -> ExprId {
        self.module.exprs.alloc(Expr { kind, span })
    }

    fn alloc_stmt(&mut self, kind: StmtKind, span: Span) -> StmtId {
        self.module.stmts.alloc(Stmt { kind, span })
    }

    fn alloc_decl(&mut self, name: SmolStr, span: Span) -> DeclId {
        self.module.decls.alloc(Decl { name, span })
    }

    // ── Module parsing ────────────────────────────────────────────

    fn parse_module(&mut self) {
        while !self.at_end() {
            self.parse_fun();
        }
    }

    /// `name(p1, ..., pn) { var ...; stmts; return e; }`
    fn parse_fun(&mut self) {
        let Some((name, name_span)) = self.expect_ident() else {
            self.advance();
            return;
        };
        let name_decl = self.alloc_decl(name, name_span);

        if self.expect(&Token::LParen).is_none() {
            return;
        }
        let mut params = Vec::new();
        if !self.check(&Token::RParen) {
            loop {
                let Some((pname, pspan)) = self.expect_ident() else {
                    break;
                };
                params.push(self.alloc_decl(pname, pspan));
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(&Token::RParen);

        if self.expect(&Token::LBrace).is_none() {
            return;
        }

        let locals = self.parse_var_decls();
        let mut body = Vec::new();
        while !self.at_end() && !self.check(&Token::Return) && !self.check(&Token::RBrace) {
            match self.parse_stmt() {
                Some(stmt) => body.push(stmt),
                None => {
                    self.recover_to_close_brace();
                    return;
                }
            }
        }

        let ret = if self.eat(&Token::Return) {
            let expr = self.parse_expr();
            self.expect(&Token::Semi);
            expr
        } else {
            let span = self.peek_span();
            self.error("function body must end with a return statement".into(), span);
            self.recover_to_close_brace();
            return;
        };
        let Some(ret) = ret else {
            self.recover_to_close_brace();
            return;
        };

        let close = self.expect(&Token::RBrace);
        let end = close.unwrap_or_else(|| self.peek_span());
        self.module.funs.alloc(Fun {
            name_decl,
            params,
            locals,
            body,
            ret,
            span: name_span.merge(end),
        });
    }

    /// Leading `var a, b, c;` statements.
    fn parse_var_decls(&mut self) -> Vec<DeclId> {
        let mut locals = Vec::new();
        while self.eat(&Token::Var) {
            loop {
                let Some((name, span)) = self.expect_ident() else {
                    break;
                };
                locals.push(self.alloc_decl(name, span));
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
            self.expect(&Token::Semi);
        }
        locals
    }

    // ── Statements ────────────────────────────────────────────────

    fn parse_stmt(&mut self) -> Option<StmtId> {
        let start = self.peek_span();
        match self.peek() {
            Some(Token::Output) => {
                self.advance();
                let expr = self.parse_expr()?;
                let end = self.expect(&Token::Semi)?;
                Some(self.alloc_stmt(StmtKind::Output(expr), start.merge(end)))
            }
            Some(Token::If) => {
                self.advance();
                self.expect(&Token::LParen)?;
                let cond = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                let then_body = self.parse_block()?;
                let else_body = if self.eat(&Token::Else) {
                    self.parse_block()?
                } else {
                    Vec::new()
                };
                let end = self.prev_span();
                Some(self.alloc_stmt(
                    StmtKind::If {
                        cond,
                        then_body,
                        else_body,
                    },
                    start.merge(end),
                ))
            }
            Some(Token::While) => {
                self.advance();
                self.expect(&Token::LParen)?;
                let cond = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                let body = self.parse_block()?;
                let end = self.prev_span();
                Some(self.alloc_stmt(StmtKind::While { cond, body }, start.merge(end)))
            }
            _ => {
                let lhs = self.parse_expr()?;
                self.expect(&Token::Eq)?;
                let rhs = self.parse_expr()?;
                let end = self.expect(&Token::Semi)?;
                Some(self.alloc_stmt(StmtKind::Assign { lhs, rhs }, start.merge(end)))
            }
        }
    }

    fn parse_block(&mut self) -> Option<Vec<StmtId>> {
        self.expect(&Token::LBrace)?;
        let mut stmts = Vec::new();
        while !self.at_end() && !self.check(&Token::RBrace) {
            stmts.push(self.parse_stmt()?);
        }
        self.expect(&Token::RBrace)?;
        Some(stmts)
    }

    fn prev_span(&self) -> Span {
        self.tokens
            .get(self.pos.saturating_sub(1))
            .map(|(_, s)| *s)
            .unwrap_or(Span::new(0, 0))
    }

    // ── Expressions ───────────────────────────────────────────────

    fn parse_expr(&mut self) -> Option<ExprId> {
        self.parse_equality()
    }

    fn parse_equality(&mut self) -> Option<ExprId> {
        let mut lhs = self.parse_relational()?;
        while self.check(&Token::EqEq) {
            self.advance();
            let rhs = self.parse_relational()?;
            lhs = self.binary(BinOp::Eq, lhs, rhs);
        }
        Some(lhs)
    }

    fn parse_relational(&mut self) -> Option<ExprId> {
        let mut lhs = self.parse_additive()?;
        while self.check(&Token::Gt) {
            self.advance();
            let rhs = self.parse_additive()?;
            lhs = self.binary(BinOp::Gt, lhs, rhs);
        }
        Some(lhs)
    }

    fn parse_additive(&mut self) -> Option<ExprId> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = self.binary(op, lhs, rhs);
        }
        Some(lhs)
    }

    fn parse_multiplicative(&mut self) -> Option<ExprId> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = self.binary(op, lhs, rhs);
        }
        Some(lhs)
    }

    fn binary(&mut self, op: BinOp, lhs: ExprId, rhs: ExprId) -> ExprId {
        let span = self.module.exprs[lhs]
            .span
            .merge(self.module.exprs[rhs].span);
        self.alloc_expr(ExprKind::Binary { op, lhs, rhs }, span)
    }

    fn parse_unary(&mut self) -> Option<ExprId> {
        let start = self.peek_span();
        match self.peek() {
            Some(Token::Star) => {
                self.advance();
                let inner = self.parse_unary()?;
                let span = start.merge(self.module.exprs[inner].span);
                Some(self.alloc_expr(ExprKind::Deref(inner), span))
            }
            Some(Token::Amp) => {
                // Address-of applies to identifiers only.
                self.advance();
                let (name, span) = self.expect_ident()?;
                let var = self.alloc_expr(ExprKind::Var(name), span);
                Some(self.alloc_expr(ExprKind::Addr(var), start.merge(span)))
            }
            Some(Token::Alloc) => {
                self.advance();
                let inner = self.parse_unary()?;
                let span = start.merge(self.module.exprs[inner].span);
                Some(self.alloc_expr(ExprKind::Alloc(inner), span))
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Option<ExprId> {
        let mut expr = self.parse_primary()?;
        while self.check(&Token::LParen) {
            self.advance();
            let mut args = Vec::new();
            if !self.check(&Token::RParen) {
                loop {
                    args.push(self.parse_expr()?);
                    if !self.eat(&Token::Comma) {
                        break;
                    }
                }
            }
            let end = self.expect(&Token::RParen)?;
            let span = self.module.exprs[expr].span.merge(end);
            expr = self.alloc_expr(ExprKind::Call { callee: expr, args }, span);
        }
        Some(expr)
    }

    fn parse_primary(&mut self) -> Option<ExprId> {
        match self.peek() {
            Some(Token::Int(_)) => {
                let (tok, span) = self.advance();
                let Token::Int(n) = tok else { unreachable!() };
                Some(self.alloc_expr(ExprKind::Int(n), span))
            }
            Some(Token::Ident(_)) => {
                let (tok, span) = self.advance();
                let Token::Ident(name) = tok else {
                    unreachable!()
                };
                Some(self.alloc_expr(ExprKind::Var(name), span))
            }
            Some(Token::Input) => {
                let (_, span) = self.advance();
                Some(self.alloc_expr(ExprKind::Input, span))
            }
            Some(Token::LParen) => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Some(expr)
            }
            _ => {
                let span = self.peek_span();
                self.error(
                    format!("expected expression, found {:?}", self.peek()),
                    span,
                );
                None
            }
        }
    }
}

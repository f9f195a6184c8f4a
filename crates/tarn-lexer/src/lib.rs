use logos::Logos;
use smol_str::SmolStr;

/// Source span as byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r"//[^\n]*")]
pub enum Token {
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(";")]
    Semi,

    #[token("==")]
    EqEq,
    #[token("=")]
    Eq,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token(">")]
    Gt,
    #[token("&")]
    Amp,

    #[token("var")]
    Var,
    #[token("return")]
    Return,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("output")]
    Output,
    #[token("input")]
    Input,
    #[token("alloc")]
    Alloc,

    #[regex(r"[0-9]+", callback = |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", callback = |lex| SmolStr::new(lex.slice()))]
    Ident(SmolStr),
}

/// Lex source code into a list of (token, span) pairs.
pub fn lex(source: &str) -> (Vec<(Token, Span)>, Vec<Span>) {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    let mut lexer = Token::lexer(source);

    while let Some(result) = lexer.next() {
        let range = lexer.span();
        let span = Span::new(range.start as u32, range.end as u32);
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(_) => errors.push(span),
        }
    }

    (tokens, errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_tokens(source: &str) -> Vec<Token> {
        let (tokens, errors) = lex(source);
        assert!(errors.is_empty(), "unexpected lex errors: {:?}", errors);
        tokens.into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn test_delimiters() {
        assert_eq!(
            lex_tokens("( ) { } , ;"),
            vec![
                Token::LParen,
                Token::RParen,
                Token::LBrace,
                Token::RBrace,
                Token::Comma,
                Token::Semi,
            ]
        );
    }

    #[test]
    fn test_integers() {
        assert_eq!(lex_tokens("42"), vec![Token::Int(42)]);
        assert_eq!(lex_tokens("0"), vec![Token::Int(0)]);
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            lex_tokens("var return if else while output input alloc"),
            vec![
                Token::Var,
                Token::Return,
                Token::If,
                Token::Else,
                Token::While,
                Token::Output,
                Token::Input,
                Token::Alloc,
            ]
        );
    }

    #[test]
    fn test_keyword_prefix_is_identifier() {
        // "variable" starts with "var" but must lex as one identifier
        assert_eq!(
            lex_tokens("variable inputs"),
            vec![
                Token::Ident("variable".into()),
                Token::Ident("inputs".into()),
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            lex_tokens("+ - * / > = =="),
            vec![
                Token::Plus,
                Token::Minus,
                Token::Star,
                Token::Slash,
                Token::Gt,
                Token::Eq,
                Token::EqEq,
            ]
        );
    }

    #[test]
    fn test_eqeq_not_two_assigns() {
        assert_eq!(
            lex_tokens("x==y"),
            vec![
                Token::Ident("x".into()),
                Token::EqEq,
                Token::Ident("y".into()),
            ]
        );
    }

    #[test]
    fn test_pointer_operators() {
        assert_eq!(
            lex_tokens("*p &x"),
            vec![
                Token::Star,
                Token::Ident("p".into()),
                Token::Amp,
                Token::Ident("x".into()),
            ]
        );
    }

    #[test]
    fn test_comments_skipped() {
        assert_eq!(lex_tokens("// a comment\n42"), vec![Token::Int(42)]);
    }

    #[test]
    fn test_assignment_statement() {
        assert_eq!(
            lex_tokens("x = ident(42);"),
            vec![
                Token::Ident("x".into()),
                Token::Eq,
                Token::Ident("ident".into()),
                Token::LParen,
                Token::Int(42),
                Token::RParen,
                Token::Semi,
            ]
        );
    }

    #[test]
    fn test_spans() {
        let (tokens, _) = lex("x = 1;");
        assert_eq!(tokens[0], (Token::Ident("x".into()), Span::new(0, 1)));
        assert_eq!(tokens[1], (Token::Eq, Span::new(2, 3)));
        assert_eq!(tokens[2], (Token::Int(1), Span::new(4, 5)));
        assert_eq!(tokens[3], (Token::Semi, Span::new(5, 6)));
    }

    #[test]
    fn test_unexpected_character() {
        let (_, errors) = lex("x = @;");
        assert_eq!(errors, vec![Span::new(4, 5)]);
    }
}

use logos::Logos;

use crate::errors::{OpalError, Result};

#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(skip r"[ \t\r\f]+")]
pub enum Token {
    // ── keywords ────────────────────────────────────────────────
    #[token("class")]
    Class,

    #[token("def")]
    Def,

    #[token("end")]
    End,

    #[token("if")]
    If,

    #[token("then")]
    Then,

    #[token("else")]
    Else,

    #[token("while")]
    While,

    #[token("for")]
    For,

    #[token("in")]
    In,

    #[token("break")]
    Break,

    #[token("continue")]
    Continue,

    #[token("return")]
    Return,

    #[token("print")]
    Print,

    #[token("true")]
    True,

    #[token("false")]
    False,

    // ── operators ───────────────────────────────────────────────
    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("=")]
    Assign,

    #[token("==")]
    EqEq,

    #[token("!=")]
    NotEq,

    #[token(">")]
    Gt,

    #[token(">=")]
    Gte,

    /// Less-than; also the inheritance marker in `class Dog < Animal`.
    #[token("<")]
    Lt,

    #[token("<=")]
    Lte,

    // ── punctuation ─────────────────────────────────────────────
    #[token("::")]
    DoubleColon,

    #[token(".")]
    Dot,

    #[token(",")]
    Comma,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    /// Statements are newline separated.
    #[token("\n")]
    Newline,

    // ── literals ────────────────────────────────────────────────

    /// Float literal: 3.14, 144.0
    #[regex(r"[0-9]+\.[0-9]+")]
    FloatLit,

    /// Integer literal: 42, 0, 100
    #[regex(r"[0-9]+")]
    IntLit,

    /// String literal: "hello world" or 'hello world'
    #[regex(r#""([^"\\\n]|\\.)*""#)]
    #[regex(r#"'([^'\\\n]|\\.)*'"#)]
    Str,

    /// Identifier: foo, Object, do_it
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,

    /// `# comment` to end of line.
    #[regex(r"#[^\n]*", logos::skip)]
    Comment,
}

/// A single token together with the source text it matched.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub lexeme: String,
    /// 1-based source line.
    pub line: usize,
}

/// Lex the whole source up-front.
pub fn tokenize(source: &str) -> Result<Vec<SpannedToken>> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut consumed = 0;

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        line += source[consumed..span.start].matches('\n').count();
        consumed = span.start;

        match result {
            Ok(token) => tokens.push(SpannedToken {
                token,
                lexeme: lexer.slice().to_string(),
                line,
            }),
            Err(()) => {
                return Err(OpalError::lexer(
                    line,
                    format!("unexpected character '{}'", lexer.slice()),
                ))
            }
        }
    }

    Ok(tokens)
}

/// Strip the quotes from a string literal and resolve its escapes.
pub fn unquote(lexeme: &str) -> String {
    let inner = &lexeme[1..lexeme.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source).unwrap().into_iter().map(|t| t.token).collect()
    }

    #[test]
    fn keywords_win_over_identifiers() {
        assert_eq!(
            kinds("class Foo < Object"),
            vec![Token::Class, Token::Ident, Token::Lt, Token::Ident]
        );
        assert_eq!(kinds("classy"), vec![Token::Ident]);
    }

    #[test]
    fn numbers_and_operators() {
        assert_eq!(
            kinds("1.2 + 34 >= 5"),
            vec![Token::FloatLit, Token::Plus, Token::IntLit, Token::Gte, Token::IntLit]
        );
        assert_eq!(kinds("a == b"), vec![Token::Ident, Token::EqEq, Token::Ident]);
    }

    #[test]
    fn typed_params_use_double_colon() {
        assert_eq!(
            kinds("(val::Cint32)"),
            vec![Token::LParen, Token::Ident, Token::DoubleColon, Token::Ident, Token::RParen]
        );
    }

    #[test]
    fn tracks_lines_and_skips_comments() {
        let tokens = tokenize("a = 1 # set a\nprint(a)").unwrap();
        assert_eq!(tokens[3].token, Token::Newline);
        assert_eq!(tokens[4].token, Token::Print);
        assert_eq!(tokens[4].line, 2);
    }

    #[test]
    fn both_quote_styles_are_strings() {
        let tokens = tokenize(r#"'andrea' "a j g""#).unwrap();
        assert_eq!(tokens[0].token, Token::Str);
        assert_eq!(unquote(&tokens[0].lexeme), "andrea");
        assert_eq!(unquote(&tokens[1].lexeme), "a j g");
    }

    #[test]
    fn unquote_resolves_escapes() {
        assert_eq!(unquote(r#""a\tb\n""#), "a\tb\n");
        assert_eq!(unquote(r#"'it\'s'"#), "it's");
    }

    #[test]
    fn rejects_unknown_characters() {
        let err = tokenize("a = 1\nb = $").unwrap_err();
        assert_eq!(err.to_string(), "line 2: unexpected character '$'");
    }
}

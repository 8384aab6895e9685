//! Script-level lexer built on logos.
//!
//! The component file is mostly ordinary script: imports, declarations and
//! the exported component. Markup embedded in expression position is not
//! tokenized; the [`Scanner`] hands it to the markup parser and yields a
//! single [`Lexeme::Markup`] covering the whole element, so text such as
//! `don't` inside an element never reaches the script lexer.

use crate::error::ParseError;
use crate::markup;
use logos::Logos;
use std::ops::Range;

/// Script tokens. Whitespace and comments are skipped.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")]
pub enum Token<'src> {
    // Keywords
    #[token("export")]
    Export,
    #[token("default")]
    Default,
    #[token("function")]
    Function,
    #[token("return")]
    Return,
    #[token("async")]
    Async,
    #[token("as")]
    As,
    #[token("const")]
    #[token("let")]
    #[token("var")]
    Binding,

    #[regex(r"[A-Za-z_$][A-Za-z0-9_$]*", |lex| lex.slice())]
    Ident(&'src str),

    // Literals keep their quotes
    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| lex.slice())]
    #[regex(r#"'([^'\\\n]|\\.)*'"#, |lex| lex.slice())]
    Str(&'src str),
    #[regex(r"`([^`\\]|\\(.|\n))*`", |lex| lex.slice())]
    Template(&'src str),
    #[regex(r"[0-9][0-9_]*(\.[0-9_]*)?([eE][+-]?[0-9]+)?n?", |lex| lex.slice())]
    #[regex(r"\.[0-9][0-9_]*([eE][+-]?[0-9]+)?", |lex| lex.slice())]
    #[regex(r"0[xX][0-9a-fA-F_]+", |lex| lex.slice())]
    Number(&'src str),

    // Punctuation
    #[token("=>")]
    Arrow,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("/")]
    Slash,
    #[token("=")]
    Eq,
    #[token(",")]
    Comma,
    #[token(";")]
    Semi,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token("?")]
    Question,
    #[regex(r"[!&|+\-*%^~@#]", |lex| lex.slice())]
    Operator(&'src str),
}

/// One item of the scanned script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lexeme<'src> {
    Token(Token<'src>),
    /// A complete markup element or fragment.
    Markup,
    /// Bytes the lexer does not recognize.
    Unknown,
}

/// Iterator over script lexemes with markup folded into single items.
pub struct Scanner<'src> {
    source: &'src str,
    base: usize,
    lexer: logos::Lexer<'src, Token<'src>>,
    prev: Option<Lexeme<'src>>,
    error: Option<ParseError>,
}

impl<'src> Scanner<'src> {
    pub fn new(source: &'src str) -> Self {
        Self::at(source, 0)
    }

    /// Start scanning at byte `offset`; lexeme ranges stay absolute.
    pub fn at(source: &'src str, offset: usize) -> Self {
        let base = offset.min(source.len());
        Self {
            source,
            base,
            lexer: Token::lexer(source.get(base..).unwrap_or("")),
            prev: None,
            error: None,
        }
    }

    /// The markup error that stopped scanning, if any.
    pub fn take_error(&mut self) -> Option<ParseError> {
        self.error.take()
    }

    fn at_markup_position(&self) -> bool {
        match self.prev {
            None => true,
            Some(Lexeme::Token(token)) => matches!(
                token,
                Token::LParen
                    | Token::LBracket
                    | Token::LBrace
                    | Token::Comma
                    | Token::Eq
                    | Token::Arrow
                    | Token::Return
                    | Token::Question
                    | Token::Colon
                    | Token::Semi
                    | Token::Default
                    | Token::Operator(_)
            ),
            Some(_) => false,
        }
    }
}

impl<'src> Iterator for Scanner<'src> {
    type Item = (Lexeme<'src>, Range<usize>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.error.is_some() {
            return None;
        }
        let result = self.lexer.next()?;
        let span = self.lexer.span();
        let mut range = self.base + span.start..self.base + span.end;

        let lexeme = match result {
            Ok(Token::Lt) if self.at_markup_position() => {
                match markup::skip_element(self.source, range.start) {
                    Ok(end) => {
                        self.lexer.bump(end - range.end);
                        range.end = end;
                    }
                    Err(err) => {
                        // Unbalanced markup: everything after it is unreadable.
                        range.end = self.source.len();
                        self.error = Some(err);
                    }
                }
                Lexeme::Markup
            }
            Ok(token) => Lexeme::Token(token),
            Err(()) => Lexeme::Unknown,
        };

        self.prev = Some(lexeme);
        Some((lexeme, range))
    }
}

pub fn tokenize(source: &str) -> Vec<(Lexeme<'_>, Range<usize>)> {
    Scanner::new(source).collect()
}

/// Offset of the `}` closing the brace at `open`, skipping strings, comments
/// and nested markup.
pub fn expression_end(source: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (lexeme, range) in Scanner::at(source, open) {
        match lexeme {
            Lexeme::Token(Token::LBrace) => depth += 1,
            Lexeme::Token(Token::RBrace) => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(range.start);
                }
            }
            _ => {}
        }
    }
    None
}

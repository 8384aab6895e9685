use crate::ast::{Node, ParseResult, SourceLocation};
use crate::error::{ParseError, Result};
use crate::id_generator::assign_ids;
use crate::literal;
use crate::markup;
use crate::tokenizer::{self, Lexeme, Scanner, Token};
use std::collections::HashMap;
use std::ops::Range;

/// Guards against `const A = B; const B = A;` style reference loops.
const MAX_RESOLVE_DEPTH: u8 = 16;

/// Parse a component source file into a located, id-stamped tree.
pub fn parse(source: &str) -> ParseResult {
    Parser::new(source).parse()
}

/// Parse a single node: one element, one string slot, or plain text.
pub fn parse_fragment(fragment: &str) -> Result<Node> {
    let start = fragment.len() - fragment.trim_start().len();
    let end = fragment.trim_end().len();
    if start >= end {
        return Err(ParseError::invalid_syntax(0, "empty fragment"));
    }
    let body = &fragment[start..end];

    let mut node = if body.starts_with('<') {
        let node = markup::parse_element_at(fragment, start)?;
        if node.loc.end != end {
            return Err(ParseError::invalid_syntax(node.loc.end, "expected exactly one node"));
        }
        node
    } else if body.starts_with('{') {
        let close = tokenizer::expression_end(fragment, start)
            .ok_or_else(|| ParseError::unexpected_eof(start, "`}`"))?;
        if close + 1 != end {
            return Err(ParseError::invalid_syntax(close + 1, "expected exactly one node"));
        }
        let text = literal::string_literal(&fragment[start + 1..close])
            .ok_or_else(|| ParseError::invalid_syntax(start, "expression slot is not a node"))?;
        Node::text_node(text, SourceLocation::new(start, end))
    } else {
        if let Some(offset) = body.find(|c| matches!(c, '<' | '>' | '{' | '}')) {
            return Err(ParseError::invalid_syntax(start + offset, "expected exactly one node"));
        }
        Node::text_node(body.to_string(), SourceLocation::new(start, end))
    };

    assign_ids(&mut node);
    Ok(node)
}

/// Where the tree was found: the markup itself and the returned region
/// around it (wrapping parentheses included).
#[derive(Debug, Clone)]
struct Found {
    markup: Range<usize>,
    region: Range<usize>,
}

#[derive(Debug, Default)]
struct Exports<'src> {
    default: Option<usize>,
    default_name: Option<&'src str>,
    named: Vec<&'src str>,
}

/// Locates the exported component and its returned markup.
pub struct Parser<'src> {
    source: &'src str,
    tokens: Vec<(Lexeme<'src>, Range<usize>)>,
    matching: Vec<Option<usize>>,
    declarations: HashMap<&'src str, usize>,
    scan_error: Option<ParseError>,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Self {
        let mut scanner = Scanner::new(source);
        let tokens: Vec<_> = scanner.by_ref().collect();
        let scan_error = scanner.take_error();
        let matching = match_brackets(&tokens);
        Self {
            source,
            tokens,
            matching,
            declarations: HashMap::new(),
            scan_error,
        }
    }

    pub fn parse(mut self) -> ParseResult {
        let exports = self.collect_exports();

        let found = exports
            .default
            .and_then(|index| self.value_tree(index, 0))
            .or_else(|| exports.default_name.and_then(|name| self.resolve(name, 0)))
            .or_else(|| exports.named.iter().find_map(|name| self.resolve(name, 0)));

        let Some(found) = found else {
            let error = self.scan_error.take().unwrap_or_else(|| {
                if exports.default.is_none() && exports.default_name.is_none() && exports.named.is_empty() {
                    ParseError::no_tree("no exported component")
                } else {
                    ParseError::no_tree("exported component does not return markup")
                }
            });
            return self.finish(None, None, vec![error]);
        };

        match markup::parse_element_at(self.source, found.markup.start) {
            Ok(mut root) => {
                assign_ids(&mut root);
                let region = SourceLocation::from(found.region);
                self.finish(Some(root), Some(region), Vec::new())
            }
            Err(err) => self.finish(None, None, vec![err]),
        }
    }

    fn finish(
        &self,
        root: Option<Node>,
        root_region_loc: Option<SourceLocation>,
        errors: Vec<ParseError>,
    ) -> ParseResult {
        ParseResult {
            root,
            root_region_loc,
            source: self.source.to_string(),
            errors,
        }
    }

    /// Walk top-level statements, recording declarations and exports.
    fn collect_exports(&mut self) -> Exports<'src> {
        let mut exports = Exports::default();
        let mut i = 0;
        while i < self.tokens.len() {
            match self.token(i) {
                Some(Token::Function) => {
                    if let Some(Token::Ident(name)) = self.token(i + 1) {
                        self.declarations.insert(name, i);
                    }
                }
                Some(Token::Binding) => {
                    if let Some(Token::Ident(name)) = self.token(i + 1) {
                        if let Some(init) = self.initializer(i + 2) {
                            self.declarations.insert(name, init);
                        }
                    }
                }
                Some(Token::Export) => match self.token(i + 1) {
                    Some(Token::Default) => exports.default = Some(i + 2),
                    Some(Token::LBrace) => {
                        if let Some(name) = self.default_specifier(i + 1) {
                            exports.default_name = Some(name);
                        }
                    }
                    Some(Token::Async) | Some(Token::Function) => {
                        let at = if self.is(i + 1, Token::Async) { i + 2 } else { i + 1 };
                        if let Some(Token::Ident(name)) = self.token(at + 1) {
                            exports.named.push(name);
                        }
                    }
                    Some(Token::Binding) => {
                        if let Some(Token::Ident(name)) = self.token(i + 2) {
                            exports.named.push(name);
                        }
                    }
                    _ => {}
                },
                _ => {}
            }
            i = self.skip_group(i) + 1;
        }
        exports
    }

    /// Index just past the `=` of a binding, skipping any type annotation.
    fn initializer(&self, mut i: usize) -> Option<usize> {
        while i < self.tokens.len() {
            match self.token(i) {
                Some(Token::Eq) => return Some(i + 1),
                Some(Token::Semi) | Some(Token::Binding) | Some(Token::Export) => return None,
                _ => i = self.skip_group(i) + 1,
            }
        }
        None
    }

    /// `export { Page as default }`
    fn default_specifier(&self, open: usize) -> Option<&'src str> {
        let close = self.matching.get(open).copied().flatten()?;
        (open + 1..close).find_map(|i| match (self.token(i), self.token(i + 1), self.token(i + 2)) {
            (Some(Token::Ident(name)), Some(Token::As), Some(Token::Default)) => Some(name),
            _ => None,
        })
    }

    fn resolve(&self, name: &str, depth: u8) -> Option<Found> {
        let index = *self.declarations.get(name)?;
        self.value_tree(index, depth + 1)
    }

    /// Find the markup a value evaluates to: markup itself, a function or
    /// arrow returning it, a parenthesized or call-wrapped value, or a
    /// reference to a declaration that does.
    fn value_tree(&self, index: usize, depth: u8) -> Option<Found> {
        if depth > MAX_RESOLVE_DEPTH {
            return None;
        }
        let mut i = index;
        if self.is(i, Token::Async) {
            i += 1;
        }

        match self.tokens.get(i)? {
            (Lexeme::Markup, range) => Some(Found {
                markup: range.clone(),
                region: range.clone(),
            }),
            (Lexeme::Token(Token::Function), _) => {
                let params = (i + 1..self.tokens.len()).find(|&j| self.is(j, Token::LParen))?;
                let close = self.matching[params]?;
                let body = (close + 1..self.tokens.len()).find(|&j| self.is(j, Token::LBrace))?;
                self.body_tree(body, depth)
            }
            (Lexeme::Token(Token::LParen), open_range) => {
                let close = self.matching[i]?;
                if let Some(arrow) = self.arrow_after(close + 1) {
                    return self.arrow_body(arrow + 1, depth);
                }
                let inner = self.value_tree(i + 1, depth + 1)?;
                let close_range = &self.tokens[close].1;
                Some(Found {
                    markup: inner.markup,
                    region: open_range.start..close_range.end,
                })
            }
            (Lexeme::Token(Token::Ident(name)), _) => {
                if self.is(i + 1, Token::Arrow) {
                    return self.arrow_body(i + 2, depth);
                }
                let mut j = i + 1;
                while self.is(j, Token::Dot) && matches!(self.token(j + 1), Some(Token::Ident(_))) {
                    j += 2;
                }
                if self.is(j, Token::Lt) {
                    // forwardRef<Ref, Props>(...)
                    j = (j + 1..self.tokens.len().min(j + 32)).find(|&k| self.is(k, Token::Gt))? + 1;
                }
                if self.is(j, Token::LParen) {
                    return self.value_tree(j + 1, depth + 1);
                }
                if j == i + 1 {
                    return self.resolve(name, depth);
                }
                None
            }
            _ => None,
        }
    }

    /// Index of `=>` following an arrow parameter list, skipping a return
    /// type annotation.
    fn arrow_after(&self, index: usize) -> Option<usize> {
        match self.token(index)? {
            Token::Arrow => Some(index),
            Token::Colon => {
                let mut j = index + 1;
                while j < self.tokens.len() {
                    match self.token(j) {
                        Some(Token::Arrow) => return Some(j),
                        Some(Token::Semi) | Some(Token::Comma) | Some(Token::RParen) => return None,
                        _ => j = self.skip_group(j) + 1,
                    }
                }
                None
            }
            _ => None,
        }
    }

    fn arrow_body(&self, index: usize, depth: u8) -> Option<Found> {
        if self.is(index, Token::LBrace) {
            self.body_tree(index, depth)
        } else {
            self.value_tree(index, depth + 1)
        }
    }

    /// The last returned markup of a block body. Top-level returns win over
    /// returns nested in conditionals.
    fn body_tree(&self, open: usize, depth: u8) -> Option<Found> {
        let close = self.matching[open]?;

        let mut top_level = Vec::new();
        let mut j = open + 1;
        while j < close {
            if self.is(j, Token::Return) {
                top_level.push(j);
            }
            j = self.skip_group(j) + 1;
        }

        top_level
            .iter()
            .rev()
            .find_map(|&r| self.value_tree(r + 1, depth + 1))
            .or_else(|| {
                (open + 1..close)
                    .rev()
                    .filter(|&r| self.is(r, Token::Return))
                    .find_map(|r| self.value_tree(r + 1, depth + 1))
            })
    }

    /// For an opening bracket, the index of its partner; otherwise `i`.
    fn skip_group(&self, i: usize) -> usize {
        match self.token(i) {
            Some(Token::LBrace) | Some(Token::LParen) | Some(Token::LBracket) => {
                self.matching[i].unwrap_or(i)
            }
            _ => i,
        }
    }

    fn token(&self, i: usize) -> Option<Token<'src>> {
        match self.tokens.get(i) {
            Some((Lexeme::Token(token), _)) => Some(*token),
            _ => None,
        }
    }

    fn is(&self, i: usize, expected: Token) -> bool {
        self.token(i) == Some(expected)
    }
}

fn match_brackets(tokens: &[(Lexeme<'_>, Range<usize>)]) -> Vec<Option<usize>> {
    let mut matching = vec![None; tokens.len()];
    let mut stack: Vec<(usize, Token)> = Vec::new();
    for (i, (lexeme, _)) in tokens.iter().enumerate() {
        let Lexeme::Token(token) = lexeme else {
            continue;
        };
        let expected_open = match token {
            Token::LBrace | Token::LParen | Token::LBracket => {
                stack.push((i, *token));
                continue;
            }
            Token::RBrace => Token::LBrace,
            Token::RParen => Token::LParen,
            Token::RBracket => Token::LBracket,
            _ => continue,
        };
        if let Some((open, kind)) = stack.pop() {
            if kind == expected_open {
                matching[open] = Some(i);
                matching[i] = Some(open);
            }
        }
    }
    matching
}

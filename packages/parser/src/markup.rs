//! Character-level markup parser.
//!
//! Works on bytes: every structural character is ASCII, so offsets taken
//! at those characters always land on UTF-8 boundaries.

use crate::ast::{Node, Prop, PropValue, SourceLocation};
use crate::error::{ParseError, Result};
use crate::literal;
use crate::tokenizer;
use indexmap::IndexMap;
use std::cell::Cell;

/// Deepest element nesting accepted, counting markup inside expressions.
pub(crate) const MAX_DEPTH: usize = 128;

thread_local! {
    // Expressions re-enter the parser through the tokenizer, so the count
    // lives outside any single `MarkupParser`.
    static DEPTH: Cell<usize> = Cell::new(0);
}

/// One level of element nesting, released on drop.
struct DepthGuard;

impl DepthGuard {
    fn enter(pos: usize) -> Result<Self> {
        let depth = DEPTH.with(|depth| {
            depth.set(depth.get() + 1);
            depth.get()
        });
        let guard = DepthGuard;
        if depth > MAX_DEPTH {
            return Err(ParseError::invalid_syntax(
                pos,
                format!("markup nested deeper than {} levels", MAX_DEPTH),
            ));
        }
        Ok(guard)
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Parse the element or fragment starting at `start` (which must be `<`).
pub(crate) fn parse_element_at(source: &str, start: usize) -> Result<Node> {
    MarkupParser::new(source, start).parse_element()
}

/// End offset of the element starting at `start`.
pub(crate) fn skip_element(source: &str, start: usize) -> Result<usize> {
    parse_element_at(source, start).map(|node| node.loc.end)
}

struct MarkupParser<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'$' | b'.' | b':' | b'-')
}

impl<'a> MarkupParser<'a> {
    fn new(source: &'a str, pos: usize) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos,
        }
    }

    fn parse_element(&mut self) -> Result<Node> {
        let _depth = DepthGuard::enter(self.pos)?;
        self.parse_node()
    }

    fn parse_node(&mut self) -> Result<Node> {
        let start = self.pos;
        self.expect(b'<', "`<`")?;
        self.skip_whitespace();

        if self.peek() == Some(b'>') {
            self.pos += 1;
            let opening = SourceLocation::new(start, self.pos);
            let name_loc = SourceLocation::new(start + 1, start + 1);
            return self.parse_children(start, String::new(), IndexMap::new(), opening, name_loc);
        }

        let name_start = self.pos;
        let tag_name = self.read_name();
        if tag_name.is_empty() {
            return Err(ParseError::unexpected_token(
                self.pos,
                "tag name",
                self.describe_current(),
            ));
        }
        let name_loc = SourceLocation::new(name_start, self.pos);

        let mut props = IndexMap::new();
        loop {
            self.skip_trivia();
            match self.peek() {
                None => return Err(ParseError::unexpected_eof(self.pos, "`>` or `/>`")),
                Some(b'/') => {
                    if self.peek_at(1) != Some(b'>') {
                        return Err(ParseError::unexpected_token(self.pos, "`/>`", self.describe_current()));
                    }
                    self.pos += 2;
                    let loc = SourceLocation::new(start, self.pos);
                    return Ok(Node {
                        id: String::new(),
                        tag_name: tag_name.to_string(),
                        self_closing: true,
                        props,
                        children: Vec::new(),
                        text: None,
                        is_text: false,
                        loc,
                        opening_tag_loc: loc,
                        name_loc,
                        children_loc: None,
                        closing_tag_loc: None,
                    });
                }
                Some(b'>') => {
                    self.pos += 1;
                    let opening = SourceLocation::new(start, self.pos);
                    return self.parse_children(start, tag_name.to_string(), props, opening, name_loc);
                }
                Some(b'{') => {
                    let prop = self.parse_spread()?;
                    props.insert(prop.name.clone(), prop);
                }
                Some(_) => {
                    let prop = self.parse_attribute()?;
                    props.insert(prop.name.clone(), prop);
                }
            }
        }
    }

    fn parse_children(
        &mut self,
        start: usize,
        tag_name: String,
        props: IndexMap<String, Prop>,
        opening_tag_loc: SourceLocation,
        name_loc: SourceLocation,
    ) -> Result<Node> {
        let children_start = self.pos;
        let mut children = Vec::new();

        loop {
            match self.peek() {
                None => {
                    return Err(ParseError::unexpected_eof(
                        self.pos,
                        format!("</{}>", tag_name),
                    ))
                }
                Some(b'<') if self.peek_at(1) == Some(b'/') => {
                    let closing_start = self.pos;
                    self.pos += 2;
                    self.skip_whitespace();
                    let found_at = self.pos;
                    let found = self.read_name();
                    if found != tag_name {
                        return Err(ParseError::mismatched_closing_tag(found_at, tag_name, found));
                    }
                    self.skip_whitespace();
                    self.expect(b'>', "`>`")?;
                    return Ok(Node {
                        id: String::new(),
                        tag_name,
                        self_closing: false,
                        props,
                        children,
                        text: None,
                        is_text: false,
                        loc: SourceLocation::new(start, self.pos),
                        opening_tag_loc,
                        name_loc,
                        children_loc: Some(SourceLocation::new(children_start, closing_start)),
                        closing_tag_loc: Some(SourceLocation::new(closing_start, self.pos)),
                    });
                }
                Some(b'<') => children.push(self.parse_element()?),
                Some(b'{') => {
                    let open = self.pos;
                    let close = self.expression_close()?;
                    self.pos = close + 1;
                    let inner = &self.source[open + 1..close];
                    // Only string slots are nodes; comments and expressions are not
                    if let Some(text) = literal::string_literal(inner) {
                        children.push(Node::text_node(text, SourceLocation::new(open, close + 1)));
                    }
                }
                Some(_) => {
                    let text_start = self.pos;
                    while let Some(b) = self.peek() {
                        if b == b'<' || b == b'{' {
                            break;
                        }
                        self.pos += 1;
                    }
                    let raw = &self.source[text_start..self.pos];
                    let trimmed = raw.trim();
                    if !trimmed.is_empty() {
                        let lead = raw.len() - raw.trim_start().len();
                        let loc = SourceLocation::new(text_start + lead, text_start + lead + trimmed.len());
                        children.push(Node::text_node(trimmed.to_string(), loc));
                    }
                }
            }
        }
    }

    fn parse_attribute(&mut self) -> Result<Prop> {
        let start = self.pos;
        let name = self.read_name();
        if name.is_empty() {
            return Err(ParseError::unexpected_token(
                self.pos,
                "attribute name",
                self.describe_current(),
            ));
        }
        let name_end = self.pos;

        self.skip_whitespace();
        if self.peek() != Some(b'=') {
            self.pos = name_end;
            return Ok(Prop {
                name: name.to_string(),
                value: PropValue::Boolean(true),
                raw_value: String::new(),
                is_expression: false,
                loc: SourceLocation::new(start, name_end),
                value_loc: None,
            });
        }
        self.pos += 1;
        self.skip_whitespace();

        let value_start = self.pos;
        let value = match self.peek() {
            Some(quote @ (b'"' | b'\'')) => {
                let close = self.bytes[self.pos + 1..]
                    .iter()
                    .position(|b| *b == quote)
                    .map(|offset| self.pos + 1 + offset)
                    .ok_or_else(|| ParseError::unexpected_eof(self.pos, "closing quote"))?;
                let content = &self.source[self.pos + 1..close];
                self.pos = close + 1;
                PropValue::String(content.to_string())
            }
            Some(b'{') => {
                let close = self.expression_close()?;
                let inner = &self.source[self.pos + 1..close];
                self.pos = close + 1;
                literal::evaluate(inner)
            }
            Some(b'<') => {
                self.parse_element()?;
                PropValue::Expression(self.source[value_start..self.pos].to_string())
            }
            None => return Err(ParseError::unexpected_eof(self.pos, "attribute value")),
            Some(_) => {
                return Err(ParseError::unexpected_token(
                    self.pos,
                    "attribute value",
                    self.describe_current(),
                ))
            }
        };

        let value_loc = SourceLocation::new(value_start, self.pos);
        Ok(Prop {
            name: name.to_string(),
            is_expression: value.is_expression(),
            value,
            raw_value: value_loc.slice(self.source).to_string(),
            loc: SourceLocation::new(start, self.pos),
            value_loc: Some(value_loc),
        })
    }

    /// `{...rest}` inside an opening tag.
    fn parse_spread(&mut self) -> Result<Prop> {
        let start = self.pos;
        let close = self.expression_close()?;
        let inner = self.source[start + 1..close].trim();
        let Some(expression) = inner.strip_prefix("...") else {
            return Err(ParseError::invalid_syntax(start, "expected spread attribute"));
        };
        self.pos = close + 1;
        let loc = SourceLocation::new(start, self.pos);
        Ok(Prop {
            name: inner.to_string(),
            value: PropValue::Expression(expression.trim().to_string()),
            raw_value: loc.slice(self.source).to_string(),
            is_expression: true,
            loc,
            value_loc: Some(loc),
        })
    }

    fn expression_close(&self) -> Result<usize> {
        tokenizer::expression_end(self.source, self.pos)
            .ok_or_else(|| ParseError::unexpected_eof(self.pos, "`}`"))
    }

    fn read_name(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek().map_or(false, is_name_byte) {
            self.pos += 1;
        }
        &self.source[start..self.pos]
    }

    fn skip_whitespace(&mut self) {
        while self.peek().map_or(false, |b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    /// Whitespace plus script comments, which are legal between attributes.
    fn skip_trivia(&mut self) {
        loop {
            self.skip_whitespace();
            match (self.peek(), self.peek_at(1)) {
                (Some(b'/'), Some(b'*')) => {
                    match self.source[self.pos + 2..].find("*/") {
                        Some(offset) => self.pos += offset + 4,
                        None => self.pos = self.bytes.len(),
                    }
                }
                (Some(b'/'), Some(b'/')) => {
                    match self.source[self.pos..].find('\n') {
                        Some(offset) => self.pos += offset + 1,
                        None => self.pos = self.bytes.len(),
                    }
                }
                _ => return,
            }
        }
    }

    fn expect(&mut self, byte: u8, expected: &str) -> Result<()> {
        match self.peek() {
            Some(b) if b == byte => {
                self.pos += 1;
                Ok(())
            }
            Some(_) => Err(ParseError::unexpected_token(self.pos, expected, self.describe_current())),
            None => Err(ParseError::unexpected_eof(self.pos, expected)),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn describe_current(&self) -> String {
        self.source
            .get(self.pos..)
            .and_then(|rest| rest.chars().next())
            .map(|c| format!("`{}`", c))
            .unwrap_or_else(|| "end of input".to_string())
    }
}

//! Eager evaluation of trivial expression literals.

use crate::ast::PropValue;
use crate::tokenizer::Token;
use logos::Logos;

/// Evaluate the text between `{` and `}`. Anything that is not a plain
/// literal stays an expression.
pub fn evaluate(expression: &str) -> PropValue {
    let trimmed = expression.trim();
    match trimmed {
        "true" => return PropValue::Boolean(true),
        "false" => return PropValue::Boolean(false),
        "null" => return PropValue::Null,
        _ => {}
    }
    if let Some(number) = parse_number(trimmed) {
        return PropValue::Number(number);
    }
    if let Some(text) = string_literal(trimmed) {
        return PropValue::String(text);
    }
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Some(value) = to_json(trimmed).and_then(|json| serde_json::from_str(&json).ok()) {
            return PropValue::Object(value);
        }
    }
    PropValue::Expression(trimmed.to_string())
}

/// The decoded value when `expression` is exactly one string literal.
pub fn string_literal(expression: &str) -> Option<String> {
    let mut lexer = Token::lexer(expression);
    let token = lexer.next()?.ok()?;
    if lexer.next().is_some() {
        return None;
    }
    match token {
        Token::Str(quoted) => Some(unescape(&quoted[1..quoted.len() - 1])),
        Token::Template(quoted) if !quoted.contains("${") => Some(unescape(&quoted[1..quoted.len() - 1])),
        _ => None,
    }
}

pub fn parse_number(text: &str) -> Option<f64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, text),
    };
    let first = digits.chars().next()?;
    if !(first.is_ascii_digit() || first == '.') {
        return None;
    }
    let cleaned = digits.replace('_', "");
    let value = match cleaned.strip_prefix("0x").or_else(|| cleaned.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16).ok()? as f64,
        None => cleaned.parse::<f64>().ok()?,
    };
    Some(if negative { -value } else { value })
}

/// Rewrite a script object/array literal as JSON. Returns `None` as soon as
/// anything that is not a literal shows up.
fn to_json(expression: &str) -> Option<String> {
    let tokens = Token::lexer(expression)
        .spanned()
        .map(|(token, span)| token.ok().map(|token| (token, &expression[span])))
        .collect::<Option<Vec<_>>>()?;

    let mut out = String::with_capacity(expression.len());
    for (index, (token, text)) in tokens.iter().enumerate() {
        let prev = index.checked_sub(1).and_then(|i| tokens.get(i)).map(|(t, _)| *t);
        let next = tokens.get(index + 1).map(|(t, _)| *t);
        let is_key = next == Some(Token::Colon)
            && matches!(prev, Some(Token::LBrace) | Some(Token::Comma));

        match token {
            Token::LBrace => out.push('{'),
            Token::RBrace => out.push('}'),
            Token::LBracket => out.push('['),
            Token::RBracket => out.push(']'),
            Token::Colon => out.push(':'),
            Token::Comma => {
                // Trailing commas are legal in script, not in JSON
                if !matches!(next, Some(Token::RBrace) | Some(Token::RBracket)) {
                    out.push(',');
                }
            }
            Token::Str(quoted) | Token::Template(quoted) => {
                if quoted.contains("${") {
                    return None;
                }
                let decoded = unescape(&quoted[1..quoted.len() - 1]);
                out.push_str(&serde_json::to_string(&decoded).ok()?);
            }
            Token::Number(literal) => {
                let value = parse_number(literal)?;
                out.push_str(&format_number(value));
            }
            Token::Operator("-") if matches!(next, Some(Token::Number(_))) => out.push('-'),
            _ if is_key => out.push_str(&serde_json::to_string(text).ok()?),
            Token::Ident(word @ ("true" | "false" | "null")) => out.push_str(word),
            _ => return None,
        }
    }
    Some(out)
}

/// Format a number the way it would be written in source.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Decode escape sequences of a quoted script string body.
pub(crate) fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some('\n') => {}
            Some(kind @ ('u' | 'x')) => {
                let rest = chars.as_str();
                let (hex, consumed) = match (kind, rest.strip_prefix('{')) {
                    ('u', Some(braced)) => match braced.find('}') {
                        Some(end) => (&braced[..end], end + 2),
                        None => ("", 0),
                    },
                    ('u', None) => (rest.get(..4).unwrap_or(""), 4),
                    _ => (rest.get(..2).unwrap_or(""), 2),
                };
                match u32::from_str_radix(hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => {
                        out.push(decoded);
                        chars = rest.get(consumed..).unwrap_or("").chars();
                    }
                    None => out.push(kind),
                }
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars() {
        assert_eq!(evaluate("42"), PropValue::Number(42.0));
        assert_eq!(evaluate(" -1.5 "), PropValue::Number(-1.5));
        assert_eq!(evaluate("0xff"), PropValue::Number(255.0));
        assert_eq!(evaluate("true"), PropValue::Boolean(true));
        assert_eq!(evaluate("null"), PropValue::Null);
        assert_eq!(evaluate("'hi'"), PropValue::String("hi".to_string()));
    }

    #[test]
    fn test_object_literals() {
        assert_eq!(
            evaluate("{ padding: 8, 'font-size': \"12px\", nested: { ok: true }, }"),
            PropValue::Object(json!({ "padding": 8, "font-size": "12px", "nested": { "ok": true } }))
        );
        assert_eq!(evaluate("[1, -2, 'x']"), PropValue::Object(json!([1, -2, "x"])));
    }

    #[test]
    fn test_expressions_stay_raw() {
        assert_eq!(evaluate("count + 1"), PropValue::Expression("count + 1".to_string()));
        assert_eq!(evaluate("{ color }"), PropValue::Expression("{ color }".to_string()));
        assert_eq!(evaluate("`a${b}`"), PropValue::Expression("`a${b}`".to_string()));
        assert_eq!(evaluate("NaN"), PropValue::Expression("NaN".to_string()));
    }

    #[test]
    fn test_string_literal() {
        assert_eq!(string_literal("\"a\\nb\""), Some("a\nb".to_string()));
        assert_eq!(string_literal("`plain`"), Some("plain".to_string()));
        assert_eq!(string_literal("'\\u{1F600}'"), Some("\u{1F600}".to_string()));
        assert_eq!(string_literal("/* comment */"), None);
        assert_eq!(string_literal("'a' + 'b'"), None);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(0.25), "0.25");
    }
}

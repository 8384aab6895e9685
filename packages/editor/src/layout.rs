//! Line and indentation helpers for splicing markup into hand-written source.

use sculpt_parser::literal::format_number;
use sculpt_parser::{PropValue, SourceLocation};
use std::ops::Range;

/// Offset of the first byte of the line containing `offset`.
pub fn line_start(source: &str, offset: usize) -> usize {
    source[..offset].rfind('\n').map_or(0, |i| i + 1)
}

/// Offset of the `\n` ending the line containing `offset`, or the source end.
pub fn line_end(source: &str, offset: usize) -> usize {
    source[offset..].find('\n').map_or(source.len(), |i| offset + i)
}

/// Leading whitespace of the line containing `offset`.
pub fn indent_at(source: &str, offset: usize) -> &str {
    let start = line_start(source, offset);
    let line = &source[start..line_end(source, start)];
    &line[..line.len() - line.trim_start().len()]
}

pub fn is_blank(text: &str) -> bool {
    text.chars().all(char::is_whitespace)
}

/// Whether only whitespace precedes `offset` on its line.
pub fn starts_line(source: &str, offset: usize) -> bool {
    is_blank(&source[line_start(source, offset)..offset])
}

/// Whether the span sits alone on its line(s).
pub fn is_alone_on_line(source: &str, loc: SourceLocation) -> bool {
    starts_line(source, loc.start) && is_blank(&source[loc.end..line_end(source, loc.end)])
}

/// Range to delete for a node or attribute. A span alone on its lines takes
/// its lines with it; anything else loses exactly its span.
pub fn removal_range(source: &str, loc: SourceLocation) -> Range<usize> {
    if !is_alone_on_line(source, loc) {
        return loc.range();
    }
    let start = line_start(source, loc.start);
    let end = line_end(source, loc.end);
    if end < source.len() {
        start..end + 1
    } else if start > 0 {
        start - 1..end
    } else {
        start..end
    }
}

/// Re-indent a multi-line snippet whose first line has no indentation.
/// The snippet's own base indentation is taken from its last line.
pub fn reindent(snippet: &str, indent: &str) -> String {
    let last = snippet.rsplit('\n').next().unwrap_or("");
    let base = &last[..last.len() - last.trim_start().len()];
    shift_indent(snippet, base, indent)
}

/// Replace the `from` indentation of every line after the first with `to`.
pub fn shift_indent(snippet: &str, from: &str, to: &str) -> String {
    let lines: Vec<&str> = snippet.split('\n').collect();
    if lines.len() < 2 || from == to {
        return snippet.to_string();
    }
    let mut out = String::with_capacity(snippet.len());
    out.push_str(lines[0]);
    for line in &lines[1..] {
        out.push('\n');
        if is_blank(line) {
            continue;
        }
        let stripped = line.strip_prefix(from).unwrap_or_else(|| line.trim_start());
        out.push_str(to);
        out.push_str(stripped);
    }
    out
}

/// Markup text for a text node, using a string slot when the text could
/// not appear literally.
pub fn render_text(text: &str, as_slot: bool) -> String {
    let needs_slot = as_slot
        || text.contains(|c| matches!(c, '{' | '}' | '<' | '>'))
        || text.trim() != text
        || text.is_empty();
    if needs_slot {
        format!("{{{}}}", quote_json(text))
    } else {
        text.to_string()
    }
}

/// Attribute value text (what follows `=`). `quote` is the quote character
/// already used by the attribute, if any.
pub fn render_value(value: &PropValue, quote: Option<char>) -> String {
    match value {
        PropValue::String(s) => {
            let preferred = quote.unwrap_or('"');
            let other = if preferred == '"' { '\'' } else { '"' };
            if s.contains('\n') || s.contains('\\') {
                format!("{{{}}}", quote_json(s))
            } else if !s.contains(preferred) {
                format!("{0}{1}{0}", preferred, s)
            } else if !s.contains(other) {
                format!("{0}{1}{0}", other, s)
            } else {
                format!("{{{}}}", quote_json(s))
            }
        }
        PropValue::Number(n) => format!("{{{}}}", format_number(*n)),
        PropValue::Boolean(b) => format!("{{{}}}", b),
        PropValue::Null => "{null}".to_string(),
        PropValue::Object(v) => format!("{{{}}}", v),
        PropValue::Expression(e) => format!("{{{}}}", e),
    }
}

/// A complete attribute, bare when the value is `true`.
pub fn render_attribute(name: &str, value: &PropValue) -> String {
    match value {
        PropValue::Boolean(true) => name.to_string(),
        _ => format!("{}={}", name, render_value(value, None)),
    }
}

fn quote_json(text: &str) -> String {
    serde_json::Value::String(text.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_line_helpers() {
        let source = "a\n  <b/>\nc";
        assert_eq!(line_start(source, 4), 2);
        assert_eq!(line_end(source, 4), 8);
        assert_eq!(indent_at(source, 5), "  ");
        assert!(is_alone_on_line(source, SourceLocation::new(4, 8)));
        assert_eq!(removal_range(source, SourceLocation::new(4, 8)), 2..9);
    }

    #[test]
    fn test_removal_of_last_line() {
        let source = "<a>\n  <b/>";
        assert_eq!(removal_range(source, SourceLocation::new(6, 10)), 3..10);
    }

    #[test]
    fn test_inline_removal_keeps_neighbours() {
        let source = "<a><b/><c/></a>";
        assert_eq!(removal_range(source, SourceLocation::new(3, 7)), 3..7);
    }

    #[test]
    fn test_reindent() {
        let snippet = "<ul>\n      <li/>\n    </ul>";
        assert_eq!(reindent(snippet, "  "), "<ul>\n    <li/>\n  </ul>");
        assert_eq!(reindent("<br/>", "        "), "<br/>");
    }

    #[test]
    fn test_render_text() {
        assert_eq!(render_text("Changed", false), "Changed");
        assert_eq!(render_text("a < b", false), "{\"a < b\"}");
        assert_eq!(render_text("plain", true), "{\"plain\"}");
    }

    #[test]
    fn test_render_value() {
        assert_eq!(render_value(&PropValue::String("x".into()), Some('\'')), "'x'");
        assert_eq!(render_value(&PropValue::String("it's".into()), Some('\'')), "\"it's\"");
        assert_eq!(render_value(&PropValue::Number(2.0), None), "{2}");
        assert_eq!(render_value(&PropValue::Object(json!({"a": 1})), None), "{{\"a\":1}}");
        assert_eq!(render_attribute("hidden", &PropValue::Boolean(true)), "hidden");
        assert_eq!(render_attribute("hidden", &PropValue::Boolean(false)), "hidden={false}");
    }
}

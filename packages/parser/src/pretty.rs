use crate::error::ParseError;

/// Character index for a byte offset; ariadne spans count characters.
fn char_index(source: &str, byte: usize) -> usize {
    source
        .get(..byte.min(source.len()))
        .map_or(0, |prefix| prefix.chars().count())
}

/// Pretty-print errors with source context using ariadne
pub fn format_errors(source: &str, filename: &str, errors: &[ParseError]) -> String {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let mut output = Vec::new();

    for error in errors {
        let byte = error.position().unwrap_or(source.len().saturating_sub(1));
        let start = char_index(source, byte);
        let end = (start + 1).min(source.chars().count().max(1));

        let report = Report::build(ReportKind::Error, filename, start)
            .with_message(error.to_string())
            .with_label(
                Label::new((filename, start..end))
                    .with_color(Color::Red)
                    .with_message(match error {
                        ParseError::NoTree { reason } => reason.clone(),
                        ParseError::UnexpectedToken { expected, .. }
                        | ParseError::UnexpectedEof { expected, .. } => {
                            format!("expected {}", expected)
                        }
                        ParseError::MismatchedClosingTag { expected, .. } => {
                            format!("expected </{}>", expected)
                        }
                        ParseError::InvalidSyntax { message, .. } => message.clone(),
                    }),
            )
            .finish();

        if report
            .write((filename, Source::from(source)), &mut output)
            .is_err()
        {
            output.extend_from_slice(format!("{}\n", error).as_bytes());
        }
    }

    String::from_utf8_lossy(&output).into_owned()
}

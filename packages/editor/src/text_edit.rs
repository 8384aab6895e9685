//! Byte-offset text edits.
//!
//! Edits are applied in descending order so earlier offsets stay valid.
//! Unlike a best-effort editor buffer, nothing is skipped: an edit that is
//! out of bounds, splits a character or overlaps another fails the batch.

use crate::errors::MutationError;
use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub range: Range<usize>,
    pub new_text: String,
}

impl TextEdit {
    pub fn replace(range: Range<usize>, new_text: impl Into<String>) -> Self {
        Self {
            range,
            new_text: new_text.into(),
        }
    }

    pub fn insert(at: usize, new_text: impl Into<String>) -> Self {
        Self::replace(at..at, new_text)
    }

    pub fn delete(range: Range<usize>) -> Self {
        Self::replace(range, String::new())
    }
}

/// Apply non-overlapping edits, all expressed against `source`.
pub fn apply_edits(source: &str, edits: &[TextEdit]) -> Result<String, MutationError> {
    let mut sorted = edits.to_vec();
    // Descending; for a shared start the wider edit goes first so an
    // insertion at a removal's start survives it.
    sorted.sort_by(|a, b| {
        b.range
            .start
            .cmp(&a.range.start)
            .then(b.range.end.cmp(&a.range.end))
    });

    let mut limit = source.len();
    for edit in &sorted {
        let Range { start, end } = edit.range;
        if start > end || end > limit {
            return Err(MutationError::InvalidEdit(format!(
                "edit {}..{} overlaps or exceeds the source",
                start, end
            )));
        }
        if !source.is_char_boundary(start) || !source.is_char_boundary(end) {
            return Err(MutationError::InvalidEdit(format!(
                "edit {}..{} splits a character",
                start, end
            )));
        }
        limit = start;
    }

    let mut updated = source.to_string();
    for edit in sorted {
        updated.replace_range(edit.range, &edit.new_text);
    }
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_applies_back_to_front() {
        let source = "<a><b/><c/></a>";
        let edits = vec![TextEdit::delete(3..7), TextEdit::insert(11, "<b/>")];
        assert_eq!(apply_edits(source, &edits).unwrap(), "<a><c/><b/></a>");
    }

    #[test]
    fn test_insert_at_removal_start_survives() {
        let edits = vec![TextEdit::insert(1, "X"), TextEdit::delete(1..3)];
        assert_eq!(apply_edits("abcd", &edits).unwrap(), "aXd");
    }

    #[test]
    fn test_rejects_overlap() {
        let edits = vec![TextEdit::delete(0..3), TextEdit::insert(2, "X")];
        assert!(apply_edits("abcd", &edits).is_err());
    }

    #[test]
    fn test_rejects_char_split() {
        let edits = vec![TextEdit::delete(0..1)];
        assert!(apply_edits("éa", &edits).is_err());
    }
}

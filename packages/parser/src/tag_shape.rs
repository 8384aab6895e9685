//! Native vs. custom, container vs. void.

use serde::Serialize;

/// HTML elements that never take children.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TagShape {
    NativeVoid,
    NativeContainer,
    CustomVoid,
    CustomContainer,
}

impl TagShape {
    pub fn is_void(self) -> bool {
        matches!(self, TagShape::NativeVoid | TagShape::CustomVoid)
    }

    pub fn is_custom(self) -> bool {
        matches!(self, TagShape::CustomVoid | TagShape::CustomContainer)
    }
}

/// Components start with an uppercase letter or use member access.
pub fn is_custom_tag(tag_name: &str) -> bool {
    tag_name.chars().next().map_or(false, |c| c.is_ascii_uppercase()) || tag_name.contains('.')
}

pub fn is_void_tag(tag_name: &str) -> bool {
    VOID_ELEMENTS.contains(&tag_name.to_ascii_lowercase().as_str())
}

pub fn classify(tag_name: &str, has_children: bool, explicit_void: bool) -> TagShape {
    if is_custom_tag(tag_name) {
        if explicit_void && !has_children {
            TagShape::CustomVoid
        } else {
            TagShape::CustomContainer
        }
    } else if is_void_tag(tag_name) {
        TagShape::NativeVoid
    } else {
        TagShape::NativeContainer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify("img", false, true), TagShape::NativeVoid);
        assert_eq!(classify("div", false, true), TagShape::NativeContainer);
        assert_eq!(classify("Card", false, true), TagShape::CustomVoid);
        assert_eq!(classify("Card", true, false), TagShape::CustomContainer);
        assert_eq!(classify("ui.Box", false, false), TagShape::CustomContainer);
        assert_eq!(classify("", true, false), TagShape::NativeContainer);
    }
}

use crate::error::ParseError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Tag name used for text nodes.
pub const TEXT_TAG: &str = "#text";

/// Half-open byte range into the source the node was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SourceLocation {
    pub start: usize,
    pub end: usize,
}

impl SourceLocation {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn contains(&self, other: &SourceLocation) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Slice `source` by this location. Out-of-range locations yield "".
    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.start..self.end).unwrap_or("")
    }
}

impl From<Range<usize>> for SourceLocation {
    fn from(range: Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

/// Typed attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum PropValue {
    String(String),
    Number(f64),
    Boolean(bool),
    Null,
    Object(serde_json::Value),
    Expression(String),
}

impl PropValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_expression(&self) -> bool {
        matches!(self, PropValue::Expression(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prop {
    pub name: String,
    pub value: PropValue,
    /// Verbatim source text at `value_loc`, quotes and braces included.
    pub raw_value: String,
    pub is_expression: bool,
    pub loc: SourceLocation,
    /// Absent for bare boolean attributes.
    pub value_loc: Option<SourceLocation>,
}

impl Prop {
    pub fn is_spread(&self) -> bool {
        self.name.starts_with("...")
    }
}

/// One element, fragment or text span of the markup tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    pub tag_name: String,
    pub self_closing: bool,
    pub props: IndexMap<String, Prop>,
    pub children: Vec<Node>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub is_text: bool,
    pub loc: SourceLocation,
    pub opening_tag_loc: SourceLocation,
    pub name_loc: SourceLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children_loc: Option<SourceLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closing_tag_loc: Option<SourceLocation>,
}

impl Node {
    pub(crate) fn text_node(text: String, loc: SourceLocation) -> Self {
        Self {
            id: String::new(),
            tag_name: TEXT_TAG.to_string(),
            self_closing: false,
            props: IndexMap::new(),
            children: Vec::new(),
            text: Some(text),
            is_text: true,
            loc,
            opening_tag_loc: loc,
            name_loc: SourceLocation::new(loc.start, loc.start),
            children_loc: None,
            closing_tag_loc: None,
        }
    }

    pub fn is_fragment(&self) -> bool {
        !self.is_text && self.tag_name.is_empty()
    }

    /// Text nodes written as `{"..."}` rather than plain markup text.
    pub fn is_text_slot(&self, source: &str) -> bool {
        self.is_text && self.loc.slice(source).starts_with('{')
    }

    pub fn find(&self, id: &str) -> Option<&Node> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    /// Positional path from this node to `id`; the node itself is `[]`.
    pub fn find_path(&self, id: &str) -> Option<Vec<usize>> {
        if self.id == id {
            return Some(Vec::new());
        }
        for (index, child) in self.children.iter().enumerate() {
            if let Some(mut path) = child.find_path(id) {
                path.insert(0, index);
                return Some(path);
            }
        }
        None
    }

    pub fn node_at_path(&self, path: &[usize]) -> Option<&Node> {
        match path.split_first() {
            None => Some(self),
            Some((first, rest)) => self.children.get(*first)?.node_at_path(rest),
        }
    }

    /// Parent of `id` and the child's index within it.
    pub fn parent_of(&self, id: &str) -> Option<(&Node, usize)> {
        let path = self.find_path(id)?;
        let (index, parent_path) = path.split_last()?;
        Some((self.node_at_path(parent_path)?, *index))
    }

    /// Whether `descendant` lives strictly inside the subtree rooted at `ancestor`.
    pub fn is_ancestor(&self, ancestor: &str, descendant: &str) -> bool {
        match self.find(ancestor) {
            Some(node) => node.id != descendant && node.find(descendant).is_some(),
            None => false,
        }
    }

    /// Ids of this node's ancestors, outermost first.
    pub fn ancestors_of(&self, id: &str) -> Vec<String> {
        let Some(path) = self.find_path(id) else {
            return Vec::new();
        };
        let mut ids = Vec::with_capacity(path.len());
        let mut node = self;
        for index in path {
            ids.push(node.id.clone());
            match node.children.get(index) {
                Some(child) => node = child,
                None => break,
            }
        }
        ids
    }

    /// Depth-first pre-order traversal.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Node)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    /// All ids in pre-order.
    pub fn ids(&self) -> Vec<String> {
        let mut ids = Vec::new();
        self.walk(&mut |node| ids.push(node.id.clone()));
        ids
    }
}

/// Output of [`crate::parse`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResult {
    pub root: Option<Node>,
    /// The returned expression, including any wrapping parentheses.
    pub root_region_loc: Option<SourceLocation>,
    pub source: String,
    pub errors: Vec<ParseError>,
}

impl ParseResult {
    pub fn find(&self, id: &str) -> Option<&Node> {
        self.root.as_ref()?.find(id)
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

//! # Render Correlator
//!
//! Matches elements of a rendered visual tree back to parsed node ids.
//!
//! Both trees are walked depth-first in lock-step. Text is skipped on both
//! sides and fragments are flattened into their parent's child list.
//! Custom components are black boxes: the next rendered element is taken
//! as their output and nothing below it is matched. When render and parse
//! drift apart (conditional rendering, injected wrappers) matching degrades
//! per subtree; an unmatched visual subtree gets no ids and is reported.

use indexmap::{IndexMap, IndexSet};
use sculpt_parser::{classify, Node};
use serde::{Deserialize, Serialize};

/// Inspectable output of a live render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum VisualNode {
    Element {
        tag: String,
        #[serde(default)]
        attributes: IndexMap<String, serde_json::Value>,
        #[serde(default)]
        children: Vec<VisualNode>,
        /// Stamped by [`correlate`].
        #[serde(default, skip_serializing_if = "Option::is_none")]
        node_id: Option<String>,
    },
    Text {
        content: String,
    },
}

impl VisualNode {
    pub fn element(tag: impl Into<String>, children: Vec<VisualNode>) -> Self {
        VisualNode::Element {
            tag: tag.into(),
            attributes: IndexMap::new(),
            children,
            node_id: None,
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        VisualNode::Text {
            content: content.into(),
        }
    }

    pub fn node_id(&self) -> Option<&str> {
        match self {
            VisualNode::Element { node_id, .. } => node_id.as_deref(),
            VisualNode::Text { .. } => None,
        }
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            VisualNode::Element { tag, .. } => Some(tag),
            VisualNode::Text { .. } => None,
        }
    }

    pub fn children(&self) -> &[VisualNode] {
        match self {
            VisualNode::Element { children, .. } => children,
            VisualNode::Text { .. } => &[],
        }
    }

    fn is_element(&self) -> bool {
        matches!(self, VisualNode::Element { .. })
    }

    fn clear_ids(&mut self) {
        if let VisualNode::Element {
            node_id, children, ..
        } = self
        {
            *node_id = None;
            children.iter_mut().for_each(VisualNode::clear_ids);
        }
    }

    /// Element children, each with its index among all children.
    fn element_children_mut(&mut self) -> Vec<(usize, &mut VisualNode)> {
        match self {
            VisualNode::Element { children, .. } => children
                .iter_mut()
                .enumerate()
                .filter(|(_, child)| child.is_element())
                .collect(),
            VisualNode::Text { .. } => Vec::new(),
        }
    }
}

/// A rendered subtree that no parsed node accounts for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmatchedSubtree {
    /// Child indices from the visual root.
    pub path: Vec<usize>,
    pub tag: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationReport {
    pub matched: usize,
    pub unmatched: Vec<UnmatchedSubtree>,
}

/// Stamp every visual element that corresponds to a parsed node with its id.
/// Stamps from an earlier correlation are cleared first.
pub fn correlate(visual_root: &mut VisualNode, ast_root: &Node) -> CorrelationReport {
    visual_root.clear_ids();
    let mut report = CorrelationReport::default();
    let mut path = Vec::new();

    if ast_root.is_fragment() {
        match_children(visual_root, &flattened(ast_root), &mut path, &mut report);
    } else if compatible(visual_root, ast_root) {
        match_node(visual_root, ast_root, &mut path, &mut report);
    } else {
        // The visual root is a host container around the rendered tree
        match_children(visual_root, &[ast_root], &mut path, &mut report);
    }
    report
}

/// Stamped ids in order of appearance, for range selection and arrow
/// navigation.
pub fn linear_order(visual_root: &VisualNode) -> Vec<String> {
    fn visit(node: &VisualNode, ids: &mut IndexSet<String>) {
        if let Some(id) = node.node_id() {
            ids.insert(id.to_string());
        }
        for child in node.children() {
            visit(child, ids);
        }
    }
    let mut ids = IndexSet::new();
    visit(visual_root, &mut ids);
    ids.into_iter().collect()
}

fn match_node(visual: &mut VisualNode, ast: &Node, path: &mut Vec<usize>, report: &mut CorrelationReport) {
    if let VisualNode::Element { node_id, .. } = visual {
        *node_id = Some(ast.id.clone());
        report.matched += 1;
    }
    if is_component(ast) {
        return;
    }
    match_children(visual, &flattened(ast), path, report);
}

fn match_children(
    visual: &mut VisualNode,
    ast_children: &[&Node],
    path: &mut Vec<usize>,
    report: &mut CorrelationReport,
) {
    let mut next = 0;
    for (index, child) in visual.element_children_mut() {
        path.push(index);
        let remaining = &ast_children[next.min(ast_children.len())..];

        if let Some(skip) = remaining.iter().position(|ast| compatible(child, ast)) {
            // Parsed nodes skipped here were not rendered (conditionals)
            match_node(child, remaining[skip], path, report);
            next += skip + 1;
        } else if let Some((inner, wrapped)) = wrapped_match(child, remaining) {
            match_through_wrapper(child, inner, remaining[wrapped], path, report);
            next += wrapped + 1;
        } else {
            report.unmatched.push(UnmatchedSubtree {
                path: path.clone(),
                tag: child.tag().unwrap_or_default().to_string(),
            });
        }
        path.pop();
    }
}

/// A wrapper element with exactly one element child that matches one of
/// `candidates`: (the child's index, the candidate's index).
fn wrapped_match(wrapper: &VisualNode, candidates: &[&Node]) -> Option<(usize, usize)> {
    let mut elements = wrapper
        .children()
        .iter()
        .enumerate()
        .filter(|(_, child)| child.is_element());
    let (inner, only) = elements.next()?;
    if elements.next().is_some() {
        return None;
    }
    let candidate = candidates.iter().position(|ast| compatible(only, ast))?;
    Some((inner, candidate))
}

fn match_through_wrapper(
    wrapper: &mut VisualNode,
    inner: usize,
    ast: &Node,
    path: &mut Vec<usize>,
    report: &mut CorrelationReport,
) {
    if let VisualNode::Element { children, .. } = wrapper {
        if let Some(child) = children.get_mut(inner) {
            path.push(inner);
            match_node(child, ast, path, report);
            path.pop();
        }
    }
}

/// Element children of a node with fragments flattened away.
fn flattened(node: &Node) -> Vec<&Node> {
    let mut out = Vec::new();
    for child in &node.children {
        if child.is_text {
            continue;
        }
        if child.is_fragment() {
            out.extend(flattened(child));
        } else {
            out.push(child);
        }
    }
    out
}

fn is_component(node: &Node) -> bool {
    classify(&node.tag_name, !node.children.is_empty(), node.self_closing).is_custom()
}

fn compatible(visual: &VisualNode, ast: &Node) -> bool {
    match visual.tag() {
        Some(tag) => is_component(ast) || tag.eq_ignore_ascii_case(&ast.tag_name),
        None => false,
    }
}

//! # Surgical Mutation Engine
//!
//! Turns a [`Mutation`] into the smallest source rewrite that realizes it.
//! Every call re-parses the source it is given, resolves ids against that
//! parse, and builds [`TextEdit`]s from the recorded offsets. Bytes outside
//! the edited spans are never touched.
//!
//! Batches run one node at a time. Deepest and rightmost nodes go first so
//! the positional paths of the remaining nodes stay valid, and every step
//! re-parses the already-mutated source.

use crate::errors::MutationError;
use crate::layout::{
    indent_at, is_alone_on_line, is_blank, line_start, reindent, removal_range, render_attribute,
    render_text, render_value, shift_indent, starts_line,
};
use crate::mutations::{Mutation, MutationOutcome, Position};
use crate::text_edit::{apply_edits, TextEdit};
use sculpt_parser::tokenizer::expression_end;
use sculpt_parser::{classify, parse, parse_fragment, Node, ParseError, PropValue};
use std::borrow::Cow;
use tracing::{debug, instrument};

pub const DEFAULT_INDENT_UNIT: &str = "  ";

/// Apply a mutation with the default indent unit.
pub fn apply(source: &str, mutation: &Mutation) -> Result<MutationOutcome, MutationError> {
    MutationEngine::default().apply(source, mutation)
}

#[derive(Debug, Clone)]
pub struct MutationEngine {
    /// Added per nesting level when a container gains its first child.
    indent_unit: String,
}

impl Default for MutationEngine {
    fn default() -> Self {
        Self::new(DEFAULT_INDENT_UNIT)
    }
}

impl MutationEngine {
    pub fn new(indent_unit: impl Into<String>) -> Self {
        Self {
            indent_unit: indent_unit.into(),
        }
    }

    pub fn indent_unit(&self) -> &str {
        &self.indent_unit
    }

    /// Apply `mutation` to `source`. On error the caller's source is untouched.
    #[instrument(skip(self, source), fields(kind = mutation.name()))]
    pub fn apply(&self, source: &str, mutation: &Mutation) -> Result<MutationOutcome, MutationError> {
        let root = parse_tree(source)?;

        let outcome = match mutation {
            Mutation::Move {
                node_id,
                target_id,
                position,
            } => self.move_node(source, &root, node_id, target_id, *position)?,
            Mutation::Delete { node_id } => changed(self.delete(source, &root, node_id)?),
            Mutation::DeleteMany { node_ids } => {
                self.each_deepest_first(source, &root, node_ids, |source, root, id| {
                    self.delete(source, root, id)
                })?
            }
            Mutation::SetText { node_id, text } => {
                changed(self.set_text(source, &root, node_id, text)?)
            }
            Mutation::SetProp {
                node_id,
                prop_name,
                value,
            } => changed(self.set_prop(source, &root, node_id, prop_name, value)?),
            Mutation::DeleteProp { node_id, prop_name } => {
                changed(self.delete_prop(source, &root, node_id, prop_name)?)
            }
            Mutation::Insert {
                parent_id,
                index,
                fragment,
            } => {
                let text = fragment_text(fragment)?;
                let parent = find(&root, parent_id)?;
                changed(self.insert_at(source, &root, parent, *index, text, None)?)
            }
            Mutation::InsertMany {
                parent_id,
                index,
                fragments,
            } => self.insert_many(source, &root, parent_id, *index, fragments)?,
            Mutation::Duplicate { node_id } => changed(self.duplicate(source, &root, node_id)?),
            Mutation::DuplicateMany { node_ids } => {
                self.each_deepest_first(source, &root, node_ids, |source, root, id| {
                    self.duplicate(source, root, id)
                })?
            }
            Mutation::Replace { node_id, fragment } => {
                changed(self.replace(source, &root, node_id, fragment)?)
            }
        };

        if !outcome.noop {
            // Fail closed: never hand back a source that lost its tree
            parse_tree(&outcome.source).map_err(|err| {
                MutationError::InvalidEdit(format!("result no longer parses: {}", err))
            })?;
        }

        debug!(
            noop = outcome.noop,
            delta = outcome.source.len() as i64 - source.len() as i64,
            "mutation applied"
        );
        Ok(outcome)
    }

    fn delete(&self, source: &str, root: &Node, node_id: &str) -> Result<String, MutationError> {
        let node = find(root, node_id)?;
        if node.id == root.id {
            return Err(MutationError::InvalidStructure(
                "cannot delete the root node".to_string(),
            ));
        }
        apply_edits(source, &[TextEdit::delete(removal_range(source, node.loc))])
    }

    fn move_node(
        &self,
        source: &str,
        root: &Node,
        node_id: &str,
        target_id: &str,
        position: Position,
    ) -> Result<MutationOutcome, MutationError> {
        let node = find(root, node_id)?;
        let target = find(root, target_id)?;
        let (parent, index) = root.parent_of(node_id).ok_or_else(|| {
            MutationError::InvalidStructure("cannot move the root node".to_string())
        })?;

        let (dest_parent, dest_index) = match position {
            Position::Inside => (target, target.children.len()),
            Position::Before | Position::After => {
                let (target_parent, target_index) = root.parent_of(target_id).ok_or_else(|| {
                    MutationError::InvalidStructure("cannot place a node beside the root".to_string())
                })?;
                let offset = usize::from(position == Position::After);
                (target_parent, target_index + offset)
            }
        };

        if dest_parent.id == node.id || root.is_ancestor(&node.id, &dest_parent.id) {
            return Err(MutationError::CycleDetected);
        }
        if dest_parent.id == parent.id && (dest_index == index || dest_index == index + 1) {
            debug!(node_id, "move to current position");
            return Ok(MutationOutcome {
                source: source.to_string(),
                noop: true,
            });
        }

        let text = node.loc.slice(source);
        let base = indent_at(source, node.loc.start);
        let insertion = self.insertion(source, dest_parent, dest_index, text, Some(base))?;
        let removal = TextEdit::delete(removal_range(source, node.loc));
        let at = insertion.range.start;
        if removal.range.start < at && at < removal.range.end {
            return Err(MutationError::InvalidEdit(
                "destination lies inside the moved node".to_string(),
            ));
        }
        apply_edits(source, &[removal, insertion]).map(changed)
    }

    fn set_text(
        &self,
        source: &str,
        root: &Node,
        node_id: &str,
        text: &str,
    ) -> Result<String, MutationError> {
        let node = find(root, node_id)?;
        let not_text = || MutationError::NotText(node_id.to_string());

        let edit = if node.is_text {
            TextEdit::replace(node.loc.range(), render_text(text, node.is_text_slot(source)))
        } else {
            let shape = classify(&node.tag_name, !node.children.is_empty(), node.self_closing);
            if node.self_closing || shape.is_void() {
                return Err(not_text());
            }
            match node.children.as_slice() {
                [] => {
                    let region = node.children_loc.ok_or_else(not_text)?;
                    // Expressions and comments are content too
                    if !is_blank(region.slice(source)) {
                        return Err(not_text());
                    }
                    TextEdit::replace(region.range(), render_text(text, false))
                }
                [only] if only.is_text => {
                    TextEdit::replace(only.loc.range(), render_text(text, only.is_text_slot(source)))
                }
                _ => return Err(not_text()),
            }
        };
        apply_edits(source, &[edit])
    }

    fn set_prop(
        &self,
        source: &str,
        root: &Node,
        node_id: &str,
        prop_name: &str,
        value: &PropValue,
    ) -> Result<String, MutationError> {
        let node = find(root, node_id)?;
        if node.is_text || node.is_fragment() {
            return Err(MutationError::NotAnElement(node_id.to_string()));
        }
        if !is_attribute_name(prop_name) {
            return Err(MutationError::InvalidStructure(format!(
                "`{}` is not a valid attribute name",
                prop_name
            )));
        }
        if let PropValue::Expression(expression) = value {
            check_expression(expression)?;
        }

        let edit = match node.props.get(prop_name) {
            Some(prop) => match prop.value_loc {
                Some(value_loc) => {
                    let quote = prop.raw_value.chars().next().filter(|c| matches!(c, '"' | '\''));
                    TextEdit::replace(value_loc.range(), render_value(value, quote))
                }
                // Bare attribute already means `true`
                None if *value == PropValue::Boolean(true) => return Ok(source.to_string()),
                None => TextEdit::replace(prop.loc.range(), render_attribute(prop_name, value)),
            },
            None => {
                let attribute = render_attribute(prop_name, value);
                let last = node
                    .props
                    .values()
                    .filter(|p| node.opening_tag_loc.contains(&p.loc))
                    .max_by_key(|p| p.loc.end);
                match last {
                    Some(last) if starts_line(source, last.loc.start) => TextEdit::insert(
                        last.loc.end,
                        format!("\n{}{}", indent_at(source, last.loc.start), attribute),
                    ),
                    Some(last) => TextEdit::insert(last.loc.end, format!(" {}", attribute)),
                    None => TextEdit::insert(node.name_loc.end, format!(" {}", attribute)),
                }
            }
        };
        apply_edits(source, &[edit])
    }

    fn delete_prop(
        &self,
        source: &str,
        root: &Node,
        node_id: &str,
        prop_name: &str,
    ) -> Result<String, MutationError> {
        let node = find(root, node_id)?;
        if node.is_text || node.is_fragment() {
            return Err(MutationError::NotAnElement(node_id.to_string()));
        }
        let prop = node
            .props
            .get(prop_name)
            .ok_or_else(|| MutationError::PropNotFound {
                node_id: node_id.to_string(),
                prop: prop_name.to_string(),
            })?;

        let range = if is_alone_on_line(source, prop.loc) {
            removal_range(source, prop.loc)
        } else {
            source[..prop.loc.start].trim_end().len()..prop.loc.end
        };
        apply_edits(source, &[TextEdit::delete(range)])
    }

    fn duplicate(&self, source: &str, root: &Node, node_id: &str) -> Result<String, MutationError> {
        let node = find(root, node_id)?;
        let (parent, index) = root.parent_of(node_id).ok_or_else(|| {
            MutationError::InvalidStructure("cannot duplicate the root node".to_string())
        })?;
        let text = node.loc.slice(source);
        let base = indent_at(source, node.loc.start);
        self.insert_at(source, root, parent, index + 1, text, Some(base))
    }

    fn replace(
        &self,
        source: &str,
        root: &Node,
        node_id: &str,
        fragment: &str,
    ) -> Result<String, MutationError> {
        let text = fragment_text(fragment)?;
        let node = find(root, node_id)?;
        let indent = indent_at(source, node.loc.start);
        apply_edits(source, &[TextEdit::replace(node.loc.range(), reindent(text, indent))])
    }

    fn insert_many(
        &self,
        source: &str,
        root: &Node,
        parent_id: &str,
        index: usize,
        fragments: &[String],
    ) -> Result<MutationOutcome, MutationError> {
        let texts = fragments
            .iter()
            .map(|fragment| fragment_text(fragment))
            .collect::<Result<Vec<_>, _>>()?;
        let path = root
            .find_path(parent_id)
            .ok_or_else(|| MutationError::NodeNotFound(parent_id.to_string()))?;
        if texts.is_empty() {
            return Ok(MutationOutcome {
                source: source.to_string(),
                noop: true,
            });
        }

        let mut current = source.to_string();
        for (offset, text) in texts.into_iter().enumerate() {
            let root = parse_tree(&current)?;
            let parent = root
                .node_at_path(&path)
                .ok_or_else(|| MutationError::NodeNotFound(parent_id.to_string()))?;
            current = self.insert_at(&current, &root, parent, index + offset, text, None)?;
        }
        Ok(changed(current))
    }

    /// Run `step` for each id, deepest-first then rightmost-first, dropping
    /// ids already covered by a selected ancestor. A target whose tag or
    /// source text changed under an earlier step aborts the batch.
    fn each_deepest_first(
        &self,
        source: &str,
        root: &Node,
        node_ids: &[String],
        step: impl Fn(&str, &Node, &str) -> Result<String, MutationError>,
    ) -> Result<MutationOutcome, MutationError> {
        let targets = batch_order(root, node_ids)?;
        if targets.is_empty() {
            return Ok(MutationOutcome {
                source: source.to_string(),
                noop: true,
            });
        }

        let targets = targets
            .into_iter()
            .map(|(path, id)| {
                let node = root
                    .node_at_path(&path)
                    .ok_or_else(|| MutationError::NodeNotFound(id.clone()))?;
                let identity = (node.tag_name.clone(), node.loc.slice(source).to_string());
                Ok((path, id, identity))
            })
            .collect::<Result<Vec<_>, MutationError>>()?;

        let mut current = source.to_string();
        for (path, id, (tag_name, text)) in targets {
            let root = parse_tree(&current)?;
            let node = root
                .node_at_path(&path)
                .ok_or_else(|| MutationError::NodeNotFound(id.clone()))?;
            if node.tag_name != tag_name || node.loc.slice(&current) != text {
                return Err(MutationError::InvalidEdit(format!(
                    "{} changed under an earlier step of the batch",
                    id
                )));
            }
            debug!(%id, current_id = %node.id, "batch step");
            current = step(&current, &root, &node.id)?;
        }
        Ok(changed(current))
    }

    /// Insert `text` as child `index` of `parent`, failing unless the parent
    /// ends up with exactly one more child.
    fn insert_at(
        &self,
        source: &str,
        root: &Node,
        parent: &Node,
        index: usize,
        text: &str,
        base: Option<&str>,
    ) -> Result<String, MutationError> {
        let path = root
            .find_path(&parent.id)
            .ok_or_else(|| MutationError::NodeNotFound(parent.id.clone()))?;
        let edit = self.insertion(source, parent, index, text, base)?;
        let result = apply_edits(source, &[edit])?;

        let expected = parent.children.len() + 1;
        let actual = parse_tree(&result)
            .ok()
            .and_then(|root| root.node_at_path(&path).map(|node| node.children.len()));
        if actual != Some(expected) {
            return Err(MutationError::InvalidEdit(format!(
                "{} did not gain exactly one child",
                parent.id
            )));
        }
        Ok(result)
    }

    /// The edit placing `text` as child `index` of `parent`, following the
    /// surrounding layout: inline siblings stay inline, one-per-line
    /// siblings get their own line at the siblings' indentation.
    fn insertion(
        &self,
        source: &str,
        parent: &Node,
        index: usize,
        text: &str,
        base: Option<&str>,
    ) -> Result<TextEdit, MutationError> {
        if parent.is_text {
            return Err(MutationError::NotAnElement(parent.id.clone()));
        }
        let shape = classify(&parent.tag_name, !parent.children.is_empty(), parent.self_closing);
        let region = match parent.children_loc {
            Some(region) if !parent.self_closing && !shape.is_void() => region,
            _ => {
                return Err(MutationError::InvalidStructure(format!(
                    "<{}> cannot have children",
                    parent.tag_name
                )))
            }
        };
        let count = parent.children.len();
        if index > count {
            return Err(MutationError::InvalidStructure(format!(
                "index {} is out of bounds for {} children",
                index, count
            )));
        }

        let text = separated_text(source, parent, index, text);
        let text = text.as_ref();
        let fit = |indent: &str| match base {
            Some(from) => shift_indent(text, from, indent),
            None => reindent(text, indent),
        };

        if count == 0 {
            let inner = region.slice(source);
            if !inner.contains('\n') {
                return Ok(TextEdit::insert(region.start, text));
            }
            let outer = indent_at(source, parent.loc.start);
            let indent = format!("{}{}", outer, self.indent_unit);
            return Ok(if is_blank(inner) {
                let body = fit(indent.as_str());
                TextEdit::replace(region.range(), format!("\n{}{}\n{}", indent, body, outer))
            } else {
                TextEdit::insert(region.start, format!("\n{}{}", indent, fit(indent.as_str())))
            });
        }

        let reference = &parent.children[index.min(count - 1)];
        let own_line = starts_line(source, reference.loc.start);
        let indent = indent_at(source, reference.loc.start);

        Ok(if index < count {
            if own_line {
                TextEdit::insert(
                    line_start(source, reference.loc.start),
                    format!("{}{}\n", indent, fit(indent)),
                )
            } else {
                TextEdit::insert(reference.loc.start, text)
            }
        } else if own_line {
            TextEdit::insert(reference.loc.end, format!("\n{}{}", indent, fit(indent)))
        } else {
            TextEdit::insert(reference.loc.end, text)
        })
    }
}

fn changed(source: String) -> MutationOutcome {
    MutationOutcome {
        source,
        noop: false,
    }
}

fn parse_tree(source: &str) -> Result<Node, MutationError> {
    let result = parse(source);
    match result.root {
        Some(root) => Ok(root),
        None => Err(MutationError::NoTree(
            result
                .errors
                .into_iter()
                .next()
                .unwrap_or_else(|| ParseError::no_tree("no markup")),
        )),
    }
}

fn find<'a>(root: &'a Node, id: &str) -> Result<&'a Node, MutationError> {
    root.find(id)
        .ok_or_else(|| MutationError::NodeNotFound(id.to_string()))
}

/// Validate a fragment and return its trimmed text.
fn fragment_text(fragment: &str) -> Result<&str, MutationError> {
    parse_fragment(fragment).map_err(MutationError::InvalidFragment)?;
    Ok(fragment.trim())
}

/// Plain text placed beside a plain text sibling would merge into it, so it
/// is written as a string slot instead.
fn separated_text<'t>(source: &str, parent: &Node, index: usize, text: &'t str) -> Cow<'t, str> {
    let plain = |node: &Node| node.is_text && !node.is_text_slot(source);
    let beside_text = index
        .checked_sub(1)
        .and_then(|before| parent.children.get(before))
        .map_or(false, plain)
        || parent.children.get(index).map_or(false, plain);
    if !beside_text || text.starts_with('<') || text.starts_with('{') {
        return Cow::Borrowed(text);
    }
    match parse_fragment(text) {
        Ok(node) if node.is_text => {
            Cow::Owned(render_text(node.text.as_deref().unwrap_or(text), true))
        }
        _ => Cow::Borrowed(text),
    }
}

/// An expression value must close exactly at its own last byte once wrapped
/// in braces, or it would spill into the surrounding tag.
fn check_expression(expression: &str) -> Result<(), MutationError> {
    let wrapped = format!("{{{}}}", expression);
    if expression.trim().is_empty() || expression_end(&wrapped, 0) != Some(wrapped.len() - 1) {
        return Err(MutationError::InvalidStructure(format!(
            "`{}` is not a single expression",
            expression
        )));
    }
    Ok(())
}

fn is_attribute_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic() || matches!(c, '_' | '$'))
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '-' | ':' | '.'))
}

/// Paths and ids of a batch, deepest-first then rightmost-first, with
/// nodes under another selected node dropped.
fn batch_order(root: &Node, node_ids: &[String]) -> Result<Vec<(Vec<usize>, String)>, MutationError> {
    let mut selected: Vec<(Vec<usize>, String)> = Vec::with_capacity(node_ids.len());
    for id in node_ids {
        let path = root
            .find_path(id)
            .ok_or_else(|| MutationError::NodeNotFound(id.clone()))?;
        if !selected.iter().any(|(existing, _)| *existing == path) {
            selected.push((path, id.clone()));
        }
    }

    let mut targets: Vec<_> = selected
        .iter()
        .filter(|(path, _)| {
            !selected
                .iter()
                .any(|(other, _)| other.len() < path.len() && path.starts_with(other))
        })
        .cloned()
        .collect();
    targets.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| b.cmp(a)));
    Ok(targets)
}

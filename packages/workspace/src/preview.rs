//! Live preview: render the current source, correlate the result with the
//! parsed tree and keep the newest frame.
//!
//! Renders may finish out of order. A frame is only accepted when its
//! version is newer than the frame on screen, so a slow render of an old
//! source never overwrites a newer one.

use crate::errors::SyncError;
use crate::source_store::SourceStore;
use crate::sync::{DocumentSync, MutateOutcome, SyncSnapshot};
use async_trait::async_trait;
use indexmap::IndexMap;
use sculpt_editor::{correlate, linear_order, CorrelationReport, Mutation, VisualNode};
use sculpt_parser::tag_shape::is_custom_tag;
use sculpt_parser::{parse, Node, PropValue};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Renders a document into an inspectable visual tree.
#[async_trait]
pub trait LiveRenderer: Send + Sync {
    async fn render_live(
        &self,
        document_id: &str,
        props: &serde_json::Value,
    ) -> Result<VisualNode, SyncError>;
}

/// Renders markup as written: host elements keep their tag and literal
/// attributes, custom components become opaque placeholders.
pub struct StructuralRenderer {
    store: Arc<dyn SourceStore>,
}

impl StructuralRenderer {
    pub fn new(store: Arc<dyn SourceStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl LiveRenderer for StructuralRenderer {
    async fn render_live(
        &self,
        document_id: &str,
        _props: &serde_json::Value,
    ) -> Result<VisualNode, SyncError> {
        let source = self.store.get_source(document_id).await?;
        let parsed = parse(&source);
        let root = parsed.root.ok_or_else(|| {
            let reason = parsed
                .errors
                .first()
                .map(|err| err.to_string())
                .unwrap_or_else(|| "no markup to render".to_string());
            SyncError::Render(reason)
        })?;

        let mut rendered = Vec::new();
        render_node(&root, &mut rendered);
        match rendered.len() {
            1 => Ok(rendered.remove(0)),
            _ => Ok(VisualNode::element("div", rendered)),
        }
    }
}

fn render_node(node: &Node, out: &mut Vec<VisualNode>) {
    if let Some(text) = &node.text {
        if node.is_text {
            out.push(VisualNode::text(text.clone()));
            return;
        }
    }
    if node.is_fragment() {
        for child in &node.children {
            render_node(child, out);
        }
        return;
    }

    let mut attributes = IndexMap::new();
    if is_custom_tag(&node.tag_name) {
        attributes.insert(
            "data-component".to_string(),
            serde_json::Value::String(node.tag_name.clone()),
        );
        out.push(VisualNode::Element {
            tag: "div".to_string(),
            attributes,
            children: Vec::new(),
            node_id: None,
        });
        return;
    }

    for (name, prop) in &node.props {
        if let Some(value) = literal_value(&prop.value) {
            attributes.insert(name.clone(), value);
        }
    }
    let mut children = Vec::new();
    for child in &node.children {
        render_node(child, &mut children);
    }
    out.push(VisualNode::Element {
        tag: node.tag_name.clone(),
        attributes,
        children,
        node_id: None,
    });
}

/// Expressions only have a value at runtime.
fn literal_value(value: &PropValue) -> Option<serde_json::Value> {
    match value {
        PropValue::String(s) => Some(serde_json::Value::String(s.clone())),
        PropValue::Number(n) => serde_json::Number::from_f64(*n).map(serde_json::Value::Number),
        PropValue::Boolean(b) => Some(serde_json::Value::Bool(*b)),
        PropValue::Null => Some(serde_json::Value::Null),
        PropValue::Object(v) => Some(v.clone()),
        PropValue::Expression(_) => None,
    }
}

/// Accepts strictly increasing versions.
#[derive(Debug, Default)]
pub struct RenderGate {
    applied: Option<u64>,
}

impl RenderGate {
    pub fn admit(&mut self, version: u64) -> bool {
        match self.applied {
            Some(applied) if version <= applied => false,
            _ => {
                self.applied = Some(version);
                true
            }
        }
    }

    pub fn applied(&self) -> Option<u64> {
        self.applied
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewFrame {
    /// Document version the frame was requested for.
    pub version: u64,
    pub visual_tree: Option<VisualNode>,
    /// Render or parse failure, shown in place of the preview.
    pub error: Option<String>,
    pub report: Option<CorrelationReport>,
    /// Stamped ids in visual order.
    pub order: Vec<String>,
    pub rendered_at: i64,
}

struct PreviewInner {
    sync: DocumentSync,
    renderer: Arc<dyn LiveRenderer>,
    props: serde_json::Value,
    gate: Mutex<RenderGate>,
    frame: Mutex<Option<PreviewFrame>>,
}

#[derive(Clone)]
pub struct LivePreview {
    inner: Arc<PreviewInner>,
}

impl LivePreview {
    pub fn new(
        sync: DocumentSync,
        renderer: Arc<dyn LiveRenderer>,
        props: serde_json::Value,
    ) -> Self {
        Self {
            inner: Arc::new(PreviewInner {
                sync,
                renderer,
                props,
                gate: Mutex::new(RenderGate::default()),
                frame: Mutex::new(None),
            }),
        }
    }

    pub fn frame(&self) -> Option<PreviewFrame> {
        self.frame_slot().clone()
    }

    /// Render the document as it is now. Returns `None` when a newer frame
    /// landed while this one was rendering.
    pub async fn render(&self) -> Option<PreviewFrame> {
        let snapshot = self.inner.sync.snapshot();
        self.render_snapshot(snapshot).await
    }

    async fn render_snapshot(&self, snapshot: SyncSnapshot) -> Option<PreviewFrame> {
        let rendered = self
            .inner
            .renderer
            .render_live(&snapshot.document_id, &self.inner.props)
            .await;

        let parsed = parse(&snapshot.source);
        let mut frame = PreviewFrame {
            version: snapshot.version,
            visual_tree: None,
            error: None,
            report: None,
            order: Vec::new(),
            rendered_at: chrono::Utc::now().timestamp_millis(),
        };

        match rendered {
            Ok(mut tree) => {
                match &parsed.root {
                    Some(root) => {
                        let report = correlate(&mut tree, root);
                        frame.order = linear_order(&tree);
                        frame.report = Some(report);
                    }
                    None => {
                        frame.error = parsed.errors.first().map(|err| err.to_string());
                    }
                }
                frame.visual_tree = Some(tree);
            }
            Err(err) => frame.error = Some(err.to_string()),
        }

        if !self.gate().admit(frame.version) {
            debug!(version = frame.version, "dropping superseded render");
            return None;
        }
        if let Some(report) = &frame.report {
            if !report.unmatched.is_empty() {
                debug!(unmatched = report.unmatched.len(), "render drifted from source");
            }
        }
        *self.frame_slot() = Some(frame.clone());
        Some(frame)
    }

    /// Re-render on every version change until the document closes. Each
    /// render runs on its own task so a slow one never delays the next.
    pub fn spawn(&self) -> JoinHandle<()> {
        let preview = self.clone();
        tokio::spawn(async move {
            let mut versions = preview.inner.sync.subscribe();
            preview.render_detached();
            while versions.changed().await.is_ok() {
                if preview.inner.sync.is_closed() {
                    break;
                }
                preview.render_detached();
            }
        })
    }

    fn render_detached(&self) {
        let preview = self.clone();
        tokio::spawn(async move {
            if let Some(frame) = preview.render().await {
                if let Some(error) = &frame.error {
                    warn!(version = frame.version, error = %error, "preview failed");
                }
            }
        });
    }

    /// Mutate using ids from the frame on screen.
    pub async fn mutate(&self, mutation: &Mutation) -> Result<MutateOutcome, SyncError> {
        let version = self
            .frame()
            .map(|frame| frame.version)
            .ok_or_else(|| SyncError::Render("no preview frame yet".to_string()))?;
        self.inner.sync.mutate_at(version, mutation).await
    }

    fn gate(&self) -> MutexGuard<'_, RenderGate> {
        self.inner.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn frame_slot(&self) -> MutexGuard<'_, Option<PreviewFrame>> {
        self.inner.frame.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_gate_accepts_only_newer() {
        let mut gate = RenderGate::default();
        assert!(gate.admit(0));
        assert!(gate.admit(2));
        assert!(!gate.admit(1));
        assert!(!gate.admit(2));
        assert!(gate.admit(3));
        assert_eq!(gate.applied(), Some(3));
    }

    #[test]
    fn test_render_node_flattens_fragments_and_hides_components() {
        let parsed = parse("export default () => (<><h1 className=\"t\">Hi</h1><Card on={x} /></>);");
        let root = parsed.root.unwrap();
        let mut out = Vec::new();
        render_node(&root, &mut out);

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].tag(), Some("h1"));
        assert_eq!(out[0].children(), &[VisualNode::text("Hi")]);
        match &out[1] {
            VisualNode::Element { tag, attributes, children, .. } => {
                assert_eq!(tag, "div");
                assert_eq!(attributes["data-component"], "Card");
                assert!(children.is_empty());
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}

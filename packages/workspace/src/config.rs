use crate::errors::ConfigError;
use sculpt_editor::{Document, EditSession, EditorUiState, MutationEngine, Store};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_NAME: &str = "sculpt.config.json";

/// Editor configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    /// How often open documents poll their store, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Undo entries kept per editor view
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Indentation added when a container gains its first child
    #[serde(default = "default_indent_unit")]
    pub indent_unit: String,

    /// Props passed to the live renderer
    #[serde(default = "default_render_props")]
    pub render_props: serde_json::Value,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_history_limit() -> usize {
    sculpt_editor::DEFAULT_HISTORY_LIMIT
}

fn default_indent_unit() -> String {
    sculpt_editor::DEFAULT_INDENT_UNIT.to_string()
}

fn default_render_props() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            history_limit: default_history_limit(),
            indent_unit: default_indent_unit(),
            render_props: default_render_props(),
        }
    }
}

impl EditorConfig {
    /// Load config from a directory, falling back to defaults when the file
    /// is absent.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config_path = dir.as_ref().join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn engine(&self) -> MutationEngine {
        MutationEngine::new(self.indent_unit.clone())
    }

    /// UI state store whose undo history keeps `history_limit` entries.
    pub fn ui_store(&self) -> Store<EditorUiState> {
        Store::new(EditorUiState::with_history_limit(self.history_limit))
    }

    /// An edit session over `source` using this config's engine and undo depth.
    pub fn session(&self, source: impl Into<String>) -> EditSession {
        EditSession::new(
            Document::from_source(source),
            self.engine(),
            self.ui_store(),
            Store::default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "pollIntervalMs": 250,
            "indentUnit": "\t",
            "renderProps": { "name": "Ada" }
        }"#;

        let config: EditorConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.history_limit, 50);
        assert_eq!(config.indent_unit, "\t");
        assert_eq!(config.render_props["name"], "Ada");
    }

    #[test]
    fn test_default_config() {
        let config = EditorConfig::default();
        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.indent_unit, "  ");
        assert!(config.render_props.as_object().unwrap().is_empty());
    }

    #[test]
    fn test_session_honours_history_limit() {
        let config = EditorConfig {
            history_limit: 2,
            ..EditorConfig::default()
        };
        let mut session = config.session("export default () => <div><p>Body</p></div>;");
        for text in ["a", "b", "c"] {
            let mutation = sculpt_editor::Mutation::SetText {
                node_id: "p-0.0".to_string(),
                text: text.to_string(),
            };
            session.commit(&mutation).unwrap();
        }

        let history = session.ui().state().history;
        assert_eq!(history.limit(), 2);
        assert_eq!(history.past_len(), 2);
        assert!(session.document().source().contains("<p>c</p>"));
    }

    #[test]
    fn test_load_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(EditorConfig::load(dir.path()).unwrap(), EditorConfig::default());

        std::fs::write(dir.path().join(DEFAULT_CONFIG_NAME), r#"{"historyLimit": 5}"#).unwrap();
        assert_eq!(EditorConfig::load(dir.path()).unwrap().history_limit, 5);

        std::fs::write(dir.path().join(DEFAULT_CONFIG_NAME), "{").unwrap();
        assert!(EditorConfig::load(dir.path()).is_err());
    }
}

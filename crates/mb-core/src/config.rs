//! Board configuration.
//!
//! All fields have defaults, so a config file only needs the keys it wants to
//! override. A missing file is not an error; a malformed one is.

use crate::geometry::{DEFAULT_CENTER, DEFAULT_STEP, Point, Size};
use crate::layout::GatherSpacing;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Tunables for placement, sizing and status text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BoardConfig {
    /// Offset between successive results of one task.
    pub cascade_step: Point,
    pub image_card_size: Size,
    pub text_card_size: Size,
    /// Used when the canvas has not been measured.
    pub fallback_center: Point,
    pub gather: GatherSpacing,
    /// Joins the per-category parts of the status line.
    pub status_separator: String,
    /// Whether image results get a best-effort generated title.
    pub captions: bool,
    /// Title used when caption generation fails.
    pub caption_fallback: String,
    /// Settled task records the queue remembers before dropping the oldest.
    pub task_history: usize,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            cascade_step: DEFAULT_STEP,
            image_card_size: Size::new(200.0, 300.0),
            text_card_size: Size::new(280.0, 180.0),
            fallback_center: DEFAULT_CENTER,
            gather: GatherSpacing::default(),
            status_separator: " · ".to_string(),
            captions: false,
            caption_fallback: "Untitled".to_string(),
            task_history: 64,
        }
    }
}

impl BoardConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load from `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_json_str(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("no config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

/// Which provider to call and with what credential. Opaque to the core
/// beyond "is there a credential at all".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Connection {
    pub fn new(provider: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            api_key: Some(api_key.into()),
        }
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_json_keeps_other_defaults() {
        let cfg = BoardConfig::from_json_str(r#"{ "cascadeStep": { "x": 30, "y": 10 } }"#).unwrap();
        assert_eq!(cfg.cascade_step, Point::new(30.0, 10.0));
        assert_eq!(cfg.image_card_size, Size::new(200.0, 300.0));
        assert_eq!(cfg.fallback_center, DEFAULT_CENTER);
    }

    #[test]
    fn malformed_json_is_an_error() {
        let err = BoardConfig::from_json_str("{ nope").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = BoardConfig::load(Path::new("/definitely/not/here/board.json")).unwrap();
        assert_eq!(cfg, BoardConfig::default());
    }

    #[test]
    fn credential_must_be_non_blank() {
        assert!(Connection::new("echo", "k-123").has_credential());
        assert!(!Connection::new("echo", "   ").has_credential());
        assert!(!Connection::default().has_credential());
    }
}

//! Configuration types for the voice pair-programming core.

use crate::code_buffer::{INITIAL_CODE, Language};
use crate::error::{EchoError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EchoConfig {
    /// Realtime voice channel settings.
    pub voice: VoiceConfig,
    /// Code-assist backend settings.
    pub assist: AssistConfig,
    /// Code editor settings.
    pub editor: EditorConfig,
}

/// Realtime voice channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Voice agent identifier. Absence is a configuration error at session
    /// start, not a transport error.
    pub agent_id: Option<String>,
    /// WebSocket base URL of the conversational endpoint.
    pub api_url: String,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            agent_id: None,
            api_url: crate::channel::elevenlabs::DEFAULT_API_URL.to_owned(),
        }
    }
}

/// Code-assist backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistConfig {
    /// REST base URL.
    pub api_url: String,
    /// Model identifier.
    pub api_model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            api_url: crate::assist::gemini::DEFAULT_API_URL.to_owned(),
            api_model: crate::assist::gemini::DEFAULT_MODEL.to_owned(),
            api_key_env: "GEMINI_API_KEY".to_owned(),
        }
    }
}

/// Code editor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Initial language tag.
    pub language: Language,
    /// Code shown before anything has been generated.
    pub initial_code: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            language: Language::default(),
            initial_code: INITIAL_CODE.to_owned(),
        }
    }
}

impl EchoConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| EchoError::Config(e.to_string()))
    }

    /// Saves configuration to a TOML file, creating parent directories as
    /// needed.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| EchoError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the configured agent id, or a config error when absent/blank.
    pub fn require_agent_id(&self) -> Result<&str> {
        match self.voice.agent_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => Ok(id),
            _ => Err(EchoError::Config("voice agent id is not set".to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn defaults_are_usable() {
        let config = EchoConfig::default();
        assert!(config.voice.agent_id.is_none());
        assert!(config.voice.api_url.starts_with("wss://"));
        assert!(!config.assist.api_model.is_empty());
        assert_eq!(config.assist.api_key_env, "GEMINI_API_KEY");
        assert_eq!(config.editor.language, Language::Javascript);
        assert_eq!(config.editor.initial_code, INITIAL_CODE);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("echocode.toml");

        let mut config = EchoConfig::default();
        config.voice.agent_id = Some("agent-42".to_owned());
        config.editor.language = Language::Python;

        config.save_to_file(&path).unwrap();
        let loaded = EchoConfig::from_file(&path).unwrap();
        assert_eq!(loaded.voice.agent_id.as_deref(), Some("agent-42"));
        assert_eq!(loaded.editor.language, Language::Python);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: EchoConfig = toml::from_str("[voice]\nagent_id = \"a1\"\n").unwrap();
        assert_eq!(config.voice.agent_id.as_deref(), Some("a1"));
        assert_eq!(config.assist.api_model, crate::assist::gemini::DEFAULT_MODEL);
    }

    #[test]
    fn from_file_nonexistent_returns_error() {
        assert!(EchoConfig::from_file(Path::new("/nonexistent/echocode.toml")).is_err());
    }

    #[test]
    fn require_agent_id_rejects_blank() {
        let mut config = EchoConfig::default();
        assert!(config.require_agent_id().is_err());
        config.voice.agent_id = Some("   ".to_owned());
        assert!(config.require_agent_id().is_err());
        config.voice.agent_id = Some("agent-1".to_owned());
        assert_eq!(config.require_agent_id().unwrap(), "agent-1");
    }
}

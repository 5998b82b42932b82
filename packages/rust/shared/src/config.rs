//! Application configuration for Chatdesk.
//!
//! User config lives at `~/.chatdesk/chatdesk.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ChatdeskError, Result};
use crate::types::RenderMode;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "chatdesk.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".chatdesk";

// ---------------------------------------------------------------------------
// Config structs (matching chatdesk.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Composer settings.
    #[serde(default)]
    pub composer: ComposerConfig,

    /// Attachment selection settings.
    #[serde(default)]
    pub attachments: AttachmentConfig,

    /// Dictation settings.
    #[serde(default)]
    pub voice: VoiceConfig,

    /// Assistant turn rendering.
    #[serde(default)]
    pub render: RenderConfig,
}

/// `[composer]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposerConfig {
    /// Placeholder shown in an empty composer.
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            placeholder: default_placeholder(),
        }
    }
}

fn default_placeholder() -> String {
    "Type your message...".into()
}

/// `[attachments]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentConfig {
    /// Accept list in HTML `accept` attribute syntax.
    #[serde(default = "default_accept")]
    pub accept: String,
}

impl Default for AttachmentConfig {
    fn default() -> Self {
        Self {
            accept: default_accept(),
        }
    }
}

fn default_accept() -> String {
    "image/*,.pdf,.txt,.doc,.docx".into()
}

/// `[voice]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// Set to false to hide dictation even when the host supports it.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// BCP 47 language tag passed to the dictation capability.
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            language: default_language(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_language() -> String {
    "en-US".into()
}

/// `[render]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Mode used when the caller gives no privilege flag.
    #[serde(default)]
    pub mode: RenderMode,
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.chatdesk/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ChatdeskError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.chatdesk/chatdesk.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ChatdeskError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        ChatdeskError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ChatdeskError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ChatdeskError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ChatdeskError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("accept"));
        assert!(toml_str.contains("en-US"));
        assert!(toml_str.contains("structured"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.attachments.accept, "image/*,.pdf,.txt,.doc,.docx");
        assert!(parsed.voice.enabled);
        assert_eq!(parsed.render.mode, RenderMode::Structured);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[voice]
language = "de-DE"

[render]
mode = "flat"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.voice.language, "de-DE");
        assert!(config.voice.enabled);
        assert_eq!(config.render.mode, RenderMode::Flat);
        assert_eq!(config.composer.placeholder, "Type your message...");
    }

    #[test]
    fn invalid_mode_is_rejected() {
        let toml_str = "[render]\nmode = \"fancy\"\n";
        assert!(toml::from_str::<AppConfig>(toml_str).is_err());
    }

    #[test]
    fn load_from_missing_file_is_io_error() {
        let err = load_config_from(Path::new("/nonexistent/chatdesk.toml")).unwrap_err();
        assert!(matches!(err, ChatdeskError::Io { .. }));
    }
}

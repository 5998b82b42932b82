//! Shared types, error model, and configuration for Chatdesk.
//!
//! This crate is the foundation depended on by all other Chatdesk crates.
//! It provides:
//! - [`ChatdeskError`], the unified error type
//! - Domain types ([`ChatTurn`], [`AttachmentRecord`], [`ContentBlock`], [`LineItem`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, AttachmentConfig, ComposerConfig, RenderConfig, VoiceConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{ChatdeskError, Result};
pub use types::{
    Accent, AttachmentId, AttachmentRecord, CaptureState, Category, ChatTurn, ComposerSnapshot,
    ContentBlock, LineItem, LineKind, RenderMode, TurnId,
};

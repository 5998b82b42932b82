//! Core domain types for chat turns, attachments, and rendered content.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ChatdeskError;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a new time-sortable identifier.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

uuid_id!(
    /// A UUID v7 identifier for a single attachment record.
    AttachmentId
);

uuid_id!(
    /// A UUID v7 identifier for an emitted chat turn.
    TurnId
);

// ---------------------------------------------------------------------------
// AttachmentRecord
// ---------------------------------------------------------------------------

/// A file attached to the composer.
///
/// Created with empty `content` when the file is selected; `content` holds a
/// data URL once the asynchronous read has completed. A record whose read
/// failed keeps empty content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRecord {
    /// Unique per record, even when the same file is selected twice.
    pub id: AttachmentId,
    /// File name as selected.
    pub name: String,
    /// MIME type reported by the selection (may be empty).
    pub mime_type: String,
    /// Size of the file in bytes.
    pub size_bytes: u64,
    /// Data URL payload, or empty while pending / after a failed read.
    #[serde(default)]
    pub content: String,
    /// When the file was selected.
    pub created_at: DateTime<Utc>,
}

impl AttachmentRecord {
    /// Create a pending record for a freshly selected file.
    pub fn pending(name: impl Into<String>, mime_type: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            id: AttachmentId::new(),
            name: name.into(),
            mime_type: mime_type.into(),
            size_bytes,
            content: String::new(),
            created_at: Utc::now(),
        }
    }

    /// Whether the record has no content yet.
    pub fn is_pending(&self) -> bool {
        self.content.is_empty()
    }

    /// Images get a thumbnail icon, everything else a document icon.
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    /// Human-readable size, e.g. `"12.3 KB"`.
    pub fn display_size(&self) -> String {
        format!("{:.1} KB", self.size_bytes as f64 / 1024.0)
    }
}

// ---------------------------------------------------------------------------
// Composer
// ---------------------------------------------------------------------------

/// Dictation state of the composer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureState {
    /// Not listening. Initial and terminal-safe.
    #[default]
    Idle,
    /// A dictation session is active.
    Listening,
    /// Momentary; always followed by `Idle`.
    Error,
}

/// One outgoing user turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub id: TurnId,
    /// Trimmed, never empty.
    pub text: String,
    /// In original selection order.
    pub attachments: Vec<AttachmentRecord>,
    pub created_at: DateTime<Utc>,
}

/// Read-only view of the composer state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComposerSnapshot {
    pub text: String,
    pub attachments: Vec<AttachmentRecord>,
    pub capture_state: CaptureState,
}

// ---------------------------------------------------------------------------
// Rendered content
// ---------------------------------------------------------------------------

/// Semantic category of a rendered content block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    ProblemUnderstanding,
    Analysis,
    Recommendations,
    Compliance,
    CostEfficiency,
    Plain,
}

/// Accent colour used to style a block's header and border.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accent {
    Red,
    Blue,
    Green,
    Yellow,
    Purple,
    Neutral,
}

impl Category {
    /// Header title shown above the block. Plain blocks have none.
    pub fn title(self) -> Option<&'static str> {
        match self {
            Self::ProblemUnderstanding => Some("PROBLEM UNDERSTANDING"),
            Self::Analysis => Some("ANALYSIS / BEST PRACTICES"),
            Self::Recommendations => Some("ACTIONABLE RECOMMENDATIONS"),
            Self::Compliance => Some("COMPLIANCE & SAFETY NOTES"),
            Self::CostEfficiency => Some("COST & EFFICIENCY IMPLICATIONS"),
            Self::Plain => None,
        }
    }

    pub fn accent(self) -> Accent {
        match self {
            Self::ProblemUnderstanding => Accent::Red,
            Self::Analysis => Accent::Blue,
            Self::Recommendations => Accent::Green,
            Self::Compliance => Accent::Yellow,
            Self::CostEfficiency => Accent::Purple,
            Self::Plain => Accent::Neutral,
        }
    }

    /// Icon name for the header.
    pub fn icon(self) -> Option<&'static str> {
        match self {
            Self::ProblemUnderstanding => Some("target"),
            Self::Analysis | Self::CostEfficiency => Some("bar-chart"),
            Self::Recommendations => Some("lightbulb"),
            Self::Compliance => Some("shield"),
            Self::Plain => None,
        }
    }
}

/// Whether a line renders as a bullet or a paragraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Bullet,
    Paragraph,
}

/// A single rendered line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub kind: LineKind,
    pub text: String,
}

impl LineItem {
    pub fn bullet(text: impl Into<String>) -> Self {
        Self {
            kind: LineKind::Bullet,
            text: text.into(),
        }
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Self {
            kind: LineKind::Paragraph,
            text: text.into(),
        }
    }
}

/// A contiguous, categorized span of an assistant turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBlock {
    pub category: Category,
    pub lines: Vec<LineItem>,
}

/// How an assistant turn is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// Section markers are recognized and split into categorized blocks.
    #[default]
    Structured,
    /// The whole turn is one plain block.
    Flat,
}

impl RenderMode {
    /// Privileged (authenticated) viewers get the flat rendering.
    pub fn for_viewer(privileged: bool) -> Self {
        if privileged { Self::Flat } else { Self::Structured }
    }
}

impl std::fmt::Display for RenderMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Structured => f.write_str("structured"),
            Self::Flat => f.write_str("flat"),
        }
    }
}

impl std::str::FromStr for RenderMode {
    type Err = ChatdeskError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "structured" => Ok(Self::Structured),
            "flat" => Ok(Self::Flat),
            other => Err(ChatdeskError::validation(format!(
                "unknown render mode '{other}': expected 'structured' or 'flat'"
            ))),
        }
    }
}

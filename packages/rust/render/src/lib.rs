//! Rendering of assistant turns into structured content blocks.
//!
//! Raw assistant text is split at section markers ([`markers`]) into
//! categorized spans ([`sections`]), and each span is turned into bullet and
//! paragraph lines ([`bullets`]).

pub mod bullets;
pub mod markers;
pub mod sections;

pub use bullets::format_lines;
pub use markers::{Boundary, DEFAULT_RULES, MarkerMatcher, MarkerRule};
pub use sections::{ContentSectionParser, RenderModeProvider};

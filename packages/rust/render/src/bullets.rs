//! Line-level bullet/paragraph classification.

use chatdesk_shared::LineItem;

/// Glyphs that turn a line into a bullet.
pub(crate) const BULLET_GLYPHS: [char; 3] = ['•', '-', '*'];

/// Split `text` into bullet and paragraph line items.
///
/// Blank lines are dropped. A line starting with `•`, `-` or `*` (after
/// trimming) becomes a bullet with the glyph and the whitespace after it
/// removed; any other line becomes a trimmed paragraph.
pub fn format_lines(text: &str) -> Vec<LineItem> {
    text.lines().filter_map(classify_line).collect()
}

fn classify_line(line: &str) -> Option<LineItem> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    match trimmed.strip_prefix(BULLET_GLYPHS) {
        // A bare glyph carries no text.
        Some(rest) if rest.trim_start().is_empty() => None,
        Some(rest) => Some(LineItem::bullet(rest.trim_start())),
        None => Some(LineItem::paragraph(trimmed)),
    }
}

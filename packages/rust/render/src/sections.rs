//! Segmentation of assistant turns into categorized content blocks.

use tracing::{debug, instrument};

use chatdesk_shared::{Category, ContentBlock, RenderMode};

use crate::bullets::format_lines;
use crate::markers::MarkerMatcher;

/// Supplies the render mode for a turn (the viewer's privilege flag).
pub trait RenderModeProvider {
    fn render_mode(&self) -> RenderMode;
}

impl RenderModeProvider for RenderMode {
    fn render_mode(&self) -> RenderMode {
        *self
    }
}

impl<F> RenderModeProvider for F
where
    F: Fn() -> RenderMode,
{
    fn render_mode(&self) -> RenderMode {
        self()
    }
}

/// Splits raw assistant text into an ordered sequence of [`ContentBlock`]s.
#[derive(Debug)]
pub struct ContentSectionParser<'m> {
    matcher: &'m MarkerMatcher,
}

impl Default for ContentSectionParser<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentSectionParser<'static> {
    /// Parser using the built-in marker rules.
    pub fn new() -> Self {
        Self {
            matcher: MarkerMatcher::standard(),
        }
    }
}

impl<'m> ContentSectionParser<'m> {
    /// Parser using a custom rule set.
    pub fn with_matcher(matcher: &'m MarkerMatcher) -> Self {
        Self { matcher }
    }

    /// Parse with the mode chosen by `provider`.
    pub fn parse_with(&self, raw: &str, provider: &dyn RenderModeProvider) -> Vec<ContentBlock> {
        self.parse(raw, provider.render_mode())
    }

    /// Parse `raw` in the given mode.
    ///
    /// Flat mode always yields exactly one plain block. Structured mode yields
    /// blocks in source order; text without any marker yields one plain block.
    #[instrument(skip_all, fields(len = raw.len(), %mode))]
    pub fn parse(&self, raw: &str, mode: RenderMode) -> Vec<ContentBlock> {
        let blocks = match mode {
            RenderMode::Flat => vec![plain_block(raw)],
            RenderMode::Structured => self.parse_structured(raw),
        };
        debug!(blocks = blocks.len(), "turn segmented");
        blocks
    }

    fn parse_structured(&self, raw: &str) -> Vec<ContentBlock> {
        let boundaries = self.matcher.boundaries(raw);
        let Some(first) = boundaries.first() else {
            return vec![plain_block(raw)];
        };

        let mut blocks = Vec::new();

        let preamble = plain_block(&raw[..header_start(raw, first.start)]);
        if !preamble.lines.is_empty() {
            blocks.push(preamble);
        }

        // A marker of the category already open continues that section
        // (e.g. "Section 1: Problem Understanding").
        let mut spans: Vec<(Category, usize)> = Vec::new();
        for boundary in &boundaries {
            if spans.last().map(|(c, _)| *c) != Some(boundary.category) {
                spans.push((boundary.category, header_start(raw, boundary.start)));
            }
        }

        for (i, &(category, start)) in spans.iter().enumerate() {
            let end = spans.get(i + 1).map_or(raw.len(), |&(_, next)| next);
            let body = self.matcher.strip(category, &raw[start..end]);
            blocks.push(ContentBlock {
                category,
                lines: format_lines(&body),
            });
        }

        blocks
    }
}

/// Start of the header holding the marker at `start`.
///
/// Markdown decoration such as `**` or `##` before the marker on its line
/// belongs to the header, so the span opens at the line start instead.
fn header_start(raw: &str, start: usize) -> usize {
    let line_start = raw[..start].rfind('\n').map_or(0, |i| i + 1);
    let decorated = raw[line_start..start]
        .chars()
        .all(|c| c == '*' || c == '#' || c.is_whitespace());
    if decorated { line_start } else { start }
}

fn plain_block(text: &str) -> ContentBlock {
    ContentBlock {
        category: Category::Plain,
        lines: format_lines(text),
    }
}

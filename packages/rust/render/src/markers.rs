//! Section marker rules and the ordered matcher built from them.
//!
//! Rules are evaluated in priority order. All boundary phrases are compiled
//! into a single leftmost-first alternation, so when two phrases start at
//! the same position the one belonging to the earlier rule wins.

use std::sync::LazyLock;

use regex::Regex;

use chatdesk_shared::{Category, ChatdeskError, Result};

use crate::bullets::BULLET_GLYPHS;

/// One section marker rule.
#[derive(Debug, Clone, Copy)]
pub struct MarkerRule {
    /// Category of blocks opened by this rule.
    pub category: Category,
    /// Literal, case-sensitive phrases that open a new section.
    pub boundaries: &'static [&'static str],
    /// Extra phrases removed from the section body (boundaries are always removed).
    pub strip: &'static [&'static str],
}

/// Built-in rules, highest priority first.
pub const DEFAULT_RULES: &[MarkerRule] = &[
    MarkerRule {
        category: Category::ProblemUnderstanding,
        boundaries: &["Problem Understanding", "Section 1:"],
        strip: &[],
    },
    MarkerRule {
        category: Category::Analysis,
        boundaries: &["Analysis", "Section 2:"],
        strip: &["Best Practices"],
    },
    MarkerRule {
        category: Category::Recommendations,
        boundaries: &["Actionable Recommendations", "Solution", "Section 3:"],
        strip: &["Solution", "Recommendation"],
    },
    MarkerRule {
        category: Category::Compliance,
        boundaries: &["Compliance Notes", "Safety Notes", "Section 4:"],
        strip: &["Safety", "Best Practices"],
    },
    MarkerRule {
        category: Category::CostEfficiency,
        boundaries: &["Cost & Efficiency", "Section 5:"],
        strip: &[],
    },
];

/// A marker occurrence in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    /// Byte offset where the marker starts.
    pub start: usize,
    /// Byte offset just past the marker.
    pub end: usize,
    pub category: Category,
}

/// Compiled form of a rule list.
#[derive(Debug)]
pub struct MarkerMatcher {
    boundary_re: Option<Regex>,
    /// Boundary phrase → category, in rule order.
    phrases: Vec<(&'static str, Category)>,
    /// Per-category strip pattern.
    strippers: Vec<(Category, Regex)>,
}

/// Punctuation left behind once a header phrase has been removed.
const HEADER_RESIDUE: &[char] = &[':', '/', '|', '#', '*', '&', '-', '–'];

static STANDARD: LazyLock<MarkerMatcher> =
    LazyLock::new(|| MarkerMatcher::new(DEFAULT_RULES).expect("built-in marker rules compile"));

impl MarkerMatcher {
    /// Compile `rules` into a matcher.
    pub fn new(rules: &[MarkerRule]) -> Result<Self> {
        let mut phrases = Vec::new();
        for rule in rules {
            for phrase in rule.boundaries {
                // First rule to claim a phrase keeps it.
                if !phrases.iter().any(|(p, _)| p == phrase) {
                    phrases.push((*phrase, rule.category));
                }
            }
        }

        let boundary_re = if phrases.is_empty() {
            None
        } else {
            Some(compile_alternation(phrases.iter().map(|(p, _)| *p))?)
        };

        let mut strippers: Vec<(Category, Regex)> = Vec::new();
        for rule in rules {
            let claimed = strippers.iter().any(|(c, _)| *c == rule.category);
            if claimed || (rule.boundaries.is_empty() && rule.strip.is_empty()) {
                continue;
            }
            let all = rule.boundaries.iter().chain(rule.strip.iter()).copied();
            strippers.push((rule.category, compile_alternation(all)?));
        }

        Ok(Self {
            boundary_re,
            phrases,
            strippers,
        })
    }

    /// The matcher for [`DEFAULT_RULES`].
    pub fn standard() -> &'static MarkerMatcher {
        &STANDARD
    }

    /// All marker occurrences in `text`, in source order.
    pub fn boundaries(&self, text: &str) -> Vec<Boundary> {
        let Some(re) = &self.boundary_re else {
            return Vec::new();
        };

        re.find_iter(text)
            .filter_map(|m| {
                let category = self
                    .phrases
                    .iter()
                    .find(|(p, _)| *p == m.as_str())
                    .map(|(_, c)| *c)?;
                Some(Boundary {
                    start: m.start(),
                    end: m.end(),
                    category,
                })
            })
            .collect()
    }

    /// Remove the category's marker phrases from `span`.
    ///
    /// Only lines that contained a phrase are touched: the phrase goes, and
    /// so does the header punctuation around it. A leading bullet glyph is kept.
    pub fn strip(&self, category: Category, span: &str) -> String {
        let Some((_, re)) = self.strippers.iter().find(|(c, _)| *c == category) else {
            return span.to_string();
        };

        span.lines()
            .map(|line| {
                if re.is_match(line) {
                    strip_line(re, line)
                } else {
                    line.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn compile_alternation<'a>(phrases: impl Iterator<Item = &'a str>) -> Result<Regex> {
    let pattern = phrases.map(regex::escape).collect::<Vec<_>>().join("|");
    Regex::new(&pattern)
        .map_err(|e| ChatdeskError::validation(format!("invalid marker pattern: {e}")))
}

fn strip_line(re: &Regex, line: &str) -> String {
    let trimmed = line.trim();
    let (glyph, rest) = match trimmed.chars().next() {
        Some(c) if BULLET_GLYPHS.contains(&c) => (Some(c), &trimmed[c.len_utf8()..]),
        _ => (None, trimmed),
    };

    let removed = remove_phrases(re, rest);
    let cleaned =
        removed.trim_matches(|c: char| c.is_whitespace() || HEADER_RESIDUE.contains(&c));

    match glyph {
        Some(g) if !cleaned.is_empty() => format!("{g} {cleaned}"),
        _ => cleaned.to_string(),
    }
}

/// Remove every match of `re`, closing up the gap each removal leaves.
/// Spacing elsewhere in the line is untouched.
fn remove_phrases(re: &Regex, text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for m in re.find_iter(text) {
        if m.start() > last {
            out.push_str(&text[last..m.start()]);
        }
        last = last.max(m.end());
        if out.ends_with(char::is_whitespace) {
            let rest = &text[last..];
            last += rest.len() - rest.trim_start().len();
        }
    }
    out.push_str(&text[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_boundaries_in_order() {
        let text = "Problem Understanding\nx\nAnalysis\ny\nCost & Efficiency\nz";
        let found: Vec<Category> = MarkerMatcher::standard()
            .boundaries(text)
            .into_iter()
            .map(|b| b.category)
            .collect();
        assert_eq!(
            found,
            vec![
                Category::ProblemUnderstanding,
                Category::Analysis,
                Category::CostEfficiency
            ]
        );
    }

    #[test]
    fn numbered_aliases_map_to_categories() {
        let text = "Section 3: do this\nSection 4: careful\nSection 5: cheap";
        let found: Vec<Category> = MarkerMatcher::standard()
            .boundaries(text)
            .into_iter()
            .map(|b| b.category)
            .collect();
        assert_eq!(
            found,
            vec![
                Category::Recommendations,
                Category::Compliance,
                Category::CostEfficiency
            ]
        );
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert!(MarkerMatcher::standard()
            .boundaries("problem understanding and analysis")
            .is_empty());
    }

    #[test]
    fn unknown_section_numbers_are_not_markers() {
        assert!(MarkerMatcher::standard()
            .boundaries("Section 6: appendix")
            .is_empty());
    }

    #[test]
    fn first_rule_wins_at_same_position() {
        static RULES: &[MarkerRule] = &[
            MarkerRule {
                category: Category::Compliance,
                boundaries: &["Safety"],
                strip: &[],
            },
            MarkerRule {
                category: Category::Analysis,
                boundaries: &["Safety Analysis"],
                strip: &[],
            },
        ];
        let matcher = MarkerMatcher::new(RULES).expect("compile");
        let found = matcher.boundaries("Safety Analysis follows");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].category, Category::Compliance);
    }

    #[test]
    fn duplicate_phrase_keeps_first_category() {
        static RULES: &[MarkerRule] = &[
            MarkerRule {
                category: Category::Analysis,
                boundaries: &["Review"],
                strip: &[],
            },
            MarkerRule {
                category: Category::Compliance,
                boundaries: &["Review"],
                strip: &[],
            },
        ];
        let matcher = MarkerMatcher::new(RULES).expect("compile");
        assert_eq!(matcher.boundaries("Review")[0].category, Category::Analysis);
    }

    #[test]
    fn strip_removes_header_and_residue() {
        let matcher = MarkerMatcher::standard();
        let out = matcher.strip(
            Category::Analysis,
            "Section 2: Analysis / Best Practices\nKeep this line.",
        );
        assert_eq!(out, "\nKeep this line.");
    }

    #[test]
    fn strip_keeps_bullet_glyph() {
        let matcher = MarkerMatcher::standard();
        let out = matcher.strip(Category::Compliance, "- Follow Safety rules");
        assert_eq!(out, "- Follow rules");
    }

    #[test]
    fn strip_preserves_spacing_away_from_the_phrase() {
        let matcher = MarkerMatcher::standard();
        let out = matcher.strip(
            Category::Analysis,
            "Use a    wide   margin for Best Practices here.",
        );
        assert_eq!(out, "Use a    wide   margin for here.");
    }

    #[test]
    fn word_aliases_open_their_sections() {
        let found: Vec<Category> = MarkerMatcher::standard()
            .boundaries("Solution\nSafety Notes\n")
            .into_iter()
            .map(|b| b.category)
            .collect();
        assert_eq!(found, vec![Category::Recommendations, Category::Compliance]);
    }

    #[test]
    fn strip_removes_safety_notes_header_whole() {
        let matcher = MarkerMatcher::standard();
        assert_eq!(matcher.strip(Category::Compliance, "Safety Notes:"), "");
    }

    #[test]
    fn strip_drops_bold_header() {
        let matcher = MarkerMatcher::standard();
        let out = matcher.strip(Category::CostEfficiency, "**Cost & Efficiency**");
        assert_eq!(out, "");
    }

    #[test]
    fn strip_leaves_other_categories_phrases() {
        let matcher = MarkerMatcher::standard();
        let out = matcher.strip(Category::ProblemUnderstanding, "Best Practices apply");
        assert_eq!(out, "Best Practices apply");
    }

    #[test]
    fn empty_rule_set_matches_nothing() {
        let matcher = MarkerMatcher::new(&[]).expect("compile");
        assert!(matcher.boundaries("Analysis").is_empty());
        assert_eq!(matcher.strip(Category::Analysis, "Analysis"), "Analysis");
    }
}

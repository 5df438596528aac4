//! Structural classification of raw text blocks and section grouping.
//!
//! One parameterized classifier serves every backend: DOCX passes style
//! names and numbering hints, PDF enables the font-size fallback, HTML
//! and plain text rely on the lexical heuristics alone. Classification
//! never fails; anything unmatched is a paragraph.

use crate::document::{Block, Section};

/// Tuning knobs for [`classify`].
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Enables the font-size heading fallback (PDF extraction).
    pub enable_font_size: bool,
    /// Max length for the short-line heading heuristic.
    pub short_heading_len: usize,
    /// Max length for the all-caps heading heuristic.
    pub caps_heading_len: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            enable_font_size: false,
            short_heading_len: 80,
            caps_heading_len: 100,
        }
    }
}

/// One block's worth of evidence for classification.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassifyInput<'a> {
    pub text: &'a str,
    /// Paragraph style name from the source format, lowercased or not.
    pub style_name: Option<&'a str>,
    /// Dominant font size in points, when the source has one.
    pub font_size: Option<f64>,
    /// Explicit list-numbering marker from the source (DOCX numPr).
    pub has_numbering: bool,
}

/// Classifier verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Heading { level: u8 },
    ListItem { level: usize, ordered: bool },
    Paragraph,
}

const BULLET_GLYPHS: [char; 6] = ['•', '-', '*', '◦', '▪', '▫'];

/// Largest font size still read as body text when the font-size channel
/// is active (matches the lowest rung of the heading ladder).
const BODY_FONT_MAX: f64 = 12.0;

/// Classifies one block. Evidence is consulted in fixed priority: style
/// name, explicit numbering, list enumerators, lexical heading prefixes,
/// short-line/all-caps fallback, then font size when enabled.
#[must_use]
pub fn classify(input: ClassifyInput<'_>, config: &ClassifierConfig) -> BlockKind {
    let indent_level = indent_level(input.text);
    let text = input.text.trim();
    if text.is_empty() {
        return BlockKind::Paragraph;
    }

    if let Some(style) = input.style_name {
        let style = style.to_ascii_lowercase();
        if style.contains("title") {
            return BlockKind::Heading { level: 1 };
        }
        if let Some(rest) = style.find("heading").map(|i| &style[i + "heading".len()..]) {
            let level = rest
                .trim()
                .chars()
                .next()
                .and_then(|c| c.to_digit(10))
                .map_or_else(|| lexical_heading_level(text).unwrap_or(1), |d| d as u8);
            return BlockKind::Heading {
                level: level.clamp(1, 6),
            };
        }
        if style.contains("list") {
            return BlockKind::ListItem {
                level: indent_level,
                ordered: looks_ordered(text),
            };
        }
    }

    if input.has_numbering {
        // The numbering hint covers bullet and numbered definitions
        // alike; `ordered` needs a textual enumerator.
        return BlockKind::ListItem {
            level: indent_level,
            ordered: looks_ordered(text),
        };
    }

    if starts_with_bullet(text) || has_enumerator(text) {
        return BlockKind::ListItem {
            level: indent_level,
            ordered: !starts_with_bullet(text),
        };
    }

    if text.len() < config.short_heading_len {
        if let Some(level) = lexical_heading_level(text) {
            return BlockKind::Heading { level };
        }
    }

    // When typography is available, a body-sized font vetoes the
    // short-line guess: wrapped PDF lines routinely end mid-sentence
    // under the length threshold.
    let body_sized = config.enable_font_size
        && input.font_size.is_some_and(|s| s <= BODY_FONT_MAX);
    let short = text.len() < config.short_heading_len
        && !text.ends_with('.')
        && !text.ends_with(',')
        && !body_sized;
    let caps = text.len() < config.caps_heading_len
        && text.chars().any(|c| c.is_alphabetic())
        && !text.chars().any(|c| c.is_lowercase());
    if short || caps {
        let level = if text.len() < 30 {
            1
        } else if text.len() < 50 {
            2
        } else {
            3
        };
        return BlockKind::Heading { level };
    }

    if config.enable_font_size {
        if let Some(size) = input.font_size {
            let level = match size {
                s if s > 18.0 => Some(1),
                s if s > 16.0 => Some(2),
                s if s > 14.0 => Some(3),
                s if s > 12.0 => Some(4),
                _ => None,
            };
            if let Some(level) = level {
                return BlockKind::Heading { level };
            }
        }
    }

    BlockKind::Paragraph
}

/// Nesting depth from leading whitespace: 4 spaces or one tab per level,
/// capped at 2.
fn indent_level(text: &str) -> usize {
    let mut spaces = 0usize;
    let mut tabs = 0usize;
    for ch in text.chars() {
        match ch {
            ' ' => spaces += 1,
            '\t' => tabs += 1,
            _ => break,
        }
    }
    (tabs + spaces / 4).min(2)
}

fn starts_with_bullet(text: &str) -> bool {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(first), rest) => {
            BULLET_GLYPHS.contains(&first) && rest.map_or(true, char::is_whitespace)
        }
        _ => false,
    }
}

/// Paren-style enumerators: `a)`, `(a)`, `(1)`.
fn has_enumerator(text: &str) -> bool {
    let bytes = text.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_lowercase() && bytes[1] == b')' {
        return (b'a'..=b'j').contains(&bytes[0]);
    }
    if bytes.len() >= 3 && bytes[0] == b'(' && bytes[2] == b')' {
        return bytes[1].is_ascii_digit() && bytes[1] != b'0'
            || (b'a'..=b'j').contains(&bytes[1]);
    }
    false
}

/// True when an already-decided list item should render numbered:
/// a digit-dot within the first few chars, or a letter/roman enumerator.
fn looks_ordered(text: &str) -> bool {
    if has_enumerator(text) {
        return true;
    }
    if let Some(dot) = text.find('.') {
        if dot > 0 && dot <= 4 && text[..dot].chars().all(|c| c.is_ascii_digit()) {
            return true;
        }
    }
    false
}

const ROMAN: [&str; 10] = ["I", "II", "III", "IV", "V", "VI", "VII", "VIII", "IX", "X"];

/// Heading level implied by a lexical prefix, if any.
fn lexical_heading_level(text: &str) -> Option<u8> {
    let lower = text.to_ascii_lowercase();
    for word in ["chapter", "section", "part", "appendix"] {
        if lower.starts_with(word)
            && lower[word.len()..].chars().next().map_or(false, |c| c == ' ')
        {
            return Some(1);
        }
    }
    if let Some(dot) = text.find('.') {
        let prefix = &text[..dot];
        if prefix.len() == 1 && prefix.as_bytes()[0].is_ascii_digit() && prefix != "0" {
            return Some(1);
        }
        if ROMAN.contains(&prefix) {
            return Some(2);
        }
        if prefix.len() == 1 && (b'A'..=b'J').contains(&prefix.as_bytes()[0]) {
            return Some(3);
        }
        if (prefix.len() == 1 && (b'a'..=b'j').contains(&prefix.as_bytes()[0]))
            || (prefix.starts_with('(') && prefix.len() == 3)
        {
            return Some(4);
        }
    }
    None
}

/// Groups a reading-order block stream into sections: a heading of level
/// 1 or 2 closes the running section and opens the next one. Indices are
/// dense from zero; empty input yields exactly one empty section.
#[must_use]
pub fn group_into_sections(blocks: Vec<Block>) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current: Vec<Block> = Vec::new();

    for block in blocks {
        let opens = matches!(&block, Block::Heading(h) if h.level <= 2);
        if opens && !current.is_empty() {
            sections.push(Section::with_blocks(sections.len(), std::mem::take(&mut current)));
        }
        current.push(block);
    }
    if !current.is_empty() || sections.is_empty() {
        sections.push(Section::with_blocks(sections.len(), current));
    }
    sections
}

//! Layout-aware document IR (v2).
//!
//! The pivot format between any input and any output: a `Document` owns
//! `Section`s in reading order; a section owns typed `Block`s and an
//! optional recurring header/footer; textual blocks own formatted `Span`
//! runs. Blocks that need spatial fidelity (figures, layout-preserving
//! render) carry an [`Anchor`] with normalized page coordinates; an absent
//! anchor means flow layout.
//!
//! A `Document` is constructed once per parse from immutable source bytes
//! and never mutated in place; translation produces a new `Document`.

use serde::{Deserialize, Serialize};

/// Default page width in inches (US Letter).
pub const DEFAULT_PAGE_WIDTH: f64 = 8.5;

/// Default page height in inches (US Letter).
pub const DEFAULT_PAGE_HEIGHT: f64 = 11.0;

/// A run of text with optional inline formatting.
///
/// Invariant: concatenating span texts in order reconstructs the owning
/// block's plain text exactly; a span's text is never split structurally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Span {
    /// Text content of the run.
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub underline: Option<bool>,
    /// Font size in points.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    /// Hex RGB triplet without leading `#`, e.g. `"1a2b3c"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Hyperlink target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// BCP-47 language tag for the run, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

impl Span {
    /// Creates an unformatted span.
    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Returns true when the span carries no formatting at all.
    #[must_use]
    pub fn is_plain(&self) -> bool {
        self.bold.is_none()
            && self.italic.is_none()
            && self.underline.is_none()
            && self.font_size.is_none()
            && self.font_family.is_none()
            && self.color.is_none()
            && self.link.is_none()
            && self.lang.is_none()
    }
}

/// Normalized page-relative position for elements that need placement.
///
/// Coordinates are fractions of the page box; `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    /// Page number (1-based).
    pub page: u32,
    /// Normalized x position (0-1).
    pub x: f64,
    /// Normalized y position (0-1).
    pub y: f64,
    /// Normalized width (0-1).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    /// Normalized height (0-1).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

impl Anchor {
    /// Creates an anchor at the given normalized position.
    #[must_use]
    pub const fn new(page: u32, x: f64, y: f64) -> Self {
        Self {
            page,
            x,
            y,
            width: None,
            height: None,
        }
    }

    /// Converts normalized coordinates to inches for a physical page box.
    ///
    /// Missing width/height default to full width and half an inch of
    /// height respectively, matching what layout-preserving writers need.
    #[must_use]
    pub fn to_inches(&self, page_width: f64, page_height: f64) -> (f64, f64, f64, f64) {
        (
            self.x * page_width,
            self.y * page_height,
            self.width.unwrap_or(1.0) * page_width,
            self.height.unwrap_or(0.5) * page_height,
        )
    }
}

/// Paragraph alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Right,
    Center,
    Justify,
}

/// Writing direction for a table cell or rendered block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ltr,
    Rtl,
}

/// Which physical pages re-display a recurring header/footer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageRange {
    #[default]
    All,
    First,
    Even,
    Odd,
}

/// Heading block with level 1-6.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heading {
    /// Heading level (1-6).
    pub level: u8,
    pub spans: Vec<Span>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<Anchor>,
}

impl Heading {
    /// Creates a heading, clamping the level into 1-6.
    #[must_use]
    pub fn new(level: u8, spans: Vec<Span>) -> Self {
        Self {
            level: level.clamp(1, 6),
            spans,
            anchor: None,
        }
    }

    /// Plain text of the heading.
    #[must_use]
    pub fn text(&self) -> String {
        spans_text(&self.spans)
    }
}

/// Paragraph block with formatted spans.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    pub spans: Vec<Span>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<Anchor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alignment: Option<Alignment>,
    /// Line spacing multiple (1.0 = single).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_spacing: Option<f64>,
}

impl Paragraph {
    /// Creates a flow paragraph from spans.
    #[must_use]
    pub fn new(spans: Vec<Span>) -> Self {
        Self {
            spans,
            ..Self::default()
        }
    }

    /// Creates a paragraph holding a single unformatted run.
    #[must_use]
    pub fn text_block(text: impl Into<String>) -> Self {
        Self::new(vec![Span::plain(text)])
    }

    /// Plain text of the paragraph.
    #[must_use]
    pub fn text(&self) -> String {
        spans_text(&self.spans)
    }
}

/// List item with nesting level; `ordered` distinguishes numbered from
/// bulleted rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    /// Nesting level (0-based).
    pub level: usize,
    /// True for numbered lists, false for bullet lists.
    pub ordered: bool,
    pub spans: Vec<Span>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<Anchor>,
}

impl ListItem {
    /// Creates a list item.
    #[must_use]
    pub fn new(level: usize, ordered: bool, spans: Vec<Span>) -> Self {
        Self {
            level,
            ordered,
            spans,
            anchor: None,
        }
    }

    /// Plain text of the item.
    #[must_use]
    pub fn text(&self) -> String {
        spans_text(&self.spans)
    }
}

/// Block types allowed inside table cells, textboxes and headers/footers.
///
/// Excludes `Table` to bound structural nesting at depth 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CellBlock {
    Heading(Heading),
    Paragraph(Paragraph),
    ListItem(ListItem),
}

impl CellBlock {
    /// Spans of the contained block.
    #[must_use]
    pub fn spans(&self) -> &[Span] {
        match self {
            Self::Heading(h) => &h.spans,
            Self::Paragraph(p) => &p.spans,
            Self::ListItem(li) => &li.spans,
        }
    }

    /// Plain text of the contained block.
    #[must_use]
    pub fn text(&self) -> String {
        spans_text(self.spans())
    }
}

fn one() -> u32 {
    1
}

/// Table cell containing nested (non-table) blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub blocks: Vec<CellBlock>,
    /// Number of columns this cell spans (>= 1).
    #[serde(default = "one")]
    pub colspan: u32,
    /// Number of rows this cell spans (>= 1).
    #[serde(default = "one")]
    pub rowspan: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
}

impl Cell {
    /// Creates a 1x1 cell.
    #[must_use]
    pub fn new(blocks: Vec<CellBlock>) -> Self {
        Self {
            blocks,
            colspan: 1,
            rowspan: 1,
            direction: None,
        }
    }

    /// Creates a 1x1 cell holding one plain paragraph (empty string for a
    /// blank cell, so the grid keeps its shape).
    #[must_use]
    pub fn text_cell(text: impl Into<String>) -> Self {
        Self::new(vec![CellBlock::Paragraph(Paragraph::text_block(text))])
    }
}

/// Table row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub cells: Vec<Cell>,
}

/// Table block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub rows: Vec<Row>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<Anchor>,
}

impl Table {
    /// Column count of the widest row, counting colspans.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.rows
            .iter()
            .map(|r| r.cells.iter().map(|c| c.colspan as usize).sum())
            .max()
            .unwrap_or(0)
    }
}

/// Figure block: an image reference with optional embedded bytes and
/// caption. Dimensions are in inches when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    /// Unique identifier for the image within the document.
    pub image_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_bytes: Option<Vec<u8>>,
    /// Image format, e.g. `"png"` or `"jpeg"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<Paragraph>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<Anchor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

/// Textbox: nested content rendered as an inset block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Textbox {
    pub blocks: Vec<CellBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<Anchor>,
}

/// The block union. Tables bound nesting by holding [`CellBlock`]s only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Heading(Heading),
    Paragraph(Paragraph),
    ListItem(ListItem),
    Table(Table),
    Figure(Figure),
    Textbox(Textbox),
}

impl Block {
    /// Spans of a textual block (`None` for tables, figures, textboxes).
    #[must_use]
    pub fn spans(&self) -> Option<&[Span]> {
        match self {
            Self::Heading(h) => Some(&h.spans),
            Self::Paragraph(p) => Some(&p.spans),
            Self::ListItem(li) => Some(&li.spans),
            _ => None,
        }
    }

    /// Plain text of the block; tables and nested containers flatten cell
    /// text joined by spaces, figures contribute caption text only.
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            Self::Heading(h) => h.text(),
            Self::Paragraph(p) => p.text(),
            Self::ListItem(li) => li.text(),
            Self::Table(t) => t
                .rows
                .iter()
                .flat_map(|r| r.cells.iter())
                .flat_map(|c| c.blocks.iter())
                .map(CellBlock::text)
                .collect::<Vec<_>>()
                .join(" "),
            Self::Figure(f) => f.caption.as_ref().map(Paragraph::text).unwrap_or_default(),
            Self::Textbox(tb) => tb
                .blocks
                .iter()
                .map(CellBlock::text)
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// Recurring header bound to a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub blocks: Vec<CellBlock>,
    #[serde(default)]
    pub page_range: PageRange,
}

/// Recurring footer bound to a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Footer {
    pub blocks: Vec<CellBlock>,
    #[serde(default)]
    pub page_range: PageRange,
}

fn default_page_width() -> f64 {
    DEFAULT_PAGE_WIDTH
}

fn default_page_height() -> f64 {
    DEFAULT_PAGE_HEIGHT
}

/// Reading-order partition of a document bound to consistent page
/// geometry (in inches) and optional recurring header/footer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Dense zero-based section index.
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<Header>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<Footer>,
    pub blocks: Vec<Block>,
    #[serde(default = "default_page_width")]
    pub page_width: f64,
    #[serde(default = "default_page_height")]
    pub page_height: f64,
}

impl Section {
    /// Creates an empty section with default US Letter geometry.
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self {
            index,
            header: None,
            footer: None,
            blocks: Vec::new(),
            page_width: DEFAULT_PAGE_WIDTH,
            page_height: DEFAULT_PAGE_HEIGHT,
        }
    }

    /// Creates a section holding the given blocks.
    #[must_use]
    pub fn with_blocks(index: usize, blocks: Vec<Block>) -> Self {
        Self {
            blocks,
            ..Self::new(index)
        }
    }
}

/// Derived document metadata. Page and word counts are rough estimates,
/// not guaranteed exact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Creation timestamp (ISO-8601 string, as extracted).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
    #[serde(default)]
    pub pages: u32,
    #[serde(default)]
    pub word_count: usize,
    /// Page width in inches.
    #[serde(default = "default_page_width")]
    pub page_width: f64,
    /// Page height in inches.
    #[serde(default = "default_page_height")]
    pub page_height: f64,
}

impl Default for DocumentMeta {
    fn default() -> Self {
        Self {
            title: None,
            author: None,
            created: None,
            modified: None,
            pages: 0,
            word_count: 0,
            page_width: DEFAULT_PAGE_WIDTH,
            page_height: DEFAULT_PAGE_HEIGHT,
        }
    }
}

/// Root aggregate: metadata plus sections in reading order. Owns all
/// sections exclusively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub meta: DocumentMeta,
    pub sections: Vec<Section>,
}

impl Document {
    /// Creates a document from metadata and sections.
    #[must_use]
    pub fn new(meta: DocumentMeta, sections: Vec<Section>) -> Self {
        Self { meta, sections }
    }

    /// Iterates body blocks across all sections in reading order.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.sections.iter().flat_map(|s| s.blocks.iter())
    }

    /// Plain text of the whole body, blocks joined by newlines.
    #[must_use]
    pub fn plain_text(&self) -> String {
        self.blocks()
            .map(Block::text)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Whitespace-separated word count over the body text.
    #[must_use]
    pub fn word_count(&self) -> usize {
        self.blocks().map(|b| b.text().split_whitespace().count()).sum()
    }
}

/// Counters reported alongside a parse. `skipped_assets` tracks images or
/// attachments that were dropped with a warning instead of failing the
/// parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseStats {
    pub paragraphs: usize,
    pub tables: usize,
    pub figures: usize,
    pub headers: usize,
    pub footers: usize,
    pub sections: usize,
    pub word_count: usize,
    pub skipped_assets: usize,
}

/// Result of parsing a document: IR, detected source language code and
/// counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseResult {
    pub document: Document,
    /// Detected language code, e.g. `"en"` or `"fa"`.
    pub lang: String,
    pub stats: ParseStats,
}

/// One term mapping applied verbatim during translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlossaryEntry {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default)]
    pub exact: bool,
}

/// Concatenates span texts in order.
#[must_use]
pub fn spans_text(spans: &[Span]) -> String {
    spans.iter().map(|s| s.text.as_str()).collect()
}

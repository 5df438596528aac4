//! PDF parser producing the layout-aware IR.
//!
//! Extraction is split in two stages so the interesting logic stays
//! testable without PDF bytes:
//!
//! 1. [`extract_pages`] walks the PDF with `lopdf` and produces the
//!    neutral [`PdfPage`]/[`PdfLine`] model (best-effort text plumbing;
//!    embedded fonts with exotic encodings degrade to lossy text).
//! 2. [`build_document`] is pure: classification with the font-size
//!    fallback enabled, recurring header/footer promotion, heuristic
//!    table grouping and section assembly all operate on synthetic or
//!    real pages alike.

use std::collections::HashMap;

use log::warn;
use lopdf::content::Content;
use lopdf::Object;

use tarjoman_core::classify::{classify, group_into_sections, BlockKind, ClassifierConfig, ClassifyInput};
use tarjoman_core::document::{
    Anchor, Block, CellBlock, Document, DocumentMeta, Figure, Footer, Header, Heading, ListItem,
    PageRange, Paragraph, ParseResult, ParseStats, Row, Section, Span, Table,
};
use tarjoman_core::error::{Result, TarjomanError};
use tarjoman_core::lang::detect_language;

use crate::traits::{ParserOptions, StructuredParser};

const POINTS_PER_INCH: f64 = 72.0;
/// Fraction of page height treated as the header/footer band.
const FURNITURE_BAND: f64 = 0.10;
/// Vertical tolerance (points) for two fragments sharing a baseline.
const BASELINE_TOLERANCE: f64 = 3.0;
/// Horizontal gap (points) that separates column groups on a baseline.
const COLUMN_GAP: f64 = 24.0;

/// One extracted text line with its position in PDF points
/// (origin bottom-left).
#[derive(Debug, Clone, PartialEq)]
pub struct PdfLine {
    pub text: String,
    pub font_size: Option<f64>,
    pub x: f64,
    pub y: f64,
}

/// One page of extracted content in PDF points.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfPage {
    /// 1-based page number.
    pub number: u32,
    pub width: f64,
    pub height: f64,
    pub lines: Vec<PdfLine>,
    /// Image XObject names found on the page.
    pub images: Vec<String>,
}

/// PDF parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfParser {
    options: ParserOptions,
}

impl PdfParser {
    /// Creates a parser with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a parser with explicit options.
    #[must_use]
    pub const fn with_options(options: ParserOptions) -> Self {
        Self { options }
    }
}

impl StructuredParser for PdfParser {
    fn parse(&self, bytes: &[u8]) -> Result<ParseResult> {
        let pages = extract_pages(bytes)?;
        let (document, stats) = build_document(&pages, &self.options);
        if document.plain_text().trim().is_empty() && stats.figures == 0 {
            return Err(TarjomanError::ExtractionFailed(
                "no extractable text in PDF".to_string(),
            ));
        }
        let lang = detect_language(&document).code().to_string();
        Ok(ParseResult {
            document,
            lang,
            stats,
        })
    }
}

/// Walks the PDF page tree and content streams into the neutral model.
pub fn extract_pages(bytes: &[u8]) -> Result<Vec<PdfPage>> {
    let doc = lopdf::Document::load_mem(bytes)
        .map_err(|e| TarjomanError::UnsupportedFormat(format!("not a readable PDF: {e}")))?;

    let mut pages = Vec::new();
    for (number, page_id) in doc.get_pages() {
        let (width, height) = page_box(&doc, page_id);
        let mut lines = Vec::new();
        match doc
            .get_page_content(page_id)
            .map_err(|e| e.to_string())
            .and_then(|c| Content::decode(&c).map_err(|e| e.to_string()))
        {
            Ok(content) => collect_lines(&content, &mut lines),
            Err(e) => warn!("page {number}: unreadable content stream: {e}"),
        }
        let images = page_image_names(&doc, page_id);
        pages.push(PdfPage {
            number,
            width,
            height,
            lines,
            images,
        });
    }
    Ok(pages)
}

fn page_box(doc: &lopdf::Document, page_id: lopdf::ObjectId) -> (f64, f64) {
    let rect = doc
        .get_object(page_id)
        .ok()
        .and_then(|o| o.as_dict().ok())
        .and_then(|d| d.get(b"MediaBox").ok())
        .and_then(|o| o.as_array().ok())
        .map(|arr| {
            arr.iter()
                .map(|v| v.as_float().map(f64::from).or_else(|_| v.as_i64().map(|i| i as f64)))
                .collect::<Vec<_>>()
        });
    if let Some(values) = rect {
        let nums: Vec<f64> = values.into_iter().filter_map(std::result::Result::ok).collect();
        if nums.len() == 4 {
            return ((nums[2] - nums[0]).abs(), (nums[3] - nums[1]).abs());
        }
    }
    (612.0, 792.0)
}

fn page_image_names(doc: &lopdf::Document, page_id: lopdf::ObjectId) -> Vec<String> {
    let mut names = Vec::new();
    let (maybe_dict, _) = doc.get_page_resources(page_id);
    let Some(resources) = maybe_dict else {
        return names;
    };
    let Ok(xobjects) = resources.get(b"XObject").and_then(lopdf::Object::as_dict) else {
        return names;
    };
    for (name, value) in xobjects.iter() {
        let is_image = doc
            .dereference(value)
            .ok()
            .and_then(|(_, o)| o.as_stream().ok())
            .and_then(|s| s.dict.get(b"Subtype").ok())
            .and_then(|o| o.as_name().ok())
            .is_some_and(|n| n == b"Image");
        if is_image {
            names.push(String::from_utf8_lossy(name).to_string());
        }
    }
    names
}

/// Accumulates positioned text fragments from a decoded content stream,
/// merging fragments that share a baseline into lines.
fn collect_lines(content: &Content, lines: &mut Vec<PdfLine>) {
    let mut x = 0.0f64;
    let mut y = 0.0f64;
    let mut font_size: Option<f64> = None;
    let mut fragments: Vec<PdfLine> = Vec::new();

    for op in &content.operations {
        match op.operator.as_str() {
            "BT" => {
                x = 0.0;
                y = 0.0;
            }
            "Tf" => {
                font_size = op.operands.get(1).and_then(as_number);
            }
            "Td" | "TD" => {
                if let (Some(dx), Some(dy)) = (
                    op.operands.first().and_then(as_number),
                    op.operands.get(1).and_then(as_number),
                ) {
                    x += dx;
                    y += dy;
                }
            }
            "Tm" => {
                if let (Some(e), Some(f)) = (
                    op.operands.get(4).and_then(as_number),
                    op.operands.get(5).and_then(as_number),
                ) {
                    x = e;
                    y = f;
                }
            }
            "T*" => y -= font_size.unwrap_or(12.0) * 1.2,
            "Tj" | "'" | "\"" => {
                if let Some(text) = op.operands.iter().rev().find_map(as_text) {
                    push_fragment(&mut fragments, text, font_size, x, y);
                }
            }
            "TJ" => {
                if let Some(Object::Array(parts)) = op.operands.first() {
                    let text: String = parts.iter().filter_map(as_text).collect();
                    push_fragment(&mut fragments, text, font_size, x, y);
                }
            }
            _ => {}
        }
    }

    // Baseline merge, top of page first. An x-gap wider than COLUMN_GAP
    // between fragments on one baseline is a column break and becomes a
    // tab, which `split_columns` later honors.
    fragments.sort_by(|a, b| {
        b.y.partial_cmp(&a.y)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
    });
    let mut end_x = 0.0f64;
    for fragment in fragments {
        let fragment_end = fragment.x + approx_text_width(&fragment.text, fragment.font_size);
        match lines.last_mut() {
            Some(last) if (last.y - fragment.y).abs() <= BASELINE_TOLERANCE => {
                if fragment.x - end_x > COLUMN_GAP {
                    last.text.push('\t');
                } else if !last.text.ends_with(' ') {
                    last.text.push(' ');
                }
                last.text.push_str(&fragment.text);
                end_x = end_x.max(fragment_end);
            }
            _ => {
                lines.push(fragment);
                end_x = fragment_end;
            }
        }
    }
    lines.retain(|l| !l.text.trim().is_empty());
}

/// Rough advance width of a fragment: average glyph about half an em.
fn approx_text_width(text: &str, font_size: Option<f64>) -> f64 {
    text.chars().count() as f64 * font_size.unwrap_or(12.0) * 0.5
}

fn push_fragment(fragments: &mut Vec<PdfLine>, text: String, font_size: Option<f64>, x: f64, y: f64) {
    if text.trim().is_empty() {
        return;
    }
    fragments.push(PdfLine {
        text,
        font_size,
        x,
        y,
    });
}

fn as_number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

fn as_text(object: &Object) -> Option<String> {
    match object {
        // Best-effort: exotic font encodings degrade to lossy UTF-8.
        Object::String(bytes, _) => Some(String::from_utf8_lossy(bytes).to_string()),
        _ => None,
    }
}

/// Assembles the IR from extracted pages. Pure; synthetic pages work.
#[must_use]
pub fn build_document(pages: &[PdfPage], options: &ParserOptions) -> (Document, ParseStats) {
    let mut stats = ParseStats::default();
    let limit = options.max_pages.unwrap_or(usize::MAX);
    let pages: Vec<&PdfPage> = pages.iter().take(limit).collect();

    let (header_texts, footer_texts) = recurring_furniture(&pages);

    let mut blocks = Vec::new();
    let config = ClassifierConfig {
        enable_font_size: true,
        ..ClassifierConfig::default()
    };

    for page in &pages {
        let body_lines: Vec<&PdfLine> = page
            .lines
            .iter()
            .filter(|l| {
                let band = furniture_band(page, l);
                match band {
                    Band::Top => !header_texts.contains(&normalize(&l.text)),
                    Band::Bottom => !footer_texts.contains(&normalize(&l.text)),
                    Band::Body => true,
                }
            })
            .collect();

        page_blocks(page, &body_lines, &config, &mut blocks);

        if options.extract_images {
            for i in 0..page.images.len() {
                stats.figures += 1;
                blocks.push(Block::Figure(Figure {
                    image_id: format!("img_{}_{}", page.number, i),
                    image_bytes: None,
                    format: None,
                    caption: None,
                    anchor: Some(Anchor::new(page.number, 0.1, 0.1)),
                    width: None,
                    height: None,
                }));
            }
        }
    }

    for block in &blocks {
        match block {
            Block::Table(_) => stats.tables += 1,
            Block::Figure(_) => {}
            _ => stats.paragraphs += 1,
        }
    }

    let mut sections = group_into_sections(blocks);
    let (page_width, page_height) = pages
        .first()
        .map_or((612.0, 792.0), |p| (p.width, p.height));
    for section in &mut sections {
        section.page_width = page_width / POINTS_PER_INCH;
        section.page_height = page_height / POINTS_PER_INCH;
    }

    if !header_texts.is_empty() {
        stats.headers = 1;
        if let Some(first) = sections.first_mut() {
            first.header = Some(Header {
                blocks: header_texts
                    .iter()
                    .map(|t| CellBlock::Paragraph(Paragraph::text_block(t.clone())))
                    .collect(),
                page_range: PageRange::All,
            });
        }
    }
    if !footer_texts.is_empty() {
        stats.footers = 1;
        if let Some(first) = sections.first_mut() {
            first.footer = Some(Footer {
                blocks: footer_texts
                    .iter()
                    .map(|t| CellBlock::Paragraph(Paragraph::text_block(t.clone())))
                    .collect(),
                page_range: PageRange::All,
            });
        }
    }
    stats.sections = sections.len();

    let meta = DocumentMeta {
        pages: pages.len() as u32,
        page_width: page_width / POINTS_PER_INCH,
        page_height: page_height / POINTS_PER_INCH,
        ..DocumentMeta::default()
    };
    let mut document = Document::new(meta, sections);
    stats.word_count = document.word_count();
    document.meta.word_count = stats.word_count;
    (document, stats)
}

enum Band {
    Top,
    Bottom,
    Body,
}

fn furniture_band(page: &PdfPage, line: &PdfLine) -> Band {
    if line.y >= page.height * (1.0 - FURNITURE_BAND) {
        Band::Top
    } else if line.y <= page.height * FURNITURE_BAND {
        Band::Bottom
    } else {
        Band::Body
    }
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text recurring in the top/bottom bands of more than one page becomes
/// the document header/footer; one-off band text stays in the body.
fn recurring_furniture(pages: &[&PdfPage]) -> (Vec<String>, Vec<String>) {
    let mut top_counts: HashMap<String, usize> = HashMap::new();
    let mut bottom_counts: HashMap<String, usize> = HashMap::new();
    let mut top_order = Vec::new();
    let mut bottom_order = Vec::new();

    for page in pages {
        for line in &page.lines {
            let key = normalize(&line.text);
            if key.is_empty() {
                continue;
            }
            match furniture_band(page, line) {
                Band::Top => {
                    let count = top_counts.entry(key.clone()).or_insert(0);
                    *count += 1;
                    if *count == 1 {
                        top_order.push(key);
                    }
                }
                Band::Bottom => {
                    let count = bottom_counts.entry(key.clone()).or_insert(0);
                    *count += 1;
                    if *count == 1 {
                        bottom_order.push(key);
                    }
                }
                Band::Body => {}
            }
        }
    }

    let headers = top_order
        .into_iter()
        .filter(|t| top_counts.get(t).copied().unwrap_or(0) > 1)
        .collect();
    let footers = bottom_order
        .into_iter()
        .filter(|t| bottom_counts.get(t).copied().unwrap_or(0) > 1)
        .collect();
    (headers, footers)
}

/// Classifies one page's body lines into blocks, with baseline-grouped
/// table detection first.
fn page_blocks(
    page: &PdfPage,
    lines: &[&PdfLine],
    config: &ClassifierConfig,
    blocks: &mut Vec<Block>,
) {
    let mut index = 0;
    let mut paragraph_run: Vec<&PdfLine> = Vec::new();

    while index < lines.len() {
        // A run of consecutive baselines that each split into >= 2
        // column groups is a table; a single such baseline is not.
        let table_rows = table_run(&lines[index..]);
        if table_rows.len() >= 2 {
            flush_paragraph(&mut paragraph_run, page, blocks);
            let consumed = table_rows.len();
            let rows = table_rows
                .into_iter()
                .map(|cells| Row {
                    cells: cells
                        .into_iter()
                        .map(|text| tarjoman_core::document::Cell::text_cell(text))
                        .collect(),
                })
                .collect();
            blocks.push(Block::Table(Table {
                rows,
                anchor: lines.get(index).map(|l| anchor_for(page, l)),
            }));
            index += consumed;
            continue;
        }

        let line = lines[index];
        let kind = classify(
            ClassifyInput {
                text: &line.text,
                style_name: None,
                font_size: line.font_size,
                has_numbering: false,
            },
            config,
        );
        match kind {
            BlockKind::Heading { level } => {
                flush_paragraph(&mut paragraph_run, page, blocks);
                blocks.push(Block::Heading(Heading {
                    level,
                    spans: vec![line_span(line)],
                    anchor: Some(anchor_for(page, line)),
                }));
            }
            BlockKind::ListItem { level, ordered } => {
                flush_paragraph(&mut paragraph_run, page, blocks);
                blocks.push(Block::ListItem(ListItem {
                    level,
                    ordered,
                    spans: vec![line_span(line)],
                    anchor: Some(anchor_for(page, line)),
                }));
            }
            BlockKind::Paragraph => paragraph_run.push(line),
        }
        index += 1;
    }
    flush_paragraph(&mut paragraph_run, page, blocks);
}

/// Longest prefix of `lines` forming multi-column baselines.
/// Each returned row is the cell texts of one baseline.
fn table_run<'a>(lines: &[&'a PdfLine]) -> Vec<Vec<String>> {
    let mut rows: Vec<Vec<String>> = Vec::new();
    for line in lines {
        let cells = split_columns(&line.text);
        if cells.len() < 2 {
            break;
        }
        rows.push(cells);
    }
    rows
}

/// Splits a merged baseline into column cells on wide gaps. Fragments on
/// one baseline were joined with single spaces at extraction; columns in
/// real tables arrive as separate fragments far apart in x, which the
/// extractor preserves as multiple spaces only when the source had them.
/// The practical signal that survives is runs of 2+ spaces or tabs.
fn split_columns(text: &str) -> Vec<String> {
    let mut cells: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut space_run = 0usize;
    for ch in text.chars() {
        if ch == '\t' {
            space_run += 2;
            continue;
        }
        if ch == ' ' {
            space_run += 1;
            continue;
        }
        if space_run >= 2 && !current.is_empty() {
            cells.push(std::mem::take(&mut current));
        } else if space_run >= 1 && !current.is_empty() {
            current.push(' ');
        }
        space_run = 0;
        current.push(ch);
    }
    if !current.is_empty() {
        cells.push(current);
    }
    cells
}

fn flush_paragraph(run: &mut Vec<&PdfLine>, page: &PdfPage, blocks: &mut Vec<Block>) {
    if run.is_empty() {
        return;
    }
    let anchor = anchor_for(page, run[0]);
    let text = run
        .iter()
        .map(|l| l.text.trim())
        .collect::<Vec<_>>()
        .join(" ");
    blocks.push(Block::Paragraph(Paragraph {
        spans: vec![Span::plain(text)],
        anchor: Some(anchor),
        alignment: None,
        line_spacing: None,
    }));
    run.clear();
}

fn line_span(line: &PdfLine) -> Span {
    let mut span = Span::plain(line.text.trim());
    span.font_size = line.font_size;
    span
}

fn anchor_for(page: &PdfPage, line: &PdfLine) -> Anchor {
    // Normalize to top-left origin for the IR.
    Anchor::new(
        page.number,
        (line.x / page.width).clamp(0.0, 1.0),
        (1.0 - line.y / page.height).clamp(0.0, 1.0),
    )
}

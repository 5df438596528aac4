//! DOCX parser producing the layout-aware IR.
//!
//! Manual ZIP + XML parsing. A DOCX file is a ZIP archive:
//!
//! - `word/document.xml`: body content (paragraphs, tables, drawings)
//! - `word/_rels/document.xml.rels`: hyperlink and image targets
//! - `word/header*.xml` / `word/footer*.xml`: recurring furniture
//! - `word/media/*`: embedded image bytes
//! - `docProps/core.xml`: title/author/dates
//!
//! Structural classification runs on every paragraph: the style name is
//! the strongest signal, numbering hints and lexical heuristics cover
//! documents written without styles.

use std::collections::HashMap;
use std::io::{Cursor, Read};

use log::warn;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::ZipArchive;

use tarjoman_core::classify::{classify, group_into_sections, BlockKind, ClassifierConfig, ClassifyInput};
use tarjoman_core::document::{
    Alignment, Block, Cell, CellBlock, Document, DocumentMeta, Figure, Footer, Header, Heading,
    ListItem, PageRange, Paragraph, ParseResult, ParseStats, Row, Section, Span, Table,
};
use tarjoman_core::error::{Result, TarjomanError};
use tarjoman_core::lang::detect_language;

use crate::traits::{ParserOptions, StructuredParser};

const TWIPS_PER_INCH: f64 = 1440.0;

/// DOCX parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxParser {
    options: ParserOptions,
}

impl DocxParser {
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

impl StructuredParser for DocxParser {
    fn parse(&self, bytes: &[u8]) -> Result<ParseResult> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| TarjomanError::UnsupportedFormat(format!("not a DOCX archive: {e}")))?;

        let rels = read_entry(&mut archive, "word/_rels/document.xml.rels")
            .map(|xml| parse_rels(&xml))
            .unwrap_or_default();
        let document_xml = read_entry(&mut archive, "word/document.xml").ok_or_else(|| {
            TarjomanError::ExtractionFailed("word/document.xml missing".to_string())
        })?;

        let config = ClassifierConfig::default();
        let mut body = parse_body(&document_xml, &rels, &config);
        let mut stats = ParseStats::default();
        resolve_images(
            &mut archive,
            &rels,
            &mut body.blocks,
            self.options.extract_images,
            &mut stats,
        );

        let header_blocks = furniture_blocks(&mut archive, "word/header", &config);
        let footer_blocks = furniture_blocks(&mut archive, "word/footer", &config);

        let mut meta = read_entry(&mut archive, "docProps/core.xml")
            .map(|xml| parse_core_props(&xml))
            .unwrap_or_default();
        meta.page_width = body.page_width;
        meta.page_height = body.page_height;

        count_blocks(&body.blocks, &mut stats);

        let mut sections = group_into_sections(body.blocks);
        for section in &mut sections {
            section.page_width = body.page_width;
            section.page_height = body.page_height;
        }
        if !header_blocks.is_empty() {
            stats.headers = 1;
            if let Some(first) = sections.first_mut() {
                first.header = Some(Header {
                    blocks: header_blocks,
                    page_range: PageRange::All,
                });
            }
        }
        if !footer_blocks.is_empty() {
            stats.footers = 1;
            if let Some(first) = sections.first_mut() {
                first.footer = Some(Footer {
                    blocks: footer_blocks,
                    page_range: PageRange::All,
                });
            }
        }
        stats.sections = sections.len();

        let mut document = Document::new(meta, sections);
        stats.word_count = document.word_count();
        document.meta.word_count = stats.word_count;
        let lang = detect_language(&document).code().to_string();

        Ok(ParseResult {
            document,
            lang,
            stats,
        })
    }
}

fn read_entry(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> Option<String> {
    let mut file = archive.by_name(name).ok()?;
    let mut content = String::new();
    file.read_to_string(&mut content).ok()?;
    Some(content)
}

fn read_entry_bytes(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> Option<Vec<u8>> {
    let mut file = archive.by_name(name).ok()?;
    let mut content = Vec::new();
    file.read_to_end(&mut content).ok()?;
    Some(content)
}

/// Relationship Id -> Target map from a `.rels` part.
fn parse_rels(xml: &str) -> HashMap<String, String> {
    let mut rels = HashMap::new();
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e) | Event::Empty(e)) => {
                if e.local_name().as_ref() == b"Relationship" {
                    let id = get_attr(&e, b"Id");
                    let target = get_attr(&e, b"Target");
                    if let (Some(id), Some(target)) = (id, target) {
                        rels.insert(id, target);
                    }
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    rels
}

fn parse_core_props(xml: &str) -> DocumentMeta {
    let mut meta = DocumentMeta::default();
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut current: Option<&'static str> = None;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                current = match e.name().as_ref() {
                    b"dc:title" => Some("title"),
                    b"dc:creator" => Some("author"),
                    b"dcterms:created" => Some("created"),
                    b"dcterms:modified" => Some("modified"),
                    _ => None,
                };
            }
            Ok(Event::Text(t)) => {
                if let Some(field) = current {
                    let value = t.unescape().unwrap_or_default().trim().to_string();
                    if value.is_empty() {
                        continue;
                    }
                    match field {
                        "title" => meta.title = Some(value),
                        "author" => meta.author = Some(value),
                        "created" => meta.created = Some(value),
                        _ => meta.modified = Some(value),
                    }
                }
            }
            Ok(Event::End(_)) => current = None,
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    meta
}

#[inline]
fn get_attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .find(|a| a.as_ref().ok().map(|x| x.key.as_ref()) == Some(key))
        .and_then(std::result::Result::ok)
        .map(|attr| String::from_utf8_lossy(&attr.value).to_string())
}

/// True when `w:val` turns a toggle property off.
#[inline]
fn val_off(e: &BytesStart) -> bool {
    get_attr(e, b"w:val").is_some_and(|v| v == "0" || v == "false" || v == "none")
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum VMerge {
    #[default]
    None,
    Restart,
    Continue,
}

#[derive(Default)]
struct BodyParse {
    blocks: Vec<Block>,
    page_width: f64,
    page_height: f64,
}

#[derive(Default)]
struct WalkState {
    // paragraph
    spans: Vec<Span>,
    style: Option<String>,
    numbering: bool,
    ilvl: usize,
    alignment: Option<Alignment>,
    in_ppr: bool,
    // run
    run: Option<Span>,
    in_rpr: bool,
    href: Option<String>,
    // table
    table_depth: usize,
    rows: Vec<Row>,
    row_merges: Vec<Vec<VMerge>>,
    cells: Vec<Cell>,
    cell_merges: Vec<VMerge>,
    cell_blocks: Vec<CellBlock>,
    cell_colspan: u32,
    cell_vmerge: VMerge,
    in_tcpr: bool,
}

/// Parses the WordprocessingML body into reading-order blocks.
fn parse_body(xml: &str, rels: &HashMap<String, String>, config: &ClassifierConfig) -> BodyParse {
    let mut out = BodyParse {
        blocks: Vec::new(),
        page_width: tarjoman_core::document::DEFAULT_PAGE_WIDTH,
        page_height: tarjoman_core::document::DEFAULT_PAGE_HEIGHT,
    };
    let mut state = WalkState::default();
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"w:p" => {
                    state.spans.clear();
                    state.style = None;
                    state.numbering = false;
                    state.ilvl = 0;
                    state.alignment = None;
                }
                b"w:pPr" => state.in_ppr = true,
                b"w:rPr" => state.in_rpr = true,
                b"w:r" => state.run = Some(Span::default()),
                b"w:hyperlink" => {
                    state.href = get_attr(&e, b"r:id").and_then(|id| rels.get(&id).cloned());
                }
                b"w:tbl" => {
                    state.table_depth += 1;
                    state.rows.clear();
                    state.row_merges.clear();
                }
                b"w:tr" => {
                    state.cells.clear();
                    state.cell_merges.clear();
                }
                b"w:tc" => {
                    state.cell_blocks.clear();
                    state.cell_colspan = 1;
                    state.cell_vmerge = VMerge::None;
                }
                b"w:tcPr" => state.in_tcpr = true,
                _ => handle_property(&e, &mut state, &mut out),
            },
            Ok(Event::Empty(e)) => handle_property(&e, &mut state, &mut out),
            Ok(Event::Text(t)) => {
                if let Some(run) = state.run.as_mut() {
                    if let Ok(text) = t.unescape() {
                        run.text.push_str(&text);
                    }
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:pPr" => state.in_ppr = false,
                b"w:rPr" => state.in_rpr = false,
                b"w:hyperlink" => state.href = None,
                b"w:r" => {
                    if let Some(mut run) = state.run.take() {
                        if !run.text.is_empty() {
                            run.link = state.href.clone();
                            state.spans.push(run);
                        }
                    }
                }
                b"w:p" => finish_paragraph(&mut state, config, &mut out),
                b"w:tc" => {
                    state.cells.push(Cell {
                        blocks: std::mem::take(&mut state.cell_blocks),
                        colspan: state.cell_colspan,
                        rowspan: 1,
                        direction: None,
                    });
                    state.cell_merges.push(state.cell_vmerge);
                }
                b"w:tr" => {
                    state.rows.push(Row {
                        cells: std::mem::take(&mut state.cells),
                    });
                    state.row_merges.push(std::mem::take(&mut state.cell_merges));
                }
                b"w:tbl" => {
                    state.table_depth = state.table_depth.saturating_sub(1);
                    let mut table = Table {
                        rows: std::mem::take(&mut state.rows),
                        anchor: None,
                    };
                    apply_vertical_merges(&mut table, &std::mem::take(&mut state.row_merges));
                    out.blocks.push(Block::Table(table));
                }
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    out
}

/// Property and leaf elements (usually self-closing).
fn handle_property(e: &BytesStart, state: &mut WalkState, out: &mut BodyParse) {
    match e.name().as_ref() {
        b"w:pStyle" if state.in_ppr => state.style = get_attr(e, b"w:val"),
        b"w:numPr" if state.in_ppr => state.numbering = true,
        b"w:ilvl" if state.in_ppr => {
            state.ilvl = get_attr(e, b"w:val")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0);
        }
        b"w:jc" if state.in_ppr => {
            state.alignment = get_attr(e, b"w:val").and_then(|v| match v.as_str() {
                "left" | "start" => Some(Alignment::Left),
                "right" | "end" => Some(Alignment::Right),
                "center" => Some(Alignment::Center),
                "both" | "distribute" => Some(Alignment::Justify),
                _ => None,
            });
        }
        b"w:b" if state.in_rpr => {
            if let Some(run) = state.run.as_mut() {
                run.bold = Some(!val_off(e));
            }
        }
        b"w:i" if state.in_rpr => {
            if let Some(run) = state.run.as_mut() {
                run.italic = Some(!val_off(e));
            }
        }
        b"w:u" if state.in_rpr => {
            if let Some(run) = state.run.as_mut() {
                run.underline = Some(!val_off(e));
            }
        }
        b"w:sz" if state.in_rpr => {
            if let Some(run) = state.run.as_mut() {
                // Half-points in the XML.
                run.font_size = get_attr(e, b"w:val")
                    .and_then(|v| v.parse::<f64>().ok())
                    .map(|half| half / 2.0);
            }
        }
        b"w:color" if state.in_rpr => {
            if let Some(run) = state.run.as_mut() {
                run.color = get_attr(e, b"w:val").filter(|v| v != "auto");
            }
        }
        b"w:rFonts" if state.in_rpr => {
            if let Some(run) = state.run.as_mut() {
                run.font_family = get_attr(e, b"w:ascii");
            }
        }
        b"w:gridSpan" if state.in_tcpr => {
            state.cell_colspan = get_attr(e, b"w:val")
                .and_then(|v| v.parse().ok())
                .unwrap_or(1)
                .max(1);
        }
        b"w:vMerge" if state.in_tcpr => {
            state.cell_vmerge = match get_attr(e, b"w:val").as_deref() {
                Some("restart") => VMerge::Restart,
                _ => VMerge::Continue,
            };
        }
        b"w:tab" => {
            if let Some(run) = state.run.as_mut() {
                run.text.push('\t');
            }
        }
        b"w:br" => {
            if let Some(run) = state.run.as_mut() {
                run.text.push('\n');
            }
        }
        b"w:pgSz" => {
            if let Some(w) = get_attr(e, b"w:w").and_then(|v| v.parse::<f64>().ok()) {
                out.page_width = w / TWIPS_PER_INCH;
            }
            if let Some(h) = get_attr(e, b"w:h").and_then(|v| v.parse::<f64>().ok()) {
                out.page_height = h / TWIPS_PER_INCH;
            }
        }
        b"a:blip" => {
            // Figures always land in the body block list: `CellBlock`
            // has no figure variant, so an image anchored inside a
            // table cell surfaces beside the owning table instead.
            if let Some(id) = get_attr(e, b"r:embed") {
                out.blocks.push(Block::Figure(Figure {
                    image_id: id,
                    image_bytes: None,
                    format: None,
                    caption: None,
                    anchor: None,
                    width: None,
                    height: None,
                }));
            }
        }
        _ => {}
    }
}

/// Classifies a finished paragraph and routes it to the body or the
/// current table cell.
fn finish_paragraph(state: &mut WalkState, config: &ClassifierConfig, out: &mut BodyParse) {
    let spans = std::mem::take(&mut state.spans);
    let text: String = spans.iter().map(|s| s.text.as_str()).collect();
    if text.trim().is_empty() {
        return;
    }
    let kind = classify(
        ClassifyInput {
            text: &text,
            style_name: state.style.as_deref(),
            font_size: spans.iter().filter_map(|s| s.font_size).fold(None, |m, s| {
                Some(m.map_or(s, |v: f64| v.max(s)))
            }),
            has_numbering: state.numbering,
        },
        config,
    );
    let cell_block = match kind {
        BlockKind::Heading { level } => CellBlock::Heading(Heading::new(level, spans)),
        BlockKind::ListItem { level, ordered } => {
            let level = if state.numbering { state.ilvl.min(2) } else { level };
            CellBlock::ListItem(ListItem::new(level, ordered, spans))
        }
        BlockKind::Paragraph => CellBlock::Paragraph(Paragraph {
            spans,
            anchor: None,
            alignment: state.alignment,
            line_spacing: None,
        }),
    };
    if state.table_depth > 0 {
        state.cell_blocks.push(cell_block);
    } else {
        out.blocks.push(match cell_block {
            CellBlock::Heading(h) => Block::Heading(h),
            CellBlock::Paragraph(p) => Block::Paragraph(p),
            CellBlock::ListItem(li) => Block::ListItem(li),
        });
    }
}

/// Grid column at which each cell of a row starts, counting colspans.
fn col_starts(row: &Row) -> Vec<usize> {
    let mut starts = Vec::with_capacity(row.cells.len());
    let mut col = 0usize;
    for cell in &row.cells {
        starts.push(col);
        col += cell.colspan as usize;
    }
    starts
}

/// Folds `vMerge` continuation cells into the rowspan of the cell that
/// opened the merge, dropping the continuation placeholders. Cells are
/// matched by grid column, so gridSpan offsets do not break the lookup.
fn apply_vertical_merges(table: &mut Table, merges: &[Vec<VMerge>]) {
    for row_idx in (1..table.rows.len()).rev() {
        let Some(row_merges) = merges.get(row_idx) else { continue };
        let starts = col_starts(&table.rows[row_idx]);
        for cell_idx in (0..table.rows[row_idx].cells.len()).rev() {
            if row_merges.get(cell_idx) != Some(&VMerge::Continue) {
                continue;
            }
            let col = starts[cell_idx];
            // Climb past chained continuations to the opening cell.
            let mut above = row_idx;
            while above > 0 {
                above -= 1;
                let above_starts = col_starts(&table.rows[above]);
                let Some(open_idx) = above_starts.iter().position(|&s| s == col) else {
                    continue;
                };
                if merges.get(above).and_then(|r| r.get(open_idx)) == Some(&VMerge::Continue) {
                    continue;
                }
                let span = (row_idx - above + 1) as u32;
                if let Some(open) = table.rows[above].cells.get_mut(open_idx) {
                    open.rowspan = open.rowspan.max(span);
                }
                break;
            }
            table.rows[row_idx].cells.remove(cell_idx);
        }
    }
}

/// Parses every `word/header*.xml` or `word/footer*.xml` part into
/// furniture blocks.
fn furniture_blocks(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    prefix: &str,
    config: &ClassifierConfig,
) -> Vec<CellBlock> {
    let mut names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with(prefix) && n.ends_with(".xml"))
        .map(String::from)
        .collect();
    names.sort();

    let mut blocks = Vec::new();
    for name in names {
        let Some(xml) = read_entry(archive, &name) else { continue };
        let parsed = parse_body(&xml, &HashMap::new(), config);
        for block in parsed.blocks {
            match block {
                Block::Heading(h) => blocks.push(CellBlock::Heading(h)),
                Block::Paragraph(p) => blocks.push(CellBlock::Paragraph(p)),
                Block::ListItem(li) => blocks.push(CellBlock::ListItem(li)),
                // Tables in furniture flatten to their text.
                other => {
                    let text = other.text();
                    if !text.trim().is_empty() {
                        blocks.push(CellBlock::Paragraph(Paragraph::text_block(text)));
                    }
                }
            }
        }
    }
    dedup_furniture(blocks)
}

/// Identical furniture repeated across header parts collapses to one copy.
fn dedup_furniture(blocks: Vec<CellBlock>) -> Vec<CellBlock> {
    let mut seen = Vec::new();
    let mut out = Vec::new();
    for block in blocks {
        let text = block.text();
        if seen.contains(&text) {
            continue;
        }
        seen.push(text);
        out.push(block);
    }
    out
}

/// Loads image bytes for figure placeholders; unresolvable figures are
/// dropped and counted.
fn resolve_images(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    rels: &HashMap<String, String>,
    blocks: &mut Vec<Block>,
    extract_images: bool,
    stats: &mut ParseStats,
) {
    let mut index = 0;
    while index < blocks.len() {
        let Block::Figure(figure) = &mut blocks[index] else {
            index += 1;
            continue;
        };
        if !extract_images {
            blocks.remove(index);
            continue;
        }
        let target = rels.get(&figure.image_id).cloned();
        let loaded = target.as_ref().and_then(|t| {
            let path = format!("word/{}", t.trim_start_matches('/'));
            read_entry_bytes(archive, &path)
        });
        match loaded {
            Some(bytes) => {
                figure.format = target
                    .as_deref()
                    .and_then(|t| t.rsplit('.').next())
                    .map(str::to_ascii_lowercase);
                figure.image_bytes = Some(bytes);
                index += 1;
            }
            None => {
                warn!("skipping unresolvable image {}", figure.image_id);
                stats.skipped_assets += 1;
                blocks.remove(index);
            }
        }
    }
}

fn count_blocks(blocks: &[Block], stats: &mut ParseStats) {
    for block in blocks {
        match block {
            Block::Paragraph(_) | Block::Heading(_) | Block::ListItem(_) => stats.paragraphs += 1,
            Block::Table(_) => stats.tables += 1,
            Block::Figure(_) => stats.figures += 1,
            Block::Textbox(_) => stats.paragraphs += 1,
        }
    }
}

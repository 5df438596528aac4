//! The run functions: one call from source to persisted output.
//!
//! `run_url` and `run_file` share the same tail: translate with
//! unconditional degrade, render the requested format, persist into a
//! fresh job directory. The terminal format is the exception: it returns
//! the rendered text and touches no filesystem at all.

use std::path::{Path, PathBuf};

use log::{info, warn};

use tarjoman_backend::{article, html::text_to_flat_ir, DocxParser, PdfParser, StructuredParser};
use tarjoman_core::document::{
    Block, Cell, CellBlock, Document, DocumentMeta, Figure, GlossaryEntry, Heading, ListItem,
    Paragraph, Row, Section, Span, Table,
};
use tarjoman_core::error::{Result, TarjomanError};
use tarjoman_core::legacy::{FlatBlock, FlatIr, FlatKind, InlineSpan};
use tarjoman_render::{
    document_to_html, flat_ir_to_html, render_plain, render_plain_flat, write_docx, Layout,
    PdfEngine,
};
use tarjoman_translate::{
    translate_document, translate_flat, DispatchOptions, OpenAiBackend, TranslationBackend,
    TranslationError,
};

use crate::ingest::{self, SourceKind};
use crate::job::{JobDir, Manifest};
use crate::settings::Settings;

/// Requested output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutFormat {
    /// Plain text returned to the caller; nothing persisted.
    #[default]
    Terminal,
    Docx,
    Pdf,
    Html,
}

impl OutFormat {
    /// Parses a format name. Unknown names fall back to HTML, the one
    /// format every source shape can render.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "terminal" | "text" | "txt" => Self::Terminal,
            "docx" => Self::Docx,
            "pdf" => Self::Pdf,
            "html" => Self::Html,
            other => {
                warn!("unknown output format {other:?}; defaulting to html");
                Self::Html
            }
        }
    }

    /// Canonical name, as recorded in the manifest.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Terminal => "terminal",
            Self::Docx => "docx",
            Self::Pdf => "pdf",
            Self::Html => "html",
        }
    }

    fn output_file(self) -> &'static str {
        match self {
            Self::Terminal => "output.txt",
            Self::Docx => "output.docx",
            Self::Pdf => "output.pdf",
            Self::Html => "output.html",
        }
    }
}

/// Per-run options layered over [`Settings`].
pub struct RunOptions {
    pub out: OutFormat,
    /// Base directory for job directories; current directory when unset.
    pub dest: Option<PathBuf>,
    /// Model override for this run.
    pub model: Option<String>,
    pub glossary: Vec<GlossaryEntry>,
    /// Page layout for bilingual DOCX output.
    pub layout: Layout,
    /// PDF render capability; PDF output without one is `RenderFailed`.
    pub pdf_engine: Option<Box<dyn PdfEngine>>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            out: OutFormat::Terminal,
            dest: None,
            model: None,
            glossary: Vec::new(),
            layout: Layout::Sequential,
            pdf_engine: None,
        }
    }
}

/// What a run produced.
#[derive(Debug)]
pub struct RunOutcome {
    /// Rendered text, terminal format only.
    pub text: Option<String>,
    /// Manifest of the persisted output, file formats only.
    pub manifest: Option<Manifest>,
    /// Job directory path, file formats only.
    pub job_dir: Option<PathBuf>,
}

/// Fetches a page, extracts the readable article and runs the pipeline.
pub fn run_url(url: &str, settings: &Settings, options: &RunOptions) -> Result<RunOutcome> {
    let backend = make_backend(settings, options);
    run_url_with_backend(url, settings, options, backend.as_ref())
}

/// [`run_url`] with an injected translation backend.
pub fn run_url_with_backend(
    url: &str,
    settings: &Settings,
    options: &RunOptions,
    backend: &dyn TranslationBackend,
) -> Result<RunOutcome> {
    let html = ingest::fetch_url(url, settings.translate_timeout)?;
    let ir = article::extract(&html);
    finish_flat(url, &ir, settings, options, backend)
}

/// Reads a local file, routes it by extension and runs the pipeline.
pub fn run_file(path: &Path, settings: &Settings, options: &RunOptions) -> Result<RunOutcome> {
    let backend = make_backend(settings, options);
    run_file_with_backend(path, settings, options, backend.as_ref())
}

/// [`run_file`] with an injected translation backend.
pub fn run_file_with_backend(
    path: &Path,
    settings: &Settings,
    options: &RunOptions,
    backend: &dyn TranslationBackend,
) -> Result<RunOutcome> {
    let bytes = ingest::read_file(path)?;
    let source = path.display().to_string();
    match ingest::sniff_type(path) {
        SourceKind::Html => {
            let ir = article::extract(&String::from_utf8_lossy(&bytes));
            finish_flat(&source, &ir, settings, options, backend)
        }
        SourceKind::Txt => {
            let ir = text_to_flat_ir(&String::from_utf8_lossy(&bytes));
            finish_flat(&source, &ir, settings, options, backend)
        }
        SourceKind::Docx => {
            let parsed = DocxParser::new().parse(&bytes)?;
            finish_document(&source, &parsed.document, settings, options, backend)
        }
        SourceKind::Pdf => {
            let parsed = PdfParser::new().parse(&bytes)?;
            finish_document(&source, &parsed.document, settings, options, backend)
        }
        SourceKind::Bin => Err(TarjomanError::InvalidRequest(format!(
            "unsupported file type: {source}"
        ))),
    }
}

/// Picks the live backend when a credential is configured, otherwise a
/// stub whose every call fails so translation degrades uniformly.
fn make_backend(settings: &Settings, options: &RunOptions) -> Box<dyn TranslationBackend> {
    let model = options.model.as_deref().unwrap_or(&settings.model);
    match settings.api_key.as_deref() {
        Some(key) => match OpenAiBackend::new(key, model, settings.translate_timeout) {
            Ok(backend) => Box::new(backend),
            Err(e) => {
                warn!("translation backend unavailable: {e}");
                Box::new(UnavailableBackend)
            }
        },
        None => {
            info!("no API key configured; translation will degrade");
            Box::new(UnavailableBackend)
        }
    }
}

struct UnavailableBackend;

impl TranslationBackend for UnavailableBackend {
    fn translate(&self, _: &str, _: &str) -> std::result::Result<String, TranslationError> {
        Err(TranslationError::MissingCredential)
    }
}

fn dispatch_options(settings: &Settings) -> DispatchOptions {
    DispatchOptions {
        target: settings.target_lang,
        max_chunk_tokens: settings.max_chunk_tokens,
    }
}

fn finish_flat(
    source: &str,
    ir: &FlatIr,
    settings: &Settings,
    options: &RunOptions,
    backend: &dyn TranslationBackend,
) -> Result<RunOutcome> {
    let translated = translate_flat(ir, &options.glossary, backend, &dispatch_options(settings));
    if options.out == OutFormat::Terminal {
        return Ok(terminal_outcome(render_plain_flat(&translated)));
    }
    let bytes = match options.out {
        OutFormat::Html => flat_ir_to_html(&translated).into_bytes(),
        OutFormat::Pdf => render_pdf(&flat_ir_to_html(&translated), options)?,
        OutFormat::Docx => write_docx(
            &flat_to_document(&translated),
            Some(&flat_to_document(ir)),
            options.layout,
        )?,
        OutFormat::Terminal => unreachable!("handled above"),
    };
    persist(source, serde_json::to_value(&translated)?, &bytes, settings, options)
}

fn finish_document(
    source: &str,
    document: &Document,
    settings: &Settings,
    options: &RunOptions,
    backend: &dyn TranslationBackend,
) -> Result<RunOutcome> {
    let translated = translate_document(
        document,
        &options.glossary,
        backend,
        &dispatch_options(settings),
    );
    if options.out == OutFormat::Terminal {
        return Ok(terminal_outcome(render_plain(&translated)));
    }
    let bytes = match options.out {
        OutFormat::Html => document_to_html(&translated).into_bytes(),
        OutFormat::Pdf => render_pdf(&document_to_html(&translated), options)?,
        OutFormat::Docx => write_docx(&translated, Some(document), options.layout)?,
        OutFormat::Terminal => unreachable!("handled above"),
    };
    persist(source, serde_json::to_value(&translated)?, &bytes, settings, options)
}

fn terminal_outcome(text: String) -> RunOutcome {
    RunOutcome {
        text: Some(text),
        manifest: None,
        job_dir: None,
    }
}

fn render_pdf(html: &str, options: &RunOptions) -> Result<Vec<u8>> {
    match options.pdf_engine.as_deref() {
        Some(engine) => engine.render(html),
        None => Err(TarjomanError::RenderFailed(
            "PDF output requires a PDF engine".to_string(),
        )),
    }
}

fn persist(
    source: &str,
    ir: serde_json::Value,
    output: &[u8],
    settings: &Settings,
    options: &RunOptions,
) -> Result<RunOutcome> {
    let base = options.dest.clone().unwrap_or_else(|| PathBuf::from("."));
    let job = JobDir::create(&base)?;
    job.save_intermediate("ir.json", &ir)?;
    let dest = job.file(options.out.output_file());
    std::fs::write(&dest, output)?;
    let model = options.model.as_deref().unwrap_or(&settings.model);
    let manifest = Manifest::new(source, options.out.name(), model, &dest);
    job.save_intermediate("manifest.json", &manifest)?;
    info!("wrote {} ({} bytes)", dest.display(), output.len());
    Ok(RunOutcome {
        text: None,
        manifest: Some(manifest),
        job_dir: Some(job.path().to_path_buf()),
    })
}

/// Lifts a flat IR into the layout-aware shape so the DOCX writer can
/// consume web and text sources too. Lossy where the shapes differ:
/// code formatting becomes monospace runs, block quotes flatten to
/// paragraphs, figures keep their id but carry no bytes.
fn flat_to_document(ir: &FlatIr) -> Document {
    let mut blocks = Vec::new();
    for block in &ir.blocks {
        lift_flat_block(block, 0, &mut blocks);
    }
    Document::new(
        DocumentMeta::default(),
        vec![Section::with_blocks(0, blocks)],
    )
}

fn lift_flat_block(block: &FlatBlock, list_depth: usize, out: &mut Vec<Block>) {
    match block.kind {
        FlatKind::Heading => out.push(Block::Heading(Heading::new(
            block.level.max(1),
            lift_spans(&block.spans),
        ))),
        FlatKind::Paragraph | FlatKind::Blockquote => {
            if !block.spans.is_empty() {
                out.push(Block::Paragraph(Paragraph::new(lift_spans(&block.spans))));
            }
            for child in &block.children {
                lift_flat_block(child, list_depth, out);
            }
        }
        FlatKind::List => {
            let ordered = block.is_ordered();
            for child in &block.children {
                if child.kind == FlatKind::ListItem {
                    out.push(Block::ListItem(ListItem::new(
                        list_depth,
                        ordered,
                        lift_spans(&child.spans),
                    )));
                    for grandchild in &child.children {
                        lift_flat_block(grandchild, list_depth + 1, out);
                    }
                } else {
                    lift_flat_block(child, list_depth, out);
                }
            }
        }
        FlatKind::ListItem => out.push(Block::ListItem(ListItem::new(
            list_depth,
            false,
            lift_spans(&block.spans),
        ))),
        FlatKind::Codeblock => {
            let mut span = Span::plain(block.text());
            span.font_family = Some("Courier New".to_string());
            out.push(Block::Paragraph(Paragraph::new(vec![span])));
        }
        FlatKind::Table => out.push(Block::Table(lift_table(block))),
        FlatKind::Figure => {
            let image_id = block
                .attrs
                .get("src")
                .and_then(serde_json::Value::as_str)
                .unwrap_or(&block.id)
                .to_string();
            let caption = block
                .attrs
                .get("alt")
                .and_then(serde_json::Value::as_str)
                .filter(|alt| !alt.is_empty())
                .map(Paragraph::text_block);
            out.push(Block::Figure(Figure {
                image_id,
                image_bytes: None,
                format: None,
                caption,
                anchor: None,
                width: None,
                height: None,
            }));
        }
        // Rows and cells only appear under a table; a break has no
        // layout-aware counterpart.
        FlatKind::TableRow | FlatKind::TableCell | FlatKind::Hr => {}
    }
}

fn lift_table(block: &FlatBlock) -> Table {
    let mut rows = Vec::new();
    for row in &block.children {
        if row.kind != FlatKind::TableRow {
            continue;
        }
        let cells = row
            .children
            .iter()
            .filter(|c| c.kind == FlatKind::TableCell)
            .map(|c| Cell {
                blocks: vec![CellBlock::Paragraph(Paragraph::new(lift_spans(&c.spans)))],
                colspan: 1,
                rowspan: 1,
                direction: None,
            })
            .collect();
        rows.push(Row { cells });
    }
    Table { rows, anchor: None }
}

fn lift_spans(spans: &[InlineSpan]) -> Vec<Span> {
    spans
        .iter()
        .map(|s| {
            let mut span = Span::plain(s.text.clone());
            if s.bold {
                span.bold = Some(true);
            }
            if s.italic {
                span.italic = Some(true);
            }
            if s.code {
                span.font_family = Some("Courier New".to_string());
            }
            span.link = s.href.clone();
            span
        })
        .collect()
}

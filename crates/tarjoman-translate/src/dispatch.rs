//! Per-block translation dispatch over both IR shapes.
//!
//! The walk is `Document -> Document` and `FlatIr -> FlatIr`, pure apart
//! from the backend calls. Per textual block: encode spans to tagged
//! text, chunk under the token budget, translate each chunk, join with
//! single spaces, decode back to spans. Tables, textboxes and list
//! children recurse; code blocks and figures pass through untouched.
//!
//! Failure policy: the first backend error abandons the partial result
//! and yields the placeholder document with the original content intact.
//! A partially translated document would be worse than an honest notice.

use log::{info, warn};

use tarjoman_core::chunk::{split_paragraph, TokenEstimate};
use tarjoman_core::document::{
    Block, CellBlock, Document, GlossaryEntry, Heading, Paragraph, Span,
};
use tarjoman_core::lang::{detect_flat, detect_language, Lang};
use tarjoman_core::legacy::{FlatBlock, FlatIr, FlatKind, InlineSpan};
use tarjoman_core::tagged;

use crate::capability::TranslationBackend;
use crate::error::TranslationError;
use crate::prompts::build_instructions;

/// Heading shown when translation degrades.
pub const PLACEHOLDER_HEADING: &str = "Translation Not Available";
/// Notice paragraph shown under the placeholder heading.
pub const PLACEHOLDER_NOTICE: &str =
    "The translation service could not complete this request. The original document is shown below.";

/// Dispatch tuning.
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    /// Target language.
    pub target: Lang,
    /// Token budget per translation request, prompt overhead included.
    pub max_chunk_tokens: usize,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            target: Lang::Fa,
            max_chunk_tokens: 3000,
        }
    }
}

struct Ctx<'a> {
    backend: &'a dyn TranslationBackend,
    instructions: String,
    budget: usize,
    overhead: usize,
}

impl Ctx<'_> {
    fn translate_text(&self, encoded: &str) -> Result<String, TranslationError> {
        let chunks = split_paragraph(encoded, self.budget, self.overhead);
        let mut parts = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            parts.push(self.backend.translate(&self.instructions, &chunk)?);
        }
        Ok(parts.join(" "))
    }

    fn translate_spans(&self, spans: &[Span]) -> Result<Vec<Span>, TranslationError> {
        let encoded = tagged::encode_spans(spans);
        if encoded.trim().is_empty() {
            return Ok(spans.to_vec());
        }
        Ok(tagged::decode_spans(&self.translate_text(&encoded)?))
    }

    fn translate_inline(&self, spans: &[InlineSpan]) -> Result<Vec<InlineSpan>, TranslationError> {
        let encoded = tagged::encode(spans);
        if encoded.trim().is_empty() {
            return Ok(spans.to_vec());
        }
        Ok(tagged::decode(&self.translate_text(&encoded)?))
    }
}

/// Translates a layout-aware document into the target language.
///
/// Identity when the detected source language already matches the
/// target. Never errors: backend failures produce the placeholder
/// document with the original content preserved.
#[must_use]
pub fn translate_document(
    document: &Document,
    glossary: &[GlossaryEntry],
    backend: &dyn TranslationBackend,
    options: &DispatchOptions,
) -> Document {
    let source = detect_language(document);
    if source == options.target {
        info!("source already {}; skipping translation", source.code());
        return document.clone();
    }
    let ctx = make_ctx(backend, glossary, options);
    match try_translate_document(document, &ctx) {
        Ok(translated) => translated,
        Err(e) => {
            warn!("translation degraded to placeholder: {e}");
            placeholder_document(document)
        }
    }
}

/// Translates a flat IR document; same policy as [`translate_document`].
#[must_use]
pub fn translate_flat(
    ir: &FlatIr,
    glossary: &[GlossaryEntry],
    backend: &dyn TranslationBackend,
    options: &DispatchOptions,
) -> FlatIr {
    let source = detect_flat(ir);
    if source == options.target {
        info!("source already {}; skipping translation", source.code());
        return ir.clone();
    }
    let ctx = make_ctx(backend, glossary, options);
    match try_translate_flat(ir, &ctx) {
        Ok(mut translated) => {
            translated.set_lang(options.target.code());
            translated.set_dir(if options.target.is_rtl() { "rtl" } else { "ltr" });
            translated
        }
        Err(e) => {
            warn!("translation degraded to placeholder: {e}");
            placeholder_flat(ir)
        }
    }
}

fn make_ctx<'a>(
    backend: &'a dyn TranslationBackend,
    glossary: &[GlossaryEntry],
    options: &DispatchOptions,
) -> Ctx<'a> {
    let instructions = build_instructions(options.target, glossary);
    let overhead = TokenEstimate::count(&instructions);
    Ctx {
        backend,
        instructions,
        budget: options.max_chunk_tokens,
        overhead,
    }
}

fn try_translate_document(document: &Document, ctx: &Ctx<'_>) -> Result<Document, TranslationError> {
    let mut out = document.clone();
    for section in &mut out.sections {
        for block in &mut section.blocks {
            translate_block(block, ctx)?;
        }
        if let Some(header) = section.header.as_mut() {
            for block in &mut header.blocks {
                translate_cell_block(block, ctx)?;
            }
        }
        if let Some(footer) = section.footer.as_mut() {
            for block in &mut footer.blocks {
                translate_cell_block(block, ctx)?;
            }
        }
    }
    Ok(out)
}

fn translate_block(block: &mut Block, ctx: &Ctx<'_>) -> Result<(), TranslationError> {
    match block {
        Block::Heading(h) => h.spans = ctx.translate_spans(&h.spans)?,
        Block::Paragraph(p) => p.spans = ctx.translate_spans(&p.spans)?,
        Block::ListItem(li) => li.spans = ctx.translate_spans(&li.spans)?,
        Block::Table(table) => {
            for row in &mut table.rows {
                for cell in &mut row.cells {
                    for cell_block in &mut cell.blocks {
                        translate_cell_block(cell_block, ctx)?;
                    }
                }
            }
        }
        Block::Textbox(tb) => {
            for cell_block in &mut tb.blocks {
                translate_cell_block(cell_block, ctx)?;
            }
        }
        // Figures (captions included) pass through untouched.
        Block::Figure(_) => {}
    }
    Ok(())
}

fn translate_cell_block(block: &mut CellBlock, ctx: &Ctx<'_>) -> Result<(), TranslationError> {
    match block {
        CellBlock::Heading(h) => h.spans = ctx.translate_spans(&h.spans)?,
        CellBlock::Paragraph(p) => p.spans = ctx.translate_spans(&p.spans)?,
        CellBlock::ListItem(li) => li.spans = ctx.translate_spans(&li.spans)?,
    }
    Ok(())
}

fn try_translate_flat(ir: &FlatIr, ctx: &Ctx<'_>) -> Result<FlatIr, TranslationError> {
    let mut out = ir.clone();
    for block in &mut out.blocks {
        translate_flat_block(block, ctx)?;
    }
    Ok(out)
}

fn translate_flat_block(block: &mut FlatBlock, ctx: &Ctx<'_>) -> Result<(), TranslationError> {
    if block.kind != FlatKind::Codeblock && !block.spans.is_empty() {
        block.spans = ctx.translate_inline(&block.spans)?;
    }
    for child in &mut block.children {
        translate_flat_block(child, ctx)?;
    }
    Ok(())
}

/// The degraded result: placeholder notice on top, original untouched.
#[must_use]
pub fn placeholder_document(document: &Document) -> Document {
    let mut out = document.clone();
    let notice = [
        Block::Heading(Heading::new(1, vec![Span::plain(PLACEHOLDER_HEADING)])),
        Block::Paragraph(Paragraph::text_block(PLACEHOLDER_NOTICE)),
    ];
    if let Some(first) = out.sections.first_mut() {
        first.blocks.splice(0..0, notice);
    }
    out
}

/// Flat-IR variant of [`placeholder_document`].
#[must_use]
pub fn placeholder_flat(ir: &FlatIr) -> FlatIr {
    let mut out = ir.clone();
    out.blocks.insert(
        0,
        FlatBlock::paragraph(vec![InlineSpan::plain(PLACEHOLDER_NOTICE)]),
    );
    out.blocks.insert(0, FlatBlock::heading(1, PLACEHOLDER_HEADING));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use tarjoman_core::document::{DocumentMeta, Section};

    /// Applies a text function to every request, counting calls.
    struct FnBackend<F: Fn(&str) -> String> {
        f: F,
        calls: RefCell<usize>,
    }

    impl<F: Fn(&str) -> String> FnBackend<F> {
        fn new(f: F) -> Self {
            Self {
                f,
                calls: RefCell::new(0),
            }
        }
    }

    impl<F: Fn(&str) -> String> TranslationBackend for FnBackend<F> {
        fn translate(&self, _instructions: &str, text: &str) -> Result<String, TranslationError> {
            *self.calls.borrow_mut() += 1;
            Ok((self.f)(text))
        }
    }

    struct FailingBackend;

    impl TranslationBackend for FailingBackend {
        fn translate(&self, _: &str, _: &str) -> Result<String, TranslationError> {
            Err(TranslationError::Timeout)
        }
    }

    struct PanickingBackend;

    impl TranslationBackend for PanickingBackend {
        fn translate(&self, _: &str, _: &str) -> Result<String, TranslationError> {
            panic!("backend must not be called");
        }
    }

    fn english_doc() -> Document {
        Document::new(
            DocumentMeta::default(),
            vec![Section::with_blocks(
                0,
                vec![
                    Block::Heading(Heading::new(1, vec![Span::plain("Overview")])),
                    Block::Paragraph(Paragraph::text_block(
                        "The quick brown fox jumps over the lazy dog.",
                    )),
                ],
            )],
        )
    }

    #[test]
    fn test_degrade_produces_placeholder_with_original_intact() {
        let doc = english_doc();
        let out = translate_document(&doc, &[], &FailingBackend, &DispatchOptions::default());
        let Block::Heading(h) = &out.sections[0].blocks[0] else {
            panic!("expected placeholder heading");
        };
        assert_eq!(h.level, 1);
        assert_eq!(h.text(), PLACEHOLDER_HEADING);
        assert!(out.plain_text().contains("quick brown fox"));
        assert!(out.plain_text().contains(PLACEHOLDER_NOTICE));
    }

    #[test]
    fn test_same_language_is_identity_without_backend_calls() {
        let doc = Document::new(
            DocumentMeta::default(),
            vec![Section::with_blocks(
                0,
                vec![Block::Paragraph(Paragraph::text_block(
                    "این متن از قبل فارسی است و نیازی به ترجمه ندارد",
                ))],
            )],
        );
        let out = translate_document(&doc, &[], &PanickingBackend, &DispatchOptions::default());
        assert_eq!(out, doc);
    }

    #[test]
    fn test_structure_and_formatting_survive_translation() {
        let mut bold = Span::plain("important");
        bold.bold = Some(true);
        let doc = Document::new(
            DocumentMeta::default(),
            vec![Section::with_blocks(
                0,
                vec![Block::Paragraph(Paragraph::new(vec![
                    Span::plain("Something "),
                    bold,
                ]))],
            )],
        );
        // A tag-preserving backend is part of the contract; mimic one by
        // rewriting words only. The bold span must come back bold.
        let backend = FnBackend::new(|t: &str| t.replace("important", "wichtig"));
        let out = translate_document(&doc, &[], &backend, &DispatchOptions::default());
        let Block::Paragraph(p) = &out.sections[0].blocks[0] else {
            panic!("expected paragraph");
        };
        assert!(p.spans.iter().any(|s| s.bold == Some(true) && s.text.contains("wichtig")));
    }

    #[test]
    fn test_small_budget_splits_into_multiple_requests() {
        let long: String = (0..30)
            .map(|i| format!("Sentence number {i} talks about nothing in particular."))
            .collect::<Vec<_>>()
            .join(" ");
        let doc = Document::new(
            DocumentMeta::default(),
            vec![Section::with_blocks(
                0,
                vec![Block::Paragraph(Paragraph::text_block(long))],
            )],
        );
        let backend = FnBackend::new(|t: &str| t.to_string());
        let options = DispatchOptions {
            target: Lang::Fa,
            max_chunk_tokens: 80,
        };
        let out = translate_document(&doc, &[], &backend, &options);
        assert!(*backend.calls.borrow() > 1);
        assert!(out.plain_text().contains("Sentence number 29"));
    }

    #[test]
    fn test_flat_code_blocks_untouched() {
        let ir = FlatIr::new(vec![
            FlatBlock::paragraph(vec![InlineSpan::plain("Translate this sentence please.")]),
            FlatBlock::codeblock("fn main() {}"),
        ]);
        let backend = FnBackend::new(|t: &str| format!("XX {t}"));
        let out = translate_flat(&ir, &[], &backend, &DispatchOptions::default());
        assert!(out.blocks[0].text().starts_with("XX "));
        assert_eq!(out.blocks[1].text(), "fn main() {}");
    }

    #[test]
    fn test_flat_degrade_prepends_notice() {
        let ir = FlatIr::new(vec![FlatBlock::paragraph(vec![InlineSpan::plain(
            "Original flat content stays in place.",
        )])]);
        let out = translate_flat(&ir, &[], &FailingBackend, &DispatchOptions::default());
        assert_eq!(out.blocks[0].text(), PLACEHOLDER_HEADING);
        assert_eq!(out.blocks[1].text(), PLACEHOLDER_NOTICE);
        assert_eq!(out.blocks[2].text(), "Original flat content stays in place.");
    }

    #[test]
    fn test_flat_translation_sets_lang_and_dir() {
        let ir = FlatIr::new(vec![FlatBlock::paragraph(vec![InlineSpan::plain(
            "A sentence to translate.",
        )])]);
        let backend = FnBackend::new(|t: &str| t.to_string());
        let out = translate_flat(&ir, &[], &backend, &DispatchOptions::default());
        assert_eq!(out.lang(), Some("fa"));
        assert_eq!(
            out.attrs.get("dir").and_then(serde_json::Value::as_str),
            Some("rtl")
        );
    }

    #[test]
    fn test_table_cells_translated() {
        use tarjoman_core::document::{Cell, Row, Table};
        let table = Table {
            rows: vec![Row {
                cells: vec![Cell::text_cell("hello table")],
            }],
            anchor: None,
        };
        let doc = Document::new(
            DocumentMeta::default(),
            vec![Section::with_blocks(0, vec![Block::Table(table)])],
        );
        let backend = FnBackend::new(|t: &str| t.replace("hello", "salut"));
        let out = translate_document(&doc, &[], &backend, &DispatchOptions::default());
        let Block::Table(t) = &out.sections[0].blocks[0] else {
            panic!("expected table");
        };
        assert_eq!(t.rows[0].cells[0].blocks[0].text(), "salut table");
    }
}

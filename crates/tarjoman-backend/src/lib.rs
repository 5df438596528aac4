//! Structured parsers that turn source bytes into the tarjoman IR.
//!
//! Two target shapes, chosen by source family:
//!
//! - Web and plain-text inputs become the flat IR
//!   ([`html::html_to_flat_ir`], [`html::text_to_flat_ir`]), with
//!   [`article::extract`] peeling boilerplate off full pages first.
//! - Office and PDF inputs become the layout-aware IR v2 through the
//!   [`traits::StructuredParser`] seam ([`docx::DocxParser`],
//!   [`pdf::PdfParser`]).
//!
//! Parsers degrade rather than fail: a missing style falls back to the
//! lexical classifier, a broken image is skipped and counted, and the
//! article extractor always produces something renderable.

pub mod article;
pub mod docx;
pub mod html;
pub mod pdf;
pub mod traits;

pub use docx::DocxParser;
pub use pdf::PdfParser;
pub use traits::{ParserOptions, StructuredParser};

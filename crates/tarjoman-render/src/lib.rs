//! Render sinks for the tarjoman IR.
//!
//! - [`html`]: both IR shapes to standalone HTML with per-block
//!   direction handling
//! - [`docx`]: minimal WordprocessingML writer (sequential or
//!   side-by-side source/translation layouts)
//! - [`plain`]: terminal-friendly plain text
//! - [`traits`]: the [`traits::PdfEngine`] capability seam; no PDF
//!   engine ships in-tree
//!
//! Render failures are per-element wherever possible: a malformed image
//! is skipped with a warning, never aborting the document.

pub mod docx;
pub mod html;
pub mod plain;
pub mod traits;

pub use docx::{write_docx, Layout};
pub use html::{document_to_html, flat_ir_to_html};
pub use plain::{render_plain, render_plain_flat};
pub use traits::PdfEngine;

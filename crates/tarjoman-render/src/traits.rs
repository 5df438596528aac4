//! External render capabilities.

use tarjoman_core::error::Result;

/// HTML-to-PDF rendering capability.
///
/// No engine ships in-tree; the pipeline reports `RenderFailed` when PDF
/// output is requested and no engine was provided. Implementations wrap
/// an external collaborator (headless browser, wkhtmltopdf, a service).
pub trait PdfEngine {
    /// Renders standalone HTML to PDF bytes.
    fn render(&self, html: &str) -> Result<Vec<u8>>;
}

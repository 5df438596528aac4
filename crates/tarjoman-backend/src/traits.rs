//! Parser trait and shared options.

use tarjoman_core::document::ParseResult;
use tarjoman_core::error::Result;

/// Options shared by the structured parsers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParserOptions {
    /// Extract embedded images into `Figure` blocks.
    pub extract_images: bool,
    /// Maximum pages to process (None = all).
    pub max_pages: Option<usize>,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            extract_images: true,
            max_pages: None,
        }
    }
}

impl ParserOptions {
    /// Creates options with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets image extraction.
    #[inline]
    #[must_use]
    pub const fn with_images(mut self, extract: bool) -> Self {
        self.extract_images = extract;
        self
    }

    /// Caps the number of pages processed.
    #[inline]
    #[must_use]
    pub const fn with_max_pages(mut self, max: usize) -> Self {
        self.max_pages = Some(max);
        self
    }
}

/// A parser from raw source bytes to the layout-aware IR.
///
/// Implementations own their format entirely: container unpacking, text
/// extraction, structural classification and stats. They return
/// `ExtractionFailed`/`UnsupportedFormat` only once every internal
/// fallback is exhausted.
pub trait StructuredParser {
    /// Parses source bytes into a document plus detected language and
    /// counters.
    fn parse(&self, bytes: &[u8]) -> Result<ParseResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_builder() {
        let opts = ParserOptions::new().with_images(false).with_max_pages(3);
        assert!(!opts.extract_images);
        assert_eq!(opts.max_pages, Some(3));
    }

    #[test]
    fn test_default_extracts_images_all_pages() {
        let opts = ParserOptions::default();
        assert!(opts.extract_images);
        assert_eq!(opts.max_pages, None);
    }
}

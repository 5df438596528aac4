//! Minimal WordprocessingML writer.
//!
//! Produces a valid DOCX package with just the parts Word requires:
//! content types, package rels, styles and the document body. Headings
//! map to `Heading N` styles, runs carry bold/italic/underline/size/
//! color, RTL text gets `w:rtl`/`w:bidi`, tables keep gridSpan. Images
//! are written as caption placeholders; byte-exact media embedding is an
//! external concern.

use std::io::{Cursor, Write};

use log::warn;
use quick_xml::escape::escape;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use tarjoman_core::document::{
    Alignment, Block, CellBlock, Document, Span,
};
use tarjoman_core::error::{Result, TarjomanError};
use tarjoman_core::lang::is_rtl_text;

const TWIPS_PER_INCH: f64 = 1440.0;

/// How source and translation share the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Translation first, then a page break, then the source.
    Sequential,
    /// Two-column table with translation and source side by side.
    SideBySide,
}

/// Writes a DOCX file. With a `secondary` document the chosen layout
/// combines both; alone, `primary` is written as-is.
pub fn write_docx(
    primary: &Document,
    secondary: Option<&Document>,
    layout: Layout,
) -> Result<Vec<u8>> {
    let body = match (secondary, layout) {
        (None, _) => document_xml_blocks(primary),
        (Some(second), Layout::Sequential) => format!(
            "{}<w:p><w:r><w:br w:type=\"page\"/></w:r></w:p>{}",
            document_xml_blocks(primary),
            document_xml_blocks(second)
        ),
        (Some(second), Layout::SideBySide) => side_by_side_xml(primary, second),
    };
    let sect_pr = sect_pr_xml(primary);
    let document = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
         <w:body>{body}{sect_pr}</w:body></w:document>"
    );

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = ZipWriter::new(&mut cursor);
        let opts = SimpleFileOptions::default();
        for (name, content) in [
            ("[Content_Types].xml", CONTENT_TYPES),
            ("_rels/.rels", PACKAGE_RELS),
            ("word/styles.xml", STYLES),
        ] {
            writer
                .start_file(name, opts)
                .map_err(|e| TarjomanError::RenderFailed(format!("zip {name}: {e}")))?;
            writer.write_all(content.as_bytes())?;
        }
        writer
            .start_file("word/document.xml", opts)
            .map_err(|e| TarjomanError::RenderFailed(format!("zip document.xml: {e}")))?;
        writer.write_all(document.as_bytes())?;
        writer
            .finish()
            .map_err(|e| TarjomanError::RenderFailed(format!("zip finish: {e}")))?;
    }
    Ok(cursor.into_inner())
}

const CONTENT_TYPES: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
<Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
<Default Extension=\"xml\" ContentType=\"application/xml\"/>\
<Override PartName=\"/word/document.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml\"/>\
<Override PartName=\"/word/styles.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml\"/>\
</Types>";

const PACKAGE_RELS: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
<Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" Target=\"word/document.xml\"/>\
</Relationships>";

const STYLES: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<w:styles xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
<w:style w:type=\"paragraph\" w:styleId=\"Heading1\"><w:name w:val=\"heading 1\"/>\
<w:rPr><w:b/><w:sz w:val=\"32\"/></w:rPr></w:style>\
<w:style w:type=\"paragraph\" w:styleId=\"Heading2\"><w:name w:val=\"heading 2\"/>\
<w:rPr><w:b/><w:sz w:val=\"28\"/></w:rPr></w:style>\
<w:style w:type=\"paragraph\" w:styleId=\"Heading3\"><w:name w:val=\"heading 3\"/>\
<w:rPr><w:b/><w:sz w:val=\"26\"/></w:rPr></w:style>\
<w:style w:type=\"paragraph\" w:styleId=\"Heading4\"><w:name w:val=\"heading 4\"/>\
<w:rPr><w:b/><w:sz w:val=\"24\"/></w:rPr></w:style>\
<w:style w:type=\"paragraph\" w:styleId=\"Heading5\"><w:name w:val=\"heading 5\"/>\
<w:rPr><w:b/><w:sz w:val=\"24\"/></w:rPr></w:style>\
<w:style w:type=\"paragraph\" w:styleId=\"Heading6\"><w:name w:val=\"heading 6\"/>\
<w:rPr><w:b/><w:sz w:val=\"24\"/></w:rPr></w:style>\
</w:styles>";

fn sect_pr_xml(document: &Document) -> String {
    let width = (document.meta.page_width * TWIPS_PER_INCH) as u32;
    let height = (document.meta.page_height * TWIPS_PER_INCH) as u32;
    format!("<w:sectPr><w:pgSz w:w=\"{width}\" w:h=\"{height}\"/></w:sectPr>")
}

fn document_xml_blocks(document: &Document) -> String {
    let mut out = String::new();
    for section in &document.sections {
        for block in &section.blocks {
            block_xml(block, &mut out);
        }
    }
    out
}

fn block_xml(block: &Block, out: &mut String) {
    match block {
        Block::Heading(h) => {
            let style = format!("Heading{}", h.level.clamp(1, 6));
            paragraph_xml(&h.spans, Some(&style), None, 0, out);
        }
        Block::Paragraph(p) => paragraph_xml(&p.spans, None, p.alignment, 0, out),
        Block::ListItem(li) => {
            let marker = if li.ordered { "1. " } else { "\u{2022} " };
            let mut spans = Vec::with_capacity(li.spans.len() + 1);
            spans.push(Span::plain(marker));
            spans.extend(li.spans.iter().cloned());
            paragraph_xml(&spans, None, None, (li.level as u32 + 1) * 720, out);
        }
        Block::Table(table) => {
            out.push_str(
                "<w:tbl><w:tblPr><w:tblBorders>\
                 <w:top w:val=\"single\" w:sz=\"4\"/><w:bottom w:val=\"single\" w:sz=\"4\"/>\
                 <w:left w:val=\"single\" w:sz=\"4\"/><w:right w:val=\"single\" w:sz=\"4\"/>\
                 <w:insideH w:val=\"single\" w:sz=\"4\"/><w:insideV w:val=\"single\" w:sz=\"4\"/>\
                 </w:tblBorders></w:tblPr>",
            );
            for row in &table.rows {
                out.push_str("<w:tr>");
                for cell in &row.cells {
                    out.push_str("<w:tc><w:tcPr>");
                    if cell.colspan > 1 {
                        out.push_str(&format!("<w:gridSpan w:val=\"{}\"/>", cell.colspan));
                    }
                    out.push_str("</w:tcPr>");
                    if cell.blocks.is_empty() {
                        out.push_str("<w:p/>");
                    }
                    for inner in &cell.blocks {
                        cell_block_xml(inner, out);
                    }
                    out.push_str("</w:tc>");
                }
                out.push_str("</w:tr>");
            }
            out.push_str("</w:tbl>");
        }
        Block::Figure(figure) => {
            warn!("figure {} written as placeholder text", figure.image_id);
            let caption = figure
                .caption
                .as_ref()
                .map_or_else(|| format!("[image: {}]", figure.image_id), |c| c.text());
            paragraph_xml(&[Span::plain(caption)], None, None, 0, out);
        }
        Block::Textbox(tb) => {
            for inner in &tb.blocks {
                cell_block_xml(inner, out);
            }
        }
    }
}

fn cell_block_xml(block: &CellBlock, out: &mut String) {
    match block {
        CellBlock::Heading(h) => {
            let style = format!("Heading{}", h.level.clamp(1, 6));
            paragraph_xml(&h.spans, Some(&style), None, 0, out);
        }
        CellBlock::Paragraph(p) => paragraph_xml(&p.spans, None, p.alignment, 0, out),
        CellBlock::ListItem(li) => {
            let marker = if li.ordered { "1. " } else { "\u{2022} " };
            let mut spans = Vec::with_capacity(li.spans.len() + 1);
            spans.push(Span::plain(marker));
            spans.extend(li.spans.iter().cloned());
            paragraph_xml(&spans, None, None, (li.level as u32 + 1) * 720, out);
        }
    }
}

fn paragraph_xml(
    spans: &[Span],
    style: Option<&str>,
    alignment: Option<Alignment>,
    indent_twips: u32,
    out: &mut String,
) {
    let text: String = spans.iter().map(|s| s.text.as_str()).collect();
    let rtl = is_rtl_text(&text);

    out.push_str("<w:p><w:pPr>");
    if let Some(style) = style {
        out.push_str(&format!("<w:pStyle w:val=\"{style}\"/>"));
    }
    if indent_twips > 0 {
        out.push_str(&format!("<w:ind w:left=\"{indent_twips}\"/>"));
    }
    if let Some(alignment) = alignment {
        let val = match alignment {
            Alignment::Left => "left",
            Alignment::Right => "right",
            Alignment::Center => "center",
            Alignment::Justify => "both",
        };
        out.push_str(&format!("<w:jc w:val=\"{val}\"/>"));
    }
    if rtl {
        out.push_str("<w:bidi/>");
    }
    out.push_str("</w:pPr>");
    for span in spans {
        run_xml(span, out);
    }
    out.push_str("</w:p>");
}

fn run_xml(span: &Span, out: &mut String) {
    out.push_str("<w:r><w:rPr>");
    if span.bold == Some(true) {
        out.push_str("<w:b/>");
    }
    if span.italic == Some(true) {
        out.push_str("<w:i/>");
    }
    if span.underline == Some(true) {
        out.push_str("<w:u w:val=\"single\"/>");
    }
    if let Some(size) = span.font_size {
        out.push_str(&format!("<w:sz w:val=\"{}\"/>", (size * 2.0) as u32));
    }
    if let Some(color) = &span.color {
        out.push_str(&format!("<w:color w:val=\"{}\"/>", escape(color)));
    }
    if is_rtl_text(&span.text) {
        out.push_str("<w:rtl/>");
    }
    out.push_str("</w:rPr>");
    out.push_str(&format!(
        "<w:t xml:space=\"preserve\">{}</w:t>",
        escape(&span.text)
    ));
    out.push_str("</w:r>");
}

/// Pairs the two documents' blocks row by row in a two-column table.
fn side_by_side_xml(primary: &Document, secondary: &Document) -> String {
    let left: Vec<&Block> = primary.blocks().collect();
    let right: Vec<&Block> = secondary.blocks().collect();
    let rows = left.len().max(right.len());

    let mut out = String::from(
        "<w:tbl><w:tblPr><w:tblW w:w=\"5000\" w:type=\"pct\"/></w:tblPr>",
    );
    for i in 0..rows {
        out.push_str("<w:tr>");
        for side in [left.get(i), right.get(i)] {
            out.push_str("<w:tc><w:tcPr></w:tcPr>");
            match side {
                Some(block) => {
                    let before = out.len();
                    block_xml(block, &mut out);
                    if out.len() == before {
                        out.push_str("<w:p/>");
                    }
                }
                None => out.push_str("<w:p/>"),
            }
            out.push_str("</w:tc>");
        }
        out.push_str("</w:tr>");
    }
    out.push_str("</w:tbl>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tarjoman_core::document::{DocumentMeta, Heading, ListItem, Paragraph, Section};
    use zip::ZipArchive;

    fn doc(blocks: Vec<Block>) -> Document {
        Document::new(DocumentMeta::default(), vec![Section::with_blocks(0, blocks)])
    }

    fn read_part(bytes: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();
        content
    }

    #[test]
    fn test_package_has_required_parts() {
        let bytes = write_docx(&doc(vec![]), None, Layout::Sequential).unwrap();
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        assert!(names.contains(&"[Content_Types].xml"));
        assert!(names.contains(&"_rels/.rels"));
        assert!(names.contains(&"word/document.xml"));
        assert!(names.contains(&"word/styles.xml"));
    }

    #[test]
    fn test_heading_style_and_text() {
        let bytes = write_docx(
            &doc(vec![Block::Heading(Heading::new(
                2,
                vec![Span::plain("Results")],
            ))]),
            None,
            Layout::Sequential,
        )
        .unwrap();
        let xml = read_part(&bytes, "word/document.xml");
        assert!(xml.contains("<w:pStyle w:val=\"Heading2\"/>"));
        assert!(xml.contains(">Results</w:t>"));
    }

    #[test]
    fn test_rtl_paragraph_gets_bidi_and_rtl_run() {
        let bytes = write_docx(
            &doc(vec![Block::Paragraph(Paragraph::text_block("متن فارسی"))]),
            None,
            Layout::Sequential,
        )
        .unwrap();
        let xml = read_part(&bytes, "word/document.xml");
        assert!(xml.contains("<w:bidi/>"));
        assert!(xml.contains("<w:rtl/>"));
    }

    #[test]
    fn test_bold_run_and_escaping() {
        let mut span = Span::plain("a < b & c");
        span.bold = Some(true);
        let bytes = write_docx(
            &doc(vec![Block::Paragraph(Paragraph::new(vec![span]))]),
            None,
            Layout::Sequential,
        )
        .unwrap();
        let xml = read_part(&bytes, "word/document.xml");
        assert!(xml.contains("<w:b/>"));
        assert!(xml.contains("a &lt; b &amp; c"));
    }

    #[test]
    fn test_list_indent_scales_with_level() {
        let bytes = write_docx(
            &doc(vec![Block::ListItem(ListItem::new(
                1,
                false,
                vec![Span::plain("nested")],
            ))]),
            None,
            Layout::Sequential,
        )
        .unwrap();
        let xml = read_part(&bytes, "word/document.xml");
        assert!(xml.contains("<w:ind w:left=\"1440\"/>"));
        assert!(xml.contains("\u{2022} "));
    }

    #[test]
    fn test_table_with_gridspan() {
        use tarjoman_core::document::{Cell, Row, Table};
        let mut wide = Cell::text_cell("span");
        wide.colspan = 3;
        let bytes = write_docx(
            &doc(vec![Block::Table(Table {
                rows: vec![Row { cells: vec![wide] }],
                anchor: None,
            })]),
            None,
            Layout::Sequential,
        )
        .unwrap();
        let xml = read_part(&bytes, "word/document.xml");
        assert!(xml.contains("<w:gridSpan w:val=\"3\"/>"));
    }

    #[test]
    fn test_sequential_layout_has_page_break() {
        let primary = doc(vec![Block::Paragraph(Paragraph::text_block("translated"))]);
        let secondary = doc(vec![Block::Paragraph(Paragraph::text_block("original"))]);
        let bytes = write_docx(&primary, Some(&secondary), Layout::Sequential).unwrap();
        let xml = read_part(&bytes, "word/document.xml");
        assert!(xml.contains("<w:br w:type=\"page\"/>"));
        let break_at = xml.find("w:type=\"page\"").unwrap();
        assert!(xml.find("translated").unwrap() < break_at);
        assert!(xml.find("original").unwrap() > break_at);
    }

    #[test]
    fn test_side_by_side_pairs_rows() {
        let primary = doc(vec![
            Block::Paragraph(Paragraph::text_block("t1")),
            Block::Paragraph(Paragraph::text_block("t2")),
        ]);
        let secondary = doc(vec![Block::Paragraph(Paragraph::text_block("s1"))]);
        let bytes = write_docx(&primary, Some(&secondary), Layout::SideBySide).unwrap();
        let xml = read_part(&bytes, "word/document.xml");
        assert_eq!(xml.matches("<w:tr>").count(), 2);
        assert!(xml.contains("t2"));
        // Unpaired row gets an empty cell, keeping the grid rectangular.
        assert!(xml.contains("<w:p/>"));
    }

    #[test]
    fn test_page_size_in_sectpr() {
        let mut document = doc(vec![]);
        document.meta.page_width = 8.5;
        document.meta.page_height = 11.0;
        let bytes = write_docx(&document, None, Layout::Sequential).unwrap();
        let xml = read_part(&bytes, "word/document.xml");
        assert!(xml.contains("<w:pgSz w:w=\"12240\" w:h=\"15840\"/>"));
    }
}

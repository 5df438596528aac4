//! HTML rendering for both IR shapes.
//!
//! Output is a standalone page with an embedded base style. Direction is
//! decided per block from its text, so a Persian translation with
//! embedded English code samples renders each block the right way round.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use log::warn;

use tarjoman_core::document::{
    Block, Cell, CellBlock, Document, Figure, Section, Span,
};
use tarjoman_core::lang::is_rtl_text;
use tarjoman_core::legacy::{FlatBlock, FlatIr, FlatKind, InlineSpan};

const BASE_STYLE: &str = "body{font-family:system-ui,sans-serif;max-width:52rem;margin:2rem auto;\
padding:0 1rem;line-height:1.6}table{border-collapse:collapse}td,th{border:1px solid #999;\
padding:.3rem .6rem}img{max-width:100%}header,footer{color:#666;font-size:.85rem;\
border-bottom:1px solid #ddd;margin-bottom:1rem}footer{border-bottom:none;border-top:1px solid #ddd;\
margin-top:1rem}pre{background:#f5f5f5;padding:.8rem;overflow-x:auto}";

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

fn dir_attr(text: &str) -> &'static str {
    if is_rtl_text(text) {
        " dir=\"rtl\""
    } else {
        " dir=\"ltr\""
    }
}

fn page(title: &str, base_dir: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html dir=\"{base_dir}\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{}</title>\n<style>{BASE_STYLE}</style>\n</head>\n<body>\n{body}</body>\n</html>\n",
        escape(title)
    )
}

/// Renders a flat IR document to standalone HTML.
#[must_use]
pub fn flat_ir_to_html(ir: &FlatIr) -> String {
    let base_dir = ir
        .attrs
        .get("dir")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("ltr")
        .to_string();
    let title = ir
        .blocks
        .iter()
        .find(|b| b.kind == FlatKind::Heading)
        .map_or_else(|| "Document".to_string(), FlatBlock::text);

    let mut body = String::new();
    for block in &ir.blocks {
        render_flat_block(block, &mut body);
    }
    page(&title, &base_dir, &body)
}

fn render_flat_block(block: &FlatBlock, out: &mut String) {
    match block.kind {
        FlatKind::Heading => {
            let level = block.level.clamp(1, 6);
            let text = block.text();
            out.push_str(&format!(
                "<h{level}{}>{}</h{level}>\n",
                dir_attr(&text),
                inline_html(&block.spans)
            ));
        }
        FlatKind::Paragraph => {
            let text = block.text();
            out.push_str(&format!("<p{}>{}</p>\n", dir_attr(&text), inline_html(&block.spans)));
        }
        FlatKind::List => {
            let tag = if block.is_ordered() { "ol" } else { "ul" };
            out.push_str(&format!("<{tag}>\n"));
            for child in &block.children {
                render_flat_block(child, out);
            }
            out.push_str(&format!("</{tag}>\n"));
        }
        FlatKind::ListItem => {
            let text = block.text();
            out.push_str(&format!("<li{}>{}", dir_attr(&text), inline_html(&block.spans)));
            for child in &block.children {
                render_flat_block(child, out);
            }
            out.push_str("</li>\n");
        }
        FlatKind::Table => {
            out.push_str("<table>\n");
            for row in &block.children {
                render_flat_block(row, out);
            }
            out.push_str("</table>\n");
        }
        FlatKind::TableRow => {
            out.push_str("<tr>");
            for cell in &block.children {
                render_flat_block(cell, out);
            }
            out.push_str("</tr>\n");
        }
        FlatKind::TableCell => {
            let tag = if block
                .attrs
                .get("header")
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false)
            {
                "th"
            } else {
                "td"
            };
            out.push_str(&format!("<{tag}>{}</{tag}>", inline_html(&block.spans)));
        }
        FlatKind::Blockquote => {
            out.push_str(&format!("<blockquote>{}</blockquote>\n", inline_html(&block.spans)));
        }
        FlatKind::Codeblock => {
            out.push_str(&format!("<pre><code>{}</code></pre>\n", escape(&block.text())));
        }
        FlatKind::Figure => {
            if let Some(src) = block.attrs.get("src").and_then(serde_json::Value::as_str) {
                let alt = block
                    .attrs
                    .get("alt")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or("");
                out.push_str(&format!(
                    "<img src=\"{}\" alt=\"{}\">\n",
                    escape(src),
                    escape(alt)
                ));
            } else {
                warn!("figure without source skipped");
            }
        }
        FlatKind::Hr => out.push_str("<hr>\n"),
    }
}

fn inline_html(spans: &[InlineSpan]) -> String {
    let mut out = String::new();
    for span in spans {
        let mut text = escape(&span.text);
        if span.code {
            text = format!("<code>{text}</code>");
        }
        if span.italic {
            text = format!("<em>{text}</em>");
        }
        if span.bold {
            text = format!("<strong>{text}</strong>");
        }
        if let Some(href) = &span.href {
            text = format!("<a href=\"{}\">{text}</a>", escape(href));
        }
        out.push_str(&text);
    }
    out
}

/// Renders a layout-aware document to standalone HTML.
#[must_use]
pub fn document_to_html(document: &Document) -> String {
    let title = document
        .meta
        .title
        .clone()
        .or_else(|| {
            document.blocks().find_map(|b| match b {
                Block::Heading(h) => Some(h.text()),
                _ => None,
            })
        })
        .unwrap_or_else(|| "Document".to_string());
    let base_dir = if is_rtl_text(&document.plain_text()) {
        "rtl"
    } else {
        "ltr"
    };

    let mut body = String::new();
    for section in &document.sections {
        render_section(section, &mut body);
    }
    page(&title, base_dir, &body)
}

fn render_section(section: &Section, out: &mut String) {
    if let Some(header) = &section.header {
        out.push_str("<header>\n");
        for block in &header.blocks {
            render_cell_block(block, out);
        }
        out.push_str("</header>\n");
    }
    for block in &section.blocks {
        render_block(block, out);
    }
    if let Some(footer) = &section.footer {
        out.push_str("<footer>\n");
        for block in &footer.blocks {
            render_cell_block(block, out);
        }
        out.push_str("</footer>\n");
    }
}

fn render_block(block: &Block, out: &mut String) {
    match block {
        Block::Heading(h) => {
            let level = h.level.clamp(1, 6);
            let text = h.text();
            out.push_str(&format!(
                "<h{level}{}>{}</h{level}>\n",
                dir_attr(&text),
                spans_html(&h.spans)
            ));
        }
        Block::Paragraph(p) => {
            let text = p.text();
            out.push_str(&format!("<p{}>{}</p>\n", dir_attr(&text), spans_html(&p.spans)));
        }
        Block::ListItem(li) => {
            // Standalone items render as a one-item list; the level maps
            // to margin so nesting survives visually.
            let tag = if li.ordered { "ol" } else { "ul" };
            let indent = li.level * 2;
            let text = li.text();
            out.push_str(&format!(
                "<{tag} style=\"margin-inline-start:{indent}rem\"><li{}>{}</li></{tag}>\n",
                dir_attr(&text),
                spans_html(&li.spans)
            ));
        }
        Block::Table(table) => {
            out.push_str("<table>\n");
            for row in &table.rows {
                out.push_str("<tr>");
                for cell in &row.cells {
                    render_cell(cell, out);
                }
                out.push_str("</tr>\n");
            }
            out.push_str("</table>\n");
        }
        Block::Figure(figure) => render_figure(figure, out),
        Block::Textbox(tb) => {
            out.push_str("<aside>\n");
            for block in &tb.blocks {
                render_cell_block(block, out);
            }
            out.push_str("</aside>\n");
        }
    }
}

fn render_cell(cell: &Cell, out: &mut String) {
    let mut attrs = String::new();
    if cell.colspan > 1 {
        attrs.push_str(&format!(" colspan=\"{}\"", cell.colspan));
    }
    if cell.rowspan > 1 {
        attrs.push_str(&format!(" rowspan=\"{}\"", cell.rowspan));
    }
    if let Some(direction) = cell.direction {
        attrs.push_str(&format!(
            " dir=\"{}\"",
            match direction {
                tarjoman_core::document::Direction::Rtl => "rtl",
                tarjoman_core::document::Direction::Ltr => "ltr",
            }
        ));
    }
    out.push_str(&format!("<td{attrs}>"));
    for block in &cell.blocks {
        render_cell_block(block, out);
    }
    out.push_str("</td>");
}

fn render_cell_block(block: &CellBlock, out: &mut String) {
    match block {
        CellBlock::Heading(h) => {
            let level = h.level.clamp(1, 6);
            out.push_str(&format!("<h{level}>{}</h{level}>\n", spans_html(&h.spans)));
        }
        CellBlock::Paragraph(p) => {
            let text = p.text();
            out.push_str(&format!("<p{}>{}</p>\n", dir_attr(&text), spans_html(&p.spans)));
        }
        CellBlock::ListItem(li) => {
            out.push_str(&format!("<li>{}</li>\n", spans_html(&li.spans)));
        }
    }
}

fn render_figure(figure: &Figure, out: &mut String) {
    let Some(bytes) = &figure.image_bytes else {
        warn!("figure {} has no bytes; skipped", figure.image_id);
        return;
    };
    let format = figure.format.as_deref().unwrap_or("png");
    let data = BASE64.encode(bytes);
    out.push_str(&format!(
        "<figure><img src=\"data:image/{format};base64,{data}\" alt=\"{}\">",
        escape(&figure.image_id)
    ));
    if let Some(caption) = &figure.caption {
        out.push_str(&format!("<figcaption>{}</figcaption>", spans_html(&caption.spans)));
    }
    out.push_str("</figure>\n");
}

fn spans_html(spans: &[Span]) -> String {
    let mut out = String::new();
    for span in spans {
        let mut text = escape(&span.text);
        if span.underline == Some(true) {
            text = format!("<u>{text}</u>");
        }
        if span.italic == Some(true) {
            text = format!("<em>{text}</em>");
        }
        if span.bold == Some(true) {
            text = format!("<strong>{text}</strong>");
        }
        if let Some(link) = &span.link {
            text = format!("<a href=\"{}\">{text}</a>", escape(link));
        }
        out.push_str(&text);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tarjoman_core::document::{
        DocumentMeta, Footer, Header, Heading, PageRange, Paragraph,
    };

    #[test]
    fn test_flat_headings_and_dir() {
        let ir = FlatIr::new(vec![
            FlatBlock::heading(1, "عنوان"),
            FlatBlock::paragraph(vec![InlineSpan::plain("English body.")]),
        ]);
        let html = flat_ir_to_html(&ir);
        assert!(html.contains("<h1 dir=\"rtl\">عنوان</h1>"));
        assert!(html.contains("<p dir=\"ltr\">English body.</p>"));
    }

    #[test]
    fn test_flat_inline_formatting_and_escaping() {
        let ir = FlatIr::new(vec![FlatBlock::paragraph(vec![
            InlineSpan {
                text: "a < b".to_string(),
                bold: true,
                ..InlineSpan::default()
            },
            InlineSpan {
                text: "link".to_string(),
                href: Some("https://x.io?a=1&b=2".to_string()),
                ..InlineSpan::default()
            },
        ])]);
        let html = flat_ir_to_html(&ir);
        assert!(html.contains("<strong>a &lt; b</strong>"));
        assert!(html.contains("href=\"https://x.io?a=1&amp;b=2\""));
    }

    #[test]
    fn test_flat_list_and_codeblock() {
        let ir = FlatIr::new(vec![
            FlatBlock::list(true, vec![FlatBlock::list_item(vec![InlineSpan::plain("one")])]),
            FlatBlock::codeblock("if (a<b) {}"),
        ]);
        let html = flat_ir_to_html(&ir);
        assert!(html.contains("<ol>"));
        assert!(html.contains("<li dir=\"ltr\">one</li>"));
        assert!(html.contains("<pre><code>if (a&lt;b) {}</code></pre>"));
    }

    fn doc_with(blocks: Vec<Block>) -> Document {
        Document::new(
            DocumentMeta::default(),
            vec![tarjoman_core::document::Section::with_blocks(0, blocks)],
        )
    }

    #[test]
    fn test_document_table_spans() {
        use tarjoman_core::document::{Cell, Row, Table};
        let mut wide = Cell::text_cell("wide");
        wide.colspan = 2;
        let mut tall = Cell::text_cell("tall");
        tall.rowspan = 3;
        let doc = doc_with(vec![Block::Table(Table {
            rows: vec![Row {
                cells: vec![wide, tall],
            }],
            anchor: None,
        })]);
        let html = document_to_html(&doc);
        assert!(html.contains("colspan=\"2\""));
        assert!(html.contains("rowspan=\"3\""));
    }

    #[test]
    fn test_document_header_footer_rendered() {
        let mut doc = doc_with(vec![Block::Paragraph(Paragraph::text_block("body"))]);
        doc.sections[0].header = Some(Header {
            blocks: vec![CellBlock::Paragraph(Paragraph::text_block("Confidential"))],
            page_range: PageRange::All,
        });
        doc.sections[0].footer = Some(Footer {
            blocks: vec![CellBlock::Paragraph(Paragraph::text_block("Page footer"))],
            page_range: PageRange::All,
        });
        let html = document_to_html(&doc);
        assert!(html.contains("<header>"));
        assert!(html.contains("Confidential"));
        assert!(html.contains("<footer>"));
    }

    #[test]
    fn test_figure_with_bytes_becomes_data_uri() {
        let doc = doc_with(vec![Block::Figure(tarjoman_core::document::Figure {
            image_id: "img1".to_string(),
            image_bytes: Some(vec![1, 2, 3]),
            format: Some("png".to_string()),
            caption: None,
            anchor: None,
            width: None,
            height: None,
        })]);
        let html = document_to_html(&doc);
        assert!(html.contains("data:image/png;base64,AQID"));
    }

    #[test]
    fn test_figure_without_bytes_skipped_not_fatal() {
        let doc = doc_with(vec![
            Block::Figure(tarjoman_core::document::Figure {
                image_id: "missing".to_string(),
                image_bytes: None,
                format: None,
                caption: None,
                anchor: None,
                width: None,
                height: None,
            }),
            Block::Paragraph(Paragraph::text_block("still here")),
        ]);
        let html = document_to_html(&doc);
        assert!(!html.contains("missing"));
        assert!(html.contains("still here"));
    }

    #[test]
    fn test_rtl_document_base_direction() {
        let doc = doc_with(vec![Block::Heading(Heading::new(
            1,
            vec![tarjoman_core::document::Span::plain("سند فارسی")],
        ))]);
        let html = document_to_html(&doc);
        assert!(html.contains("<html dir=\"rtl\">"));
    }

    #[test]
    fn test_title_from_meta_then_first_heading() {
        let mut doc = doc_with(vec![Block::Heading(Heading::new(
            1,
            vec![tarjoman_core::document::Span::plain("From Heading")],
        ))]);
        assert!(document_to_html(&doc).contains("<title>From Heading</title>"));
        doc.meta.title = Some("From Meta".to_string());
        assert!(document_to_html(&doc).contains("<title>From Meta</title>"));
    }
}

//! HTML and plain-text conversion into the flat IR.
//!
//! Semantic elements map one-to-one (h1-h6, p, lists, tables, pre,
//! blockquote, img, hr); unknown containers are descended into so content
//! inside arbitrary div soup is never lost. Inline formatting is carried
//! on spans so the tagged codec can round-trip it through translation.

use scraper::{ElementRef, Html};
use tarjoman_core::legacy::{FlatBlock, FlatIr, FlatKind, InlineSpan};

/// Elements whose subtree is never content.
const SKIP_TAGS: [&str; 7] = ["script", "style", "noscript", "nav", "iframe", "svg", "template"];

/// Converts an HTML document (or fragment) into the flat IR.
#[must_use]
pub fn html_to_flat_ir(html: &str) -> FlatIr {
    let dom = Html::parse_document(html);
    let mut blocks = Vec::new();
    let root = dom.root_element();
    let body = root
        .select(&selector("body"))
        .next()
        .unwrap_or(root);
    walk_container(body, &mut blocks);
    FlatIr::new(blocks)
}

/// Wraps plain-text paragraphs (split on blank lines) into the flat IR.
#[must_use]
pub fn text_to_flat_ir(text: &str) -> FlatIr {
    let blocks = text
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            let joined = p
                .lines()
                .map(str::trim)
                .collect::<Vec<_>>()
                .join(" ");
            FlatBlock::paragraph(vec![InlineSpan::plain(joined)])
        })
        .collect();
    FlatIr::new(blocks)
}

fn selector(css: &str) -> scraper::Selector {
    // Selectors here are compile-time constants.
    scraper::Selector::parse(css).unwrap_or_else(|e| panic!("selector {css}: {e}"))
}

fn walk_container(el: ElementRef<'_>, blocks: &mut Vec<FlatBlock>) {
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            let trimmed = collapse_ws(text);
            if !trimmed.trim().is_empty() {
                blocks.push(FlatBlock::paragraph(vec![InlineSpan::plain(
                    trimmed.trim().to_string(),
                )]));
            }
            continue;
        }
        let Some(child_el) = ElementRef::wrap(child) else {
            continue;
        };
        element_to_blocks(child_el, blocks);
    }
}

fn element_to_blocks(el: ElementRef<'_>, blocks: &mut Vec<FlatBlock>) {
    let tag = el.value().name();
    if SKIP_TAGS.contains(&tag) {
        return;
    }
    match tag {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = tag.as_bytes()[1] - b'0';
            let spans = collect_spans(el);
            if !spans.is_empty() {
                let mut block = FlatBlock::new(FlatKind::Heading);
                block.level = level;
                block.spans = spans;
                blocks.push(block);
            }
        }
        "p" => {
            let spans = collect_spans(el);
            if !spans.is_empty() {
                blocks.push(FlatBlock::paragraph(spans));
            }
        }
        "ul" | "ol" => {
            let ordered = tag == "ol";
            let mut items = Vec::new();
            for li in el.children().filter_map(ElementRef::wrap) {
                if li.value().name() != "li" {
                    continue;
                }
                let mut item = FlatBlock::list_item(collect_spans(li));
                // Nested lists hang off the item.
                for nested in li.children().filter_map(ElementRef::wrap) {
                    if matches!(nested.value().name(), "ul" | "ol") {
                        let mut sub = Vec::new();
                        element_to_blocks(nested, &mut sub);
                        item.children.extend(sub);
                    }
                }
                if !item.spans.is_empty() || !item.children.is_empty() {
                    items.push(item);
                }
            }
            if !items.is_empty() {
                blocks.push(FlatBlock::list(ordered, items));
            }
        }
        "blockquote" => {
            let spans = collect_spans(el);
            if !spans.is_empty() {
                let mut block = FlatBlock::new(FlatKind::Blockquote);
                block.spans = spans;
                blocks.push(block);
            }
        }
        "pre" => {
            let code: String = el.text().collect();
            if !code.trim().is_empty() {
                blocks.push(FlatBlock::codeblock(code.trim_end().to_string()));
            }
        }
        "table" => {
            if let Some(table) = table_to_block(el) {
                blocks.push(table);
            }
        }
        "img" => {
            if let Some(src) = el.value().attr("src") {
                let mut block = FlatBlock::new(FlatKind::Figure);
                block
                    .attrs
                    .insert("src".to_string(), serde_json::Value::String(src.to_string()));
                if let Some(alt) = el.value().attr("alt") {
                    block
                        .attrs
                        .insert("alt".to_string(), serde_json::Value::String(alt.to_string()));
                }
                blocks.push(block);
            }
        }
        "hr" => blocks.push(FlatBlock::new(FlatKind::Hr)),
        "br" => {}
        _ => walk_container(el, blocks),
    }
}

fn table_to_block(el: ElementRef<'_>) -> Option<FlatBlock> {
    let mut table = FlatBlock::new(FlatKind::Table);
    for row in el.select(&selector("tr")) {
        let mut row_block = FlatBlock::new(FlatKind::TableRow);
        for cell in row.children().filter_map(ElementRef::wrap) {
            if !matches!(cell.value().name(), "td" | "th") {
                continue;
            }
            let mut cell_block = FlatBlock::new(FlatKind::TableCell);
            cell_block.spans = collect_spans(cell);
            if cell.value().name() == "th" {
                cell_block
                    .attrs
                    .insert("header".to_string(), serde_json::Value::Bool(true));
            }
            row_block.children.push(cell_block);
        }
        if !row_block.children.is_empty() {
            table.children.push(row_block);
        }
    }
    (!table.children.is_empty()).then_some(table)
}

#[derive(Clone, Default)]
struct InlineCtx {
    bold: bool,
    italic: bool,
    code: bool,
    href: Option<String>,
}

/// Collects the inline spans of an element, skipping nested block-level
/// structure (lists inside list items are handled by the caller).
fn collect_spans(el: ElementRef<'_>) -> Vec<InlineSpan> {
    let mut spans = Vec::new();
    collect_inline(el, &InlineCtx::default(), &mut spans);
    // Trim the outer edges without disturbing inter-span spacing.
    if let Some(first) = spans.first_mut() {
        first.text = first.text.trim_start().to_string();
    }
    if let Some(last) = spans.last_mut() {
        last.text = last.text.trim_end().to_string();
    }
    spans.retain(|s| !s.text.is_empty());
    spans
}

fn collect_inline(el: ElementRef<'_>, ctx: &InlineCtx, spans: &mut Vec<InlineSpan>) {
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            let collapsed = collapse_ws(text);
            if collapsed.is_empty() {
                continue;
            }
            push_span(spans, collapsed, ctx);
            continue;
        }
        let Some(child_el) = ElementRef::wrap(child) else {
            continue;
        };
        let tag = child_el.value().name();
        if SKIP_TAGS.contains(&tag) || matches!(tag, "ul" | "ol" | "table") {
            continue;
        }
        let mut inner = ctx.clone();
        match tag {
            "strong" | "b" => inner.bold = true,
            "em" | "i" => inner.italic = true,
            "code" | "kbd" | "samp" => inner.code = true,
            "a" => {
                if let Some(href) = child_el.value().attr("href") {
                    inner.href = Some(href.to_string());
                }
            }
            "br" => {
                push_span(spans, " ".to_string(), ctx);
                continue;
            }
            _ => {}
        }
        collect_inline(child_el, &inner, spans);
    }
}

fn push_span(spans: &mut Vec<InlineSpan>, text: String, ctx: &InlineCtx) {
    // Merge into the previous span when the style is unchanged, so DOM
    // fragmentation does not leak into the IR.
    if let Some(prev) = spans.last_mut() {
        if prev.bold == ctx.bold
            && prev.italic == ctx.italic
            && prev.code == ctx.code
            && prev.href == ctx.href
        {
            prev.text.push_str(&text);
            return;
        }
    }
    spans.push(InlineSpan {
        text,
        bold: ctx.bold,
        italic: ctx.italic,
        code: ctx.code,
        href: ctx.href.clone(),
    });
}

/// Collapses internal whitespace runs to single spaces, preserving one
/// leading/trailing space when the source had any.
fn collapse_ws(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_ws = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !in_ws {
                out.push(' ');
            }
            in_ws = true;
        } else {
            out.push(ch);
            in_ws = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headings_and_paragraphs() {
        let ir = html_to_flat_ir("<h1>Title</h1><p>Body text.</p><h3>Sub</h3>");
        assert_eq!(ir.blocks.len(), 3);
        assert_eq!(ir.blocks[0].kind, FlatKind::Heading);
        assert_eq!(ir.blocks[0].level, 1);
        assert_eq!(ir.blocks[1].kind, FlatKind::Paragraph);
        assert_eq!(ir.blocks[1].text(), "Body text.");
        assert_eq!(ir.blocks[2].level, 3);
    }

    #[test]
    fn test_inline_formatting_becomes_spans() {
        let ir = html_to_flat_ir("<p>Plain <strong>bold</strong> and <em>italic</em>.</p>");
        let spans = &ir.blocks[0].spans;
        assert_eq!(spans.len(), 5);
        assert!(spans[1].bold);
        assert!(spans[3].italic);
        assert_eq!(ir.blocks[0].text(), "Plain bold and italic.");
    }

    #[test]
    fn test_nested_bold_italic() {
        let ir = html_to_flat_ir("<p><b><i>both</i></b></p>");
        let span = &ir.blocks[0].spans[0];
        assert!(span.bold && span.italic);
    }

    #[test]
    fn test_links_carry_href() {
        let ir = html_to_flat_ir(r#"<p>See <a href="https://x.io/a">the docs</a> now</p>"#);
        let spans = &ir.blocks[0].spans;
        assert_eq!(spans[1].href.as_deref(), Some("https://x.io/a"));
        assert_eq!(spans[1].text, "the docs");
    }

    #[test]
    fn test_lists_ordered_and_nested() {
        let ir = html_to_flat_ir("<ol><li>one</li><li>two<ul><li>deep</li></ul></li></ol>");
        assert_eq!(ir.blocks.len(), 1);
        let list = &ir.blocks[0];
        assert_eq!(list.kind, FlatKind::List);
        assert!(list.is_ordered());
        assert_eq!(list.children.len(), 2);
        let nested = &list.children[1].children[0];
        assert_eq!(nested.kind, FlatKind::List);
        assert!(!nested.is_ordered());
        assert_eq!(nested.children[0].text(), "deep");
    }

    #[test]
    fn test_pre_becomes_codeblock() {
        let ir = html_to_flat_ir("<pre>let x = 1;\nlet y = 2;</pre>");
        assert_eq!(ir.blocks[0].kind, FlatKind::Codeblock);
        assert!(ir.blocks[0].spans[0].code);
        assert_eq!(ir.blocks[0].text(), "let x = 1;\nlet y = 2;");
    }

    #[test]
    fn test_table_rows_and_cells() {
        let ir = html_to_flat_ir(
            "<table><tr><th>H1</th><th>H2</th></tr><tr><td>a</td><td>b</td></tr></table>",
        );
        let table = &ir.blocks[0];
        assert_eq!(table.kind, FlatKind::Table);
        assert_eq!(table.children.len(), 2);
        assert_eq!(table.children[0].children[0].text(), "H1");
        assert_eq!(table.children[1].children[1].text(), "b");
    }

    #[test]
    fn test_script_and_style_skipped() {
        let ir = html_to_flat_ir("<p>keep</p><script>drop()</script><style>p{}</style>");
        assert_eq!(ir.blocks.len(), 1);
        assert_eq!(ir.blocks[0].text(), "keep");
    }

    #[test]
    fn test_div_soup_is_descended() {
        let ir = html_to_flat_ir("<div><div><p>inner</p></div></div>");
        assert_eq!(ir.blocks.len(), 1);
        assert_eq!(ir.blocks[0].text(), "inner");
    }

    #[test]
    fn test_img_becomes_figure_with_src() {
        let ir = html_to_flat_ir(r#"<img src="a.png" alt="chart">"#);
        assert_eq!(ir.blocks[0].kind, FlatKind::Figure);
        assert_eq!(
            ir.blocks[0].attrs.get("src").and_then(|v| v.as_str()),
            Some("a.png")
        );
    }

    #[test]
    fn test_text_to_flat_ir_splits_blank_lines() {
        let ir = text_to_flat_ir("First para\nstill first.\n\nSecond para.\n\n\n");
        assert_eq!(ir.blocks.len(), 2);
        assert_eq!(ir.blocks[0].text(), "First para still first.");
        assert_eq!(ir.blocks[1].text(), "Second para.");
    }

    #[test]
    fn test_whitespace_collapsed() {
        let ir = html_to_flat_ir("<p>a\n   lot   of\t\tspace</p>");
        assert_eq!(ir.blocks[0].text(), "a lot of space");
    }
}

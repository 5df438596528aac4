//! Main-content extraction for full web pages.
//!
//! News sites and blogs bury the article under navigation, sidebars and
//! footers. Extraction cascades and never errors:
//!
//! 1. semantic containers (`article`, `main`, role/id/class hints), then
//!    the densest remaining `div`, scored by paragraph text length;
//! 2. visible body text wrapped into paragraphs;
//! 3. the whole page converted as-is.

use log::debug;
use scraper::{ElementRef, Html, Selector};
use tarjoman_core::legacy::{FlatBlock, FlatIr};

use crate::html::html_to_flat_ir;

/// Minimum paragraph text (chars) for a container to count as the body.
const MIN_BODY_CHARS: usize = 200;

const CANDIDATE_SELECTORS: [&str; 7] = [
    "article",
    "main",
    "[role=\"main\"]",
    "#content",
    ".content",
    ".post-content",
    ".article-body",
];

/// Extracts the main article from a full HTML page into the flat IR.
#[must_use]
pub fn extract(html: &str) -> FlatIr {
    let dom = Html::parse_document(html);

    if let Some(candidate) = best_candidate(&dom) {
        let mut ir = html_to_flat_ir(&candidate.html());
        if !ir.blocks.is_empty() {
            prepend_title(&dom, &mut ir);
            debug!("article extraction: container path, {} blocks", ir.blocks.len());
            return ir;
        }
    }

    let text = visible_text(&dom);
    if text.len() >= MIN_BODY_CHARS {
        debug!("article extraction: visible-text fallback");
        let mut ir = crate::html::text_to_flat_ir(&text);
        prepend_title(&dom, &mut ir);
        return ir;
    }

    debug!("article extraction: whole-page passthrough");
    html_to_flat_ir(html)
}

fn parse_selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn best_candidate(dom: &Html) -> Option<ElementRef<'_>> {
    let mut best: Option<(usize, ElementRef<'_>)> = None;

    for css in CANDIDATE_SELECTORS {
        let Some(sel) = parse_selector(css) else { continue };
        for el in dom.select(&sel) {
            let score = paragraph_chars(el);
            if score >= MIN_BODY_CHARS && best.as_ref().map_or(true, |(s, _)| score > *s) {
                best = Some((score, el));
            }
        }
        // Semantic hits beat density scanning; stop at the first tier
        // that produced a usable container.
        if best.is_some() {
            return best.map(|(_, el)| el);
        }
    }

    if let Some(div_sel) = parse_selector("div") {
        for el in dom.select(&div_sel) {
            let score = direct_paragraph_chars(el);
            if score >= MIN_BODY_CHARS && best.as_ref().map_or(true, |(s, _)| score > *s) {
                best = Some((score, el));
            }
        }
    }
    best.map(|(_, el)| el)
}

/// Total paragraph text anywhere under the element.
fn paragraph_chars(el: ElementRef<'_>) -> usize {
    parse_selector("p").map_or(0, |p| {
        el.select(&p)
            .map(|para| para.text().map(str::len).sum::<usize>())
            .sum()
    })
}

/// Paragraph text in direct children only, so an outer wrapper does not
/// outscore the actual article div it contains.
fn direct_paragraph_chars(el: ElementRef<'_>) -> usize {
    el.children()
        .filter_map(ElementRef::wrap)
        .filter(|c| c.value().name() == "p")
        .map(|para| para.text().map(str::len).sum::<usize>())
        .sum()
}

fn visible_text(dom: &Html) -> String {
    let Some(body_sel) = parse_selector("body") else {
        return String::new();
    };
    let Some(body) = dom.select(&body_sel).next() else {
        return String::new();
    };
    let mut out = String::new();
    collect_visible(body, &mut out);
    out.trim().to_string()
}

fn collect_visible(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            let t = text.trim();
            if !t.is_empty() {
                if !out.is_empty() && !out.ends_with("\n\n") {
                    out.push(' ');
                }
                out.push_str(t);
            }
            continue;
        }
        let Some(child_el) = ElementRef::wrap(child) else { continue };
        match child_el.value().name() {
            "script" | "style" | "noscript" | "nav" | "header" | "footer" | "aside" => {}
            "p" | "div" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "li" => {
                if !out.is_empty() {
                    out.push_str("\n\n");
                }
                collect_visible(child_el, out);
            }
            _ => collect_visible(child_el, out),
        }
    }
}

/// Ensures the IR opens with the page title when the body itself lacks a
/// top-level heading.
fn prepend_title(dom: &Html, ir: &mut FlatIr) {
    let has_heading = ir
        .blocks
        .first()
        .is_some_and(|b| b.kind == tarjoman_core::legacy::FlatKind::Heading);
    if has_heading {
        return;
    }
    let title = parse_selector("title")
        .and_then(|sel| dom.select(&sel).next())
        .map(|t| t.text().collect::<String>())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    if let Some(title) = title {
        ir.blocks.insert(0, FlatBlock::heading(1, title));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tarjoman_core::legacy::FlatKind;

    fn page(body: &str) -> String {
        format!("<html><head><title>Page Title</title></head><body>{body}</body></html>")
    }

    #[test]
    fn test_article_container_wins_over_chrome() {
        let filler = "Article sentence with enough words to count toward density. ".repeat(8);
        let html = page(&format!(
            "<nav><a href=\"/\">Home</a></nav>\
             <article><h1>Real Story</h1><p>{filler}</p></article>\
             <footer><p>copyright</p></footer>"
        ));
        let ir = extract(&html);
        assert_eq!(ir.blocks[0].kind, FlatKind::Heading);
        assert_eq!(ir.blocks[0].text(), "Real Story");
        assert!(ir.blocks.iter().all(|b| !b.text().contains("copyright")));
    }

    #[test]
    fn test_dense_div_selected_without_semantic_tags() {
        let filler = "Body paragraph text that keeps going for a while longer here. ".repeat(8);
        let html = page(&format!(
            "<div class=\"sidebar\"><p>short</p></div>\
             <div class=\"story\"><p>{filler}</p><p>{filler}</p></div>"
        ));
        let ir = extract(&html);
        let total: String = ir.blocks.iter().map(|b| b.text()).collect();
        assert!(total.contains("Body paragraph text"));
        assert!(!total.contains("short"));
    }

    #[test]
    fn test_title_prepended_when_no_heading() {
        let filler = "Long enough article body text for the density threshold. ".repeat(8);
        let html = page(&format!("<article><p>{filler}</p></article>"));
        let ir = extract(&html);
        assert_eq!(ir.blocks[0].kind, FlatKind::Heading);
        assert_eq!(ir.blocks[0].text(), "Page Title");
    }

    #[test]
    fn test_sparse_page_passthrough_never_empty() {
        let ir = extract(&page("<p>tiny</p>"));
        assert!(!ir.blocks.is_empty());
        let total: String = ir.blocks.iter().map(|b| b.text()).collect();
        assert!(total.contains("tiny"));
    }

    #[test]
    fn test_extract_never_panics_on_garbage() {
        let ir = extract("<<<>>> not really html &&&");
        let _ = ir.blocks;
    }
}

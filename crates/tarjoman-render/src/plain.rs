//! Plain-text rendering for the terminal output path.

use tarjoman_core::document::{Block, CellBlock, Document};
use tarjoman_core::legacy::{FlatBlock, FlatIr, FlatKind};

/// Renders a layout-aware document as readable plain text.
#[must_use]
pub fn render_plain(document: &Document) -> String {
    let mut out = String::new();
    for section in &document.sections {
        if let Some(header) = &section.header {
            for block in &header.blocks {
                push_line(&mut out, &block.text());
            }
            if !header.blocks.is_empty() {
                out.push('\n');
            }
        }
        for block in &section.blocks {
            match block {
                Block::Heading(h) => {
                    push_line(&mut out, &h.text().to_uppercase());
                    out.push('\n');
                }
                Block::Paragraph(p) => {
                    push_line(&mut out, &p.text());
                    out.push('\n');
                }
                Block::ListItem(li) => {
                    let marker = if li.ordered { "1." } else { "-" };
                    let indent = "  ".repeat(li.level);
                    push_line(&mut out, &format!("{indent}{marker} {}", li.text()));
                }
                Block::Table(table) => {
                    for row in &table.rows {
                        let cells: Vec<String> = row
                            .cells
                            .iter()
                            .map(|c| {
                                c.blocks
                                    .iter()
                                    .map(CellBlock::text)
                                    .collect::<Vec<_>>()
                                    .join(" ")
                            })
                            .collect();
                        push_line(&mut out, &cells.join(" | "));
                    }
                    out.push('\n');
                }
                Block::Figure(figure) => {
                    let caption = figure
                        .caption
                        .as_ref()
                        .map_or_else(|| figure.image_id.clone(), |c| c.text());
                    push_line(&mut out, &format!("[image: {caption}]"));
                }
                Block::Textbox(tb) => {
                    for inner in &tb.blocks {
                        push_line(&mut out, &inner.text());
                    }
                    out.push('\n');
                }
            }
        }
        if let Some(footer) = &section.footer {
            for block in &footer.blocks {
                push_line(&mut out, &block.text());
            }
        }
    }
    out.trim_end().to_string() + "\n"
}

/// Renders a flat IR document as readable plain text.
#[must_use]
pub fn render_plain_flat(ir: &FlatIr) -> String {
    let mut out = String::new();
    for block in &ir.blocks {
        render_flat(block, 0, &mut out);
    }
    out.trim_end().to_string() + "\n"
}

fn render_flat(block: &FlatBlock, depth: usize, out: &mut String) {
    match block.kind {
        FlatKind::Heading => {
            push_line(out, &block.text().to_uppercase());
            out.push('\n');
        }
        FlatKind::Paragraph | FlatKind::Blockquote => {
            push_line(out, &block.text());
            out.push('\n');
        }
        FlatKind::List => {
            for (i, child) in block.children.iter().enumerate() {
                let marker = if block.is_ordered() {
                    format!("{}.", i + 1)
                } else {
                    "-".to_string()
                };
                let indent = "  ".repeat(depth);
                push_line(out, &format!("{indent}{marker} {}", child.text()));
                for grandchild in &child.children {
                    render_flat(grandchild, depth + 1, out);
                }
            }
            out.push('\n');
        }
        FlatKind::ListItem => {
            let indent = "  ".repeat(depth);
            push_line(out, &format!("{indent}- {}", block.text()));
        }
        FlatKind::Table => {
            for row in &block.children {
                let cells: Vec<String> = row.children.iter().map(FlatBlock::text).collect();
                push_line(out, &cells.join(" | "));
            }
            out.push('\n');
        }
        FlatKind::TableRow | FlatKind::TableCell => {}
        FlatKind::Codeblock => {
            push_line(out, &block.text());
            out.push('\n');
        }
        FlatKind::Figure => {
            let alt = block
                .attrs
                .get("alt")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("image");
            push_line(out, &format!("[image: {alt}]"));
        }
        FlatKind::Hr => {
            push_line(out, "----");
            out.push('\n');
        }
    }
}

fn push_line(out: &mut String, line: &str) {
    let trimmed = line.trim_end();
    if trimmed.is_empty() {
        return;
    }
    out.push_str(trimmed);
    out.push('\n');
}

//! Flat block IR used by the HTML/URL ingestion path.
//!
//! Predates the layout-aware model in [`crate::document`] and survives
//! because web articles have no page geometry worth modelling: a shallow
//! tree of typed blocks with inline spans is enough for the translate and
//! HTML render paths. Block ids are opaque tags for traceability across
//! the translate step and carry no ordering meaning.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Block kind tags for the flat IR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlatKind {
    Heading,
    Paragraph,
    List,
    ListItem,
    Table,
    TableRow,
    TableCell,
    Figure,
    Blockquote,
    Codeblock,
    Hr,
}

/// Inline text run with the formatting subset the tagged codec carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineSpan {
    pub text: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub italic: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub code: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

fn is_false(v: &bool) -> bool {
    !v
}

impl InlineSpan {
    /// Creates an unformatted span.
    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// One node in the flat block tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatBlock {
    /// Opaque 12-hex id assigned at creation.
    pub id: String,
    #[serde(rename = "type")]
    pub kind: FlatKind,
    /// Heading level or list nesting depth where applicable.
    #[serde(default)]
    pub level: u8,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spans: Vec<InlineSpan>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FlatBlock>,
    /// Kind-specific extras, e.g. `ordered` on lists, `src` on figures.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, serde_json::Value>,
}

/// Generates a fresh 12-hex block id.
#[must_use]
pub fn new_id() -> String {
    Uuid::new_v4().simple().to_string()[..12].to_string()
}

impl FlatBlock {
    /// Creates an empty block of the given kind with a fresh id.
    #[must_use]
    pub fn new(kind: FlatKind) -> Self {
        Self {
            id: new_id(),
            kind,
            level: 0,
            spans: Vec::new(),
            children: Vec::new(),
            attrs: BTreeMap::new(),
        }
    }

    /// Heading of the given level holding one plain span.
    #[must_use]
    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Self {
            level,
            spans: vec![InlineSpan::plain(text)],
            ..Self::new(FlatKind::Heading)
        }
    }

    /// Paragraph from spans.
    #[must_use]
    pub fn paragraph(spans: Vec<InlineSpan>) -> Self {
        Self {
            spans,
            ..Self::new(FlatKind::Paragraph)
        }
    }

    /// List container; `ordered` is recorded in attrs.
    #[must_use]
    pub fn list(ordered: bool, children: Vec<FlatBlock>) -> Self {
        let mut block = Self::new(FlatKind::List);
        block
            .attrs
            .insert("ordered".to_string(), serde_json::Value::Bool(ordered));
        block.children = children;
        block
    }

    /// List item from spans.
    #[must_use]
    pub fn list_item(spans: Vec<InlineSpan>) -> Self {
        Self {
            spans,
            ..Self::new(FlatKind::ListItem)
        }
    }

    /// Code block holding a single code span.
    #[must_use]
    pub fn codeblock(code: impl Into<String>) -> Self {
        Self {
            spans: vec![InlineSpan {
                text: code.into(),
                code: true,
                ..InlineSpan::default()
            }],
            ..Self::new(FlatKind::Codeblock)
        }
    }

    /// True when the list container is ordered per its attrs.
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        self.attrs
            .get("ordered")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }

    /// Concatenated span text of this block only.
    #[must_use]
    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }
}

/// Root of the flat IR: top-level blocks plus document attrs
/// (`lang`, `dir`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlatIr {
    pub blocks: Vec<FlatBlock>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, serde_json::Value>,
}

impl FlatIr {
    /// Creates an IR from top-level blocks.
    #[must_use]
    pub fn new(blocks: Vec<FlatBlock>) -> Self {
        Self {
            blocks,
            attrs: BTreeMap::new(),
        }
    }

    /// Records the document language code in attrs.
    pub fn set_lang(&mut self, code: &str) {
        self.attrs.insert(
            "lang".to_string(),
            serde_json::Value::String(code.to_string()),
        );
    }

    /// Records the document base direction (`"ltr"`/`"rtl"`) in attrs.
    pub fn set_dir(&mut self, dir: &str) {
        self.attrs.insert(
            "dir".to_string(),
            serde_json::Value::String(dir.to_string()),
        );
    }

    /// Document language code, if recorded.
    #[must_use]
    pub fn lang(&self) -> Option<&str> {
        self.attrs.get("lang").and_then(serde_json::Value::as_str)
    }

    /// Depth-first iteration over all blocks.
    pub fn walk(&self) -> impl Iterator<Item = &FlatBlock> {
        fn push<'a>(block: &'a FlatBlock, out: &mut Vec<&'a FlatBlock>) {
            out.push(block);
            for child in &block.children {
                push(child, out);
            }
        }
        let mut out = Vec::new();
        for block in &self.blocks {
            push(block, &mut out);
        }
        out.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_id_is_12_hex() {
        let id = new_id();
        assert_eq!(id.len(), 12);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(new_id(), new_id());
    }

    #[test]
    fn test_list_ordered_in_attrs() {
        let list = FlatBlock::list(true, vec![FlatBlock::list_item(vec![])]);
        assert!(list.is_ordered());
        assert!(!FlatBlock::list(false, vec![]).is_ordered());
    }

    #[test]
    fn test_codeblock_single_code_span() {
        let block = FlatBlock::codeblock("let x = 1;");
        assert_eq!(block.spans.len(), 1);
        assert!(block.spans[0].code);
        assert_eq!(block.text(), "let x = 1;");
    }

    #[test]
    fn test_walk_visits_children_depth_first() {
        let ir = FlatIr::new(vec![
            FlatBlock::heading(1, "Top"),
            FlatBlock::list(
                false,
                vec![
                    FlatBlock::list_item(vec![InlineSpan::plain("a")]),
                    FlatBlock::list_item(vec![InlineSpan::plain("b")]),
                ],
            ),
        ]);
        let texts: Vec<String> = ir.walk().map(FlatBlock::text).collect();
        assert_eq!(texts, vec!["Top", "", "a", "b"]);
    }

    #[test]
    fn test_serde_roundtrip_preserves_attrs() {
        let mut ir = FlatIr::new(vec![FlatBlock::paragraph(vec![InlineSpan::plain("hi")])]);
        ir.set_lang("fa");
        ir.set_dir("rtl");
        let json = serde_json::to_string(&ir).unwrap();
        let back: FlatIr = serde_json::from_str(&json).unwrap();
        assert_eq!(back.lang(), Some("fa"));
        assert_eq!(back.blocks[0].text(), "hi");
    }
}

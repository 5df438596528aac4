//! Prompt assembly for the translation capability.

use tarjoman_core::document::GlossaryEntry;
use tarjoman_core::lang::Lang;

/// Glossary entries beyond this are dropped from the prompt.
pub const MAX_GLOSSARY_TERMS: usize = 40;

/// Builds the fixed system instructions for translating tagged text into
/// `target`, with glossary pairs appended.
#[must_use]
pub fn build_instructions(target: Lang, glossary: &[GlossaryEntry]) -> String {
    let mut out = format!(
        "You are a professional document translator. Translate the user's text into {}.\n\
         Rules:\n\
         - Preserve every bracket tag such as [B], [/B], [I], [/I], [U], [/U], [CODE], [/CODE] \
         and [A href=\"...\"] exactly as given, around the corresponding translated words.\n\
         - Do not translate code, URLs, email addresses, or identifiers.\n\
         - Do not summarize, omit, or add content. Translate everything.\n\
         - Keep numbers, dates, and proper nouns accurate.\n",
        target.name()
    );
    if target.is_rtl() {
        out.push_str("- The target language is written right-to-left; produce natural RTL prose.\n");
    }

    let capped = &glossary[..glossary.len().min(MAX_GLOSSARY_TERMS)];
    if !capped.is_empty() {
        out.push_str("\nUse these exact term translations:\n");
        for entry in capped {
            out.push_str(&format!("- \"{}\" -> \"{}\"\n", entry.source, entry.target));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(source: &str, target: &str) -> GlossaryEntry {
        GlossaryEntry {
            source: source.to_string(),
            target: target.to_string(),
            case_sensitive: false,
            exact: false,
        }
    }

    #[test]
    fn test_instructions_name_target_language() {
        let text = build_instructions(Lang::Fa, &[]);
        assert!(text.contains("Persian"));
        assert!(text.contains("right-to-left"));
        assert!(text.contains("[CODE]"));
    }

    #[test]
    fn test_ltr_target_skips_rtl_rule() {
        let text = build_instructions(Lang::De, &[]);
        assert!(text.contains("German"));
        assert!(!text.contains("right-to-left"));
    }

    #[test]
    fn test_glossary_terms_included() {
        let text = build_instructions(Lang::Fa, &[entry("invoice", "فاکتور")]);
        assert!(text.contains("\"invoice\" -> \"فاکتور\""));
    }

    #[test]
    fn test_glossary_capped() {
        let entries: Vec<GlossaryEntry> = (0..60)
            .map(|i| entry(&format!("term{i}"), &format!("t{i}")))
            .collect();
        let text = build_instructions(Lang::Fa, &entries);
        assert!(text.contains("term39"));
        assert!(!text.contains("term40"));
    }
}

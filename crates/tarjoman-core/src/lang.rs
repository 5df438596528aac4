//! Character-set language routing and RTL detection.
//!
//! This is routing, not identification: the pipeline only needs to pick a
//! prompt language and a base direction, so membership counting over a
//! bounded sample is enough. Statistical language ID is out of scope.

use std::fmt;
use std::str::FromStr;

use crate::document::Document;
use crate::legacy::FlatIr;

/// Languages the router distinguishes. Everything unrecognized is `En`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Lang {
    #[default]
    En,
    Fa,
    Ru,
    Fr,
    De,
}

impl Lang {
    /// ISO 639-1 code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Fa => "fa",
            Self::Ru => "ru",
            Self::Fr => "fr",
            Self::De => "de",
        }
    }

    /// Human-readable English name, used in prompt instructions.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Fa => "Persian",
            Self::Ru => "Russian",
            Self::Fr => "French",
            Self::De => "German",
        }
    }

    /// True for right-to-left languages.
    #[must_use]
    pub const fn is_rtl(self) -> bool {
        matches!(self, Self::Fa)
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Lang {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Self::En),
            "fa" | "per" | "persian" | "farsi" => Ok(Self::Fa),
            "ru" | "russian" => Ok(Self::Ru),
            "fr" | "french" => Ok(Self::Fr),
            "de" | "german" => Ok(Self::De),
            other => Err(format!("unknown language: {other}")),
        }
    }
}

/// Max blocks sampled for detection.
const SAMPLE_BLOCKS: usize = 30;
/// Max chars fed to the counter.
const SAMPLE_CHARS: usize = 2000;

/// Detects the dominant language of an IR v2 document.
#[must_use]
pub fn detect_language(document: &Document) -> Lang {
    let sample: String = document
        .blocks()
        .take(SAMPLE_BLOCKS)
        .map(|b| b.text())
        .collect::<Vec<_>>()
        .join(" ");
    detect_text(&sample)
}

/// Detects the dominant language of a flat IR document.
#[must_use]
pub fn detect_flat(ir: &FlatIr) -> Lang {
    let sample: String = ir
        .walk()
        .take(SAMPLE_BLOCKS)
        .map(|b| b.text())
        .collect::<Vec<_>>()
        .join(" ");
    detect_text(&sample)
}

/// Character-set routing over a text sample.
#[must_use]
pub fn detect_text(text: &str) -> Lang {
    let mut alphabetic = 0usize;
    let mut arabic = 0usize;
    let mut cyrillic = 0usize;
    let mut french = 0usize;
    let mut german = 0usize;

    for ch in text.chars().take(SAMPLE_CHARS) {
        if !ch.is_alphabetic() {
            continue;
        }
        alphabetic += 1;
        match ch as u32 {
            0x0600..=0x06FF | 0x0750..=0x077F | 0x08A0..=0x08FF => arabic += 1,
            0x0400..=0x04FF => cyrillic += 1,
            _ => match ch.to_lowercase().next().unwrap_or(ch) {
                'à' | 'â' | 'ç' | 'é' | 'è' | 'ê' | 'ë' | 'î' | 'ï' | 'ô' | 'ù' | 'û'
                | 'œ' => french += 1,
                'ä' | 'ö' | 'ü' | 'ß' => german += 1,
                _ => {}
            },
        }
    }

    if alphabetic == 0 {
        return Lang::En;
    }
    // Script-level signals dominate; diacritic counts only disambiguate
    // among Latin-script candidates.
    if arabic * 10 > alphabetic * 3 {
        return Lang::Fa;
    }
    if cyrillic * 10 > alphabetic * 3 {
        return Lang::Ru;
    }
    if german >= 2 && german >= french {
        return Lang::De;
    }
    if french >= 2 {
        return Lang::Fr;
    }
    Lang::En
}

/// True when the text contains any strong RTL character
/// (Hebrew, Arabic, Arabic Supplement, Arabic Extended-A blocks).
#[must_use]
pub fn is_rtl_text(text: &str) -> bool {
    text.chars().any(|ch| {
        matches!(
            ch as u32,
            0x0590..=0x05FF | 0x0600..=0x06FF | 0x0750..=0x077F | 0x08A0..=0x08FF
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Block, DocumentMeta, Paragraph, Section};

    #[test]
    fn test_detect_persian() {
        assert_eq!(detect_text("این یک سند فارسی است که باید ترجمه شود"), Lang::Fa);
    }

    #[test]
    fn test_detect_russian() {
        assert_eq!(detect_text("Это русский документ для перевода"), Lang::Ru);
    }

    #[test]
    fn test_detect_french_by_diacritics() {
        assert_eq!(detect_text("Le président a été élu à la majorité"), Lang::Fr);
    }

    #[test]
    fn test_detect_german_by_diacritics() {
        assert_eq!(detect_text("Die Überprüfung der Maßnahmen für München"), Lang::De);
    }

    #[test]
    fn test_plain_ascii_defaults_to_english() {
        assert_eq!(detect_text("Just an ordinary English sentence."), Lang::En);
        assert_eq!(detect_text(""), Lang::En);
        assert_eq!(detect_text("12345 !!"), Lang::En);
    }

    #[test]
    fn test_single_loanword_does_not_flip_language() {
        assert_eq!(detect_text("We visited the café near the station"), Lang::En);
    }

    #[test]
    fn test_detect_language_samples_document_blocks() {
        let doc = Document::new(
            DocumentMeta::default(),
            vec![Section::with_blocks(
                0,
                vec![Block::Paragraph(Paragraph::text_block(
                    "متن فارسی برای آزمایش تشخیص زبان",
                ))],
            )],
        );
        assert_eq!(detect_language(&doc), Lang::Fa);
    }

    #[test]
    fn test_is_rtl_text() {
        assert!(is_rtl_text("سلام"));
        assert!(is_rtl_text("שלום"));
        assert!(is_rtl_text("mixed سلام text"));
        assert!(!is_rtl_text("hello world"));
        assert!(!is_rtl_text(""));
    }

    #[test]
    fn test_lang_from_str_and_code() {
        assert_eq!("fa".parse::<Lang>().ok(), Some(Lang::Fa));
        assert_eq!("Persian".parse::<Lang>().ok(), Some(Lang::Fa));
        assert_eq!("EN".parse::<Lang>().ok(), Some(Lang::En));
        assert!("xx".parse::<Lang>().is_err());
        assert_eq!(Lang::Ru.code(), "ru");
        assert!(Lang::Fa.is_rtl());
        assert!(!Lang::De.is_rtl());
    }
}

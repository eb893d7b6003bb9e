//! Language utilities for subtitle language tags and ISO codes
//!
//! Catalog records carry compact tags such as `en`, `en:hi` or `pt:forced`.
//! The translation service wants its own spelling for a few codes and history
//! messages want human-readable names.

use anyhow::{Result, anyhow};
use isolang::Language;
use std::fmt;

/// Code used when a language could not be determined
pub const UNDETERMINED: &str = "und";

/// ISO 639-2/B codes that differ from their ISO 639-2/T counterpart
const PART2B_TO_PART2T: &[(&str, &str)] = &[
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

/// Codes the translation service spells differently
const SERVICE_CODE_REMAP: &[(&str, &str)] = &[
    ("he", "iw"),
    ("zh", "zh-CN"),
    ("zt", "zh-TW"),
];

/// Decoded catalog language tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageTag {
    /// Lower-case language code, `und` when the tag was empty
    pub code: String,
    /// Hearing-impaired variant
    pub hi: bool,
    /// Forced variant
    pub forced: bool,
}

impl LanguageTag {
    /// Parse a compact tag like `en`, `en:hi` or `en:forced`
    ///
    /// Only the first modifier is honoured; unknown modifiers are ignored.
    pub fn parse(tag: &str) -> Self {
        let mut parts = tag.trim().split(':');
        let code = parts.next().unwrap_or_default().trim().to_lowercase();
        let modifier = parts.next().map(|m| m.trim().to_lowercase());

        Self {
            code: if code.is_empty() { UNDETERMINED.to_string() } else { code },
            hi: modifier.as_deref() == Some("hi"),
            forced: modifier.as_deref() == Some("forced"),
        }
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)?;
        if self.hi {
            write!(f, ":hi")?;
        } else if self.forced {
            write!(f, ":forced")?;
        }
        Ok(())
    }
}

/// Map a code to the spelling the translation service expects
pub fn to_service_code(code: &str) -> String {
    SERVICE_CODE_REMAP
        .iter()
        .find(|(ours, _)| *ours == code)
        .map(|(_, theirs)| theirs.to_string())
        .unwrap_or_else(|| code.to_string())
}

fn part2b_to_part2t(code: &str) -> Option<&'static str> {
    PART2B_TO_PART2T
        .iter()
        .find(|(b, _)| *b == code)
        .map(|(_, t)| *t)
}

/// Normalize a language code to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(code: &str) -> Result<String> {
    let normalized_code = code.trim().to_lowercase();

    if normalized_code.len() == 2 {
        if let Some(lang) = Language::from_639_1(&normalized_code) {
            return Ok(lang.to_639_3().to_string());
        }
    } else if normalized_code.len() == 3 {
        if Language::from_639_3(&normalized_code).is_some() {
            return Ok(normalized_code);
        }
        if let Some(part2t) = part2b_to_part2t(&normalized_code) {
            return Ok(part2t.to_string());
        }
    }

    Err(anyhow!("Cannot normalize invalid language code: {}", code))
}

/// Normalize a language code to ISO 639-1 (2-letter) format if possible
/// Falls back to ISO 639-2/T if no ISO 639-1 code exists
pub fn normalize_to_part1_or_part2t(code: &str) -> Result<String> {
    let part2t = normalize_to_part2t(code)?;
    let lang = Language::from_639_3(&part2t)
        .ok_or_else(|| anyhow!("Cannot normalize invalid language code: {}", code))?;

    Ok(lang
        .to_639_1()
        .map(|c| c.to_string())
        .unwrap_or(part2t))
}

/// Check if two language codes match (represent the same language)
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (normalize_to_part2t(code1), normalize_to_part2t(code2)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Get the language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let normalized = normalize_to_part2t(code)?;
    let lang = Language::from_639_3(&normalized)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", normalized))?;

    Ok(lang.to_name().to_string())
}

/// Language name for display, falling back to the raw code
pub fn display_name(code: &str) -> String {
    get_language_name(code).unwrap_or_else(|_| code.to_string())
}

/*!
 * Language guessing for subtitle samples.
 *
 * Detection is an external capability, so the resolver only depends on the
 * `LanguageDetector` trait. `HeuristicLanguageDetector` is the built-in
 * implementation: it classifies non-Latin scripts by Unicode block and Latin
 * languages by function-word frequency.
 */

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use super::encoding;

/// Guess the language of a raw subtitle sample
pub trait LanguageDetector: Send + Sync {
    /// Return a lower-case language code, or `None` when unsure
    fn detect(&self, sample: &[u8]) -> Option<String>;
}

static TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>|\{[^}]*\}").unwrap());

/// Function words per Latin-script language
static STOPWORDS: &[(&str, &[&str])] = &[
    ("en", &[
        "the", "and", "you", "that", "is", "to", "of", "it", "what", "this", "are", "have",
        "was", "not", "with", "for", "my", "he", "she", "we", "they", "your", "don't", "i'm",
        "it's", "there", "just", "know",
    ]),
    ("fr", &[
        "le", "les", "et", "est", "vous", "je", "pas", "que", "une", "des", "du", "pour",
        "qui", "dans", "ce", "il", "elle", "nous", "mais", "avec", "c'est", "oui", "très",
        "suis", "tu", "moi",
    ]),
    ("es", &[
        "el", "los", "las", "y", "es", "que", "no", "por", "una", "con", "para", "lo",
        "pero", "qué", "está", "sí", "muy", "yo", "tú", "usted", "esto", "eso", "estoy",
        "aquí",
    ]),
    ("de", &[
        "der", "die", "das", "und", "ist", "nicht", "ich", "sie", "du", "wir", "ein", "eine",
        "zu", "es", "mit", "auf", "was", "ja", "mir", "dich", "haben", "auch", "bin", "hier",
    ]),
    ("it", &[
        "il", "che", "di", "non", "è", "per", "sono", "mi", "ti", "ma", "come", "cosa",
        "questo", "perché", "io", "sei", "gli", "della", "bene", "lei",
    ]),
    ("pt", &[
        "o", "os", "as", "que", "não", "é", "um", "uma", "para", "com", "você", "eu", "isso",
        "está", "muito", "mas", "do", "da", "sim", "obrigado", "vamos",
    ]),
    ("nl", &[
        "de", "het", "een", "en", "is", "niet", "ik", "je", "dat", "wat", "van", "op",
        "zijn", "we", "maar", "met", "ze", "hij", "dit", "er",
    ]),
];

/// Built-in detector: Unicode script blocks first, then Latin stopwords
#[derive(Debug, Clone)]
pub struct HeuristicLanguageDetector {
    /// Minimum stopword hits before a Latin-script guess is trusted
    min_hits: usize,
}

impl Default for HeuristicLanguageDetector {
    fn default() -> Self {
        Self { min_hits: 3 }
    }
}

impl HeuristicLanguageDetector {
    /// Create a detector with a custom stopword threshold
    pub fn with_min_hits(min_hits: usize) -> Self {
        Self { min_hits: min_hits.max(1) }
    }

    /// Guess the language of already-decoded text
    pub fn detect_text(&self, text: &str) -> Option<String> {
        let text = strip_subtitle_markup(text);

        if let Some(code) = detect_by_script(&text) {
            return Some(code.to_string());
        }

        self.detect_by_stopwords(&text)
    }

    fn detect_by_stopwords(&self, text: &str) -> Option<String> {
        let lowered = text.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !(c.is_alphabetic() || c == '\''))
            .filter(|w| !w.is_empty())
            .collect();

        if words.is_empty() {
            return None;
        }

        let mut scores: HashMap<&'static str, usize> = HashMap::new();
        for word in &words {
            for (code, list) in STOPWORDS {
                if list.contains(word) {
                    *scores.entry(*code).or_default() += 1;
                }
            }
        }

        let mut ranked: Vec<(&'static str, usize)> = scores.into_iter().collect();
        // Highest score first; code order breaks ties so results are stable
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));

        match ranked.as_slice() {
            [(code, hits), rest @ ..] if *hits >= self.min_hits => {
                if rest.first().is_some_and(|(_, runner_up)| runner_up == hits) {
                    None
                } else {
                    Some(code.to_string())
                }
            }
            _ => None,
        }
    }
}

impl LanguageDetector for HeuristicLanguageDetector {
    fn detect(&self, sample: &[u8]) -> Option<String> {
        let (text, _) = encoding::decode(sample);
        self.detect_text(&text)
    }
}

/// Drop cue numbers, timing lines and formatting tags
fn strip_subtitle_markup(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.contains("-->"))
        .filter(|line| !line.chars().all(|c| c.is_ascii_digit()))
        .map(|line| TAG_REGEX.replace_all(line, " ").into_owned())
        .collect::<Vec<_>>()
        .join("\n")
}

fn detect_by_script(text: &str) -> Option<&'static str> {
    let mut letters = 0usize;
    let mut counts: HashMap<&'static str, usize> = HashMap::new();
    let mut ukrainian_marks = 0usize;

    for c in text.chars().filter(|c| c.is_alphabetic()) {
        letters += 1;
        let script = match c {
            '\u{AC00}'..='\u{D7AF}' | '\u{1100}'..='\u{11FF}' => "ko",
            '\u{3040}'..='\u{309F}' | '\u{30A0}'..='\u{30FF}' => "ja",
            '\u{4E00}'..='\u{9FFF}' => "zh",
            '\u{0400}'..='\u{04FF}' => {
                if matches!(c, 'і' | 'ї' | 'є' | 'ґ' | 'І' | 'Ї' | 'Є' | 'Ґ') {
                    ukrainian_marks += 1;
                }
                "ru"
            }
            '\u{0370}'..='\u{03FF}' => "el",
            '\u{0600}'..='\u{06FF}' => "ar",
            '\u{0590}'..='\u{05FF}' => "he",
            '\u{0E00}'..='\u{0E7F}' => "th",
            _ => continue,
        };
        *counts.entry(script).or_default() += 1;
    }

    if letters == 0 {
        return None;
    }

    // Japanese mixes kana with Han ideographs, so any real kana share wins
    let kana = counts.get("ja").copied().unwrap_or(0);
    if kana * 10 >= letters {
        return Some("ja");
    }

    let (script, count) = counts
        .into_iter()
        .filter(|(script, _)| *script != "ja")
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))?;

    if count * 10 < letters * 3 {
        return None;
    }

    if script == "ru" && ukrainian_marks > 0 {
        return Some("uk");
    }

    Some(script)
}

/*!
 * Decoding of the catalog's stored subtitle column.
 *
 * Two encodings exist in the wild:
 * - structured: a JSON array of `[lang, path, size]` arrays or
 *   `{ "language": .., "path": .. }` objects
 * - legacy: the same data written as a Python literal, with single-quoted
 *   strings, tuples, `None`, `True` and `False`
 *
 * Both are turned into one `serde_json::Value` shape first and then into
 * `SubtitleCandidate`s, so the resolver sees a single representation.
 */

use anyhow::{Result, anyhow};
use log::{debug, warn};
use serde_json::{Map, Number, Value};

use crate::resolver::SubtitleCandidate;

/// Stored subtitle column, tagged by encoding
#[derive(Debug, Clone, PartialEq)]
pub enum StoredSubtitles {
    /// Nothing stored
    Empty,
    /// JSON array
    Structured(Vec<Value>),
    /// Python literal text
    Legacy(String),
}

impl StoredSubtitles {
    /// Classify a raw column value
    pub fn from_column(raw: Option<&str>) -> Self {
        let raw = match raw.map(str::trim) {
            None | Some("") => return Self::Empty,
            Some(raw) => raw,
        };

        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Array(items)) => Self::Structured(items),
            Ok(Value::Null) => Self::Empty,
            _ => Self::Legacy(raw.to_string()),
        }
    }

    /// Decode into candidates. Malformed elements are skipped and an
    /// undecodable column yields an empty list.
    pub fn decode(&self) -> Vec<SubtitleCandidate> {
        let items = match self {
            Self::Empty => return Vec::new(),
            Self::Structured(items) => items.clone(),
            Self::Legacy(text) => match parse_python_literal(text) {
                Ok(Value::Array(items)) => items,
                Ok(other) => {
                    warn!("Stored subtitles are not a list: {}", other);
                    return Vec::new();
                }
                Err(e) => {
                    warn!("Failed to parse stored subtitles: {}", e);
                    return Vec::new();
                }
            },
        };

        items.iter().filter_map(decode_element).collect()
    }
}

/// Classify and decode in one step
pub fn decode_stored_subtitles(raw: Option<&str>) -> Vec<SubtitleCandidate> {
    StoredSubtitles::from_column(raw).decode()
}

fn decode_element(item: &Value) -> Option<SubtitleCandidate> {
    let candidate = match item {
        Value::Array(parts) if parts.len() >= 2 => {
            let tag = parts[0].as_str()?;
            let path = parts[1].as_str()?;
            SubtitleCandidate::from_tag(tag, path)
        }
        Value::Object(fields) => {
            let tag = fields.get("language")?.as_str()?;
            let path = fields.get("path")?.as_str()?;
            SubtitleCandidate::from_tag(tag, path).map(|mut c| {
                let flag = |key: &str| fields.get(key).and_then(Value::as_bool).unwrap_or(false);
                c.hearing_impaired |= flag("hi");
                c.forced |= flag("forced");
                c
            })
        }
        _ => None,
    };

    if candidate.is_none() {
        debug!("Skipping malformed stored subtitle: {}", item);
    }
    candidate
}

/// Parse a Python literal (lists, tuples, dicts, strings, numbers, `None`,
/// `True`, `False`) into a JSON value. Tuples become arrays.
pub fn parse_python_literal(text: &str) -> Result<Value> {
    let mut parser = LiteralParser { chars: text.chars().collect(), pos: 0, depth: 0 };
    let value = parser.value()?;
    parser.skip_whitespace();
    if parser.pos < parser.chars.len() {
        return Err(anyhow!("Trailing characters at offset {}", parser.pos));
    }
    Ok(value)
}

/// Deepest list/tuple/dict nesting accepted
const MAX_LITERAL_DEPTH: usize = 64;

struct LiteralParser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl LiteralParser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        self.pos += 1;
        c
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn value(&mut self) -> Result<Value> {
        self.skip_whitespace();
        match self.peek() {
            Some('[') => self.nested(|p| p.sequence(']')),
            Some('(') => self.nested(|p| p.sequence(')')),
            Some('{') => self.nested(Self::dict),
            Some('\'') | Some('"') => self.string().map(Value::String),
            Some(c) if c == '-' || c == '+' || c.is_ascii_digit() => self.number(),
            Some(c) if c.is_ascii_alphabetic() => self.word(),
            Some(c) => Err(anyhow!("Unexpected character '{}' at offset {}", c, self.pos)),
            None => Err(anyhow!("Unexpected end of input")),
        }
    }

    fn nested(&mut self, parse: impl FnOnce(&mut Self) -> Result<Value>) -> Result<Value> {
        if self.depth >= MAX_LITERAL_DEPTH {
            return Err(anyhow!("Nesting deeper than {} at offset {}", MAX_LITERAL_DEPTH, self.pos));
        }
        self.depth += 1;
        let value = parse(self);
        self.depth -= 1;
        value
    }

    fn sequence(&mut self, close: char) -> Result<Value> {
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok(Value::Array(items));
            }
            items.push(self.value()?);
            self.skip_whitespace();
            match self.bump() {
                Some(',') => continue,
                Some(c) if c == close => return Ok(Value::Array(items)),
                other => return Err(anyhow!("Expected ',' or '{}', found {:?}", close, other)),
            }
        }
    }

    fn dict(&mut self) -> Result<Value> {
        self.pos += 1;
        let mut map = Map::new();
        loop {
            self.skip_whitespace();
            if self.peek() == Some('}') {
                self.pos += 1;
                return Ok(Value::Object(map));
            }
            let key = match self.value()? {
                Value::String(s) => s,
                other => other.to_string(),
            };
            self.skip_whitespace();
            if self.bump() != Some(':') {
                return Err(anyhow!("Expected ':' after dict key '{}'", key));
            }
            let value = self.value()?;
            map.insert(key, value);
            self.skip_whitespace();
            match self.bump() {
                Some(',') => continue,
                Some('}') => return Ok(Value::Object(map)),
                other => return Err(anyhow!("Expected ',' or '}}', found {:?}", other)),
            }
        }
    }

    fn string(&mut self) -> Result<String> {
        let quote = self.bump().ok_or_else(|| anyhow!("Unexpected end of input"))?;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(anyhow!("Unterminated string")),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => out.push(self.escape()?),
                Some(c) => out.push(c),
            }
        }
    }

    fn escape(&mut self) -> Result<char> {
        let c = self.bump().ok_or_else(|| anyhow!("Unterminated escape"))?;
        Ok(match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            'x' => self.hex_char(2)?,
            'u' => self.hex_char(4)?,
            'U' => self.hex_char(8)?,
            other => other,
        })
    }

    fn hex_char(&mut self, digits: usize) -> Result<char> {
        let end = self.pos + digits;
        if end > self.chars.len() {
            return Err(anyhow!("Truncated escape sequence"));
        }
        let hex: String = self.chars[self.pos..end].iter().collect();
        self.pos = end;
        let code = u32::from_str_radix(&hex, 16)
            .map_err(|_| anyhow!("Invalid escape sequence '{}'", hex))?;
        char::from_u32(code).ok_or_else(|| anyhow!("Invalid code point {:x}", code))
    }

    fn number(&mut self) -> Result<Value> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E'))
        {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();

        if let Ok(int) = text.parse::<i64>() {
            return Ok(Value::Number(int.into()));
        }
        text.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| anyhow!("Invalid number '{}'", text))
    }

    fn word(&mut self) -> Result<Value> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();

        match word.as_str() {
            "None" => Ok(Value::Null),
            "True" => Ok(Value::Bool(true)),
            "False" => Ok(Value::Bool(false)),
            // String prefixes such as u'..' or r'..'
            "u" | "r" | "b" | "ur" | "br" | "rb" if matches!(self.peek(), Some('\'' | '"')) => {
                self.string().map(Value::String)
            }
            _ => Err(anyhow!("Unknown literal '{}'", word)),
        }
    }
}

//! GLYPH parsing.
//!
//! This module converts canonical (or near-canonical, "loose") GLYPH text
//! back into a [`Value`]. The parser is recursive descent over the grammar
//! the canonicalizer emits, tolerant of arbitrary whitespace, and reports
//! failures as [`Error::Syntax`](crate::Error) carrying a byte offset. A
//! failed parse never leaves partial state anywhere.
//!
//! ## Overview
//!
//! - **Table blocks**: `@tab ... @end` decodes back to the exact list it
//!   encoded; the `@end` marker is authoritative, and a line that does not
//!   start with `|` ends a block as a compatibility fallback for producers
//!   that omit the marker.
//! - **Schema headers**: a leading `@schema <id> [keys...]` line installs a
//!   key dictionary; `#N` keys resolve through it. A dictionary can also be
//!   supplied externally through [`ParseOptions`].
//! - **Pool references**: `^S<pool>:<index>` parses as an ordinary id; the
//!   separate post-pass [`Pool::resolve`] replaces resolvable references.
//! - **Packed structs**: `Type@(...)` delegates to the [`PackedDecoder`]
//!   injection point; this crate never decodes packed bodies itself.
//!
//! ## Usage
//!
//! ```rust
//! use glyph::{parse, Value};
//!
//! let value = parse("{a=2 b=1}").unwrap();
//! let map = value.as_map().unwrap();
//! assert_eq!(map.get("a"), Some(&Value::Int(2)));
//! ```

use crate::canon::looks_like_timestamp;
use crate::{Error, GlyphMap, Result, Value};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Characters that terminate a bare token.
const STRUCTURAL: &[char] = &[
    '"', '\\', '[', ']', '{', '}', '(', ')', '=', '|', '^', '@', ':', '#',
];

/// Injection point for the external packed/schema-typed encoding layer.
///
/// When the parser meets a value whose leading token is `Type@(...)` it hands
/// the type name and the raw body text to this decoder. Returning `None`
/// fails the parse at that offset.
pub trait PackedDecoder {
    fn decode(&self, type_name: &str, body: &str) -> Option<Value>;
}

/// Options for a single parse call.
///
/// Registries are explicit parameters, not process-wide state, so
/// independent parses can run concurrently with different registries.
#[derive(Default)]
pub struct ParseOptions<'a> {
    /// Key dictionary for `#N` keys when the document has no `@schema`
    /// header of its own. A header in the document wins.
    pub keys: Option<&'a [String]>,
    /// Decoder for `Type@(...)` packed-struct references.
    pub packed: Option<&'a dyn PackedDecoder>,
}

/// A registry of pooled values, looked up by `^S<pool>:<index>` references.
///
/// References are opaque during parsing; [`Pool::resolve`] is the separate
/// post-pass that walks a parsed value and substitutes what it can, leaving
/// unresolved references untouched.
///
/// # Examples
///
/// ```rust
/// use glyph::{parse, Pool, Value};
///
/// let mut pool = Pool::new();
/// pool.insert(1, vec![Value::from("alpha"), Value::from("beta")]);
///
/// let value = parse("{x=^S1:\"0\" y=^S1:\"7\"}").unwrap();
/// let resolved = pool.resolve(value);
/// let map = resolved.as_map().unwrap();
/// assert_eq!(map.get("x"), Some(&Value::from("alpha")));
/// // Index 7 is not pooled: the reference survives untouched.
/// assert!(map.get("y").unwrap().is_id());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Pool {
    entries: HashMap<u64, Vec<Value>>,
}

impl Pool {
    /// Creates an empty pool registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs (or replaces) one pool's values.
    pub fn insert(&mut self, pool: u64, values: Vec<Value>) {
        self.entries.insert(pool, values);
    }

    /// Looks up one pooled value.
    #[must_use]
    pub fn get(&self, pool: u64, index: usize) -> Option<&Value> {
        self.entries.get(&pool).and_then(|v| v.get(index))
    }

    /// Recursively replaces every resolvable pool reference in `value`.
    #[must_use]
    pub fn resolve(&self, value: Value) -> Value {
        match value {
            Value::Id { prefix, value } => match parse_pool_ref(&prefix, &value) {
                Some((pool, index)) => match self.get(pool, index) {
                    Some(found) => found.clone(),
                    None => Value::Id { prefix, value },
                },
                None => Value::Id { prefix, value },
            },
            Value::List(items) => {
                Value::List(items.into_iter().map(|v| self.resolve(v)).collect())
            }
            Value::Map(map) => Value::Map(
                map.into_iter()
                    .map(|(k, v)| (k, self.resolve(v)))
                    .collect(),
            ),
            Value::Struct { name, fields } => Value::Struct {
                name,
                fields: fields
                    .into_iter()
                    .map(|(k, v)| (k, self.resolve(v)))
                    .collect(),
            },
            Value::Sum { tag, value } => Value::Sum {
                tag,
                value: value.map(|inner| Box::new(self.resolve(*inner))),
            },
            other => other,
        }
    }
}

/// Matches the `S<digits>` / `<digits>` shape of a pool reference.
fn parse_pool_ref(prefix: &str, value: &str) -> Option<(u64, usize)> {
    let digits = prefix.strip_prefix('S')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((digits.parse().ok()?, value.parse().ok()?))
}

/// Parses GLYPH text with default options.
///
/// # Errors
///
/// Returns [`Error::Syntax`] with a byte offset and reason on malformed
/// input.
pub fn parse(text: &str) -> Result<Value> {
    parse_with_options(text, &ParseOptions::default())
}

/// Parses GLYPH text with an explicit key dictionary and/or packed decoder.
///
/// # Errors
///
/// Returns [`Error::Syntax`] with a byte offset and reason on malformed
/// input.
pub fn parse_with_options(text: &str, options: &ParseOptions<'_>) -> Result<Value> {
    let mut parser = Parser::new(text, options);
    parser.skip_ws();
    if parser.rest().starts_with("@schema") {
        parser.parse_schema_header()?;
        parser.skip_ws();
    }
    let value = parser.parse_value()?;
    parser.skip_ws();
    if !parser.at_end() {
        return Err(Error::syntax(parser.pos, "trailing input after value"));
    }
    Ok(value)
}

/// Reverses the cell escaping applied by the canonicalizer: `\|` and `\\`
/// back to `|` and `\`.
fn unescape_cell(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('|') => out.push('|'),
                Some('\\') => out.push('\\'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(ch);
        }
    }
    out
}

struct Parser<'i, 'o> {
    input: &'i str,
    pos: usize,
    options: &'o ParseOptions<'o>,
    /// Key dictionary from a `@schema` header, else from `options.keys`.
    dict: Option<Vec<String>>,
}

impl<'i, 'o> Parser<'i, 'o> {
    fn new(input: &'i str, options: &'o ParseOptions<'o>) -> Self {
        Parser {
            input,
            pos: 0,
            options,
            dict: options.keys.map(<[String]>::to_vec),
        }
    }

    fn rest(&self) -> &'i str {
        &self.input[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn eat(&mut self, expected: char) -> Result<()> {
        match self.peek() {
            Some(ch) if ch == expected => {
                self.bump();
                Ok(())
            }
            _ => Err(Error::syntax(self.pos, format!("expected '{}'", expected))),
        }
    }

    fn skip_ws(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    /// Skips spaces and tabs only, leaving newlines in place (table blocks
    /// are line-oriented).
    fn skip_inline_ws(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == ' ' || ch == '\t' {
                self.bump();
            } else {
                break;
            }
        }
    }

    /// Reads a bare token: characters up to whitespace or a structural
    /// character.
    fn word(&mut self) -> &'i str {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() || STRUCTURAL.contains(&ch) {
                break;
            }
            self.bump();
        }
        &self.input[start..self.pos]
    }

    fn parse_value(&mut self) -> Result<Value> {
        match self.peek() {
            None => Err(Error::syntax(self.pos, "unexpected end of input")),
            Some('"') => Ok(Value::Str(self.parse_quoted()?)),
            Some('^') => self.parse_id(),
            Some('[') => self.parse_list(),
            Some('{') => self.parse_map_body(None),
            Some('@') => {
                if self.rest().starts_with("@tab") {
                    self.parse_table()
                } else {
                    Err(Error::syntax(self.pos, "unexpected '@' directive"))
                }
            }
            Some('#') => Err(Error::syntax(
                self.pos,
                "compact key reference outside key position",
            )),
            Some('b') if self.rest().starts_with("b\"") => self.parse_bytes(),
            Some(_) => self.parse_word_value(),
        }
    }

    fn parse_word_value(&mut self) -> Result<Value> {
        let start = self.pos;
        let word = self.word();
        if word.is_empty() {
            return Err(Error::syntax(start, "unexpected character"));
        }

        // One token of lookahead: a bare token directly followed by `{`, `(`
        // or `@` is a struct, sum, or packed-struct reference.
        match self.peek() {
            Some('{') => return self.parse_map_body(Some(word.to_string())),
            Some('(') => return self.parse_sum(word.to_string()),
            Some('@') if !self.rest().starts_with("@tab") && !self.rest().starts_with("@end") => {
                return self.parse_packed(start, word)
            }
            _ => {}
        }

        match word {
            "\u{2205}" | "_" => return Ok(Value::Null),
            "t" => return Ok(Value::Bool(true)),
            "f" => return Ok(Value::Bool(false)),
            _ => {}
        }

        // Timestamps and numbers both start with digits; the date pattern is
        // checked first. A timestamp token continues past the `:` characters
        // the word scan stopped at.
        if looks_like_timestamp(word) {
            return self.parse_time(start);
        }
        if let Some(number) = parse_number(word) {
            return Ok(number);
        }

        Ok(Value::Str(word.to_string()))
    }

    fn parse_time(&mut self, start: usize) -> Result<Value> {
        while let Some(ch) = self.peek() {
            if ch == ':' || (!ch.is_whitespace() && !STRUCTURAL.contains(&ch)) {
                self.bump();
            } else {
                break;
            }
        }
        let token = &self.input[start..self.pos];
        let parsed = DateTime::parse_from_rfc3339(token)
            .map_err(|e| Error::syntax(start, format!("invalid timestamp: {}", e)))?;
        Ok(Value::Time(parsed.with_timezone(&Utc)))
    }

    fn parse_quoted(&mut self) -> Result<String> {
        let start = self.pos;
        self.eat('"')?;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(Error::syntax(start, "unterminated string")),
                Some('"') => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('\\') => out.push('\\'),
                    Some('"') => out.push('"'),
                    Some('n') => out.push('\n'),
                    Some('r') => out.push('\r'),
                    Some('t') => out.push('\t'),
                    // Unknown escape: preserved literally (loose mode).
                    Some(other) => {
                        out.push('\\');
                        out.push(other);
                    }
                    None => return Err(Error::syntax(start, "unterminated string")),
                },
                Some(other) => out.push(other),
            }
        }
    }

    fn parse_bytes(&mut self) -> Result<Value> {
        let start = self.pos;
        self.eat('b')?;
        let encoded = self.parse_quoted()?;
        let decoded = BASE64
            .decode(encoded.as_bytes())
            .map_err(|e| Error::syntax(start, format!("invalid base64: {}", e)))?;
        Ok(Value::Bytes(decoded))
    }

    fn parse_id(&mut self) -> Result<Value> {
        self.eat('^')?;
        let prefix = self.parse_id_part()?;
        self.eat(':')?;
        let value = self.parse_id_part()?;
        Ok(Value::Id { prefix, value })
    }

    fn parse_id_part(&mut self) -> Result<String> {
        if self.peek() == Some('"') {
            self.parse_quoted()
        } else {
            let start = self.pos;
            let word = self.word();
            if word.is_empty() {
                return Err(Error::syntax(start, "expected id component"));
            }
            Ok(word.to_string())
        }
    }

    fn parse_list(&mut self) -> Result<Value> {
        self.eat('[')?;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                None => return Err(Error::syntax(self.pos, "unterminated list")),
                Some(']') => {
                    self.bump();
                    return Ok(Value::List(items));
                }
                _ => items.push(self.parse_value()?),
            }
        }
    }

    fn parse_map_body(&mut self, name: Option<String>) -> Result<Value> {
        self.eat('{')?;
        let mut fields = GlyphMap::new();
        loop {
            self.skip_ws();
            match self.peek() {
                None => return Err(Error::syntax(self.pos, "unterminated map")),
                Some('}') => {
                    self.bump();
                    return Ok(match name {
                        Some(name) => Value::Struct { name, fields },
                        None => Value::Map(fields),
                    });
                }
                _ => {
                    let key = self.parse_key()?;
                    self.skip_ws();
                    self.eat('=')?;
                    self.skip_ws();
                    let value = self.parse_value()?;
                    // Unique keys: last write wins.
                    fields.insert(key, value);
                }
            }
        }
    }

    fn parse_key(&mut self) -> Result<String> {
        match self.peek() {
            Some('#') => {
                let start = self.pos;
                self.bump();
                let digits = self.word();
                let index: usize = digits
                    .parse()
                    .map_err(|_| Error::syntax(start, "invalid compact key index"))?;
                let dict = self
                    .dict
                    .as_ref()
                    .ok_or_else(|| Error::syntax(start, "compact key without a dictionary"))?;
                dict.get(index)
                    .cloned()
                    .ok_or_else(|| Error::syntax(start, "compact key index out of range"))
            }
            Some('"') => self.parse_quoted(),
            _ => {
                let start = self.pos;
                let word = self.word();
                if word.is_empty() {
                    return Err(Error::syntax(start, "expected map key"));
                }
                Ok(word.to_string())
            }
        }
    }

    fn parse_sum(&mut self, tag: String) -> Result<Value> {
        self.eat('(')?;
        self.skip_ws();
        if self.peek() == Some(')') {
            self.bump();
            return Ok(Value::Sum { tag, value: None });
        }
        let inner = self.parse_value()?;
        self.skip_ws();
        self.eat(')')?;
        Ok(Value::Sum {
            tag,
            value: Some(Box::new(inner)),
        })
    }

    /// `Type@(...)`: captures the balanced-paren body and delegates to the
    /// injected packed decoder.
    fn parse_packed(&mut self, start: usize, type_name: &str) -> Result<Value> {
        self.eat('@')?;
        self.eat('(')?;
        let body_start = self.pos;
        let mut depth = 1usize;
        while depth > 0 {
            match self.bump() {
                None => return Err(Error::syntax(start, "unterminated packed reference")),
                Some('(') => depth += 1,
                Some(')') => depth -= 1,
                Some('"') => {
                    // Quoted spans are atomic: parens inside them don't nest.
                    loop {
                        match self.bump() {
                            None => {
                                return Err(Error::syntax(start, "unterminated packed reference"))
                            }
                            Some('\\') => {
                                self.bump();
                            }
                            Some('"') => break,
                            Some(_) => {}
                        }
                    }
                }
                Some(_) => {}
            }
        }
        let body = &self.input[body_start..self.pos - 1];
        let decoder = self
            .options
            .packed
            .ok_or_else(|| Error::syntax(start, "no packed decoder registered"))?;
        decoder
            .decode(type_name, body)
            .ok_or_else(|| Error::syntax(start, format!("packed decode failed for {}", type_name)))
    }

    fn parse_schema_header(&mut self) -> Result<()> {
        let start = self.pos;
        self.pos += "@schema".len();
        self.skip_inline_ws();
        // The reference id is declared for consumers that track schema
        // versions; decoding only needs the dictionary.
        let _id = match self.peek() {
            Some('"') => self.parse_quoted()?,
            _ => {
                let word = self.word();
                if word.is_empty() {
                    return Err(Error::syntax(start, "expected schema id"));
                }
                word.to_string()
            }
        };
        self.skip_inline_ws();
        self.eat('[')?;
        let mut keys = Vec::new();
        loop {
            self.skip_inline_ws();
            match self.peek() {
                None => return Err(Error::syntax(start, "unterminated schema header")),
                Some(']') => {
                    self.bump();
                    break;
                }
                Some('"') => keys.push(self.parse_quoted()?),
                _ => {
                    let word = self.word();
                    if word.is_empty() {
                        return Err(Error::syntax(self.pos, "expected schema key"));
                    }
                    keys.push(word.to_string());
                }
            }
        }
        // The document's own dictionary takes precedence over an external one.
        self.dict = Some(keys);
        Ok(())
    }

    fn parse_table(&mut self) -> Result<Value> {
        let start = self.pos;
        self.pos += "@tab".len();
        self.skip_inline_ws();

        let type_name = match self.peek() {
            Some('_') => {
                self.bump();
                None
            }
            _ => {
                let word = self.word();
                if word.is_empty() {
                    return Err(Error::syntax(start, "expected table type or '_'"));
                }
                Some(word.to_string())
            }
        };

        self.skip_inline_ws();
        self.eat('[')?;
        let mut columns = Vec::new();
        loop {
            self.skip_inline_ws();
            match self.peek() {
                None => return Err(Error::syntax(start, "unterminated table header")),
                Some(']') => {
                    self.bump();
                    break;
                }
                Some('#') | Some('"') => columns.push(self.parse_key()?),
                _ => {
                    let word = self.word();
                    if word.is_empty() {
                        return Err(Error::syntax(self.pos, "expected column name"));
                    }
                    columns.push(word.to_string());
                }
            }
        }
        self.skip_inline_ws();
        if self.peek() == Some('\n') {
            self.bump();
        }

        let mut rows = Vec::new();
        loop {
            self.skip_inline_ws();
            if self.rest().starts_with("@end") {
                self.pos += "@end".len();
                break;
            }
            match self.peek() {
                Some('|') => {
                    let cells = self.parse_row()?;
                    if cells.len() != columns.len() {
                        return Err(Error::syntax(
                            self.pos,
                            format!(
                                "row has {} cells, table has {} columns",
                                cells.len(),
                                columns.len()
                            ),
                        ));
                    }
                    let mut fields = GlyphMap::new();
                    for (column, cell) in columns.iter().zip(cells) {
                        let value = self.parse_cell(&cell)?;
                        fields.insert(column.clone(), value);
                    }
                    rows.push(match &type_name {
                        Some(name) => Value::Struct {
                            name: name.clone(),
                            fields,
                        },
                        None => Value::Map(fields),
                    });
                    if self.peek() == Some('\n') {
                        self.bump();
                    }
                }
                // Compatibility fallback for producers that omit `@end`: a
                // line that does not start with '|' ends the table. Best
                // effort only; `@end` is authoritative.
                _ => {
                    tracing::debug!("table block ended without @end marker");
                    break;
                }
            }
        }
        Ok(Value::List(rows))
    }

    /// Reads one `|c1|c2|` row, splitting on unescaped pipes. The returned
    /// cells are still escaped.
    fn parse_row(&mut self) -> Result<Vec<String>> {
        self.eat('|')?;
        let mut cells = Vec::new();
        let mut cell = String::new();
        loop {
            match self.peek() {
                None | Some('\n') => {
                    return Err(Error::syntax(self.pos, "unterminated table row"));
                }
                Some('\\') => {
                    cell.push('\\');
                    self.bump();
                    if let Some(escaped) = self.bump() {
                        cell.push(escaped);
                    }
                }
                Some('|') => {
                    self.bump();
                    cells.push(std::mem::take(&mut cell));
                    // Row ends at the pipe that closes the line; trailing
                    // spaces before the newline are tolerated (loose mode).
                    let line_rest = self.rest().split('\n').next().unwrap_or("");
                    if line_rest.trim().is_empty() {
                        self.skip_inline_ws();
                        return Ok(cells);
                    }
                }
                Some(other) => {
                    cell.push(other);
                    self.bump();
                }
            }
        }
    }

    fn parse_cell(&mut self, raw: &str) -> Result<Value> {
        let text = unescape_cell(raw);
        let mut sub = Parser {
            input: &text,
            pos: 0,
            options: self.options,
            dict: self.dict.clone(),
        };
        sub.skip_ws();
        let value = sub.parse_value()?;
        sub.skip_ws();
        if !sub.at_end() {
            return Err(Error::syntax(self.pos, "trailing input in table cell"));
        }
        Ok(value)
    }
}

fn parse_number(word: &str) -> Option<Value> {
    if word.contains('.') || word.contains('e') || word.contains('E') {
        return word.parse::<f64>().ok().map(Value::Float);
    }
    if let Ok(int) = word.parse::<i64>() {
        return Some(Value::Int(int));
    }
    // Integer overflow falls back to float, mirroring loose JSON readers.
    word.parse::<f64>().ok().map(Value::Float)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{canonicalize, glyph};

    #[test]
    fn test_scalars() {
        assert_eq!(parse("\u{2205}").unwrap(), Value::Null);
        assert_eq!(parse("_").unwrap(), Value::Null);
        assert_eq!(parse("t").unwrap(), Value::Bool(true));
        assert_eq!(parse("f").unwrap(), Value::Bool(false));
        assert_eq!(parse("42").unwrap(), Value::Int(42));
        assert_eq!(parse("-7").unwrap(), Value::Int(-7));
        assert_eq!(parse("1.5").unwrap(), Value::Float(1.5));
        assert_eq!(parse("1e-3").unwrap(), Value::Float(0.001));
        assert_eq!(parse("hello").unwrap(), Value::Str("hello".into()));
        assert_eq!(parse("\"two words\"").unwrap(), Value::Str("two words".into()));
        assert_eq!(parse("\"42\"").unwrap(), Value::Str("42".into()));
    }

    #[test]
    fn test_timestamp_vs_number() {
        let value = parse("2024-01-15T10:30:00Z").unwrap();
        assert!(value.is_time());
        // Same leading digits, no date pattern: plain arithmetic expression
        // characters terminate the token, so this is an int.
        assert_eq!(parse("2024").unwrap(), Value::Int(2024));
    }

    #[test]
    fn test_id_and_bytes() {
        assert_eq!(parse("^user:alice").unwrap(), Value::id("user", "alice"));
        assert_eq!(parse("^user:\"42\"").unwrap(), Value::id("user", "42"));
        assert_eq!(parse("b\"aGk=\"").unwrap(), Value::Bytes(b"hi".to_vec()));
    }

    #[test]
    fn test_collections() {
        assert_eq!(parse("[]").unwrap(), Value::List(vec![]));
        assert_eq!(
            parse("[1 2 3]").unwrap(),
            Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
        let map = parse("{a=1 b=t}").unwrap();
        assert_eq!(map, glyph!({ "a": 1, "b": true }));
    }

    #[test]
    fn test_struct_and_sum() {
        let st = parse("Point{x=1 y=2}").unwrap();
        match &st {
            Value::Struct { name, fields } => {
                assert_eq!(name, "Point");
                assert_eq!(fields.get("x"), Some(&Value::Int(1)));
            }
            other => panic!("expected struct, got {:?}", other),
        }

        assert_eq!(parse("Some(42)").unwrap(), Value::sum("Some", Value::Int(42)));
        assert_eq!(parse("None()").unwrap(), Value::sum_unit("None"));
    }

    #[test]
    fn test_duplicate_keys_last_wins() {
        let map = parse("{a=1 a=2}").unwrap();
        assert_eq!(map.as_map().unwrap().get("a"), Some(&Value::Int(2)));
        assert_eq!(map.as_map().unwrap().len(), 1);
    }

    #[test]
    fn test_table_block() {
        let value = parse("@tab _ [id]\n|1|\n|2|\n|3|\n@end").unwrap();
        assert_eq!(value, glyph!([{ "id": 1 }, { "id": 2 }, { "id": 3 }]));
    }

    #[test]
    fn test_table_row_arity_mismatch() {
        let err = parse("@tab _ [a b]\n|1|\n@end").unwrap_err();
        assert!(matches!(err, Error::Syntax { .. }));
    }

    #[test]
    fn test_table_inside_map_with_end_marker() {
        let text = "{data=@tab _ [id]\n|1|\n|2|\n|3|\n@end next=5}";
        let value = parse(text).unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(map.get("next"), Some(&Value::Int(5)));
        assert_eq!(map.get("data").unwrap().as_list().unwrap().len(), 3);
    }

    #[test]
    fn test_table_heuristic_end_without_marker() {
        let text = "{data=@tab _ [id]\n|1|\n|2|\nnext=5}";
        let value = parse(text).unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(map.get("next"), Some(&Value::Int(5)));
        assert_eq!(map.get("data").unwrap().as_list().unwrap().len(), 2);
    }

    #[test]
    fn test_schema_header_round_trip() {
        let text = "@schema S1 [age name]\n{#0=36 #1=Ada}";
        let value = parse(text).unwrap();
        assert_eq!(value, glyph!({ "age": 36, "name": "Ada" }));
    }

    #[test]
    fn test_external_dictionary() {
        let keys = vec!["age".to_string(), "name".to_string()];
        let options = ParseOptions {
            keys: Some(&keys),
            packed: None,
        };
        let value = parse_with_options("{#1=Ada}", &options).unwrap();
        assert_eq!(value, glyph!({ "name": "Ada" }));
    }

    #[test]
    fn test_compact_key_without_dictionary_fails() {
        let err = parse("{#0=1}").unwrap_err();
        assert!(matches!(err, Error::Syntax { .. }));
    }

    #[test]
    fn test_packed_injection() {
        struct Fixed;
        impl PackedDecoder for Fixed {
            fn decode(&self, type_name: &str, body: &str) -> Option<Value> {
                assert_eq!(type_name, "Point");
                assert_eq!(body, "1 2");
                Some(glyph!({ "x": 1, "y": 2 }))
            }
        }
        let options = ParseOptions {
            keys: None,
            packed: Some(&Fixed),
        };
        let value = parse_with_options("{p=Point@(1 2)}", &options).unwrap();
        assert_eq!(
            value.as_map().unwrap().get("p"),
            Some(&glyph!({ "x": 1, "y": 2 }))
        );
    }

    #[test]
    fn test_packed_without_decoder_fails() {
        let err = parse("{p=Point@(1 2)}").unwrap_err();
        assert!(matches!(err, Error::Syntax { .. }));
    }

    #[test]
    fn test_syntax_error_offset() {
        let err = parse("{a=1").unwrap_err();
        match err {
            Error::Syntax { offset, .. } => assert_eq!(offset, 4),
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_pipe_escape_round_trip() {
        let rows = glyph!([{ "s": "a|b" }, { "s": "c" }, { "s": "d" }]);
        let text = canonicalize(&rows);
        assert_eq!(parse(&text).unwrap(), rows);
    }
}

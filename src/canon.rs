//! GLYPH canonicalization.
//!
//! This module converts a [`Value`] into exactly one deterministic text
//! string. Canonicalization is a total, pure function: it never fails on a
//! well-formed value and never mutates its input. Two values are loosely
//! equal iff their canonical strings are byte-identical.
//!
//! ## Overview
//!
//! - **Scalars** follow the literal rules in [`crate::spec`]: `∅`/`_`, `t`/`f`,
//!   normalized numbers, bare-or-quoted strings, `b"..."` byte blobs,
//!   RFC 3339 UTC timestamps, `^prefix:value` references.
//! - **Maps and structs** emit `key=value` pairs ordered by the byte sequence
//!   of each key's canonical form, regardless of insertion order.
//! - **Auto-tabular**: a list of homogeneous records meeting the eligibility
//!   rules emits a `@tab ... @end` table block instead of bracketed syntax.
//!   Tabular mode never changes the decoded value, only its encoding.
//! - **Schema mode**: with a [`SchemaRef`](crate::SchemaRef) configured, the
//!   document gains a `@schema` header and dictionary keys compress to `#N`.
//!
//! ## Usage
//!
//! ```rust
//! use glyph::{canonicalize, glyph};
//!
//! let value = glyph!({ "b": 1, "a": 2 });
//! assert_eq!(canonicalize(&value), "{a=2 b=1}");
//! ```

use crate::{CanonOptions, GlyphMap, Value};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::SecondsFormat;

/// Characters that force a string into quoted form.
///
/// Everything structural in the grammar, plus `#` (compact keys) and `:`
/// (id separator). Whitespace is checked separately.
const RESERVED: &[char] = &[
    '"', '\\', '[', ']', '{', '}', '(', ')', '=', '|', '^', '@', ':', '#',
];

/// Canonicalizes a value with default options.
///
/// # Examples
///
/// ```rust
/// use glyph::{canonicalize, Value};
///
/// assert_eq!(canonicalize(&Value::Int(42)), "42");
/// assert_eq!(canonicalize(&Value::Bool(true)), "t");
/// ```
#[must_use]
pub fn canonicalize(value: &Value) -> String {
    canonicalize_with_options(value, &CanonOptions::default())
}

/// Canonicalizes a value with explicit options.
///
/// When `options.schema` has `compact_keys` set, the output begins with a
/// `@schema <id> [keys...]` header line declaring the dictionary.
#[must_use]
pub fn canonicalize_with_options(value: &Value, options: &CanonOptions) -> String {
    let mut emitter = Emitter::new(options);
    if let Some(schema) = options.schema.as_ref().filter(|s| s.compact_keys) {
        emitter.out.push_str("@schema ");
        emitter.emit_str(&schema.id);
        emitter.out.push_str(" [");
        for (i, key) in schema.keys.iter().enumerate() {
            if i > 0 {
                emitter.out.push(' ');
            }
            emitter.emit_str(key);
        }
        emitter.out.push_str("]\n");
    }
    emitter.emit_value(value);
    emitter.out
}

/// Returns `true` if `s` can be emitted without quotes.
///
/// A bare string must be non-empty, contain no whitespace and no reserved
/// characters, and must not be mistakable for a reserved literal, a number,
/// or a timestamp.
#[must_use]
pub fn is_bare_safe(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }
    if s.chars().any(|c| c.is_whitespace() || RESERVED.contains(&c)) {
        return false;
    }
    if s == "t" || s == "f" || s == "\u{2205}" || s == "_" {
        return false;
    }
    // Anything f64 accepts ("42", "1e-3", also "inf"/"NaN") stays quoted.
    if s.parse::<f64>().is_ok() {
        return false;
    }
    if looks_like_timestamp(s) {
        return false;
    }
    true
}

/// Checks for the `YYYY-MM-DDT` prefix that distinguishes timestamps from
/// numeric literals.
pub(crate) fn looks_like_timestamp(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() > 10
        && b[0..4].iter().all(u8::is_ascii_digit)
        && b[4] == b'-'
        && b[5..7].iter().all(u8::is_ascii_digit)
        && b[7] == b'-'
        && b[8..10].iter().all(u8::is_ascii_digit)
        && b[10] == b'T'
}

/// The canonical form of a string: bare when safe, quoted otherwise.
pub(crate) fn string_form(s: &str) -> String {
    if is_bare_safe(s) {
        s.to_string()
    } else {
        let mut out = String::with_capacity(s.len() + 2);
        out.push('"');
        for ch in s.chars() {
            match ch {
                '\\' => out.push_str("\\\\"),
                '"' => out.push_str("\\\""),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                _ => out.push(ch),
            }
        }
        out.push('"');
        out
    }
}

pub(crate) fn float_form(f: f64) -> String {
    if !f.is_finite() {
        // Non-finite floats have no literal; they normalize to null at
        // emission, matching the LLM-facing behavior of the format family.
        return String::new();
    }
    if f == 0.0 {
        return "0".to_string();
    }
    let plain = format!("{}", f);
    let exp = format!("{:e}", f);
    let mut s = if exp.len() < plain.len() { exp } else { plain };
    if !s.contains('.') && !s.contains('e') {
        s.push_str(".0");
    }
    s
}

/// Escapes one rendered cell so `|` stays an unambiguous row delimiter.
/// [`unescape_cell`](crate::parse) is the exact inverse.
pub(crate) fn escape_cell(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '|' => out.push_str("\\|"),
            _ => out.push(ch),
        }
    }
    out
}

/// Column layout chosen for one eligible list.
struct TablePlan {
    /// Struct type name shared by every row, or `None` for maps (`_`).
    type_name: Option<String>,
    columns: Vec<String>,
}

struct Emitter<'a> {
    out: String,
    options: &'a CanonOptions,
    /// Inside a table cell: tabular emission is disabled so cells stay on one
    /// line, and the caller applies pipe escaping to whatever we produce.
    in_cell: bool,
}

impl<'a> Emitter<'a> {
    fn new(options: &'a CanonOptions) -> Self {
        Emitter {
            out: String::with_capacity(256),
            options,
            in_cell: false,
        }
    }

    fn emit_value(&mut self, value: &Value) {
        match value {
            Value::Null => self.out.push_str(self.options.null_style.as_str()),
            Value::Bool(b) => self.out.push(if *b { 't' } else { 'f' }),
            Value::Int(i) => self.out.push_str(&i.to_string()),
            Value::Float(f) => {
                let s = float_form(*f);
                if s.is_empty() {
                    self.out.push_str(self.options.null_style.as_str());
                } else {
                    self.out.push_str(&s);
                }
            }
            Value::Str(s) => self.emit_str(s),
            Value::Bytes(b) => {
                self.out.push_str("b\"");
                self.out.push_str(&BASE64.encode(b));
                self.out.push('"');
            }
            Value::Time(t) => {
                self.out
                    .push_str(&t.to_rfc3339_opts(SecondsFormat::AutoSi, true));
            }
            Value::Id { prefix, value } => {
                self.out.push('^');
                self.emit_str(prefix);
                self.out.push(':');
                self.emit_str(value);
            }
            Value::List(items) => self.emit_list(items),
            Value::Map(map) => self.emit_fields(map),
            Value::Struct { name, fields } => {
                self.out.push_str(name);
                self.emit_fields(fields);
            }
            Value::Sum { tag, value } => {
                self.out.push_str(tag);
                self.out.push('(');
                if let Some(inner) = value {
                    self.emit_value(inner);
                }
                self.out.push(')');
            }
        }
    }

    fn emit_str(&mut self, s: &str) {
        self.out.push_str(&string_form(s));
    }

    fn emit_key(&mut self, key: &str) {
        if let Some(schema) = self.options.schema.as_ref().filter(|s| s.compact_keys) {
            if let Some(index) = schema.index_of(key) {
                self.out.push('#');
                self.out.push_str(&index.to_string());
                return;
            }
        }
        self.emit_str(key);
    }

    /// Emits `{k=v ...}` with pairs ordered by the byte sequence of each
    /// key's canonical form. Schema substitution happens after sorting so
    /// compact keys decode back to an identically-ordered document.
    fn emit_fields(&mut self, fields: &GlyphMap) {
        let mut pairs: Vec<(String, &String, &Value)> = fields
            .iter()
            .map(|(k, v)| (string_form(k), k, v))
            .collect();
        pairs.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

        self.out.push('{');
        for (i, (_, key, value)) in pairs.into_iter().enumerate() {
            if i > 0 {
                self.out.push(' ');
            }
            self.emit_key(key);
            self.out.push('=');
            self.emit_value(value);
        }
        self.out.push('}');
    }

    fn emit_list(&mut self, items: &[Value]) {
        if self.options.auto_tabular && !self.in_cell {
            if let Some(plan) = self.table_plan(items) {
                self.emit_table(items, &plan);
                return;
            }
        }
        self.out.push('[');
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.out.push(' ');
            }
            self.emit_value(item);
        }
        self.out.push(']');
    }

    /// Tabular eligibility: enough rows, all rows the same record kind, a
    /// bounded column union, and (unless tolerated) no missing keys.
    /// Returns the column layout or `None` to fall back to brackets.
    fn table_plan(&self, items: &[Value]) -> Option<TablePlan> {
        if items.len() < self.options.min_table_rows {
            return None;
        }

        // Every row must be a Map, or every row a Struct of one type. The
        // same pass gathers the column union with per-key frequency.
        let mut kind: Option<Option<&str>> = None;
        let mut columns: Vec<(String, usize)> = Vec::new();
        for item in items {
            let (this, fields) = match item {
                Value::Map(map) => (None, map),
                Value::Struct { name, fields } => (Some(name.as_str()), fields),
                _ => return None,
            };
            match &kind {
                None => kind = Some(this),
                Some(seen) if *seen == this => {}
                _ => return None,
            }
            for key in fields.keys() {
                match columns.iter_mut().find(|(k, _)| k == key) {
                    Some((_, count)) => *count += 1,
                    None => columns.push((key.clone(), 1)),
                }
            }
        }
        let type_name = kind.flatten();

        // A zero-column table has no row syntax; bracketed form handles it.
        if columns.is_empty() || columns.len() > self.options.max_table_cols {
            return None;
        }
        if !self.options.tolerate_missing {
            let full = columns.iter().all(|(_, count)| *count == items.len());
            if !full {
                return None;
            }
        }

        // Descending frequency, ties by key bytes. One rule, applied
        // identically in header and rows.
        columns.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.as_bytes().cmp(b.0.as_bytes())));

        Some(TablePlan {
            type_name: type_name.map(str::to_string),
            columns: columns.into_iter().map(|(k, _)| k).collect(),
        })
    }

    fn emit_table(&mut self, items: &[Value], plan: &TablePlan) {
        self.out.push_str("@tab ");
        match &plan.type_name {
            Some(name) => self.out.push_str(name),
            None => self.out.push('_'),
        }
        self.out.push_str(" [");
        for (i, col) in plan.columns.iter().enumerate() {
            if i > 0 {
                self.out.push(' ');
            }
            self.emit_key(col);
        }
        self.out.push_str("]\n");

        for item in items {
            let fields = match item.as_fields() {
                Some(fields) => fields,
                None => continue,
            };
            self.out.push('|');
            for col in &plan.columns {
                let cell = match fields.get(col) {
                    Some(value) => self.render_cell(value),
                    None => self.options.null_style.as_str().to_string(),
                };
                self.out.push_str(&escape_cell(&cell));
                self.out.push('|');
            }
            self.out.push('\n');
        }
        self.out.push_str("@end");
    }

    /// Renders one cell inline. A nested list inside a cell never
    /// re-tabularizes: table blocks are line-oriented and cells are not.
    fn render_cell(&self, value: &Value) -> String {
        let mut nested = Emitter::new(self.options);
        nested.in_cell = true;
        nested.emit_value(value);
        nested.out
    }
}

//! Structural patches: a minimal set of mutations applied at a path.
//!
//! A [`Patch`] is an ordered sequence of operations — `set`, `append`,
//! `delete` — each targeting a [`Path`] into a [`Value`]. Application is
//! all-or-nothing: the patch applies to a clone and the original is returned
//! untouched if any operation fails.
//!
//! Paths have a text form (`users[2].tags[+]`) so patches travel inside
//! `patch` frames as ordinary GLYPH values; see [`Patch::to_value`] and
//! [`Patch::from_value`].
//!
//! ## Usage
//!
//! ```rust
//! use glyph::{glyph, Patch, Path};
//!
//! let state = glyph!({ "name": "Ada", "tags": ["math"] });
//!
//! let patch = Patch::new()
//!     .set(Path::parse("age").unwrap(), glyph!(36))
//!     .append(Path::parse("tags").unwrap(), glyph!("logic"));
//!
//! let next = patch.apply(&state).unwrap();
//! assert_eq!(next.as_map().unwrap().get("age"), Some(&glyph!(36)));
//! assert_eq!(state.as_map().unwrap().get("age"), None);
//! ```

use crate::{Error, GlyphMap, Result, Value};
use std::fmt;

/// One step of a [`Path`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Field by name in a map or struct.
    Field(String),
    /// Element by position in a list.
    Index(usize),
    /// The append sentinel `[+]`: one past the end of a list.
    Append,
}

/// A path from the root of a value to one location inside it.
///
/// Text form: fields joined by `.`, indexes as `[n]`, the append sentinel as
/// `[+]`. Field names containing `.`, `[`, `]` or `"` are quoted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    /// Builds a path from segments.
    #[must_use]
    pub fn new(segments: Vec<Segment>) -> Self {
        Path { segments }
    }

    /// The segments, in root-to-leaf order.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Parses the text form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Path`] on malformed path text.
    pub fn parse(text: &str) -> Result<Self> {
        let bytes = text.as_bytes();
        let mut segments = Vec::new();
        let mut pos = 0usize;

        while pos < bytes.len() {
            match bytes[pos] {
                b'.' => {
                    if segments.is_empty() {
                        return Err(Error::path(text, "path cannot start with '.'"));
                    }
                    pos += 1;
                    if pos >= bytes.len() {
                        return Err(Error::path(text, "path ends with '.'"));
                    }
                }
                b'[' => {
                    let close = text[pos..]
                        .find(']')
                        .map(|i| pos + i)
                        .ok_or_else(|| Error::path(text, "unterminated '['"))?;
                    let inner = &text[pos + 1..close];
                    if inner == "+" {
                        segments.push(Segment::Append);
                    } else {
                        let index = inner
                            .parse::<usize>()
                            .map_err(|_| Error::path(text, "invalid index"))?;
                        segments.push(Segment::Index(index));
                    }
                    pos = close + 1;
                    continue;
                }
                _ => {}
            }

            if pos >= bytes.len() || bytes[pos] == b'[' {
                continue;
            }
            if bytes[pos] == b'"' {
                let (field, next) = parse_quoted_field(text, pos)?;
                segments.push(Segment::Field(field));
                pos = next;
            } else {
                let start = pos;
                while pos < bytes.len() && bytes[pos] != b'.' && bytes[pos] != b'[' {
                    pos += 1;
                }
                if start == pos {
                    return Err(Error::path(text, "empty field name"));
                }
                segments.push(Segment::Field(text[start..pos].to_string()));
            }
        }

        if segments.is_empty() {
            return Err(Error::path(text, "empty path"));
        }
        Ok(Path { segments })
    }
}

fn parse_quoted_field(text: &str, start: usize) -> Result<(String, usize)> {
    let mut out = String::new();
    let mut iter = text[start + 1..].char_indices();
    while let Some((i, ch)) = iter.next() {
        match ch {
            '"' => return Ok((out, start + 1 + i + 1)),
            '\\' => match iter.next() {
                Some((_, escaped)) => out.push(escaped),
                None => break,
            },
            other => out.push(other),
        }
    }
    Err(Error::path(text, "unterminated quoted field"))
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Field(name) => {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    let plain = !name.is_empty()
                        && !name.contains(&['.', '[', ']', '"'][..]);
                    if plain {
                        f.write_str(name)?;
                    } else {
                        write!(f, "\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))?;
                    }
                }
                Segment::Index(index) => write!(f, "[{}]", index)?,
                Segment::Append => f.write_str("[+]")?,
            }
        }
        Ok(())
    }
}

/// One patch operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Set { path: Path, value: Value },
    Append { path: Path, value: Value },
    Delete { path: Path },
}

/// An ordered sequence of operations applied atomically.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Patch {
    ops: Vec<Op>,
}

impl Patch {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The operations, in application order.
    #[must_use]
    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    /// Adds a `set` operation.
    #[must_use]
    pub fn set(mut self, path: Path, value: Value) -> Self {
        self.ops.push(Op::Set { path, value });
        self
    }

    /// Adds an `append` operation.
    #[must_use]
    pub fn append(mut self, path: Path, value: Value) -> Self {
        self.ops.push(Op::Append { path, value });
        self
    }

    /// Adds a `delete` operation.
    #[must_use]
    pub fn delete(mut self, path: Path) -> Self {
        self.ops.push(Op::Delete { path });
        self
    }

    /// Applies every operation in order against a clone of `value`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Path`] if any operation fails to resolve; the input
    /// is never modified.
    pub fn apply(&self, value: &Value) -> Result<Value> {
        let mut out = value.clone();
        for op in &self.ops {
            match op {
                Op::Set { path, value } => set_at(&mut out, path.segments(), value.clone(), path)?,
                Op::Append { path, value } => {
                    let target = walk_mut(&mut out, path.segments(), path)?;
                    match target {
                        Value::List(items) => items.push(value.clone()),
                        _ => return Err(Error::path(path.to_string(), "append target is not a list")),
                    }
                }
                Op::Delete { path } => delete_at(&mut out, path.segments(), path)?,
            }
        }
        Ok(out)
    }

    /// The GLYPH wire form: a list of `set(...)`, `add(...)`, `del(...)` sum
    /// values. This is what a `patch` frame's payload carries.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let items = self
            .ops
            .iter()
            .map(|op| match op {
                Op::Set { path, value } => op_value("set", path, Some(value)),
                Op::Append { path, value } => op_value("add", path, Some(value)),
                Op::Delete { path } => op_value("del", path, None),
            })
            .collect();
        Value::List(items)
    }

    /// Rebuilds a patch from its wire form.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` is not a well-formed patch document.
    pub fn from_value(value: &Value) -> Result<Self> {
        let items = value
            .as_list()
            .ok_or_else(|| Error::Message("patch document must be a list".into()))?;
        let mut ops = Vec::with_capacity(items.len());
        for item in items {
            let (tag, body) = match item {
                Value::Sum {
                    tag,
                    value: Some(body),
                } => (tag.as_str(), body.as_ref()),
                _ => return Err(Error::Message("patch op must be a tagged value".into())),
            };
            let fields = body
                .as_fields()
                .ok_or_else(|| Error::Message("patch op body must be a map".into()))?;
            let path_text = fields
                .get("path")
                .and_then(Value::as_str)
                .ok_or_else(|| Error::Message("patch op missing path".into()))?;
            let path = Path::parse(path_text)?;
            let op = match tag {
                "set" | "add" => {
                    let value = fields
                        .get("value")
                        .cloned()
                        .ok_or_else(|| Error::Message("patch op missing value".into()))?;
                    if tag == "set" {
                        Op::Set { path, value }
                    } else {
                        Op::Append { path, value }
                    }
                }
                "del" => Op::Delete { path },
                other => {
                    return Err(Error::Message(format!("unknown patch op `{}`", other)));
                }
            };
            ops.push(op);
        }
        Ok(Patch { ops })
    }
}

fn op_value(tag: &str, path: &Path, value: Option<&Value>) -> Value {
    let mut fields = GlyphMap::new();
    fields.insert("path".to_string(), Value::Str(path.to_string()));
    if let Some(value) = value {
        fields.insert("value".to_string(), value.clone());
    }
    Value::sum(tag, Value::Map(fields))
}

fn fields_mut<'a>(target: &'a mut Value, path: &Path) -> Result<&'a mut GlyphMap> {
    match target {
        Value::Map(map) => Ok(map),
        Value::Struct { fields, .. } => Ok(fields),
        _ => Err(Error::path(path.to_string(), "segment target is not a record")),
    }
}

fn list_mut<'a>(target: &'a mut Value, path: &Path) -> Result<&'a mut Vec<Value>> {
    match target {
        Value::List(items) => Ok(items),
        _ => Err(Error::path(path.to_string(), "segment target is not a list")),
    }
}

/// Walks a path without creating anything; used by `append` and `delete`.
fn walk_mut<'a>(target: &'a mut Value, segments: &[Segment], path: &Path) -> Result<&'a mut Value> {
    let Some((segment, rest)) = segments.split_first() else {
        return Ok(target);
    };
    let child = match segment {
        Segment::Field(name) => fields_mut(target, path)?
            .get_mut(name)
            .ok_or_else(|| Error::path(path.to_string(), format!("missing field `{}`", name)))?,
        Segment::Index(index) => {
            let items = list_mut(target, path)?;
            let len = items.len();
            items.get_mut(*index).ok_or_else(|| {
                Error::path(path.to_string(), format!("index {} out of range 0..{}", index, len))
            })?
        }
        Segment::Append => {
            return Err(Error::path(path.to_string(), "append sentinel cannot be traversed"))
        }
    };
    walk_mut(child, rest, path)
}

/// Walks a path for `set`, creating intermediate maps for missing fields.
fn set_at(target: &mut Value, segments: &[Segment], value: Value, path: &Path) -> Result<()> {
    let Some((segment, rest)) = segments.split_first() else {
        *target = value;
        return Ok(());
    };
    match segment {
        Segment::Field(name) => {
            let fields = fields_mut(target, path)?;
            if !fields.contains_key(name) {
                fields.insert(name.clone(), Value::Map(GlyphMap::new()));
            }
            let child = fields
                .get_mut(name)
                .ok_or_else(|| Error::path(path.to_string(), "field lookup failed"))?;
            set_at(child, rest, value, path)
        }
        Segment::Index(index) => {
            let items = list_mut(target, path)?;
            let len = items.len();
            let child = items.get_mut(*index).ok_or_else(|| {
                Error::path(path.to_string(), format!("index {} out of range 0..{}", index, len))
            })?;
            set_at(child, rest, value, path)
        }
        Segment::Append => {
            if !rest.is_empty() {
                return Err(Error::path(path.to_string(), "append sentinel must be last"));
            }
            list_mut(target, path)?.push(value);
            Ok(())
        }
    }
}

fn delete_at(target: &mut Value, segments: &[Segment], path: &Path) -> Result<()> {
    match segments {
        [] => Err(Error::path(path.to_string(), "cannot delete the root")),
        [Segment::Field(name)] => {
            let fields = fields_mut(target, path)?;
            fields
                .remove(name)
                .map(|_| ())
                .ok_or_else(|| Error::path(path.to_string(), format!("missing field `{}`", name)))
        }
        [Segment::Index(index)] => {
            let items = list_mut(target, path)?;
            if *index >= items.len() {
                return Err(Error::path(
                    path.to_string(),
                    format!("index {} out of range 0..{}", index, items.len()),
                ));
            }
            items.remove(*index);
            Ok(())
        }
        [Segment::Append] => Err(Error::path(path.to_string(), "cannot delete the append sentinel")),
        [segment, rest @ ..] => {
            let child = walk_mut(target, std::slice::from_ref(segment), path)?;
            delete_at(child, rest, path)
        }
    }
}

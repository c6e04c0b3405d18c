//! Configuration options for GLYPH canonicalization.
//!
//! This module provides the knobs that shape canonical output without ever
//! changing the decoded value:
//!
//! - [`CanonOptions`]: main configuration struct
//! - [`NullStyle`]: `∅` vs the ASCII-safe `_`
//! - [`SchemaRef`]: schema id + key dictionary for compact-key output
//!
//! ## Examples
//!
//! ```rust
//! use glyph::{canonicalize_with_options, glyph, CanonOptions, NullStyle};
//!
//! let value = glyph!({ "a": null });
//!
//! let symbol = canonicalize_with_options(&value, &CanonOptions::new());
//! assert_eq!(symbol, "{a=∅}");
//!
//! let ascii = canonicalize_with_options(
//!     &value,
//!     &CanonOptions::new().with_null_style(NullStyle::Ascii),
//! );
//! assert_eq!(ascii, "{a=_}");
//! ```

/// Spelling of the null literal.
///
/// The parser accepts both spellings regardless of which one the emitter
/// uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum NullStyle {
    /// `∅` — the human-readable symbol.
    #[default]
    Symbol,
    /// `_` — ASCII-safe substitute for transports that dislike non-ASCII.
    Ascii,
}

impl NullStyle {
    /// Returns the literal text for this spelling.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            NullStyle::Symbol => "\u{2205}",
            NullStyle::Ascii => "_",
        }
    }
}

/// A schema reference: an id plus an ordered key dictionary.
///
/// With `compact_keys` set, canonical output starts with a
/// `@schema <id> [keys...]` header and map keys found in the dictionary are
/// emitted as `#<index>`. Decoding restores identical keys via the
/// dictionary, so this is purely a size optimization.
#[derive(Clone, Debug, PartialEq)]
pub struct SchemaRef {
    pub id: String,
    pub keys: Vec<String>,
    pub compact_keys: bool,
}

impl SchemaRef {
    /// Creates a schema reference with compact keys enabled.
    #[must_use]
    pub fn new(id: impl Into<String>, keys: Vec<String>) -> Self {
        SchemaRef {
            id: id.into(),
            keys,
            compact_keys: true,
        }
    }

    /// Returns the dictionary index of a key, if present.
    #[must_use]
    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.keys.iter().position(|k| k == key)
    }
}

/// Configuration options for canonicalization.
///
/// All options are independent and composable; none of them changes the
/// decoded value, only its encoding.
///
/// # Examples
///
/// ```rust
/// use glyph::CanonOptions;
///
/// let options = CanonOptions::new()
///     .with_auto_tabular(false)
///     .with_min_table_rows(5);
/// assert_eq!(options.min_table_rows, 5);
/// ```
#[derive(Clone, Debug)]
pub struct CanonOptions {
    /// Emit eligible lists as table blocks. Default `true`.
    pub auto_tabular: bool,
    /// Minimum element count for tabular eligibility. Default 3.
    pub min_table_rows: usize,
    /// Maximum distinct column count for tabular eligibility. Default 32.
    pub max_table_cols: usize,
    /// Tolerate rows missing some columns (emitted as null). Default `true`.
    pub tolerate_missing: bool,
    /// Spelling of the null literal.
    pub null_style: NullStyle,
    /// Schema reference for compact-key output.
    pub schema: Option<SchemaRef>,
}

impl Default for CanonOptions {
    fn default() -> Self {
        CanonOptions {
            auto_tabular: true,
            min_table_rows: 3,
            max_table_cols: 32,
            tolerate_missing: true,
            null_style: NullStyle::default(),
            schema: None,
        }
    }
}

impl CanonOptions {
    /// Creates default options (auto-tabular on, 3-row minimum, `∅` null).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The pinned profile used for content hashing: tabular and schema modes
    /// off, ASCII null. Both ends of a stream must fingerprint state with the
    /// same profile, so it is fixed here rather than left to callers.
    #[must_use]
    pub fn hashing() -> Self {
        CanonOptions {
            auto_tabular: false,
            null_style: NullStyle::Ascii,
            schema: None,
            ..Default::default()
        }
    }

    /// Enables or disables the auto-tabular transform.
    #[must_use]
    pub fn with_auto_tabular(mut self, enabled: bool) -> Self {
        self.auto_tabular = enabled;
        self
    }

    /// Sets the minimum row count for tabular eligibility.
    #[must_use]
    pub fn with_min_table_rows(mut self, rows: usize) -> Self {
        self.min_table_rows = rows;
        self
    }

    /// Sets the maximum column count for tabular eligibility.
    #[must_use]
    pub fn with_max_table_cols(mut self, cols: usize) -> Self {
        self.max_table_cols = cols;
        self
    }

    /// Sets whether rows may omit columns (missing cells emit null).
    #[must_use]
    pub fn with_tolerate_missing(mut self, tolerate: bool) -> Self {
        self.tolerate_missing = tolerate;
        self
    }

    /// Sets the null spelling.
    #[must_use]
    pub fn with_null_style(mut self, style: NullStyle) -> Self {
        self.null_style = style;
        self
    }

    /// Sets the schema reference for compact-key output.
    #[must_use]
    pub fn with_schema(mut self, schema: SchemaRef) -> Self {
        self.schema = Some(schema);
        self
    }
}

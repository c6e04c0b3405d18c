//! GLYPH Format Reference
//!
//! This module documents the GLYPH text format and frame wire format as
//! implemented by this library.
//!
//! # Overview
//!
//! GLYPH is a compact, human-readable, deterministic serialization format —
//! a structured alternative to JSON for programs exchanging data with
//! latency- and token-sensitive consumers such as language-model pipelines.
//! A value canonicalizes to exactly one text string, which makes byte
//! comparison, hashing, and caching of encoded values meaningful.
//!
//! ## Design Philosophy
//!
//! - **Determinism**: one value, one encoding; map keys are sorted, numbers
//!   are normalized
//! - **Token Efficiency**: bare strings where safe, single-character
//!   literals, tabular compression of homogeneous data
//! - **Early validation**: structural errors surface at a byte offset, not
//!   after partial consumption
//! - **Readability**: the wire text stays legible to humans and LLMs
//!
//! # Literals
//!
//! | Type | Syntax | Example |
//! |------|--------|---------|
//! | Null | `∅` or `_` | `{a=∅}` |
//! | Boolean | `t` / `f` | `{active=t}` |
//! | Integer | decimal i64, no leading zeros | `count=42` |
//! | Float | shortest round-trip decimal | `price=19.99`, `tiny=1e-3` |
//! | String | bare or `"quoted"` | `name=Alice`, `note="two words"` |
//! | Bytes | `b"<base64>"` | `blob=b"aGk="` |
//! | Timestamp | RFC 3339 UTC | `created=2024-01-15T10:30:00Z` |
//! | Reference | `^prefix:value` | `owner=^user:alice` |
//!
//! ## Strings
//!
//! Strings are **bare by default** to minimize tokens. Quoting is required
//! when a string:
//!
//! - is empty or contains whitespace
//! - contains a reserved character: `"` `\` `[` `]` `{` `}` `(` `)` `=`
//!   `|` `^` `@` `:` `#`
//! - equals a reserved literal: `t`, `f`, `∅`, `_`
//! - parses as a number (`"42"`, `"1e-6"`) or starts like a timestamp
//!
//! **Escape sequences** (in quoted strings): `\"` `\\` `\n` `\r` `\t`.
//!
//! ## Numbers
//!
//! - `-0` canonicalizes to `0`; so does `-0.0`
//! - floats use the shorter of plain and exponent renderings, exponent
//!   letter lowercase (`1e20`, `1e-3`)
//! - a whole-valued float keeps a `.0` suffix (`2.0`) so the float/int
//!   distinction survives a round-trip
//!
//! # Collections
//!
//! ```text
//! [1 2 3]                    list, space-joined
//! {a=2 b=1}                  map, keys sorted by canonical key bytes
//! Point{x=1 y=2}             struct: map with a nominal type tag
//! Some(42) / None()          sum: tagged union value
//! ```
//!
//! Empty collections keep their brackets: `[]`, `{}`.
//!
//! # Table Blocks
//!
//! A list of at least 3 homogeneous records (all maps, or all structs of one
//! type) with a bounded column set emits as a table:
//!
//! ```text
//! @tab _ [id name]
//! |1|Ada|
//! |2|Alan|
//! |3|Barbara|
//! @end
//! ```
//!
//! - the type position holds the struct name, or `_` for maps
//! - columns are ordered by descending frequency across rows, ties broken
//!   lexicographically
//! - rows appear in original list order; missing keys emit null
//! - cells hold scalars in scalar form and nested structures in their inline
//!   (never tabular) canonical form; `|` inside a cell is escaped as `\|`
//! - `@end` closes the block; as a compatibility fallback a line that does
//!   not start with `|` also ends it
//!
//! Tabular encoding is reversible: decoding a table yields the same value as
//! decoding the bracketed form.
//!
//! # Schema Headers
//!
//! Given an agreed key dictionary, documents can compress keys to indexes:
//!
//! ```text
//! @schema S1 [age name]
//! {#0=36 #1=Ada}
//! ```
//!
//! decodes identically to `{age=36 name=Ada}`. The dictionary may also be
//! supplied out of band via parse options.
//!
//! # Pool References
//!
//! `^S<pool>:<index>` refers to a value stored once in a pool registry.
//! References parse as ordinary ids; a separate resolution pass substitutes
//! the pooled values and leaves unresolved references untouched.
//!
//! # Frame Wire Format
//!
//! Frames carry GLYPH payloads (or opaque bytes) over an ordered byte
//! stream:
//!
//! ```text
//! @frame{v=1 sid=<u64> seq=<u64> kind=<name|number> len=<bytes> [crc=<8-hex>] [base=sha256:<64-hex>] [final=true]}
//! <exactly len bytes of payload>
//! ```
//!
//! with one newline after the header and one after the payload.
//!
//! - **sid** multiplexes independent logical streams
//! - **seq** is monotonic per stream, starting at 1; 0 is reserved for
//!   unsequenced frames (ping/pong)
//! - **kind**: `doc`, `patch`, `row`, `ui`, `ack`, `err`, `ping`, `pong`;
//!   unrecognized numeric kinds pass through
//! - **len** is authoritative; payload bytes are never scanned for
//!   delimiters
//! - **crc** is CRC-32 of the payload; a mismatch drops the frame
//! - **base** is the SHA-256 content hash of the state a patch was computed
//!   against; a mismatch rejects the patch without touching stream state
//! - **final** marks the last frame of a logical stream
//!
//! # Limitations
//!
//! - map keys must be strings
//! - struct type names and sum tags are identifiers
//! - non-finite floats have no literal and emit as null
//! - comments are not part of the format

// This module contains only documentation; no implementation code

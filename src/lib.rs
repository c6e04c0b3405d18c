//! # glyph
//!
//! A compact, human-readable, deterministic serialization format (GLYPH)
//! plus a framing protocol for streaming it over any ordered byte transport.
//!
//! ## What is GLYPH?
//!
//! GLYPH is a structured alternative to JSON aimed at latency- and
//! token-sensitive consumers such as language-model pipelines. Every value
//! has exactly one canonical text encoding, homogeneous collections compress
//! automatically into table blocks, and the streaming layer ties state
//! updates to content hashes so a patch can only ever apply to the state it
//! was computed against.
//!
//! ## Key Features
//!
//! - **Deterministic codec**: `canonicalize(v)` is a pure function; two
//!   values are equal in the format iff their canonical strings are
//!   byte-identical
//! - **Auto-tabular**: lists of homogeneous records emit as compact
//!   `@tab ... @end` tables with no change to the decoded value
//! - **Schema & pool compression**: optional `@schema` key dictionaries and
//!   `^S<pool>:<index>` value pooling for further size wins
//! - **Structural patches**: `set`/`append`/`delete` at a path, applied
//!   all-or-nothing
//! - **Framed streaming**: self-describing frames with per-stream strict
//!   ordering, CRC-32 integrity, and SHA-256 base-hash consistency checks
//! - **No unsafe code**
//!
//! ## Quick Start
//!
//! ```rust
//! use glyph::{canonicalize, parse, glyph};
//!
//! let value = glyph!({
//!     "name": "Ada",
//!     "tags": ["math", "logic"]
//! });
//!
//! let text = canonicalize(&value);
//! assert_eq!(text, "{name=Ada tags=[math logic]}");
//!
//! let back = parse(&text).unwrap();
//! assert_eq!(back, value);
//! ```
//!
//! ### Tabular compression
//!
//! ```rust
//! use glyph::{canonicalize, glyph};
//!
//! let rows = glyph!([
//!     { "id": 1, "name": "Ada" },
//!     { "id": 2, "name": "Alan" },
//!     { "id": 3, "name": "Barbara" }
//! ]);
//!
//! assert_eq!(
//!     canonicalize(&rows),
//!     "@tab _ [id name]\n|1|Ada|\n|2|Alan|\n|3|Barbara|\n@end"
//! );
//! ```
//!
//! ### Streaming with base-hash verification
//!
//! ```rust
//! use glyph::{canonicalize, glyph, Frame, Patch, Path, StreamCursor};
//!
//! let cursor = StreamCursor::new();
//!
//! // A snapshot establishes the stream's state and its fingerprint.
//! cursor.handle(&Frame::doc(1, 1, "{count=1}")).unwrap();
//! let base = cursor.snapshot(1).unwrap().hash.unwrap();
//!
//! // A patch declares the state it was computed against.
//! let patch = Patch::new().set(Path::parse("count").unwrap(), glyph!(2));
//! let frame = Frame::patch(1, 2, canonicalize(&patch.to_value())).with_base(base);
//! cursor.handle(&frame).unwrap();
//!
//! assert_eq!(cursor.value(1).unwrap(), glyph!({ "count": 2 }));
//! ```
//!
//! ## Concurrency
//!
//! The canonicalizer and parser are synchronous and share no state between
//! invocations; call them from any thread. The [`StreamCursor`] is the one
//! component with built-in locking, so independent streams can be driven by
//! independent producers through a shared cursor. The incremental
//! [`FrameDecoder`] is a pull-based push-bytes/try-next object with no
//! internal threads.

pub mod canon;
pub mod convert;
pub mod cursor;
pub mod error;
pub mod frame;
pub mod hash;
pub mod macros;
pub mod map;
pub mod options;
pub mod parse;
pub mod patch;
pub mod spec;
pub mod value;

pub use canon::{canonicalize, canonicalize_with_options, is_bare_safe};
pub use convert::{to_value, ValueSerializer};
pub use cursor::{
    Disposition, DuplicatePolicy, FrameEvent, StateSnapshot, StreamCursor,
};
pub use error::{Error, Result, SequenceFault};
pub use frame::{Frame, FrameDecoder, FrameKind, PROTOCOL_VERSION};
pub use hash::{content_hash, crc32, BaseHash};
pub use map::GlyphMap;
pub use options::{CanonOptions, NullStyle, SchemaRef};
pub use parse::{parse, parse_with_options, PackedDecoder, ParseOptions, Pool};
pub use patch::{Op, Patch, Path, Segment};
pub use value::Value;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_scenario_from_json() {
        // {"b":1,"a":2} → {a=2 b=1}
        let json: serde_json::Value = serde_json::from_str(r#"{"b":1,"a":2}"#).unwrap();
        let value = to_value(&json).unwrap();
        assert_eq!(canonicalize(&value), "{a=2 b=1}");

        let back = parse("{a=2 b=1}").unwrap();
        let map = back.as_map().unwrap();
        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_round_trip_through_frame() {
        let value = glyph!({ "msg": "hello", "n": 3 });
        let frame = Frame::doc(1, 1, canonicalize(&value)).with_crc();
        let encoded = frame.encode();

        let mut decoder = FrameDecoder::new();
        decoder.push(&encoded);
        let decoded = decoder.try_next().unwrap().unwrap();
        let back = parse(decoded.payload_str().unwrap()).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_entry_points_compose() {
        let patch = Patch::new().set(Path::parse("x").unwrap(), glyph!(1));
        let state = patch.apply(&glyph!({})).unwrap();
        let hash = content_hash(&state);
        assert_eq!(hash, content_hash(&parse(&canonicalize(&state)).unwrap()));
    }
}

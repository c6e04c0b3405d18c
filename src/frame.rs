//! Frame encoding and decoding for the GLYPH streaming protocol.
//!
//! A frame is one self-delimiting unit on an ordered byte stream:
//!
//! ```text
//! @frame{v=1 sid=<u64> seq=<u64> kind=<name|number> len=<bytes> [crc=<8-hex>] [base=sha256:<64-hex>] [final=true]}
//! <exactly len bytes of payload>
//! ```
//!
//! with one newline after the header and one after the payload. The declared
//! length is authoritative: payload bytes are read by count, never scanned
//! for delimiters, so a payload may contain any byte including `@frame` and
//! newlines.
//!
//! Decoding is incremental-friendly: [`Frame::decode`] returns `Ok(None)`
//! when the buffer does not yet hold a complete frame, and [`FrameDecoder`]
//! wraps that in a push-bytes/try-next pattern for live transports. No
//! threads, no callbacks, no blocking reads.
//!
//! ## Usage
//!
//! ```rust
//! use glyph::{Frame, FrameDecoder, FrameKind};
//!
//! let frame = Frame::new(FrameKind::Doc, 7, 1, "{a=1}").with_crc();
//! let encoded = frame.encode();
//!
//! let mut decoder = FrameDecoder::new();
//! decoder.push(&encoded);
//! let decoded = decoder.try_next().unwrap().unwrap();
//! assert_eq!(decoded.sid, 7);
//! assert_eq!(decoded.payload.as_ref(), b"{a=1}");
//! assert!(decoder.try_next().unwrap().is_none());
//! ```

use crate::hash::{crc32, BaseHash};
use crate::{Error, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::str::FromStr;

/// Protocol version emitted by this implementation.
pub const PROTOCOL_VERSION: u8 = 1;

/// Header lines longer than this are malformed, not merely incomplete.
const MAX_HEADER: usize = 4096;

/// Maximum declared payload length. Bounds decoder memory on hostile input.
const MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// The kind of a frame. Unrecognized numeric kinds pass through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// Full document snapshot (GLYPH text payload).
    Doc,
    /// Patch against a prior state (GLYPH text payload).
    Patch,
    /// One appended row (GLYPH text payload).
    Row,
    /// UI/presentation hint.
    Ui,
    /// Acknowledgement.
    Ack,
    /// Error report.
    Err,
    /// Liveness probe.
    Ping,
    /// Liveness reply.
    Pong,
    /// A kind this implementation does not recognize, passed through.
    Other(u8),
}

impl FrameKind {
    /// Wire code for this kind.
    #[must_use]
    pub const fn code(&self) -> u8 {
        match self {
            FrameKind::Doc => 1,
            FrameKind::Patch => 2,
            FrameKind::Row => 3,
            FrameKind::Ui => 4,
            FrameKind::Ack => 5,
            FrameKind::Err => 6,
            FrameKind::Ping => 7,
            FrameKind::Pong => 8,
            FrameKind::Other(code) => *code,
        }
    }

    /// Wire name for recognized kinds.
    #[must_use]
    pub const fn name(&self) -> Option<&'static str> {
        match self {
            FrameKind::Doc => Some("doc"),
            FrameKind::Patch => Some("patch"),
            FrameKind::Row => Some("row"),
            FrameKind::Ui => Some("ui"),
            FrameKind::Ack => Some("ack"),
            FrameKind::Err => Some("err"),
            FrameKind::Ping => Some("ping"),
            FrameKind::Pong => Some("pong"),
            FrameKind::Other(_) => None,
        }
    }

    /// Maps a wire code back to a kind.
    #[must_use]
    pub const fn from_code(code: u8) -> Self {
        match code {
            1 => FrameKind::Doc,
            2 => FrameKind::Patch,
            3 => FrameKind::Row,
            4 => FrameKind::Ui,
            5 => FrameKind::Ack,
            6 => FrameKind::Err,
            7 => FrameKind::Ping,
            8 => FrameKind::Pong,
            other => FrameKind::Other(other),
        }
    }

    fn parse_attr(value: &str) -> Result<Self> {
        match value {
            "doc" => Ok(FrameKind::Doc),
            "patch" => Ok(FrameKind::Patch),
            "row" => Ok(FrameKind::Row),
            "ui" => Ok(FrameKind::Ui),
            "ack" => Ok(FrameKind::Ack),
            "err" => Ok(FrameKind::Err),
            "ping" => Ok(FrameKind::Ping),
            "pong" => Ok(FrameKind::Pong),
            other => {
                let code: u8 = other
                    .parse()
                    .map_err(|_| Error::frame(format!("unknown frame kind `{}`", other)))?;
                Ok(FrameKind::from_code(code))
            }
        }
    }
}

/// One protocol frame. Owns its payload bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub version: u8,
    /// Stream id multiplexing independent logical streams.
    pub sid: u64,
    /// Per-stream sequence number; 1 is the first application frame, 0 is
    /// reserved for unsequenced frames.
    pub seq: u64,
    pub kind: FrameKind,
    pub payload: Bytes,
    /// Declared CRC-32 of the payload, when integrity is requested.
    pub crc: Option<u32>,
    /// Content hash of the state a patch was computed against.
    pub base: Option<BaseHash>,
    /// Marks the last frame of a logical stream.
    pub final_marker: bool,
}

impl Frame {
    /// Creates a frame with no optional attributes.
    pub fn new(kind: FrameKind, sid: u64, seq: u64, payload: impl Into<Bytes>) -> Self {
        Frame {
            version: PROTOCOL_VERSION,
            sid,
            seq,
            kind,
            payload: payload.into(),
            crc: None,
            base: None,
            final_marker: false,
        }
    }

    /// Creates a document snapshot frame.
    pub fn doc(sid: u64, seq: u64, payload: impl Into<Bytes>) -> Self {
        Frame::new(FrameKind::Doc, sid, seq, payload)
    }

    /// Creates a patch frame.
    pub fn patch(sid: u64, seq: u64, payload: impl Into<Bytes>) -> Self {
        Frame::new(FrameKind::Patch, sid, seq, payload)
    }

    /// Creates an unsequenced ping frame.
    pub fn ping(sid: u64) -> Self {
        Frame::new(FrameKind::Ping, sid, 0, Bytes::new())
    }

    /// Creates an unsequenced pong frame echoing a ping payload.
    pub fn pong(sid: u64, ping_payload: &[u8]) -> Self {
        Frame::new(FrameKind::Pong, sid, 0, Bytes::copy_from_slice(ping_payload))
    }

    /// Attaches a CRC-32 computed over the payload.
    #[must_use]
    pub fn with_crc(mut self) -> Self {
        self.crc = Some(crc32(&self.payload));
        self
    }

    /// Attaches an explicitly supplied CRC-32 (not recomputed).
    #[must_use]
    pub fn with_declared_crc(mut self, crc: u32) -> Self {
        self.crc = Some(crc);
        self
    }

    /// Attaches a base content hash.
    #[must_use]
    pub fn with_base(mut self, base: BaseHash) -> Self {
        self.base = Some(base);
        self
    }

    /// Marks this frame as the stream's final frame.
    #[must_use]
    pub fn with_final(mut self) -> Self {
        self.final_marker = true;
        self
    }

    /// The payload as UTF-8 text, for kinds that carry GLYPH documents.
    pub fn payload_str(&self) -> Result<&str> {
        std::str::from_utf8(&self.payload)
            .map_err(|e| Error::frame(format!("payload is not UTF-8: {}", e)))
    }

    /// Encodes this frame to bytes.
    #[must_use]
    pub fn encode(&self) -> BytesMut {
        let mut header = format!(
            "@frame{{v={} sid={} seq={} kind=",
            self.version, self.sid, self.seq
        );
        match self.kind.name() {
            Some(name) => header.push_str(name),
            None => header.push_str(&self.kind.code().to_string()),
        }
        header.push_str(&format!(" len={}", self.payload.len()));
        if let Some(crc) = self.crc {
            header.push_str(&format!(" crc={:08x}", crc));
        }
        if let Some(base) = &self.base {
            header.push_str(&format!(" base={}", base));
        }
        if self.final_marker {
            header.push_str(" final=true");
        }
        header.push('}');

        let mut buf = BytesMut::with_capacity(header.len() + self.payload.len() + 2);
        buf.put_slice(header.as_bytes());
        buf.put_u8(b'\n');
        buf.put_slice(&self.payload);
        buf.put_u8(b'\n');
        buf
    }

    /// Decodes one frame from the start of `data`.
    ///
    /// Returns `Ok(Some((frame, consumed)))` on success, `Ok(None)` when
    /// `data` does not yet hold a complete frame.
    ///
    /// # Errors
    ///
    /// [`Error::Frame`] on a malformed or oversized header,
    /// [`Error::Integrity`] when a declared CRC does not match the payload.
    pub fn decode(data: &[u8]) -> Result<Option<(Self, usize)>> {
        match Self::decode_unchecked(data)? {
            Some((frame, consumed)) => {
                frame.verify_crc()?;
                Ok(Some((frame, consumed)))
            }
            None => Ok(None),
        }
    }

    /// Checks the declared CRC against the payload, if one was declared.
    pub fn verify_crc(&self) -> Result<()> {
        if let Some(declared) = self.crc {
            let computed = crc32(&self.payload);
            if declared != computed {
                tracing::warn!(sid = self.sid, seq = self.seq, "frame failed crc check");
                return Err(Error::Integrity { declared, computed });
            }
        }
        Ok(())
    }

    /// Decode without CRC verification; the incremental decoder verifies
    /// separately so a corrupt frame can still be skipped past.
    fn decode_unchecked(data: &[u8]) -> Result<Option<(Self, usize)>> {
        let newline = match data.iter().position(|&b| b == b'\n') {
            Some(i) => i,
            None if data.len() > MAX_HEADER => {
                return Err(Error::frame("header exceeds maximum length"))
            }
            None => return Ok(None),
        };
        if newline > MAX_HEADER {
            return Err(Error::frame("header exceeds maximum length"));
        }

        let header = std::str::from_utf8(&data[..newline])
            .map_err(|_| Error::frame("header is not UTF-8"))?;
        let attrs = header
            .strip_prefix("@frame{")
            .and_then(|rest| rest.strip_suffix('}'))
            .ok_or_else(|| Error::frame("header must be @frame{...}"))?;

        let mut version = None;
        let mut sid = None;
        let mut seq = None;
        let mut kind = None;
        let mut len = None;
        let mut crc = None;
        let mut base = None;
        let mut final_marker = false;

        for (key, value) in split_attrs(attrs) {
            match key {
                "v" => version = Some(parse_int::<u8>("v", value)?),
                "sid" => sid = Some(parse_int::<u64>("sid", value)?),
                "seq" => seq = Some(parse_int::<u64>("seq", value)?),
                "kind" => kind = Some(FrameKind::parse_attr(value)?),
                "len" => {
                    let declared = parse_int::<usize>("len", value)?;
                    if declared > MAX_PAYLOAD {
                        return Err(Error::frame(format!(
                            "declared payload of {} bytes exceeds the {} byte limit",
                            declared, MAX_PAYLOAD
                        )));
                    }
                    len = Some(declared);
                }
                "crc" => {
                    let parsed = u32::from_str_radix(value, 16)
                        .map_err(|_| Error::frame("crc must be 8 hex digits"))?;
                    crc = Some(parsed);
                }
                "base" => base = Some(BaseHash::from_str(value)?),
                "final" => final_marker = matches!(value, "true" | "t"),
                // Unknown attributes are ignored for forward compatibility.
                _ => {}
            }
        }

        let len = len.ok_or_else(|| Error::frame("header missing len"))?;
        let frame_end = newline + 1 + len + 1;
        if data.len() < frame_end {
            return Ok(None);
        }
        let payload = Bytes::copy_from_slice(&data[newline + 1..newline + 1 + len]);
        if data[frame_end - 1] != b'\n' {
            return Err(Error::frame("payload not followed by newline"));
        }

        let frame = Frame {
            version: version.ok_or_else(|| Error::frame("header missing v"))?,
            sid: sid.ok_or_else(|| Error::frame("header missing sid"))?,
            seq: seq.ok_or_else(|| Error::frame("header missing seq"))?,
            kind: kind.ok_or_else(|| Error::frame("header missing kind"))?,
            payload,
            crc,
            base,
            final_marker,
        };
        Ok(Some((frame, frame_end)))
    }
}

fn parse_int<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::frame(format!("invalid {} attribute `{}`", key, value)))
}

/// Splits `k=v` attributes separated by whitespace and/or commas, treating
/// quoted spans as atomic and stripping quotes from values.
fn split_attrs(s: &str) -> Vec<(&str, &str)> {
    let mut pairs = Vec::new();
    let bytes = s.as_bytes();
    let mut pos = 0;
    while pos < bytes.len() {
        while pos < bytes.len() && matches!(bytes[pos], b' ' | b'\t' | b',') {
            pos += 1;
        }
        if pos >= bytes.len() {
            break;
        }
        let start = pos;
        let mut in_quotes = false;
        while pos < bytes.len() {
            match bytes[pos] {
                b'"' => in_quotes = !in_quotes,
                b'\\' if in_quotes => pos += 1,
                b' ' | b'\t' | b',' if !in_quotes => break,
                _ => {}
            }
            pos += 1;
        }
        let token = &s[start..pos.min(s.len())];
        if let Some(eq) = token.find('=') {
            let key = &token[..eq];
            let mut value = &token[eq + 1..];
            if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
                value = &value[1..value.len() - 1];
            }
            pairs.push((key, value));
        }
    }
    pairs
}

/// Incremental frame reader for live transports.
///
/// Push bytes as they arrive; [`try_next`](FrameDecoder::try_next) extracts
/// one complete frame or reports that more data is needed. Single-threaded
/// and cooperative; dropping the decoder releases its buffer and nothing
/// else.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: BytesMut,
}

impl FrameDecoder {
    /// Creates an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends transport bytes to the internal buffer.
    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Number of buffered bytes not yet consumed.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Extracts the next complete frame, if the buffer holds one.
    ///
    /// Returns `Ok(None)` when more bytes are needed. A frame that fails its
    /// CRC check is consumed from the buffer and reported as
    /// [`Error::Integrity`], so the following frame remains reachable.
    pub fn try_next(&mut self) -> Result<Option<Frame>> {
        match Frame::decode_unchecked(&self.buf)? {
            Some((frame, consumed)) => {
                self.buf.advance(consumed);
                frame.verify_crc()?;
                Ok(Some(frame))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_round_trip() {
        let frame = Frame::doc(3, 1, "{a=1}").with_crc().with_final();
        let encoded = frame.encode();
        let (decoded, consumed) = Frame::decode(&encoded).unwrap().unwrap();
        assert_eq!(consumed, encoded.len());
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_header_shape() {
        let frame = Frame::doc(3, 1, "{a=1}");
        let encoded = frame.encode();
        let text = std::str::from_utf8(&encoded).unwrap();
        assert!(text.starts_with("@frame{v=1 sid=3 seq=1 kind=doc len=5}\n"));
    }

    #[test]
    fn test_payload_may_contain_structural_bytes() {
        let payload = b"@frame{v=1}\n|pipes|and\nnewlines".to_vec();
        let frame = Frame::new(FrameKind::Ui, 1, 1, payload.clone()).with_crc();
        let encoded = frame.encode();
        let (decoded, _) = Frame::decode(&encoded).unwrap().unwrap();
        assert_eq!(decoded.payload.as_ref(), &payload[..]);
    }

    #[test]
    fn test_crc_detects_corruption() {
        let frame = Frame::doc(1, 1, "{a=1}").with_crc();
        let mut encoded = frame.encode();
        // Flip one payload byte, leaving the header intact.
        let header_len = encoded.iter().position(|&b| b == b'\n').unwrap() + 1;
        encoded[header_len] ^= 0x01;
        let result = Frame::decode(&encoded);
        assert!(matches!(result, Err(Error::Integrity { .. })));
    }

    #[test]
    fn test_incomplete_returns_none() {
        let frame = Frame::doc(1, 1, "{a=1}");
        let encoded = frame.encode();
        for cut in 0..encoded.len() {
            assert!(Frame::decode(&encoded[..cut]).unwrap().is_none(), "cut={}", cut);
        }
    }

    #[test]
    fn test_unknown_numeric_kind_passes_through() {
        let frame = Frame::new(FrameKind::Other(42), 1, 1, Bytes::new());
        let encoded = frame.encode();
        let text = std::str::from_utf8(&encoded).unwrap();
        assert!(text.contains("kind=42"));
        let (decoded, _) = Frame::decode(&encoded).unwrap().unwrap();
        assert_eq!(decoded.kind, FrameKind::Other(42));
    }

    #[test]
    fn test_unknown_attr_ignored() {
        let data = b"@frame{v=1 sid=1 seq=1 kind=doc len=2 future=\"x y\"}\nhi\n";
        let (frame, consumed) = Frame::decode(data).unwrap().unwrap();
        assert_eq!(consumed, data.len());
        assert_eq!(frame.payload.as_ref(), b"hi");
    }

    #[test]
    fn test_attrs_comma_separated_and_reordered() {
        let data = b"@frame{len=2,kind=doc,seq=9,sid=4,v=1}\nok\n";
        let (frame, _) = Frame::decode(data).unwrap().unwrap();
        assert_eq!(frame.sid, 4);
        assert_eq!(frame.seq, 9);
        assert_eq!(frame.payload.as_ref(), b"ok");
    }

    #[test]
    fn test_decoder_one_byte_at_a_time() {
        let frame = Frame::doc(2, 1, "{n=1}").with_crc();
        let encoded = frame.encode();

        let mut decoder = FrameDecoder::new();
        let mut seen = Vec::new();
        for &byte in encoded.iter() {
            decoder.push(&[byte]);
            if let Some(frame) = decoder.try_next().unwrap() {
                seen.push(frame);
            }
        }
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], frame);
        assert!(decoder.try_next().unwrap().is_none());
    }

    #[test]
    fn test_decoder_skips_past_corrupt_frame() {
        let bad = Frame::doc(1, 1, "{a=1}").with_declared_crc(0xdead_beef);
        let good = Frame::doc(1, 2, "{a=2}").with_crc();

        let mut decoder = FrameDecoder::new();
        decoder.push(&bad.encode());
        decoder.push(&good.encode());

        assert!(matches!(decoder.try_next(), Err(Error::Integrity { .. })));
        let next = decoder.try_next().unwrap().unwrap();
        assert_eq!(next.seq, 2);
    }

    #[test]
    fn test_ping_pong_echo() {
        let ping = Frame::ping(5);
        let (decoded_ping, _) = Frame::decode(&ping.encode()).unwrap().unwrap();
        assert_eq!(decoded_ping.kind, FrameKind::Ping);
        assert_eq!(decoded_ping.seq, 0);

        let pong = Frame::pong(5, &decoded_ping.payload);
        let (decoded_pong, _) = Frame::decode(&pong.encode()).unwrap().unwrap();
        assert_eq!(decoded_pong.kind, FrameKind::Pong);
        assert_eq!(decoded_pong.payload, decoded_ping.payload);
    }

    #[test]
    fn test_oversized_declared_length_rejected() {
        let data = b"@frame{v=1 sid=1 seq=1 kind=doc len=999999999999}\n";
        assert!(matches!(Frame::decode(data), Err(Error::Frame(_))));
    }

    #[test]
    fn test_base_attr_round_trip() {
        let base = crate::content_hash(&crate::glyph!({ "a": 1 }));
        let frame = Frame::patch(1, 2, "[]").with_base(base);
        let (decoded, _) = Frame::decode(&frame.encode()).unwrap().unwrap();
        assert_eq!(decoded.base, Some(base));
    }
}

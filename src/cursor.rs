//! Per-stream state tracking and frame dispatch.
//!
//! A [`StreamCursor`] multiplexes independent logical streams (by stream id)
//! over one frame source. For each stream it enforces strict sequence
//! ordering, verifies patch base hashes against the stream's current content
//! hash, materializes document state from `doc` and `patch` frames, tracks an
//! acknowledgement watermark, and dispatches per-kind callbacks.
//!
//! The cursor is the one component with built-in synchronization: distinct
//! streams are expected to be driven by independent producers concurrently,
//! so the stream map sits behind a [`parking_lot::RwLock`]. Callbacks run
//! outside the lock. The canonicalizer and parser are consulted only through
//! their pure entry points; nothing here blocks.
//!
//! ## Usage
//!
//! ```rust
//! use glyph::{Frame, StreamCursor};
//!
//! let mut cursor = StreamCursor::new();
//! cursor.on_kind(glyph::FrameKind::Doc, |event| {
//!     println!("doc on stream {} seq {}", event.sid, event.seq);
//! });
//!
//! cursor.handle(&Frame::doc(1, 1, "{a=1}")).unwrap();
//! assert_eq!(cursor.snapshot(1).unwrap().last_seq, 1);
//! ```

use crate::hash::{content_hash, BaseHash};
use crate::{Error, Frame, FrameKind, Patch, Result, SequenceFault, Value};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, warn};

/// How [`StreamCursor::handle`] treats a frame whose sequence number was
/// already seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Fail with [`Error::Sequence`]. The default: surface and halt.
    #[default]
    Error,
    /// Drop the frame silently and report [`Disposition::Duplicate`].
    Ignore,
}

/// Outcome of handling one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The frame advanced stream state and was dispatched.
    Applied,
    /// The frame was a duplicate and was dropped (policy: ignore).
    Duplicate,
    /// The frame advanced stream state and finished the stream.
    Finished,
}

/// Point-in-time view of one stream's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StateSnapshot {
    /// Highest sequence number processed; 0 before any sequenced frame.
    pub last_seq: u64,
    /// Acknowledgement watermark.
    pub last_acked: u64,
    /// Content hash of the materialized value, when one exists.
    pub hash: Option<BaseHash>,
    /// Whether a final-flagged frame has been processed.
    pub finished: bool,
}

/// What a per-kind callback receives.
pub struct FrameEvent<'a> {
    pub sid: u64,
    pub seq: u64,
    pub kind: FrameKind,
    pub payload: &'a [u8],
    /// Stream state after this frame's bookkeeping.
    pub state: StateSnapshot,
}

type KindHandler = Box<dyn Fn(&FrameEvent<'_>) + Send + Sync>;
type GapHandler = Box<dyn Fn(u64, u64, u64) -> bool + Send + Sync>;
type BaseMismatchHandler = Box<dyn Fn(u64, u64) -> bool + Send + Sync>;
type FinalHandler = Box<dyn Fn(u64) + Send + Sync>;

#[derive(Debug, Default)]
struct SidState {
    last_seq: u64,
    last_acked: u64,
    hash: Option<BaseHash>,
    /// Materialized document, when `doc`/`patch` frames have been seen.
    value: Option<Value>,
    finished: bool,
}

impl SidState {
    fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            last_seq: self.last_seq,
            last_acked: self.last_acked,
            hash: self.hash,
            finished: self.finished,
        }
    }
}

/// The per-stream state machine and frame dispatcher.
///
/// Register callbacks before sharing the cursor across threads; `handle`
/// takes `&self` and is safe to call concurrently for distinct streams.
#[derive(Default)]
pub struct StreamCursor {
    streams: RwLock<HashMap<u64, SidState>>,
    handlers: HashMap<u8, KindHandler>,
    gap_handler: Option<GapHandler>,
    base_mismatch_handler: Option<BaseMismatchHandler>,
    final_handler: Option<FinalHandler>,
    duplicate_policy: DuplicatePolicy,
}

impl StreamCursor {
    /// Creates a cursor with no callbacks and the default duplicate policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the duplicate policy.
    #[must_use]
    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    /// Registers the callback for one frame kind. Kinds without a callback
    /// are still tracked for sequencing; dispatch is simply a no-op.
    pub fn on_kind<F>(&mut self, kind: FrameKind, handler: F)
    where
        F: Fn(&FrameEvent<'_>) + Send + Sync + 'static,
    {
        self.handlers.insert(kind.code(), Box::new(handler));
    }

    /// Registers the gap callback: `(sid, expected, got)`, returning `true`
    /// to accept the gap and let state advance. Without one, gaps fail.
    pub fn on_gap<F>(&mut self, handler: F)
    where
        F: Fn(u64, u64, u64) -> bool + Send + Sync + 'static,
    {
        self.gap_handler = Some(Box::new(handler));
    }

    /// Registers the base-mismatch callback: `(sid, seq)`, returning `true`
    /// to override the failure and process the frame anyway.
    pub fn on_base_mismatch<F>(&mut self, handler: F)
    where
        F: Fn(u64, u64) -> bool + Send + Sync + 'static,
    {
        self.base_mismatch_handler = Some(Box::new(handler));
    }

    /// Registers the final callback, fired exactly once per stream when a
    /// final-flagged frame is processed.
    pub fn on_final<F>(&mut self, handler: F)
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        self.final_handler = Some(Box::new(handler));
    }

    /// Processes one frame: ordering checks, base verification,
    /// materialization, then callback dispatch.
    ///
    /// # Errors
    ///
    /// [`Error::Sequence`] on gaps and duplicates (per policy),
    /// [`Error::BaseMismatch`] when a patch's base does not match the
    /// stream's current hash, [`Error::Syntax`]/[`Error::Path`] when a
    /// `doc`/`patch` payload fails to parse or apply. On any error the
    /// stream's state is left exactly as it was.
    pub fn handle(&self, frame: &Frame) -> Result<Disposition> {
        let mut fire_final = false;
        let snapshot = {
            let mut streams = self.streams.write();
            let state = streams.entry(frame.sid).or_default();

            // seq 0 is reserved/unsequenced: dispatch only, no ordering.
            if frame.seq != 0 {
                if frame.seq <= state.last_seq {
                    match self.duplicate_policy {
                        DuplicatePolicy::Ignore => {
                            debug!(sid = frame.sid, seq = frame.seq, "dropping duplicate frame");
                            return Ok(Disposition::Duplicate);
                        }
                        DuplicatePolicy::Error => {
                            return Err(Error::Sequence {
                                sid: frame.sid,
                                expected: state.last_seq + 1,
                                got: frame.seq,
                                fault: SequenceFault::Duplicate,
                            });
                        }
                    }
                }
                if frame.seq > state.last_seq + 1 {
                    let expected = state.last_seq + 1;
                    let accepted = self
                        .gap_handler
                        .as_ref()
                        .map(|cb| cb(frame.sid, expected, frame.seq))
                        .unwrap_or(false);
                    if !accepted {
                        return Err(Error::Sequence {
                            sid: frame.sid,
                            expected,
                            got: frame.seq,
                            fault: SequenceFault::Gap,
                        });
                    }
                    warn!(
                        sid = frame.sid,
                        expected,
                        got = frame.seq,
                        "gap accepted by callback"
                    );
                }
            }

            if frame.kind == FrameKind::Patch {
                if let Some(declared) = frame.base {
                    if state.hash != Some(declared) {
                        let overridden = self
                            .base_mismatch_handler
                            .as_ref()
                            .map(|cb| cb(frame.sid, frame.seq))
                            .unwrap_or(false);
                        if !overridden {
                            return Err(Error::BaseMismatch {
                                sid: frame.sid,
                                seq: frame.seq,
                                declared: declared.to_string(),
                                current: state
                                    .hash
                                    .map(|h| h.to_string())
                                    .unwrap_or_else(|| "none".to_string()),
                            });
                        }
                        warn!(sid = frame.sid, seq = frame.seq, "base mismatch overridden");
                    }
                }
            }

            // Materialize before advancing so a payload failure leaves the
            // stream untouched.
            let materialized = match frame.kind {
                FrameKind::Doc => {
                    let value = crate::parse(frame.payload_str()?)?;
                    Some(value)
                }
                FrameKind::Patch => match &state.value {
                    Some(current) => {
                        let doc = crate::parse(frame.payload_str()?)?;
                        let patch = Patch::from_value(&doc)?;
                        Some(patch.apply(current)?)
                    }
                    // No materialized state to patch (payload-opaque
                    // transport); sequencing still advances.
                    None => None,
                },
                _ => None,
            };
            if let Some(value) = materialized {
                state.hash = Some(content_hash(&value));
                state.value = Some(value);
            }

            if frame.seq != 0 {
                state.last_seq = frame.seq;
            }
            if frame.final_marker && !state.finished {
                state.finished = true;
                fire_final = true;
            }
            state.snapshot()
        };

        if fire_final {
            if let Some(cb) = &self.final_handler {
                cb(frame.sid);
            }
        }
        if let Some(handler) = self.handlers.get(&frame.kind.code()) {
            handler(&FrameEvent {
                sid: frame.sid,
                seq: frame.seq,
                kind: frame.kind,
                payload: &frame.payload,
                state: snapshot,
            });
        }

        Ok(if fire_final {
            Disposition::Finished
        } else {
            Disposition::Applied
        })
    }

    /// Raises the acknowledgement watermark for one stream. Acks below the
    /// watermark are ignored; the watermark never regresses.
    pub fn ack(&self, sid: u64, seq: u64) {
        let mut streams = self.streams.write();
        let state = streams.entry(sid).or_default();
        if seq > state.last_acked {
            state.last_acked = seq;
        }
    }

    /// Sequence numbers seen but not yet acknowledged, in order.
    #[must_use]
    pub fn unacked(&self, sid: u64) -> Vec<u64> {
        let streams = self.streams.read();
        match streams.get(&sid) {
            Some(state) => (state.last_acked + 1..=state.last_seq).collect(),
            None => Vec::new(),
        }
    }

    /// Point lookup of one stream's state. Does not create the stream.
    #[must_use]
    pub fn snapshot(&self, sid: u64) -> Option<StateSnapshot> {
        self.streams.read().get(&sid).map(SidState::snapshot)
    }

    /// The stream's materialized value, if `doc`/`patch` frames built one.
    #[must_use]
    pub fn value(&self, sid: u64) -> Option<Value> {
        self.streams.read().get(&sid).and_then(|s| s.value.clone())
    }

    /// Deletes a stream's state. Streams are caller-managed; nothing is
    /// removed implicitly.
    pub fn remove(&self, sid: u64) -> bool {
        self.streams.write().remove(&sid).is_some()
    }
}

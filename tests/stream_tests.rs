//! End-to-end streaming tests: frame codec, incremental decoding, and the
//! cursor's ordering/consistency guarantees.

use glyph::{
    canonicalize, content_hash, glyph, parse, Disposition, DuplicatePolicy, Error, Frame,
    FrameDecoder, FrameKind, Patch, Path, SequenceFault, StreamCursor,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn patch_payload(patch: &Patch) -> String {
    canonicalize(&patch.to_value())
}

#[test]
fn test_wire_roundtrip_through_decoder() {
    let frames = vec![
        Frame::doc(1, 1, "{a=1}").with_crc(),
        Frame::new(FrameKind::Row, 1, 2, "{n=1}").with_crc(),
        Frame::new(FrameKind::Ui, 2, 1, "spinner").with_final(),
    ];

    let mut wire = Vec::new();
    for frame in &frames {
        wire.extend_from_slice(&frame.encode());
    }

    // Feed in awkward chunk sizes to exercise buffering.
    let mut decoder = FrameDecoder::new();
    let mut decoded = Vec::new();
    for chunk in wire.chunks(7) {
        decoder.push(chunk);
        while let Some(frame) = decoder.try_next().unwrap() {
            decoded.push(frame);
        }
    }
    assert_eq!(decoded, frames);
    assert_eq!(decoder.buffered(), 0);
}

#[test]
fn test_crc_detection_end_to_end() {
    let frame = Frame::doc(1, 1, "{important=t}").with_crc();
    let mut wire = frame.encode().to_vec();
    let header_len = wire.iter().position(|&b| b == b'\n').unwrap() + 1;
    wire[header_len + 3] ^= 0xff;

    let mut decoder = FrameDecoder::new();
    decoder.push(&wire);
    assert!(matches!(decoder.try_next(), Err(Error::Integrity { .. })));
}

#[test]
fn test_sequence_enforcement_1_2_4() {
    let cursor = StreamCursor::new();
    cursor.handle(&Frame::doc(1, 1, "{n=1}")).unwrap();
    cursor.handle(&Frame::doc(1, 2, "{n=2}")).unwrap();

    let err = cursor.handle(&Frame::doc(1, 4, "{n=4}")).unwrap_err();
    match err {
        Error::Sequence { sid, expected, got, fault } => {
            assert_eq!(sid, 1);
            assert_eq!(expected, 3);
            assert_eq!(got, 4);
            assert_eq!(fault, SequenceFault::Gap);
        }
        other => panic!("expected gap, got {:?}", other),
    }
}

#[test]
fn test_sequence_enforcement_1_2_2() {
    let cursor = StreamCursor::new();
    cursor.handle(&Frame::doc(1, 1, "{n=1}")).unwrap();
    cursor.handle(&Frame::doc(1, 2, "{n=2}")).unwrap();

    let err = cursor.handle(&Frame::doc(1, 2, "{n=2}")).unwrap_err();
    assert!(matches!(
        err,
        Error::Sequence { fault: SequenceFault::Duplicate, .. }
    ));
}

#[test]
fn test_streams_are_independent() {
    let cursor = StreamCursor::new();
    // Interleaved frames from two producers; each stream keeps its own
    // ordering.
    cursor.handle(&Frame::doc(1, 1, "{a=1}")).unwrap();
    cursor.handle(&Frame::doc(2, 1, "{b=1}")).unwrap();
    cursor.handle(&Frame::doc(1, 2, "{a=2}")).unwrap();
    cursor.handle(&Frame::doc(2, 2, "{b=2}")).unwrap();

    assert_eq!(cursor.value(1).unwrap(), glyph!({ "a": 2 }));
    assert_eq!(cursor.value(2).unwrap(), glyph!({ "b": 2 }));
}

#[test]
fn test_patch_flow_over_the_wire() {
    // Producer side: snapshot, then a patch computed against it.
    let initial = glyph!({ "users": [{ "name": "Ada" }], "count": 1 });
    let doc_frame = Frame::doc(7, 1, canonicalize(&initial)).with_crc();

    let base = content_hash(&initial);
    let patch = Patch::new()
        .set(Path::parse("count").unwrap(), glyph!(2))
        .append(
            Path::parse("users").unwrap(),
            glyph!({ "name": "Alan" }),
        );
    let patch_frame = Frame::patch(7, 2, patch_payload(&patch))
        .with_crc()
        .with_base(base);

    // Consumer side: bytes in, verified state out.
    let mut wire = Vec::new();
    wire.extend_from_slice(&doc_frame.encode());
    wire.extend_from_slice(&patch_frame.encode());

    let mut decoder = FrameDecoder::new();
    decoder.push(&wire);
    let cursor = StreamCursor::new();
    while let Some(frame) = decoder.try_next().unwrap() {
        cursor.handle(&frame).unwrap();
    }

    let expected = glyph!({ "users": [{ "name": "Ada" }, { "name": "Alan" }], "count": 2 });
    assert_eq!(cursor.value(7).unwrap(), expected);
    assert_eq!(cursor.snapshot(7).unwrap().hash.unwrap(), content_hash(&expected));
}

#[test]
fn test_stale_patch_rejected_then_resync() {
    let cursor = StreamCursor::new();
    cursor.handle(&Frame::doc(1, 1, "{count=1}")).unwrap();

    // A patch computed against some other state.
    let stale_base = content_hash(&glyph!({ "count": 99 }));
    let patch = Patch::new().set(Path::parse("count").unwrap(), glyph!(100));
    let err = cursor
        .handle(&Frame::patch(1, 2, patch_payload(&patch)).with_base(stale_base))
        .unwrap_err();
    assert!(matches!(err, Error::BaseMismatch { .. }));
    assert_eq!(cursor.value(1).unwrap(), glyph!({ "count": 1 }));
    assert_eq!(cursor.snapshot(1).unwrap().last_seq, 1);

    // The caller's recovery: request a fresh snapshot and continue.
    cursor.handle(&Frame::doc(1, 2, "{count=5}")).unwrap();
    let base = cursor.snapshot(1).unwrap().hash.unwrap();
    let patch = Patch::new().set(Path::parse("count").unwrap(), glyph!(6));
    cursor
        .handle(&Frame::patch(1, 3, patch_payload(&patch)).with_base(base))
        .unwrap();
    assert_eq!(cursor.value(1).unwrap(), glyph!({ "count": 6 }));
}

#[test]
fn test_row_frames_dispatch_without_materializing() {
    let rows = Arc::new(AtomicUsize::new(0));
    let mut cursor = StreamCursor::new();
    let counter = Arc::clone(&rows);
    cursor.on_kind(FrameKind::Row, move |event| {
        let row = parse(std::str::from_utf8(event.payload).unwrap()).unwrap();
        assert!(row.is_map());
        counter.fetch_add(1, Ordering::SeqCst);
    });

    for seq in 1..=3 {
        let payload = canonicalize(&glyph!({ "n": 1 }));
        cursor
            .handle(&Frame::new(FrameKind::Row, 1, seq, payload))
            .unwrap();
    }
    assert_eq!(rows.load(Ordering::SeqCst), 3);
    assert!(cursor.value(1).is_none());
}

#[test]
fn test_final_then_ack_flow() {
    let finals = Arc::new(AtomicUsize::new(0));
    let mut cursor = StreamCursor::new();
    let counter = Arc::clone(&finals);
    cursor.on_final(move |sid| {
        assert_eq!(sid, 3);
        counter.fetch_add(1, Ordering::SeqCst);
    });

    cursor.handle(&Frame::doc(3, 1, "{done=f}")).unwrap();
    let disposition = cursor
        .handle(&Frame::doc(3, 2, "{done=t}").with_final())
        .unwrap();
    assert_eq!(disposition, Disposition::Finished);
    assert_eq!(finals.load(Ordering::SeqCst), 1);

    assert_eq!(cursor.unacked(3), vec![1, 2]);
    cursor.ack(3, 2);
    assert_eq!(cursor.unacked(3), Vec::<u64>::new());

    // Stream teardown is caller-managed.
    assert!(cursor.remove(3));
}

#[test]
fn test_gap_policy_warn_and_continue() {
    let mut cursor = StreamCursor::new().with_duplicate_policy(DuplicatePolicy::Ignore);
    cursor.on_gap(|_, _, _| true);

    cursor.handle(&Frame::doc(1, 1, "{n=1}")).unwrap();
    // Lost frames 2 and 3; the gap callback accepts the jump.
    cursor.handle(&Frame::doc(1, 4, "{n=4}")).unwrap();
    assert_eq!(cursor.snapshot(1).unwrap().last_seq, 4);

    // A straggler duplicate is dropped quietly under the ignore policy.
    let disposition = cursor.handle(&Frame::doc(1, 2, "{n=2}")).unwrap();
    assert_eq!(disposition, Disposition::Duplicate);
    assert_eq!(cursor.value(1).unwrap(), glyph!({ "n": 4 }));
}

#[test]
fn test_shared_cursor_across_threads() {
    let cursor = Arc::new(StreamCursor::new());
    let mut handles = Vec::new();
    for sid in 0..4u64 {
        let cursor = Arc::clone(&cursor);
        handles.push(std::thread::spawn(move || {
            for seq in 1..=50u64 {
                let payload = format!("{{n={}}}", seq);
                cursor.handle(&Frame::doc(sid, seq, payload)).unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
    for sid in 0..4u64 {
        assert_eq!(cursor.snapshot(sid).unwrap().last_seq, 50);
        assert_eq!(cursor.value(sid).unwrap(), glyph!({ "n": 50 }));
    }
}

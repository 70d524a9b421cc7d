//! Tests for framing, deframing and checksum validation

mod common;

use common::*;
use proptest::prelude::*;
use qcdm_lib::constants::MAX_WIRE_FRAME_SIZE;

fn drain(deframer: &mut Deframer) -> Vec<Frame> {
    std::iter::from_fn(|| deframer.try_take_frame()).collect()
}

#[test]
fn test_roundtrip_payload_with_reserved_bytes() {
    let payload = hex_to_bytes("7e7d7e7d005e5d207d7e");
    let wire = encode_frame(&payload);

    let mut deframer = Deframer::new();
    deframer.ingest(&wire);
    let frames = drain(&mut deframer);

    assert_eq!(frames.len(), 1);
    assert!(frames[0].crc_valid);
    assert_eq!(frames[0].payload, payload);
}

#[test]
fn test_frames_come_out_in_arrival_order() {
    let payloads = [hex_to_bytes("01"), hex_to_bytes("0203"), hex_to_bytes("7e0405")];
    let mut wire = Vec::new();
    for p in &payloads {
        wire.extend_from_slice(&encode_frame(p));
    }

    let mut deframer = Deframer::new();
    deframer.ingest(&wire);
    let frames = drain(&mut deframer);

    let got: Vec<_> = frames.iter().map(|f| f.payload.clone()).collect();
    assert_eq!(got, payloads);
    assert!(frames.iter().all(|f| f.crc_valid));
}

#[test]
fn test_drain_is_idempotent() {
    let mut deframer = Deframer::new();
    deframer.ingest(&encode_frame(&[0x10, 0x00, 0x01]));
    // incomplete second frame
    deframer.ingest(&[0x7E, 0x10, 0x00]);

    assert_eq!(drain(&mut deframer).len(), 1);
    let pending = deframer.buffered_len();
    for _ in 0..5 {
        assert!(deframer.try_take_frame().is_none());
        assert_eq!(deframer.buffered_len(), pending);
    }
}

#[test]
fn test_empty_chunks_are_accepted() {
    let mut deframer = Deframer::new();
    deframer.ingest(&[]);
    assert!(deframer.try_take_frame().is_none());
    deframer.ingest(&encode_frame(&[0xAA]));
    deframer.ingest(&[]);
    assert_eq!(drain(&mut deframer).len(), 1);
}

#[test]
fn test_split_feed_at_every_boundary() {
    // Payload with escapes so splits land between escape byte and escaped byte
    let payload = hex_to_bytes("10007e7d0102037d7e");
    let wire = encode_frame(&payload);

    let mut whole = Deframer::new();
    whole.ingest(&wire);
    let expected = drain(&mut whole);
    assert_eq!(expected.len(), 1);

    for split in 0..=wire.len() {
        let mut deframer = Deframer::new();
        deframer.ingest(&wire[..split]);
        let mut frames = drain(&mut deframer);
        deframer.ingest(&wire[split..]);
        frames.extend(drain(&mut deframer));
        assert_eq!(frames, expected, "split at {}", split);
    }
}

#[test]
fn test_byte_at_a_time_feed() {
    let payload = log_packet(0xB0C0, 1, &[0x7E, 0x7D, 0x00]);
    let wire = encode_frame(&payload);

    let mut deframer = Deframer::new();
    let mut frames = Vec::new();
    for byte in wire.iter() {
        deframer.ingest(std::slice::from_ref(byte));
        frames.extend(drain(&mut deframer));
    }
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].payload, payload);
}

#[test]
fn test_single_bit_flip_invalidates_frame() {
    let wire = encode_frame(UNESCAPED_PAYLOAD);
    // payload bytes sit unescaped right after the opening flag
    assert_eq!(&wire[1..1 + UNESCAPED_PAYLOAD.len()], UNESCAPED_PAYLOAD);

    for pos in 1..1 + UNESCAPED_PAYLOAD.len() {
        for bit in 0..8 {
            let mut corrupted = wire.to_vec();
            corrupted[pos] ^= 1 << bit;

            let mut deframer = Deframer::new();
            deframer.ingest(&corrupted);
            let frames = drain(&mut deframer);
            assert_eq!(frames.len(), 1, "byte {} bit {}", pos, bit);
            assert!(!frames[0].crc_valid, "byte {} bit {} went undetected", pos, bit);
        }
    }
}

#[test]
fn test_garbage_before_frame_is_reported_invalid() {
    let mut wire = vec![0x01, 0x02, 0x03, 0x7E];
    wire.extend_from_slice(&encode_frame(&[0x10, 0x00]));

    let mut deframer = Deframer::new();
    deframer.ingest(&wire);
    let frames = drain(&mut deframer);
    assert_eq!(frames.len(), 2);
    assert!(!frames[0].crc_valid);
    assert!(frames[1].crc_valid);
}

#[test]
fn test_search_resumes_across_flagless_chunks() {
    let payload = log_packet(0xB0C0, 3, &[0x11; 64]);
    let wire = encode_frame(&payload);
    let body = &wire[1..];

    let mut deframer = Deframer::new();
    deframer.ingest(&wire[..1]);
    assert!(deframer.try_take_frame().is_none());

    // Everything up to the closing flag carries no delimiter
    for chunk in body[..body.len() - 1].chunks(5) {
        deframer.ingest(chunk);
        assert!(deframer.try_take_frame().is_none());
    }
    assert_eq!(deframer.buffered_len(), body.len() - 1);

    deframer.ingest(&body[body.len() - 1..]);
    let frame = deframer.try_take_frame().expect("frame");
    assert!(frame.crc_valid);
    assert_eq!(frame.payload, payload);
    assert_eq!(deframer.buffered_len(), 0);
    assert_eq!(deframer.discarded_bytes(), 0);
}

#[test]
fn test_unterminated_stream_is_bounded() {
    let mut deframer = Deframer::new();
    deframer.ingest(&vec![0x00; MAX_WIRE_FRAME_SIZE]);
    assert!(deframer.try_take_frame().is_none());
    assert_eq!(deframer.buffered_len(), MAX_WIRE_FRAME_SIZE);

    deframer.ingest(&[0x00]);
    assert!(deframer.try_take_frame().is_none());
    assert_eq!(deframer.buffered_len(), 0);
    assert_eq!(deframer.discarded_bytes(), MAX_WIRE_FRAME_SIZE as u64 + 1);

    // Framing recovers with the next delimited frame
    deframer.ingest(&encode_frame(&[0x10, 0x00]));
    let frames = drain(&mut deframer);
    assert_eq!(frames.len(), 1);
    assert!(frames[0].crc_valid);
}

proptest! {
    #[test]
    fn prop_roundtrip(payload in proptest::collection::vec(any::<u8>(), 0..512)) {
        let mut deframer = Deframer::new();
        deframer.ingest(&encode_frame(&payload));
        let frames = drain(&mut deframer);
        prop_assert_eq!(frames.len(), 1);
        prop_assert!(frames[0].crc_valid);
        prop_assert_eq!(frames[0].payload.as_ref(), payload.as_slice());
    }

    #[test]
    fn prop_split_feed_equivalence(
        payload in proptest::collection::vec(any::<u8>(), 0..128),
        split in any::<proptest::sample::Index>(),
    ) {
        let wire = encode_frame(&payload);
        let split = split.index(wire.len() + 1);

        let mut deframer = Deframer::new();
        deframer.ingest(&wire[..split]);
        let mut frames = drain(&mut deframer);
        deframer.ingest(&wire[split..]);
        frames.extend(drain(&mut deframer));

        prop_assert_eq!(frames.len(), 1);
        prop_assert!(frames[0].crc_valid);
        prop_assert_eq!(frames[0].payload.as_ref(), payload.as_slice());
    }

    #[test]
    fn prop_encoded_frame_has_no_inner_flags(payload in proptest::collection::vec(any::<u8>(), 0..256)) {
        let wire = encode_frame(&payload);
        prop_assert_eq!(wire[0], 0x7E);
        prop_assert_eq!(wire[wire.len() - 1], 0x7E);
        prop_assert!(!wire[1..wire.len() - 1].contains(&0x7E));
    }
}

//! Unit tests for the WebSocket frame codec.
//!
//! Covers length-field selection at each boundary, masking on the wire,
//! cached one-shot decoding, incremental decoding, and the blocking reader.

use std::io::Cursor;

use bytes::{Bytes, BytesMut};
use proptest::prelude::*;
use rstest::rstest;
use tokio_util::codec::{Decoder, Encoder};

use super::*;
use crate::error::EngineError;

fn payload_of(len: usize) -> Vec<u8> { (0..len).map(|i| (i % 251) as u8).collect() }

#[rstest]
#[case::empty(0)]
#[case::one(1)]
#[case::inline_max(125)]
#[case::short_min(126)]
#[case::short_max(65_535)]
#[case::long_min(65_536)]
#[case::multi_megabyte(3 * 1024 * 1024 + 7)]
fn masked_text_frames_round_trip(#[case] len: usize) {
    let data = payload_of(len);
    let wire = encode_frame(&data, Opcode::Text, true);

    let frame = decode_frame(&wire)
        .expect("decode should succeed")
        .expect("frame should be long enough to decode");

    assert_eq!(frame.payload().as_ref(), data.as_slice());
    assert_eq!(frame.opcode(), Opcode::Text);
    assert!(frame.fin());
    assert!(frame.mask_key().is_some());
}

#[rstest]
#[case::inline(125, 125, 2)]
#[case::sixteen_bit(126, 126, 4)]
#[case::sixty_four_bit(65_536, 127, 10)]
fn length_field_uses_smallest_representation(
    #[case] len: usize,
    #[case] marker: u8,
    #[case] header_len: usize,
) {
    let wire = encode_frame(&payload_of(len), Opcode::Text, false);

    assert_eq!(wire[1] & 0x7F, marker);
    assert_eq!(wire.len(), header_len + len);
}

#[test]
fn sixty_four_bit_length_is_written_as_two_halves() {
    let wire = encode_frame(&payload_of(65_536), Opcode::Binary, false);
    assert_eq!(&wire[2..10], &[0, 0, 0, 0, 0, 1, 0, 0]);
}

#[test]
fn header_bits_are_packed_high_to_low() {
    let frame = Frame::text(Bytes::from_static(b"abc")).masked(MaskKey::new(*b"?EV!"));
    let mut dst = BytesMut::new();
    encode_into(&frame, &mut dst);

    // fin | rsv=000 | opcode=0001, then mask | len=3
    assert_eq!(dst[0], 0b1000_0001);
    assert_eq!(dst[1], 0b1000_0011);
    assert_eq!(&dst[2..6], b"?EV!");
    assert_eq!(&dst[6..], mask_data(b"abc", MaskKey::new(*b"?EV!")).as_slice());
}

#[test]
fn decodes_reserved_bits_and_opcode() {
    let raw = [0b0101_1010, 0x01, b'x'];
    let frame = decode_frame(&raw).expect("decode").expect("frame");

    assert!(!frame.fin());
    assert_eq!(frame.rsv(), 0b101);
    assert_eq!(frame.opcode(), Opcode::Pong);
    assert_eq!(frame.payload().as_ref(), b"x");
}

#[rstest]
#[case::empty(&[])]
#[case::one(&[0x81])]
#[case::two(&[0x81, 0x00])]
fn short_inputs_decode_to_nothing(#[case] raw: &[u8]) {
    assert!(decode_frame(raw).expect("decode").is_none());
    let cached = RawFrame::new(Bytes::copy_from_slice(raw));
    assert!(cached.payload().expect("payload").is_empty());
}

#[test]
fn truncated_payload_is_a_protocol_violation() {
    let err = decode_frame(&[0x81, 0x05, b'a', b'b']).expect_err("payload is short");
    assert!(matches!(err, EngineError::ProtocolViolation(_)), "got {err:?}");
}

#[test]
fn zero_sixteen_bit_extension_is_rejected() {
    let err = decode_frame(&[0x81, 126, 0, 0]).expect_err("zero extended length");
    assert!(matches!(err, EngineError::ProtocolViolation(_)), "got {err:?}");
}

#[test]
fn raw_frame_caches_its_decoding() {
    let wire = encode_frame(b"cached payload", Opcode::Text, true);
    let raw = RawFrame::new(wire);

    let first = raw.decode().expect("decode").expect("frame");
    let second = raw.decode().expect("decode").expect("frame");

    assert!(std::ptr::eq(first, second), "second decode should reuse the cached frame");
    assert_eq!(raw.payload().expect("payload"), b"cached payload");
}

#[test]
fn unmasked_decode_reuses_input_memory() {
    let wire = encode_frame(b"zero copy", Opcode::Text, false);
    let mut buf = BytesMut::from(&wire[..]);
    let base = buf.as_ptr();
    let frame = WebSocketCodec::default()
        .decode(&mut buf)
        .expect("decode")
        .expect("frame");

    assert_eq!(frame.payload().as_ref(), b"zero copy");
    assert_eq!(
        frame.payload().as_ptr(),
        base.wrapping_add(2),
        "payload should point into the receive buffer"
    );
    assert!(buf.is_empty());
}

#[test]
fn codec_waits_for_complete_frames() {
    let wire = encode_frame(&payload_of(300), Opcode::Text, true);
    let mut codec = WebSocketCodec::default();
    let mut buf = BytesMut::new();

    for chunk in wire.chunks(7) {
        assert!(buf.is_empty() || codec.bytes_needed(&buf).expect("needed") > 0);
        buf.extend_from_slice(chunk);
        if buf.len() < wire.len() {
            assert!(codec.decode(&mut buf).expect("decode").is_none());
        }
    }

    let frame = codec.decode(&mut buf).expect("decode").expect("frame");
    assert_eq!(frame.payload().as_ref(), payload_of(300).as_slice());
}

#[rstest]
#[case::nothing(&[], 2)]
#[case::first_byte(&[0x81], 1)]
#[case::needs_extension(&[0x81, 126], 2)]
#[case::needs_mask(&[0x81, 0x80 | 126, 0x01, 0x00], 4)]
#[case::needs_payload(&[0x81, 126, 0x01, 0x00], 256)]
fn reports_missing_bytes(#[case] buf: &[u8], #[case] expected: usize) {
    let codec = WebSocketCodec::default();
    assert_eq!(codec.bytes_needed(buf).expect("needed"), expected);
}

#[test]
fn codec_rejects_oversized_payloads() {
    let wire = encode_frame(&payload_of(200), Opcode::Text, false);
    let mut codec = WebSocketCodec::new(128);
    let mut buf = BytesMut::from(&wire[..4]);

    let err = codec.decode(&mut buf).expect_err("payload exceeds limit");
    assert!(
        matches!(err, EngineError::FrameTooLarge { size: 200, max: 128 }),
        "got {err:?}"
    );
}

#[test]
fn codec_encoder_matches_free_function() {
    let frame = Frame::text(Bytes::from_static(b"42/chat,")).masked(MaskKey::new([9, 8, 7, 6]));
    let mut via_codec = BytesMut::new();
    WebSocketCodec::default()
        .encode(frame.clone(), &mut via_codec)
        .expect("encode");
    let mut direct = BytesMut::new();
    encode_into(&frame, &mut direct);

    assert_eq!(via_codec, direct);
}

#[test]
fn frame_reader_consumes_exactly_one_frame() {
    let mut wire = encode_frame(b"first", Opcode::Text, false).to_vec();
    wire.extend_from_slice(&encode_frame(b"second", Opcode::Text, true));
    let mut cursor = Cursor::new(wire);
    let mut reader = FrameReader::default();

    let first = reader.read_frame(&mut cursor).expect("first frame");
    assert_eq!(first.payload().as_ref(), b"first");
    assert_eq!(cursor.position(), 7);

    let second = reader.read_frame(&mut cursor).expect("second frame");
    assert_eq!(second.payload().as_ref(), b"second");
}

#[test]
fn frame_reader_reports_eof_mid_frame() {
    let wire = encode_frame(b"cut short", Opcode::Text, false);
    let mut cursor = Cursor::new(wire[..5].to_vec());

    let err = FrameReader::default()
        .read_frame(&mut cursor)
        .expect_err("stream ends mid-frame");
    assert!(matches!(err, EngineError::Io(_)), "got {err:?}");
}

/// Yields its input in fixed chunks, timing out once after `stall_after`
/// bytes.
struct StallingReader {
    data: Vec<u8>,
    pos: usize,
    stall_after: Option<usize>,
}

impl std::io::Read for StallingReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.stall_after == Some(self.pos) {
            self.stall_after = None;
            return Err(std::io::Error::new(std::io::ErrorKind::WouldBlock, "timed out"));
        }
        let limit = self.stall_after.unwrap_or(self.data.len());
        let n = buf.len().min(limit - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

#[test]
fn frame_reader_resumes_after_timeout_mid_payload() {
    let wire = encode_frame(b"hello world", Opcode::Text, false).to_vec();
    let mut stalling = StallingReader {
        data: wire,
        pos: 0,
        stall_after: Some(5),
    };
    let mut reader = FrameReader::default();

    let err = reader.read_frame(&mut stalling).expect_err("read times out");
    assert!(
        matches!(err, EngineError::Io(ref e) if e.kind() == std::io::ErrorKind::WouldBlock),
        "got {err:?}"
    );

    let frame = reader.read_frame(&mut stalling).expect("retry completes the frame");
    assert_eq!(frame.payload().as_ref(), b"hello world");
}

#[test]
fn frame_reader_accepts_empty_frames() {
    let mut cursor = Cursor::new(vec![0x81, 0x00]);
    let frame = FrameReader::default()
        .read_frame(&mut cursor)
        .expect("empty frame");
    assert!(frame.payload().is_empty());
}

proptest! {
    #[test]
    fn arbitrary_payloads_round_trip(data in proptest::collection::vec(any::<u8>(), 0..70_000), mask in any::<bool>()) {
        let wire = encode_frame(&data, Opcode::Binary, mask);
        let mut buf = BytesMut::from(&wire[..]);
        let frame = WebSocketCodec::default().decode(&mut buf).expect("decode").expect("frame");
        prop_assert_eq!(frame.payload().as_ref(), data.as_slice());
    }
}

//! Encoding and decoding of WebSocket frames.
//!
//! Three entry points share one header parser:
//!
//! - [`WebSocketCodec`] implements `tokio_util`'s [`Encoder`] and [`Decoder`] over a [`BytesMut`]
//!   buffer and is what the engine uses for every read and write.
//! - [`FrameReader`] drives the decoder from a blocking [`Read`], pulling exactly the bytes the
//!   next frame still needs.
//! - [`RawFrame`] / [`decode_frame`] decode one already-complete byte sequence and cache the result.

use std::{
    cell::OnceCell,
    io::{self, Read},
};

use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::{
    MaskKey,
    Opcode,
    length::{PayloadLength, extension_len, parse_length},
};
use crate::error::{EngineError, Result};

/// Default ceiling for inbound payloads (64 MiB).
pub const DEFAULT_MAX_PAYLOAD_LENGTH: usize = 64 * 1024 * 1024;

/// Inputs shorter than this are not decoded by [`decode_frame`].
pub const MIN_DECODE_LEN: usize = 3;

const MASK_KEY_LEN: usize = 4;

/// One WebSocket frame.
///
/// Outbound frames carry the key they will be masked with; inbound frames
/// carry the key they were unmasked with. The payload is always plain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    fin: bool,
    rsv: u8,
    opcode: Opcode,
    mask: Option<MaskKey>,
    payload: Bytes,
}

impl Frame {
    /// A final, unmasked frame with all reserved bits clear.
    #[must_use]
    pub fn new(opcode: Opcode, payload: impl Into<Bytes>) -> Self {
        Self {
            fin: true,
            rsv: 0,
            opcode,
            mask: None,
            payload: payload.into(),
        }
    }

    /// Shorthand for a final text frame.
    #[must_use]
    pub fn text(payload: impl Into<Bytes>) -> Self { Self::new(Opcode::Text, payload) }

    /// Mask the payload with `key` when encoded.
    #[must_use]
    pub fn masked(mut self, key: MaskKey) -> Self {
        self.mask = Some(key);
        self
    }

    /// Whether this is the final fragment.
    #[must_use]
    pub fn fin(&self) -> bool { self.fin }

    /// The three reserved bits, rsv1 in the highest position.
    #[must_use]
    pub fn rsv(&self) -> u8 { self.rsv }

    /// Frame opcode.
    #[must_use]
    pub fn opcode(&self) -> Opcode { self.opcode }

    /// Masking key, when the frame is masked.
    #[must_use]
    pub fn mask_key(&self) -> Option<MaskKey> { self.mask }

    /// Unmasked payload.
    #[must_use]
    pub fn payload(&self) -> &Bytes { &self.payload }

    /// Consume the frame, returning its payload.
    #[must_use]
    pub fn into_payload(self) -> Bytes { self.payload }
}

/// Parsed frame header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    fin: bool,
    rsv: u8,
    opcode: Opcode,
    mask: Option<MaskKey>,
    length: PayloadLength,
    header_len: usize,
}

impl FrameHeader {
    /// Header size implied by the second header byte.
    #[must_use]
    pub fn required_len(second: u8) -> usize {
        let mask_len = if second & 0x80 == 0 { 0 } else { MASK_KEY_LEN };
        2 + extension_len(second) + mask_len
    }

    /// Parse the header at the start of `src`.
    ///
    /// Returns `Ok(None)` while `src` does not yet hold the whole header.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ProtocolViolation`] for a 16-bit extended length
    /// of zero.
    pub fn parse(src: &[u8]) -> Result<Option<Self>> {
        let (Some(&first), Some(&second)) = (src.first(), src.get(1)) else {
            return Ok(None);
        };
        let header_len = Self::required_len(second);
        if src.len() < header_len {
            return Ok(None);
        }

        let ext_end = 2 + extension_len(second);
        let length = parse_length(second, &src[2..ext_end])?;
        if length == PayloadLength::Extended16(0) {
            return Err(EngineError::ProtocolViolation(
                "invalid extended packet length".to_owned(),
            ));
        }
        let mask = if second & 0x80 == 0 {
            None
        } else {
            let mut key = [0u8; MASK_KEY_LEN];
            key.copy_from_slice(&src[ext_end..ext_end + MASK_KEY_LEN]);
            Some(MaskKey::new(key))
        };

        Ok(Some(Self {
            fin: first & 0x80 != 0,
            rsv: (first >> 4) & 0b111,
            opcode: Opcode::from_bits(first),
            mask,
            length,
            header_len,
        }))
    }

    /// Frame opcode.
    #[must_use]
    pub fn opcode(&self) -> Opcode { self.opcode }

    /// Whether a masking key follows the length.
    #[must_use]
    pub fn is_masked(&self) -> bool { self.mask.is_some() }

    /// Length representation as sent by the peer.
    #[must_use]
    pub fn length(&self) -> PayloadLength { self.length }

    /// Offset of the first payload byte.
    #[must_use]
    pub fn header_len(&self) -> usize { self.header_len }

    /// Payload length in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ArchitectureLimitation`] when the length does
    /// not fit in `usize`.
    pub fn payload_len(&self) -> Result<usize> { self.length.to_usize() }

    /// Header plus payload length.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ArchitectureLimitation`] on overflow.
    pub fn frame_len(&self) -> Result<usize> {
        self.payload_len()?
            .checked_add(self.header_len)
            .ok_or(EngineError::ArchitectureLimitation)
    }

    fn build(&self, frame: &Bytes) -> Result<Frame> {
        let start = self.header_len;
        let payload_len = self.payload_len()?;
        let end = self.frame_len()?;
        let Some(body) = frame.get(start..end) else {
            return Err(EngineError::ProtocolViolation(format!(
                "truncated frame: {} of {payload_len} payload bytes present",
                frame.len().saturating_sub(start)
            )));
        };
        let payload = match self.mask {
            Some(key) => {
                let mut unmasked = BytesMut::from(body);
                key.apply(&mut unmasked);
                unmasked.freeze()
            }
            None => frame.slice(start..end),
        };
        Ok(Frame {
            fin: self.fin,
            rsv: self.rsv,
            opcode: self.opcode,
            mask: self.mask,
            payload,
        })
    }
}

/// Append the wire representation of `frame` to `dst`.
///
/// Layout: two header bytes, 0/2/8 extended-length bytes, 0/4 mask-key
/// bytes, then the (masked) payload.
pub fn encode_into(frame: &Frame, dst: &mut BytesMut) {
    let length = PayloadLength::for_len(frame.payload.len());
    let first = (u8::from(frame.fin) << 7) | ((frame.rsv & 0b111) << 4) | frame.opcode.bits();
    let second = (u8::from(frame.mask.is_some()) << 7) | length.marker();
    let mask_len = if frame.mask.is_some() { MASK_KEY_LEN } else { 0 };

    dst.reserve(2 + length.extension_len() + mask_len + frame.payload.len());
    dst.put_u8(first);
    dst.put_u8(second);
    length.write_extension(dst);
    match frame.mask {
        Some(key) => {
            dst.put_slice(&key.bytes());
            let start = dst.len();
            dst.put_slice(&frame.payload);
            key.apply(&mut dst[start..]);
        }
        None => dst.put_slice(&frame.payload),
    }
}

/// Encode `data` as one final frame, masking it with a fresh random key when
/// `mask` is set.
///
/// # Examples
///
/// ```
/// use pocketio::frame::{Opcode, encode_frame};
///
/// let wire = encode_frame(b"hi", Opcode::Text, false);
/// assert_eq!(&wire[..], &[0x81, 0x02, b'h', b'i']);
/// ```
#[must_use]
pub fn encode_frame(data: &[u8], opcode: Opcode, mask: bool) -> Bytes {
    let mut frame = Frame::new(opcode, Bytes::copy_from_slice(data));
    if mask {
        frame = frame.masked(MaskKey::random());
    }
    let mut dst = BytesMut::new();
    encode_into(&frame, &mut dst);
    dst.freeze()
}

/// Decode one complete frame held in `raw`.
///
/// Inputs shorter than [`MIN_DECODE_LEN`] yield `Ok(None)`.
///
/// # Errors
///
/// Returns [`EngineError::ProtocolViolation`] when `raw` is shorter than the
/// length its header announces, or [`EngineError::ArchitectureLimitation`]
/// when that length does not fit in `usize`.
pub fn decode_frame(raw: &[u8]) -> Result<Option<Frame>> {
    RawFrame::new(Bytes::copy_from_slice(raw)).into_frame()
}

fn decode_raw(raw: &Bytes) -> Result<Option<Frame>> {
    if raw.len() < MIN_DECODE_LEN {
        return Ok(None);
    }
    let header = FrameHeader::parse(raw)?.ok_or_else(|| {
        EngineError::ProtocolViolation(format!("truncated frame header: {} bytes", raw.len()))
    })?;
    header.build(raw).map(Some)
}

/// A received byte sequence whose decoded form is computed once.
///
/// Repeated calls to [`decode`](Self::decode) return the cached frame
/// without reprocessing the bytes.
#[derive(Debug)]
pub struct RawFrame {
    raw: Bytes,
    decoded: OnceCell<Option<Frame>>,
}

impl RawFrame {
    /// Wrap raw frame bytes.
    #[must_use]
    pub fn new(raw: Bytes) -> Self {
        Self {
            raw,
            decoded: OnceCell::new(),
        }
    }

    /// The bytes as received.
    #[must_use]
    pub fn as_bytes(&self) -> &Bytes { &self.raw }

    /// Decode on first use, then return the cached frame.
    ///
    /// # Errors
    ///
    /// See [`decode_frame`]. Failures are not cached.
    pub fn decode(&self) -> Result<Option<&Frame>> {
        if let Some(decoded) = self.decoded.get() {
            return Ok(decoded.as_ref());
        }
        let decoded = decode_raw(&self.raw)?;
        Ok(self.decoded.get_or_init(|| decoded).as_ref())
    }

    /// Decoded payload, empty when the input was too short to decode.
    ///
    /// # Errors
    ///
    /// See [`decode_frame`].
    pub fn payload(&self) -> Result<&[u8]> {
        Ok(self.decode()?.map_or(&[][..], |frame| &frame.payload()[..]))
    }

    /// Consume the wrapper, returning the decoded frame.
    ///
    /// # Errors
    ///
    /// See [`decode_frame`].
    pub fn into_frame(self) -> Result<Option<Frame>> {
        match self.decoded.into_inner() {
            Some(decoded) => Ok(decoded),
            None => decode_raw(&self.raw),
        }
    }
}

/// `tokio_util` codec for WebSocket frames.
#[derive(Clone, Copy, Debug)]
pub struct WebSocketCodec {
    max_payload_length: usize,
}

impl WebSocketCodec {
    /// Construct a codec rejecting inbound payloads above `max_payload_length`.
    #[must_use]
    pub fn new(max_payload_length: usize) -> Self { Self { max_payload_length } }

    /// Inbound payload ceiling.
    #[must_use]
    pub fn max_payload_length(&self) -> usize { self.max_payload_length }

    /// Number of bytes `src` still lacks before [`Decoder::decode`] can make
    /// progress.
    ///
    /// # Errors
    ///
    /// Propagates header parsing and length-limit failures.
    pub fn bytes_needed(&self, src: &[u8]) -> Result<usize> {
        let Some(&second) = src.get(1) else {
            return Ok(2 - src.len());
        };
        let header_len = FrameHeader::required_len(second);
        if src.len() < header_len {
            return Ok(header_len - src.len());
        }
        match FrameHeader::parse(src)? {
            Some(header) => {
                self.check_length(&header)?;
                Ok(header.frame_len()?.saturating_sub(src.len()))
            }
            None => Ok(header_len - src.len()),
        }
    }

    fn check_length(&self, header: &FrameHeader) -> Result<()> {
        let size = header.length().as_u64();
        let too_large = usize::try_from(size).map_or(true, |len| len > self.max_payload_length);
        if too_large {
            return Err(EngineError::FrameTooLarge {
                size,
                max: self.max_payload_length,
            });
        }
        Ok(())
    }
}

impl Default for WebSocketCodec {
    fn default() -> Self { Self::new(DEFAULT_MAX_PAYLOAD_LENGTH) }
}

impl Decoder for WebSocketCodec {
    type Item = Frame;
    type Error = EngineError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        let Some(header) = FrameHeader::parse(src)? else {
            return Ok(None);
        };
        self.check_length(&header)?;
        let frame_len = header.frame_len()?;
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }
        let raw = src.split_to(frame_len).freeze();
        header.build(&raw).map(Some)
    }
}

impl Encoder<Frame> for WebSocketCodec {
    type Error = EngineError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<()> {
        encode_into(&item, dst);
        Ok(())
    }
}

/// Blocking frame reader.
///
/// Reads at most the bytes the pending frame requires, so nothing beyond the
/// frame is consumed from the underlying reader. Bytes received before a
/// failed read stay buffered and the next call resumes from them.
#[derive(Debug, Default)]
pub struct FrameReader {
    codec: WebSocketCodec,
    buf: BytesMut,
}

impl FrameReader {
    /// Construct a reader around `codec`.
    #[must_use]
    pub fn new(codec: WebSocketCodec) -> Self {
        Self {
            codec,
            buf: BytesMut::new(),
        }
    }

    /// Block until one whole frame has been read and decoded.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Io`] if the reader fails or hits EOF mid-frame,
    /// and codec errors for malformed or oversized frames.
    pub fn read_frame<R: Read>(&mut self, reader: &mut R) -> Result<Frame> {
        loop {
            if let Some(frame) = self.codec.decode(&mut self.buf)? {
                return Ok(frame);
            }
            let needed = self.codec.bytes_needed(&self.buf)?;
            let start = self.buf.len();
            self.buf.resize(start + needed, 0);
            let received = match reader.read(&mut self.buf[start..]) {
                Ok(0) => {
                    self.buf.truncate(start);
                    return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
                }
                Ok(n) => n,
                Err(error) if error.kind() == io::ErrorKind::Interrupted => 0,
                Err(error) => {
                    self.buf.truncate(start);
                    return Err(error.into());
                }
            };
            self.buf.truncate(start + received);
        }
    }
}

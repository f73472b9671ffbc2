//! WebSocket framing (RFC 6455 base framing, no extensions).
//!
//! Every Engine.IO packet travels as one final text frame. Client frames are
//! always masked; server frames normally are not, but the decoder accepts
//! both.

pub mod codec;
pub mod length;
mod mask;
mod opcode;

pub use codec::{
    DEFAULT_MAX_PAYLOAD_LENGTH,
    Frame,
    FrameHeader,
    FrameReader,
    RawFrame,
    WebSocketCodec,
    decode_frame,
    encode_frame,
    encode_into,
};
pub use length::PayloadLength;
pub use mask::{MaskKey, mask_data};
pub use opcode::Opcode;

#[cfg(test)]
mod tests;

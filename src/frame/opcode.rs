//! WebSocket frame opcodes (RFC 6455 §5.2).

/// Four-bit frame opcode.
///
/// Reserved values are preserved rather than rejected so a decoder can report
/// exactly what the peer sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Continuation of a fragmented message.
    Continuation,
    /// UTF-8 text payload.
    Text,
    /// Binary payload.
    Binary,
    /// Reserved non-control opcode (`0x3`..=`0x7`).
    ReservedNonControl(u8),
    /// Connection close.
    Close,
    /// Ping control frame.
    Ping,
    /// Pong control frame.
    Pong,
    /// Reserved control opcode (`0xB`..=`0xF`).
    ReservedControl(u8),
}

impl Opcode {
    /// Decode the low nibble of a frame's first byte.
    #[must_use]
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x0F {
            0x0 => Self::Continuation,
            0x1 => Self::Text,
            0x2 => Self::Binary,
            0x8 => Self::Close,
            0x9 => Self::Ping,
            0xA => Self::Pong,
            bits @ 0x3..=0x7 => Self::ReservedNonControl(bits),
            bits => Self::ReservedControl(bits),
        }
    }

    /// Four-bit wire value.
    #[must_use]
    pub fn bits(self) -> u8 {
        match self {
            Self::Continuation => 0x0,
            Self::Text => 0x1,
            Self::Binary => 0x2,
            Self::Close => 0x8,
            Self::Ping => 0x9,
            Self::Pong => 0xA,
            Self::ReservedNonControl(bits) | Self::ReservedControl(bits) => bits & 0x0F,
        }
    }

    /// Control frames have the high bit of the opcode set.
    #[must_use]
    pub fn is_control(self) -> bool { self.bits() & 0x8 != 0 }
}

#[cfg(test)]
mod tests {
    use super::Opcode;

    #[test]
    fn every_nibble_survives_a_round_trip() {
        for bits in 0u8..=0x0F {
            assert_eq!(Opcode::from_bits(bits).bits(), bits);
        }
    }

    #[test]
    fn classifies_control_frames() {
        assert!(Opcode::Ping.is_control());
        assert!(Opcode::from_bits(0xB).is_control());
        assert!(!Opcode::Text.is_control());
        assert_eq!(Opcode::from_bits(0x4), Opcode::ReservedNonControl(0x4));
    }
}

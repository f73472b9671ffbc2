//! Payload length representations.
//!
//! The second header byte carries a seven-bit length field. Values 0..=125
//! are the length itself, 126 announces a 16-bit big-endian extension and 127
//! a 64-bit one, transmitted as two big-endian 32-bit halves.

use bytes::{Buf, BufMut};

use crate::error::{EngineError, Result};

/// Largest length carried inline in the seven-bit field.
pub const MAX_INLINE_LENGTH: usize = 125;
/// Length-field marker for a 16-bit extension.
pub const EXTENDED_16_MARKER: u8 = 126;
/// Length-field marker for a 64-bit extension.
pub const EXTENDED_64_MARKER: u8 = 127;

/// The smallest representation able to carry a payload length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PayloadLength {
    /// 0..=125, no extension bytes.
    Inline(u8),
    /// 126..=65535, two extension bytes.
    Extended16(u16),
    /// 65536 and above, eight extension bytes.
    Extended64(u64),
}

impl PayloadLength {
    /// Choose the representation for a payload of `len` bytes.
    #[must_use]
    pub fn for_len(len: usize) -> Self {
        match (u8::try_from(len), u16::try_from(len)) {
            (Ok(inline), _) if len <= MAX_INLINE_LENGTH => Self::Inline(inline),
            (_, Ok(short)) => Self::Extended16(short),
            _ => Self::Extended64(len as u64),
        }
    }

    /// Value of the seven-bit length field.
    #[must_use]
    pub fn marker(self) -> u8 {
        match self {
            Self::Inline(len) => len,
            Self::Extended16(_) => EXTENDED_16_MARKER,
            Self::Extended64(_) => EXTENDED_64_MARKER,
        }
    }

    /// Number of extension bytes following the second header byte.
    #[must_use]
    pub fn extension_len(self) -> usize { extension_len(self.marker()) }

    /// Append the extension bytes, if any, to `dst`.
    pub fn write_extension(self, dst: &mut impl BufMut) {
        match self {
            Self::Inline(_) => {}
            Self::Extended16(len) => dst.put_u16(len),
            Self::Extended64(len) => {
                #[expect(
                    clippy::cast_possible_truncation,
                    reason = "the length is split into two 32-bit halves"
                )]
                let (left, right) = ((len >> 32) as u32, len as u32);
                dst.put_u32(left);
                dst.put_u32(right);
            }
        }
    }

    /// Payload length as a host-sized integer.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ArchitectureLimitation`] when a 64-bit length
    /// does not fit in `usize`.
    pub fn to_usize(self) -> Result<usize> {
        match self {
            Self::Inline(len) => Ok(usize::from(len)),
            Self::Extended16(len) => Ok(usize::from(len)),
            Self::Extended64(len) => {
                usize::try_from(len).map_err(|_| EngineError::ArchitectureLimitation)
            }
        }
    }

    /// Raw announced length, for diagnostics.
    #[must_use]
    pub fn as_u64(self) -> u64 {
        match self {
            Self::Inline(len) => u64::from(len),
            Self::Extended16(len) => u64::from(len),
            Self::Extended64(len) => len,
        }
    }
}

/// Extension byte count implied by a seven-bit length field.
#[must_use]
pub fn extension_len(marker: u8) -> usize {
    match marker & 0x7F {
        EXTENDED_16_MARKER => 2,
        EXTENDED_64_MARKER => 8,
        _ => 0,
    }
}

/// Parse the length representation from a seven-bit field and its extension.
///
/// `extension` must hold exactly [`extension_len`] bytes for `marker`.
///
/// # Errors
///
/// Returns [`EngineError::ProtocolViolation`] when the extension has the wrong
/// size.
pub fn parse_length(marker: u8, extension: &[u8]) -> Result<PayloadLength> {
    let short = |what: &str| {
        EngineError::ProtocolViolation(format!(
            "{what} length extension needs {} bytes, had {}",
            extension_len(marker),
            extension.len()
        ))
    };
    let mut ext = extension;
    match marker & 0x7F {
        EXTENDED_16_MARKER => {
            if ext.len() != 2 {
                return Err(short("16-bit"));
            }
            Ok(PayloadLength::Extended16(ext.get_u16()))
        }
        EXTENDED_64_MARKER => {
            if ext.len() != 8 {
                return Err(short("64-bit"));
            }
            let left = u64::from(ext.get_u32());
            let right = u64::from(ext.get_u32());
            Ok(PayloadLength::Extended64(left << 32 | right))
        }
        inline => Ok(PayloadLength::Inline(inline)),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::empty(0, PayloadLength::Inline(0), 0)]
    #[case::inline_max(125, PayloadLength::Inline(125), 0)]
    #[case::short_min(126, PayloadLength::Extended16(126), 2)]
    #[case::short_max(65_535, PayloadLength::Extended16(65_535), 2)]
    #[case::long_min(65_536, PayloadLength::Extended64(65_536), 8)]
    fn picks_smallest_representation(
        #[case] len: usize,
        #[case] expected: PayloadLength,
        #[case] extension: usize,
    ) {
        let repr = PayloadLength::for_len(len);
        assert_eq!(repr, expected);
        assert_eq!(repr.extension_len(), extension);
        assert_eq!(repr.to_usize().expect("fits"), len);
    }

    #[test]
    fn sixty_four_bit_extension_is_two_big_endian_halves() {
        let mut buf = Vec::new();
        PayloadLength::Extended64(0x0000_0001_0000_0002).write_extension(&mut buf);
        assert_eq!(buf, [0, 0, 0, 1, 0, 0, 0, 2]);

        let parsed = parse_length(EXTENDED_64_MARKER, &buf).expect("parse");
        assert_eq!(parsed, PayloadLength::Extended64(0x0000_0001_0000_0002));
    }

    #[test]
    fn sixteen_bit_extension_is_big_endian() {
        let mut buf = Vec::new();
        PayloadLength::Extended16(0x1234).write_extension(&mut buf);
        assert_eq!(buf, [0x12, 0x34]);
    }

    #[test]
    fn truncated_extension_is_rejected() {
        let err = parse_length(EXTENDED_64_MARKER, &[0, 0, 0]).expect_err("too short");
        assert!(matches!(err, EngineError::ProtocolViolation(_)));
    }

    #[test]
    fn marker_bit_is_ignored_when_parsing() {
        let parsed = parse_length(0x80 | 5, &[]).expect("parse");
        assert_eq!(parsed, PayloadLength::Inline(5));
    }
}

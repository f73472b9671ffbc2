//! Client-to-server payload masking (RFC 6455 §5.3).
//!
//! Masking and unmasking are the same XOR transform, so applying
//! [`mask_data`] twice with one key restores the input.

use rand::RngCore;

/// Four-byte masking key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaskKey([u8; 4]);

impl MaskKey {
    /// Wrap an explicit key.
    #[must_use]
    pub const fn new(bytes: [u8; 4]) -> Self { Self(bytes) }

    /// Draw a key from the thread-local CSPRNG.
    #[must_use]
    pub fn random() -> Self {
        let mut bytes = [0u8; 4];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Key bytes in wire order.
    #[must_use]
    pub const fn bytes(self) -> [u8; 4] { self.0 }

    /// XOR `data` in place, cycling through the key.
    pub fn apply(self, data: &mut [u8]) {
        for (byte, key) in data.iter_mut().zip(self.0.iter().cycle()) {
            *byte ^= key;
        }
    }
}

impl From<[u8; 4]> for MaskKey {
    fn from(bytes: [u8; 4]) -> Self { Self(bytes) }
}

/// Return a masked (or unmasked) copy of `data`.
///
/// # Examples
///
/// ```
/// use pocketio::frame::{MaskKey, mask_data};
///
/// let masked = mask_data(b"foo", MaskKey::new(*b"?EV!"));
/// assert_eq!(masked, [0x59, 0x2a, 0x39]);
/// ```
#[must_use]
pub fn mask_data(data: &[u8], key: MaskKey) -> Vec<u8> {
    let mut out = data.to_vec();
    key.apply(&mut out);
    out
}

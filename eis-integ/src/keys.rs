//! CURVE key pairs for ZeroMQ.
//!
//! libzmq's CURVE mechanism uses X25519 keys exchanged in Z85 text form
//! (ZeroMQ RFC 32). A 32-byte key always encodes to 40 characters.

use crypto_box::SecretKey;
use rand::rngs::OsRng;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of a raw CURVE key in bytes.
pub const KEY_SIZE: usize = 32;

/// Length of a Z85-encoded CURVE key.
pub const Z85_KEY_LEN: usize = 40;

const Z85_ALPHABET: &[u8; 85] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ.-:+=^!/*?&<>()[]{}@%$#";

/// A Z85-encoded CURVE key pair. The text is wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct CurveKeyPair {
    public: String,
    secret: String,
}

impl CurveKeyPair {
    /// Generates a fresh key pair from the OS random source.
    #[must_use]
    pub fn generate() -> Self {
        Self::from_secret(SecretKey::generate(&mut OsRng))
    }

    /// Rebuilds a key pair from raw secret key bytes.
    #[must_use]
    pub fn from_secret_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self::from_secret(SecretKey::from(bytes))
    }

    fn from_secret(secret: SecretKey) -> Self {
        let public = secret.public_key();
        let mut raw = secret.to_bytes();
        let pair = Self {
            public: encode_chunks(public.as_bytes()),
            secret: encode_chunks(&raw),
        };
        raw.zeroize();
        pair
    }

    /// Z85 text of the public key.
    pub fn public(&self) -> &str {
        &self.public
    }

    /// Z85 text of the secret key.
    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl std::fmt::Debug for CurveKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurveKeyPair")
            .field("public", &self.public)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Encodes `data` as Z85. Returns `None` unless the length is a multiple of 4.
#[must_use]
pub fn z85_encode(data: &[u8]) -> Option<String> {
    if data.len() % 4 != 0 {
        return None;
    }
    Some(encode_chunks(data))
}

fn encode_chunks(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() / 4 * 5);
    for chunk in data.chunks_exact(4) {
        let mut value = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        let mut digits = [0u8; 5];
        for digit in digits.iter_mut().rev() {
            *digit = Z85_ALPHABET[(value % 85) as usize];
            value /= 85;
        }
        out.extend(digits.iter().map(|&b| b as char));
    }
    out
}

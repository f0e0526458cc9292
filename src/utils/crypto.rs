// file: src/utils/crypto.rs
// version: 2.0.0
// guid: w4x5y6z7-a8b9-0123-4567-890123456789

use rand::rngs::OsRng;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Characters allowed in generated database passwords
pub const PASSWORD_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ\
                                      abcdefghijklmnopqrstuvwxyz\
                                      0123456789";

/// Cryptographic utilities for the provisioner
pub struct CryptoUtils;

impl CryptoUtils {
    /// Generate a password of `length` characters drawn from the OS entropy source
    pub fn generate_password(length: usize) -> String {
        let mut rng = OsRng;
        (0..length)
            .map(|_| PASSWORD_CHARSET[rng.gen_range(0..PASSWORD_CHARSET.len())] as char)
            .collect()
    }

    /// True if every character of `value` belongs to [`PASSWORD_CHARSET`]
    pub fn is_password_charset(value: &str) -> bool {
        value.bytes().all(|b| PASSWORD_CHARSET.contains(&b))
    }

    /// Hex-encoded SHA-256 of a byte slice
    pub fn sha256_hex(data: &[u8]) -> String {
        hex::encode(Sha256::digest(data))
    }
}

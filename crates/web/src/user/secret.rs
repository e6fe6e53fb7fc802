use rand::rngs::OsRng;
use rand::{Rng, RngCore};

/// A six digit activation code.
pub fn activation_code() -> u32 {
    OsRng.gen_range(100_000..=999_999)
}

/// 16 random bytes, hex encoded.
pub fn reset_token() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

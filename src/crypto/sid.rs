use rand::Rng;
use rand::rngs::OsRng;

/// The number of characters in a session id.
pub const SID_LENGTH: usize = 32;

/// Letters a session id is drawn from.
const SID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Generates a new random session id.
///
/// Every character is sampled uniformly from `[A-Za-z]` with the OS RNG.
pub fn generate_sid() -> String {
    let mut rng = OsRng;
    (0..SID_LENGTH)
        .map(|_| SID_ALPHABET[rng.gen_range(0..SID_ALPHABET.len())] as char)
        .collect()
}

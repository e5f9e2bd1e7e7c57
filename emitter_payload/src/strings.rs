//! Random identifier strings

use rand::Rng;

/// Characters a random identifier may contain.
pub const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Length of every random identifier.
pub const ID_LENGTH: usize = 26;

/// Create a random identifier of [`ID_LENGTH`] characters, each drawn
/// uniformly from [`ALPHABET`].
pub fn random_id<R>(rng: &mut R) -> String
where
    R: Rng + ?Sized,
{
    (0..ID_LENGTH)
        .map(|_| char::from(ALPHABET[rng.random_range(0..ALPHABET.len())]))
        .collect()
}

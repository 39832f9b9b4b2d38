//! Text encoding seam.
//!
//! Turns raw text into a fixed-width numeric encoding. Truncation and
//! padding to the requested width are owned by this collaborator.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Encoder seam: text in, fixed-width numeric encoding out.
pub trait Encoder: Send + Sync {
    /// Encode text into exactly `max_length` values.
    ///
    /// Longer inputs are truncated, shorter ones padded with zeros.
    fn encode(&self, text: &str, max_length: usize) -> Vec<f32>;
}

/// Demonstration-grade encoder hashing whitespace tokens into a
/// fixed-width bag-of-features vector.
#[derive(Clone, Debug, Default)]
pub struct HashingEncoder;

impl HashingEncoder {
    /// Create a new hashing encoder.
    pub fn new() -> Self {
        Self
    }

    fn token_slot(token: &str, width: usize) -> usize {
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        (hasher.finish() % width as u64) as usize
    }
}

impl Encoder for HashingEncoder {
    fn encode(&self, text: &str, max_length: usize) -> Vec<f32> {
        let mut encoding = vec![0.0; max_length];
        if max_length == 0 {
            return encoding;
        }

        // Token stream is truncated at max_length, matching the
        // tokenizer contract for overlong sequences.
        for token in text.split_whitespace().take(max_length) {
            encoding[Self::token_slot(token, max_length)] += 1.0;
        }

        encoding
    }
}

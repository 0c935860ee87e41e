//! Perceptual image fingerprinting
//!
//! Kept separate so the same fingerprint function serves the backfill job
//! and any later capture-and-match tooling against the stored hashes.

use image::DynamicImage;
use image_hasher::{HashAlg, HasherConfig};

/// Length of the hexadecimal fingerprint: 64 hash bits = 8 bytes
pub const FINGERPRINT_LEN: usize = 16;

/// Compute the perceptual fingerprint of an image.
///
/// DCT-based hash over the image's frequency domain, which keeps it stable
/// under color shifts and slight blurring. Returns a fixed-length lowercase
/// hex string.
pub fn fingerprint(image: &DynamicImage) -> String {
    let hasher = HasherConfig::new()
        .hash_alg(HashAlg::Mean)
        .preproc_dct()
        .hash_size(8, 8)
        .to_hasher();
    let hash = hasher.hash_image(image);
    hash.as_bytes().iter().map(|b| format!("{:02x}", b)).collect()
}

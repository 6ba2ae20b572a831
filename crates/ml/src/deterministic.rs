//! Seed derivation for reproducible parallel rollouts.

/// Mixes `(base, parts...)` into a single well-distributed seed using the
/// splitmix64 finaliser, so every `(iteration, job)` pair gets its own
/// stream regardless of which thread runs it.
#[must_use]
pub fn derive_seed(base: u64, parts: &[u64]) -> u64 {
    parts.iter().fold(splitmix64(base), |acc, &p| splitmix64(acc ^ splitmix64(p)))
}

#[must_use]
pub fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

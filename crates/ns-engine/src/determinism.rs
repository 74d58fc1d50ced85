use ns_core::derive_substream_seed;

/// Derives the seed of the `copy_index`-th copy of an engine seeded with `parent_seed`.
///
/// Copy indices start at 1, so no copy ever reuses the parent stream.
pub fn copy_seed(parent_seed: u64, copy_index: u64) -> u64 {
    derive_substream_seed(parent_seed, copy_index)
}

//! Per-chunk membership filter over 4-byte substrings ("4-grams") of the
//! chunk's file contents. The query side runs the same key packing and bit
//! selection to skip chunks that cannot contain a needle, so any change
//! here is a format break.

/// Pack four content bytes into a 4-gram key. Byte order is fixed.
pub fn ngram(a: u8, b: u8, c: u8, d: u8) -> u32 {
    a as u32 | (b as u32) << 8 | (c as u32) << 16 | (d as u32) << 24
}

/// Compression runs ~5x and the index should be ~10% of the compressed
/// chunk, so the filter gets 1/50th of the raw data size. Indexes under
/// 1 KiB are not worth their header bytes and collapse to zero.
pub fn index_size(data_size: usize) -> usize {
    let size = data_size / 50;
    if size < 1024 {
        0
    } else {
        size
    }
}

/// Optimal hash count for an m-bit filter holding n keys: ln2 * m / n,
/// clamped to [1, 16].
pub fn hash_iterations(index_size: usize, item_count: usize) -> u32 {
    if item_count == 0 {
        return 1;
    }
    let m = (index_size * 8) as f64;
    let n = item_count as f64;
    (0.693147181 * m / n).round().clamp(1.0, 16.0) as u32
}

// Double hashing: bit i is (h1 + i * h2) mod filter bits, h2 forced odd.
fn mix(key: u32) -> (u32, u32) {
    let mut h1 = key ^ (key >> 16);
    h1 = h1.wrapping_mul(0x85eb_ca6b);
    h1 ^= h1 >> 13;
    let mut h2 = key.wrapping_mul(0xc2b2_ae35);
    h2 ^= h2 >> 15;
    (h1, h2 | 1)
}

/// Set `iterations` bits derived from `key` in the filter.
pub fn update(data: &mut [u8], key: u32, iterations: u32) {
    let bits = (data.len() * 8) as u32;
    let (h1, h2) = mix(key);
    for i in 0..iterations {
        let bit = h1.wrapping_add(i.wrapping_mul(h2)) % bits;
        data[(bit / 8) as usize] |= 1 << (bit % 8);
    }
}

/// Membership test; false positives possible, false negatives never.
pub fn contains(data: &[u8], key: u32, iterations: u32) -> bool {
    let bits = (data.len() * 8) as u32;
    let (h1, h2) = mix(key);
    (0..iterations).all(|i| {
        let bit = h1.wrapping_add(i.wrapping_mul(h2)) % bits;
        data[(bit / 8) as usize] & (1 << (bit % 8)) != 0
    })
}

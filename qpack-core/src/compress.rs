use anyhow::{Context, Result};
use lz4_flex::block;

/// Compress one chunk payload as a raw LZ4 block. The uncompressed size is
/// recorded in the chunk header rather than a block prefix.
pub fn compress_chunk(data: &[u8]) -> Vec<u8> {
    block::compress(data)
}

/// Inflate a whole chunk payload.
pub fn decompress_chunk(src: &[u8], uncompressed_size: usize) -> Result<Vec<u8>> {
    block::decompress(src, uncompressed_size).context("lz4 decompress")
}

/// Inflate a chunk payload and return only its first `want` bytes. Raw LZ4
/// blocks cannot stop mid-stream, so the block is inflated in full and cut.
pub fn decompress_prefix(src: &[u8], uncompressed_size: usize, want: usize) -> Result<Vec<u8>> {
    let mut data = decompress_chunk(src, uncompressed_size)?;
    data.truncate(want.min(uncompressed_size));
    Ok(data)
}

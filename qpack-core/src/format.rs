use anyhow::{bail, Result};
use std::io::{Read, Write};

/// Pack layout, all integers little-endian:
/// [magic: 4 bytes] then per chunk:
/// [DataChunkHeader: 24 bytes]
/// [extra_size reserved bytes] [index_size Bloom bytes]
/// [compressed_size LZ4 block bytes]
/// Decompressed chunk payload:
/// [file_count * DataChunkFileHeader] [name bytes] [file data bytes]
pub const DATA_FILE_MAGIC: &[u8; 4] = b"QGD1";

pub const CHUNK_HEADER_SIZE: usize = 24;
pub const FILE_HEADER_SIZE: usize = 40;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DataChunkHeader {
    pub file_count: u32,
    pub uncompressed_size: u32,
    pub compressed_size: u32,
    pub index_size: u32,
    pub index_hash_iterations: u32,
    pub extra_size: u32,
}

impl DataChunkHeader {
    pub fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        let mut buf = [0u8; CHUNK_HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.file_count.to_le_bytes());
        buf[4..8].copy_from_slice(&self.uncompressed_size.to_le_bytes());
        buf[8..12].copy_from_slice(&self.compressed_size.to_le_bytes());
        buf[12..16].copy_from_slice(&self.index_size.to_le_bytes());
        buf[16..20].copy_from_slice(&self.index_hash_iterations.to_le_bytes());
        buf[20..24].copy_from_slice(&self.extra_size.to_le_bytes());
        out.write_all(&buf)
    }

    pub fn decode(buf: &[u8; CHUNK_HEADER_SIZE]) -> Self {
        DataChunkHeader {
            file_count: get_u32(buf, 0),
            uncompressed_size: get_u32(buf, 4),
            compressed_size: get_u32(buf, 8),
            index_size: get_u32(buf, 12),
            index_hash_iterations: get_u32(buf, 16),
            extra_size: get_u32(buf, 20),
        }
    }

    /// Read the next chunk header, `None` on a clean end of file.
    pub fn read_opt<R: Read>(input: &mut R) -> Result<Option<Self>> {
        let mut buf = [0u8; CHUNK_HEADER_SIZE];
        let mut filled = 0;
        while filled < buf.len() {
            let n = input.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            return Ok(None);
        }
        if filled < buf.len() {
            bail!("truncated chunk header");
        }
        Ok(Some(Self::decode(&buf)))
    }

    /// Size of the per-file header table at the front of the payload.
    pub fn file_table_size(&self) -> usize {
        self.file_count as usize * FILE_HEADER_SIZE
    }
}

/// Offsets are relative to the start of the uncompressed chunk payload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DataChunkFileHeader {
    pub name_offset: u32,
    pub name_length: u32,
    pub data_offset: u32,
    pub data_size: u32,
    pub start_line: u32,
    pub reserved: u32,
    pub file_size: u64,
    pub time_stamp: u64,
}

impl DataChunkFileHeader {
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.name_offset.to_le_bytes());
        out.extend_from_slice(&self.name_length.to_le_bytes());
        out.extend_from_slice(&self.data_offset.to_le_bytes());
        out.extend_from_slice(&self.data_size.to_le_bytes());
        out.extend_from_slice(&self.start_line.to_le_bytes());
        out.extend_from_slice(&self.reserved.to_le_bytes());
        out.extend_from_slice(&self.file_size.to_le_bytes());
        out.extend_from_slice(&self.time_stamp.to_le_bytes());
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < FILE_HEADER_SIZE {
            bail!("truncated file header");
        }
        Ok(DataChunkFileHeader {
            name_offset: get_u32(buf, 0),
            name_length: get_u32(buf, 4),
            data_offset: get_u32(buf, 8),
            data_size: get_u32(buf, 12),
            start_line: get_u32(buf, 16),
            reserved: get_u32(buf, 20),
            file_size: get_u64(buf, 24),
            time_stamp: get_u64(buf, 32),
        })
    }
}

fn get_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(buf[offset..offset + 4].try_into().unwrap())
}

fn get_u64(buf: &[u8], offset: usize) -> u64 {
    u64::from_le_bytes(buf[offset..offset + 8].try_into().unwrap())
}

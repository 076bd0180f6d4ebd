use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::{BufReader, Read};

use crate::compress;
use crate::format::{DataChunkFileHeader, DataChunkHeader, DATA_FILE_MAGIC, FILE_HEADER_SIZE};
use crate::project::FileInfo;

/// Stream the pack and list `{path, time_stamp, file_size}` for every file
/// whose first segment it holds (`start_line == 0`). Index bytes are
/// skipped and only the header/name prefix of each chunk is inflated.
pub fn data_file_list(path: &str) -> Result<Vec<FileInfo>> {
    let file = File::open(path).with_context(|| format!("reading data file {path}"))?;
    let mut input = BufReader::new(file);

    let mut magic = [0u8; 4];
    if input.read_exact(&mut magic).is_err() || &magic != DATA_FILE_MAGIC {
        bail!("reading data file {path}: file format is out of date, update the project to fix");
    }

    let mut result = Vec::new();
    while let Some(header) = DataChunkHeader::read_opt(&mut input)? {
        read_chunk_file_list(&mut input, &header, &mut result)
            .with_context(|| format!("reading data file {path}: malformed chunk"))?;
    }
    Ok(result)
}

fn read_chunk_file_list(
    input: &mut BufReader<File>,
    header: &DataChunkHeader,
    result: &mut Vec<FileInfo>,
) -> Result<()> {
    input.seek_relative(header.extra_size as i64 + header.index_size as i64)?;

    let mut cdata = vec![0u8; header.compressed_size as usize];
    input.read_exact(&mut cdata)?;

    let uncompressed_size = header.uncompressed_size as usize;
    let table_size = header.file_table_size();
    if table_size > uncompressed_size {
        bail!("file table extends past payload");
    }

    let table = compress::decompress_prefix(&cdata, uncompressed_size, table_size)?;
    let mut headers = Vec::with_capacity(header.file_count as usize);
    for i in 0..header.file_count as usize {
        headers.push(DataChunkFileHeader::decode(&table[i * FILE_HEADER_SIZE..])?);
    }

    // Names sit directly after the header table; pull a prefix that covers
    // the farthest one.
    let name_end = headers
        .iter()
        .map(|h| h.name_offset as usize + h.name_length as usize)
        .max()
        .unwrap_or(table_size);
    if name_end > uncompressed_size {
        bail!("name table extends past payload");
    }
    let payload = compress::decompress_prefix(&cdata, uncompressed_size, name_end)?;

    for h in &headers {
        if h.start_line != 0 {
            continue;
        }
        let name = &payload[h.name_offset as usize..h.name_offset as usize + h.name_length as usize];
        result.push(FileInfo {
            path: String::from_utf8_lossy(name).into_owned(),
            time_stamp: h.time_stamp,
            file_size: h.file_size,
        });
    }
    Ok(())
}

use anyhow::{anyhow, Context, Result};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};

use crate::bloom;
use crate::chunker::{Chunk, ChunkAssembler};
use crate::compress;
use crate::encoding;
use crate::fileutil;
use crate::format::{DataChunkFileHeader, DataChunkHeader, DATA_FILE_MAGIC, FILE_HEADER_SIZE};
use crate::output::Output;
use crate::project;

/// Cumulative totals across the whole build. `file_count` counts original
/// files (segments with `start_line == 0`), not split segments.
#[derive(Clone, Copy, Debug, Default)]
pub struct BuildStatistics {
    pub file_count: usize,
    pub file_size: u64,
    pub result_size: u64,
}

/// Writes the data pack: feeds files through the chunk assembler and
/// serializes every finished chunk with its Bloom index.
pub struct Builder<'a> {
    out: BufWriter<File>,
    assembler: ChunkAssembler,
    statistics: BuildStatistics,
    output: &'a Output,
    total_files: usize,
    last_result_size: u64,
}

impl<'a> Builder<'a> {
    /// Open `path` and write the pack header. `total_files` drives the
    /// progress percentage; pass 0 to silence progress.
    pub fn create(output: &'a Output, path: &str, total_files: usize) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("opening data file {path} for writing"))?;
        let mut out = BufWriter::new(file);
        out.write_all(DATA_FILE_MAGIC)?;

        Ok(Builder {
            out,
            assembler: ChunkAssembler::new(crate::CHUNK_SIZE),
            statistics: BuildStatistics::default(),
            output,
            total_files,
            last_result_size: 0,
        })
    }

    /// Read, transcode and queue one file. Read failures are reported and
    /// the file is skipped; the pack is still produced without it.
    pub fn append_file(&mut self, path: &str) -> Result<()> {
        match read_file_contents(path) {
            Ok((contents, time_stamp, file_size)) => {
                self.append_file_part(path, 0, &contents, time_stamp, file_size)?;
            }
            Err(err) => {
                self.output.error(&format!("Error reading file {path}: {err:#}\n"));
            }
        }
        Ok(())
    }

    /// Queue one segment of a file; write errors on the pack are fatal.
    pub fn append_file_part(
        &mut self,
        name: &str,
        start_line: u32,
        data: &[u8],
        time_stamp: u64,
        file_size: u64,
    ) -> Result<()> {
        for chunk in self.assembler.append(name, start_line, data, time_stamp, file_size) {
            self.write_chunk(&chunk)?;
        }
        self.print_statistics();
        Ok(())
    }

    /// Flush the remaining partial chunk and hand back the totals.
    pub fn finish(mut self) -> Result<BuildStatistics> {
        for chunk in self.assembler.flush() {
            self.write_chunk(&chunk)?;
        }
        self.out.flush()?;
        self.print_statistics();
        Ok(self.statistics)
    }

    fn write_chunk(&mut self, chunk: &Chunk) -> Result<()> {
        if chunk.files.is_empty() {
            return Ok(());
        }

        let data = serialize_chunk_payload(chunk);
        let (index, iterations) = build_chunk_index(chunk);
        let cdata = compress::compress_chunk(&data);

        let header = DataChunkHeader {
            file_count: chunk.files.len() as u32,
            uncompressed_size: data.len() as u32,
            compressed_size: cdata.len() as u32,
            index_size: index.len() as u32,
            index_hash_iterations: iterations,
            extra_size: 0,
        };
        header.write_to(&mut self.out)?;
        if !index.is_empty() {
            self.out.write_all(&index)?;
        }
        self.out.write_all(&cdata)?;

        for file in &chunk.files {
            if file.start_line == 0 {
                self.statistics.file_count += 1;
            }
        }
        self.statistics.file_size += data.len() as u64;
        self.statistics.result_size += cdata.len() as u64;
        Ok(())
    }

    // One line per distinct cumulative output size, rewritten in place.
    fn print_statistics(&mut self) {
        if self.total_files == 0 || self.last_result_size == self.statistics.result_size {
            return;
        }
        self.last_result_size = self.statistics.result_size;

        let percent = self.statistics.file_count * 100 / self.total_files;
        self.output.print(&format!(
            "\r[{:3}%] {} files, {} Mb in, {} Mb out\r",
            percent,
            self.statistics.file_count,
            self.statistics.file_size / 1024 / 1024,
            self.statistics.result_size / 1024 / 1024
        ));
    }
}

fn read_file_contents(path: &str) -> Result<(Vec<u8>, u64, u64)> {
    let (time_stamp, file_size) =
        fileutil::file_attributes(path).ok_or_else(|| anyhow!("cannot stat"))?;

    let mut data = Vec::new();
    data.try_reserve_exact(file_size as usize).map_err(|_| anyhow!("out of memory"))?;
    File::open(path)?.read_to_end(&mut data)?;

    Ok((encoding::convert_to_utf8(data), time_stamp, file_size))
}

/// Lay out the uncompressed payload: header table, then name bytes, then
/// file data, with per-file offsets relative to the payload start.
fn serialize_chunk_payload(chunk: &Chunk) -> Vec<u8> {
    let header_size = FILE_HEADER_SIZE * chunk.files.len();
    let name_size: usize = chunk.files.iter().map(|f| f.name.len()).sum();
    let data_size: usize = chunk.files.iter().map(|f| f.contents.len()).sum();

    let mut payload = Vec::with_capacity(header_size + name_size + data_size);
    let mut names = Vec::with_capacity(name_size);
    let mut data = Vec::with_capacity(data_size);

    let mut name_offset = header_size;
    let mut data_offset = header_size + name_size;

    for file in &chunk.files {
        DataChunkFileHeader {
            name_offset: name_offset as u32,
            name_length: file.name.len() as u32,
            data_offset: data_offset as u32,
            data_size: file.contents.len() as u32,
            start_line: file.start_line,
            reserved: 0,
            file_size: file.file_size,
            time_stamp: file.time_stamp,
        }
        .encode_into(&mut payload);

        names.extend_from_slice(file.name.as_bytes());
        data.extend_from_slice(file.contents.data());
        name_offset += file.name.len();
        data_offset += file.contents.len();
    }

    payload.extend_from_slice(&names);
    payload.extend_from_slice(&data);
    payload
}

/// Collect the distinct 4-grams of the chunk's contents and fold them into
/// a Bloom filter sized off the raw data. 4-grams that cross a line
/// boundary are skipped; the query side never asks for them.
fn build_chunk_index(chunk: &Chunk) -> (Vec<u8>, u32) {
    let data_size: usize = chunk.files.iter().map(|f| f.contents.len()).sum();
    let index_size = bloom::index_size(data_size);
    if index_size == 0 {
        return (Vec::new(), 0);
    }

    let mut ngrams = HashSet::new();
    for file in &chunk.files {
        for window in file.contents.data().windows(4) {
            if window.iter().all(|&b| b != b'\n') {
                ngrams.insert(bloom::ngram(window[0], window[1], window[2], window[3]));
            }
        }
    }

    let iterations = bloom::hash_iterations(index_size, ngrams.len());
    let mut index = vec![0u8; index_size];
    for key in ngrams {
        bloom::update(&mut index, key, iterations);
    }
    (index, iterations)
}

/// Build `<project>.qgd` from scratch. The pack is written to a temporary
/// sibling and renamed once complete, so readers never see a partial file.
pub fn build_project(output: &Output, path: &str) -> Result<()> {
    output.print(&format!("Building {path}:\n"));
    output.print("Scanning project...\r");

    let group = project::parse_project(path)?;
    let files = project::get_project_group_files(output, &group);

    let target_path = fileutil::replace_extension(path, ".qgd");
    let temp_path = format!("{target_path}_");

    let mut builder = Builder::create(output, &temp_path, files.len())?;
    for file in &files {
        builder.append_file(&file.path)?;
    }
    builder.finish()?;
    output.print("\n");

    fs::rename(&temp_path, &target_path)
        .with_context(|| format!("saving data file {target_path}"))?;
    Ok(())
}

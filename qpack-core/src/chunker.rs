use std::collections::VecDeque;
use std::sync::Arc;

/// A view into shared backing storage. Splitting a file across chunks
/// produces several views over one allocation; the allocation is freed
/// when the last view has been serialized.
#[derive(Clone)]
pub struct Blob {
    storage: Arc<Vec<u8>>,
    offset: usize,
    count: usize,
}

impl Blob {
    pub fn new(storage: Vec<u8>) -> Self {
        let count = storage.len();
        Blob { storage: Arc::new(storage), offset: 0, count }
    }

    pub fn data(&self) -> &[u8] {
        &self.storage[self.offset..self.offset + self.count]
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Detach the first `size` bytes as a new view and advance this one.
    fn split_prefix(&mut self, size: usize) -> Blob {
        assert!(size <= self.count);
        let prefix = Blob { storage: Arc::clone(&self.storage), offset: self.offset, count: size };
        self.offset += size;
        self.count -= size;
        prefix
    }
}

/// One file segment queued for packing. `start_line` is 0 for the first
/// segment of an original file and the 1-based first line number of every
/// later segment produced by splitting.
pub struct ChunkFile {
    pub name: String,
    pub contents: Blob,
    pub start_line: u32,
    pub file_size: u64,
    pub time_stamp: u64,
}

pub struct Chunk {
    pub files: Vec<ChunkFile>,
    pub total_size: usize,
}

/// Accumulates pending segments and cuts target-size chunks on demand.
pub struct ChunkAssembler {
    pending: VecDeque<ChunkFile>,
    pending_size: usize,
    chunk_size: usize,
}

impl ChunkAssembler {
    pub fn new(chunk_size: usize) -> Self {
        ChunkAssembler { pending: VecDeque::new(), pending_size: 0, chunk_size }
    }

    /// Copy `data` into fresh backing storage and queue it. Returns the
    /// chunks that crossed the emission threshold, in write order.
    pub fn append(
        &mut self,
        name: &str,
        start_line: u32,
        data: &[u8],
        time_stamp: u64,
        file_size: u64,
    ) -> Vec<Chunk> {
        self.pending.push_back(ChunkFile {
            name: name.to_string(),
            contents: Blob::new(data.to_vec()),
            start_line,
            file_size,
            time_stamp,
        });
        self.pending_size += data.len();

        let mut chunks = Vec::new();
        while self.pending_size >= self.chunk_size * 2 {
            chunks.push(self.cut_chunk());
        }
        chunks
    }

    /// Drain everything still pending; the final chunk may be short.
    pub fn flush(&mut self) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        while !self.pending.is_empty() {
            chunks.push(self.cut_chunk());
        }
        chunks
    }

    fn cut_chunk(&mut self) -> Chunk {
        let target = self.chunk_size;
        let mut chunk = Chunk { files: Vec::new(), total_size: 0 };

        while chunk.total_size < target {
            let Some(mut file) = self.pending.pop_front() else { break };
            let remaining = target - chunk.total_size;

            if file.contents.len() <= remaining {
                chunk.total_size += file.contents.len();
                chunk.files.push(file);
            } else {
                // The head does not fit whole; take a line-aligned prefix
                // and keep the rest at the front of the queue.
                split_into_chunk(&mut chunk, &mut file, remaining);
                if !file.contents.is_empty() {
                    self.pending.push_front(file);
                }
                break;
            }
        }

        debug_assert!(chunk.total_size <= self.pending_size);
        self.pending_size -= chunk.total_size;
        chunk
    }
}

/// Push the longest prefix of `file` that ends on a newline and fits in
/// `remaining` bytes. When no newline fits and the chunk is still empty,
/// the first whole line goes in regardless of the target; when the chunk
/// already has content, nothing is added and the file leads the next chunk.
fn split_into_chunk(chunk: &mut Chunk, file: &mut ChunkFile, remaining: usize) {
    let data = file.contents.data();
    debug_assert!(remaining < data.len());

    let (skip_size, skip_lines) = line_aligned_prefix(&data[..remaining]);
    if skip_size == 0 && !chunk.files.is_empty() {
        return;
    }

    let (size, lines) = if skip_size > 0 {
        (skip_size, skip_lines)
    } else {
        (first_line_len(data), 1)
    };

    let prefix = ChunkFile {
        name: file.name.clone(),
        contents: file.contents.split_prefix(size),
        start_line: file.start_line,
        file_size: file.file_size,
        time_stamp: file.time_stamp,
    };
    chunk.total_size += size;
    chunk.files.push(prefix);
    file.start_line += lines;
}

/// One past the last `\n` in `data` and the number of newlines before it;
/// (0, 0) when there is no newline.
fn line_aligned_prefix(data: &[u8]) -> (usize, u32) {
    let mut result = (0, 0);
    for (i, &b) in data.iter().enumerate() {
        if b == b'\n' {
            result.0 = i + 1;
            result.1 += 1;
        }
    }
    result
}

/// Length of the first line including its `\n`, or all of `data` when it
/// has none.
fn first_line_len(data: &[u8]) -> usize {
    match data.iter().position(|&b| b == b'\n') {
        Some(i) => i + 1,
        None => data.len(),
    }
}

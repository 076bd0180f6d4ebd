pub mod bloom;
pub mod builder;
pub mod changes;
pub mod chunker;
pub mod compress;
pub mod encoding;
pub mod fileutil;
pub mod format;
pub mod output;
pub mod project;
pub mod reader;
pub mod watch;

use std::time::Duration;

/// Target uncompressed payload size for one chunk.
pub const CHUNK_SIZE: usize = 512 * 1024;

/// Change-set size above which a quiet period triggers a full rebuild.
pub const WATCH_UPDATE_THRESHOLD_FILES: usize = 128;

/// Quiet period before the rebuild fires, once the threshold is crossed.
pub const WATCH_UPDATE_TIMEOUT: Duration = Duration::from_secs(5);

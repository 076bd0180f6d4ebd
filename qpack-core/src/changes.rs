use anyhow::Result;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use crate::fileutil;
use crate::project::FileInfo;

/// Merge-walk the sorted project list against the sorted pack list and
/// return the paths that are new or differ in time stamp or size. Pack
/// entries with no surviving input file are not reported; the next full
/// rebuild reconciles them.
pub fn get_changes(files: &[FileInfo], pack_files: &[FileInfo]) -> Vec<String> {
    let mut result = Vec::new();
    let mut it = 0;

    for pack in pack_files {
        while it < files.len() && files[it].path < pack.path {
            result.push(files[it].path.clone());
            it += 1;
        }
        if it < files.len() && files[it].path == pack.path {
            if files[it].time_stamp != pack.time_stamp || files[it].file_size != pack.file_size {
                result.push(files[it].path.clone());
            }
            it += 1;
        }
    }

    while it < files.len() {
        result.push(files[it].path.clone());
        it += 1;
    }

    result
}

/// Persist the change list next to the project: write `<project>.qgc_`,
/// then rename over `<project>.qgc`. An empty list removes the sidecar
/// instead, so its absence means "nothing changed".
pub fn write_changes(project_path: &str, files: &[String]) -> Result<()> {
    let target_path = fileutil::replace_extension(project_path, ".qgc");

    if files.is_empty() {
        return match fs::remove_file(&target_path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        };
    }

    let temp_path = format!("{target_path}_");
    {
        let mut out = BufWriter::new(File::create(&temp_path)?);
        for file in files {
            out.write_all(file.as_bytes())?;
            out.write_all(b"\n")?;
        }
        out.flush()?;
    }
    fs::rename(&temp_path, &target_path)?;
    Ok(())
}

#[derive(Default)]
struct ChangedFiles {
    files: BTreeSet<String>,
    last: String,
}

/// Live change set shared between watcher workers and the persistence
/// loop. One mutex guards the set and the most recent insertion; a single
/// condition variable wakes the single consumer.
#[derive(Default)]
pub struct ChangeTracker {
    changed: Mutex<ChangedFiles>,
    signal: Condvar,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one changed path and wake the persistence loop.
    pub fn insert(&self, path: String) {
        let mut changed = self.changed.lock().unwrap();
        changed.files.insert(path.clone());
        changed.last = path;
        self.signal.notify_one();
    }

    /// Seed the set from the startup diff; `last` becomes the final entry.
    /// The persistence loop is not running yet, so nothing is signaled.
    pub fn insert_all(&self, paths: &[String]) {
        let Some(last) = paths.last() else { return };
        let mut changed = self.changed.lock().unwrap();
        changed.files.extend(paths.iter().cloned());
        changed.last = last.clone();
    }

    pub fn len(&self) -> usize {
        self.changed.lock().unwrap().files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted snapshot of the set plus the most recently inserted path.
    pub fn snapshot(&self) -> (Vec<String>, String) {
        let changed = self.changed.lock().unwrap();
        (changed.files.iter().cloned().collect(), changed.last.clone())
    }

    /// Sleep until the set size differs from `seen`, then snapshot. The
    /// size predicate (rather than "any signal") keeps re-inserts of an
    /// already tracked path from forcing a redundant persistence pass.
    pub fn wait_changed(&self, seen: usize) -> (Vec<String>, String) {
        let changed = self.changed.lock().unwrap();
        let changed = self
            .signal
            .wait_while(changed, |c| c.files.len() == seen)
            .unwrap();
        (changed.files.iter().cloned().collect(), changed.last.clone())
    }

    /// Bounded wait used above the rebuild threshold: a quiet `timeout`
    /// clears the set and returns `None` (rebuild now); any wakeup before
    /// that returns the fresh snapshot.
    pub fn wait_or_clear(&self, timeout: Duration) -> Option<(Vec<String>, String)> {
        let changed = self.changed.lock().unwrap();
        let (mut changed, result) = self.signal.wait_timeout(changed, timeout).unwrap();
        if result.timed_out() {
            changed.files.clear();
            return None;
        }
        Some((changed.files.iter().cloned().collect(), changed.last.clone()))
    }
}

use anyhow::Result;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};
use std::thread;

use crate::builder;
use crate::changes::{self, ChangeTracker};
use crate::fileutil;
use crate::output::Output;
use crate::project::{self, GroupFilter, ProjectGroup};
use crate::reader;

/// Block watching `root` recursively and invoke `on_file` with a
/// root-relative path for every file event. Returns only when the
/// underlying watcher shuts down (in practice: never, until process exit).
pub fn watch_directory(root: &str, on_file: impl Fn(&str)) -> Result<()> {
    let (tx, rx) = mpsc::channel();
    let mut watcher = RecommendedWatcher::new(
        move |event: notify::Result<Event>| {
            let _ = tx.send(event);
        },
        Config::default(),
    )?;
    watcher.watch(Path::new(root), RecursiveMode::Recursive)?;

    // Events arrive with absolute paths; relativize against the canonical
    // root so symlinked temp dirs still map back.
    let canonical = Path::new(root)
        .canonicalize()
        .unwrap_or_else(|_| PathBuf::from(root));

    while let Ok(event) = rx.recv() {
        let Ok(event) = event else { continue };
        if matches!(event.kind, EventKind::Access(_)) {
            continue;
        }
        for path in &event.paths {
            if path.is_dir() {
                continue;
            }
            let relative = pathdiff::diff_paths(path, &canonical)
                .unwrap_or_else(|| path.clone());
            on_file(&relative.to_string_lossy());
        }
    }
    Ok(())
}

fn file_changed(tracker: &ChangeTracker, filter: &GroupFilter, root: &str, file: &str) {
    if !filter.accepts(file) {
        return;
    }
    tracker.insert(fileutil::normalize_path(root, file));
}

/// Spawn one watcher worker per root, recursively through child groups.
/// Workers outlive the persistence loop and die with the process.
fn start_watching_rec(
    output: &Output,
    tracker: &Arc<ChangeTracker>,
    group: &ProjectGroup,
    threads: &mut Vec<thread::JoinHandle<()>>,
) {
    for root in &group.paths {
        output.print(&format!("Watching folder {root}...\n"));

        let output = *output;
        let tracker = Arc::clone(tracker);
        let filter = group.filter.clone();
        let root = root.clone();

        threads.push(thread::spawn(move || {
            if let Err(err) = watch_directory(&root, |file| {
                file_changed(&tracker, &filter, &root, file);
            }) {
                output.error(&format!("Error watching folder {root}: {err:#}\n"));
            }
            output.print(&format!("No longer watching folder {root}\n"));
        }));
    }

    for child in &group.groups {
        start_watching_rec(output, tracker, child, threads);
    }
}

/// The one-line watch statistic: change count plus the most recent path,
/// left-elided with `...` to fit 40 columns.
pub fn format_change_statistics(count: usize, last: &str) -> String {
    let chars = last.chars().count();
    let last = if chars > 40 {
        let tail: String = last.chars().skip(chars - 37).collect();
        format!("...{tail}")
    } else {
        last.to_string()
    };
    format!("{count} files changed; last: {last:<40}\r")
}

/// Full rebuild: regenerate the pack and drop the change list it subsumes.
fn update_project(output: &Output, path: &str) {
    if let Err(err) = builder::build_project(output, path) {
        output.error(&format!("Error updating {path}: {err:#}\n"));
    }
    let _ = fs::remove_file(fileutil::replace_extension(path, ".qgc"));
}

fn update_loop(
    output: &Output,
    tracker: &ChangeTracker,
    path: &str,
    mut changed_files: Vec<String>,
) -> ! {
    loop {
        let update = if changed_files.len() > crate::WATCH_UPDATE_THRESHOLD_FILES {
            // A storm is in flight; persist on every wakeup, but a quiet
            // period means it is cheaper to rebuild the pack outright.
            tracker.wait_or_clear(crate::WATCH_UPDATE_TIMEOUT)
        } else {
            Some(tracker.wait_changed(changed_files.len()))
        };

        match update {
            None => {
                changed_files.clear();
                update_project(output, path);
            }
            Some((files, last)) => {
                changed_files = files;
                output.print(&format_change_statistics(changed_files.len(), &last));
                if let Err(err) = changes::write_changes(path, &changed_files) {
                    output.error(&format!(
                        "Error saving changes to {}: {err:#}\n",
                        fileutil::replace_extension(path, ".qgc")
                    ));
                }
            }
        }
    }
}

/// Watch a project: diff the tree against the existing pack, keep the
/// `.qgc` change list current as files change, and rebuild the pack after
/// a large change set goes quiet. Does not return under normal operation.
pub fn watch_project(output: &Output, path: &str) -> Result<()> {
    output.print(&format!("Watching {path}:\n"));

    let group = project::parse_project(path)?;

    let tracker = Arc::new(ChangeTracker::new());
    let mut threads = Vec::new();
    start_watching_rec(output, &tracker, &group, &mut threads);

    output.print("Scanning project...\r");
    let files = project::get_project_group_files(output, &group);

    output.print("Reading data pack...\r");
    let pack_files = reader::data_file_list(&fileutil::replace_extension(path, ".qgd"))?;

    let _ = fs::remove_file(fileutil::replace_extension(path, ".qgc"));

    let changed_files = changes::get_changes(&files, &pack_files);
    tracker.insert_all(&changed_files);

    if changed_files.is_empty() {
        output.print("Listening for changes\n");
    } else {
        output.print(&format!(
            "{} files changed; listening for further changes\n",
            changed_files.len()
        ));
    }

    if let Err(err) = changes::write_changes(path, &changed_files) {
        output.error(&format!(
            "Error saving changes to {}: {err:#}\n",
            fileutil::replace_extension(path, ".qgc")
        ));
    }

    update_loop(output, &tracker, path, changed_files)
}

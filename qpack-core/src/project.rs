use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use crate::fileutil;
use crate::output::Output;

/// One file as the pack and the change tracker see it: canonical path,
/// modification time in Unix seconds, size in bytes. Ordered by path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileInfo {
    pub path: String,
    pub time_stamp: u64,
    pub file_size: u64,
}

/// Include/exclude predicate shared by file enumeration and the watcher.
/// An empty include list means everything.
#[derive(Clone)]
pub struct GroupFilter {
    include: GlobSet,
    exclude: GlobSet,
}

impl GroupFilter {
    pub fn accepts(&self, path: &str) -> bool {
        self.include.is_match(path) && !self.exclude.is_match(path)
    }
}

/// A set of watched roots with an acceptance predicate, plus child groups.
/// Children carry their own roots and predicates; nothing is inherited.
pub struct ProjectGroup {
    pub paths: Vec<String>,
    pub filter: GroupFilter,
    pub groups: Vec<ProjectGroup>,
}

pub fn is_file_acceptable(group: &ProjectGroup, path: &str) -> bool {
    group.filter.accepts(path)
}

/// Parse a project description. A directory path stands for a one-group
/// project covering everything under it; otherwise the path names a
/// line-oriented project file:
///
/// ```text
/// # comment
/// path src
/// include **/*.rs
/// exclude **/generated/**
/// group
/// path vendor
/// endgroup
/// ```
pub fn parse_project(path: &str) -> Result<ProjectGroup> {
    if Path::new(path).is_dir() {
        let mut group = GroupSpec::default();
        group.paths.push(fileutil::normalize_slashes(path));
        return group.build();
    }

    let text =
        fs::read_to_string(path).with_context(|| format!("reading project {path}"))?;
    parse_project_text(&text).with_context(|| format!("parsing project {path}"))
}

fn parse_project_text(text: &str) -> Result<ProjectGroup> {
    let mut stack = vec![GroupSpec::default()];

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();

        match (word, rest) {
            ("path", p) if !p.is_empty() => {
                stack.last_mut().unwrap().paths.push(fileutil::normalize_slashes(p));
            }
            ("include", g) if !g.is_empty() => {
                stack.last_mut().unwrap().include.push(g.to_string());
            }
            ("exclude", g) if !g.is_empty() => {
                stack.last_mut().unwrap().exclude.push(g.to_string());
            }
            ("group", "") => stack.push(GroupSpec::default()),
            ("endgroup", "") => {
                if stack.len() < 2 {
                    bail!("line {}: endgroup without group", index + 1);
                }
                let child = stack.pop().unwrap();
                stack.last_mut().unwrap().groups.push(child);
            }
            _ => bail!("line {}: unrecognized directive '{}'", index + 1, word),
        }
    }

    if stack.len() != 1 {
        bail!("unterminated group");
    }
    stack.pop().unwrap().build()
}

#[derive(Default)]
struct GroupSpec {
    paths: Vec<String>,
    include: Vec<String>,
    exclude: Vec<String>,
    groups: Vec<GroupSpec>,
}

impl GroupSpec {
    fn build(self) -> Result<ProjectGroup> {
        let mut include = GlobSetBuilder::new();
        if self.include.is_empty() {
            include.add(Glob::new("**/*")?);
        }
        for glob in &self.include {
            include.add(Glob::new(glob).with_context(|| format!("include glob {glob}"))?);
        }
        let mut exclude = GlobSetBuilder::new();
        for glob in &self.exclude {
            exclude.add(Glob::new(glob).with_context(|| format!("exclude glob {glob}"))?);
        }

        Ok(ProjectGroup {
            paths: self.paths,
            filter: GroupFilter { include: include.build()?, exclude: exclude.build()? },
            groups: self.groups.into_iter().map(GroupSpec::build).collect::<Result<_>>()?,
        })
    }
}

/// Enumerate every acceptable file under the group and its children,
/// sorted by path and deduplicated. Unreadable entries are reported and
/// skipped.
pub fn get_project_group_files(output: &Output, group: &ProjectGroup) -> Vec<FileInfo> {
    let mut files = Vec::new();
    collect_group_files(output, group, &mut files);
    files.sort_by(|a, b| a.path.cmp(&b.path));
    files.dedup_by(|a, b| a.path == b.path);
    files
}

fn collect_group_files(output: &Output, group: &ProjectGroup, out: &mut Vec<FileInfo>) {
    for root in &group.paths {
        for entry in WalkDir::new(root) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    output.error(&format!("Error scanning folder {root}: {err}\n"));
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = fileutil::normalize_slashes(&entry.path().to_string_lossy());
            if !group.filter.accepts(&path) {
                continue;
            }
            match fileutil::file_attributes(&path) {
                Some((time_stamp, file_size)) => {
                    out.push(FileInfo { path, time_stamp, file_size });
                }
                None => output.error(&format!("Error reading attributes of {path}\n")),
            }
        }
    }

    for child in &group.groups {
        collect_group_files(output, child, out);
    }
}

use std::fs;
use std::time::UNIX_EPOCH;

/// Modification time (seconds since the Unix epoch) and size of a regular
/// file, or `None` when it cannot be stat'ed.
pub fn file_attributes(path: &str) -> Option<(u64, u64)> {
    let meta = fs::metadata(path).ok()?;
    if !meta.is_file() {
        return None;
    }
    let modified = meta.modified().ok()?;
    let time_stamp = modified.duration_since(UNIX_EPOCH).ok()?.as_secs();
    Some((time_stamp, meta.len()))
}

/// `foo/bar.qgp` -> `foo/bar<ext>`; a path without an extension just gets
/// `ext` appended. `ext` includes the leading dot.
pub fn replace_extension(path: &str, ext: &str) -> String {
    let cut = match (path.rfind('.'), path.rfind(['/', '\\'])) {
        (Some(dot), Some(sep)) if dot > sep => dot,
        (Some(dot), None) => dot,
        _ => path.len(),
    };
    format!("{}{}", &path[..cut], ext)
}

/// Canonical path form used throughout the pack and the change list:
/// forward slashes, no leading `./`.
pub fn normalize_slashes(path: &str) -> String {
    let path = path.replace('\\', "/");
    match path.strip_prefix("./") {
        Some(rest) => rest.to_string(),
        None => path,
    }
}

/// Join a watch root and a root-relative file into the canonical form.
pub fn normalize_path(root: &str, file: &str) -> String {
    if root.is_empty() {
        return normalize_slashes(file);
    }
    let mut joined = String::with_capacity(root.len() + file.len() + 1);
    joined.push_str(root);
    if !root.ends_with('/') && !root.ends_with('\\') {
        joined.push('/');
    }
    joined.push_str(file);
    normalize_slashes(&joined)
}

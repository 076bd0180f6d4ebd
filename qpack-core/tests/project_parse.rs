use qpack_core::fileutil::{normalize_path, normalize_slashes, replace_extension};
use qpack_core::output::Output;
use qpack_core::project::{get_project_group_files, is_file_acceptable, parse_project};
use qpack_core::watch::format_change_statistics;

#[test]
fn parses_groups_and_predicates() {
    let td = tempfile::tempdir().unwrap();
    let project = td.path().join("proj.qgp");
    std::fs::write(
        &project,
        "# project\n\
         path src\n\
         include **/*.rs\n\
         exclude **/generated/**\n\
         group\n\
         path vendor\n\
         include **/*.c\n\
         endgroup\n",
    )
    .unwrap();

    let group = parse_project(&project.to_string_lossy()).unwrap();
    assert_eq!(group.paths, vec!["src"]);
    assert_eq!(group.groups.len(), 1);
    assert_eq!(group.groups[0].paths, vec!["vendor"]);

    assert!(is_file_acceptable(&group, "src/lib.rs"));
    assert!(!is_file_acceptable(&group, "src/lib.c"));
    assert!(!is_file_acceptable(&group, "src/generated/out.rs"));
    assert!(is_file_acceptable(&group.groups[0], "vendor/zlib.c"));
}

#[test]
fn rejects_malformed_project_files() {
    let td = tempfile::tempdir().unwrap();

    let bad = td.path().join("bad.qgp");
    std::fs::write(&bad, "path src\nfrobnicate\n").unwrap();
    assert!(parse_project(&bad.to_string_lossy()).is_err());

    let unterminated = td.path().join("open.qgp");
    std::fs::write(&unterminated, "group\npath x\n").unwrap();
    assert!(parse_project(&unterminated.to_string_lossy()).is_err());

    let missing = td.path().join("missing.qgp");
    assert!(parse_project(&missing.to_string_lossy()).is_err());
}

#[test]
fn directory_project_accepts_everything_under_it() {
    let td = tempfile::tempdir().unwrap();
    let data = td.path().join("tree");
    std::fs::create_dir_all(data.join("sub")).unwrap();
    std::fs::write(data.join("a.txt"), "a").unwrap();
    std::fs::write(data.join("sub/b.rs"), "b").unwrap();

    let root = data.to_string_lossy().replace('\\', "/");
    let group = parse_project(&root).unwrap();
    assert_eq!(group.paths, vec![root.clone()]);

    let files = get_project_group_files(&Output::new(), &group);
    assert_eq!(files.len(), 2);
    assert!(files[0].path < files[1].path);
    assert!(files.iter().any(|f| f.path.ends_with("sub/b.rs")));
    for file in &files {
        assert!(file.time_stamp > 0);
    }
}

#[test]
fn enumeration_respects_the_filter() {
    let td = tempfile::tempdir().unwrap();
    let data = td.path().join("tree");
    std::fs::create_dir(&data).unwrap();
    std::fs::write(data.join("keep.rs"), "k").unwrap();
    std::fs::write(data.join("skip.o"), "s").unwrap();

    let project = td.path().join("proj.qgp");
    let root = data.to_string_lossy().replace('\\', "/");
    std::fs::write(&project, format!("path {root}\ninclude **/*.rs\n")).unwrap();

    let group = parse_project(&project.to_string_lossy()).unwrap();
    let files = get_project_group_files(&Output::new(), &group);
    assert_eq!(files.len(), 1);
    assert!(files[0].path.ends_with("keep.rs"));
}

#[test]
fn extension_replacement() {
    assert_eq!(replace_extension("proj.qgp", ".qgd"), "proj.qgd");
    assert_eq!(replace_extension("dir/proj.qgp", ".qgc"), "dir/proj.qgc");
    assert_eq!(replace_extension("dir.v2/proj", ".qgd"), "dir.v2/proj.qgd");
    assert_eq!(replace_extension("proj", ".qgd"), "proj.qgd");
}

#[test]
fn path_normalization() {
    assert_eq!(normalize_slashes("a\\b\\c.rs"), "a/b/c.rs");
    assert_eq!(normalize_slashes("./a/b"), "a/b");
    assert_eq!(normalize_path("root", "sub/file.rs"), "root/sub/file.rs");
    assert_eq!(normalize_path("root/", "file.rs"), "root/file.rs");
    assert_eq!(normalize_path("root", "sub\\file.rs"), "root/sub/file.rs");
    assert_eq!(normalize_path("", "file.rs"), "file.rs");
}

#[test]
fn change_statistic_elides_long_paths() {
    let line = format_change_statistics(3, "short/path.rs");
    assert!(line.starts_with("3 files changed; last: short/path.rs"));
    assert!(line.ends_with('\r'));

    let long = "a/".repeat(40) + "leaf.rs";
    let line = format_change_statistics(7, &long);
    let shown = line
        .strip_prefix("7 files changed; last: ")
        .unwrap()
        .trim_end_matches('\r');
    assert_eq!(shown.chars().count(), 40);
    assert!(shown.starts_with("..."));
    assert!(shown.ends_with("leaf.rs"));
}

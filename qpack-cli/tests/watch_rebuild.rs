use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

// More files than WATCH_UPDATE_THRESHOLD_FILES, so the startup diff alone
// puts the watch session into rebuild territory.
const FILE_COUNT: usize = 140;

#[test]
fn threshold_and_quiet_period_trigger_rebuild() {
    let td = assert_fs::TempDir::new().unwrap();
    let data = td.child("data");
    data.create_dir_all().unwrap();
    for i in 0..FILE_COUNT {
        std::fs::write(
            data.child(format!("f{i:03}.txt")).path(),
            format!("file {i}\n"),
        )
        .unwrap();
    }
    td.child("proj.qgp").write_str("path data\n").unwrap();

    Command::cargo_bin("qpack")
        .unwrap()
        .current_dir(td.path())
        .args(["build", "proj.qgp"])
        .assert()
        .success();

    // Grow every file so it differs from the pack by size.
    for i in 0..FILE_COUNT {
        let path = data.child(format!("f{i:03}.txt")).path().to_path_buf();
        let mut contents = std::fs::read(&path).unwrap();
        contents.extend_from_slice(b"changed\n");
        std::fs::write(&path, contents).unwrap();
    }

    let mut watch = Command::cargo_bin("qpack")
        .unwrap()
        .current_dir(td.path())
        .args(["watch", "proj.qgp"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    // The sidecar appears with the startup diff; once the change set stays
    // quiet past the update timeout, the rebuild removes it again.
    let sidecar = td.child("proj.qgc").path().to_path_buf();
    let deadline = Instant::now() + Duration::from_secs(60);
    let mut saw_sidecar = false;
    let mut rebuilt = false;
    while Instant::now() < deadline {
        match (saw_sidecar, sidecar.exists()) {
            (false, true) => saw_sidecar = true,
            (true, false) => {
                rebuilt = true;
                break;
            }
            _ => {}
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    let _ = watch.kill();
    let _ = watch.wait();

    assert!(saw_sidecar, "startup diff never produced proj.qgc");
    assert!(rebuilt, "quiet period did not remove proj.qgc");

    // The regenerated pack reflects the grown files.
    let pack = td.child("proj.qgd").path().to_string_lossy().into_owned();
    let listed = qpack_core::reader::data_file_list(&pack).unwrap();
    assert_eq!(listed.len(), FILE_COUNT);
    for info in &listed {
        let on_disk = std::fs::metadata(td.path().join(&info.path)).unwrap();
        assert_eq!(info.file_size, on_disk.len());
    }
    td.child("proj.qgd_").assert(predicates::path::missing());
}

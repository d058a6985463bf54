//! FLATAR - CLI Tests
//! Drives the built binary and checks output and exit codes.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn flatar(cwd: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_flatar"))
        .args(args)
        .current_dir(cwd)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_help_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    for args in [&["help"][..], &["--help"][..], &["-h"][..]] {
        let output = flatar(dir.path(), args);
        assert!(output.status.success(), "{:?}", args);
        assert!(stdout(&output).contains("extract"));
    }
}

#[test]
fn test_bad_invocation_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    for args in [&[][..], &["bogus"][..], &["stat"][..], &["input", "a.far"][..]] {
        let output = flatar(dir.path(), args);
        assert_eq!(output.status.code(), Some(1), "{:?}", args);
    }
}

#[test]
fn test_stat_missing_archive_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let output = flatar(dir.path(), &["stat", "missing.far"]);
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
    assert!(!dir.path().join("missing.far").exists());
}

#[test]
fn test_input_stat_extract() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    fs::create_dir(&src).unwrap();
    fs::write(src.join("notes.txt"), b"hello").unwrap();
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(src.join("notes.txt"), fs::Permissions::from_mode(0o644)).unwrap();
    }

    let output = flatar(dir.path(), &["input", "a.far", "src/notes.txt"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let output = flatar(dir.path(), &["stat", "a.far"]);
    assert!(output.status.success());
    let listing = stdout(&output);
    assert_eq!(listing.lines().count(), 1);
    assert!(listing.starts_with("notes.txt\t5 bytes\tmode 644\tuid "), "{}", listing);

    let output = flatar(dir.path(), &["extract", "a.far", "notes.txt"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(fs::read(dir.path().join("notes.txt")).unwrap(), b"hello");

    let output = flatar(dir.path(), &["stat", "a.far"]);
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn test_stat_json() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("blob"), b"abc").unwrap();
    assert!(flatar(dir.path(), &["input", "a.far", "blob"]).status.success());

    let output = flatar(dir.path(), &["stat", "a.far", "--json"]);
    assert!(output.status.success());
    let row: serde_json::Value = serde_json::from_str(stdout(&output).trim()).unwrap();
    assert_eq!(row["name"], "blob");
    assert_eq!(row["content_len"], 3);
}

#[test]
fn test_extract_missing_name_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let output = flatar(dir.path(), &["extract", "a.far", "nothing"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("not found"));
}

#[test]
fn test_extract_into_directory() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("out")).unwrap();
    fs::write(dir.path().join("f"), b"data").unwrap();
    assert!(flatar(dir.path(), &["--no-sync", "input", "a.far", "f"]).status.success());

    let output = flatar(dir.path(), &["extract", "a.far", "f", "-C", "out"]);
    assert!(output.status.success());
    assert_eq!(fs::read(dir.path().join("out/f")).unwrap(), b"data");
}

#[test]
fn test_corrupt_archive_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("bad.far"), [1u8, 2, 3]).unwrap();

    let output = flatar(dir.path(), &["stat", "bad.far"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("corrupt"));
}

use std::fs;
use std::process::Command;

use bermuda_formats::ScriptWriter;
use serde_json::Value;
use tempfile::tempdir;

fn sample_script() -> Vec<u8> {
    let mut writer = ScriptWriter::new();
    writer.word(0);
    writer.word(6000).words(&[12, 0, 3]).word(0);
    writer.word(6000).words(&[12, 1, 1]);
    let end = writer.len() as i16;
    writer.patch_word(0, end);
    writer.into_bytes()
}

#[test]
fn dumps_directory_as_json() {
    let dir = tempdir().expect("tempdir");
    let nested = dir.path().join("scenes");
    fs::create_dir_all(&nested).expect("mkdir");
    fs::write(nested.join("a.script"), sample_script()).expect("write script");
    fs::write(nested.join("notes.txt"), b"ignored").expect("write txt");
    let out = dir.path().join("dump.json");

    let status = Command::new(env!("CARGO_BIN_EXE_script_dump"))
        .arg(dir.path())
        .arg("--json")
        .arg("--out")
        .arg(&out)
        .status()
        .expect("run script_dump");
    assert!(status.success());

    let dump: Value = serde_json::from_str(&fs::read_to_string(&out).expect("read dump"))
        .expect("parse dump");
    let entries = dump.as_array().expect("array");
    assert_eq!(entries.len(), 1);
    let statement = &entries[0]["listing"]["statements"][0];
    assert_eq!(statement["conditions"][0]["name"], "var_test");
    assert_eq!(statement["operators"][0]["name"], "eval_var");
    assert_eq!(statement["operators"][0]["operands"][1]["kind"], "eval");
}

#[test]
fn fails_on_empty_directory() {
    let dir = tempdir().expect("tempdir");
    let output = Command::new(env!("CARGO_BIN_EXE_script_dump"))
        .arg(dir.path())
        .output()
        .expect("run script_dump");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no .script files"));
}

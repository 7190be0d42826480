//! Concurrency tests for the mapty binary.
//!
//! Every command holds the store lock from load to its last save, so
//! concurrent writers never drop each other's changes, and a reader sees
//! either the old or the new blob, never a partial one.

use assert_cmd::Command;
use std::thread;
use tempfile::TempDir;

fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("mapty"))
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn add_run(data_dir: &std::path::Path) {
    cli()
        .arg("add")
        .arg("--data-dir")
        .arg(data_dir)
        .arg("--offline")
        .args([
            "--lat", "1", "--lng", "1", "--distance", "5", "--duration", "30", "--cadence",
            "150",
        ])
        .assert()
        .success();
}

#[test]
fn test_concurrent_writers_keep_every_workout() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    let writers: Vec<_> = (0..8)
        .map(|_| {
            let dir = data_dir.clone();
            thread::spawn(move || {
                for _ in 0..3 {
                    add_run(&dir);
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().expect("Writer thread panicked");
    }

    let contents =
        std::fs::read_to_string(data_dir.join("workouts.json")).expect("Failed to read blob");
    let blob: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert_eq!(blob["workouts"].as_array().unwrap().len(), 24);
}

#[test]
fn test_concurrent_clicks_are_all_counted() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();
    add_run(&data_dir);

    let contents = std::fs::read_to_string(data_dir.join("workouts.json")).unwrap();
    let blob: serde_json::Value = serde_json::from_str(&contents).unwrap();
    let id = blob["workouts"][0]["id"].as_str().unwrap().to_string();

    let clickers: Vec<_> = (0..4)
        .map(|_| {
            let dir = data_dir.clone();
            let id = id.clone();
            thread::spawn(move || {
                for _ in 0..2 {
                    cli()
                        .arg("show")
                        .arg(&id)
                        .arg("--data-dir")
                        .arg(&dir)
                        .assert()
                        .success();
                }
            })
        })
        .collect();
    for clicker in clickers {
        clicker.join().expect("Clicker thread panicked");
    }

    let contents = std::fs::read_to_string(data_dir.join("workouts.json")).unwrap();
    let blob: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert_eq!(blob["workouts"][0]["clicks"], 8);
}

#[test]
fn test_readers_never_see_partial_blob() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();
    add_run(&data_dir);

    let writer_dir = data_dir.clone();
    let writer = thread::spawn(move || {
        for _ in 0..4 {
            add_run(&writer_dir);
        }
    });

    for _ in 0..6 {
        let output = cli()
            .arg("list")
            .arg("--data-dir")
            .arg(&data_dir)
            .output()
            .expect("Failed to run mapty list");
        assert!(output.status.success());

        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(
            !stderr.contains("could not be read"),
            "reader saw a partial blob: {}",
            stderr
        );
    }

    writer.join().expect("Writer thread panicked");
}

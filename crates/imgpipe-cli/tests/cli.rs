//! End-to-end tests of the `imgpipe` binary.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use imgpipe::{encode, ops, sniff, ImageFormat, ImageHandle, Runtime, SaveOptions};

fn imgpipe(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_imgpipe"))
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("IMGPIPE_CONCURRENCY")
        .output()
        .expect("failed to run imgpipe")
}

fn runtime() -> &'static Runtime {
    let runtime = Runtime::global();
    runtime.initialize().unwrap();
    runtime
}

/// Writes a `w` x `h` RGBA PNG to `path`.
fn write_png(path: &Path, w: i32, h: i32) {
    let img = ops::black(runtime(), w, h, 4).unwrap();
    let img = ops::linear(img, &[1.0], &[10.0, 200.0, 30.0, 255.0]).unwrap();
    fs::write(path, encode(img, &SaveOptions::new(ImageFormat::Png)).unwrap()).unwrap();
}

fn dimensions(path: &Path) -> (u32, u32) {
    let (img, _) = ImageHandle::load(runtime(), &fs::read(path).unwrap()).unwrap();
    (img.width(), img.height())
}

#[test]
fn info_json() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.png");
    write_png(&input, 12, 7);

    let out = imgpipe(&["info", "--json", input.to_str().unwrap()]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(value["format"], "png");
    assert_eq!(value["width"], 12);
    assert_eq!(value["height"], 7);
    assert_eq!(value["bands"], 4);
    assert_eq!(value["alpha"], true);
}

#[test]
fn info_text() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.png");
    write_png(&input, 5, 5);

    let out = imgpipe(&["info", input.to_str().unwrap()]);
    assert!(out.status.success());
    let text = String::from_utf8_lossy(&out.stdout);
    assert!(text.contains("Resolution:  5x5"), "{text}");
    assert!(text.contains("Space:       srgb"), "{text}");
}

#[test]
fn convert_by_extension() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.png");
    let output = dir.path().join("out.jpg");
    write_png(&input, 20, 10);

    let out = imgpipe(&["convert", input.to_str().unwrap(), output.to_str().unwrap(), "-q", "90"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(sniff(&fs::read(&output).unwrap()), ImageFormat::Jpeg);
    assert_eq!(dimensions(&output), (20, 10));
}

#[test]
fn convert_rejects_unwritable_format() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.png");
    write_png(&input, 4, 4);

    let out = imgpipe(&["convert", input.to_str().unwrap(), dir.path().join("out.tiff").to_str().unwrap()]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Unsupported output format"));
}

#[test]
fn convert_reports_unsupported_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.png");
    fs::write(&input, b"this is not an image").unwrap();

    let out = imgpipe(&["convert", input.to_str().unwrap(), dir.path().join("out.png").to_str().unwrap()]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("unsupported image format"));
}

#[test]
fn process_runs_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.png");
    let output = dir.path().join("out.webp");
    let steps = dir.path().join("steps.json");
    write_png(&input, 40, 20);
    fs::write(
        &steps,
        r#"{
            "operations": [
                { "op": "rotate", "angle": "90" },
                { "op": "extract", "left": -3, "top": 0, "width": 10, "height": 30 },
                { "op": "zoom", "factor": 2 }
            ]
        }"#,
    )
    .unwrap();

    let out = imgpipe(&[
        "process",
        input.to_str().unwrap(),
        output.to_str().unwrap(),
        "-p",
        steps.to_str().unwrap(),
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(sniff(&fs::read(&output).unwrap()), ImageFormat::Webp);
    assert_eq!(dimensions(&output), (20, 60));
}

#[test]
fn process_rejects_bad_json() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.png");
    let steps = dir.path().join("steps.json");
    write_png(&input, 4, 4);
    fs::write(&steps, r#"{ "operations": [ { "op": "explode" } ] }"#).unwrap();

    let out = imgpipe(&[
        "process",
        input.to_str().unwrap(),
        dir.path().join("out.png").to_str().unwrap(),
        "-p",
        steps.to_str().unwrap(),
    ]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Invalid pipeline"));
}

#[test]
fn memory_report() {
    let out = imgpipe(&["memory", "--drop-cache", "--dump"]);
    assert!(out.status.success());
    let text = String::from_utf8_lossy(&out.stdout);
    assert!(text.contains("Engine:        ready"), "{text}");
    assert!(text.contains("Concurrency:   1"), "{text}");
    assert!(String::from_utf8_lossy(&out.stderr).contains("lifecycle: ready"));
}

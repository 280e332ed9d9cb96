//! CLI integration tests for seai-cli.
//!
//! These tests run the actual binary and check outputs, exit codes, and
//! file artifacts.

use assert_cmd::Command;
use image::{Rgb, RgbImage};
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const TEST_KEY: &str = "Cli-Integration-Key-0123456789-ABCDEFGHIJKL";

/// Get a Command for the seai binary with a clean SEAL_* environment.
fn seai() -> Command {
    let mut cmd = Command::cargo_bin("seai").unwrap();
    for var in [
        "SEAL_MASTER_KEY",
        "SEAL_PBKDF2_ITERATIONS",
        "SEAL_MIN_DIMENSION",
        "SEAL_CHANNELS",
        "SEAL_GENERATOR_ID",
        "SEAL_MAX_FILE_SIZE_MB",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

/// Same as [`seai`] with the master key set.
fn seai_keyed() -> Command {
    let mut cmd = seai();
    cmd.env("SEAL_MASTER_KEY", TEST_KEY);
    cmd
}

fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, (x ^ y) as u8]))
        .save(&path)
        .unwrap();
    path
}

// ============================================================================
// Help and Version Tests
// ============================================================================

#[test]
fn test_help_displays_usage() {
    seai()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("AI-provenance seals"))
        .stdout(predicate::str::contains("embed"))
        .stdout(predicate::str::contains("verify"))
        .stdout(predicate::str::contains("capacity"))
        .stdout(predicate::str::contains("keygen"))
        .stdout(predicate::str::contains("info"));
}

#[test]
fn test_version_displays_version() {
    seai()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("seai"));
}

#[test]
fn test_help_shows_exit_codes() {
    seai()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Exit codes:"))
        .stdout(predicate::str::contains("65"))
        .stdout(predicate::str::contains("78"));
}

#[test]
fn test_embed_help_shows_options() {
    seai()
        .args(["embed", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--output"))
        .stdout(predicate::str::contains("--meta"))
        .stdout(predicate::str::contains("--generator"))
        .stdout(predicate::str::contains("--json"));
}

#[test]
fn test_help_does_not_leak_secret() {
    seai_keyed()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(TEST_KEY).not());
}

// ============================================================================
// Error Handling Tests
// ============================================================================

#[test]
fn test_embed_without_secret_is_config_error() {
    let temp = TempDir::new().unwrap();
    let image = write_png(temp.path(), "photo.png", 120, 120);

    seai()
        .args(["embed", image.to_str().unwrap()])
        .assert()
        .code(78)
        .stderr(predicate::str::contains("SEAL_MASTER_KEY"));
}

#[test]
fn test_embed_missing_file_is_input_error() {
    seai_keyed()
        .args(["embed", "/nonexistent/path/photo.png"])
        .assert()
        .code(66)
        .stderr(predicate::str::contains("Failed to read image"));
}

#[test]
fn test_embed_small_image_is_data_error() {
    let temp = TempDir::new().unwrap();
    let image = write_png(temp.path(), "tiny.png", 99, 99);

    seai_keyed()
        .args(["embed", image.to_str().unwrap()])
        .assert()
        .code(65)
        .stderr(predicate::str::contains("Image too small"));

    assert!(!temp.path().join("tiny_sealed.png").exists());
}

#[test]
fn test_embed_garbage_is_data_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("notes.png");
    fs::write(&path, b"this is plain text").unwrap();

    seai_keyed()
        .args(["embed", path.to_str().unwrap()])
        .assert()
        .code(65)
        .stderr(predicate::str::contains("Unsupported format"));
}

#[test]
fn test_embed_rejects_malformed_meta() {
    let temp = TempDir::new().unwrap();
    let image = write_png(temp.path(), "photo.png", 120, 120);

    seai_keyed()
        .args(["embed", image.to_str().unwrap(), "--meta", "no-equals-sign"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("KEY=VALUE"));
}

#[test]
fn test_keygen_rejects_short_length() {
    seai()
        .args(["keygen", "--length", "16"])
        .assert()
        .code(64)
        .stderr(predicate::str::contains("at least 32"));
}

// ============================================================================
// Command Output Tests
// ============================================================================

#[test]
fn test_embed_writes_default_output() {
    let temp = TempDir::new().unwrap();
    let image = write_png(temp.path(), "render.png", 150, 100);

    seai_keyed()
        .args(["embed", image.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("SeAl tag successfully embedded"))
        .stdout(predicate::str::contains("render_sealed.png"));

    let output = temp.path().join("render_sealed.png");
    let bytes = fs::read(&output).unwrap();
    assert_eq!(image::guess_format(&bytes).unwrap(), image::ImageFormat::Png);
    let decoded = image::load_from_memory(&bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (150, 100));
}

#[test]
fn test_embed_quiet_prints_nothing() {
    let temp = TempDir::new().unwrap();
    let image = write_png(temp.path(), "render.png", 100, 100);
    let output = temp.path().join("out.png");

    seai_keyed()
        .args(["-q", "embed", image.to_str().unwrap(), "-o"])
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    assert!(output.exists());
}

#[test]
fn test_verify_unsealed_image() {
    let temp = TempDir::new().unwrap();
    let image = write_png(temp.path(), "plain.png", 100, 100);

    seai_keyed()
        .args(["verify", image.to_str().unwrap()])
        .assert()
        .code(65)
        .stdout(predicate::str::contains("NOT VERIFIED"))
        .stdout(predicate::str::contains("This image was not generated by AI."))
        .stderr(predicate::str::contains("Verification failed"));
}

#[test]
fn test_verify_unsealed_image_json() {
    let temp = TempDir::new().unwrap();
    let image = write_png(temp.path(), "plain.png", 100, 100);

    let output = seai_keyed()
        .args(["verify", "--json", image.to_str().unwrap()])
        .assert()
        .code(65)
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["verified"], false);
    assert_eq!(json["reason"], "NoTagFound");
    assert_eq!(json["details"], "No valid SeAl tag found in the image.");
}

#[test]
fn test_capacity_needs_no_secret() {
    let temp = TempDir::new().unwrap();
    let image = write_png(temp.path(), "square.png", 100, 100);

    let output = seai()
        .args(["capacity", "--json", image.to_str().unwrap()])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["capacity_bits"], 30_000);
    assert_eq!(json["max_tag_bytes"], 3698);
    assert_eq!(json["meets_min_dimension"], true);
}

#[test]
fn test_capacity_reports_small_image() {
    let temp = TempDir::new().unwrap();
    let image = write_png(temp.path(), "small.png", 50, 50);

    seai()
        .args(["capacity", image.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("7500 bits"))
        .stdout(predicate::str::contains("minimum 100x100"));
}

#[test]
fn test_keygen_prints_strong_key() {
    let output = seai()
        .args(["-q", "keygen"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let key = String::from_utf8(output).unwrap();
    let key = key.trim_end();
    assert_eq!(key.len(), 64);
    assert!(seai_core::check_key_strength(key).is_ok());
}

#[test]
fn test_keygen_write_env_preserves_entries() {
    let temp = TempDir::new().unwrap();
    let env_file = temp.path().join(".env");
    fs::write(&env_file, "PORT=5000\nSEAL_MASTER_KEY=old-key\nDEBUG=true\n").unwrap();

    seai()
        .args(["keygen", "--length", "40", "--write-env"])
        .arg(&env_file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Fingerprint:"))
        .stdout(predicate::str::contains("SEAL_MASTER_KEY=").not());

    let entries: Vec<(String, String)> = dotenvy::from_path_iter(&env_file)
        .unwrap()
        .map(Result::unwrap)
        .collect();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0], ("PORT".to_string(), "5000".to_string()));
    assert_eq!(entries[2], ("DEBUG".to_string(), "true".to_string()));
    assert_eq!(entries[1].0, "SEAL_MASTER_KEY");
    assert_eq!(entries[1].1.len(), 40);
    assert!(seai_core::check_key_strength(&entries[1].1).is_ok());
}

#[test]
fn test_embed_reads_secret_from_dotenv() {
    let temp = TempDir::new().unwrap();
    seai()
        .current_dir(temp.path())
        .args(["-q", "keygen", "--write-env", ".env"])
        .assert()
        .success();
    let image = write_png(temp.path(), "photo.png", 120, 120);

    seai()
        .current_dir(temp.path())
        .args(["-q", "embed", "photo.png"])
        .assert()
        .success();
    seai()
        .current_dir(temp.path())
        .args(["verify", "photo_sealed.png"])
        .assert()
        .success()
        .stdout(predicate::str::contains("VERIFIED"));

    // Without the .env file the secret is missing again.
    seai()
        .args(["embed", image.to_str().unwrap()])
        .assert()
        .code(78);
}

#[test]
fn test_info_json() {
    let output = seai()
        .args(["info", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["encryption"], "AES-256-GCM");
    assert_eq!(json["steganography"], "LSB (Least Significant Bit)");
    assert_eq!(json["max_file_size_mb"], 16.0);
    assert_eq!(
        json["supported_formats"],
        serde_json::json!(["png", "jpg", "jpeg", "bmp"])
    );
}

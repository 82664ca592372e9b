//! End-to-end tests for the `depforge` CLI binary.

use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

/// Isolated home and module directory for one invocation.
struct TestContext {
    temp_dir: TempDir,
    module_dir: PathBuf,
}

impl TestContext {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let module_dir = temp_dir.path().join("module");
        std::fs::create_dir_all(&module_dir).expect("failed to create module dir");
        Self {
            temp_dir,
            module_dir,
        }
    }

    fn depforge_cmd(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_depforge"));
        cmd.env("HOME", self.temp_dir.path());
        cmd.env("DEPFORGE_HOME", self.temp_dir.path().join(".depforge"));
        cmd.env_remove("DEPFORGE_CONFIG");
        cmd.arg("--module-dir").arg(&self.module_dir);
        cmd
    }
}

#[test]
fn test_help_command() {
    let ctx = TestContext::new();
    let output = ctx
        .depforge_cmd()
        .arg("--help")
        .output()
        .expect("failed to run depforge");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"));
    assert!(stdout.contains("icu-data"));
    assert!(stdout.contains("mimalloc"));
}

#[test]
fn test_version_command() {
    let ctx = TestContext::new();
    let output = ctx
        .depforge_cmd()
        .arg("--version")
        .output()
        .expect("failed to run depforge");
    assert!(output.status.success());
}

#[test]
fn test_mimalloc_prints_descriptor() {
    let ctx = TestContext::new();
    let output = ctx
        .depforge_cmd()
        .args([
            "mimalloc",
            "--skip-fetch",
            "--platform",
            "linux",
            "--arch",
            "x64",
            "--toolchain",
            "gcc",
            "--output",
            "shared",
        ])
        .output()
        .expect("failed to run depforge");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("stdout is JSON");
    assert_eq!(json["name"], "mimalloc");
    assert_eq!(json["kind"], "shared_library");
    assert_eq!(json["language"], "c11");
    let public = json["definitions"]["public"].as_array().unwrap();
    assert!(public.iter().any(|d| d == "MI_SHARED_LIB=1"));
}

#[test]
fn test_mimalloc_reads_config() {
    let ctx = TestContext::new();
    let config = ctx.temp_dir.path().join("forge.toml");
    std::fs::write(&config, "[mimalloc]\nsecure = true\n").unwrap();

    let output = ctx
        .depforge_cmd()
        .arg("--config")
        .arg(&config)
        .args(["mimalloc", "--skip-fetch", "--platform", "linux", "--arch", "x64"])
        .output()
        .expect("failed to run depforge");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let public = json["definitions"]["public"].as_array().unwrap();
    assert!(public.iter().any(|d| d == "MI_SECURE=4"));
}

#[test]
fn test_icu_rejects_common_output() {
    let ctx = TestContext::new();
    let output = ctx
        .depforge_cmd()
        .args(["icu", "--skip-fetch", "--output", "common"])
        .output()
        .expect("failed to run depforge");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unsupported output kind"));
}

#[test]
fn test_icu_descriptor_references_modules() {
    let ctx = TestContext::new();
    let output = ctx
        .depforge_cmd()
        .args(["icu", "--skip-fetch", "--output", "shared", "--data-mode", "common"])
        .output()
        .expect("failed to run depforge");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let deps = json["dependencies"]["public"].as_array().unwrap();
    assert_eq!(deps.len(), 3);
    assert_eq!(deps[2]["output"], "common");
}

#[test]
fn test_icu_data_rejects_dynamic_before_building() {
    let ctx = TestContext::new();
    let output = ctx
        .depforge_cmd()
        .args(["icu-data", "--output", "dynamic"])
        .output()
        .expect("failed to run depforge");
    assert!(!output.status.success());
    assert!(!ctx.module_dir.join("Binaries").exists());
    assert!(!ctx.module_dir.join("temp").exists());
}

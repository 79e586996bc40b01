//! Tests driving the linkname-gen binary

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Run linkname-gen inside `dir`
fn run_linkname_gen(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_linkname-gen"))
        .args(args)
        .current_dir(dir)
        .env("LINKNAME_GEN_FORMATTER", "builtin")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run linkname-gen")
}

/// Helper to check if the go toolchain is available
fn check_go_available() -> bool {
    Command::new("go")
        .arg("version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

#[test]
fn test_missing_symbol_exits_with_usage() {
    let tmp = TempDir::new().unwrap();
    let output = run_linkname_gen(tmp.path(), &["-def", "func goTag() string"]);

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Usage"), "stderr: {}", stderr);
    assert!(stderr.contains("-symbol S -def F"), "stderr: {}", stderr);
}

#[test]
fn test_missing_def_exits_with_usage() {
    let tmp = TempDir::new().unwrap();
    let output = run_linkname_gen(tmp.path(), &["-symbol", "runtime.nanotime"]);

    assert_eq!(output.status.code(), Some(2));
    assert!(!tmp.path().join("sym_linkname.go").exists());
}

#[test]
fn test_help_succeeds() {
    let tmp = TempDir::new().unwrap();
    let output = run_linkname_gen(tmp.path(), &["-help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--symbol"));
    assert!(stdout.contains("--def"));
    assert!(stdout.contains("--output"));
}

#[test]
fn test_invalid_definition_exits_with_two() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("main.go"), "package main\n\nfunc main() {}\n").unwrap();

    let output = run_linkname_gen(
        tmp.path(),
        &["-symbol", "runtime.nanotime", "-def", "nanotime() int64"],
    );

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid definition"), "stderr: {}", stderr);
    assert!(!tmp.path().join("sym_linkname.go").exists());
    assert!(!tmp.path().join("linkname.s").exists());
}

#[test]
fn test_missing_path_is_fatal() {
    let tmp = TempDir::new().unwrap();
    let output = run_linkname_gen(
        tmp.path(),
        &["-symbol", "runtime.nanotime", "-def", "func nanotime() int64", "nope"],
    );

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cannot stat nope"), "stderr: {}", stderr);
}

#[test]
fn test_parse_error_is_fatal() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("main.go"), "package main\n\nfunc main() {\n").unwrap();

    let output = run_linkname_gen(
        tmp.path(),
        &["-symbol", "runtime.nanotime", "-def", "func nanotime() int64"],
    );

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("parsing package:"), "stderr: {}", stderr);
    assert!(!tmp.path().join("sym_linkname.go").exists());
}

fn write_module(dir: &Path) {
    fs::write(dir.join("go.mod"), "module example.com/m\n\ngo 1.21\n").unwrap();
    fs::create_dir_all(dir.join("pkg/generator")).unwrap();
    fs::write(
        dir.join("pkg/generator/generator.go"),
        "package generator\n\ntype Generator struct{}\n\nfunc (g *Generator) goTag(s string) string { return s }\n",
    )
    .unwrap();
    fs::create_dir_all(dir.join("app")).unwrap();
    fs::write(
        dir.join("app/main.go"),
        "package main\n\nimport _ \"example.com/m/pkg/generator\"\n\nfunc main() {}\n",
    )
    .unwrap();
}

#[test]
#[ignore = "Requires go toolchain"]
fn test_generates_linkname_file() {
    if !check_go_available() {
        eprintln!("Skipping test: go not available");
        return;
    }
    let tmp = TempDir::new().unwrap();
    write_module(tmp.path());
    let app = tmp.path().join("app");

    let output = run_linkname_gen(
        &app,
        &[
            "-symbol",
            "pkg/generator.(*Generator).goTag",
            "-def",
            "func goTag(*generator.Generator, string) string",
        ],
    );
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let generated = fs::read_to_string(app.join("sym_linkname.go")).unwrap();
    assert!(generated.contains(
        "//go:linkname goTag example.com/m/pkg/generator.(*Generator).goTag"
    ));
    assert!(generated.contains("\"example.com/m/pkg/generator\""));
    assert_eq!(fs::read_to_string(app.join("linkname.s")).unwrap(), "");
}

#[test]
#[ignore = "Requires go toolchain"]
fn test_unknown_symbol_reports_no_such_symbol() {
    if !check_go_available() {
        eprintln!("Skipping test: go not available");
        return;
    }
    let tmp = TempDir::new().unwrap();
    write_module(tmp.path());
    let app = tmp.path().join("app");

    let output = run_linkname_gen(
        &app,
        &["-symbol", "pkg/other.Foo", "-def", "func foo()"],
    );

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no such symbol: `pkg/other.Foo`"), "stderr: {}", stderr);
    assert!(!app.join("sym_linkname.go").exists());
    assert!(!app.join("linkname.s").exists());
}

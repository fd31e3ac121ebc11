//! CLI integration tests for autoforge.
//!
//! These exercise the real `autoforge` binary against small on-disk
//! projects. Scenarios that require a real C toolchain and `make` on PATH
//! are marked `#[ignore]`, matching this binary's own unit-test convention
//! for anything that shells out to an actual compiler.

use std::fs;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

fn autoforge() -> Command {
    Command::cargo_bin("autoforge").unwrap()
}

fn temp_dir() -> TempDir {
    TempDir::new().unwrap()
}

fn write_project(dir: &std::path::Path, manifest: &str) {
    fs::write(dir.join("Autoforge.toml"), manifest).unwrap();
}

// ============================================================================
// flag surface: --help / --version / unknown flags
// ============================================================================

#[test]
fn help_exits_with_code_two() {
    autoforge()
        .arg("--help")
        .assert()
        .code(2)
        .stdout(predicate::str::contains("Configure a C/C++ project"));
}

#[test]
fn version_exits_with_code_two() {
    autoforge().arg("--version").assert().code(2);
}

#[test]
fn unknown_fixed_flag_is_fatal() {
    // `--bogus-flag` without `=value` doesn't look like a project option
    // override, so clap rejects it as an unrecognized argument.
    autoforge().arg("--bogus-flag").assert().code(1);
}

#[test]
fn missing_project_root_is_fatal_before_any_toolchain_work() {
    let tmp = temp_dir();
    autoforge()
        .arg(tmp.path().join("does-not-exist"))
        .assert()
        .failure();
}

// ============================================================================
// S1: minimal binary project, end to end
// ============================================================================

#[test]
#[ignore] // requires a real C toolchain and make on PATH
fn minimal_binary_project_generates_makefile() {
    let tmp = temp_dir();
    write_project(
        tmp.path(),
        r#"
[project]
name = "hello"
version = "1.0.0"

[[target]]
name = "hello"
kind = "binary"
files = ["main.c"]
"#,
    );
    fs::write(tmp.path().join("main.c"), "int main(void) { return 0; }\n").unwrap();

    autoforge()
        .arg(tmp.path())
        .assert()
        .success();

    let makefile = fs::read_to_string(tmp.path().join("Makefile")).unwrap();
    assert!(makefile.contains("hello:"));
    assert!(makefile.contains("main.c.o"));
    assert!(makefile.contains("$(CC)"));
    assert!(makefile.contains("$(LD)"));
}

// ============================================================================
// S2: shared lib + dependent binary
// ============================================================================

#[test]
#[ignore] // requires a real C toolchain and make on PATH
fn dependent_binary_links_against_shared_lib() {
    let tmp = temp_dir();
    write_project(
        tmp.path(),
        r#"
[project]
name = "demo"
version = "0.1.0"

[[target]]
name = "foo"
kind = "shared"
files = ["foo.c"]

[[target]]
name = "app"
kind = "binary"
files = ["main.c"]
deps = ["foo"]
"#,
    );
    fs::write(tmp.path().join("foo.c"), "int foo(void) { return 42; }\n").unwrap();
    fs::write(tmp.path().join("main.c"), "int foo(void); int main(void) { return foo(); }\n").unwrap();

    autoforge().arg(tmp.path()).assert().success();

    let makefile = fs::read_to_string(tmp.path().join("Makefile")).unwrap();
    assert!(makefile.contains("-lfoo"));
}

// ============================================================================
// S3: option probing reaches the CLI override path
// ============================================================================

#[test]
#[ignore] // requires a real C toolchain
fn cli_option_override_skips_probing() {
    let tmp = temp_dir();
    write_project(
        tmp.path(),
        r#"
[project]
name = "demo"
version = "0.1.0"

[[option]]
name = "pthread"
links = ["pthread"]
cincludes = ["pthread.h"]
cfuncs = ["pthread_create"]

[[target]]
name = "hello"
kind = "binary"
files = ["main.c"]
"#,
    );
    fs::write(tmp.path().join("main.c"), "int main(void) { return 0; }\n").unwrap();

    autoforge()
        .arg("--pthread=false")
        .arg(tmp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("checking for pthread .. no"));
}

// ============================================================================
// --diagnosis
// ============================================================================

#[test]
#[ignore] // requires a real C toolchain and make on PATH
fn diagnosis_writes_compile_commands_json() {
    let tmp = temp_dir();
    write_project(
        tmp.path(),
        r#"
[project]
name = "hello"
version = "1.0.0"

[[target]]
name = "hello"
kind = "binary"
files = ["main.c"]
"#,
    );
    fs::write(tmp.path().join("main.c"), "int main(void) { return 0; }\n").unwrap();

    autoforge()
        .arg("--diagnosis")
        .arg(tmp.path())
        .assert()
        .success();

    let diag = tmp.path().join("build").join("compile_commands.json");
    assert!(diag.exists());
    let text = fs::read_to_string(diag).unwrap();
    assert!(text.contains("main.c"));
}

// ============================================================================
// --generator=ninja: syntactically accepted, always fatal
// ============================================================================

#[test]
fn ninja_generator_is_rejected() {
    let tmp = temp_dir();
    write_project(
        tmp.path(),
        r#"
[project]
name = "hello"
version = "1.0.0"
"#,
    );

    autoforge()
        .arg("--generator=ninja")
        .arg(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Ninja"));
}

//! The `autoforge` binary: a single flat CLI (no subcommands — this tool has
//! exactly one mode, "configure") wired to [`autoforge::ops::configure`].
//!
//! Project options are data-dependent (they come from whatever the loaded
//! scripts register), so they can't be declared statically on the `Cli`
//! struct. Instead `std::env::args()` is scanned once ahead of clap parsing
//! to pull out every `--<name>=<value>` pair that isn't one of the fixed
//! flags below; those pairs become `ConfigureOptions::option_overrides` and
//! are stripped before the rest is handed to clap.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use autoforge::ops::{configure, ConfigureOptions, Generator};
use autoforge::util::diagnostic::emit_fatal;
use autoforge::util::ConfigureError;

/// The fixed flag surface. Anything starting with `--` that isn't one of
/// these (and carries a `=value`) is a project option override instead.
const KNOWN_FLAGS: &[&str] = &[
    "help",
    "version",
    "verbose",
    "diagnosis",
    "generator",
    "make",
    "ninja",
    "plat",
    "arch",
    "mode",
    "toolchain",
    "prefix",
    "bindir",
    "libdir",
    "includedir",
    "buildir",
];

#[derive(Parser, Debug)]
#[command(name = "autoforge", about = "Configure a C/C++ project and emit a self-contained Makefile")]
struct Cli {
    /// Emit debug-level structured logging.
    #[arg(long)]
    verbose: bool,

    /// Dump a compile_commands.json-style diagnostics file under <buildir>.
    #[arg(long)]
    diagnosis: bool,

    /// Build backend to emit. Only `gmake` actually generates anything.
    #[arg(long, value_enum, default_value = "gmake")]
    generator: Generator,

    /// Path to the `make` binary, if not the first one on PATH.
    #[arg(long)]
    make: Option<String>,

    /// Path to a `ninja` binary. Accepted for CLI compatibility; the Ninja
    /// backend itself is unimplemented and always raises a fatal error.
    #[arg(long)]
    ninja: Option<String>,

    /// Target platform (default: detected from the host).
    #[arg(long)]
    plat: Option<String>,

    /// Target architecture (default: detected from the host).
    #[arg(long)]
    arch: Option<String>,

    /// Build mode.
    #[arg(long, default_value = "release")]
    mode: String,

    /// Force a specific pre-declared toolchain rather than auto-detecting.
    #[arg(long)]
    toolchain: Option<String>,

    #[arg(long)]
    prefix: Option<String>,
    #[arg(long)]
    bindir: Option<String>,
    #[arg(long)]
    libdir: Option<String>,
    #[arg(long)]
    includedir: Option<String>,

    /// Root of the build tree (objects, targets, generated files).
    #[arg(long, default_value = "build")]
    buildir: String,

    /// Project root to configure (default: current directory).
    #[arg(default_value = ".")]
    project_root: String,
}

/// Split raw argv into (clap-visible args, dynamic `--option=value` overrides).
fn split_dynamic_options(args: &[String]) -> (Vec<String>, Vec<(String, String)>) {
    let mut known = Vec::with_capacity(args.len());
    let mut overrides = Vec::new();
    for arg in args {
        if let Some(rest) = arg.strip_prefix("--") {
            if let Some((name, value)) = rest.split_once('=') {
                if !KNOWN_FLAGS.contains(&name) {
                    overrides.push((name.to_string(), value.to_string()));
                    continue;
                }
            }
        }
        known.push(arg.clone());
    }
    (known, overrides)
}

fn main() -> ExitCode {
    let argv: Vec<String> = std::env::args().collect();
    let (known_args, option_overrides) = split_dynamic_options(&argv[1..]);

    let mut parse_args = vec![argv.first().cloned().unwrap_or_else(|| "autoforge".to_string())];
    parse_args.extend(known_args);

    let cli = match Cli::try_parse_from(&parse_args) {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => ExitCode::from(2),
                _ => ExitCode::from(1),
            };
        }
    };

    let default_filter = if cli.verbose { "autoforge=debug" } else { "autoforge=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let opts = ConfigureOptions {
        project_root: cli.project_root.into(),
        generator: cli.generator,
        make: cli.make,
        plat: cli.plat,
        arch: cli.arch,
        mode: cli.mode,
        toolchain: cli.toolchain,
        prefix: cli.prefix,
        bindir: cli.bindir,
        libdir: cli.libdir,
        includedir: cli.includedir,
        buildir: cli.buildir,
        quiet: false,
        diagnosis: cli.diagnosis,
        option_overrides,
    };

    match configure(&opts) {
        Ok(outcome) => {
            tracing::info!(
                project = outcome.project_name.as_deref().unwrap_or("<unnamed>"),
                toolchain = outcome.toolchain_name,
                targets = outcome.target_count,
                makefile = %outcome.makefile_path.display(),
                "configuration complete"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            match err.downcast_ref::<ConfigureError>() {
                Some(configure_err) => emit_fatal(configure_err),
                None => eprintln!("error: {err}"),
            }
            ExitCode::FAILURE
        }
    }
}

//! The single pipeline operation this crate exposes: load scripts, detect a
//! toolchain, probe options, resolve the target graph, render configfiles,
//! and emit a Makefile. One big options struct plus a `Result`-returning
//! function, independent of `clap` — the CLI layer builds a `ConfigureOptions`
//! and hands it here.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::builder::makefile::InstallDirs;
use crate::builder::resolver::ResolveContext;
use crate::builder::{configfile, detect, makefile, prober, resolver};
use crate::core::loader::{Loader, Phase, PlatformContext};
use crate::core::option::{self, ProbeInputs};
use crate::core::project;
use crate::core::store::EntityKind;
use crate::core::target::Target;
use crate::core::toolchain::ToolKind;
use crate::util::config::load_toolchain_overrides;
use crate::util::diagnostic::ConfigureError;
use crate::util::fs::write_string;
use crate::util::process::find_executable;
use crate::util::status::Status;

/// The two backends `--generator` accepts. Ninja parses cleanly (it is not
/// an "unknown flag") but has no emitter; `configure()` raises
/// [`ConfigureError::NinjaUnsupported`] the moment it sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Generator {
    Gmake,
    Ninja,
}

impl FromStr for Generator {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gmake" => Ok(Generator::Gmake),
            "ninja" => Ok(Generator::Ninja),
            _ => Err(()),
        }
    }
}

/// Everything a configure run needs, already resolved from CLI flags (the
/// caller owns clap parsing and the `--<option>=<value>` pre-pass; this
/// struct is clap-free past `Generator` so it stays constructible in tests
/// without building argv).
#[derive(Debug, Clone)]
pub struct ConfigureOptions {
    pub project_root: PathBuf,
    pub generator: Generator,
    pub make: Option<String>,
    pub plat: Option<String>,
    pub arch: Option<String>,
    pub mode: String,
    pub toolchain: Option<String>,
    pub prefix: Option<String>,
    pub bindir: Option<String>,
    pub libdir: Option<String>,
    pub includedir: Option<String>,
    pub buildir: String,
    pub quiet: bool,
    pub diagnosis: bool,
    pub option_overrides: Vec<(String, String)>,
}

impl Default for ConfigureOptions {
    fn default() -> Self {
        ConfigureOptions {
            project_root: PathBuf::from("."),
            generator: Generator::Gmake,
            make: None,
            plat: None,
            arch: None,
            mode: "release".to_string(),
            toolchain: None,
            prefix: None,
            bindir: None,
            libdir: None,
            includedir: None,
            buildir: "build".to_string(),
            quiet: false,
            diagnosis: false,
            option_overrides: Vec::new(),
        }
    }
}

/// Summary of a completed configure run: a human-readable line for the CLI,
/// and something tests can assert against.
#[derive(Debug, Clone)]
pub struct ConfigureOutcome {
    pub project_name: Option<String>,
    pub toolchain_name: String,
    pub target_count: usize,
    pub makefile_path: PathBuf,
    pub configfiles_written: usize,
}

fn host_platform() -> &'static str {
    match std::env::consts::OS {
        "macos" => "macos",
        "windows" => "windows",
        _ => "linux",
    }
}

fn desc_for(kind: ToolKind) -> &'static str {
    match kind {
        ToolKind::Cc => "C compiler",
        ToolKind::Cxx => "C++ compiler",
        ToolKind::As => "assembler",
        ToolKind::Mm => "Objective-C compiler",
        ToolKind::Mxx => "Objective-C++ compiler",
        ToolKind::Ld => "linker",
        ToolKind::Sh => "shared-library linker",
        ToolKind::Ar => "archiver",
    }
}

/// Run the whole load -> detect -> generate pipeline.
pub fn configure(opts: &ConfigureOptions) -> Result<ConfigureOutcome> {
    let status = Status::new(opts.quiet);

    let plat = opts.plat.clone().unwrap_or_else(|| host_platform().to_string());
    let arch = opts.arch.clone().unwrap_or_else(|| std::env::consts::ARCH.to_string());
    status.checking_platform(&plat);
    status.checking_architecture(&arch);
    let is_macos = plat == "macos";
    let is_mingw = plat == "windows";

    if opts.generator == Generator::Ninja {
        return Err(ConfigureError::NinjaUnsupported.into());
    }

    let make_name = opts.make.clone().unwrap_or_else(|| "make".to_string());
    find_executable(&make_name).ok_or(ConfigureError::MakeNotFound)?;

    let platform = PlatformContext {
        plat: plat.clone(),
        arch: arch.clone(),
        mode: opts.mode.clone(),
        toolchain: String::new(),
        host: plat.clone(),
    };
    let mut loader = Loader::new(platform);

    info!(root = %opts.project_root.display(), "loading project scripts");
    project::load_project(&mut loader, &opts.project_root)?;

    for (name, value) in &opts.option_overrides {
        debug!(option = name.as_str(), value = value.as_str(), "applying CLI option override");
        loader.set_config(name, value);
    }

    loader.set_phase(Phase::Detecting);

    let toolchain_overrides = load_toolchain_overrides(&opts.project_root);
    let all_toolchains = detect::builtin_toolchains();
    let candidates: Vec<_> = match &opts.toolchain {
        Some(name) => all_toolchains.into_iter().filter(|t| t.name == name).collect(),
        None => all_toolchains,
    };
    let (toolchain_name, resolved) =
        detect::detect(&candidates, &toolchain_overrides, is_macos, is_mingw, &arch).ok_or(ConfigureError::ToolchainNotFound)?;
    status.checking_toolchain(Some(toolchain_name));
    for kind in detect::REQUIRED_KINDS {
        if let Some((program, _)) = resolved.get(&kind) {
            status.checking_program(desc_for(kind), kind.as_str(), &program.display().to_string());
        }
    }
    detect::promote(&mut loader.store, toolchain_name, &resolved);

    let cc = resolved.get(&ToolKind::Cc);
    let cxx = resolved.get(&ToolKind::Cxx);
    let ld = resolved.get(&ToolKind::Ld);
    for name in loader.store.names(EntityKind::Option) {
        let name = name.to_string();
        if let Some(default) = option::default_value(&loader.store, &name) {
            let enabled = !matches!(default.as_str(), "" | "false" | "0");
            loader.store.set(EntityKind::Option, &name, "value", if enabled { "true" } else { "false" });
            status.checking_option(&name, enabled);
            continue;
        }
        let inputs = ProbeInputs::read(&loader.store, &name);
        let result = if inputs.any_present() {
            prober::probe(
                &inputs,
                cc.map(|(p, _)| p.as_path()),
                cc.map(|(_, n)| *n),
                cxx.map(|(p, _)| p.as_path()),
                cxx.map(|(_, n)| *n),
                ld.map(|(p, _)| p.as_path()),
                ld.map(|(_, n)| *n),
            )?
        } else {
            false
        };
        loader.store.set(EntityKind::Option, &name, "value", if result { "true" } else { "false" });
        status.checking_option(&name, result);
    }

    loader.set_phase(Phase::LoadingTargets);
    project::load_targets(&mut loader, &opts.project_root)?;

    let resolve_ctx = ResolveContext {
        project_root: opts.project_root.clone(),
        buildir: opts.buildir.clone(),
        plat: plat.clone(),
        arch: arch.clone(),
        mode: opts.mode.clone(),
        is_mingw,
        is_macos,
    };
    let targets = resolver::resolve(&loader.store, &resolve_ctx)?;
    info!(count = targets.len(), "resolved targets");

    let mut configfiles_written = 0;
    for target in &targets {
        if target.configfiles.is_empty() {
            continue;
        }
        let what = format!("{} configfiles", target.name);
        status.generating_start(&what);
        let formatted_build = target.version_build.as_deref().map(configfile::format_version_build);
        let vars = configfile::predefined_vars(&plat, is_mingw, target, formatted_build.as_deref());
        for (path, contents) in configfile::render_configfiles(target, &opts.project_root, &vars)? {
            write_string(&path, &contents)?;
            configfiles_written += 1;
        }
        status.generating_done(&what);
    }

    let default_dirs = InstallDirs::default();
    let dirs = InstallDirs {
        prefix: opts.prefix.clone().unwrap_or(default_dirs.prefix),
        bindir: opts.bindir.clone().unwrap_or(default_dirs.bindir),
        libdir: opts.libdir.clone().unwrap_or(default_dirs.libdir),
        includedir: opts.includedir.clone().unwrap_or(default_dirs.includedir),
    };

    status.makefile_start();
    let makefile_text = makefile::generate(&loader.store, &targets, &resolved, &resolve_ctx, &dirs);
    let makefile_path = opts.project_root.join("Makefile");
    write_string(&makefile_path, &makefile_text)?;
    status.makefile_done();

    if opts.diagnosis {
        write_diagnosis(&opts.project_root, &targets, &resolve_ctx)?;
    }

    Ok(ConfigureOutcome {
        project_name: loader.project_name().map(str::to_string),
        toolchain_name: toolchain_name.to_string(),
        target_count: targets.len(),
        makefile_path,
        configfiles_written,
    })
}

/// `--diagnosis`: dump a `compile_commands.json`-shaped array (directory,
/// source file, computed object path, owning target) for editor tooling.
/// Not a literal compiler invocation line — the Makefile already owns
/// that — just enough for an IDE to locate translation units per target.
fn write_diagnosis(project_root: &Path, targets: &[Target], ctx: &ResolveContext) -> Result<()> {
    let ext = resolver::object_extension(ctx);
    let mut entries = Vec::new();
    for target in targets {
        for source in &target.sources {
            entries.push(serde_json::json!({
                "directory": project_root.display().to_string(),
                "file": source.path.display().to_string(),
                "output": resolver::object_path(&target.objectdir, &source.path, ext).display().to_string(),
                "target": target.name.to_string(),
            }));
        }
    }
    let path = project_root.join(&ctx.buildir).join("compile_commands.json");
    let text = serde_json::to_string_pretty(&entries).context("serializing compile_commands.json")?;
    write_string(&path, &text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_project(dir: &Path) {
        std::fs::write(
            dir.join("Autoforge.toml"),
            r#"
[project]
name = "hello"
version = "1.0.0"

[[target]]
name = "hello"
kind = "binary"
files = ["main.c"]
"#,
        )
        .unwrap();
        std::fs::write(dir.join("main.c"), "int main(void) { return 0; }\n").unwrap();
    }

    #[test]
    fn generator_parses_known_values() {
        assert_eq!("gmake".parse(), Ok(Generator::Gmake));
        assert_eq!("ninja".parse(), Ok(Generator::Ninja));
        assert!("bogus".parse::<Generator>().is_err());
    }

    #[test]
    fn default_options_target_gmake_in_release_mode() {
        let opts = ConfigureOptions::default();
        assert_eq!(opts.generator, Generator::Gmake);
        assert_eq!(opts.mode, "release");
        assert_eq!(opts.buildir, "build");
    }

    #[test]
    fn ninja_generator_is_rejected_before_touching_the_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let opts = ConfigureOptions {
            project_root: dir.path().to_path_buf(),
            generator: Generator::Ninja,
            ..ConfigureOptions::default()
        };
        let err = configure(&opts).unwrap_err();
        assert!(err.to_string().contains("Ninja"));
    }

    #[test]
    #[ignore] // requires a real C toolchain and make on PATH
    fn configure_end_to_end_generates_makefile() {
        let dir = tempfile::tempdir().unwrap();
        create_test_project(dir.path());
        let opts = ConfigureOptions {
            project_root: dir.path().to_path_buf(),
            quiet: true,
            ..ConfigureOptions::default()
        };
        let outcome = configure(&opts).unwrap();
        assert_eq!(outcome.project_name.as_deref(), Some("hello"));
        assert_eq!(outcome.target_count, 1);
        assert!(outcome.makefile_path.exists());
    }
}

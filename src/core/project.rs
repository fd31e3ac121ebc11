//! The concrete project-script format: `Autoforge.toml` at the project root,
//! or every `*.autoforge.toml` found two directories deep, parsed with
//! `serde`+`toml` and walked twice against a [`Loader`] — once to register
//! options/toolchains, once more to register targets — realizing §4.2's
//! "same script evaluated twice" with a single parse.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::core::loader::{Loader, Phase, PUBLIC_MARKER};

const ROOT_SCRIPT_NAME: &str = "Autoforge.toml";
const DEPTH2_SUFFIX: &str = ".autoforge.toml";

#[derive(Debug, Deserialize, Default)]
struct ProjectSection {
    name: Option<String>,
    version: Option<String>,
    version_build: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct OptionSection {
    name: String,
    description: Option<String>,
    default: Option<String>,
    showmenu: Option<bool>,
    #[serde(default)]
    cfuncs: Vec<String>,
    #[serde(default)]
    cxxfuncs: Vec<String>,
    #[serde(default)]
    cincludes: Vec<String>,
    #[serde(default)]
    cxxincludes: Vec<String>,
    #[serde(default)]
    ctypes: Vec<String>,
    #[serde(default)]
    cxxtypes: Vec<String>,
    #[serde(default)]
    csnippets: Vec<String>,
    #[serde(default)]
    cxxsnippets: Vec<String>,
    #[serde(default)]
    links: Vec<String>,
    #[serde(default)]
    syslinks: Vec<String>,
    #[serde(default)]
    cflags: Vec<String>,
    #[serde(default)]
    cxxflags: Vec<String>,
    #[serde(default)]
    cxflags: Vec<String>,
    #[serde(default)]
    ldflags: Vec<String>,
    #[serde(default)]
    defines: Vec<String>,
    #[serde(default)]
    udefines: Vec<String>,
    #[serde(default)]
    includedirs: Vec<String>,
    #[serde(default)]
    linkdirs: Vec<String>,
    #[serde(default)]
    languages: Vec<String>,
    #[serde(default)]
    warnings: Vec<String>,
    #[serde(default)]
    optimizes: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ToolchainSection {
    name: String,
    #[serde(default)]
    toolset_as: Vec<String>,
    #[serde(default)]
    toolset_cc: Vec<String>,
    #[serde(default)]
    toolset_cxx: Vec<String>,
    #[serde(default)]
    toolset_mm: Vec<String>,
    #[serde(default)]
    toolset_mxx: Vec<String>,
    #[serde(default)]
    toolset_ld: Vec<String>,
    #[serde(default)]
    toolset_sh: Vec<String>,
    #[serde(default)]
    toolset_ar: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
struct TargetSection {
    name: String,
    kind: Option<String>,
    basename: Option<String>,
    extension: Option<String>,
    prefixname: Option<String>,
    filename: Option<String>,
    targetdir: Option<String>,
    objectdir: Option<String>,
    configdir: Option<String>,
    installdir: Option<String>,
    version: Option<String>,
    version_build: Option<String>,
    strip: Option<String>,
    symbols: Option<String>,
    default: Option<bool>,
    #[serde(default)]
    deps: Vec<String>,
    #[serde(default)]
    options: Vec<String>,
    #[serde(default)]
    files: Vec<String>,
    #[serde(default)]
    headerfiles: Vec<String>,
    #[serde(default)]
    installfiles: Vec<String>,
    #[serde(default)]
    configfiles: Vec<String>,
    #[serde(default)]
    defines: Vec<String>,
    #[serde(default)]
    udefines: Vec<String>,
    #[serde(default)]
    includedirs: Vec<String>,
    #[serde(default)]
    linkdirs: Vec<String>,
    #[serde(default)]
    links: Vec<String>,
    #[serde(default)]
    syslinks: Vec<String>,
    #[serde(default)]
    frameworks: Vec<String>,
    #[serde(default)]
    frameworkdirs: Vec<String>,
    #[serde(default)]
    rpathdirs: Vec<String>,
    #[serde(default)]
    languages: Vec<String>,
    #[serde(default)]
    warnings: Vec<String>,
    #[serde(default)]
    optimizes: Vec<String>,
    #[serde(default)]
    cflags: Vec<String>,
    #[serde(default)]
    cxxflags: Vec<String>,
    #[serde(default)]
    cxflags: Vec<String>,
    #[serde(default)]
    mflags: Vec<String>,
    #[serde(default)]
    mxxflags: Vec<String>,
    #[serde(default)]
    asflags: Vec<String>,
    #[serde(default)]
    ldflags: Vec<String>,
    #[serde(default)]
    shflags: Vec<String>,
    #[serde(default)]
    arflags: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ProjectFile {
    project: Option<ProjectSection>,
    #[serde(default)]
    include: Vec<String>,
    #[serde(default)]
    option: Vec<OptionSection>,
    #[serde(default)]
    toolchain: Vec<ToolchainSection>,
    #[serde(default)]
    target: Vec<TargetSection>,
}

/// One parsed script file plus the directory its relative paths resolve
/// against (its own `scriptdir`).
struct ParsedScript {
    dir: PathBuf,
    file: ProjectFile,
}

/// Find the root-level script, or every depth-2 `*.autoforge.toml` file.
pub fn discover_scripts(project_root: &Path) -> Result<Vec<PathBuf>> {
    let root_script = project_root.join(ROOT_SCRIPT_NAME);
    if root_script.is_file() {
        return Ok(vec![root_script]);
    }
    let mut found = Vec::new();
    let Ok(entries) = std::fs::read_dir(project_root) else { return Ok(found) };
    for entry in entries.flatten() {
        if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }
        let Ok(subentries) = std::fs::read_dir(entry.path()) else { continue };
        for sub in subentries.flatten() {
            let name = sub.file_name();
            let name = name.to_string_lossy();
            if name.ends_with(DEPTH2_SUFFIX) {
                found.push(sub.path());
            }
        }
    }
    found.sort();
    Ok(found)
}

fn parse_file(path: &Path) -> Result<ProjectFile> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading project script {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing project script {}", path.display()))
}

/// Parse one script and every script it (transitively) includes, in
/// depth-first evaluation order, resolving each `include` entry relative to
/// its including script's directory.
fn parse_with_includes(path: &Path, out: &mut Vec<ParsedScript>) -> Result<()> {
    let file = parse_file(path)?;
    let dir = path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
    let includes = file.include.clone();
    out.push(ParsedScript { dir: dir.clone(), file });
    for include in includes {
        let included_path = resolve_include_path(&dir, &include);
        if !included_path.is_file() {
            bail!("included script not found: {}", included_path.display());
        }
        parse_with_includes(&included_path, out)?;
    }
    Ok(())
}

fn resolve_include_path(scriptdir: &Path, include: &str) -> PathBuf {
    let candidate = scriptdir.join(include);
    if candidate.is_file() || include.ends_with(".toml") {
        return candidate;
    }
    // `<dir>/<file>` convention: a bare directory name means "the
    // depth-2-style file inside it", same suffix as top-level discovery.
    scriptdir.join(include).join(format!("{include}{DEPTH2_SUFFIX}"))
}

fn register_options_and_toolchains(loader: &mut Loader, script: &ProjectFile) {
    if let Some(project) = &script.project {
        if let Some(name) = &project.name {
            loader.set_project(name);
        }
        if let Some(version) = &project.version {
            loader.set_version(version, project.version_build.as_deref());
        }
    }
    for opt in &script.option {
        // Use the block form unconditionally (never pass a description into
        // `option()` itself): the TOML format always wants to attach
        // probing-input lists after the call, and a non-empty description
        // there would auto-close the scope before they're added (§4.2's
        // one-line form is for scriptless declarations only).
        loader.option(&opt.name, None, opt.default.as_deref());
        if let Some(desc) = &opt.description {
            loader.set_description(desc);
        }
        if let Some(show) = opt.showmenu {
            loader.set_showmenu(show);
        }
        let lists: [(&str, &[String]); 18] = [
            ("cfuncs", &opt.cfuncs),
            ("cxxfuncs", &opt.cxxfuncs),
            ("cincludes", &opt.cincludes),
            ("cxxincludes", &opt.cxxincludes),
            ("ctypes", &opt.ctypes),
            ("cxxtypes", &opt.cxxtypes),
            ("csnippets", &opt.csnippets),
            ("cxxsnippets", &opt.cxxsnippets),
            ("links", &opt.links),
            ("syslinks", &opt.syslinks),
            ("cflags", &opt.cflags),
            ("cxxflags", &opt.cxxflags),
            ("cxflags", &opt.cxflags),
            ("ldflags", &opt.ldflags),
            ("defines", &opt.defines),
            ("udefines", &opt.udefines),
            ("includedirs", &opt.includedirs),
            ("linkdirs", &opt.linkdirs),
        ];
        for (key, values) in lists {
            let refs: Vec<&str> = values.iter().map(String::as_str).collect();
            loader.add_option_values(key, &refs);
        }
        let more_lists: [(&str, &[String]); 3] = [("languages", &opt.languages), ("warnings", &opt.warnings), ("optimizes", &opt.optimizes)];
        for (key, values) in more_lists {
            let refs: Vec<&str> = values.iter().map(String::as_str).collect();
            loader.add_option_values(key, &refs);
        }
        loader.option_end();
    }
    for tc in &script.toolchain {
        loader.toolchain(&tc.name);
        for (kind, programs) in [
            ("as", &tc.toolset_as),
            ("cc", &tc.toolset_cc),
            ("cxx", &tc.toolset_cxx),
            ("mm", &tc.toolset_mm),
            ("mxx", &tc.toolset_mxx),
            ("ld", &tc.toolset_ld),
            ("sh", &tc.toolset_sh),
            ("ar", &tc.toolset_ar),
        ] {
            if !programs.is_empty() {
                let refs: Vec<&str> = programs.iter().map(String::as_str).collect();
                loader.set_toolset(kind, &refs);
            }
        }
        loader.toolchain_end();
    }
}

fn register_targets(loader: &mut Loader, script: &ProjectFile) {
    for t in &script.target {
        loader.target(&t.name);
        if let Some(kind) = &t.kind {
            loader.set_target_scalar("kind", kind);
        }
        for (key, value) in [
            ("basename", &t.basename),
            ("extension", &t.extension),
            ("prefixname", &t.prefixname),
            ("filename", &t.filename),
            ("targetdir", &t.targetdir),
            ("objectdir", &t.objectdir),
            ("configdir", &t.configdir),
            ("installdir", &t.installdir),
            ("version", &t.version),
            ("version_build", &t.version_build),
            ("strip", &t.strip),
            ("symbols", &t.symbols),
        ] {
            if let Some(v) = value {
                loader.set_target_scalar(key, v);
            }
        }
        if let Some(default) = t.default {
            loader.set_target_bool("default", default);
        }

        let public_capable: [(&str, &[String]); 12] = [
            ("deps", &t.deps),
            ("options", &t.options),
            ("files", &t.files),
            ("headerfiles", &t.headerfiles),
            ("installfiles", &t.installfiles),
            ("configfiles", &t.configfiles),
            ("defines", &t.defines),
            ("udefines", &t.udefines),
            ("includedirs", &t.includedirs),
            ("linkdirs", &t.linkdirs),
            ("links", &t.links),
            ("syslinks", &t.syslinks),
        ];
        for (key, values) in public_capable {
            let refs: Vec<&str> = values.iter().map(String::as_str).collect();
            loader.add_target_values(key, &refs);
        }
        for (key, values) in [("frameworks", &t.frameworks), ("frameworkdirs", &t.frameworkdirs), ("rpathdirs", &t.rpathdirs)] {
            let refs: Vec<&str> = values.iter().map(String::as_str).collect();
            loader.add_target_values(key, &refs);
        }
        for (key, values) in [("languages", &t.languages), ("warnings", &t.warnings), ("optimizes", &t.optimizes)] {
            let refs: Vec<&str> = values.iter().map(String::as_str).collect();
            loader.add_target_flags(key, &refs);
        }
        for (key, values) in [
            ("cflags", &t.cflags),
            ("cxxflags", &t.cxxflags),
            ("cxflags", &t.cxflags),
            ("mflags", &t.mflags),
            ("mxxflags", &t.mxxflags),
            ("asflags", &t.asflags),
            ("ldflags", &t.ldflags),
            ("shflags", &t.shflags),
            ("arflags", &t.arflags),
        ] {
            let refs: Vec<&str> = values.iter().map(String::as_str).collect();
            loader.add_target_flags(key, &refs);
        }
        loader.target_end();
    }
}

/// Parse every reachable script and run both loading passes against
/// `loader`, leaving it in [`Phase::LoadingTargets`] when targets were
/// registered (callers that only need options/toolchains should stop after
/// the first pass and run detection before calling this at all).
pub fn load_project(loader: &mut Loader, project_root: &Path) -> Result<()> {
    let entry_scripts = discover_scripts(project_root)?;
    if entry_scripts.is_empty() {
        bail!("no project script found under {}", project_root.display());
    }

    let mut scripts = Vec::new();
    for entry in &entry_scripts {
        parse_with_includes(entry, &mut scripts)?;
    }

    loader.set_phase(Phase::LoadingOptionsAndToolchains);
    for parsed in &scripts {
        loader.push_scriptdir(parsed.dir.clone());
        register_options_and_toolchains(loader, &parsed.file);
        loader.pop_scriptdir();
    }
    Ok(())
}

/// The second pass: registers every target. Call after toolchain detection
/// has populated the store and the caller has moved the loader into
/// [`Phase::LoadingTargets`].
pub fn load_targets(loader: &mut Loader, project_root: &Path) -> Result<()> {
    let entry_scripts = discover_scripts(project_root)?;
    let mut scripts = Vec::new();
    for entry in &entry_scripts {
        parse_with_includes(entry, &mut scripts)?;
    }
    for parsed in &scripts {
        loader.push_scriptdir(parsed.dir.clone());
        register_targets(loader, &parsed.file);
        loader.pop_scriptdir();
    }
    Ok(())
}

/// Whether a raw TOML array entry is the `{public}` visibility marker —
/// re-exported so the project-file parser and the loader agree on spelling.
pub fn is_public_marker(token: &str) -> bool {
    token == PUBLIC_MARKER
}

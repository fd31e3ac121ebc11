//! The Makefile emitter: linearizes the resolved target graph into a
//! self-contained Makefile (§4.8). Builds the whole document in one
//! in-memory buffer and writes it with a single `fs::write` call — matching
//! §5's resource-discipline language about the output file being opened
//! once, and letting every other stage stay pure and testable.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::builder::flags::{translate, translate_all, TranslateContext};
use crate::builder::resolver::{effective, object_extension, object_path, toolkinds, ResolveContext};
use crate::core::store::{EntityKind, Store};
use crate::core::target::{Target, TargetKind};
use crate::core::toolchain::{ToolKind, ToolName};

/// Install directory names under `--prefix`.
#[derive(Debug, Clone)]
pub struct InstallDirs {
    pub prefix: String,
    pub bindir: String,
    pub libdir: String,
    pub includedir: String,
}

impl Default for InstallDirs {
    fn default() -> Self {
        InstallDirs {
            prefix: "/usr/local".to_string(),
            bindir: "bin".to_string(),
            libdir: "lib".to_string(),
            includedir: "include".to_string(),
        }
    }
}

fn toolkind_flag_var(target: &str, kind: ToolKind) -> String {
    let suffix = match kind {
        ToolKind::Cc => "cflags",
        ToolKind::Cxx => "cxxflags",
        ToolKind::As => "asflags",
        ToolKind::Mm => "mflags",
        ToolKind::Mxx => "mxxflags",
        ToolKind::Ld => "ldflags",
        ToolKind::Sh => "shflags",
        ToolKind::Ar => "arflags",
    };
    format!("{target}_{suffix}")
}

/// The compile-side abstract itemnames translated into `<kind>flags`.
const COMPILE_ITEMS: [&str; 6] = ["languages", "warnings", "optimizes", "defines", "udefines", "includedirs"];
/// The link-side abstract itemnames translated into `ldflags`/`shflags`.
const LINK_ITEMS: [&str; 6] = ["linkdirs", "links", "syslinks", "frameworks", "frameworkdirs", "rpathdirs"];

fn toolname_for(resolved: &HashMap<ToolKind, (PathBuf, ToolName)>, kind: ToolKind) -> ToolName {
    resolved.get(&kind).map(|(_, n)| *n).unwrap_or(ToolName::Gcc)
}

fn compile_flags(store: &Store, target: &Target, kind: ToolKind, resolved: &HashMap<ToolKind, (PathBuf, ToolName)>, is_macos: bool) -> String {
    let toolname = toolname_for(resolved, kind);
    let ctx = TranslateContext { is_macos };
    let mut parts = Vec::new();
    for item in COMPILE_ITEMS {
        let values = effective(store, target, item);
        if let Ok(joined) = translate_all(kind, toolname, item, &values, ctx) {
            if !joined.is_empty() {
                parts.push(joined);
            }
        }
    }
    let raw_key = match kind {
        ToolKind::Cc => "cflags",
        ToolKind::Cxx => "cxxflags",
        ToolKind::As => "asflags",
        ToolKind::Mm => "mflags",
        ToolKind::Mxx => "mxxflags",
        _ => "",
    };
    for key in ["cxflags", raw_key] {
        if key.is_empty() {
            continue;
        }
        let raw = store.get(EntityKind::Target, &target.name, key);
        if let Some(raw) = raw.filter(|s| !s.is_empty()) {
            parts.push(raw);
        }
    }
    parts.join(" ")
}

fn dep_link_flags(store: &Store, target: &Target) -> Vec<String> {
    let mut flags = Vec::new();
    let mut any_shared = false;
    for dep in &target.transitive_deps {
        let kind_str = store.get_raw(EntityKind::Target, dep, "kind").unwrap_or("");
        let Ok(kind) = kind_str.parse::<TargetKind>() else { continue };
        if kind == TargetKind::Shared {
            any_shared = true;
            let targetdir = target.targetdir.display();
            flags.push(format!("-L{targetdir}"));
            flags.push(format!("-l{dep}"));
        }
    }
    if any_shared {
        // Always the gcc/clang spelling; translate_rpathdir below does the
        // one real per-toolname conversion (@loader_path <-> $ORIGIN).
        flags.push("@loader_path/.".to_string());
    }
    flags
}

fn link_flags(store: &Store, target: &Target, kind: ToolKind, resolved: &HashMap<ToolKind, (PathBuf, ToolName)>, is_macos: bool) -> String {
    let toolname = toolname_for(resolved, kind);
    let ctx = TranslateContext { is_macos };
    let mut parts = Vec::new();
    for item in LINK_ITEMS {
        let mut values = effective(store, target, item);
        if item == "rpathdirs" {
            values.extend(dep_link_flags(store, target).into_iter().filter(|v| !v.starts_with("-L") && !v.starts_with("-l")));
        }
        if let Ok(joined) = translate_all(kind, toolname, item, &values, ctx) {
            if !joined.is_empty() {
                parts.push(joined);
            }
        }
    }
    for flag in dep_link_flags(store, target) {
        if flag.starts_with("-L") || flag.starts_with("-l") {
            parts.push(flag);
        }
    }
    // strip/symbols are scalars, not item lists effective() resolves, so
    // they get their own small read here instead of a LINK_ITEMS entry.
    for item in ["symbols", "strip"] {
        if let Some(value) = store.get(EntityKind::Target, &target.name, item).filter(|s| !s.is_empty()) {
            if let Ok(flag) = translate(kind, toolname, item, &value, ctx) {
                if !flag.is_empty() {
                    parts.push(flag);
                }
            }
        }
    }
    let raw_key = if kind == ToolKind::Sh { "shflags" } else { "ldflags" };
    if let Some(raw) = store.get(EntityKind::Target, &target.name, raw_key).filter(|s| !s.is_empty()) {
        parts.push(raw);
    }
    parts.join(" ")
}

fn link_toolkind(kind: TargetKind) -> ToolKind {
    match kind {
        TargetKind::Binary => ToolKind::Ld,
        TargetKind::Static => ToolKind::Ar,
        TargetKind::Shared => ToolKind::Sh,
    }
}

fn header() -> String {
    "# Generated by autoforge. Do not edit by hand.\n\n".to_string()
}

fn verbosity_switch() -> String {
    "ifneq ($(VERBOSE),1)\nV=@\nendif\n\n".to_string()
}

fn toolchain_vars(resolved: &HashMap<ToolKind, (PathBuf, ToolName)>, kinds: &[ToolKind]) -> String {
    let mut out = String::new();
    for kind in kinds {
        if let Some((program, _)) = resolved.get(kind) {
            out.push_str(&format!("{}={}\n", kind.make_var(), program.display()));
        }
    }
    out.push('\n');
    out
}

fn flag_vars(store: &Store, targets: &[Target], resolved: &HashMap<ToolKind, (PathBuf, ToolName)>, is_macos: bool) -> String {
    let mut out = String::new();
    for target in targets {
        for source in &target.sources {
            let var = toolkind_flag_var(&target.name, source.toolkind);
            out.push_str(&format!("{var}={}\n", compile_flags(store, target, source.toolkind, resolved, is_macos)));
        }
        let link_kind = link_toolkind(target.kind);
        let var = toolkind_flag_var(&target.name, link_kind);
        let flags = if link_kind == ToolKind::Ar { String::new() } else { link_flags(store, target, link_kind, resolved, is_macos) };
        out.push_str(&format!("{var}={flags}\n"));
    }
    out.push('\n');
    out
}

fn phony_section(targets: &[Target]) -> String {
    let defaults: Vec<&str> = targets.iter().filter(|t| t.default).map(|t| t.name.as_str()).collect();
    let all: Vec<&str> = targets.iter().map(|t| t.name.as_str()).collect();
    format!(
        ".PHONY: default all run clean install\n\ndefault: {}\n\nall: {}\n\n",
        defaults.join(" "),
        all.join(" ")
    )
}

fn target_rules(store: &Store, target: &Target, resolved: &HashMap<ToolKind, (PathBuf, ToolName)>, ectx: &ResolveContext) -> String {
    let mut out = String::new();
    let target_file = target.target_file();
    out.push_str(&format!("{}: {}\n\n", target.name, target_file.display()));

    let mut prereqs: Vec<String> = Vec::new();
    for dep in &target.deps {
        if let Some(dep_target) = store.get_raw(EntityKind::Target, dep, "kind") {
            if dep_target.parse::<TargetKind>().map(|k| k.is_library()).unwrap_or(false) {
                prereqs.push(format!("{}", target.targetdir.join(dep.as_str()).display()));
            }
        }
    }
    let object_ext = object_extension(ectx);
    let objects: Vec<String> = target.sources.iter().map(|s| object_path(&target.objectdir, &s.path, object_ext).display().to_string()).collect();
    prereqs.extend(objects.clone());

    out.push_str(&format!("{}: {}\n", target_file.display(), prereqs.join(" ")));
    out.push_str(&format!("\t@mkdir -p {}\n", target.targetdir.display()));
    let flags_var = toolkind_flag_var(&target.name, link_toolkind(target.kind));
    match target.kind {
        TargetKind::Static => {
            let ar = resolved.get(&ToolKind::Ar).map(|(p, _)| p.display().to_string()).unwrap_or_else(|| "ar".to_string());
            out.push_str(&format!("\t@echo \"  AR      {}\"\n", target.name));
            out.push_str(&format!("\t$(V){ar} -cr {} {}\n\n", target_file.display(), objects.join(" ")));
        }
        TargetKind::Shared => {
            let var = toolkind_flag_var(&target.name, ToolKind::Sh);
            out.push_str(&format!("\t@echo \"  SH      {}\"\n", target.name));
            out.push_str(&format!("\t$(V)$(SH) -shared -o {} {} $({var})\n\n", target_file.display(), objects.join(" ")));
        }
        TargetKind::Binary => {
            out.push_str(&format!("\t@echo \"  LD      {}\"\n", target.name));
            out.push_str(&format!("\t$(V)$(LD) -o {} {} $({flags_var})\n\n", target_file.display(), objects.join(" ")));
        }
    }

    for source in &target.sources {
        let obj = object_path(&target.objectdir, &source.path, object_ext);
        let compiler_var = source.toolkind.make_var();
        let flags_var = toolkind_flag_var(&target.name, source.toolkind);
        out.push_str(&format!("{}: {}\n", obj.display(), source.path.display()));
        out.push_str(&format!("\t@mkdir -p {}\n", obj.parent().map(|p| p.display().to_string()).unwrap_or_default()));
        let label = match source.toolkind {
            ToolKind::Cc => "CC",
            ToolKind::Cxx => "CXX",
            ToolKind::As => "AS",
            ToolKind::Mm => "CC",
            ToolKind::Mxx => "CXX",
            _ => "CC",
        };
        out.push_str(&format!("\t@echo \"  {label}     {}\"\n", source.path.display()));
        out.push_str(&format!("\t$(V)$({}) -c $({flags_var}) -o {} {}\n\n", compiler_var, obj.display(), source.path.display()));
    }

    out
}

fn run_rule(targets: &[Target]) -> String {
    let binaries: Vec<&Target> = targets.iter().filter(|t| t.default && t.kind == TargetKind::Binary).collect();
    let deps: Vec<&str> = binaries.iter().map(|t| t.name.as_str()).collect();
    let mut out = format!("run: {}\n", deps.join(" "));
    for bin in &binaries {
        out.push_str(&format!("\t{}\n", bin.target_file().display()));
    }
    out.push('\n');
    out
}

fn clean_rule(targets: &[Target]) -> String {
    let defaults: Vec<&Target> = targets.iter().filter(|t| t.default).collect();
    let deps: Vec<&str> = defaults.iter().map(|t| t.name.as_str()).collect();
    let mut out = format!("clean: {}\n", deps.join(" "));
    for target in &defaults {
        out.push_str(&format!("\t@rm -f {}\n", target.target_file().display()));
    }
    for target in targets {
        for source in &target.sources {
            out.push_str(&format!("\t@rm -f {}\n", object_path(&target.objectdir, &source.path, "o").display()));
        }
    }
    out.push('\n');
    out
}

fn install_rule(targets: &[Target], dirs: &InstallDirs) -> String {
    let mut out = String::from("install: all\n");
    for target in targets {
        let bindir = Path::new(&dirs.prefix).join(&dirs.bindir);
        let libdir = Path::new(&dirs.prefix).join(&dirs.libdir);
        let installdir = target.installdir.as_deref().map(PathBuf::from).unwrap_or_else(|| match target.kind {
            TargetKind::Binary => bindir.clone(),
            _ => libdir.clone(),
        });
        out.push_str(&format!("\t@mkdir -p {}\n", installdir.display()));
        out.push_str(&format!("\t@cp {} {}\n", target.target_file().display(), installdir.display()));
        for entry in &target.headerfiles {
            let includedir = Path::new(&dirs.prefix).join(&dirs.includedir);
            let dest = entry.install_path(&includedir.display().to_string());
            out.push_str(&format!("\t@mkdir -p {}\n", dest.parent().map(|p| p.display().to_string()).unwrap_or_default()));
            out.push_str(&format!("\t@cp {} {}\n", entry.src, dest.display()));
        }
        for entry in &target.installfiles {
            let dest = entry.install_path(&dirs.prefix);
            out.push_str(&format!("\t@mkdir -p {}\n", dest.parent().map(|p| p.display().to_string()).unwrap_or_default()));
            out.push_str(&format!("\t@cp {} {}\n", entry.src, dest.display()));
        }
    }
    out.push('\n');
    out
}

/// Assemble the full Makefile text for the resolved target set.
pub fn generate(store: &Store, targets: &[Target], resolved: &HashMap<ToolKind, (PathBuf, ToolName)>, ectx: &ResolveContext, dirs: &InstallDirs) -> String {
    let kinds = toolkinds(store, targets);
    let mut out = String::new();
    out.push_str(&header());
    out.push_str(&verbosity_switch());
    out.push_str(&toolchain_vars(resolved, &kinds));
    out.push_str(&flag_vars(store, targets, resolved, ectx.is_macos));
    out.push_str(&phony_section(targets));
    for target in targets {
        out.push_str(&target_rules(store, target, resolved, ectx));
    }
    out.push_str(&run_rule(targets));
    out.push_str(&clean_rule(targets));
    out.push_str(&install_rule(targets, dirs));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phony_lists_defaults_and_all_targets() {
        let targets = vec![
            Target {
                name: "app".into(),
                kind: TargetKind::Binary,
                filename: "app".into(),
                targetdir: PathBuf::from("build"),
                objectdir: PathBuf::from("build/.objs/app"),
                installdir: None,
                configdir: None,
                deps: vec![],
                options: vec![],
                sources: vec![],
                headerfiles: vec![],
                installfiles: vec![],
                configfiles: vec![],
                version: None,
                version_build: None,
                default: true,
                transitive_deps: vec![],
            },
        ];
        let section = phony_section(&targets);
        assert!(section.contains("default: app"));
        assert!(section.contains("all: app"));
    }

    #[test]
    fn toolkind_flag_var_names_match_spec_suffixes() {
        assert_eq!(toolkind_flag_var("app", ToolKind::Cc), "app_cflags");
        assert_eq!(toolkind_flag_var("app", ToolKind::Ld), "app_ldflags");
        assert_eq!(toolkind_flag_var("app", ToolKind::Ar), "app_arflags");
    }

    fn shared_dep_target() -> Target {
        Target {
            name: "app".into(),
            kind: TargetKind::Binary,
            filename: "app".into(),
            targetdir: PathBuf::from("build"),
            objectdir: PathBuf::from("build/.objs/app"),
            installdir: None,
            configdir: None,
            deps: vec!["foo".into()],
            options: vec![],
            sources: vec![],
            headerfiles: vec![],
            installfiles: vec![],
            configfiles: vec![],
            version: None,
            version_build: None,
            default: true,
            transitive_deps: vec!["foo".into()],
        }
    }

    #[test]
    fn dep_link_flags_always_emits_loader_path_marker() {
        let mut store = Store::new();
        store.declare(EntityKind::Target, "foo");
        store.set(EntityKind::Target, "foo", "kind", "shared");
        let flags = dep_link_flags(&store, &shared_dep_target());
        assert!(flags.contains(&"@loader_path/.".to_string()));
    }

    #[test]
    fn link_flags_escapes_rpath_marker_for_gcc_on_linux() {
        let mut store = Store::new();
        store.declare(EntityKind::Target, "foo");
        store.set(EntityKind::Target, "foo", "kind", "shared");
        let flags = link_flags(&store, &shared_dep_target(), ToolKind::Ld, &HashMap::new(), false);
        // The raw "@loader_path/." marker must never reach the Makefile
        // unescaped: GNU Make would try to expand "$O" as a variable.
        assert!(!flags.contains("@loader_path"));
        assert!(flags.contains("-Wl,-rpath='$$ORIGIN/.'"));
    }

    #[test]
    fn link_flags_uses_xlinker_form_for_clang() {
        let mut store = Store::new();
        store.declare(EntityKind::Target, "foo");
        store.set(EntityKind::Target, "foo", "kind", "shared");
        let mut resolved = HashMap::new();
        resolved.insert(ToolKind::Ld, (PathBuf::from("/usr/bin/clang"), ToolName::Clang));
        let flags = link_flags(&store, &shared_dep_target(), ToolKind::Ld, &resolved, false);
        assert!(flags.contains("-Xlinker -rpath -Xlinker @loader_path/."));
    }

    #[test]
    fn link_flags_reads_strip_and_symbols_scalars() {
        let mut store = Store::new();
        store.declare(EntityKind::Target, "app");
        store.set(EntityKind::Target, "app", "kind", "binary");
        store.set(EntityKind::Target, "app", "symbols", "debug");
        store.set(EntityKind::Target, "app", "strip", "all");
        let target = Target {
            name: "app".into(),
            kind: TargetKind::Binary,
            filename: "app".into(),
            targetdir: PathBuf::from("build"),
            objectdir: PathBuf::from("build/.objs/app"),
            installdir: None,
            configdir: None,
            deps: vec![],
            options: vec![],
            sources: vec![],
            headerfiles: vec![],
            installfiles: vec![],
            configfiles: vec![],
            version: None,
            version_build: None,
            default: true,
            transitive_deps: vec![],
        };
        let flags = link_flags(&store, &target, ToolKind::Ld, &HashMap::new(), false);
        assert!(flags.contains("-g"));
        assert!(flags.contains("-s"));
    }

    #[test]
    fn link_flags_uses_macos_strip_spelling() {
        let mut store = Store::new();
        store.declare(EntityKind::Target, "app");
        store.set(EntityKind::Target, "app", "kind", "binary");
        store.set(EntityKind::Target, "app", "strip", "all");
        let target = Target {
            name: "app".into(),
            kind: TargetKind::Binary,
            filename: "app".into(),
            targetdir: PathBuf::from("build"),
            objectdir: PathBuf::from("build/.objs/app"),
            installdir: None,
            configdir: None,
            deps: vec![],
            options: vec![],
            sources: vec![],
            headerfiles: vec![],
            installfiles: vec![],
            configfiles: vec![],
            version: None,
            version_build: None,
            default: true,
            transitive_deps: vec![],
        };
        let flags = link_flags(&store, &target, ToolKind::Ld, &HashMap::new(), true);
        assert!(flags.contains("-Wl,-x"));
    }
}

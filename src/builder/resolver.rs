//! The target graph resolver: computes file paths, glob-expands sources,
//! closes transitive library dependencies, and propagates public attributes
//! across the dependency graph (§4.6).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::store::{EntityKind, Store, ROOT_SCOPE};
use crate::core::target::{InstallEntry, SourceFile, Target, TargetKind};
use crate::core::toolchain::ToolKind;
use crate::util::fs::glob_files;
use crate::util::InternedString;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("target `{0}` has no kind set")]
    MissingKind(String),
    #[error("target `{0}` depends on undeclared target `{1}`")]
    UndeclaredDep(String, String),
    #[error("unknown source extension in `{0}`")]
    UnknownSourceExtension(String),
    #[error("dependency cycle: {0}")]
    DependencyCycle(String),
}

/// Host/build facts the resolver needs beyond the store itself.
#[derive(Debug, Clone)]
pub struct ResolveContext {
    pub project_root: PathBuf,
    pub buildir: String,
    pub plat: String,
    pub arch: String,
    pub mode: String,
    pub is_mingw: bool,
    pub is_macos: bool,
}

/// Attribute names that have a parallel `_public` variant (§3).
const PUBLIC_CAPABLE: [&str; 7] = ["defines", "udefines", "includedirs", "linkdirs", "links", "syslinks", "frameworks"];

fn infer_sourcekind(path: &Path) -> Option<ToolKind> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("c") => Some(ToolKind::Cc),
        Some("cpp") | Some("cc") | Some("ixx") => Some(ToolKind::Cxx),
        Some("m") => Some(ToolKind::Mm),
        Some("mm") | Some("mxx") => Some(ToolKind::Mxx),
        Some("s") | Some("S") | Some("asm") => Some(ToolKind::As),
        _ => None,
    }
}

/// Compute one target's direct, deduplicated transitive static/shared deps,
/// memoizing on `name` and raising [`ResolveError::DependencyCycle`] on a
/// cycle. `"__none__"` distinguishes "computed, empty" from "uncomputed" in
/// the memo, per §4.6.
fn transitive_deps(
    store: &Store,
    name: InternedString,
    memo: &mut HashMap<InternedString, Vec<InternedString>>,
    stack: &mut Vec<InternedString>,
) -> Result<Vec<InternedString>, ResolveError> {
    if let Some(cached) = memo.get(&name) {
        return Ok(cached.clone());
    }
    if stack.contains(&name) {
        let mut path: Vec<String> = stack.iter().map(|n| n.to_string()).collect();
        path.push(name.to_string());
        return Err(ResolveError::DependencyCycle(path.join(" -> ")));
    }
    stack.push(name);

    let mut ordered = Vec::new();
    for dep in store.get_list(EntityKind::Target, &name, "deps") {
        let dep_name = InternedString::new(&dep);
        if !store.contains(EntityKind::Target, &dep) {
            stack.pop();
            return Err(ResolveError::UndeclaredDep(name.to_string(), dep));
        }
        let kind_str = store.get_raw(EntityKind::Target, &dep, "kind").unwrap_or("");
        if let Ok(kind) = kind_str.parse::<TargetKind>() {
            if kind.is_library() {
                push_dedup(&mut ordered, dep_name);
                for nested in transitive_deps(store, dep_name, memo, stack)? {
                    push_dedup(&mut ordered, nested);
                }
            }
        }
    }

    stack.pop();
    memo.insert(name, ordered.clone());
    Ok(ordered)
}

/// First-occurrence dedup: a name already present (closer to the root)
/// wins, so a later duplicate is skipped rather than moved.
fn push_dedup(list: &mut Vec<InternedString>, name: InternedString) {
    if !list.contains(&name) {
        list.push(name);
    }
}

fn effective_values(store: &Store, name: &str, transitive: &[InternedString], item: &str) -> Vec<String> {
    let mut values = store.get_list(EntityKind::Target, name, item);
    if PUBLIC_CAPABLE.contains(&item) {
        let public_key = format!("{item}_public");
        for dep in transitive {
            values.extend(store.get_list(EntityKind::Target, dep, &public_key));
        }
    }
    values
}

fn target_file_name(store: &Store, name: &str, kind: TargetKind, ctx: &ResolveContext) -> String {
    if let Some(filename) = store.get_raw(EntityKind::Target, name, "filename").filter(|s| !s.is_empty()) {
        return filename.to_string();
    }
    let basename = store.get_raw(EntityKind::Target, name, "basename").unwrap_or(name);
    let prefix = store
        .get_raw(EntityKind::Target, name, "prefixname")
        .map(str::to_string)
        .unwrap_or_else(|| kind.default_prefix(ctx.is_mingw).to_string());
    let ext = store
        .get_raw(EntityKind::Target, name, "extension")
        .map(str::to_string)
        .unwrap_or_else(|| kind.default_extension(ctx.is_mingw, ctx.is_macos).to_string());
    if ext.is_empty() {
        format!("{prefix}{basename}")
    } else {
        format!("{prefix}{basename}.{ext}")
    }
}

pub fn object_extension(ctx: &ResolveContext) -> &'static str {
    if ctx.is_mingw {
        "obj"
    } else {
        "o"
    }
}

/// `<objectdir>/<sourcepath>.<ext>` — each source yields exactly one object
/// file, keyed by its full relative path so same-named sources in different
/// directories don't collide.
pub fn object_path(objectdir: &Path, source: &Path, ext: &str) -> PathBuf {
    objectdir.join(format!("{}.{ext}", source.display()))
}

fn parse_install_list(store: &Store, name: &str, key: &str) -> Vec<InstallEntry> {
    store.get_list(EntityKind::Target, name, key).iter().map(|t| InstallEntry::parse(t)).collect()
}

fn resolve_default_flag(store: &Store, name: &str) -> bool {
    match store.get_raw(EntityKind::Target, name, "default") {
        Some("false") => false,
        _ => true,
    }
}

/// Resolve every declared target into its final, read-only [`Target`] form.
pub fn resolve(store: &Store, ctx: &ResolveContext) -> Result<Vec<Target>, ResolveError> {
    let mut memo = HashMap::new();
    let mut targets = Vec::new();

    for name in store.names(EntityKind::Target) {
        if name.as_str() == ROOT_SCOPE {
            continue;
        }
        let kind_str = store.get_raw(EntityKind::Target, &name, "kind").ok_or_else(|| ResolveError::MissingKind(name.to_string()))?;
        let kind = kind_str.parse::<TargetKind>().map_err(|_| ResolveError::MissingKind(name.to_string()))?;

        for dep in store.get_list(EntityKind::Target, &name, "deps") {
            if !store.contains(EntityKind::Target, &dep) {
                return Err(ResolveError::UndeclaredDep(name.to_string(), dep));
            }
        }

        let mut stack = Vec::new();
        let transitive = transitive_deps(store, name, &mut memo, &mut stack)?;

        let targetdir = PathBuf::from(&ctx.buildir).join(&ctx.plat).join(&ctx.arch).join(&ctx.mode);
        let objectdir = PathBuf::from(&ctx.buildir).join(".objs").join(name.as_str()).join(&ctx.plat).join(&ctx.arch).join(&ctx.mode);
        let filename = target_file_name(store, &name, kind, ctx);

        let patterns = store.get_list(EntityKind::Target, &name, "files");
        let paths = glob_files(&ctx.project_root, &patterns).unwrap_or_default();
        let mut sources = Vec::with_capacity(paths.len());
        for path in paths {
            let toolkind = infer_sourcekind(&path).ok_or_else(|| ResolveError::UnknownSourceExtension(path.display().to_string()))?;
            sources.push(SourceFile { path, toolkind });
        }
        let deps: Vec<InternedString> = store.get_list(EntityKind::Target, &name, "deps").iter().map(|d| InternedString::new(d)).collect();
        let options = store.get_list(EntityKind::Target, &name, "options");
        let headerfiles = parse_install_list(store, &name, "headerfiles");
        let installfiles = parse_install_list(store, &name, "installfiles");
        let configfiles = store.get_list(EntityKind::Target, &name, "configfiles");

        let target = Target {
            name,
            kind,
            filename,
            targetdir,
            objectdir,
            installdir: store.get_raw(EntityKind::Target, &name, "installdir").map(str::to_string),
            configdir: store.get_raw(EntityKind::Target, &name, "configdir").map(str::to_string),
            deps,
            options,
            sources,
            headerfiles,
            installfiles,
            configfiles,
            version: store.get_raw(EntityKind::Target, &name, "version").map(str::to_string),
            version_build: store.get_raw(EntityKind::Target, &name, "version_build").map(str::to_string),
            default: resolve_default_flag(store, &name),
            transitive_deps: transitive,
        };
        targets.push(target);
    }

    Ok(targets)
}

/// Effective (own + propagated-public) values for one target/item pair,
/// exposed separately from [`Target`] since it depends on the full resolved
/// set (every target's `transitive_deps`) rather than on one target alone.
pub fn effective(store: &Store, target: &Target, item: &str) -> Vec<String> {
    effective_values(store, &target.name, &target.transitive_deps, item)
}

/// The union of declared `kind`s and inferred source kinds across every
/// target — the `toolkinds` set that drives Makefile variable emission.
pub fn toolkinds(store: &Store, targets: &[Target]) -> Vec<ToolKind> {
    let mut kinds = Vec::new();
    for name in store.names(EntityKind::Target) {
        if name.as_str() == ROOT_SCOPE {
            continue;
        }
        if let Some(kind_str) = store.get_raw(EntityKind::Target, &name, "kind") {
            if let Ok(kind) = kind_str.parse::<TargetKind>() {
                let tk = match kind {
                    TargetKind::Static => ToolKind::Ar,
                    TargetKind::Shared => ToolKind::Sh,
                    TargetKind::Binary => ToolKind::Ld,
                };
                if !kinds.contains(&tk) {
                    kinds.push(tk);
                }
            }
        }
    }
    for target in targets {
        for source in &target.sources {
            if !kinds.contains(&source.toolkind) {
                kinds.push(source.toolkind);
            }
        }
    }
    kinds.push(ToolKind::Ld);
    kinds.sort();
    kinds.dedup();
    kinds
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ResolveContext {
        ResolveContext {
            project_root: PathBuf::from("/tmp/nonexistent"),
            buildir: "build".to_string(),
            plat: "linux".to_string(),
            arch: "x86_64".to_string(),
            mode: "release".to_string(),
            is_mingw: false,
            is_macos: false,
        }
    }

    #[test]
    fn missing_kind_is_fatal() {
        let mut store = Store::new();
        store.declare(EntityKind::Target, "app");
        let err = resolve(&store, &ctx()).unwrap_err();
        assert!(matches!(err, ResolveError::MissingKind(_)));
    }

    #[test]
    fn undeclared_dep_is_fatal() {
        let mut store = Store::new();
        store.declare(EntityKind::Target, "app");
        store.set(EntityKind::Target, "app", "kind", "binary");
        store.append(EntityKind::Target, "app", "deps", "missing");
        let err = resolve(&store, &ctx()).unwrap_err();
        assert!(matches!(err, ResolveError::UndeclaredDep(_, _)));
    }

    #[test]
    fn dependency_cycle_is_detected() {
        let mut store = Store::new();
        for (n, dep) in [("a", "b"), ("b", "a")] {
            store.declare(EntityKind::Target, n);
            store.set(EntityKind::Target, n, "kind", "static");
            store.append(EntityKind::Target, n, "deps", dep);
        }
        let err = resolve(&store, &ctx()).unwrap_err();
        assert!(matches!(err, ResolveError::DependencyCycle(_)));
    }

    #[test]
    fn transitive_deps_are_deduplicated_first_occurrence() {
        let mut store = Store::new();
        store.declare(EntityKind::Target, "base");
        store.set(EntityKind::Target, "base", "kind", "static");
        store.declare(EntityKind::Target, "mid");
        store.set(EntityKind::Target, "mid", "kind", "static");
        store.append(EntityKind::Target, "mid", "deps", "base");
        store.declare(EntityKind::Target, "app");
        store.set(EntityKind::Target, "app", "kind", "binary");
        store.append(EntityKind::Target, "app", "deps", "mid");
        store.append(EntityKind::Target, "app", "deps", "base");

        let targets = resolve(&store, &ctx()).unwrap();
        let app = targets.iter().find(|t| t.name.as_str() == "app").unwrap();
        let names: Vec<&str> = app.transitive_deps.iter().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["mid", "base"]);
    }

    #[test]
    fn public_includedirs_propagate_to_dependent() {
        let mut store = Store::new();
        store.declare(EntityKind::Target, "lib");
        store.set(EntityKind::Target, "lib", "kind", "shared");
        store.append(EntityKind::Target, "lib", "includedirs_public", "include");
        store.declare(EntityKind::Target, "app");
        store.set(EntityKind::Target, "app", "kind", "binary");
        store.append(EntityKind::Target, "app", "deps", "lib");

        let targets = resolve(&store, &ctx()).unwrap();
        let app = targets.iter().find(|t| t.name.as_str() == "app").unwrap();
        let eff = effective(&store, app, "includedirs");
        assert_eq!(eff, vec!["include".to_string()]);
    }
}

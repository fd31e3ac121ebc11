//! The toolchain detector: enumerates pre-declared toolchains, probes each
//! candidate program per toolset kind, and promotes the first toolchain
//! whose every required kind resolves to a working program.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Result;
use tempfile::TempDir;
use tracing::{debug, info};

use crate::core::store::{EntityKind, Store};
use crate::core::toolchain::{ToolKind, ToolName};
use crate::util::process::{find_executable, ProcessBuilder};

/// One pre-declared toolchain: a name plus an ordered candidate-program
/// list per required toolset kind.
#[derive(Debug, Clone)]
pub struct ToolchainSpec {
    pub name: &'static str,
    pub candidates: HashMap<ToolKind, Vec<&'static str>>,
}

fn spec(name: &'static str, pairs: &[(ToolKind, &[&'static str])]) -> ToolchainSpec {
    ToolchainSpec {
        name,
        candidates: pairs.iter().map(|(k, v)| (*k, v.to_vec())).collect(),
    }
}

/// The required toolset kinds every toolchain must resolve (§4.5).
pub const REQUIRED_KINDS: [ToolKind; 8] = [
    ToolKind::Cc,
    ToolKind::Cxx,
    ToolKind::As,
    ToolKind::Mm,
    ToolKind::Mxx,
    ToolKind::Ld,
    ToolKind::Ar,
    ToolKind::Sh,
];

/// The built-in toolchain catalog.
pub fn builtin_toolchains() -> Vec<ToolchainSpec> {
    vec![
        spec(
            "clang",
            &[
                (ToolKind::Cc, &["clang"]),
                (ToolKind::Cxx, &["clang++"]),
                (ToolKind::As, &["clang"]),
                (ToolKind::Mm, &["clang"]),
                (ToolKind::Mxx, &["clang++"]),
                (ToolKind::Ld, &["clang"]),
                (ToolKind::Sh, &["clang"]),
                (ToolKind::Ar, &["ar", "llvm-ar"]),
            ],
        ),
        spec(
            "gcc",
            &[
                (ToolKind::Cc, &["gcc", "cc"]),
                (ToolKind::Cxx, &["g++", "c++"]),
                (ToolKind::As, &["gcc"]),
                (ToolKind::Mm, &["gcc"]),
                (ToolKind::Mxx, &["g++"]),
                (ToolKind::Ld, &["gcc"]),
                (ToolKind::Sh, &["gcc"]),
                (ToolKind::Ar, &["ar"]),
            ],
        ),
        spec(
            "x86_64_w64_mingw32",
            &[
                (ToolKind::Cc, &["x86_64-w64-mingw32-gcc"]),
                (ToolKind::Cxx, &["x86_64-w64-mingw32-g++"]),
                (ToolKind::As, &["x86_64-w64-mingw32-gcc"]),
                (ToolKind::Mm, &["x86_64-w64-mingw32-gcc"]),
                (ToolKind::Mxx, &["x86_64-w64-mingw32-g++"]),
                (ToolKind::Ld, &["x86_64-w64-mingw32-gcc"]),
                (ToolKind::Sh, &["x86_64-w64-mingw32-gcc"]),
                (ToolKind::Ar, &["x86_64-w64-mingw32-ar"]),
            ],
        ),
        spec(
            "i686_w64_mingw32",
            &[
                (ToolKind::Cc, &["i686-w64-mingw32-gcc"]),
                (ToolKind::Cxx, &["i686-w64-mingw32-g++"]),
                (ToolKind::As, &["i686-w64-mingw32-gcc"]),
                (ToolKind::Mm, &["i686-w64-mingw32-gcc"]),
                (ToolKind::Mxx, &["i686-w64-mingw32-g++"]),
                (ToolKind::Ld, &["i686-w64-mingw32-gcc"]),
                (ToolKind::Sh, &["i686-w64-mingw32-gcc"]),
                (ToolKind::Ar, &["i686-w64-mingw32-ar"]),
            ],
        ),
        spec(
            "envs",
            &[
                (ToolKind::Cc, &["$CC"]),
                (ToolKind::Cxx, &["$CXX"]),
                (ToolKind::As, &["$AS"]),
                (ToolKind::Mm, &["$CC"]),
                (ToolKind::Mxx, &["$CXX"]),
                (ToolKind::Ld, &["$LD"]),
                (ToolKind::Sh, &["$CC"]),
                (ToolKind::Ar, &["$AR"]),
            ],
        ),
    ]
}

/// Resolve a candidate token: `$VAR` reads the named environment variable
/// (the `envs` toolchain), anything else is a literal program name.
fn resolve_candidate(token: &str) -> Option<String> {
    if let Some(var) = token.strip_prefix('$') {
        std::env::var(var).ok().filter(|v| !v.is_empty())
    } else {
        Some(token.to_string())
    }
}

/// Platform-defaulted try order (§4.5): macOS prefers clang, else gcc first;
/// mingw forces the arch-matched mingw toolchain; everything else keeps the
/// catalog order.
pub fn try_order(toolchains: &[ToolchainSpec], is_macos: bool, is_mingw: bool, arch: &str) -> Vec<usize> {
    if is_mingw {
        let wanted = if arch == "i686" { "i686_w64_mingw32" } else { "x86_64_w64_mingw32" };
        return toolchains.iter().position(|t| t.name == wanted).into_iter().collect();
    }
    let mut order: Vec<usize> = (0..toolchains.len()).collect();
    if is_macos {
        order.sort_by_key(|&i| if toolchains[i].name == "clang" { 0 } else if toolchains[i].name == "gcc" { 1 } else { 2 });
    } else {
        order.sort_by_key(|&i| if toolchains[i].name == "gcc" { 0 } else if toolchains[i].name == "clang" { 1 } else { 2 });
    }
    order
}

/// Probe one candidate program, caching nothing across calls (callers that
/// iterate many candidates of the same toolname may wish to cache; §4.5
/// notes this as a possible optimization but it's not required for
/// correctness).
fn probe_program(program: &str, kind: ToolKind) -> bool {
    let Some(path) = find_executable(program) else { return false };
    match kind {
        ToolKind::Ar => probe_ar(&path),
        _ => ProcessBuilder::new(&path).arg("--version").status().map(|s| s.success()).unwrap_or(false),
    }
}

fn probe_ar(path: &std::path::Path) -> bool {
    let Ok(dir) = TempDir::new() else { return false };
    let obj = dir.path().join("empty.o");
    if std::fs::write(&obj, []).is_err() {
        return false;
    }
    let lib = dir.path().join("lib.a");
    let ok = ProcessBuilder::new(path)
        .arg("-cr")
        .arg(&lib)
        .arg(&obj)
        .status()
        .map(|s| s.success())
        .unwrap_or(false);
    let _ = std::fs::remove_file(&obj);
    let _ = std::fs::remove_file(&lib);
    ok
}

/// Program-name overrides read from `.autoforge/toolchain.toml`, consulted
/// ahead of the built-in candidate list for each toolset kind.
#[derive(Debug, Clone, Default)]
pub struct ToolchainOverrides {
    pub programs: HashMap<ToolKind, Vec<String>>,
}

fn candidate_list<'a>(spec: &'a ToolchainSpec, kind: ToolKind, overrides: &'a ToolchainOverrides) -> Vec<String> {
    let mut list: Vec<String> = overrides.programs.get(&kind).cloned().unwrap_or_default();
    if let Some(builtin) = spec.candidates.get(&kind) {
        list.extend(builtin.iter().map(|s| s.to_string()));
    }
    list
}

/// Try every candidate toolchain in platform order, promoting the first one
/// whose every required kind resolves. Returns the resolved program path
/// per toolkind on success.
pub fn detect(
    toolchains: &[ToolchainSpec],
    overrides: &ToolchainOverrides,
    is_macos: bool,
    is_mingw: bool,
    arch: &str,
) -> Option<(&'static str, HashMap<ToolKind, (PathBuf, ToolName)>)> {
    for idx in try_order(toolchains, is_macos, is_mingw, arch) {
        let spec = &toolchains[idx];
        info!(toolchain = spec.name, "checking for toolchain");
        let mut resolved = HashMap::new();
        let mut ok = true;
        for kind in REQUIRED_KINDS {
            let mut found = None;
            for token in candidate_list(spec, kind, overrides) {
                let Some(program) = resolve_candidate(&token) else { continue };
                debug!(program, ?kind, "probing candidate");
                if probe_program(&program, kind) {
                    let path = find_executable(&program).unwrap_or_else(|| PathBuf::from(&program));
                    let basename = path.file_name().and_then(|n| n.to_str()).unwrap_or(&program);
                    let toolname = ToolName::infer(basename).unwrap_or(ToolName::Gcc);
                    found = Some((path, toolname));
                    break;
                }
            }
            match found {
                Some(hit) => {
                    resolved.insert(kind, hit);
                }
                None => {
                    ok = false;
                    break;
                }
            }
        }
        if ok {
            return Some((spec.name, resolved));
        }
    }
    None
}

/// Promote a detected toolchain's resolved programs into the store's
/// `Toolchain` entity, collapsing each `toolset_k` to the single winner.
pub fn promote(store: &mut Store, name: &str, resolved: &HashMap<ToolKind, (PathBuf, ToolName)>) {
    store.declare(EntityKind::Toolchain, name);
    store.set(EntityKind::Toolchain, name, "name", name);
    for kind in REQUIRED_KINDS {
        if let Some((path, _)) = resolved.get(&kind) {
            store.set(EntityKind::Toolchain, name, &kind.toolset_key(), path.display().to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_order_prefers_clang_on_macos() {
        let toolchains = builtin_toolchains();
        let order = try_order(&toolchains, true, false, "x86_64");
        assert_eq!(toolchains[order[0]].name, "clang");
    }

    #[test]
    fn try_order_prefers_gcc_elsewhere() {
        let toolchains = builtin_toolchains();
        let order = try_order(&toolchains, false, false, "x86_64");
        assert_eq!(toolchains[order[0]].name, "gcc");
    }

    #[test]
    fn mingw_forces_arch_matched_toolchain() {
        let toolchains = builtin_toolchains();
        let order = try_order(&toolchains, false, true, "i686");
        assert_eq!(toolchains[order[0]].name, "i686_w64_mingw32");
        let order64 = try_order(&toolchains, false, true, "x86_64");
        assert_eq!(toolchains[order64[0]].name, "x86_64_w64_mingw32");
    }

    #[test]
    fn overrides_are_tried_before_builtins() {
        let toolchains = builtin_toolchains();
        let gcc = toolchains.iter().find(|t| t.name == "gcc").unwrap();
        let mut overrides = ToolchainOverrides::default();
        overrides.programs.insert(ToolKind::Cc, vec!["my-gcc".to_string()]);
        let list = candidate_list(gcc, ToolKind::Cc, &overrides);
        assert_eq!(list[0], "my-gcc");
        assert!(list.contains(&"gcc".to_string()));
    }

    #[test]
    fn env_candidate_reads_variable() {
        std::env::set_var("AUTOFORGE_TEST_CC_VAR", "env-gcc");
        assert_eq!(resolve_candidate("$AUTOFORGE_TEST_CC_VAR"), Some("env-gcc".to_string()));
        std::env::remove_var("AUTOFORGE_TEST_CC_VAR");
    }
}

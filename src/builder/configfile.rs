//! The configfile templater: `${VAR}`/`${define VAR}` substitution over a
//! target's `configfiles`, including git metadata and version fields.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;
use std::sync::LazyLock;

use crate::core::target::Target;
use crate::util::process::{find_executable, ProcessBuilder};

static VAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\{([A-Za-z0-9_]+)\}").unwrap());
static DEFINE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\{define ([A-Za-z0-9_]+)\}").unwrap());

/// Days-since-epoch to (year, month, day), Howard Hinnant's `civil_from_days`.
/// Avoids pulling in a date/time crate for the handful of strftime-style
/// tokens `version_build` patterns actually use.
fn civil_from_days(z: i64) -> (i64, u32, u32) {
    let z = z + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = (z - era * 146097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    let y = if m <= 2 { y + 1 } else { y };
    (y, m, d)
}

/// Format `SystemTime::now()` against a small strftime subset: `%Y %m %d
/// %H %M %S`, plus `%%` for a literal percent. Anything else passes through
/// verbatim, matching §4.2's "date format pattern" language loosely enough
/// to cover the common cases without adopting a full format-description DSL.
pub fn format_version_build(pattern: &str) -> String {
    let now = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap_or_default();
    let secs = now.as_secs() as i64;
    let days = secs.div_euclid(86400);
    let secs_of_day = secs.rem_euclid(86400);
    let (year, month, day) = civil_from_days(days);
    let hour = secs_of_day / 3600;
    let minute = (secs_of_day % 3600) / 60;
    let second = secs_of_day % 60;

    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('Y') => out.push_str(&format!("{year:04}")),
            Some('m') => out.push_str(&format!("{month:02}")),
            Some('d') => out.push_str(&format!("{day:02}")),
            Some('H') => out.push_str(&format!("{hour:02}")),
            Some('M') => out.push_str(&format!("{minute:02}")),
            Some('S') => out.push_str(&format!("{second:02}")),
            Some('%') => out.push('%'),
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }
    out
}

/// Predefined and git-derived substitution variables for one target.
#[derive(Debug, Clone, Default)]
pub struct TemplateVars {
    vars: std::collections::HashMap<String, String>,
}

impl TemplateVars {
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(|s| s.as_str())
    }
}

/// Build the predefined-variable set for one target: `OS`, `VERSION*`, and
/// (only if `now` is supplied, i.e. `version_build` is set) `VERSION_BUILD`.
pub fn predefined_vars(plat: &str, is_mingw: bool, target: &Target, version_build_formatted: Option<&str>) -> TemplateVars {
    let mut vars = TemplateVars::default();
    let os = if is_mingw { "WINDOWS".to_string() } else { plat.to_uppercase() };
    vars.insert("OS", os);
    if let Some(version) = &target.version {
        vars.insert("VERSION", version.clone());
        let mut parts = version.splitn(3, '.');
        vars.insert("VERSION_MAJOR", parts.next().unwrap_or("0").to_string());
        vars.insert("VERSION_MINOR", parts.next().unwrap_or("0").to_string());
        vars.insert("VERSION_ALTER", parts.next().unwrap_or("0").to_string());
    }
    if let Some(build) = version_build_formatted {
        vars.insert("VERSION_BUILD", build.to_string());
    }
    vars
}

/// Query git metadata via the `git` CLI (not the `git2` crate: the five
/// read-only queries below are all this needs, and shelling out keeps the
/// dependency footprint aligned with what's actually used elsewhere).
/// Returns an empty set, not an error, when git or the repository is absent
/// (§4.7: "missing git is tolerated").
pub fn git_vars(repo_dir: &Path) -> TemplateVars {
    let mut vars = TemplateVars::default();
    let Some(git) = find_executable("git") else { return vars };

    let queries: [(&str, &[&str]); 5] = [
        ("GIT_DESCRIBE", &["describe", "--tags"]),
        ("GIT_DESCRIBE_LONG", &["describe", "--tags", "--long"]),
        ("GIT_BRANCH", &["rev-parse", "--abbrev-ref", "HEAD"]),
        ("GIT_COMMIT_SHORT", &["rev-parse", "--short", "HEAD"]),
        ("GIT_COMMIT", &["rev-parse", "HEAD"]),
    ];
    for (key, args) in queries {
        if let Ok(output) = ProcessBuilder::new(&git).args(args).cwd(repo_dir).exec() {
            if output.status.success() {
                let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !text.is_empty() {
                    vars.insert(key, text);
                }
            }
        }
    }
    if let Ok(output) = ProcessBuilder::new(&git).args(["log", "-1", "--format=%cI"]).cwd(repo_dir).exec() {
        if output.status.success() {
            let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !text.is_empty() {
                vars.insert("GIT_COMMIT_DATE", text);
            }
        }
    }
    vars
}

/// Whether `contents` references any `GIT_` variable — the templater only
/// bothers shelling out to git when a template actually asks for one.
pub fn wants_git_vars(contents: &str) -> bool {
    contents.contains("${GIT_")
}

/// Render `${define VAR}` given the variable's resolved value (or its
/// absence): `/* #undef VAR */` when unset/empty, `#define VAR 1` for
/// `1`/`true`, `/* #define VAR 0 */` for `0`/`false`, else `#define VAR <value>`.
fn render_define(name: &str, value: Option<&str>) -> String {
    match value {
        None | Some("") => format!("/* #undef {name} */"),
        Some("1") | Some("true") => format!("#define {name} 1"),
        Some("0") | Some("false") => format!("/* #define {name} 0 */"),
        Some(v) => format!("#define {name} {v}"),
    }
}

/// Substitute `${VAR}` and `${define VAR}` in `contents` against `vars`.
/// Unresolved `${VAR}` tokens are left untouched (only `${define ...}` has a
/// fallback rendering); a final sweep elsewhere converts any surviving
/// `${define X}` to `/* #undef X */`.
pub fn substitute(contents: &str, vars: &TemplateVars) -> String {
    let after_defines = DEFINE_RE.replace_all(contents, |caps: &regex::Captures| {
        let name = &caps[1];
        render_define(name, vars.get(name))
    });
    VAR_RE
        .replace_all(&after_defines, |caps: &regex::Captures| {
            let name = &caps[1];
            vars.get(name).map(str::to_string).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Final sweep: replace any `${define X}` left over from a pattern that
/// substitute() missed (none should remain after one call, but this keeps
/// the contract explicit per §4.7's closing paragraph).
pub fn final_sweep(contents: &str) -> String {
    DEFINE_RE.replace_all(contents, |caps: &regex::Captures| format!("/* #undef {} */", &caps[1])).into_owned()
}

/// Render one target's configfiles, returning `(output_path, contents)`
/// pairs ready to be written.
pub fn render_configfiles(target: &Target, project_root: &Path, vars: &TemplateVars) -> Result<Vec<(PathBuf, String)>> {
    let mut outputs = Vec::new();
    for relative in &target.configfiles {
        let input_path = project_root.join(relative);
        let contents = std::fs::read_to_string(&input_path).with_context(|| format!("reading configfile template {}", input_path.display()))?;

        let mut local_vars = vars.clone();
        if wants_git_vars(&contents) {
            for (k, v) in git_vars(project_root).vars {
                local_vars.insert(k, v);
            }
        }

        let rendered = final_sweep(&substitute(&contents, &local_vars));
        let output_dir = target.configdir.as_deref().map(PathBuf::from).unwrap_or_else(|| input_path.parent().map(PathBuf::from).unwrap_or_default());
        let file_name = input_path.file_name().map(PathBuf::from).unwrap_or_default();
        outputs.push((output_dir.join(file_name), rendered));
    }
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_var_substitutes() {
        let mut vars = TemplateVars::default();
        vars.insert("VERSION", "1.2.3");
        assert_eq!(substitute("v=${VERSION}", &vars), "v=1.2.3");
    }

    #[test]
    fn define_true_emits_define_1() {
        let mut vars = TemplateVars::default();
        vars.insert("HAS_PTHREAD", "1");
        assert_eq!(substitute("${define HAS_PTHREAD}", &vars), "#define HAS_PTHREAD 1");
    }

    #[test]
    fn define_false_is_commented_out() {
        let mut vars = TemplateVars::default();
        vars.insert("HAS_X", "0");
        assert_eq!(substitute("${define HAS_X}", &vars), "/* #define HAS_X 0 */");
    }

    #[test]
    fn define_unset_becomes_undef() {
        let vars = TemplateVars::default();
        assert_eq!(substitute("${define UNSET}", &vars), "/* #undef UNSET */");
    }

    #[test]
    fn unresolved_plain_var_left_untouched() {
        let vars = TemplateVars::default();
        assert_eq!(substitute("${MYSTERY}", &vars), "${MYSTERY}");
    }

    #[test]
    fn final_sweep_mops_up_remaining_defines() {
        assert_eq!(final_sweep("${define LEFTOVER}"), "/* #undef LEFTOVER */");
    }

    #[test]
    fn substitution_is_deterministic() {
        let mut vars = TemplateVars::default();
        vars.insert("VERSION_MAJOR", "1");
        let input = "${VERSION_MAJOR}.${define HAS_X}";
        assert_eq!(substitute(input, &vars), substitute(input, &vars));
    }

    #[test]
    fn version_build_format_produces_eight_digit_date() {
        let formatted = format_version_build("%Y%m%d");
        assert_eq!(formatted.len(), 8);
        assert!(formatted.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn version_build_format_passes_through_unknown_specifiers() {
        assert_eq!(format_version_build("build-%Q"), "build-%Q");
    }
}

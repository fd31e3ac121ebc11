//! The flag translator: `(toolkind, toolname, itemname, value) -> flag`.
//!
//! Pure, total (modulo the two fatal cases below), and oblivious to the
//! store — every other component hands this function scalars and gets a
//! flag string back. Closed enums replace the source's string dispatch
//! (§9), so "unknown toolname" is unreachable past the parse boundary and
//! "unknown itemname" is the only runtime raise left.

use thiserror::Error;

use crate::core::target::{looks_like_cxx_value, CStandard, CppStandard};
use crate::core::toolchain::{ToolKind, ToolName};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlagError {
    #[error("unknown itemname `{0}`")]
    UnknownItemName(String),
    #[error("unknown language value `{0}`")]
    UnknownLanguageValue(String),
}

/// Host facts the translator needs beyond the four named arguments: whether
/// the target platform is macOS (affects `strip`) and mingw (affects
/// `rpathdirs`' `@loader_path`/`$ORIGIN` substitution, which otherwise only
/// depends on toolname).
#[derive(Debug, Clone, Copy, Default)]
pub struct TranslateContext {
    pub is_macos: bool,
}

/// Escape double quotes in a `-D`/`-U` value the way the source's
/// C-snippet emitter does, so `defines` containing `"` round-trip.
fn escape_define(value: &str) -> String {
    value.replace('"', "\\\"")
}

pub fn translate(
    toolkind: ToolKind,
    toolname: ToolName,
    itemname: &str,
    value: &str,
    ctx: TranslateContext,
) -> Result<String, FlagError> {
    let flag = match itemname {
        "defines" => format!("-D{}", escape_define(value)),
        "udefines" => format!("-U{value}"),
        "includedirs" => format!("-I{value}"),
        "linkdirs" => format!("-L{value}"),
        "links" | "syslinks" => format!("-l{value}"),
        "frameworks" => format!("-framework {value}"),
        "frameworkdirs" => format!("-F{value}"),
        "rpathdirs" => translate_rpathdir(toolname, value),
        "symbols" => match value {
            "debug" => "-g".to_string(),
            "hidden" => "-fvisibility=hidden".to_string(),
            _ => String::new(),
        },
        "strip" => match value {
            "debug" => {
                if ctx.is_macos {
                    "-Wl,-S".to_string()
                } else {
                    "-s".to_string()
                }
            }
            "all" => {
                if ctx.is_macos {
                    "-Wl,-x".to_string()
                } else {
                    "-s".to_string()
                }
            }
            _ => String::new(),
        },
        "warnings" => match value {
            "all" | "more" | "less" => "-Wall".to_string(),
            "allextra" | "everything" => "-Wall -Wextra".to_string(),
            "error" => "-Werror".to_string(),
            "none" => "-w".to_string(),
            _ => String::new(),
        },
        "optimizes" => translate_optimize(toolname, value),
        "languages" => return translate_languages(toolkind, value),
        other => return Err(FlagError::UnknownItemName(other.to_string())),
    };
    Ok(flag)
}

fn translate_rpathdir(toolname: ToolName, value: &str) -> String {
    if toolname.is_clang() {
        let rewritten = value.replace("$ORIGIN", "@loader_path");
        format!("-Xlinker -rpath -Xlinker {rewritten}")
    } else {
        let rewritten = value.replace("@loader_path", "$$ORIGIN");
        format!("-Wl,-rpath='{rewritten}'")
    }
}

fn translate_optimize(toolname: ToolName, value: &str) -> String {
    match value {
        "fast" => "-O1".to_string(),
        "faster" => "-O2".to_string(),
        "fastest" => "-O3".to_string(),
        "smallest" => {
            if toolname.is_clang() {
                "-Oz".to_string()
            } else {
                "-Os".to_string()
            }
        }
        "aggressive" => "-Ofast".to_string(),
        "none" => "-O0".to_string(),
        _ => String::new(),
    }
}

fn translate_languages(toolkind: ToolKind, value: &str) -> Result<String, FlagError> {
    match toolkind {
        ToolKind::Cc | ToolKind::Mm => match value.parse::<CStandard>() {
            Ok(std) => Ok(std.as_flag().to_string()),
            Err(()) if looks_like_cxx_value(value) => Err(FlagError::UnknownLanguageValue(value.to_string())),
            Err(()) => Ok(String::new()),
        },
        ToolKind::Cxx | ToolKind::Mxx => match value.parse::<CppStandard>() {
            Ok(std) => Ok(std.as_flag().to_string()),
            Err(()) => Err(FlagError::UnknownLanguageValue(value.to_string())),
        },
        _ => Ok(String::new()),
    }
}

/// Batch form: translate every token in `values`, joining non-empty results
/// with a single space, propagating the first fatal error encountered.
pub fn translate_all(
    toolkind: ToolKind,
    toolname: ToolName,
    itemname: &str,
    values: &[String],
    ctx: TranslateContext,
) -> Result<String, FlagError> {
    let mut parts = Vec::with_capacity(values.len());
    for value in values {
        let flag = translate(toolkind, toolname, itemname, value, ctx)?;
        if !flag.is_empty() {
            parts.push(flag);
        }
    }
    Ok(parts.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defines_escapes_quotes() {
        let flag = translate(ToolKind::Cc, ToolName::Gcc, "defines", "NAME=\"x\"", TranslateContext::default()).unwrap();
        assert_eq!(flag, "-DNAME=\\\"x\\\"");
    }

    #[test]
    fn unknown_itemname_is_fatal() {
        let err = translate(ToolKind::Cc, ToolName::Gcc, "bogus", "x", TranslateContext::default()).unwrap_err();
        assert_eq!(err, FlagError::UnknownItemName("bogus".into()));
    }

    #[test]
    fn unknown_c_language_value_is_silently_skipped() {
        let flag = translate(ToolKind::Cc, ToolName::Gcc, "languages", "weird99", TranslateContext::default()).unwrap();
        assert_eq!(flag, "");
    }

    #[test]
    fn unrecognized_cxx_looking_c_language_value_is_fatal() {
        let err = translate(ToolKind::Cc, ToolName::Gcc, "languages", "c++99", TranslateContext::default()).unwrap_err();
        assert_eq!(err, FlagError::UnknownLanguageValue("c++99".into()));
    }

    #[test]
    fn unrecognized_cxx_language_value_is_always_fatal() {
        let err = translate(ToolKind::Cxx, ToolName::Gxx, "languages", "c++99", TranslateContext::default()).unwrap_err();
        assert_eq!(err, FlagError::UnknownLanguageValue("c++99".into()));
    }

    #[test]
    fn cxx17_maps_to_std_flag() {
        let flag = translate(ToolKind::Cxx, ToolName::Gxx, "languages", "c++17", TranslateContext::default()).unwrap();
        assert_eq!(flag, "-std=c++17");
    }

    #[test]
    fn rpathdir_rewrites_origin_marker_per_toolname() {
        let gcc = translate_rpathdir(ToolName::Gcc, "@loader_path/.");
        assert_eq!(gcc, "-Wl,-rpath='$$ORIGIN/.'");
        let clang = translate_rpathdir(ToolName::Clang, "$ORIGIN/.");
        assert_eq!(clang, "-Xlinker -rpath -Xlinker @loader_path/.");
    }

    #[test]
    fn optimize_smallest_differs_for_clang() {
        assert_eq!(translate_optimize(ToolName::Gcc, "smallest"), "-Os");
        assert_eq!(translate_optimize(ToolName::Clang, "smallest"), "-Oz");
    }

    #[test]
    fn strip_all_uses_wl_x_on_macos() {
        let flag = translate(ToolKind::Ld, ToolName::Gcc, "strip", "all", TranslateContext { is_macos: true }).unwrap();
        assert_eq!(flag, "-Wl,-x");
    }

    #[test]
    fn translate_all_joins_and_skips_empties() {
        let values = vec!["warn1".to_string(), "error".to_string()];
        let joined = translate_all(ToolKind::Cc, ToolName::Gcc, "warnings", &values, TranslateContext::default()).unwrap();
        assert_eq!(joined, "-Werror");
    }
}

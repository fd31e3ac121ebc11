//! Toolset/toolchain vocabulary shared by the detector, translator, prober,
//! and Makefile emitter.

use std::fmt;
use std::str::FromStr;

/// A role in the compile/link pipeline. Called "toolkind" throughout the spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ToolKind {
    As,
    Cc,
    Cxx,
    Mm,
    Mxx,
    Ld,
    Sh,
    Ar,
}

impl ToolKind {
    pub const ALL: [ToolKind; 8] = [
        ToolKind::As,
        ToolKind::Cc,
        ToolKind::Cxx,
        ToolKind::Mm,
        ToolKind::Mxx,
        ToolKind::Ld,
        ToolKind::Sh,
        ToolKind::Ar,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::As => "as",
            ToolKind::Cc => "cc",
            ToolKind::Cxx => "cxx",
            ToolKind::Mm => "mm",
            ToolKind::Mxx => "mxx",
            ToolKind::Ld => "ld",
            ToolKind::Sh => "sh",
            ToolKind::Ar => "ar",
        }
    }

    /// The attribute name used to store the resolved/candidate program(s)
    /// for this toolkind on a `Toolchain` entity: `toolset_<k>`.
    pub fn toolset_key(&self) -> String {
        format!("toolset_{}", self.as_str())
    }

    /// The Makefile variable name for this toolkind's program, e.g. `CC`.
    pub fn make_var(&self) -> &'static str {
        match self {
            ToolKind::As => "AS",
            ToolKind::Cc => "CC",
            ToolKind::Cxx => "CXX",
            ToolKind::Mm => "MM",
            ToolKind::Mxx => "MXX",
            ToolKind::Ld => "LD",
            ToolKind::Sh => "SH",
            ToolKind::Ar => "AR",
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ToolKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "as" => Ok(ToolKind::As),
            "cc" => Ok(ToolKind::Cc),
            "cxx" => Ok(ToolKind::Cxx),
            "mm" => Ok(ToolKind::Mm),
            "mxx" => Ok(ToolKind::Mxx),
            "ld" => Ok(ToolKind::Ld),
            "sh" => Ok(ToolKind::Sh),
            "ar" => Ok(ToolKind::Ar),
            other => Err(format!("unknown toolkind `{other}`")),
        }
    }
}

/// A compiler-family identifier derived from a program's basename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolName {
    Gcc,
    Gxx,
    Clang,
    Clangxx,
    Ar,
}

impl ToolName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::Gcc => "gcc",
            ToolName::Gxx => "gxx",
            ToolName::Clang => "clang",
            ToolName::Clangxx => "clangxx",
            ToolName::Ar => "ar",
        }
    }

    /// Whether this family is one of the clang variants (affects rpathdirs
    /// and cxx-runtime flag emission in the translator).
    pub fn is_clang(&self) -> bool {
        matches!(self, ToolName::Clang | ToolName::Clangxx)
    }

    /// Infer a toolname from a program's basename, matching on substrings
    /// the way the detector does (`clang++` before `clang`, etc).
    pub fn infer(program_basename: &str) -> Option<ToolName> {
        let lower = program_basename.to_ascii_lowercase();
        if lower.contains("clang++") {
            Some(ToolName::Clangxx)
        } else if lower.contains("clang") {
            Some(ToolName::Clang)
        } else if lower.ends_with("g++") || lower.contains("g++") {
            Some(ToolName::Gxx)
        } else if lower.ends_with("gcc") || lower.contains("gcc") || lower.ends_with("cc") {
            Some(ToolName::Gcc)
        } else if lower.contains("ar") {
            Some(ToolName::Ar)
        } else {
            None
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

//! The resolved target data model (§3, §4.6): `TargetKind`, source/install
//! entries, the final read-only `Target` struct the resolver produces, and
//! the closed-enum language standards the flag translator matches on.

use std::path::PathBuf;
use std::str::FromStr;

use crate::core::toolchain::ToolKind;
use crate::util::InternedString;

/// What kind of artifact a target builds. Drives default filename
/// prefix/extension and which toolkind performs the final link step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Binary,
    Static,
    Shared,
}

impl TargetKind {
    pub fn is_library(&self) -> bool {
        matches!(self, TargetKind::Static | TargetKind::Shared)
    }

    /// Default filename prefix: `lib` for static/shared, none for binaries.
    pub fn default_prefix(&self, _is_mingw: bool) -> &'static str {
        match self {
            TargetKind::Binary => "",
            TargetKind::Static | TargetKind::Shared => "lib",
        }
    }

    /// Default filename extension per (kind, platform), per §4.6.
    pub fn default_extension(&self, is_mingw: bool, _is_macos: bool) -> &'static str {
        match self {
            TargetKind::Binary => {
                if is_mingw {
                    "exe"
                } else {
                    ""
                }
            }
            TargetKind::Static => "a",
            TargetKind::Shared => {
                if is_mingw {
                    "dll"
                } else {
                    "so"
                }
            }
        }
    }
}

impl FromStr for TargetKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "binary" => Ok(TargetKind::Binary),
            "static" => Ok(TargetKind::Static),
            "shared" => Ok(TargetKind::Shared),
            _ => Err(()),
        }
    }
}

/// One resolved source file with its inferred compile toolkind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub toolkind: ToolKind,
}

/// A parsed `headerfiles`/`installfiles` entry: `src:root:prefix:filename`
/// (§4.8). `root`, `prefix`, and `filename` are each optional and encoded as
/// empty segments when absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallEntry {
    pub src: String,
    pub root: Option<String>,
    pub prefix: Option<String>,
    pub filename: Option<String>,
}

impl InstallEntry {
    /// Parse a `src:root:prefix:filename` token. Missing trailing segments
    /// are treated as empty, matching the loosest form `src` alone.
    pub fn parse(token: &str) -> Self {
        let mut parts = token.splitn(4, ':');
        let src = parts.next().unwrap_or("").to_string();
        let root = parts.next().filter(|s| !s.is_empty()).map(str::to_string);
        let prefix = parts.next().filter(|s| !s.is_empty()).map(str::to_string);
        let filename = parts.next().filter(|s| !s.is_empty()).map(str::to_string);
        InstallEntry { src, root, prefix, filename }
    }

    /// Compute the install destination under `base` (an `<includedir>` or
    /// `<prefix>`), per §4.8's path-encoding rule: preserve the subpath of
    /// `src` relative to `root` when `root` is set, else place the file at
    /// the root of `base`; `filename` overrides the trailing name either way.
    pub fn install_path(&self, base: &str) -> PathBuf {
        let mut dest = PathBuf::from(base);
        if let Some(prefix) = &self.prefix {
            dest = dest.join(prefix);
        }
        let src_path = PathBuf::from(&self.src);
        let relative = match &self.root {
            Some(root) => src_path.strip_prefix(root).unwrap_or(&src_path).to_path_buf(),
            None => PathBuf::from(src_path.file_name().unwrap_or_default()),
        };
        if let Some(name) = &self.filename {
            if let Some(parent) = relative.parent().filter(|p| !p.as_os_str().is_empty()) {
                dest.join(parent).join(name)
            } else {
                dest.join(name)
            }
        } else {
            dest.join(relative)
        }
    }
}

/// A fully resolved target: every field is final, computed once by
/// [`crate::builder::resolver::resolve`] and read by the translator,
/// templater, and Makefile emitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub name: InternedString,
    pub kind: TargetKind,
    pub filename: String,
    pub targetdir: PathBuf,
    pub objectdir: PathBuf,
    pub installdir: Option<String>,
    pub configdir: Option<String>,
    pub deps: Vec<InternedString>,
    pub options: Vec<String>,
    pub sources: Vec<SourceFile>,
    pub headerfiles: Vec<InstallEntry>,
    pub installfiles: Vec<InstallEntry>,
    pub configfiles: Vec<String>,
    pub version: Option<String>,
    pub version_build: Option<String>,
    pub default: bool,
    pub transitive_deps: Vec<InternedString>,
}

impl Target {
    /// `<targetdir>/<filename>` — the artifact this target ultimately produces.
    pub fn target_file(&self) -> PathBuf {
        self.targetdir.join(&self.filename)
    }
}

/// Whether a language value looks like it was meant for the C++ side
/// (`c++*`/`cxx*`/`gnu++*`) even though it was supplied on a C/mm target —
/// used to distinguish "unrecognized" (silently skipped) from "fatal
/// cross-wired" (§9) on the C side.
pub fn looks_like_cxx_value(value: &str) -> bool {
    value.starts_with("c++") || value.starts_with("cxx") || value.starts_with("gnu++")
}

/// `languages` values recognized on `cc`/`mm` toolkinds (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CStandard {
    C89,
    C99,
    C11,
    C17,
    Gnu89,
    Gnu99,
    Gnu11,
    Gnu17,
    Ansi,
}

impl CStandard {
    pub fn as_flag(&self) -> &'static str {
        match self {
            CStandard::C89 => "-std=c89",
            CStandard::C99 => "-std=c99",
            CStandard::C11 => "-std=c11",
            CStandard::C17 => "-std=c17",
            CStandard::Gnu89 => "-std=gnu89",
            CStandard::Gnu99 => "-std=gnu99",
            CStandard::Gnu11 => "-std=gnu11",
            CStandard::Gnu17 => "-std=gnu17",
            CStandard::Ansi => "-ansi",
        }
    }
}

impl FromStr for CStandard {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "c89" => Ok(CStandard::C89),
            "c99" => Ok(CStandard::C99),
            "c11" => Ok(CStandard::C11),
            "c17" => Ok(CStandard::C17),
            "gnu89" => Ok(CStandard::Gnu89),
            "gnu99" => Ok(CStandard::Gnu99),
            "gnu11" => Ok(CStandard::Gnu11),
            "gnu17" => Ok(CStandard::Gnu17),
            "ansi" => Ok(CStandard::Ansi),
            _ => Err(()),
        }
    }
}

/// `languages` values recognized on `cxx`/`mxx` toolkinds (§4.3), including
/// the `cxx*` and `gnu++*` aliases of the canonical `c++*` spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CppStandard {
    Cxx98,
    Cxx11,
    Cxx14,
    Cxx17,
    Cxx20,
    Gxx98,
    Gxx11,
    Gxx14,
    Gxx17,
    Gxx20,
}

impl CppStandard {
    pub fn as_flag(&self) -> &'static str {
        match self {
            CppStandard::Cxx98 => "-std=c++98",
            CppStandard::Cxx11 => "-std=c++11",
            CppStandard::Cxx14 => "-std=c++14",
            CppStandard::Cxx17 => "-std=c++17",
            CppStandard::Cxx20 => "-std=c++20",
            CppStandard::Gxx98 => "-std=gnu++98",
            CppStandard::Gxx11 => "-std=gnu++11",
            CppStandard::Gxx14 => "-std=gnu++14",
            CppStandard::Gxx17 => "-std=gnu++17",
            CppStandard::Gxx20 => "-std=gnu++20",
        }
    }
}

impl FromStr for CppStandard {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "c++98" | "cxx98" => Ok(CppStandard::Cxx98),
            "c++11" | "cxx11" => Ok(CppStandard::Cxx11),
            "c++14" | "cxx14" => Ok(CppStandard::Cxx14),
            "c++17" | "cxx17" => Ok(CppStandard::Cxx17),
            "c++20" | "cxx20" => Ok(CppStandard::Cxx20),
            "gnu++98" => Ok(CppStandard::Gxx98),
            "gnu++11" => Ok(CppStandard::Gxx11),
            "gnu++14" => Ok(CppStandard::Gxx14),
            "gnu++17" => Ok(CppStandard::Gxx17),
            "gnu++20" => Ok(CppStandard::Gxx20),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_kind_roundtrips_and_classifies() {
        assert_eq!("binary".parse(), Ok(TargetKind::Binary));
        assert_eq!("static".parse(), Ok(TargetKind::Static));
        assert_eq!("shared".parse(), Ok(TargetKind::Shared));
        assert!("bogus".parse::<TargetKind>().is_err());
        assert!(TargetKind::Static.is_library());
        assert!(TargetKind::Shared.is_library());
        assert!(!TargetKind::Binary.is_library());
    }

    #[test]
    fn default_prefix_and_extension_match_kind_and_platform() {
        assert_eq!(TargetKind::Binary.default_extension(true, false), "exe");
        assert_eq!(TargetKind::Binary.default_extension(false, false), "");
        assert_eq!(TargetKind::Static.default_prefix(false), "lib");
        assert_eq!(TargetKind::Static.default_extension(false, false), "a");
        assert_eq!(TargetKind::Shared.default_extension(false, false), "so");
        assert_eq!(TargetKind::Shared.default_extension(true, false), "dll");
    }

    #[test]
    fn install_entry_parses_full_and_partial_tokens() {
        let entry = InstallEntry::parse("src/foo.h:src:include:bar.h");
        assert_eq!(entry.src, "src/foo.h");
        assert_eq!(entry.root.as_deref(), Some("src"));
        assert_eq!(entry.prefix.as_deref(), Some("include"));
        assert_eq!(entry.filename.as_deref(), Some("bar.h"));

        let bare = InstallEntry::parse("README.md");
        assert_eq!(bare.src, "README.md");
        assert!(bare.root.is_none());
        assert!(bare.prefix.is_none());
        assert!(bare.filename.is_none());
    }

    #[test]
    fn install_path_preserves_subpath_under_root() {
        let entry = InstallEntry::parse("src/foo/bar.h:src:");
        assert_eq!(entry.install_path("/usr/local/include"), PathBuf::from("/usr/local/include/foo/bar.h"));
    }

    #[test]
    fn install_path_places_rootless_entry_at_base() {
        let entry = InstallEntry::parse("docs/README.md");
        assert_eq!(entry.install_path("/usr/local/share"), PathBuf::from("/usr/local/share/README.md"));
    }

    #[test]
    fn install_path_filename_override_replaces_trailing_name() {
        let entry = InstallEntry::parse("src/foo.h:src::renamed.h");
        assert_eq!(entry.install_path("/inc"), PathBuf::from("/inc/renamed.h"));
    }

    #[test]
    fn cxx_lookalike_on_c_side_is_detected() {
        assert!(looks_like_cxx_value("c++17"));
        assert!(looks_like_cxx_value("cxx17"));
        assert!(!looks_like_cxx_value("c17"));
    }

    #[test]
    fn cpp_standard_accepts_cxx_alias() {
        assert_eq!("cxx17".parse(), Ok(CppStandard::Cxx17));
        assert_eq!(CppStandard::Cxx17.as_flag(), "-std=c++17");
    }
}

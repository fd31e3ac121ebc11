//! Fatal-configuration diagnostics (§7's error taxonomy), rendered through
//! `miette` so a TTY gets a fancy report and a pipe gets a plain one-liner.

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

/// Suggestion strings attached to each fatal-configuration error variant.
pub mod suggestions {
    pub const UNKNOWN_CLI_OPTION: &str = "run with --help to see recognized flags";
    pub const UNKNOWN_ITEMNAME: &str = "check the project script for a misspelled attribute name";
    pub const UNKNOWN_TOOLNAME: &str = "supported toolnames are gcc, gxx, clang, clangxx, ar";
    pub const UNKNOWN_TARGETKIND: &str = "target kind must be one of: binary, static, shared";
    pub const UNKNOWN_SOURCE_EXTENSION: &str = "recognized extensions: .c .cpp .cc .ixx .m .mm .mxx .s .S .asm";
    pub const MISSING_KIND: &str = "call set_kind(\"binary\"|\"static\"|\"shared\") before generation";
    pub const TOOLCHAIN_NOT_FOUND: &str = "install a supported compiler or pass --toolchain=envs with CC/CXX set";
    pub const MAKE_NOT_FOUND: &str = "install make, or pass --make=PATH to point at it directly";
    pub const NINJA_UNSUPPORTED: &str = "pass --generator=gmake; the Ninja backend is not implemented";
}

/// The fatal-configuration error taxonomy from §7. Every variant prints a
/// single-line diagnostic and exits 1; there is no recovery path other than
/// re-running configure with different inputs.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum ConfigureError {
    #[error("unknown option `{0}`")]
    #[diagnostic(code(autoforge::cli::unknown_option), help("{}", suggestions::UNKNOWN_CLI_OPTION))]
    UnknownCliOption(String),

    #[error("unknown itemname `{0}`")]
    #[diagnostic(code(autoforge::flags::unknown_itemname), help("{}", suggestions::UNKNOWN_ITEMNAME))]
    UnknownItemName(String),

    #[error("unknown language value `{0}`")]
    #[diagnostic(code(autoforge::flags::unknown_language), help("{}", suggestions::UNKNOWN_ITEMNAME))]
    UnknownLanguageValue(String),

    #[error("unknown toolname `{0}`")]
    #[diagnostic(code(autoforge::flags::unknown_toolname), help("{}", suggestions::UNKNOWN_TOOLNAME))]
    UnknownToolName(String),

    #[error("unknown target kind `{0}`")]
    #[diagnostic(code(autoforge::target::unknown_kind), help("{}", suggestions::UNKNOWN_TARGETKIND))]
    UnknownTargetKind(String),

    #[error("unknown source extension in `{0}`")]
    #[diagnostic(code(autoforge::resolver::unknown_extension), help("{}", suggestions::UNKNOWN_SOURCE_EXTENSION))]
    UnknownSourceExtension(String),

    #[error("target `{0}` has no kind set")]
    #[diagnostic(code(autoforge::target::missing_kind), help("{}", suggestions::MISSING_KIND))]
    MissingKind(String),

    #[error("target `{0}` depends on undeclared target `{1}`")]
    #[diagnostic(code(autoforge::resolver::undeclared_dep))]
    UndeclaredDep(String, String),

    #[error("dependency cycle: {0}")]
    #[diagnostic(code(autoforge::resolver::dependency_cycle))]
    DependencyCycle(String),

    #[error("toolchain not found")]
    #[diagnostic(code(autoforge::detect::toolchain_not_found), help("{}", suggestions::TOOLCHAIN_NOT_FOUND))]
    ToolchainNotFound,

    #[error("make not found")]
    #[diagnostic(code(autoforge::detect::make_not_found), help("{}", suggestions::MAKE_NOT_FOUND))]
    MakeNotFound,

    #[error("the Ninja generator is not supported")]
    #[diagnostic(code(autoforge::cli::ninja_unsupported), help("{}", suggestions::NINJA_UNSUPPORTED))]
    NinjaUnsupported,
}

impl From<crate::builder::flags::FlagError> for ConfigureError {
    fn from(err: crate::builder::flags::FlagError) -> Self {
        match err {
            crate::builder::flags::FlagError::UnknownItemName(name) => ConfigureError::UnknownItemName(name),
            crate::builder::flags::FlagError::UnknownLanguageValue(value) => ConfigureError::UnknownLanguageValue(value),
        }
    }
}

impl From<crate::builder::resolver::ResolveError> for ConfigureError {
    fn from(err: crate::builder::resolver::ResolveError) -> Self {
        match err {
            crate::builder::resolver::ResolveError::MissingKind(name) => ConfigureError::MissingKind(name),
            crate::builder::resolver::ResolveError::UndeclaredDep(name, dep) => ConfigureError::UndeclaredDep(name, dep),
            crate::builder::resolver::ResolveError::UnknownSourceExtension(path) => ConfigureError::UnknownSourceExtension(path),
            crate::builder::resolver::ResolveError::DependencyCycle(path) => ConfigureError::DependencyCycle(path),
        }
    }
}

/// Render a fatal error to stderr the way §7 specifies: a single-line
/// diagnostic, fancy when stderr is a TTY, plain otherwise. Does not exit —
/// callers choose the exit code (always 1 for a `ConfigureError`).
pub fn emit_fatal(err: &ConfigureError) {
    use std::io::IsTerminal;
    if std::io::stderr().is_terminal() {
        eprintln!("{:?}", miette::Report::new_boxed(Box::new(DisplayOnly(err.to_string()))));
    } else {
        eprintln!("error: {err}");
    }
}

/// A minimal wrapper so `emit_fatal` can hand miette a owned, 'static
/// diagnostic without cloning `ConfigureError`'s non-'static internals.
#[derive(Debug, Error, MietteDiagnostic)]
#[error("{0}")]
struct DisplayOnly(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_error_maps_to_configure_error() {
        let err: ConfigureError = crate::builder::flags::FlagError::UnknownItemName("bogus".into()).into();
        assert!(matches!(err, ConfigureError::UnknownItemName(ref s) if s == "bogus"));
    }

    #[test]
    fn resolve_error_maps_to_configure_error() {
        let err: ConfigureError = crate::builder::resolver::ResolveError::MissingKind("app".into()).into();
        assert!(matches!(err, ConfigureError::MissingKind(ref s) if s == "app"));
    }
}

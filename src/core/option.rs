//! The `Option` entity: a probed or user-supplied feature flag.
//!
//! Options live in the store under [`EntityKind::Option`]; this module is a
//! thin typed read of the attributes §3 assigns them, used by the loader
//! (to write probing inputs) and the prober (to read them back).

use crate::core::store::{EntityKind, Store};

/// Tri-state `showmenu` flag: whether the option appears in `--help` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShowMenu {
    Enabled,
    Disabled,
    #[default]
    Unset,
}

/// A read-only snapshot of one option's probing inputs, gathered from the
/// store for the prober (§4.4).
#[derive(Debug, Clone, Default)]
pub struct ProbeInputs {
    pub cfuncs: Vec<String>,
    pub cxxfuncs: Vec<String>,
    pub cincludes: Vec<String>,
    pub cxxincludes: Vec<String>,
    pub ctypes: Vec<String>,
    pub cxxtypes: Vec<String>,
    pub csnippets: Vec<String>,
    pub cxxsnippets: Vec<String>,
    pub links: Vec<String>,
    pub syslinks: Vec<String>,
    pub cflags: Vec<String>,
    pub cxxflags: Vec<String>,
    pub cxflags: Vec<String>,
    pub ldflags: Vec<String>,
    pub defines: Vec<String>,
    pub udefines: Vec<String>,
    pub includedirs: Vec<String>,
    pub linkdirs: Vec<String>,
    pub languages: Vec<String>,
    pub warnings: Vec<String>,
    pub optimizes: Vec<String>,
}

impl ProbeInputs {
    pub fn read(store: &Store, name: &str) -> Self {
        let l = |key: &str| store.get_list(EntityKind::Option, name, key);
        ProbeInputs {
            cfuncs: l("cfuncs"),
            cxxfuncs: l("cxxfuncs"),
            cincludes: l("cincludes"),
            cxxincludes: l("cxxincludes"),
            ctypes: l("ctypes"),
            cxxtypes: l("cxxtypes"),
            csnippets: l("csnippets"),
            cxxsnippets: l("cxxsnippets"),
            links: l("links"),
            syslinks: l("syslinks"),
            cflags: l("cflags"),
            cxxflags: l("cxxflags"),
            cxflags: l("cxflags"),
            ldflags: l("ldflags"),
            defines: l("defines"),
            udefines: l("udefines"),
            includedirs: l("includedirs"),
            linkdirs: l("linkdirs"),
            languages: l("languages"),
            warnings: l("warnings"),
            optimizes: l("optimizes"),
        }
    }

    /// Whether the C-side probing inputs (`cfuncs`/`cincludes`/`ctypes`/`csnippets`)
    /// are all empty — §8 property 3's "K snippet check returns success
    /// without invoking the compiler".
    pub fn c_side_is_empty(&self) -> bool {
        self.cfuncs.is_empty() && self.cincludes.is_empty() && self.ctypes.is_empty() && self.csnippets.is_empty()
    }

    pub fn cxx_side_is_empty(&self) -> bool {
        self.cxxfuncs.is_empty() && self.cxxincludes.is_empty() && self.cxxtypes.is_empty() && self.cxxsnippets.is_empty()
    }

    /// Whether *any* probing input (C or C++ side, or link inputs) is present.
    /// Per §4.4/§9: "probe iff default is empty AND any probing input is non-empty."
    pub fn any_present(&self) -> bool {
        !(self.c_side_is_empty() && self.cxx_side_is_empty() && self.links.is_empty() && self.syslinks.is_empty())
    }
}

/// Read the option's `default` scalar, if set and non-empty.
pub fn default_value(store: &Store, name: &str) -> Option<String> {
    store.get_raw(EntityKind::Option, name, "default").filter(|s| !s.is_empty()).map(str::to_string)
}

/// Read the option's resolved `value` (set by the prober, or by `default`).
pub fn resolved_value(store: &Store, name: &str) -> Option<String> {
    store.get_raw(EntityKind::Option, name, "value").map(str::to_string)
}

/// Whether the option's resolved value is truthy (`"true"` or a non-empty,
/// non-`"false"`/`"0"` scalar) — the result `has_config(name)` reports.
pub fn is_enabled(store: &Store, name: &str) -> bool {
    match resolved_value(store, name) {
        Some(v) => !matches!(v.as_str(), "" | "false" | "0"),
        None => false,
    }
}

//! The loader: the phase-gated state machine that turns project-script
//! operations (§6's "Script API") into writes against the [`Store`].
//!
//! Mis-phased calls are no-ops rather than errors (§4.2), which is what lets
//! the same parsed project script be walked twice: once to collect options
//! and toolchains, once more to collect targets.

use crate::core::store::{EntityKind, Store, ROOT_SCOPE};
use crate::util::InternedString;

/// Which of the three mutually exclusive loading phases is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// `options` and `toolchains` registration calls take effect.
    LoadingOptionsAndToolchains,
    /// Probing is underway; no registration calls take effect.
    Detecting,
    /// `targets` registration calls take effect.
    LoadingTargets,
}

impl Phase {
    fn accepts_options(&self) -> bool {
        matches!(self, Phase::LoadingOptionsAndToolchains)
    }

    fn accepts_toolchains(&self) -> bool {
        matches!(self, Phase::LoadingOptionsAndToolchains)
    }

    fn accepts_targets(&self) -> bool {
        matches!(self, Phase::LoadingTargets)
    }
}

/// The platform facts predicates (`is_plat`, `is_arch`, ...) compare against.
#[derive(Debug, Clone)]
pub struct PlatformContext {
    pub plat: String,
    pub arch: String,
    pub mode: String,
    pub toolchain: String,
    pub host: String,
}

/// The loader: owns the [`Store`], the current phase, and which entity
/// scope (option/toolchain/target) is presently open.
pub struct Loader {
    pub store: Store,
    phase: Phase,
    platform: PlatformContext,
    current_option: Option<InternedString>,
    current_toolchain: Option<InternedString>,
    current_target: Option<InternedString>,
    project_name: Option<String>,
    project_version: Option<String>,
    project_version_build: Option<String>,
    scriptdir_stack: Vec<std::path::PathBuf>,
}

/// List-valued target/option attributes that honor the `{public}` visibility
/// marker (§3 invariant 5). Shared by `add_*` handling on targets.
pub const PUBLIC_MARKER: &str = "{public}";

impl Loader {
    pub fn new(platform: PlatformContext) -> Self {
        Loader {
            store: Store::new(),
            phase: Phase::LoadingOptionsAndToolchains,
            platform,
            current_option: None,
            current_toolchain: None,
            current_target: None,
            project_name: None,
            project_version: None,
            project_version_build: None,
            scriptdir_stack: Vec::new(),
        }
    }

    pub fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
        self.current_option = None;
        self.current_toolchain = None;
        self.current_target = None;
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn push_scriptdir(&mut self, dir: std::path::PathBuf) {
        self.scriptdir_stack.push(dir);
    }

    pub fn pop_scriptdir(&mut self) {
        self.scriptdir_stack.pop();
    }

    pub fn scriptdir(&self) -> Option<&std::path::Path> {
        self.scriptdir_stack.last().map(|p| p.as_path())
    }

    // -- Project ---------------------------------------------------------

    pub fn set_project(&mut self, name: &str) {
        self.project_name = Some(name.to_string());
    }

    pub fn set_version(&mut self, version: &str, build_date_format: Option<&str>) {
        self.project_version = Some(version.to_string());
        self.project_version_build = build_date_format.map(str::to_string);
    }

    pub fn project_name(&self) -> Option<&str> {
        self.project_name.as_deref()
    }

    pub fn project_version(&self) -> Option<(&str, Option<&str>)> {
        self.project_version.as_deref().map(|v| (v, self.project_version_build.as_deref()))
    }

    // -- Predicates --------------------------------------------------------

    pub fn is_plat(&self, p: &str) -> bool {
        self.platform.plat == p
    }

    pub fn is_arch(&self, a: &str) -> bool {
        self.platform.arch == a
    }

    pub fn is_mode(&self, m: &str) -> bool {
        self.platform.mode == m
    }

    pub fn is_toolchain(&self, name: &str) -> bool {
        self.platform.toolchain == name
    }

    pub fn is_host(&self, host: &str) -> bool {
        self.platform.host == host
    }

    /// `has_config(name)`: whether the named option currently resolves truthy.
    /// Backed by the option's own store entry rather than a fourth entity
    /// kind — "config" and "option" are the same thing observed at different
    /// lifecycle stages (§3: option `value` is "read-only thereafter").
    pub fn has_config(&self, name: &str) -> bool {
        crate::core::option::is_enabled(&self.store, name)
    }

    pub fn is_config(&self, name: &str, value: &str) -> bool {
        crate::core::option::resolved_value(&self.store, name).as_deref() == Some(value)
    }

    /// `set_config(name, value)`: force an option's resolved value, used by
    /// CLI `--<option>=<value>` overrides ahead of probing.
    pub fn set_config(&mut self, name: &str, value: &str) {
        self.store.declare(EntityKind::Option, name);
        self.store.set(EntityKind::Option, name, "value", value);
        self.store.set(EntityKind::Option, name, "default", value);
    }

    // -- Options -----------------------------------------------------------

    /// `option(name, description?, default?)`. A non-empty `description`
    /// auto-closes the scope (one-line form); otherwise the block stays
    /// open until `option_end()`.
    pub fn option(&mut self, name: &str, description: Option<&str>, default: Option<&str>) {
        if !self.phase.accepts_options() {
            return;
        }
        self.store.declare(EntityKind::Option, name);
        self.current_option = Some(InternedString::new(name));
        if let Some(desc) = description {
            if !desc.is_empty() {
                self.store.set(EntityKind::Option, name, "description", desc);
            }
        }
        if let Some(def) = default {
            self.store.set(EntityKind::Option, name, "default", def);
        }
        if description.map(|d| !d.is_empty()).unwrap_or(false) {
            self.option_end();
        }
    }

    pub fn option_end(&mut self) {
        self.current_option = None;
    }

    pub fn set_description(&mut self, desc: &str) {
        if let Some(name) = self.current_option.filter(|_| self.phase.accepts_options()) {
            self.store.set(EntityKind::Option, name, "description", desc);
        }
    }

    pub fn set_default(&mut self, value: &str) {
        if let Some(name) = self.current_option.filter(|_| self.phase.accepts_options()) {
            self.store.set(EntityKind::Option, name, "default", value);
        }
    }

    pub fn set_showmenu(&mut self, enabled: bool) {
        if let Some(name) = self.current_option.filter(|_| self.phase.accepts_options()) {
            self.store.set(EntityKind::Option, name, "showmenu", if enabled { "enabled" } else { "disabled" });
        }
    }

    /// `add_{c,cxx}{funcs,includes,types,snippets}` and friends — every
    /// list-valued option attribute funnels through here.
    pub fn add_option_values(&mut self, key: &str, values: &[&str]) {
        if let Some(name) = self.current_option.filter(|_| self.phase.accepts_options()) {
            self.store.append_all(EntityKind::Option, name, key, values.iter().copied());
        }
    }

    // -- Toolchains ----------------------------------------------------------

    pub fn toolchain(&mut self, name: &str) {
        if !self.phase.accepts_toolchains() {
            return;
        }
        self.store.declare(EntityKind::Toolchain, name);
        self.store.set(EntityKind::Toolchain, name, "name", name);
        self.current_toolchain = Some(InternedString::new(name));
    }

    pub fn toolchain_end(&mut self) {
        self.current_toolchain = None;
    }

    pub fn set_toolset(&mut self, kind: &str, programs: &[&str]) {
        if let Some(name) = self.current_toolchain.filter(|_| self.phase.accepts_toolchains()) {
            let key = format!("toolset_{kind}");
            for program in programs {
                self.store.append(EntityKind::Toolchain, name, &key, program);
            }
        }
    }

    // -- Targets -------------------------------------------------------------

    pub fn target(&mut self, name: &str) {
        if !self.phase.accepts_targets() {
            return;
        }
        self.store.declare(EntityKind::Target, name);
        self.current_target = Some(InternedString::new(name));
    }

    pub fn target_end(&mut self) {
        self.current_target = None;
    }

    fn current_target_scoped(&self) -> Option<InternedString> {
        if self.phase.accepts_targets() {
            // Unscoped setters affect root scope (§3 invariant 3).
            Some(self.current_target.unwrap_or_else(|| InternedString::new(ROOT_SCOPE)))
        } else {
            None
        }
    }

    pub fn set_target_scalar(&mut self, key: &str, value: &str) {
        if let Some(name) = self.current_target_scoped() {
            self.store.set(EntityKind::Target, name, key, value);
        }
    }

    pub fn set_target_bool(&mut self, key: &str, value: bool) {
        self.set_target_scalar(key, if value { "true" } else { "false" });
    }

    /// `add_*` list attributes on a target, honoring the `{public}` marker
    /// (§3 invariant 5): tokens before the marker are private-only; every
    /// non-marker token is additionally copied into `<key>_public` once a
    /// marker appears anywhere in the argument list.
    pub fn add_target_values(&mut self, key: &str, values: &[&str]) {
        let Some(name) = self.current_target_scoped() else { return };
        let has_marker = values.iter().any(|v| *v == PUBLIC_MARKER);
        let tokens: Vec<&str> = values.iter().copied().filter(|v| *v != PUBLIC_MARKER).collect();
        for token in &tokens {
            self.store.append(EntityKind::Target, name, key, token);
        }
        if has_marker {
            let public_key = format!("{key}_public");
            for token in &tokens {
                self.store.append(EntityKind::Target, name, &public_key, token);
            }
        }
    }

    /// Raw flags (`cflags`, `ldflags`, ...) never participate in public
    /// propagation — they're always local to the target that set them.
    pub fn add_target_flags(&mut self, key: &str, values: &[&str]) {
        let Some(name) = self.current_target_scoped() else { return };
        for token in values {
            self.store.append(EntityKind::Target, name, key, token);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn platform() -> PlatformContext {
        PlatformContext {
            plat: "linux".into(),
            arch: "x86_64".into(),
            mode: "release".into(),
            toolchain: "gcc".into(),
            host: "linux".into(),
        }
    }

    #[test]
    fn mis_phased_option_call_is_a_no_op() {
        let mut loader = Loader::new(platform());
        loader.set_phase(Phase::LoadingTargets);
        loader.option("pthread", None, None);
        assert!(!loader.store.contains(EntityKind::Option, "pthread"));
    }

    #[test]
    fn one_line_option_form_auto_closes() {
        let mut loader = Loader::new(platform());
        loader.option("pthread", Some("POSIX threads"), None);
        // Scope should already be closed: a subsequent add_option_values is a no-op.
        loader.add_option_values("cfuncs", &["pthread_create"]);
        assert_eq!(loader.store.get_list(EntityKind::Option, "pthread", "cfuncs"), Vec::<String>::new());
    }

    #[test]
    fn public_marker_splits_defines() {
        let mut loader = Loader::new(platform());
        loader.set_phase(Phase::LoadingTargets);
        loader.target("app");
        loader.add_target_values("defines", &["A", "B", PUBLIC_MARKER, "C"]);
        assert_eq!(loader.store.get(EntityKind::Target, "app", "defines").as_deref(), Some("A B C"));
        assert_eq!(loader.store.get(EntityKind::Target, "app", "defines_public").as_deref(), Some("A B C"));
    }

    #[test]
    fn no_marker_leaves_public_empty() {
        let mut loader = Loader::new(platform());
        loader.set_phase(Phase::LoadingTargets);
        loader.target("app");
        loader.add_target_values("defines", &["A", "B"]);
        assert_eq!(loader.store.get(EntityKind::Target, "app", "defines").as_deref(), Some("A B"));
        assert_eq!(loader.store.get(EntityKind::Target, "app", "defines_public"), None);
    }

    #[test]
    fn unscoped_target_setters_affect_root() {
        let mut loader = Loader::new(platform());
        loader.set_phase(Phase::LoadingTargets);
        loader.add_target_values("defines", &["GLOBAL"]);
        loader.target("app");
        loader.add_target_values("defines", &["LOCAL"]);
        assert_eq!(loader.store.get(EntityKind::Target, "app", "defines").as_deref(), Some("GLOBAL LOCAL"));
    }
}

//! The scoped key-value store: the process-wide home for every option,
//! toolchain, and target attribute registered while loading a project.
//!
//! Conceptually this is a two-level map `kind -> (entity, attribute) -> value`.
//! Every attribute is stored as plain text; list-valued attributes are kept
//! as a single space-joined string, matching the on-disk/token semantics the
//! translator and resolver expect. Token lists are only materialized into
//! `Vec<String>` at the boundary where a caller actually needs to iterate.

use std::collections::BTreeMap;

use crate::util::InternedString;

/// The root scope sentinel: the empty target name. Attributes set here
/// apply to every target, prepended ahead of the target's own values.
pub const ROOT_SCOPE: &str = "";

/// The three entity kinds that live in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKind {
    Option,
    Toolchain,
    Target,
}

/// A two-level store: `kind -> (entity_name, attribute) -> value`.
///
/// `BTreeMap` is used rather than `HashMap` so that iteration order (entity
/// names, attribute names) is deterministic without an extra sort pass —
/// the Makefile emitter and configfile templater both rely on stable output.
#[derive(Debug, Default, Clone)]
pub struct Store {
    tables: BTreeMap<EntityKind, BTreeMap<InternedString, BTreeMap<String, String>>>,
}

impl Store {
    pub fn new() -> Self {
        Store::default()
    }

    /// Declare an entity, creating an empty attribute map if it doesn't
    /// already exist. Idempotent.
    pub fn declare(&mut self, kind: EntityKind, name: impl Into<InternedString>) {
        self.tables
            .entry(kind)
            .or_default()
            .entry(name.into())
            .or_default();
    }

    /// Set an attribute to an exact scalar value, overwriting any prior value.
    pub fn set(&mut self, kind: EntityKind, name: impl Into<InternedString>, key: &str, value: impl Into<String>) {
        self.tables
            .entry(kind)
            .or_default()
            .entry(name.into())
            .or_default()
            .insert(key.to_string(), value.into());
    }

    /// Append a token to a list-valued attribute, space-joining it onto
    /// whatever is already there. Preserves insertion order; callers that
    /// need de-duplication do it themselves (first-occurrence semantics).
    pub fn append(&mut self, kind: EntityKind, name: impl Into<InternedString>, key: &str, token: &str) {
        if token.is_empty() {
            return;
        }
        let entry = self
            .tables
            .entry(kind)
            .or_default()
            .entry(name.into())
            .or_default()
            .entry(key.to_string())
            .or_default();
        if !entry.is_empty() {
            entry.push(' ');
        }
        entry.push_str(token);
    }

    /// Append several tokens in order.
    pub fn append_all<'a>(&mut self, kind: EntityKind, name: impl Into<InternedString>, key: &str, tokens: impl IntoIterator<Item = &'a str>) {
        let name = name.into();
        for token in tokens {
            self.append(kind, name, key, token);
        }
    }

    /// Raw scalar lookup: no root-scope prepending. Used for attributes that
    /// don't make sense at root scope (e.g. `description`, `kind`).
    pub fn get_raw(&self, kind: EntityKind, name: &str, key: &str) -> Option<&str> {
        self.tables
            .get(&kind)
            .and_then(|entities| entities.get(name))
            .and_then(|attrs| attrs.get(key))
            .map(|s| s.as_str())
    }

    /// Scalar/list lookup with root-scope prepending for `Target` entities,
    /// per §4.1: "For target attributes, get additionally prepends the
    /// root-scope value for the same key when present."
    pub fn get(&self, kind: EntityKind, name: &str, key: &str) -> Option<String> {
        if kind == EntityKind::Target && name != ROOT_SCOPE {
            let root = self.get_raw(kind, ROOT_SCOPE, key);
            let own = self.get_raw(kind, name, key);
            return match (root, own) {
                (Some(r), Some(o)) if !r.is_empty() && !o.is_empty() => Some(format!("{r} {o}")),
                (Some(r), _) if !r.is_empty() => Some(r.to_string()),
                (_, Some(o)) => Some(o.to_string()),
                _ => None,
            };
        }
        self.get_raw(kind, name, key).map(|s| s.to_string())
    }

    /// Tokenized list lookup. Whitespace-delimited; empty tokens are dropped
    /// (callers are required to tolerate them per spec, but producing none
    /// is simpler and observably equivalent for every consumer in this crate).
    pub fn get_list(&self, kind: EntityKind, name: &str, key: &str) -> Vec<String> {
        self.get(kind, name, key)
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Whether an attribute has any non-empty value (own or, for targets,
    /// inherited from root scope).
    pub fn has(&self, kind: EntityKind, name: &str, key: &str) -> bool {
        self.get(kind, name, key).map(|s| !s.trim().is_empty()).unwrap_or(false)
    }

    /// Names of every declared entity of a kind, in insertion (sorted) order.
    pub fn names(&self, kind: EntityKind) -> Vec<InternedString> {
        self.tables
            .get(&kind)
            .map(|entities| entities.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, kind: EntityKind, name: &str) -> bool {
        self.tables
            .get(&kind)
            .map(|entities| entities.contains_key(name))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_space_joins_in_order() {
        let mut store = Store::new();
        store.append(EntityKind::Target, "app", "defines", "A");
        store.append(EntityKind::Target, "app", "defines", "B");
        assert_eq!(store.get(EntityKind::Target, "app", "defines").as_deref(), Some("A B"));
    }

    #[test]
    fn root_scope_prepends_for_targets() {
        let mut store = Store::new();
        store.append(EntityKind::Target, ROOT_SCOPE, "defines", "GLOBAL");
        store.append(EntityKind::Target, "app", "defines", "LOCAL");
        assert_eq!(
            store.get(EntityKind::Target, "app", "defines").as_deref(),
            Some("GLOBAL LOCAL")
        );
        // Root scope lookup itself is unaffected.
        assert_eq!(store.get(EntityKind::Target, ROOT_SCOPE, "defines").as_deref(), Some("GLOBAL"));
    }

    #[test]
    fn root_scope_prepending_does_not_apply_to_options_or_toolchains() {
        let mut store = Store::new();
        store.append(EntityKind::Option, ROOT_SCOPE, "value", "true");
        store.set(EntityKind::Option, "pthread", "value", "false");
        assert_eq!(store.get(EntityKind::Option, "pthread", "value").as_deref(), Some("false"));
    }

    #[test]
    fn get_list_splits_on_whitespace() {
        let mut store = Store::new();
        store.set(EntityKind::Target, "app", "deps", "foo   bar");
        assert_eq!(store.get_list(EntityKind::Target, "app", "deps"), vec!["foo", "bar"]);
    }

    #[test]
    fn unset_attribute_is_none() {
        let store = Store::new();
        assert_eq!(store.get(EntityKind::Target, "app", "defines"), None);
        assert!(store.get_list(EntityKind::Target, "app", "defines").is_empty());
    }
}

//! Name registry
//!
//! Maps class names to aliases (`widget.button`) and alternate (legacy)
//! names, resolves namespace prefixes to source paths, and answers wildcard
//! name queries. Lookups are total: misses return `""` or the input name,
//! never an error.

mod expression;

pub use expression::Exclusion;

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::{ClassError, ClassResult};
use rustc_hash::{FxHashMap, FxHashSet};

/// Default declaration file extension
pub const DEFAULT_EXTENSION: &str = "json";

/// Name, alias, alternate and path registry
#[derive(Debug)]
pub struct Inventory {
    /// Known class names in registration order
    names: Vec<String>,
    name_to_aliases: FxHashMap<String, Vec<String>>,
    alias_to_name: FxHashMap<String, String>,
    name_to_alternates: FxHashMap<String, Vec<String>>,
    alternate_to_name: FxHashMap<String, String>,
    /// Namespace prefixes, longest first
    prefixes: Vec<String>,
    paths: FxHashMap<String, String>,
    root: String,
    extension: String,
    diagnostics: Diagnostics,
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new(Diagnostics::new())
    }
}

fn validate_name(name: &str) -> ClassResult<()> {
    if name.trim().is_empty() {
        return Err(ClassError::InvalidClassName(name.to_string()));
    }
    Ok(())
}

fn validate_alias(name: &str, alias: &str) -> ClassResult<()> {
    if alias.trim().is_empty() {
        return Err(ClassError::InvalidAlias {
            class: name.to_string(),
            alias: alias.to_string(),
        });
    }
    Ok(())
}

impl Inventory {
    /// Create an empty inventory reporting to `diagnostics`
    pub fn new(diagnostics: Diagnostics) -> Self {
        Self {
            names: Vec::new(),
            name_to_aliases: FxHashMap::default(),
            alias_to_name: FxHashMap::default(),
            name_to_alternates: FxHashMap::default(),
            alternate_to_name: FxHashMap::default(),
            prefixes: Vec::new(),
            paths: FxHashMap::default(),
            root: String::new(),
            extension: DEFAULT_EXTENSION.to_string(),
            diagnostics,
        }
    }

    // ===== Names =====

    /// Register a true class name
    pub fn add_name(&mut self, name: &str) -> ClassResult<()> {
        validate_name(name)?;
        if !self.name_to_aliases.contains_key(name) {
            self.name_to_aliases.insert(name.to_string(), Vec::new());
            self.name_to_alternates.insert(name.to_string(), Vec::new());
            self.names.push(name.to_string());
        }
        Ok(())
    }

    /// True if `name` was registered as a class name
    pub fn is_known_name(&self, name: &str) -> bool {
        self.name_to_aliases.contains_key(name)
    }

    /// Register a root class name that resolves but is left out of
    /// [`names`](Self::names) and wildcard scans
    pub(crate) fn add_builtin_name(&mut self, name: &str) {
        self.name_to_aliases.entry(name.to_string()).or_default();
        self.name_to_alternates.entry(name.to_string()).or_default();
    }

    /// Declared class names in registration order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Undo the aliases and alternates that still point at `name`
    ///
    /// Mappings that were reassigned to another class are left alone, and a
    /// mapping overwritten earlier is not restored.
    pub fn remove_name(&mut self, name: &str) {
        if let Some(aliases) = self.name_to_aliases.remove(name) {
            for alias in aliases {
                if self.alias_to_name.get(&alias).map(String::as_str) == Some(name) {
                    self.alias_to_name.remove(&alias);
                }
            }
        }
        if let Some(alternates) = self.name_to_alternates.remove(name) {
            for alternate in alternates {
                if self.alternate_to_name.get(&alternate).map(String::as_str) == Some(name) {
                    self.alternate_to_name.remove(&alternate);
                }
            }
        }
        self.names.retain(|n| n != name);
    }

    // ===== Aliases =====

    /// Map `alias` to `name`; reassigning an alias warns and last write wins
    pub fn add_alias(&mut self, name: &str, alias: &str) -> ClassResult<()> {
        validate_name(name)?;
        validate_alias(name, alias)?;
        self.add_name(name)?;

        if let Some(previous) = self.alias_to_name.get(alias).cloned() {
            if previous == name {
                return Ok(());
            }
            self.diagnostics.warn(
                DiagnosticKind::AliasReassigned,
                format!(
                    "Overriding existing alias: '{}' of: '{}' with: '{}'. Be sure it's intentional.",
                    alias, previous, name
                ),
            );
            if let Some(list) = self.name_to_aliases.get_mut(&previous) {
                list.retain(|a| a != alias);
            }
        }
        self.alias_to_name.insert(alias.to_string(), name.to_string());
        if let Some(list) = self.name_to_aliases.get_mut(name) {
            list.push(alias.to_string());
        }
        Ok(())
    }

    /// Add several aliases for one name
    pub fn add_aliases<S: AsRef<str>>(&mut self, name: &str, aliases: &[S]) -> ClassResult<()> {
        for alias in aliases {
            self.add_alias(name, alias.as_ref())?;
        }
        Ok(())
    }

    /// Class name for an alias, or `""`
    pub fn get_name_by_alias(&self, alias: &str) -> &str {
        self.alias_to_name.get(alias).map(String::as_str).unwrap_or("")
    }

    /// Aliases currently pointing at `name`
    pub fn get_aliases_by_name(&self, name: &str) -> &[String] {
        self.name_to_aliases
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    // ===== Alternates =====

    /// Map an alternate (legacy) name to `name`
    pub fn add_alternate(&mut self, name: &str, alternate: &str) -> ClassResult<()> {
        validate_name(name)?;
        validate_alias(name, alternate)?;
        self.add_name(name)?;

        if let Some(previous) = self.alternate_to_name.get(alternate).cloned() {
            if previous == name {
                return Ok(());
            }
            self.diagnostics.warn(
                DiagnosticKind::AlternateReassigned,
                format!(
                    "Overriding existing alternate name: '{}' of: '{}' with: '{}'. Be sure it's intentional.",
                    alternate, previous, name
                ),
            );
            if let Some(list) = self.name_to_alternates.get_mut(&previous) {
                list.retain(|a| a != alternate);
            }
        }
        self.alternate_to_name
            .insert(alternate.to_string(), name.to_string());
        if let Some(list) = self.name_to_alternates.get_mut(name) {
            list.push(alternate.to_string());
        }
        Ok(())
    }

    /// Class name for an alternate name, or `""`
    pub fn get_name_by_alternate(&self, alternate: &str) -> &str {
        self.alternate_to_name
            .get(alternate)
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Alternate names currently pointing at `name`
    pub fn get_alternates_by_name(&self, name: &str) -> &[String] {
        self.name_to_alternates
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    // ===== Resolution =====

    /// Resolve a name, alias or alternate to a class name
    ///
    /// Known class names win, then aliases, then alternates; anything else
    /// is returned unchanged.
    pub fn resolve_name(&self, name: &str) -> String {
        if self.name_to_aliases.contains_key(name) {
            return name.to_string();
        }
        if let Some(target) = self.alias_to_name.get(name) {
            return target.clone();
        }
        if let Some(target) = self.alternate_to_name.get(name) {
            return target.clone();
        }
        name.to_string()
    }

    /// Expand name expressions into class names
    ///
    /// Plain expressions resolve through [`resolve_name`](Self::resolve_name).
    /// Expressions with `*` match every known class whose name, aliases or
    /// alternates match. Names in `exclude` are skipped; with `accumulate`
    /// the selected names are added to `exclude`.
    pub fn get_names_by_expression<S: AsRef<str>>(
        &self,
        expressions: &[S],
        mut exclude: Option<&mut FxHashSet<String>>,
        accumulate: bool,
    ) -> Vec<String> {
        let mut selected: Vec<String> = Vec::new();
        let mut seen: FxHashSet<String> = FxHashSet::default();
        let is_excluded = |exclude: &Option<&mut FxHashSet<String>>, name: &str| {
            exclude.as_ref().map_or(false, |set| set.contains(name))
        };

        for expression in expressions {
            let expression = expression.as_ref();
            if !expression::is_wildcard(expression) {
                let name = self.resolve_name(expression);
                if !is_excluded(&exclude, &name) && seen.insert(name.clone()) {
                    selected.push(name);
                }
                continue;
            }

            let regex = match expression::compile(expression) {
                Ok(regex) => regex,
                Err(err) => {
                    tracing::warn!(expression, error = %err, "skipping invalid name expression");
                    continue;
                }
            };
            for name in &self.names {
                if is_excluded(&exclude, name) || seen.contains(name) {
                    continue;
                }
                let matched = regex.is_match(name)
                    || self.get_aliases_by_name(name).iter().any(|a| regex.is_match(a))
                    || self
                        .get_alternates_by_name(name)
                        .iter()
                        .any(|a| regex.is_match(a));
                if matched {
                    seen.insert(name.clone());
                    selected.push(name.clone());
                }
            }
        }

        if accumulate {
            if let Some(set) = exclude.as_mut() {
                set.extend(selected.iter().cloned());
            }
        }
        selected
    }

    /// Start a chained exclude/select query
    pub fn exclude<S: AsRef<str>>(&self, expressions: &[S]) -> Exclusion<'_> {
        Exclusion::new(self).exclude(expressions)
    }

    // ===== Paths =====

    /// Map a namespace prefix to a directory or URL
    pub fn set_path(&mut self, prefix: &str, path: &str) -> ClassResult<()> {
        validate_name(prefix)?;
        if self.paths.insert(prefix.to_string(), path.to_string()).is_none() {
            self.prefixes.push(prefix.to_string());
            self.prefixes.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
        }
        Ok(())
    }

    /// Base directory for names without a registered prefix
    pub fn set_root(&mut self, root: &str) {
        self.root = root.trim_end_matches('/').to_string();
    }

    /// Declaration file extension (without the dot)
    pub fn set_extension(&mut self, extension: &str) {
        self.extension = extension.trim_start_matches('.').to_string();
    }

    /// Extension used by [`get_path`](Self::get_path)
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Registered path for an exact prefix
    pub fn path_for_prefix(&self, prefix: &str) -> Option<&str> {
        self.paths.get(prefix).map(String::as_str)
    }

    /// Longest registered prefix that is `class_name` or a dotted ancestor
    /// of it, or `""`
    pub fn get_prefix(&self, class_name: &str) -> &str {
        if self.paths.contains_key(class_name) {
            return self
                .prefixes
                .iter()
                .find(|p| *p == class_name)
                .map(String::as_str)
                .unwrap_or("");
        }
        self.prefixes
            .iter()
            .find(|prefix| {
                class_name.len() > prefix.len()
                    && class_name.starts_with(prefix.as_str())
                    && class_name.as_bytes()[prefix.len()] == b'.'
            })
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Source path for a class name
    ///
    /// `My.App.view.Main` with prefix `My.App` -> `app` becomes
    /// `app/view/Main.json`. An exact prefix match returns the registered
    /// path unchanged.
    pub fn get_path(&self, class_name: &str) -> String {
        let prefix = self.get_prefix(class_name);
        let (base, rest) = if prefix.is_empty() {
            (self.root.as_str(), class_name)
        } else {
            let base = self.paths.get(prefix).map(String::as_str).unwrap_or("");
            if prefix == class_name {
                return base.to_string();
            }
            (base, &class_name[prefix.len() + 1..])
        };

        let mut path = String::new();
        if !base.is_empty() {
            path.push_str(base.trim_end_matches('/'));
            path.push('/');
        }
        path.push_str(&rest.replace('.', "/"));
        path.push('.');
        path.push_str(&self.extension);
        path.replace("/./", "/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_lookup_and_miss() {
        let mut inv = Inventory::default();
        inv.add_alias("My.Class", "widget.mything").unwrap();

        assert_eq!(inv.get_name_by_alias("widget.mything"), "My.Class");
        assert_eq!(inv.get_name_by_alias("widget.other"), "");
        assert_eq!(inv.get_aliases_by_name("My.Class"), ["widget.mything"]);
    }

    #[test]
    fn test_resolve_name_order() {
        let mut inv = Inventory::default();
        inv.add_alias("Real", "short").unwrap();
        inv.add_alternate("Real", "Legacy").unwrap();
        inv.add_name("short2").unwrap();

        assert_eq!(inv.resolve_name("Real"), "Real");
        assert_eq!(inv.resolve_name("short"), "Real");
        assert_eq!(inv.resolve_name("Legacy"), "Real");
        assert_eq!(inv.resolve_name("Unknown.Thing"), "Unknown.Thing");
    }

    #[test]
    fn test_known_name_shadows_alias() {
        let mut inv = Inventory::default();
        inv.add_alias("A", "B").unwrap();
        inv.add_name("B").unwrap();
        assert_eq!(inv.resolve_name("B"), "B");
    }

    #[test]
    fn test_alias_reassignment_warns() {
        let diagnostics = Diagnostics::new();
        let mut inv = Inventory::new(diagnostics.clone());
        inv.add_alias("A", "x").unwrap();
        inv.add_alias("A", "x").unwrap();
        assert_eq!(diagnostics.count(DiagnosticKind::AliasReassigned), 0);

        inv.add_alias("B", "x").unwrap();
        assert_eq!(inv.get_name_by_alias("x"), "B");
        assert!(inv.get_aliases_by_name("A").is_empty());
        assert_eq!(diagnostics.count(DiagnosticKind::AliasReassigned), 1);
    }

    #[test]
    fn test_invalid_names_are_rejected() {
        let mut inv = Inventory::default();
        assert!(matches!(inv.add_name(""), Err(ClassError::InvalidClassName(_))));
        assert!(matches!(
            inv.add_alias("A", " "),
            Err(ClassError::InvalidAlias { .. })
        ));
        assert!(inv.names().is_empty());
    }

    #[test]
    fn test_remove_name_keeps_reassigned_aliases() {
        let mut inv = Inventory::default();
        inv.add_alias("A", "a1").unwrap();
        inv.add_alias("A", "shared").unwrap();
        inv.add_alias("B", "shared").unwrap();
        inv.remove_name("A");

        assert_eq!(inv.get_name_by_alias("a1"), "");
        assert_eq!(inv.get_name_by_alias("shared"), "B");
        assert!(!inv.is_known_name("A"));
    }

    #[test]
    fn test_wildcard_matches_aliases() {
        let mut inv = Inventory::default();
        inv.add_name("Foo.Bar").unwrap();
        inv.add_alias("Baz", "Foo.Bar.baz").unwrap();
        inv.add_name("Foo2.Bar").unwrap();

        let names = inv.get_names_by_expression(&["Foo.*"], None, false);
        assert_eq!(names, vec!["Foo.Bar", "Baz"]);
    }

    #[test]
    fn test_expression_accumulates_exclusions() {
        let mut inv = Inventory::default();
        for name in ["App.A", "App.B", "Lib.C"] {
            inv.add_name(name).unwrap();
        }

        let mut seen = FxHashSet::default();
        let first = inv.get_names_by_expression(&["App.A"], Some(&mut seen), true);
        let second = inv.get_names_by_expression(&["*"], Some(&mut seen), true);

        assert_eq!(first, vec!["App.A"]);
        assert_eq!(second, vec!["App.B", "Lib.C"]);
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_chained_exclude_select() {
        let mut inv = Inventory::default();
        for name in ["App.view.Main", "App.view.Debug", "App.model.User"] {
            inv.add_name(name).unwrap();
        }

        let selected = inv
            .exclude(&["*.Debug"])
            .exclude(&["App.model.*"])
            .select(&["App.*"]);
        assert_eq!(selected, vec!["App.view.Main"]);
    }

    #[test]
    fn test_prefix_respects_dot_boundary() {
        let mut inv = Inventory::default();
        inv.set_path("Foo.Bar", "lib/bar").unwrap();
        inv.set_path("Foo", "lib").unwrap();

        assert_eq!(inv.get_prefix("Foo.Bar.Baz"), "Foo.Bar");
        assert_eq!(inv.get_prefix("Foo.Barn"), "Foo");
        assert_eq!(inv.get_prefix("Foo.Bar"), "Foo.Bar");
        assert_eq!(inv.get_prefix("Other"), "");
    }

    #[test]
    fn test_get_path() {
        let mut inv = Inventory::default();
        inv.set_path("My.App", "app/").unwrap();
        inv.set_root("src");

        assert_eq!(inv.get_path("My.App.view.Main"), "app/view/Main.json");
        assert_eq!(inv.get_path("My.App"), "app/");
        assert_eq!(inv.get_path("Other.Thing"), "src/Other/Thing.json");

        inv.set_extension(".js");
        assert_eq!(inv.get_path("My.App.Foo"), "app/Foo.js");
    }
}

//! Property-based tests for the name inventory
//!
//! These tests use proptest to check alias, wildcard and path invariants
//! across generated class names.

use proptest::prelude::*;

use classkit_engine::{DiagnosticKind, Diagnostics, Inventory};

/// One capitalised name segment
fn segment() -> impl Strategy<Value = String> {
    "[A-Z][a-z]{0,6}"
}

/// Dotted class name with one to three segments
fn class_name() -> impl Strategy<Value = String> {
    prop::collection::vec(segment(), 1..4).prop_map(|parts| parts.join("."))
}

/// Alias in the `widget.<lower>` style
fn alias() -> impl Strategy<Value = String> {
    "[a-z]{1,8}".prop_map(|s| format!("widget.{}", s))
}

fn inventory() -> (Inventory, Diagnostics) {
    let diagnostics = Diagnostics::new();
    (Inventory::new(diagnostics.clone()), diagnostics)
}

proptest! {
    #[test]
    fn alias_resolves_to_its_class(name in class_name(), alias in alias()) {
        let (mut inventory, _) = inventory();
        inventory.add_alias(&name, &alias).unwrap();

        prop_assert_eq!(inventory.get_name_by_alias(&alias), name.as_str());
        prop_assert_eq!(inventory.resolve_name(&alias), name.clone());
        prop_assert!(inventory.get_aliases_by_name(&name).contains(&alias));
        prop_assert!(inventory.is_known_name(&name));
    }

    #[test]
    fn unregistered_alias_is_empty(alias in alias()) {
        let (inventory, _) = inventory();
        prop_assert_eq!(inventory.get_name_by_alias(&alias), "");
        prop_assert_eq!(inventory.resolve_name(&alias), alias);
    }

    #[test]
    fn alias_reassignment_is_last_write_wins(
        first in class_name(),
        second in class_name(),
        alias in alias(),
    ) {
        prop_assume!(first != second);
        let (mut inventory, diagnostics) = inventory();
        inventory.add_alias(&first, &alias).unwrap();
        inventory.add_alias(&second, &alias).unwrap();

        prop_assert_eq!(inventory.get_name_by_alias(&alias), second.as_str());
        prop_assert!(!inventory.get_aliases_by_name(&first).contains(&alias));
        prop_assert_eq!(diagnostics.count(DiagnosticKind::AliasReassigned), 1);
    }

    #[test]
    fn namespace_wildcard_matches_exactly_the_namespace(
        names in prop::collection::vec(class_name(), 1..12),
        namespace in segment(),
    ) {
        let (mut inventory, _) = inventory();
        for name in &names {
            inventory.add_name(name).unwrap();
        }

        let expression = format!("{}.*", namespace);
        let mut selected = inventory.get_names_by_expression(&[expression.as_str()], None, false);
        selected.sort();

        let prefix = format!("{}.", namespace);
        let mut expected: Vec<String> = inventory
            .names()
            .iter()
            .filter(|n| n.starts_with(&prefix))
            .cloned()
            .collect();
        expected.sort();
        prop_assert_eq!(selected, expected);
    }

    #[test]
    fn prefixed_paths_mirror_the_name(rest in class_name()) {
        let (mut inventory, _) = inventory();
        inventory.set_path("App", "app").unwrap();

        let path = inventory.get_path(&format!("App.{}", rest));
        prop_assert_eq!(path, format!("app/{}.json", rest.replace('.', "/")));
    }
}

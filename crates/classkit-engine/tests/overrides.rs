//! Integration tests for class overrides
//!
//! Tests cover:
//! - Overrides applied to existing classes and to classes defined later
//! - callParent from an override reaching the replaced method
//! - Stacked overrides
//! - Overrides waiting on their own requirements
//! - Overrides of singletons
//! - Stalled override reporting

use classkit_engine::{
    ClassDef, ClassManager, ClassResult, ClassState, DiagnosticKind, Invocation, Value,
};

fn suffix(tag: &'static str) -> impl Fn(&Invocation, &[Value]) -> ClassResult<Value> {
    move |inv: &Invocation, args: &[Value]| {
        let parent = inv.call_parent(args)?;
        Ok(Value::from(format!(
            "{}>{}",
            tag,
            parent.as_str().unwrap_or_default()
        )))
    }
}

fn target(manager: &mut ClassManager, name: &str) {
    manager
        .define(
            Some(name),
            ClassDef::new().method("hello", |_, _| Ok(Value::from("orig"))),
        )
        .unwrap();
}

// ────────────────────────────────────────────────────────────────────────────
// Ordering
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_override_existing_class() {
    let mut manager = ClassManager::new();
    target(&mut manager, "Greeter");
    let before = manager.create("Greeter", &[]).unwrap();

    let outcome = manager
        .define(
            Some("Greeter.Patch"),
            ClassDef::new()
                .override_of("Greeter")
                .method("hello", suffix("patched")),
        )
        .unwrap();
    assert!(outcome.is_ready());
    assert!(outcome
        .class()
        .unwrap()
        .ptr_eq(&manager.get_class("Greeter").unwrap()));
    assert_eq!(manager.state("Greeter.Patch"), Some(ClassState::Ready));

    // Existing instances share the patched prototype
    assert_eq!(before.call("hello", &[]).unwrap(), Value::from("patched>orig"));
}

#[test]
fn test_override_waits_for_target() {
    let mut manager = ClassManager::new();
    let outcome = manager
        .define(
            Some("Later.Patch"),
            ClassDef::new()
                .override_of("Later")
                .method("hello", suffix("patched")),
        )
        .unwrap();
    assert!(!outcome.is_ready());
    assert_eq!(manager.unresolved_overrides(), vec!["Later"]);
    assert!(manager.is_pending("Later.Patch"));

    target(&mut manager, "Later");
    assert!(manager.unresolved_overrides().is_empty());
    assert!(manager.is_created("Later.Patch"));

    let later = manager.create("Later", &[]).unwrap();
    assert_eq!(later.call("hello", &[]).unwrap(), Value::from("patched>orig"));
}

#[test]
fn test_overrides_stack_in_application_order() {
    let mut manager = ClassManager::new();
    manager
        .define(
            None,
            ClassDef::new()
                .override_of("Stacked")
                .method("hello", suffix("first")),
        )
        .unwrap();
    manager
        .define(
            None,
            ClassDef::new()
                .override_of("Stacked")
                .method("hello", suffix("second")),
        )
        .unwrap();
    target(&mut manager, "Stacked");

    let stacked = manager.create("Stacked", &[]).unwrap();
    assert_eq!(
        stacked.call("hello", &[]).unwrap(),
        Value::from("second>first>orig")
    );
}

#[test]
fn test_override_waits_for_requires() {
    let mut manager = ClassManager::new();
    target(&mut manager, "Core");
    let outcome = manager
        .define(
            Some("Core.Patch"),
            ClassDef::new()
                .override_of("Core")
                .requires("Core.Helper")
                .method("hello", suffix("helped")),
        )
        .unwrap();
    assert!(!outcome.is_ready());
    assert_eq!(
        manager.state("Core.Patch"),
        Some(ClassState::AwaitingDependencies(vec!["Core.Helper".to_string()]))
    );

    let core = manager.create("Core", &[]).unwrap();
    assert_eq!(core.call("hello", &[]).unwrap(), Value::from("orig"));

    manager.define(Some("Core.Helper"), ClassDef::new()).unwrap();
    assert_eq!(core.call("hello", &[]).unwrap(), Value::from("helped>orig"));
}

#[test]
fn test_applied_override_satisfies_requires() {
    let mut manager = ClassManager::new();
    target(&mut manager, "Shop");
    manager
        .define(
            Some("Shop.First"),
            ClassDef::new()
                .override_of("Shop")
                .method("hello", suffix("first")),
        )
        .unwrap();
    assert!(manager.is_created("Shop.First"));

    let outcome = manager
        .define(
            Some("Shop.Second"),
            ClassDef::new()
                .override_of("Shop")
                .requires("Shop.First")
                .method("hello", suffix("second")),
        )
        .unwrap();
    assert!(outcome.is_ready());

    let outcome = manager
        .define(
            Some("Checkout"),
            ClassDef::new().requires("Shop.First").uses("Shop.Second"),
        )
        .unwrap();
    assert!(outcome.is_ready());
    assert!(manager.pending().is_empty());
    assert_eq!(manager.diagnostics().count(DiagnosticKind::MissingUse), 0);

    let shop = manager.create("Shop", &[]).unwrap();
    assert_eq!(
        shop.call("hello", &[]).unwrap(),
        Value::from("second>first>orig")
    );
}

#[test]
fn test_override_waits_for_another_override() {
    let mut manager = ClassManager::new();
    target(&mut manager, "Cart");
    let outcome = manager
        .define(
            Some("Cart.Second"),
            ClassDef::new()
                .override_of("Cart")
                .requires("Cart.First")
                .method("hello", suffix("second")),
        )
        .unwrap();
    assert!(!outcome.is_ready());

    manager
        .define(
            Some("Cart.First"),
            ClassDef::new()
                .override_of("Cart")
                .method("hello", suffix("first")),
        )
        .unwrap();
    assert!(manager.is_created("Cart.Second"));

    let cart = manager.create("Cart", &[]).unwrap();
    assert_eq!(
        cart.call("hello", &[]).unwrap(),
        Value::from("second>first>orig")
    );
}

// ────────────────────────────────────────────────────────────────────────────
// What an override can add
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_override_adds_configs_statics_and_aliases() {
    let mut manager = ClassManager::new();
    target(&mut manager, "Button");
    manager
        .define(
            None,
            ClassDef::new()
                .override_of("Button")
                .config("color", "red")
                .static_member("kind", "button")
                .xtype("button"),
        )
        .unwrap();

    let button = manager.create("widget.button", &[]).unwrap();
    assert_eq!(button.call("getColor", &[]).unwrap(), Value::from("red"));
    assert!(button.is_xtype("button"));

    let class = manager.get_class("Button").unwrap();
    assert_eq!(class.get_static("kind"), Some(Value::from("button")));
    assert_eq!(manager.inventory().get_name_by_alias("widget.button"), "Button");
}

#[test]
fn test_override_singleton() {
    let mut manager = ClassManager::new();
    manager
        .define(
            Some("App"),
            ClassDef::new()
                .singleton(true)
                .method("version", |_, _| Ok(Value::from(1))),
        )
        .unwrap();
    manager
        .define(
            None,
            ClassDef::new()
                .override_of("App")
                .method("version", |inv, args| {
                    let base = inv.call_parent(args)?.as_number().unwrap_or(0.0);
                    Ok(Value::from(base + 1.0))
                }),
        )
        .unwrap();

    let app = manager.get("App").unwrap();
    let instance = app.as_instance().unwrap();
    assert_eq!(instance.call("version", &[]).unwrap(), Value::from(2));
}

#[test]
fn test_override_requires_target_name() {
    let mut manager = ClassManager::new();
    assert!(manager
        .define(None, ClassDef::new().override_of(" "))
        .is_err());
}

// ────────────────────────────────────────────────────────────────────────────
// Stalls
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_stalled_override_is_reported() {
    let mut manager = ClassManager::new();
    manager
        .define(Some("Ghost.Patch"), ClassDef::new().override_of("Ghost"))
        .unwrap();
    manager
        .define(Some("Waiting"), ClassDef::new().extend("Nowhere"))
        .unwrap();

    assert_eq!(manager.report_stalled(), 2);
    assert_eq!(manager.diagnostics().count(DiagnosticKind::StalledOverride), 1);
    assert_eq!(manager.diagnostics().count(DiagnosticKind::StalledClass), 1);
    assert_eq!(manager.pending(), vec!["Ghost.Patch", "Waiting"]);

    assert!(manager.fail_pending("Ghost.Patch", "target never loaded"));
    assert!(manager.unresolved_overrides().is_empty());
    assert!(matches!(
        manager.state("Ghost.Patch"),
        Some(ClassState::Failed(_))
    ));
}

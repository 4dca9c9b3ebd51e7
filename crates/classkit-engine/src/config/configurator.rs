//! Per-class config aggregation and instance configuration

use super::{ConfigDecl, ConfigProperty, InitKind};
use crate::object::{invoke, ClassRef, InstanceRef, Method, MethodBody, MethodKind};
use crate::value::{PropertyMap, Value};
use crate::{ClassError, ClassResult};
use rustc_hash::{FxHashMap, FxHashSet};
use std::rc::Rc;

/// Config state owned by one class
///
/// Only the class's own declarations live here. Lookups fall through to the
/// superclass's configurator, so declaring or overriding a config on a
/// subclass never writes into the parent.
#[derive(Debug, Default)]
pub struct Configurator {
    configs: FxHashMap<String, Rc<ConfigProperty>>,
    values: PropertyMap,
    order: Vec<String>,
    plan: Option<Rc<InitPlan>>,
    cached: PropertyMap,
}

impl Configurator {
    /// Empty configurator
    pub fn new() -> Self {
        Self::default()
    }

    /// Property declared or overridden by this class
    pub fn own_config(&self, name: &str) -> Option<Rc<ConfigProperty>> {
        self.configs.get(name).cloned()
    }

    /// Default value set by this class
    pub fn own_value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Configs first introduced by this class, in declaration order
    pub fn own_names(&self) -> &[String] {
        &self.order
    }

    /// Value promoted from the first instance of a cached config
    pub fn cached_value(&self, name: &str) -> Option<&Value> {
        self.cached.get(name)
    }
}

/// One config in initialisation order
#[derive(Debug, Clone)]
pub struct PlanEntry {
    /// Config name
    pub name: String,
    /// Effective property for the class
    pub property: Rc<ConfigProperty>,
    /// Effective default value
    pub default: Value,
    /// Initialisation kind
    pub kind: InitKind,
}

/// Frozen initialisation order for a class
///
/// Superclass configs come before subclass configs, each class in
/// declaration order. The plan is keyed on the generation of every class in
/// the chain and rebuilt when any of them changes.
#[derive(Debug)]
pub struct InitPlan {
    key: Vec<(u64, u64)>,
    entries: Vec<PlanEntry>,
    index: FxHashMap<String, usize>,
}

impl InitPlan {
    /// Entries in initialisation order
    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    /// Config names in initialisation order
    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.entries.iter().map(|e| &e.name)
    }

    /// Entry by name
    pub fn get(&self, name: &str) -> Option<&PlanEntry> {
        self.index.get(name).map(|&i| &self.entries[i])
    }
}

// ============================================================================
// Class-level lookups
// ============================================================================

impl ClassRef {
    /// Effective config property, searching up the chain
    pub fn find_config(&self, name: &str) -> Option<Rc<ConfigProperty>> {
        self.ancestors().find_map(|c| c.configurator().own_config(name))
    }

    /// Effective default value, searching up the chain
    pub fn config_default(&self, name: &str) -> Value {
        self.ancestors()
            .find_map(|c| c.configurator().own_value(name).cloned())
            .unwrap_or_default()
    }

    /// All config names in initialisation order
    pub fn config_names(&self) -> Vec<String> {
        init_plan(self).names().cloned().collect()
    }

    /// Initialisation kind of a config, if declared
    pub fn init_kind(&self, name: &str) -> Option<InitKind> {
        init_plan(self).get(name).map(|e| e.kind)
    }
}

/// Current init plan for a class, rebuilding it if the chain changed
pub fn init_plan(class: &ClassRef) -> Rc<InitPlan> {
    let key: Vec<(u64, u64)> = class
        .ancestors()
        .map(|c| (c.id(), c.generation()))
        .collect();
    let current = class.configurator().plan.clone();
    if let Some(plan) = current.filter(|p| p.key == key) {
        return plan;
    }

    let plan = Rc::new(build_plan(class, key));
    tracing::debug!(
        class = %class.display_name(),
        configs = plan.entries.len(),
        "built config init plan"
    );
    let mut configurator = class.configurator_mut();
    configurator.plan = Some(plan.clone());
    configurator.cached = PropertyMap::new();
    plan
}

fn build_plan(class: &ClassRef, key: Vec<(u64, u64)>) -> InitPlan {
    let mut chain: Vec<ClassRef> = class.ancestors().collect();
    chain.reverse();

    let mut entries = Vec::new();
    let mut index = FxHashMap::default();
    for owner in &chain {
        let names = owner.configurator().order.clone();
        for name in names {
            if index.contains_key(&name) {
                continue;
            }
            let property = match class.find_config(&name) {
                Some(property) => property,
                None => continue,
            };
            let default = class.config_default(&name);
            let has_applier = class.find_method(&property.names().apply).is_some();
            let kind = if default.is_nullish() && !has_applier {
                InitKind::Skip
            } else if property.is_cached() {
                InitKind::Cached
            } else {
                InitKind::PerInstance
            };
            index.insert(name.clone(), entries.len());
            entries.push(PlanEntry {
                name,
                property,
                default,
                kind,
            });
        }
    }

    InitPlan {
        key,
        entries,
        index,
    }
}

// ============================================================================
// Declaration
// ============================================================================

fn install_accessors(class: &ClassRef, property: &ConfigProperty) {
    let names = property.names();
    if !class.has_own_member(&names.get) {
        class.set_method(
            &names.get,
            Method::new(
                &names.get,
                class,
                MethodKind::Instance,
                MethodBody::ConfigGetter(property.name().to_string()),
                None,
            ),
        );
    }
    if !class.has_own_member(&names.set) {
        class.set_method(
            &names.set,
            Method::new(
                &names.set,
                class,
                MethodKind::Instance,
                MethodBody::ConfigSetter(property.name().to_string()),
                None,
            ),
        );
    }
}

/// Add a class's own `config` declarations
///
/// New names get a fresh property plus generated accessors. Inherited names
/// with options get a chained property; inherited names with a raw value
/// only change the default. Values of inherited configs are merged with the
/// inherited default when the property has a merge strategy.
pub(crate) fn add_configs(class: &ClassRef, decls: &[(String, ConfigDecl)]) -> ClassResult<()> {
    let target = Value::Class(class.clone());
    for (name, decl) in decls {
        if name.is_empty() {
            return Err(ClassError::InvalidDeclaration(format!(
                "{}: config name must not be empty",
                class.display_name()
            )));
        }

        let existing = class.find_config(name);
        let inherited_default = class.config_default(name);
        let property = match &existing {
            None => {
                let property = Rc::new(ConfigProperty::new(name, decl.options.clone()));
                let mut configurator = class.configurator_mut();
                configurator.configs.insert(name.clone(), property.clone());
                configurator.order.push(name.clone());
                drop(configurator);
                install_accessors(class, &property);
                property
            }
            Some(inherited) if decl.has_options() => {
                let property = Rc::new(ConfigProperty::chained(inherited, decl.options.clone()));
                class
                    .configurator_mut()
                    .configs
                    .insert(name.clone(), property.clone());
                property
            }
            Some(inherited) => inherited.clone(),
        };

        let value = if existing.is_some() && property.merge().is_some() {
            property.merge_values(decl.value.clone(), inherited_default, &target, None)?
        } else {
            decl.value.clone()
        };
        class.configurator_mut().values.insert(name.clone(), value);
    }
    class.bump();
    Ok(())
}

/// Contribute a mixin's configs to a class
///
/// Configs the class does not know share the mixin's property. When the
/// class already has a value, it wins unless the property merges, in which
/// case the class value is merged over the mixin's.
pub(crate) fn mix_configs(class: &ClassRef, mixin: &ClassRef) -> ClassResult<()> {
    let target = Value::Class(class.clone());
    let plan = init_plan(mixin);
    for entry in plan.entries() {
        match class.find_config(&entry.name) {
            None => {
                let mut configurator = class.configurator_mut();
                configurator
                    .configs
                    .insert(entry.name.clone(), entry.property.clone());
                configurator.order.push(entry.name.clone());
                configurator
                    .values
                    .insert(entry.name.clone(), entry.default.clone());
                drop(configurator);
                install_accessors(class, &entry.property);
            }
            Some(property) => {
                let current = class.config_default(&entry.name);
                let value = if current.is_undefined() {
                    entry.default.clone()
                } else if property.merge().is_some() {
                    property.merge_values(current, entry.default.clone(), &target, Some(mixin))?
                } else {
                    continue;
                };
                class
                    .configurator_mut()
                    .values
                    .insert(entry.name.clone(), value);
            }
        }
    }
    class.bump();
    Ok(())
}

// ============================================================================
// Instance configuration
// ============================================================================

fn undeclared(instance: &InstanceRef, accessor: String) -> ClassError {
    ClassError::MethodNotFound {
        class: instance.class().display_name().to_string(),
        method: accessor,
    }
}

fn read_stored(instance: &InstanceRef, entry: &PlanEntry) -> Value {
    if let Some(value) = instance.own(&entry.property.names().internal) {
        return value;
    }
    let cached = instance
        .class()
        .configurator()
        .cached_value(&entry.name)
        .cloned();
    cached.unwrap_or(Value::Null)
}

/// Apply an instance config object
///
/// Instance values are merged over class defaults, keys that are not
/// configs become own properties, then every non-lazy config is pushed
/// through its setter in init order. Lazy configs and configs not reached
/// yet stay pending and initialise on first read.
pub(crate) fn configure(instance: &InstanceRef, config: Option<&PropertyMap>) -> ClassResult<()> {
    instance.config_state().configuring = true;
    let result = run_configure(instance, config);
    let mut state = instance.config_state();
    state.configuring = false;
    state.configured = true;
    if result.is_err() {
        state.pending = PropertyMap::new();
    }
    result
}

fn run_configure(instance: &InstanceRef, config: Option<&PropertyMap>) -> ClassResult<()> {
    let class = instance.class().clone();
    let plan = init_plan(&class);
    let this = Value::Instance(instance.clone());

    let mut merged = PropertyMap::new();
    let mut explicit = FxHashSet::default();
    if let Some(config) = config {
        for (key, value) in config.iter() {
            match plan.get(key) {
                Some(entry) => {
                    let base = merged
                        .get(key)
                        .cloned()
                        .unwrap_or_else(|| entry.default.clone());
                    let value = entry.property.merge_values(value.clone(), base, &this, None)?;
                    merged.insert(key, value);
                    explicit.insert(key.to_string());
                }
                None => instance.set(key, value.clone()),
            }
        }
    }

    let cached_ready: FxHashSet<String> = class
        .configurator()
        .cached
        .keys()
        .map(str::to_string)
        .collect();
    let mut pending = PropertyMap::new();
    for entry in plan.entries() {
        if let Some(value) = merged.get(&entry.name) {
            pending.insert(entry.name.clone(), value.clone());
            continue;
        }
        match entry.kind {
            InitKind::Skip => {}
            InitKind::Cached if cached_ready.contains(&entry.name) => {}
            _ => {
                pending.insert(entry.name.clone(), entry.default.clone());
            }
        }
    }
    instance.config_state().pending = pending;

    for entry in plan.entries() {
        if entry.property.is_lazy() {
            continue;
        }
        init_pending(instance, entry)?;
    }

    for entry in plan.entries() {
        let promote = entry.kind == InitKind::Cached
            && !entry.property.is_lazy()
            && !explicit.contains(&entry.name)
            && !cached_ready.contains(&entry.name);
        if !promote {
            continue;
        }
        if let Some(value) = instance.remove_own(&entry.property.names().internal) {
            class
                .configurator_mut()
                .cached
                .insert(entry.name.clone(), value);
        }
    }
    Ok(())
}

fn init_pending(instance: &InstanceRef, entry: &PlanEntry) -> ClassResult<()> {
    let value = instance.config_state().pending.remove(&entry.name);
    let value = match value {
        Some(value) => value,
        None => return Ok(()),
    };
    instance
        .config_state()
        .initializing
        .insert(entry.name.clone());
    let result = set_value(instance, entry, value);
    instance.config_state().initializing.remove(&entry.name);
    result
}

/// Read a config, initialising it first if it is still pending
pub(crate) fn get_config(instance: &InstanceRef, name: &str) -> ClassResult<Value> {
    let plan = init_plan(instance.class());
    let entry = plan
        .get(name)
        .ok_or_else(|| undeclared(instance, super::ConfigNames::new(name).get))?;
    let needs_init = {
        let state = instance.config_state();
        state.pending.contains_key(name) && !state.initializing.contains(name)
    };
    if needs_init {
        init_pending(instance, entry)?;
    }
    Ok(read_stored(instance, entry))
}

/// Set a config through its applier and updater
pub(crate) fn set_config(instance: &InstanceRef, name: &str, value: Value) -> ClassResult<()> {
    let plan = init_plan(instance.class());
    let entry = plan
        .get(name)
        .ok_or_else(|| undeclared(instance, super::ConfigNames::new(name).set))?;
    instance.config_state().pending.remove(name);
    set_value(instance, entry, value)
}

fn set_value(instance: &InstanceRef, entry: &PlanEntry, value: Value) -> ClassResult<()> {
    let names = entry.property.names();
    let class = instance.class().clone();
    let this = Value::Instance(instance.clone());

    let value = match class.find_method(&names.apply) {
        Some(applier) => {
            let old = read_stored(instance, entry);
            let applied = invoke(&applier, &this, &[value, old])?;
            if applied.is_undefined() {
                return Ok(());
            }
            applied
        }
        None => value,
    };

    let old = read_stored(instance, entry);
    instance.set(&names.internal, value.clone());
    if !value.same_value(&old) {
        if let Some(updater) = class.find_method(&names.update) {
            invoke(&updater, &this, &[value, old])?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MergeStrategy;
    use std::cell::RefCell;

    fn class_with(name: &str, decls: Vec<(&str, ConfigDecl)>) -> ClassRef {
        let class = ClassRef::new(Some(name));
        let decls: Vec<(String, ConfigDecl)> =
            decls.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        add_configs(&class, &decls).unwrap();
        class
    }

    fn subclass(name: &str, parent: &ClassRef) -> ClassRef {
        let class = ClassRef::new(Some(name));
        class.set_superclass(parent.clone()).unwrap();
        class
    }

    #[test]
    fn test_generated_accessors() {
        let class = class_with("A", vec![("foo", ConfigDecl::new(1))]);
        assert!(class.own_method("getFoo").unwrap().is_generated());
        assert!(class.own_method("setFoo").unwrap().is_generated());

        let a = class.instantiate(&[]).unwrap();
        assert_eq!(a.call("getFoo", &[]).unwrap(), Value::from(1));
        a.call("setFoo", &[Value::from(5)]).unwrap();
        assert_eq!(a.call("getFoo", &[]).unwrap(), Value::from(5));
    }

    #[test]
    fn test_subclass_options_do_not_touch_parent() {
        let a = class_with("A", vec![("foo", ConfigDecl::new(1))]);
        let b = subclass("B", &a);
        add_configs(&b, &[("foo".to_string(), ConfigDecl::new(2).lazy(true))]).unwrap();

        let parent_prop = a.find_config("foo").unwrap();
        let child_prop = b.find_config("foo").unwrap();
        assert!(!parent_prop.is_lazy());
        assert!(child_prop.is_lazy());
        assert!(Rc::ptr_eq(child_prop.parent().unwrap(), &parent_prop));
        assert_eq!(a.config_default("foo"), Value::from(1));
        assert_eq!(b.config_default("foo"), Value::from(2));
    }

    #[test]
    fn test_raw_value_shares_parent_property() {
        let a = class_with("A", vec![("foo", ConfigDecl::new(1))]);
        let b = subclass("B", &a);
        add_configs(&b, &[("foo".to_string(), ConfigDecl::new(3))]).unwrap();

        assert!(Rc::ptr_eq(&a.find_config("foo").unwrap(), &b.find_config("foo").unwrap()));
        assert!(b.own_method("getFoo").is_none());
    }

    #[test]
    fn test_init_order_is_superclass_first() {
        let a = class_with("A", vec![("x", ConfigDecl::new(1)), ("y", ConfigDecl::new(2))]);
        let b = subclass("B", &a);
        add_configs(
            &b,
            &[
                ("z".to_string(), ConfigDecl::new(3)),
                ("x".to_string(), ConfigDecl::new(4)),
            ],
        )
        .unwrap();

        assert_eq!(b.config_names(), vec!["x", "y", "z"]);
    }

    #[test]
    fn test_init_kinds() {
        let class = class_with(
            "K",
            vec![
                ("empty", ConfigDecl::new(Value::Null)),
                ("plain", ConfigDecl::new(1)),
                ("shared", ConfigDecl::new(2).cached(true)),
                ("hooked", ConfigDecl::new(Value::Null)),
            ],
        );
        class.add_member("applyHooked", Value::function(|_, args| Ok(args[0].clone())));

        assert_eq!(class.init_kind("empty"), Some(InitKind::Skip));
        assert_eq!(class.init_kind("plain"), Some(InitKind::PerInstance));
        assert_eq!(class.init_kind("shared"), Some(InitKind::Cached));
        assert_eq!(class.init_kind("hooked"), Some(InitKind::PerInstance));
        assert_eq!(class.init_kind("missing"), None);
    }

    #[test]
    fn test_applier_undefined_keeps_old_value() {
        let class = class_with("A", vec![("size", ConfigDecl::new(1))]);
        class.add_member(
            "applySize",
            Value::function(|_, args| {
                if args[0].as_number().map_or(false, |n| n < 0.0) {
                    Ok(Value::Undefined)
                } else {
                    Ok(args[0].clone())
                }
            }),
        );
        let a = class.instantiate(&[]).unwrap();
        a.set_config("size", Value::from(-1)).unwrap();
        assert_eq!(a.get_config("size").unwrap(), Value::from(1));
    }

    #[test]
    fn test_updater_runs_only_on_change() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let class = class_with("A", vec![("title", ConfigDecl::new("a"))]);
        let log = calls.clone();
        class.add_member(
            "updateTitle",
            Value::function(move |_, args| {
                log.borrow_mut().push((args[0].clone(), args[1].clone()));
                Ok(Value::Undefined)
            }),
        );

        let a = class.instantiate(&[]).unwrap();
        a.set_config("title", Value::from("a")).unwrap();
        a.set_config("title", Value::from("b")).unwrap();

        let calls = calls.borrow();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], (Value::from("a"), Value::Null));
        assert_eq!(calls[1], (Value::from("b"), Value::from("a")));
    }

    #[test]
    fn test_lazy_config_initialises_on_first_read() {
        let applied = Rc::new(RefCell::new(0));
        let class = class_with("A", vec![("data", ConfigDecl::new(7).lazy(true))]);
        let counter = applied.clone();
        class.add_member(
            "applyData",
            Value::function(move |_, args| {
                *counter.borrow_mut() += 1;
                Ok(args[0].clone())
            }),
        );

        let a = class.instantiate(&[]).unwrap();
        assert_eq!(*applied.borrow(), 0);
        assert_eq!(a.get_config("data").unwrap(), Value::from(7));
        assert_eq!(a.get_config("data").unwrap(), Value::from(7));
        assert_eq!(*applied.borrow(), 1);
    }

    #[test]
    fn test_applier_can_read_later_config_on_demand() {
        let class = class_with(
            "A",
            vec![("label", ConfigDecl::new("x")), ("prefix", ConfigDecl::new(">"))],
        );
        class.add_member(
            "applyLabel",
            Value::function(|inv, args| {
                let prefix = inv.get_config("prefix")?;
                Ok(Value::str(format!(
                    "{}{}",
                    prefix.as_str().unwrap_or(""),
                    args[0].as_str().unwrap_or("")
                )))
            }),
        );

        let a = class.instantiate(&[]).unwrap();
        assert_eq!(a.get_config("label").unwrap(), Value::from(">x"));
    }

    #[test]
    fn test_cached_value_is_promoted_once() {
        let applied = Rc::new(RefCell::new(0));
        let class = class_with("A", vec![("table", ConfigDecl::new(1).cached(true))]);
        let counter = applied.clone();
        class.add_member(
            "applyTable",
            Value::function(move |_, args| {
                *counter.borrow_mut() += 1;
                Ok(Value::from(args[0].as_number().unwrap_or(0.0) * 10.0))
            }),
        );

        let first = class.instantiate(&[]).unwrap();
        let second = class.instantiate(&[]).unwrap();

        assert_eq!(*applied.borrow(), 1);
        assert_eq!(first.get_config("table").unwrap(), Value::from(10));
        assert_eq!(second.get_config("table").unwrap(), Value::from(10));
        assert!(!second.has_own("_table"));
        assert_eq!(class.configurator().cached_value("table"), Some(&Value::from(10)));
    }

    #[test]
    fn test_plan_rebuilds_when_chain_changes() {
        let a = class_with("A", vec![("x", ConfigDecl::new(1))]);
        let b = subclass("B", &a);
        assert_eq!(b.config_names(), vec!["x"]);

        add_configs(&a, &[("y".to_string(), ConfigDecl::new(2))]).unwrap();
        assert_eq!(b.config_names(), vec!["x", "y"]);
    }

    #[test]
    fn test_instance_merge_uses_strategy() {
        let class = class_with(
            "A",
            vec![(
                "listeners",
                ConfigDecl::new(Value::array(vec![Value::from("class")]))
                    .merge(MergeStrategy::Concat),
            )],
        );
        let a = class.instantiate(&[]).unwrap();
        a.config_state().configured = false;
        let cfg = PropertyMap::new().with("listeners", Value::array(vec![Value::from("inst")]));
        a.init_config(Some(&Value::object(cfg))).unwrap();

        assert_eq!(
            a.get_config("listeners").unwrap(),
            Value::array(vec![Value::from("class"), Value::from("inst")])
        );
    }

    #[test]
    fn test_mixin_configs_yield_to_class() {
        let mixin = class_with("M", vec![("a", ConfigDecl::new(1)), ("b", ConfigDecl::new(2))]);
        let class = class_with("C", vec![("a", ConfigDecl::new(10))]);
        mix_configs(&class, &mixin).unwrap();

        assert_eq!(class.config_default("a"), Value::from(10));
        assert_eq!(class.config_default("b"), Value::from(2));
        assert!(Rc::ptr_eq(&class.find_config("b").unwrap(), &mixin.find_config("b").unwrap()));
        assert_eq!(class.config_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_undeclared_accessor_is_not_a_function() {
        let class = class_with("A", vec![]);
        let a = class.instantiate(&[]).unwrap();
        let err = a.get_config("nope").unwrap_err();
        assert_eq!(err.to_string(), "A.getNope is not a function");
    }
}

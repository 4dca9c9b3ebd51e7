//! Class instances

use super::{invoke, ClassRef, Invocation};
use crate::config::configurator;
use crate::value::{PropertyMap, Value};
use crate::{ClassError, ClassResult};
use rustc_hash::FxHashSet;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for generating unique instance IDs
static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// Per-instance config bookkeeping
#[derive(Debug, Default)]
pub(crate) struct ConfigState {
    /// Inside `init_config`
    pub(crate) configuring: bool,
    /// `init_config` has completed once
    pub(crate) configured: bool,
    /// Merged values not yet pushed through their setter
    pub(crate) pending: PropertyMap,
    /// Configs whose setter is currently running from initialisation
    pub(crate) initializing: FxHashSet<String>,
}

struct Instance {
    id: u64,
    class: ClassRef,
    props: RefCell<PropertyMap>,
    config: RefCell<ConfigState>,
}

/// Shared handle to an instance
#[derive(Clone)]
pub struct InstanceRef(Rc<Instance>);

impl InstanceRef {
    pub(crate) fn new(class: ClassRef) -> Self {
        InstanceRef(Rc::new(Instance {
            id: NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed),
            class,
            props: RefCell::new(PropertyMap::new()),
            config: RefCell::new(ConfigState::default()),
        }))
    }

    /// Unique instance ID
    pub fn id(&self) -> u64 {
        self.0.id
    }

    /// Class this instance was created from
    pub fn class(&self) -> &ClassRef {
        &self.0.class
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &InstanceRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    // ===== Properties =====

    /// Read a property: own value first, then the prototype chain
    pub fn get(&self, name: &str) -> Value {
        if let Some(value) = self.own(name) {
            return value;
        }
        self.0
            .class
            .find_member(name)
            .map(|m| m.to_value())
            .unwrap_or_default()
    }

    /// Own property, if set
    pub fn own(&self, name: &str) -> Option<Value> {
        self.0.props.borrow().get(name).cloned()
    }

    /// True if the property is set on the instance itself
    pub fn has_own(&self, name: &str) -> bool {
        self.0.props.borrow().contains_key(name)
    }

    /// Write an own property
    pub fn set(&self, name: &str, value: Value) {
        self.0.props.borrow_mut().insert(name, value);
    }

    pub(crate) fn remove_own(&self, name: &str) -> Option<Value> {
        self.0.props.borrow_mut().remove(name)
    }

    /// Call a method: own function properties shadow prototype methods
    pub fn call(&self, name: &str, args: &[Value]) -> ClassResult<Value> {
        let this = Value::Instance(self.clone());
        if let Some(Value::Function(f)) = self.own(name) {
            return f.call(&Invocation::detached(this), args);
        }
        match self.0.class.find_method(name) {
            Some(method) => invoke(&method, &this, args),
            None => Err(ClassError::MethodNotFound {
                class: self.0.class.display_name().to_string(),
                method: name.to_string(),
            }),
        }
    }

    // ===== Config =====

    /// Run the configurator with an optional instance config object
    ///
    /// A second call after a completed initialisation is a no-op.
    pub fn init_config(&self, config: Option<&Value>) -> ClassResult<()> {
        if self.0.config.borrow().configured {
            return Ok(());
        }
        match config {
            None | Some(Value::Undefined) | Some(Value::Null) => {
                configurator::configure(self, None)
            }
            Some(Value::Object(map)) => configurator::configure(self, Some(map)),
            Some(other) => Err(ClassError::TypeError(format!(
                "instance config must be an object, got {}",
                other.type_name()
            ))),
        }
    }

    /// Current value of a config, initialising it on demand
    pub fn get_config(&self, name: &str) -> ClassResult<Value> {
        configurator::get_config(self, name)
    }

    /// Push a value through the config's applier/updater
    pub fn set_config(&self, name: &str, value: Value) -> ClassResult<()> {
        configurator::set_config(self, name, value)
    }

    /// Set several configs in map order
    pub fn set_configs(&self, values: &PropertyMap) -> ClassResult<()> {
        for (name, value) in values.iter() {
            self.set_config(name, value.clone())?;
        }
        Ok(())
    }

    /// Every config of the class with its current value, in init order
    pub fn get_configs(&self) -> ClassResult<PropertyMap> {
        let mut out = PropertyMap::new();
        for name in configurator::init_plan(&self.0.class).names() {
            out.insert(name.clone(), self.get_config(name)?);
        }
        Ok(out)
    }

    /// True while `init_config` is running
    pub fn is_configuring(&self) -> bool {
        self.0.config.borrow().configuring
    }

    /// True while the named config is being initialised
    pub fn is_initializing(&self, name: &str) -> bool {
        self.0.config.borrow().initializing.contains(name)
    }

    pub(crate) fn config_state(&self) -> std::cell::RefMut<'_, ConfigState> {
        self.0.config.borrow_mut()
    }

    // ===== Type checks =====

    /// Short-name is-a check
    pub fn is_xtype(&self, xtype: &str) -> bool {
        self.0.class.is_xtype(xtype)
    }

    /// True if the instance's class is `class` or derives from it
    pub fn is_instance_of(&self, class: &ClassRef) -> bool {
        self.0.class.is_subclass_of(class)
    }

    /// True if the class (or an ancestor) mixed in `key`
    pub fn has_mixin(&self, key: &str) -> bool {
        self.0.class.has_mixin(key)
    }
}

impl fmt::Debug for InstanceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "InstanceRef({}#{})",
            self.0.class.display_name(),
            self.0.id
        )
    }
}

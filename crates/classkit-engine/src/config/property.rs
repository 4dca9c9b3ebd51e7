//! Config property descriptors
//!
//! A [`ConfigProperty`] describes how one named config behaves: whether it
//! is lazy or cached and how values merge. Subclasses that change options
//! get a new property chained to the inherited one; unset options fall
//! through to the parent, so the parent definition is never touched.

use crate::object::{ClassRef, Invocation};
use crate::value::{Function, PropertyMap, Value};
use crate::{ClassError, ClassResult};
use std::fmt;
use std::rc::Rc;

/// Member names derived from a config name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigNames {
    /// Instance storage slot (`_foo`)
    pub internal: String,
    /// Getter (`getFoo`)
    pub get: String,
    /// Setter (`setFoo`)
    pub set: String,
    /// Applier hook (`applyFoo`)
    pub apply: String,
    /// Updater hook (`updateFoo`)
    pub update: String,
    /// Initialising guard flag (`isFooInitializing`)
    pub initializing: String,
    /// Change event name (`foochange`)
    pub change_event: String,
}

impl ConfigNames {
    /// Derive names for a config
    pub fn new(name: &str) -> Self {
        let cap = capitalize(name);
        Self {
            internal: format!("_{}", name),
            get: format!("get{}", cap),
            set: format!("set{}", cap),
            apply: format!("apply{}", cap),
            update: format!("update{}", cap),
            initializing: format!("is{}Initializing", cap),
            change_event: format!("{}change", name.to_lowercase()),
        }
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// How a declared value combines with the value it replaces
#[derive(Clone)]
pub enum MergeStrategy {
    /// New value wins outright
    Replace,
    /// Arrays accumulate, older values first
    Concat,
    /// Objects merge recursively, new keys over old
    Objects,
    /// Native merge function called as `(new, old, target, mixin)`
    Custom(Function),
}

impl MergeStrategy {
    /// Strategy from its declaration name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "replace" => Some(MergeStrategy::Replace),
            "concat" => Some(MergeStrategy::Concat),
            "objects" => Some(MergeStrategy::Objects),
            _ => None,
        }
    }

    /// Combine `new` with `old`
    ///
    /// `target` is the class or instance being configured; `mixin` is set
    /// when the value comes from a mixin.
    pub fn apply(
        &self,
        config: &str,
        new: Value,
        old: Value,
        target: &Value,
        mixin: Option<&ClassRef>,
    ) -> ClassResult<Value> {
        match self {
            MergeStrategy::Replace => Ok(new),
            MergeStrategy::Concat => Ok(concat(new, old)),
            MergeStrategy::Objects => Ok(merge_objects(new, old)),
            MergeStrategy::Custom(f) => {
                let args = [
                    new,
                    old,
                    target.clone(),
                    mixin.cloned().map(Value::Class).unwrap_or(Value::Null),
                ];
                f.call(&Invocation::detached(target.clone()), &args)
                    .map_err(|e| ClassError::MergeFailed {
                        config: config.to_string(),
                        reason: e.to_string(),
                    })
            }
        }
    }
}

impl fmt::Debug for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeStrategy::Replace => f.write_str("Replace"),
            MergeStrategy::Concat => f.write_str("Concat"),
            MergeStrategy::Objects => f.write_str("Objects"),
            MergeStrategy::Custom(_) => f.write_str("Custom"),
        }
    }
}

fn as_items(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.as_ref().clone(),
        other => vec![other],
    }
}

fn concat(new: Value, old: Value) -> Value {
    if old.is_nullish() {
        return new;
    }
    if new.is_nullish() {
        return old;
    }
    let mut items = as_items(old);
    items.extend(as_items(new));
    Value::array(items)
}

fn merge_objects(new: Value, old: Value) -> Value {
    match (new, old) {
        (Value::Object(new_map), Value::Object(old_map)) => {
            let mut merged: PropertyMap = old_map.as_ref().clone();
            for (key, value) in new_map.iter() {
                let combined = match merged.get(key) {
                    Some(existing) => merge_objects(value.clone(), existing.clone()),
                    None => value.clone(),
                };
                merged.insert(key, combined);
            }
            Value::object(merged)
        }
        (Value::Undefined, old) => old,
        (new, _) => new,
    }
}

/// Options overlay for a config declaration
#[derive(Debug, Clone, Default)]
pub struct ConfigOptions {
    /// Defer initialisation to first read
    pub lazy: Option<bool>,
    /// Promote the first instance's value to the class
    pub cached: Option<bool>,
    /// Merge strategy
    pub merge: Option<MergeStrategy>,
}

impl ConfigOptions {
    /// True if no option is set
    pub fn is_empty(&self) -> bool {
        self.lazy.is_none() && self.cached.is_none() && self.merge.is_none()
    }
}

/// One named config and its behaviour
pub struct ConfigProperty {
    name: String,
    names: Rc<ConfigNames>,
    options: ConfigOptions,
    parent: Option<Rc<ConfigProperty>>,
}

impl ConfigProperty {
    /// Fresh property with the given options
    pub fn new(name: &str, options: ConfigOptions) -> Self {
        Self {
            name: name.to_string(),
            names: Rc::new(ConfigNames::new(name)),
            options,
            parent: None,
        }
    }

    /// Property chained to `parent`, overlaying `options`
    pub fn chained(parent: &Rc<ConfigProperty>, options: ConfigOptions) -> Self {
        Self {
            name: parent.name.clone(),
            names: parent.names.clone(),
            options,
            parent: Some(parent.clone()),
        }
    }

    /// Config name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Derived member names
    pub fn names(&self) -> &ConfigNames {
        &self.names
    }

    /// Inherited property this one overlays
    pub fn parent(&self) -> Option<&Rc<ConfigProperty>> {
        self.parent.as_ref()
    }

    /// Lazy flag, falling back to the parent
    pub fn is_lazy(&self) -> bool {
        self.options
            .lazy
            .or_else(|| self.parent.as_ref().map(|p| p.is_lazy()))
            .unwrap_or(false)
    }

    /// Cached flag, falling back to the parent
    pub fn is_cached(&self) -> bool {
        self.options
            .cached
            .or_else(|| self.parent.as_ref().map(|p| p.is_cached()))
            .unwrap_or(false)
    }

    /// Merge strategy, falling back to the parent
    pub fn merge(&self) -> Option<MergeStrategy> {
        self.options
            .merge
            .clone()
            .or_else(|| self.parent.as_ref().and_then(|p| p.merge()))
    }

    /// Merge `new` over `old` with this property's strategy (replace if none)
    pub fn merge_values(
        &self,
        new: Value,
        old: Value,
        target: &Value,
        mixin: Option<&ClassRef>,
    ) -> ClassResult<Value> {
        match self.merge() {
            Some(strategy) => strategy.apply(&self.name, new, old, target, mixin),
            None => Ok(new),
        }
    }
}

impl fmt::Debug for ConfigProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigProperty")
            .field("name", &self.name)
            .field("lazy", &self.is_lazy())
            .field("cached", &self.is_cached())
            .field("merge", &self.merge())
            .field("chained", &self.parent.is_some())
            .finish()
    }
}

/// A config entry as declared: default value plus options
#[derive(Debug, Clone, Default)]
pub struct ConfigDecl {
    /// Default value
    pub value: Value,
    /// Option overlay
    pub options: ConfigOptions,
}

impl ConfigDecl {
    /// Plain default value without options
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            options: ConfigOptions::default(),
        }
    }

    /// Set the lazy option
    pub fn lazy(mut self, lazy: bool) -> Self {
        self.options.lazy = Some(lazy);
        self
    }

    /// Set the cached option
    pub fn cached(mut self, cached: bool) -> Self {
        self.options.cached = Some(cached);
        self
    }

    /// Set the merge strategy
    pub fn merge(mut self, strategy: MergeStrategy) -> Self {
        self.options.merge = Some(strategy);
        self
    }

    /// True if the declaration carries options (not just a raw value)
    pub fn has_options(&self) -> bool {
        !self.options.is_empty()
    }

    /// Parse a declared value
    ///
    /// Objects carrying `$value` are option blocks:
    /// `{"$value": 2, "lazy": true, "merge": "concat"}`. Anything else is a
    /// raw default.
    pub fn from_value(name: &str, value: &Value) -> ClassResult<Self> {
        let map = match value {
            Value::Object(map) if map.contains_key("$value") => map,
            other => return Ok(ConfigDecl::new(other.clone())),
        };
        let mut decl = ConfigDecl::new(map.get("$value").cloned().unwrap_or_default());
        if let Some(lazy) = map.get("lazy") {
            decl.options.lazy = Some(lazy.is_truthy());
        }
        if let Some(cached) = map.get("cached") {
            decl.options.cached = Some(cached.is_truthy());
        }
        match map.get("merge") {
            None | Some(Value::Undefined) | Some(Value::Null) => {}
            Some(Value::Str(s)) => {
                let strategy = MergeStrategy::from_name(s).ok_or_else(|| {
                    ClassError::InvalidDeclaration(format!(
                        "config {}: unknown merge strategy {:?}",
                        name, s
                    ))
                })?;
                decl.options.merge = Some(strategy);
            }
            Some(Value::Function(f)) => decl.options.merge = Some(MergeStrategy::Custom(f.clone())),
            Some(other) => {
                return Err(ClassError::InvalidDeclaration(format!(
                    "config {}: merge must be a name or function, got {}",
                    name,
                    other.type_name()
                )))
            }
        }
        Ok(decl)
    }
}

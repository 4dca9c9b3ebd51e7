//! Class manager
//!
//! The façade over the builder and the inventory. `define` runs the
//! preprocessor pipeline; if a dependency is missing the build is parked as
//! a listener on that class's creation and resumed later. Overrides wait
//! the same way for their target. Every manager is an independent
//! registry: there is no global state.

mod listeners;
mod overrides;
mod postprocessors;
mod state;

pub use postprocessors::Postprocessor;
pub use state::{ClassState, DefineOutcome};

use crate::builder::{place, BuildEnv, BuildJob, ClassBuilder, ClassDef, Flow, Position, Preprocessor};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::inventory::Inventory;
use crate::loader::{LoadError, LoadOutcome, LoadRequest, Loader, LoaderManifest};
use crate::object::{ClassRef, InstanceRef};
use crate::value::{PropertyMap, Value};
use crate::{ClassError, ClassResult};
use listeners::{Action, CreatedCallback, Listener};
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;
use std::rc::Rc;

/// Name of the root class
pub const BASE_CLASS: &str = "Base";

/// Name of the root mixin class (enables `mixinConfig` hooks)
pub const MIXIN_CLASS: &str = "Mixin";

/// Class registry and lifecycle driver
pub struct ClassManager {
    inventory: Inventory,
    diagnostics: Diagnostics,
    builder: ClassBuilder,
    postprocessors: FxHashMap<String, Rc<dyn Postprocessor>>,
    postprocessor_order: Vec<String>,
    /// Registered classes (or singleton instances) by canonical name
    classes: FxHashMap<String, Value>,
    /// Names whose creation has completed, including overrides
    created: FxHashSet<String>,
    states: FxHashMap<String, ClassState>,
    listeners: Vec<Listener>,
    loader: Option<Box<dyn Loader>>,
    sync_loading: bool,
    /// Names being loaded right now
    loading: FxHashSet<String>,
    base: ClassRef,
    mixin: ClassRef,
}

impl Default for ClassManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassManager {
    /// Create a registry holding only `Base` and `Mixin`
    pub fn new() -> Self {
        let diagnostics = Diagnostics::new();
        let base = bootstrap_base();
        let mixin = ClassRef::with_superclass(MIXIN_CLASS, base.clone());

        let mut manager = Self {
            inventory: Inventory::new(diagnostics.clone()),
            diagnostics,
            builder: ClassBuilder::new(),
            postprocessors: FxHashMap::default(),
            postprocessor_order: Vec::new(),
            classes: FxHashMap::default(),
            created: FxHashSet::default(),
            states: FxHashMap::default(),
            listeners: Vec::new(),
            loader: None,
            sync_loading: true,
            loading: FxHashSet::default(),
            base: base.clone(),
            mixin: mixin.clone(),
        };
        for postprocessor in postprocessors::defaults() {
            manager.register_postprocessor(postprocessor, Position::Last);
        }
        for class in [base, mixin] {
            let name = class.display_name().to_string();
            manager.inventory.add_builtin_name(&name);
            manager.classes.insert(name.clone(), Value::Class(class));
            manager.created.insert(name.clone());
            manager.states.insert(name, ClassState::Ready);
        }
        manager
    }

    // ========================================================================
    // Setup
    // ========================================================================

    /// Install the loader used for missing classes
    pub fn set_loader(&mut self, loader: impl Loader + 'static) {
        self.loader = Some(Box::new(loader));
    }

    /// Allow or forbid synchronous loading fallbacks
    pub fn set_sync_loading(&mut self, enabled: bool) {
        self.sync_loading = enabled;
    }

    /// Copy a manifest's paths into the inventory and adopt its `sync` flag
    pub fn apply_manifest(&mut self, manifest: &LoaderManifest) -> ClassResult<()> {
        manifest.apply(&mut self.inventory)?;
        self.sync_loading = manifest.loader.sync;
        Ok(())
    }

    /// Register (or move) a preprocessor
    pub fn register_preprocessor(&mut self, preprocessor: Rc<dyn Preprocessor>, position: Position) {
        self.builder.register(preprocessor, position);
    }

    /// Register (or move) a postprocessor
    pub fn register_postprocessor(
        &mut self,
        postprocessor: Rc<dyn Postprocessor>,
        position: Position,
    ) {
        let name = postprocessor.name().to_string();
        place(&mut self.postprocessor_order, &name, &position);
        self.postprocessors.insert(name, postprocessor);
    }

    /// Postprocessor names in default order
    pub fn postprocessor_order(&self) -> &[String] {
        &self.postprocessor_order
    }

    /// Class builder
    pub fn builder(&self) -> &ClassBuilder {
        &self.builder
    }

    /// Name registry
    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    /// Mutable name registry
    pub fn inventory_mut(&mut self) -> &mut Inventory {
        &mut self.inventory
    }

    /// Warning sink shared with the inventory
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Root `Base` class
    pub fn base_class(&self) -> ClassRef {
        self.base.clone()
    }

    /// Root `Mixin` class
    pub fn mixin_class(&self) -> ClassRef {
        self.mixin.clone()
    }

    // ========================================================================
    // Define
    // ========================================================================

    /// Define a class (or apply an override)
    ///
    /// `name` falls back to the declaration's `$className`; with neither
    /// the class is anonymous and is never registered.
    pub fn define(&mut self, name: Option<&str>, def: ClassDef) -> ClassResult<DefineOutcome> {
        self.define_inner(name.map(str::to_string), def, None)
    }

    /// Define a class and run `on_created` once it exists
    ///
    /// The callback runs before listeners waiting on the class.
    pub fn define_with<F>(
        &mut self,
        name: Option<&str>,
        def: ClassDef,
        on_created: F,
    ) -> ClassResult<DefineOutcome>
    where
        F: FnOnce(&mut ClassManager, &Value) -> ClassResult<()> + 'static,
    {
        self.define_inner(name.map(str::to_string), def, Some(Box::new(on_created)))
    }

    fn define_inner(
        &mut self,
        name: Option<String>,
        def: ClassDef,
        on_created: Option<CreatedCallback>,
    ) -> ClassResult<DefineOutcome> {
        let name = name.or_else(|| def.name.clone());
        if let Some(name) = &name {
            if name.trim().is_empty() {
                return Err(ClassError::InvalidClassName(name.clone()));
            }
        }
        if let Some(target) = def.override_target.clone() {
            return self.create_override(name, target, def, on_created);
        }

        let job = self.builder.start(name.as_deref(), def)?;
        if let Some(name) = &name {
            if self.classes.contains_key(name) {
                self.diagnostics.warn(
                    DiagnosticKind::DuplicateClass,
                    format!("{} is already defined; replacing it", name),
                );
            }
            self.states.insert(name.clone(), ClassState::Requested);
        }
        self.drive(name, job, on_created)
    }

    /// Run a build job until it completes or suspends
    pub(crate) fn drive(
        &mut self,
        name: Option<String>,
        mut job: BuildJob,
        on_created: Option<CreatedCallback>,
    ) -> ClassResult<DefineOutcome> {
        if let Some(name) = &name {
            self.states.insert(name.clone(), ClassState::Building);
        }
        match ClassBuilder::run(&mut job, self) {
            Err(e) => {
                if let Some(name) = &name {
                    self.mark_failed(name, e.to_string());
                }
                Err(e)
            }
            Ok(Flow::Await(waiting)) => {
                let Some(first) = waiting.first().cloned() else {
                    return Err(ClassError::InvalidDeclaration(format!(
                        "{}: a preprocessor suspended without naming a dependency",
                        job.class().display_name()
                    )));
                };
                if let Some(name) = &name {
                    self.states.insert(
                        name.clone(),
                        ClassState::AwaitingDependencies(waiting.clone()),
                    );
                }
                self.listeners.push(Listener {
                    waiting_on: first,
                    action: Action::ResumeBuild {
                        name,
                        job,
                        on_created,
                    },
                });
                Ok(DefineOutcome::Pending(waiting))
            }
            Ok(Flow::Continue) => self
                .process_create(name, job, on_created)
                .map(DefineOutcome::Ready),
        }
    }

    /// Postprocess, register and announce a built class
    fn process_create(
        &mut self,
        name: Option<String>,
        job: BuildJob,
        on_created: Option<CreatedCallback>,
    ) -> ClassResult<Value> {
        let BuildJob { class, def, .. } = job;
        let mut value = Value::Class(class);
        if let Err(e) = self.run_postprocessors(name.as_deref(), &mut value, &def) {
            if let Some(name) = &name {
                self.mark_failed(name, e.to_string());
            }
            return Err(e);
        }

        if let Some(name) = &name {
            self.inventory.add_name(name)?;
            self.classes.insert(name.clone(), value.clone());
            self.created.insert(name.clone());
            self.states.insert(name.clone(), ClassState::Ready);
        }
        tracing::debug!(
            class = name.as_deref().unwrap_or("(anonymous)"),
            singleton = def.singleton,
            "class created"
        );

        let result = match on_created {
            Some(callback) => callback(self, &value),
            None => Ok(()),
        };
        if let Some(name) = name {
            let mut names = vec![name.clone()];
            names.extend(self.inventory.get_aliases_by_name(&name).iter().cloned());
            names.extend(self.inventory.get_alternates_by_name(&name).iter().cloned());
            self.trigger_created(&names);
        }
        result.map(|_| value)
    }

    fn run_postprocessors(
        &mut self,
        name: Option<&str>,
        value: &mut Value,
        def: &ClassDef,
    ) -> ClassResult<()> {
        let order = def
            .postprocessors
            .clone()
            .unwrap_or_else(|| self.postprocessor_order.clone());
        for step in order {
            let postprocessor = self.postprocessors.get(&step).cloned().ok_or_else(|| {
                ClassError::InvalidDeclaration(format!("unknown postprocessor {:?}", step))
            })?;
            if postprocessor.applies(def) {
                tracing::debug!(
                    class = name.unwrap_or("(anonymous)"),
                    step = %step,
                    "running postprocessor"
                );
                postprocessor.process(self, name, value, def)?;
            }
        }
        Ok(())
    }

    /// Record a failure, keeping an earlier successful definition usable
    pub(crate) fn mark_failed(&mut self, name: &str, reason: String) {
        let state = if self.classes.contains_key(name) {
            ClassState::Ready
        } else {
            ClassState::Failed(reason)
        };
        self.states.insert(name.to_string(), state);
    }

    // ========================================================================
    // Listeners and pending work
    // ========================================================================

    /// Run `callback` once `class_name` is created (immediately if it is)
    pub fn on_created<F>(&mut self, class_name: &str, callback: F) -> ClassResult<()>
    where
        F: FnOnce(&mut ClassManager) -> ClassResult<()> + 'static,
    {
        let resolved = self.inventory.resolve_name(class_name);
        if self.created.contains(&resolved) {
            return callback(self);
        }
        self.listeners.push(Listener {
            waiting_on: resolved,
            action: Action::Callback(Box::new(callback)),
        });
        Ok(())
    }

    /// True once the class (or named override) has been created
    pub fn is_created(&self, name: &str) -> bool {
        self.created.contains(&self.inventory.resolve_name(name))
    }

    /// Lifecycle state of a named class
    pub fn state(&self, name: &str) -> Option<ClassState> {
        self.states.get(&self.inventory.resolve_name(name)).cloned()
    }

    /// True while a named class can still be created
    pub fn is_pending(&self, name: &str) -> bool {
        self.state(name).map(|s| s.is_pending()).unwrap_or(false)
    }

    /// Names of classes and overrides that are not created yet, sorted
    pub fn pending(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .states
            .iter()
            .filter(|(_, state)| state.is_pending())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Warn about every suspended build and override; returns how many
    pub fn report_stalled(&self) -> usize {
        let mut count = 0;
        for listener in &self.listeners {
            match &listener.action {
                Action::Callback(_) => continue,
                Action::ResumeBuild { name, .. } => self.diagnostics.warn(
                    DiagnosticKind::StalledClass,
                    format!(
                        "{} is still waiting for {}",
                        name.as_deref().unwrap_or("(anonymous)"),
                        listener.waiting_on
                    ),
                ),
                Action::ApplyOverride(job) => self.diagnostics.warn(
                    DiagnosticKind::StalledOverride,
                    format!(
                        "override {}of {} was never applied: {} is not created",
                        job.name
                            .as_deref()
                            .map(|n| format!("{} ", n))
                            .unwrap_or_default(),
                        job.target,
                        listener.waiting_on
                    ),
                ),
            }
            count += 1;
        }
        count
    }

    /// Cancel a pending class or override
    ///
    /// Moves it (and everything waiting on it) to [`ClassState::Failed`].
    /// Returns false if nothing with that name was pending.
    pub fn fail_pending(&mut self, name: &str, reason: &str) -> bool {
        let resolved = self.inventory.resolve_name(name);
        if !self.is_pending(&resolved) {
            return false;
        }
        self.listeners
            .retain(|l| l.owner() != Some(resolved.as_str()));
        tracing::warn!(class = %resolved, reason, "pending class cancelled");
        self.mark_failed(&resolved, reason.to_string());
        self.cancel_waiters(&resolved, reason);
        true
    }

    // ========================================================================
    // Lookup and instantiation
    // ========================================================================

    /// Registered value (class or singleton instance) for a name, alias or
    /// alternate name
    pub fn get(&self, name: &str) -> Option<Value> {
        self.classes.get(&self.inventory.resolve_name(name)).cloned()
    }

    /// Registered class for a name, alias or alternate name
    pub fn get_class(&self, name: &str) -> Option<ClassRef> {
        self.get(name).and_then(|v| v.as_class().cloned())
    }

    /// Registered value for an alias
    pub fn get_by_alias(&self, alias: &str) -> Option<Value> {
        match self.inventory.get_name_by_alias(alias) {
            "" => None,
            name => self.classes.get(name).cloned(),
        }
    }

    /// Class name of a class or instance
    pub fn get_name(&self, value: &Value) -> Option<String> {
        match value {
            Value::Class(class) => class.name().map(str::to_string),
            Value::Instance(instance) => instance.class().name().map(str::to_string),
            _ => None,
        }
    }

    /// True if a class or singleton is registered under the name
    pub fn is_defined(&self, name: &str) -> bool {
        self.classes
            .contains_key(&self.inventory.resolve_name(name))
    }

    /// Class for a name, alias or alternate name
    pub fn resolve_class(&self, name: &str) -> ClassResult<ClassRef> {
        match self.get(name) {
            Some(Value::Class(class)) => Ok(class),
            Some(_) => Err(ClassError::NotInstantiable(name.to_string())),
            None => Err(ClassError::ClassNotFound(name.to_string())),
        }
    }

    /// Class for instantiation, loading it synchronously as a last resort
    fn lookup_class(&mut self, name: &str) -> ClassResult<ClassRef> {
        let resolved = self.inventory.resolve_name(name);
        if !self.classes.contains_key(&resolved) {
            if let Some(ClassState::Failed(reason)) = self.states.get(&resolved) {
                return Err(ClassError::Cancelled {
                    name: resolved,
                    reason: reason.clone(),
                });
            }
            self.try_load(&resolved)?;
        }
        self.resolve_class(name)
    }

    /// Instantiate a class by name, alias or alternate name
    pub fn create(&mut self, name: &str, args: &[Value]) -> ClassResult<InstanceRef> {
        self.lookup_class(name)?.instantiate(args)
    }

    /// Instantiate from a config object carrying `xclass` or `xtype`
    ///
    /// The whole object is passed as the instance config.
    pub fn create_from_config(&mut self, config: &PropertyMap) -> ClassResult<InstanceRef> {
        let name = if let Some(xclass) = config.get("xclass") {
            xclass
                .as_str()
                .ok_or_else(|| {
                    ClassError::InvalidDeclaration(format!(
                        "xclass must be a string, got {}",
                        xclass.type_name()
                    ))
                })?
                .to_string()
        } else if let Some(xtype) = config.get("xtype") {
            let xtype = xtype.as_str().ok_or_else(|| {
                ClassError::InvalidDeclaration(format!(
                    "xtype must be a string, got {}",
                    xtype.type_name()
                ))
            })?;
            format!("widget.{}", xtype)
        } else {
            return Err(ClassError::InvalidDeclaration(
                "config object needs an xclass or xtype".to_string(),
            ));
        };
        self.create(&name, &[Value::object(config.clone())])
    }

    /// Instantiate the class registered under an alias
    pub fn instantiate_by_alias(&mut self, alias: &str, args: &[Value]) -> ClassResult<InstanceRef> {
        if self.inventory.get_name_by_alias(alias).is_empty() {
            self.try_load(alias)?;
        }
        let name = self.inventory.get_name_by_alias(alias).to_string();
        if name.is_empty() {
            return Err(ClassError::ClassNotFound(alias.to_string()));
        }
        self.create(&name, args)
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Ask the loader for a missing class; true if it is created afterwards
    ///
    /// A class that is already being loaded, a disabled sync flag or a
    /// missing loader all answer false without error.
    pub fn try_load(&mut self, name: &str) -> ClassResult<bool> {
        let name = self.inventory.resolve_name(name);
        if self.is_created(&name) {
            return Ok(true);
        }
        if !self.sync_loading || self.loading.contains(&name) {
            return Ok(false);
        }
        let request = LoadRequest {
            class_name: name.clone(),
            path: self.inventory.get_path(&name),
        };
        let Some(loader) = self.loader.as_mut() else {
            return Ok(false);
        };
        let outcome = loader.load(&request);

        self.loading.insert(name.clone());
        let result = self.define_loaded(&request, outcome);
        self.loading.remove(&name);
        result?;
        Ok(self.is_created(&name))
    }

    fn define_loaded(
        &mut self,
        request: &LoadRequest,
        outcome: Result<LoadOutcome, LoadError>,
    ) -> ClassResult<()> {
        match outcome {
            Err(LoadError::NotFound { path, .. }) => {
                tracing::debug!(class = %request.class_name, path = %path, "no source to load");
                Ok(())
            }
            Err(e) => Err(e.into()),
            Ok(LoadOutcome::Deferred) => {
                tracing::debug!(class = %request.class_name, "load deferred");
                Ok(())
            }
            Ok(LoadOutcome::Loaded(defs)) => {
                for def in defs {
                    let name = def
                        .name
                        .clone()
                        .unwrap_or_else(|| request.class_name.clone());
                    self.define(Some(&name), def)?;
                }
                Ok(())
            }
        }
    }
}

impl BuildEnv for ClassManager {
    fn resolve_class(&self, name: &str) -> ClassResult<ClassRef> {
        ClassManager::resolve_class(self, name)
    }

    fn is_created(&self, name: &str) -> bool {
        ClassManager::is_created(self, name)
    }

    fn resolve_name(&self, name: &str) -> String {
        self.inventory.resolve_name(name)
    }

    fn try_load(&mut self, name: &str) -> ClassResult<bool> {
        ClassManager::try_load(self, name)
    }

    fn base_class(&self) -> ClassRef {
        self.base.clone()
    }

    fn mixin_class(&self) -> ClassRef {
        self.mixin.clone()
    }

    fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}

impl fmt::Debug for ClassManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassManager")
            .field("classes", &self.classes.len())
            .field("pending", &self.pending())
            .field("listeners", &self.listeners)
            .finish()
    }
}

// ============================================================================
// Bootstrap
// ============================================================================

fn bootstrap_base() -> ClassRef {
    let base = ClassRef::new(Some(BASE_CLASS));
    base.add_member(
        "constructor",
        Value::function(|inv, args| {
            inv.instance()?.init_config(args.first())?;
            Ok(Value::Undefined)
        }),
    );
    base.add_member(
        "initConfig",
        Value::function(|inv, args| {
            inv.instance()?.init_config(args.first())?;
            Ok(inv.this().clone())
        }),
    );
    base.add_member(
        "getConfig",
        Value::function(|inv, args| match args.first() {
            Some(Value::Str(name)) => inv.get_config(name),
            None | Some(Value::Undefined) => {
                Ok(Value::object(inv.instance()?.get_configs()?))
            }
            Some(other) => Err(ClassError::TypeError(format!(
                "getConfig expects a name, got {}",
                other.type_name()
            ))),
        }),
    );
    base.add_member(
        "setConfig",
        Value::function(|inv, args| {
            match args {
                [Value::Object(values), ..] => inv.instance()?.set_configs(values)?,
                [Value::Str(name), value, ..] => inv.set_config(name, value.clone())?,
                [Value::Str(name)] => inv.set_config(name, Value::Undefined)?,
                _ => {
                    return Err(ClassError::TypeError(
                        "setConfig expects an object or a name and a value".to_string(),
                    ))
                }
            }
            Ok(inv.this().clone())
        }),
    );
    base
}

//! Object model and class system
//!
//! A class is a shared [`ClassRef`] holding a prototype (instance members),
//! a static member table, its configurator and the bookkeeping the builder
//! fills in (mixins, aliases, xtypes). Members that are functions become
//! [`Method`]s: each method knows its owner class and optionally a
//! `previous` method. `callParent` walks `previous` first and then the
//! owner's superclass chain, so the order in which overrides and mixin hooks
//! were spliced in is plain data that can be inspected.

mod instance;

pub use instance::InstanceRef;

use crate::builder::{HookKind, MixinConfig};
use crate::config::Configurator;
use crate::value::{Function, PropertyMap, Value};
use crate::{ClassError, ClassResult};
use once_cell::unsync::OnceCell;
use rustc_hash::{FxHashMap, FxHashSet};
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for generating unique class IDs
static NEXT_CLASS_ID: AtomicU64 = AtomicU64::new(1);

/// Whether a method lives on the prototype or on the class itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    /// Prototype member, `this` is an instance
    Instance,
    /// Static member, `this` is the class
    Static,
}

#[derive(Clone)]
pub(crate) enum MethodBody {
    Native(Function),
    ConfigGetter(String),
    ConfigSetter(String),
    Before(Rc<Method>),
    After(Rc<Method>),
}

/// A bound method: name, owner class, body and `callParent` link
pub struct Method {
    name: String,
    owner: Weak<Class>,
    kind: MethodKind,
    pub(crate) body: MethodBody,
    previous: Option<Rc<Method>>,
}

impl Method {
    pub(crate) fn new(
        name: &str,
        owner: &ClassRef,
        kind: MethodKind,
        body: MethodBody,
        previous: Option<Rc<Method>>,
    ) -> Rc<Method> {
        Rc::new(Method {
            name: name.to_string(),
            owner: Rc::downgrade(&owner.0),
            kind,
            body,
            previous,
        })
    }

    /// Method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Owning class, if still alive
    pub fn owner(&self) -> Option<ClassRef> {
        self.owner.upgrade().map(ClassRef)
    }

    /// Instance or static
    pub fn kind(&self) -> MethodKind {
        self.kind
    }

    /// Next method in the explicit `callParent` chain
    pub fn previous(&self) -> Option<&Rc<Method>> {
        self.previous.as_ref()
    }

    /// Hook kind if this method is a before/after wrapper
    pub fn hook_kind(&self) -> Option<HookKind> {
        match self.body {
            MethodBody::Before(_) => Some(HookKind::Before),
            MethodBody::After(_) => Some(HookKind::After),
            _ => None,
        }
    }

    /// True for generated config accessors
    pub fn is_generated(&self) -> bool {
        matches!(
            self.body,
            MethodBody::ConfigGetter(_) | MethodBody::ConfigSetter(_)
        )
    }

    /// Owner names along the `previous` chain, starting with this method
    pub fn chain_owners(self: &Rc<Self>) -> Vec<String> {
        let mut owners = Vec::new();
        let mut current = Some(self.clone());
        while let Some(method) = current {
            owners.push(
                method
                    .owner()
                    .map(|c| c.display_name().to_string())
                    .unwrap_or_default(),
            );
            current = method.previous.clone();
        }
        owners
    }

    /// Same body and owner, different `previous` link
    pub(crate) fn with_previous(&self, previous: Option<Rc<Method>>) -> Rc<Method> {
        Rc::new(Method {
            name: self.name.clone(),
            owner: self.owner.clone(),
            kind: self.kind,
            body: self.body.clone(),
            previous,
        })
    }

    /// Same body, re-owned by another class (used when splicing mixin methods)
    pub(crate) fn rebind(
        &self,
        name: &str,
        owner: &ClassRef,
        previous: Option<Rc<Method>>,
    ) -> Rc<Method> {
        Method::new(name, owner, self.kind, self.body.clone(), previous)
    }

    /// The implementation `callParent` would reach from this method
    pub fn parent(&self) -> Option<Rc<Method>> {
        if let Some(previous) = &self.previous {
            return Some(previous.clone());
        }
        let superclass = self.owner()?.superclass()?;
        match self.kind {
            MethodKind::Instance => superclass.find_method(&self.name),
            MethodKind::Static => superclass
                .ancestors()
                .find_map(|c| c.find_static_method(&self.name)),
        }
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.name)
            .field(
                "owner",
                &self.owner().map(|c| c.display_name().to_string()),
            )
            .field("kind", &self.kind)
            .field("has_previous", &self.previous.is_some())
            .finish()
    }
}

/// Invoke a method against a receiver
pub(crate) fn invoke(method: &Rc<Method>, this: &Value, args: &[Value]) -> ClassResult<Value> {
    let invocation = Invocation {
        this: this.clone(),
        method: Some(method.clone()),
    };
    match &method.body {
        MethodBody::Native(f) => f.call(&invocation, args),
        MethodBody::ConfigGetter(name) => invocation.instance()?.get_config(name),
        MethodBody::ConfigSetter(name) => {
            let value = args.first().cloned().unwrap_or_default();
            invocation.instance()?.set_config(name, value)?;
            Ok(this.clone())
        }
        MethodBody::Before(hook) => {
            let verdict = invoke(hook, this, args)?;
            if matches!(verdict, Value::Bool(false)) {
                return Ok(Value::Undefined);
            }
            match method.parent() {
                Some(target) => invoke(&target, this, args),
                None => Ok(Value::Undefined),
            }
        }
        MethodBody::After(hook) => {
            let result = match method.parent() {
                Some(target) => invoke(&target, this, args)?,
                None => Value::Undefined,
            };
            invoke(hook, this, args)?;
            Ok(result)
        }
    }
}

/// Execution context handed to native methods
///
/// Carries the receiver and the method being executed, which is what
/// `call_parent` needs to find the next implementation.
#[derive(Debug, Clone)]
pub struct Invocation {
    this: Value,
    method: Option<Rc<Method>>,
}

impl Invocation {
    /// Context for calling a function outside any method (merge callbacks,
    /// instance-own functions)
    pub fn detached(this: Value) -> Self {
        Self { this, method: None }
    }

    /// Receiver
    pub fn this(&self) -> &Value {
        &self.this
    }

    /// Receiver as an instance
    pub fn instance(&self) -> ClassResult<&InstanceRef> {
        self.this.as_instance().ok_or_else(|| {
            ClassError::TypeError(format!(
                "expected an instance receiver, got {}",
                self.this.type_name()
            ))
        })
    }

    /// Class of the receiver (the receiver itself for statics)
    pub fn class(&self) -> ClassResult<ClassRef> {
        match &self.this {
            Value::Class(c) => Ok(c.clone()),
            Value::Instance(i) => Ok(i.class().clone()),
            other => Err(ClassError::TypeError(format!(
                "{} has no class",
                other.type_name()
            ))),
        }
    }

    /// Method being executed
    pub fn method(&self) -> Option<&Rc<Method>> {
        self.method.as_ref()
    }

    /// True if `call_parent` has somewhere to go
    pub fn has_parent(&self) -> bool {
        self.method.as_ref().and_then(|m| m.parent()).is_some()
    }

    /// Invoke the next implementation up the chain
    pub fn call_parent(&self, args: &[Value]) -> ClassResult<Value> {
        let method = self.method.as_ref().ok_or_else(|| {
            ClassError::TypeError("callParent used outside a method".to_string())
        })?;
        match method.parent() {
            Some(parent) => invoke(&parent, &self.this, args),
            None => Err(ClassError::NoParentMethod {
                class: method
                    .owner()
                    .map(|c| c.display_name().to_string())
                    .unwrap_or_default(),
                method: method.name.clone(),
            }),
        }
    }

    /// Call another method on the receiver
    pub fn call(&self, name: &str, args: &[Value]) -> ClassResult<Value> {
        match &self.this {
            Value::Instance(i) => i.call(name, args),
            Value::Class(c) => c.call_static(name, args),
            other => Err(ClassError::TypeError(format!(
                "cannot call {} on {}",
                name,
                other.type_name()
            ))),
        }
    }

    /// Read a property of the receiver
    pub fn get(&self, name: &str) -> Value {
        match &self.this {
            Value::Instance(i) => i.get(name),
            Value::Class(c) => c.get_static(name).unwrap_or_default(),
            _ => Value::Undefined,
        }
    }

    /// Write a property of the receiver
    pub fn set(&self, name: &str, value: Value) -> ClassResult<()> {
        match &self.this {
            Value::Instance(i) => {
                i.set(name, value);
                Ok(())
            }
            Value::Class(c) => {
                c.add_static(name, value);
                Ok(())
            }
            other => Err(ClassError::TypeError(format!(
                "cannot set {} on {}",
                name,
                other.type_name()
            ))),
        }
    }

    /// Read a config of the receiving instance
    pub fn get_config(&self, name: &str) -> ClassResult<Value> {
        self.instance()?.get_config(name)
    }

    /// Write a config of the receiving instance
    pub fn set_config(&self, name: &str, value: Value) -> ClassResult<()> {
        self.instance()?.set_config(name, value)
    }
}

/// Prototype or static table entry
#[derive(Debug, Clone)]
pub enum Member {
    /// Callable member
    Method(Rc<Method>),
    /// Plain value member
    Value(Value),
}

impl Member {
    /// The method, if this member is callable
    pub fn as_method(&self) -> Option<&Rc<Method>> {
        match self {
            Member::Method(m) => Some(m),
            Member::Value(_) => None,
        }
    }

    /// The value, if this member is plain data
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Member::Value(v) => Some(v),
            Member::Method(_) => None,
        }
    }

    /// Member as a plain value; generated accessors read as `Undefined`
    pub fn to_value(&self) -> Value {
        match self {
            Member::Value(v) => v.clone(),
            Member::Method(method) => match &method.body {
                MethodBody::Native(f) => Value::Function(f.clone()),
                _ => Value::Undefined,
            },
        }
    }
}

/// Class definition and runtime state
pub struct Class {
    id: u64,
    name: Option<String>,
    superclass: OnceCell<ClassRef>,
    prototype: RefCell<FxHashMap<String, Member>>,
    statics: RefCell<FxHashMap<String, Member>>,
    inheritable_statics: RefCell<Vec<String>>,
    mixins: RefCell<Vec<(String, ClassRef)>>,
    configurator: RefCell<Configurator>,
    aliases: RefCell<Vec<String>>,
    alternate_names: RefCell<Vec<String>>,
    xtypes_chain: RefCell<Vec<String>>,
    xtypes_map: RefCell<FxHashSet<String>>,
    mixin_config: RefCell<Option<MixinConfig>>,
    generation: Cell<u64>,
}

/// Shared handle to a class
#[derive(Clone)]
pub struct ClassRef(Rc<Class>);

impl ClassRef {
    /// Create an empty class shell; the builder wires the rest
    pub fn new(name: Option<&str>) -> Self {
        Self::shell(name, OnceCell::new())
    }

    /// Create an empty class already linked to `parent`
    pub(crate) fn with_superclass(name: &str, parent: ClassRef) -> Self {
        Self::shell(Some(name), OnceCell::with_value(parent))
    }

    fn shell(name: Option<&str>, superclass: OnceCell<ClassRef>) -> Self {
        ClassRef(Rc::new(Class {
            id: NEXT_CLASS_ID.fetch_add(1, Ordering::Relaxed),
            name: name.map(str::to_string),
            superclass,
            prototype: RefCell::new(FxHashMap::default()),
            statics: RefCell::new(FxHashMap::default()),
            inheritable_statics: RefCell::new(Vec::new()),
            mixins: RefCell::new(Vec::new()),
            configurator: RefCell::new(Configurator::new()),
            aliases: RefCell::new(Vec::new()),
            alternate_names: RefCell::new(Vec::new()),
            xtypes_chain: RefCell::new(Vec::new()),
            xtypes_map: RefCell::new(FxHashSet::default()),
            mixin_config: RefCell::new(None),
            generation: Cell::new(0),
        }))
    }

    /// Unique class ID
    pub fn id(&self) -> u64 {
        self.0.id
    }

    /// Class name (`None` for anonymous classes)
    pub fn name(&self) -> Option<&str> {
        self.0.name.as_deref()
    }

    /// Name for messages
    pub fn display_name(&self) -> &str {
        self.0.name.as_deref().unwrap_or("(anonymous)")
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &ClassRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Direct superclass
    pub fn superclass(&self) -> Option<ClassRef> {
        self.0.superclass.get().cloned()
    }

    pub(crate) fn set_superclass(&self, parent: ClassRef) -> ClassResult<()> {
        self.0.superclass.set(parent).map_err(|_| {
            ClassError::InvalidDeclaration(format!(
                "{} already has a superclass",
                self.display_name()
            ))
        })
    }

    /// This class followed by every ancestor, nearest first
    pub fn ancestors(&self) -> impl Iterator<Item = ClassRef> {
        std::iter::successors(Some(self.clone()), |c| c.superclass())
    }

    /// True if `other` is this class or one of its ancestors
    pub fn is_subclass_of(&self, other: &ClassRef) -> bool {
        self.ancestors().any(|c| c.ptr_eq(other))
    }

    /// True if a class named `name` is this class or one of its ancestors
    pub fn extends_name(&self, name: &str) -> bool {
        self.ancestors().any(|c| c.name() == Some(name))
    }

    /// Modification counter, bumped whenever members or configs change
    pub fn generation(&self) -> u64 {
        self.0.generation.get()
    }

    pub(crate) fn bump(&self) {
        self.0.generation.set(self.0.generation.get() + 1);
    }

    // ===== Prototype =====

    /// Add an instance member; functions become methods owned by this class
    pub fn add_member(&self, name: &str, value: Value) {
        let member = match value {
            Value::Function(f) => Member::Method(Method::new(
                name,
                self,
                MethodKind::Instance,
                MethodBody::Native(f),
                None,
            )),
            other => Member::Value(other),
        };
        self.0.prototype.borrow_mut().insert(name.to_string(), member);
        self.bump();
    }

    /// Add every entry of a member map
    pub fn add_members(&self, members: &PropertyMap) {
        for (name, value) in members.iter() {
            self.add_member(name, value.clone());
        }
    }

    /// Replace an instance member, linking the replaced method as `previous`
    pub fn override_member(&self, name: &str, value: Value) {
        let member = match value {
            Value::Function(f) => {
                let previous = self.own_method(name);
                Member::Method(Method::new(
                    name,
                    self,
                    MethodKind::Instance,
                    MethodBody::Native(f),
                    previous,
                ))
            }
            other => Member::Value(other),
        };
        self.0.prototype.borrow_mut().insert(name.to_string(), member);
        self.bump();
    }

    pub(crate) fn insert_member(&self, name: &str, member: Member) {
        self.0.prototype.borrow_mut().insert(name.to_string(), member);
        self.bump();
    }

    pub(crate) fn set_method(&self, name: &str, method: Rc<Method>) {
        self.insert_member(name, Member::Method(method));
    }

    pub(crate) fn remove_own_member(&self, name: &str) -> Option<Member> {
        let removed = self.0.prototype.borrow_mut().remove(name);
        if removed.is_some() {
            self.bump();
        }
        removed
    }

    /// Member defined directly on this class
    pub fn own_member(&self, name: &str) -> Option<Member> {
        self.0.prototype.borrow().get(name).cloned()
    }

    /// Method defined directly on this class
    pub fn own_method(&self, name: &str) -> Option<Rc<Method>> {
        self.0
            .prototype
            .borrow()
            .get(name)
            .and_then(|m| m.as_method().cloned())
    }

    /// True if this class defines `name` itself
    pub fn has_own_member(&self, name: &str) -> bool {
        self.0.prototype.borrow().contains_key(name)
    }

    /// Member lookup through the prototype chain
    pub fn find_member(&self, name: &str) -> Option<Member> {
        self.ancestors().find_map(|c| c.own_member(name))
    }

    /// Method lookup through the prototype chain
    pub fn find_method(&self, name: &str) -> Option<Rc<Method>> {
        self.find_member(name).and_then(|m| m.as_method().cloned())
    }

    /// Names of members defined directly on this class
    pub fn own_member_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.0.prototype.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    /// Members reachable from this class, stopping before `stop`
    ///
    /// Nearest definitions win; used to copy a mixin's behaviour without
    /// dragging in the root class's members.
    pub(crate) fn members_until(&self, stop: &ClassRef) -> Vec<(String, Member)> {
        let mut seen = FxHashSet::default();
        let mut members = Vec::new();
        for class in self.ancestors() {
            if class.ptr_eq(stop) {
                break;
            }
            let prototype = class.0.prototype.borrow();
            let mut names: Vec<&String> = prototype.keys().collect();
            names.sort();
            for name in names {
                if seen.insert(name.clone()) {
                    members.push((name.clone(), prototype[name].clone()));
                }
            }
        }
        members
    }

    // ===== Statics =====

    /// Add a static member; functions become static methods
    pub fn add_static(&self, name: &str, value: Value) {
        let member = match value {
            Value::Function(f) => Member::Method(Method::new(
                name,
                self,
                MethodKind::Static,
                MethodBody::Native(f),
                None,
            )),
            other => Member::Value(other),
        };
        self.0.statics.borrow_mut().insert(name.to_string(), member);
    }

    /// Replace a static member, linking the replaced method as `previous`
    pub fn override_static(&self, name: &str, value: Value) {
        let member = match value {
            Value::Function(f) => {
                let previous = self.find_static_method(name);
                Member::Method(Method::new(
                    name,
                    self,
                    MethodKind::Static,
                    MethodBody::Native(f),
                    previous,
                ))
            }
            other => Member::Value(other),
        };
        self.0.statics.borrow_mut().insert(name.to_string(), member);
    }

    pub(crate) fn insert_static(&self, name: &str, member: Member) {
        self.0.statics.borrow_mut().insert(name.to_string(), member);
    }

    /// Static member of this class
    pub fn static_member(&self, name: &str) -> Option<Member> {
        self.0.statics.borrow().get(name).cloned()
    }

    /// Names of this class's statics, sorted
    pub fn static_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.0.statics.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    /// Static method of this class
    pub fn find_static_method(&self, name: &str) -> Option<Rc<Method>> {
        self.static_member(name).and_then(|m| m.as_method().cloned())
    }

    /// Static value (functions are returned as `Value::Function`)
    pub fn get_static(&self, name: &str) -> Option<Value> {
        self.static_member(name).map(|m| m.to_value())
    }

    /// Call a static method with the class as receiver
    pub fn call_static(&self, name: &str, args: &[Value]) -> ClassResult<Value> {
        let method = self
            .find_static_method(name)
            .ok_or_else(|| ClassError::MethodNotFound {
                class: self.display_name().to_string(),
                method: name.to_string(),
            })?;
        invoke(&method, &Value::Class(self.clone()), args)
    }

    /// Names registered as inheritable statics
    pub fn inheritable_statics(&self) -> Vec<String> {
        self.0.inheritable_statics.borrow().clone()
    }

    pub(crate) fn add_inheritable_static(&self, name: &str, value: Value) {
        self.add_static(name, value);
        let mut names = self.0.inheritable_statics.borrow_mut();
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }

    /// Copy the parent's inheritable statics onto this class
    pub(crate) fn inherit_statics_from(&self, parent: &ClassRef) {
        for name in parent.inheritable_statics() {
            if let Some(member) = parent.static_member(&name) {
                self.insert_static(&name, member);
                let mut names = self.0.inheritable_statics.borrow_mut();
                if !names.iter().any(|n| *n == name) {
                    names.push(name);
                }
            }
        }
    }

    // ===== Mixins, aliases, xtypes =====

    /// Mixins in application order as `(key, class)`
    pub fn mixins(&self) -> Vec<(String, ClassRef)> {
        self.0.mixins.borrow().clone()
    }

    /// True if this class or an ancestor mixed in `key`
    pub fn has_mixin(&self, key: &str) -> bool {
        self.ancestors()
            .any(|c| c.0.mixins.borrow().iter().any(|(k, _)| k == key))
    }

    pub(crate) fn record_mixin(&self, key: &str, mixin: &ClassRef) {
        self.0
            .mixins
            .borrow_mut()
            .push((key.to_string(), mixin.clone()));
    }

    /// Aliases declared on this class (including `widget.<xtype>`)
    pub fn aliases(&self) -> Vec<String> {
        self.0.aliases.borrow().clone()
    }

    pub(crate) fn set_aliases(&self, aliases: Vec<String>) {
        *self.0.aliases.borrow_mut() = aliases;
    }

    /// Alternate class names declared on this class
    pub fn alternate_names(&self) -> Vec<String> {
        self.0.alternate_names.borrow().clone()
    }

    pub(crate) fn set_alternate_names(&self, names: Vec<String>) {
        *self.0.alternate_names.borrow_mut() = names;
    }

    /// xtypes of ancestors, mixins and this class, oldest first
    pub fn xtypes_chain(&self) -> Vec<String> {
        self.0.xtypes_chain.borrow().clone()
    }

    /// O(1) short-name is-a check
    pub fn is_xtype(&self, xtype: &str) -> bool {
        self.0.xtypes_map.borrow().contains(xtype)
    }

    pub(crate) fn push_xtypes<I: IntoIterator<Item = String>>(&self, xtypes: I) {
        let mut chain = self.0.xtypes_chain.borrow_mut();
        let mut map = self.0.xtypes_map.borrow_mut();
        for xtype in xtypes {
            if map.insert(xtype.clone()) {
                chain.push(xtype);
            }
        }
    }

    /// Mixin hook configuration, if this class is a mixin
    pub fn mixin_config(&self) -> Option<MixinConfig> {
        self.0.mixin_config.borrow().clone()
    }

    pub(crate) fn set_mixin_config(&self, config: MixinConfig) {
        *self.0.mixin_config.borrow_mut() = Some(config);
    }

    // ===== Config =====

    /// This class's configurator
    pub fn configurator(&self) -> Ref<'_, Configurator> {
        self.0.configurator.borrow()
    }

    pub(crate) fn configurator_mut(&self) -> RefMut<'_, Configurator> {
        self.0.configurator.borrow_mut()
    }

    // ===== Instantiation =====

    /// Create an instance and run its constructor
    pub fn instantiate(&self, args: &[Value]) -> ClassResult<InstanceRef> {
        let instance = InstanceRef::new(self.clone());
        let this = Value::Instance(instance.clone());
        match self.find_method("constructor") {
            Some(constructor) => {
                invoke(&constructor, &this, args)?;
            }
            None => instance.init_config(args.first())?,
        }
        Ok(instance)
    }
}

impl fmt::Debug for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassRef({}#{})", self.display_name(), self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn returning(v: i32) -> Value {
        Value::function(move |_, _| Ok(Value::from(v)))
    }

    #[test]
    fn test_method_lookup_walks_superclass() {
        let parent = ClassRef::new(Some("Parent"));
        parent.add_member("greet", returning(1));
        let child = ClassRef::new(Some("Child"));
        child.set_superclass(parent.clone()).unwrap();

        let method = child.find_method("greet").unwrap();
        assert!(method.owner().unwrap().ptr_eq(&parent));
        assert!(child.is_subclass_of(&parent));
        assert!(!parent.is_subclass_of(&child));
    }

    #[test]
    fn test_call_parent_reaches_superclass() {
        let parent = ClassRef::new(Some("Parent"));
        parent.add_member("value", returning(10));
        let child = ClassRef::new(Some("Child"));
        child.set_superclass(parent).unwrap();
        child.add_member(
            "value",
            Value::function(|inv, args| {
                let base = inv.call_parent(args)?.as_number().unwrap_or(0.0);
                Ok(Value::from(base + 1.0))
            }),
        );

        let instance = child.instantiate(&[]).unwrap();
        assert_eq!(instance.call("value", &[]).unwrap(), Value::from(11));
    }

    #[test]
    fn test_override_member_links_previous() {
        let class = ClassRef::new(Some("Widget"));
        class.add_member("size", returning(1));
        class.override_member(
            "size",
            Value::function(|inv, args| {
                let original = inv.call_parent(args)?.as_number().unwrap_or(0.0);
                Ok(Value::from(original * 5.0))
            }),
        );

        let method = class.own_method("size").unwrap();
        assert!(method.previous().is_some());
        assert_eq!(method.chain_owners(), vec!["Widget", "Widget"]);

        let instance = class.instantiate(&[]).unwrap();
        assert_eq!(instance.call("size", &[]).unwrap(), Value::from(5));
    }

    #[test]
    fn test_call_parent_without_parent_fails() {
        let class = ClassRef::new(Some("Lonely"));
        class.add_member("run", Value::function(|inv, args| inv.call_parent(args)));

        let instance = class.instantiate(&[]).unwrap();
        let err = instance.call("run", &[]).unwrap_err();
        assert!(matches!(err, ClassError::NoParentMethod { .. }));
    }

    #[test]
    fn test_static_call_parent() {
        let parent = ClassRef::new(Some("Parent"));
        parent.add_static("make", returning(2));
        let child = ClassRef::new(Some("Child"));
        child.set_superclass(parent).unwrap();
        child.add_static(
            "make",
            Value::function(|inv, args| {
                let base = inv.call_parent(args)?.as_number().unwrap_or(0.0);
                Ok(Value::from(base * 3.0))
            }),
        );

        assert_eq!(child.call_static("make", &[]).unwrap(), Value::from(6));
    }

    #[test]
    fn test_statics_are_not_inherited_unless_inheritable() {
        let parent = ClassRef::new(Some("Parent"));
        parent.add_static("plain", Value::from(1));
        parent.add_inheritable_static("shared", Value::from(2));
        let child = ClassRef::new(Some("Child"));
        child.set_superclass(parent.clone()).unwrap();
        child.inherit_statics_from(&parent);

        assert!(child.get_static("plain").is_none());
        assert_eq!(child.get_static("shared"), Some(Value::from(2)));
        assert_eq!(child.inheritable_statics(), vec!["shared".to_string()]);
    }

    #[test]
    fn test_superclass_is_set_once() {
        let a = ClassRef::new(Some("A"));
        let b = ClassRef::new(Some("B"));
        let c = ClassRef::new(Some("C"));
        c.set_superclass(a).unwrap();
        assert!(c.set_superclass(b).is_err());
    }

    #[test]
    fn test_xtypes_deduplicate() {
        let class = ClassRef::new(Some("Button"));
        class.push_xtypes(vec!["component".to_string(), "button".to_string()]);
        class.push_xtypes(vec!["button".to_string()]);

        assert_eq!(class.xtypes_chain(), vec!["component", "button"]);
        assert!(class.is_xtype("button"));
        assert!(!class.is_xtype("panel"));
    }
}

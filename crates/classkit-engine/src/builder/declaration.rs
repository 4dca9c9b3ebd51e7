//! Class declarations
//!
//! [`ClassDef`] is the typed form of a declaration object. It can be built
//! in code with the builder methods or parsed from a [`Value`] (as loaded
//! from a declaration file) with [`ClassDef::from_value`].

use super::mixins::MixinConfig;
use crate::config::ConfigDecl;
use crate::object::{ClassRef, Invocation};
use crate::value::{PropertyMap, Value};
use crate::{ClassError, ClassResult};
use std::fmt;

/// Reference to a class by name or directly
#[derive(Clone)]
pub enum ClassSpecifier {
    /// Name, alias or alternate name resolved through the registry
    Name(String),
    /// Already-built class
    Class(ClassRef),
}

impl ClassSpecifier {
    /// Name to wait for, if the class has to be looked up
    pub fn pending_name(&self) -> Option<&str> {
        match self {
            ClassSpecifier::Name(name) => Some(name),
            ClassSpecifier::Class(_) => None,
        }
    }

    /// Display name
    pub fn label(&self) -> &str {
        match self {
            ClassSpecifier::Name(name) => name,
            ClassSpecifier::Class(class) => class.display_name(),
        }
    }
}

impl fmt::Debug for ClassSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassSpecifier::Name(name) => write!(f, "Name({:?})", name),
            ClassSpecifier::Class(class) => write!(f, "Class({:?})", class),
        }
    }
}

impl From<&str> for ClassSpecifier {
    fn from(name: &str) -> Self {
        ClassSpecifier::Name(name.to_string())
    }
}

impl From<String> for ClassSpecifier {
    fn from(name: String) -> Self {
        ClassSpecifier::Name(name)
    }
}

impl From<ClassRef> for ClassSpecifier {
    fn from(class: ClassRef) -> Self {
        ClassSpecifier::Class(class)
    }
}

impl From<&ClassRef> for ClassSpecifier {
    fn from(class: &ClassRef) -> Self {
        ClassSpecifier::Class(class.clone())
    }
}

/// One `mixins` entry
#[derive(Debug, Clone)]
pub struct MixinDecl {
    /// Explicit key (map form); array entries use the mixin's id or name
    pub key: Option<String>,
    /// Mixin class
    pub target: ClassSpecifier,
}

/// Typed class declaration
#[derive(Debug, Clone, Default)]
pub struct ClassDef {
    /// `$className` carried by loaded declarations
    pub name: Option<String>,
    /// Superclass (defaults to `Base`)
    pub extend: Option<ClassSpecifier>,
    /// Mixins in declaration order
    pub mixins: Vec<MixinDecl>,
    /// Config declarations in order
    pub config: Vec<(String, ConfigDecl)>,
    /// Config declarations that are cached by default
    pub cached_config: Vec<(String, ConfigDecl)>,
    /// Static members
    pub statics: PropertyMap,
    /// Static members copied onto subclasses
    pub inheritable_statics: PropertyMap,
    /// Aliases
    pub alias: Vec<String>,
    /// xtypes (registered as `widget.<xtype>` aliases)
    pub xtype: Vec<String>,
    /// Alternate (legacy) names
    pub alternate_class_name: Vec<String>,
    /// Instantiate once and register the instance instead of the class
    pub singleton: bool,
    /// Target class name when this declaration is an override
    pub override_target: Option<String>,
    /// Classes that must exist before this one is built
    pub requires: Vec<String>,
    /// Classes loaded after this one is built
    pub uses: Vec<String>,
    /// Hook wiring for classes extending `Mixin`
    pub mixin_config: Option<MixinConfig>,
    /// Replacement preprocessor order
    pub preprocessors: Option<Vec<String>>,
    /// Replacement postprocessor order
    pub postprocessors: Option<Vec<String>>,
    /// Instance members (methods and prototype values)
    pub members: PropertyMap,
}

impl ClassDef {
    /// Empty declaration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `$className`
    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Set the superclass
    pub fn extend(mut self, parent: impl Into<ClassSpecifier>) -> Self {
        self.extend = Some(parent.into());
        self
    }

    /// Add a mixin keyed by its id or name
    pub fn mixin(mut self, target: impl Into<ClassSpecifier>) -> Self {
        self.mixins.push(MixinDecl {
            key: None,
            target: target.into(),
        });
        self
    }

    /// Add a mixin under an explicit key
    pub fn mixin_as(mut self, key: &str, target: impl Into<ClassSpecifier>) -> Self {
        self.mixins.push(MixinDecl {
            key: Some(key.to_string()),
            target: target.into(),
        });
        self
    }

    /// Declare a config with a raw default
    pub fn config(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.config.push((name.to_string(), ConfigDecl::new(value)));
        self
    }

    /// Declare a config with options
    pub fn config_with(mut self, name: &str, decl: ConfigDecl) -> Self {
        self.config.push((name.to_string(), decl));
        self
    }

    /// Declare a cached config
    pub fn cached_config(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.cached_config
            .push((name.to_string(), ConfigDecl::new(value)));
        self
    }

    /// Add a static member
    pub fn static_member(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.statics.insert(name, value.into());
        self
    }

    /// Add a static method
    pub fn static_method<F>(self, name: &str, f: F) -> Self
    where
        F: Fn(&Invocation, &[Value]) -> ClassResult<Value> + 'static,
    {
        self.static_member(name, Value::function(f))
    }

    /// Add an inheritable static member
    pub fn inheritable_static(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.inheritable_statics.insert(name, value.into());
        self
    }

    /// Add an alias
    pub fn alias(mut self, alias: &str) -> Self {
        self.alias.push(alias.to_string());
        self
    }

    /// Add an xtype
    pub fn xtype(mut self, xtype: &str) -> Self {
        self.xtype.push(xtype.to_string());
        self
    }

    /// Add an alternate class name
    pub fn alternate_class_name(mut self, name: &str) -> Self {
        self.alternate_class_name.push(name.to_string());
        self
    }

    /// Mark as singleton
    pub fn singleton(mut self, singleton: bool) -> Self {
        self.singleton = singleton;
        self
    }

    /// Make this declaration an override of `target`
    pub fn override_of(mut self, target: &str) -> Self {
        self.override_target = Some(target.to_string());
        self
    }

    /// Add a required class
    pub fn requires(mut self, name: &str) -> Self {
        self.requires.push(name.to_string());
        self
    }

    /// Add a used class
    pub fn uses(mut self, name: &str) -> Self {
        self.uses.push(name.to_string());
        self
    }

    /// Set the mixin hook configuration
    pub fn mixin_config(mut self, config: MixinConfig) -> Self {
        self.mixin_config = Some(config);
        self
    }

    /// Replace the preprocessor order
    pub fn preprocessors(mut self, names: &[&str]) -> Self {
        self.preprocessors = Some(names.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Replace the postprocessor order
    pub fn postprocessors(mut self, names: &[&str]) -> Self {
        self.postprocessors = Some(names.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Add an instance member
    pub fn member(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.members.insert(name, value.into());
        self
    }

    /// Add an instance method
    pub fn method<F>(self, name: &str, f: F) -> Self
    where
        F: Fn(&Invocation, &[Value]) -> ClassResult<Value> + 'static,
    {
        self.member(name, Value::function(f))
    }

    /// Every class name this declaration must wait for
    pub fn dependencies(&self) -> Vec<String> {
        let mut deps = Vec::new();
        if let Some(name) = self.extend.as_ref().and_then(|e| e.pending_name()) {
            deps.push(name.to_string());
        }
        for mixin in &self.mixins {
            if let Some(name) = mixin.target.pending_name() {
                deps.push(name.to_string());
            }
        }
        deps.extend(self.requires.iter().cloned());
        deps.dedup();
        deps
    }

    /// Parse a declaration object
    pub fn from_value(value: &Value) -> ClassResult<Self> {
        let map = value.as_object().ok_or_else(|| {
            ClassError::InvalidDeclaration(format!(
                "declaration must be an object, got {}",
                value.type_name()
            ))
        })?;

        let mut def = ClassDef::new();
        if let Some(name) = map.get("$className") {
            def.name = Some(expect_str(name, "$className")?.to_string());
        }
        let label = def.name.clone().unwrap_or_else(|| "(anonymous)".to_string());

        for (key, value) in map.iter() {
            match key {
                "$className" => {}
                "extend" => def.extend = specifier(value, "extend")?,
                "mixins" => def.mixins = parse_mixins(value)?,
                "config" => def.config = parse_configs(value, "config")?,
                "cachedConfig" => def.cached_config = parse_configs(value, "cachedConfig")?,
                "statics" => def.statics = expect_object(value, "statics")?.clone(),
                "inheritableStatics" => {
                    def.inheritable_statics = expect_object(value, "inheritableStatics")?.clone()
                }
                "alias" => {
                    def.alias = string_list(value).map_err(|bad| ClassError::InvalidAlias {
                        class: label.clone(),
                        alias: bad,
                    })?
                }
                "xtype" => {
                    def.xtype = string_list(value).map_err(|bad| ClassError::InvalidXType {
                        class: label.clone(),
                        xtype: bad,
                    })?
                }
                "alternateClassName" => {
                    def.alternate_class_name =
                        string_list(value).map_err(|bad| ClassError::InvalidAlias {
                            class: label.clone(),
                            alias: bad,
                        })?
                }
                "singleton" => def.singleton = value.is_truthy(),
                "override" => def.override_target = Some(expect_str(value, "override")?.to_string()),
                "requires" => def.requires = names_list(value, "requires")?,
                "uses" => def.uses = names_list(value, "uses")?,
                "mixinConfig" => def.mixin_config = Some(MixinConfig::from_value(value)?),
                "preprocessors" => def.preprocessors = Some(names_list(value, "preprocessors")?),
                "postprocessors" => {
                    def.postprocessors = Some(names_list(value, "postprocessors")?)
                }
                _ => {
                    def.members.insert(key, value.clone());
                }
            }
        }
        Ok(def)
    }
}

fn expect_str<'a>(value: &'a Value, key: &str) -> ClassResult<&'a str> {
    value.as_str().ok_or_else(|| {
        ClassError::InvalidDeclaration(format!(
            "{} must be a string, got {}",
            key,
            value.type_name()
        ))
    })
}

fn expect_object<'a>(value: &'a Value, key: &str) -> ClassResult<&'a PropertyMap> {
    value.as_object().ok_or_else(|| {
        ClassError::InvalidDeclaration(format!(
            "{} must be an object, got {}",
            key,
            value.type_name()
        ))
    })
}

fn specifier(value: &Value, key: &str) -> ClassResult<Option<ClassSpecifier>> {
    match value {
        Value::Undefined | Value::Null => Ok(None),
        Value::Str(name) => Ok(Some(ClassSpecifier::Name(name.to_string()))),
        Value::Class(class) => Ok(Some(ClassSpecifier::Class(class.clone()))),
        other => Err(ClassError::InvalidDeclaration(format!(
            "{} must be a class name or class, got {}",
            key,
            other.type_name()
        ))),
    }
}

/// String or array of strings; the error carries the offending entry
fn string_list(value: &Value) -> Result<Vec<String>, String> {
    match value {
        Value::Undefined | Value::Null => Ok(Vec::new()),
        Value::Str(s) => Ok(vec![s.to_string()]),
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string).ok_or_else(|| item.to_string()))
            .collect(),
        other => Err(other.to_string()),
    }
}

fn names_list(value: &Value, key: &str) -> ClassResult<Vec<String>> {
    string_list(value).map_err(|bad| {
        ClassError::InvalidDeclaration(format!("{} entries must be strings, got {}", key, bad))
    })
}

fn parse_mixins(value: &Value) -> ClassResult<Vec<MixinDecl>> {
    match value {
        Value::Undefined | Value::Null => Ok(Vec::new()),
        Value::Str(_) | Value::Class(_) => Ok(vec![MixinDecl {
            key: None,
            target: required_specifier(value)?,
        }]),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                Ok(MixinDecl {
                    key: None,
                    target: required_specifier(item)?,
                })
            })
            .collect(),
        Value::Object(map) => map
            .iter()
            .map(|(key, item)| {
                Ok(MixinDecl {
                    key: Some(key.to_string()),
                    target: required_specifier(item)?,
                })
            })
            .collect(),
        other => Err(ClassError::InvalidDeclaration(format!(
            "mixins must be a list or map, got {}",
            other.type_name()
        ))),
    }
}

fn required_specifier(value: &Value) -> ClassResult<ClassSpecifier> {
    specifier(value, "mixins")?.ok_or_else(|| {
        ClassError::InvalidDeclaration("mixins entries must not be null".to_string())
    })
}

fn parse_configs(value: &Value, key: &str) -> ClassResult<Vec<(String, ConfigDecl)>> {
    expect_object(value, key)?
        .iter()
        .map(|(name, decl)| Ok((name.to_string(), ConfigDecl::from_value(name, decl)?)))
        .collect()
}

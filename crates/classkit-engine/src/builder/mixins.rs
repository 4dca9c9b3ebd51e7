//! Mixin composition
//!
//! Applying a mixin copies the members the target does not already have
//! (anywhere on its chain), contributes the mixin's configs, and merges its
//! xtypes. Mixins that extend `Mixin` may also wire hooks into target
//! methods through their [`MixinConfig`].

use super::BuildEnv;
use crate::config::configurator;
use crate::object::{ClassRef, Invocation, Member, Method, MethodBody, MethodKind};
use crate::value::{Function, Value};
use crate::{ClassError, ClassResult};
use std::fmt;

/// How a mixin method attaches to a target method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    /// Runs first; returning `false` skips the target
    Before,
    /// Runs after the target; the target's result is kept
    After,
    /// Spliced into the target's `callParent` chain
    On,
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookKind::Before => f.write_str("before"),
            HookKind::After => f.write_str("after"),
            HookKind::On => f.write_str("on"),
        }
    }
}

/// One hook: target method name, mixin method name and kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookDescriptor {
    /// Attachment kind
    pub kind: HookKind,
    /// Method on the target class
    pub method: String,
    /// Method on the mixin class
    pub mixin_method: String,
}

/// `mixinConfig` of a class extending `Mixin`
#[derive(Clone, Default)]
pub struct MixinConfig {
    /// Key used when the mixin is listed in array form
    pub id: Option<String>,
    /// `(target method, mixin method)` pairs run before the target
    pub before: Vec<(String, String)>,
    /// Pairs run after the target
    pub after: Vec<(String, String)>,
    /// Pairs spliced into the `callParent` chain
    pub on: Vec<(String, String)>,
    /// Called as `(derived, base)` when a class using the mixin is extended
    pub extended: Option<Function>,
}

impl MixinConfig {
    /// Empty config
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the id
    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    /// Add a before hook
    pub fn before(mut self, method: &str, mixin_method: &str) -> Self {
        self.before.push((method.to_string(), mixin_method.to_string()));
        self
    }

    /// Add an after hook
    pub fn after(mut self, method: &str, mixin_method: &str) -> Self {
        self.after.push((method.to_string(), mixin_method.to_string()));
        self
    }

    /// Add an on hook
    pub fn on(mut self, method: &str, mixin_method: &str) -> Self {
        self.on.push((method.to_string(), mixin_method.to_string()));
        self
    }

    /// Set the extended hook
    pub fn extended<F>(mut self, f: F) -> Self
    where
        F: Fn(&Invocation, &[Value]) -> ClassResult<Value> + 'static,
    {
        self.extended = Some(Function::new(f));
        self
    }

    /// Hooks as a flat descriptor list, before, after then on
    pub fn hooks(&self) -> Vec<HookDescriptor> {
        let tagged = [
            (HookKind::Before, &self.before),
            (HookKind::After, &self.after),
            (HookKind::On, &self.on),
        ];
        tagged
            .iter()
            .flat_map(|(kind, pairs)| {
                pairs.iter().map(move |(method, mixin_method)| HookDescriptor {
                    kind: *kind,
                    method: method.clone(),
                    mixin_method: mixin_method.clone(),
                })
            })
            .collect()
    }

    /// Parse `{"id": .., "before": {target: mixinMethod}, "after": .., "on": .., "extended": fn}`
    pub fn from_value(value: &Value) -> ClassResult<Self> {
        let map = value.as_object().ok_or_else(|| {
            ClassError::InvalidDeclaration("mixinConfig must be an object".to_string())
        })?;
        let mut config = MixinConfig::new();
        for (key, entry) in map.iter() {
            match key {
                "id" => {
                    config.id = Some(
                        entry
                            .as_str()
                            .ok_or_else(|| {
                                ClassError::InvalidDeclaration(
                                    "mixinConfig.id must be a string".to_string(),
                                )
                            })?
                            .to_string(),
                    )
                }
                "before" => config.before = hook_pairs(entry, key)?,
                "after" => config.after = hook_pairs(entry, key)?,
                "on" => config.on = hook_pairs(entry, key)?,
                "extended" => {
                    config.extended = Some(entry.as_function().cloned().ok_or_else(|| {
                        ClassError::InvalidDeclaration(
                            "mixinConfig.extended must be a function".to_string(),
                        )
                    })?)
                }
                other => {
                    return Err(ClassError::InvalidDeclaration(format!(
                        "unknown mixinConfig key {:?}",
                        other
                    )))
                }
            }
        }
        Ok(config)
    }
}

impl fmt::Debug for MixinConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MixinConfig")
            .field("id", &self.id)
            .field("before", &self.before)
            .field("after", &self.after)
            .field("on", &self.on)
            .field("extended", &self.extended.is_some())
            .finish()
    }
}

fn hook_pairs(value: &Value, key: &str) -> ClassResult<Vec<(String, String)>> {
    let map = value.as_object().ok_or_else(|| {
        ClassError::InvalidDeclaration(format!("mixinConfig.{} must be an object", key))
    })?;
    map.iter()
        .map(|(target, mixin_method)| {
            let mixin_method = mixin_method.as_str().ok_or_else(|| {
                ClassError::InvalidDeclaration(format!(
                    "mixinConfig.{}.{} must name a mixin method",
                    key, target
                ))
            })?;
            Ok((target.to_string(), mixin_method.to_string()))
        })
        .collect()
}

/// Key a mixin is recorded under when no explicit key is given
pub(crate) fn mixin_key(mixin: &ClassRef) -> String {
    mixin
        .mixin_config()
        .and_then(|c| c.id)
        .unwrap_or_else(|| mixin.display_name().to_string())
}

/// Mix `mixin` into `class`
pub(crate) fn apply_mixin(
    class: &ClassRef,
    key: &str,
    mixin: &ClassRef,
    env: &dyn BuildEnv,
) -> ClassResult<()> {
    tracing::debug!(
        class = %class.display_name(),
        mixin = %mixin.display_name(),
        key,
        "applying mixin"
    );
    configurator::mix_configs(class, mixin)?;

    let base = env.base_class();
    for (name, member) in mixin.members_until(&base) {
        if class.find_member(&name).is_none() {
            class.insert_member(&name, member);
        }
    }

    class.record_mixin(key, mixin);
    class.push_xtypes(mixin.xtypes_chain());

    let hooked = !mixin.ptr_eq(&env.mixin_class()) && mixin.is_subclass_of(&env.mixin_class());
    if hooked {
        if let Some(config) = mixin.mixin_config() {
            for hook in config.hooks() {
                wire_hook(class, mixin, &hook)?;
            }
        }
    }
    Ok(())
}

fn wire_hook(class: &ClassRef, mixin: &ClassRef, hook: &HookDescriptor) -> ClassResult<()> {
    let mixin_method = mixin.find_method(&hook.mixin_method).ok_or_else(|| {
        ClassError::InvalidDeclaration(format!(
            "{}: mixinConfig.{} refers to missing method {}",
            mixin.display_name(),
            hook.kind,
            hook.mixin_method
        ))
    })?;
    let existing = class.own_method(&hook.method);

    let method = match hook.kind {
        HookKind::Before => Method::new(
            &hook.method,
            class,
            MethodKind::Instance,
            MethodBody::Before(mixin_method),
            existing,
        ),
        HookKind::After => Method::new(
            &hook.method,
            class,
            MethodKind::Instance,
            MethodBody::After(mixin_method),
            existing,
        ),
        HookKind::On => {
            let behind = existing.as_ref().and_then(|m| m.previous().cloned());
            let spliced = mixin_method.rebind(&hook.method, class, behind);
            match existing {
                Some(own) => own.with_previous(Some(spliced)),
                None => spliced,
            }
        }
    };
    class.insert_member(&hook.method, Member::Method(method));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hooks_flatten_in_kind_order() {
        let config = MixinConfig::new()
            .on("destroy", "onDestroy")
            .before("render", "beforeRender")
            .after("render", "afterRender");

        let kinds: Vec<HookKind> = config.hooks().iter().map(|h| h.kind).collect();
        assert_eq!(kinds, vec![HookKind::Before, HookKind::After, HookKind::On]);
        assert_eq!(config.hooks()[2].mixin_method, "onDestroy");
    }

    #[test]
    fn test_from_value() {
        let value = Value::object(
            crate::value::PropertyMap::new()
                .with("id", "observable")
                .with(
                    "before",
                    Value::object(crate::value::PropertyMap::new().with("destroy", "beforeDestroy")),
                ),
        );
        let config = MixinConfig::from_value(&value).unwrap();
        assert_eq!(config.id.as_deref(), Some("observable"));
        assert_eq!(
            config.before,
            vec![("destroy".to_string(), "beforeDestroy".to_string())]
        );

        let bad = Value::object(crate::value::PropertyMap::new().with("around", 1));
        assert!(MixinConfig::from_value(&bad).is_err());
    }

    #[test]
    fn test_on_hook_splices_behind_own_method() {
        let class = ClassRef::new(Some("Target"));
        class.add_member("run", Value::function(|inv, args| inv.call_parent(args)));
        let mixin = ClassRef::new(Some("M"));
        mixin.add_member("onRun", Value::function(|_, _| Ok(Value::from("mixin"))));

        let hook = HookDescriptor {
            kind: HookKind::On,
            method: "run".to_string(),
            mixin_method: "onRun".to_string(),
        };
        wire_hook(&class, &mixin, &hook).unwrap();

        let method = class.own_method("run").unwrap();
        assert_eq!(method.chain_owners(), vec!["Target", "Target"]);
        let instance = class.instantiate(&[]).unwrap();
        assert_eq!(instance.call("run", &[]).unwrap(), Value::from("mixin"));
    }

    #[test]
    fn test_missing_mixin_method_is_rejected() {
        let class = ClassRef::new(Some("Target"));
        let mixin = ClassRef::new(Some("M"));
        let hook = HookDescriptor {
            kind: HookKind::Before,
            method: "run".to_string(),
            mixin_method: "nope".to_string(),
        };
        assert!(wire_hook(&class, &mixin, &hook).is_err());
    }
}

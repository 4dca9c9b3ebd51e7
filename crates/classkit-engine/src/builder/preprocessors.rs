//! Default preprocessors

use super::mixins::mixin_key;
use super::{BuildContext, ClassDef, ClassSpecifier, Flow, Preprocessor};
use crate::config::{configurator, ConfigDecl};
use crate::object::Invocation;
use crate::value::Value;
use crate::{ClassError, ClassResult};
use std::rc::Rc;

pub(crate) fn defaults() -> Vec<Rc<dyn Preprocessor>> {
    vec![
        Rc::new(ClassNameStep),
        Rc::new(LoaderStep),
        Rc::new(ExtendStep),
        Rc::new(StaticsStep),
        Rc::new(InheritableStaticsStep),
        Rc::new(MixinsStep),
        Rc::new(ConfigStep),
        Rc::new(XTypeStep),
    ]
}

// ============================================================================
// className
// ============================================================================

/// Validates the class name, aliases, alternates and xtypes
struct ClassNameStep;

impl Preprocessor for ClassNameStep {
    fn name(&self) -> &str {
        "className"
    }

    fn process(&self, ctx: &mut BuildContext<'_>) -> ClassResult<Flow> {
        let label = ctx.class.display_name().to_string();
        if let Some(name) = ctx.class.name() {
            if name.trim().is_empty() {
                return Err(ClassError::InvalidClassName(name.to_string()));
            }
        }
        for alias in ctx.def.alias.iter().chain(&ctx.def.alternate_class_name) {
            if alias.trim().is_empty() {
                return Err(ClassError::InvalidAlias {
                    class: label,
                    alias: alias.clone(),
                });
            }
        }
        for xtype in &ctx.def.xtype {
            if xtype.trim().is_empty() {
                return Err(ClassError::InvalidXType {
                    class: label,
                    xtype: xtype.clone(),
                });
            }
        }
        Ok(Flow::Continue)
    }
}

// ============================================================================
// loader
// ============================================================================

/// Makes sure `extend`, `mixins` and `requires` exist, loading or waiting
struct LoaderStep;

impl Preprocessor for LoaderStep {
    fn name(&self) -> &str {
        "loader"
    }

    fn applies(&self, def: &ClassDef) -> bool {
        !def.dependencies().is_empty()
    }

    fn process(&self, ctx: &mut BuildContext<'_>) -> ClassResult<Flow> {
        let own = ctx.class.name().map(str::to_string);
        let mut missing = Vec::new();
        for dep in ctx.def.dependencies() {
            let resolved = ctx.env.resolve_name(&dep);
            if own.as_deref() == Some(resolved.as_str()) {
                return Err(ClassError::CircularDependency(resolved));
            }
            if !ctx.env.is_created(&resolved) && !missing.contains(&resolved) {
                missing.push(resolved);
            }
        }

        let mut waiting = Vec::new();
        for name in missing {
            if !ctx.env.try_load(&name)? {
                waiting.push(ctx.env.resolve_name(&name));
            }
        }
        if waiting.is_empty() {
            Ok(Flow::Continue)
        } else {
            tracing::debug!(
                class = %ctx.class.display_name(),
                waiting = ?waiting,
                "suspending until dependencies are created"
            );
            Ok(Flow::Await(waiting))
        }
    }
}

// ============================================================================
// extend
// ============================================================================

/// Links the superclass, copies inheritable statics and fires `extended` hooks
struct ExtendStep;

impl Preprocessor for ExtendStep {
    fn name(&self) -> &str {
        "extend"
    }

    fn process(&self, ctx: &mut BuildContext<'_>) -> ClassResult<Flow> {
        let parent = match &ctx.def.extend {
            None => ctx.env.base_class(),
            Some(ClassSpecifier::Class(class)) => class.clone(),
            Some(ClassSpecifier::Name(name)) => ctx.env.resolve_class(name)?,
        };
        ctx.class.set_superclass(parent.clone())?;
        ctx.class.inherit_statics_from(&parent);

        if ctx.def.mixin_config.is_none() {
            ctx.def.mixin_config = parent.mixin_config();
        }

        for ancestor in parent.ancestors() {
            for (_, mixin) in ancestor.mixins() {
                let hook = mixin.mixin_config().and_then(|c| c.extended);
                if let Some(hook) = hook {
                    hook.call(
                        &Invocation::detached(Value::Class(mixin.clone())),
                        &[Value::Class(ctx.class.clone()), Value::Class(parent.clone())],
                    )?;
                }
            }
        }
        Ok(Flow::Continue)
    }
}

// ============================================================================
// statics / inheritableStatics
// ============================================================================

struct StaticsStep;

impl Preprocessor for StaticsStep {
    fn name(&self) -> &str {
        "statics"
    }

    fn applies(&self, def: &ClassDef) -> bool {
        !def.statics.is_empty()
    }

    fn process(&self, ctx: &mut BuildContext<'_>) -> ClassResult<Flow> {
        for (name, value) in ctx.def.statics.iter() {
            ctx.class.add_static(name, value.clone());
        }
        Ok(Flow::Continue)
    }
}

struct InheritableStaticsStep;

impl Preprocessor for InheritableStaticsStep {
    fn name(&self) -> &str {
        "inheritableStatics"
    }

    fn applies(&self, def: &ClassDef) -> bool {
        !def.inheritable_statics.is_empty()
    }

    fn process(&self, ctx: &mut BuildContext<'_>) -> ClassResult<Flow> {
        for (name, value) in ctx.def.inheritable_statics.iter() {
            ctx.class.add_inheritable_static(name, value.clone());
        }
        Ok(Flow::Continue)
    }
}

// ============================================================================
// mixins
// ============================================================================

/// Resolves mixin classes; they are applied once members are in place
struct MixinsStep;

impl Preprocessor for MixinsStep {
    fn name(&self) -> &str {
        "mixins"
    }

    fn applies(&self, def: &ClassDef) -> bool {
        !def.mixins.is_empty()
    }

    fn process(&self, ctx: &mut BuildContext<'_>) -> ClassResult<Flow> {
        for decl in &ctx.def.mixins {
            let mixin = match &decl.target {
                ClassSpecifier::Class(class) => class.clone(),
                ClassSpecifier::Name(name) => ctx.env.resolve_class(name)?,
            };
            let key = decl.key.clone().unwrap_or_else(|| mixin_key(&mixin));
            if ctx.mixins.iter().any(|(k, _)| *k == key) {
                continue;
            }
            ctx.mixins.push((key, mixin));
        }
        Ok(Flow::Continue)
    }
}

// ============================================================================
// config
// ============================================================================

struct ConfigStep;

impl Preprocessor for ConfigStep {
    fn name(&self) -> &str {
        "config"
    }

    fn applies(&self, def: &ClassDef) -> bool {
        !def.config.is_empty() || !def.cached_config.is_empty()
    }

    fn process(&self, ctx: &mut BuildContext<'_>) -> ClassResult<Flow> {
        let mut decls = ctx.def.config.clone();
        decls.extend(ctx.def.cached_config.iter().map(|(name, decl)| {
            let cached: ConfigDecl = decl.clone().cached(true);
            (name.clone(), cached)
        }));
        configurator::add_configs(ctx.class, &decls)?;
        Ok(Flow::Continue)
    }
}

// ============================================================================
// xtype
// ============================================================================

/// Collects aliases (including `widget.<xtype>`) and the xtypes chain
struct XTypeStep;

const WIDGET_PREFIX: &str = "widget.";

impl Preprocessor for XTypeStep {
    fn name(&self) -> &str {
        "xtype"
    }

    fn process(&self, ctx: &mut BuildContext<'_>) -> ClassResult<Flow> {
        let mut aliases: Vec<String> = Vec::new();
        let mut xtypes: Vec<String> = Vec::new();
        for alias in &ctx.def.alias {
            if !aliases.contains(alias) {
                aliases.push(alias.clone());
            }
            if let Some(xtype) = alias.strip_prefix(WIDGET_PREFIX) {
                xtypes.push(xtype.to_string());
            }
        }
        for xtype in &ctx.def.xtype {
            let alias = format!("{}{}", WIDGET_PREFIX, xtype);
            if !aliases.contains(&alias) {
                aliases.push(alias);
            }
            xtypes.push(xtype.clone());
        }

        if let Some(parent) = ctx.class.superclass() {
            ctx.class.push_xtypes(parent.xtypes_chain());
        }
        ctx.class.push_xtypes(xtypes);
        ctx.class.set_aliases(aliases);
        ctx.class
            .set_alternate_names(ctx.def.alternate_class_name.clone());
        Ok(Flow::Continue)
    }
}

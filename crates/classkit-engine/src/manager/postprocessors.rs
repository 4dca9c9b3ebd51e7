//! Postprocessors: run on a built class before it is registered

use super::ClassManager;
use crate::builder::ClassDef;
use crate::diagnostics::DiagnosticKind;
use crate::value::Value;
use crate::{ClassError, ClassResult};
use std::rc::Rc;

/// A step run after the preprocessor pipeline, before registration
pub trait Postprocessor {
    /// Registered name
    fn name(&self) -> &str;

    /// Whether the step has anything to do for this declaration
    fn applies(&self, _def: &ClassDef) -> bool {
        true
    }

    /// Run the step; `value` is what gets registered under `name`
    fn process(
        &self,
        manager: &mut ClassManager,
        name: Option<&str>,
        value: &mut Value,
        def: &ClassDef,
    ) -> ClassResult<()>;
}

pub(crate) fn defaults() -> Vec<Rc<dyn Postprocessor>> {
    vec![
        Rc::new(AliasStep),
        Rc::new(SingletonStep),
        Rc::new(AlternateClassNameStep),
        Rc::new(UsesStep),
    ]
}

fn class_of(value: &Value) -> ClassResult<crate::object::ClassRef> {
    match value {
        Value::Class(class) => Ok(class.clone()),
        Value::Instance(instance) => Ok(instance.class().clone()),
        other => Err(ClassError::TypeError(format!(
            "expected a class, got {}",
            other.type_name()
        ))),
    }
}

/// Registers aliases (including `widget.<xtype>`) in the inventory
struct AliasStep;

impl Postprocessor for AliasStep {
    fn name(&self) -> &str {
        "alias"
    }

    fn process(
        &self,
        manager: &mut ClassManager,
        name: Option<&str>,
        value: &mut Value,
        def: &ClassDef,
    ) -> ClassResult<()> {
        let class = class_of(value)?;
        let mut aliases = class.aliases();
        if aliases.is_empty() {
            aliases = def.alias.clone();
        }
        if aliases.is_empty() {
            return Ok(());
        }
        match name {
            Some(name) => manager.inventory.add_aliases(name, aliases.as_slice()),
            None => {
                manager.diagnostics.warn(
                    DiagnosticKind::AnonymousAlias,
                    format!("aliases {:?} ignored on an anonymous class", aliases),
                );
                Ok(())
            }
        }
    }
}

/// Replaces the class with its only instance
struct SingletonStep;

impl Postprocessor for SingletonStep {
    fn name(&self) -> &str {
        "singleton"
    }

    fn applies(&self, def: &ClassDef) -> bool {
        def.singleton
    }

    fn process(
        &self,
        _manager: &mut ClassManager,
        _name: Option<&str>,
        value: &mut Value,
        _def: &ClassDef,
    ) -> ClassResult<()> {
        let class = class_of(value)?;
        *value = Value::Instance(class.instantiate(&[])?);
        Ok(())
    }
}

struct AlternateClassNameStep;

impl Postprocessor for AlternateClassNameStep {
    fn name(&self) -> &str {
        "alternateClassName"
    }

    fn applies(&self, def: &ClassDef) -> bool {
        !def.alternate_class_name.is_empty()
    }

    fn process(
        &self,
        manager: &mut ClassManager,
        name: Option<&str>,
        _value: &mut Value,
        def: &ClassDef,
    ) -> ClassResult<()> {
        let Some(name) = name else {
            manager.diagnostics.warn(
                DiagnosticKind::AnonymousAlias,
                format!(
                    "alternate names {:?} ignored on an anonymous class",
                    def.alternate_class_name
                ),
            );
            return Ok(());
        };
        for alternate in &def.alternate_class_name {
            manager.inventory.add_alternate(name, alternate)?;
        }
        Ok(())
    }
}

/// Loads `uses` classes; never blocks creation
struct UsesStep;

impl Postprocessor for UsesStep {
    fn name(&self) -> &str {
        "uses"
    }

    fn applies(&self, def: &ClassDef) -> bool {
        !def.uses.is_empty()
    }

    fn process(
        &self,
        manager: &mut ClassManager,
        name: Option<&str>,
        _value: &mut Value,
        def: &ClassDef,
    ) -> ClassResult<()> {
        for used in &def.uses {
            let resolved = manager.inventory.resolve_name(used);
            if manager.is_created(&resolved) || manager.is_pending(&resolved) {
                continue;
            }
            if !manager.try_load(&resolved)? && !manager.is_pending(&resolved) {
                manager.diagnostics.warn(
                    DiagnosticKind::MissingUse,
                    format!(
                        "{} uses {}, which is not defined",
                        name.unwrap_or("(anonymous)"),
                        resolved
                    ),
                );
            }
        }
        Ok(())
    }
}

//! Deferred override application

use super::listeners::{Action, CreatedCallback, Listener};
use super::{ClassManager, ClassState, DefineOutcome};
use crate::builder::mixins::{apply_mixin, mixin_key};
use crate::builder::{ClassDef, ClassSpecifier};
use crate::config::configurator;
use crate::object::ClassRef;
use crate::value::Value;
use crate::{ClassError, ClassResult};

/// An override waiting for its target and dependencies
pub(crate) struct OverrideJob {
    pub(crate) name: Option<String>,
    pub(crate) target: String,
    pub(crate) def: ClassDef,
    pub(crate) on_created: Option<CreatedCallback>,
}

impl ClassManager {
    pub(crate) fn create_override(
        &mut self,
        name: Option<String>,
        target: String,
        def: ClassDef,
        on_created: Option<CreatedCallback>,
    ) -> ClassResult<DefineOutcome> {
        if target.trim().is_empty() {
            return Err(ClassError::InvalidDeclaration(
                "override target cannot be empty".to_string(),
            ));
        }
        if let Some(name) = &name {
            self.states.insert(name.clone(), ClassState::Requested);
        }
        tracing::debug!(
            name = name.as_deref().unwrap_or("(anonymous)"),
            target = %target,
            "override requested"
        );
        self.advance_override(OverrideJob {
            name,
            target,
            def,
            on_created,
        })
    }

    /// Wait for the target, then for requires and mixins, then apply
    pub(crate) fn advance_override(&mut self, job: OverrideJob) -> ClassResult<DefineOutcome> {
        let target = self.inventory.resolve_name(&job.target);
        if !self.is_defined(&target) && !self.try_load(&target)? {
            return Ok(self.park_override(job, vec![target]));
        }

        let mut waiting = Vec::new();
        for dep in job.def.dependencies() {
            let dep = self.inventory.resolve_name(&dep);
            if !self.is_created(&dep) && !self.try_load(&dep)? && !waiting.contains(&dep) {
                waiting.push(dep);
            }
        }
        if !waiting.is_empty() {
            return Ok(self.park_override(job, waiting));
        }

        let name = job.name.clone();
        match self.apply_override(job) {
            Ok(value) => Ok(DefineOutcome::Ready(value)),
            Err(e) => {
                if let Some(name) = &name {
                    self.mark_failed(name, e.to_string());
                }
                Err(e)
            }
        }
    }

    fn park_override(&mut self, job: OverrideJob, waiting: Vec<String>) -> DefineOutcome {
        tracing::debug!(
            name = job.name.as_deref().unwrap_or("(anonymous)"),
            target = %job.target,
            waiting = ?waiting,
            "override suspended"
        );
        if let Some(name) = &job.name {
            self.states.insert(
                name.clone(),
                ClassState::AwaitingDependencies(waiting.clone()),
            );
        }
        self.listeners.push(Listener {
            waiting_on: waiting[0].clone(),
            action: Action::ApplyOverride(job),
        });
        DefineOutcome::Pending(waiting)
    }

    fn apply_override(&mut self, job: OverrideJob) -> ClassResult<Value> {
        let OverrideJob {
            name,
            target,
            def,
            on_created,
        } = job;
        let target_name = self.inventory.resolve_name(&target);
        let target_value = self
            .classes
            .get(&target_name)
            .cloned()
            .ok_or_else(|| ClassError::ClassNotFound(target.clone()))?;
        let class = match &target_value {
            Value::Class(class) => class.clone(),
            Value::Instance(instance) => instance.class().clone(),
            other => {
                return Err(ClassError::TypeError(format!(
                    "cannot override {}: registered value is {}",
                    target,
                    other.type_name()
                )))
            }
        };

        for (member, value) in def.members.iter() {
            class.override_member(member, value.clone());
        }
        for (member, value) in def.statics.iter() {
            class.override_static(member, value.clone());
        }
        for (member, value) in def.inheritable_statics.iter() {
            class.add_inheritable_static(member, value.clone());
        }

        let mut decls = def.config.clone();
        decls.extend(
            def.cached_config
                .iter()
                .map(|(n, d)| (n.clone(), d.clone().cached(true))),
        );
        if !decls.is_empty() {
            configurator::add_configs(&class, &decls)?;
        }

        for decl in &def.mixins {
            let mixin = match &decl.target {
                ClassSpecifier::Class(mixin) => mixin.clone(),
                ClassSpecifier::Name(mixin) => self.resolve_class(mixin)?,
            };
            let key = decl.key.clone().unwrap_or_else(|| mixin_key(&mixin));
            if !class.has_mixin(&key) {
                apply_mixin(&class, &key, &mixin, &*self)?;
            }
        }

        self.add_override_names(&target_name, &class, &def)?;

        tracing::debug!(
            name = name.as_deref().unwrap_or("(anonymous)"),
            target = %target_name,
            "override applied"
        );
        let value = Value::Class(class);
        if let Some(name) = &name {
            self.created.insert(name.clone());
            self.states.insert(name.clone(), ClassState::Ready);
        }
        let result = match on_created {
            Some(callback) => callback(self, &value),
            None => Ok(()),
        };
        if let Some(name) = name {
            self.trigger_created(&[name]);
        }
        result.map(|_| value)
    }

    fn add_override_names(
        &mut self,
        target_name: &str,
        class: &ClassRef,
        def: &ClassDef,
    ) -> ClassResult<()> {
        let mut aliases = class.aliases();
        let mut added = Vec::new();
        let mut xtypes = Vec::new();
        for alias in &def.alias {
            if let Some(xtype) = alias.strip_prefix("widget.") {
                xtypes.push(xtype.to_string());
            }
            added.push(alias.clone());
        }
        for xtype in &def.xtype {
            added.push(format!("widget.{}", xtype));
            xtypes.push(xtype.clone());
        }
        for alias in added {
            self.inventory.add_alias(target_name, &alias)?;
            if !aliases.contains(&alias) {
                aliases.push(alias);
            }
        }
        class.set_aliases(aliases);
        class.push_xtypes(xtypes);

        if !def.alternate_class_name.is_empty() {
            let mut alternates = class.alternate_names();
            for alternate in &def.alternate_class_name {
                self.inventory.add_alternate(target_name, alternate)?;
                if !alternates.contains(alternate) {
                    alternates.push(alternate.clone());
                }
            }
            class.set_alternate_names(alternates);
        }
        Ok(())
    }

    /// Targets of overrides still waiting to be applied
    pub fn unresolved_overrides(&self) -> Vec<String> {
        let mut targets: Vec<String> = Vec::new();
        for listener in &self.listeners {
            if let Action::ApplyOverride(job) = &listener.action {
                let target = self.inventory.resolve_name(&job.target);
                if !targets.contains(&target) {
                    targets.push(target);
                }
            }
        }
        targets
    }
}

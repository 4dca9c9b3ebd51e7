//! Class construction pipeline
//!
//! A declaration becomes a class by running an ordered stack of named
//! [`Preprocessor`]s against a fresh class shell. A preprocessor either lets
//! the pipeline continue or suspends it with [`Flow::Await`], naming the
//! classes it is waiting for; the owner of the [`BuildJob`] resumes it once
//! they exist. After the last preprocessor the declared members are added
//! and mixins are applied.
//!
//! Default order: className, loader, extend, statics, inheritableStatics,
//! mixins, config, xtype.

mod declaration;
pub(crate) mod mixins;
mod preprocessors;

pub use declaration::{ClassDef, ClassSpecifier, MixinDecl};
pub use mixins::{HookDescriptor, HookKind, MixinConfig};

use crate::diagnostics::Diagnostics;
use crate::inventory::Inventory;
use crate::object::ClassRef;
use crate::{ClassError, ClassResult};
use rustc_hash::FxHashMap;
use std::fmt;
use std::rc::Rc;

/// Outcome of a pipeline step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    /// Move on to the next step
    Continue,
    /// Suspend until the named classes are created, then rerun this step
    Await(Vec<String>),
}

/// Placement of a newly registered processor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Position {
    /// Run before everything else
    First,
    /// Run after everything else
    Last,
    /// Run right before the named processor
    Before(String),
    /// Run right after the named processor
    After(String),
}

/// Insert `name` into `order` at `position`
///
/// A name already present is moved. Relative positions naming an unknown
/// processor fall back to the end.
pub fn place(order: &mut Vec<String>, name: &str, position: &Position) {
    order.retain(|n| n != name);
    let index = match position {
        Position::First => 0,
        Position::Last => order.len(),
        Position::Before(other) => order.iter().position(|n| n == other).unwrap_or(order.len()),
        Position::After(other) => order
            .iter()
            .position(|n| n == other)
            .map(|i| i + 1)
            .unwrap_or(order.len()),
    };
    order.insert(index, name.to_string());
}

/// Registry services the pipeline needs
pub trait BuildEnv {
    /// Class registered under a name, alias or alternate name
    fn resolve_class(&self, name: &str) -> ClassResult<ClassRef>;

    /// True once a class, singleton or named override has been created
    fn is_created(&self, name: &str) -> bool;

    /// Canonical name for a name, alias or alternate name
    fn resolve_name(&self, name: &str) -> String;

    /// Attempt a synchronous load; true if the name is created afterwards
    fn try_load(&mut self, name: &str) -> ClassResult<bool>;

    /// Root `Base` class
    fn base_class(&self) -> ClassRef;

    /// Root `Mixin` class
    fn mixin_class(&self) -> ClassRef;

    /// Name registry
    fn inventory(&self) -> &Inventory;

    /// Warning sink
    fn diagnostics(&self) -> &Diagnostics;
}

/// State handed to a preprocessor
pub struct BuildContext<'a> {
    /// Class under construction
    pub class: &'a ClassRef,
    /// Declaration being consumed
    pub def: &'a mut ClassDef,
    /// Mixins resolved so far as `(key, class)`
    pub mixins: &'a mut Vec<(String, ClassRef)>,
    /// Registry services
    pub env: &'a mut dyn BuildEnv,
}

/// One step of the construction pipeline
pub trait Preprocessor {
    /// Registered name
    fn name(&self) -> &str;

    /// Whether the step has anything to do for this declaration
    fn applies(&self, _def: &ClassDef) -> bool {
        true
    }

    /// Run the step
    fn process(&self, ctx: &mut BuildContext<'_>) -> ClassResult<Flow>;
}

/// A class under construction
pub struct BuildJob {
    pub(crate) class: ClassRef,
    pub(crate) def: ClassDef,
    pub(crate) stack: Vec<Rc<dyn Preprocessor>>,
    pub(crate) cursor: usize,
    pub(crate) mixins: Vec<(String, ClassRef)>,
}

impl BuildJob {
    /// Class being built
    pub fn class(&self) -> &ClassRef {
        &self.class
    }

    /// Declaration being consumed
    pub fn def(&self) -> &ClassDef {
        &self.def
    }

    /// Name of the step that runs next, if any
    pub fn current_step(&self) -> Option<&str> {
        self.stack.get(self.cursor).map(|p| p.name())
    }
}

impl fmt::Debug for BuildJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildJob")
            .field("class", &self.class)
            .field("cursor", &self.cursor)
            .field("step", &self.current_step())
            .finish()
    }
}

/// Preprocessor registry and pipeline driver
pub struct ClassBuilder {
    registry: FxHashMap<String, Rc<dyn Preprocessor>>,
    order: Vec<String>,
}

impl Default for ClassBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassBuilder {
    /// Builder with the default preprocessors
    pub fn new() -> Self {
        let mut builder = Self {
            registry: FxHashMap::default(),
            order: Vec::new(),
        };
        for preprocessor in preprocessors::defaults() {
            builder.register(preprocessor, Position::Last);
        }
        builder
    }

    /// Register (or move) a preprocessor
    pub fn register(&mut self, preprocessor: Rc<dyn Preprocessor>, position: Position) {
        let name = preprocessor.name().to_string();
        place(&mut self.order, &name, &position);
        self.registry.insert(name, preprocessor);
    }

    /// Preprocessor names in default order
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Preprocessor by name
    pub fn get(&self, name: &str) -> Option<Rc<dyn Preprocessor>> {
        self.registry.get(name).cloned()
    }

    /// Stack for a declaration, honouring its own `preprocessors` order
    pub fn stack_for(&self, def: &ClassDef) -> ClassResult<Vec<Rc<dyn Preprocessor>>> {
        let names = def.preprocessors.as_ref().unwrap_or(&self.order);
        names
            .iter()
            .map(|name| {
                self.get(name).ok_or_else(|| {
                    ClassError::InvalidDeclaration(format!("unknown preprocessor {:?}", name))
                })
            })
            .collect()
    }

    /// Create the class shell and the job that will build it
    pub fn start(&self, name: Option<&str>, def: ClassDef) -> ClassResult<BuildJob> {
        let stack = self.stack_for(&def)?;
        Ok(BuildJob {
            class: ClassRef::new(name),
            def,
            stack,
            cursor: 0,
            mixins: Vec::new(),
        })
    }

    /// Run a job from its cursor
    ///
    /// Returns [`Flow::Await`] if a step suspended; the same step runs again
    /// when the job is resumed. On [`Flow::Continue`] the class is complete.
    pub fn run(job: &mut BuildJob, env: &mut dyn BuildEnv) -> ClassResult<Flow> {
        while job.cursor < job.stack.len() {
            let step = job.stack[job.cursor].clone();
            if step.applies(&job.def) {
                tracing::debug!(
                    class = %job.class.display_name(),
                    step = step.name(),
                    "running preprocessor"
                );
                let mut ctx = BuildContext {
                    class: &job.class,
                    def: &mut job.def,
                    mixins: &mut job.mixins,
                    env: &mut *env,
                };
                if let Flow::Await(deps) = step.process(&mut ctx)? {
                    return Ok(Flow::Await(deps));
                }
            }
            job.cursor += 1;
        }
        Self::finish(job, env)?;
        Ok(Flow::Continue)
    }

    fn finish(job: &mut BuildJob, env: &mut dyn BuildEnv) -> ClassResult<()> {
        let class = &job.class;
        if let Some(config) = job.def.mixin_config.take() {
            class.set_mixin_config(config);
        }
        class.add_members(&job.def.members);
        for (key, mixin) in &job.mixins {
            mixins::apply_mixin(class, key, mixin, &*env)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ClassBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassBuilder")
            .field("order", &self.order)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_order() {
        let builder = ClassBuilder::new();
        assert_eq!(
            builder.order(),
            [
                "className",
                "loader",
                "extend",
                "statics",
                "inheritableStatics",
                "mixins",
                "config",
                "xtype"
            ]
        );
    }

    #[test]
    fn test_place() {
        let mut order: Vec<String> = vec!["a".into(), "b".into(), "c".into()];
        place(&mut order, "x", &Position::Before("b".into()));
        assert_eq!(order, ["a", "x", "b", "c"]);
        place(&mut order, "x", &Position::After("c".into()));
        assert_eq!(order, ["a", "b", "c", "x"]);
        place(&mut order, "c", &Position::First);
        assert_eq!(order, ["c", "a", "b", "x"]);
        place(&mut order, "y", &Position::After("missing".into()));
        assert_eq!(order, ["c", "a", "b", "x", "y"]);
    }

    #[test]
    fn test_declaration_order_override() {
        let builder = ClassBuilder::new();
        let def = ClassDef::new().preprocessors(&["className", "extend"]);
        let stack = builder.stack_for(&def).unwrap();
        let names: Vec<&str> = stack.iter().map(|p| p.name()).collect();
        assert_eq!(names, ["className", "extend"]);

        let bad = ClassDef::new().preprocessors(&["nope"]);
        assert!(builder.stack_for(&bad).is_err());
    }
}

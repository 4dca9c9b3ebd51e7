//! Config properties
//!
//! Declarative `config` blocks become [`ConfigProperty`] descriptors held by
//! each class's [`Configurator`]. Every config gets a generated getter and
//! setter; the setter runs `apply<Name>` and `update<Name>` when the class
//! defines them.

pub(crate) mod configurator;
mod property;

pub use configurator::{Configurator, InitPlan, PlanEntry};
pub use property::{ConfigDecl, ConfigNames, ConfigOptions, ConfigProperty, MergeStrategy};

/// How a config is initialised when an instance is configured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InitKind {
    /// Null default and no applier: nothing to do
    Skip = 0,
    /// Pushed through the setter for every instance
    PerInstance = 1,
    /// Computed by the first instance, then served from the class
    Cached = 2,
}

impl InitKind {
    /// Numeric code (0, 1 or 2)
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for InitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InitKind::Skip => f.write_str("skip"),
            InitKind::PerInstance => f.write_str("per-instance"),
            InitKind::Cached => f.write_str("cached"),
        }
    }
}

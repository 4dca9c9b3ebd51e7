//! Classkit Engine
//!
//! A class system for a dynamically-typed object model:
//! - **Inventory**: class names, aliases, alternate names, namespace paths
//!   and wildcard name queries (`inventory` module)
//! - **Config**: declarative config properties with generated accessors,
//!   merge strategies, lazy and cached initialisation (`config` module)
//! - **Builder**: the preprocessor pipeline that turns a declaration into a
//!   wired class, including mixins and `callParent` chains (`builder` module)
//! - **Manager**: define/create/override façade with deferred creation and
//!   override application (`manager` module)
//!
//! # Example
//!
//! ```rust,ignore
//! use classkit_engine::{ClassDef, ClassManager, ConfigDecl, Value};
//!
//! let mut manager = ClassManager::new();
//! manager.define(Some("A"), ClassDef::new().config("foo", 1))?;
//! manager.define(
//!     Some("B"),
//!     ClassDef::new().extend("A").config_with("foo", ConfigDecl::new(2).lazy(true)),
//! )?;
//!
//! let b = manager.create("B", &[])?;
//! assert_eq!(b.call("getFoo", &[])?, Value::from(2));
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![allow(clippy::derivable_impls)]
#![allow(clippy::redundant_closure)]
#![allow(clippy::needless_return)]

// ============================================================================
// Core Modules
// ============================================================================

/// Builder module: declarations, preprocessor pipeline and mixin wiring
pub mod builder;

/// Config module: config properties and the per-class configurator
pub mod config;

/// Diagnostics: non-fatal warnings recorded alongside tracing output
pub mod diagnostics;

/// Inventory module: name, alias, alternate and path registry
pub mod inventory;

/// Loader module: on-demand declaration loading and the manifest format
pub mod loader;

/// Manager module: the define/create/override façade
pub mod manager;

/// Object model: classes, instances, methods and invocations
pub mod object;

/// Dynamic values
pub mod value;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::{
    BuildContext, BuildEnv, BuildJob, ClassBuilder, ClassDef, ClassSpecifier, Flow,
    HookDescriptor, HookKind, MixinConfig, MixinDecl, Position, Preprocessor,
};
pub use config::{
    ConfigDecl, ConfigNames, ConfigOptions, ConfigProperty, Configurator, InitKind, InitPlan,
    MergeStrategy, PlanEntry,
};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use inventory::{Exclusion, Inventory};
pub use loader::{
    FsLoader, LoadError, LoadOutcome, LoadRequest, Loader, LoaderManifest, LoaderSettings,
    ManifestError, MemoryLoader, RequestLog,
};
pub use manager::{ClassManager, ClassState, DefineOutcome, Postprocessor, BASE_CLASS, MIXIN_CLASS};
pub use object::{ClassRef, InstanceRef, Invocation, Member, Method, MethodKind};
pub use value::{Function, NativeFn, PropertyMap, Value};

/// Class system errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClassError {
    /// Class name is empty or otherwise unusable
    #[error("Invalid class name: {0:?}")]
    InvalidClassName(String),

    /// Alias or alternate name is empty or not a string
    #[error("Invalid alias for {class}: {alias:?}")]
    InvalidAlias {
        /// Class the alias was declared on
        class: String,
        /// Offending alias
        alias: String,
    },

    /// xtype is empty or not a string
    #[error("Invalid xtype for {class}: {xtype:?}")]
    InvalidXType {
        /// Class the xtype was declared on
        class: String,
        /// Offending xtype
        xtype: String,
    },

    /// A declaration key holds a value of the wrong shape
    #[error("Invalid declaration: {0}")]
    InvalidDeclaration(String),

    /// No class is registered (or loadable) under the name
    #[error("Class not found: {0}")]
    ClassNotFound(String),

    /// The registered value cannot be instantiated or extended
    #[error("Cannot instantiate {0}: it is a singleton instance")]
    NotInstantiable(String),

    /// A class waits on itself
    #[error("Circular dependency: {0} requires itself")]
    CircularDependency(String),

    /// Method lookup failed (also raised for undeclared config accessors)
    #[error("{class}.{method} is not a function")]
    MethodNotFound {
        /// Class (or instance class) the lookup ran on
        class: String,
        /// Missing member name
        method: String,
    },

    /// `callParent` was used where no parent implementation exists
    #[error("No parent method {method} found above {class}")]
    NoParentMethod {
        /// Owner class of the calling method
        class: String,
        /// Method name
        method: String,
    },

    /// A method was invoked on the wrong kind of receiver
    #[error("Type error: {0}")]
    TypeError(String),

    /// A config merge function failed
    #[error("Merge of config {config} failed: {reason}")]
    MergeFailed {
        /// Config name
        config: String,
        /// Failure message
        reason: String,
    },

    /// The loader could not deliver a declaration
    #[error("Load error: {0}")]
    LoadFailed(String),

    /// A pending class was cancelled
    #[error("Class {name} failed: {reason}")]
    Cancelled {
        /// Pending class name
        name: String,
        /// Reason given on cancellation
        reason: String,
    },

    /// Error raised by user code (methods, hooks, appliers)
    #[error("{0}")]
    Raised(String),
}

impl From<String> for ClassError {
    fn from(s: String) -> Self {
        ClassError::Raised(s)
    }
}

impl From<&str> for ClassError {
    fn from(s: &str) -> Self {
        ClassError::Raised(s.to_string())
    }
}

impl From<LoadError> for ClassError {
    fn from(e: LoadError) -> Self {
        ClassError::LoadFailed(e.to_string())
    }
}

/// Class system result
pub type ClassResult<T> = Result<T, ClassError>;

//! Declaration loading
//!
//! The manager asks a [`Loader`] for a class it cannot find. A loader either
//! returns declarations right away or reports that they will arrive later
//! (the caller then defines them itself when they do).

mod fs;
mod manifest;

pub use fs::FsLoader;
pub use manifest::{LoaderManifest, LoaderSettings, ManifestError};

use crate::builder::ClassDef;
use rustc_hash::{FxHashMap, FxHashSet};
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;

/// Loader errors
#[derive(Debug, Error)]
pub enum LoadError {
    /// Nothing to load for the class
    #[error("No source for {class_name} (looked in {path})")]
    NotFound {
        /// Requested class
        class_name: String,
        /// Resolved path
        path: String,
    },

    /// File could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File path
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File is not valid JSON
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        /// File path
        path: String,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// File parsed but does not hold declarations
    #[error("Invalid declaration in {path}: {reason}")]
    Declaration {
        /// File path
        path: String,
        /// What was wrong
        reason: String,
    },
}

/// A request for a class's declarations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    /// Canonical class name
    pub class_name: String,
    /// Path from the inventory's namespace table
    pub path: String,
}

/// Result of a load request
#[derive(Debug)]
pub enum LoadOutcome {
    /// Declarations to define now
    Loaded(Vec<ClassDef>),
    /// Declarations will be defined later by the caller
    Deferred,
}

/// Source of class declarations
pub trait Loader {
    /// Fetch declarations for a class
    fn load(&mut self, request: &LoadRequest) -> Result<LoadOutcome, LoadError>;
}

/// Shared log of requests seen by a [`MemoryLoader`]
#[derive(Debug, Clone, Default)]
pub struct RequestLog(Rc<RefCell<Vec<LoadRequest>>>);

impl RequestLog {
    /// Requests in arrival order
    pub fn requests(&self) -> Vec<LoadRequest> {
        self.0.borrow().clone()
    }

    /// Requested class names in arrival order
    pub fn class_names(&self) -> Vec<String> {
        self.0.borrow().iter().map(|r| r.class_name.clone()).collect()
    }
}

/// In-memory loader
///
/// Each registered class is served once. Classes marked deferred answer
/// [`LoadOutcome::Deferred`], standing in for an asynchronous fetch.
#[derive(Debug, Default)]
pub struct MemoryLoader {
    sources: FxHashMap<String, Vec<ClassDef>>,
    deferred: FxHashSet<String>,
    log: RequestLog,
}

impl MemoryLoader {
    /// Empty loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `def` when `class_name` is requested
    pub fn with(mut self, class_name: &str, def: ClassDef) -> Self {
        self.add(class_name, def);
        self
    }

    /// Serve `def` when `class_name` is requested
    pub fn add(&mut self, class_name: &str, def: ClassDef) {
        let def = match def.name {
            Some(_) => def,
            None => def.named(class_name),
        };
        self.sources
            .entry(class_name.to_string())
            .or_default()
            .push(def);
    }

    /// Answer requests for `class_name` with `Deferred`
    pub fn defer(mut self, class_name: &str) -> Self {
        self.deferred.insert(class_name.to_string());
        self
    }

    /// Handle on the request log
    pub fn request_log(&self) -> RequestLog {
        self.log.clone()
    }
}

impl Loader for MemoryLoader {
    fn load(&mut self, request: &LoadRequest) -> Result<LoadOutcome, LoadError> {
        self.log.0.borrow_mut().push(request.clone());
        if self.deferred.contains(&request.class_name) {
            return Ok(LoadOutcome::Deferred);
        }
        match self.sources.remove(&request.class_name) {
            Some(defs) => Ok(LoadOutcome::Loaded(defs)),
            None => Err(LoadError::NotFound {
                class_name: request.class_name.clone(),
                path: request.path.clone(),
            }),
        }
    }
}

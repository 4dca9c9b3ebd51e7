//! Per-class lifecycle state

use crate::object::ClassRef;
use crate::value::Value;
use std::fmt;

/// Where a named class is in its lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassState {
    /// `define` was called; nothing has run yet
    Requested,
    /// Suspended until the listed classes are created
    AwaitingDependencies(Vec<String>),
    /// The pipeline is running
    Building,
    /// Registered and usable
    Ready,
    /// Terminal: the build failed or was cancelled
    Failed(String),
}

impl ClassState {
    /// True for states that can still reach `Ready`
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            ClassState::Requested | ClassState::AwaitingDependencies(_) | ClassState::Building
        )
    }
}

impl fmt::Display for ClassState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassState::Requested => write!(f, "requested"),
            ClassState::AwaitingDependencies(deps) => {
                write!(f, "awaiting {}", deps.join(", "))
            }
            ClassState::Building => write!(f, "building"),
            ClassState::Ready => write!(f, "ready"),
            ClassState::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Result of `define`
#[derive(Debug, Clone)]
pub enum DefineOutcome {
    /// Created; holds the class, or the instance for singletons
    Ready(Value),
    /// Suspended until the listed classes are created
    Pending(Vec<String>),
}

impl DefineOutcome {
    /// Registered value, if created
    pub fn value(&self) -> Option<&Value> {
        match self {
            DefineOutcome::Ready(value) => Some(value),
            DefineOutcome::Pending(_) => None,
        }
    }

    /// Created class (the instance's class for singletons)
    pub fn class(&self) -> Option<ClassRef> {
        match self.value()? {
            Value::Class(class) => Some(class.clone()),
            Value::Instance(instance) => Some(instance.class().clone()),
            _ => None,
        }
    }

    /// True if the class was created synchronously
    pub fn is_ready(&self) -> bool {
        matches!(self, DefineOutcome::Ready(_))
    }
}

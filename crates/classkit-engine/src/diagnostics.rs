//! Non-fatal diagnostics
//!
//! Duplicate definitions, alias reassignment and stalled deferred work are
//! warnings, not errors. Each one is emitted through `tracing` and also kept
//! in a shared list so embedders (and tests) can inspect what happened
//! without installing a subscriber.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Category of a recorded diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// A class name was defined again
    DuplicateClass,
    /// An alias now points at a different class
    AliasReassigned,
    /// An alternate name now points at a different class
    AlternateReassigned,
    /// A class is still waiting on dependencies
    StalledClass,
    /// An override's target was never created
    StalledOverride,
    /// A deferred build or override failed after suspension
    DeferredFailure,
    /// A `uses` dependency could not be loaded
    MissingUse,
    /// Aliases were declared on an anonymous class and ignored
    AnonymousAlias,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DiagnosticKind::DuplicateClass => "duplicate-class",
            DiagnosticKind::AliasReassigned => "alias-reassigned",
            DiagnosticKind::AlternateReassigned => "alternate-reassigned",
            DiagnosticKind::StalledClass => "stalled-class",
            DiagnosticKind::StalledOverride => "stalled-override",
            DiagnosticKind::DeferredFailure => "deferred-failure",
            DiagnosticKind::MissingUse => "missing-use",
            DiagnosticKind::AnonymousAlias => "anonymous-alias",
        };
        f.write_str(s)
    }
}

/// A single recorded warning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Category
    pub kind: DiagnosticKind,
    /// Human-readable message
    pub message: String,
}

/// Shared diagnostics sink
#[derive(Debug, Clone, Default)]
pub struct Diagnostics(Rc<RefCell<Vec<Diagnostic>>>);

impl Diagnostics {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning and emit it through `tracing`
    pub fn warn(&self, kind: DiagnosticKind, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(kind = %kind, "{}", message);
        self.0.borrow_mut().push(Diagnostic { kind, message });
    }

    /// Snapshot of everything recorded so far
    pub fn entries(&self) -> Vec<Diagnostic> {
        self.0.borrow().clone()
    }

    /// Count entries of one kind
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.0.borrow().iter().filter(|d| d.kind == kind).count()
    }

    /// Drop all recorded entries
    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

//! Deferred "class created" listeners

use super::overrides::OverrideJob;
use super::ClassManager;
use crate::builder::BuildJob;
use crate::value::Value;
use crate::ClassResult;
use std::fmt;

/// Callback run once a defined class is created
pub(crate) type CreatedCallback = Box<dyn FnOnce(&mut ClassManager, &Value) -> ClassResult<()>>;

/// Callback run once a named class exists
pub(crate) type Callback = Box<dyn FnOnce(&mut ClassManager) -> ClassResult<()>>;

pub(crate) enum Action {
    Callback(Callback),
    ResumeBuild {
        name: Option<String>,
        job: BuildJob,
        on_created: Option<CreatedCallback>,
    },
    ApplyOverride(OverrideJob),
}

/// One-shot listener on a class's creation
pub(crate) struct Listener {
    /// Class being waited for
    pub(crate) waiting_on: String,
    pub(crate) action: Action,
}

impl Listener {
    /// Name of the class or override this listener would complete
    pub(crate) fn owner(&self) -> Option<&str> {
        match &self.action {
            Action::Callback(_) => None,
            Action::ResumeBuild { name, .. } => name.as_deref(),
            Action::ApplyOverride(job) => job.name.as_deref(),
        }
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.action {
            Action::Callback(_) => "callback",
            Action::ResumeBuild { .. } => "build",
            Action::ApplyOverride(_) => "override",
        };
        f.debug_struct("Listener")
            .field("waiting_on", &self.waiting_on)
            .field("kind", &kind)
            .field("owner", &self.owner())
            .finish()
    }
}

impl ClassManager {
    /// Run every listener waiting on one of `names`, in registration order
    ///
    /// Listeners are removed before they run, so a listener that
    /// registers a new one for the same name is not re-entered.
    pub(crate) fn trigger_created(&mut self, names: &[String]) {
        while let Some(index) = self
            .listeners
            .iter()
            .position(|l| names.contains(&l.waiting_on))
        {
            let listener = self.listeners.remove(index);
            self.run_listener(listener);
        }
    }

    fn run_listener(&mut self, listener: Listener) {
        let Listener { waiting_on, action } = listener;
        tracing::debug!(class = %waiting_on, "running created listener");
        match action {
            Action::Callback(callback) => {
                if let Err(e) = callback(self) {
                    self.diagnostics.warn(
                        crate::DiagnosticKind::DeferredFailure,
                        format!("listener on {} failed: {}", waiting_on, e),
                    );
                }
            }
            Action::ResumeBuild {
                name,
                job,
                on_created,
            } => {
                if let Err(e) = self.drive(name.clone(), job, on_created) {
                    self.deferred_failure(name, e.to_string());
                }
            }
            Action::ApplyOverride(job) => {
                let name = job.name.clone();
                if let Err(e) = self.advance_override(job) {
                    self.deferred_failure(name, e.to_string());
                }
            }
        }
    }

    fn deferred_failure(&mut self, name: Option<String>, reason: String) {
        let label = name.as_deref().unwrap_or("(anonymous)").to_string();
        self.diagnostics.warn(
            crate::DiagnosticKind::DeferredFailure,
            format!("deferred creation of {} failed: {}", label, reason),
        );
        if let Some(name) = name {
            self.mark_failed(&name, reason.clone());
            self.cancel_waiters(&name, &reason);
        }
    }

    /// Fail everything (transitively) waiting on `name`
    pub(crate) fn cancel_waiters(&mut self, name: &str, reason: &str) {
        let mut failed = vec![name.to_string()];
        while let Some(current) = failed.pop() {
            let (waiting, rest): (Vec<Listener>, Vec<Listener>) = std::mem::take(&mut self.listeners)
                .into_iter()
                .partition(|l| l.waiting_on == current);
            self.listeners = rest;
            for listener in waiting {
                if let Some(owner) = listener.owner().map(str::to_string) {
                    let why = format!("dependency {} failed: {}", current, reason);
                    tracing::warn!(class = %owner, reason = %why, "cancelling pending class");
                    self.mark_failed(&owner, why);
                    failed.push(owner);
                }
            }
        }
    }
}

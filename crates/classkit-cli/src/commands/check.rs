//! `classkit check`: Define everything and report what did not settle.

use crate::output::StyledOutput;
use crate::session::Session;
use anyhow::bail;

/// Outcome of a check run
#[derive(Debug, Default)]
pub struct CheckSummary {
    pub defined: usize,
    pub failures: Vec<(String, String)>,
    pub pending: Vec<(String, String)>,
    pub unresolved_overrides: Vec<String>,
    pub warnings: Vec<String>,
}

impl CheckSummary {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.pending.is_empty()
    }
}

pub fn summarize(session: &Session) -> CheckSummary {
    let manager = &session.manager;
    manager.report_stalled();

    let pending = manager
        .pending()
        .into_iter()
        .map(|name| {
            let state = manager
                .state(&name)
                .map(|s| s.to_string())
                .unwrap_or_default();
            (name, state)
        })
        .collect();

    CheckSummary {
        defined: session.defined,
        failures: session
            .failures
            .iter()
            .map(|f| (f.name.clone(), f.reason.clone()))
            .collect(),
        pending,
        unresolved_overrides: manager.unresolved_overrides(),
        warnings: manager
            .diagnostics()
            .entries()
            .into_iter()
            .map(|d| format!("[{}] {}", d.kind, d.message))
            .collect(),
    }
}

pub fn execute(session: &Session, out: &mut StyledOutput) -> anyhow::Result<()> {
    let summary = summarize(session);

    if let Some(manifest) = &session.manifest {
        out.field("sync loading", if manifest.loader.sync { "on" } else { "off" });
        out.field("prefixes", &manifest.paths.keys().cloned().collect::<Vec<_>>().join(", "));
    }
    out.line(&format!("{} declarations defined", summary.defined));
    for warning in &summary.warnings {
        out.warning("warning");
        out.line(&format!(": {}", warning));
    }
    for (name, reason) in &summary.failures {
        out.error("failed");
        out.line(&format!(": {}: {}", name, reason));
    }
    for (name, state) in &summary.pending {
        out.error("pending");
        out.line(&format!(": {} ({})", name, state));
    }
    if !summary.unresolved_overrides.is_empty() {
        out.line(&format!(
            "overrides waiting on: {}",
            summary.unresolved_overrides.join(", ")
        ));
    }

    if !summary.is_clean() {
        bail!(
            "{} failed, {} pending",
            summary.failures.len(),
            summary.pending.len()
        );
    }
    out.success("ok");
    out.line("");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionOptions;
    use classkit_engine::ClassDef;

    #[test]
    fn test_summary_lists_pending_and_overrides() {
        let mut session = Session::open(&SessionOptions::default()).unwrap();
        session
            .manager
            .define(Some("Grid"), ClassDef::new().extend("Store"))
            .unwrap();
        session
            .manager
            .define(None, ClassDef::new().override_of("Chart"))
            .unwrap();
        session.manager.define(Some("Ok"), ClassDef::new()).unwrap();

        let summary = summarize(&session);
        assert!(!summary.is_clean());
        assert_eq!(
            summary.pending,
            vec![("Grid".to_string(), "awaiting Store".to_string())]
        );
        assert_eq!(summary.unresolved_overrides, vec!["Chart"]);
        assert_eq!(summary.warnings.len(), 2);
        assert!(summary.warnings[0].starts_with("[stalled-class]"));
    }

    #[test]
    fn test_clean_summary() {
        let mut session = Session::open(&SessionOptions::default()).unwrap();
        session.manager.define(Some("Ok"), ClassDef::new()).unwrap();
        assert!(summarize(&session).is_clean());
    }
}

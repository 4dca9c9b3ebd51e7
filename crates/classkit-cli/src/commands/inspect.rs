//! `classkit inspect`: Describe a class.

use crate::commands::resolve;
use crate::output::StyledOutput;
use crate::session::Session;
use anyhow::Context;
use classkit_engine::{ClassRef, InitKind, MergeStrategy, Value};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ConfigReport {
    pub name: String,
    pub default: String,
    pub init: &'static str,
    pub lazy: bool,
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClassReport {
    pub name: String,
    pub singleton: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub superclass: Option<String>,
    pub ancestors: Vec<String>,
    pub aliases: Vec<String>,
    pub alternate_names: Vec<String>,
    pub xtypes: Vec<String>,
    pub mixins: Vec<(String, String)>,
    pub configs: Vec<ConfigReport>,
    pub members: Vec<String>,
    pub statics: Vec<String>,
}

fn init_label(kind: Option<InitKind>) -> &'static str {
    match kind {
        Some(InitKind::Skip) => "skip",
        Some(InitKind::PerInstance) => "per-instance",
        Some(InitKind::Cached) => "cached",
        None => "none",
    }
}

fn merge_label(strategy: &MergeStrategy) -> &'static str {
    match strategy {
        MergeStrategy::Replace => "replace",
        MergeStrategy::Concat => "concat",
        MergeStrategy::Objects => "objects",
        MergeStrategy::Custom(_) => "custom",
    }
}

fn config_report(class: &ClassRef, name: &str) -> ConfigReport {
    let property = class.find_config(name);
    ConfigReport {
        name: name.to_string(),
        default: class.config_default(name).to_string(),
        init: init_label(class.init_kind(name)),
        lazy: property.as_ref().map_or(false, |p| p.is_lazy()),
        cached: property.as_ref().map_or(false, |p| p.is_cached()),
        merge: property
            .and_then(|p| p.merge())
            .map(|m| merge_label(&m).to_string()),
    }
}

/// Build a report for a registered class or singleton
pub fn report(name: &str, value: &Value) -> anyhow::Result<ClassReport> {
    let (class, singleton) = match value {
        Value::Class(class) => (class.clone(), false),
        Value::Instance(instance) => (instance.class().clone(), true),
        other => anyhow::bail!("{} is registered as {}", name, other.type_name()),
    };

    Ok(ClassReport {
        name: name.to_string(),
        singleton,
        superclass: class.superclass().map(|s| s.display_name().to_string()),
        ancestors: class
            .ancestors()
            .skip(1)
            .map(|c| c.display_name().to_string())
            .collect(),
        aliases: class.aliases(),
        alternate_names: class.alternate_names(),
        xtypes: class.xtypes_chain(),
        mixins: class
            .mixins()
            .into_iter()
            .map(|(key, mixin)| (key, mixin.display_name().to_string()))
            .collect(),
        configs: class
            .config_names()
            .iter()
            .map(|n| config_report(&class, n))
            .collect(),
        members: class.own_member_names(),
        statics: class.static_names(),
    })
}

fn list(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}

fn render(report: &ClassReport, out: &mut StyledOutput) {
    out.heading(&report.name);
    out.field(
        "kind",
        if report.singleton { "singleton" } else { "class" },
    );
    out.field("ancestors", &list(&report.ancestors));
    out.field("aliases", &list(&report.aliases));
    out.field("alternates", &list(&report.alternate_names));
    out.field("xtypes", &list(&report.xtypes));
    let mixins: Vec<String> = report
        .mixins
        .iter()
        .map(|(key, class)| {
            if key == class {
                key.clone()
            } else {
                format!("{} ({})", key, class)
            }
        })
        .collect();
    out.field("mixins", &list(&mixins));
    out.field("members", &list(&report.members));
    out.field("statics", &list(&report.statics));

    if report.configs.is_empty() {
        return;
    }
    out.line("");
    out.heading("configs");
    for config in &report.configs {
        let mut flags = vec![config.init.to_string()];
        if config.lazy {
            flags.push("lazy".to_string());
        }
        if let Some(merge) = &config.merge {
            flags.push(format!("merge={}", merge));
        }
        out.field(
            &format!("  {}", config.name),
            &format!("{} [{}]", config.default, flags.join(" ")),
        );
    }
}

pub fn execute(
    session: &mut Session,
    name: &str,
    json: bool,
    out: &mut StyledOutput,
) -> anyhow::Result<()> {
    let resolution = resolve::resolve(session, name)?;
    let value = session
        .manager
        .get(&resolution.class_name)
        .with_context(|| format!("{} vanished after loading", resolution.class_name))?;
    let report = report(&resolution.class_name, &value)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        render(&report, out);
    }
    Ok(())
}

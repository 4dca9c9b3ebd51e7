//! `classkit query`: Expand name expressions.

use crate::session::Session;
use classkit_engine::Inventory;

/// Names matching `patterns` that no `exclude` pattern matches
pub fn select(inventory: &Inventory, patterns: &[String], exclude: &[String]) -> Vec<String> {
    inventory.exclude(exclude).select(patterns)
}

pub fn execute(session: &Session, patterns: &[String], exclude: &[String]) -> anyhow::Result<()> {
    for name in select(session.manager.inventory(), patterns, exclude) {
        println!("{}", name);
    }
    Ok(())
}

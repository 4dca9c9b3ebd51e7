//! Subcommand implementations

pub mod check;
pub mod inspect;
pub mod path;
pub mod query;
pub mod resolve;

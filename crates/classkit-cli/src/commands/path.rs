//! `classkit path`: Show where a class would be loaded from.

use crate::session::Session;

pub fn execute(session: &Session, class_name: &str) -> anyhow::Result<()> {
    let inventory = session.manager.inventory();
    let resolved = inventory.resolve_name(class_name);
    println!("{}", inventory.get_path(&resolved));
    Ok(())
}

//! `classkit resolve`: Map a name, alias or alternate name to its class.

use crate::session::Session;
use anyhow::bail;
use classkit_engine::Inventory;

/// How a requested name reached its class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Via {
    Name,
    Alias,
    Alternate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub requested: String,
    pub class_name: String,
    pub via: Via,
}

fn classify(inventory: &Inventory, name: &str) -> Via {
    if inventory.is_known_name(name) {
        Via::Name
    } else if !inventory.get_name_by_alias(name).is_empty() {
        Via::Alias
    } else if !inventory.get_name_by_alternate(name).is_empty() {
        Via::Alternate
    } else {
        Via::Name
    }
}

/// Resolve `name`, loading its class through the manifest if needed
pub fn resolve(session: &mut Session, name: &str) -> anyhow::Result<Resolution> {
    let class_name = session.manager.inventory().resolve_name(name);
    session.manager.try_load(&class_name)?;
    // Loading may have registered the alias
    let class_name = session.manager.inventory().resolve_name(name);
    if !session.manager.is_defined(&class_name) {
        match session.manager.state(&class_name) {
            Some(state) => bail!("{} is not available: {}", class_name, state),
            None => bail!("Class not found: {}", name),
        }
    }
    Ok(Resolution {
        requested: name.to_string(),
        via: classify(session.manager.inventory(), name),
        class_name,
    })
}

pub fn execute(session: &mut Session, name: &str) -> anyhow::Result<()> {
    let resolution = resolve(session, name)?;
    match resolution.via {
        Via::Name => println!("{}", resolution.class_name),
        Via::Alias => println!("{} (alias {})", resolution.class_name, resolution.requested),
        Via::Alternate => println!(
            "{} (alternate name {})",
            resolution.class_name, resolution.requested
        ),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionOptions;
    use classkit_engine::ClassDef;

    fn session() -> Session {
        let mut session = Session::open(&SessionOptions::default()).unwrap();
        session
            .manager
            .define(
                Some("Ui.Button"),
                ClassDef::new()
                    .xtype("button")
                    .alternate_class_name("Legacy.Button"),
            )
            .unwrap();
        session
            .manager
            .define(Some("Ui.Split"), ClassDef::new().extend("Ui.Missing"))
            .unwrap();
        session
    }

    #[test]
    fn test_resolve_kinds() {
        let mut session = session();
        let by_alias = resolve(&mut session, "widget.button").unwrap();
        assert_eq!(by_alias.class_name, "Ui.Button");
        assert_eq!(by_alias.via, Via::Alias);

        let by_alternate = resolve(&mut session, "Legacy.Button").unwrap();
        assert_eq!(by_alternate.via, Via::Alternate);

        let by_name = resolve(&mut session, "Ui.Button").unwrap();
        assert_eq!(by_name.via, Via::Name);
    }

    #[test]
    fn test_unknown_and_pending() {
        let mut session = session();
        let err = resolve(&mut session, "Ui.Nothing").unwrap_err();
        assert!(err.to_string().contains("Class not found"));

        let err = resolve(&mut session, "Ui.Split").unwrap_err();
        assert!(err.to_string().contains("not available"));
    }
}

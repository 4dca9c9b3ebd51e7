//! Class manager setup shared by every command

use anyhow::{bail, Context};
use classkit_engine::{ClassManager, FsLoader, LoaderManifest};
use std::path::{Path, PathBuf};

/// Manifest looked up in the working directory when none is given
pub const DEFAULT_MANIFEST: &str = "classkit.toml";

/// Where declarations come from
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Explicit manifest path; must exist when given
    pub manifest: Option<PathBuf>,
    /// Directories whose declaration files are all defined up front
    pub load: Vec<PathBuf>,
}

/// A declaration eagerly defined from a `--load` directory that failed
#[derive(Debug, Clone)]
pub struct DefineFailure {
    pub name: String,
    pub reason: String,
}

/// A ready-to-query class manager
pub struct Session {
    pub manager: ClassManager,
    pub manifest: Option<LoaderManifest>,
    /// Declarations defined from `--load` directories
    pub defined: usize,
    pub failures: Vec<DefineFailure>,
}

impl Session {
    /// Apply the manifest (if any), install a filesystem loader rooted next
    /// to it, then define everything found in the `--load` directories
    pub fn open(options: &SessionOptions) -> anyhow::Result<Self> {
        let mut manager = ClassManager::new();

        let manifest_path = match &options.manifest {
            Some(path) if !path.is_file() => {
                bail!("manifest not found: {}", path.display())
            }
            Some(path) => Some(path.clone()),
            None => Some(PathBuf::from(DEFAULT_MANIFEST)).filter(|p| p.is_file()),
        };

        let manifest = match manifest_path {
            Some(path) => {
                let manifest = LoaderManifest::from_file(&path)
                    .with_context(|| format!("failed to read manifest {}", path.display()))?;
                manager.apply_manifest(&manifest)?;
                let root = manifest_root(&path);
                tracing::debug!(manifest = %path.display(), root = %root.display(), "manifest applied");
                manager.set_loader(FsLoader::new(root));
                Some(manifest)
            }
            None => {
                tracing::debug!("no manifest; lazy loading disabled");
                None
            }
        };

        let mut session = Session {
            manager,
            manifest,
            defined: 0,
            failures: Vec::new(),
        };
        for dir in &options.load {
            session.define_dir(dir)?;
        }
        Ok(session)
    }

    fn define_dir(&mut self, dir: &Path) -> anyhow::Result<()> {
        let extension = self.manager.inventory().extension().to_string();
        let defs = FsLoader::scan_dir(dir, &extension)
            .with_context(|| format!("failed to scan {}", dir.display()))?;
        tracing::debug!(dir = %dir.display(), count = defs.len(), "defining declarations");

        for def in defs {
            let name = def.name.clone();
            let label = name.clone().unwrap_or_else(|| "(anonymous)".to_string());
            if name.as_deref().map_or(false, |n| self.manager.is_defined(n)) {
                // Already pulled in by the loader as a dependency
                tracing::debug!(class = %label, "already defined");
                continue;
            }
            match self.manager.define(name.as_deref(), def) {
                Ok(_) => self.defined += 1,
                Err(e) => {
                    tracing::warn!(class = %label, error = %e, "definition failed");
                    self.failures.push(DefineFailure {
                        name: label,
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

fn manifest_root(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_malformed_declaration_fails_the_scan() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("classkit.toml");
        fs::write(&manifest, "[paths]\n\"App\" = \"app\"\n").unwrap();
        fs::create_dir_all(dir.path().join("decls")).unwrap();
        fs::write(
            dir.path().join("decls/all.json"),
            r#"[{"$className": "Shape"}, {"$className": "Bad", "extend": 3}]"#,
        )
        .unwrap();

        let err = Session::open(&SessionOptions {
            manifest: Some(manifest),
            load: vec![dir.path().join("decls")],
        })
        .err()
        .unwrap();
        // The malformed declaration is rejected while scanning
        assert!(err.to_string().contains("failed to scan"));
    }

    #[test]
    fn test_failed_definitions_are_collected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("a.json"),
            r#"[{"$className": "Shape"}, {"$className": "Circle", "extend": "Shape", "config": {"r": 1}}]"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("b.json"),
            r#"{"$className": "Oops", "mixins": ["Shape"], "preprocessors": ["nope"]}"#,
        )
        .unwrap();

        let session = Session::open(&SessionOptions {
            manifest: None,
            load: vec![dir.path().to_path_buf()],
        })
        .unwrap();
        assert_eq!(session.defined, 2);
        assert_eq!(session.failures.len(), 1);
        assert_eq!(session.failures[0].name, "Oops");
        assert!(session.manager.is_defined("Circle"));
    }

    #[test]
    fn test_missing_explicit_manifest() {
        let err = Session::open(&SessionOptions {
            manifest: Some(PathBuf::from("/nonexistent/classkit.toml")),
            load: Vec::new(),
        })
        .err()
        .unwrap();
        assert!(err.to_string().contains("manifest not found"));
    }

    #[test]
    fn test_manifest_root() {
        assert_eq!(manifest_root(Path::new("classkit.toml")), PathBuf::from("."));
        assert_eq!(
            manifest_root(Path::new("proj/classkit.toml")),
            PathBuf::from("proj")
        );
    }
}

//! Filesystem loader for JSON declaration files

use super::{LoadError, LoadOutcome, LoadRequest, Loader};
use crate::builder::ClassDef;
use crate::value::Value;
use std::path::{Path, PathBuf};

/// Reads declaration files below a base directory
///
/// A file holds one declaration object or an array of them. Objects carry
/// their class name in `$className`; a lone object without one takes the
/// requested name.
#[derive(Debug, Clone)]
pub struct FsLoader {
    base: PathBuf,
}

impl FsLoader {
    /// Loader rooted at `base`
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Base directory
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Parse every declaration in a file
    pub fn read_file(path: &Path) -> Result<Vec<ClassDef>, LoadError> {
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: display.clone(),
            source,
        })?;
        let json: serde_json::Value =
            serde_json::from_str(&content).map_err(|source| LoadError::Json {
                path: display.clone(),
                source,
            })?;

        let items = match json {
            serde_json::Value::Array(items) => items,
            object @ serde_json::Value::Object(_) => vec![object],
            other => {
                return Err(LoadError::Declaration {
                    path: display,
                    reason: format!("expected an object or array, got {}", other),
                })
            }
        };
        items
            .iter()
            .map(|item| {
                ClassDef::from_value(&Value::from(item)).map_err(|e| LoadError::Declaration {
                    path: display.clone(),
                    reason: e.to_string(),
                })
            })
            .collect()
    }

    /// Parse every file with `extension` below `dir`, in path order
    pub fn scan_dir(dir: &Path, extension: &str) -> Result<Vec<ClassDef>, LoadError> {
        let mut files = Vec::new();
        collect_files(dir, extension, &mut files)?;
        files.sort();

        let mut defs = Vec::new();
        for file in files {
            defs.extend(Self::read_file(&file)?);
        }
        Ok(defs)
    }
}

fn collect_files(dir: &Path, extension: &str, out: &mut Vec<PathBuf>) -> Result<(), LoadError> {
    let io_error = |source| LoadError::Io {
        path: dir.display().to_string(),
        source,
    };
    for entry in std::fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if path.is_dir() {
            collect_files(&path, extension, out)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some(extension) {
            out.push(path);
        }
    }
    Ok(())
}

impl Loader for FsLoader {
    fn load(&mut self, request: &LoadRequest) -> Result<LoadOutcome, LoadError> {
        let path = self.base.join(&request.path);
        if !path.is_file() {
            return Err(LoadError::NotFound {
                class_name: request.class_name.clone(),
                path: path.display().to_string(),
            });
        }
        let mut defs = Self::read_file(&path)?;
        if let [only] = defs.as_mut_slice() {
            if only.name.is_none() {
                only.name = Some(request.class_name.clone());
            }
        }
        tracing::debug!(
            class = %request.class_name,
            path = %path.display(),
            count = defs.len(),
            "loaded declarations"
        );
        Ok(LoadOutcome::Loaded(defs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_read_single_and_array() {
        let dir = tempfile::tempdir().unwrap();
        let single = dir.path().join("a.json");
        fs::write(&single, r#"{"$className": "A", "config": {"x": 1}}"#).unwrap();
        let many = dir.path().join("b.json");
        fs::write(&many, r#"[{"$className": "B"}, {"$className": "C", "extend": "B"}]"#).unwrap();

        assert_eq!(FsLoader::read_file(&single).unwrap().len(), 1);
        let defs = FsLoader::read_file(&many).unwrap();
        assert_eq!(defs[1].extend.as_ref().unwrap().label(), "B");
    }

    #[test]
    fn test_load_names_anonymous_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("app/view")).unwrap();
        fs::write(dir.path().join("app/view/Main.json"), r#"{"title": "main"}"#).unwrap();

        let mut loader = FsLoader::new(dir.path());
        let outcome = loader
            .load(&LoadRequest {
                class_name: "App.view.Main".to_string(),
                path: "app/view/Main.json".to_string(),
            })
            .unwrap();
        match outcome {
            LoadOutcome::Loaded(defs) => {
                assert_eq!(defs[0].name.as_deref(), Some("App.view.Main"))
            }
            LoadOutcome::Deferred => panic!("fs loader never defers"),
        }
    }

    #[test]
    fn test_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mut loader = FsLoader::new(dir.path());
        let missing = loader.load(&LoadRequest {
            class_name: "Nope".to_string(),
            path: "Nope.json".to_string(),
        });
        assert!(matches!(missing, Err(LoadError::NotFound { .. })));

        let bad = dir.path().join("bad.json");
        fs::write(&bad, "{not json").unwrap();
        assert!(matches!(FsLoader::read_file(&bad), Err(LoadError::Json { .. })));

        let scalar = dir.path().join("scalar.json");
        fs::write(&scalar, "3").unwrap();
        assert!(matches!(
            FsLoader::read_file(&scalar),
            Err(LoadError::Declaration { .. })
        ));
    }

    #[test]
    fn test_scan_dir_is_sorted_and_recursive() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("b.json"), r#"{"$className": "B"}"#).unwrap();
        fs::write(dir.path().join("a.json"), r#"{"$className": "A"}"#).unwrap();
        fs::write(dir.path().join("nested/c.json"), r#"{"$className": "C"}"#).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let names: Vec<String> = FsLoader::scan_dir(dir.path(), "json")
            .unwrap()
            .into_iter()
            .filter_map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }
}

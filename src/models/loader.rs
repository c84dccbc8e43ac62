//! JSON model artifact loader

use super::estimators::Artifact;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::info;

/// Loader for model artifacts stored under a single directory
pub struct ModelLoader {
    /// Directory containing the artifact files
    models_dir: PathBuf,
}

impl ModelLoader {
    /// Create a loader rooted at `models_dir`
    pub fn new<P: AsRef<Path>>(models_dir: P) -> Self {
        Self {
            models_dir: models_dir.as_ref().to_path_buf(),
        }
    }

    /// Directory the loader reads from
    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Load and validate a single artifact.
    ///
    /// A missing, unparsable or inconsistent file is an error; callers at
    /// startup treat it as fatal.
    pub fn load<T>(&self, file_name: &str, name: &str) -> Result<T>
    where
        T: DeserializeOwned + Artifact,
    {
        let path = self.models_dir.join(file_name);

        info!(artifact = %name, path = %path.display(), "Loading model artifact");

        let file = File::open(&path)
            .with_context(|| format!("Failed to open artifact {:?}", path))?;
        let artifact: T = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse artifact {:?}", path))?;
        artifact
            .validate()
            .with_context(|| format!("Artifact {:?} failed validation", path))?;

        info!(artifact = %name, "Artifact loaded successfully");

        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LabelEncoder, StandardScaler};
    use std::fs;

    #[test]
    fn test_load_valid_artifact() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("encoder.json"),
            r#"{"classes": ["Deportes", "Moda"]}"#,
        )
        .unwrap();

        let loader = ModelLoader::new(dir.path());
        let encoder: LabelEncoder = loader.load("encoder.json", "encoder").unwrap();
        assert_eq!(encoder.classes.len(), 2);
    }

    #[test]
    fn test_missing_artifact_fails() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ModelLoader::new(dir.path());
        let result: Result<LabelEncoder> = loader.load("absent.json", "encoder");
        assert!(result.is_err());
    }

    #[test]
    fn test_corrupt_artifact_fails() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("scaler.json"), b"\x80\x04not json").unwrap();
        let loader = ModelLoader::new(dir.path());
        let result: Result<StandardScaler> = loader.load("scaler.json", "scaler");
        assert!(result.is_err());
    }

    #[test]
    fn test_inconsistent_artifact_fails() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("scaler.json"),
            r#"{"mean": [1.0, 2.0], "scale": [1.0]}"#,
        )
        .unwrap();
        let loader = ModelLoader::new(dir.path());
        let result: Result<StandardScaler> = loader.load("scaler.json", "scaler");
        assert!(result.is_err());
    }
}

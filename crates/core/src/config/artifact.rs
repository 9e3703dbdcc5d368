//! On-disk layout of per-evaluation artifacts.
//!
//! Each evaluation owns a directory `{root}/{eval_id}/` holding the rendered
//! `config.yaml` and, once the computation succeeds, `clean_results.json`.

use std::path::{Path, PathBuf};

use super::EvaluationConfig;
use crate::error::CoreError;

/// File name of the rendered configuration.
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// File name the computation writes its results to.
pub const RESULTS_FILE_NAME: &str = "clean_results.json";

/// Resolves and writes artifact paths under a root directory.
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    root: PathBuf,
}

impl ArtifactLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory owned by one evaluation.
    pub fn eval_dir(&self, eval_id: &str) -> Result<PathBuf, CoreError> {
        if eval_id.is_empty()
            || eval_id.contains(['/', '\\'])
            || eval_id == "."
            || eval_id == ".."
        {
            return Err(CoreError::Validation(format!(
                "Evaluation id '{eval_id}' is not a valid artifact directory name"
            )));
        }
        Ok(self.root.join(eval_id))
    }

    pub fn config_path(&self, eval_id: &str) -> Result<PathBuf, CoreError> {
        Ok(self.eval_dir(eval_id)?.join(CONFIG_FILE_NAME))
    }

    pub fn results_path(&self, eval_id: &str) -> Result<PathBuf, CoreError> {
        Ok(self.eval_dir(eval_id)?.join(RESULTS_FILE_NAME))
    }

    /// Render `config` as YAML into the evaluation's directory.
    ///
    /// Returns the path written.
    pub async fn write_config(
        &self,
        eval_id: &str,
        config: &EvaluationConfig,
    ) -> Result<PathBuf, CoreError> {
        let dir = self.eval_dir(eval_id)?;
        let yaml = config.to_yaml()?;

        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            CoreError::Unavailable(format!(
                "Failed to create artifact directory {}: {e}",
                dir.display()
            ))
        })?;

        let path = dir.join(CONFIG_FILE_NAME);
        tokio::fs::write(&path, yaml).await.map_err(|e| {
            CoreError::Unavailable(format!("Failed to write {}: {e}", path.display()))
        })?;
        Ok(path)
    }

    /// Remove an evaluation's directory, ignoring a missing one.
    pub async fn remove(&self, eval_id: &str) -> Result<(), CoreError> {
        let dir = self.eval_dir(eval_id)?;
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CoreError::Internal(format!(
                "Failed to remove {}: {e}",
                dir.display()
            ))),
        }
    }
}

use crate::domain::ports::{AnomalyModel, LoadedModel, ModelStore};
use crate::infrastructure::ml::isolation_forest::IsolationForestModel;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info};

pub const JSON_ARTIFACT: &str = "model.json";
#[cfg(feature = "onnx")]
pub const ONNX_ARTIFACT: &str = "model.onnx";

/// Model registry on the local filesystem.
///
/// ```text
/// {root}/{name}/{stage}/model.json          promoted versions
/// {root}/{name}/runs/{run_id}/model.json    training runs
/// ```
pub struct FileModelStore {
    root: PathBuf,
}

impl FileModelStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn artifact_in(dir: &Path) -> Option<PathBuf> {
        let json = dir.join(JSON_ARTIFACT);
        if json.is_file() {
            return Some(json);
        }
        #[cfg(feature = "onnx")]
        {
            let onnx = dir.join(ONNX_ARTIFACT);
            if onnx.is_file() {
                return Some(onnx);
            }
        }
        None
    }

    async fn load_artifact(name: &str, path: &Path) -> Result<Arc<dyn AnomalyModel>> {
        #[cfg(feature = "onnx")]
        if path.extension().is_some_and(|ext| ext == "onnx") {
            let path = path.to_path_buf();
            let name = name.to_string();
            let model = tokio::task::spawn_blocking(move || {
                crate::infrastructure::ml::onnx_model::OnnxAnomalyModel::load(&name, &path)
            })
            .await
            .context("ONNX loader task failed")??;
            return Ok(Arc::new(model));
        }

        let model = IsolationForestModel::load(name, path)
            .await
            .with_context(|| format!("Failed to load model from {}", path.display()))?;
        Ok(Arc::new(model))
    }

    /// Newest run directory holding an artifact, by artifact mtime then run id.
    async fn latest_run(&self, name: &str) -> Result<Option<(String, PathBuf)>> {
        let runs_dir = self.root.join(name).join("runs");
        if !runs_dir.is_dir() {
            return Ok(None);
        }

        let mut entries = tokio::fs::read_dir(&runs_dir)
            .await
            .with_context(|| format!("Failed to list {}", runs_dir.display()))?;

        let mut best: Option<(SystemTime, String, PathBuf)> = None;
        while let Some(entry) = entries.next_entry().await? {
            let dir = entry.path();
            if !dir.is_dir() {
                continue;
            }
            let Some(artifact) = Self::artifact_in(&dir) else {
                debug!("Skipping run without artifact: {}", dir.display());
                continue;
            };
            let modified = tokio::fs::metadata(&artifact)
                .await?
                .modified()
                .unwrap_or(SystemTime::UNIX_EPOCH);
            let run_id = entry.file_name().to_string_lossy().into_owned();

            let newer = match &best {
                None => true,
                Some((best_time, best_id, _)) => (modified, &run_id) > (*best_time, best_id),
            };
            if newer {
                best = Some((modified, run_id, artifact));
            }
        }

        Ok(best.map(|(_, run_id, path)| (run_id, path)))
    }
}

#[async_trait]
impl ModelStore for FileModelStore {
    async fn load_stage(&self, name: &str, stage: &str) -> Result<Option<LoadedModel>> {
        let dir = self.root.join(name).join(stage);
        let Some(path) = Self::artifact_in(&dir) else {
            return Ok(None);
        };

        let model = Self::load_artifact(name, &path).await?;
        info!("Loaded model {} from stage {} ({})", name, stage, path.display());
        Ok(Some(LoadedModel {
            model,
            label: format!("{}@{}", name, stage),
        }))
    }

    async fn load_latest_run(&self, name: &str) -> Result<Option<LoadedModel>> {
        let Some((run_id, path)) = self.latest_run(name).await? else {
            return Ok(None);
        };

        let model = Self::load_artifact(name, &path).await?;
        info!("Loaded model {} from run {} ({})", name, run_id, path.display());
        Ok(Some(LoadedModel {
            model,
            label: format!("{}@run:{}", name, run_id),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;

    const FOREST: &str = r#"{"max_samples":16,"trees":[{"nodes":[{"kind":"leaf","n_samples":16}]}]}"#;

    fn write_artifact(dir: &Path, modified: Option<SystemTime>) {
        fs::create_dir_all(dir).unwrap();
        let path = dir.join(JSON_ARTIFACT);
        fs::write(&path, FOREST).unwrap();
        if let Some(t) = modified {
            fs::File::options()
                .write(true)
                .open(&path)
                .unwrap()
                .set_modified(t)
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_stage_artifact_loaded_with_stage_label() {
        let root = tempfile::tempdir().unwrap();
        write_artifact(&root.path().join("iforest/Production"), None);
        let store = FileModelStore::new(root.path().to_path_buf());

        let loaded = store.load_stage("iforest", "Production").await.unwrap().unwrap();
        assert_eq!(loaded.label, "iforest@Production");
        assert!(store.load_stage("iforest", "Staging").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_latest_run_by_mtime() {
        let root = tempfile::tempdir().unwrap();
        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        // Lexically greatest id is the oldest
        write_artifact(&root.path().join("iforest/runs/zzz"), Some(base));
        write_artifact(
            &root.path().join("iforest/runs/aaa"),
            Some(base + Duration::from_secs(60)),
        );
        fs::create_dir_all(root.path().join("iforest/runs/empty")).unwrap();

        let store = FileModelStore::new(root.path().to_path_buf());
        let loaded = store.load_latest_run("iforest").await.unwrap().unwrap();
        assert_eq!(loaded.label, "iforest@run:aaa");
    }

    #[tokio::test]
    async fn test_mtime_tie_broken_by_run_id() {
        let root = tempfile::tempdir().unwrap();
        let t = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        write_artifact(&root.path().join("iforest/runs/run-1"), Some(t));
        write_artifact(&root.path().join("iforest/runs/run-2"), Some(t));

        let store = FileModelStore::new(root.path().to_path_buf());
        let loaded = store.load_latest_run("iforest").await.unwrap().unwrap();
        assert_eq!(loaded.label, "iforest@run:run-2");
    }

    #[tokio::test]
    async fn test_missing_model_is_none_and_corrupt_model_is_error() {
        let root = tempfile::tempdir().unwrap();
        let store = FileModelStore::new(root.path().to_path_buf());
        assert!(store.load_latest_run("nothing").await.unwrap().is_none());

        let dir = root.path().join("broken/Production");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(JSON_ARTIFACT), "{not json").unwrap();
        assert!(store.load_stage("broken", "Production").await.is_err());
    }
}

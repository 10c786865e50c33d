//! Isolation forest scoring over a JSON tree export.
//!
//! Scores follow scikit-learn's `IsolationForest`: the anomaly score of a
//! sample is `2^(-E[h(x)] / c(max_samples))`, where `h` is the path length
//! through a tree (plus the average unbuilt-subtree depth `c(n)` at the leaf).
//! `decision = -score - offset` and a negative decision is an anomaly.

use crate::domain::errors::ModelError;
use crate::domain::ports::AnomalyModel;
use crate::domain::types::{FEATURE_KEYS, FeatureVector};
use serde::{Deserialize, Serialize};
use std::path::Path;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

fn default_offset() -> f64 {
    -0.5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        n_samples: usize,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationTree {
    /// Root is `nodes[0]`
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestArtifact {
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    pub max_samples: usize,
    #[serde(default = "default_offset")]
    pub offset: f64,
    pub trees: Vec<IsolationTree>,
}

/// Average path length of an unsuccessful BST search among `n` points.
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

impl IsolationTree {
    fn path_length(&self, x: &[f64; 6]) -> f64 {
        let mut idx = 0;
        let mut depth = 0.0;
        // Validation guarantees indices are in range; the step bound guards cycles
        for _ in 0..=self.nodes.len() {
            match &self.nodes[idx] {
                TreeNode::Leaf { n_samples } => return depth + average_path_length(*n_samples),
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[*feature] <= *threshold { *left } else { *right };
                    depth += 1.0;
                }
            }
        }
        depth
    }

    fn validate(&self, tree_idx: usize) -> Result<(), ModelError> {
        if self.nodes.is_empty() {
            return Err(ModelError::Invalid {
                reason: format!("tree {} has no nodes", tree_idx),
            });
        }
        for (i, node) in self.nodes.iter().enumerate() {
            if let TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } = node
            {
                if *feature >= FEATURE_KEYS.len() {
                    return Err(ModelError::Invalid {
                        reason: format!(
                            "tree {} node {} splits on feature {} (only {} features)",
                            tree_idx,
                            i,
                            feature,
                            FEATURE_KEYS.len()
                        ),
                    });
                }
                if threshold.is_nan() {
                    return Err(ModelError::Invalid {
                        reason: format!("tree {} node {} has a NaN threshold", tree_idx, i),
                    });
                }
                if *left >= self.nodes.len() || *right >= self.nodes.len() {
                    return Err(ModelError::Invalid {
                        reason: format!("tree {} node {} has a child out of range", tree_idx, i),
                    });
                }
            }
        }
        Ok(())
    }
}

impl ForestArtifact {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::Invalid {
                reason: "forest has no trees".to_string(),
            });
        }
        if self.max_samples == 0 {
            return Err(ModelError::Invalid {
                reason: "max_samples must be positive".to_string(),
            });
        }
        if let Some(names) = &self.feature_names
            && names.iter().map(String::as_str).ne(FEATURE_KEYS.iter().copied())
        {
            return Err(ModelError::Invalid {
                reason: format!(
                    "feature order {:?} does not match {:?}",
                    names, FEATURE_KEYS
                ),
            });
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(i)?;
        }
        Ok(())
    }
}

/// Isolation forest loaded from a JSON artifact
pub struct IsolationForestModel {
    name: String,
    forest: ForestArtifact,
}

impl IsolationForestModel {
    pub fn new(name: &str, forest: ForestArtifact) -> Result<Self, ModelError> {
        forest.validate()?;
        Ok(Self {
            name: name.to_string(),
            forest,
        })
    }

    pub fn from_json(name: &str, json: &str) -> Result<Self, ModelError> {
        let forest: ForestArtifact =
            serde_json::from_str(json).map_err(|e| ModelError::Invalid {
                reason: e.to_string(),
            })?;
        Self::new(name, forest)
    }

    pub async fn load(name: &str, path: &Path) -> Result<Self, ModelError> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ModelError::Load {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        Self::from_json(name, &json)
    }

    /// Anomaly score in (0, 1]; higher is more anomalous.
    pub fn anomaly_score(&self, features: &FeatureVector) -> f64 {
        let x = features.to_array();
        let total: f64 = self.forest.trees.iter().map(|t| t.path_length(&x)).sum();
        let mean = total / self.forest.trees.len() as f64;
        let norm = average_path_length(self.forest.max_samples);
        if norm == 0.0 {
            return 1.0;
        }
        2f64.powf(-mean / norm)
    }

    /// Negative values are anomalies.
    pub fn decision_function(&self, features: &FeatureVector) -> f64 {
        -self.anomaly_score(features) - self.forest.offset
    }
}

impl AnomalyModel for IsolationForestModel {
    fn predict(&self, features: &FeatureVector) -> Result<f64, ModelError> {
        if !features.is_finite() {
            return Err(ModelError::Prediction {
                reason: "non-finite feature value".to_string(),
            });
        }
        Ok(if self.decision_function(features) < 0.0 {
            -1.0
        } else {
            1.0
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

//! Isolation-forest outlier scoring over clause embedding and metadata.
//!
//! The model is trained offline and shipped as a JSON file of fitted
//! trees. Scoring follows the standard isolation-forest construction:
//! `score = 2^(-E[path length] / c(n))`, higher meaning more anomalous.

use std::path::{Path, PathBuf};

use clauseguard_core::{AnomalyScore, Clause};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Euler-Mascheroni constant, for the harmonic-number approximation in
/// the average path length normalizer.
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Features appended after the embedding: ln(1 + text length) and the
/// section-kind code.
const METADATA_FEATURES: usize = 2;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("anomaly model not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("anomaly model is degenerate (no trees or sample_size < 2)")]
    Degenerate,

    #[error("io error reading anomaly model: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid anomaly model: {0}")]
    Json(#[from] serde_json::Error),
}

/// One node of a fitted tree. Internal nodes carry a split
/// (`feature`, `threshold`, child indices); leaves carry only the
/// training sample count that landed there.
#[derive(Debug, Clone, Deserialize)]
struct TreeNode {
    #[serde(default)]
    feature: Option<usize>,
    #[serde(default)]
    threshold: f64,
    #[serde(default)]
    left: usize,
    #[serde(default)]
    right: usize,
    #[serde(default)]
    size: usize,
}

#[derive(Debug, Clone, Deserialize)]
struct IsolationTree {
    nodes: Vec<TreeNode>,
}

impl IsolationTree {
    /// Walk from the root to a leaf, counting edges; a leaf holding more
    /// than one training sample adds the expected depth of the subtree
    /// that was never built. Bounded by node count so a malformed tree
    /// cannot loop.
    fn path_length(&self, features: &[f64]) -> f64 {
        let mut node_idx = 0usize;
        let mut depth = 0.0f64;
        for _ in 0..=self.nodes.len() {
            let Some(node) = self.nodes.get(node_idx) else {
                return depth;
            };
            match node.feature {
                None => return depth + average_path_length(node.size),
                Some(feature) => {
                    let value = features.get(feature).copied().unwrap_or(0.0);
                    node_idx = if value < node.threshold {
                        node.left
                    } else {
                        node.right
                    };
                    depth += 1.0;
                }
            }
        }
        depth
    }
}

/// A fitted isolation forest, read-only once loaded.
#[derive(Debug, Clone, Deserialize)]
pub struct IsolationModel {
    trees: Vec<IsolationTree>,
    sample_size: usize,
    embedding_dim: usize,
}

impl IsolationModel {
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        if !path.exists() {
            return Err(ModelError::NotFound(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path)?;
        let model = Self::from_json(&raw)?;
        info!(
            path = %path.display(),
            trees = model.trees.len(),
            features = model.feature_dim(),
            "loaded anomaly model"
        );
        Ok(model)
    }

    pub fn from_json(raw: &str) -> Result<Self, ModelError> {
        let model: Self = serde_json::from_str(raw)?;
        if model.trees.is_empty() || model.sample_size < 2 {
            return Err(ModelError::Degenerate);
        }
        Ok(model)
    }

    /// Expected feature vector length: embedding plus metadata features.
    pub fn feature_dim(&self) -> usize {
        self.embedding_dim + METADATA_FEATURES
    }

    pub fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }

    /// Anomaly score in (0, 1]; higher means isolated sooner, hence more
    /// anomalous.
    fn score(&self, features: &[f64]) -> f32 {
        let total: f64 = self
            .trees
            .iter()
            .map(|tree| tree.path_length(features))
            .sum();
        let mean = total / self.trees.len() as f64;
        let normalizer = average_path_length(self.sample_size);
        if normalizer <= 0.0 {
            return 0.5;
        }
        2f64.powf(-mean / normalizer) as f32
    }
}

/// Average unsuccessful-search path length of a binary search tree over
/// `n` samples, the `c(n)` normalizer.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Scores clauses against the model; without one it degrades to a
/// neutral score instead of failing the pipeline.
#[derive(Debug, Clone)]
pub struct AnomalyDetector {
    model: Option<IsolationModel>,
    threshold: f32,
}

impl AnomalyDetector {
    pub fn new(model: IsolationModel, threshold: f32) -> Self {
        Self {
            model: Some(model),
            threshold,
        }
    }

    /// A detector with no model; every clause scores neutral.
    pub fn disabled() -> Self {
        Self {
            model: None,
            threshold: 0.0,
        }
    }

    /// Load the model file, degrading to a disabled detector when the
    /// file is missing or corrupt.
    pub fn from_file(path: &Path, threshold: f32) -> Self {
        match IsolationModel::load(path) {
            Ok(model) => Self::new(model, threshold),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "anomaly model unavailable");
                Self::disabled()
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.model.is_some()
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn score(&self, clause: &Clause) -> AnomalyScore {
        let Some(model) = &self.model else {
            debug!(clause = %clause.id, "anomaly detector disabled; neutral score");
            return AnomalyScore {
                clause_id: clause.id.clone(),
                score: 0.0,
                is_outlier: false,
            };
        };

        let features = clause_features(clause, model.embedding_dim());
        let score = model.score(&features);
        AnomalyScore {
            clause_id: clause.id.clone(),
            score,
            is_outlier: score >= self.threshold,
        }
    }
}

/// Fixed-length feature vector: the embedding padded or truncated to the
/// model's declared dimension, then text length and section kind.
fn clause_features(clause: &Clause, embedding_dim: usize) -> Vec<f64> {
    let mut features: Vec<f64> = clause
        .embedding
        .iter()
        .take(embedding_dim)
        .map(|&v| v as f64)
        .collect();
    features.resize(embedding_dim, 0.0);
    features.push((1.0 + clause.text.len() as f64).ln());
    features.push(section_code(clause.metadata.section.as_deref()));
    features
}

fn section_code(section: Option<&str>) -> f64 {
    let Some(section) = section else {
        return 0.0;
    };
    let lower = section.to_lowercase();
    if lower.contains("definition") {
        1.0
    } else if lower.contains("schedule") || lower.contains("annex") {
        2.0
    } else if lower.contains("penalt") || lower.contains("sanction") {
        3.0
    } else {
        4.0
    }
}

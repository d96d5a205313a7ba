//! In-memory regulation index with exact cosine retrieval.
//!
//! The corpus is static per session and small enough that retrieval is an
//! exact scan over every rule embedding; no approximate index structure.
//! Loaded from a JSON Lines file, one [`RegulationRule`] per line.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use clauseguard_core::{CandidateMatch, RegulationRule};
use tracing::{info, warn};

use crate::IndexError;

/// Read-only rule corpus shared by all clause workers.
#[derive(Debug)]
pub struct RegulationIndex {
    rules: Vec<RegulationRule>,
    by_id: HashMap<String, usize>,
    dim: usize,
}

impl RegulationIndex {
    /// Load a corpus from a JSON Lines file.
    ///
    /// Blank lines are skipped. Every embedding must share one dimension;
    /// a mismatch means the corpus build is broken and the index refuses
    /// to load.
    pub fn load(path: &Path) -> Result<Self, IndexError> {
        if !path.exists() {
            return Err(IndexError::CorpusNotFound(path.to_path_buf()));
        }
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let mut rules = Vec::new();
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let rule: RegulationRule = serde_json::from_str(trimmed).map_err(|source| {
                IndexError::Malformed {
                    line: lineno + 1,
                    source,
                }
            })?;
            rules.push(rule);
        }

        info!(path = %path.display(), rules = rules.len(), "loaded regulation corpus");
        Self::from_rules(rules)
    }

    /// Build an index from rules already in memory.
    pub fn from_rules(rules: Vec<RegulationRule>) -> Result<Self, IndexError> {
        let dim = rules.first().map(|r| r.embedding.len()).unwrap_or(0);
        for rule in &rules {
            if rule.embedding.len() != dim {
                return Err(IndexError::DimensionMismatch {
                    rule_id: rule.id.clone(),
                    got: rule.embedding.len(),
                    expected: dim,
                });
            }
        }

        let by_id = rules
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.clone(), i))
            .collect();

        Ok(Self { rules, by_id, dim })
    }

    /// Top-`k` rules by cosine similarity at or above `min_score`.
    ///
    /// Scores are clamped to [0, 1]; ordering is score descending with
    /// ties broken by rule id, so identical inputs always rank
    /// identically. An empty result is valid output, not an error.
    /// A clause embedding with the wrong dimension yields no candidates
    /// (bad extraction for one clause must not abort the run).
    pub fn retrieve(
        &self,
        clause_id: &str,
        embedding: &[f32],
        k: usize,
        min_score: f32,
    ) -> Vec<CandidateMatch> {
        if k == 0 || self.rules.is_empty() {
            return Vec::new();
        }
        if embedding.len() != self.dim {
            warn!(
                clause = %clause_id,
                got = embedding.len(),
                expected = self.dim,
                "clause embedding dimension mismatch; no candidates"
            );
            return Vec::new();
        }

        let mut scored: Vec<(&RegulationRule, f32)> = self
            .rules
            .iter()
            .filter_map(|rule| {
                let score = cosine(embedding, &rule.embedding).clamp(0.0, 1.0);
                (score >= min_score).then_some((rule, score))
            })
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.id.cmp(&b.0.id))
        });
        scored.truncate(k);

        scored
            .into_iter()
            .enumerate()
            .map(|(rank, (rule, score))| CandidateMatch {
                clause_id: clause_id.to_string(),
                rule_id: rule.id.clone(),
                score,
                rank,
            })
            .collect()
    }

    /// Look up a rule by id, for severity and category resolution.
    pub fn rule(&self, id: &str) -> Option<&RegulationRule> {
        self.by_id.get(id).map(|&i| &self.rules[i])
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Embedding dimensionality (0 for an empty corpus).
    pub fn dim(&self) -> usize {
        self.dim
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

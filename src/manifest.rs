// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Model manifest: what a persisted model is and how it was produced
//!
//! Written next to `vocabulary.json`/`model.json` as `manifest.json` and,
//! optionally, as a Markdown model card. Purely informational; loading a
//! model never depends on it.

use crate::artifacts::MANIFEST_FILE;
use crate::classifier::ClassifierKind;
use crate::inference::{Detector, DetectorConfig};
use crate::metrics::EvaluationMetrics;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Headline performance numbers on the held-out split
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub mcc: f64,
    pub auc_roc: Option<f64>,
    pub brier_score: Option<f64>,
}

impl From<&EvaluationMetrics> for PerformanceMetrics {
    fn from(metrics: &EvaluationMetrics) -> Self {
        Self {
            accuracy: metrics.classification.accuracy,
            precision: metrics.classification.precision,
            recall: metrics.classification.recall,
            f1_score: metrics.classification.f1_score,
            mcc: metrics.classification.mcc,
            auc_roc: metrics.auc_roc,
            brier_score: metrics.brier_score,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VocabularyInfo {
    pub size: usize,
    pub fingerprint: String,
    pub n_docs: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataInfo {
    pub dataset: String,
    pub train_size: usize,
    pub test_size: usize,
    /// Training documents per label
    pub label_distribution: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelManifest {
    pub name: String,
    /// Version of this crate that trained the model
    pub crate_version: String,
    pub classifier: ClassifierKind,
    pub created_at: DateTime<Utc>,
    pub vocabulary: VocabularyInfo,
    pub data: DataInfo,
    pub metrics: Option<PerformanceMetrics>,
    pub config: DetectorConfig,
    pub caveats: Vec<String>,
}

impl ModelManifest {
    pub fn new(name: &str, config: DetectorConfig) -> Self {
        Self {
            name: name.to_string(),
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
            classifier: config.classifier,
            created_at: Utc::now(),
            vocabulary: VocabularyInfo::default(),
            data: DataInfo::default(),
            metrics: None,
            config,
            caveats: vec![
                "Bag-of-words model: ignores word order, sarcasm and context".to_string(),
                "Learns the topics and style of its training corpus, not factual accuracy".to_string(),
                "Predictions should be reviewed by a human before any action is taken".to_string(),
            ],
        }
    }

    /// Generate markdown representation
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!("# Model Card: {}\n\n", self.name));

        md.push_str("## Model Details\n\n");
        md.push_str(&format!("- **Classifier:** {}\n", self.classifier));
        md.push_str(&format!("- **Created:** {}\n", self.created_at.format("%Y-%m-%d %H:%M UTC")));
        md.push_str(&format!("- **Crate version:** {}\n", self.crate_version));
        md.push_str(&format!("- **Vocabulary size:** {}\n", self.vocabulary.size));
        md.push_str(&format!("- **Vocabulary fingerprint:** `{}`\n", self.vocabulary.fingerprint));
        md.push_str(&format!("- **Stemming:** {}\n", if self.config.normalizer.stem { "on" } else { "off" }));
        md.push('\n');

        md.push_str("## Training Data\n\n");
        md.push_str(&format!("- **Dataset:** {}\n", self.data.dataset));
        md.push_str(&format!("- **Train / test:** {} / {}\n", self.data.train_size, self.data.test_size));
        for (label, count) in &self.data.label_distribution {
            md.push_str(&format!("- **{}:** {}\n", label, count));
        }
        md.push('\n');

        if let Some(ref metrics) = self.metrics {
            md.push_str("## Performance Metrics\n\n");
            md.push_str("| Metric | Value |\n");
            md.push_str("|--------|-------|\n");
            md.push_str(&format!("| Accuracy | {:.4} |\n", metrics.accuracy));
            md.push_str(&format!("| Precision | {:.4} |\n", metrics.precision));
            md.push_str(&format!("| Recall | {:.4} |\n", metrics.recall));
            md.push_str(&format!("| F1 Score | {:.4} |\n", metrics.f1_score));
            md.push_str(&format!("| MCC | {:.4} |\n", metrics.mcc));
            if let Some(auc) = metrics.auc_roc {
                md.push_str(&format!("| AUC-ROC | {:.4} |\n", auc));
            }
            if let Some(brier) = metrics.brier_score {
                md.push_str(&format!("| Brier Score | {:.4} |\n", brier));
            }
            md.push('\n');
        }

        md.push_str("## Caveats\n\n");
        for caveat in &self.caveats {
            md.push_str(&format!("- {}\n", caveat));
        }

        md
    }

    /// Save markdown to file
    pub fn save_markdown(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_markdown())
            .with_context(|| format!("Failed to write model card to {:?}", path))
    }

    /// Save as `manifest.json` inside a model directory
    pub fn save_json(&self, dir: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let path = dir.join(MANIFEST_FILE);
        std::fs::write(&path, json).with_context(|| format!("Failed to write {:?}", path))
    }

    pub fn load_json(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_FILE);
        let content = std::fs::read_to_string(&path).with_context(|| format!("Failed to read {:?}", path))?;
        serde_json::from_str(&content).with_context(|| format!("Malformed manifest {:?}", path))
    }
}

/// Builder for creating manifests
pub struct ManifestBuilder {
    manifest: ModelManifest,
}

impl ManifestBuilder {
    pub fn new(name: &str, config: DetectorConfig) -> Self {
        Self {
            manifest: ModelManifest::new(name, config),
        }
    }

    /// Record vocabulary and classifier details of a trained detector
    pub fn detector(mut self, detector: &Detector) -> Self {
        if let Some(vocabulary) = detector.vocabulary() {
            self.manifest.vocabulary = VocabularyInfo {
                size: vocabulary.len(),
                fingerprint: vocabulary.fingerprint(),
                n_docs: vocabulary.n_docs(),
            };
        }
        if let Some(artifacts) = detector.artifacts() {
            self.manifest.classifier = artifacts.model.kind();
        }
        self
    }

    pub fn data(mut self, data: DataInfo) -> Self {
        self.manifest.data = data;
        self
    }

    pub fn metrics(mut self, metrics: &EvaluationMetrics) -> Self {
        self.manifest.metrics = Some(PerformanceMetrics::from(metrics));
        self
    }

    pub fn add_caveat(mut self, caveat: &str) -> Self {
        self.manifest.caveats.push(caveat.to_string());
        self
    }

    pub fn build(self) -> ModelManifest {
        self.manifest
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Reproducible training pipeline for the fake news detector
//!
//! Orchestrates:
//! - Dataset loading and the seeded train/test split
//! - Normalization and vocabulary fitting on the training split
//! - Classifier training
//! - Evaluation on the held-out split
//! - Manifest generation
//! - Results serialization

use crate::classifier::Classifier;
use crate::datasets::{CsvColumns, Dataset, Document, Label};
use crate::inference::{Detector, DetectorConfig};
use crate::manifest::{DataInfo, ManifestBuilder, ModelManifest};
use crate::metrics::EvaluationMetrics;
use crate::normalizer::TextNormalizer;
use crate::vectorizer::{TfidfVectorizer, Vectorizer};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const RESULTS_FILE: &str = "training_results.json";
pub const REPORT_FILE: &str = "report.md";
pub const MODEL_CARD_FILE: &str = "MODEL_CARD.md";

/// Where training documents come from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DatasetSource {
    Synthetic {
        size: usize,
    },
    /// Directory holding `Fake.csv` and `True.csv`
    Isot {
        path: PathBuf,
    },
    Csv {
        path: PathBuf,
        #[serde(default)]
        columns: CsvColumns,
    },
}

impl Default for DatasetSource {
    fn default() -> Self {
        DatasetSource::Synthetic { size: 1000 }
    }
}

impl DatasetSource {
    /// Resolve a dataset name as given on the command line
    pub fn from_name(name: &str, path: Option<&Path>) -> Result<Self> {
        let require_path = || {
            path.map(Path::to_path_buf)
                .with_context(|| format!("Dataset '{}' requires --path", name))
        };
        match name.to_lowercase().as_str() {
            "synthetic" => Ok(DatasetSource::default()),
            "isot" => Ok(DatasetSource::Isot { path: require_path()? }),
            "csv" => Ok(DatasetSource::Csv {
                path: require_path()?,
                columns: CsvColumns::default(),
            }),
            other => bail!("Unknown dataset '{}' (expected isot, csv or synthetic)", other),
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            DatasetSource::Synthetic { .. } => "synthetic",
            DatasetSource::Isot { .. } => "isot",
            DatasetSource::Csv { .. } => "csv",
        }
    }

    pub fn load(&self, test_fraction: f64, seed: u64) -> Result<Dataset> {
        match self {
            DatasetSource::Synthetic { size } => {
                tracing::info!("Generating synthetic dataset ({} documents, seed {})", size, seed);
                Ok(Dataset::load_synthetic(*size, seed, test_fraction))
            }
            DatasetSource::Isot { path } => {
                tracing::info!("Loading ISOT dataset from {}", path.display());
                Dataset::load_isot(path, test_fraction, seed)
            }
            DatasetSource::Csv { path, columns } => {
                tracing::info!("Loading labeled CSV from {}", path.display());
                Dataset::load_labeled_csv(path, columns, test_fraction, seed)
            }
        }
    }
}

/// Configuration for a training run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Name recorded in the manifest
    pub name: String,
    /// Random seed for the split and synthetic data
    pub seed: u64,
    pub dataset: DatasetSource,
    /// Share of documents held out for evaluation
    pub test_fraction: f64,
    pub detector: DetectorConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            name: "fake-news-detector".to_string(),
            seed: 42,
            dataset: DatasetSource::default(),
            test_fraction: 0.2,
            detector: DetectorConfig::default(),
        }
    }
}

impl TrainingConfig {
    /// Read a JSON config; missing fields take their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}

/// A sample prediction for inspection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionSample {
    pub id: String,
    pub text_preview: String,
    pub predicted: Label,
    pub actual: Label,
    pub fake_probability: f64,
    pub correct: bool,
}

/// Metrics and inspection samples for one labeled document set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub metrics: EvaluationMetrics,
    pub samples: Vec<PredictionSample>,
    pub evaluated: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub id: String,
    pub name: String,
    pub total_documents: usize,
    pub train_documents: usize,
    pub test_documents: usize,
    pub label_distribution: BTreeMap<String, usize>,
}

/// Complete results of a training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingResults {
    pub config: TrainingConfig,
    pub dataset_info: DatasetInfo,
    /// `None` when the test split holds no labeled documents
    pub evaluation: Option<Evaluation>,
    pub manifest: ModelManifest,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

/// Classify every labeled document and score the predictions
///
/// Returns `None` when `documents` holds no labeled document.
pub fn evaluate(detector: &Detector, documents: &[Document]) -> Result<Option<Evaluation>> {
    let labeled: Vec<&Document> = documents.iter().filter(|d| d.label.is_some()).collect();
    if labeled.is_empty() {
        return Ok(None);
    }

    let texts: Vec<&str> = labeled.iter().map(|d| d.text.as_str()).collect();
    let truth: Vec<Label> = labeled.iter().filter_map(|d| d.label).collect();
    let predictions = detector.classify_batch(&texts).context("Failed to classify evaluation documents")?;
    let metrics = EvaluationMetrics::from_classifier_output(&predictions, &truth);

    // First 10 errors and first 10 correct predictions
    let mut samples = Vec::new();
    let mut errors = 0;
    let mut corrects = 0;
    for ((doc, prediction), actual) in labeled.iter().zip(&predictions).zip(&truth) {
        let correct = prediction.label == *actual;
        if (!correct && errors < 10) || (correct && corrects < 10) {
            samples.push(PredictionSample {
                id: doc.id.clone(),
                text_preview: preview(&doc.text, 100),
                predicted: prediction.label,
                actual: *actual,
                fake_probability: prediction.fake_probability,
                correct,
            });
            if correct {
                corrects += 1;
            } else {
                errors += 1;
            }
        }
        if errors >= 10 && corrects >= 10 {
            break;
        }
    }

    Ok(Some(Evaluation {
        metrics,
        samples,
        evaluated: labeled.len(),
    }))
}

fn preview(text: &str, max_chars: usize) -> String {
    let mut preview: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        preview.push_str("...");
    }
    preview
}

/// Main training pipeline
pub struct TrainingPipeline {
    config: TrainingConfig,
    show_progress: bool,
}

impl TrainingPipeline {
    pub fn new(config: TrainingConfig) -> Self {
        Self {
            config,
            show_progress: false,
        }
    }

    /// Draw a progress bar while normalizing the training corpus
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} Normalizing: [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }

    /// Fit a detector on the training split of `dataset`
    pub fn train(&self, dataset: &Dataset) -> Result<Detector> {
        let config = &self.config.detector;
        let (texts, labels) = Dataset::labeled_pairs(&dataset.train);

        let normalizer = TextNormalizer::new(config.normalizer.clone());
        let pb = self.progress_bar(texts.len());
        let corpus: Vec<Vec<String>> = texts
            .iter()
            .map(|text| {
                pb.inc(1);
                normalizer.normalize(text)
            })
            .collect();
        pb.finish_and_clear();

        let mut vectorizer = TfidfVectorizer::new(config.vectorizer.clone());
        let vectors = vectorizer
            .fit_transform(&corpus)
            .context("Failed to fit vocabulary on training split")?;
        tracing::info!("Vocabulary fitted: {} terms", vectorizer.dimension());

        let mut model = config.build_model();
        model
            .train(&vectors, &labels)
            .with_context(|| format!("Failed to train {}", model.name()))?;
        tracing::info!("Trained {} on {} documents", model.name(), vectors.len());

        Ok(Detector::from_parts(config.normalizer.clone(), vectorizer, model)?)
    }

    /// Run the full training pipeline
    pub fn run(&self) -> Result<(Detector, TrainingResults)> {
        let dataset = self.config.dataset.load(self.config.test_fraction, self.config.seed)?;
        tracing::info!(
            "Dataset loaded: {} documents (train={}, test={})",
            dataset.total_documents(),
            dataset.train.len(),
            dataset.test.len()
        );

        let detector = self.train(&dataset)?;

        let evaluation = evaluate(&detector, &dataset.test)?;
        match &evaluation {
            Some(eval) => tracing::info!(
                "Held-out evaluation - Accuracy: {:.4}, F1: {:.4}, MCC: {:.4}",
                eval.metrics.classification.accuracy,
                eval.metrics.classification.f1_score,
                eval.metrics.classification.mcc
            ),
            None => tracing::warn!("Test split is empty; skipping evaluation"),
        }

        let train_distribution: BTreeMap<String, usize> = Dataset::label_distribution(&dataset.train)
            .into_iter()
            .map(|(label, count)| (label.to_string(), count))
            .collect();

        let dataset_info = DatasetInfo {
            id: dataset.config.id.clone(),
            name: dataset.config.name.clone(),
            total_documents: dataset.total_documents(),
            train_documents: dataset.train.len(),
            test_documents: dataset.test.len(),
            label_distribution: train_distribution.clone(),
        };

        let mut builder = ManifestBuilder::new(&self.config.name, self.config.detector.clone())
            .detector(&detector)
            .data(DataInfo {
                dataset: dataset.config.name.clone(),
                train_size: dataset.train.len(),
                test_size: dataset.test.len(),
                label_distribution: train_distribution,
            });
        if let Some(ref eval) = evaluation {
            builder = builder.metrics(&eval.metrics);
        }
        if matches!(self.config.dataset, DatasetSource::Synthetic { .. }) {
            builder = builder.add_caveat("Trained on generated headlines; not meaningful on real news");
        }

        let results = TrainingResults {
            config: self.config.clone(),
            dataset_info,
            evaluation,
            manifest: builder.build(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        };

        Ok((detector, results))
    }

    /// Write model artifacts, `manifest.json` and the results JSON into `dir`
    pub fn save(detector: &Detector, results: &TrainingResults, dir: &Path) -> Result<()> {
        detector
            .save(dir)
            .with_context(|| format!("Failed to save model to {}", dir.display()))?;
        results.manifest.save_json(dir)?;

        let path = dir.join(RESULTS_FILE);
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("Results saved to {}", dir.display());
        Ok(())
    }

    /// Write the Markdown report and model card into `dir`
    pub fn save_report(results: &TrainingResults, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(REPORT_FILE);
        std::fs::write(&path, Self::generate_report(results))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        results.manifest.save_markdown(&dir.join(MODEL_CARD_FILE))?;
        Ok(path)
    }

    /// Generate a markdown report
    pub fn generate_report(results: &TrainingResults) -> String {
        let mut report = String::new();

        report.push_str("# Fake News Detector Training Report\n\n");
        report.push_str(&format!("**Generated:** {}\n\n", results.timestamp.format("%Y-%m-%d %H:%M:%S UTC")));
        report.push_str(&format!("**Version:** {}\n\n", results.version));

        report.push_str("## Dataset\n\n");
        report.push_str(&format!("- **ID:** {}\n", results.dataset_info.id));
        report.push_str(&format!("- **Name:** {}\n", results.dataset_info.name));
        report.push_str(&format!("- **Total Documents:** {}\n", results.dataset_info.total_documents));
        report.push_str(&format!(
            "- **Split Sizes:** Train={}, Test={}\n",
            results.dataset_info.train_documents, results.dataset_info.test_documents
        ));
        for (label, count) in &results.dataset_info.label_distribution {
            report.push_str(&format!("- **Train {}:** {}\n", label, count));
        }
        report.push('\n');

        report.push_str("## Model\n\n");
        report.push_str(&format!("- **Classifier:** {}\n", results.manifest.classifier));
        report.push_str(&format!("- **Vocabulary size:** {}\n", results.manifest.vocabulary.size));
        report.push_str(&format!("- **Vocabulary fingerprint:** `{}`\n\n", results.manifest.vocabulary.fingerprint));

        match &results.evaluation {
            Some(eval) => {
                report.push_str("## Held-out Evaluation\n\n");
                report.push_str(&format!("```\n{}\n```\n\n", eval.metrics.format()));

                let errors: Vec<&PredictionSample> = eval.samples.iter().filter(|s| !s.correct).collect();
                if !errors.is_empty() {
                    report.push_str("### Sample Errors\n\n");
                    report.push_str("| ID | Predicted | Actual | P(fake) | Text |\n");
                    report.push_str("|----|-----------|--------|---------|------|\n");
                    for sample in errors.iter().take(5) {
                        report.push_str(&format!(
                            "| {} | {} | {} | {:.3} | {} |\n",
                            sample.id,
                            sample.predicted,
                            sample.actual,
                            sample.fake_probability,
                            sample.text_preview.replace('|', "\\|")
                        ));
                    }
                    report.push('\n');
                }
            }
            None => report.push_str("## Held-out Evaluation\n\nNo labeled test documents.\n\n"),
        }

        report.push_str("## Configuration\n\n");
        report.push_str(&format!(
            "```json\n{}\n```\n",
            serde_json::to_string_pretty(&results.config).unwrap_or_default()
        ));

        report
    }
}

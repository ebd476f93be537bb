// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Dataset loading and train/test splitting for news classification
//!
//! Supported sources:
//! - ISOT layout (`Fake.csv` + `True.csv`)
//! - Generic labeled CSV with configurable text/label columns
//! - Seeded synthetic data for development and tests

use anyhow::{Context, Result};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::path::Path;
use std::str::FromStr;

/// Binary news label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Real,
    Fake,
}

impl Label {
    /// Numeric value used by the classifiers (fake is the positive class)
    pub fn to_binary(self) -> u8 {
        match self {
            Label::Real => 0,
            Label::Fake => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Label::Real => "real",
            Label::Fake => "fake",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "real" | "true" | "reliable" | "0" => Ok(Label::Real),
            "fake" | "false" | "unreliable" | "1" => Ok(Label::Fake),
            other => Err(format!("unrecognized label '{}'", other)),
        }
    }
}

/// A single news document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    /// Raw text (headline and/or body)
    pub text: String,
    /// Gold label, if known
    pub label: Option<Label>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>, label: Option<Label>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            label,
            metadata: HashMap::new(),
        }
    }

    pub fn labeled(id: impl Into<String>, text: impl Into<String>, label: Label) -> Self {
        Self::new(id, text, Some(label))
    }
}

/// Column names for the generic CSV loader
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvColumns {
    pub text: String,
    pub label: String,
    /// Optional title column prepended to the text
    #[serde(default)]
    pub title: Option<String>,
}

impl Default for CsvColumns {
    fn default() -> Self {
        Self {
            text: "text".to_string(),
            label: "label".to_string(),
            title: None,
        }
    }
}

/// Describes where a dataset came from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub id: String,
    pub name: String,
    pub description: String,
    pub source: String,
    pub format: String,
}

/// A loaded dataset split into train and test documents
#[derive(Debug, Clone)]
pub struct Dataset {
    pub config: DatasetConfig,
    pub train: Vec<Document>,
    pub test: Vec<Document>,
}

impl Dataset {
    /// Shuffle `documents` with a seeded RNG and hold out `test_fraction` of them
    pub fn from_documents(
        config: DatasetConfig,
        mut documents: Vec<Document>,
        test_fraction: f64,
        seed: u64,
    ) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        documents.shuffle(&mut rng);

        let n = documents.len();
        let fraction = test_fraction.clamp(0.0, 1.0);
        let n_test = ((n as f64 * fraction).round() as usize).min(n.saturating_sub(1));

        let test = documents.split_off(n - n_test);
        let train = documents;

        Self { config, train, test }
    }

    /// Load the ISOT fake news dataset (`Fake.csv` and `True.csv`) from a directory
    pub fn load_isot(data_dir: &Path, test_fraction: f64, seed: u64) -> Result<Self> {
        let config = DatasetConfig {
            id: "isot".to_string(),
            name: "ISOT Fake News Dataset".to_string(),
            description: "Real and fake news articles with title, text, subject and date".to_string(),
            source: data_dir.display().to_string(),
            format: "csv".to_string(),
        };

        let fake = Self::load_isot_csv(&data_dir.join("Fake.csv"), Label::Fake)?;
        let real = Self::load_isot_csv(&data_dir.join("True.csv"), Label::Real)?;

        tracing::info!("ISOT loaded: {} fake, {} real articles", fake.len(), real.len());

        let documents: Vec<Document> = fake.into_iter().chain(real).collect();
        Ok(Self::from_documents(config, documents, test_fraction, seed))
    }

    fn load_isot_csv(path: &Path, label: Label) -> Result<Vec<Document>> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open ISOT file: {}", path.display()))?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let mut documents = Vec::new();

        for (idx, result) in reader.records().enumerate() {
            let record = result
                .with_context(|| format!("Failed to read record {} in {}", idx, path.display()))?;

            let title = record.get(0).unwrap_or("").to_string();
            let text = record.get(1).unwrap_or("").to_string();
            let subject = record.get(2).unwrap_or("").to_string();
            let date = record.get(3).unwrap_or("").to_string();

            let combined_text = if title.is_empty() {
                text
            } else {
                format!("{} {}", title, text)
            };

            let mut metadata = HashMap::new();
            metadata.insert("title".to_string(), title);
            metadata.insert("subject".to_string(), subject);
            metadata.insert("date".to_string(), date);

            documents.push(Document {
                id: format!("{}_{}", label, idx),
                text: combined_text,
                label: Some(label),
                metadata,
            });
        }

        Ok(documents)
    }

    /// Load a CSV with a header row, taking text and label from the named columns
    ///
    /// Rows whose label cannot be parsed are skipped with a warning.
    pub fn load_labeled_csv(
        path: &Path,
        columns: &CsvColumns,
        test_fraction: f64,
        seed: u64,
    ) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open dataset file: {}", path.display()))?;
        let documents = Self::read_labeled_csv(file, columns)
            .with_context(|| format!("Failed to parse dataset file: {}", path.display()))?;

        let config = DatasetConfig {
            id: "csv".to_string(),
            name: path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "csv".to_string()),
            description: format!(
                "Labeled CSV (text column '{}', label column '{}')",
                columns.text, columns.label
            ),
            source: path.display().to_string(),
            format: "csv".to_string(),
        };

        Ok(Self::from_documents(config, documents, test_fraction, seed))
    }

    /// Parse labeled documents from any CSV reader
    pub fn read_labeled_csv<R: std::io::Read>(reader: R, columns: &CsvColumns) -> Result<Vec<Document>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = reader.headers().context("Failed to read CSV header")?.clone();
        let find = |name: &str| -> Result<usize> {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .with_context(|| format!("CSV has no column named '{}'", name))
        };

        let text_idx = find(&columns.text)?;
        let label_idx = find(&columns.label)?;
        let title_idx = columns.title.as_deref().map(find).transpose()?;

        let mut documents = Vec::new();
        let mut skipped = 0usize;

        for (idx, result) in reader.records().enumerate() {
            let record = result.with_context(|| format!("Failed to read record {}", idx))?;

            let raw_label = record.get(label_idx).unwrap_or("");
            let label = match raw_label.parse::<Label>() {
                Ok(label) => label,
                Err(e) => {
                    tracing::warn!("Skipping record {}: {}", idx, e);
                    skipped += 1;
                    continue;
                }
            };

            let body = record.get(text_idx).unwrap_or("");
            let text = match title_idx.and_then(|i| record.get(i)) {
                Some(title) if !title.is_empty() => format!("{} {}", title, body),
                _ => body.to_string(),
            };

            let mut metadata = HashMap::new();
            metadata.insert("original_label".to_string(), raw_label.to_string());

            documents.push(Document {
                id: format!("csv_{}", idx),
                text,
                label: Some(label),
                metadata,
            });
        }

        if skipped > 0 {
            tracing::warn!("Skipped {} records with unrecognized labels", skipped);
        }

        Ok(documents)
    }

    /// Generate a synthetic dataset for development/testing
    pub fn load_synthetic(size: usize, seed: u64, test_fraction: f64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let config = DatasetConfig {
            id: "synthetic".to_string(),
            name: "Synthetic News Dataset".to_string(),
            description: "Generated headlines for pipeline testing".to_string(),
            source: "generated".to_string(),
            format: "memory".to_string(),
        };

        let fake_phrases = [
            "SHOCKING secret they don't want you to know",
            "You won't believe this miracle cure doctors hate",
            "Aliens built the pyramids say anonymous experts",
            "Deep state cover up exposed share before it is deleted",
            "Unbelievable conspiracy revealed exclusively tonight",
        ];

        let real_phrases = [
            "According to the ministry the budget was approved on Tuesday",
            "Researchers at the university published the study in a journal",
            "The central bank confirmed interest rates remain unchanged",
            "Officials reported that the stock market closed lower today",
            "The spokesperson said the agreement was signed in March",
        ];

        let documents: Vec<Document> = (0..size)
            .map(|i| {
                let is_fake = rng.gen_bool(0.5);
                let phrases = if is_fake { &fake_phrases } else { &real_phrases };
                let phrase_idx = rng.gen_range(0..phrases.len());
                let label = if is_fake { Label::Fake } else { Label::Real };

                Document::labeled(format!("synthetic_{}", i), phrases[phrase_idx], label)
            })
            .collect();

        Self::from_documents(config, documents, test_fraction, seed)
    }

    pub fn total_documents(&self) -> usize {
        self.train.len() + self.test.len()
    }

    /// Count documents per gold label; unlabeled documents are not counted
    pub fn label_distribution(documents: &[Document]) -> HashMap<Label, usize> {
        let mut dist = HashMap::new();
        for label in documents.iter().filter_map(|d| d.label) {
            *dist.entry(label).or_insert(0) += 1;
        }
        dist
    }

    /// Texts and labels of the labeled documents, in order
    pub fn labeled_pairs(documents: &[Document]) -> (Vec<&str>, Vec<Label>) {
        documents
            .iter()
            .filter_map(|d| d.label.map(|label| (d.text.as_str(), label)))
            .unzip()
    }
}

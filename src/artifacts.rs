// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Persisted vocabulary/model pairs
//!
//! A model directory holds:
//! - `vocabulary.json`: normalizer settings, vectorizer params and the vocabulary
//! - `model.json`: the trained classifier plus the dimension and a pairing
//!   fingerprint of the vocabulary file it was trained with. The fingerprint
//!   covers the normalizer settings, vectorizer params, terms, document
//!   frequencies and document count, since each of them changes the vectors
//!   the model sees.
//! - `manifest.json` (optional): see [`crate::manifest`]
//!
//! Loading fails with [`DetectorError::CorruptArtifact`] on any malformed,
//! missing or mismatched file.

use crate::classifier::{Classifier, TrainedModel};
use crate::error::{DetectorError, Result};
use crate::normalizer::NormalizerConfig;
use crate::vectorizer::{TfidfVectorizer, Vectorizer, VectorizerParams, Vocabulary};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

pub const FORMAT_VERSION: u32 = 1;
pub const VOCABULARY_FILE: &str = "vocabulary.json";
pub const MODEL_FILE: &str = "model.json";
pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Serialize, Deserialize)]
struct VocabularyFile {
    format_version: u32,
    normalizer: NormalizerConfig,
    params: VectorizerParams,
    vocabulary: Vocabulary,
}

impl VocabularyFile {
    /// SHA-256 of the canonical JSON of everything that shapes a feature vector
    fn pairing_fingerprint(&self) -> Result<String> {
        #[derive(Serialize)]
        struct Pairing<'a> {
            normalizer: &'a NormalizerConfig,
            params: &'a VectorizerParams,
            vocabulary: &'a Vocabulary,
        }

        let canonical = serde_json::to_vec(&Pairing {
            normalizer: &self.normalizer,
            params: &self.params,
            vocabulary: &self.vocabulary,
        })
        .map_err(|e| DetectorError::corrupt(format!("cannot fingerprint vocabulary: {}", e)))?;
        Ok(hex::encode(Sha256::digest(&canonical)))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ModelFile {
    format_version: u32,
    vocabulary_fingerprint: String,
    dimension: usize,
    model: TrainedModel,
}

/// A fitted vectorizer and the model trained on its vectors
#[derive(Debug, Clone)]
pub struct ModelArtifacts {
    pub normalizer: NormalizerConfig,
    pub vectorizer: TfidfVectorizer,
    pub model: TrainedModel,
}

impl ModelArtifacts {
    /// Pair a fitted vectorizer with a trained model, checking they agree
    pub fn new(normalizer: NormalizerConfig, vectorizer: TfidfVectorizer, model: TrainedModel) -> Result<Self> {
        let vocabulary = vectorizer.vocabulary().ok_or(DetectorError::NotInitialized)?;
        if model.dimension() == 0 {
            return Err(DetectorError::NotInitialized);
        }
        if model.dimension() != vocabulary.len() {
            return Err(DetectorError::DimensionMismatch {
                expected: vocabulary.len(),
                actual: model.dimension(),
            });
        }
        Ok(Self {
            normalizer,
            vectorizer,
            model,
        })
    }

    pub fn vocabulary(&self) -> Option<&Vocabulary> {
        self.vectorizer.vocabulary()
    }

    /// Write `vocabulary.json` and `model.json` into `dir`, creating it if needed
    pub fn save(&self, dir: &Path) -> Result<()> {
        let vocabulary = self.vocabulary().ok_or(DetectorError::NotInitialized)?;
        fs::create_dir_all(dir)?;

        let vocabulary_file = VocabularyFile {
            format_version: FORMAT_VERSION,
            normalizer: self.normalizer.clone(),
            params: self.vectorizer.params().clone(),
            vocabulary: vocabulary.clone(),
        };
        write_json(&dir.join(VOCABULARY_FILE), &vocabulary_file)?;

        let model_file = ModelFile {
            format_version: FORMAT_VERSION,
            vocabulary_fingerprint: vocabulary_file.pairing_fingerprint()?,
            dimension: vocabulary.len(),
            model: self.model.clone(),
        };
        write_json(&dir.join(MODEL_FILE), &model_file)?;

        info!("Saved {} model ({} terms) to {:?}", self.model.kind(), vocabulary.len(), dir);
        Ok(())
    }

    /// Load and cross-check a vocabulary/model pair from `dir`
    pub fn load(dir: &Path) -> Result<Self> {
        let vocabulary_file: VocabularyFile = read_json(&dir.join(VOCABULARY_FILE))?;
        check_version(VOCABULARY_FILE, vocabulary_file.format_version)?;
        vocabulary_file.vocabulary.validate()?;

        let model_file: ModelFile = read_json(&dir.join(MODEL_FILE))?;
        check_version(MODEL_FILE, model_file.format_version)?;
        model_file.model.validate()?;

        if model_file.vocabulary_fingerprint != vocabulary_file.pairing_fingerprint()? {
            return Err(DetectorError::corrupt(
                "model was trained with a different vocabulary file (fingerprint mismatch)",
            ));
        }
        let vocabulary = vocabulary_file.vocabulary;
        if model_file.dimension != vocabulary.len() || model_file.model.dimension() != vocabulary.len() {
            return Err(DetectorError::corrupt(format!(
                "dimension mismatch: vocabulary has {} terms, model declares {} and holds {}",
                vocabulary.len(),
                model_file.dimension,
                model_file.model.dimension()
            )));
        }

        let vectorizer = TfidfVectorizer::from_vocabulary(vocabulary_file.params, vocabulary)?;
        info!(
            "Loaded {} model ({} terms) from {:?}",
            model_file.model.kind(),
            vectorizer.dimension(),
            dir
        );

        Ok(Self {
            normalizer: vocabulary_file.normalizer,
            vectorizer,
            model: model_file.model,
        })
    }
}

fn check_version(file: &str, version: u32) -> Result<()> {
    if version != FORMAT_VERSION {
        return Err(DetectorError::corrupt(format!(
            "{} has format version {}, expected {}",
            file, version, FORMAT_VERSION
        )));
    }
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)
        .map_err(|e| DetectorError::corrupt(format!("failed to serialize {:?}: {}", path, e)))?;
    writer.flush()?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .map_err(|e| DetectorError::corrupt(format!("cannot read {:?}: {}", path, e)))?;
    serde_json::from_str(&content)
        .map_err(|e| DetectorError::corrupt(format!("malformed {:?}: {}", path, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ClassifierKind;
    use crate::datasets::{Dataset, Label};
    use crate::normalizer::TextNormalizer;
    use tempfile::TempDir;

    fn trained(kind: ClassifierKind) -> (ModelArtifacts, Dataset) {
        let dataset = Dataset::load_synthetic(60, 7, 0.25);
        let normalizer = TextNormalizer::default();
        let (texts, labels) = Dataset::labeled_pairs(&dataset.train);

        let mut vectorizer = TfidfVectorizer::default();
        let vectors = vectorizer.fit_transform(&normalizer.normalize_batch(&texts)).unwrap();
        let mut model = TrainedModel::new(kind);
        model.train(&vectors, &labels).unwrap();

        let artifacts = ModelArtifacts::new(NormalizerConfig::default(), vectorizer, model).unwrap();
        (artifacts, dataset)
    }

    fn predictions(artifacts: &ModelArtifacts, texts: &[&str]) -> Vec<(Label, f64)> {
        let normalizer = TextNormalizer::new(artifacts.normalizer.clone());
        texts
            .iter()
            .map(|t| {
                let v = artifacts.vectorizer.transform(&normalizer.normalize(t)).unwrap();
                let p = artifacts.model.predict(&v).unwrap();
                (p.label, p.fake_probability)
            })
            .collect()
    }

    #[test]
    fn test_round_trip_reproduces_predictions() {
        for kind in [ClassifierKind::Logistic, ClassifierKind::NaiveBayes] {
            let (artifacts, dataset) = trained(kind);
            let dir = TempDir::new().unwrap();
            artifacts.save(dir.path()).unwrap();

            assert!(dir.path().join(VOCABULARY_FILE).exists());
            assert!(dir.path().join(MODEL_FILE).exists());

            let loaded = ModelArtifacts::load(dir.path()).unwrap();
            assert_eq!(loaded.model, artifacts.model);
            assert_eq!(loaded.vocabulary(), artifacts.vocabulary());

            let (held_out, _) = Dataset::labeled_pairs(&dataset.test);
            assert_eq!(predictions(&loaded, &held_out), predictions(&artifacts, &held_out));
        }
    }

    #[test]
    fn test_missing_files_are_corrupt() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            ModelArtifacts::load(dir.path()),
            Err(DetectorError::CorruptArtifact(_))
        ));

        let (artifacts, _) = trained(ClassifierKind::Logistic);
        artifacts.save(dir.path()).unwrap();
        fs::remove_file(dir.path().join(MODEL_FILE)).unwrap();
        assert!(matches!(
            ModelArtifacts::load(dir.path()),
            Err(DetectorError::CorruptArtifact(_))
        ));
    }

    #[test]
    fn test_malformed_json_is_corrupt() {
        let (artifacts, _) = trained(ClassifierKind::NaiveBayes);
        let dir = TempDir::new().unwrap();
        artifacts.save(dir.path()).unwrap();

        fs::write(dir.path().join(VOCABULARY_FILE), "{ not json").unwrap();
        assert!(matches!(
            ModelArtifacts::load(dir.path()),
            Err(DetectorError::CorruptArtifact(_))
        ));
    }

    fn edit_json(path: &Path, edit: impl FnOnce(&mut serde_json::Value)) {
        let mut value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        edit(&mut value);
        fs::write(path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
    }

    fn edit_model_json(dir: &Path, edit: impl FnOnce(&mut serde_json::Value)) {
        edit_json(&dir.join(MODEL_FILE), edit);
    }

    #[test]
    fn test_fingerprint_mismatch_is_corrupt() {
        let (artifacts, _) = trained(ClassifierKind::Logistic);
        let dir = TempDir::new().unwrap();
        artifacts.save(dir.path()).unwrap();

        edit_model_json(dir.path(), |v| {
            v["vocabulary_fingerprint"] = serde_json::Value::String("0".repeat(64));
        });
        let err = ModelArtifacts::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("fingerprint"));
    }

    #[test]
    fn test_vocabulary_from_another_run_is_corrupt() {
        let dataset = Dataset::load_synthetic(60, 7, 0.25);
        let (texts, labels) = Dataset::labeled_pairs(&dataset.train);
        let corpus = TextNormalizer::default().normalize_batch(&texts);

        let fit = |params: VectorizerParams, corpus: &[Vec<String>], labels: &[Label]| {
            let mut vectorizer = TfidfVectorizer::new(params);
            let vectors = vectorizer.fit_transform(corpus).unwrap();
            let mut model = TrainedModel::new(ClassifierKind::Logistic);
            model.train(&vectors, labels).unwrap();
            ModelArtifacts::new(NormalizerConfig::default(), vectorizer, model).unwrap()
        };

        let ours = fit(VectorizerParams::default(), &corpus, &labels);

        // Same token set, but the repeated first document shifts document frequencies
        let mut other_corpus = corpus.clone();
        other_corpus.push(corpus[0].clone());
        let mut other_labels = labels.clone();
        other_labels.push(labels[0]);
        let other_params = VectorizerParams {
            l2_normalize: false,
            sublinear_tf: true,
            ..VectorizerParams::default()
        };
        let theirs = fit(other_params, &other_corpus, &other_labels);

        let tokens = |a: &ModelArtifacts| -> Vec<String> {
            a.vocabulary().unwrap().terms().iter().map(|t| t.token.clone()).collect()
        };
        assert_eq!(tokens(&ours), tokens(&theirs));

        let ours_dir = TempDir::new().unwrap();
        let theirs_dir = TempDir::new().unwrap();
        ours.save(ours_dir.path()).unwrap();
        theirs.save(theirs_dir.path()).unwrap();
        fs::copy(
            theirs_dir.path().join(VOCABULARY_FILE),
            ours_dir.path().join(VOCABULARY_FILE),
        )
        .unwrap();

        let err = ModelArtifacts::load(ours_dir.path()).unwrap_err();
        assert!(matches!(err, DetectorError::CorruptArtifact(_)));
        assert!(err.to_string().contains("fingerprint"));
    }

    #[test]
    fn test_vocabulary_file_edits_break_pairing() {
        let (artifacts, _) = trained(ClassifierKind::NaiveBayes);
        let dir = TempDir::new().unwrap();
        let vocabulary_path = dir.path().join(VOCABULARY_FILE);

        let edits: [fn(&mut serde_json::Value); 4] = [
            |v| v["params"]["sublinear_tf"] = serde_json::json!(true),
            |v| v["normalizer"]["stem"] = serde_json::json!(true),
            |v| {
                let n_docs = v["vocabulary"]["n_docs"].as_u64().unwrap();
                v["vocabulary"]["n_docs"] = serde_json::json!(n_docs + 1);
            },
            |v| {
                let df = v["vocabulary"]["terms"][0]["document_frequency"].as_u64().unwrap();
                let changed = if df == 1 { 2 } else { 1 };
                v["vocabulary"]["terms"][0]["document_frequency"] = serde_json::json!(changed);
            },
        ];

        for edit in edits {
            artifacts.save(dir.path()).unwrap();
            ModelArtifacts::load(dir.path()).unwrap();

            edit_json(&vocabulary_path, edit);
            assert!(matches!(
                ModelArtifacts::load(dir.path()),
                Err(DetectorError::CorruptArtifact(_))
            ));
        }
    }

    #[test]
    fn test_version_and_dimension_checks() {
        let (artifacts, _) = trained(ClassifierKind::Logistic);
        let dir = TempDir::new().unwrap();

        artifacts.save(dir.path()).unwrap();
        edit_model_json(dir.path(), |v| v["format_version"] = serde_json::json!(99));
        assert!(matches!(
            ModelArtifacts::load(dir.path()),
            Err(DetectorError::CorruptArtifact(_))
        ));

        artifacts.save(dir.path()).unwrap();
        edit_model_json(dir.path(), |v| v["dimension"] = serde_json::json!(1));
        assert!(matches!(
            ModelArtifacts::load(dir.path()),
            Err(DetectorError::CorruptArtifact(_))
        ));
    }

    #[test]
    fn test_new_rejects_mismatched_pair() {
        let (artifacts, _) = trained(ClassifierKind::Logistic);
        let unfitted = TfidfVectorizer::default();
        assert!(matches!(
            ModelArtifacts::new(NormalizerConfig::default(), unfitted, artifacts.model.clone()),
            Err(DetectorError::NotInitialized)
        ));

        let mut other = TfidfVectorizer::default();
        other
            .fit(&[vec!["only".to_string(), "two".to_string()]])
            .unwrap();
        assert!(matches!(
            ModelArtifacts::new(NormalizerConfig::default(), other, artifacts.model),
            Err(DetectorError::DimensionMismatch { expected: 2, .. })
        ));
    }
}

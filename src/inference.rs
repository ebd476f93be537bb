// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Inference facade: raw text → (label, confidence)
//!
//! [`classify`] composes a normalizer, any [`Vectorizer`] and any
//! [`Classifier`]. [`Detector`] owns a loaded or freshly trained
//! vocabulary/model pair and is the entry point used by the CLI.

use crate::artifacts::ModelArtifacts;
use crate::classifier::{
    Classifier, ClassifierKind, LogisticParams, LogisticRegression, MultinomialNaiveBayes,
    NaiveBayesParams, Prediction, TrainedModel,
};
use crate::datasets::Label;
use crate::error::{DetectorError, Result};
use crate::explainability::{Explanation, LexicalReport, TermContribution};
use crate::normalizer::{NormalizerConfig, TextNormalizer};
use crate::vectorizer::{TfidfVectorizer, Vectorizer, VectorizerParams, Vocabulary};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Normalize, vectorize and classify one text
pub fn classify<V, C>(
    text: &str,
    normalizer: &TextNormalizer,
    vectorizer: &V,
    classifier: &C,
) -> Result<Prediction>
where
    V: Vectorizer + ?Sized,
    C: Classifier + ?Sized,
{
    let tokens = normalizer.normalize(text);
    let vector = vectorizer.transform(&tokens)?;
    classifier.predict(&vector)
}

/// Everything needed to train a detector
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub normalizer: NormalizerConfig,
    pub vectorizer: VectorizerParams,
    pub classifier: ClassifierKind,
    pub logistic: LogisticParams,
    pub naive_bayes: NaiveBayesParams,
}

impl DetectorConfig {
    /// Untrained model of the configured kind and parameters
    pub fn build_model(&self) -> TrainedModel {
        match self.classifier {
            ClassifierKind::Logistic => LogisticRegression::new(self.logistic.clone()).into(),
            ClassifierKind::NaiveBayes => MultinomialNaiveBayes::new(self.naive_bayes.clone()).into(),
        }
    }
}

#[derive(Debug, Clone)]
struct Loaded {
    normalizer: TextNormalizer,
    artifacts: ModelArtifacts,
}

/// Owns an optional vocabulary/model pair; every operation is read-only
#[derive(Debug, Clone, Default)]
pub struct Detector {
    loaded: Option<Loaded>,
}

impl Detector {
    /// Empty detector; classification fails until a model is loaded
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_artifacts(artifacts: ModelArtifacts) -> Self {
        Self {
            loaded: Some(Loaded {
                normalizer: TextNormalizer::new(artifacts.normalizer.clone()),
                artifacts,
            }),
        }
    }

    /// Pair an already fitted vectorizer and trained model
    pub fn from_parts(
        normalizer: NormalizerConfig,
        vectorizer: TfidfVectorizer,
        model: TrainedModel,
    ) -> Result<Self> {
        Ok(Self::from_artifacts(ModelArtifacts::new(normalizer, vectorizer, model)?))
    }

    /// Fit a vocabulary and train a model on labeled texts
    pub fn train<T: AsRef<str>>(config: &DetectorConfig, texts: &[T], labels: &[Label]) -> Result<Self> {
        let normalizer = TextNormalizer::new(config.normalizer.clone());
        let corpus = normalizer.normalize_batch(texts);

        let mut vectorizer = TfidfVectorizer::new(config.vectorizer.clone());
        let vectors = vectorizer.fit_transform(&corpus)?;

        let mut model = config.build_model();
        model.train(&vectors, labels)?;
        info!(
            "Trained {} on {} documents ({} features)",
            model.name(),
            vectors.len(),
            vectorizer.dimension()
        );

        Self::from_parts(config.normalizer.clone(), vectorizer, model)
    }

    /// Load a persisted vocabulary/model pair
    pub fn load(dir: &Path) -> Result<Self> {
        Ok(Self::from_artifacts(ModelArtifacts::load(dir)?))
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        self.loaded()?.artifacts.save(dir)
    }

    pub fn is_ready(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn artifacts(&self) -> Option<&ModelArtifacts> {
        self.loaded.as_ref().map(|l| &l.artifacts)
    }

    pub fn vocabulary(&self) -> Option<&Vocabulary> {
        self.artifacts().and_then(ModelArtifacts::vocabulary)
    }

    fn loaded(&self) -> Result<&Loaded> {
        self.loaded.as_ref().ok_or(DetectorError::NotInitialized)
    }

    pub fn classify(&self, text: &str) -> Result<Prediction> {
        let loaded = self.loaded()?;
        classify(
            text,
            &loaded.normalizer,
            &loaded.artifacts.vectorizer,
            &loaded.artifacts.model,
        )
    }

    pub fn classify_batch<T: AsRef<str>>(&self, texts: &[T]) -> Result<Vec<Prediction>> {
        texts.iter().map(|t| self.classify(t.as_ref())).collect()
    }

    /// Classify and attach the `top_n` strongest term contributions plus a
    /// lexical red-flag report
    pub fn explain(&self, text: &str, top_n: usize) -> Result<Explanation> {
        let loaded = self.loaded()?;
        let vectorizer = &loaded.artifacts.vectorizer;
        let model = &loaded.artifacts.model;
        let vocabulary = vectorizer.vocabulary().ok_or(DetectorError::NotInitialized)?;

        let vector = vectorizer.transform(&loaded.normalizer.normalize(text))?;
        let prediction = model.predict(&vector)?;
        let top_terms = model
            .term_contributions(&vector)?
            .into_iter()
            .take(top_n)
            .filter_map(|(idx, contribution)| {
                vocabulary.token(idx).map(|term| TermContribution {
                    term: term.to_string(),
                    contribution,
                })
            })
            .collect();

        Ok(Explanation::new(prediction, top_terms, LexicalReport::analyze(text)))
    }
}

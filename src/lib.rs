// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Fake news detection with TF-IDF features and a linear classifier
//!
//! This crate provides:
//! - Text normalization (lowercasing, URL stripping, stopwords, optional Porter stemming)
//! - A TF-IDF vectorizer with a persistable, fingerprinted vocabulary
//! - Logistic regression and multinomial naive Bayes classifiers
//! - An inference facade turning raw text into a label and confidence
//! - Explanations, evaluation metrics and model manifests
//! - Dataset loading and a reproducible, seeded training pipeline

pub mod artifacts;
pub mod classifier;
pub mod datasets;
pub mod error;
pub mod explainability;
pub mod inference;
pub mod manifest;
pub mod metrics;
pub mod normalizer;
pub mod pipeline;
pub mod stemmer;
pub mod vectorizer;

pub use artifacts::ModelArtifacts;
pub use classifier::{Classifier, ClassifierKind, LogisticRegression, MultinomialNaiveBayes, Prediction, TrainedModel};
pub use datasets::{Dataset, DatasetConfig, Document, Label};
pub use error::{DetectorError, Result};
pub use explainability::{Explanation, HeuristicVerdict, LexicalReport, TermContribution};
pub use inference::{classify, Detector, DetectorConfig};
pub use manifest::{ManifestBuilder, ModelManifest};
pub use metrics::{ClassificationReport, ConfusionMatrix, EvaluationMetrics};
pub use normalizer::{NormalizerConfig, TextNormalizer};
pub use pipeline::{TrainingConfig, TrainingPipeline, TrainingResults};
pub use vectorizer::{FeatureVector, TfidfVectorizer, Vectorizer, Vocabulary};

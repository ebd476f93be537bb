// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Error types for the detector library
//!
//! Library code returns [`DetectorError`]; the training pipeline and the CLI
//! wrap it with `anyhow::Context` where extra context helps.

use thiserror::Error;

/// Errors raised by fitting, training, inference and artifact handling
#[derive(Error, Debug)]
pub enum DetectorError {
    /// Inference or transformation attempted before a vocabulary/model pair
    /// was fitted or loaded
    #[error("detector is not initialized: fit or load a vocabulary/model pair first")]
    NotInitialized,

    /// Fitting or training on a corpus with no documents or no usable tokens
    #[error("cannot fit on an empty corpus")]
    EmptyCorpus,

    /// A persisted vocabulary or model is malformed, or the pair does not match
    #[error("corrupt artifact: {0}")]
    CorruptArtifact(String),

    /// Training inputs are inconsistent (length mismatch, single class, ...)
    #[error("invalid training data: {0}")]
    InvalidTrainingData(String),

    /// A feature vector does not match the dimensionality of the model
    #[error("dimension mismatch: model expects {expected} features, vector has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DetectorError {
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::CorruptArtifact(msg.into())
    }

    pub fn invalid_training(msg: impl Into<String>) -> Self {
        Self::InvalidTrainingData(msg.into())
    }
}

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, DetectorError>;

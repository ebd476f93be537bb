// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Multinomial naive Bayes over TF-IDF mass
//!
//! P(t | c) = (mass_c(t) + alpha) / (mass_c + alpha * |V|), where mass is the
//! summed TF-IDF weight of the class's training vectors.

use super::{check_dimension, sort_contributions, validate_training, Classifier, Prediction};
use crate::datasets::Label;
use crate::error::{DetectorError, Result};
use crate::vectorizer::FeatureVector;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NaiveBayesParams {
    /// Additive smoothing; 1.0 is Laplace smoothing
    pub alpha: f64,
}

impl Default for NaiveBayesParams {
    fn default() -> Self {
        Self { alpha: 1.0 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultinomialNaiveBayes {
    params: NaiveBayesParams,
    log_prior_real: f64,
    log_prior_fake: f64,
    log_likelihood_real: Vec<f64>,
    log_likelihood_fake: Vec<f64>,
}

impl MultinomialNaiveBayes {
    pub fn new(params: NaiveBayesParams) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    pub fn params(&self) -> &NaiveBayesParams {
        &self.params
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.log_likelihood_real.is_empty()
            || self.log_likelihood_real.len() != self.log_likelihood_fake.len()
        {
            return Err(DetectorError::corrupt(
                "naive Bayes likelihood tables are missing or of unequal length",
            ));
        }
        let finite = self.log_prior_real.is_finite()
            && self.log_prior_fake.is_finite()
            && self
                .log_likelihood_real
                .iter()
                .chain(&self.log_likelihood_fake)
                .all(|v| v.is_finite());
        if !finite {
            return Err(DetectorError::corrupt("naive Bayes model has non-finite parameters"));
        }
        Ok(())
    }

    fn log_likelihoods(mass: &[f64], alpha: f64) -> Vec<f64> {
        let denominator = (mass.iter().sum::<f64>() + alpha * mass.len() as f64).ln();
        mass.iter().map(|m| (m + alpha).ln() - denominator).collect()
    }
}

impl Classifier for MultinomialNaiveBayes {
    fn train(&mut self, vectors: &[FeatureVector], labels: &[Label]) -> Result<()> {
        let dimension = validate_training(vectors, labels)?;
        let alpha = self.params.alpha;
        if !(alpha > 0.0 && alpha.is_finite()) {
            return Err(DetectorError::invalid_training(format!(
                "alpha must be positive, got {}",
                alpha
            )));
        }

        let mut mass_real = vec![0.0; dimension];
        let mut mass_fake = vec![0.0; dimension];
        let mut n_fake = 0usize;

        for (vector, label) in vectors.iter().zip(labels) {
            let mass = match label {
                Label::Fake => {
                    n_fake += 1;
                    &mut mass_fake
                }
                Label::Real => &mut mass_real,
            };
            for (idx, value) in vector.iter() {
                mass[idx] += value;
            }
        }

        let n = vectors.len() as f64;
        self.log_prior_fake = (n_fake as f64 / n).ln();
        self.log_prior_real = ((vectors.len() - n_fake) as f64 / n).ln();
        self.log_likelihood_real = Self::log_likelihoods(&mass_real, alpha);
        self.log_likelihood_fake = Self::log_likelihoods(&mass_fake, alpha);

        debug!(dimension, n_fake, n_real = vectors.len() - n_fake, "Naive Bayes trained");
        Ok(())
    }

    fn predict(&self, vector: &FeatureVector) -> Result<Prediction> {
        check_dimension(self.log_likelihood_fake.len(), vector)?;

        let score_fake = self.log_prior_fake + vector.dot_dense(&self.log_likelihood_fake);
        let score_real = self.log_prior_real + vector.dot_dense(&self.log_likelihood_real);

        // log-sum-exp normalization
        let max_score = score_fake.max(score_real);
        let fake_exp = (score_fake - max_score).exp();
        let real_exp = (score_real - max_score).exp();

        Ok(Prediction::from_fake_probability(fake_exp / (fake_exp + real_exp)))
    }

    fn term_contributions(&self, vector: &FeatureVector) -> Result<Vec<(usize, f64)>> {
        check_dimension(self.log_likelihood_fake.len(), vector)?;
        let mut contributions: Vec<(usize, f64)> = vector
            .iter()
            .map(|(idx, value)| {
                (
                    idx,
                    value * (self.log_likelihood_fake[idx] - self.log_likelihood_real[idx]),
                )
            })
            .collect();
        sort_contributions(&mut contributions);
        Ok(contributions)
    }

    fn dimension(&self) -> usize {
        self.log_likelihood_fake.len()
    }

    fn name(&self) -> &str {
        "Multinomial Naive Bayes"
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! TF-IDF vectorization over normalized token sequences
//!
//! Weighting:
//! - tf: raw term count in the document (or `1 + ln(tf)` with `sublinear_tf`)
//! - idf: `ln((1 + n_docs) / (1 + df)) + 1`
//! - each vector is L2-normalized unless disabled
//!
//! Tokens absent from the fitted vocabulary contribute nothing.

use crate::error::{DetectorError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sprs::CsVec;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// Capability to turn token sequences into fixed-length feature vectors
pub trait Vectorizer {
    /// Build the vocabulary from a tokenized corpus
    fn fit(&mut self, corpus: &[Vec<String>]) -> Result<()>;

    /// Vectorize one tokenized document against the fitted vocabulary
    fn transform(&self, tokens: &[String]) -> Result<FeatureVector>;

    /// Number of features; 0 before fitting
    fn dimension(&self) -> usize;

    fn fit_transform(&mut self, corpus: &[Vec<String>]) -> Result<Vec<FeatureVector>> {
        self.fit(corpus)?;
        self.transform_batch(corpus)
    }

    fn transform_batch(&self, corpus: &[Vec<String>]) -> Result<Vec<FeatureVector>> {
        corpus.iter().map(|tokens| self.transform(tokens)).collect()
    }
}

/// Sparse feature vector: vocabulary index → weight
#[derive(Debug, Clone)]
pub struct FeatureVector(CsVec<f64>);

impl FeatureVector {
    /// All-zero vector of the given dimension
    pub fn zeros(dimension: usize) -> Self {
        Self(CsVec::empty(dimension))
    }

    /// Build from entries; indices need not be sorted but must be unique and in range
    pub fn from_entries(dimension: usize, mut entries: Vec<(usize, f64)>) -> Result<Self> {
        entries.sort_by_key(|(idx, _)| *idx);
        if entries.windows(2).any(|w| w[0].0 == w[1].0) {
            return Err(DetectorError::invalid_training("duplicate feature index"));
        }
        if let Some((idx, _)) = entries.iter().find(|(idx, _)| *idx >= dimension) {
            return Err(DetectorError::DimensionMismatch {
                expected: dimension,
                actual: idx + 1,
            });
        }
        let (indices, values): (Vec<usize>, Vec<f64>) = entries.into_iter().unzip();
        Ok(Self(CsVec::new(dimension, indices, values)))
    }

    pub fn dimension(&self) -> usize {
        self.0.dim()
    }

    /// Number of stored (non-zero) entries
    pub fn nnz(&self) -> usize {
        self.0.nnz()
    }

    pub fn is_zero(&self) -> bool {
        self.0.data().iter().all(|v| *v == 0.0)
    }

    pub fn get(&self, index: usize) -> f64 {
        self.0.get(index).copied().unwrap_or(0.0)
    }

    /// Stored entries in increasing index order
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.0.iter().map(|(idx, value)| (idx, *value))
    }

    /// Dot product with a dense weight vector of the same dimension
    pub fn dot_dense(&self, weights: &[f64]) -> f64 {
        self.iter().map(|(idx, value)| value * weights[idx]).sum()
    }

    pub fn as_sparse(&self) -> &CsVec<f64> {
        &self.0
    }
}

impl PartialEq for FeatureVector {
    fn eq(&self, other: &Self) -> bool {
        self.0.dim() == other.0.dim()
            && self.0.indices() == other.0.indices()
            && self.0.data() == other.0.data()
    }
}

/// One vocabulary entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub token: String,
    pub document_frequency: usize,
}

/// Fixed token → index mapping; the index of a term is its position in
/// lexicographic token order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    terms: Vec<Term>,
    n_docs: usize,
}

impl Vocabulary {
    /// Build from terms, validating ordering and frequencies
    pub fn new(terms: Vec<Term>, n_docs: usize) -> Result<Self> {
        let vocabulary = Self { terms, n_docs };
        vocabulary.validate()?;
        Ok(vocabulary)
    }

    /// Check the structural invariants of a (possibly deserialized) vocabulary
    pub fn validate(&self) -> Result<()> {
        if self.terms.is_empty() {
            return Err(DetectorError::corrupt("vocabulary has no terms"));
        }
        if self.n_docs == 0 {
            return Err(DetectorError::corrupt("vocabulary records zero documents"));
        }
        if let Some(pair) = self.terms.windows(2).find(|w| w[0].token >= w[1].token) {
            return Err(DetectorError::corrupt(format!(
                "vocabulary terms not strictly sorted at '{}' / '{}'",
                pair[0].token, pair[1].token
            )));
        }
        if let Some(term) = self
            .terms
            .iter()
            .find(|t| t.token.is_empty() || t.document_frequency == 0 || t.document_frequency > self.n_docs)
        {
            return Err(DetectorError::corrupt(format!(
                "invalid vocabulary term '{}' (df={}, n_docs={})",
                term.token, term.document_frequency, self.n_docs
            )));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn n_docs(&self) -> usize {
        self.n_docs
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn index_of(&self, token: &str) -> Option<usize> {
        self.terms
            .binary_search_by(|term| term.token.as_str().cmp(token))
            .ok()
    }

    pub fn token(&self, index: usize) -> Option<&str> {
        self.terms.get(index).map(|t| t.token.as_str())
    }

    /// SHA-256 over the terms in index order, their document frequencies and
    /// the document count
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for term in &self.terms {
            hasher.update(term.token.as_bytes());
            hasher.update(b"\t");
            hasher.update(term.document_frequency.to_string().as_bytes());
            hasher.update(b"\n");
        }
        hasher.update(format!("n_docs={}", self.n_docs).as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Vocabulary construction and weighting options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorizerParams {
    /// Minimum number of documents a token must appear in
    pub min_df: usize,
    /// Maximum proportion of documents a token may appear in, in (0, 1]
    pub max_df: f64,
    /// Keep only the most frequent tokens (by document frequency)
    pub max_features: Option<usize>,
    /// Replace tf with `1 + ln(tf)`
    pub sublinear_tf: bool,
    /// L2-normalize every vector
    pub l2_normalize: bool,
}

impl Default for VectorizerParams {
    fn default() -> Self {
        Self {
            min_df: 1,
            max_df: 1.0,
            max_features: None,
            sublinear_tf: false,
            l2_normalize: true,
        }
    }
}

/// TF-IDF vectorizer with smoothed idf
#[derive(Debug, Clone, Default)]
pub struct TfidfVectorizer {
    params: VectorizerParams,
    vocabulary: Option<Vocabulary>,
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    pub fn new(params: VectorizerParams) -> Self {
        Self {
            params,
            vocabulary: None,
            idf: Vec::new(),
        }
    }

    /// Restore a fitted vectorizer from a previously built vocabulary
    pub fn from_vocabulary(params: VectorizerParams, vocabulary: Vocabulary) -> Result<Self> {
        vocabulary.validate()?;
        let idf = Self::compute_idf(&vocabulary);
        Ok(Self {
            params,
            vocabulary: Some(vocabulary),
            idf,
        })
    }

    pub fn params(&self) -> &VectorizerParams {
        &self.params
    }

    pub fn vocabulary(&self) -> Option<&Vocabulary> {
        self.vocabulary.as_ref()
    }

    pub fn is_fitted(&self) -> bool {
        self.vocabulary.is_some()
    }

    /// Inverse document frequency of the term at `index`
    pub fn idf(&self, index: usize) -> Option<f64> {
        self.idf.get(index).copied()
    }

    fn compute_idf(vocabulary: &Vocabulary) -> Vec<f64> {
        let n_docs = vocabulary.n_docs() as f64;
        vocabulary
            .terms()
            .iter()
            .map(|t| ((1.0 + n_docs) / (1.0 + t.document_frequency as f64)).ln() + 1.0)
            .collect()
    }
}

impl Vectorizer for TfidfVectorizer {
    fn fit(&mut self, corpus: &[Vec<String>]) -> Result<()> {
        debug!(num_docs = corpus.len(), "Fitting TfidfVectorizer");

        if corpus.is_empty() {
            return Err(DetectorError::EmptyCorpus);
        }
        if !(self.params.max_df > 0.0 && self.params.max_df <= 1.0) {
            return Err(DetectorError::invalid_training(format!(
                "max_df must be in (0, 1], got {}",
                self.params.max_df
            )));
        }

        // Document frequency per distinct token
        let mut df: HashMap<&str, usize> = HashMap::new();
        for tokens in corpus {
            let unique: HashSet<&str> = tokens.iter().map(String::as_str).collect();
            for token in unique {
                *df.entry(token).or_insert(0) += 1;
            }
        }

        if df.is_empty() {
            return Err(DetectorError::EmptyCorpus);
        }

        let n_docs = corpus.len();
        let max_doc_count = (self.params.max_df * n_docs as f64).floor().max(1.0) as usize;
        let raw_size = df.len();

        let mut kept: Vec<(&str, usize)> = df
            .into_iter()
            .filter(|(_, count)| *count >= self.params.min_df && *count <= max_doc_count)
            .collect();

        if let Some(limit) = self.params.max_features {
            kept.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
            kept.truncate(limit);
        }

        if kept.is_empty() {
            return Err(DetectorError::EmptyCorpus);
        }

        kept.sort_by(|a, b| a.0.cmp(b.0));
        let terms = kept
            .into_iter()
            .map(|(token, document_frequency)| Term {
                token: token.to_string(),
                document_frequency,
            })
            .collect();

        let vocabulary = Vocabulary::new(terms, n_docs)?;
        debug!(
            original_size = raw_size,
            vocab_size = vocabulary.len(),
            "Vocabulary built"
        );

        self.idf = Self::compute_idf(&vocabulary);
        self.vocabulary = Some(vocabulary);
        Ok(())
    }

    fn transform(&self, tokens: &[String]) -> Result<FeatureVector> {
        let vocabulary = self.vocabulary.as_ref().ok_or(DetectorError::NotInitialized)?;

        let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
        for token in tokens {
            if let Some(idx) = vocabulary.index_of(token) {
                *counts.entry(idx).or_insert(0) += 1;
            }
        }

        let mut entries: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(idx, count)| {
                let tf = if self.params.sublinear_tf {
                    1.0 + (count as f64).ln()
                } else {
                    count as f64
                };
                (idx, tf * self.idf[idx])
            })
            .collect();

        if self.params.l2_normalize {
            let norm = entries.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
            if norm > 0.0 {
                for (_, v) in entries.iter_mut() {
                    *v /= norm;
                }
            }
        }

        let (indices, values): (Vec<usize>, Vec<f64>) = entries.into_iter().unzip();
        Ok(FeatureVector(CsVec::new(vocabulary.len(), indices, values)))
    }

    fn dimension(&self) -> usize {
        self.vocabulary.as_ref().map_or(0, Vocabulary::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(text: &str) -> Vec<String> {
        text.split_whitespace().map(String::from).collect()
    }

    fn corpus() -> Vec<Vec<String>> {
        vec![
            tokens("stock market crashed today"),
            tokens("aliens built pyramids say experts"),
            tokens("stock prices rose"),
        ]
    }

    #[test]
    fn test_fit_builds_sorted_vocabulary() {
        let mut vectorizer = TfidfVectorizer::default();
        vectorizer.fit(&corpus()).unwrap();

        let vocab = vectorizer.vocabulary().unwrap();
        assert_eq!(vocab.len(), 11);
        assert_eq!(vocab.n_docs(), 3);
        assert_eq!(vocab.token(0), Some("aliens"));
        assert_eq!(vocab.index_of("stock").map(|i| vocab.terms()[i].document_frequency), Some(2));
        assert!(vocab.terms().windows(2).all(|w| w[0].token < w[1].token));
    }

    #[test]
    fn test_idf_smoothing() {
        let mut vectorizer = TfidfVectorizer::default();
        vectorizer.fit(&corpus()).unwrap();
        let vocab = vectorizer.vocabulary().unwrap();

        let stock = vocab.index_of("stock").unwrap();
        let aliens = vocab.index_of("aliens").unwrap();
        let expected_stock = (4.0_f64 / 3.0).ln() + 1.0;
        let expected_aliens = (4.0_f64 / 2.0).ln() + 1.0;

        assert!((vectorizer.idf(stock).unwrap() - expected_stock).abs() < 1e-12);
        assert!((vectorizer.idf(aliens).unwrap() - expected_aliens).abs() < 1e-12);
    }

    #[test]
    fn test_fit_empty_corpus() {
        let mut vectorizer = TfidfVectorizer::default();
        assert!(matches!(vectorizer.fit(&[]), Err(DetectorError::EmptyCorpus)));
        assert!(matches!(
            vectorizer.fit(&[vec![], vec![]]),
            Err(DetectorError::EmptyCorpus)
        ));
        assert!(!vectorizer.is_fitted());
    }

    #[test]
    fn test_transform_before_fit() {
        let vectorizer = TfidfVectorizer::default();
        assert!(matches!(
            vectorizer.transform(&tokens("stock")),
            Err(DetectorError::NotInitialized)
        ));
        assert_eq!(vectorizer.dimension(), 0);
    }

    #[test]
    fn test_transform_is_deterministic_and_normalized() {
        let mut vectorizer = TfidfVectorizer::default();
        vectorizer.fit(&corpus()).unwrap();

        let doc = tokens("stock stock market aliens");
        let a = vectorizer.transform(&doc).unwrap();
        let b = vectorizer.transform(&doc).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.dimension(), vectorizer.dimension());

        let norm: f64 = a.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_out_of_vocabulary_is_zero_vector() {
        let mut vectorizer = TfidfVectorizer::default();
        vectorizer.fit(&corpus()).unwrap();

        let v = vectorizer.transform(&tokens("zebra quantum unicorn")).unwrap();
        assert!(v.is_zero());
        assert_eq!(v.nnz(), 0);
        assert_eq!(v, FeatureVector::zeros(vectorizer.dimension()));

        let empty = vectorizer.transform(&[]).unwrap();
        assert!(empty.is_zero());
    }

    #[test]
    fn test_raw_tf_idf_without_normalization() {
        let mut vectorizer = TfidfVectorizer::new(VectorizerParams {
            l2_normalize: false,
            ..VectorizerParams::default()
        });
        vectorizer.fit(&corpus()).unwrap();

        let v = vectorizer.transform(&tokens("stock stock")).unwrap();
        let idx = vectorizer.vocabulary().unwrap().index_of("stock").unwrap();
        let expected = 2.0 * ((4.0_f64 / 3.0).ln() + 1.0);
        assert!((v.get(idx) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_document_frequency_filters() {
        let mut vectorizer = TfidfVectorizer::new(VectorizerParams {
            min_df: 2,
            ..VectorizerParams::default()
        });
        vectorizer.fit(&corpus()).unwrap();
        let vocab = vectorizer.vocabulary().unwrap();
        assert_eq!(vocab.len(), 1);
        assert_eq!(vocab.token(0), Some("stock"));

        let mut strict = TfidfVectorizer::new(VectorizerParams {
            min_df: 5,
            ..VectorizerParams::default()
        });
        assert!(matches!(strict.fit(&corpus()), Err(DetectorError::EmptyCorpus)));
    }

    #[test]
    fn test_max_features_keeps_most_frequent() {
        let mut vectorizer = TfidfVectorizer::new(VectorizerParams {
            max_features: Some(2),
            ..VectorizerParams::default()
        });
        vectorizer.fit(&corpus()).unwrap();
        let vocab = vectorizer.vocabulary().unwrap();

        // "stock" (df=2) first, then the lexicographically smallest df=1 token
        let tokens: Vec<_> = vocab.terms().iter().map(|t| t.token.as_str()).collect();
        assert_eq!(tokens, vec!["aliens", "stock"]);
    }

    #[test]
    fn test_vocabulary_validation() {
        let unsorted = vec![
            Term { token: "b".to_string(), document_frequency: 1 },
            Term { token: "a".to_string(), document_frequency: 1 },
        ];
        assert!(matches!(Vocabulary::new(unsorted, 1), Err(DetectorError::CorruptArtifact(_))));

        let bad_df = vec![Term { token: "a".to_string(), document_frequency: 3 }];
        assert!(Vocabulary::new(bad_df, 2).is_err());
    }

    #[test]
    fn test_fingerprint_depends_on_terms() {
        let mut a = TfidfVectorizer::default();
        a.fit(&corpus()).unwrap();
        let mut b = TfidfVectorizer::default();
        b.fit(&corpus()[..2]).unwrap();

        let fa = a.vocabulary().unwrap().fingerprint();
        assert_eq!(fa.len(), 64);
        assert_eq!(fa, a.vocabulary().unwrap().fingerprint());
        assert_ne!(fa, b.vocabulary().unwrap().fingerprint());
    }

    #[test]
    fn test_fingerprint_depends_on_document_frequencies() {
        let term = |token: &str, df: usize| Term {
            token: token.to_string(),
            document_frequency: df,
        };
        let base = Vocabulary::new(vec![term("aliens", 1), term("stock", 2)], 3).unwrap();
        let other_df = Vocabulary::new(vec![term("aliens", 2), term("stock", 2)], 3).unwrap();
        let other_docs = Vocabulary::new(vec![term("aliens", 1), term("stock", 2)], 4).unwrap();

        assert_ne!(base.fingerprint(), other_df.fingerprint());
        assert_ne!(base.fingerprint(), other_docs.fingerprint());
    }

    #[test]
    fn test_feature_vector_from_entries() {
        let v = FeatureVector::from_entries(5, vec![(3, 0.5), (1, 0.25)]).unwrap();
        assert_eq!(v.iter().collect::<Vec<_>>(), vec![(1, 0.25), (3, 0.5)]);
        assert!((v.dot_dense(&[1.0, 2.0, 3.0, 4.0, 5.0]) - 2.5).abs() < 1e-12);

        assert!(FeatureVector::from_entries(2, vec![(2, 1.0)]).is_err());
        assert!(FeatureVector::from_entries(3, vec![(1, 1.0), (1, 2.0)]).is_err());
    }
}

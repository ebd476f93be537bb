// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Explainability for fake news predictions
//!
//! Provides:
//! - Term contributions from the trained linear model
//! - Lexical red-flag indicators (sensational, clickbait, conspiracy, ...)
//! - Credibility markers (attribution, sources, dates)
//! - Writing style features (caps abuse, punctuation runs, questions)
//!
//! Lexical analysis is informational only; it never changes the classifier's
//! prediction.

use crate::classifier::Prediction;
use crate::datasets::Label;
use crate::normalizer::URL_PATTERN;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Categories of language associated with fake news
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorCategory {
    Sensational,
    Emotional,
    Clickbait,
    Absolute,
    Conspiracy,
    Urgency,
    UnnamedSources,
}

impl IndicatorCategory {
    pub const ALL: [IndicatorCategory; 7] = [
        IndicatorCategory::Sensational,
        IndicatorCategory::Emotional,
        IndicatorCategory::Clickbait,
        IndicatorCategory::Absolute,
        IndicatorCategory::Conspiracy,
        IndicatorCategory::Urgency,
        IndicatorCategory::UnnamedSources,
    ];

    pub fn weight(self) -> f64 {
        match self {
            IndicatorCategory::Sensational => 2.0,
            IndicatorCategory::Emotional => 1.5,
            IndicatorCategory::Clickbait => 2.5,
            IndicatorCategory::Absolute => 1.0,
            IndicatorCategory::Conspiracy => 3.0,
            IndicatorCategory::Urgency => 1.5,
            IndicatorCategory::UnnamedSources => 2.0,
        }
    }

    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            IndicatorCategory::Sensational => &[
                "shocking",
                "unbelievable",
                "you won't believe",
                "secret revealed",
                "they don't want you to know",
                "amazing",
                "incredible",
                "must see",
                "breaking",
                "exclusive",
                "bombshell",
                "stunning",
            ],
            IndicatorCategory::Emotional => &[
                "outraged", "furious", "devastated", "terrified", "shocked", "appalled",
                "disgusted", "horrified", "enraged", "panic",
            ],
            IndicatorCategory::Clickbait => &[
                "click here",
                "find out",
                "what happens next",
                "number",
                "will shock you",
                "hate him",
                "this one trick",
                "doctors hate",
                "weird trick",
                "you need to see",
            ],
            IndicatorCategory::Absolute => &[
                "always", "never", "everyone", "nobody", "all", "none", "completely", "totally",
                "absolutely", "definitely",
            ],
            IndicatorCategory::Conspiracy => &[
                "conspiracy",
                "cover up",
                "hidden agenda",
                "illuminati",
                "deep state",
                "they",
                "them",
                "wake up",
                "sheeple",
                "truth",
            ],
            IndicatorCategory::Urgency => &[
                "urgent",
                "immediately",
                "right now",
                "hurry",
                "limited time",
                "act fast",
                "before it's too late",
                "don't wait",
                "last chance",
            ],
            IndicatorCategory::UnnamedSources => &[
                "sources say",
                "experts claim",
                "studies show",
                "people are saying",
                "many believe",
                "some say",
                "it is believed",
                "reportedly",
            ],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IndicatorCategory::Sensational => "sensational",
            IndicatorCategory::Emotional => "emotional",
            IndicatorCategory::Clickbait => "clickbait",
            IndicatorCategory::Absolute => "absolute",
            IndicatorCategory::Conspiracy => "conspiracy",
            IndicatorCategory::Urgency => "urgency",
            IndicatorCategory::UnnamedSources => "unnamed_sources",
        }
    }
}

impl fmt::Display for IndicatorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Categories of language associated with reliable reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredibilityCategory {
    Attribution,
    Sources,
    Dates,
}

impl CredibilityCategory {
    pub const ALL: [CredibilityCategory; 3] = [
        CredibilityCategory::Attribution,
        CredibilityCategory::Sources,
        CredibilityCategory::Dates,
    ];

    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            CredibilityCategory::Attribution => {
                &["according to", "stated", "said", "reported", "confirmed", "announced"]
            }
            CredibilityCategory::Sources => {
                &["university", "institute", "journal", "research", "study", "published in"]
            }
            CredibilityCategory::Dates => &[
                "2024", "2025", "january", "february", "march", "april", "may", "june", "july",
                "august", "september", "october", "november", "december",
            ],
        }
    }
}

fn keyword_pattern(keyword: &str) -> Regex {
    Regex::new(&format!(r"\b{}\b", regex::escape(keyword))).expect("escaped keyword is a valid pattern")
}

static INDICATOR_PATTERNS: LazyLock<Vec<(IndicatorCategory, Vec<(&'static str, Regex)>)>> =
    LazyLock::new(|| {
        IndicatorCategory::ALL
            .iter()
            .map(|c| (*c, c.keywords().iter().map(|k| (*k, keyword_pattern(k))).collect()))
            .collect()
    });

static CREDIBILITY_PATTERNS: LazyLock<Vec<(CredibilityCategory, Vec<Regex>)>> = LazyLock::new(|| {
    CredibilityCategory::ALL
        .iter()
        .map(|c| (*c, c.keywords().iter().map(|k| keyword_pattern(k)).collect()))
        .collect()
});

static PUNCTUATION_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[!?]{2,}").expect("punctuation pattern is valid"));

/// Occurrences of one indicator category in a text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorMatch {
    pub category: IndicatorCategory,
    pub count: usize,
    pub keywords: Vec<String>,
    pub weight: f64,
}

/// Occurrences of one credibility category in a text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredibilityMatch {
    pub category: CredibilityCategory,
    pub count: usize,
}

/// Surface statistics of the raw text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleFeatures {
    pub word_count: usize,
    pub sentence_count: usize,
    pub avg_word_length: f64,
    /// Share of words longer than two characters written in all caps
    pub caps_ratio: f64,
    /// Runs of two or more `!`/`?`
    pub excessive_punctuation: usize,
    pub question_ratio: f64,
}

impl StyleFeatures {
    pub fn from_text(text: &str) -> Self {
        let words: Vec<&str> = text.split_whitespace().collect();
        let sentences: Vec<&str> = text.split('.').map(str::trim).filter(|s| !s.is_empty()).collect();

        let word_count = words.len();
        let sentence_count = sentences.len();
        let total_chars: usize = words.iter().map(|w| w.chars().count()).sum();
        let caps_words = words
            .iter()
            .filter(|w| {
                w.chars().count() > 2
                    && w.chars().any(char::is_uppercase)
                    && !w.chars().any(char::is_lowercase)
            })
            .count();
        let questions = sentences.iter().filter(|s| s.ends_with('?')).count();

        Self {
            word_count,
            sentence_count,
            avg_word_length: total_chars as f64 / word_count.max(1) as f64,
            caps_ratio: caps_words as f64 / word_count.max(1) as f64,
            excessive_punctuation: PUNCTUATION_RUN.find_iter(text).count(),
            question_ratio: questions as f64 / sentence_count.max(1) as f64,
        }
    }
}

/// Rule-based lexical analysis of a text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LexicalReport {
    pub indicators: Vec<IndicatorMatch>,
    /// Sum of count × weight over all indicator categories
    pub indicator_score: f64,
    pub credibility: Vec<CredibilityMatch>,
    pub credibility_score: usize,
    pub style: StyleFeatures,
}

impl LexicalReport {
    pub fn analyze(text: &str) -> Self {
        let lowered = text.to_lowercase();
        let cleaned = URL_PATTERN.replace_all(&lowered, "");

        let mut indicators = Vec::new();
        let mut indicator_score = 0.0;
        for (category, patterns) in INDICATOR_PATTERNS.iter() {
            let mut count = 0;
            let mut keywords = Vec::new();
            for (keyword, pattern) in patterns {
                let found = pattern.find_iter(&cleaned).count();
                if found > 0 {
                    count += found;
                    keywords.push(keyword.to_string());
                }
            }
            if count > 0 {
                indicator_score += count as f64 * category.weight();
                indicators.push(IndicatorMatch {
                    category: *category,
                    count,
                    keywords,
                    weight: category.weight(),
                });
            }
        }

        let credibility: Vec<CredibilityMatch> = CREDIBILITY_PATTERNS
            .iter()
            .map(|(category, patterns)| CredibilityMatch {
                category: *category,
                count: patterns.iter().map(|p| p.find_iter(&cleaned).count()).sum(),
            })
            .filter(|m| m.count > 0)
            .collect();
        let credibility_score = credibility.iter().map(|m| m.count).sum();

        Self {
            indicators,
            indicator_score,
            credibility,
            credibility_score,
            style: StyleFeatures::from_text(text),
        }
    }

    /// Rule-only risk score in [0, 100]; higher means more red flags
    pub fn heuristic_score(&self) -> f64 {
        let fake = (self.indicator_score / 50.0 * 100.0).min(100.0);
        let credibility = (self.credibility_score as f64 / 20.0 * 100.0).min(100.0);
        let complexity_bonus = if self.style.word_count > 100 && self.style.avg_word_length > 5.0 {
            10.0
        } else {
            0.0
        };
        let style_penalty =
            self.style.caps_ratio * 20.0 + self.style.excessive_punctuation as f64 * 5.0;

        let score = (fake - credibility * 0.3 - complexity_bonus + style_penalty).clamp(0.0, 100.0);
        (score * 100.0).round() / 100.0
    }

    pub fn indicator(&self, category: IndicatorCategory) -> Option<&IndicatorMatch> {
        self.indicators.iter().find(|m| m.category == category)
    }

    pub fn verdict(&self) -> HeuristicVerdict {
        HeuristicVerdict::from_score(self.heuristic_score())
    }
}

/// Rule-only verdict banded on the heuristic score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeuristicVerdict {
    /// Score below 30
    LikelyReliable,
    /// Score in [30, 60)
    Questionable,
    /// Score of 60 or more
    LikelyMisleading,
}

impl HeuristicVerdict {
    pub fn from_score(score: f64) -> Self {
        if score < 30.0 {
            HeuristicVerdict::LikelyReliable
        } else if score < 60.0 {
            HeuristicVerdict::Questionable
        } else {
            HeuristicVerdict::LikelyMisleading
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HeuristicVerdict::LikelyReliable => "Likely Reliable",
            HeuristicVerdict::Questionable => "Questionable",
            HeuristicVerdict::LikelyMisleading => "Likely Fake/Misleading",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            HeuristicVerdict::LikelyReliable => "This article shows characteristics of reliable news.",
            HeuristicVerdict::Questionable => "This article shows some red flags.",
            HeuristicVerdict::LikelyMisleading => {
                "This article shows strong indicators of fake or misleading news."
            }
        }
    }

    pub fn recommendation(self) -> &'static str {
        match self {
            HeuristicVerdict::LikelyReliable => "Still verify with multiple trusted sources.",
            HeuristicVerdict::Questionable => "Verify information carefully before sharing.",
            HeuristicVerdict::LikelyMisleading => {
                "Exercise extreme caution. Do not share without verification."
            }
        }
    }
}

impl fmt::Display for HeuristicVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A vocabulary term and its signed contribution toward `fake`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermContribution {
    pub term: String,
    pub contribution: f64,
}

/// Complete explanation for a prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub prediction: Prediction,
    /// Largest-magnitude term contributions, most important first
    pub top_terms: Vec<TermContribution>,
    pub lexical: LexicalReport,
    pub heuristic_score: f64,
    pub heuristic_verdict: HeuristicVerdict,
    pub uncertainty_factors: Vec<String>,
    /// Natural language summary
    pub summary: String,
}

impl Explanation {
    pub fn new(prediction: Prediction, top_terms: Vec<TermContribution>, lexical: LexicalReport) -> Self {
        let mut uncertainty_factors = Vec::new();
        if top_terms.is_empty() {
            uncertainty_factors.push("No recognized vocabulary terms in text".to_string());
        }
        if prediction.confidence < 0.6 {
            uncertainty_factors.push("Prediction confidence is near decision boundary".to_string());
        }

        let mut explanation = Self {
            heuristic_score: lexical.heuristic_score(),
            heuristic_verdict: lexical.verdict(),
            prediction,
            top_terms,
            lexical,
            uncertainty_factors,
            summary: String::new(),
        };
        explanation.generate_summary();
        explanation
    }

    /// Terms pushing toward the given label, strongest first
    pub fn terms_toward(&self, label: Label) -> impl Iterator<Item = &TermContribution> {
        self.top_terms.iter().filter(move |t| match label {
            Label::Fake => t.contribution > 0.0,
            Label::Real => t.contribution < 0.0,
        })
    }

    fn generate_summary(&mut self) {
        let mut parts = Vec::new();

        let verdict = match self.prediction.label {
            Label::Fake => "likely fake",
            Label::Real => "likely real",
        };
        parts.push(format!(
            "This text is classified as {} (confidence: {:.1}%).",
            verdict,
            self.prediction.confidence * 100.0
        ));

        let fake_terms: Vec<&str> = self.terms_toward(Label::Fake).take(3).map(|t| t.term.as_str()).collect();
        let real_terms: Vec<&str> = self.terms_toward(Label::Real).take(3).map(|t| t.term.as_str()).collect();
        if !fake_terms.is_empty() {
            parts.push(format!("Terms pointing to fake: {}", fake_terms.join(", ")));
        }
        if !real_terms.is_empty() {
            parts.push(format!("Terms pointing to real: {}", real_terms.join(", ")));
        }

        if !self.lexical.indicators.is_empty() {
            parts.push("Red flags:".to_string());
            for m in &self.lexical.indicators {
                parts.push(format!("  • {} ({}): {}", m.category, m.count, m.keywords.join(", ")));
            }
        }
        if self.lexical.credibility_score > 0 {
            parts.push(format!("Credibility markers found: {}", self.lexical.credibility_score));
        }

        parts.push(format!(
            "Lexical verdict: {} (score {:.1}/100). {}",
            self.heuristic_verdict,
            self.heuristic_score,
            self.heuristic_verdict.description()
        ));

        if !self.uncertainty_factors.is_empty() {
            parts.push("Uncertainty factors:".to_string());
            for factor in &self.uncertainty_factors {
                parts.push(format!("  • {}", factor));
            }
        }

        self.summary = parts.join("\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indicator_detection() {
        let report = LexicalReport::analyze(
            "SHOCKING: you won't believe this BOMBSHELL. Wake up, the deep state is hiding the truth!!!",
        );

        let sensational = report.indicator(IndicatorCategory::Sensational).unwrap();
        assert_eq!(sensational.count, 3);
        assert!(sensational.keywords.contains(&"you won't believe".to_string()));

        let conspiracy = report.indicator(IndicatorCategory::Conspiracy).unwrap();
        assert_eq!(conspiracy.count, 3);
        assert!((conspiracy.weight - 3.0).abs() < 1e-12);

        // 3 × 2.0 + 3 × 3.0
        assert!((report.indicator_score - 15.0).abs() < 1e-12);
        assert_eq!(report.style.excessive_punctuation, 1);
    }

    #[test]
    fn test_whole_word_matching() {
        // "all" must not match inside "ballot", "them" not inside "theme"
        let report = LexicalReport::analyze("The ballot theme was discussed");
        assert!(report.indicators.is_empty());
        assert_eq!(report.indicator_score, 0.0);
    }

    #[test]
    fn test_urls_ignored() {
        let report = LexicalReport::analyze("see https://shocking-news.example/breaking");
        assert!(report.indicators.is_empty());
    }

    #[test]
    fn test_credibility_markers() {
        let report = LexicalReport::analyze(
            "According to a study published in a journal in March 2024, the university confirmed it.",
        );
        let count = |c: CredibilityCategory| report.credibility.iter().find(|m| m.category == c).map(|m| m.count);
        assert_eq!(count(CredibilityCategory::Attribution), Some(2));
        assert_eq!(count(CredibilityCategory::Sources), Some(4));
        assert_eq!(count(CredibilityCategory::Dates), Some(2));
        assert_eq!(report.credibility_score, 8);
    }

    #[test]
    fn test_style_features() {
        let style = StyleFeatures::from_text("WOW this is HUGE. ok is it real?");
        assert_eq!(style.word_count, 8);
        assert_eq!(style.sentence_count, 2);
        assert!((style.caps_ratio - 2.0 / 8.0).abs() < 1e-12);
        assert!((style.question_ratio - 0.5).abs() < 1e-12);

        let empty = StyleFeatures::from_text("");
        assert_eq!(empty, StyleFeatures::default());
    }

    #[test]
    fn test_heuristic_score_bounds() {
        let calm = LexicalReport::analyze("The committee said the report was published in June.");
        assert_eq!(calm.heuristic_score(), 0.0);

        let loud = LexicalReport::analyze(
            "BREAKING!!! SHOCKING bombshell!!! Wake up sheeple, they hide the truth. Act fast, urgent!!!",
        );
        let score = loud.heuristic_score();
        assert!(score > 50.0 && score <= 100.0);
    }

    #[test]
    fn test_heuristic_verdict_bands() {
        assert_eq!(HeuristicVerdict::from_score(0.0), HeuristicVerdict::LikelyReliable);
        assert_eq!(HeuristicVerdict::from_score(29.99), HeuristicVerdict::LikelyReliable);
        assert_eq!(HeuristicVerdict::from_score(30.0), HeuristicVerdict::Questionable);
        assert_eq!(HeuristicVerdict::from_score(59.99), HeuristicVerdict::Questionable);
        assert_eq!(HeuristicVerdict::from_score(60.0), HeuristicVerdict::LikelyMisleading);
        assert_eq!(HeuristicVerdict::from_score(100.0), HeuristicVerdict::LikelyMisleading);

        assert_eq!(HeuristicVerdict::Questionable.to_string(), "Questionable");
        assert!(HeuristicVerdict::LikelyMisleading.recommendation().contains("Do not share"));
        assert!(HeuristicVerdict::LikelyReliable.description().contains("reliable"));
    }

    #[test]
    fn test_report_verdict_follows_score() {
        let calm = LexicalReport::analyze("The committee said the report was published in June.");
        assert_eq!(calm.verdict(), HeuristicVerdict::LikelyReliable);

        let loud = LexicalReport::analyze(
            "BREAKING!!! SHOCKING bombshell!!! Wake up sheeple, they hide the truth. Act fast, urgent!!!",
        );
        assert_eq!(loud.verdict(), HeuristicVerdict::from_score(loud.heuristic_score()));
        assert_ne!(loud.verdict(), HeuristicVerdict::LikelyReliable);
    }

    #[test]
    fn test_explanation_summary() {
        let prediction = Prediction::from_fake_probability(0.9);
        let terms = vec![
            TermContribution { term: "aliens".to_string(), contribution: 0.8 },
            TermContribution { term: "stock".to_string(), contribution: -0.2 },
        ];
        let explanation = Explanation::new(prediction, terms, LexicalReport::analyze("aliens!!"));

        assert!(explanation.summary.contains("likely fake"));
        assert!(explanation.summary.contains("aliens"));
        assert!(explanation.summary.contains("Lexical verdict:"));
        assert_eq!(explanation.heuristic_verdict, explanation.lexical.verdict());
        assert_eq!(explanation.terms_toward(Label::Real).count(), 1);
        assert!(explanation.uncertainty_factors.is_empty());

        let unsure = Explanation::new(
            Prediction::from_fake_probability(0.5),
            Vec::new(),
            LexicalReport::default(),
        );
        assert_eq!(unsure.uncertainty_factors.len(), 2);
    }
}

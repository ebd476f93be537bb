// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Fake news detector CLI
//!
//! Usage:
//!   fake-news-detector train --dataset isot --path ./data/isot --output ./model
//!   fake-news-detector classify --model ./model "Aliens built the pyramids"
//!   fake-news-detector evaluate --model ./model --dataset csv --path ./data/news.csv

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use fake_news_detector::classifier::ClassifierKind;
use fake_news_detector::datasets::Dataset;
use fake_news_detector::inference::Detector;
use fake_news_detector::pipeline::{self, DatasetSource, TrainingConfig, TrainingPipeline};
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "fake-news-detector")]
#[command(about = "Classify news text as real or fake")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train a model and save its vocabulary, weights and manifest
    Train {
        /// Dataset to train on (isot, csv, synthetic)
        #[arg(short, long)]
        dataset: Option<String>,

        /// Path to the dataset directory (isot) or file (csv)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Classifier (logistic, naive-bayes)
        #[arg(short, long)]
        classifier: Option<ClassifierKind>,

        /// JSON training config; flags override its values
        #[arg(long, env = "FAKE_NEWS_CONFIG")]
        config: Option<PathBuf>,

        /// Random seed for reproducibility
        #[arg(short, long)]
        seed: Option<u64>,

        /// Share of documents held out for evaluation
        #[arg(long)]
        test_fraction: Option<f64>,

        /// Apply Porter stemming during normalization
        #[arg(long)]
        stem: bool,

        /// Output directory for the model
        #[arg(short, long)]
        output: PathBuf,

        /// Also write a Markdown report and model card
        #[arg(long)]
        report: bool,
    },

    /// Classify a text given as argument, from a file, or from stdin
    Classify {
        text: Option<String>,

        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Model directory
        #[arg(short, long, default_value = "model", env = "FAKE_NEWS_MODEL")]
        model: PathBuf,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Show contributing terms and lexical red flags
        #[arg(long)]
        explain: bool,

        /// Number of terms shown with --explain
        #[arg(long, default_value_t = 5)]
        top: usize,
    },

    /// Score a saved model against a labeled dataset
    Evaluate {
        /// Model directory
        #[arg(short, long, default_value = "model", env = "FAKE_NEWS_MODEL")]
        model: PathBuf,

        /// Dataset to evaluate on (isot, csv, synthetic)
        #[arg(short, long)]
        dataset: String,

        #[arg(short, long)]
        path: Option<PathBuf>,

        #[arg(short, long, default_value_t = 42)]
        seed: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Command::Train {
            dataset,
            path,
            classifier,
            config,
            seed,
            test_fraction,
            stem,
            output,
            report,
        } => {
            let mut config = match config {
                Some(ref path) => TrainingConfig::from_file(path)?,
                None => TrainingConfig::default(),
            };
            if let Some(name) = dataset {
                config.dataset = DatasetSource::from_name(&name, path.as_deref())?;
            }
            if let Some(kind) = classifier {
                config.detector.classifier = kind;
            }
            if let Some(seed) = seed {
                config.seed = seed;
            }
            if let Some(fraction) = test_fraction {
                config.test_fraction = fraction;
            }
            if stem {
                config.detector.normalizer.stem = true;
            }
            train(config, output, report)
        }
        Command::Classify {
            text,
            file,
            model,
            format,
            explain,
            top,
        } => classify(text, file, model, format, explain, top),
        Command::Evaluate {
            model,
            dataset,
            path,
            seed,
        } => evaluate(model, &dataset, path, seed),
    }
}

fn train(config: TrainingConfig, output: PathBuf, report: bool) -> Result<()> {
    tracing::info!("Fake News Detector Training");
    tracing::info!("===========================");
    tracing::info!("Dataset: {}", config.dataset.id());
    tracing::info!("Classifier: {}", config.detector.classifier);
    tracing::info!("Seed: {}", config.seed);

    let pipeline = TrainingPipeline::new(config).with_progress(true);
    let (detector, results) = pipeline.run()?;

    println!("\n{}", "=".repeat(70));
    println!("TRAINING SUMMARY");
    println!("{}", "=".repeat(70));
    println!("Classifier:      {}", results.manifest.classifier);
    println!("Vocabulary size: {}", results.manifest.vocabulary.size);
    println!(
        "Documents:       {} (train={}, test={})",
        results.dataset_info.total_documents,
        results.dataset_info.train_documents,
        results.dataset_info.test_documents
    );
    match &results.evaluation {
        Some(eval) => println!("\n{}", eval.metrics.format()),
        None => println!("\nNo labeled test documents; evaluation skipped"),
    }

    TrainingPipeline::save(&detector, &results, &output)?;
    println!("Model saved to: {}", output.display());

    if report {
        let report_path = TrainingPipeline::save_report(&results, &output)?;
        println!("Markdown report saved to: {}", report_path.display());
    }

    Ok(())
}

fn read_input(text: Option<String>, file: Option<PathBuf>) -> Result<String> {
    if let Some(text) = text {
        return Ok(text);
    }
    if let Some(path) = file {
        return std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read input file: {}", path.display()));
    }
    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .context("Failed to read text from stdin")?;
    Ok(buffer)
}

fn classify(
    text: Option<String>,
    file: Option<PathBuf>,
    model: PathBuf,
    format: OutputFormat,
    explain: bool,
    top: usize,
) -> Result<()> {
    let input = read_input(text, file)?;
    let detector = Detector::load(&model)
        .with_context(|| format!("Failed to load model from {}", model.display()))?;

    if explain {
        let explanation = detector.explain(&input, top)?;
        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&explanation)?),
            OutputFormat::Text => {
                println!("{}", explanation.summary);
                if !explanation.top_terms.is_empty() {
                    println!("\nTop terms (positive = toward fake):");
                    for term in &explanation.top_terms {
                        println!("  {:<20} {:>+.4}", term.term, term.contribution);
                    }
                }
                println!(
                    "\nLexical verdict: {} (score {:.0}/100)",
                    explanation.heuristic_verdict, explanation.heuristic_score
                );
                println!("  {}", explanation.heuristic_verdict.description());
                println!("  {}", explanation.heuristic_verdict.recommendation());
            }
        }
        return Ok(());
    }

    let prediction = detector.classify(&input)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&prediction)?),
        OutputFormat::Text => println!(
            "{} (confidence: {:.1}%, P(fake): {:.3})",
            prediction.label,
            prediction.confidence * 100.0,
            prediction.fake_probability
        ),
    }
    Ok(())
}

fn evaluate(model: PathBuf, dataset: &str, path: Option<PathBuf>, seed: u64) -> Result<()> {
    let detector = Detector::load(&model)
        .with_context(|| format!("Failed to load model from {}", model.display()))?;

    // Score every document: nothing is held out
    let source = DatasetSource::from_name(dataset, path.as_deref())?;
    let Dataset { train, test, config } = source.load(0.0, seed)?;
    let documents: Vec<_> = train.into_iter().chain(test).collect();
    tracing::info!("Evaluating on {} ({} documents)", config.name, documents.len());

    match pipeline::evaluate(&detector, &documents)? {
        Some(eval) => {
            println!("{}", eval.metrics.format());
            println!("Evaluated {} labeled documents", eval.evaluated);
        }
        None => println!("Dataset has no labeled documents"),
    }
    Ok(())
}

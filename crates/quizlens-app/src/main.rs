// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Quizlens — exam-question scanner
//
// Entry point. Initialises logging, parses the command line, and runs one of
// the scan / parse / correct commands.

mod services;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use quizlens_core::error::Result;
use quizlens_core::human_errors::humanize_error;
use quizlens_core::{ParsedQuestion, RecognitionOutcome, ScannerConfig, Subject};
use quizlens_recognition::CapabilityRegistry;
use quizlens_text::{StructuralParser, TextCorrector};

use services::config_dir;
use services::pipeline::{QuestionScanner, ScanHints};

#[derive(Debug, Parser)]
#[command(name = "quizlens", version, about = "Extract structured exam questions from photos or text")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Recognise, correct, classify and parse the question in an image.
    Scan {
        /// Photographed or scanned page (JPEG, PNG, WebP, ...).
        #[arg(long)]
        file: PathBuf,
        /// Subject to assume when none can be detected (e.g. math, 物理).
        #[arg(long, value_parser = parse_subject)]
        subject: Option<Subject>,
        /// Sample of the expected layout, e.g. "1. stem A. x B. y".
        #[arg(long)]
        example: Option<String>,
        /// Scanner config file (defaults to the user config directory).
        #[arg(long, env = "QUIZLENS_CONFIG")]
        config: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        output: OutputFormat,
        /// Directory holding the ocrs model files.
        #[arg(long, env = "QUIZLENS_MODELS")]
        models: Option<PathBuf>,
    },
    /// Parse question text into stem, options and sub-questions.
    Parse {
        #[command(flatten)]
        input: TextInput,
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        output: OutputFormat,
    },
    /// Repair common recognition errors in question text.
    Correct {
        #[command(flatten)]
        input: TextInput,
    },
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
struct TextInput {
    /// Text given inline.
    #[arg(long)]
    text: Option<String>,
    /// UTF-8 text file.
    #[arg(long)]
    file: Option<PathBuf>,
}

impl TextInput {
    fn read(&self) -> Result<String> {
        match (&self.text, &self.file) {
            (Some(text), _) => Ok(text.clone()),
            (None, Some(path)) => Ok(std::fs::read_to_string(path)?),
            (None, None) => Ok(String::new()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

fn parse_subject(raw: &str) -> std::result::Result<Subject, String> {
    Subject::from_name(raw).ok_or_else(|| {
        let known: Vec<&str> = Subject::ALL.iter().map(Subject::english_name).collect();
        format!("unknown subject '{raw}' (expected one of: {})", known.join(", "))
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            let human = humanize_error(&err);
            eprintln!("{}", human.message);
            eprintln!("{}", human.suggestion);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<()> {
    match command {
        Command::Scan {
            file,
            subject,
            example,
            config,
            output,
            models,
        } => {
            let mut scanner_config = load_config(config.as_deref())?;
            if models.is_some() {
                scanner_config.model_dir = models;
            }
            let registry = registry(&scanner_config)?;
            let scanner = QuestionScanner::from_registry(&registry, &scanner_config)?;

            let image = std::fs::read(&file)?;
            let hints = ScanHints {
                subject,
                structure_example: example,
            };
            let outcome = scanner.scan(&image, &hints).await?;
            for line in scanner.health_report() {
                tracing::warn!("{line}");
            }
            print_outcome(&outcome, output)
        }
        Command::Parse { input, output } => {
            let parsed = StructuralParser::new().parse(&input.read()?);
            print_parsed(&parsed, output)
        }
        Command::Correct { input } => {
            println!("{}", TextCorrector::new().correct(&input.read()?));
            Ok(())
        }
    }
}

fn load_config(explicit: Option<&Path>) -> Result<ScannerConfig> {
    let path = config_dir::config_path(explicit);
    let config = if explicit.is_some() {
        ScannerConfig::load(&path)?
    } else {
        ScannerConfig::load_or_default(&path)?
    };
    tracing::debug!(path = %path.display(), "scanner config loaded");
    Ok(config)
}

/// Capabilities available to this binary. Remote engines are registered by
/// embedding hosts, not by the CLI.
#[cfg(feature = "ocr")]
fn registry(config: &ScannerConfig) -> Result<CapabilityRegistry> {
    use std::sync::Arc;

    use quizlens_recognition::OcrsRecognizer;

    let local = OcrsRecognizer::load(config.model_dir.as_deref())?;
    Ok(CapabilityRegistry::new().register(Arc::new(local)))
}

#[cfg(not(feature = "ocr"))]
fn registry(_config: &ScannerConfig) -> Result<CapabilityRegistry> {
    tracing::warn!("built without the `ocr` feature; no local recognizer is available");
    Ok(CapabilityRegistry::new())
}

// -- Output ---------------------------------------------------------------------

fn print_outcome(outcome: &RecognitionOutcome, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }
    let class = &outcome.classification;
    println!("{}", outcome.text);
    println!();
    println!("subject:     {}", class.subject);
    println!("type:        {}", class.detailed_type);
    println!(
        "question:    {} ({:.0}%)",
        if class.is_question { "yes" } else { "no" },
        class.confidence * 100.0
    );
    println!("recognition: {} at {:.0}%", outcome.config_label, outcome.confidence);
    println!("time:        {} ms", outcome.processing_time_ms);
    for step in &outcome.processing_steps {
        println!("  - {step}");
    }
    println!();
    print_structure(&outcome.question);
    Ok(())
}

fn print_parsed(parsed: &ParsedQuestion, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(parsed)?);
        return Ok(());
    }
    print_structure(parsed);
    Ok(())
}

fn print_structure(parsed: &ParsedQuestion) {
    println!("subject: {}", parsed.subject);
    println!("type:    {}", parsed.question_type);
    if let Some(number) = &parsed.question_number {
        println!("number:  {number}");
    }
    if let Some(parent) = &parsed.parent_question {
        println!("{}", parent.body);
    } else {
        println!("{}", parsed.body);
    }
    for option in parsed.options.iter().flatten() {
        println!("  {}. {}", option.key, option.value);
    }
    for sub in parsed.sub_questions.iter().flatten() {
        println!("({}) {}", sub.number, sub.body);
        for option in sub.options.iter().flatten() {
            println!("    {}. {}", option.key, option.value);
        }
    }
}

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use hushcut::{
    AudioRedactor, PresidioAnalyzer, PresidioAnonymizer, PresidioConfig, RedactionConfig,
    WhisperApiClient, WhisperConfig, ENTITY_TYPE_CATALOG,
};

#[derive(Parser)]
#[command(name = "hushcut")]
#[command(author, version, about = "Redact PII from spoken audio, with audio-time alignment", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transcribe an audio file, redact PII, and save the redacted text
    Redact {
        /// Input audio file
        #[arg(short, long)]
        input: PathBuf,

        /// Output file for redacted text (default: <stem>_redacted.txt)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output file for a JSON report of the full result
        #[arg(long)]
        report: Option<PathBuf>,

        /// Language code for PII detection
        #[arg(long, default_value = "en")]
        language: String,

        /// Comma-separated entity types to redact (default: all)
        #[arg(long, value_delimiter = ',')]
        entities: Option<Vec<String>>,

        /// Minimum detection confidence (0-1)
        #[arg(long, default_value = "0.0")]
        score_threshold: f64,

        /// Resolve audio timestamps for each finding
        #[arg(long)]
        timestamps: bool,

        /// Base URL of the Whisper-compatible transcription API
        #[arg(long, default_value = "https://api.openai.com")]
        whisper_url: String,

        /// Base URL of the Presidio analyzer
        #[arg(long, default_value = "http://localhost:5002")]
        analyzer_url: String,

        /// Base URL of the Presidio anonymizer
        #[arg(long, default_value = "http://localhost:5001")]
        anonymizer_url: String,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// List the entity types the filter recognizes
    Entities,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Redact {
            input,
            output,
            report,
            language,
            entities,
            score_threshold,
            timestamps,
            whisper_url,
            analyzer_url,
            anonymizer_url,
            verbose,
        } => {
            setup_logging(verbose);
            redact_audio(
                input,
                output,
                report,
                language,
                entities,
                score_threshold,
                timestamps,
                whisper_url,
                analyzer_url,
                anonymizer_url,
            )
            .await
        }
        Commands::Entities => {
            for entity_type in ENTITY_TYPE_CATALOG {
                println!("{entity_type}");
            }
            Ok(())
        }
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

async fn redact_audio(
    input: PathBuf,
    output: Option<PathBuf>,
    report: Option<PathBuf>,
    language: String,
    entities: Option<Vec<String>>,
    score_threshold: f64,
    timestamps: bool,
    whisper_url: String,
    analyzer_url: String,
    anonymizer_url: String,
) -> Result<()> {
    let mut whisper_config = WhisperConfig::from_env(whisper_url);
    whisper_config.language = language.clone();
    whisper_config.word_timestamps = timestamps;

    let redactor = AudioRedactor::new(
        Arc::new(WhisperApiClient::new(whisper_config)),
        Arc::new(PresidioAnalyzer::new(PresidioConfig::new(analyzer_url))),
        Arc::new(PresidioAnonymizer::new(PresidioConfig::new(anonymizer_url))),
    );

    let config = RedactionConfig {
        language,
        entities,
        score_threshold,
        return_timestamps: timestamps,
    };

    info!("Redacting {:?}", input);
    let result = redactor
        .redact(&input, &config)
        .await
        .context("Redaction failed")?;

    let output_path = match output {
        Some(path) => path,
        None => {
            let stem = input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "audio".to_string());
            input.with_file_name(format!("{stem}_redacted.txt"))
        }
    };
    std::fs::write(&output_path, &result.redacted_text)
        .with_context(|| format!("Failed to write {output_path:?}"))?;
    info!("Redacted text written to {:?}", output_path);

    if let Some(report_path) = &report {
        let json = serde_json::to_string_pretty(&result).context("Failed to serialize report")?;
        std::fs::write(report_path, json)
            .with_context(|| format!("Failed to write {report_path:?}"))?;
        info!("Report written to {:?}", report_path);
    }

    // Summary
    println!("Redaction Summary");
    println!("=================");
    println!("Language: {}", result.language);
    println!(
        "Transcript length: {} chars",
        result.original_text.chars().count()
    );
    println!("Findings: {}", result.pii_findings.len());
    if timestamps {
        println!("Findings with audio time: {}", result.timed_finding_count());
    }

    let mut by_type: BTreeMap<&str, usize> = BTreeMap::new();
    for finding in &result.pii_findings {
        *by_type.entry(finding.entity_type.as_str()).or_insert(0) += 1;
    }
    for (entity_type, count) in by_type {
        println!("  {entity_type}: {count}");
    }

    Ok(())
}

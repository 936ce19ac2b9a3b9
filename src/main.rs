mod cli;

use anyhow::Context;
use clap::Parser;
use cli::{AnalyzeArgs, ChunkArgs, Cli, Commands, ModelArgs, ValidateArgs};
use pdf_feedback::types::AnalyzeConfig;
use pdf_feedback::{
    AnalysisReport, Assessor, DocumentExtractor, FeedbackError, ModelConfig, Result, TextChunker,
};
use std::path::{Path, PathBuf};
use tracing::{error, info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Make .env values visible to clap's env fallbacks
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    let result = match &cli.command {
        Commands::Analyze(args) => handle_analyze_command(args, &cli.output).await,
        Commands::Chunk(args) => handle_chunk_command(args).await,
        Commands::Validate(args) => handle_validate_command(args).await,
    };

    if let Err(e) = result {
        error!("Operation failed: {}", e);
        if let Some(raw) = e.raw_response() {
            eprintln!("\n--- Raw model response ---\n{}", raw);
        }
        std::process::exit(1);
    }

    Ok(())
}

fn build_assessor(args: &ModelArgs) -> Result<Assessor> {
    let config = ModelConfig::new(args.api_key.clone())
        .with_model(args.model.clone())
        .with_base_url(args.base_url.clone())
        .with_map_concurrency(args.concurrency);

    Assessor::from_config(config)
}

async fn handle_analyze_command(args: &AnalyzeArgs, output_dir: &PathBuf) -> Result<()> {
    info!("Starting analysis of {} sources", args.sources.len());

    let validated_sources = DocumentExtractor::collect_sources(&args.sources)?;
    info!("Validated {} sources", validated_sources.len());

    // Check if output directory exists and handle force flag
    if output_dir.exists() && !args.force {
        let entries = std::fs::read_dir(output_dir).map_err(|e| FeedbackError::OutputDirectory {
            reason: format!("Cannot read output directory: {}", e),
        })?;

        if entries.count() > 0 {
            return Err(FeedbackError::OutputDirectory {
                reason: "Output directory is not empty. Use --force to overwrite.".to_string(),
            });
        }
    }

    let config = AnalyzeConfig {
        output_dir: output_dir.clone(),
        requirements: DocumentExtractor::load_requirements(
            args.requirements.as_deref(),
            args.requirements_text.as_deref(),
        )
        .await?,
        upload_fallback: args.upload_fallback,
    };

    if config.requirements.is_some() {
        info!("Grounding assessments in the supplied requirements");
    }

    let assessor = build_assessor(&args.service)?;
    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .map_err(|e| FeedbackError::OutputDirectory {
            reason: format!("Failed to create output directory: {}", e),
        })?;

    let mut reports = Vec::new();

    for (idx, source) in validated_sources.iter().enumerate() {
        info!("Processing source {}/{}: {}", idx + 1, validated_sources.len(), source);

        let report = analyze_source(&assessor, source, &config).await?;
        print_report(&report);

        let report_path = report_filename(&config.output_dir, &report.source);
        let json_content = serde_json::to_string_pretty(&report)
            .context("Failed to serialize feedback report")?;
        tokio::fs::write(&report_path, json_content)
            .await
            .context("Failed to write feedback report")?;
        info!("Feedback written to: {}", report_path.display());

        reports.push(report);
    }

    // Write JSON output if requested
    if let Some(json_path) = &args.json_output {
        let json_content = serde_json::to_string_pretty(&reports)
            .context("Failed to serialize analysis results")?;

        tokio::fs::write(json_path, json_content)
            .await
            .context("Failed to write JSON analysis file")?;

        info!("Analysis results written to: {}", json_path.display());
    }

    info!("Analysis completed successfully!");
    Ok(())
}

async fn analyze_source(
    assessor: &Assessor,
    source: &str,
    config: &AnalyzeConfig,
) -> Result<AnalysisReport> {
    let (bytes, metadata) = DocumentExtractor::fetch_document(source).await?;
    let (document, outcome) = assessor
        .analyze_document(
            bytes,
            metadata,
            config.requirements.as_deref(),
            config.upload_fallback,
        )
        .await?;

    Ok(AnalysisReport::new(&document, &outcome, assessor.model_name()))
}

fn report_filename(output_dir: &Path, source_name: &str) -> PathBuf {
    let base_name = Path::new(source_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("assignment");

    output_dir.join(format!("{}_feedback.json", base_name))
}

fn print_report(report: &AnalysisReport) {
    let assessment = &report.assessment;

    println!("\n=== Feedback for '{}' ===", report.source);
    println!("Title: {}", assessment.title);
    println!("Grade: {} ({}/100)", assessment.grade, assessment.score);
    println!("Analysis path: {:?} ({} chunks)", report.path, report.chunk_count);

    println!("\nSummary:\n  {}", assessment.summary);

    println!("\nStrengths:");
    for strength in &assessment.strengths {
        println!("  - {}", strength);
    }

    println!("\nAreas for Improvement:");
    for area in &assessment.areas_for_improvement {
        println!("  - {}", area);
    }

    println!("\nCategory Scores:");
    for (category, score) in &assessment.category_scores {
        println!("  {}: {}/100", category, score);
    }
}

async fn handle_chunk_command(args: &ChunkArgs) -> Result<()> {
    info!("Previewing chunking for {} sources", args.sources.len());

    let validated_sources = DocumentExtractor::collect_sources(&args.sources)?;

    for source in validated_sources {
        let document = DocumentExtractor::load_document(&source).await?;
        let preview = TextChunker::preview(&document, args.max_chunk_size);

        println!("\n=== Chunking for '{}' ===", preview.source);
        println!("Characters: {}", preview.character_count);
        println!("Words: {}", preview.word_count);
        println!(
            "Analysis path: {}",
            if preview.long_document { "long (map-reduce)" } else { "short (single request)" }
        );
        println!("Chunks: {}", preview.chunk_sizes.len());

        if args.detailed {
            for (idx, size) in preview.chunk_sizes.iter().enumerate() {
                println!("  Chunk {}: {} characters", idx + 1, size);
            }
        }
    }

    Ok(())
}

async fn handle_validate_command(args: &ValidateArgs) -> Result<()> {
    info!("Validating {} sources", args.sources.len());

    let mut valid_sources = Vec::new();
    let mut invalid_sources = Vec::new();

    for source in &args.sources {
        match DocumentExtractor::collect_sources(&[source.clone()]) {
            Ok(expanded) => {
                info!("✓ Valid: {} ({} documents)", source, expanded.len());
                valid_sources.push(source);

                if args.check_access {
                    for document_source in expanded {
                        match DocumentExtractor::load_document(&document_source).await {
                            Ok(document) => {
                                info!("  {}: {} words extracted", document_source, document.word_count());
                            }
                            Err(e) => {
                                error!("  Cannot extract text: {}", e);
                                invalid_sources.push((document_source, format!("Extraction error: {}", e)));
                            }
                        }
                    }
                }
            }
            Err(e) => {
                error!("✗ Invalid: {} - {}", source, e);
                invalid_sources.push((source.clone(), e.to_string()));
            }
        }
    }

    println!("\n=== Validation Summary ===");
    println!("Valid sources: {}/{}", valid_sources.len(), args.sources.len());

    if !invalid_sources.is_empty() {
        println!("Invalid sources:");
        let invalid_count = invalid_sources.len();
        for (source, error) in invalid_sources {
            println!("  - {}: {}", source, error);
        }
        return Err(FeedbackError::Config {
            reason: format!("{} sources failed validation", invalid_count),
        });
    }

    println!("All sources are valid!");
    Ok(())
}

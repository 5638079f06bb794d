mod output;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use casebook_core::export::records_to_csv;
use casebook_core::{CaseStatus, CasebookConfig, DocumentKind, NewCase};
use casebook_nlp::{
    anonymize, extract_dates, AnalyzeOptions, LegalEntityRecognizer, OperatorConfig, PiiAnalyzer,
};
use casebook_pipeline::{
    AnalysisInput, AnalysisService, ComplianceChecker, DocumentInput, IngestPipeline,
    OllamaClient, PdfServiceClient, PipelineEvent, PlainTextExtractor, TextExtractor,
};
use casebook_store::CaseStore;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use output::{read_input, OutputFormat, RenderFormat};

#[derive(Parser)]
#[command(name = "casebook")]
#[command(about = "Casebook - legal document chronology and entity extraction", long_about = None)]
struct Cli {
    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Case database path (overrides config)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a document's text through the PDF service and render it
    Extract {
        file: PathBuf,
        #[arg(short, long, value_enum, default_value = "markdown")]
        format: RenderFormat,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Recognise legal entities in a text file (`-` for stdin)
    Entities {
        file: PathBuf,
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Extract dates from a text file
    Dates { file: PathBuf },

    /// Detect personal data, optionally anonymising it
    Pii {
        file: PathBuf,

        /// Print the anonymised text instead of the detections
        #[arg(short, long)]
        anonymize: bool,

        /// Minimum score for a detection
        #[arg(short, long, default_value = "0.0")]
        threshold: f32,

        /// Only these entity types (comma separated)
        #[arg(short, long, value_delimiter = ',')]
        entities: Option<Vec<String>>,
    },

    /// Manage cases
    Case {
        #[command(subcommand)]
        command: CaseCommand,
    },

    /// Ingest documents into a case
    Ingest {
        #[arg(short, long)]
        case: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Show a case chronology
    Chronology {
        #[arg(short, long)]
        case: String,
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Run compliance checks on a case and save the report
    Compliance {
        #[arg(short, long)]
        case: String,
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Summarise a case, using Ollama when available
    Analyze {
        #[arg(short, long)]
        case: String,
    },

    /// Show reachability of the PDF service and Ollama
    Status,
}

#[derive(Subcommand)]
enum CaseCommand {
    /// Open a new case
    New {
        #[arg(short, long)]
        reference: String,
        #[arg(short, long)]
        title: String,
        #[arg(short, long, default_value = "")]
        client: String,
    },
    /// List cases
    List,
    /// Show a case with its document and event counts
    Show { id: String },
    /// Set a case's status (open, closed, archived)
    Status { id: String, status: String },
    /// Delete a case and all its state
    Delete { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();
    let mut config = CasebookConfig::load(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.storage.db_path = Some(db);
    }

    match cli.command {
        Commands::Extract { file, format, out } => {
            cmd_extract(&config, &file, format, out.as_deref()).await?
        }
        Commands::Entities { file, format } => cmd_entities(&file, format)?,
        Commands::Dates { file } => cmd_dates(&file)?,
        Commands::Pii {
            file,
            anonymize,
            threshold,
            entities,
        } => cmd_pii(&file, anonymize, threshold, entities)?,
        Commands::Case { command } => cmd_case(&open_store(&config)?, command)?,
        Commands::Ingest { case, files } => cmd_ingest(&config, &case, &files).await?,
        Commands::Chronology { case, format, out } => {
            cmd_chronology(&open_store(&config)?, &case, format, out.as_deref())?
        }
        Commands::Compliance { case, format, out } => {
            cmd_compliance(&open_store(&config)?, &case, format, out.as_deref())?
        }
        Commands::Analyze { case } => cmd_analyze(&config, &case).await?,
        Commands::Status => cmd_status(&config).await?,
    }

    Ok(())
}

fn open_store(config: &CasebookConfig) -> Result<CaseStore> {
    CaseStore::new(config.storage.db_path.clone()).context("Failed to open case store")
}

async fn cmd_extract(
    config: &CasebookConfig,
    file: &Path,
    format: RenderFormat,
    out: Option<&Path>,
) -> Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());

    let result = match DocumentKind::from_file_name(&name) {
        DocumentKind::Pdf => {
            PdfServiceClient::from_config(&config.extraction)?
                .extract(&name, &bytes)
                .await?
        }
        DocumentKind::Text => PlainTextExtractor.extract(&name, &bytes).await?,
        kind => anyhow::bail!("Cannot extract {} files: {}", kind.label(), name),
    };

    output::emit(&output::render(&result, format)?, out)
}

fn cmd_entities(file: &Path, format: OutputFormat) -> Result<()> {
    let text = read_input(file)?;
    let entities = LegalEntityRecognizer::new().analyze(&text);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entities)?),
        OutputFormat::Csv => print!("{}", records_to_csv(&entities)),
        OutputFormat::Table => {
            print!("{}", output::entities_table(&entities));
            println!("\n{} entities", entities.len());
        }
    }
    Ok(())
}

fn cmd_dates(file: &Path) -> Result<()> {
    let text = read_input(file)?;
    for date in extract_dates(&text) {
        let time = date.time.map(|t| format!(" {}", t.format("%H:%M"))).unwrap_or_default();
        println!("{}{}  {:<24} ({:?})", date.date, time, date.text, date.format);
    }
    Ok(())
}

fn cmd_pii(file: &Path, anonymize_text: bool, threshold: f32, entities: Option<Vec<String>>) -> Result<()> {
    let text = read_input(file)?;
    let options = AnalyzeOptions {
        score_threshold: threshold,
        entities,
        ..Default::default()
    };
    let results = PiiAnalyzer::new().analyze(&text, &options)?;

    if anonymize_text {
        let anonymized = anonymize(&text, &results, &OperatorConfig::default())?;
        println!("{}", anonymized.text);
        return Ok(());
    }

    println!("{:<16} {:>6} {:>6} {:>6}  Text", "Type", "Start", "End", "Score");
    println!("{:-<70}", "");
    for r in &results {
        println!(
            "{:<16} {:>6} {:>6} {:>6.2}  {}",
            r.entity_type,
            r.start,
            r.end,
            r.score,
            &text[r.start..r.end]
        );
    }
    Ok(())
}

fn cmd_case(store: &CaseStore, command: CaseCommand) -> Result<()> {
    match command {
        CaseCommand::New {
            reference,
            title,
            client,
        } => {
            let case = store.create_case(NewCase {
                reference,
                title,
                client,
            })?;
            println!("Created case {} ({})", case.reference, case.id);
        }
        CaseCommand::List => print!("{}", output::cases_table(&store.list_cases()?)),
        CaseCommand::Show { id } => {
            let case = store.require_case(&id)?;
            let documents = store.documents(&id)?;
            let failed = documents.iter().filter(|d| d.is_failed()).count();
            println!("{}: {}", case.reference, case.title);
            println!("{:-<40}", "");
            println!("  ID:         {}", case.id);
            println!("  Client:     {}", case.client);
            println!("  Status:     {}", case.status.as_str());
            println!("  Documents:  {} ({} failed)", documents.len(), failed);
            println!("  Events:     {}", store.chronology(&id)?.len());
            println!("  State:      {}", store.list_state_keys(&id)?.join(", "));
        }
        CaseCommand::Status { id, status } => {
            let status = match status.as_str() {
                "open" | "closed" | "archived" => CaseStatus::from_str(&status),
                other => anyhow::bail!("Unknown status: {}. Use open, closed or archived", other),
            };
            let case = store.update_case_status(&id, status)?;
            println!("Case {} is now {}", case.reference, case.status.as_str());
        }
        CaseCommand::Delete { id } => {
            if store.delete_case(&id)? {
                println!("Deleted case {}", id);
            } else {
                anyhow::bail!("No case {}", id);
            }
        }
    }
    Ok(())
}

async fn cmd_ingest(config: &CasebookConfig, case_id: &str, files: &[PathBuf]) -> Result<()> {
    let store = Arc::new(open_store(config)?);
    let pipeline = IngestPipeline::from_config(store, config)?;

    let mut documents = Vec::with_capacity(files.len());
    for path in files {
        let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        documents.push(DocumentInput::new(name, bytes));
    }

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Cancelling...");
            ctrl_c.cancel();
        }
    });

    let (tx, mut rx) = mpsc::channel(64);
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            print_event(&event);
        }
    });

    let result = pipeline.run(case_id, documents, cancel, tx).await;
    let _ = printer.await;
    result?;
    Ok(())
}

fn print_event(event: &PipelineEvent) {
    match event {
        PipelineEvent::Started { total, .. } => println!("Ingesting {} document(s)", total),
        PipelineEvent::DocumentStarted {
            file_name,
            current,
            total,
        } => println!("[{}/{}] {}", current, total, file_name),
        PipelineEvent::Stage { stage, progress, .. } => {
            println!("       {:>3}% {:?}", progress, stage)
        }
        PipelineEvent::OcrFallback { reason, .. } => println!("       OCR fallback: {}", reason),
        PipelineEvent::DocumentSkipped { file_name, reason } => {
            println!("  skip {}: {}", file_name, reason)
        }
        PipelineEvent::DocumentFailed { file_name, error } => {
            println!("  FAIL {}: {}", file_name, error)
        }
        PipelineEvent::DocumentComplete {
            event_count,
            progress,
            ..
        } => println!("       {:>3}% done, {} event(s)", progress, event_count),
        PipelineEvent::Done { summary } => {
            println!();
            println!(
                "Processed {}, failed {}, skipped {}. {} new event(s), {} in chronology.",
                summary.processed,
                summary.failed,
                summary.skipped,
                summary.events_added,
                summary.total_events
            );
        }
        PipelineEvent::Cancelled => println!("Cancelled, nothing saved"),
        PipelineEvent::Error { message } => println!("Error: {}", message),
    }
}

fn cmd_chronology(store: &CaseStore, case_id: &str, format: OutputFormat, out: Option<&Path>) -> Result<()> {
    store.require_case(case_id)?;
    let events = store.chronology(case_id)?;

    let content = match format {
        OutputFormat::Json => format!("{}\n", serde_json::to_string_pretty(&events)?),
        OutputFormat::Csv => records_to_csv(&events),
        OutputFormat::Table => output::chronology_table(&events),
    };
    output::emit(&content, out)
}

fn cmd_compliance(store: &CaseStore, case_id: &str, format: OutputFormat, out: Option<&Path>) -> Result<()> {
    let case = store.require_case(case_id)?;
    let report = ComplianceChecker.run(&case, &store.documents(case_id)?, &store.chronology(case_id)?);
    store.save_compliance(&report)?;

    let content = match format {
        OutputFormat::Json => format!("{}\n", serde_json::to_string_pretty(&report)?),
        OutputFormat::Csv => records_to_csv(&report.checks),
        OutputFormat::Table => output::compliance_table(&report),
    };
    output::emit(&content, out)
}

async fn cmd_analyze(config: &CasebookConfig, case_id: &str) -> Result<()> {
    let store = open_store(config)?;
    let input = AnalysisInput {
        case: store.require_case(case_id)?,
        documents: store.documents(case_id)?,
        chronology: store.chronology(case_id)?,
    };

    let service = AnalysisService::from_config(&config.analysis);
    let outcome = service.analyze(&input).await?;
    store.put_state(case_id, casebook_store::StateKind::Analysis, &outcome.report)?;

    let report = &outcome.report;
    if let Some(reason) = &outcome.primary_error {
        println!("(AI analysis unavailable: {}; used rule-based analysis)", reason);
    }
    println!();
    println!("{}", report.summary);
    println!();
    println!("Parties:");
    for party in &report.parties {
        println!("  - {}", party);
    }
    println!("Key dates:");
    for key in &report.key_dates {
        println!("  {}  {}", key.date, key.description);
    }
    println!("Issues:");
    for issue in &report.issues {
        println!("  - {}", issue);
    }
    Ok(())
}

async fn cmd_status(config: &CasebookConfig) -> Result<()> {
    println!("System Status:");
    println!("{:-<40}", "");

    let pdf = PdfServiceClient::new(
        &config.extraction.pdf_service_url,
        std::time::Duration::from_secs(5),
    )?;
    match pdf.health().await {
        Ok(health) if health.is_healthy() => println!("  PDF service: healthy ({})", pdf.base_url()),
        Ok(health) => println!("  PDF service: {} ({})", health.status, pdf.base_url()),
        Err(e) => println!("  PDF service: unreachable ({})", e),
    }

    let ollama = OllamaClient::new(&config.analysis.ollama_host);
    match ollama.list_models().await {
        Ok(models) => {
            let has_model = models.iter().any(|m| m == &config.analysis.model);
            println!(
                "  Ollama: connected ({} models, {} {})",
                models.len(),
                config.analysis.model,
                if has_model { "available" } else { "not pulled" }
            );
        }
        Err(e) => println!("  Ollama: disconnected ({})", e),
    }

    println!(
        "  OCR: {}",
        if config.extraction.ocr_enabled {
            config.extraction.ocr_command.as_str()
        } else {
            "disabled"
        }
    );
    Ok(())
}

//! casgen CLI
//!
//! Staged generation of test artifacts from a requirements document:
//! - `extract`: document → plain text
//! - `rules`: document → business rules
//! - `checkpoints`: document or rules → verification checkpoints
//!   (optionally merged against an imported list of existing ones)
//! - `testcases`: full pipeline, one test case per checkpoint
//!
//! Each generation command re-runs the stages it depends on; progress is
//! reported per partition on stderr so long documents stay observable.

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

use casgen_core::{
    parse_existing_checkpoints, Orchestrator, PipelineConfig, PipelineState, StageEvent,
};
use casgen_llm::{
    config::{CASGEN_MODEL_ENV, CASGEN_OPENAI_ENDPOINT_ENV, CASGEN_OPENAI_KEY_ENV},
    LlmClient, LlmConfig, ModelName,
};

#[derive(Parser)]
#[command(name = "casgen")]
#[command(
    author,
    version,
    about = "Generate business rules, checkpoints and test cases from requirements documents"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the raw text of a requirements document (PDF/DOCX/TXT/MD).
    Extract {
        /// Input document
        input: PathBuf,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Generate business rules from a requirements document.
    Rules {
        /// Input document
        input: PathBuf,
        #[command(flatten)]
        llm: LlmArgs,
        #[command(flatten)]
        pipeline: PipelineArgs,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Generate verification checkpoints, directly from the document text
    /// or from freshly generated rules (`--from-rules`).
    Checkpoints {
        /// Input document
        input: PathBuf,
        /// Derive checkpoints from generated rules instead of raw text
        #[arg(long)]
        from_rules: bool,
        /// Text file of existing checkpoints to merge against (new ones
        /// similar to these are dropped)
        #[arg(long)]
        existing: Option<PathBuf>,
        #[command(flatten)]
        llm: LlmArgs,
        #[command(flatten)]
        pipeline: PipelineArgs,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Generate test cases: rules, then checkpoints, then one test case
    /// per checkpoint.
    Testcases {
        /// Input document
        input: PathBuf,
        /// Text file of existing checkpoints to merge against
        #[arg(long)]
        existing: Option<PathBuf>,
        #[command(flatten)]
        llm: LlmArgs,
        #[command(flatten)]
        pipeline: PipelineArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Args)]
struct LlmArgs {
    /// API key for the generation backend
    #[arg(long, env = CASGEN_OPENAI_KEY_ENV, hide_env_values = true)]
    api_key: String,
    /// Endpoint base URL
    #[arg(long, env = CASGEN_OPENAI_ENDPOINT_ENV, default_value = casgen_llm::config::DEFAULT_ENDPOINT)]
    endpoint: String,
    /// Deployment name (gpt-4o or gpt-35-turbo)
    #[arg(long, env = CASGEN_MODEL_ENV, default_value_t = ModelName::default())]
    model: ModelName,
    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 120)]
    timeout_secs: u64,
}

impl LlmArgs {
    fn client(&self) -> Result<LlmClient> {
        let config = LlmConfig::new(&self.api_key, &self.endpoint, self.model)
            .with_timeout_secs(self.timeout_secs);
        Ok(LlmClient::new(config)?)
    }
}

#[derive(Args)]
struct PipelineArgs {
    /// Maximum characters per text chunk
    #[arg(long, default_value_t = casgen_core::DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,
    /// Rules per checkpoint-generation batch
    #[arg(long, default_value_t = casgen_core::DEFAULT_BATCH_SIZE)]
    batch_size: usize,
    /// Similarity ratio at or above which two checkpoints are duplicates
    #[arg(long = "threshold", default_value_t = casgen_core::DEFAULT_SIMILARITY_THRESHOLD)]
    similarity_threshold: f64,
}

impl PipelineArgs {
    fn config(&self) -> PipelineConfig {
        PipelineConfig {
            chunk_size: self.chunk_size,
            batch_size: self.batch_size,
            similarity_threshold: self.similarity_threshold,
        }
    }
}

#[derive(Args)]
struct OutputArgs {
    /// Output file (stdout when omitted; required for xlsx/docx)
    #[arg(short, long)]
    out: Option<PathBuf>,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Txt)]
    format: OutputFormat,
}

#[derive(ValueEnum, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Txt,
    Xlsx,
    Docx,
    Json,
}

enum Rendered {
    Text(String),
    Binary(Vec<u8>),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Extract { input, out } => {
            let text = casgen_ingest_docs::extract_text(&input)
                .with_context(|| format!("extracting {}", input.display()))?;
            match out {
                Some(path) => {
                    fs::write(&path, text)?;
                    eprintln!("{} {}", "wrote".green().bold(), path.display());
                }
                None => print!("{text}"),
            }
            Ok(())
        }

        Commands::Rules {
            input,
            llm,
            pipeline,
            output,
        } => {
            let mut state = load_state(&input, None)?;
            let mut orchestrator = build_orchestrator(&llm, &pipeline)?;
            let produced = orchestrator.run_rules(&mut state)?;
            eprintln!("{} {} règles", "ok".green().bold(), produced);

            let rendered = render_rules(&state, output.format)?;
            write_rendered(rendered, output.out.as_deref(), output.format)
        }

        Commands::Checkpoints {
            input,
            from_rules,
            existing,
            llm,
            pipeline,
            output,
        } => {
            let mut state = load_state(&input, existing.as_deref())?;
            let mut orchestrator = build_orchestrator(&llm, &pipeline)?;
            let produced = if from_rules {
                orchestrator.run_rules(&mut state)?;
                orchestrator.run_checkpoints_from_rules(&mut state)?
            } else {
                orchestrator.run_checkpoints_from_text(&mut state)?
            };
            eprintln!(
                "{} {} nouveaux points ({} existants)",
                "ok".green().bold(),
                produced,
                state.existing_checkpoints().len()
            );

            let rendered = render_checkpoints(&state, output.format)?;
            write_rendered(rendered, output.out.as_deref(), output.format)
        }

        Commands::Testcases {
            input,
            existing,
            llm,
            pipeline,
            output,
        } => {
            let mut state = load_state(&input, existing.as_deref())?;
            let mut orchestrator = build_orchestrator(&llm, &pipeline)?;
            orchestrator.run_rules(&mut state)?;
            orchestrator.run_checkpoints_from_rules(&mut state)?;
            let produced = orchestrator.run_test_cases(&mut state)?;
            eprintln!("{} {} cas de test", "ok".green().bold(), produced);

            let rendered = render_test_cases(&state, output.format)?;
            write_rendered(rendered, output.out.as_deref(), output.format)
        }
    }
}

/// Extract the document and, when given, import existing checkpoints.
/// The existing-checkpoints file goes through the same extraction dispatch
/// as the main document, so PDF and DOCX reference files work too.
fn load_state(input: &Path, existing: Option<&Path>) -> Result<PipelineState> {
    let text = casgen_ingest_docs::extract_text(input)
        .with_context(|| format!("extracting {}", input.display()))?;
    let mut state = PipelineState::new();
    state.set_text(text);

    if let Some(path) = existing {
        let raw = casgen_ingest_docs::extract_text(path)
            .with_context(|| format!("extracting existing checkpoints from {}", path.display()))?;
        let points = parse_existing_checkpoints(&raw);
        eprintln!(
            "{} {} points existants importés",
            "info:".yellow().bold(),
            points.len()
        );
        state.set_existing_checkpoints(points);
    }

    Ok(state)
}

fn build_orchestrator(llm: &LlmArgs, pipeline: &PipelineArgs) -> Result<Orchestrator<LlmClient>> {
    let mut orchestrator = Orchestrator::new(llm.client()?, pipeline.config())?;
    orchestrator.on_event(report_progress);
    Ok(orchestrator)
}

fn report_progress(event: &StageEvent) {
    match event {
        StageEvent::Started {
            stage,
            total_partitions,
        } => eprintln!(
            "{} {} ({} partitions)",
            "Running".green().bold(),
            stage.label(),
            total_partitions
        ),
        StageEvent::PartitionDone {
            processed, total, ..
        } => eprintln!("  {} {}/{}", "→".cyan(), processed, total),
        StageEvent::Completed { stage, produced } => {
            tracing::debug!(stage = stage.label(), produced, "stage completed");
        }
        StageEvent::Failed { stage, message } => eprintln!(
            "{} {}: {}",
            "error:".red().bold(),
            stage.label(),
            message
        ),
    }
}

fn render_rules(state: &PipelineState, format: OutputFormat) -> Result<Rendered> {
    let items = state.rule_texts();
    Ok(match format {
        OutputFormat::Txt => Rendered::Text(casgen_export::export_items_text(
            "Règles de gestion",
            &items,
        )),
        OutputFormat::Xlsx => Rendered::Binary(casgen_export::export_items_xlsx(
            &items,
            "Regles_de_gestion",
        )?),
        OutputFormat::Docx => Rendered::Binary(casgen_export::export_items_docx(
            "Règles de Gestion",
            &items,
        )?),
        OutputFormat::Json => Rendered::Text(serde_json::to_string_pretty(state.rules())?),
    })
}

fn render_checkpoints(state: &PipelineState, format: OutputFormat) -> Result<Rendered> {
    let checkpoints = state.checkpoints();
    Ok(match format {
        OutputFormat::Txt => Rendered::Text(casgen_export::export_checkpoints_text(&checkpoints)),
        OutputFormat::Xlsx => Rendered::Binary(casgen_export::export_items_xlsx(
            &state.checkpoint_texts(),
            "Points_de_controle",
        )?),
        OutputFormat::Docx => {
            Rendered::Binary(casgen_export::export_checkpoints_docx(&checkpoints)?)
        }
        OutputFormat::Json => Rendered::Text(serde_json::to_string_pretty(&checkpoints)?),
    })
}

fn render_test_cases(state: &PipelineState, format: OutputFormat) -> Result<Rendered> {
    let cases = state.test_cases();
    Ok(match format {
        OutputFormat::Txt => Rendered::Text(casgen_export::export_test_cases_text(cases)),
        OutputFormat::Xlsx => Rendered::Binary(casgen_export::export_test_cases_xlsx(cases)?),
        OutputFormat::Docx => Rendered::Binary(casgen_export::export_test_cases_docx(cases)?),
        OutputFormat::Json => Rendered::Text(serde_json::to_string_pretty(cases)?),
    })
}

fn write_rendered(rendered: Rendered, out: Option<&Path>, format: OutputFormat) -> Result<()> {
    match (rendered, out) {
        (Rendered::Text(text), None) => {
            print!("{text}");
            Ok(())
        }
        (Rendered::Text(text), Some(path)) => {
            fs::write(path, text)?;
            eprintln!("{} {}", "wrote".green().bold(), path.display());
            Ok(())
        }
        (Rendered::Binary(bytes), Some(path)) => {
            fs::write(path, bytes)?;
            eprintln!("{} {}", "wrote".green().bold(), path.display());
            Ok(())
        }
        (Rendered::Binary(_), None) => {
            let name = match format {
                OutputFormat::Xlsx => "xlsx",
                OutputFormat::Docx => "docx",
                _ => unreachable!("text formats are never binary"),
            };
            Err(anyhow!("--out is required for {name} output"))
        }
    }
}

//! CLI command definitions, routing, and tracing setup.

use std::io::Read as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chatdesk_composer::{
    AcceptFilter, AttachmentIngestor, FsFileReader, IngestProgress, IngestedBatch, SelectedFile,
    SessionOptions, StagedSelection, SubmitOutcome, TurnComposer, VoiceCaptureController,
};
use chatdesk_render::ContentSectionParser;
use chatdesk_shared::{
    AppConfig, ChatTurn, ContentBlock, LineKind, RenderMode, init_config, load_config,
    load_config_from,
};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Chatdesk: compose chat turns and render advisory replies.
#[derive(Parser)]
#[command(
    name = "chatdesk",
    version,
    about = "Compose chat turns with attachments and render structured assistant replies.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.chatdesk/chatdesk.toml.
    #[arg(long, global = true, env = "CHATDESK_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Output format of `render`.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Compose a user turn and print it as JSON.
    Compose {
        /// Message text.
        #[arg(short, long, default_value = "")]
        text: String,

        /// File to attach (can be specified multiple times).
        #[arg(short, long = "file")]
        files: Vec<PathBuf>,

        /// Accept list overriding `[attachments] accept`.
        #[arg(long)]
        accept: Option<String>,

        /// Treat a previous turn as still awaiting its reply.
        #[arg(long)]
        in_flight: bool,

        /// Print attachment payload sizes instead of the data URLs.
        #[arg(long)]
        omit_content: bool,
    },

    /// Render an assistant reply into content blocks.
    Render {
        /// File holding the reply text (reads stdin when omitted).
        file: Option<PathBuf>,

        /// Render as a single plain block.
        #[arg(long, conflicts_with = "structured")]
        flat: bool,

        /// Split the reply at section markers.
        #[arg(long)]
        structured: bool,

        /// Output format: text or json.
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "chatdesk=info",
        1 => "chatdesk=debug",
        _ => "chatdesk=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Compose {
            text,
            files,
            accept,
            in_flight,
            omit_content,
        } => {
            let config = resolve_config(config_path)?;
            cmd_compose(
                &config,
                &text,
                &files,
                accept.as_deref(),
                in_flight,
                omit_content,
            )
            .await
        }
        Command::Render {
            file,
            flat,
            structured,
            format,
        } => {
            let config = resolve_config(config_path)?;
            let mode = if flat {
                RenderMode::Flat
            } else if structured {
                RenderMode::Structured
            } else {
                config.render.mode
            };
            cmd_render(file.as_deref(), mode, &format)
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// compose
// ---------------------------------------------------------------------------

async fn cmd_compose(
    config: &AppConfig,
    text: &str,
    files: &[PathBuf],
    accept: Option<&str>,
    in_flight: bool,
    omit_content: bool,
) -> Result<()> {
    let accept = accept.unwrap_or(&config.attachments.accept);
    let mut selection = StagedSelection::new(AcceptFilter::parse(accept)?);

    for path in files {
        let file = SelectedFile::from_path(path).await?;
        if !selection.select(file) {
            warn!(path = %path.display(), accept, "file not accepted, skipping");
            eprintln!("  Skipped {} (accepted: {accept})", path.display());
        }
    }

    let voice = if config.voice.enabled {
        // No dictation capability is available from a terminal.
        VoiceCaptureController::probe(None, SessionOptions::from(&config.voice))
    } else {
        None
    };

    let (tx, mut rx) = mpsc::unbounded_channel::<ChatTurn>();
    let mut composer = TurnComposer::new(tx).with_voice(voice);
    debug!(voice = composer.voice_available(), "composer ready");

    if !selection.is_empty() {
        let progress = Arc::new(CliIngestProgress::new()?);
        let mut ingestor =
            AttachmentIngestor::new(Arc::new(FsFileReader)).with_progress(progress);
        let batch = ingestor.ingest_from(&mut selection).completed().await?;
        if batch.failed > 0 {
            eprintln!(
                "  {} of {} attachments could not be read and were attached empty",
                batch.failed,
                batch.records.len()
            );
        }
        composer.add_attachments(batch);
    }

    composer.update_text(text);
    match composer.submit(in_flight) {
        SubmitOutcome::Sent(id) => {
            let mut turn = rx
                .try_recv()
                .map_err(|_| eyre!("turn {id} was not delivered"))?;
            if omit_content {
                for attachment in &mut turn.attachments {
                    attachment.content = format!("<{} bytes>", attachment.content.len());
                }
            }
            println!("{}", serde_json::to_string_pretty(&turn)?);
        }
        SubmitOutcome::Empty => {
            eprintln!(
                "Nothing sent: the message is empty (\"{}\").",
                config.composer.placeholder
            );
        }
        SubmitOutcome::InFlight => {
            eprintln!("Nothing sent: a previous turn is still awaiting its reply.");
            println!("{}", serde_json::to_string_pretty(&composer.snapshot())?);
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Attachment read progress on an indicatif spinner.
struct CliIngestProgress {
    spinner: ProgressBar,
    total: AtomicUsize,
    finished: AtomicUsize,
}

impl CliIngestProgress {
    fn new() -> Result<Self> {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")?
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(Duration::from_millis(80));
        Ok(Self {
            spinner,
            total: AtomicUsize::new(0),
            finished: AtomicUsize::new(0),
        })
    }
}

impl IngestProgress for CliIngestProgress {
    fn read_started(&self, name: &str, slot: usize, total: usize) {
        self.total.store(total, Ordering::Relaxed);
        self.spinner
            .set_message(format!("Reading [{}/{total}] {name}", slot + 1));
    }

    fn read_finished(&self, name: &str, ok: bool) {
        let finished = self.finished.fetch_add(1, Ordering::Relaxed) + 1;
        let total = self.total.load(Ordering::Relaxed);
        let status = if ok { "done" } else { "failed" };
        self.spinner
            .set_message(format!("Read [{finished}/{total}] {name} ({status})"));
    }

    fn batch_completed(&self, batch: &IngestedBatch) {
        self.spinner.finish_and_clear();
        info!(
            batch_id = batch.batch_id,
            files = batch.records.len(),
            failed = batch.failed,
            "attachments ready"
        );
    }
}

// ---------------------------------------------------------------------------
// render
// ---------------------------------------------------------------------------

fn cmd_render(file: Option<&Path>, mode: RenderMode, format: &OutputFormat) -> Result<()> {
    let raw = read_input(file)?;
    let blocks = ContentSectionParser::new().parse(&raw, mode);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&blocks)?),
        OutputFormat::Text => print_blocks(&blocks),
    }
    Ok(())
}

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read {}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .wrap_err("failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn print_blocks(blocks: &[ContentBlock]) {
    for (i, block) in blocks.iter().enumerate() {
        if i > 0 {
            println!();
        }
        if let Some(title) = block.category.title() {
            let icon = block.category.icon().unwrap_or("-");
            println!("[{icon}] {title}");
        }
        for line in &block.lines {
            match line.kind {
                LineKind::Bullet => println!("  • {}", line.text),
                LineKind::Paragraph => println!("{}", line.text),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = resolve_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

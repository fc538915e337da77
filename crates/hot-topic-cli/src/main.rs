use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use hot_topic_client::{RunOutcome, WorkflowClient};
use hot_topic_core::audio::AudioPayload;
use hot_topic_core::config::Config;
use hot_topic_core::events::{DEVELOPER_HOT_TOPIC_WORKFLOW, PipelineEvent};
use hot_topic_core::types::{TopicQuery, parse_date};
use hot_topic_gateway::GatewayState;
use hot_topic_workflow::default_registry;

mod logging;

#[derive(Parser)]
#[command(
    name = "hot-topic",
    about = "Hot Topic Radio: today's developer topics from X, narrated",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Port to listen on (default: 3000)
        #[arg(long)]
        port: Option<u16>,

        /// Serve the browser UI even if disabled in config
        #[arg(long)]
        ui: bool,
    },

    /// Run the pipeline in-process and print its events as NDJSON
    Run {
        /// Target date (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,

        /// Where to write the synthesized audio
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Run the workflow on a running gateway and follow its stream
    Listen {
        /// Gateway base URL
        #[arg(long, default_value = "http://127.0.0.1:3000")]
        url: String,

        /// Target date (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,

        /// Where to write the synthesized audio
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show configuration status
    Status,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .map(PathBuf::from)
        .unwrap_or_else(Config::config_path);
    let config = Config::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    logging::init(&config.logging.clone().unwrap_or_default(), cli.verbose);

    match cli.command {
        Commands::Serve { port, ui } => {
            let port = port.unwrap_or_else(|| config.gateway_port());
            let ui_enabled = ui || config.ui_enabled();
            tracing::info!("Starting Hot Topic Radio gateway on port {port}");
            let state = Arc::new(GatewayState::from_config(Arc::new(config)));
            hot_topic_gateway::start_gateway(state, port, ui_enabled).await?;
        }
        Commands::Run { date, out } => {
            let query = TopicQuery::from_optional_str(date.as_deref())?;
            run_local(Arc::new(config), query, out).await?;
        }
        Commands::Listen { url, date, out } => {
            let date = date.as_deref().map(parse_date).transpose()?;
            listen(&url, date, out).await?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let json = serde_json::to_string_pretty(&config)?;
                println!("{json}");
            }
        },
        Commands::Status => print_status(&config, &config_path),
    }

    Ok(())
}

/// Run the workflow in this process, printing each event as it happens.
async fn run_local(config: Arc<Config>, query: TopicQuery, out: Option<PathBuf>) -> anyhow::Result<()> {
    let registry = default_registry(config);
    let runner = registry.get(DEVELOPER_HOT_TOPIC_WORKFLOW)?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match redact_audio(event).to_ndjson() {
                Ok(line) => print!("{line}"),
                Err(e) => tracing::warn!("unprintable event: {e}"),
            }
        }
    });

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let result = runner.run(query, tx, cancel).await;
    let _ = printer.await;
    let output = result?;

    let path = out.unwrap_or_else(|| default_audio_path(&query, &output.audio));
    write_audio(&path, &output.audio)?;
    Ok(())
}

/// Follow a gateway stream the way the browser UI does.
async fn listen(url: &str, date: Option<chrono::NaiveDate>, out: Option<PathBuf>) -> anyhow::Result<()> {
    let client = WorkflowClient::new(url);
    let mut last_status = String::new();
    let view = client
        .run(date, |_, view| {
            if view.status != last_status {
                eprintln!("{}", view.status);
                last_status = view.status.clone();
            }
        })
        .await?;

    if !view.result_text.is_empty() {
        println!("{}", view.result_text);
    }
    if let Some(audio) = &view.audio {
        let path = out.unwrap_or_else(|| default_audio_path(&TopicQuery::new(date), audio));
        write_audio(&path, audio)?;
    }

    match view.outcome {
        Some(RunOutcome::Finished) => Ok(()),
        Some(RunOutcome::Failed(error)) => anyhow::bail!("workflow failed: {error}"),
        None => anyhow::bail!("stream ended before the workflow finished"),
    }
}

/// Audio is written to a file; keep stdout readable.
fn redact_audio(event: PipelineEvent) -> PipelineEvent {
    match event {
        PipelineEvent::StepResult { id, status, mut output } => {
            if let Some(audio) = output.audio_data.take() {
                tracing::info!(bytes = audio.len(), mime = audio.mime_type(), "Audio synthesized");
            }
            PipelineEvent::StepResult { id, status, output }
        }
        other => other,
    }
}

fn default_audio_path(query: &TopicQuery, audio: &AudioPayload) -> PathBuf {
    let date = query
        .target_date
        .unwrap_or_else(hot_topic_core::types::today);
    PathBuf::from(format!("hot-topic-{}.{}", date.format("%Y-%m-%d"), audio.file_extension()))
}

fn write_audio(path: &Path, audio: &AudioPayload) -> anyhow::Result<()> {
    std::fs::write(path, audio.as_bytes())
        .with_context(|| format!("writing audio to {}", path.display()))?;
    eprintln!("Audio written to {} ({} bytes)", path.display(), audio.len());
    Ok(())
}

fn print_status(config: &Config, config_path: &Path) {
    println!("Hot Topic Radio v{}", env!("CARGO_PKG_VERSION"));
    println!(
        "Config: {}{}",
        config_path.display(),
        if config_path.exists() { "" } else { " (not found, using defaults)" }
    );
    println!("Gateway: {}:{}", config.gateway_bind(), config.gateway_port());
    println!("Browser UI: {}", if config.ui_enabled() { "enabled" } else { "disabled" });
    println!("Agent model: {}", config.agent_model());
    println!("Search model: {}", config.search_model());
    println!("TTS voice: {}", config.tts_voice());
    if config.debug_skip_pipeline() {
        println!("Debug mode: pipeline is skipped");
    }

    let (warnings, errors) = config.validate();
    for w in &warnings {
        println!("warning: {w}");
    }
    for e in &errors {
        println!("error: {e}");
    }
    if warnings.is_empty() && errors.is_empty() {
        println!("Configuration OK");
    }
}

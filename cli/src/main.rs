//! clipcast command line.
//!
//! Every invocation loads the config, builds the components and runs one
//! command. `run` keeps the slot scheduler ticking until Ctrl-C.

mod app;
mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_log::LogTracer;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter};

use clipcast::config::default_config_path;
use clipcast::{load_config, ClipcastError, ConfigError};

#[derive(Debug, Parser)]
#[command(name = "clipcast", version, about = "Dub short videos and publish them on a schedule")]
pub struct Cli {
    /// Config file (default: ~/.clipcast/config.json).
    #[arg(long, short = 'c', global = true, env = "CLIPCAST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true, env = "CLIPCAST_LOG_JSON")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the slot scheduler until interrupted.
    Run,
    /// Run a single scheduler tick now.
    Tick,
    /// Submit a source link for dubbing.
    Submit {
        url: String,
        /// Affiliate link attached to the resulting artifact.
        #[arg(long)]
        link: Option<String>,
        /// Chat to notify when the job ends.
        #[arg(long)]
        chat: Option<i64>,
    },
    /// Cancel a queued, processing or failed job.
    Cancel { id: String },
    /// List processing, queued and failed jobs.
    Jobs,
    /// Start the oldest queued job if nothing is processing.
    QueueNext,
    /// Publish a random eligible artifact to a target right now.
    ForcePost {
        target: String,
        #[arg(long)]
        skip_comment: bool,
    },
    #[command(subcommand)]
    Gallery(GalleryCommand),
    #[command(subcommand)]
    Artifact(ArtifactCommand),
    #[command(subcommand)]
    Target(TargetCommand),
    #[command(subcommand)]
    Categories(CategoryCommand),
    /// Show publish history.
    History {
        #[arg(long)]
        target: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: u64,
    },
    /// Withdraw a publish record and delete its remote post.
    Withdraw { record: i64 },
}

#[derive(Debug, Subcommand)]
pub enum GalleryCommand {
    /// List artifacts, newest first.
    List,
    /// Recompute the gallery snapshot from the artifact objects.
    Rebuild,
    /// List artifacts already claimed by a publish record.
    Used,
}

#[derive(Debug, Subcommand)]
pub enum ArtifactCommand {
    Show { id: String },
    /// Change metadata. An empty value clears the field.
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        link: Option<String>,
    },
    Delete { id: String },
    /// Generate a title from the script, replacing any existing one.
    GenerateTitle { id: String },
    /// Generate titles for every untitled artifact.
    GenerateTitles,
    /// List artifacts that have a script but no title.
    PendingTitles,
}

#[derive(Debug, Subcommand)]
pub enum CategoryCommand {
    /// Show the categories offered to the script generator.
    List,
    /// Replace the category list, e.g. `Kitchen,Tools,Toys`.
    Set { categories: String },
    /// Go back to the categories from the config.
    Reset,
}

#[derive(Debug, Subcommand)]
pub enum TargetCommand {
    /// Register a target, or refresh its name and credentials.
    Add {
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long, env = "CLIPCAST_TARGET_CREDENTIAL", hide_env_values = true)]
        credential: String,
        #[arg(long, hide_env_values = true)]
        comment_credential: Option<String>,
        /// Slot list such as `9:05,18:30`.
        #[arg(long, default_value = "")]
        slots: String,
        #[arg(long)]
        timezone: Option<String>,
        #[arg(long)]
        image_url: Option<String>,
    },
    List,
    Activate { id: String },
    Deactivate { id: String },
    /// Replace a target's slot list.
    Slots { id: String, spec: String },
    Remove { id: String },
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    // Library code logs through `log`; forward those records to tracing.
    if let Err(e) = LogTracer::init() {
        eprintln!("Failed to install log bridge: {e}");
    }

    let result = if json {
        tracing::subscriber::set_global_default(
            registry.with(tracing_subscriber::fmt::layer().json().with_target(true)),
        )
    } else {
        tracing::subscriber::set_global_default(
            registry.with(tracing_subscriber::fmt::layer().with_target(false)),
        )
    };
    if let Err(e) = result {
        eprintln!("Failed to install tracing subscriber: {e}");
    }
}

fn config_path(cli: &Cli) -> Result<PathBuf, ClipcastError> {
    cli.config
        .clone()
        .or_else(default_config_path)
        .ok_or_else(|| {
            ConfigError::Validation {
                message: "no config path given and no home directory found".to_string(),
            }
            .into()
        })
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(async {
        let path = config_path(&cli)?;
        let config = load_config(&path)?;
        log::debug!("Loaded config from {}", path.display());
        let app = app::App::build(config)?;
        commands::execute(&app, cli.command, cli.json).await
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use pixy_memory::{
    LogConfig, MemoryArchive, MemorySearchTool, PixyMemoryToml, RegexSafetyValidator,
};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_CONFIG_FILE_NAME: &str = "pixy-memory.toml";

#[derive(Parser, Debug)]
#[command(name = "pixy-memory", version, about = "Inspect and search agent memory notes")]
struct Cli {
    /// Workspace whose `memory/` directory holds the notes.
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,
    /// Config file; defaults to `<workspace>/pixy-memory.toml` when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the long-term note and today's note.
    Context,
    /// List daily note files, newest first.
    List,
    /// Search daily notes by keyword and/or regex.
    Search {
        #[arg(long = "keyword")]
        keywords: Vec<String>,
        #[arg(long = "regex")]
        regex_patterns: Vec<String>,
        #[arg(long)]
        max_results: Option<i64>,
    },
    /// Append a line to a daily note.
    Append {
        content: String,
        /// Date of the note (YYYY-MM-DD); today when omitted.
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Report whether a search pattern would be accepted.
    CheckRegex { pattern: String },
}

fn main() {
    let cli = Cli::parse();
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("error: {error}");
            std::process::exit(1);
        }
    };
    init_tracing(&config.log);
    if let Err(error) = run(cli.command, config) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<PixyMemoryToml, String> {
    let process_cwd =
        std::env::current_dir().map_err(|error| format!("read cwd failed: {error}"))?;
    let workspace = cli
        .workspace
        .as_ref()
        .map(|path| resolve_path(&process_cwd, path));

    let config_path = match &cli.config {
        Some(path) => Some(resolve_path(&process_cwd, path)),
        None => {
            let candidate = workspace
                .as_deref()
                .unwrap_or(&process_cwd)
                .join(DEFAULT_CONFIG_FILE_NAME);
            candidate.is_file().then_some(candidate)
        }
    };
    let mut config =
        PixyMemoryToml::load_or_default(config_path.as_deref()).map_err(|error| error.to_string())?;

    if let Some(workspace) = workspace {
        config.memory.workspace = workspace;
    } else if config.memory.workspace.is_relative() {
        config.memory.workspace = resolve_path(&process_cwd, &config.memory.workspace);
    }
    Ok(config)
}

fn init_tracing(log: &LogConfig) {
    static TRACE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

    let log_dir = log.resolved_dir();
    let file_layer = match std::fs::create_dir_all(&log_dir) {
        Ok(()) => {
            let appender = tracing_appender::rolling::never(&log_dir, &log.file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let _ = TRACE_GUARD.set(guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(non_blocking),
            )
        }
        Err(error) => {
            eprintln!(
                "warning: failed to create log dir {}: {error}",
                log_dir.display()
            );
            None
        }
    };
    let stdout_layer = log
        .stdout
        .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stdout));

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .try_init();
}

fn run(command: Command, config: PixyMemoryToml) -> Result<(), String> {
    let memory = config.memory;
    memory.validate().map_err(|error| error.to_string())?;
    let archive = MemoryArchive::from_config(&memory).map_err(|error| error.to_string())?;
    info!(memory_dir = %archive.memory_dir().display(), "memory archive opened");

    match command {
        Command::Context => {
            let snapshot = archive
                .context_snapshot()
                .map_err(|error| error.to_string())?;
            if snapshot.is_empty() {
                println!("(empty memory)");
            } else {
                println!("{snapshot}");
            }
        }
        Command::List => {
            let files = archive
                .list_daily_files()
                .map_err(|error| error.to_string())?;
            for file in files {
                if let Some(name) = file.file_name() {
                    println!("{}", name.to_string_lossy());
                }
            }
        }
        Command::Search {
            keywords,
            regex_patterns,
            max_results,
        } => {
            let tool = MemorySearchTool::new(Arc::new(archive), memory);
            let output = tool.search(keywords, regex_patterns, max_results);
            print!("{}", ensure_trailing_newline(output));
        }
        Command::Append { content, date } => {
            let date = date.unwrap_or_else(MemoryArchive::today);
            let path = archive
                .append_daily(date, &content)
                .map_err(|error| error.to_string())?;
            println!("appended to {}", path.display());
        }
        Command::CheckRegex { pattern } => match RegexSafetyValidator::new().check(&pattern) {
            Ok(_) => println!("safe"),
            Err(reason) => return Err(format!("unsafe pattern: {reason}")),
        },
    }
    Ok(())
}

fn ensure_trailing_newline(mut text: String) -> String {
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}

fn resolve_path(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

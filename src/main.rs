// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use shiori::analyzer::CommandAnalyzer;
use shiori::app_config::{self, Config};
use shiori::app_controller::{Controller, OutputTarget};
use shiori::database::Repository;
use shiori::file_utils::FileManager;
use shiori::furigana::match_furigana_bounded;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Parser, Debug)]
struct StageArgs {
    /// Document file or directory (JSON envelopes, .srt or .html)
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Write JSON lines to this file instead of the database ("-" for stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Database file (defaults to the configured or per-user location)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Reprocess documents whose body has not changed
    #[arg(short, long)]
    force: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Split documents into search fragments
    Fragment(StageArgs),

    /// Group documents into display chunks
    Chunk(StageArgs),

    /// Analyze stored fragments and write bulk index documents
    Index {
        /// Database file (defaults to the configured or per-user location)
        #[arg(long)]
        db: Option<PathBuf>,

        /// Output file ("-" or absent for stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Align a reading with a surface form and print it in bracket notation
    Furigana {
        /// Surface form, e.g. 食べ物
        surface: String,
        /// Reading in hiragana or katakana, e.g. たべもの
        reading: String,
    },

    /// Print the plain text of documents
    Text {
        /// Document file or directory
        #[arg(value_name = "INPUT_PATH")]
        input_path: PathBuf,
    },

    /// Generate shell completions for shiori
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Shiori - Japanese sentence fragmenting, chunking and furigana
///
/// Splits subtitle tracks and novel chapters into searchable sentences and
/// display chunks, and annotates stored sentences with readings for search.
#[derive(Parser, Debug)]
#[command(name = "shiori")]
#[command(version)]
#[command(about = "Japanese sentence fragmenting, chunking and furigana")]
#[command(long_about = "Shiori splits Japanese subtitle tracks and novel chapters into search fragments and display chunks.

EXAMPLES:
    shiori fragment corpus/                     # Store fragments of every document
    shiori chunk -o chunks.jsonl episode.srt    # Write chunks as JSON lines
    shiori index -o bulk.ndjson                 # Analyze stored fragments for search
    shiori furigana 食べ物 たべもの              # Prints 食[た]べ 物[もの]
    shiori completions bash > shiori.bash       # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let color = Self::color_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {:<5} {}\x1B[0m",
                color,
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // The logger accepts everything; the effective level is the global max level
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Some(cmd_log_level) = &cli.log_level {
        let level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "shiori", &mut std::io::stdout());
            Ok(())
        }
        Commands::Furigana { surface, reading } => {
            let config = load_config(&cli.config_path, cli.log_level.as_ref())?;
            println!(
                "{}",
                match_furigana_bounded(&surface, &reading, false, config.furigana.max_search_states)
            );
            Ok(())
        }
        Commands::Text { input_path } => {
            let config = load_config(&cli.config_path, cli.log_level.as_ref())?;
            let controller = Controller::with_config(config)?;
            println!("{}", controller.run_text(&input_path)?);
            Ok(())
        }
        Commands::Fragment(args) => {
            let config = load_config(&cli.config_path, cli.log_level.as_ref())?;
            let controller = Controller::with_config(config)?;
            let mut output = open_output_target(&controller, &args)?;
            let summary = controller
                .run_fragment(&args.input_path, &mut output, args.force)
                .await?;
            if summary.failed > 0 {
                warn!("{} documents failed", summary.failed);
            }
            Ok(())
        }
        Commands::Chunk(args) => {
            let config = load_config(&cli.config_path, cli.log_level.as_ref())?;
            let controller = Controller::with_config(config)?;
            let mut output = open_output_target(&controller, &args)?;
            let summary = controller
                .run_chunk(&args.input_path, &mut output, args.force)
                .await?;
            if summary.failed > 0 {
                warn!("{} documents failed", summary.failed);
            }
            Ok(())
        }
        Commands::Index { db, output } => {
            let config = load_config(&cli.config_path, cli.log_level.as_ref())?;
            let controller = Controller::with_config(config)?;
            let repo = open_repository(&controller, db.as_deref())?;
            let analyzer = Arc::new(CommandAnalyzer::from_config(&controller.config().analyzer));
            let writer = open_writer(output.as_deref())?;
            controller.run_index(&repo, analyzer, writer).await?;
            Ok(())
        }
    }
}

/// Load the configuration file, creating a default one when it does not exist
fn load_config(config_path: &str, cli_log_level: Option<&CliLogLevel>) -> Result<Config> {
    let mut config = if Path::new(config_path).exists() {
        let file = File::open(config_path).context(format!("Failed to open config file: {}", config_path))?;

        let reader = BufReader::new(file);
        serde_json::from_reader(reader).context(format!("Failed to parse config file: {}", config_path))?
    } else {
        warn!("Config file not found at '{}', creating default config.", config_path);

        let config = Config::default();
        let config_json =
            serde_json::to_string_pretty(&config).context("Failed to serialize default config to JSON")?;
        FileManager::write_to_file(config_path, &config_json)
            .context(format!("Failed to write default config to file: {}", config_path))?;

        config
    };

    if let Some(log_level) = cli_log_level {
        config.log_level = log_level.clone().into();
    }

    config.validate().context("Configuration validation failed")?;

    // If log level was not set via command line, update it from config now
    if cli_log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }

    Ok(config)
}

fn open_repository(controller: &Controller, db: Option<&Path>) -> Result<Repository> {
    let path = db.or(controller.config().database.path.as_deref());
    let repo = Repository::open(path)?;
    info!("Database: {}", repo.stats()?);
    Ok(repo)
}

fn open_writer(output: Option<&Path>) -> Result<Box<dyn Write + Send>> {
    match output {
        Some(path) if path != Path::new("-") => {
            if let Some(parent) = path.parent() {
                FileManager::ensure_dir(parent)?;
            }
            let file = File::create(path).with_context(|| format!("Failed to create output file: {:?}", path))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        _ => Ok(Box::new(BufWriter::new(std::io::stdout()))),
    }
}

fn open_output_target(controller: &Controller, args: &StageArgs) -> Result<OutputTarget> {
    match &args.output {
        Some(path) => Ok(OutputTarget::JsonLines(open_writer(Some(path))?)),
        None => Ok(OutputTarget::Database(open_repository(controller, args.db.as_deref())?)),
    }
}

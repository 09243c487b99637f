#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, warn};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use deckglot::app_config::{self, Config, TranslationProvider};
use deckglot::app_controller::{Controller, RunOptions};

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    Azure,
    OpenAI,
    Anthropic,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::Azure => TranslationProvider::AzureOpenAI,
            CliTranslationProvider::OpenAI => TranslationProvider::OpenAI,
            CliTranslationProvider::Anthropic => TranslationProvider::Anthropic,
        }
    }
}

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

fn level_filter(level: &app_config::LogLevel) -> LevelFilter {
    match level {
        app_config::LogLevel::Error => LevelFilter::Error,
        app_config::LogLevel::Warn => LevelFilter::Warn,
        app_config::LogLevel::Info => LevelFilter::Info,
        app_config::LogLevel::Debug => LevelFilter::Debug,
        app_config::LogLevel::Trace => LevelFilter::Trace,
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate a presentation (default command)
    Translate(TranslateArgs),

    /// Generate shell completions for deckglot
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Presentation to translate (.pptx)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Target language code (e.g., 'ko', 'ja', 'fr')
    #[arg(value_name = "TARGET_LANG")]
    target_lang: String,

    /// Output file (default: <input>_<lang>.pptx)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Slides to translate: N or A-B (1-based)
    #[arg(short, long)]
    slides: Option<String>,

    /// Configuration file path
    #[arg(short, long, default_value = "deckglot.json")]
    config_path: String,

    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Model (or Azure deployment) to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Verbose output (debug logging)
    #[arg(short, long)]
    verbose: bool,

    /// Source language code (default from config)
    #[arg(long)]
    source_language: Option<String>,

    /// Save slides committed before a cancellation
    #[arg(long)]
    keep_partial: bool,
}

/// deckglot - slide deck translation that keeps run-level formatting
#[derive(Parser, Debug)]
#[command(name = "deckglot")]
#[command(version)]
#[command(about = "Translate PowerPoint decks while preserving run-level formatting")]
#[command(long_about = "deckglot translates the text of .pptx presentations (text boxes, table cells and
speaker notes) with an LLM provider, one request per slide, and splices the translation
back into the original runs so bold, colour and other emphasis survive.

EXAMPLES:
    deckglot deck.pptx ko                        # Translate every slide into Korean
    deckglot deck.pptx ja -s 3-10                # Translate slides 3 to 10
    deckglot deck.pptx fr -o deck_fr.pptx        # Choose the output file
    deckglot deck.pptx de -p openai -m gpt-4o    # Use a specific provider and model
    deckglot completions bash > deckglot.bash    # Generate bash completions

CONFIGURATION:
    Configuration is stored in deckglot.json by default. If the file doesn't exist,
    a default one is created. Credentials can come from the environment:
    AZURE_OPENAI_ENDPOINT, AZURE_OPENAI_API_KEY, AZURE_OPENAI_API_VERSION,
    AZURE_OPENAI_DEPLOYMENT_NAME, OPENAI_API_KEY, ANTHROPIC_API_KEY.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    translate: Option<TranslateArgs>,
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
        // The logger itself passes everything; filtering happens through max_level
        let logger = Box::new(CustomLogger::new(LevelFilter::Trace));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Color code and marker for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("1;31", "ERROR"),
            Level::Warn => ("1;33", "WARN "),
            Level::Info => ("1;32", "INFO "),
            Level::Debug => ("1;36", "DEBUG"),
            Level::Trace => ("1;35", "TRACE"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (color, marker) = Self::style_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "\x1B[{}m{} {} {}\x1B[0m", color, now, marker, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() {
    // Logger starts at info until the config is read
    // Level is adjusted once the config is loaded
    if let Err(e) = CustomLogger::init(LevelFilter::Info) {
        eprintln!("Failed to initialize logger: {}", e);
    }

    let cli = CommandLineOptions::parse();

    let result = match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "deckglot", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Translate(args)) => run_translate(args).await,
        None => match cli.translate {
            Some(args) => run_translate(args).await,
            None => Err(anyhow!("INPUT and TARGET_LANG are required (see --help)")),
        },
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

/// Load the configuration file, creating it with defaults when missing
fn load_or_create_config(config_path: &str) -> Result<Config> {
    if Path::new(config_path).exists() {
        let file = File::open(config_path).context(format!("Failed to open config file: {}", config_path))?;
        let reader = BufReader::new(file);
        let config: Config =
            serde_json::from_reader(reader).context(format!("Failed to parse config file: {}", config_path))?;
        Ok(config)
    } else {
        warn!("Config file not found at '{}', creating default config.", config_path);
        let config = Config::default();

        let config_json =
            serde_json::to_string_pretty(&config).context("Failed to serialize default config to JSON")?;
        std::fs::write(config_path, config_json)
            .context(format!("Failed to write default config to file: {}", config_path))?;
        Ok(config)
    }
}

async fn run_translate(options: TranslateArgs) -> Result<()> {
    // A --log-level flag wins over the config file
    if let Some(cmd_log_level) = &options.log_level {
        log::set_max_level(level_filter(&cmd_log_level.clone().into()));
    } else if options.verbose {
        log::set_max_level(LevelFilter::Debug);
    }

    let mut config = load_or_create_config(&options.config_path)?;
    config.apply_env_overrides();

    // CLI flags override the config file
    if let Some(provider) = &options.provider {
        config.translation.provider = provider.clone().into();
    }
    if let Some(model) = &options.model {
        let provider = config.translation.provider.clone();
        config.translation.provider_config_mut(&provider).model = model.clone();
    }
    if let Some(source_lang) = &options.source_language {
        config.source_language = source_lang.clone();
    }
    config.target_language = options.target_lang.clone();
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }

    // Validate only after every override is applied
    config.validate().context("Configuration validation failed")?;

    // Otherwise the config file decides
    if options.log_level.is_none() && !options.verbose {
        log::set_max_level(level_filter(&config.log_level));
    }

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, stopping after the current slide...");
                cancel.store(true, Ordering::SeqCst);
            }
        });
    }

    let controller = Controller::with_config(config)?;
    let run_options = RunOptions {
        output: options.output.clone(),
        slides: options.slides.clone(),
        keep_partial: options.keep_partial,
        show_progress: true,
    };

    let result = controller.run(&options.input, &run_options, &cancel).await?;
    if result.report.cancelled && result.output_path.is_none() {
        return Err(anyhow!("Translation cancelled"));
    }
    Ok(())
}

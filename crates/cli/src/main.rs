// smx - CT / JEEVES / STIBO identifier reconciliation

mod exit_codes;
mod inspect;
mod run;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use sourcematrix_config::{ConfigError, LoadedSettings, Settings};
use sourcematrix_recon::{ReconError, ReconKind, Source, SourceCatalog};

use exit_codes::{config_exit_code, recon_exit_code, ErrorOutput, EXIT_CONFIG, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "smx")]
#[command(about = "Reconcile product, vendor and customer codes across CT, JEEVES and STIBO")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Settings file (default: ./sourcematrix.toml, then the user config dir)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile one market (or all) and write the report workbook
    #[command(after_help = "\
Examples:
  smx run --market ekofisk --date 2302
  smx run --market all
  smx run --market fresh --kind product --kind vendor-os --json
  SMX_DATA_ROOT=/srv/exports smx run --strict")]
    Run {
        /// Market name from settings, or "all"
        #[arg(long, default_value = "ekofisk")]
        market: String,

        /// Snapshot folder token DDMM (default: settings default_date)
        #[arg(long, env = "SMX_DATE")]
        date: Option<String>,

        /// Reconciliation type; repeatable (default: all five)
        #[arg(long = "kind", value_name = "KIND")]
        kinds: Vec<ReconKind>,

        /// Folder holding CT/, JEEVES/ and STIBO/
        #[arg(long, env = "SMX_DATA_ROOT")]
        root: Option<PathBuf>,

        /// Reports are written under <OUTPUT_DIR>/<DATE>/
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// TOML source catalog replacing the built-in layouts
        #[arg(long, value_name = "FILE")]
        catalog: Option<PathBuf>,

        /// Print tables as JSON on stdout instead of writing a workbook
        #[arg(long)]
        json: bool,

        /// Exit 4 when any source is missing or failed
        #[arg(long)]
        strict: bool,
    },

    /// Print the effective source catalog
    Catalog {
        /// TOML source catalog replacing the built-in layouts
        #[arg(long, value_name = "FILE")]
        catalog: Option<PathBuf>,

        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Show which file a source resolves to
    #[command(after_help = "\
Examples:
  smx locate --source stibo --kind product
  smx locate --source ct --kind vendor-invoice --market ekofisk --date 2302")]
    Locate {
        /// CT, JEEVES or STIBO
        #[arg(long)]
        source: Source,

        /// Reconciliation type
        #[arg(long)]
        kind: ReconKind,

        /// Snapshot folder token DDMM (default: settings default_date)
        #[arg(long, env = "SMX_DATE")]
        date: Option<String>,

        /// Market for market-scoped file rules
        #[arg(long)]
        market: Option<String>,

        /// Folder holding CT/, JEEVES/ and STIBO/
        #[arg(long, env = "SMX_DATA_ROOT")]
        root: Option<PathBuf>,

        /// TOML source catalog replacing the built-in layouts
        #[arg(long, value_name = "FILE")]
        catalog: Option<PathBuf>,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\ntarget:  ", env!("TARGET"),
    )
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    // Also bridges `log` records from the library crates.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let json = matches!(&cli.command, Commands::Run { json: true, .. } | Commands::Catalog { json: true, .. });

    let result = load_settings(cli.config.as_deref()).and_then(|loaded| match cli.command {
        Commands::Run {
            market,
            date,
            kinds,
            root,
            output_dir,
            catalog,
            json,
            strict,
        } => run::cmd_run(
            &loaded,
            run::RunArgs {
                market,
                date,
                kinds,
                root,
                output_dir,
                catalog,
                json,
                strict,
            },
        ),
        Commands::Catalog { catalog, json } => inspect::cmd_catalog(&loaded, catalog, json),
        Commands::Locate {
            source,
            kind,
            date,
            market,
            root,
            catalog,
        } => inspect::cmd_locate(&loaded, source, kind, date, market, root, catalog),
    });

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if json {
                let output = ErrorOutput {
                    error: &message,
                    hint: hint.as_deref(),
                    exit_code: code,
                };
                if let Ok(line) = serde_json::to_string(&output) {
                    eprintln!("{line}");
                }
            } else {
                if !message.is_empty() {
                    eprintln!("error: {message}");
                }
                if let Some(hint) = hint {
                    eprintln!("hint:  {hint}");
                }
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn recon(err: ReconError) -> Self {
        let hint = match &err {
            ReconError::CatalogParse(_) | ReconError::CatalogValidation(_) => {
                Some("run `smx catalog --json` to see the built-in layouts".to_string())
            }
            ReconError::Output { .. } => Some("is the report open in Excel?".to_string()),
            _ => None,
        };
        Self { code: recon_exit_code(&err), message: err.to_string(), hint }
    }

    pub fn config(err: ConfigError) -> Self {
        let hint = match &err {
            ConfigError::InvalidDate(_) => Some("dates name the snapshot folder, e.g. --date 2302".to_string()),
            ConfigError::Parse { .. } | ConfigError::Invalid(_) => {
                Some(format!("default settings file: {}", settings_path_display()))
            }
            ConfigError::Read { .. } => None,
        };
        Self { code: config_exit_code(&err), message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

fn settings_path_display() -> String {
    Settings::config_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(no user config dir)".to_string())
}

fn load_settings(explicit: Option<&std::path::Path>) -> Result<LoadedSettings, CliError> {
    let loaded = Settings::load(explicit).map_err(CliError::config)?;
    if let Some(origin) = &loaded.origin {
        log::debug!("using settings from {}", origin.display());
    }
    Ok(loaded)
}

/// `--catalog` flag, then the settings `catalog` entry, then the built-in one.
pub(crate) fn load_catalog(flag: Option<PathBuf>, settings: &Settings) -> Result<SourceCatalog, CliError> {
    let Some(path) = flag.or_else(|| settings.catalog.clone()) else {
        return Ok(SourceCatalog::builtin());
    };
    let contents = std::fs::read_to_string(&path).map_err(|e| {
        CliError::new(EXIT_CONFIG, format!("cannot read catalog {}: {e}", path.display()))
    })?;
    let catalog = SourceCatalog::from_toml(&contents).map_err(CliError::recon)?;
    log::info!("source catalog: {} ({} specs)", path.display(), catalog.specs.len());
    Ok(catalog)
}

/// Explicit date or the settings default, validated as DDMM.
pub(crate) fn resolve_date(flag: Option<String>, settings: &Settings) -> Result<String, CliError> {
    let date = flag.unwrap_or_else(|| settings.default_date.clone()).trim().to_string();
    sourcematrix_config::validate_date(&date).map_err(CliError::config)?;
    Ok(date)
}

/// Configured spelling of a market name.
pub(crate) fn resolve_market(name: &str, settings: &Settings) -> Result<String, CliError> {
    settings
        .market(name)
        .map(str::to_string)
        .ok_or_else(|| {
            CliError::usage(format!("unknown market '{name}'"))
                .with_hint(format!("configured markets: {}", settings.markets.join(", ")))
        })
}

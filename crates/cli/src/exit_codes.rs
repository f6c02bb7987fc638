//! CLI Exit Code Registry
//!
//! Single source of truth for `smx` exit codes. Scripts scheduling the
//! nightly reconciliation rely on them.
//!
//! | Code | Meaning                                                   |
//! |------|-----------------------------------------------------------|
//! | 0    | Success (a run with unavailable sources still succeeds)   |
//! | 1    | General error, or `smx locate` found nothing              |
//! | 2    | Usage error: bad date token, unknown market / kind        |
//! | 3    | Settings or source catalog could not be loaded            |
//! | 4    | Degraded run under `--strict`                             |
//! | 5    | Report workbook or fingerprint record could not be written |

use sourcematrix_config::ConfigError;
use sourcematrix_recon::ReconError;

/// Success - command completed.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments.
pub const EXIT_USAGE: u8 = 2;

/// Settings file or source catalog is unreadable or invalid.
pub const EXIT_CONFIG: u8 = 3;

/// At least one source was missing or failed, and `--strict` was given.
pub const EXIT_DEGRADED: u8 = 4;

/// Writing the report or its fingerprint record failed.
pub const EXIT_OUTPUT: u8 = 5;

/// Map an engine/IO error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::CatalogParse(_) | ReconError::CatalogValidation(_) => EXIT_CONFIG,
        ReconError::Output { .. } | ReconError::Fingerprint { .. } => EXIT_OUTPUT,
        ReconError::SourceNotFound { .. }
        | ReconError::MissingSpec { .. }
        | ReconError::SheetNotFound { .. }
        | ReconError::ColumnNotFound { .. }
        | ReconError::FileFormat { .. }
        | ReconError::Io { .. } => EXIT_ERROR,
    }
}

/// Map a settings error to its exit code.
pub fn config_exit_code(err: &ConfigError) -> u8 {
    match err {
        ConfigError::InvalidDate(_) => EXIT_USAGE,
        ConfigError::Read { .. } | ConfigError::Parse { .. } | ConfigError::Invalid(_) => EXIT_CONFIG,
    }
}

/// Machine-readable error printed on stderr in `--json` mode.
#[derive(Debug, serde::Serialize)]
pub struct ErrorOutput<'a> {
    pub error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'a str>,
    pub exit_code: u8,
}

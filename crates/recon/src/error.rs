use std::path::PathBuf;

use thiserror::Error;

use crate::model::{ReconKind, Source};

#[derive(Debug, Error)]
pub enum ReconError {
    /// No file resolved for a source in either the dated or the root folder.
    #[error("{origin} {kind}: no matching file (searched {})", display_paths(.searched))]
    SourceNotFound {
        origin: Source,
        kind: ReconKind,
        searched: Vec<PathBuf>,
    },

    /// The catalog has no spec for this (source, kind) pair.
    #[error("{origin} {kind}: no source spec configured")]
    MissingSpec { origin: Source, kind: ReconKind },

    /// None of the wanted sheet names exist in the workbook.
    #[error("{}: sheet {} not found (available: {})", .path.display(), .wanted.join(" / "), .available.join(", "))]
    SheetNotFound {
        path: PathBuf,
        wanted: Vec<String>,
        available: Vec<String>,
    },

    /// Header lookup failed, or the column mapping is not defined yet.
    #[error("{}: column {wanted} not found in sheet '{sheet}'", .path.display())]
    ColumnNotFound {
        path: PathBuf,
        sheet: String,
        wanted: String,
    },

    /// Unsupported extension or a file the spreadsheet decoder rejected.
    #[error("{}: {message}", .path.display())]
    FileFormat { path: PathBuf, message: String },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Catalog TOML parse / deserialization error.
    #[error("catalog parse error: {0}")]
    CatalogParse(String),

    /// Catalog validation error (duplicate pair, bad row indexes, ...).
    #[error("catalog validation error: {0}")]
    CatalogValidation(String),

    /// Writing the output workbook failed.
    #[error("cannot write {}: {message}", .path.display())]
    Output { path: PathBuf, message: String },

    /// Reading or writing the input fingerprint record failed.
    #[error("fingerprint record {}: {message}", .path.display())]
    Fingerprint { path: PathBuf, message: String },
}

impl ReconError {
    /// True when the source simply has nothing to read, as opposed to a file
    /// that exists but could not be used.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::SourceNotFound { .. } | Self::MissingSpec { .. })
    }

    /// Path of the file involved, when the error is tied to one.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::SheetNotFound { path, .. }
            | Self::ColumnNotFound { path, .. }
            | Self::FileFormat { path, .. }
            | Self::Io { path, .. }
            | Self::Output { path, .. }
            | Self::Fingerprint { path, .. } => Some(path),
            _ => None,
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "nothing".into();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, ReconError>;

//! `sourcematrix-recon`: three-source identifier presence reconciliation.
//!
//! Pure engine crate: the source catalog, identifier normalization and the
//! presence matrix builder. Reading spreadsheets is delegated to a
//! [`SourceReader`] implementation supplied by the caller.

pub mod catalog;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod model;
pub mod normalize;

pub use catalog::{SourceCatalog, SourceSpec};
pub use engine::{build_table, reconcile, reconcile_all, RunContext, SourceRead, SourceReader};
pub use error::{ReconError, Result};
pub use model::{Identifier, RawValue, ReconKind, ReconRow, ReconTable, Source, SourceResult, SourceStatus};

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::catalog::{SourceCatalog, SourceSpec};
use crate::error::{ReconError, Result};
use crate::model::{
    Identifier, ReconKind, ReconRow, ReconTable, Source, SourceOutcome, SourceResult, SourceStatus,
    PRESENT_EVERYWHERE,
};

/// Parameters shared by every source read in one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    /// DDMM token naming the dated snapshot folder.
    pub date: String,
    /// Market used by market-scoped file rules (e.g. "Ekofisk").
    pub market: Option<String>,
}

impl RunContext {
    pub fn new(date: impl Into<String>, market: Option<String>) -> Self {
        Self {
            date: date.into().trim().to_string(),
            market,
        }
    }
}

/// Identifiers read from one resolved file.
#[derive(Debug, Clone)]
pub struct SourceRead {
    pub path: PathBuf,
    pub identifiers: BTreeSet<Identifier>,
}

/// Locates and reads one source according to its spec.
///
/// The engine only sees this seam; the workbook-backed implementation lives
/// in the IO crate.
pub trait SourceReader {
    fn read(&self, spec: &SourceSpec, ctx: &RunContext) -> Result<SourceRead>;
}

/// Run one reconciliation type across CT, JEEVES and STIBO.
///
/// Source failures never abort: an unavailable source contributes an empty
/// set and its status is kept on the table.
pub fn reconcile(
    kind: ReconKind,
    ctx: &RunContext,
    catalog: &SourceCatalog,
    reader: &dyn SourceReader,
) -> ReconTable {
    let results = Source::ALL.map(|source| read_source(source, kind, ctx, catalog, reader));

    let table = build_table(kind, results);

    if table.sources.iter().all(|o| !o.status.is_loaded()) {
        log::error!(
            "{kind}: no source could be read for date {} (wrong date folder?)",
            ctx.date
        );
    } else if table.rows.is_empty() {
        log::warn!("{kind}: sources loaded but no identifiers found");
    }

    table
}

/// Run several reconciliation types. Each one is independent of the others.
pub fn reconcile_all(
    kinds: &[ReconKind],
    ctx: &RunContext,
    catalog: &SourceCatalog,
    reader: &dyn SourceReader,
) -> Vec<ReconTable> {
    kinds
        .iter()
        .map(|kind| reconcile(*kind, ctx, catalog, reader))
        .collect()
}

fn read_source(
    source: Source,
    kind: ReconKind,
    ctx: &RunContext,
    catalog: &SourceCatalog,
    reader: &dyn SourceReader,
) -> SourceResult {
    let outcome = catalog
        .get(source, kind)
        .ok_or(ReconError::MissingSpec { origin: source, kind })
        .and_then(|spec| reader.read(spec, ctx));

    match outcome {
        Ok(read) => {
            log::info!(
                "{source} {kind}: {} identifiers from {}",
                read.identifiers.len(),
                read.path.display()
            );
            SourceResult::loaded(source, read.path, read.identifiers)
        }
        Err(err) => {
            log::warn!("{err}; treating {source} {kind} as empty");
            SourceResult::unavailable(source, status_for_error(&err))
        }
    }
}

fn status_for_error(err: &ReconError) -> SourceStatus {
    if err.is_missing() {
        SourceStatus::Missing { reason: err.to_string() }
    } else {
        SourceStatus::Failed {
            path: err.path().cloned(),
            reason: err.to_string(),
        }
    }
}

/// Build the presence matrix from the three per-source results.
///
/// Rows are the union of all identifiers in ascending order, one row each.
pub fn build_table(kind: ReconKind, results: [SourceResult; 3]) -> ReconTable {
    let mut by_source: [Option<SourceResult>; 3] = [None, None, None];
    for result in results {
        let idx = result.source.index();
        by_source[idx] = Some(result);
    }

    let empty = BTreeSet::new();
    let sets: [&BTreeSet<Identifier>; 3] =
        [0usize, 1, 2].map(|i| by_source[i].as_ref().map(|r| &r.identifiers).unwrap_or(&empty));

    let universe: BTreeSet<&Identifier> = sets.iter().flat_map(|s| s.iter()).collect();

    let rows = universe
        .into_iter()
        .map(|id| {
            let present = [0usize, 1, 2].map(|i| sets[i].contains(id));
            ReconRow {
                identifier: id.clone(),
                present,
                absent_from: absent_from_label(present),
            }
        })
        .collect();

    let sources = Source::ALL
        .iter()
        .map(|source| match &by_source[source.index()] {
            Some(r) => SourceOutcome {
                source: *source,
                status: r.status.clone(),
                identifiers: r.identifiers.len(),
            },
            None => SourceOutcome {
                source: *source,
                status: SourceStatus::Missing { reason: "not read".into() },
                identifiers: 0,
            },
        })
        .collect();

    ReconTable { kind, rows, sources }
}

/// "-" when present everywhere, else the absent sources in CT, JEEVES, STIBO
/// order joined by ", ".
pub fn absent_from_label(present: [bool; 3]) -> String {
    let absent: Vec<&str> = Source::ALL
        .iter()
        .filter(|s| !present[s.index()])
        .map(|s| s.name())
        .collect();
    if absent.is_empty() {
        PRESENT_EVERYWHERE.to_string()
    } else {
        absent.join(", ")
    }
}

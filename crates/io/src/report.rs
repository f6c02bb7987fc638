// Report publishing: fingerprint inputs, pick the output name, write the
// workbook, then refresh the fingerprint record.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use sourcematrix_recon::{ReconTable, Result, SourceStatus};

use crate::fingerprint::{self, FingerprintRecord, OutputDecision};
use crate::writer::{report_dir, write_report};

#[derive(Debug, Clone)]
pub struct Published {
    pub decision: OutputDecision,
    pub record: PathBuf,
    /// Number of distinct input files fingerprinted.
    pub inputs: usize,
}

impl Published {
    pub fn path(&self) -> &Path {
        self.decision.path()
    }
}

/// Input files that loaded for any table, in first-seen order.
pub fn loaded_inputs(tables: &[ReconTable]) -> Vec<&Path> {
    let mut paths: Vec<&Path> = Vec::new();
    for outcome in tables.iter().flat_map(|t| &t.sources) {
        if let SourceStatus::Loaded { path } = &outcome.status {
            if !paths.contains(&path.as_path()) {
                paths.push(path.as_path());
            }
        }
    }
    paths
}

/// Write the market's report under `{output_dir}/{date}/`.
pub fn publish(
    output_dir: &Path,
    date: &str,
    market: &str,
    tables: &[ReconTable],
    now: NaiveDateTime,
) -> Result<Published> {
    let dir = report_dir(output_dir, date);
    let record_path = fingerprint::record_path(&dir, market);

    let inputs = fingerprint::hash_inputs(loaded_inputs(tables))?;
    let previous = fingerprint::load_record(&record_path);
    let decision = fingerprint::decide_output(&dir, market, previous.as_ref(), &inputs, now);

    match &decision {
        OutputDecision::Fresh(_) => log::debug!("{market}: first report for {date}"),
        OutputDecision::Overwrite(p) => log::info!("{market}: inputs unchanged, overwriting {}", p.display()),
        OutputDecision::Timestamped(p) => log::info!("{market}: inputs changed, writing {}", p.display()),
    }

    write_report(decision.path(), tables)?;

    let record = FingerprintRecord {
        output_file: decision.path().display().to_string(),
        inputs,
    };
    fingerprint::save_record(&record_path, &record)?;

    Ok(Published {
        inputs: record.inputs.len(),
        decision,
        record: record_path,
    })
}

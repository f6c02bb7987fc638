// Input fingerprints and output naming
//
// A small JSON record next to the reports remembers which inputs produced
// the last workbook for a market. Same inputs: the workbook is rewritten in
// place. Different inputs: a timestamped workbook is written alongside so
// earlier results are kept.

use std::collections::BTreeMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sourcematrix_recon::{ReconError, Result};

use crate::writer::report_file_name;

/// Input path -> SHA-256 hex digest.
pub type InputHashes = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintRecord {
    pub inputs: InputHashes,
    pub output_file: String,
}

/// Where the next report goes and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputDecision {
    /// No record for this market yet.
    Fresh(PathBuf),
    /// Inputs unchanged since the recorded report, which still exists.
    Overwrite(PathBuf),
    /// Inputs changed (or the recorded report is gone).
    Timestamped(PathBuf),
}

impl OutputDecision {
    pub fn path(&self) -> &Path {
        match self {
            Self::Fresh(p) | Self::Overwrite(p) | Self::Timestamped(p) => p,
        }
    }
}

/// `{report_dir}/.reconciliation_{market}.json`, market lowercased.
pub fn record_path(report_dir: &Path, market: &str) -> PathBuf {
    report_dir.join(format!(".reconciliation_{}.json", market.to_lowercase()))
}

/// SHA-256 of a file's bytes, lowercase hex.
pub fn hash_file(path: &Path) -> Result<String> {
    let io_err = |source: io::Error| ReconError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::open(path).map_err(io_err)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(io_err)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Hash every path once. Keys are the paths as displayed.
pub fn hash_inputs<'a>(paths: impl IntoIterator<Item = &'a Path>) -> Result<InputHashes> {
    let mut hashes = InputHashes::new();
    for path in paths {
        let key = path.display().to_string();
        if !hashes.contains_key(&key) {
            hashes.insert(key, hash_file(path)?);
        }
    }
    Ok(hashes)
}

/// Load the previous record. A missing file is `None`; an unreadable or
/// malformed one is logged and also treated as `None`.
pub fn load_record(path: &Path) -> Option<FingerprintRecord> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
        Err(e) => {
            log::warn!("cannot read fingerprint record {}: {e}", path.display());
            return None;
        }
    };
    match serde_json::from_str(&text) {
        Ok(record) => Some(record),
        Err(e) => {
            log::warn!("ignoring malformed fingerprint record {}: {e}", path.display());
            None
        }
    }
}

pub fn save_record(path: &Path, record: &FingerprintRecord) -> Result<()> {
    let fp_err = |message: String| ReconError::Fingerprint {
        path: path.to_path_buf(),
        message,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| fp_err(e.to_string()))?;
    }
    let json = serde_json::to_string_pretty(record).map_err(|e| fp_err(e.to_string()))?;
    std::fs::write(path, json).map_err(|e| fp_err(e.to_string()))
}

/// Pick the report path for this run.
pub fn decide_output(
    report_dir: &Path,
    market: &str,
    previous: Option<&FingerprintRecord>,
    current: &InputHashes,
    now: NaiveDateTime,
) -> OutputDecision {
    let Some(previous) = previous else {
        return OutputDecision::Fresh(report_dir.join(report_file_name(market, None)));
    };

    let recorded = PathBuf::from(&previous.output_file);
    if previous.inputs == *current && recorded.is_file() {
        return OutputDecision::Overwrite(recorded);
    }

    let stamp = now.format("%Y%m%d_%H%M%S").to_string();
    OutputDecision::Timestamped(report_dir.join(report_file_name(market, Some(&stamp))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 2, 23)
            .unwrap()
            .and_hms_opt(10, 15, 0)
            .unwrap()
    }

    fn hashes(pairs: &[(&str, &str)]) -> InputHashes {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn hash_is_sha256_hex() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.xlsx");
        std::fs::write(&path, b"").unwrap();
        assert_eq!(
            hash_file(&path).unwrap(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn hash_inputs_deduplicates_paths() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.xlsx");
        let b = dir.path().join("b.xlsx");
        std::fs::write(&a, b"one").unwrap();
        std::fs::write(&b, b"two").unwrap();

        let map = hash_inputs([a.as_path(), b.as_path(), a.as_path()]).unwrap();
        assert_eq!(map.len(), 2);
        assert_ne!(map[&a.display().to_string()], map[&b.display().to_string()]);
    }

    #[test]
    fn missing_input_is_an_io_error() {
        let dir = tempdir().unwrap();
        assert!(matches!(hash_file(&dir.path().join("gone.xlsx")), Err(ReconError::Io { .. })));
    }

    #[test]
    fn first_run_uses_plain_name() {
        let dir = tempdir().unwrap();
        let decision = decide_output(dir.path(), "Ekofisk", None, &hashes(&[("a", "1")]), now());
        assert_eq!(decision, OutputDecision::Fresh(dir.path().join("Reconciliation_Ekofisk.xlsx")));
    }

    #[test]
    fn unchanged_inputs_overwrite_recorded_report() {
        let dir = tempdir().unwrap();
        let report = dir.path().join("Reconciliation_Fresh_20260101_000000.xlsx");
        std::fs::write(&report, b"x").unwrap();
        let previous = FingerprintRecord {
            inputs: hashes(&[("a", "1"), ("b", "2")]),
            output_file: report.display().to_string(),
        };

        let decision = decide_output(dir.path(), "Fresh", Some(&previous), &hashes(&[("b", "2"), ("a", "1")]), now());
        assert_eq!(decision, OutputDecision::Overwrite(report));
    }

    #[test]
    fn changed_inputs_get_a_timestamp() {
        let dir = tempdir().unwrap();
        let report = dir.path().join("Reconciliation_Fresh.xlsx");
        std::fs::write(&report, b"x").unwrap();
        let previous = FingerprintRecord {
            inputs: hashes(&[("a", "1")]),
            output_file: report.display().to_string(),
        };

        let decision = decide_output(dir.path(), "Fresh", Some(&previous), &hashes(&[("a", "9")]), now());
        assert_eq!(
            decision,
            OutputDecision::Timestamped(dir.path().join("Reconciliation_Fresh_20260223_101500.xlsx"))
        );
    }

    #[test]
    fn deleted_report_gets_a_timestamp() {
        let dir = tempdir().unwrap();
        let previous = FingerprintRecord {
            inputs: hashes(&[("a", "1")]),
            output_file: dir.path().join("Reconciliation_Classic.xlsx").display().to_string(),
        };

        let decision = decide_output(dir.path(), "Classic", Some(&previous), &hashes(&[("a", "1")]), now());
        assert!(matches!(decision, OutputDecision::Timestamped(_)));
    }

    #[test]
    fn record_round_trip_and_malformed_record() {
        let dir = tempdir().unwrap();
        let path = record_path(&dir.path().join("2302"), "Ekofisk");
        assert!(path.ends_with("2302/.reconciliation_ekofisk.json"));
        assert_eq!(load_record(&path), None);

        let record = FingerprintRecord {
            inputs: hashes(&[("CT/2302/Product.xlsx", "abc")]),
            output_file: "out/2302/Reconciliation_Ekofisk.xlsx".into(),
        };
        save_record(&path, &record).unwrap();
        assert_eq!(load_record(&path), Some(record));

        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(load_record(&path), None);
    }
}

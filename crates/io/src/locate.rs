// Source file discovery
//
// Layout on disk: {root}/{SOURCE}/{date}/ holds the dated snapshot and
// {root}/{SOURCE}/ holds consolidated extracts. The dated folder is always
// searched first; every file rule is tried in order inside a folder before
// moving on to the next folder.

use std::path::{Path, PathBuf};

use sourcematrix_recon::catalog::{FileRule, SourceSpec};
use sourcematrix_recon::{ReconError, Result};

/// Extensions the extractor can open.
pub const SPREADSHEET_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Office lock files left next to an open workbook.
const LOCK_FILE_PREFIX: &str = "~$";

/// Resolve the input file for one source.
///
/// Returns `SourceNotFound` (listing the folders searched) when neither the
/// dated folder nor the source root has a match.
pub fn resolve(root: &Path, spec: &SourceSpec, date: &str, market: Option<&str>) -> Result<PathBuf> {
    let base = root.join(spec.source.dir_name());
    let mut candidates = Vec::with_capacity(2);
    if !date.is_empty() {
        candidates.push(base.join(date));
    }
    candidates.push(base);

    for dir in &candidates {
        if !dir.is_dir() {
            log::debug!("{} {}: {} does not exist", spec.source, spec.kind, dir.display());
            continue;
        }
        if let Some(path) = find_in_dir(dir, &spec.files, date, market)? {
            log::debug!("{} {}: resolved {}", spec.source, spec.kind, path.display());
            return Ok(path);
        }
    }

    Err(ReconError::SourceNotFound {
        origin: spec.source,
        kind: spec.kind,
        searched: candidates,
    })
}

/// Try each rule against one folder. `None` when no rule matches.
pub fn find_in_dir(dir: &Path, rules: &[FileRule], date: &str, market: Option<&str>) -> Result<Option<PathBuf>> {
    // Listed at most once, and only if a substring rule needs it.
    let mut listing: Option<Vec<String>> = None;

    for rule in rules {
        match rule {
            FileRule::Template { .. } | FileRule::Fixed { .. } => {
                if let Some(name) = rule.exact_name(date) {
                    let path = dir.join(name);
                    if path.is_file() {
                        return Ok(Some(path));
                    }
                }
            }
            FileRule::Contains { needle, market_scoped } => {
                if listing.is_none() {
                    listing = Some(list_spreadsheets(dir)?);
                }
                let files = listing.as_deref().unwrap_or_default();
                let scope = if *market_scoped { market } else { None };
                let matches = contains_matches(files, needle, scope);
                if let Some(first) = matches.first() {
                    if matches.len() > 1 {
                        log::warn!(
                            "ambiguous match for '{rule}' in {}: {} (using {first})",
                            dir.display(),
                            matches.join(", ")
                        );
                    }
                    return Ok(Some(dir.join(first)));
                }
            }
        }
    }

    Ok(None)
}

/// Spreadsheet file names in `dir`, sorted by name. Lock files and other
/// extensions are skipped.
pub fn list_spreadsheets(dir: &Path) -> Result<Vec<String>> {
    let entries = std::fs::read_dir(dir).map_err(|source| ReconError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ReconError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with(LOCK_FILE_PREFIX) || !is_spreadsheet(&path) {
            continue;
        }
        names.push(name.to_string());
    }

    names.sort();
    Ok(names)
}

/// True for file extensions in [`SPREADSHEET_EXTENSIONS`], any case.
pub fn is_spreadsheet(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            SPREADSHEET_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

fn contains_matches<'a>(files: &'a [String], needle: &str, market: Option<&str>) -> Vec<&'a str> {
    let needle = needle.to_lowercase();
    let market = market.map(str::to_lowercase);
    files
        .iter()
        .filter(|name| {
            let lower = name.to_lowercase();
            lower.contains(&needle) && market.as_deref().map_or(true, |m| lower.contains(m))
        })
        .map(String::as_str)
        .collect()
}

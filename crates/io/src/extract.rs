// Identifier column extraction from spreadsheet files
//
// Opens the workbook read-only through calamine's format auto-detection,
// resolves the sheet and column named by a SourceSpec, and returns the
// normalized identifier set. The workbook handle lives only for the call.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader, SheetType, SheetVisible, Sheets};
use sourcematrix_recon::catalog::{ColumnRef, ColumnSelector, ReadUntil, SheetSelector, SourceSpec};
use sourcematrix_recon::normalize::normalize;
use sourcematrix_recon::{Identifier, RawValue, ReconError, Result};

use crate::locate::{is_spreadsheet, SPREADSHEET_EXTENSIONS};

/// Read the identifier set described by `spec` from `path`.
pub fn extract(path: &Path, spec: &SourceSpec) -> Result<BTreeSet<Identifier>> {
    if !is_spreadsheet(path) {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        return Err(ReconError::FileFormat {
            path: path.to_path_buf(),
            message: format!(
                "unsupported file type '.{ext}' (expected one of {})",
                SPREADSHEET_EXTENSIONS.join(", ")
            ),
        });
    }

    std::fs::metadata(path).map_err(|source| ReconError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut workbook = open_workbook_auto(path).map_err(|e| open_error(path, e))?;

    let sheet = select_sheet(path, &workbook.sheet_names(), &visible_sheets(&workbook), &spec.sheet)?;
    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| ReconError::FileFormat {
            path: path.to_path_buf(),
            message: format!("cannot read sheet '{sheet}': {e}"),
        })?;

    let column = resolve_column(path, &sheet, &range, spec)?;
    let identifiers = read_column(&range, spec, column);

    log::debug!(
        "{}: sheet '{sheet}' column {} -> {} identifiers",
        path.display(),
        column.letters(),
        identifiers.len()
    );
    Ok(identifiers)
}

fn open_error(path: &Path, err: calamine::Error) -> ReconError {
    match err {
        calamine::Error::Io(source) => ReconError::Io {
            path: path.to_path_buf(),
            source,
        },
        other => ReconError::FileFormat {
            path: path.to_path_buf(),
            message: format!("cannot open workbook: {other}"),
        },
    }
}

fn visible_sheets(workbook: &Sheets<BufReader<File>>) -> Vec<String> {
    workbook
        .sheets_metadata()
        .iter()
        .filter(|s| matches!(s.visible, SheetVisible::Visible) && matches!(s.typ, SheetType::WorkSheet))
        .map(|s| s.name.clone())
        .collect()
}

/// Pick the sheet to read. `visible` is used for the active-sheet default.
pub(crate) fn select_sheet(
    path: &Path,
    names: &[String],
    visible: &[String],
    selector: &SheetSelector,
) -> Result<String> {
    let active = || {
        visible
            .first()
            .or_else(|| names.first())
            .cloned()
            .ok_or_else(|| ReconError::FileFormat {
                path: path.to_path_buf(),
                message: "workbook contains no sheets".into(),
            })
    };

    match selector {
        SheetSelector::Active => active(),
        SheetSelector::Named(wanted) => wanted
            .iter()
            .find(|w| names.contains(w))
            .cloned()
            .ok_or_else(|| ReconError::SheetNotFound {
                path: path.to_path_buf(),
                wanted: wanted.clone(),
                available: names.to_vec(),
            }),
        SheetSelector::Prefer(needles) => {
            // Visible sheets win over hidden ones holding stale copies.
            for candidates in [visible, names] {
                for needle in needles {
                    let needle = needle.to_lowercase();
                    if let Some(name) = candidates.iter().find(|n| n.to_lowercase().contains(&needle)) {
                        return Ok(name.clone());
                    }
                }
            }
            active()
        }
    }
}

fn resolve_column(path: &Path, sheet: &str, range: &Range<Data>, spec: &SourceSpec) -> Result<ColumnRef> {
    let not_found = |wanted: String| ReconError::ColumnNotFound {
        path: path.to_path_buf(),
        sheet: sheet.to_string(),
        wanted,
    };

    match &spec.column {
        ColumnSelector::Index(col) => Ok(*col),
        ColumnSelector::Undefined => Err(not_found("(no column mapping defined)".into())),
        ColumnSelector::Header { labels, fallback } => {
            let headers = header_cells(range, spec.header_row);
            if let Some(col) = match_header(&headers, labels) {
                return Ok(col);
            }
            match fallback {
                Some(col) => {
                    log::warn!(
                        "{}: header {} not found in sheet '{sheet}', using column {}",
                        path.display(),
                        quoted(labels),
                        col.letters()
                    );
                    Ok(*col)
                }
                None => Err(not_found(format!("header {}", quoted(labels)))),
            }
        }
    }
}

fn quoted(labels: &[String]) -> String {
    labels.iter().map(|l| format!("'{l}'")).collect::<Vec<_>>().join(" / ")
}

/// (column, text) for every non-blank cell on the 1-based header row.
fn header_cells(range: &Range<Data>, header_row: u32) -> Vec<(ColumnRef, String)> {
    let (Some((_, first_col)), Some((_, last_col))) = (range.start(), range.end()) else {
        return Vec::new();
    };
    let row = header_row.saturating_sub(1);
    (first_col..=last_col)
        .filter_map(|col| {
            let text = range.get_value((row, col))?.to_string();
            let text = text.trim();
            (!text.is_empty()).then(|| (ColumnRef(col + 1), text.to_string()))
        })
        .collect()
}

/// Exact label match first, then case-insensitive with whitespace removed.
pub(crate) fn match_header(headers: &[(ColumnRef, String)], labels: &[String]) -> Option<ColumnRef> {
    for label in labels {
        if let Some((col, _)) = headers.iter().find(|(_, h)| h == label) {
            return Some(*col);
        }
    }
    for label in labels {
        let wanted = loose(label);
        if let Some((col, _)) = headers.iter().find(|(_, h)| loose(h) == wanted) {
            return Some(*col);
        }
    }
    None
}

fn loose(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn read_column(range: &Range<Data>, spec: &SourceSpec, column: ColumnRef) -> BTreeSet<Identifier> {
    let mut identifiers = BTreeSet::new();
    let Some((last_row, _)) = range.end() else {
        return identifiers;
    };
    let col = column.zero_based();

    for row in spec.data_start_row.saturating_sub(1)..=last_row {
        let raw = range.get_value((row, col)).map(raw_value).unwrap_or(RawValue::Empty);
        match normalize(&raw, spec.format) {
            Some(id) => {
                identifiers.insert(id);
            }
            None if spec.read_until == ReadUntil::FirstBlank => break,
            None => {}
        }
    }
    identifiers
}

/// Map a calamine cell to the engine's raw value. Error cells count as blank.
pub(crate) fn raw_value(cell: &Data) -> RawValue {
    match cell {
        Data::Empty | Data::Error(_) => RawValue::Empty,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => RawValue::Text(s.clone()),
        Data::Float(n) => RawValue::Float(*n),
        Data::Int(n) => RawValue::Int(*n),
        Data::Bool(b) => RawValue::Bool(*b),
        Data::DateTime(dt) => RawValue::Float(dt.as_f64()),
    }
}

// Reconciliation report export (xlsx only)
//
// One tab per reconciliation type in run order, then a "Sources" tab that
// records which file (or which failure) stands behind every column.

use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use sourcematrix_recon::model::{SourceStatus, PRESENCE_MARK};
use sourcematrix_recon::{ReconError, ReconTable, Result, Source};

pub const SOURCES_SHEET: &str = "Sources";

const CODE_HEADER: &str = "Code";
const ABSENT_HEADER: &str = "Absent_from";
const SOURCES_HEADERS: [&str; 5] = ["Type", "Source", "Status", "Identifiers", "Detail"];

/// `{output_dir}/{date}`
pub fn report_dir(output_dir: &Path, date: &str) -> PathBuf {
    output_dir.join(date)
}

/// `Reconciliation_{Market}.xlsx`, or `Reconciliation_{Market}_{stamp}.xlsx`.
pub fn report_file_name(market: &str, stamp: Option<&str>) -> String {
    match stamp {
        Some(stamp) => format!("Reconciliation_{market}_{stamp}.xlsx"),
        None => format!("Reconciliation_{market}.xlsx"),
    }
}

/// Write the report workbook, creating parent folders as needed.
pub fn write_report(path: &Path, tables: &[ReconTable]) -> Result<()> {
    let output_err = |message: String| ReconError::Output {
        path: path.to_path_buf(),
        message,
    };
    let xlsx_err = |e: XlsxError| output_err(e.to_string());

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| output_err(e.to_string()))?;
    }

    let formats = ReportFormats::new();
    let mut workbook = Workbook::new();

    for table in tables {
        let worksheet = workbook.add_worksheet();
        write_table(worksheet, table, &formats).map_err(xlsx_err)?;
    }

    let worksheet = workbook.add_worksheet();
    write_sources(worksheet, tables, &formats).map_err(xlsx_err)?;

    workbook.save(path).map_err(xlsx_err)?;
    log::info!("wrote {} ({} tabs)", path.display(), tables.len() + 1);
    Ok(())
}

struct ReportFormats {
    header: Format,
    code: Format,
}

impl ReportFormats {
    fn new() -> Self {
        Self {
            header: Format::new().set_bold(),
            // Text number format keeps leading zeros on OS codes.
            code: Format::new().set_num_format("@"),
        }
    }
}

fn write_table(worksheet: &mut Worksheet, table: &ReconTable, formats: &ReportFormats) -> std::result::Result<(), XlsxError> {
    worksheet.set_name(table.kind.title())?;

    worksheet.write_string_with_format(0, 0, CODE_HEADER, &formats.header)?;
    for source in Source::ALL {
        worksheet.write_string_with_format(0, presence_col(source), source.name(), &formats.header)?;
    }
    worksheet.write_string_with_format(0, 4, ABSENT_HEADER, &formats.header)?;

    for (i, row) in table.rows.iter().enumerate() {
        let r = i as u32 + 1;
        worksheet.write_string_with_format(r, 0, row.identifier.as_str(), &formats.code)?;
        for source in Source::ALL {
            if row.is_present(source) {
                worksheet.write_string(r, presence_col(source), PRESENCE_MARK)?;
            }
        }
        worksheet.write_string(r, 4, &row.absent_from)?;
    }

    worksheet.set_column_width(0, 18)?;
    for source in Source::ALL {
        worksheet.set_column_width(presence_col(source), 9)?;
    }
    worksheet.set_column_width(4, 22)?;
    worksheet.set_freeze_panes(1, 0)?;
    worksheet.autofilter(0, 0, table.rows.len() as u32, 4)?;
    Ok(())
}

fn presence_col(source: Source) -> u16 {
    source.index() as u16 + 1
}

fn write_sources(worksheet: &mut Worksheet, tables: &[ReconTable], formats: &ReportFormats) -> std::result::Result<(), XlsxError> {
    worksheet.set_name(SOURCES_SHEET)?;
    for (col, header) in SOURCES_HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &formats.header)?;
    }

    let mut r = 1u32;
    for table in tables {
        for outcome in &table.sources {
            let detail = match &outcome.status {
                SourceStatus::Loaded { path } => path.display().to_string(),
                SourceStatus::Missing { reason } | SourceStatus::Failed { reason, .. } => reason.clone(),
            };
            worksheet.write_string(r, 0, table.kind.title())?;
            worksheet.write_string(r, 1, outcome.source.name())?;
            worksheet.write_string(r, 2, outcome.status.label())?;
            worksheet.write_number(r, 3, outcome.identifiers as f64)?;
            worksheet.write_string(r, 4, detail)?;
            r += 1;
        }
    }

    worksheet.set_column_width(0, 18)?;
    worksheet.set_column_width(4, 80)?;
    worksheet.set_freeze_panes(1, 0)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook_auto, Data, Reader};
    use sourcematrix_recon::engine::build_table;
    use sourcematrix_recon::normalize::identifier;
    use sourcematrix_recon::{ReconKind, SourceResult};
    use std::collections::BTreeSet;
    use tempfile::tempdir;

    fn loaded(source: Source, ids: &[&str]) -> SourceResult {
        let set: BTreeSet<_> = ids.iter().filter_map(|s| identifier(s)).collect();
        SourceResult::loaded(source, PathBuf::from(format!("{}/input.xlsx", source.dir_name())), set)
    }

    fn cell(range: &calamine::Range<Data>, row: u32, col: u32) -> String {
        range.get_value((row, col)).map(|d| d.to_string()).unwrap_or_default()
    }

    #[test]
    fn file_names() {
        assert_eq!(report_file_name("Ekofisk", None), "Reconciliation_Ekofisk.xlsx");
        assert_eq!(
            report_file_name("Fresh", Some("20260223_101500")),
            "Reconciliation_Fresh_20260223_101500.xlsx"
        );
        assert_eq!(report_dir(Path::new("out"), "2302"), PathBuf::from("out/2302"));
    }

    #[test]
    fn report_has_one_tab_per_kind_and_sources_tab() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("2302").join("Reconciliation_Ekofisk.xlsx");

        let product = build_table(
            ReconKind::Product,
            [
                loaded(Source::Ct, &["205167", "215455"]),
                loaded(Source::Jeeves, &["205167", "5021339"]),
                loaded(Source::Stibo, &["205167", "215455"]),
            ],
        );
        let vendor_os = build_table(
            ReconKind::VendorOs,
            [
                loaded(Source::Ct, &["0005"]),
                loaded(Source::Jeeves, &["0005"]),
                SourceResult::unavailable(Source::Stibo, SourceStatus::Missing { reason: "no file".into() }),
            ],
        );

        write_report(&path, &[product, vendor_os]).unwrap();

        let mut workbook = open_workbook_auto(&path).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["Product", "Vendor OS", "Sources"]);

        let range = workbook.worksheet_range("Product").unwrap();
        let header: Vec<String> = (0..5).map(|c| cell(&range, 0, c)).collect();
        assert_eq!(header, ["Code", "CT", "JEEVES", "STIBO", "Absent_from"]);
        let second: Vec<String> = (0..5).map(|c| cell(&range, 2, c)).collect();
        assert_eq!(second, ["215455", "X", "", "X", "JEEVES"]);
        assert_eq!(cell(&range, 3, 4), "CT, STIBO");

        let range = workbook.worksheet_range("Vendor OS").unwrap();
        assert_eq!(range.get_value((1, 0)), Some(&Data::String("0005".into())));
        assert_eq!(cell(&range, 1, 4), "STIBO");

        let range = workbook.worksheet_range(SOURCES_SHEET).unwrap();
        assert_eq!(cell(&range, 0, 0), "Type");
        assert_eq!(cell(&range, 6, 0), "Vendor OS");
        assert_eq!(cell(&range, 6, 1), "STIBO");
        assert_eq!(cell(&range, 6, 2), "missing");
        assert_eq!(cell(&range, 6, 4), "no file");
        assert_eq!(cell(&range, 1, 3), "2");
    }

    #[test]
    fn empty_table_still_gets_a_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Reconciliation_Fresh.xlsx");
        let table = build_table(
            ReconKind::CustomerOs,
            [
                loaded(Source::Ct, &[]),
                loaded(Source::Jeeves, &[]),
                loaded(Source::Stibo, &[]),
            ],
        );

        write_report(&path, &[table]).unwrap();

        let mut workbook = open_workbook_auto(&path).unwrap();
        let range = workbook.worksheet_range("Customer OS").unwrap();
        assert_eq!(cell(&range, 0, 0), "Code");
        assert_eq!(range.end().map(|(r, _)| r), Some(0));
    }

    #[test]
    fn unwritable_target_is_an_output_error() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocked");
        std::fs::write(&blocker, b"file, not a folder").unwrap();

        let err = write_report(&blocker.join("report.xlsx"), &[]).unwrap_err();
        assert!(matches!(err, ReconError::Output { .. }));
    }
}

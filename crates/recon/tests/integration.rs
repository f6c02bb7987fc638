use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use sourcematrix_recon::catalog::SourceSpec;
use sourcematrix_recon::engine::{reconcile, reconcile_all, RunContext, SourceRead, SourceReader};
use sourcematrix_recon::model::{Identifier, RawValue, ReconKind, Source, SourceStatus};
use sourcematrix_recon::normalize::normalize;
use sourcematrix_recon::{ReconError, SourceCatalog};

/// In-memory reader: raw cells per (source, kind); pairs without cells fail
/// the way the workbook reader does.
#[derive(Default)]
struct MemoryReader {
    cells: HashMap<(Source, ReconKind), Vec<RawValue>>,
    broken: Vec<(Source, ReconKind)>,
}

impl MemoryReader {
    fn with(mut self, source: Source, kind: ReconKind, cells: Vec<RawValue>) -> Self {
        self.cells.insert((source, kind), cells);
        self
    }

    fn broken(mut self, source: Source, kind: ReconKind) -> Self {
        self.broken.push((source, kind));
        self
    }
}

impl SourceReader for MemoryReader {
    fn read(&self, spec: &SourceSpec, ctx: &RunContext) -> Result<SourceRead, ReconError> {
        let path = PathBuf::from(spec.source.dir_name()).join(&ctx.date).join("input.xlsx");
        if self.broken.contains(&(spec.source, spec.kind)) {
            return Err(ReconError::FileFormat { path, message: "not a zip archive".into() });
        }
        let cells = self.cells.get(&(spec.source, spec.kind)).ok_or_else(|| ReconError::SourceNotFound {
            origin: spec.source,
            kind: spec.kind,
            searched: vec![PathBuf::from(spec.source.dir_name())],
        })?;
        let identifiers: BTreeSet<Identifier> =
            cells.iter().filter_map(|c| normalize(c, spec.format)).collect();
        Ok(SourceRead { path, identifiers })
    }
}

fn num(n: f64) -> RawValue {
    RawValue::Float(n)
}

fn text(s: &str) -> RawValue {
    RawValue::Text(s.into())
}

fn ctx() -> RunContext {
    RunContext::new("2302", Some("Ekofisk".into()))
}

fn scenario_reader() -> MemoryReader {
    MemoryReader::default()
        .with(Source::Ct, ReconKind::Product, vec![num(205167.0), num(215455.0)])
        .with(Source::Jeeves, ReconKind::Product, vec![text("205167"), text("5021339")])
        .with(Source::Stibo, ReconKind::Product, vec![text(" 205167 "), num(215455.0), RawValue::Empty])
}

// -------------------------------------------------------------------------
// Presence matrix
// -------------------------------------------------------------------------

#[test]
fn product_scenario() {
    let table = reconcile(ReconKind::Product, &ctx(), &SourceCatalog::builtin(), &scenario_reader());

    let rows: Vec<(&str, [bool; 3], &str)> = table
        .rows
        .iter()
        .map(|r| (r.identifier.as_str(), r.present, r.absent_from.as_str()))
        .collect();

    assert_eq!(
        rows,
        vec![
            ("205167", [true, true, true], "-"),
            ("215455", [true, false, true], "JEEVES"),
            ("5021339", [false, true, false], "CT, STIBO"),
        ]
    );
    assert!(!table.is_degraded());
}

#[test]
fn every_identifier_appears_exactly_once() {
    let reader = MemoryReader::default()
        .with(Source::Ct, ReconKind::VendorInvoice, vec![text("V1"), text("V2"), text("V2"), text("V3")])
        .with(Source::Jeeves, ReconKind::VendorInvoice, vec![text("V3"), text("V4"), text(" V4")])
        .with(Source::Stibo, ReconKind::VendorInvoice, vec![text("V1"), text("V5")]);

    let table = reconcile(ReconKind::VendorInvoice, &ctx(), &SourceCatalog::builtin(), &reader);

    let ids: Vec<&str> = table.rows.iter().map(|r| r.identifier.as_str()).collect();
    let unique: BTreeSet<&str> = ids.iter().copied().collect();
    assert_eq!(ids.len(), unique.len());
    assert_eq!(ids, ["V1", "V2", "V3", "V4", "V5"]);
}

#[test]
fn presence_flags_follow_membership() {
    let reader = MemoryReader::default()
        .with(Source::Ct, ReconKind::CustomerInvoice, vec![text("C1"), text("C2")])
        .with(Source::Jeeves, ReconKind::CustomerInvoice, vec![text("C2"), text("C3")])
        .with(Source::Stibo, ReconKind::CustomerInvoice, vec![text("C3"), text("C1")]);

    let table = reconcile(ReconKind::CustomerInvoice, &ctx(), &SourceCatalog::builtin(), &reader);

    let membership: HashMap<Source, Vec<&str>> = HashMap::from([
        (Source::Ct, vec!["C1", "C2"]),
        (Source::Jeeves, vec!["C2", "C3"]),
        (Source::Stibo, vec!["C3", "C1"]),
    ]);

    for row in &table.rows {
        for source in Source::ALL {
            assert_eq!(
                row.is_present(source),
                membership[&source].contains(&row.identifier.as_str()),
                "{} in {source}",
                row.identifier
            );
        }
        let expected_label = if row.in_all_sources() {
            "-".to_string()
        } else {
            Source::ALL
                .iter()
                .filter(|s| !row.is_present(**s))
                .map(|s| s.name())
                .collect::<Vec<_>>()
                .join(", ")
        };
        assert_eq!(row.absent_from, expected_label);
    }
}

#[test]
fn os_codes_are_zero_padded_across_sources() {
    let reader = MemoryReader::default()
        .with(Source::Ct, ReconKind::CustomerOs, vec![num(5.0), num(1234.0)])
        .with(Source::Jeeves, ReconKind::CustomerOs, vec![text("0005"), text("1234")]);

    let table = reconcile(ReconKind::CustomerOs, &ctx(), &SourceCatalog::builtin(), &reader);

    let ids: Vec<&str> = table.rows.iter().map(|r| r.identifier.as_str()).collect();
    assert_eq!(ids, ["0005", "1234"]);
    assert!(table.rows.iter().all(|r| r.absent_from == "STIBO"));
}

// -------------------------------------------------------------------------
// Degradation
// -------------------------------------------------------------------------

#[test]
fn missing_source_degrades_to_empty() {
    let reader = MemoryReader::default()
        .with(Source::Ct, ReconKind::Product, vec![num(1.0)])
        .with(Source::Jeeves, ReconKind::Product, vec![num(1.0)]);

    let table = reconcile(ReconKind::Product, &ctx(), &SourceCatalog::builtin(), &reader);

    assert_eq!(table.rows.len(), 1);
    assert_eq!(table.rows[0].absent_from, "STIBO");
    assert_eq!(table.unavailable_sources(), vec![Source::Stibo]);
    assert!(matches!(
        table.outcome(Source::Stibo).unwrap().status,
        SourceStatus::Missing { .. }
    ));
}

#[test]
fn unreadable_source_is_failed_not_missing() {
    let reader = scenario_reader().broken(Source::Jeeves, ReconKind::Product);

    let table = reconcile(ReconKind::Product, &ctx(), &SourceCatalog::builtin(), &reader);

    match &table.outcome(Source::Jeeves).unwrap().status {
        SourceStatus::Failed { path, reason } => {
            assert_eq!(path.as_deref(), Some(PathBuf::from("JEEVES/2302/input.xlsx").as_path()));
            assert!(reason.contains("not a zip archive"));
        }
        other => panic!("unexpected status {other:?}"),
    }
    assert_eq!(table.rows.len(), 2);
    assert!(table.rows.iter().all(|r| !r.is_present(Source::Jeeves)));
}

#[test]
fn no_sources_at_all_gives_empty_table() {
    let table = reconcile(ReconKind::VendorOs, &ctx(), &SourceCatalog::builtin(), &MemoryReader::default());
    assert!(table.rows.is_empty());
    assert_eq!(table.sources.len(), 3);
    assert_eq!(table.unavailable_sources().len(), 3);
}

// -------------------------------------------------------------------------
// Determinism + independence
// -------------------------------------------------------------------------

#[test]
fn repeated_runs_are_identical() {
    let reader = scenario_reader();
    let catalog = SourceCatalog::builtin();

    let first = serde_json::to_string(&reconcile(ReconKind::Product, &ctx(), &catalog, &reader)).unwrap();
    let second = serde_json::to_string(&reconcile(ReconKind::Product, &ctx(), &catalog, &reader)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn kinds_are_independent() {
    let reader = scenario_reader()
        .with(Source::Ct, ReconKind::VendorOs, vec![num(7.0)]);

    let tables = reconcile_all(&ReconKind::ALL, &ctx(), &SourceCatalog::builtin(), &reader);

    assert_eq!(tables.len(), 5);
    let kinds: Vec<ReconKind> = tables.iter().map(|t| t.kind).collect();
    assert_eq!(kinds, ReconKind::ALL.to_vec());
    assert_eq!(tables[0].rows.len(), 3);
    assert_eq!(tables[1].rows.len(), 0);
    assert_eq!(tables[2].rows.len(), 1);
    assert_eq!(tables[2].rows[0].identifier.as_str(), "0007");
}

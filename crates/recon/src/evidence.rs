use crate::model::{ReconSummary, ReconTable, Source};

/// Compute summary statistics for one reconciliation table.
pub fn compute_summary(table: &ReconTable) -> ReconSummary {
    let mut in_all_sources = 0;
    let mut absent = [0usize; 3];

    for row in &table.rows {
        if row.in_all_sources() {
            in_all_sources += 1;
        }
        for source in Source::ALL {
            if !row.is_present(source) {
                absent[source.index()] += 1;
            }
        }
    }

    ReconSummary {
        total: table.rows.len(),
        in_all_sources,
        absent,
        unavailable_sources: table.unavailable_sources().len(),
    }
}

/// One-line human summary, e.g.
/// `Vendor OS: 120 codes, 97 in all sources, absent CT 5 / JEEVES 12 / STIBO 9`.
pub fn summary_line(table: &ReconTable) -> String {
    let s = compute_summary(table);
    let absent: Vec<String> = Source::ALL
        .iter()
        .map(|src| format!("{src} {}", s.absent[src.index()]))
        .collect();
    let mut line = format!(
        "{}: {} codes, {} in all sources, absent {}",
        table.kind,
        s.total,
        s.in_all_sources,
        absent.join(" / "),
    );
    let unavailable = table.unavailable_sources();
    if !unavailable.is_empty() {
        let names: Vec<&str> = unavailable.iter().map(|s| s.name()).collect();
        line.push_str(&format!(" [unavailable: {}]", names.join(", ")));
    }
    line
}

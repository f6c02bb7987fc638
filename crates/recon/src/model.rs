use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Sources + reconciliation kinds
// ---------------------------------------------------------------------------

/// One of the three compared systems. Declaration order is the reporting
/// order (CT, JEEVES, STIBO).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Ct,
    Jeeves,
    Stibo,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::Ct, Source::Jeeves, Source::Stibo];

    /// Position in [`Source::ALL`], used to index presence arrays.
    pub fn index(self) -> usize {
        match self {
            Self::Ct => 0,
            Self::Jeeves => 1,
            Self::Stibo => 2,
        }
    }

    /// Upper-case name, also the source's folder under the data root.
    pub fn name(self) -> &'static str {
        match self {
            Self::Ct => "CT",
            Self::Jeeves => "JEEVES",
            Self::Stibo => "STIBO",
        }
    }

    pub fn dir_name(self) -> &'static str {
        self.name()
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ct" => Ok(Self::Ct),
            "jeeves" => Ok(Self::Jeeves),
            "stibo" => Ok(Self::Stibo),
            other => Err(format!("unknown source '{other}' (expected ct, jeeves or stibo)")),
        }
    }
}

/// Reconciliation type. Each has its own extraction rules per source and its
/// own output tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReconKind {
    Product,
    VendorInvoice,
    VendorOs,
    CustomerInvoice,
    CustomerOs,
}

impl ReconKind {
    pub const ALL: [ReconKind; 5] = [
        ReconKind::Product,
        ReconKind::VendorInvoice,
        ReconKind::VendorOs,
        ReconKind::CustomerInvoice,
        ReconKind::CustomerOs,
    ];

    /// Human title, used as the output tab name.
    pub fn title(self) -> &'static str {
        match self {
            Self::Product => "Product",
            Self::VendorInvoice => "Vendor Invoice",
            Self::VendorOs => "Vendor OS",
            Self::CustomerInvoice => "Customer Invoice",
            Self::CustomerOs => "Customer OS",
        }
    }

    /// Kebab-case name used on the command line and in catalog files.
    pub fn slug(self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::VendorInvoice => "vendor-invoice",
            Self::VendorOs => "vendor-os",
            Self::CustomerInvoice => "customer-invoice",
            Self::CustomerOs => "customer-os",
        }
    }
}

impl std::fmt::Display for ReconKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.title())
    }
}

impl std::str::FromStr for ReconKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        Self::ALL
            .into_iter()
            .find(|k| k.slug() == wanted)
            .ok_or_else(|| {
                format!(
                    "unknown reconciliation type '{s}' (expected one of: {})",
                    Self::ALL.map(|k| k.slug()).join(", ")
                )
            })
    }
}

// ---------------------------------------------------------------------------
// Identifiers + raw cells
// ---------------------------------------------------------------------------

/// A normalized reconciliation key (SUPC, SUVC, customer code).
///
/// Only produced by [`crate::normalize`], so two identifiers are the same
/// code exactly when their strings are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    pub(crate) fn new(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Decoder-independent view of one spreadsheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Empty,
    Text(String),
    Float(f64),
    Int(i64),
    Bool(bool),
}

// ---------------------------------------------------------------------------
// Per-source results
// ---------------------------------------------------------------------------

/// What happened when a source was read for one reconciliation type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    Loaded { path: PathBuf },
    /// Nothing to read: no file resolved, or no spec configured.
    Missing { reason: String },
    /// A file was found but could not be used.
    Failed {
        #[serde(skip_serializing_if = "Option::is_none")]
        path: Option<PathBuf>,
        reason: String,
    },
}

impl SourceStatus {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Loaded { .. } => "loaded",
            Self::Missing { .. } => "missing",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Identifiers extracted from one source for one reconciliation type.
#[derive(Debug, Clone, Serialize)]
pub struct SourceResult {
    pub source: Source,
    pub status: SourceStatus,
    #[serde(skip)]
    pub identifiers: BTreeSet<Identifier>,
}

impl SourceResult {
    pub fn loaded(source: Source, path: PathBuf, identifiers: BTreeSet<Identifier>) -> Self {
        Self {
            source,
            status: SourceStatus::Loaded { path },
            identifiers,
        }
    }

    /// An unavailable source: contributes no identifiers.
    pub fn unavailable(source: Source, status: SourceStatus) -> Self {
        Self {
            source,
            status,
            identifiers: BTreeSet::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Label used when an identifier is present in every source.
pub const PRESENT_EVERYWHERE: &str = "-";

/// Glyph marking presence in the output workbook.
pub const PRESENCE_MARK: &str = "X";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconRow {
    pub identifier: Identifier,
    /// Presence per source, indexed by [`Source::index`].
    pub present: [bool; 3],
    pub absent_from: String,
}

impl ReconRow {
    pub fn is_present(&self, source: Source) -> bool {
        self.present[source.index()]
    }

    pub fn in_all_sources(&self) -> bool {
        self.present.iter().all(|p| *p)
    }
}

/// Status and size of one source as it fed a table.
#[derive(Debug, Clone, Serialize)]
pub struct SourceOutcome {
    pub source: Source,
    #[serde(flatten)]
    pub status: SourceStatus,
    pub identifiers: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconTable {
    pub kind: ReconKind,
    pub rows: Vec<ReconRow>,
    pub sources: Vec<SourceOutcome>,
}

impl ReconTable {
    pub fn outcome(&self, source: Source) -> Option<&SourceOutcome> {
        self.sources.iter().find(|o| o.source == source)
    }

    /// Sources that did not load for this table.
    pub fn unavailable_sources(&self) -> Vec<Source> {
        self.sources
            .iter()
            .filter(|o| !o.status.is_loaded())
            .map(|o| o.source)
            .collect()
    }

    pub fn is_degraded(&self) -> bool {
        !self.unavailable_sources().is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconSummary {
    pub total: usize,
    pub in_all_sources: usize,
    /// Rows missing from each source, indexed by [`Source::index`].
    pub absent: [usize; 3],
    pub unavailable_sources: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_order_matches_index() {
        for (i, s) in Source::ALL.iter().enumerate() {
            assert_eq!(s.index(), i);
        }
        assert_eq!(Source::Jeeves.to_string(), "JEEVES");
    }

    #[test]
    fn parse_source_case_insensitive() {
        assert_eq!("Stibo".parse::<Source>().unwrap(), Source::Stibo);
        assert!("sap".parse::<Source>().is_err());
    }

    #[test]
    fn parse_kind_accepts_slug_and_title() {
        assert_eq!("vendor-os".parse::<ReconKind>().unwrap(), ReconKind::VendorOs);
        assert_eq!("Customer Invoice".parse::<ReconKind>().unwrap(), ReconKind::CustomerInvoice);
        assert_eq!("customer_os".parse::<ReconKind>().unwrap(), ReconKind::CustomerOs);
        let err = "range".parse::<ReconKind>().unwrap_err();
        assert!(err.contains("vendor-invoice"));
    }

    #[test]
    fn kind_titles_are_tab_names() {
        let titles: Vec<_> = ReconKind::ALL.iter().map(|k| k.title()).collect();
        assert_eq!(
            titles,
            ["Product", "Vendor Invoice", "Vendor OS", "Customer Invoice", "Customer OS"]
        );
    }

    #[test]
    fn source_status_serializes_tagged() {
        let s = SourceStatus::Missing { reason: "no file".into() };
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["status"], "missing");
        assert_eq!(json["reason"], "no file");
    }
}

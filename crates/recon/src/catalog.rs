use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::model::{ReconKind, Source};

// ---------------------------------------------------------------------------
// Top-level catalog
// ---------------------------------------------------------------------------

/// Declarative table of (source, reconciliation type) -> [`SourceSpec`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceCatalog {
    #[serde(rename = "spec", default)]
    pub specs: Vec<SourceSpec>,
}

/// How to locate and read one source for one reconciliation type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub source: Source,
    pub kind: ReconKind,
    /// Tried in order, first in the dated folder, then in the source root.
    pub files: Vec<FileRule>,
    #[serde(default)]
    pub sheet: SheetSelector,
    /// 1-based.
    pub header_row: u32,
    /// 1-based; must be below the header row.
    pub data_start_row: u32,
    pub column: ColumnSelector,
    #[serde(default)]
    pub read_until: ReadUntil,
    #[serde(default)]
    pub format: IdentifierFormat,
}

// ---------------------------------------------------------------------------
// File rules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum FileRule {
    /// Exactly `{prefix}_{date}.xlsx`.
    Template { prefix: String },
    /// First spreadsheet (by file name) whose name contains `needle`,
    /// case-insensitively. `market_scoped` also requires the market name.
    Contains {
        needle: String,
        #[serde(default)]
        market_scoped: bool,
    },
    /// Exactly `name`, e.g. a consolidated extract kept in the root folder.
    Fixed { name: String },
}

impl FileRule {
    pub fn template(prefix: &str) -> Self {
        Self::Template { prefix: prefix.into() }
    }

    pub fn contains(needle: &str) -> Self {
        Self::Contains { needle: needle.into(), market_scoped: false }
    }

    pub fn contains_for_market(needle: &str) -> Self {
        Self::Contains { needle: needle.into(), market_scoped: true }
    }

    pub fn fixed(name: &str) -> Self {
        Self::Fixed { name: name.into() }
    }

    /// Exact file name this rule expects, if it is not a substring search.
    pub fn exact_name(&self, date: &str) -> Option<String> {
        match self {
            Self::Template { prefix } => Some(format!("{prefix}_{date}.xlsx")),
            Self::Fixed { name } => Some(name.clone()),
            Self::Contains { .. } => None,
        }
    }
}

impl std::fmt::Display for FileRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Template { prefix } => write!(f, "{prefix}_{{date}}.xlsx"),
            Self::Contains { needle, market_scoped: false } => write!(f, "*{needle}*"),
            Self::Contains { needle, market_scoped: true } => write!(f, "*{needle}*{{market}}*"),
            Self::Fixed { name } => f.write_str(name),
        }
    }
}

// ---------------------------------------------------------------------------
// Sheet + column selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetSelector {
    /// The workbook's active sheet (first visible sheet).
    #[default]
    Active,
    /// First of these names present in the workbook; none present is an error.
    Named(Vec<String>),
    /// First sheet whose name contains one of these, case-insensitively,
    /// tried in order; otherwise the active sheet.
    Prefer(Vec<String>),
}

impl SheetSelector {
    pub fn named(names: &[&str]) -> Self {
        Self::Named(names.iter().map(|s| s.to_string()).collect())
    }

    pub fn prefer(needles: &[&str]) -> Self {
        Self::Prefer(needles.iter().map(|s| s.to_string()).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnSelector {
    Index(ColumnRef),
    /// Look the column up by its header-row label.
    Header {
        labels: Vec<String>,
        #[serde(default)]
        fallback: Option<ColumnRef>,
    },
    /// Mapping not known yet. Always reported as ColumnNotFound rather than
    /// guessing a column.
    Undefined,
}

impl ColumnSelector {
    /// Invalid letters give column 0, which [`SourceCatalog::validate`] rejects.
    pub fn letter(letters: &str) -> Self {
        Self::Index(ColumnRef::from_letters(letters).unwrap_or(ColumnRef(0)))
    }

    pub fn header(labels: &[&str]) -> Self {
        Self::Header {
            labels: labels.iter().map(|s| s.to_string()).collect(),
            fallback: None,
        }
    }

    pub fn header_or(labels: &[&str], fallback: &str) -> Self {
        Self::Header {
            labels: labels.iter().map(|s| s.to_string()).collect(),
            fallback: Some(ColumnRef::from_letters(fallback).unwrap_or(ColumnRef(0))),
        }
    }
}

/// 1-based column index. Deserializes from a number or from column letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ColumnRef(pub u32);

impl ColumnRef {
    /// "A" -> 1, "C" -> 3, "AA" -> 27.
    pub fn from_letters(letters: &str) -> Option<Self> {
        let letters = letters.trim();
        if letters.is_empty() || letters.len() > 3 {
            return None;
        }
        let mut n: u32 = 0;
        for c in letters.chars() {
            if !c.is_ascii_alphabetic() {
                return None;
            }
            n = n * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
        }
        Some(Self(n))
    }

    /// 1 -> "A", 27 -> "AA".
    pub fn letters(self) -> String {
        let mut result = String::new();
        let mut n = self.0;
        while n > 0 {
            let rem = (n - 1) % 26;
            result.insert(0, (b'A' + rem as u8) as char);
            n = (n - 1) / 26;
        }
        result
    }

    /// 0-based offset for decoders.
    pub fn zero_based(self) -> u32 {
        self.0.saturating_sub(1)
    }
}

impl Serialize for ColumnRef {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.letters())
    }
}

impl<'de> Deserialize<'de> for ColumnRef {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u32),
            Letters(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(0) => Err(serde::de::Error::custom("column index is 1-based")),
            Raw::Number(n) => Ok(Self(n)),
            Raw::Letters(s) => Self::from_letters(&s)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid column letters '{s}'"))),
        }
    }
}

impl std::fmt::Display for ColumnSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Index(c) => write!(f, "column {}", c.letters()),
            Self::Header { labels, fallback } => {
                let quoted: Vec<String> = labels.iter().map(|l| format!("'{l}'")).collect();
                write!(f, "header {}", quoted.join(" | "))?;
                if let Some(c) = fallback {
                    write!(f, " (else column {})", c.letters())?;
                }
                Ok(())
            }
            Self::Undefined => f.write_str("undefined column mapping"),
        }
    }
}

// ---------------------------------------------------------------------------
// Read extent + identifier format
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadUntil {
    /// Read to the last used row; blank cells are skipped.
    #[default]
    EndOfSheet,
    /// Stop at the first blank cell.
    FirstBlank,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierFormat {
    /// Trimmed text; numeric cells without decimal artifacts.
    #[default]
    Text,
    /// As `Text`, and integral text such as "205167.0" becomes "205167".
    Numeric,
    /// As `Text`, and all-digit codes are left-padded to `width` digits.
    ZeroPadded { width: u8 },
}

// ---------------------------------------------------------------------------
// Built-in catalog
// ---------------------------------------------------------------------------

const OS_CODE_WIDTH: u8 = 4;

struct Layout {
    sheet: SheetSelector,
    header_row: u32,
    data_start_row: u32,
    column: ColumnSelector,
    read_until: ReadUntil,
}

fn layout(sheet: SheetSelector, header_row: u32, column: ColumnSelector) -> Layout {
    Layout {
        sheet,
        header_row,
        data_start_row: header_row + 1,
        column,
        read_until: ReadUntil::EndOfSheet,
    }
}

/// CT workbooks: headers on row 7, codes from row 8 until the first blank.
fn ct_layout(sheet: &str, column: &str) -> Layout {
    Layout {
        read_until: ReadUntil::FirstBlank,
        ..layout(SheetSelector::named(&[sheet]), 7, ColumnSelector::letter(column))
    }
}

fn spec(
    source: Source,
    kind: ReconKind,
    files: Vec<FileRule>,
    layout: Layout,
    format: IdentifierFormat,
) -> SourceSpec {
    SourceSpec {
        source,
        kind,
        files,
        sheet: layout.sheet,
        header_row: layout.header_row,
        data_start_row: layout.data_start_row,
        column: layout.column,
        read_until: layout.read_until,
        format,
    }
}

impl SourceCatalog {
    /// Layouts of the CT, JEEVES and STIBO exports as currently delivered.
    pub fn builtin() -> Self {
        use ReconKind::*;
        use Source::*;

        let os = IdentifierFormat::ZeroPadded { width: OS_CODE_WIDTH };
        let text = IdentifierFormat::Text;
        let numeric = IdentifierFormat::Numeric;

        let specs = vec![
            // Product
            spec(
                Ct,
                Product,
                vec![FileRule::contains("Product")],
                layout(SheetSelector::prefer(&["product", "item"]), 6, ColumnSelector::letter("B")),
                numeric,
            ),
            spec(
                Jeeves,
                Product,
                vec![FileRule::contains("Product")],
                layout(SheetSelector::named(&["2-EXCELMASTER"]), 2, ColumnSelector::letter("A")),
                numeric,
            ),
            spec(
                Stibo,
                Product,
                vec![FileRule::template("Products"), FileRule::contains("product")],
                layout(SheetSelector::Active, 1, ColumnSelector::header_or(&["SUPC"], "C")),
                numeric,
            ),
            // Vendor Invoice
            spec(
                Ct,
                VendorInvoice,
                vec![FileRule::contains_for_market("Vendor")],
                ct_layout("Invoice", "C"),
                text,
            ),
            spec(
                Jeeves,
                VendorInvoice,
                vec![FileRule::contains("Vendor")],
                layout(SheetSelector::Active, 1, ColumnSelector::header(&["SUVC - Invoice"])),
                text,
            ),
            spec(
                Stibo,
                VendorInvoice,
                vec![
                    FileRule::template("Invoice_Vendors"),
                    FileRule::fixed("Vendor_extracts_STIBO.xlsx"),
                ],
                layout(
                    SheetSelector::prefer(&["Invoice"]),
                    1,
                    ColumnSelector::header_or(&["SUVC Invoice", "SUVC - Invoice"], "A"),
                ),
                text,
            ),
            // Vendor OS
            spec(
                Ct,
                VendorOs,
                vec![FileRule::contains_for_market("Vendor")],
                ct_layout("OrderingShipping", "D"),
                os,
            ),
            spec(
                Jeeves,
                VendorOs,
                vec![FileRule::contains("Vendor")],
                layout(
                    SheetSelector::named(&["ORDERSHIPPING", "ODERSHIPPING", "OrderingShipping", "ORDERINGSHIPPING"]),
                    1,
                    ColumnSelector::letter("A"),
                ),
                os,
            ),
            spec(
                Stibo,
                VendorOs,
                vec![
                    FileRule::template("OS_Vendors"),
                    FileRule::fixed("Vendor_extracts_STIBO.xlsx"),
                ],
                layout(
                    SheetSelector::prefer(&["Ordering"]),
                    1,
                    ColumnSelector::header(&["SUVC Ordering/Shipping"]),
                ),
                os,
            ),
            // Customer Invoice
            spec(
                Ct,
                CustomerInvoice,
                vec![FileRule::contains_for_market("Customer")],
                ct_layout("Invoice", "C"),
                text,
            ),
            spec(
                Jeeves,
                CustomerInvoice,
                vec![FileRule::contains("Customer")],
                layout(SheetSelector::named(&["INVOICECUSTOMER"]), 2, ColumnSelector::letter("A")),
                text,
            ),
            spec(
                Stibo,
                CustomerInvoice,
                vec![
                    FileRule::template("Invoice_Customers"),
                    FileRule::template("Invoice_Customer"),
                    FileRule::fixed("Customer_extracts_STIBO.xlsx"),
                ],
                layout(
                    SheetSelector::prefer(&["Invoice"]),
                    1,
                    ColumnSelector::header(&["Invoice Customer Code"]),
                ),
                text,
            ),
            // Customer OS
            spec(
                Ct,
                CustomerOs,
                vec![FileRule::contains_for_market("Customer")],
                ct_layout("OrderingShipping", "D"),
                os,
            ),
            spec(
                Jeeves,
                CustomerOs,
                vec![FileRule::contains("Customer")],
                layout(
                    SheetSelector::named(&["ORDERSHIPPING", "OrderShipping", "ORDERINGSHIPPING"]),
                    2,
                    ColumnSelector::letter("A"),
                ),
                os,
            ),
            // STIBO has not published the Ordering/Shipping customer column yet.
            spec(
                Stibo,
                CustomerOs,
                vec![
                    FileRule::template("OS_Customers"),
                    FileRule::fixed("Customer_extracts_STIBO.xlsx"),
                ],
                layout(SheetSelector::Active, 1, ColumnSelector::Undefined),
                os,
            ),
        ];

        Self { specs }
    }

    // -----------------------------------------------------------------------
    // Parse + Validate
    // -----------------------------------------------------------------------

    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let catalog: SourceCatalog =
            toml::from_str(input).map_err(|e| ReconError::CatalogParse(e.to_string()))?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        let mut seen = std::collections::HashSet::new();

        for spec in &self.specs {
            let label = format!("{} {}", spec.source, spec.kind);

            if !seen.insert((spec.source, spec.kind)) {
                return Err(ReconError::CatalogValidation(format!("{label}: defined more than once")));
            }

            if spec.files.is_empty() {
                return Err(ReconError::CatalogValidation(format!("{label}: no file rules")));
            }

            for rule in &spec.files {
                let blank = match rule {
                    FileRule::Template { prefix } => prefix.trim().is_empty(),
                    FileRule::Contains { needle, .. } => needle.trim().is_empty(),
                    FileRule::Fixed { name } => name.trim().is_empty(),
                };
                if blank {
                    return Err(ReconError::CatalogValidation(format!("{label}: empty file rule")));
                }
            }

            if spec.header_row == 0 || spec.data_start_row == 0 {
                return Err(ReconError::CatalogValidation(format!(
                    "{label}: rows are 1-based, got header_row={} data_start_row={}",
                    spec.header_row, spec.data_start_row
                )));
            }

            if spec.data_start_row <= spec.header_row {
                return Err(ReconError::CatalogValidation(format!(
                    "{label}: data_start_row ({}) must be below header_row ({})",
                    spec.data_start_row, spec.header_row
                )));
            }

            match &spec.column {
                ColumnSelector::Index(ColumnRef(0))
                | ColumnSelector::Header {
                    fallback: Some(ColumnRef(0)),
                    ..
                } => {
                    return Err(ReconError::CatalogValidation(format!("{label}: invalid column reference")));
                }
                ColumnSelector::Header { labels, .. } if labels.iter().all(|l| l.trim().is_empty()) => {
                    return Err(ReconError::CatalogValidation(format!("{label}: header lookup without labels")));
                }
                _ => {}
            }

            match &spec.sheet {
                SheetSelector::Named(names) | SheetSelector::Prefer(names) if names.is_empty() => {
                    return Err(ReconError::CatalogValidation(format!("{label}: empty sheet list")));
                }
                _ => {}
            }
        }

        Ok(())
    }

    pub fn get(&self, source: Source, kind: ReconKind) -> Option<&SourceSpec> {
        self.specs.iter().find(|s| s.source == source && s.kind == kind)
    }

    /// Specs for one reconciliation type, in source order.
    pub fn for_kind(&self, kind: ReconKind) -> Vec<&SourceSpec> {
        let mut specs: Vec<&SourceSpec> = self.specs.iter().filter(|s| s.kind == kind).collect();
        specs.sort_by_key(|s| s.source);
        specs
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

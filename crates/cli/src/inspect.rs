//! `smx catalog` and `smx locate`: look at the configuration without running.

use std::path::PathBuf;

use sourcematrix_config::LoadedSettings;
use sourcematrix_io::locate;
use sourcematrix_recon::catalog::{ReadUntil, SheetSelector, SourceSpec};
use sourcematrix_recon::{ReconError, ReconKind, Source};

use crate::exit_codes::{EXIT_CONFIG, EXIT_ERROR};
use crate::{load_catalog, resolve_date, resolve_market, CliError};

pub fn cmd_catalog(loaded: &LoadedSettings, catalog: Option<PathBuf>, json: bool) -> Result<(), CliError> {
    let catalog = load_catalog(catalog, &loaded.settings)?;

    if json {
        let text = serde_json::to_string_pretty(&catalog)
            .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))?;
        println!("{text}");
        return Ok(());
    }

    for kind in ReconKind::ALL {
        println!("{kind}");
        for spec in catalog.for_kind(kind) {
            println!("  {}", describe(spec));
        }
    }
    Ok(())
}

fn describe(spec: &SourceSpec) -> String {
    let files: Vec<String> = spec.files.iter().map(|r| r.to_string()).collect();
    let sheet = match &spec.sheet {
        SheetSelector::Active => "active".to_string(),
        SheetSelector::Named(names) => names.join(" | "),
        SheetSelector::Prefer(needles) => format!("*{}* else active", needles.join("* | *")),
    };
    let until = match spec.read_until {
        ReadUntil::EndOfSheet => "end",
        ReadUntil::FirstBlank => "first blank",
    };
    format!(
        "{:<7} files: {}  sheet: {}  {}  rows: {}+ (header {}, until {})",
        spec.source.name(),
        files.join(" | "),
        sheet,
        spec.column,
        spec.data_start_row,
        spec.header_row,
        until,
    )
}

pub fn cmd_locate(
    loaded: &LoadedSettings,
    source: Source,
    kind: ReconKind,
    date: Option<String>,
    market: Option<String>,
    root: Option<PathBuf>,
    catalog: Option<PathBuf>,
) -> Result<(), CliError> {
    let settings = &loaded.settings;
    let date = resolve_date(date, settings)?;
    let market = market.map(|m| resolve_market(&m, settings)).transpose()?;
    let catalog = load_catalog(catalog, settings)?;
    let root = root.unwrap_or_else(|| settings.data_root.clone());

    let spec = catalog.get(source, kind).ok_or_else(|| {
        CliError::new(EXIT_CONFIG, format!("no source spec for {source} {kind}"))
    })?;

    match locate::resolve(&root, spec, &date, market.as_deref()) {
        Ok(path) => {
            println!("{}", path.display());
            Ok(())
        }
        Err(ReconError::SourceNotFound { searched, .. }) => {
            let rules: Vec<String> = spec.files.iter().map(|r| r.to_string()).collect();
            let dirs: Vec<String> = searched.iter().map(|d| d.display().to_string()).collect();
            Err(CliError::new(EXIT_ERROR, format!("{source} {kind}: no matching file"))
                .with_hint(format!("looked for {} in {}", rules.join(" | "), dirs.join(", "))))
        }
        Err(e) => Err(CliError::recon(e)),
    }
}

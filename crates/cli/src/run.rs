//! `smx run`: reconcile each requested market and publish its report.

use std::path::PathBuf;

use serde_json::json;
use sourcematrix_config::LoadedSettings;
use sourcematrix_io::WorkbookSourceReader;
use sourcematrix_recon::engine::{reconcile_all, RunContext};
use sourcematrix_recon::evidence::{compute_summary, summary_line};
use sourcematrix_recon::{ReconKind, ReconTable};

use crate::exit_codes::{EXIT_DEGRADED, EXIT_ERROR};
use crate::{load_catalog, resolve_date, resolve_market, CliError};

pub struct RunArgs {
    pub market: String,
    pub date: Option<String>,
    pub kinds: Vec<ReconKind>,
    pub root: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub catalog: Option<PathBuf>,
    pub json: bool,
    pub strict: bool,
}

pub fn cmd_run(loaded: &LoadedSettings, args: RunArgs) -> Result<(), CliError> {
    let settings = &loaded.settings;

    let date = resolve_date(args.date, settings)?;
    let markets = if args.market.trim().eq_ignore_ascii_case("all") {
        settings.markets.clone()
    } else {
        vec![resolve_market(&args.market, settings)?]
    };
    let kinds = requested_kinds(&args.kinds);
    let catalog = load_catalog(args.catalog, settings)?;
    let root = args.root.unwrap_or_else(|| settings.data_root.clone());
    let output_dir = args.output_dir.unwrap_or_else(|| settings.output_dir.clone());

    if !root.is_dir() {
        return Err(CliError::new(EXIT_ERROR, format!("data root {} is not a directory", root.display()))
            .with_hint("set --root, SMX_DATA_ROOT or data_root in the settings file"));
    }

    let reader = WorkbookSourceReader::new(&root);
    let mut degraded: Vec<String> = Vec::new();
    let mut json_markets = Vec::new();

    for market in &markets {
        log::info!("reconciling {market} for {date} from {}", root.display());
        let ctx = RunContext::new(date.clone(), Some(market.clone()));
        let tables = reconcile_all(&kinds, &ctx, &catalog, &reader);

        for table in &tables {
            eprintln!("{market}: {}", summary_line(table));
        }
        degraded.extend(degraded_labels(market, &tables));

        if args.json {
            json_markets.push(market_json(market, &tables));
        } else {
            let now = chrono::Local::now().naive_local();
            let published = sourcematrix_io::publish(&output_dir, &date, market, &tables, now)
                .map_err(CliError::recon)?;
            eprintln!("wrote {}", published.path().display());
        }
    }

    if args.json {
        let report = json!({
            "date": date,
            "root": root.display().to_string(),
            "markets": json_markets,
        });
        let text = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))?;
        println!("{text}");
    }

    if args.strict && !degraded.is_empty() {
        return Err(CliError::new(
            EXIT_DEGRADED,
            format!("degraded run, unavailable sources: {}", degraded.join("; ")),
        )
        .with_hint(format!("check that every source has a {date} folder or a root extract")));
    }
    Ok(())
}

/// Requested kinds in canonical order, duplicates dropped. Empty = all.
fn requested_kinds(requested: &[ReconKind]) -> Vec<ReconKind> {
    if requested.is_empty() {
        return ReconKind::ALL.to_vec();
    }
    ReconKind::ALL
        .into_iter()
        .filter(|k| requested.contains(k))
        .collect()
}

/// "Ekofisk Vendor OS: STIBO" for each table with unavailable sources.
fn degraded_labels(market: &str, tables: &[ReconTable]) -> Vec<String> {
    tables
        .iter()
        .filter(|t| t.is_degraded())
        .map(|t| {
            let names: Vec<&str> = t.unavailable_sources().iter().map(|s| s.name()).collect();
            format!("{market} {}: {}", t.kind, names.join(", "))
        })
        .collect()
}

fn market_json(market: &str, tables: &[ReconTable]) -> serde_json::Value {
    let tables: Vec<serde_json::Value> = tables
        .iter()
        .map(|t| {
            json!({
                "kind": t.kind,
                "title": t.kind.title(),
                "summary": compute_summary(t),
                "sources": t.sources,
                "rows": t.rows,
            })
        })
        .collect();
    json!({ "market": market, "tables": tables })
}

//! Planning CLI
//!
//! Runs the rollup engine over JSON fixtures and renders the result as
//! plain text or JSON. The binary in `main.rs` only parses arguments.

use anyhow::{Context, Result};
use planning_core::{
    compute_norms, load_rows_file, load_updates_file, row::read_file, Action, FilterSelection,
    Level, NormRow, PlanningConfig, PlanningStore, Snapshot, Team, TeamEdit,
};
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Install the stderr tracing subscriber (`RUST_LOG`, default `info`)
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A second install in the same process is harmless
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Inputs for the `rollup` command
#[derive(Debug, Clone, Default)]
pub struct RollupArgs {
    pub rows: PathBuf,
    pub updates: Option<PathBuf>,
    pub edits: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub filters: FilterSelection,
    pub json: bool,
}

/// Inputs for the `norms` command
#[derive(Debug, Clone)]
pub struct NormsArgs {
    pub rows: PathBuf,
    pub level: Level,
    pub config: Option<PathBuf>,
    pub json: bool,
}

/// Load configuration from a file or fall back to defaults
///
/// # Errors
/// Returns error if the file cannot be read or is invalid
pub fn load_config(path: Option<&PathBuf>) -> Result<PlanningConfig> {
    match path {
        Some(path) => PlanningConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(PlanningConfig::new()),
    }
}

/// Run load → update → filter → edit through the store
///
/// # Errors
/// Returns error if any input file cannot be loaded
pub fn run_rollup(args: &RollupArgs) -> Result<Snapshot> {
    let config = load_config(args.config.as_ref())?;
    let mut store = PlanningStore::new(&config)?;

    let rows = load_rows_file(&args.rows)
        .with_context(|| format!("loading rows {}", args.rows.display()))?;
    store.dispatch(Action::Load(rows));

    if let Some(path) = &args.updates {
        let updates = load_updates_file(path)
            .with_context(|| format!("loading updates {}", path.display()))?;
        store.dispatch(Action::ApplyUpdates(updates));
    }

    store.dispatch(Action::SetFilters(args.filters.clone()));

    if let Some(path) = &args.edits {
        let text = read_file(path)?;
        let edits: Vec<TeamEdit> = serde_json::from_str(&text)
            .with_context(|| format!("decoding edits {}", path.display()))?;
        store.dispatch(Action::EditBatch(edits));
    }

    Ok((*store.snapshot()).clone())
}

/// Compute norms for the rows in a file
///
/// # Errors
/// Returns error if the rows or configuration cannot be loaded
pub fn run_norms(args: &NormsArgs) -> Result<Vec<NormRow>> {
    let config = load_config(args.config.as_ref())?;
    let rows = load_rows_file(&args.rows)
        .with_context(|| format!("loading rows {}", args.rows.display()))?;
    Ok(compute_norms(&rows, args.level, &config.norms))
}

/// Render a snapshot as a text report
#[must_use]
pub fn render_rollup(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    let periods: Vec<&str> = snapshot.bridge.iter().map(|b| b.period.as_str()).collect();

    let _ = writeln!(out, "Grouped by {} ({} groups)", snapshot.level, snapshot.rollup.len());
    let _ = writeln!(out);
    for group in snapshot.rollup.iter() {
        let _ = writeln!(out, "{}", group.key);
        for period in &periods {
            let consensus = snapshot.consensus.get(&group.key, period).unwrap_or(0.0);
            let _ = writeln!(
                out,
                "  {period:<4} LY {:>10.1}  baseline {:>10.1}  consensus {:>10.1}",
                group.last_year_actual(period),
                group.baseline(period),
                consensus,
            );
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Bridge");
    for row in &snapshot.bridge {
        let teams: Vec<String> = Team::ALL
            .into_iter()
            .map(|t| format!("{t} {:+.1}", row.team(t)))
            .collect();
        let _ = writeln!(
            out,
            "  {:<4} baseline {:>10.1}  {}  final {:>10.1}  system {:>10.1}",
            row.period,
            row.baseline,
            teams.join("  "),
            row.final_total,
            row.system_final,
        );
    }
    out
}

/// Render norms as a text report
#[must_use]
pub fn render_norms(norms: &[NormRow]) -> String {
    let mut out = String::new();
    for row in norms {
        let _ = writeln!(
            out,
            "{:<12} obs {:>3}  se {:>9.2}  demand {:>10.2}  safety {:>9.2}  norm {:>10.2}",
            row.key, row.observations, row.std_error, row.mean_demand, row.safety_stock, row.norm,
        );
    }
    out
}

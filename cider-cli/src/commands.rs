//! CLI subcommand handlers.

use crate::Commands;
use anyhow::Context;
use cider_core::schema::{DatasetKind, schema_for};
use cider_core::{DataStore, DatastoreConfig, Session, Table};
use serde::Serialize;
use std::path::Path;

/// Shape of one loaded table.
#[derive(Debug, Serialize)]
struct TableSummary {
    dataset: String,
    rows: usize,
    columns: Vec<String>,
}

impl TableSummary {
    fn new(dataset: impl Into<String>, table: &Table) -> Self {
        Self {
            dataset: dataset.into(),
            rows: table.row_count(),
            columns: table.column_names().into_iter().map(str::to_string).collect(),
        }
    }
}

/// Handle a CLI subcommand.
pub fn handle_command(command: Commands, config: &Path, json: bool) -> anyhow::Result<()> {
    match command {
        Commands::Schema { kind } => handle_schema(kind, json),
        Commands::Config => handle_config(config),
        command => {
            tracing::debug!(config = %config.display(), "opening datastore");
            let session = Session::default();
            let mut ds = DataStore::new(config, &session)
                .with_context(|| format!("Failed to load config {}", config.display()))?;
            let summaries = run_datastore_command(command, &mut ds)?;
            print_summaries(&summaries, json)
        }
    }
}

fn run_datastore_command(
    command: Commands,
    ds: &mut DataStore<'_>,
) -> anyhow::Result<Vec<TableSummary>> {
    match command {
        Commands::Load { kinds } => {
            load(ds, &kinds)?;
            Ok(summarize(ds, &kinds))
        }
        Commands::Merge => {
            load(ds, &[DatasetKind::Features, DatasetKind::Labels])?;
            ds.merge()?;
            let merged = ds
                .merged
                .as_ref()
                .context("merge produced no result")?;
            Ok(vec![
                TableSummary::new("merged", &merged.table),
                TableSummary::new("x", &merged.x),
            ])
        }
        Commands::Filter { from, to, kinds } => {
            anyhow::ensure!(from <= to, "--from {from} is after --to {to}");
            load(ds, &kinds)?;
            ds.filter_dates(from, to)?;
            Ok(summarize(ds, &kinds))
        }
        Commands::Dedup { kinds } => {
            load(ds, &kinds)?;
            ds.deduplicate()?;
            Ok(summarize(ds, &kinds))
        }
        Commands::Schema { .. } | Commands::Config => Ok(Vec::new()),
    }
}

fn load(ds: &mut DataStore<'_>, kinds: &[DatasetKind]) -> anyhow::Result<()> {
    for kind in kinds {
        ds.load_data([(*kind, None)])
            .with_context(|| format!("Failed to load {kind}"))?;
    }
    Ok(())
}

fn summarize(ds: &DataStore<'_>, kinds: &[DatasetKind]) -> Vec<TableSummary> {
    let mut out = Vec::new();
    for kind in kinds {
        match kind {
            DatasetKind::Shapefiles => {
                if let Some(shapes) = &ds.shapefiles {
                    out.extend(
                        shapes
                            .iter()
                            .map(|(level, table)| TableSummary::new(format!("shapefiles.{level}"), table)),
                    );
                }
            }
            DatasetKind::Targeting | DatasetKind::Fairness => {
                let weighted = match kind {
                    DatasetKind::Targeting => ds.targeting.as_ref(),
                    _ => ds.fairness.as_ref(),
                };
                if let Some(w) = weighted {
                    out.push(TableSummary::new(kind.as_str(), &w.table));
                    out.push(TableSummary::new(format!("{kind}.weighted"), &w.weighted));
                }
            }
            _ => {
                if let Some(table) = ds.table(*kind) {
                    out.push(TableSummary::new(kind.as_str(), table));
                }
            }
        }
    }
    out
}

fn print_summaries(summaries: &[TableSummary], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summaries)?);
        return Ok(());
    }
    for s in summaries {
        println!("{:<24} {:>8} rows  {:>3} columns", s.dataset, s.rows, s.columns.len());
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct ColumnContract {
    name: &'static str,
    #[serde(rename = "type")]
    ty: String,
    required: bool,
}

fn handle_schema(kind: Option<DatasetKind>, json: bool) -> anyhow::Result<()> {
    let kinds: Vec<DatasetKind> = kind.map_or_else(|| DatasetKind::ALL.to_vec(), |k| vec![k]);
    for kind in kinds {
        let entry = schema_for(kind);
        let columns: Vec<ColumnContract> = entry
            .columns
            .iter()
            .map(|c| ColumnContract {
                name: c.name,
                ty: c.ty.to_string(),
                required: c.required,
            })
            .collect();
        if json {
            let doc = serde_json::json!({
                "dataset": kind,
                "columns": columns,
                "synonyms": entry.synonyms,
                "natural_key": entry.natural_key,
            });
            println!("{}", serde_json::to_string_pretty(&doc)?);
            continue;
        }
        println!("{kind}");
        for c in &columns {
            let marker = if c.required { "*" } else { " " };
            println!("  {marker} {:<28} {}", c.name, c.ty);
        }
        for (alias, canonical) in entry.synonyms {
            println!("    {alias} -> {canonical}");
        }
    }
    Ok(())
}

fn handle_config(config: &Path) -> anyhow::Result<()> {
    let config = DatastoreConfig::load(config)
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{}", toml_str);
    Ok(())
}

//! `landings`: command-line access to the landing report store.
//!
//! # Usage
//!
//! ```
//! landings import --data-dir data/landing_reports
//! landings show 1234567
//! landings list --vessel 54321 --from 2024-01-01 --limit 20
//! landings schema --dialect postgres
//! ```

mod config;
mod import;

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use config::Settings;
use import::ImportOptions;
use landings_core::{
  schema::POSTGRES_SCHEMA,
  store::{LandingStore, ReportQuery},
};
use landings_store_sqlite::{SCHEMA, SqliteStore};
use serde::Serialize;
use serde_json::json;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(author, version, about = "Landing report store")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "landings.toml")]
  config: PathBuf,

  /// SQLite database file; overrides `store_path` from the config.
  #[arg(long, value_name = "FILE")]
  store: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Create the database file and schema if they do not exist.
  Init,

  /// Import `landing_report_*.json` / `.xml` documents from a directory.
  Import {
    #[arg(long, value_name = "DIR")]
    data_dir:         Option<PathBuf>,
    /// Files processed between progress lines.
    #[arg(long)]
    batch_size:       Option<usize>,
    /// Re-import reports that are already stored.
    #[arg(long)]
    no_skip_existing: bool,
  },

  /// Print one report with its line items and stat areas.
  Show {
    id:  i64,
    /// Print the stored upstream document instead.
    #[arg(long)]
    raw: bool,
  },

  /// List report summaries, newest landing first.
  List {
    /// Vessel ADF&G number.
    #[arg(long)]
    vessel:      Option<String>,
    #[arg(long)]
    port:        Option<String>,
    #[arg(long)]
    status:      Option<String>,
    #[arg(long)]
    report_type: Option<String>,
    /// Earliest landing date (YYYY-MM-DD).
    #[arg(long)]
    from:        Option<NaiveDate>,
    /// Latest landing date (YYYY-MM-DD).
    #[arg(long)]
    until:       Option<NaiveDate>,
    #[arg(long)]
    limit:       Option<usize>,
    #[arg(long)]
    offset:      Option<usize>,
  },

  /// Reports landed by a vessel.
  Vessel { adfg_number: String },

  /// Line items for a species code, with vessel and port context.
  Species { code: String },

  /// Line items recorded under a fish ticket.
  Ticket { number: String },

  /// Stat areas in an IPHC regulatory area.
  Area { iphc_area: String },

  /// Delete a report and its child rows.
  Delete { id: i64 },

  /// Print the sync cursor.
  SyncState,

  /// Move the sync cursor (defaults to now).
  MarkSynced {
    /// RFC 3339 timestamp.
    #[arg(long)]
    at: Option<DateTime<Utc>>,
  },

  /// Print the DDL for a database dialect.
  Schema {
    #[arg(long, value_enum, default_value_t = Dialect::Sqlite)]
    dialect: Dialect,
  },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Dialect {
  Sqlite,
  Postgres,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if let Command::Schema { dialect } = cli.command {
    match dialect {
      Dialect::Sqlite => println!("{SCHEMA}"),
      Dialect::Postgres => println!("{POSTGRES_SCHEMA}"),
    }
    return Ok(());
  }

  let settings = Settings::load(&cli.config)?;
  let store_path = cli
    .store
    .as_deref()
    .map(config::expand_tilde)
    .unwrap_or_else(|| settings.store_path.clone());

  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("creating {}", parent.display()))?;
  }

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("opening store at {}", store_path.display()))?;
  tracing::debug!(path = %store_path.display(), "store opened");

  run(cli.command, &store, &settings).await
}

async fn run(command: Command, store: &SqliteStore, settings: &Settings) -> Result<()> {
  match command {
    Command::Init => {
      let state = store.sync_state().await?;
      tracing::info!(has_synced = state.has_synced(), "store ready");
    }

    Command::Import { data_dir, batch_size, no_skip_existing } => {
      let opts = ImportOptions {
        data_dir:      data_dir
          .map(|d| config::expand_tilde(&d))
          .unwrap_or_else(|| settings.data_dir.clone()),
        batch_size:    batch_size.unwrap_or(settings.batch_size),
        skip_existing: !no_skip_existing,
      };
      let summary = import::import_dir(store, &opts).await?;
      print_json(&summary)?;
    }

    Command::Show { id, raw } => {
      if raw {
        let doc = store
          .get_raw_document(id)
          .await?
          .with_context(|| format!("report {id} not found"))?;
        print_json(&doc)?;
      } else {
        let bundle = store
          .get_report_bundle(id)
          .await?
          .with_context(|| format!("report {id} not found"))?;
        print_json(&json!({
          "total_weight": bundle.total_weight(),
          "species": bundle.species_names(),
          "report": bundle.report,
          "items": bundle.items,
          "stat_areas": bundle.stat_areas,
        }))?;
      }
    }

    Command::List {
      vessel,
      port,
      status,
      report_type,
      from,
      until,
      limit,
      offset,
    } => {
      let query = ReportQuery {
        vessel_adfg_number: vessel,
        port_code: port,
        status,
        report_type,
        landed_from: from,
        landed_until: until,
        limit,
        offset,
      };
      print_json(&store.list_reports(&query).await?)?;
    }

    Command::Vessel { adfg_number } => {
      print_json(&store.reports_by_vessel(&adfg_number).await?)?;
    }

    Command::Species { code } => {
      print_json(&store.items_by_species(&code).await?)?;
    }

    Command::Ticket { number } => {
      print_json(&store.items_by_fish_ticket(&number).await?)?;
    }

    Command::Area { iphc_area } => {
      print_json(&store.stat_areas_by_iphc(&iphc_area).await?)?;
    }

    Command::Delete { id } => {
      if store.delete_report(id).await? {
        tracing::info!(report_id = id, "deleted");
      } else {
        anyhow::bail!("report {id} not found");
      }
    }

    Command::SyncState => {
      print_json(&store.sync_state().await?)?;
    }

    Command::MarkSynced { at } => {
      let state = store.set_last_sync(at.unwrap_or_else(Utc::now)).await?;
      print_json(&state)?;
    }

    // Handled before the store is opened.
    Command::Schema { .. } => {}
  }

  Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
  let out = serde_json::to_string_pretty(value).context("serialising output")?;
  println!("{out}");
  Ok(())
}

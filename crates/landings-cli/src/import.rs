//! Bulk import of saved upstream documents into a store.
//!
//! Files are named `landing_report_<id>.json` (the JSON document form) or
//! `landing_report_<id>.xml` (the upstream XML). Each report is upserted on
//! its own, so one bad file does not stop the rest.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, bail};
use chrono::Utc;
use landings_core::{document, report::ReportBundle, store::LandingStore, xml};
use serde::Serialize;

const FILE_PREFIX: &str = "landing_report_";

#[derive(Debug, Clone)]
pub struct ImportOptions {
  pub data_dir:      PathBuf,
  pub batch_size:    usize,
  /// Skip files whose id is already stored.
  pub skip_existing: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSummary {
  pub total:    usize,
  pub imported: usize,
  pub skipped:  usize,
  pub failed:   Vec<ImportFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportFailure {
  pub file:  PathBuf,
  pub error: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
  Json,
  Xml,
}

/// A candidate file, with the id encoded in its name when there is one.
struct Candidate {
  path:   PathBuf,
  format: Format,
  id:     Option<i64>,
}

fn candidate(path: PathBuf) -> Option<Candidate> {
  let format = match path.extension()?.to_str()? {
    "json" => Format::Json,
    "xml" => Format::Xml,
    _ => return None,
  };
  let stem = path.file_stem()?.to_str()?;
  let id = stem.strip_prefix(FILE_PREFIX)?.parse().ok();
  Some(Candidate { path, format, id })
}

async fn scan(dir: &Path) -> anyhow::Result<Vec<Candidate>> {
  if !tokio::fs::try_exists(dir).await.unwrap_or(false) {
    bail!("data directory not found: {}", dir.display());
  }

  let mut entries = tokio::fs::read_dir(dir)
    .await
    .with_context(|| format!("reading {}", dir.display()))?;

  let mut found = Vec::new();
  while let Some(entry) = entries.next_entry().await? {
    if let Some(c) = candidate(entry.path()) {
      found.push(c);
    }
  }
  found.sort_by(|a, b| a.path.cmp(&b.path));
  Ok(found)
}

async fn load(c: &Candidate) -> anyhow::Result<ReportBundle> {
  let bytes = tokio::fs::read(&c.path).await?;
  let text = String::from_utf8_lossy(&bytes);

  let doc = match c.format {
    Format::Json => serde_json::from_str(&text)?,
    Format::Xml => xml::document_from_xml(&text)?,
  };
  Ok(document::flatten(&doc)?)
}

/// Import every landing report document in `opts.data_dir`.
///
/// When at least one report was written, the sync cursor is moved to now.
pub async fn import_dir<S: LandingStore>(
  store: &S,
  opts: &ImportOptions,
) -> anyhow::Result<ImportSummary> {
  let candidates = scan(&opts.data_dir).await?;
  let existing = if opts.skip_existing {
    store.existing_report_ids().await?
  } else {
    Default::default()
  };

  let mut summary = ImportSummary { total: candidates.len(), ..Default::default() };
  if summary.total == 0 {
    tracing::info!(dir = %opts.data_dir.display(), "no landing report files found");
    return Ok(summary);
  }
  tracing::info!(
    total = summary.total,
    already_stored = existing.len(),
    "importing landing reports"
  );

  let every = opts.batch_size.max(1);
  for (i, c) in candidates.iter().enumerate() {
    if c.id.is_some_and(|id| existing.contains(&id)) {
      summary.skipped += 1;
    } else {
      let result = match load(c).await {
        Ok(bundle) => store.upsert_report(bundle).await.map_err(anyhow::Error::from),
        Err(e) => Err(e),
      };
      match result {
        Ok(stored) => {
          tracing::debug!(report_id = stored.report.id, file = %c.path.display(), "imported");
          summary.imported += 1;
        }
        Err(e) => {
          tracing::warn!(file = %c.path.display(), error = %e, "import failed");
          summary.failed.push(ImportFailure { file: c.path.clone(), error: e.to_string() });
        }
      }
    }

    let done = i + 1;
    if done % every == 0 || done == summary.total {
      tracing::info!(
        progress = %format!("{done}/{}", summary.total),
        imported = summary.imported,
        skipped = summary.skipped,
        failed = summary.failed.len(),
        "import progress"
      );
    }
  }

  if summary.imported > 0 {
    store.set_last_sync(Utc::now()).await?;
    tracing::info!("sync state updated");
  }

  Ok(summary)
}

#[cfg(test)]
mod tests {
  use landings_store_sqlite::SqliteStore;
  use serde_json::json;

  use super::*;

  fn write(dir: &Path, name: &str, contents: &str) {
    std::fs::write(dir.join(name), contents).unwrap();
  }

  fn json_doc(id: i64) -> String {
    json!({
      "landing_report_id": id.to_string(),
      "header": { "vessel": { "@name": "NORTHERN DAWN", "#text": "54321" } },
      "line_item": { "item_number": "1", "species": { "@name": "Halibut", "#text": "200" }, "weight": "12.5" }
    })
    .to_string()
  }

  fn opts(dir: &Path, skip_existing: bool) -> ImportOptions {
    ImportOptions { data_dir: dir.to_path_buf(), batch_size: 1, skip_existing }
  }

  #[test]
  fn candidates_need_prefix_and_known_extension() {
    let c = candidate(PathBuf::from("d/landing_report_12.json")).unwrap();
    assert_eq!(c.format, Format::Json);
    assert_eq!(c.id, Some(12));

    let c = candidate(PathBuf::from("d/landing_report_x.xml")).unwrap();
    assert_eq!(c.format, Format::Xml);
    assert_eq!(c.id, None);

    assert!(candidate(PathBuf::from("d/.sync_state.json")).is_none());
    assert!(candidate(PathBuf::from("d/landing_report_1.txt")).is_none());
  }

  #[tokio::test]
  async fn imports_json_and_xml_and_records_sync() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "landing_report_1.json", &json_doc(1));
    write(
      dir.path(),
      "landing_report_2.xml",
      "<landing_report><landing_report_id>2</landing_report_id>\
       <line_item><item_number>1</item_number><weight>3</weight></line_item>\
       </landing_report>",
    );
    write(dir.path(), "notes.txt", "ignored");

    let store = SqliteStore::open_in_memory().await.unwrap();
    let summary = import_dir(&store, &opts(dir.path(), true)).await.unwrap();

    assert_eq!(summary.total, 2);
    assert_eq!(summary.imported, 2);
    assert!(summary.failed.is_empty());

    let ids: Vec<_> = store.existing_report_ids().await.unwrap().into_iter().collect();
    assert_eq!(ids, [1, 2]);
    assert!(store.sync_state().await.unwrap().last_sync.is_some());

    let bundle = store.get_report_bundle(1).await.unwrap().unwrap();
    assert_eq!(bundle.items[0].weight.unwrap().to_string(), "12.5000");
  }

  #[tokio::test]
  async fn skips_stored_ids_and_reports_failures() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "landing_report_1.json", &json_doc(1));
    write(dir.path(), "landing_report_2.json", "{ not json");

    let store = SqliteStore::open_in_memory().await.unwrap();
    let first = import_dir(&store, &opts(dir.path(), true)).await.unwrap();
    assert_eq!(first.imported, 1);
    assert_eq!(first.failed.len(), 1);
    assert!(first.failed[0].file.ends_with("landing_report_2.json"));

    let second = import_dir(&store, &opts(dir.path(), true)).await.unwrap();
    assert_eq!(second.skipped, 1);
    assert_eq!(second.imported, 0);

    let forced = import_dir(&store, &opts(dir.path(), false)).await.unwrap();
    assert_eq!(forced.imported, 1);
    assert_eq!(forced.skipped, 0);
  }

  #[tokio::test]
  async fn nothing_imported_leaves_sync_state_alone() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open_in_memory().await.unwrap();

    let summary = import_dir(&store, &opts(dir.path(), true)).await.unwrap();
    assert_eq!(summary.total, 0);
    assert!(store.sync_state().await.unwrap().last_sync.is_none());
  }

  #[tokio::test]
  async fn missing_directory_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open_in_memory().await.unwrap();

    let err = import_dir(&store, &opts(&dir.path().join("absent"), true)).await;
    assert!(err.is_err());
  }
}

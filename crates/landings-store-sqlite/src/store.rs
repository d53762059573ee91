//! [`SqliteStore`], the SQLite implementation of [`LandingStore`].

use std::{collections::BTreeSet, path::Path};

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, Transaction};

use landings_core::{
  report::{
    ChildList, LandingReportItem, LandingReportStatArea, ReportBundle,
    StoredBundle, StoredReport,
  },
  store::{BatchOutcome, LandingStore, ReportQuery, ReportSummary, SpeciesLanding},
  sync::{SYNC_STATE_ID, SyncState},
};

use crate::{
  Error, Result,
  encode::{
    AREA_COLUMNS, ITEM_COLUMNS, RawItem, RawReport, RawSpeciesLanding,
    RawStoredReport, RawSummary, REPORT_COLUMNS, SUMMARY_COLUMNS, decode_dt,
    decode_raw, encode_dt, read_area,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A landing report store backed by a single SQLite file.
///
/// Clones share the inner connection.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

/// A bundle encoded to column values, ready to move onto the connection
/// thread.
struct EncodedBundle {
  report: RawReport,
  items:  Vec<RawItem>,
  areas:  Vec<LandingReportStatArea>,
}

impl EncodedBundle {
  fn encode(bundle: &ReportBundle) -> Result<Self> {
    Ok(Self {
      report: RawReport::encode(&bundle.report)?,
      items:  bundle.items.iter().map(RawItem::encode).collect::<Result<_>>()?,
      areas:  bundle.stat_areas.clone(),
    })
  }
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Transaction bodies ──────────────────────────────────────────────────────

/// Upsert the report row and replace both child lists. Returns the row's
/// `created_at`, which survives the update.
fn write_bundle(
  tx: &Transaction<'_>,
  bundle: &EncodedBundle,
  now: &str,
) -> rusqlite::Result<String> {
  let r = &bundle.report;

  let created_at: String = tx.query_row(
    "INSERT INTO landing_reports (
       id, report_type, report_type_name, status, status_desc,
       vessel_adfg_number, vessel_name, port_code, port_name,
       gear_code, gear_name, date_of_landing, date_fishing_began, crew_size,
       processor_code, processor_name, fish_ticket_number,
       data_entry_user, data_entry_date, last_change_user, last_change_date,
       raw_json, created_at, updated_at
     ) VALUES (
       ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
       ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?23
     )
     ON CONFLICT (id) DO UPDATE SET
       report_type        = excluded.report_type,
       report_type_name   = excluded.report_type_name,
       status             = excluded.status,
       status_desc        = excluded.status_desc,
       vessel_adfg_number = excluded.vessel_adfg_number,
       vessel_name        = excluded.vessel_name,
       port_code          = excluded.port_code,
       port_name          = excluded.port_name,
       gear_code          = excluded.gear_code,
       gear_name          = excluded.gear_name,
       date_of_landing    = excluded.date_of_landing,
       date_fishing_began = excluded.date_fishing_began,
       crew_size          = excluded.crew_size,
       processor_code     = excluded.processor_code,
       processor_name     = excluded.processor_name,
       fish_ticket_number = excluded.fish_ticket_number,
       data_entry_user    = excluded.data_entry_user,
       data_entry_date    = excluded.data_entry_date,
       last_change_user   = excluded.last_change_user,
       last_change_date   = excluded.last_change_date,
       raw_json           = excluded.raw_json,
       updated_at         = excluded.updated_at
     RETURNING created_at",
    rusqlite::params![
      r.id,
      r.report_type,
      r.report_type_name,
      r.status,
      r.status_desc,
      r.vessel_adfg_number,
      r.vessel_name,
      r.port_code,
      r.port_name,
      r.gear_code,
      r.gear_name,
      r.date_of_landing,
      r.date_fishing_began,
      r.crew_size,
      r.processor_code,
      r.processor_name,
      r.fish_ticket_number,
      r.data_entry_user,
      r.data_entry_date,
      r.last_change_user,
      r.last_change_date,
      r.raw_json,
      now,
    ],
    |row| row.get(0),
  )?;

  tx.execute(
    "DELETE FROM landing_report_items WHERE landing_report_id = ?1",
    rusqlite::params![r.id],
  )?;
  tx.execute(
    "DELETE FROM landing_report_stat_areas WHERE landing_report_id = ?1",
    rusqlite::params![r.id],
  )?;

  for item in &bundle.items {
    insert_item_row(tx, item)?;
  }
  for area in &bundle.areas {
    insert_area_row(tx, area)?;
  }

  Ok(created_at)
}

fn insert_item_row(conn: &rusqlite::Connection, item: &RawItem) -> rusqlite::Result<()> {
  let mut stmt = conn.prepare_cached(
    "INSERT INTO landing_report_items (
       landing_report_id, item_number, species_code, species_name,
       condition_code, condition_name, disposition_code, disposition_name,
       weight, fish_ticket_number
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
  )?;
  stmt.execute(rusqlite::params![
    item.landing_report_id,
    item.item_number,
    item.species_code,
    item.species_name,
    item.condition_code,
    item.condition_name,
    item.disposition_code,
    item.disposition_name,
    item.weight,
    item.fish_ticket_number,
  ])?;
  Ok(())
}

fn insert_area_row(
  conn: &rusqlite::Connection,
  area: &LandingReportStatArea,
) -> rusqlite::Result<()> {
  let mut stmt = conn.prepare_cached(
    "INSERT INTO landing_report_stat_areas (
       landing_report_id, item_number, stat_area, fed_area, iphc_area, percent
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
  )?;
  stmt.execute(rusqlite::params![
    area.landing_report_id,
    area.item_number,
    area.stat_area,
    area.fed_area,
    area.iphc_area,
    area.percent,
  ])?;
  Ok(())
}

// ─── LandingStore impl ───────────────────────────────────────────────────────

impl LandingStore for SqliteStore {
  type Error = Error;

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn upsert_report(&self, bundle: ReportBundle) -> Result<StoredReport> {
    bundle.validate()?;

    let encoded = EncodedBundle::encode(&bundle)?;
    let now     = Utc::now();
    let now_str = encode_dt(now);

    let created_at: String = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let created_at = write_bundle(&tx, &encoded, &now_str)?;
        tx.commit()?;
        Ok(created_at)
      })
      .await?;

    tracing::debug!(
      report_id = bundle.report.id,
      items = bundle.items.len(),
      stat_areas = bundle.stat_areas.len(),
      "upserted landing report"
    );

    Ok(StoredReport {
      report:     bundle.report,
      created_at: decode_dt(&created_at)?,
      updated_at: now,
    })
  }

  async fn upsert_batch(&self, bundles: Vec<ReportBundle>) -> Result<BatchOutcome> {
    let mut outcome = BatchOutcome::default();
    let mut encoded = Vec::with_capacity(bundles.len());
    for bundle in &bundles {
      bundle.validate()?;
      outcome.reports += 1;
      outcome.items += bundle.items.len();
      outcome.stat_areas += bundle.stat_areas.len();
      encoded.push(EncodedBundle::encode(bundle)?);
    }

    let now_str = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        for bundle in &encoded {
          write_bundle(&tx, bundle, &now_str)?;
        }
        tx.commit()?;
        Ok(())
      })
      .await?;

    tracing::debug!(
      reports = outcome.reports,
      items = outcome.items,
      stat_areas = outcome.stat_areas,
      "upserted landing report batch"
    );

    Ok(outcome)
  }

  async fn insert_item(&self, item: LandingReportItem) -> Result<()> {
    let report_id   = item.landing_report_id;
    let item_number = item.item_number;
    let raw         = RawItem::encode(&item)?;

    self
      .conn
      .call(move |conn| Ok(insert_item_row(conn, &raw)?))
      .await
      .map_err(|e| Error::child_insert(e, report_id, ChildList::Items, item_number))
  }

  async fn insert_stat_area(&self, area: LandingReportStatArea) -> Result<()> {
    let report_id   = area.landing_report_id;
    let item_number = area.item_number;

    self
      .conn
      .call(move |conn| Ok(insert_area_row(conn, &area)?))
      .await
      .map_err(|e| {
        Error::child_insert(e, report_id, ChildList::StatAreas, item_number)
      })
  }

  async fn delete_report(&self, id: i64) -> Result<bool> {
    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM landing_reports WHERE id = ?1",
          rusqlite::params![id],
        )?)
      })
      .await?;

    if removed > 0 {
      tracing::info!(report_id = id, "deleted landing report and its child rows");
    }
    Ok(removed > 0)
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get_report(&self, id: i64) -> Result<Option<StoredReport>> {
    let raw: Option<RawStoredReport> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {REPORT_COLUMNS} FROM landing_reports WHERE id = ?1"),
            rusqlite::params![id],
            RawStoredReport::read,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawStoredReport::into_stored).transpose()
  }

  async fn get_raw_document(&self, id: i64) -> Result<Option<serde_json::Value>> {
    let raw: Option<Option<String>> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT raw_json FROM landing_reports WHERE id = ?1",
            rusqlite::params![id],
            |row| row.get(0),
          )
          .optional()?)
      })
      .await?;

    raw.map(|doc| decode_raw(doc.as_deref())).transpose()
  }

  async fn get_report_bundle(&self, id: i64) -> Result<Option<StoredBundle>> {
    type Raw = (RawStoredReport, Vec<RawItem>, Vec<LandingReportStatArea>);

    let raw: Option<Raw> = self
      .conn
      .call(move |conn| {
        // One read transaction so the three lists come from the same write.
        let tx = conn.transaction()?;

        let report = tx
          .query_row(
            &format!("SELECT {REPORT_COLUMNS} FROM landing_reports WHERE id = ?1"),
            rusqlite::params![id],
            RawStoredReport::read,
          )
          .optional()?;
        let Some(report) = report else {
          return Ok(None);
        };

        let items = tx
          .prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM landing_report_items
             WHERE landing_report_id = ?1 ORDER BY item_number"
          ))?
          .query_map(rusqlite::params![id], RawItem::read)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let areas = tx
          .prepare(&format!(
            "SELECT {AREA_COLUMNS} FROM landing_report_stat_areas
             WHERE landing_report_id = ?1 ORDER BY item_number"
          ))?
          .query_map(rusqlite::params![id], read_area)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Some((report, items, areas)))
      })
      .await?;

    let Some((report, items, stat_areas)) = raw else {
      return Ok(None);
    };

    Ok(Some(StoredBundle {
      report: report.into_stored()?,
      items: items.into_iter().map(RawItem::into_item).collect::<Result<_>>()?,
      stat_areas,
    }))
  }

  async fn list_reports(&self, query: &ReportQuery) -> Result<Vec<ReportSummary>> {
    let vessel      = query.vessel_adfg_number.clone();
    let port        = query.port_code.clone();
    let status      = query.status.clone();
    let report_type = query.report_type.clone();
    let from        = query.landed_from.map(crate::encode::encode_date);
    let until       = query.landed_until.map(crate::encode::encode_date);
    // SQLite treats a negative LIMIT as "no limit".
    let limit_val   = query.limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
    let offset_val  = query.offset.map_or(0, |o| i64::try_from(o).unwrap_or(i64::MAX));

    let raws: Vec<RawSummary> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SUMMARY_COLUMNS} FROM landing_reports
           WHERE (?1 IS NULL OR vessel_adfg_number = ?1)
             AND (?2 IS NULL OR port_code = ?2)
             AND (?3 IS NULL OR status = ?3)
             AND (?4 IS NULL OR report_type = ?4)
             AND (?5 IS NULL OR date_of_landing >= ?5)
             AND (?6 IS NULL OR date_of_landing <= ?6)
           ORDER BY date_of_landing DESC, id DESC
           LIMIT ?7 OFFSET ?8"
        ))?;

        let rows = stmt
          .query_map(
            rusqlite::params![
              vessel, port, status, report_type, from, until, limit_val, offset_val,
            ],
            RawSummary::read,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSummary::into_summary).collect()
  }

  async fn reports_by_vessel(&self, vessel_adfg_number: &str) -> Result<Vec<StoredReport>> {
    let vessel = vessel_adfg_number.to_owned();

    let raws: Vec<RawStoredReport> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {REPORT_COLUMNS} FROM landing_reports
           WHERE vessel_adfg_number = ?1
           ORDER BY date_of_landing DESC, id DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![vessel], RawStoredReport::read)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawStoredReport::into_stored).collect()
  }

  async fn items_by_species(&self, species_code: &str) -> Result<Vec<SpeciesLanding>> {
    let species = species_code.to_owned();

    let raws: Vec<RawSpeciesLanding> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT
             i.landing_report_id, i.item_number, i.species_code, i.species_name,
             i.condition_code, i.condition_name, i.disposition_code, i.disposition_name,
             i.weight, i.fish_ticket_number,
             r.vessel_name, r.port_name, r.date_of_landing
           FROM landing_report_items i
           JOIN landing_reports r ON r.id = i.landing_report_id
           WHERE i.species_code = ?1
           ORDER BY r.date_of_landing DESC, i.landing_report_id, i.item_number",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![species], RawSpeciesLanding::read)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSpeciesLanding::into_landing).collect()
  }

  async fn items_by_fish_ticket(&self, fish_ticket_number: &str) -> Result<Vec<LandingReportItem>> {
    let ticket = fish_ticket_number.to_owned();

    let raws: Vec<RawItem> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ITEM_COLUMNS} FROM landing_report_items
           WHERE fish_ticket_number = ?1
           ORDER BY landing_report_id, item_number"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![ticket], RawItem::read)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawItem::into_item).collect()
  }

  async fn stat_areas_by_iphc(&self, iphc_area: &str) -> Result<Vec<LandingReportStatArea>> {
    let area = iphc_area.to_owned();

    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {AREA_COLUMNS} FROM landing_report_stat_areas
           WHERE iphc_area = ?1
           ORDER BY landing_report_id, item_number"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![area], read_area)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(rows)
  }

  async fn existing_report_ids(&self) -> Result<BTreeSet<i64>> {
    let ids = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare("SELECT id FROM landing_reports")?;
        let ids = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<BTreeSet<i64>>>()?;
        Ok(ids)
      })
      .await?;

    Ok(ids)
  }

  // ── Sync cursor ───────────────────────────────────────────────────────────

  async fn sync_state(&self) -> Result<SyncState> {
    let row: Option<Option<String>> = self
      .conn
      .call(|conn| {
        Ok(conn
          .query_row(
            "SELECT last_sync FROM sync_state WHERE id = ?1",
            rusqlite::params![SYNC_STATE_ID],
            |row| row.get(0),
          )
          .optional()?)
      })
      .await?;

    let last_sync = row.ok_or(Error::SyncStateMissing)?;
    Ok(SyncState {
      last_sync: last_sync.as_deref().map(decode_dt).transpose()?,
    })
  }

  async fn set_last_sync(&self, at: DateTime<Utc>) -> Result<SyncState> {
    let at_str = encode_dt(at);

    let updated = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE sync_state SET last_sync = ?1 WHERE id = ?2",
          rusqlite::params![at_str, SYNC_STATE_ID],
        )?)
      })
      .await?;

    if updated == 0 {
      return Err(Error::SyncStateMissing);
    }

    tracing::debug!(last_sync = %at, "recorded sync");
    Ok(SyncState { last_sync: Some(at) })
  }
}

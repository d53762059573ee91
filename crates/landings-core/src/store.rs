//! The `LandingStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g.
//! `landings-store-sqlite`). The CLI depends on this abstraction, not on any
//! concrete backend.

use std::{collections::BTreeSet, future::Future};

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  report::{
    Coded, LandingReportItem, LandingReportStatArea, ReportBundle,
    StoredBundle, StoredReport,
  },
  sync::SyncState,
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Parameters for [`LandingStore::list_reports`]. Every set field narrows
/// the result; results are ordered by landing date, newest first.
#[derive(Debug, Clone, Default)]
pub struct ReportQuery {
  pub vessel_adfg_number: Option<String>,
  pub port_code:          Option<String>,
  pub status:             Option<String>,
  pub report_type:        Option<String>,
  /// Inclusive lower bound on `date_of_landing`.
  pub landed_from:        Option<NaiveDate>,
  /// Inclusive upper bound on `date_of_landing`.
  pub landed_until:       Option<NaiveDate>,
  pub limit:              Option<usize>,
  pub offset:             Option<usize>,
}

/// The lightweight listing row: identifying columns without the raw
/// document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
  pub id:                 i64,
  pub report_type:        Coded,
  pub status:             Coded,
  pub vessel:             Coded,
  pub port:               Coded,
  pub gear:               Coded,
  pub date_of_landing:    Option<NaiveDate>,
  pub fish_ticket_number: Option<String>,
  pub last_change_date:   Option<DateTime<FixedOffset>>,
}

/// A line item joined with where and when it was landed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesLanding {
  #[serde(flatten)]
  pub item:            LandingReportItem,
  pub vessel_name:     Option<String>,
  pub port_name:       Option<String>,
  pub date_of_landing: Option<NaiveDate>,
}

/// Counts reported by a batch upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
  pub reports:    usize,
  pub items:      usize,
  pub stat_areas: usize,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a landing report store backend.
///
/// Report writes are upserts keyed by the upstream report id. A report and
/// its child lists are always written together: a reader sees either the
/// whole report or none of it.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait LandingStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Insert or update a report and replace both of its child lists, in one
  /// transaction. `created_at` survives the update; `updated_at` is set to
  /// now.
  fn upsert_report(
    &self,
    bundle: ReportBundle,
  ) -> impl Future<Output = Result<StoredReport, Self::Error>> + Send + '_;

  /// Upsert many reports in one transaction. Every bundle is validated
  /// before anything is written.
  fn upsert_batch(
    &self,
    bundles: Vec<ReportBundle>,
  ) -> impl Future<Output = Result<BatchOutcome, Self::Error>> + Send + '_;

  /// Insert a single line item. Fails if the ordinal is taken or the parent
  /// report does not exist.
  fn insert_item(
    &self,
    item: LandingReportItem,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Insert a single stat-area row. Same failure modes as
  /// [`LandingStore::insert_item`].
  fn insert_stat_area(
    &self,
    area: LandingReportStatArea,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Delete a report and, by cascade, all of its child rows. Returns
  /// whether a report was removed.
  fn delete_report(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  fn get_report(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<StoredReport>, Self::Error>> + Send + '_;

  /// The verbatim upstream document for a report.
  fn get_raw_document(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<serde_json::Value>, Self::Error>>
  + Send
  + '_;

  /// A report with its items and stat areas, each ordered by `item_number`.
  fn get_report_bundle(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<StoredBundle>, Self::Error>> + Send + '_;

  fn list_reports<'a>(
    &'a self,
    query: &'a ReportQuery,
  ) -> impl Future<Output = Result<Vec<ReportSummary>, Self::Error>> + Send + 'a;

  /// Every report for one ADF&G vessel number, newest landing first.
  fn reports_by_vessel<'a>(
    &'a self,
    vessel_adfg_number: &'a str,
  ) -> impl Future<Output = Result<Vec<StoredReport>, Self::Error>> + Send + 'a;

  fn items_by_species<'a>(
    &'a self,
    species_code: &'a str,
  ) -> impl Future<Output = Result<Vec<SpeciesLanding>, Self::Error>> + Send + 'a;

  fn items_by_fish_ticket<'a>(
    &'a self,
    fish_ticket_number: &'a str,
  ) -> impl Future<Output = Result<Vec<LandingReportItem>, Self::Error>> + Send + 'a;

  fn stat_areas_by_iphc<'a>(
    &'a self,
    iphc_area: &'a str,
  ) -> impl Future<Output = Result<Vec<LandingReportStatArea>, Self::Error>>
  + Send
  + 'a;

  fn existing_report_ids(
    &self,
  ) -> impl Future<Output = Result<BTreeSet<i64>, Self::Error>> + Send + '_;

  // ── Sync cursor ───────────────────────────────────────────────────────

  fn sync_state(
    &self,
  ) -> impl Future<Output = Result<SyncState, Self::Error>> + Send + '_;

  /// Record a completed sync. Updates the singleton row in place.
  fn set_last_sync(
    &self,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<SyncState, Self::Error>> + Send + '_;
}

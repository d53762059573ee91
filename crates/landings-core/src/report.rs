//! Landing report rows: the normalized form of an upstream eLandings
//! document.
//!
//! A report owns two child lists, line items and statistical-area
//! allocations. Each list numbers its rows independently with
//! `item_number`; the two numberings never interact.

use std::{collections::HashSet, fmt};

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Fractional digits kept for catch weights.
pub const WEIGHT_SCALE: u32 = 4;

/// Integer digits a catch weight may use (`NUMERIC(12, 4)`).
pub const WEIGHT_INTEGER_DIGITS: u32 = 8;

// ─── Coded values ────────────────────────────────────────────────────────────

/// A (code, label) pair copied verbatim from an upstream code list.
///
/// Neither half is validated locally; the store must accept codes it has
/// never seen before.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coded {
  pub code: Option<String>,
  pub name: Option<String>,
}

impl Coded {
  pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
    Self { code: Some(code.into()), name: Some(name.into()) }
  }
}

// ─── Weight ──────────────────────────────────────────────────────────────────

/// Round a weight to the fixed four-digit scale stored in the database.
///
/// Midpoints round away from zero, matching `NUMERIC(12, 4)` in Postgres.
/// Weights that cannot be held at that scale, or whose integer part needs
/// more than [`WEIGHT_INTEGER_DIGITS`] digits, are rejected.
pub fn normalize_weight(weight: Decimal) -> Result<Decimal> {
  let mut w = weight
    .round_dp_with_strategy(WEIGHT_SCALE, RoundingStrategy::MidpointAwayFromZero);
  w.rescale(WEIGHT_SCALE);

  let limit = Decimal::from(10_i64.pow(WEIGHT_INTEGER_DIGITS));
  if w.scale() != WEIGHT_SCALE || w.abs() >= limit {
    return Err(Error::InvalidField { field: "weight", value: weight.to_string() });
  }
  Ok(w)
}

// ─── Rows ────────────────────────────────────────────────────────────────────

/// One landing report, keyed by the upstream id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandingReport {
  /// Upstream primary key; stable across syncs and never generated locally.
  pub id:                 i64,
  pub report_type:        Coded,
  /// Status code and its `desc` label.
  pub status:             Coded,
  /// ADF&G vessel number and vessel name. Informational only.
  pub vessel:             Coded,
  pub port:               Coded,
  pub gear:               Coded,
  pub processor:          Coded,
  pub date_of_landing:    Option<NaiveDate>,
  pub date_fishing_began: Option<NaiveDate>,
  pub crew_size:          Option<i32>,
  pub fish_ticket_number: Option<String>,
  pub data_entry_user:    Option<String>,
  pub data_entry_date:    Option<DateTime<FixedOffset>>,
  pub last_change_user:   Option<String>,
  pub last_change_date:   Option<DateTime<FixedOffset>>,
  /// The full upstream document, retained verbatim.
  pub raw_json:           serde_json::Value,
}

impl LandingReport {
  /// A report with only its id set; every other column is empty.
  pub fn new(id: i64) -> Self {
    Self {
      id,
      report_type: Coded::default(),
      status: Coded::default(),
      vessel: Coded::default(),
      port: Coded::default(),
      gear: Coded::default(),
      processor: Coded::default(),
      date_of_landing: None,
      date_fishing_began: None,
      crew_size: None,
      fish_ticket_number: None,
      data_entry_user: None,
      data_entry_date: None,
      last_change_user: None,
      last_change_date: None,
      raw_json: serde_json::Value::Null,
    }
  }
}

/// A report as persisted, with the store's bookkeeping timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReport {
  #[serde(flatten)]
  pub report:     LandingReport,
  /// Set on first insert; never changes afterwards.
  pub created_at: DateTime<Utc>,
  /// Refreshed by the store on every upsert.
  pub updated_at: DateTime<Utc>,
}

/// One species/weight/disposition line of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandingReportItem {
  pub landing_report_id:  i64,
  /// Ordinal within the report's item list.
  pub item_number:        i32,
  pub species:            Coded,
  pub condition:          Coded,
  pub disposition:        Coded,
  /// Pounds, at [`WEIGHT_SCALE`] fractional digits.
  pub weight:             Option<Decimal>,
  /// May differ between items of the same report.
  pub fish_ticket_number: Option<String>,
}

impl LandingReportItem {
  /// Check that the weight, if any, fits the stored precision.
  pub fn validate(&self) -> Result<()> {
    if let Some(w) = self.weight {
      normalize_weight(w)?;
    }
    Ok(())
  }

  pub fn new(landing_report_id: i64, item_number: i32) -> Self {
    Self {
      landing_report_id,
      item_number,
      species: Coded::default(),
      condition: Coded::default(),
      disposition: Coded::default(),
      weight: None,
      fish_ticket_number: None,
    }
  }
}

/// Allocation of a report's catch to a statistical area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandingReportStatArea {
  pub landing_report_id: i64,
  /// Ordinal within the report's area list, independent of item numbers.
  pub item_number:       i32,
  /// ADF&G statistical area.
  pub stat_area:         Option<String>,
  pub fed_area:          Option<String>,
  pub iphc_area:         Option<String>,
  /// Share of the catch; a report's percentages need not sum to 100.
  pub percent:           Option<i32>,
}

impl LandingReportStatArea {
  pub fn new(landing_report_id: i64, item_number: i32) -> Self {
    Self {
      landing_report_id,
      item_number,
      stat_area: None,
      fed_area: None,
      iphc_area: None,
      percent: None,
    }
  }
}

// ─── Bundles ─────────────────────────────────────────────────────────────────

/// Which child list of a report a row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChildList {
  Items,
  StatAreas,
}

impl fmt::Display for ChildList {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Items => f.write_str("line item"),
      Self::StatAreas => f.write_str("stat area"),
    }
  }
}

/// The unit of ingestion: a report plus its ordered child lists.
/// Written atomically by [`crate::store::LandingStore::upsert_report`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportBundle {
  pub report:     LandingReport,
  pub items:      Vec<LandingReportItem>,
  pub stat_areas: Vec<LandingReportStatArea>,
}

impl ReportBundle {
  pub fn new(report: LandingReport) -> Self {
    Self { report, items: Vec::new(), stat_areas: Vec::new() }
  }

  pub fn id(&self) -> i64 { self.report.id }

  /// Check the constraints the store would otherwise reject mid-write:
  /// every child points at this report, no ordinal repeats within a list,
  /// and every weight fits the stored precision.
  pub fn validate(&self) -> Result<()> {
    let report_id = self.report.id;

    for item in &self.items {
      item.validate()?;
    }

    let items = self.items.iter().map(|i| (i.landing_report_id, i.item_number));
    check_list(report_id, ChildList::Items, items)?;

    let areas = self
      .stat_areas
      .iter()
      .map(|a| (a.landing_report_id, a.item_number));
    check_list(report_id, ChildList::StatAreas, areas)
  }

  pub fn total_weight(&self) -> Decimal { total_weight(&self.items) }

  pub fn species_names(&self) -> Vec<String> { species_names(&self.items) }
}

/// A persisted report with its child rows, ordered by `item_number`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredBundle {
  pub report:     StoredReport,
  pub items:      Vec<LandingReportItem>,
  pub stat_areas: Vec<LandingReportStatArea>,
}

impl StoredBundle {
  pub fn total_weight(&self) -> Decimal { total_weight(&self.items) }

  pub fn species_names(&self) -> Vec<String> { species_names(&self.items) }
}

fn check_list(
  report_id: i64,
  list: ChildList,
  rows: impl Iterator<Item = (i64, i32)>,
) -> Result<()> {
  let mut seen = HashSet::new();
  for (parent, item_number) in rows {
    if parent != report_id {
      return Err(Error::ParentMismatch { report_id, list, found: parent });
    }
    if !seen.insert(item_number) {
      return Err(Error::DuplicateOrdinal { report_id, list, item_number });
    }
  }
  Ok(())
}

/// Sum of item weights; items without a weight count as zero.
pub fn total_weight(items: &[LandingReportItem]) -> Decimal {
  items.iter().filter_map(|i| i.weight).sum()
}

/// Distinct species labels in item order.
pub fn species_names(items: &[LandingReportItem]) -> Vec<String> {
  let mut names: Vec<String> = Vec::new();
  for name in items.iter().filter_map(|i| i.species.name.as_deref()) {
    if !names.iter().any(|n| n == name) {
      names.push(name.to_owned());
    }
  }
  names
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use super::*;

  fn dec(s: &str) -> Decimal { Decimal::from_str(s).unwrap() }

  #[test]
  fn weight_is_rounded_to_four_places() {
    assert_eq!(normalize_weight(dec("12.34567")).unwrap().to_string(), "12.3457");
    assert_eq!(normalize_weight(dec("1.00005")).unwrap().to_string(), "1.0001");
    assert_eq!(normalize_weight(dec("1500")).unwrap().to_string(), "1500.0000");
    assert_eq!(
      normalize_weight(dec("99999999.99994")).unwrap().to_string(),
      "99999999.9999"
    );
  }

  #[test]
  fn weight_beyond_eight_integer_digits_is_rejected() {
    for w in ["100000000", "-100000000", "123456789012345.5", "99999999.99995"] {
      let err = normalize_weight(dec(w)).unwrap_err();
      assert!(matches!(err, Error::InvalidField { field: "weight", .. }), "{w}");
    }
  }

  #[test]
  fn weight_that_cannot_take_four_places_is_rejected() {
    let err = normalize_weight(Decimal::MAX).unwrap_err();
    assert!(matches!(err, Error::InvalidField { field: "weight", .. }));
  }

  #[test]
  fn validate_rejects_oversized_weight() {
    let mut bundle = ReportBundle::new(LandingReport::new(7));
    let mut item = LandingReportItem::new(7, 1);
    item.weight = Some(dec("123456789012345.5"));
    bundle.items.push(item);

    let err = bundle.validate().unwrap_err();
    assert!(matches!(err, Error::InvalidField { field: "weight", .. }));
  }

  #[test]
  fn validate_accepts_independent_numbering() {
    let mut bundle = ReportBundle::new(LandingReport::new(7));
    bundle.items.push(LandingReportItem::new(7, 1));
    bundle.items.push(LandingReportItem::new(7, 2));
    bundle.stat_areas.push(LandingReportStatArea::new(7, 1));
    assert!(bundle.validate().is_ok());
  }

  #[test]
  fn validate_rejects_repeated_item_number() {
    let mut bundle = ReportBundle::new(LandingReport::new(7));
    bundle.items.push(LandingReportItem::new(7, 1));
    bundle.items.push(LandingReportItem::new(7, 1));

    let err = bundle.validate().unwrap_err();
    assert!(matches!(
      err,
      Error::DuplicateOrdinal { list: ChildList::Items, item_number: 1, .. }
    ));
  }

  #[test]
  fn validate_rejects_foreign_child() {
    let mut bundle = ReportBundle::new(LandingReport::new(7));
    bundle.stat_areas.push(LandingReportStatArea::new(8, 1));

    let err = bundle.validate().unwrap_err();
    assert!(matches!(
      err,
      Error::ParentMismatch { list: ChildList::StatAreas, found: 8, .. }
    ));
  }

  #[test]
  fn totals_skip_missing_weights_and_repeat_species() {
    let mut a = LandingReportItem::new(1, 1);
    a.species = Coded::new("200", "Halibut");
    a.weight = Some(dec("100.5"));
    let mut b = LandingReportItem::new(1, 2);
    b.species = Coded::new("710", "Sablefish");
    let mut c = LandingReportItem::new(1, 3);
    c.species = Coded::new("200", "Halibut");
    c.weight = Some(dec("20.25"));

    let items = [a, b, c];
    assert_eq!(total_weight(&items), dec("120.75"));
    assert_eq!(species_names(&items), ["Halibut", "Sablefish"]);
  }
}

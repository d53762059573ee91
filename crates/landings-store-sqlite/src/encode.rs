//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Bookkeeping timestamps are RFC 3339 UTC strings; upstream timestamps are
//! RFC 3339 with their original offset. Dates are `YYYY-MM-DD`, so text
//! order is date order. Weights are decimal strings at the fixed scale.

use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use landings_core::report::{
  Coded, LandingReport, LandingReportItem, LandingReportStatArea, StoredReport,
  normalize_weight,
};
use landings_core::store::{ReportSummary, SpeciesLanding};
use rust_decimal::Decimal;

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── DateTime<FixedOffset> ───────────────────────────────────────────────────

pub fn encode_offset_dt(dt: DateTime<FixedOffset>) -> String { dt.to_rfc3339() }

pub fn decode_offset_dt(s: &str) -> Result<DateTime<FixedOffset>> {
  DateTime::parse_from_rfc3339(s).map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Weight ──────────────────────────────────────────────────────────────────

pub fn encode_weight(w: Decimal) -> Result<String> { Ok(normalize_weight(w)?.to_string()) }

pub fn decode_weight(s: &str) -> Result<Decimal> { Ok(Decimal::from_str(s)?) }

// ─── Raw document ────────────────────────────────────────────────────────────

pub fn encode_raw(doc: &serde_json::Value) -> Result<Option<String>> {
  if doc.is_null() {
    return Ok(None);
  }
  Ok(Some(serde_json::to_string(doc)?))
}

pub fn decode_raw(s: Option<&str>) -> Result<serde_json::Value> {
  match s {
    Some(s) => Ok(serde_json::from_str(s)?),
    None => Ok(serde_json::Value::Null),
  }
}

fn opt<T>(s: Option<String>, decode: impl Fn(&str) -> Result<T>) -> Result<Option<T>> {
  s.as_deref().map(decode).transpose()
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list shared by every query that reads a full report row.
pub const REPORT_COLUMNS: &str = "
  id, report_type, report_type_name, status, status_desc,
  vessel_adfg_number, vessel_name, port_code, port_name,
  gear_code, gear_name, date_of_landing, date_fishing_began, crew_size,
  processor_code, processor_name, fish_ticket_number,
  data_entry_user, data_entry_date, last_change_user, last_change_date,
  raw_json, created_at, updated_at";

/// A `landing_reports` row as column values, in [`REPORT_COLUMNS`] order
/// (minus the bookkeeping timestamps).
pub struct RawReport {
  pub id:                 i64,
  pub report_type:        Option<String>,
  pub report_type_name:   Option<String>,
  pub status:             Option<String>,
  pub status_desc:        Option<String>,
  pub vessel_adfg_number: Option<String>,
  pub vessel_name:        Option<String>,
  pub port_code:          Option<String>,
  pub port_name:          Option<String>,
  pub gear_code:          Option<String>,
  pub gear_name:          Option<String>,
  pub date_of_landing:    Option<String>,
  pub date_fishing_began: Option<String>,
  pub crew_size:          Option<i32>,
  pub processor_code:     Option<String>,
  pub processor_name:     Option<String>,
  pub fish_ticket_number: Option<String>,
  pub data_entry_user:    Option<String>,
  pub data_entry_date:    Option<String>,
  pub last_change_user:   Option<String>,
  pub last_change_date:   Option<String>,
  pub raw_json:           Option<String>,
}

impl RawReport {
  pub fn encode(r: &LandingReport) -> Result<Self> {
    let LandingReport {
      id,
      report_type,
      status,
      vessel,
      port,
      gear,
      processor,
      date_of_landing,
      date_fishing_began,
      crew_size,
      fish_ticket_number,
      data_entry_user,
      data_entry_date,
      last_change_user,
      last_change_date,
      raw_json,
    } = r.clone();

    Ok(Self {
      id,
      report_type: report_type.code,
      report_type_name: report_type.name,
      status: status.code,
      status_desc: status.name,
      vessel_adfg_number: vessel.code,
      vessel_name: vessel.name,
      port_code: port.code,
      port_name: port.name,
      gear_code: gear.code,
      gear_name: gear.name,
      date_of_landing: date_of_landing.map(encode_date),
      date_fishing_began: date_fishing_began.map(encode_date),
      crew_size,
      processor_code: processor.code,
      processor_name: processor.name,
      fish_ticket_number,
      data_entry_user,
      data_entry_date: data_entry_date.map(encode_offset_dt),
      last_change_user,
      last_change_date: last_change_date.map(encode_offset_dt),
      raw_json: encode_raw(&raw_json)?,
    })
  }

  /// Read the first 22 columns of a [`REPORT_COLUMNS`] row.
  pub fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                 row.get(0)?,
      report_type:        row.get(1)?,
      report_type_name:   row.get(2)?,
      status:             row.get(3)?,
      status_desc:        row.get(4)?,
      vessel_adfg_number: row.get(5)?,
      vessel_name:        row.get(6)?,
      port_code:          row.get(7)?,
      port_name:          row.get(8)?,
      gear_code:          row.get(9)?,
      gear_name:          row.get(10)?,
      date_of_landing:    row.get(11)?,
      date_fishing_began: row.get(12)?,
      crew_size:          row.get(13)?,
      processor_code:     row.get(14)?,
      processor_name:     row.get(15)?,
      fish_ticket_number: row.get(16)?,
      data_entry_user:    row.get(17)?,
      data_entry_date:    row.get(18)?,
      last_change_user:   row.get(19)?,
      last_change_date:   row.get(20)?,
      raw_json:           row.get(21)?,
    })
  }

  pub fn into_report(self) -> Result<LandingReport> {
    Ok(LandingReport {
      id:                 self.id,
      report_type:        Coded { code: self.report_type, name: self.report_type_name },
      status:             Coded { code: self.status, name: self.status_desc },
      vessel:             Coded { code: self.vessel_adfg_number, name: self.vessel_name },
      port:               Coded { code: self.port_code, name: self.port_name },
      gear:               Coded { code: self.gear_code, name: self.gear_name },
      processor:          Coded { code: self.processor_code, name: self.processor_name },
      date_of_landing:    opt(self.date_of_landing, decode_date)?,
      date_fishing_began: opt(self.date_fishing_began, decode_date)?,
      crew_size:          self.crew_size,
      fish_ticket_number: self.fish_ticket_number,
      data_entry_user:    self.data_entry_user,
      data_entry_date:    opt(self.data_entry_date, decode_offset_dt)?,
      last_change_user:   self.last_change_user,
      last_change_date:   opt(self.last_change_date, decode_offset_dt)?,
      raw_json:           decode_raw(self.raw_json.as_deref())?,
    })
  }
}

/// A full report row plus its bookkeeping timestamps.
pub struct RawStoredReport {
  pub report:     RawReport,
  pub created_at: String,
  pub updated_at: String,
}

impl RawStoredReport {
  pub fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      report:     RawReport::read(row)?,
      created_at: row.get(22)?,
      updated_at: row.get(23)?,
    })
  }

  pub fn into_stored(self) -> Result<StoredReport> {
    Ok(StoredReport {
      report:     self.report.into_report()?,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// Column list for line-item reads.
pub const ITEM_COLUMNS: &str = "
  landing_report_id, item_number, species_code, species_name,
  condition_code, condition_name, disposition_code, disposition_name,
  weight, fish_ticket_number";

pub struct RawItem {
  pub landing_report_id:  i64,
  pub item_number:        i32,
  pub species_code:       Option<String>,
  pub species_name:       Option<String>,
  pub condition_code:     Option<String>,
  pub condition_name:     Option<String>,
  pub disposition_code:   Option<String>,
  pub disposition_name:   Option<String>,
  pub weight:             Option<String>,
  pub fish_ticket_number: Option<String>,
}

impl RawItem {
  pub fn encode(item: &LandingReportItem) -> Result<Self> {
    let item = item.clone();
    Ok(Self {
      landing_report_id:  item.landing_report_id,
      item_number:        item.item_number,
      species_code:       item.species.code,
      species_name:       item.species.name,
      condition_code:     item.condition.code,
      condition_name:     item.condition.name,
      disposition_code:   item.disposition.code,
      disposition_name:   item.disposition.name,
      weight:             item.weight.map(encode_weight).transpose()?,
      fish_ticket_number: item.fish_ticket_number,
    })
  }

  pub fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      landing_report_id:  row.get(0)?,
      item_number:        row.get(1)?,
      species_code:       row.get(2)?,
      species_name:       row.get(3)?,
      condition_code:     row.get(4)?,
      condition_name:     row.get(5)?,
      disposition_code:   row.get(6)?,
      disposition_name:   row.get(7)?,
      weight:             row.get(8)?,
      fish_ticket_number: row.get(9)?,
    })
  }

  pub fn into_item(self) -> Result<LandingReportItem> {
    Ok(LandingReportItem {
      landing_report_id:  self.landing_report_id,
      item_number:        self.item_number,
      species:            Coded { code: self.species_code, name: self.species_name },
      condition:          Coded { code: self.condition_code, name: self.condition_name },
      disposition:        Coded { code: self.disposition_code, name: self.disposition_name },
      weight:             opt(self.weight, decode_weight)?,
      fish_ticket_number: self.fish_ticket_number,
    })
  }
}

/// Column list for stat-area reads.
pub const AREA_COLUMNS: &str = "
  landing_report_id, item_number, stat_area, fed_area, iphc_area, percent";

pub fn read_area(row: &rusqlite::Row<'_>) -> rusqlite::Result<LandingReportStatArea> {
  Ok(LandingReportStatArea {
    landing_report_id: row.get(0)?,
    item_number:       row.get(1)?,
    stat_area:         row.get(2)?,
    fed_area:          row.get(3)?,
    iphc_area:         row.get(4)?,
    percent:           row.get(5)?,
  })
}

/// Column list for [`ReportSummary`] reads.
pub const SUMMARY_COLUMNS: &str = "
  id, report_type, report_type_name, status, status_desc,
  vessel_adfg_number, vessel_name, port_code, port_name,
  gear_code, gear_name, date_of_landing, fish_ticket_number, last_change_date";

pub struct RawSummary {
  pub columns: [Option<String>; 13],
  pub id:      i64,
}

impl RawSummary {
  pub fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    let mut columns: [Option<String>; 13] = Default::default();
    for (i, col) in columns.iter_mut().enumerate() {
      *col = row.get(i + 1)?;
    }
    Ok(Self { id: row.get(0)?, columns })
  }

  pub fn into_summary(self) -> Result<ReportSummary> {
    let [
      report_type,
      report_type_name,
      status,
      status_desc,
      vessel_adfg_number,
      vessel_name,
      port_code,
      port_name,
      gear_code,
      gear_name,
      date_of_landing,
      fish_ticket_number,
      last_change_date,
    ] = self.columns;

    Ok(ReportSummary {
      id: self.id,
      report_type: Coded { code: report_type, name: report_type_name },
      status: Coded { code: status, name: status_desc },
      vessel: Coded { code: vessel_adfg_number, name: vessel_name },
      port: Coded { code: port_code, name: port_name },
      gear: Coded { code: gear_code, name: gear_name },
      date_of_landing: opt(date_of_landing, decode_date)?,
      fish_ticket_number,
      last_change_date: opt(last_change_date, decode_offset_dt)?,
    })
  }
}

/// An item row followed by the parent's vessel name, port name, and landing
/// date.
pub struct RawSpeciesLanding {
  pub item:            RawItem,
  pub vessel_name:     Option<String>,
  pub port_name:       Option<String>,
  pub date_of_landing: Option<String>,
}

impl RawSpeciesLanding {
  pub fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      item:            RawItem::read(row)?,
      vessel_name:     row.get(10)?,
      port_name:       row.get(11)?,
      date_of_landing: row.get(12)?,
    })
  }

  pub fn into_landing(self) -> Result<SpeciesLanding> {
    Ok(SpeciesLanding {
      item:            self.item.into_item()?,
      vessel_name:     self.vessel_name,
      port_name:       self.port_name,
      date_of_landing: opt(self.date_of_landing, decode_date)?,
    })
  }
}

//! Flattening of upstream landing-report documents into normalized rows.
//!
//! The upstream document is the JSON rendering of an eLandings XML report
//! (see [`crate::xml`]): attributes appear as `@name` keys, element text
//! sits under `#text` when the element also has attributes, and a repeated
//! element becomes an array while a single one stays an object.

use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::{
  Error, Result,
  report::{
    Coded, LandingReport, LandingReportItem, LandingReportStatArea,
    ReportBundle, normalize_weight,
  },
};

const TEXT: &str = "#text";

/// Build a [`ReportBundle`] from one upstream document. The document itself
/// is kept verbatim as the report's `raw_json`.
pub fn flatten(doc: &Value) -> Result<ReportBundle> {
  let id = report_id(doc)?;
  let header = doc.get("header");
  let field = |name: &str| header.and_then(|h| h.get(name));

  let type_of = doc.get("type_of_landing_report");
  let status = doc.get("status");
  let vessel = field("vessel");
  let port = field("port_of_landing");
  let gear = field("gear");
  let proc_code = field("proc_code_owner").and_then(|o| o.get("proc_code"));

  let fish_ticket_number = one_or_many(field("permit_worksheet"))
    .first()
    .and_then(|ws| text(ws.get("fish_ticket_number")));

  let report = LandingReport {
    id,
    report_type: coded(type_of, "name"),
    status: coded(status, "desc"),
    vessel: coded(vessel, "name"),
    port: coded(port, "name"),
    gear: coded(gear, "name"),
    processor: coded(proc_code, "processor"),
    date_of_landing: text(field("date_of_landing")).and_then(|s| parse_date(&s)),
    date_fishing_began: text(field("date_fishing_began"))
      .and_then(|s| parse_date(&s)),
    crew_size: parse_int("crew_size", text(field("crew_size")))?,
    fish_ticket_number,
    data_entry_user: text(doc.get("@data_entry_user")),
    data_entry_date: text(doc.get("@data_entry_submit_date"))
      .and_then(|s| parse_timestamp(&s)),
    last_change_user: text(doc.get("@last_change_user")),
    last_change_date: text(doc.get("@last_change_date"))
      .and_then(|s| parse_timestamp(&s)),
    raw_json: doc.clone(),
  };

  let item_rows = one_or_many(doc.get("line_item"));
  let items = item_rows
    .iter()
    .zip(ordinals(&item_rows)?)
    .map(|(item, n)| line_item(id, n, item))
    .collect::<Result<Vec<_>>>()?;

  let area_rows = one_or_many(field("stat_area_worksheet"));
  let stat_areas = area_rows
    .iter()
    .zip(ordinals(&area_rows)?)
    .map(|(area, n)| stat_area(id, n, area))
    .collect::<Result<Vec<_>>>()?;

  let bundle = ReportBundle { report, items, stat_areas };
  bundle.validate()?;
  Ok(bundle)
}

/// The upstream report id, whether given as a bare value or as `#text`.
pub fn report_id(doc: &Value) -> Result<i64> {
  let raw = text(doc.get("landing_report_id")).ok_or(Error::MissingReportId)?;
  raw
    .parse()
    .map_err(|_| Error::InvalidField { field: "landing_report_id", value: raw })
}

fn line_item(report_id: i64, item_number: i32, item: &Value) -> Result<LandingReportItem> {
  let weight = text(item.get("weight"))
    .map(|w| parse_weight(&w))
    .transpose()?;

  Ok(LandingReportItem {
    landing_report_id: report_id,
    item_number,
    species: coded(item.get("species"), "name"),
    condition: coded(item.get("condition_code"), "name"),
    disposition: coded(item.get("disposition_code"), "name"),
    weight,
    fish_ticket_number: text(item.get("fish_ticket_number")),
  })
}

fn stat_area(report_id: i64, item_number: i32, area: &Value) -> Result<LandingReportStatArea> {
  let code = area.get("stat_area");

  Ok(LandingReportStatArea {
    landing_report_id: report_id,
    item_number,
    stat_area: text(code),
    fed_area: attr(code, "fed_area"),
    iphc_area: attr(code, "iphc_area"),
    percent: parse_int("percent", text(area.get("percent")))?,
  })
}

/// Each row's `item_number`. Rows that omit one are numbered after the
/// largest explicit ordinal in the list, in document order.
fn ordinals(rows: &[&Value]) -> Result<Vec<i32>> {
  let explicit = rows
    .iter()
    .map(|row| parse_int("item_number", text(row.get("item_number"))))
    .collect::<Result<Vec<_>>>()?;

  let mut next = explicit.iter().flatten().copied().max().unwrap_or(0);
  explicit
    .into_iter()
    .map(|n| match n {
      Some(n) => Ok(n),
      None => {
        next = next.checked_add(1).ok_or_else(|| Error::InvalidField {
          field: "item_number",
          value: next.to_string(),
        })?;
        Ok(next)
      }
    })
    .collect()
}

// ─── Value extraction ────────────────────────────────────────────────────────

/// Text of an element: the value itself for scalars, `#text` (falling back
/// to `@name`) for elements carrying attributes.
fn text(value: Option<&Value>) -> Option<String> {
  match value? {
    Value::Object(map) => map.get(TEXT).or_else(|| map.get("@name")).and_then(scalar),
    other => scalar(other),
  }
}

fn attr(value: Option<&Value>, name: &str) -> Option<String> {
  match value? {
    Value::Object(map) => map.get(&format!("@{name}")).and_then(scalar),
    _ => None,
  }
}

fn coded(value: Option<&Value>, label: &str) -> Coded {
  Coded { code: text(value), name: attr(value, label) }
}

fn scalar(value: &Value) -> Option<String> {
  let s = match value {
    Value::String(s) => s.trim().to_owned(),
    Value::Number(n) => n.to_string(),
    Value::Bool(b) => b.to_string(),
    _ => return None,
  };
  (!s.is_empty()).then_some(s)
}

fn one_or_many(value: Option<&Value>) -> Vec<&Value> {
  match value {
    Some(Value::Array(values)) => values.iter().collect(),
    Some(v @ Value::Object(_)) => vec![v],
    _ => Vec::new(),
  }
}

// ─── Parsing ─────────────────────────────────────────────────────────────────

fn parse_int(field: &'static str, raw: Option<String>) -> Result<Option<i32>> {
  raw
    .map(|s| s.parse().map_err(|_| Error::InvalidField { field, value: s }))
    .transpose()
}

fn parse_weight(raw: &str) -> Result<Decimal> {
  let invalid = || Error::InvalidField { field: "weight", value: raw.to_owned() };
  let weight = Decimal::from_str(raw)
    .or_else(|_| Decimal::from_scientific(raw))
    .map_err(|_| invalid())?;
  normalize_weight(weight).map_err(|_| invalid())
}

/// Upstream dates come as `2017-01-02` or with a zone suffix
/// (`2017-01-02-09:00`); only the calendar date is kept.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
  let day = raw.get(..10)?;
  NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// RFC 3339 timestamps keep their offset; naive ones are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
  DateTime::parse_from_rfc3339(raw).ok().or_else(|| {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
      .ok()
      .map(|naive| naive.and_utc().fixed_offset())
  })
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::report::ChildList;

  fn sample() -> Value {
    json!({
      "@data_entry_user": "clerk1",
      "@data_entry_submit_date": "2017-02-02T10:12:47.000-09:00",
      "@last_change_user": "clerk2",
      "@last_change_date": "2017-02-03T08:00:00",
      "landing_report_id": "12345",
      "type_of_landing_report": { "@name": "Groundfish", "#text": "G" },
      "status": { "@desc": "Final", "#text": "F" },
      "header": {
        "vessel": { "@name": "NORTHERN DAWN", "#text": "54321" },
        "port_of_landing": { "@name": "Kodiak", "#text": "KOD" },
        "gear": { "@name": "Longline", "#text": "61" },
        "date_of_landing": "2017-01-02-09:00",
        "date_fishing_began": "2016-12-28",
        "crew_size": "4",
        "proc_code_owner": {
          "proc_code": { "@processor": "Island Seafoods", "#text": "F1234" }
        },
        "permit_worksheet": [
          { "fish_ticket_number": "E17 123456" },
          { "fish_ticket_number": "E17 999999" }
        ],
        "stat_area_worksheet": {
          "item_number": "1",
          "stat_area": { "@fed_area": "630", "@iphc_area": "3A", "#text": "525702" },
          "percent": "100"
        }
      },
      "line_item": [
        {
          "item_number": "1",
          "species": { "@name": "Halibut", "#text": "200" },
          "condition_code": { "@name": "Gutted, head on", "#text": "04" },
          "disposition_code": { "@name": "Sold", "#text": "60" },
          "weight": "1234.56789",
          "fish_ticket_number": "E17 123456"
        },
        {
          "item_number": "2",
          "species": { "@name": "Sablefish", "#text": "710" },
          "weight": "88"
        }
      ]
    })
  }

  #[test]
  fn flattens_header_fields() {
    let bundle = flatten(&sample()).unwrap();
    let r = &bundle.report;

    assert_eq!(r.id, 12345);
    assert_eq!(r.report_type, Coded::new("G", "Groundfish"));
    assert_eq!(r.status, Coded::new("F", "Final"));
    assert_eq!(r.vessel, Coded::new("54321", "NORTHERN DAWN"));
    assert_eq!(r.port, Coded::new("KOD", "Kodiak"));
    assert_eq!(r.gear, Coded::new("61", "Longline"));
    assert_eq!(r.processor, Coded::new("F1234", "Island Seafoods"));
    assert_eq!(r.date_of_landing, NaiveDate::from_ymd_opt(2017, 1, 2));
    assert_eq!(r.date_fishing_began, NaiveDate::from_ymd_opt(2016, 12, 28));
    assert_eq!(r.crew_size, Some(4));
    assert_eq!(r.fish_ticket_number.as_deref(), Some("E17 123456"));
    assert_eq!(r.data_entry_user.as_deref(), Some("clerk1"));
    assert_eq!(r.last_change_user.as_deref(), Some("clerk2"));
    assert_eq!(r.raw_json, sample());
  }

  #[test]
  fn keeps_upstream_offsets_and_assumes_utc_for_naive_timestamps() {
    let r = flatten(&sample()).unwrap().report;

    let entered = r.data_entry_date.unwrap();
    assert_eq!(entered.offset().local_minus_utc(), -9 * 3600);
    assert_eq!(entered.to_rfc3339(), "2017-02-02T10:12:47-09:00");

    let changed = r.last_change_date.unwrap();
    assert_eq!(changed.offset().local_minus_utc(), 0);
  }

  #[test]
  fn flattens_line_items_and_stat_areas() {
    let bundle = flatten(&sample()).unwrap();

    assert_eq!(bundle.items.len(), 2);
    let first = &bundle.items[0];
    assert_eq!(first.landing_report_id, 12345);
    assert_eq!(first.item_number, 1);
    assert_eq!(first.species, Coded::new("200", "Halibut"));
    assert_eq!(first.condition, Coded::new("04", "Gutted, head on"));
    assert_eq!(first.disposition, Coded::new("60", "Sold"));
    assert_eq!(first.weight.unwrap().to_string(), "1234.5679");
    assert_eq!(bundle.items[1].condition, Coded::default());
    assert_eq!(bundle.items[1].fish_ticket_number, None);

    assert_eq!(bundle.stat_areas.len(), 1);
    let area = &bundle.stat_areas[0];
    assert_eq!(area.stat_area.as_deref(), Some("525702"));
    assert_eq!(area.fed_area.as_deref(), Some("630"));
    assert_eq!(area.iphc_area.as_deref(), Some("3A"));
    assert_eq!(area.percent, Some(100));
  }

  #[test]
  fn id_may_be_wrapped_in_text() {
    let doc = json!({ "landing_report_id": { "@seq": "1", "#text": "777" } });
    let bundle = flatten(&doc).unwrap();
    assert_eq!(bundle.id(), 777);
    assert!(bundle.items.is_empty());
    assert!(bundle.stat_areas.is_empty());
  }

  #[test]
  fn missing_id_is_an_error() {
    let err = flatten(&json!({ "header": {} })).unwrap_err();
    assert!(matches!(err, Error::MissingReportId));

    let err = flatten(&json!({ "landing_report_id": "abc" })).unwrap_err();
    assert!(matches!(err, Error::InvalidField { field: "landing_report_id", .. }));
  }

  #[test]
  fn unnumbered_rows_take_their_position() {
    let doc = json!({
      "landing_report_id": "5",
      "line_item": [ { "weight": "1" }, { "weight": "2" } ]
    });
    let bundle = flatten(&doc).unwrap();
    let numbers: Vec<_> = bundle.items.iter().map(|i| i.item_number).collect();
    assert_eq!(numbers, [1, 2]);
  }

  #[test]
  fn unnumbered_rows_follow_the_largest_explicit_ordinal() {
    let doc = json!({
      "landing_report_id": "5",
      "line_item": [ { "item_number": "2" }, { "weight": "1" }, { "item_number": "1" } ],
      "header": {
        "stat_area_worksheet": [ {}, { "item_number": "4" } ]
      }
    });
    let bundle = flatten(&doc).unwrap();

    let items: Vec<_> = bundle.items.iter().map(|i| i.item_number).collect();
    assert_eq!(items, [2, 3, 1]);
    let areas: Vec<_> = bundle.stat_areas.iter().map(|a| a.item_number).collect();
    assert_eq!(areas, [5, 4]);
  }

  #[test]
  fn repeated_ordinals_are_rejected() {
    let doc = json!({
      "landing_report_id": "5",
      "line_item": [ { "item_number": "1" }, { "item_number": "1" } ]
    });
    let err = flatten(&doc).unwrap_err();
    assert!(matches!(
      err,
      Error::DuplicateOrdinal { list: ChildList::Items, item_number: 1, .. }
    ));
  }

  #[test]
  fn bad_weight_is_an_error() {
    let doc = json!({
      "landing_report_id": "5",
      "line_item": { "item_number": "1", "weight": "lots" }
    });
    let err = flatten(&doc).unwrap_err();
    assert!(matches!(err, Error::InvalidField { field: "weight", .. }));
  }

  #[test]
  fn oversized_weight_is_an_error() {
    let doc = json!({
      "landing_report_id": "5",
      "line_item": { "item_number": "1", "weight": "123456789012345.5" }
    });
    let err = flatten(&doc).unwrap_err();
    assert!(matches!(
      err,
      Error::InvalidField { field: "weight", ref value } if value == "123456789012345.5"
    ));
  }

  #[test]
  fn unparseable_dates_become_empty() {
    assert_eq!(parse_date("soon"), None);
    assert_eq!(parse_date("2017-13-40"), None);
    assert_eq!(parse_timestamp("yesterday"), None);
  }
}

//! Error types for `landings-core`.

use thiserror::Error;

use crate::report::ChildList;

#[derive(Debug, Error)]
pub enum Error {
  #[error("document has no landing_report_id")]
  MissingReportId,

  #[error("invalid {field}: {value:?}")]
  InvalidField { field: &'static str, value: String },

  #[error("{list} row belongs to report {found}, expected {report_id}")]
  ParentMismatch {
    report_id: i64,
    list:      ChildList,
    found:     i64,
  },

  #[error("report {report_id} has more than one {list} numbered {item_number}")]
  DuplicateOrdinal {
    report_id:   i64,
    list:        ChildList,
    item_number: i32,
  },

  #[error("xml error: {0}")]
  Xml(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

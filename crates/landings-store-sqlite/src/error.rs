//! Error type for `landings-store-sqlite`.

use landings_core::report::ChildList;
use rusqlite::ffi;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] landings_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("decimal parse error: {0}")]
  Decimal(#[from] rust_decimal::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A child row named a report that is not stored.
  #[error("landing report not found: {0}")]
  ReportNotFound(i64),

  #[error("report {report_id} already has a {list} numbered {item_number}")]
  DuplicateOrdinal {
    report_id:   i64,
    list:        ChildList,
    item_number: i32,
  },

  #[error("sync_state row is missing; was the schema initialised?")]
  SyncStateMissing,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The kind of SQLite constraint a failed statement tripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Constraint {
  Unique,
  PrimaryKey,
  ForeignKey,
  Check,
  Other,
}

/// Classify a database error by its extended result code.
pub(crate) fn constraint_of(err: &tokio_rusqlite::Error) -> Option<Constraint> {
  let tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(e, _)) = err
  else {
    return None;
  };
  if e.code != rusqlite::ErrorCode::ConstraintViolation {
    return None;
  }

  Some(match e.extended_code {
    ffi::SQLITE_CONSTRAINT_UNIQUE => Constraint::Unique,
    ffi::SQLITE_CONSTRAINT_PRIMARYKEY => Constraint::PrimaryKey,
    ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Constraint::ForeignKey,
    ffi::SQLITE_CONSTRAINT_CHECK => Constraint::Check,
    _ => Constraint::Other,
  })
}

impl Error {
  /// Translate a failed single-row child insert into the matching domain
  /// error.
  pub(crate) fn child_insert(
    err: tokio_rusqlite::Error,
    report_id: i64,
    list: ChildList,
    item_number: i32,
  ) -> Self {
    match constraint_of(&err) {
      Some(Constraint::Unique) => {
        Self::DuplicateOrdinal { report_id, list, item_number }
      }
      Some(Constraint::ForeignKey) => Self::ReportNotFound(report_id),
      _ => Self::Database(err),
    }
  }
}

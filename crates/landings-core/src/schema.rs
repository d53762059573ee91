//! Reference DDL for the hosted Postgres database that ingestion targets.
//!
//! Backends for other engines must keep the same constraints: upstream ids as
//! report keys, cascading deletes to both child tables, per-list ordinal
//! uniqueness, and a single-row `sync_state`.

pub const POSTGRES_SCHEMA: &str = "
-- Landing reports synced from eLandings.
CREATE TABLE IF NOT EXISTS landing_reports (
    id                  BIGINT PRIMARY KEY,          -- upstream landing_report_id
    report_type         TEXT,
    report_type_name    TEXT,
    status              TEXT,
    status_desc         TEXT,
    vessel_adfg_number  TEXT,
    vessel_name         TEXT,
    port_code           TEXT,
    port_name           TEXT,
    gear_code           TEXT,
    gear_name           TEXT,
    date_of_landing     DATE,
    date_fishing_began  DATE,
    crew_size           INTEGER,
    processor_code      TEXT,
    processor_name      TEXT,
    fish_ticket_number  TEXT,
    data_entry_user     TEXT,
    data_entry_date     TIMESTAMPTZ,
    last_change_user    TEXT,
    last_change_date    TIMESTAMPTZ,
    raw_json            JSONB,
    created_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at          TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS landing_report_items (
    id                  BIGSERIAL PRIMARY KEY,
    landing_report_id   BIGINT NOT NULL REFERENCES landing_reports(id) ON DELETE CASCADE,
    item_number         INTEGER NOT NULL,
    species_code        TEXT,
    species_name        TEXT,
    weight              NUMERIC(12, 4),              -- pounds
    condition_code      TEXT,
    condition_name      TEXT,
    disposition_code    TEXT,
    disposition_name    TEXT,
    fish_ticket_number  TEXT,
    UNIQUE (landing_report_id, item_number)
);

CREATE TABLE IF NOT EXISTS landing_report_stat_areas (
    id                  BIGSERIAL PRIMARY KEY,
    landing_report_id   BIGINT NOT NULL REFERENCES landing_reports(id) ON DELETE CASCADE,
    item_number         INTEGER NOT NULL,            -- numbered apart from items
    stat_area           TEXT,
    fed_area            TEXT,
    iphc_area           TEXT,
    percent             INTEGER,
    UNIQUE (landing_report_id, item_number)
);

CREATE TABLE IF NOT EXISTS sync_state (
    id         INTEGER PRIMARY KEY DEFAULT 1 CHECK (id = 1),
    last_sync  TIMESTAMPTZ
);

INSERT INTO sync_state (id, last_sync) VALUES (1, NULL) ON CONFLICT (id) DO NOTHING;

CREATE INDEX IF NOT EXISTS idx_landing_reports_vessel      ON landing_reports(vessel_adfg_number);
CREATE INDEX IF NOT EXISTS idx_landing_reports_date        ON landing_reports(date_of_landing);
CREATE INDEX IF NOT EXISTS idx_landing_reports_port        ON landing_reports(port_code);
CREATE INDEX IF NOT EXISTS idx_landing_reports_status      ON landing_reports(status);
CREATE INDEX IF NOT EXISTS idx_landing_reports_type        ON landing_reports(report_type);
CREATE INDEX IF NOT EXISTS idx_landing_report_items_report ON landing_report_items(landing_report_id);
CREATE INDEX IF NOT EXISTS idx_landing_report_items_species ON landing_report_items(species_code);
CREATE INDEX IF NOT EXISTS idx_landing_report_items_ticket ON landing_report_items(fish_ticket_number);
CREATE INDEX IF NOT EXISTS idx_landing_report_stat_areas_report ON landing_report_stat_areas(landing_report_id);
CREATE INDEX IF NOT EXISTS idx_landing_report_stat_areas_iphc   ON landing_report_stat_areas(iphc_area);
";

/// Names of the secondary indexes every backend is expected to create.
pub const INDEX_NAMES: [&str; 10] = [
  "idx_landing_reports_vessel",
  "idx_landing_reports_date",
  "idx_landing_reports_port",
  "idx_landing_reports_status",
  "idx_landing_reports_type",
  "idx_landing_report_items_report",
  "idx_landing_report_items_species",
  "idx_landing_report_items_ticket",
  "idx_landing_report_stat_areas_report",
  "idx_landing_report_stat_areas_iphc",
];

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn declares_every_index() {
    for name in INDEX_NAMES {
      assert!(POSTGRES_SCHEMA.contains(name), "missing index {name}");
    }
  }

  #[test]
  fn keeps_fixed_point_weight_and_cascades() {
    assert!(POSTGRES_SCHEMA.contains("NUMERIC(12, 4)"));
    assert_eq!(POSTGRES_SCHEMA.matches("ON DELETE CASCADE").count(), 2);
    assert!(POSTGRES_SCHEMA.contains("CHECK (id = 1)"));
  }
}

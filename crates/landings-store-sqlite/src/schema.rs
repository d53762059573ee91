//! SQL schema for the SQLite landing report store.
//!
//! Mirrors [`landings_core::schema::POSTGRES_SCHEMA`] in SQLite types: dates
//! and timestamps are ISO 8601 text, weights are fixed-point decimal text,
//! and the raw upstream document is JSON text.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS` and the
/// conflict-tolerant seed of `sync_state`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS landing_reports (
    id                  INTEGER PRIMARY KEY,   -- upstream id, never generated here
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
    date_of_landing     TEXT,                  -- YYYY-MM-DD
    date_fishing_began  TEXT,                  -- YYYY-MM-DD
    crew_size           INTEGER,
    processor_code      TEXT,
    processor_name      TEXT,
    fish_ticket_number  TEXT,
    data_entry_user     TEXT,
    data_entry_date     TEXT,                  -- RFC 3339, upstream offset kept
    last_change_user    TEXT,
    last_change_date    TEXT,                  -- RFC 3339, upstream offset kept
    raw_json            TEXT,
    created_at          TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    updated_at          TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE TABLE IF NOT EXISTS landing_report_items (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    landing_report_id   INTEGER NOT NULL
                        REFERENCES landing_reports(id) ON DELETE CASCADE,
    item_number         INTEGER NOT NULL,
    species_code        TEXT,
    species_name        TEXT,
    weight              TEXT,                  -- decimal, exactly 4 fractional digits
    condition_code      TEXT,
    condition_name      TEXT,
    disposition_code    TEXT,
    disposition_name    TEXT,
    fish_ticket_number  TEXT,
    UNIQUE (landing_report_id, item_number)
);

-- Ordinals here are numbered apart from landing_report_items.
CREATE TABLE IF NOT EXISTS landing_report_stat_areas (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    landing_report_id   INTEGER NOT NULL
                        REFERENCES landing_reports(id) ON DELETE CASCADE,
    item_number         INTEGER NOT NULL,
    stat_area           TEXT,
    fed_area            TEXT,
    iphc_area           TEXT,
    percent             INTEGER,
    UNIQUE (landing_report_id, item_number)
);

CREATE TABLE IF NOT EXISTS sync_state (
    id         INTEGER PRIMARY KEY CHECK (id = 1),
    last_sync  TEXT
);

INSERT INTO sync_state (id, last_sync) VALUES (1, NULL)
    ON CONFLICT (id) DO NOTHING;

CREATE INDEX IF NOT EXISTS idx_landing_reports_vessel           ON landing_reports(vessel_adfg_number);
CREATE INDEX IF NOT EXISTS idx_landing_reports_date             ON landing_reports(date_of_landing);
CREATE INDEX IF NOT EXISTS idx_landing_reports_port             ON landing_reports(port_code);
CREATE INDEX IF NOT EXISTS idx_landing_reports_status           ON landing_reports(status);
CREATE INDEX IF NOT EXISTS idx_landing_reports_type             ON landing_reports(report_type);
CREATE INDEX IF NOT EXISTS idx_landing_report_items_report      ON landing_report_items(landing_report_id);
CREATE INDEX IF NOT EXISTS idx_landing_report_items_species     ON landing_report_items(species_code);
CREATE INDEX IF NOT EXISTS idx_landing_report_items_ticket      ON landing_report_items(fish_ticket_number);
CREATE INDEX IF NOT EXISTS idx_landing_report_stat_areas_report ON landing_report_stat_areas(landing_report_id);
CREATE INDEX IF NOT EXISTS idx_landing_report_stat_areas_iphc   ON landing_report_stat_areas(iphc_area);

PRAGMA user_version = 1;
";

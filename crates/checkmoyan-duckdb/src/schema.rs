/// DuckDB initialization SQL.
///
/// Executed once at database open time via `Connection::execute_batch`.
/// All statements use `IF NOT EXISTS` so they are safe to re-run on every
/// startup.
///
/// `memory_limit` comes from `Config.duckdb_memory_limit`
/// (env `CHECKMOYAN_DUCKDB_MEMORY`, default `"512MB"`). Always set an explicit
/// limit: the DuckDB default (80% of system RAM) is not acceptable for a
/// server process.
///
/// Dates that operators type (`premium_until`, `approved_until`) are stored as
/// VARCHAR, exactly as entered. The resolver parses them and treats anything
/// malformed as an expired grant, so a bad value must survive the write.
///
/// Mutable tables (`users`, `upgrade_requests`) carry no secondary indexes:
/// DuckDB rewrites an UPDATE of an indexed column as delete + insert, which
/// trips the primary-key check inside a transaction.
pub fn init_sql(memory_limit: &str) -> String {
    format!(
        r#"SET memory_limit = '{memory_limit}';
SET threads = 2;

-- ===========================================
-- USERS
-- ===========================================
CREATE TABLE IF NOT EXISTS users (
    email           VARCHAR PRIMARY KEY,           -- contact address, case-sensitive
    plan            VARCHAR NOT NULL DEFAULT 'free',  -- 'free' | 'premium' | 'pro'
    premium_until   VARCHAR,                       -- 'YYYY-MM-DD' as entered; NULL = no expiry
    created_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);

-- ===========================================
-- USAGE (one row per user per operator-timezone day)
-- ===========================================
-- Incremented with INSERT ... ON CONFLICT DO UPDATE so concurrent scans for
-- the same (email, day) never lose a count.
CREATE TABLE IF NOT EXISTS usage_daily (
    email           VARCHAR NOT NULL,
    day             DATE NOT NULL,
    scan_count      INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (email, day)
);

-- ===========================================
-- SCANS (append-only; raw message is never stored)
-- ===========================================
CREATE SEQUENCE IF NOT EXISTS scans_id_seq START 1;
CREATE TABLE IF NOT EXISTS scans (
    id                  BIGINT PRIMARY KEY DEFAULT nextval('scans_id_seq'),
    email               VARCHAR NOT NULL,
    day                 DATE NOT NULL,
    verdict             VARCHAR NOT NULL,
    confidence          INTEGER NOT NULL,
    category            VARCHAR NOT NULL DEFAULT '',
    signals             VARCHAR NOT NULL DEFAULT '[]',  -- JSON array of signal tags
    content_fingerprint VARCHAR NOT NULL DEFAULT '',    -- sha256 hex of the message
    created_at          TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_scans_day ON scans(day, category);

-- ===========================================
-- UPGRADE REQUESTS (manual payment review)
-- ===========================================
CREATE SEQUENCE IF NOT EXISTS upgrade_requests_id_seq START 1;
CREATE TABLE IF NOT EXISTS upgrade_requests (
    id              BIGINT PRIMARY KEY DEFAULT nextval('upgrade_requests_id_seq'),
    email           VARCHAR NOT NULL,
    plan            VARCHAR NOT NULL,
    method          VARCHAR NOT NULL,              -- 'gcash' | 'maya' | ...
    payment_ref     VARCHAR,
    receipt_path    VARCHAR,                       -- uploaded proof-of-payment image
    status          VARCHAR NOT NULL DEFAULT 'pending',  -- 'pending' | 'approved' | 'rejected'
    admin_notes     VARCHAR,
    approved_until  VARCHAR,
    created_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#
    )
}

//! Database schema definitions
//!
//! The store holds a single append-only table keyed by page URL.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per harvested page
CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT UNIQUE,
    part_no TEXT,
    adaptable_for TEXT,
    orig_part_no TEXT
);
"#;

/// Initializes the database schema
///
/// Safe to call on every startup; existing tables and rows are left alone.
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

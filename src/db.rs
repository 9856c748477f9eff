// Transactional store gateway - SQLite via rusqlite
//
// The rest of the crate talks to the store through `&Connection` (reads)
// or `&mut Connection` (the mutation service, which opens transactions).
// The database location is an explicit `StoreConfig` handed in at open
// time; there is no process-wide current-path state.

use rusqlite::Connection;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Where the store lives. Built once by the host and passed to `open`.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl StoreConfig {
    pub fn new(path: impl AsRef<Path>) -> Self {
        StoreConfig {
            path: path.as_ref().to_path_buf(),
        }
    }
}

/// Open the on-disk store described by `config`.
///
/// WAL mode for crash recovery; a busy timeout so a second reader does not
/// fail immediately while a writer holds the file.
pub fn open(config: &StoreConfig) -> Result<Connection> {
    let conn = Connection::open(&config.path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    // The bundled SQLite is compiled with SQLITE_DEFAULT_FOREIGN_KEYS=1;
    // turn enforcement off to honor the schema contract below.
    conn.pragma_update(None, "foreign_keys", "OFF")?;
    Ok(conn)
}

/// In-memory store, used by tests and throwaway runs.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    conn.pragma_update(None, "foreign_keys", "OFF")?;
    Ok(conn)
}

/// Create the five budget tables.
///
/// Schema creation is the provisioning collaborator's job, not the
/// engine's; this lives here so the CLI's `init` and the tests can stand
/// up a store. Foreign keys are declared for documentation but the
/// enforcement pragma is not enabled: deletion cascades explicitly
/// through the mutation service.
pub fn setup_schema(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS budgets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            currency TEXT NOT NULL,
            locale TEXT NOT NULL,
            source_date TEXT NOT NULL,
            fiscal_year INTEGER NOT NULL,
            total_revenue INTEGER NOT NULL DEFAULT 0,
            total_expenses INTEGER NOT NULL DEFAULT 0,
            result INTEGER NOT NULL DEFAULT 0,
            cash_reserve REAL NOT NULL DEFAULT 0
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS revenue_categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            budget_id INTEGER NOT NULL REFERENCES budgets(id),
            code TEXT NOT NULL,
            name TEXT NOT NULL,
            amount INTEGER NOT NULL DEFAULT 0,
            parent_id INTEGER REFERENCES revenue_categories(id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS expense_categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            budget_id INTEGER NOT NULL REFERENCES budgets(id),
            code TEXT NOT NULL,
            name TEXT NOT NULL,
            amount INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS ministries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            budget_id INTEGER NOT NULL REFERENCES budgets(id),
            code TEXT NOT NULL,
            name TEXT NOT NULL,
            regular_budget INTEGER NOT NULL DEFAULT 0,
            public_investment INTEGER NOT NULL DEFAULT 0,
            total_budget INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS ministry_expenses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            budget_id INTEGER NOT NULL REFERENCES budgets(id),
            ministry_id INTEGER NOT NULL REFERENCES ministries(id),
            expense_category_id INTEGER NOT NULL REFERENCES expense_categories(id),
            amount INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    // Indexes for the scoped point lookups the algorithms loop over
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_revenue_budget_code
         ON revenue_categories(budget_id, code)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_revenue_parent
         ON revenue_categories(budget_id, parent_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_ministry_expenses_ministry
         ON ministry_expenses(ministry_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_ministry_expenses_category
         ON ministry_expenses(expense_category_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_ministry_expenses_budget
         ON ministry_expenses(budget_id)",
        [],
    )?;

    Ok(())
}

/// Last-issued identifier per table, straight from sqlite_sequence.
/// Diagnostic only; nothing in the engine depends on these values.
#[derive(Debug, Clone)]
pub struct SequenceRow {
    pub table: String,
    pub last_id: i64,
}

pub fn last_issued_ids(conn: &Connection) -> Result<Vec<SequenceRow>> {
    // sqlite_sequence does not exist until the first AUTOINCREMENT insert.
    let mut stmt = match conn.prepare("SELECT name, seq FROM sqlite_sequence ORDER BY name") {
        Ok(stmt) => stmt,
        Err(rusqlite::Error::SqliteFailure(_, Some(msg))) if msg.contains("no such table") => {
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let rows = stmt
        .query_map([], |row| {
            Ok(SequenceRow {
                table: row.get(0)?,
                last_id: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_setup_is_idempotent() {
        let conn = open_in_memory().unwrap();
        setup_schema(&conn).unwrap();
        setup_schema(&conn).unwrap();

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master
                 WHERE type = 'table' AND name IN
                 ('budgets', 'revenue_categories', 'expense_categories',
                  'ministries', 'ministry_expenses')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 5);
    }

    #[test]
    fn sequence_report_empty_before_first_insert() {
        let conn = open_in_memory().unwrap();
        setup_schema(&conn).unwrap();

        assert!(last_issued_ids(&conn).unwrap().is_empty());
    }

    #[test]
    fn sequence_report_tracks_inserts() {
        let conn = open_in_memory().unwrap();
        setup_schema(&conn).unwrap();

        conn.execute(
            "INSERT INTO budgets (title, currency, locale, source_date, fiscal_year)
             VALUES ('State Budget 2025', 'EUR', 'el-GR', '2024-11-01', 2025)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO budgets (title, currency, locale, source_date, fiscal_year)
             VALUES ('State Budget 2026', 'EUR', 'el-GR', '2025-11-01', 2026)",
            [],
        )
        .unwrap();

        let rows = last_issued_ids(&conn).unwrap();
        let budgets = rows.iter().find(|r| r.table == "budgets").unwrap();
        assert_eq!(budgets.last_id, 2);
    }

    #[test]
    fn open_from_config_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::new(dir.path().join("budgets.db"));

        let conn = open(&config).unwrap();
        setup_schema(&conn).unwrap();
        drop(conn);

        assert!(config.path.exists());

        // Reopen and confirm the schema survived.
        let conn = open(&config).unwrap();
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'budgets'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 1);
    }
}

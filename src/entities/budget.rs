// Budget summary row - one per fiscal year by convention.

use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One fiscal year's summary record. The totals are derived aggregates
/// maintained by the recalculation pass, never edited directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub id: i64,
    pub title: String,
    pub currency: String,
    pub locale: String,
    pub source_date: NaiveDate,
    pub fiscal_year: i32,
    pub total_revenue: i64,
    pub total_expenses: i64,
    /// total_revenue - total_expenses, recomputed with the totals.
    pub result: i64,
    pub cash_reserve: f64,
}

const COLUMNS: &str = "id, title, currency, locale, source_date, fiscal_year,
                       total_revenue, total_expenses, result, cash_reserve";

fn decode(row: &Row<'_>) -> rusqlite::Result<Budget> {
    let date_text: String = row.get(4)?;
    let source_date = NaiveDate::parse_from_str(&date_text, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Budget {
        id: row.get(0)?,
        title: row.get(1)?,
        currency: row.get(2)?,
        locale: row.get(3)?,
        source_date,
        fiscal_year: row.get(5)?,
        total_revenue: row.get(6)?,
        total_expenses: row.get(7)?,
        result: row.get(8)?,
        cash_reserve: row.get(9)?,
    })
}

pub fn find_by_id(conn: &Connection, budget_id: i64) -> Result<Option<Budget>> {
    let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM budgets WHERE id = ?1"))?;
    let mut rows = stmt.query_map(params![budget_id], decode)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

pub fn list_all(conn: &Connection) -> Result<Vec<Budget>> {
    let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM budgets ORDER BY id"))?;
    let budgets = stmt
        .query_map([], decode)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(budgets)
}

/// Insert a fresh budget row with zeroed totals; returns the issued id.
pub fn insert(
    conn: &Connection,
    title: &str,
    currency: &str,
    locale: &str,
    source_date: NaiveDate,
    fiscal_year: i32,
    cash_reserve: f64,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO budgets (title, currency, locale, source_date, fiscal_year, cash_reserve)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            title,
            currency,
            locale,
            source_date.format("%Y-%m-%d").to_string(),
            fiscal_year,
            cash_reserve,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Copy every summary field of `source` under a fresh id, replacing the
/// title. Used by the cloning pass.
pub fn insert_copy(conn: &Connection, source: &Budget, new_title: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO budgets (title, currency, locale, source_date, fiscal_year,
                              total_revenue, total_expenses, result, cash_reserve)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            new_title,
            source.currency,
            source.locale,
            source.source_date.format("%Y-%m-%d").to_string(),
            source.fiscal_year,
            source.total_revenue,
            source.total_expenses,
            source.result,
            source.cash_reserve,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Write the derived totals; `result` is revenue minus expenses.
pub fn update_totals(
    conn: &Connection,
    budget_id: i64,
    total_revenue: i64,
    total_expenses: i64,
) -> Result<usize> {
    let rows = conn.execute(
        "UPDATE budgets SET total_revenue = ?1, total_expenses = ?2, result = ?3 WHERE id = ?4",
        params![
            total_revenue,
            total_expenses,
            total_revenue - total_expenses,
            budget_id
        ],
    )?;
    Ok(rows)
}

/// Delete the budget row itself. The child tables are the mutation
/// service's cascade, not this function's.
pub fn delete(conn: &Connection, budget_id: i64) -> Result<usize> {
    let rows = conn.execute("DELETE FROM budgets WHERE id = ?1", params![budget_id])?;
    Ok(rows)
}

// Ministry accessor.
//
// total_budget is a derived aggregate (sum of the ministry's expense
// lines, maintained by recalculation). The regular/investment split is
// caller-owned and never derived.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ministry {
    pub id: i64,
    pub budget_id: i64,
    pub code: String,
    pub name: String,
    pub regular_budget: i64,
    pub public_investment: i64,
    pub total_budget: i64,
}

fn decode(row: &Row<'_>) -> rusqlite::Result<Ministry> {
    Ok(Ministry {
        id: row.get(0)?,
        budget_id: row.get(1)?,
        code: row.get(2)?,
        name: row.get(3)?,
        regular_budget: row.get(4)?,
        public_investment: row.get(5)?,
        total_budget: row.get(6)?,
    })
}

pub fn insert(
    conn: &Connection,
    budget_id: i64,
    code: &str,
    name: &str,
    regular_budget: i64,
    public_investment: i64,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO ministries (budget_id, code, name, regular_budget, public_investment, total_budget)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            budget_id,
            code,
            name,
            regular_budget,
            public_investment,
            regular_budget + public_investment,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn all_for_budget(conn: &Connection, budget_id: i64) -> Result<Vec<Ministry>> {
    let mut stmt = conn.prepare(
        "SELECT id, budget_id, code, name, regular_budget, public_investment, total_budget
         FROM ministries WHERE budget_id = ?1 ORDER BY id",
    )?;
    let rows = stmt
        .query_map(params![budget_id], decode)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn update_total(conn: &Connection, id: i64, total_budget: i64) -> Result<usize> {
    let rows = conn.execute(
        "UPDATE ministries SET total_budget = ?1 WHERE id = ?2",
        params![total_budget, id],
    )?;
    Ok(rows)
}

/// Set the regular/investment split. Does not touch total_budget: that is
/// recalculation's output, not an input.
pub fn update_split(conn: &Connection, id: i64, regular: i64, investment: i64) -> Result<usize> {
    let rows = conn.execute(
        "UPDATE ministries SET regular_budget = ?1, public_investment = ?2 WHERE id = ?3",
        params![regular, investment, id],
    )?;
    Ok(rows)
}

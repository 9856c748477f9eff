// Revenue category accessor - rows keyed by id with a parent-id column.
//
// The forest is never materialized as a pointer graph: the propagation
// algorithm walks it through the point lookups below. A stored parent_id
// of NULL means root; a stored 0 (seen in bulk-loaded sources) is
// normalized to None here, once, and every write made by this crate
// stores NULL.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueCategory {
    pub id: i64,
    pub budget_id: i64,
    /// Numeric classification code, unique within a budget by convention.
    pub code: String,
    pub name: String,
    pub amount: i64,
    /// None = root of a tree in the budget's forest.
    pub parent_id: Option<i64>,
}

impl RevenueCategory {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

const COLUMNS: &str = "id, budget_id, code, name, amount, parent_id";

fn decode(row: &Row<'_>) -> rusqlite::Result<RevenueCategory> {
    let parent_id: Option<i64> = row.get(5)?;
    Ok(RevenueCategory {
        id: row.get(0)?,
        budget_id: row.get(1)?,
        code: row.get(2)?,
        name: row.get(3)?,
        amount: row.get(4)?,
        parent_id: parent_id.filter(|&p| p != 0),
    })
}

pub fn insert(
    conn: &Connection,
    budget_id: i64,
    code: &str,
    name: &str,
    amount: i64,
    parent_id: Option<i64>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO revenue_categories (budget_id, code, name, amount, parent_id)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![budget_id, code, name, amount, parent_id.filter(|&p| p != 0)],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn find_by_code(conn: &Connection, budget_id: i64, code: &str) -> Result<Option<RevenueCategory>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM revenue_categories WHERE budget_id = ?1 AND code = ?2"
    ))?;
    let mut rows = stmt.query_map(params![budget_id, code], decode)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

pub fn find_by_id(conn: &Connection, budget_id: i64, id: i64) -> Result<Option<RevenueCategory>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM revenue_categories WHERE budget_id = ?1 AND id = ?2"
    ))?;
    let mut rows = stmt.query_map(params![budget_id, id], decode)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

/// Direct children of `parent_id`, ordered by id for deterministic walks.
pub fn children_of(conn: &Connection, budget_id: i64, parent_id: i64) -> Result<Vec<RevenueCategory>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM revenue_categories
         WHERE budget_id = ?1 AND parent_id = ?2 ORDER BY id"
    ))?;
    let rows = stmt
        .query_map(params![budget_id, parent_id], decode)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn all_for_budget(conn: &Connection, budget_id: i64) -> Result<Vec<RevenueCategory>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM revenue_categories WHERE budget_id = ?1 ORDER BY id"
    ))?;
    let rows = stmt
        .query_map(params![budget_id], decode)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn update_amount(conn: &Connection, id: i64, amount: i64) -> Result<usize> {
    let rows = conn.execute(
        "UPDATE revenue_categories SET amount = ?1 WHERE id = ?2",
        params![amount, id],
    )?;
    Ok(rows)
}

/// Sum of top-level (parentless) amounts only - children are already
/// folded into their parents by propagation, so summing every row would
/// double-count.
pub fn sum_top_level(conn: &Connection, budget_id: i64) -> Result<i64> {
    let sum: i64 = conn.query_row(
        "SELECT COALESCE(SUM(amount), 0) FROM revenue_categories
         WHERE budget_id = ?1 AND (parent_id IS NULL OR parent_id = 0)",
        params![budget_id],
        |row| row.get(0),
    )?;
    Ok(sum)
}

pub fn count_for_budget(conn: &Connection, budget_id: i64) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM revenue_categories WHERE budget_id = ?1",
        params![budget_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

// Expense category accessor - flat, no hierarchy.
//
// The amount column is a derived aggregate: the sum of every ministry
// expense referencing the category, maintained by the recalculation pass.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseCategory {
    pub id: i64,
    pub budget_id: i64,
    pub code: String,
    pub name: String,
    pub amount: i64,
}

fn decode(row: &Row<'_>) -> rusqlite::Result<ExpenseCategory> {
    Ok(ExpenseCategory {
        id: row.get(0)?,
        budget_id: row.get(1)?,
        code: row.get(2)?,
        name: row.get(3)?,
        amount: row.get(4)?,
    })
}

pub fn insert(conn: &Connection, budget_id: i64, code: &str, name: &str, amount: i64) -> Result<i64> {
    conn.execute(
        "INSERT INTO expense_categories (budget_id, code, name, amount)
         VALUES (?1, ?2, ?3, ?4)",
        params![budget_id, code, name, amount],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn all_for_budget(conn: &Connection, budget_id: i64) -> Result<Vec<ExpenseCategory>> {
    let mut stmt = conn.prepare(
        "SELECT id, budget_id, code, name, amount FROM expense_categories
         WHERE budget_id = ?1 ORDER BY id",
    )?;
    let rows = stmt
        .query_map(params![budget_id], decode)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn update_amount(conn: &Connection, id: i64, amount: i64) -> Result<usize> {
    let rows = conn.execute(
        "UPDATE expense_categories SET amount = ?1 WHERE id = ?2",
        params![amount, id],
    )?;
    Ok(rows)
}

/// Sum of all category amounts in the budget. Meaningful right after
/// recalculation step 2; stale before it.
pub fn sum_amounts(conn: &Connection, budget_id: i64) -> Result<i64> {
    let sum: i64 = conn.query_row(
        "SELECT COALESCE(SUM(amount), 0) FROM expense_categories WHERE budget_id = ?1",
        params![budget_id],
        |row| row.get(0),
    )?;
    Ok(sum)
}

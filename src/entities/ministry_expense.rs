// Ministry expense accessor - the atomic, independently-editable leaf of
// the expense side. Every aggregate on that side is a sum over these rows.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinistryExpense {
    pub id: i64,
    pub budget_id: i64,
    pub ministry_id: i64,
    pub expense_category_id: i64,
    pub amount: i64,
}

fn decode(row: &Row<'_>) -> rusqlite::Result<MinistryExpense> {
    Ok(MinistryExpense {
        id: row.get(0)?,
        budget_id: row.get(1)?,
        ministry_id: row.get(2)?,
        expense_category_id: row.get(3)?,
        amount: row.get(4)?,
    })
}

pub fn insert(
    conn: &Connection,
    budget_id: i64,
    ministry_id: i64,
    expense_category_id: i64,
    amount: i64,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO ministry_expenses (budget_id, ministry_id, expense_category_id, amount)
         VALUES (?1, ?2, ?3, ?4)",
        params![budget_id, ministry_id, expense_category_id, amount],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn all_for_budget(conn: &Connection, budget_id: i64) -> Result<Vec<MinistryExpense>> {
    let mut stmt = conn.prepare(
        "SELECT id, budget_id, ministry_id, expense_category_id, amount
         FROM ministry_expenses WHERE budget_id = ?1 ORDER BY id",
    )?;
    let rows = stmt
        .query_map(params![budget_id], decode)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn sum_for_ministry(conn: &Connection, ministry_id: i64) -> Result<i64> {
    let sum: i64 = conn.query_row(
        "SELECT COALESCE(SUM(amount), 0) FROM ministry_expenses WHERE ministry_id = ?1",
        params![ministry_id],
        |row| row.get(0),
    )?;
    Ok(sum)
}

pub fn sum_for_expense_category(conn: &Connection, expense_category_id: i64) -> Result<i64> {
    let sum: i64 = conn.query_row(
        "SELECT COALESCE(SUM(amount), 0) FROM ministry_expenses WHERE expense_category_id = ?1",
        params![expense_category_id],
        |row| row.get(0),
    )?;
    Ok(sum)
}

/// Direct leaf edit, scoped to the owning budget. A row id from another
/// budget (or no row at all) is NotFound, never a silent zero-row update.
pub fn update_amount(conn: &Connection, budget_id: i64, id: i64, amount: i64) -> Result<usize> {
    let rows = conn.execute(
        "UPDATE ministry_expenses SET amount = ?1 WHERE id = ?2 AND budget_id = ?3",
        params![amount, id, budget_id],
    )?;
    if rows == 0 {
        return Err(EngineError::NotFound(format!(
            "ministry expense {id} in budget {budget_id}"
        )));
    }
    Ok(rows)
}

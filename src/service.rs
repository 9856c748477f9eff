// Mutation service - the only write entry points a caller needs.
//
// Each operation opens one rusqlite transaction and either commits it or
// lets it roll back on drop, so every `?` early-return leaves the store
// exactly as it was. Callers are expected to serialize mutations per
// budget themselves (single-writer-per-budget); nothing here caches
// entity state between calls.

use rusqlite::Connection;
use std::collections::BTreeMap;
use tracing::info;

use crate::cloning;
use crate::entities::ministry_expense;
use crate::error::Result;
use crate::propagation;
use crate::recalc;

/// Apply a batch of leaf edits to one budget, then restore every
/// aggregate invariant, as a single all-or-nothing unit.
///
/// Revenue edits are keyed by classification code and go through
/// hierarchical propagation; ministry-expense edits are keyed by row id
/// and are direct writes. Recalculation runs exactly once, after the
/// whole batch, so no transient aggregate is ever observed mid-batch.
///
/// Returns the number of leaf/propagated rows changed (aggregate rewrites
/// are not counted). An entirely no-op batch returns Ok(0).
pub fn update_budget_amounts(
    conn: &mut Connection,
    budget_id: i64,
    revenue_edits: &BTreeMap<String, i64>,
    expense_edits: &BTreeMap<i64, i64>,
) -> Result<usize> {
    let tx = conn.transaction()?;
    let mut rows = 0;

    for (code, amount) in revenue_edits {
        rows += propagation::set_revenue_amount(&tx, budget_id, code, *amount)?;
    }
    for (id, amount) in expense_edits {
        rows += ministry_expense::update_amount(&tx, budget_id, *id, *amount)?;
    }

    recalc::recalculate_all(&tx, budget_id)?;
    tx.commit()?;

    info!(
        budget_id,
        revenue_edits = revenue_edits.len(),
        expense_edits = expense_edits.len(),
        rows,
        "budget amounts updated"
    );
    Ok(rows)
}

/// Clone an entire budget graph under `new_title`; returns the new id.
/// All-or-nothing: a failure partway through leaves no trace of the
/// attempted budget.
pub fn clone_budget(conn: &mut Connection, source_id: i64, new_title: &str) -> Result<i64> {
    let tx = conn.transaction()?;
    let new_id = cloning::clone_budget_graph(&tx, source_id, new_title)?;
    tx.commit()?;
    Ok(new_id)
}

/// Delete a budget and everything it owns. The cascade is explicit so it
/// does not depend on the store's foreign-key enforcement being enabled.
/// Returns the total rows removed across the five tables.
pub fn delete_budget(conn: &mut Connection, budget_id: i64) -> Result<usize> {
    let tx = conn.transaction()?;
    let mut rows = 0;

    for table in [
        "ministry_expenses",
        "ministries",
        "expense_categories",
        "revenue_categories",
    ] {
        rows += tx.execute(
            &format!("DELETE FROM {table} WHERE budget_id = ?1"),
            rusqlite::params![budget_id],
        )?;
    }
    rows += crate::entities::budget::delete(&tx, budget_id)?;

    tx.commit()?;
    info!(budget_id, rows, "budget deleted");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::entities::{budget, expense, ministry, revenue};

    fn store() -> Connection {
        let conn = db::open_in_memory().unwrap();
        db::setup_schema(&conn).unwrap();
        conn
    }

    fn seed_budget(conn: &Connection) -> i64 {
        conn.execute(
            "INSERT INTO budgets (title, currency, locale, source_date, fiscal_year)
             VALUES ('State Budget 2025', 'EUR', 'el-GR', '2024-11-01', 2025)",
            [],
        )
        .unwrap();
        let b = conn.last_insert_rowid();

        let root = revenue::insert(conn, b, "0100", "Direct taxes", 600, None).unwrap();
        revenue::insert(conn, b, "0110", "Income tax", 400, Some(root)).unwrap();
        revenue::insert(conn, b, "0200", "Indirect taxes", 300, None).unwrap();

        let edu = ministry::insert(conn, b, "07", "Education", 0, 0).unwrap();
        let salaries = expense::insert(conn, b, "21", "Salaries", 0).unwrap();
        ministry_expense::insert(conn, b, edu, salaries, 250).unwrap();

        b
    }

    fn revenue_edits(pairs: &[(&str, i64)]) -> BTreeMap<String, i64> {
        pairs.iter().map(|(c, a)| (c.to_string(), *a)).collect()
    }

    #[test]
    fn batch_applies_edits_then_recalculates_once() {
        let mut conn = store();
        let b = seed_budget(&conn);
        let line_id = ministry_expense::all_for_budget(&conn, b).unwrap()[0].id;

        let mut expense_edits = BTreeMap::new();
        expense_edits.insert(line_id, 400);

        let rows = update_budget_amounts(
            &mut conn,
            b,
            &revenue_edits(&[("0110", 500)]),
            &expense_edits,
        )
        .unwrap();
        // 0110 + its parent 0100, plus the expense line.
        assert_eq!(rows, 3);

        let summary = budget::find_by_id(&conn, b).unwrap().unwrap();
        // Revenue: 0100 became 700 (600 + 100 delta), 0200 stays 300.
        assert_eq!(summary.total_revenue, 1000);
        assert_eq!(summary.total_expenses, 400);
        assert_eq!(summary.result, 600);

        assert_eq!(ministry::all_for_budget(&conn, b).unwrap()[0].total_budget, 400);
        assert_eq!(expense::all_for_budget(&conn, b).unwrap()[0].amount, 400);
    }

    #[test]
    fn failed_batch_rolls_back_every_edit() {
        let mut conn = store();
        let b = seed_budget(&conn);

        // "0110" is valid and sorts before the bogus code, so it is
        // applied inside the transaction before the failure.
        let err = update_budget_amounts(
            &mut conn,
            b,
            &revenue_edits(&[("0110", 500), ("9999", 1)]),
            &BTreeMap::new(),
        )
        .unwrap_err();
        assert!(err.is_not_found());

        // Nothing is half-applied.
        let node = revenue::find_by_code(&conn, b, "0110").unwrap().unwrap();
        assert_eq!(node.amount, 400);
        let root = revenue::find_by_code(&conn, b, "0100").unwrap().unwrap();
        assert_eq!(root.amount, 600);
        let summary = budget::find_by_id(&conn, b).unwrap().unwrap();
        assert_eq!(summary.total_revenue, 0);
    }

    #[test]
    fn empty_batch_still_recalculates() {
        let mut conn = store();
        let b = seed_budget(&conn);

        let rows =
            update_budget_amounts(&mut conn, b, &BTreeMap::new(), &BTreeMap::new()).unwrap();
        assert_eq!(rows, 0);

        let summary = budget::find_by_id(&conn, b).unwrap().unwrap();
        assert_eq!(summary.total_revenue, 900);
        assert_eq!(summary.total_expenses, 250);
    }

    #[test]
    fn failed_clone_leaves_no_trace() {
        let mut conn = store();
        let b = seed_budget(&conn);
        // Dangling expense-category reference in the source graph.
        conn.execute(
            "INSERT INTO ministry_expenses (budget_id, ministry_id, expense_category_id, amount)
             SELECT ?1, id, 9999, 10 FROM ministries WHERE budget_id = ?1 LIMIT 1",
            rusqlite::params![b],
        )
        .unwrap();

        let budgets_before = budget::list_all(&conn).unwrap().len();
        let err = clone_budget(&mut conn, b, "Copy").unwrap_err();
        assert!(err.is_integrity());

        // Zero rows for the attempted budget, anywhere.
        assert_eq!(budget::list_all(&conn).unwrap().len(), budgets_before);
        let orphans: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM revenue_categories WHERE budget_id != ?1",
                rusqlite::params![b],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[test]
    fn clone_of_unknown_budget_is_not_found_and_creates_nothing() {
        let mut conn = store();
        let err = clone_budget(&mut conn, 77, "Copy").unwrap_err();
        assert!(err.is_not_found());
        assert!(budget::list_all(&conn).unwrap().is_empty());
    }

    #[test]
    fn successful_clone_commits() {
        let mut conn = store();
        let b = seed_budget(&conn);

        let copy = clone_budget(&mut conn, b, "Draft").unwrap();

        assert_eq!(budget::list_all(&conn).unwrap().len(), 2);
        assert_eq!(revenue::count_for_budget(&conn, copy).unwrap(), 3);
    }

    #[test]
    fn delete_cascades_through_all_tables() {
        let mut conn = store();
        let b = seed_budget(&conn);
        let other = seed_budget(&conn);

        let rows = delete_budget(&mut conn, b).unwrap();
        // 1 budget + 3 revenue + 1 ministry + 1 category + 1 line.
        assert_eq!(rows, 7);

        assert!(budget::find_by_id(&conn, b).unwrap().is_none());
        assert_eq!(revenue::count_for_budget(&conn, b).unwrap(), 0);
        assert!(ministry_expense::all_for_budget(&conn, b).unwrap().is_empty());

        // The sibling budget is untouched.
        assert_eq!(revenue::count_for_budget(&conn, other).unwrap(), 3);
    }
}

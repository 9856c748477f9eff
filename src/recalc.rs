// Cascading recalculation - restores every aggregate-sum invariant after
// a batch of leaf edits, in strict dependency order.
//
// Order matters: ministry totals and expense-category amounts are sums
// over ministry-expense rows, the budget's expense total is a sum over
// the (freshly recomputed) expense categories, and the result is derived
// from both totals. No step may read a stale aggregate.

use rusqlite::Connection;
use tracing::debug;

use crate::entities::{budget, expense, ministry, ministry_expense, revenue};
use crate::error::Result;

/// Recompute every derived aggregate in `budget_id`, bottom up:
///
/// 1. ministry total = sum of its expense lines
/// 2. expense category amount = sum of lines referencing it
/// 3. budget revenue total = sum of top-level revenue categories
/// 4. budget expense total = sum of expense categories
/// 5. budget result = revenue - expenses
///
/// Runs once per mutation batch, inside the caller's transaction.
pub fn recalculate_all(conn: &Connection, budget_id: i64) -> Result<()> {
    for m in ministry::all_for_budget(conn, budget_id)? {
        let total = ministry_expense::sum_for_ministry(conn, m.id)?;
        if total != m.total_budget {
            ministry::update_total(conn, m.id, total)?;
        }
    }

    for cat in expense::all_for_budget(conn, budget_id)? {
        let total = ministry_expense::sum_for_expense_category(conn, cat.id)?;
        if total != cat.amount {
            expense::update_amount(conn, cat.id, total)?;
        }
    }

    let total_revenue = revenue::sum_top_level(conn, budget_id)?;
    let total_expenses = expense::sum_amounts(conn, budget_id)?;
    budget::update_totals(conn, budget_id, total_revenue, total_expenses)?;

    debug!(budget_id, total_revenue, total_expenses, "aggregates recalculated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::entities::Budget;

    fn store() -> (Connection, i64) {
        let conn = db::open_in_memory().unwrap();
        db::setup_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO budgets (title, currency, locale, source_date, fiscal_year)
             VALUES ('Test', 'EUR', 'el-GR', '2024-11-01', 2025)",
            [],
        )
        .unwrap();
        let b = conn.last_insert_rowid();
        (conn, b)
    }

    fn summary(conn: &Connection, budget_id: i64) -> Budget {
        budget::find_by_id(conn, budget_id).unwrap().unwrap()
    }

    #[test]
    fn aggregates_close_over_their_constituents() {
        let (conn, b) = store();

        let root_a = revenue::insert(&conn, b, "0100", "Direct taxes", 600, None).unwrap();
        revenue::insert(&conn, b, "0110", "Income tax", 400, Some(root_a)).unwrap();
        revenue::insert(&conn, b, "0200", "Indirect taxes", 300, None).unwrap();

        let edu = ministry::insert(&conn, b, "07", "Education", 0, 0).unwrap();
        let health = ministry::insert(&conn, b, "08", "Health", 0, 0).unwrap();
        let salaries = expense::insert(&conn, b, "21", "Salaries", 0).unwrap();
        let supplies = expense::insert(&conn, b, "23", "Supplies", 0).unwrap();

        ministry_expense::insert(&conn, b, edu, salaries, 250).unwrap();
        ministry_expense::insert(&conn, b, edu, supplies, 50).unwrap();
        ministry_expense::insert(&conn, b, health, salaries, 300).unwrap();

        recalculate_all(&conn, b).unwrap();

        let ministries = ministry::all_for_budget(&conn, b).unwrap();
        assert_eq!(ministries[0].total_budget, 300); // education
        assert_eq!(ministries[1].total_budget, 300); // health

        let categories = expense::all_for_budget(&conn, b).unwrap();
        assert_eq!(categories[0].amount, 550); // salaries
        assert_eq!(categories[1].amount, 50); // supplies

        let s = summary(&conn, b);
        // Revenue: top-level rows only (600 + 300), not the child.
        assert_eq!(s.total_revenue, 900);
        assert_eq!(s.total_expenses, 600);
        assert_eq!(s.result, 300);

        // Closure: budget expenses == sum of categories == sum of lines.
        let line_sum: i64 = ministry_expense::all_for_budget(&conn, b)
            .unwrap()
            .iter()
            .map(|l| l.amount)
            .sum();
        assert_eq!(s.total_expenses, line_sum);
    }

    #[test]
    fn stale_aggregates_are_overwritten() {
        let (conn, b) = store();

        let edu = ministry::insert(&conn, b, "07", "Education", 100, 50).unwrap();
        let salaries = expense::insert(&conn, b, "21", "Salaries", 12345).unwrap();
        ministry_expense::insert(&conn, b, edu, salaries, 80).unwrap();

        recalculate_all(&conn, b).unwrap();

        // Ministry total comes from the line items, not the stale split.
        assert_eq!(ministry::all_for_budget(&conn, b).unwrap()[0].total_budget, 80);
        assert_eq!(expense::all_for_budget(&conn, b).unwrap()[0].amount, 80);
        assert_eq!(summary(&conn, b).total_expenses, 80);
    }

    #[test]
    fn empty_budget_recalculates_to_zero() {
        let (conn, b) = store();
        conn.execute("UPDATE budgets SET total_revenue = 7, total_expenses = 9, result = -2", [])
            .unwrap();

        recalculate_all(&conn, b).unwrap();

        let s = summary(&conn, b);
        assert_eq!(s.total_revenue, 0);
        assert_eq!(s.total_expenses, 0);
        assert_eq!(s.result, 0);
    }

    #[test]
    fn ministry_with_no_lines_totals_zero() {
        let (conn, b) = store();
        ministry::insert(&conn, b, "07", "Education", 100, 50).unwrap();

        recalculate_all(&conn, b).unwrap();

        assert_eq!(ministry::all_for_budget(&conn, b).unwrap()[0].total_budget, 0);
    }
}

// Hierarchical propagation - keeps a revenue tree numerically coherent
// with a single leaf edit.
//
// Ancestors are additive: a parent is the literal sum of its children, so
// the edit's delta passes through unchanged all the way to the root.
// Descendants are proportional: each child is scaled by its own parent's
// new/old ratio, and recursion re-bases on the child's own old/new pair,
// so ratios compound level by level rather than applying the top ratio
// uniformly. Callers rely on that compounding; see the regression test.

use rusqlite::Connection;
use std::collections::HashSet;
use tracing::debug;

use crate::entities::revenue::{self, RevenueCategory};
use crate::error::{EngineError, Result};

/// Set the amount of the revenue category with `code` and propagate the
/// change up to the forest root and down through the subtree.
///
/// Returns the number of rows whose stored amount changed. Setting a node
/// to its current amount is a recognized no-op and returns 0.
///
/// Must run inside the caller's transaction: a failure halfway through
/// the walks leaves writes that only rollback can undo.
pub fn set_revenue_amount(
    conn: &Connection,
    budget_id: i64,
    code: &str,
    new_amount: i64,
) -> Result<usize> {
    let target = revenue::find_by_code(conn, budget_id, code)?.ok_or_else(|| {
        EngineError::NotFound(format!("revenue code {code} in budget {budget_id}"))
    })?;

    let old_amount = target.amount;
    if new_amount == old_amount {
        return Ok(0);
    }

    // Target first: both walks reason from its committed new value.
    let mut rows = revenue::update_amount(conn, target.id, new_amount)?;

    let delta = new_amount - old_amount;
    rows += add_to_ancestors(conn, budget_id, &target, delta)?;

    if old_amount == 0 {
        // No ratio is definable from a zero base; the subtree keeps its
        // amounts. Documented edge case, not an error.
        debug!(code, "zero-base edit, descendant scaling skipped");
    } else {
        rows += scale_descendants(conn, budget_id, target.id, new_amount as f64 / old_amount as f64)?;
    }

    debug!(budget_id, code, old_amount, new_amount, rows, "revenue amount set");
    Ok(rows)
}

/// Walk the parent chain to the root, adding `delta` at every level.
fn add_to_ancestors(
    conn: &Connection,
    budget_id: i64,
    target: &RevenueCategory,
    delta: i64,
) -> Result<usize> {
    let mut rows = 0;
    let mut seen: HashSet<i64> = HashSet::new();
    seen.insert(target.id);

    let mut next = target.parent_id;
    while let Some(parent_id) = next {
        if !seen.insert(parent_id) {
            return Err(EngineError::Integrity(format!(
                "parent cycle through revenue category {parent_id}"
            )));
        }
        let parent = revenue::find_by_id(conn, budget_id, parent_id)?.ok_or_else(|| {
            EngineError::Integrity(format!(
                "revenue category {} references missing parent {parent_id}",
                target.code
            ))
        })?;
        rows += revenue::update_amount(conn, parent.id, parent.amount + delta)?;
        next = parent.parent_id;
    }

    Ok(rows)
}

/// Scale every descendant, re-basing the ratio at each level on the
/// child's own old/new pair. A child whose old amount is zero keeps its
/// subtree untouched.
fn scale_descendants(conn: &Connection, budget_id: i64, root: i64, ratio: f64) -> Result<usize> {
    let mut rows = 0;
    let mut stack: Vec<(i64, f64)> = vec![(root, ratio)];

    while let Some((node_id, ratio)) = stack.pop() {
        for child in revenue::children_of(conn, budget_id, node_id)? {
            let scaled = (child.amount as f64 * ratio).round() as i64;
            if scaled != child.amount {
                rows += revenue::update_amount(conn, child.id, scaled)?;
            }
            if child.amount != 0 {
                stack.push((child.id, scaled as f64 / child.amount as f64));
            }
        }
    }

    Ok(rows)
}

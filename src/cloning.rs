// Budget cloning - deep copy of one budget's graph under fresh ids.
//
// New ids are issued by the store during the copy, so cross-references
// are rebuilt through incremental old-id -> new-id tables: revenue rows
// go in parents before children, and ministry-expense rows translate
// their two foreign keys through the ministry and expense-category maps.

use rusqlite::Connection;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::entities::{budget, expense, ministry, ministry_expense, revenue};
use crate::error::{EngineError, Result};

/// Ordered old-id -> new-id table for one entity kind, built while rows
/// are copied and consulted when dependent rows are written.
#[derive(Debug, Default)]
pub struct IdMap {
    entries: BTreeMap<i64, i64>,
}

impl IdMap {
    pub fn new() -> Self {
        IdMap::default()
    }

    pub fn record(&mut self, old_id: i64, new_id: i64) {
        self.entries.insert(old_id, new_id);
    }

    pub fn contains(&self, old_id: i64) -> bool {
        self.entries.contains_key(&old_id)
    }

    /// Look up the remapped id; a miss means the source graph holds a
    /// dangling reference.
    pub fn translate(&self, kind: &str, old_id: i64) -> Result<i64> {
        self.entries.get(&old_id).copied().ok_or_else(|| {
            EngineError::Integrity(format!("dangling {kind} reference: {old_id}"))
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Copy the whole graph of `source_id` into a new budget titled
/// `new_title`; returns the new budget id.
///
/// Must run inside the caller's transaction - a failure after partial
/// writes relies on rollback to leave zero trace.
pub fn clone_budget_graph(conn: &Connection, source_id: i64, new_title: &str) -> Result<i64> {
    let source = budget::find_by_id(conn, source_id)?
        .ok_or_else(|| EngineError::NotFound(format!("budget {source_id}")))?;

    let new_id = budget::insert_copy(conn, &source, new_title)?;

    let revenue_map = copy_revenue_forest(conn, source_id, new_id)?;

    let mut ministry_map = IdMap::new();
    for m in ministry::all_for_budget(conn, source_id)? {
        let copied = ministry::insert(conn, new_id, &m.code, &m.name, m.regular_budget, m.public_investment)?;
        // insert() seeds total from the split; carry the source's derived total.
        ministry::update_total(conn, copied, m.total_budget)?;
        ministry_map.record(m.id, copied);
    }

    let mut expense_map = IdMap::new();
    for cat in expense::all_for_budget(conn, source_id)? {
        let copied = expense::insert(conn, new_id, &cat.code, &cat.name, cat.amount)?;
        expense_map.record(cat.id, copied);
    }

    for line in ministry_expense::all_for_budget(conn, source_id)? {
        let ministry_id = ministry_map.translate("ministry", line.ministry_id)?;
        let category_id = expense_map.translate("expense category", line.expense_category_id)?;
        ministry_expense::insert(conn, new_id, ministry_id, category_id, line.amount)?;
    }

    info!(
        source_id,
        new_id,
        revenue = revenue_map.len(),
        ministries = ministry_map.len(),
        categories = expense_map.len(),
        "budget cloned"
    );
    Ok(new_id)
}

/// Copy the revenue forest in passes, inserting a node only once its
/// remapped parent is known. A pass that makes no progress while rows
/// remain means a parent reference that can never resolve.
fn copy_revenue_forest(conn: &Connection, source_id: i64, new_id: i64) -> Result<IdMap> {
    let mut map = IdMap::new();
    let mut pending = revenue::all_for_budget(conn, source_id)?;

    while !pending.is_empty() {
        let before = pending.len();
        let mut deferred = Vec::new();

        for node in pending {
            let parent = match node.parent_id {
                None => None,
                Some(p) if map.contains(p) => Some(map.translate("revenue parent", p)?),
                Some(_) => {
                    deferred.push(node);
                    continue;
                }
            };
            let copied = revenue::insert(conn, new_id, &node.code, &node.name, node.amount, parent)?;
            map.record(node.id, copied);
        }

        if deferred.len() == before {
            let codes: Vec<&str> = deferred.iter().map(|n| n.code.as_str()).collect();
            return Err(EngineError::Integrity(format!(
                "unresolvable revenue parent references for codes {codes:?}"
            )));
        }
        pending = deferred;
    }

    debug!(source_id, new_id, copied = map.len(), "revenue forest copied");
    Ok(map)
}

// Bulk load of an extracted budget document.
//
// The upstream pipeline (PDF text extraction + AI structuring) delivers a
// fully-populated, already-validated graph as JSON; this module's job is
// only "insert this graph", in one transaction, and leave the stored
// aggregates consistent. No semantic validation happens here - the
// ingestion path trusts its input by contract.

use chrono::NaiveDate;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

use crate::entities::{budget, expense, ministry, ministry_expense, revenue};
use crate::error::{EngineError, Result};
use crate::recalc;

/// One extracted budget: summary fields plus the four child collections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetDocument {
    pub title: String,
    pub currency: String,
    pub locale: String,
    pub source_date: NaiveDate,
    pub fiscal_year: i32,
    #[serde(default)]
    pub cash_reserve: f64,
    #[serde(default)]
    pub revenue: Vec<RevenueNode>,
    #[serde(default)]
    pub expense_categories: Vec<ExpenseCategoryEntry>,
    #[serde(default)]
    pub ministries: Vec<MinistryEntry>,
}

/// Revenue tree node; nesting expresses the forest, ids are issued at
/// insert time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueNode {
    pub code: String,
    pub name: String,
    pub amount: i64,
    #[serde(default)]
    pub children: Vec<RevenueNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseCategoryEntry {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinistryEntry {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub regular_budget: i64,
    #[serde(default)]
    pub public_investment: i64,
    #[serde(default)]
    pub expenses: Vec<ExpenseLine>,
}

/// One ministry expense line, referencing its category by code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseLine {
    pub category_code: String,
    pub amount: i64,
}

/// Decode a budget document from a JSON file.
pub fn load_document(path: &Path) -> Result<BudgetDocument> {
    let text = std::fs::read_to_string(path)?;
    let doc: BudgetDocument = serde_json::from_str(&text)?;
    Ok(doc)
}

/// Insert the whole graph as one transaction and recalculate once so the
/// stored aggregates are consistent from the first read. Returns the new
/// budget id.
pub fn insert_budget_graph(conn: &mut Connection, doc: &BudgetDocument) -> Result<i64> {
    let tx = conn.transaction()?;

    let budget_id = budget::insert(
        &tx,
        &doc.title,
        &doc.currency,
        &doc.locale,
        doc.source_date,
        doc.fiscal_year,
        doc.cash_reserve,
    )?;

    for node in &doc.revenue {
        insert_revenue_node(&tx, budget_id, node, None)?;
    }

    let mut category_ids: BTreeMap<&str, i64> = BTreeMap::new();
    for cat in &doc.expense_categories {
        let id = expense::insert(&tx, budget_id, &cat.code, &cat.name, 0)?;
        category_ids.insert(cat.code.as_str(), id);
    }

    for entry in &doc.ministries {
        let ministry_id = ministry::insert(
            &tx,
            budget_id,
            &entry.code,
            &entry.name,
            entry.regular_budget,
            entry.public_investment,
        )?;
        for line in &entry.expenses {
            let category_id = *category_ids.get(line.category_code.as_str()).ok_or_else(|| {
                EngineError::Integrity(format!(
                    "ministry {} references unknown expense category {}",
                    entry.code, line.category_code
                ))
            })?;
            ministry_expense::insert(&tx, budget_id, ministry_id, category_id, line.amount)?;
        }
    }

    recalc::recalculate_all(&tx, budget_id)?;
    tx.commit()?;

    info!(budget_id, title = %doc.title, fiscal_year = doc.fiscal_year, "budget ingested");
    Ok(budget_id)
}

/// Depth-first insert: a node's id exists before its children need it.
fn insert_revenue_node(
    conn: &Connection,
    budget_id: i64,
    node: &RevenueNode,
    parent_id: Option<i64>,
) -> Result<()> {
    let id = revenue::insert(conn, budget_id, &node.code, &node.name, node.amount, parent_id)?;
    for child in &node.children {
        insert_revenue_node(conn, budget_id, child, Some(id))?;
    }
    Ok(())
}

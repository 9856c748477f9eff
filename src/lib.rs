// Budget consistency engine - core library
//
// Keeps a hierarchical, multi-table budget dataset internally consistent
// as leaf values are edited, cloned, or bulk-loaded. Exposed to callers
// through exactly two write entry points (service::update_budget_amounts,
// service::clone_budget) plus the ingest path for new budgets.

pub mod db;
pub mod error;
pub mod entities;
pub mod propagation;
pub mod recalc;
pub mod cloning;
pub mod service;
pub mod ingest;

// Re-export commonly used types
pub use db::{last_issued_ids, open, open_in_memory, setup_schema, SequenceRow, StoreConfig};
pub use entities::{Budget, ExpenseCategory, Ministry, MinistryExpense, RevenueCategory};
pub use error::{EngineError, Result};
pub use ingest::{insert_budget_graph, load_document, BudgetDocument, RevenueNode};
pub use service::{clone_budget, delete_budget, update_budget_amounts};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

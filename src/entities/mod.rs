// Entity accessors - one typed record per table, decoded once at this
// boundary so the algorithms never see loosely-typed rows.
//
// Every read and write is scoped to an owning budget id. Accessors are
// free functions over `&Connection` so they compose inside whatever
// transaction the mutation service has open.

pub mod budget;
pub mod expense;
pub mod ministry;
pub mod ministry_expense;
pub mod revenue;

pub use budget::Budget;
pub use expense::ExpenseCategory;
pub use ministry::Ministry;
pub use ministry_expense::MinistryExpense;
pub use revenue::RevenueCategory;

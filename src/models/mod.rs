//! Data models for the circulation server

pub mod book;
pub mod loan;
pub mod user;

// Re-export commonly used types
pub use book::{Book, BookQuery, CatalogSummary, CreateBook, UpdateBook};
pub use loan::{Loan, LoanDetails, LoanQuery, LoanStatus, OverdueLoan};
pub use user::{Role, User, UserQuery};

//! Repository layer: store interfaces and their implementations
//!
//! Three stores back the circulation server. [`CatalogStore`] owns books,
//! [`DirectoryStore`] owns user accounts and [`LoanLedger`] owns loans. The
//! ledger's [`LoanLedger::open`] and [`LoanLedger::close`] are the only
//! operations that touch more than one collection; both are atomic and
//! conditional, so a lost race surfaces as [`AppError::Conflict`] instead of
//! a half-applied write.
//!
//! [`AppError::Conflict`]: crate::error::AppError::Conflict

pub mod books;
pub mod loans;
pub mod memory;
pub mod users;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        book::{Book, BookQuery, CatalogSummary, CreateBook, UpdateBook},
        loan::{Loan, LoanClosure, LoanQuery, LoanSummary, NewLoan},
        user::{NewUser, Role, User, UserChanges, UserQuery},
    },
};

/// Book records
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn create(&self, book: &CreateBook) -> AppResult<Book>;

    /// Fails with `NotFound` when absent
    async fn get_by_id(&self, id: i32) -> AppResult<Book>;

    async fn search(&self, query: &BookQuery) -> AppResult<Vec<Book>>;

    /// Partial update; refuses (`Conflict`) a `book_count` below the copies on loan
    async fn update(&self, id: i32, update: &UpdateBook) -> AppResult<Book>;

    /// Refuses (`Conflict`) while copies are on loan
    async fn delete(&self, id: i32) -> AppResult<()>;

    async fn departments(&self) -> AppResult<Vec<String>>;

    async fn summary(&self) -> AppResult<CatalogSummary>;
}

/// User accounts
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Fails with `Conflict` on a duplicate id or email
    async fn create(&self, user: &NewUser) -> AppResult<User>;

    async fn find_by_id(&self, id: &str) -> AppResult<Option<User>>;

    async fn email_exists(&self, email: &str, exclude_id: Option<&str>) -> AppResult<bool>;

    async fn list(&self, query: &UserQuery) -> AppResult<Vec<User>>;

    async fn update(&self, id: &str, changes: &UserChanges) -> AppResult<User>;

    async fn delete(&self, id: &str) -> AppResult<()>;

    async fn count_by_role(&self, role: Role) -> AppResult<i64>;
}

/// Loan records and the lend/return transitions
#[async_trait]
pub trait LoanLedger: Send + Sync {
    /// Reserve a copy and record the loan as one unit.
    ///
    /// Checks, in order: the book exists, the user exists, a copy is
    /// available. The copy is reserved with a conditional increment of
    /// `borrowed_count`, so of two concurrent calls for the last copy
    /// exactly one succeeds.
    async fn open(&self, loan: &NewLoan) -> AppResult<Loan>;

    async fn get_by_id(&self, id: i32) -> AppResult<Loan>;

    /// Mark a borrowed loan returned, give the copy back and charge the
    /// penalty to the user, as one unit conditioned on the loan still being
    /// borrowed. A second close of the same loan fails with `Conflict`.
    async fn close(&self, id: i32, closure: &LoanClosure) -> AppResult<Loan>;

    /// Most recently borrowed first
    async fn list(&self, query: &LoanQuery) -> AppResult<Vec<Loan>>;

    /// Open loans due strictly before `now`, oldest due date first
    async fn find_overdue(&self, now: DateTime<Utc>) -> AppResult<Vec<Loan>>;

    async fn count_open_for_user(&self, user_id: &str) -> AppResult<i64>;

    async fn summary(&self, now: DateTime<Utc>) -> AppResult<LoanSummary>;
}

/// Handles on every store, shared by the services
#[derive(Clone)]
pub struct Repository {
    pub books: Arc<dyn CatalogStore>,
    pub users: Arc<dyn DirectoryStore>,
    pub loans: Arc<dyn LoanLedger>,
}

impl Repository {
    /// Create a Postgres-backed repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: Arc::new(books::BooksRepository::new(pool.clone())),
            users: Arc::new(users::UsersRepository::new(pool.clone())),
            loans: Arc::new(loans::LoansRepository::new(pool)),
        }
    }

    /// Create a repository over a fresh in-process store
    pub fn in_memory() -> Self {
        let store = Arc::new(memory::MemoryStore::default());
        Self {
            books: store.clone(),
            users: store.clone(),
            loans: store,
        }
    }
}

//! In-process store implementing every repository trait.
//!
//! All three collections live behind a single mutex, so each trait method
//! observes and mutates a consistent snapshot. That gives `open` and `close`
//! the same all-or-nothing behavior the Postgres repositories get from
//! transactions with conditional updates.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use rust_decimal::Decimal;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookQuery, CatalogSummary, CreateBook, UpdateBook},
        loan::{Loan, LoanClosure, LoanQuery, LoanStatus, LoanSummary, NewLoan},
        user::{NewUser, Role, User, UserChanges, UserQuery},
    },
};

use super::{CatalogStore, DirectoryStore, LoanLedger};

#[derive(Default)]
struct State {
    books: IndexMap<i32, Book>,
    users: IndexMap<String, User>,
    loans: IndexMap<i32, Loan>,
    next_book_id: i32,
    next_loan_id: i32,
}

impl State {
    fn book(&self, id: i32) -> AppResult<&Book> {
        self.books
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    fn email_taken(&self, email: &str, exclude_id: Option<&str>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id.as_str()) != exclude_id)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| AppError::Internal("in-memory store poisoned".to_string()))
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let mut state = self.lock()?;
        state.next_book_id += 1;
        let created = Book {
            id: state.next_book_id,
            title: book.title.clone(),
            author: book.author.clone(),
            isbn: book.isbn.clone(),
            department: book.department.clone(),
            book_count: book.book_count.unwrap_or(1),
            borrowed_count: 0,
            cover_image: book.cover_image.clone(),
            created_at: Utc::now(),
        };
        state.books.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        self.lock()?.book(id).cloned()
    }

    async fn search(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        let state = self.lock()?;
        let mut books: Vec<Book> = state
            .books
            .values()
            .filter(|b| query.department.as_ref().map_or(true, |d| &b.department == d))
            .filter(|b| query.search.as_deref().map_or(true, |s| b.matches_search(s)))
            .filter(|b| query.available != Some(true) || b.is_available())
            .cloned()
            .collect();
        books.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(books)
    }

    async fn update(&self, id: i32, update: &UpdateBook) -> AppResult<Book> {
        let mut state = self.lock()?;
        let book = state
            .books
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        if let Some(count) = update.book_count {
            if count < book.borrowed_count {
                return Err(AppError::Conflict(
                    "book_count cannot be lower than the copies currently on loan".to_string(),
                ));
            }
            book.book_count = count;
        }
        if let Some(ref title) = update.title {
            book.title = title.clone();
        }
        if let Some(ref author) = update.author {
            book.author = author.clone();
        }
        if let Some(ref isbn) = update.isbn {
            book.isbn = isbn.clone();
        }
        if let Some(ref department) = update.department {
            book.department = department.clone();
        }
        if let Some(ref cover_image) = update.cover_image {
            book.cover_image = Some(cover_image.clone());
        }

        Ok(book.clone())
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut state = self.lock()?;
        if state.book(id)?.borrowed_count > 0 {
            return Err(AppError::Conflict(
                "Book has copies on loan and cannot be deleted".to_string(),
            ));
        }
        state.books.shift_remove(&id);
        Ok(())
    }

    async fn departments(&self) -> AppResult<Vec<String>> {
        let state = self.lock()?;
        let mut departments: Vec<String> =
            state.books.values().map(|b| b.department.clone()).collect();
        departments.sort();
        departments.dedup();
        Ok(departments)
    }

    async fn summary(&self) -> AppResult<CatalogSummary> {
        let state = self.lock()?;
        Ok(state.books.values().fold(CatalogSummary::default(), |mut acc, b| {
            acc.titles += 1;
            acc.copies += i64::from(b.book_count);
            acc.borrowed_copies += i64::from(b.borrowed_count);
            if b.is_available() {
                acc.available_titles += 1;
            }
            acc
        }))
    }
}

#[async_trait]
impl DirectoryStore for MemoryStore {
    async fn create(&self, user: &NewUser) -> AppResult<User> {
        let mut state = self.lock()?;
        if state.users.contains_key(&user.id) {
            return Err(AppError::Conflict("User with this ID already exists".to_string()));
        }
        if state.email_taken(&user.email, None) {
            return Err(AppError::Conflict("User with this email already exists".to_string()));
        }

        let created = User {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            password: user.password_hash.clone(),
            total_penalty: Decimal::ZERO,
            created_at: Utc::now(),
        };
        state.users.insert(created.id.clone(), created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<User>> {
        Ok(self.lock()?.users.get(id).cloned())
    }

    async fn email_exists(&self, email: &str, exclude_id: Option<&str>) -> AppResult<bool> {
        Ok(self.lock()?.email_taken(email, exclude_id))
    }

    async fn list(&self, query: &UserQuery) -> AppResult<Vec<User>> {
        let state = self.lock()?;
        let mut users: Vec<User> = state
            .users
            .values()
            .filter(|u| query.role.map_or(true, |r| u.role == r))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn update(&self, id: &str, changes: &UserChanges) -> AppResult<User> {
        let mut state = self.lock()?;
        if let Some(ref email) = changes.email {
            if state.email_taken(email, Some(id)) {
                return Err(AppError::Conflict("User with this email already exists".to_string()));
            }
        }

        let user = state
            .users
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))?;
        if let Some(ref name) = changes.name {
            user.name = name.clone();
        }
        if let Some(ref email) = changes.email {
            user.email = email.clone();
        }
        if let Some(role) = changes.role {
            user.role = role;
        }
        if let Some(ref hash) = changes.password_hash {
            user.password = hash.clone();
        }

        Ok(user.clone())
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let mut state = self.lock()?;
        if !state.users.contains_key(id) {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }
        if state.loans.values().any(|l| l.user_id == id && l.is_open()) {
            return Err(AppError::Conflict(
                "User has borrowed books and cannot be deleted".to_string(),
            ));
        }
        state.users.shift_remove(id);
        Ok(())
    }

    async fn count_by_role(&self, role: Role) -> AppResult<i64> {
        Ok(self.lock()?.users.values().filter(|u| u.role == role).count() as i64)
    }
}

#[async_trait]
impl LoanLedger for MemoryStore {
    async fn open(&self, loan: &NewLoan) -> AppResult<Loan> {
        let mut state = self.lock()?;

        let book = state.book(loan.book_id)?.clone();
        if !state.users.contains_key(&loan.user_id) {
            return Err(AppError::NotFound(format!("User with id {} not found", loan.user_id)));
        }
        if !book.is_available() {
            return Err(AppError::Conflict("No copies available".to_string()));
        }

        if let Some(stored) = state.books.get_mut(&loan.book_id) {
            stored.borrowed_count += 1;
        }
        state.next_loan_id += 1;
        let created = Loan {
            id: state.next_loan_id,
            book_id: book.id,
            user_id: loan.user_id.clone(),
            book_title: book.title,
            author: book.author,
            isbn: book.isbn,
            department: book.department,
            borrowed_date: loan.borrowed_date,
            due_date: loan.due_date,
            status: LoanStatus::Borrowed,
            returned_date: None,
            days_late: None,
            penalty_amount: None,
        };
        state.loans.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Loan> {
        self.lock()?
            .loans
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    async fn close(&self, id: i32, closure: &LoanClosure) -> AppResult<Loan> {
        let mut state = self.lock()?;

        let loan = state
            .loans
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))?;
        if !loan.is_open() {
            return Err(AppError::Conflict(format!("Loan {} already returned", id)));
        }

        loan.status = LoanStatus::Returned;
        loan.returned_date = Some(closure.returned_date);
        loan.days_late = Some(closure.days_late);
        loan.penalty_amount = Some(closure.penalty);
        let closed = loan.clone();

        if let Some(book) = state.books.get_mut(&closed.book_id) {
            book.borrowed_count = (book.borrowed_count - 1).max(0);
        }
        if let Some(user) = state.users.get_mut(&closed.user_id) {
            user.total_penalty += closure.penalty;
        }

        Ok(closed)
    }

    async fn list(&self, query: &LoanQuery) -> AppResult<Vec<Loan>> {
        let state = self.lock()?;
        let mut loans: Vec<Loan> = state
            .loans
            .values()
            .filter(|l| query.status.map_or(true, |s| l.status == s))
            .filter(|l| query.user_id.as_ref().map_or(true, |u| &l.user_id == u))
            .cloned()
            .collect();
        loans.sort_by(|a, b| b.borrowed_date.cmp(&a.borrowed_date).then(b.id.cmp(&a.id)));
        Ok(loans)
    }

    async fn find_overdue(&self, now: DateTime<Utc>) -> AppResult<Vec<Loan>> {
        let state = self.lock()?;
        let mut loans: Vec<Loan> = state
            .loans
            .values()
            .filter(|l| l.is_overdue(now))
            .cloned()
            .collect();
        loans.sort_by(|a, b| a.due_date.cmp(&b.due_date).then(a.id.cmp(&b.id)));
        Ok(loans)
    }

    async fn count_open_for_user(&self, user_id: &str) -> AppResult<i64> {
        let state = self.lock()?;
        Ok(state
            .loans
            .values()
            .filter(|l| l.user_id == user_id && l.is_open())
            .count() as i64)
    }

    async fn summary(&self, now: DateTime<Utc>) -> AppResult<LoanSummary> {
        let state = self.lock()?;
        Ok(state
            .loans
            .values()
            .filter(|l| l.is_open())
            .fold(LoanSummary::default(), |mut acc, l| {
                acc.active += 1;
                if l.due_date < now {
                    acc.overdue += 1;
                }
                acc
            }))
    }
}

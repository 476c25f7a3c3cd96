//! Loans repository for database operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::loan::{Loan, LoanClosure, LoanQuery, LoanSummary, NewLoan},
};

use super::LoanLedger;

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

/// Book fields copied onto a new loan
#[derive(sqlx::FromRow)]
struct BookSnapshot {
    title: String,
    author: String,
    isbn: String,
    department: String,
}

#[async_trait]
impl LoanLedger for LoansRepository {
    async fn open(&self, loan: &NewLoan) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let book_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE id = $1)")
                .bind(loan.book_id)
                .fetch_one(&mut *tx)
                .await?;
        if !book_exists {
            return Err(AppError::NotFound(format!("Book with id {} not found", loan.book_id)));
        }

        let user_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
                .bind(&loan.user_id)
                .fetch_one(&mut *tx)
                .await?;
        if !user_exists {
            return Err(AppError::NotFound(format!("User with id {} not found", loan.user_id)));
        }

        // Reserve a copy: the row lock plus the availability predicate make
        // this the single point where concurrent lends are decided.
        let snapshot = sqlx::query_as::<_, BookSnapshot>(
            r#"
            UPDATE books SET borrowed_count = borrowed_count + 1
            WHERE id = $1 AND borrowed_count < book_count
            RETURNING title, author, isbn, department
            "#,
        )
        .bind(loan.book_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::Conflict("No copies available".to_string()))?;

        let created = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (book_id, user_id, book_title, author, isbn, department,
                               borrowed_date, due_date, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'borrowed')
            RETURNING *
            "#,
        )
        .bind(loan.book_id)
        .bind(&loan.user_id)
        .bind(&snapshot.title)
        .bind(&snapshot.author)
        .bind(&snapshot.isbn)
        .bind(&snapshot.department)
        .bind(loan.borrowed_date)
        .bind(loan.due_date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(created)
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    async fn close(&self, id: i32, closure: &LoanClosure) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let closed = sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans SET
                status = 'returned',
                returned_date = $2,
                days_late = $3,
                penalty_amount = $4
            WHERE id = $1 AND status = 'borrowed'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(closure.returned_date)
        .bind(closure.days_late)
        .bind(closure.penalty)
        .fetch_optional(&mut *tx)
        .await?;

        let closed = match closed {
            Some(loan) => loan,
            None => {
                let exists: bool =
                    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM loans WHERE id = $1)")
                        .bind(id)
                        .fetch_one(&mut *tx)
                        .await?;
                return Err(if exists {
                    AppError::Conflict(format!("Loan {} already returned", id))
                } else {
                    AppError::NotFound(format!("Loan with id {} not found", id))
                });
            }
        };

        sqlx::query("UPDATE books SET borrowed_count = GREATEST(borrowed_count - 1, 0) WHERE id = $1")
            .bind(closed.book_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE users SET total_penalty = total_penalty + $2 WHERE id = $1")
            .bind(&closed.user_id)
            .bind(closure.penalty)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(closed)
    }

    async fn list(&self, query: &LoanQuery) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(
            r#"
            SELECT * FROM loans
            WHERE ($1::loan_status IS NULL OR status = $1)
              AND ($2::text IS NULL OR user_id = $2)
            ORDER BY borrowed_date DESC, id DESC
            "#,
        )
        .bind(query.status)
        .bind(&query.user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(loans)
    }

    async fn find_overdue(&self, now: DateTime<Utc>) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans WHERE status = 'borrowed' AND due_date < $1 ORDER BY due_date, id",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(loans)
    }

    async fn count_open_for_user(&self, user_id: &str) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE user_id = $1 AND status = 'borrowed'",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn summary(&self, now: DateTime<Utc>) -> AppResult<LoanSummary> {
        let (active, overdue): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COUNT(*) FILTER (WHERE due_date < $1)
            FROM loans
            WHERE status = 'borrowed'
            "#,
        )
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(LoanSummary { active, overdue })
    }
}

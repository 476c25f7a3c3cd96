//! Loan (borrow) model and related types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Loan status; `Borrowed -> Returned` happens exactly once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "loan_status", rename_all = "lowercase")]
pub enum LoanStatus {
    Borrowed,
    Returned,
}

/// Loan model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: i32,
    pub book_id: i32,
    pub user_id: String,
    /// Book fields copied at loan time
    pub book_title: String,
    pub author: String,
    pub isbn: String,
    pub department: String,
    pub borrowed_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub status: LoanStatus,
    pub returned_date: Option<DateTime<Utc>>,
    pub days_late: Option<i64>,
    pub penalty_amount: Option<Decimal>,
}

impl Loan {
    pub fn is_open(&self) -> bool {
        self.status == LoanStatus::Borrowed
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_open() && self.due_date < now
    }
}

/// Lend request as accepted by the loans service
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LendRequest {
    pub book_id: i32,
    #[validate(length(min = 1, message = "Missing required field: user_id"))]
    pub user_id: String,
    pub due_date: DateTime<Utc>,
}

/// Loan as handed to the ledger for insertion
#[derive(Debug, Clone)]
pub struct NewLoan {
    pub book_id: i32,
    pub user_id: String,
    pub borrowed_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
}

/// Outcome written onto a loan when it is returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanClosure {
    pub returned_date: DateTime<Utc>,
    pub days_late: i64,
    pub penalty: Decimal,
}

/// Loan list filter
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct LoanQuery {
    pub status: Option<LoanStatus>,
    pub user_id: Option<String>,
}

/// Loan with the borrower's display name
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoanDetails {
    #[serde(flatten)]
    pub loan: Loan,
    pub user_name: String,
}

/// Open loan past its due date with a penalty preview
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OverdueLoan {
    #[serde(flatten)]
    pub loan: Loan,
    pub days_overdue: i64,
    /// Informational only; the charged amount is computed at return time
    pub estimated_penalty: Decimal,
}

/// Loan counters for the dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct LoanSummary {
    pub active: i64,
    pub overdue: i64,
}

//! Loan management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::AppJson;
use crate::{
    error::AppResult,
    models::loan::{LendRequest, Loan, LoanDetails, LoanQuery, OverdueLoan},
};

/// Create loan request
#[derive(Deserialize, ToSchema)]
pub struct CreateLoanRequest {
    /// Book ID
    pub book_id: i32,
    /// Borrower ID
    pub user_id: String,
    /// Return date (YYYY-MM-DD); the loan falls due at 00:00 UTC that day
    #[schema(example = "2024-01-15")]
    pub due_date: NaiveDate,
}

impl From<CreateLoanRequest> for LendRequest {
    fn from(request: CreateLoanRequest) -> Self {
        Self {
            book_id: request.book_id,
            user_id: request.user_id,
            due_date: request.due_date.and_time(NaiveTime::MIN).and_utc(),
        }
    }
}

/// Return response with the settled penalty
#[derive(Serialize, ToSchema)]
pub struct ReturnResponse {
    /// Return status
    pub status: String,
    pub days_late: i64,
    pub penalty: Decimal,
    /// Loan details
    pub loan: Loan,
}

/// A user's loan history
#[derive(Serialize, ToSchema)]
pub struct UserLoansResponse {
    pub user_id: String,
    pub user_name: String,
    /// Loans not yet returned
    pub current_borrowed: i64,
    pub total_penalty: Decimal,
    /// Most recent first
    pub loans: Vec<Loan>,
}

/// List loans
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    params(LoanQuery),
    responses(
        (status = 200, description = "Loans with borrower names", body = Vec<LoanDetails>)
    )
)]
pub async fn list_loans(
    State(state): State<crate::AppState>,
    Query(query): Query<LoanQuery>,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state.services.loans.list_loans(&query).await?;
    Ok(Json(loans))
}

/// Get loans for a specific user
#[utoipa::path(
    get,
    path = "/users/{id}/loans",
    tag = "loans",
    params(
        ("id" = String, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User's loan history", body = UserLoansResponse),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_loans(
    State(state): State<crate::AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<UserLoansResponse>> {
    let user = state.services.users.get_by_id(&user_id).await?;
    let loans = state.services.loans.user_loans(&user_id).await?;
    let current_borrowed = state.services.loans.count_open_for_user(&user_id).await?;

    Ok(Json(UserLoansResponse {
        user_id: user.id,
        user_name: user.name,
        current_borrowed,
        total_penalty: user.total_penalty,
        loans,
    }))
}

/// Create a new loan (borrow a book)
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    request_body = CreateLoanRequest,
    responses(
        (status = 201, description = "Loan created", body = Loan),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "User or book not found"),
        (status = 409, description = "No copies available")
    )
)]
pub async fn create_loan(
    State(state): State<crate::AppState>,
    AppJson(request): AppJson<CreateLoanRequest>,
) -> AppResult<(StatusCode, Json<Loan>)> {
    let loan = state.services.loans.lend(request.into()).await?;
    Ok((StatusCode::CREATED, Json(loan)))
}

/// Get a loan by ID
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan details", body = Loan),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_loan(
    State(state): State<crate::AppState>,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<Loan>> {
    let loan = state.services.loans.get_loan(loan_id).await?;
    Ok(Json(loan))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Book returned", body = ReturnResponse),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Already returned")
    )
)]
pub async fn return_loan(
    State(state): State<crate::AppState>,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<ReturnResponse>> {
    let loan = state.services.loans.return_loan(loan_id).await?;

    Ok(Json(ReturnResponse {
        status: "returned".to_string(),
        days_late: loan.days_late.unwrap_or_default(),
        penalty: loan.penalty_amount.unwrap_or_default(),
        loan,
    }))
}

/// Overdue loans with a penalty preview
#[utoipa::path(
    get,
    path = "/overdue",
    tag = "loans",
    responses(
        (status = 200, description = "Open loans past their due date", body = Vec<OverdueLoan>)
    )
)]
pub async fn list_overdue(
    State(state): State<crate::AppState>,
) -> AppResult<Json<Vec<OverdueLoan>>> {
    let overdue = state.services.overdue.preview().await?;
    Ok(Json(overdue))
}

//! Loan management service

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::loan::{LendRequest, Loan, LoanClosure, LoanDetails, LoanQuery, NewLoan},
    repository::Repository,
    services::{email::Notifier, notices, penalty::PenaltyCalculator},
};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    notifier: Arc<dyn Notifier>,
    penalties: PenaltyCalculator,
}

impl LoansService {
    pub fn new(
        repository: Repository,
        notifier: Arc<dyn Notifier>,
        penalties: PenaltyCalculator,
    ) -> Self {
        Self {
            repository,
            notifier,
            penalties,
        }
    }

    /// Lend a copy of a book to a user
    pub async fn lend(&self, request: LendRequest) -> AppResult<Loan> {
        self.lend_at(request, Utc::now()).await
    }

    /// Lend with an explicit "now"; the due date must be strictly later
    pub async fn lend_at(&self, request: LendRequest, now: DateTime<Utc>) -> AppResult<Loan> {
        request.validate()?;
        if request.due_date <= now {
            return Err(AppError::Validation(
                "Return date must be in the future".to_string(),
            ));
        }

        let loan = self
            .repository
            .loans
            .open(&NewLoan {
                book_id: request.book_id,
                user_id: request.user_id,
                borrowed_date: now,
                due_date: request.due_date,
            })
            .await?;

        tracing::info!(
            loan_id = loan.id,
            book_id = loan.book_id,
            user_id = %loan.user_id,
            due_date = %loan.due_date,
            "Book lent"
        );

        if let Some(user) = self.repository.users.find_by_id(&loan.user_id).await.ok().flatten() {
            let notice = notices::loan_confirmation(&user, &loan);
            self.notify(&notice, &user.email).await;
        }

        Ok(loan)
    }

    /// Return a borrowed book
    pub async fn return_loan(&self, loan_id: i32) -> AppResult<Loan> {
        self.return_loan_at(loan_id, Utc::now()).await
    }

    /// Return with an explicit "now", charging any late penalty
    pub async fn return_loan_at(&self, loan_id: i32, now: DateTime<Utc>) -> AppResult<Loan> {
        let loan = self.repository.loans.get_by_id(loan_id).await?;
        if !loan.is_open() {
            return Err(AppError::Conflict(format!("Loan {} already returned", loan_id)));
        }

        let assessment = self.penalties.compute(loan.due_date, now);

        // `close` re-checks the status atomically; a concurrent return loses here.
        let closed = self
            .repository
            .loans
            .close(
                loan_id,
                &LoanClosure {
                    returned_date: now,
                    days_late: assessment.days_overdue,
                    penalty: assessment.penalty,
                },
            )
            .await?;

        tracing::info!(
            loan_id = closed.id,
            book_id = closed.book_id,
            user_id = %closed.user_id,
            days_late = assessment.days_overdue,
            penalty = %assessment.penalty,
            "Book returned"
        );

        if let Some(user) = self.repository.users.find_by_id(&closed.user_id).await.ok().flatten() {
            let notice = notices::return_confirmation(&user, &closed);
            self.notify(&notice, &user.email).await;
        }

        Ok(closed)
    }

    pub async fn get_loan(&self, loan_id: i32) -> AppResult<Loan> {
        self.repository.loans.get_by_id(loan_id).await
    }

    /// List loans with the borrower's name attached
    pub async fn list_loans(&self, query: &LoanQuery) -> AppResult<Vec<LoanDetails>> {
        let loans = self.repository.loans.list(query).await?;

        let mut names: HashMap<String, String> = HashMap::new();
        let mut result = Vec::with_capacity(loans.len());
        for loan in loans {
            if !names.contains_key(&loan.user_id) {
                let name = self
                    .repository
                    .users
                    .find_by_id(&loan.user_id)
                    .await?
                    .map(|u| u.name)
                    .unwrap_or_else(|| "Unknown User".to_string());
                names.insert(loan.user_id.clone(), name);
            }
            let user_name = names.get(&loan.user_id).cloned().unwrap_or_default();
            result.push(LoanDetails { loan, user_name });
        }

        Ok(result)
    }

    /// Every loan of a user, most recent first
    pub async fn user_loans(&self, user_id: &str) -> AppResult<Vec<Loan>> {
        // Verify user exists
        self.repository
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", user_id)))?;

        self.repository
            .loans
            .list(&LoanQuery {
                status: None,
                user_id: Some(user_id.to_string()),
            })
            .await
    }

    pub async fn count_open_for_user(&self, user_id: &str) -> AppResult<i64> {
        self.repository.loans.count_open_for_user(user_id).await
    }

    async fn notify(&self, notice: &notices::Notice, recipient: &str) {
        if recipient.is_empty() {
            return;
        }
        if !self.notifier.send(&notice.subject, &notice.body, recipient).await {
            tracing::warn!(recipient, subject = %notice.subject, "Notification not delivered");
        }
    }
}

//! Periodic overdue scan.
//!
//! Each pass looks up open loans past their due date, groups them by
//! borrower and sends every borrower a single reminder listing their overdue
//! books with a penalty preview. The scan never writes: the amount actually
//! charged is computed when the book comes back.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use tokio::time::{self, MissedTickBehavior};

use crate::{
    error::AppResult,
    models::loan::OverdueLoan,
    repository::Repository,
    services::{email::Notifier, notices, penalty::PenaltyCalculator},
};

/// Counters for one scan pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Overdue loans found
    pub overdue_loans: usize,
    pub notified_users: usize,
    /// Borrowers without an account or an email address
    pub skipped_users: usize,
    pub failed_notifications: usize,
}

#[derive(Clone)]
pub struct OverdueScanner {
    repository: Repository,
    notifier: Arc<dyn Notifier>,
    penalties: PenaltyCalculator,
}

impl OverdueScanner {
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

    pub async fn preview(&self) -> AppResult<Vec<OverdueLoan>> {
        self.preview_at(Utc::now()).await
    }

    /// Overdue loans as of `now` with their penalty preview
    pub async fn preview_at(&self, now: DateTime<Utc>) -> AppResult<Vec<OverdueLoan>> {
        let loans = self.repository.loans.find_overdue(now).await?;
        Ok(loans
            .into_iter()
            .map(|loan| {
                let assessment = self.penalties.compute(loan.due_date, now);
                OverdueLoan {
                    loan,
                    days_overdue: assessment.days_overdue,
                    estimated_penalty: assessment.penalty,
                }
            })
            .collect())
    }

    pub async fn scan(&self) -> AppResult<ScanReport> {
        self.scan_at(Utc::now()).await
    }

    /// One pass: one reminder per borrower with overdue loans
    pub async fn scan_at(&self, now: DateTime<Utc>) -> AppResult<ScanReport> {
        let overdue = self.preview_at(now).await?;

        let mut report = ScanReport {
            overdue_loans: overdue.len(),
            ..ScanReport::default()
        };

        let mut by_user: IndexMap<String, Vec<OverdueLoan>> = IndexMap::new();
        for entry in overdue {
            by_user.entry(entry.loan.user_id.clone()).or_default().push(entry);
        }

        for (user_id, loans) in by_user {
            let user = match self.repository.users.find_by_id(&user_id).await {
                Ok(Some(user)) if !user.email.is_empty() => user,
                Ok(_) => {
                    tracing::debug!(user_id = %user_id, "No reachable account for overdue loans");
                    report.skipped_users += 1;
                    continue;
                }
                Err(e) => {
                    tracing::warn!(user_id = %user_id, "Failed to load borrower: {}", e);
                    report.skipped_users += 1;
                    continue;
                }
            };

            let notice = notices::overdue_reminder(&user, &loans);
            if self.notifier.send(&notice.subject, &notice.body, &user.email).await {
                tracing::info!(
                    user_id = %user.id,
                    email = %user.email,
                    books = loans.len(),
                    "Sent overdue alert email"
                );
                report.notified_users += 1;
            } else {
                tracing::warn!(user_id = %user.id, email = %user.email, "Overdue alert not delivered");
                report.failed_notifications += 1;
            }
        }

        Ok(report)
    }

    /// Scan every `period` until the process exits. The first pass runs
    /// immediately; a failed pass is logged and retried on the next tick.
    pub async fn run(self, period: Duration) {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!("Overdue scanner started (interval: {}s)", period.as_secs());

        loop {
            interval.tick().await;
            tracing::debug!("Checking for overdue books");

            match self.scan().await {
                Ok(report) => tracing::info!(
                    overdue_loans = report.overdue_loans,
                    notified_users = report.notified_users,
                    skipped_users = report.skipped_users,
                    failed_notifications = report.failed_notifications,
                    "Found {} overdue books",
                    report.overdue_loans
                ),
                Err(e) => tracing::error!("Overdue scan failed, retrying next interval: {}", e),
            }
        }
    }
}

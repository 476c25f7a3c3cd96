//! Statistics service

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{book::CatalogSummary, loan::LoanSummary, user::Role},
    repository::Repository,
};

/// Accounts per role
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct UserStats {
    pub admins: i64,
    pub staff: i64,
    pub users: i64,
}

/// Dashboard figures
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LibraryStats {
    pub catalog: CatalogSummary,
    pub users: UserStats,
    pub loans: LoanSummary,
}

#[derive(Clone)]
pub struct StatsService {
    repository: Repository,
}

impl StatsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn get_stats(&self) -> AppResult<LibraryStats> {
        self.get_stats_at(Utc::now()).await
    }

    /// Overdue counts are relative to `now`
    pub async fn get_stats_at(&self, now: DateTime<Utc>) -> AppResult<LibraryStats> {
        let catalog = self.repository.books.summary().await?;
        let users = UserStats {
            admins: self.repository.users.count_by_role(Role::Admin).await?,
            staff: self.repository.users.count_by_role(Role::Staff).await?,
            users: self.repository.users.count_by_role(Role::User).await?,
        };
        let loans = self.repository.loans.summary(now).await?;

        Ok(LibraryStats {
            catalog,
            users,
            loans,
        })
    }
}

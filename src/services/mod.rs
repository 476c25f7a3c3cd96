//! Business logic services

pub mod catalog;
pub mod email;
pub mod loans;
pub mod notices;
pub mod overdue;
pub mod penalty;
pub mod stats;
pub mod users;

use std::sync::Arc;

use crate::{config::LoansConfig, repository::Repository};

use self::{email::Notifier, penalty::PenaltyCalculator};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub users: users::UsersService,
    pub loans: loans::LoansService,
    pub overdue: overdue::OverdueScanner,
    pub stats: stats::StatsService,
}

impl Services {
    /// Create all services over one repository and one outbound notifier
    pub fn new(
        repository: Repository,
        notifier: Arc<dyn Notifier>,
        loans_config: &LoansConfig,
        admin_email: Option<String>,
    ) -> Self {
        let penalties = PenaltyCalculator::new(loans_config.daily_penalty_rate);

        Self {
            catalog: catalog::CatalogService::new(repository.clone(), notifier.clone(), admin_email),
            users: users::UsersService::new(repository.clone(), notifier.clone()),
            loans: loans::LoansService::new(repository.clone(), notifier.clone(), penalties),
            overdue: overdue::OverdueScanner::new(repository.clone(), notifier, penalties),
            stats: stats::StatsService::new(repository),
        }
    }
}

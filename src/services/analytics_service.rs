// src/services/analytics_service.rs

use chrono::Utc;

use crate::{
    common::error::AppError,
    db::AnalyticsRepository,
    models::analytics::AnalyticsSummary,
    models::auth::User,
    models::filters::{AnalyticsParams, DateWindow, LeadQuery},
    models::lead::TransitionRules,
    services::permission::{Action, PermissionManager, Resource},
};

#[derive(Clone)]
pub struct AnalyticsService {
    analytics_repo: AnalyticsRepository,
    rules: TransitionRules,
}

impl AnalyticsService {
    pub fn new(analytics_repo: AnalyticsRepository) -> Self {
        Self { analytics_repo, rules: TransitionRules::default() }
    }

    pub async fn summary(
        &self,
        actor: &User,
        params: &AnalyticsParams,
    ) -> Result<AnalyticsSummary, AppError> {
        let pm = PermissionManager::for_user(actor);
        if !pm.can(Action::Read, Resource::Analytics) {
            return Err(AppError::Forbidden);
        }

        let window = DateWindow::resolve(
            Some("custom"),
            params.start_date.as_deref(),
            params.end_date.as_deref(),
            None,
            Utc::now(),
        );

        // userIds refina DENTRO do escopo: agente pedindo o time inteiro
        // continua vendo só os próprios números
        let query = LeadQuery {
            agent_scope: pm.data_scope().agent_ids(),
            agents: params.parsed_user_ids(),
            window,
            ..Default::default()
        };

        self.analytics_repo
            .summarize(
                self.analytics_repo.pool(),
                &query,
                self.rules.closed_status.as_str(),
                self.rules.sale_status.as_str(),
            )
            .await
    }
}

// src/services/sales_service.rs

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::SalesRepository,
    middleware::request_meta::RequestMeta,
    models::auth::User,
    models::filters::{ListParams, Paginated},
    models::sales::{Followup, Sale, Target},
    services::activity_log::{ActivityLog, ActivityRecord},
    services::permission::{Action, DataScope, PermissionManager, Resource},
};

#[derive(Clone)]
pub struct SalesService {
    pool: PgPool,
    sales_repo: SalesRepository,
    activity_log: Arc<dyn ActivityLog>,
}

impl SalesService {
    pub fn new(pool: PgPool, sales_repo: SalesRepository, activity_log: Arc<dyn ActivityLog>) -> Self {
        Self { pool, sales_repo, activity_log }
    }

    pub async fn list_followups(
        &self,
        actor: &User,
        params: &ListParams,
    ) -> Result<Paginated<Followup>, AppError> {
        let pm = PermissionManager::for_user(actor);
        if !pm.can(Action::Read, Resource::Followups) {
            return Err(AppError::Forbidden);
        }

        let scope = pm.data_scope().agent_ids();
        let page = params.page();
        let limit = params.limit();
        let offset = page.saturating_sub(1).saturating_mul(limit);

        let records = self
            .sales_repo
            .list_followups(scope.as_deref(), params.status.as_deref(), limit, offset)
            .await?;
        let total = self
            .sales_repo
            .count_followups(scope.as_deref(), params.status.as_deref())
            .await?;

        Ok(Paginated::new(records, page, limit, total))
    }

    pub async fn list_sales(
        &self,
        actor: &User,
        params: &ListParams,
    ) -> Result<Paginated<Sale>, AppError> {
        let pm = PermissionManager::for_user(actor);
        if !pm.can(Action::Read, Resource::Sales) {
            return Err(AppError::Forbidden);
        }

        let scope = pm.data_scope().agent_ids();
        let page = params.page();
        let limit = params.limit();
        let offset = page.saturating_sub(1).saturating_mul(limit);

        let records = self.sales_repo.list_sales(scope.as_deref(), limit, offset).await?;
        let total = self.sales_repo.count_sales(scope.as_deref()).await?;

        Ok(Paginated::new(records, page, limit, total))
    }

    pub async fn create_target(
        &self,
        actor: &User,
        meta: &RequestMeta,
        title: &str,
        assigned_users: &[Uuid],
        target_amount: Decimal,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Result<Target, AppError> {
        let pm = PermissionManager::for_user(actor);
        if !pm.can(Action::Create, Resource::Targets) {
            return Err(AppError::Forbidden);
        }

        if end_date <= start_date {
            return Err(AppError::BadRequest(
                "A data final da meta deve ser posterior à data inicial.".to_string(),
            ));
        }

        let target = self
            .sales_repo
            .create_target(
                &self.pool,
                title,
                assigned_users,
                target_amount,
                start_date,
                end_date,
                actor.id,
            )
            .await?;

        self.activity_log
            .record(ActivityRecord {
                user_id: actor.id,
                user_name: actor.name.clone(),
                user_role: actor.role,
                action: "create".to_string(),
                module: "targets".to_string(),
                description: format!("Meta '{}' criada", target.title),
                target_id: Some(target.id.to_string()),
                target_type: Some("target".to_string()),
                changes: None,
                ip_address: meta.ip_address.clone(),
                user_agent: meta.user_agent.clone(),
            })
            .await;

        Ok(target)
    }

    // Admin vê todas as metas; manager e agente, só aquelas em que aparecem
    pub async fn list_targets(&self, actor: &User) -> Result<Vec<Target>, AppError> {
        let pm = PermissionManager::for_user(actor);
        if !pm.can(Action::Read, Resource::Targets) {
            return Err(AppError::Forbidden);
        }

        let member = match pm.data_scope() {
            DataScope::Unrestricted => None,
            DataScope::Agents(_) => Some(actor.id),
        };

        self.sales_repo.list_targets(member).await
    }
}

// src/services/fulfillment_service.rs

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::VendorOrderRepository,
    middleware::request_meta::RequestMeta,
    models::auth::User,
    models::filters::{ListParams, Paginated},
    models::vendor_order::{VendorOrder, VendorOrderStatus},
    services::activity_log::{ActivityLog, ActivityRecord},
    services::permission::{Action, PermissionManager, Resource},
};

// Acompanhamento dos pedidos junto aos fornecedores. Quem cria as linhas é o
// cascade do lead; aqui só se lista e se move o andamento.
#[derive(Clone)]
pub struct FulfillmentService {
    pool: PgPool,
    vendor_order_repo: VendorOrderRepository,
    activity_log: Arc<dyn ActivityLog>,
}

impl FulfillmentService {
    pub fn new(
        pool: PgPool,
        vendor_order_repo: VendorOrderRepository,
        activity_log: Arc<dyn ActivityLog>,
    ) -> Self {
        Self { pool, vendor_order_repo, activity_log }
    }

    pub async fn list_orders(
        &self,
        actor: &User,
        params: &ListParams,
    ) -> Result<Paginated<VendorOrder>, AppError> {
        let pm = PermissionManager::for_user(actor);
        if !pm.can(Action::Read, Resource::VendorOrders) {
            return Err(AppError::Forbidden);
        }

        let status = match params.status.as_deref() {
            Some(label) => Some(VendorOrderStatus::from_label(label).ok_or_else(|| {
                AppError::BadRequest(format!("Status de fulfillment desconhecido: {}", label))
            })?),
            None => None,
        };

        let scope = pm.data_scope().agent_ids();
        let page = params.page();
        let limit = params.limit();
        let offset = page.saturating_sub(1).saturating_mul(limit);

        let records = self
            .vendor_order_repo
            .list(scope.as_deref(), status, limit, offset)
            .await?;
        let total = self.vendor_order_repo.count(scope.as_deref(), status).await?;

        Ok(Paginated::new(records, page, limit, total))
    }

    pub async fn update_status(
        &self,
        actor: &User,
        meta: &RequestMeta,
        id: Uuid,
        status: VendorOrderStatus,
        tracking_no: Option<&str>,
        courier_name: Option<&str>,
        expected_delivery: Option<DateTime<Utc>>,
    ) -> Result<VendorOrder, AppError> {
        let pm = PermissionManager::for_user(actor);
        if !pm.can(Action::Update, Resource::VendorOrders) {
            return Err(AppError::Forbidden);
        }

        let updated = self
            .vendor_order_repo
            .update_status(&self.pool, id, status, tracking_no, courier_name, expected_delivery)
            .await?;

        self.activity_log
            .record(ActivityRecord {
                user_id: actor.id,
                user_name: actor.name.clone(),
                user_role: actor.role,
                action: "updateStatus".to_string(),
                module: "vendorOrders".to_string(),
                description: format!(
                    "Pedido {} movido para {}",
                    updated.order_no,
                    updated.order_status.as_str()
                ),
                target_id: Some(updated.order_no.clone()),
                target_type: Some("vendorOrder".to_string()),
                changes: None,
                ip_address: meta.ip_address.clone(),
                user_agent: meta.user_agent.clone(),
            })
            .await;

        Ok(updated)
    }
}

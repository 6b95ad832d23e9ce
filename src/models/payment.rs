// src/models/payment.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// Registro satélite de pagamento, um por lead (chave natural lead_id).
// Criado e atualizado exclusivamente pelo cascade de salvamento do lead.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub id: Uuid,
    #[schema(example = "LD-9C31B7E2D4")]
    pub lead_id: String,
    pub customer_name: Option<String>,
    #[schema(example = "pending")]
    pub payment_status: String,
    #[schema(example = "Not specified")]
    pub mode_of_payment: String,
    #[schema(example = "1500.00")]
    pub sales_price: Option<Decimal>,
    pub cost_price: Option<Decimal>,
    pub total_margin: Option<Decimal>,
    pub pending_balance: Option<Decimal>,
    pub dispute_reason: Option<String>,
    pub refund_amount: Option<Decimal>,
    pub refund_reason: Option<String>,
    pub assigned_agent: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Patch montado pelo orquestrador a partir do lead recém-salvo. Campo None
// preserva o valor já gravado (COALESCE no upsert).
#[derive(Debug, Clone, Default)]
pub struct PaymentPatch {
    pub customer_name: Option<String>,
    pub payment_status: Option<String>,
    pub mode_of_payment: Option<String>,
    pub sales_price: Option<Decimal>,
    pub cost_price: Option<Decimal>,
    pub total_margin: Option<Decimal>,
    pub pending_balance: Option<Decimal>,
    pub dispute_reason: Option<String>,
    pub refund_amount: Option<Decimal>,
    pub refund_reason: Option<String>,
    pub assigned_agent: Option<Uuid>,
}

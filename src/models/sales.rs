// src/models/sales.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// Entrada na fila de retrabalho. Uma nova linha a cada ENTRADA no conjunto de
// status de follow-up; permanecer no conjunto não duplica.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Followup {
    pub id: Uuid,
    #[schema(example = "LD-9C31B7E2D4")]
    pub lead_id: String,
    pub lead_number: Option<i64>,
    pub customer_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    #[schema(example = "Desision Follow up")]
    pub status: String,
    pub assigned_agent: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: Uuid,
    #[schema(example = "LD-9C31B7E2D4")]
    pub lead_id: String,
    pub lead_number: Option<i64>,
    pub customer_name: Option<String>,
    #[schema(example = "1500.00")]
    pub amount: Decimal,
    #[schema(example = "420.00")]
    pub margin: Decimal,
    pub mode_of_payment: Option<String>,
    pub assigned_agent: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

// Meta de vendas por período. achieved_amount é incrementado pelo cascade
// quando um lead do usuário atribuído fecha dentro da janela.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    pub id: Uuid,
    #[schema(example = "Meta Q3 equipe A")]
    pub title: String,
    pub assigned_users: Vec<Uuid>,
    #[schema(example = "50000.00")]
    pub target_amount: Decimal,
    #[schema(example = "12350.00")]
    pub achieved_amount: Decimal,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

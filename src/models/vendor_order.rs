// src/models/vendor_order.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::lead::short_id;

// Etapas de fulfillment de um pedido junto ao fornecedor. O enum no Postgres
// usa os mesmos rótulos com espaço, então o rename precisa bater dos dois lados.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "vendor_order_status")]
pub enum VendorOrderStatus {
    #[sqlx(rename = "Sourcing")]
    #[serde(rename = "Sourcing")]
    Sourcing,
    #[sqlx(rename = "Vendor Confirmed")]
    #[serde(rename = "Vendor Confirmed")]
    VendorConfirmed,
    #[sqlx(rename = "Shipped")]
    #[serde(rename = "Shipped")]
    Shipped,
    #[sqlx(rename = "In Transit")]
    #[serde(rename = "In Transit")]
    InTransit,
    #[sqlx(rename = "Delivered")]
    #[serde(rename = "Delivered")]
    Delivered,
    #[sqlx(rename = "Cancelled")]
    #[serde(rename = "Cancelled")]
    Cancelled,
}

impl VendorOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VendorOrderStatus::Sourcing => "Sourcing",
            VendorOrderStatus::VendorConfirmed => "Vendor Confirmed",
            VendorOrderStatus::Shipped => "Shipped",
            VendorOrderStatus::InTransit => "In Transit",
            VendorOrderStatus::Delivered => "Delivered",
            VendorOrderStatus::Cancelled => "Cancelled",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Sourcing" => Some(VendorOrderStatus::Sourcing),
            "Vendor Confirmed" => Some(VendorOrderStatus::VendorConfirmed),
            "Shipped" => Some(VendorOrderStatus::Shipped),
            "In Transit" => Some(VendorOrderStatus::InTransit),
            "Delivered" => Some(VendorOrderStatus::Delivered),
            "Cancelled" => Some(VendorOrderStatus::Cancelled),
            _ => None,
        }
    }
}

// Uma linha por par (customer_id, product_name). Repetir o salvamento do lead
// atualiza a linha existente em vez de duplicar o pedido.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VendorOrder {
    pub id: Uuid,
    #[schema(example = "VND-7A2E91C4B3")]
    pub vendor_id: String,
    #[schema(example = "ORD-3D81F0A6E2")]
    pub order_no: String,
    pub lead_id: Option<String>,
    pub customer_id: String,
    #[schema(example = "Transmission Assembly 4L60E")]
    pub product_name: String,
    pub customer_name: Option<String>,
    pub vendor_name: Option<String>,
    pub vendor_location: Option<String>,
    pub vendor_address: Option<String>,
    pub vendor_phone: Option<String>,
    pub quantity: Option<i32>,
    #[schema(example = "320.00")]
    pub price: Option<Decimal>,
    #[schema(example = "Sourcing")]
    pub order_status: VendorOrderStatus,
    pub tracking_no: Option<String>,
    pub courier_name: Option<String>,
    pub expected_delivery: Option<DateTime<Utc>>,
    pub assigned_agent: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Patch do upsert disparado pelo cascade. Não carrega order_status de
// propósito: o andamento do fulfillment só muda pelo endpoint próprio.
#[derive(Debug, Clone, Default)]
pub struct VendorOrderPatch {
    pub lead_id: Option<String>,
    pub customer_name: Option<String>,
    pub vendor_name: Option<String>,
    pub vendor_location: Option<String>,
    pub vendor_address: Option<String>,
    pub vendor_phone: Option<String>,
    pub quantity: Option<i32>,
    pub price: Option<Decimal>,
    pub assigned_agent: Option<Uuid>,
}

pub fn generate_vendor_id() -> String {
    format!("VND-{}", short_id())
}

pub fn generate_order_no() -> String {
    format!("ORD-{}", short_id())
}

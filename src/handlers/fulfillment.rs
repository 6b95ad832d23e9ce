// src/handlers/fulfillment.rs

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{auth::AuthenticatedUser, request_meta::RequestMeta},
    models::filters::{ListParams, Paginated},
    models::vendor_order::{VendorOrder, VendorOrderStatus},
};

// GET /api/vendor-orders
#[utoipa::path(
    get,
    path = "/api/vendor-orders",
    tag = "Fulfillment",
    params(ListParams),
    responses(
        (status = 200, description = "Página de pedidos de fornecedor", body = Paginated<VendorOrder>),
        (status = 400, description = "Status de filtro desconhecido"),
        (status = 403, description = "Agentes não enxergam fulfillment")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_vendor_orders(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = app_state
        .fulfillment_service
        .list_orders(&user.0, &params)
        .await?;
    Ok(Json(page))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVendorOrderStatusPayload {
    #[schema(example = "Shipped")]
    pub order_status: VendorOrderStatus,
    #[schema(example = "BR4420010755")]
    pub tracking_no: Option<String>,
    #[schema(example = "Correios")]
    pub courier_name: Option<String>,
    pub expected_delivery: Option<DateTime<Utc>>,
}

// PATCH /api/vendor-orders/{id}/status
#[utoipa::path(
    patch,
    path = "/api/vendor-orders/{id}/status",
    tag = "Fulfillment",
    request_body = UpdateVendorOrderStatusPayload,
    responses(
        (status = 200, description = "Pedido atualizado", body = VendorOrder),
        (status = 404, description = "Pedido não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID interno do pedido de fornecedor")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_vendor_order_status(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateVendorOrderStatusPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let order = app_state
        .fulfillment_service
        .update_status(
            &user.0,
            &meta,
            id,
            payload.order_status,
            payload.tracking_no.as_deref(),
            payload.courier_name.as_deref(),
            payload.expected_delivery,
        )
        .await?;

    Ok(Json(order))
}

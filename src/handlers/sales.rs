// src/handlers/sales.rs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{auth::AuthenticatedUser, request_meta::RequestMeta},
    models::filters::{ListParams, Paginated},
    models::sales::{Followup, Sale, Target},
};

// GET /api/followups
#[utoipa::path(
    get,
    path = "/api/followups",
    tag = "Sales",
    params(ListParams),
    responses(
        (status = 200, description = "Página de follow-ups no escopo do usuário", body = Paginated<Followup>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_followups(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = app_state.sales_service.list_followups(&user.0, &params).await?;
    Ok(Json(page))
}

// GET /api/sales
#[utoipa::path(
    get,
    path = "/api/sales",
    tag = "Sales",
    params(ListParams),
    responses(
        (status = 200, description = "Página de vendas fechadas no escopo do usuário", body = Paginated<Sale>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_sales(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = app_state.sales_service.list_sales(&user.0, &params).await?;
    Ok(Json(page))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTargetPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Meta Q3 - time de radiadores")]
    pub title: String,
    pub assigned_users: Vec<Uuid>,
    #[schema(example = 50000.0)]
    pub target_amount: Decimal,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

// POST /api/targets
#[utoipa::path(
    post,
    path = "/api/targets",
    tag = "Sales",
    request_body = CreateTargetPayload,
    responses(
        (status = 201, description = "Meta criada", body = Target),
        (status = 400, description = "Período inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_target(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    meta: RequestMeta,
    Json(payload): Json<CreateTargetPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let target = app_state
        .sales_service
        .create_target(
            &user.0,
            &meta,
            &payload.title,
            &payload.assigned_users,
            payload.target_amount,
            payload.start_date,
            payload.end_date,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(target)))
}

// GET /api/targets
#[utoipa::path(
    get,
    path = "/api/targets",
    tag = "Sales",
    responses(
        (status = 200, description = "Metas visíveis ao usuário", body = Vec<Target>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_targets(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let targets = app_state.sales_service.list_targets(&user.0).await?;
    Ok(Json(targets))
}

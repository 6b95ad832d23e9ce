// src/handlers/analytics.rs

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::analytics::AnalyticsSummary,
    models::filters::AnalyticsParams,
};

// GET /api/analytics/summary
#[utoipa::path(
    get,
    path = "/api/analytics/summary",
    tag = "Analytics",
    params(AnalyticsParams),
    responses(
        (status = 200, description = "Resumo agregado dos leads no escopo do usuário", body = AnalyticsSummary),
        (status = 401, description = "Token ausente ou inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn analytics_summary(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<AnalyticsParams>,
) -> Result<impl IntoResponse, AppError> {
    let summary = app_state.analytics_service.summary(&user.0, &params).await?;
    Ok(Json(summary))
}

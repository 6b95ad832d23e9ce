// src/handlers/leads.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{auth::AuthenticatedUser, request_meta::RequestMeta},
    models::filters::{LeadListParams, Paginated},
    models::lead::{Lead, LeadPatch},
};

// Resposta das mutações: o lead salvo mais o que o cascade não conseguiu
// fazer. Warnings não derrubam o status HTTP.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadMutationResponse {
    pub lead: Lead,
    #[schema(example = json!(["payment record sync failed"]))]
    pub warnings: Vec<String>,
}

// GET /api/leads
#[utoipa::path(
    get,
    path = "/api/leads",
    tag = "Leads",
    params(LeadListParams),
    responses(
        (status = 200, description = "Página de leads visíveis ao usuário", body = Paginated<Lead>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_leads(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<LeadListParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = app_state.lead_service.list_leads(&user.0, &params).await?;
    Ok(Json(page))
}

// POST /api/leads
#[utoipa::path(
    post,
    path = "/api/leads",
    tag = "Leads",
    request_body = LeadPatch,
    responses(
        (status = 201, description = "Lead criado", body = LeadMutationResponse),
        (status = 400, description = "Payload inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_lead(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    meta: RequestMeta,
    Json(payload): Json<LeadPatch>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let (lead, warnings) = app_state
        .lead_service
        .create_lead(&user.0, &meta, payload)
        .await?;

    Ok((StatusCode::CREATED, Json(LeadMutationResponse { lead, warnings })))
}

// GET /api/leads/{id}
#[utoipa::path(
    get,
    path = "/api/leads/{id}",
    tag = "Leads",
    responses(
        (status = 200, description = "Lead encontrado", body = Lead),
        (status = 403, description = "Fora do escopo do usuário"),
        (status = 404, description = "Lead não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID interno do lead")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_lead(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let lead = app_state.lead_service.get_lead(&user.0, id).await?;
    Ok(Json(lead))
}

// PUT /api/leads/{id}
#[utoipa::path(
    put,
    path = "/api/leads/{id}",
    tag = "Leads",
    request_body = LeadPatch,
    responses(
        (status = 200, description = "Lead atualizado (com warnings do cascade, se houver)", body = LeadMutationResponse),
        (status = 403, description = "Fora do escopo do usuário"),
        (status = 404, description = "Lead não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID interno do lead")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_lead(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
    Json(payload): Json<LeadPatch>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let (lead, warnings) = app_state
        .lead_service
        .update_lead(&user.0, &meta, id, payload)
        .await?;

    Ok(Json(LeadMutationResponse { lead, warnings }))
}

// DELETE /api/leads/{id}
#[utoipa::path(
    delete,
    path = "/api/leads/{id}",
    tag = "Leads",
    responses(
        (status = 200, description = "Lead removido; satélites são preservados"),
        (status = 403, description = "Apenas admin pode remover leads"),
        (status = 404, description = "Lead não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID interno do lead")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_lead(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.lead_service.delete_lead(&user.0, &meta, id).await?;
    Ok(Json(json!({ "message": "Lead removido com sucesso." })))
}

#[derive(Debug, serde::Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddNotePayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Cliente pediu retorno na sexta de manhã")]
    pub text: String,
}

// POST /api/leads/{id}/notes
#[utoipa::path(
    post,
    path = "/api/leads/{id}/notes",
    tag = "Leads",
    request_body = AddNotePayload,
    responses(
        (status = 200, description = "Nota anexada ao lead", body = Lead),
        (status = 404, description = "Lead não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID interno do lead")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_note(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddNotePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let lead = app_state
        .lead_service
        .add_note(&user.0, &meta, id, payload.text)
        .await?;

    Ok(Json(lead))
}

// src/models/filters.rs

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// =============================================================================
//  QUERY STRING DOS ENDPOINTS DE LISTAGEM
// =============================================================================

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct LeadListParams {
    /// Página (base 1)
    pub page: Option<i64>,
    /// Registros por página (máx. 100)
    pub limit: Option<i64>,
    /// Busca livre em nome, contato, endereço, order_no, lead_id e produtos
    pub search: Option<String>,
    /// Valor exato de status
    pub status: Option<String>,
    /// Filtra por agente responsável
    pub agent: Option<Uuid>,
    /// Preset de janela: today | yesterday | this_week | custom
    pub date_filter_type: Option<String>,
    /// Início da janela custom (YYYY-MM-DD ou RFC 3339)
    pub custom_start_date: Option<String>,
    /// Fim da janela custom (YYYY-MM-DD ou RFC 3339)
    pub custom_end_date: Option<String>,
    /// Recorte adicional: só registros das últimas N horas
    pub time_in_hours: Option<i64>,
}

impl LeadListParams {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(20).clamp(1, 100)
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// Filtra por status (valor exato)
    pub status: Option<String>,
}

impl ListParams {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(20).clamp(1, 100)
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AnalyticsParams {
    /// Início da janela (YYYY-MM-DD ou RFC 3339)
    pub start_date: Option<String>,
    /// Fim da janela (YYYY-MM-DD ou RFC 3339)
    pub end_date: Option<String>,
    /// Ids de usuário separados por vírgula
    pub user_ids: Option<String>,
}

impl AnalyticsParams {
    // Token que não parseia como UUID é descartado em silêncio
    pub fn parsed_user_ids(&self) -> Option<Vec<Uuid>> {
        let raw = self.user_ids.as_deref()?;
        let ids: Vec<Uuid> = raw
            .split(',')
            .filter_map(|token| Uuid::parse_str(token.trim()).ok())
            .collect();
        if ids.is_empty() { None } else { Some(ids) }
    }
}

// =============================================================================
//  JANELA DE DATAS
// =============================================================================

// Resultado da resolução dos filtros temporais: cada extremidade ausente
// significa "sem restrição daquele lado". Filtro inválido nunca vira erro.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DateWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateWindow {
    pub fn resolve(
        filter_type: Option<&str>,
        custom_start: Option<&str>,
        custom_end: Option<&str>,
        time_in_hours: Option<i64>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut start: Option<DateTime<Utc>> = None;
        let mut end: Option<DateTime<Utc>> = None;

        match filter_type.map(str::trim) {
            Some("today") => {
                let today = now.date_naive();
                start = Some(start_of_day(today));
                end = Some(end_of_day(today));
            }
            Some("yesterday") => {
                let yesterday = now.date_naive() - Duration::days(1);
                start = Some(start_of_day(yesterday));
                end = Some(end_of_day(yesterday));
            }
            Some("this_week") => {
                // Semana começa na segunda; o fim fica aberto até agora
                let monday = now.date_naive().week(Weekday::Mon).first_day();
                start = Some(start_of_day(monday));
            }
            Some("custom") => {
                start = custom_start.and_then(parse_start_bound);
                end = custom_end.and_then(parse_end_bound);
            }
            // Preset desconhecido ou ausente não restringe nada
            _ => {}
        }

        if let Some(hours) = time_in_hours {
            if hours > 0 {
                let floor = now - Duration::hours(hours);
                start = Some(match start {
                    Some(s) if s > floor => s,
                    _ => floor,
                });
                end = end.or(Some(now));
            }
        }

        DateWindow { start, end }
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    start_of_day(date) + Duration::days(1) - Duration::milliseconds(1)
}

fn parse_start_bound(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(start_of_day(date));
    }
    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.with_timezone(&Utc))
}

fn parse_end_bound(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        // Data pura no fim da janela cobre o dia inteiro
        return Some(end_of_day(date));
    }
    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.with_timezone(&Utc))
}

// =============================================================================
//  QUERY INTERNA E ENVELOPE DE PAGINAÇÃO
// =============================================================================

// Filtros já resolvidos que o repositório traduz em SQL. `agent_scope` vem do
// PermissionManager e é inegociável; o resto vem da query string.
#[derive(Debug, Clone, Default)]
pub struct LeadQuery {
    pub agent_scope: Option<Vec<Uuid>>,
    pub agents: Option<Vec<Uuid>>,
    pub search: Option<String>,
    pub status: Option<String>,
    pub agent: Option<Uuid>,
    pub window: DateWindow,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub records: Vec<T>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

impl<T> Paginated<T> {
    pub fn new(records: Vec<T>, page: i64, limit: i64, total: i64) -> Self {
        let pages = if limit > 0 { (total + limit - 1) / limit } else { 0 };
        Self { records, page, limit, total, pages }
    }
}

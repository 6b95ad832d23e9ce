// src/models/analytics.rs

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    #[schema(example = "Follow up")]
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTrendEntry {
    #[schema(example = "2026-08")]
    pub month: String,
    pub count: i64,
    #[schema(example = "18200.00")]
    pub revenue: Decimal,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AgentPerformanceEntry {
    pub agent: Option<Uuid>,
    pub agent_name: Option<String>,
    pub total_leads: i64,
    pub closed: i64,
    #[schema(example = "9400.00")]
    pub revenue: Decimal,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentModeEntry {
    #[schema(example = "Zelle")]
    pub mode: String,
    pub count: i64,
    #[schema(example = "5300.00")]
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopStateEntry {
    #[schema(example = "TX")]
    pub state: String,
    pub count: i64,
}

// Fotografia única do painel. Todas as consultas rodam na mesma transação
// para os números baterem entre si.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub status_distribution: Vec<StatusCount>,
    pub monthly_trend: Vec<MonthlyTrendEntry>,
    pub agent_performance: Vec<AgentPerformanceEntry>,
    pub payment_modes: Vec<PaymentModeEntry>,
    pub top_states: Vec<TopStateEntry>,
    pub total_leads: i64,
    /// Percentual de leads fechados sobre o total da janela
    #[schema(example = 12.5)]
    pub conversion_rate: f64,
    #[schema(example = "18200.00")]
    pub total_revenue: Decimal,
    #[schema(example = "5100.00")]
    pub total_margin: Decimal,
}

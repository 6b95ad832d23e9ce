// src/db/analytics_repo.rs

use rust_decimal::Decimal;
use sqlx::{Acquire, Executor, PgPool, Postgres, QueryBuilder};

use crate::{
    common::error::AppError,
    db::lead_repo::push_filters,
    models::analytics::{
        AgentPerformanceEntry, AnalyticsSummary, MonthlyTrendEntry, PaymentModeEntry, StatusCount,
        TopStateEntry,
    },
    models::filters::LeadQuery,
};

#[derive(Debug, Clone, sqlx::FromRow)]
struct TotalsRow {
    total_leads: i64,
    closed: i64,
    total_revenue: Decimal,
    total_margin: Decimal,
}

#[derive(Clone)]
pub struct AnalyticsRepository {
    pool: PgPool,
}

impl AnalyticsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // Todas as agregações leem o MESMO subconjunto filtrado de leads, dentro
    // de uma transação (snapshot consistente dos dados).
    pub async fn summarize<'e, E>(
        &self,
        executor: E,
        query: &LeadQuery,
        closed_status: &str,
        sale_status: &str,
    ) -> Result<AnalyticsSummary, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        // A. Distribuição por status
        let mut qb = QueryBuilder::<Postgres>::new("SELECT status, COUNT(*) AS count FROM ");
        push_leads_subquery(&mut qb, query);
        qb.push(" GROUP BY status ORDER BY count DESC");
        let status_distribution = qb
            .build_query_as::<StatusCount>()
            .fetch_all(&mut *tx)
            .await?;

        // B. Série mensal de volume e receita
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT to_char(created_at, 'YYYY-MM') AS month, COUNT(*) AS count, \
             COALESCE(SUM(sales_price), 0) AS revenue FROM ",
        );
        push_leads_subquery(&mut qb, query);
        qb.push(" GROUP BY 1 ORDER BY 1 ASC");
        let monthly_trend = qb
            .build_query_as::<MonthlyTrendEntry>()
            .fetch_all(&mut *tx)
            .await?;

        // C. Desempenho por agente (nome via LEFT JOIN, agente nulo também conta)
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT l.assigned_agent AS agent, u.name AS agent_name, \
             COUNT(*) AS total_leads, COUNT(*) FILTER (WHERE l.status = ",
        );
        qb.push_bind(closed_status.to_string());
        qb.push(") AS closed, COALESCE(SUM(l.sales_price) FILTER (WHERE l.status = ");
        qb.push_bind(closed_status.to_string());
        qb.push("), 0) AS revenue FROM ");
        push_leads_subquery(&mut qb, query);
        qb.push(
            " LEFT JOIN users u ON u.id = l.assigned_agent \
             GROUP BY l.assigned_agent, u.name ORDER BY revenue DESC",
        );
        let agent_performance = qb
            .build_query_as::<AgentPerformanceEntry>()
            .fetch_all(&mut *tx)
            .await?;

        // D. Formas de pagamento (só leads com valor)
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT COALESCE(mode_of_payment, 'Not specified') AS mode, COUNT(*) AS count, \
             COALESCE(SUM(sales_price), 0) AS amount FROM ",
        );
        push_leads_subquery(&mut qb, query);
        qb.push(" WHERE sales_price > 0 GROUP BY 1 ORDER BY amount DESC");
        let payment_modes = qb
            .build_query_as::<PaymentModeEntry>()
            .fetch_all(&mut *tx)
            .await?;

        // E. Estados com mais leads
        let mut qb = QueryBuilder::<Postgres>::new("SELECT state, COUNT(*) AS count FROM ");
        push_leads_subquery(&mut qb, query);
        qb.push(
            " WHERE state IS NOT NULL AND state <> '' \
             GROUP BY state ORDER BY count DESC LIMIT 5",
        );
        let top_states = qb
            .build_query_as::<TopStateEntry>()
            .fetch_all(&mut *tx)
            .await?;

        // F. Totais e taxa de conversão
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) AS total_leads, COUNT(*) FILTER (WHERE status = ",
        );
        qb.push_bind(closed_status.to_string());
        qb.push(") AS closed, COALESCE(SUM(sales_price) FILTER (WHERE status IN (");
        qb.push_bind(closed_status.to_string());
        qb.push(", ");
        qb.push_bind(sale_status.to_string());
        qb.push(")), 0) AS total_revenue, COALESCE(SUM(total_margin) FILTER (WHERE status IN (");
        qb.push_bind(closed_status.to_string());
        qb.push(", ");
        qb.push_bind(sale_status.to_string());
        qb.push(")), 0) AS total_margin FROM ");
        push_leads_subquery(&mut qb, query);
        let totals = qb.build_query_as::<TotalsRow>().fetch_one(&mut *tx).await?;

        // Fecha a transação (commit ou rollback tanto faz pra leitura, mas commit é clean)
        tx.commit().await?;

        let conversion_rate = if totals.total_leads > 0 {
            (totals.closed as f64 / totals.total_leads as f64) * 100.0
        } else {
            0.0
        };

        Ok(AnalyticsSummary {
            status_distribution,
            monthly_trend,
            agent_performance,
            payment_modes,
            top_states,
            total_leads: totals.total_leads,
            conversion_rate,
            total_revenue: totals.total_revenue,
            total_margin: totals.total_margin,
        })
    }
}

// Empurra "(SELECT * FROM leads WHERE <filtros>) AS l": o mesmo push_filters
// da listagem, então escopo e janela nunca divergem do que o usuário enxerga
fn push_leads_subquery(qb: &mut QueryBuilder<'_, Postgres>, query: &LeadQuery) {
    qb.push("(SELECT * FROM leads WHERE 1=1");
    push_filters(qb, query);
    qb.push(") AS l");
}

// src/db/lead_repo.rs

use sqlx::types::Json;
use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::filters::LeadQuery,
    models::lead::{HistoryEntry, Lead, LeadNote, LeadPatch, LeadStatus},
};

// O repositório de leads, responsável por todas as interações com a tabela 'leads'
#[derive(Clone)]
pub struct LeadRepository {
    pool: PgPool,
}

impl LeadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  ESCRITA
    // =========================================================================

    // O patch já chega normalizado (produtos com id, quantidade etc.); aqui só
    // aplicamos os defaults de coluna para o que não veio.
    pub async fn create_lead<'e, E>(
        &self,
        executor: E,
        lead_id: &str,
        status: &LeadStatus,
        assigned_agent: Option<Uuid>,
        patch: &LeadPatch,
        actor: Uuid,
        first_entry: &HistoryEntry,
    ) -> Result<Lead, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lead = sqlx::query_as::<_, Lead>(
            r#"
            INSERT INTO leads (
                lead_id, status, assigned_agent,
                customer_name, customer_id, email, phone, alternate_phone,
                city, state, country, billing_address, shipping_address,
                products, sales_price, cost_price, total_margin, pending_balance,
                mode_of_payment, dispute_reason, refund_amount, refund_reason,
                order_no, history, created_by, updated_by
            )
            VALUES (
                $1, $2, $3,
                COALESCE($4, ''), $5, $6, $7, $8,
                $9, $10, $11, $12, $13,
                COALESCE($14, '[]'::jsonb), COALESCE($15, 0), COALESCE($16, 0), COALESCE($17, 0), COALESCE($18, 0),
                $19, $20, $21, $22,
                $23, jsonb_build_array($24::jsonb), $25, $25
            )
            RETURNING *
            "#,
        )
        .bind(lead_id)
        .bind(status.as_str())
        .bind(assigned_agent)
        .bind(patch.customer_name.as_ref())
        .bind(patch.customer_id.as_ref())
        .bind(patch.email.as_ref())
        .bind(patch.phone.as_ref())
        .bind(patch.alternate_phone.as_ref())
        .bind(patch.city.as_ref())
        .bind(patch.state.as_ref())
        .bind(patch.country.as_ref())
        .bind(patch.billing_address.as_ref())
        .bind(patch.shipping_address.as_ref())
        .bind(patch.products.as_ref().map(Json))
        .bind(patch.sales_price)
        .bind(patch.cost_price)
        .bind(patch.total_margin)
        .bind(patch.pending_balance)
        .bind(patch.mode_of_payment.as_ref())
        .bind(patch.dispute_reason.as_ref())
        .bind(patch.refund_amount)
        .bind(patch.refund_reason.as_ref())
        .bind(patch.order_no.as_ref())
        .bind(Json(first_entry))
        .bind(actor)
        .fetch_one(executor)
        .await?;

        Ok(lead)
    }

    // Grava o estado já mesclado pelo serviço. `lead_id`, `lead_number`,
    // `order_no`, `notes`, `created_by` e `created_at` ficam de fora: cada um
    // tem seu próprio caminho de escrita (ou nenhum).
    pub async fn update_lead<'e, E>(
        &self,
        executor: E,
        lead: &Lead,
        actor: Uuid,
        entry: &HistoryEntry,
    ) -> Result<Lead, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let updated = sqlx::query_as::<_, Lead>(
            r#"
            UPDATE leads SET
                status = $1,
                assigned_agent = $2,
                customer_name = $3,
                customer_id = $4,
                email = $5,
                phone = $6,
                alternate_phone = $7,
                city = $8,
                state = $9,
                country = $10,
                billing_address = $11,
                shipping_address = $12,
                products = $13,
                sales_price = $14,
                cost_price = $15,
                total_margin = $16,
                pending_balance = $17,
                mode_of_payment = $18,
                dispute_reason = $19,
                refund_amount = $20,
                refund_reason = $21,
                history = history || jsonb_build_array($22::jsonb),
                updated_by = $23,
                updated_at = NOW()
            WHERE id = $24
            RETURNING *
            "#,
        )
        .bind(lead.status.as_str())
        .bind(lead.assigned_agent)
        .bind(&lead.customer_name)
        .bind(lead.customer_id.as_ref())
        .bind(lead.email.as_ref())
        .bind(lead.phone.as_ref())
        .bind(lead.alternate_phone.as_ref())
        .bind(lead.city.as_ref())
        .bind(lead.state.as_ref())
        .bind(lead.country.as_ref())
        .bind(lead.billing_address.as_ref())
        .bind(lead.shipping_address.as_ref())
        .bind(Json(&lead.products))
        .bind(lead.sales_price)
        .bind(lead.cost_price)
        .bind(lead.total_margin)
        .bind(lead.pending_balance)
        .bind(lead.mode_of_payment.as_ref())
        .bind(lead.dispute_reason.as_ref())
        .bind(lead.refund_amount)
        .bind(lead.refund_reason.as_ref())
        .bind(Json(entry))
        .bind(actor)
        .bind(lead.id)
        .fetch_optional(executor)
        .await?;

        updated.ok_or(AppError::ResourceNotFound("Lead".to_string()))
    }

    // A primeira escrita vence: só preenche se a coluna ainda está NULL.
    // Retorna se esta chamada foi a vencedora.
    pub async fn backfill_order_no<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        order_no: &str,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE leads
            SET order_no = $1, updated_at = NOW()
            WHERE id = $2 AND order_no IS NULL
            "#,
        )
        .bind(order_no)
        .bind(id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    // Anexa sem reler nem reescrever o array inteiro
    pub async fn append_note<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        note: &LeadNote,
    ) -> Result<Lead, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let updated = sqlx::query_as::<_, Lead>(
            r#"
            UPDATE leads
            SET notes = notes || jsonb_build_array($1::jsonb), updated_at = NOW()
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(Json(note))
        .bind(id)
        .fetch_optional(executor)
        .await?;

        updated.ok_or(AppError::ResourceNotFound("Lead".to_string()))
    }

    pub async fn delete_lead<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM leads WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Lead>, AppError> {
        let maybe_lead = sqlx::query_as::<_, Lead>("SELECT * FROM leads WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(maybe_lead)
    }

    pub async fn list_leads(
        &self,
        query: &LeadQuery,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Lead>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM leads WHERE 1=1");
        push_filters(&mut qb, query);
        qb.push(" ORDER BY created_at DESC LIMIT ");
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let leads = qb.build_query_as::<Lead>().fetch_all(&self.pool).await?;
        Ok(leads)
    }

    pub async fn count_leads(&self, query: &LeadQuery) -> Result<i64, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM leads WHERE 1=1");
        push_filters(&mut qb, query);

        let total = qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(total)
    }
}

// Traduz o LeadQuery em cláusulas AND. A MESMA função alimenta a listagem, a
// contagem e o analytics, então escopo de permissão nunca diverge entre eles.
pub(crate) fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &LeadQuery) {
    // Escopo de visibilidade vem antes de qualquer filtro pedido pelo usuário
    if let Some(scope) = &query.agent_scope {
        qb.push(" AND assigned_agent = ANY(");
        qb.push_bind(scope.clone());
        qb.push(")");
    }

    if let Some(agents) = &query.agents {
        qb.push(" AND assigned_agent = ANY(");
        qb.push_bind(agents.clone());
        qb.push(")");
    }

    if let Some(status) = &query.status {
        qb.push(" AND status = ");
        qb.push_bind(status.clone());
    }

    if let Some(agent) = query.agent {
        qb.push(" AND assigned_agent = ");
        qb.push_bind(agent);
    }

    if let Some(search) = &query.search {
        let search = search.trim();
        if !search.is_empty() {
            let term = format!("%{}%", search);
            qb.push(" AND (customer_name ILIKE ");
            qb.push_bind(term.clone());
            qb.push(" OR email ILIKE ");
            qb.push_bind(term.clone());
            qb.push(" OR phone ILIKE ");
            qb.push_bind(term.clone());
            qb.push(" OR city ILIKE ");
            qb.push_bind(term.clone());
            qb.push(" OR state ILIKE ");
            qb.push_bind(term.clone());
            qb.push(" OR order_no ILIKE ");
            qb.push_bind(term.clone());
            qb.push(" OR lead_id ILIKE ");
            qb.push_bind(term.clone());
            // Produtos moram num array jsonb, então a busca desce até eles
            qb.push(
                " OR EXISTS (SELECT 1 FROM jsonb_array_elements(products) AS p \
                 WHERE p->>'productName' ILIKE ",
            );
            qb.push_bind(term);
            qb.push("))");
        }
    }

    if let Some(start) = query.window.start {
        qb.push(" AND created_at >= ");
        qb.push_bind(start);
    }
    if let Some(end) = query.window.end {
        qb.push(" AND created_at <= ");
        qb.push_bind(end);
    }
}

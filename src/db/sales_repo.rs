// src/db/sales_repo.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::sales::{Followup, Sale, Target},
};

// Cobre as três tabelas derivadas do fechamento: followups, sales e targets.
// Todas são alimentadas pelo cascade; os endpoints só leem (e criam metas).
#[derive(Clone)]
pub struct SalesRepository {
    pool: PgPool,
}

impl SalesRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  ESCRITA (disparada pelo cascade)
    // =========================================================================

    pub async fn create_followup<'e, E>(
        &self,
        executor: E,
        lead_id: &str,
        lead_number: i64,
        customer_name: &str,
        phone: Option<&str>,
        email: Option<&str>,
        status: &str,
        assigned_agent: Option<Uuid>,
    ) -> Result<Followup, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let followup = sqlx::query_as::<_, Followup>(
            r#"
            INSERT INTO followups (lead_id, lead_number, customer_name, phone, email, status, assigned_agent)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(lead_id)
        .bind(lead_number)
        .bind(customer_name)
        .bind(phone)
        .bind(email)
        .bind(status)
        .bind(assigned_agent)
        .fetch_one(executor)
        .await?;

        Ok(followup)
    }

    pub async fn create_sale<'e, E>(
        &self,
        executor: E,
        lead_id: &str,
        lead_number: i64,
        customer_name: &str,
        amount: Decimal,
        margin: Decimal,
        mode_of_payment: Option<&str>,
        assigned_agent: Option<Uuid>,
    ) -> Result<Sale, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            INSERT INTO sales (lead_id, lead_number, customer_name, amount, margin, mode_of_payment, assigned_agent)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(lead_id)
        .bind(lead_number)
        .bind(customer_name)
        .bind(amount)
        .bind(margin)
        .bind(mode_of_payment)
        .bind(assigned_agent)
        .fetch_one(executor)
        .await?;

        Ok(sale)
    }

    // Soma no realizado de TODAS as metas ativas que incluem o agente.
    // Retorna quantas metas foram tocadas.
    pub async fn increment_active_targets<'e, E>(
        &self,
        executor: E,
        agent: Uuid,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE targets
            SET achieved_amount = achieved_amount + $1, updated_at = NOW()
            WHERE $2 = ANY(assigned_users)
              AND start_date <= $3
              AND end_date >= $3
            "#,
        )
        .bind(amount)
        .bind(agent)
        .bind(now)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn create_target<'e, E>(
        &self,
        executor: E,
        title: &str,
        assigned_users: &[Uuid],
        target_amount: Decimal,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        created_by: Uuid,
    ) -> Result<Target, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let target = sqlx::query_as::<_, Target>(
            r#"
            INSERT INTO targets (title, assigned_users, target_amount, start_date, end_date, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(title)
        .bind(assigned_users.to_vec())
        .bind(target_amount)
        .bind(start_date)
        .bind(end_date)
        .bind(created_by)
        .fetch_one(executor)
        .await?;

        Ok(target)
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    pub async fn list_followups(
        &self,
        scope: Option<&[Uuid]>,
        status: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Followup>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM followups WHERE 1=1");
        push_scope_and_status(&mut qb, scope, status);
        qb.push(" ORDER BY created_at DESC LIMIT ");
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let followups = qb.build_query_as::<Followup>().fetch_all(&self.pool).await?;
        Ok(followups)
    }

    pub async fn count_followups(
        &self,
        scope: Option<&[Uuid]>,
        status: Option<&str>,
    ) -> Result<i64, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM followups WHERE 1=1");
        push_scope_and_status(&mut qb, scope, status);

        let total = qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(total)
    }

    pub async fn list_sales(
        &self,
        scope: Option<&[Uuid]>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Sale>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM sales WHERE 1=1");
        push_scope_and_status(&mut qb, scope, None);
        qb.push(" ORDER BY created_at DESC LIMIT ");
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let sales = qb.build_query_as::<Sale>().fetch_all(&self.pool).await?;
        Ok(sales)
    }

    pub async fn count_sales(&self, scope: Option<&[Uuid]>) -> Result<i64, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM sales WHERE 1=1");
        push_scope_and_status(&mut qb, scope, None);

        let total = qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(total)
    }

    // Admin enxerga todas; manager e agente só as metas em que aparecem
    pub async fn list_targets(&self, member: Option<Uuid>) -> Result<Vec<Target>, AppError> {
        let targets = match member {
            Some(user_id) => {
                sqlx::query_as::<_, Target>(
                    "SELECT * FROM targets WHERE $1 = ANY(assigned_users) ORDER BY start_date DESC",
                )
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Target>("SELECT * FROM targets ORDER BY start_date DESC")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(targets)
    }
}

fn push_scope_and_status(
    qb: &mut QueryBuilder<'_, Postgres>,
    scope: Option<&[Uuid]>,
    status: Option<&str>,
) {
    if let Some(scope) = scope {
        qb.push(" AND assigned_agent = ANY(");
        qb.push_bind(scope.to_vec());
        qb.push(")");
    }
    if let Some(status) = status {
        qb.push(" AND status = ");
        qb.push_bind(status.to_string());
    }
}

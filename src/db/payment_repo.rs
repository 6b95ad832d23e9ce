// src/db/payment_repo.rs

use sqlx::{Executor, PgPool, Postgres};

use crate::{
    common::error::AppError,
    models::payment::{PaymentPatch, PaymentRecord},
};

#[derive(Clone)]
pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Um registro por lead, chaveado por lead_id. No primeiro salvamento os
    // defaults entram ('pending' / 'Not specified'); nos seguintes, campo que
    // veio None preserva o que já está gravado.
    pub async fn upsert_by_lead<'e, E>(
        &self,
        executor: E,
        lead_id: &str,
        patch: &PaymentPatch,
    ) -> Result<PaymentRecord, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, PaymentRecord>(
            r#"
            INSERT INTO payment_records (
                lead_id, customer_name, payment_status, mode_of_payment,
                sales_price, cost_price, total_margin, pending_balance,
                dispute_reason, refund_amount, refund_reason, assigned_agent
            )
            VALUES (
                $1, $2, COALESCE($3, 'pending'), COALESCE($4, 'Not specified'),
                $5, $6, $7, $8,
                $9, $10, $11, $12
            )
            ON CONFLICT (lead_id) DO UPDATE SET
                customer_name   = COALESCE($2, payment_records.customer_name),
                payment_status  = COALESCE($3, payment_records.payment_status),
                mode_of_payment = COALESCE($4, payment_records.mode_of_payment),
                sales_price     = COALESCE($5, payment_records.sales_price),
                cost_price      = COALESCE($6, payment_records.cost_price),
                total_margin    = COALESCE($7, payment_records.total_margin),
                pending_balance = COALESCE($8, payment_records.pending_balance),
                dispute_reason  = COALESCE($9, payment_records.dispute_reason),
                refund_amount   = COALESCE($10, payment_records.refund_amount),
                refund_reason   = COALESCE($11, payment_records.refund_reason),
                assigned_agent  = COALESCE($12, payment_records.assigned_agent),
                updated_at      = NOW()
            RETURNING *
            "#,
        )
        .bind(lead_id)
        .bind(patch.customer_name.as_ref())
        .bind(patch.payment_status.as_ref())
        .bind(patch.mode_of_payment.as_ref())
        .bind(patch.sales_price)
        .bind(patch.cost_price)
        .bind(patch.total_margin)
        .bind(patch.pending_balance)
        .bind(patch.dispute_reason.as_ref())
        .bind(patch.refund_amount)
        .bind(patch.refund_reason.as_ref())
        .bind(patch.assigned_agent)
        .fetch_one(executor)
        .await?;

        Ok(record)
    }

    pub async fn find_by_lead(&self, lead_id: &str) -> Result<Option<PaymentRecord>, AppError> {
        let maybe_record =
            sqlx::query_as::<_, PaymentRecord>("SELECT * FROM payment_records WHERE lead_id = $1")
                .bind(lead_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(maybe_record)
    }
}

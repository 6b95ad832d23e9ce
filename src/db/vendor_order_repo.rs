// src/db/vendor_order_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::vendor_order::{VendorOrder, VendorOrderPatch, VendorOrderStatus},
};

#[derive(Clone)]
pub struct VendorOrderRepository {
    pool: PgPool,
}

impl VendorOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Uma linha por par (customer_id, product_name). `vendor_id`, `order_no` e
    // `order_status` só existem na criação: salvar o lead de novo atualiza os
    // dados do fornecedor sem resetar o andamento do fulfillment.
    pub async fn upsert_by_customer_product<'e, E>(
        &self,
        executor: E,
        customer_id: &str,
        product_name: &str,
        vendor_id: &str,
        order_no: &str,
        patch: &VendorOrderPatch,
    ) -> Result<VendorOrder, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, VendorOrder>(
            r#"
            INSERT INTO vendor_orders (
                vendor_id, order_no, lead_id, customer_id, product_name,
                customer_name, vendor_name, vendor_location, vendor_address, vendor_phone,
                quantity, price, assigned_agent
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (customer_id, product_name) DO UPDATE SET
                lead_id         = COALESCE($3, vendor_orders.lead_id),
                customer_name   = COALESCE($6, vendor_orders.customer_name),
                vendor_name     = COALESCE($7, vendor_orders.vendor_name),
                vendor_location = COALESCE($8, vendor_orders.vendor_location),
                vendor_address  = COALESCE($9, vendor_orders.vendor_address),
                vendor_phone    = COALESCE($10, vendor_orders.vendor_phone),
                quantity        = COALESCE($11, vendor_orders.quantity),
                price           = COALESCE($12, vendor_orders.price),
                assigned_agent  = COALESCE($13, vendor_orders.assigned_agent),
                updated_at      = NOW()
            RETURNING *
            "#,
        )
        .bind(vendor_id)
        .bind(order_no)
        .bind(patch.lead_id.as_ref())
        .bind(customer_id)
        .bind(product_name)
        .bind(patch.customer_name.as_ref())
        .bind(patch.vendor_name.as_ref())
        .bind(patch.vendor_location.as_ref())
        .bind(patch.vendor_address.as_ref())
        .bind(patch.vendor_phone.as_ref())
        .bind(patch.quantity)
        .bind(patch.price)
        .bind(patch.assigned_agent)
        .fetch_one(executor)
        .await?;

        Ok(order)
    }

    // Só o endpoint de fulfillment mexe em order_status e rastreio
    pub async fn update_status<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        status: VendorOrderStatus,
        tracking_no: Option<&str>,
        courier_name: Option<&str>,
        expected_delivery: Option<DateTime<Utc>>,
    ) -> Result<VendorOrder, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let updated = sqlx::query_as::<_, VendorOrder>(
            r#"
            UPDATE vendor_orders SET
                order_status      = $1,
                tracking_no       = COALESCE($2, tracking_no),
                courier_name      = COALESCE($3, courier_name),
                expected_delivery = COALESCE($4, expected_delivery),
                updated_at        = NOW()
            WHERE id = $5
            RETURNING *
            "#,
        )
        .bind(status)
        .bind(tracking_no)
        .bind(courier_name)
        .bind(expected_delivery)
        .bind(id)
        .fetch_optional(executor)
        .await?;

        updated.ok_or(AppError::ResourceNotFound("Pedido de fornecedor".to_string()))
    }

    pub async fn list(
        &self,
        scope: Option<&[Uuid]>,
        status: Option<VendorOrderStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<VendorOrder>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM vendor_orders WHERE 1=1");
        push_filters(&mut qb, scope, status);
        qb.push(" ORDER BY created_at DESC LIMIT ");
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let orders = qb.build_query_as::<VendorOrder>().fetch_all(&self.pool).await?;
        Ok(orders)
    }

    pub async fn count(
        &self,
        scope: Option<&[Uuid]>,
        status: Option<VendorOrderStatus>,
    ) -> Result<i64, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM vendor_orders WHERE 1=1");
        push_filters(&mut qb, scope, status);

        let total = qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(total)
    }
}

fn push_filters(
    qb: &mut QueryBuilder<'_, Postgres>,
    scope: Option<&[Uuid]>,
    status: Option<VendorOrderStatus>,
) {
    if let Some(scope) = scope {
        qb.push(" AND assigned_agent = ANY(");
        qb.push_bind(scope.to_vec());
        qb.push(")");
    }
    if let Some(status) = status {
        qb.push(" AND order_status = ");
        qb.push_bind(status);
    }
}

mod common;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::{meta, patch, PgTestContext};
use rust_decimal::Decimal;
use serde_json::json;

use autopecas_crm::common::AppError;
use autopecas_crm::db::{LeadRepository, PaymentRepository, SalesRepository, VendorOrderRepository};
use autopecas_crm::models::lead::LeadStatus;
use autopecas_crm::models::vendor_order::VendorOrder;
use autopecas_crm::services::activity_log::{ActivityLog, ActivityRecord};
use autopecas_crm::services::LeadService;

// Sink que guarda os registros emitidos para inspeção nos testes
#[derive(Clone, Default)]
struct CapturingLog(Arc<Mutex<Vec<ActivityRecord>>>);

#[async_trait]
impl ActivityLog for CapturingLog {
    async fn record(&self, record: ActivityRecord) {
        self.0.lock().unwrap().push(record);
    }
}

async fn count(pool: &sqlx::PgPool, sql: &str, lead_id: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(sql)
        .bind(lead_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn create_seeds_payment_record_with_defaults() {
    let Some(ctx) = PgTestContext::new("orchestrator").await else {
        return;
    };

    let (lead, warnings) = ctx
        .lead_service
        .create_lead(
            &ctx.agent,
            &meta(),
            patch(json!({
                "customerName": "Oficina Santa Fé",
                "phone": "(11) 98876-1020",
                "salesPrice": 1500.0
            })),
        )
        .await
        .unwrap();

    assert!(warnings.is_empty(), "warnings: {:?}", warnings);
    assert!(lead.lead_id.starts_with("LD-"));
    assert_eq!(lead.status, LeadStatus::New);
    assert_eq!(lead.assigned_agent, Some(ctx.agent.id));
    assert_eq!(lead.history.len(), 1);
    assert_eq!(lead.history[0].note, "Lead created");

    let record = PaymentRepository::new(ctx.pool.clone())
        .find_by_lead(&lead.lead_id)
        .await
        .unwrap()
        .expect("registro de pagamento deveria existir");

    assert_eq!(record.payment_status, "pending");
    assert_eq!(record.mode_of_payment, "Not specified");
    assert_eq!(record.sales_price, Some(Decimal::from(1500)));
    assert_eq!(record.assigned_agent, Some(ctx.agent.id));

    ctx.cleanup().await;
}

#[tokio::test]
async fn resaving_updates_payment_record_in_place() {
    let Some(ctx) = PgTestContext::new("orchestrator").await else {
        return;
    };

    let (lead, _) = ctx
        .lead_service
        .create_lead(
            &ctx.agent,
            &meta(),
            patch(json!({ "customerName": "Retífica Paulista", "salesPrice": 1500.0 })),
        )
        .await
        .unwrap();

    let (_, warnings) = ctx
        .lead_service
        .update_lead(
            &ctx.agent,
            &meta(),
            lead.id,
            patch(json!({ "modeOfPayment": "Wire transfer", "paymentStatus": "partial" })),
        )
        .await
        .unwrap();
    assert!(warnings.is_empty());

    let total = count(
        &ctx.pool,
        "SELECT COUNT(*) FROM payment_records WHERE lead_id = $1",
        &lead.lead_id,
    )
    .await;
    assert_eq!(total, 1);

    let record = PaymentRepository::new(ctx.pool.clone())
        .find_by_lead(&lead.lead_id)
        .await
        .unwrap()
        .expect("registro de pagamento deveria existir");

    assert_eq!(record.mode_of_payment, "Wire transfer");
    assert_eq!(record.payment_status, "partial");
    // Campo ausente no patch preserva o que já estava gravado
    assert_eq!(record.sales_price, Some(Decimal::from(1500)));

    ctx.cleanup().await;
}

#[tokio::test]
async fn vendor_order_upserts_by_customer_and_product() {
    let Some(ctx) = PgTestContext::new("orchestrator").await else {
        return;
    };

    let product = json!({
        "productName": "Radiator Assembly",
        "quantity": 2,
        "unitPrice": 380.0,
        "costPrice": 240.0,
        "vendorInfo": { "vendorName": "Recife Auto Parts", "vendorPrice": 230.0 }
    });

    let (lead, warnings) = ctx
        .lead_service
        .create_lead(
            &ctx.agent,
            &meta(),
            patch(json!({
                "customerName": "Transportadora Vale",
                "phone": "(81) 3333-7070",
                "salesPrice": 760.0,
                "products": [product]
            })),
        )
        .await
        .unwrap();

    assert!(warnings.is_empty(), "warnings: {:?}", warnings);
    let first_order_no = lead.order_no.clone().expect("lead deveria ter order_no");
    assert!(first_order_no.starts_with("ORD-"));

    let order = sqlx::query_as::<_, VendorOrder>(
        "SELECT * FROM vendor_orders WHERE customer_id = $1 AND product_name = $2",
    )
    .bind("8133337070")
    .bind("Radiator Assembly")
    .fetch_one(&ctx.pool)
    .await
    .unwrap();

    assert!(order.vendor_id.starts_with("VND-"));
    assert_eq!(order.order_no, first_order_no);
    assert_eq!(order.price, Some(Decimal::from(230)));
    assert_eq!(order.vendor_name.as_deref(), Some("Recife Auto Parts"));

    // Mesmo par (cliente, produto) com preço novo: atualiza em vez de duplicar
    let revised = json!({
        "productName": "Radiator Assembly",
        "quantity": 2,
        "costPrice": 240.0,
        "vendorInfo": { "vendorName": "Recife Auto Parts", "vendorPrice": 210.0 }
    });
    let (lead_after, _) = ctx
        .lead_service
        .update_lead(
            &ctx.agent,
            &meta(),
            lead.id,
            patch(json!({ "products": [revised] })),
        )
        .await
        .unwrap();

    let orders = sqlx::query_as::<_, VendorOrder>("SELECT * FROM vendor_orders")
        .fetch_all(&ctx.pool)
        .await
        .unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].order_no, first_order_no);
    assert_eq!(orders[0].price, Some(Decimal::from(210)));

    // O order_no do lead é atribuído no máximo uma vez
    assert_eq!(lead_after.order_no.as_deref(), Some(first_order_no.as_str()));

    ctx.cleanup().await;
}

#[tokio::test]
async fn followup_fires_only_on_entry_into_the_set() {
    let Some(ctx) = PgTestContext::new("orchestrator").await else {
        return;
    };

    let (lead, _) = ctx
        .lead_service
        .create_lead(
            &ctx.agent,
            &meta(),
            patch(json!({ "customerName": "Auto Center Leste" })),
        )
        .await
        .unwrap();

    let followups = |lead_id: String| {
        let pool = ctx.pool.clone();
        async move {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM followups WHERE lead_id = $1")
                .bind(lead_id)
                .fetch_one(&pool)
                .await
                .unwrap()
        }
    };

    assert_eq!(followups(lead.lead_id.clone()).await, 0);

    let (lead2, _) = ctx
        .lead_service
        .update_lead(&ctx.agent, &meta(), lead.id, patch(json!({ "status": "Follow up" })))
        .await
        .unwrap();
    assert_eq!(followups(lead.lead_id.clone()).await, 1);
    assert_eq!(
        lead2.history.last().unwrap().note,
        "Status changed from New to Follow up"
    );

    // Edição comum não re-enfileira
    ctx.lead_service
        .update_lead(&ctx.agent, &meta(), lead.id, patch(json!({ "city": "Campinas" })))
        .await
        .unwrap();
    assert_eq!(followups(lead.lead_id.clone()).await, 1);

    // Troca dentro do conjunto de follow-up também não
    ctx.lead_service
        .update_lead(
            &ctx.agent,
            &meta(),
            lead.id,
            patch(json!({ "status": "Payment Follow up" })),
        )
        .await
        .unwrap();
    assert_eq!(followups(lead.lead_id.clone()).await, 1);

    // Sair e entrar de novo dispara outra vez
    ctx.lead_service
        .update_lead(
            &ctx.agent,
            &meta(),
            lead.id,
            patch(json!({ "status": "Not Interested" })),
        )
        .await
        .unwrap();
    ctx.lead_service
        .update_lead(&ctx.agent, &meta(), lead.id, patch(json!({ "status": "Follow up" })))
        .await
        .unwrap();
    assert_eq!(followups(lead.lead_id.clone()).await, 2);

    ctx.cleanup().await;
}

#[tokio::test]
async fn close_path_records_sale_and_hits_active_targets() {
    let Some(ctx) = PgTestContext::new("orchestrator").await else {
        return;
    };

    let now = chrono::Utc::now();
    let active = ctx
        .sales_service
        .create_target(
            &ctx.admin,
            &meta(),
            "Meta vigente",
            &[ctx.agent.id],
            Decimal::from(50_000),
            now - chrono::Duration::days(1),
            now + chrono::Duration::days(30),
        )
        .await
        .unwrap();
    let expired = ctx
        .sales_service
        .create_target(
            &ctx.admin,
            &meta(),
            "Meta encerrada",
            &[ctx.agent.id],
            Decimal::from(50_000),
            now - chrono::Duration::days(60),
            now - chrono::Duration::days(30),
        )
        .await
        .unwrap();

    let (lead, _) = ctx
        .lead_service
        .create_lead(
            &ctx.agent,
            &meta(),
            patch(json!({
                "customerName": "Frota Ribeiro",
                "salesPrice": 2500.0,
                "totalMargin": 800.0,
                "modeOfPayment": "Pix"
            })),
        )
        .await
        .unwrap();

    ctx.lead_service
        .update_lead(
            &ctx.agent,
            &meta(),
            lead.id,
            patch(json!({ "status": "Sale Payment Done" })),
        )
        .await
        .unwrap();

    let sales = count(
        &ctx.pool,
        "SELECT COUNT(*) FROM sales WHERE lead_id = $1",
        &lead.lead_id,
    )
    .await;
    assert_eq!(sales, 1);

    let sale_amount = sqlx::query_scalar::<_, Decimal>("SELECT amount FROM sales WHERE lead_id = $1")
        .bind(&lead.lead_id)
        .fetch_one(&ctx.pool)
        .await
        .unwrap();
    assert_eq!(sale_amount, Decimal::from(2500));

    ctx.lead_service
        .update_lead(&ctx.agent, &meta(), lead.id, patch(json!({ "status": "Sale Closed" })))
        .await
        .unwrap();

    // A meta cresce pela MARGEM do negócio, não pelo preço de venda
    let achieved = sqlx::query_scalar::<_, Decimal>("SELECT achieved_amount FROM targets WHERE id = $1")
        .bind(active.id)
        .fetch_one(&ctx.pool)
        .await
        .unwrap();
    assert_eq!(achieved, Decimal::from(800));

    let untouched = sqlx::query_scalar::<_, Decimal>("SELECT achieved_amount FROM targets WHERE id = $1")
        .bind(expired.id)
        .fetch_one(&ctx.pool)
        .await
        .unwrap();
    assert_eq!(untouched, Decimal::ZERO);

    // Salvar o lead já fechado não duplica venda nem soma de novo na meta
    ctx.lead_service
        .update_lead(&ctx.agent, &meta(), lead.id, patch(json!({ "city": "Sorocaba" })))
        .await
        .unwrap();

    let sales = count(
        &ctx.pool,
        "SELECT COUNT(*) FROM sales WHERE lead_id = $1",
        &lead.lead_id,
    )
    .await;
    assert_eq!(sales, 1);

    let achieved = sqlx::query_scalar::<_, Decimal>("SELECT achieved_amount FROM targets WHERE id = $1")
        .bind(active.id)
        .fetch_one(&ctx.pool)
        .await
        .unwrap();
    assert_eq!(achieved, Decimal::from(800));

    ctx.cleanup().await;
}

#[tokio::test]
async fn deleting_a_lead_preserves_satellites() {
    let Some(ctx) = PgTestContext::new("orchestrator").await else {
        return;
    };

    let (lead, _) = ctx
        .lead_service
        .create_lead(
            &ctx.agent,
            &meta(),
            patch(json!({
                "customerName": "Garagem Almeida",
                "phone": "(21) 2222-9090",
                "salesPrice": 900.0,
                "status": "Follow up",
                "products": [{
                    "productName": "Alternator 90A",
                    "costPrice": 310.0,
                    "vendorInfo": { "vendorLocation": "Curitiba" }
                }]
            })),
        )
        .await
        .unwrap();

    ctx.lead_service
        .delete_lead(&ctx.admin, &meta(), lead.id)
        .await
        .unwrap();

    let gone = ctx.lead_service.get_lead(&ctx.admin, lead.id).await;
    assert!(matches!(gone, Err(AppError::ResourceNotFound(_))));

    assert_eq!(
        count(&ctx.pool, "SELECT COUNT(*) FROM payment_records WHERE lead_id = $1", &lead.lead_id).await,
        1
    );
    assert_eq!(
        count(&ctx.pool, "SELECT COUNT(*) FROM vendor_orders WHERE lead_id = $1", &lead.lead_id).await,
        1
    );
    assert_eq!(
        count(&ctx.pool, "SELECT COUNT(*) FROM followups WHERE lead_id = $1", &lead.lead_id).await,
        1
    );

    ctx.cleanup().await;
}

#[tokio::test]
async fn scope_blocks_foreign_writes() {
    let Some(ctx) = PgTestContext::new("orchestrator").await else {
        return;
    };

    let (lead, _) = ctx
        .lead_service
        .create_lead(
            &ctx.agent,
            &meta(),
            patch(json!({ "customerName": "Peças & Cia" })),
        )
        .await
        .unwrap();

    // Agente de fora do time não lê nem escreve
    let read = ctx.lead_service.get_lead(&ctx.outsider, lead.id).await;
    assert!(matches!(read, Err(AppError::Forbidden)));

    let write = ctx
        .lead_service
        .update_lead(&ctx.outsider, &meta(), lead.id, patch(json!({ "city": "Niterói" })))
        .await;
    assert!(matches!(write, Err(AppError::Forbidden)));

    // O manager do time enxerga e edita
    ctx.lead_service
        .update_lead(&ctx.manager, &meta(), lead.id, patch(json!({ "city": "Santos" })))
        .await
        .unwrap();

    // Remoção é só de admin
    let denied = ctx.lead_service.delete_lead(&ctx.manager, &meta(), lead.id).await;
    assert!(matches!(denied, Err(AppError::Forbidden)));
    let denied = ctx.lead_service.delete_lead(&ctx.agent, &meta(), lead.id).await;
    assert!(matches!(denied, Err(AppError::Forbidden)));

    ctx.lead_service.delete_lead(&ctx.admin, &meta(), lead.id).await.unwrap();

    ctx.cleanup().await;
}

#[tokio::test]
async fn note_appends_without_touching_history() {
    let Some(ctx) = PgTestContext::new("orchestrator").await else {
        return;
    };

    let (lead, _) = ctx
        .lead_service
        .create_lead(
            &ctx.agent,
            &meta(),
            patch(json!({ "customerName": "Mecânica do Porto" })),
        )
        .await
        .unwrap();

    let updated = ctx
        .lead_service
        .add_note(
            &ctx.agent,
            &meta(),
            lead.id,
            "Cliente pediu retorno na sexta".to_string(),
        )
        .await
        .unwrap();

    assert_eq!(updated.notes.len(), 1);
    assert_eq!(updated.notes[0].text, "Cliente pediu retorno na sexta");
    assert_eq!(updated.notes[0].author, Some(ctx.agent.id));
    // Nota não é mudança de campo: o histórico continua só com a criação
    assert_eq!(updated.history.len(), 1);

    ctx.cleanup().await;
}

#[tokio::test]
async fn update_audit_carries_old_and_new_values() {
    let Some(ctx) = PgTestContext::new("orchestrator").await else {
        return;
    };

    let log = CapturingLog::default();
    let lead_service = LeadService::new(
        ctx.pool.clone(),
        LeadRepository::new(ctx.pool.clone()),
        PaymentRepository::new(ctx.pool.clone()),
        VendorOrderRepository::new(ctx.pool.clone()),
        SalesRepository::new(ctx.pool.clone()),
        Arc::new(log.clone()),
    );

    let (lead, _) = lead_service
        .create_lead(
            &ctx.agent,
            &meta(),
            patch(json!({ "customerName": "Auto Center Leste", "city": "Campinas" })),
        )
        .await
        .unwrap();

    lead_service
        .update_lead(&ctx.agent, &meta(), lead.id, patch(json!({ "city": "Sorocaba" })))
        .await
        .unwrap();

    let records = log.0.lock().unwrap();
    let update = records.iter().find(|r| r.action == "update").unwrap();
    let changes = update.changes.as_ref().unwrap();

    assert_eq!(changes["changedFields"], json!(["city"]));
    // oldValues é o lead como estava; newValues só os campos que vieram
    assert_eq!(changes["oldValues"]["city"], json!("Campinas"));
    assert_eq!(changes["oldValues"]["customerName"], json!("Auto Center Leste"));
    assert_eq!(changes["newValues"], json!({ "city": "Sorocaba" }));
    drop(records);

    ctx.cleanup().await;
}

#[tokio::test]
async fn satellite_failure_surfaces_as_warning_not_error() {
    let Some(ctx) = PgTestContext::new("orchestrator").await else {
        return;
    };

    let (lead, warnings) = ctx
        .lead_service
        .create_lead(
            &ctx.agent,
            &meta(),
            patch(json!({ "customerName": "Mecânica Boa Vista" })),
        )
        .await
        .unwrap();
    assert!(warnings.is_empty());

    // Derruba a tabela satélite para forçar a falha do passo de follow-up
    sqlx::query("DROP TABLE followups").execute(&ctx.pool).await.unwrap();

    let (updated, warnings) = ctx
        .lead_service
        .update_lead(&ctx.agent, &meta(), lead.id, patch(json!({ "status": "Follow up" })))
        .await
        .unwrap();

    // O salvamento vingou e a falha do satélite virou um único warning
    assert_eq!(updated.status, LeadStatus::FollowUp);
    assert_eq!(warnings, vec!["followup creation failed".to_string()]);

    let reloaded = ctx.lead_service.get_lead(&ctx.agent, lead.id).await.unwrap();
    assert_eq!(reloaded.status, LeadStatus::FollowUp);

    ctx.cleanup().await;
}

#[tokio::test]
async fn two_vendor_products_in_one_save_share_one_order_no() {
    let Some(ctx) = PgTestContext::new("orchestrator").await else {
        return;
    };

    let (lead, warnings) = ctx
        .lead_service
        .create_lead(
            &ctx.agent,
            &meta(),
            patch(json!({
                "customerName": "Oficina Dois Irmãos",
                "phone": "(19) 3232-4040",
                "products": [
                    {
                        "productName": "Alternator 120A",
                        "quantity": 1,
                        "vendorInfo": { "vendorName": "Sul Peças", "vendorPrice": 410.0 }
                    },
                    {
                        "productName": "Starter Motor",
                        "quantity": 1,
                        "vendorInfo": { "vendorName": "Norte Diesel", "vendorPrice": 280.0 }
                    }
                ]
            })),
        )
        .await
        .unwrap();
    assert!(warnings.is_empty(), "warnings: {:?}", warnings);

    let orders = sqlx::query_as::<_, VendorOrder>(
        "SELECT * FROM vendor_orders WHERE customer_id = $1 ORDER BY product_name",
    )
    .bind("1932324040")
    .fetch_all(&ctx.pool)
    .await
    .unwrap();

    // Um pedido por produto, cada qual com seu próprio order_no
    assert_eq!(orders.len(), 2);
    assert_ne!(orders[0].order_no, orders[1].order_no);

    // O lead recebe o order_no do primeiro pedido criado e para por aí
    let assigned = lead.order_no.expect("lead deveria ter order_no");
    assert_eq!(assigned, orders[0].order_no);

    let (resaved, _) = ctx
        .lead_service
        .update_lead(&ctx.agent, &meta(), lead.id, patch(json!({ "city": "Limeira" })))
        .await
        .unwrap();
    assert_eq!(resaved.order_no.as_deref(), Some(assigned.as_str()));

    ctx.cleanup().await;
}

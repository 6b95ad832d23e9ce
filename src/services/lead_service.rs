// src/services/lead_service.rs

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{LeadRepository, PaymentRepository, SalesRepository, VendorOrderRepository},
    middleware::request_meta::RequestMeta,
    models::auth::User,
    models::filters::{DateWindow, LeadListParams, LeadQuery, Paginated},
    models::lead::{
        generate_lead_id, normalize_products, HistoryEntry, Lead, LeadNote, LeadPatch, LeadStatus,
        Product, TransitionRules,
    },
    models::payment::PaymentPatch,
    models::vendor_order::{generate_order_no, generate_vendor_id, VendorOrderPatch},
    services::activity_log::{ActivityLog, ActivityRecord},
    services::permission::{Action, PermissionManager, Resource},
};

// =============================================================================
//  PLANO DO CASCADE
// =============================================================================

// Passos derivados de um salvamento, na ordem em que executam
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CascadeStep {
    UpsertPayment,
    UpsertVendorOrders,
    CreateFollowup,
    CreateSale,
    IncrementTargets,
}

pub(crate) struct CascadeInput<'a> {
    pub old_status: Option<&'a LeadStatus>,
    pub new_status: &'a LeadStatus,
    pub sales_price: Decimal,
    pub products: &'a [Product],
}

// Função pura: decide O QUE disparar sem tocar no banco. A execução cuida do
// resto (e dos erros).
pub(crate) fn plan_cascade(input: &CascadeInput<'_>, rules: &TransitionRules) -> Vec<CascadeStep> {
    let mut steps = Vec::new();

    if input.sales_price > Decimal::ZERO {
        steps.push(CascadeStep::UpsertPayment);
    }

    if input
        .products
        .iter()
        .any(|p| p.vendor_info.as_ref().is_some_and(|v| v.has_identity()))
    {
        steps.push(CascadeStep::UpsertVendorOrders);
    }

    // Dispara só na ENTRADA no conjunto; trocar entre status de follow-up
    // não re-enfileira
    let was_followup = input.old_status.is_some_and(|s| rules.needs_followup(s));
    if rules.needs_followup(input.new_status) && !was_followup {
        steps.push(CascadeStep::CreateFollowup);
    }

    let was_sale = input.old_status == Some(&rules.sale_status);
    if *input.new_status == rules.sale_status && !was_sale {
        steps.push(CascadeStep::CreateSale);
    }

    let was_closed = input.old_status == Some(&rules.closed_status);
    if *input.new_status == rules.closed_status && !was_closed {
        steps.push(CascadeStep::IncrementTargets);
    }

    steps
}

// Identidade estável do cliente para a chave natural dos pedidos: customer_id
// se houver, senão os dígitos do telefone, senão o próprio lead_id
fn resolve_customer_id(lead: &Lead) -> String {
    if let Some(id) = lead.customer_id.as_deref() {
        if !id.trim().is_empty() {
            return id.trim().to_string();
        }
    }
    if let Some(phone) = lead.phone.as_deref() {
        let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
        if !digits.is_empty() {
            return digits;
        }
    }
    lead.lead_id.clone()
}

// =============================================================================
//  O SERVIÇO
// =============================================================================

#[derive(Clone)]
pub struct LeadService {
    pool: PgPool,
    lead_repo: LeadRepository,
    payment_repo: PaymentRepository,
    vendor_order_repo: VendorOrderRepository,
    sales_repo: SalesRepository,
    activity_log: Arc<dyn ActivityLog>,
    rules: TransitionRules,
}

impl LeadService {
    pub fn new(
        pool: PgPool,
        lead_repo: LeadRepository,
        payment_repo: PaymentRepository,
        vendor_order_repo: VendorOrderRepository,
        sales_repo: SalesRepository,
        activity_log: Arc<dyn ActivityLog>,
    ) -> Self {
        Self {
            pool,
            lead_repo,
            payment_repo,
            vendor_order_repo,
            sales_repo,
            activity_log,
            rules: TransitionRules::default(),
        }
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    pub async fn list_leads(
        &self,
        actor: &User,
        params: &LeadListParams,
    ) -> Result<Paginated<Lead>, AppError> {
        let pm = PermissionManager::for_user(actor);
        if !pm.can(Action::Read, Resource::Leads) {
            return Err(AppError::Forbidden);
        }

        let window = DateWindow::resolve(
            params.date_filter_type.as_deref(),
            params.custom_start_date.as_deref(),
            params.custom_end_date.as_deref(),
            params.time_in_hours,
            Utc::now(),
        );

        // O escopo entra como filtro junto com o que o usuário pediu; pedir
        // um agente fora do escopo só produz lista vazia
        let query = LeadQuery {
            agent_scope: pm.data_scope().agent_ids(),
            agents: None,
            search: params.search.clone(),
            status: params.status.clone(),
            agent: params.agent,
            window,
        };

        let page = params.page();
        let limit = params.limit();
        // Página gigantesca satura em vez de estourar a conta do OFFSET
        let offset = page.saturating_sub(1).saturating_mul(limit);

        let records = self.lead_repo.list_leads(&query, limit, offset).await?;
        let total = self.lead_repo.count_leads(&query).await?;

        Ok(Paginated::new(records, page, limit, total))
    }

    pub async fn get_lead(&self, actor: &User, id: Uuid) -> Result<Lead, AppError> {
        let pm = PermissionManager::for_user(actor);
        if !pm.can(Action::Read, Resource::Leads) {
            return Err(AppError::Forbidden);
        }

        let lead = self
            .lead_repo
            .find_by_id(id)
            .await?
            .ok_or(AppError::ResourceNotFound("Lead".to_string()))?;

        if !pm.data_scope().permits(lead.assigned_agent) {
            return Err(AppError::Forbidden);
        }

        Ok(lead)
    }

    // =========================================================================
    //  ESCRITA
    // =========================================================================

    pub async fn create_lead(
        &self,
        actor: &User,
        meta: &RequestMeta,
        mut patch: LeadPatch,
    ) -> Result<(Lead, Vec<String>), AppError> {
        let pm = PermissionManager::for_user(actor);
        if !pm.can(Action::Create, Resource::Leads) {
            return Err(AppError::Forbidden);
        }

        if let Some(products) = patch.products.as_mut() {
            normalize_products(products);
        }

        let lead_id = generate_lead_id();
        let status = patch.status.clone().unwrap_or(LeadStatus::New);
        // Sem agente indicado, o lead nasce com quem o criou
        let assigned_agent = patch.assigned_agent.or(Some(actor.id));

        let first_entry = HistoryEntry {
            action: "created".to_string(),
            changed_fields: vec![],
            changed_by: Some(actor.id),
            changed_at: Utc::now(),
            note: "Lead created".to_string(),
        };

        let created = self
            .lead_repo
            .create_lead(
                &self.pool,
                &lead_id,
                &status,
                assigned_agent,
                &patch,
                actor.id,
                &first_entry,
            )
            .await?;

        let input = CascadeInput {
            old_status: None,
            new_status: &created.status,
            sales_price: created.sales_price,
            products: patch.products.as_deref().unwrap_or(&[]),
        };
        let plan = plan_cascade(&input, &self.rules);
        let (warnings, vendor_ran) = self.execute_cascade(&plan, &created, &patch).await;

        // O upsert de fornecedor pode ter preenchido o order_no do lead
        let lead = if vendor_ran && created.order_no.is_none() {
            self.lead_repo.find_by_id(created.id).await?.unwrap_or(created)
        } else {
            created
        };

        self.activity_log
            .record(self.activity(
                actor,
                meta,
                "create",
                format!("Lead {} criado", lead.lead_id),
                &lead.lead_id,
                None,
            ))
            .await;

        Ok((lead, warnings))
    }

    pub async fn update_lead(
        &self,
        actor: &User,
        meta: &RequestMeta,
        id: Uuid,
        mut patch: LeadPatch,
    ) -> Result<(Lead, Vec<String>), AppError> {
        let pm = PermissionManager::for_user(actor);
        if !pm.can(Action::Update, Resource::Leads) {
            return Err(AppError::Forbidden);
        }

        let existing = self
            .lead_repo
            .find_by_id(id)
            .await?
            .ok_or(AppError::ResourceNotFound("Lead".to_string()))?;

        if !pm.data_scope().permits(existing.assigned_agent) {
            return Err(AppError::Forbidden);
        }

        if let Some(products) = patch.products.as_mut() {
            normalize_products(products);
        }

        let mut merged = existing.clone();
        let mut changed = merged.apply_patch(&patch);

        // order_no circula por fora do merge: só preenche se ainda não há um
        if let Some(order_no) = patch.order_no.as_deref() {
            if existing.order_no.is_none()
                && self.lead_repo.backfill_order_no(&self.pool, id, order_no).await?
            {
                changed.push("orderNo".to_string());
            }
        }

        let note = if changed.iter().any(|f| f == "status") {
            format!("Status changed from {} to {}", existing.status, merged.status)
        } else {
            "Lead updated".to_string()
        };
        let entry = HistoryEntry {
            action: "updated".to_string(),
            changed_fields: changed.clone(),
            changed_by: Some(actor.id),
            changed_at: Utc::now(),
            note,
        };

        let saved = self
            .lead_repo
            .update_lead(&self.pool, &merged, actor.id, &entry)
            .await?;

        let input = CascadeInput {
            old_status: Some(&existing.status),
            new_status: &saved.status,
            sales_price: saved.sales_price,
            products: patch.products.as_deref().unwrap_or(&[]),
        };
        let plan = plan_cascade(&input, &self.rules);
        let (warnings, vendor_ran) = self.execute_cascade(&plan, &saved, &patch).await;

        let lead = if vendor_ran && saved.order_no.is_none() {
            self.lead_repo.find_by_id(saved.id).await?.unwrap_or(saved)
        } else {
            saved
        };

        // O retrato antes/depois vai inteiro para a auditoria: o lead como
        // estava e os campos que vieram no patch
        let mut new_values = serde_json::to_value(&patch).unwrap_or(Value::Null);
        if let Value::Object(fields) = &mut new_values {
            fields.retain(|_, v| !v.is_null());
        }

        self.activity_log
            .record(self.activity(
                actor,
                meta,
                "update",
                format!("Lead {} atualizado", lead.lead_id),
                &lead.lead_id,
                Some(json!({
                    "changedFields": changed,
                    "oldValues": serde_json::to_value(&existing).unwrap_or(Value::Null),
                    "newValues": new_values,
                })),
            ))
            .await;

        Ok((lead, warnings))
    }

    pub async fn add_note(
        &self,
        actor: &User,
        meta: &RequestMeta,
        id: Uuid,
        text: String,
    ) -> Result<Lead, AppError> {
        let pm = PermissionManager::for_user(actor);
        if !pm.can(Action::Update, Resource::Leads) {
            return Err(AppError::Forbidden);
        }

        let existing = self
            .lead_repo
            .find_by_id(id)
            .await?
            .ok_or(AppError::ResourceNotFound("Lead".to_string()))?;

        if !pm.data_scope().permits(existing.assigned_agent) {
            return Err(AppError::Forbidden);
        }

        let note = LeadNote {
            author: Some(actor.id),
            author_name: Some(actor.name.clone()),
            text,
            created_at: Utc::now(),
        };

        let lead = self.lead_repo.append_note(&self.pool, id, &note).await?;

        self.activity_log
            .record(self.activity(
                actor,
                meta,
                "note",
                format!("Nota adicionada ao lead {}", lead.lead_id),
                &lead.lead_id,
                None,
            ))
            .await;

        Ok(lead)
    }

    pub async fn delete_lead(
        &self,
        actor: &User,
        meta: &RequestMeta,
        id: Uuid,
    ) -> Result<(), AppError> {
        let pm = PermissionManager::for_user(actor);
        if !pm.can(Action::Delete, Resource::Leads) {
            return Err(AppError::Forbidden);
        }

        let lead = self
            .lead_repo
            .find_by_id(id)
            .await?
            .ok_or(AppError::ResourceNotFound("Lead".to_string()))?;

        // Satélites ficam: pagamento, follow-ups e vendas são registros do
        // que aconteceu, não espelhos do lead
        self.lead_repo.delete_lead(&self.pool, id).await?;

        self.activity_log
            .record(self.activity(
                actor,
                meta,
                "delete",
                format!("Lead {} removido", lead.lead_id),
                &lead.lead_id,
                None,
            ))
            .await;

        Ok(())
    }

    // =========================================================================
    //  EXECUÇÃO DO CASCADE
    // =========================================================================

    // Cada passo é um statement próprio: falha de satélite vira warning na
    // resposta e o lead já salvo permanece salvo.
    async fn execute_cascade(
        &self,
        plan: &[CascadeStep],
        lead: &Lead,
        patch: &LeadPatch,
    ) -> (Vec<String>, bool) {
        let mut warnings = Vec::new();
        let mut vendor_ran = false;

        for step in plan {
            match step {
                CascadeStep::UpsertPayment => {
                    let payment = PaymentPatch {
                        customer_name: Some(lead.customer_name.clone()),
                        payment_status: patch.payment_status.clone(),
                        mode_of_payment: lead.mode_of_payment.clone(),
                        sales_price: Some(lead.sales_price),
                        cost_price: Some(lead.cost_price),
                        total_margin: Some(lead.total_margin),
                        pending_balance: Some(lead.pending_balance),
                        dispute_reason: lead.dispute_reason.clone(),
                        refund_amount: lead.refund_amount,
                        refund_reason: lead.refund_reason.clone(),
                        assigned_agent: lead.assigned_agent,
                    };
                    if let Err(e) = self
                        .payment_repo
                        .upsert_by_lead(&self.pool, &lead.lead_id, &payment)
                        .await
                    {
                        tracing::warn!(
                            "⚠️ Falha ao sincronizar pagamento do lead {}: {}",
                            lead.lead_id,
                            e
                        );
                        warnings.push("payment record sync failed".to_string());
                    }
                }
                CascadeStep::UpsertVendorOrders => {
                    vendor_ran = true;
                    self.upsert_vendor_orders(lead, patch, &mut warnings).await;
                }
                CascadeStep::CreateFollowup => {
                    if let Err(e) = self
                        .sales_repo
                        .create_followup(
                            &self.pool,
                            &lead.lead_id,
                            lead.lead_number,
                            &lead.customer_name,
                            lead.phone.as_deref(),
                            lead.email.as_deref(),
                            lead.status.as_str(),
                            lead.assigned_agent,
                        )
                        .await
                    {
                        tracing::warn!(
                            "⚠️ Falha ao criar follow-up do lead {}: {}",
                            lead.lead_id,
                            e
                        );
                        warnings.push("followup creation failed".to_string());
                    }
                }
                CascadeStep::CreateSale => {
                    if let Err(e) = self
                        .sales_repo
                        .create_sale(
                            &self.pool,
                            &lead.lead_id,
                            lead.lead_number,
                            &lead.customer_name,
                            lead.sales_price,
                            lead.total_margin,
                            lead.mode_of_payment.as_deref(),
                            lead.assigned_agent,
                        )
                        .await
                    {
                        tracing::warn!(
                            "⚠️ Falha ao registrar venda do lead {}: {}",
                            lead.lead_id,
                            e
                        );
                        warnings.push("sale record creation failed".to_string());
                    }
                }
                CascadeStep::IncrementTargets => {
                    // O que soma na meta é a margem do negócio, não o preço de
                    // venda. Sem agente ou sem margem, não há o que somar.
                    if lead.total_margin.is_zero() {
                        continue;
                    }
                    if let Some(agent) = lead.assigned_agent {
                        match self
                            .sales_repo
                            .increment_active_targets(&self.pool, agent, lead.total_margin, Utc::now())
                            .await
                        {
                            Ok(touched) if touched > 0 => {
                                tracing::info!(
                                    "✅ {} meta(s) atualizada(s) pelo fechamento do lead {}",
                                    touched,
                                    lead.lead_id
                                );
                            }
                            Ok(_) => {}
                            Err(e) => {
                                tracing::warn!(
                                    "⚠️ Falha ao atualizar metas do lead {}: {}",
                                    lead.lead_id,
                                    e
                                );
                                warnings.push("target increment failed".to_string());
                            }
                        }
                    }
                }
            }
        }

        (warnings, vendor_ran)
    }

    async fn upsert_vendor_orders(&self, lead: &Lead, patch: &LeadPatch, warnings: &mut Vec<String>) {
        let customer_id = resolve_customer_id(lead);
        let products = patch.products.as_deref().unwrap_or(&[]);

        for product in products {
            let Some(vendor) = product.vendor_info.as_ref().filter(|v| v.has_identity()) else {
                continue;
            };

            let vendor_patch = VendorOrderPatch {
                lead_id: Some(lead.lead_id.clone()),
                customer_name: Some(lead.customer_name.clone()),
                vendor_name: vendor.vendor_name.clone(),
                vendor_location: vendor.vendor_location.clone(),
                vendor_address: vendor.vendor_address.clone(),
                vendor_phone: vendor.vendor_phone.clone(),
                quantity: product.quantity,
                price: vendor.vendor_price.or(product.cost_price),
                assigned_agent: lead.assigned_agent,
            };

            match self
                .vendor_order_repo
                .upsert_by_customer_product(
                    &self.pool,
                    &customer_id,
                    &product.product_name,
                    &generate_vendor_id(),
                    &generate_order_no(),
                    &vendor_patch,
                )
                .await
            {
                Ok(order) => {
                    // O order_no persistido (novo ou pré-existente) volta para
                    // o lead se ele ainda não tem um; repetir é inócuo
                    if let Err(e) = self
                        .lead_repo
                        .backfill_order_no(&self.pool, lead.id, &order.order_no)
                        .await
                    {
                        tracing::warn!(
                            "⚠️ Falha ao gravar order_no no lead {}: {}",
                            lead.lead_id,
                            e
                        );
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        "⚠️ Falha no pedido de fornecedor de '{}' (lead {}): {}",
                        product.product_name,
                        lead.lead_id,
                        e
                    );
                    warnings.push(format!(
                        "vendor order upsert failed for product {}",
                        product.product_name
                    ));
                }
            }
        }
    }

    fn activity(
        &self,
        actor: &User,
        meta: &RequestMeta,
        action: &str,
        description: String,
        target_id: &str,
        changes: Option<Value>,
    ) -> ActivityRecord {
        ActivityRecord {
            user_id: actor.id,
            user_name: actor.name.clone(),
            user_role: actor.role,
            action: action.to_string(),
            module: "leads".to_string(),
            description,
            target_id: Some(target_id.to_string()),
            target_type: Some("lead".to_string()),
            changes,
            ip_address: meta.ip_address.clone(),
            user_agent: meta.user_agent.clone(),
        }
    }
}

// src/models/lead.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// =============================================================================
//  STATUS DO FUNIL
// =============================================================================

// O banco guarda texto livre (status que o app não conhece continuam passando),
// mas internamente comparamos variantes, não strings soltas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeadStatus {
    New,
    Contacted,
    FollowUp,
    DecisionFollowUp,
    PaymentFollowUp,
    SalePaymentDone,
    SaleClosed,
    NotInterested,
    FakeLead,
    Custom(String),
}

impl LeadStatus {
    // "Desision Follow up" está grafado assim no front e nos dados históricos.
    // Não corrigir: o valor externo é contrato.
    pub fn as_str(&self) -> &str {
        match self {
            LeadStatus::New => "New",
            LeadStatus::Contacted => "Contacted",
            LeadStatus::FollowUp => "Follow up",
            LeadStatus::DecisionFollowUp => "Desision Follow up",
            LeadStatus::PaymentFollowUp => "Payment Follow up",
            LeadStatus::SalePaymentDone => "Sale Payment Done",
            LeadStatus::SaleClosed => "Sale Closed",
            LeadStatus::NotInterested => "Not Interested",
            LeadStatus::FakeLead => "Fake Lead",
            LeadStatus::Custom(s) => s,
        }
    }
}

impl From<String> for LeadStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "New" => LeadStatus::New,
            "Contacted" => LeadStatus::Contacted,
            "Follow up" => LeadStatus::FollowUp,
            "Desision Follow up" => LeadStatus::DecisionFollowUp,
            "Payment Follow up" => LeadStatus::PaymentFollowUp,
            "Sale Payment Done" => LeadStatus::SalePaymentDone,
            "Sale Closed" => LeadStatus::SaleClosed,
            "Not Interested" => LeadStatus::NotInterested,
            "Fake Lead" => LeadStatus::FakeLead,
            _ => LeadStatus::Custom(s),
        }
    }
}

impl std::fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for LeadStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LeadStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(LeadStatus::from(String::deserialize(deserializer)?))
    }
}

// Conjuntos de gatilho do orquestrador. Injetados em vez de globais para que
// os testes possam trocar o funil inteiro.
#[derive(Debug, Clone)]
pub struct TransitionRules {
    pub followup_statuses: Vec<LeadStatus>,
    pub sale_status: LeadStatus,
    pub closed_status: LeadStatus,
}

impl Default for TransitionRules {
    fn default() -> Self {
        Self {
            followup_statuses: vec![
                LeadStatus::FollowUp,
                LeadStatus::DecisionFollowUp,
                LeadStatus::PaymentFollowUp,
            ],
            sale_status: LeadStatus::SalePaymentDone,
            closed_status: LeadStatus::SaleClosed,
        }
    }
}

impl TransitionRules {
    pub fn needs_followup(&self, status: &LeadStatus) -> bool {
        self.followup_statuses.contains(status)
    }
}

// =============================================================================
//  SUB-REGISTROS EMBUTIDOS (JSONB)
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VendorInfo {
    #[schema(example = "AutoParts Hub LLC")]
    pub vendor_name: Option<String>,
    #[schema(example = "Dallas, TX")]
    pub vendor_location: Option<String>,
    pub vendor_address: Option<String>,
    pub vendor_phone: Option<String>,
    #[schema(example = "320.00")]
    pub vendor_price: Option<Decimal>,
}

impl VendorInfo {
    // O bloco só conta como "de verdade" se veio identidade ou localização.
    pub fn has_identity(&self) -> bool {
        self.vendor_name.as_deref().is_some_and(|s| !s.trim().is_empty())
            || self.vendor_location.as_deref().is_some_and(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(default)]
    #[schema(example = "PRD-4F9A2C61B0")]
    pub product_id: Option<String>,
    #[schema(example = "Transmission Assembly 4L60E")]
    pub product_name: String,
    #[serde(default)]
    #[schema(example = 1)]
    pub quantity: Option<i32>,
    #[schema(example = "550.00")]
    pub unit_price: Option<Decimal>,
    #[schema(example = "410.00")]
    pub cost_price: Option<Decimal>,
    pub vendor_info: Option<VendorInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadNote {
    pub author: Option<Uuid>,
    pub author_name: Option<String>,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

// Trilha de auditoria. Só cresce: o UPDATE no repositório usa `history || ...`,
// nunca substitui a coluna.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[schema(example = "updated")]
    pub action: String,
    pub changed_fields: Vec<String>,
    pub changed_by: Option<Uuid>,
    pub changed_at: DateTime<Utc>,
    #[schema(example = "Status changed from New to Follow up")]
    pub note: String,
}

// =============================================================================
//  O LEAD
// =============================================================================

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: Uuid,
    #[schema(example = "LD-9C31B7E2D4")]
    pub lead_id: String,
    #[schema(example = 1042)]
    pub lead_number: i64,

    #[sqlx(try_from = "String")]
    #[schema(value_type = String, example = "Follow up")]
    pub status: LeadStatus,
    pub assigned_agent: Option<Uuid>,

    #[schema(example = "Acme Towing")]
    pub customer_name: String,
    pub customer_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub alternate_phone: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub billing_address: Option<Value>,
    #[schema(value_type = Option<Object>)]
    pub shipping_address: Option<Value>,

    #[sqlx(json)]
    pub products: Vec<Product>,

    #[schema(example = "1500.00")]
    pub sales_price: Decimal,
    pub cost_price: Decimal,
    pub total_margin: Decimal,
    pub pending_balance: Decimal,
    pub mode_of_payment: Option<String>,
    pub dispute_reason: Option<String>,
    pub refund_amount: Option<Decimal>,
    pub refund_reason: Option<String>,

    pub order_no: Option<String>,

    #[sqlx(json)]
    pub notes: Vec<LeadNote>,
    #[sqlx(json)]
    pub history: Vec<HistoryEntry>,

    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// O patch aceito num create/update. Campo que não está aqui não entra no merge,
// venha o que vier no JSON (serde descarta chaves desconhecidas). Serialize
// existe para o retrato de newValues na auditoria.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadPatch {
    #[schema(value_type = Option<String>, example = "Follow up")]
    pub status: Option<LeadStatus>,
    pub assigned_agent: Option<Uuid>,

    #[schema(example = "Acme Towing")]
    pub customer_name: Option<String>,
    pub customer_id: Option<String>,
    #[validate(email(message = "E-mail inválido"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub alternate_phone: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub billing_address: Option<Value>,
    #[schema(value_type = Option<Object>)]
    pub shipping_address: Option<Value>,

    pub products: Option<Vec<Product>>,

    #[schema(example = "1500.00")]
    pub sales_price: Option<Decimal>,
    pub cost_price: Option<Decimal>,
    pub total_margin: Option<Decimal>,
    pub pending_balance: Option<Decimal>,
    pub mode_of_payment: Option<String>,
    pub dispute_reason: Option<String>,
    pub refund_amount: Option<Decimal>,
    pub refund_reason: Option<String>,

    // Repassado ao registro de pagamento no cascade; nunca entra no lead em si
    pub payment_status: Option<String>,

    // Só é aceito enquanto o lead ainda não tem order_no (a primeira escrita
    // vence; o serviço aplica via UPDATE condicional)
    pub order_no: Option<String>,
}

impl Lead {
    // Merge explícito campo a campo. `order_no`, `payment_status`, `notes` e
    // `history` ficam de fora: cada um tem seu próprio caminho de escrita.
    // Retorna os nomes (no formato do wire) dos campos que mudaram de fato.
    pub fn apply_patch(&mut self, patch: &LeadPatch) -> Vec<String> {
        let mut changed: Vec<String> = Vec::new();

        if let Some(status) = &patch.status {
            if self.status != *status {
                self.status = status.clone();
                changed.push("status".into());
            }
        }
        if let Some(agent) = patch.assigned_agent {
            if self.assigned_agent != Some(agent) {
                self.assigned_agent = Some(agent);
                changed.push("assignedAgent".into());
            }
        }
        if let Some(name) = &patch.customer_name {
            if self.customer_name != *name {
                self.customer_name = name.clone();
                changed.push("customerName".into());
            }
        }
        set_opt_text(&mut self.customer_id, &patch.customer_id, "customerId", &mut changed);
        set_opt_text(&mut self.email, &patch.email, "email", &mut changed);
        set_opt_text(&mut self.phone, &patch.phone, "phone", &mut changed);
        set_opt_text(&mut self.alternate_phone, &patch.alternate_phone, "alternatePhone", &mut changed);
        set_opt_text(&mut self.city, &patch.city, "city", &mut changed);
        set_opt_text(&mut self.state, &patch.state, "state", &mut changed);
        set_opt_text(&mut self.country, &patch.country, "country", &mut changed);
        set_opt_json(&mut self.billing_address, &patch.billing_address, "billingAddress", &mut changed);
        set_opt_json(&mut self.shipping_address, &patch.shipping_address, "shippingAddress", &mut changed);

        if let Some(products) = &patch.products {
            if self.products != *products {
                self.products = products.clone();
                changed.push("products".into());
            }
        }

        set_amount(&mut self.sales_price, patch.sales_price, "salesPrice", &mut changed);
        set_amount(&mut self.cost_price, patch.cost_price, "costPrice", &mut changed);
        set_amount(&mut self.total_margin, patch.total_margin, "totalMargin", &mut changed);
        set_amount(&mut self.pending_balance, patch.pending_balance, "pendingBalance", &mut changed);
        set_opt_text(&mut self.mode_of_payment, &patch.mode_of_payment, "modeOfPayment", &mut changed);
        set_opt_text(&mut self.dispute_reason, &patch.dispute_reason, "disputeReason", &mut changed);
        if let Some(amount) = patch.refund_amount {
            if self.refund_amount != Some(amount) {
                self.refund_amount = Some(amount);
                changed.push("refundAmount".into());
            }
        }
        set_opt_text(&mut self.refund_reason, &patch.refund_reason, "refundReason", &mut changed);

        changed
    }
}

fn set_opt_text(field: &mut Option<String>, value: &Option<String>, name: &str, changed: &mut Vec<String>) {
    if let Some(v) = value {
        if field.as_deref() != Some(v.as_str()) {
            *field = Some(v.clone());
            changed.push(name.to_string());
        }
    }
}

fn set_opt_json(field: &mut Option<Value>, value: &Option<Value>, name: &str, changed: &mut Vec<String>) {
    if let Some(v) = value {
        if field.as_ref() != Some(v) {
            *field = Some(v.clone());
            changed.push(name.to_string());
        }
    }
}

fn set_amount(field: &mut Decimal, value: Option<Decimal>, name: &str, changed: &mut Vec<String>) {
    if let Some(v) = value {
        if *field != v {
            *field = v;
            changed.push(name.to_string());
        }
    }
}

// =============================================================================
//  NORMALIZAÇÃO E GERAÇÃO DE IDS
// =============================================================================

pub(crate) fn short_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    hex[..10].to_uppercase()
}

pub fn generate_lead_id() -> String {
    format!("LD-{}", short_id())
}

pub fn generate_product_id() -> String {
    format!("PRD-{}", short_id())
}

// Normaliza a lista de produtos de um patch: id gerado quando falta, quantidade
// mínima 1, vendorInfo sem identidade nem localização é descartado.
pub fn normalize_products(products: &mut [Product]) {
    for product in products.iter_mut() {
        if product.product_id.as_deref().is_none_or(|s| s.trim().is_empty()) {
            product.product_id = Some(generate_product_id());
        }
        if product.quantity.is_none_or(|q| q < 1) {
            product.quantity = Some(1);
        }
        if let Some(vendor) = &product.vendor_info {
            if !vendor.has_identity() {
                product.vendor_info = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str) -> Product {
        Product {
            product_id: None,
            product_name: name.to_string(),
            quantity: None,
            unit_price: None,
            cost_price: None,
            vendor_info: None,
        }
    }

    fn lead_fixture() -> Lead {
        Lead {
            id: Uuid::new_v4(),
            lead_id: "LD-TESTE00001".to_string(),
            lead_number: 1,
            status: LeadStatus::New,
            assigned_agent: None,
            customer_name: "Acme Towing".to_string(),
            customer_id: None,
            email: None,
            phone: None,
            alternate_phone: None,
            city: None,
            state: None,
            country: None,
            billing_address: None,
            shipping_address: None,
            products: vec![],
            sales_price: Decimal::ZERO,
            cost_price: Decimal::ZERO,
            total_margin: Decimal::ZERO,
            pending_balance: Decimal::ZERO,
            mode_of_payment: None,
            dispute_reason: None,
            refund_amount: None,
            refund_reason: None,
            order_no: None,
            notes: vec![],
            history: vec![],
            created_by: None,
            updated_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn status_wire_values_round_trip() {
        let cases = [
            "New",
            "Contacted",
            "Follow up",
            "Desision Follow up",
            "Payment Follow up",
            "Sale Payment Done",
            "Sale Closed",
            "Not Interested",
            "Fake Lead",
        ];
        for wire in cases {
            let status = LeadStatus::from(wire.to_string());
            assert!(!matches!(status, LeadStatus::Custom(_)), "{wire} virou Custom");
            assert_eq!(status.as_str(), wire);
        }
    }

    #[test]
    fn unknown_status_passes_through_unchanged() {
        let status = LeadStatus::from("Warm Prospect".to_string());
        assert_eq!(status, LeadStatus::Custom("Warm Prospect".to_string()));
        assert_eq!(status.as_str(), "Warm Prospect");
    }

    #[test]
    fn normalize_fills_product_id_and_quantity() {
        let mut products = vec![product("Brake Caliper")];
        normalize_products(&mut products);
        let id = products[0].product_id.as_deref().unwrap();
        assert!(id.starts_with("PRD-"));
        assert_eq!(products[0].quantity, Some(1));

        // Id existente não é trocado
        let mut keep = vec![Product {
            product_id: Some("PRD-FIXO".to_string()),
            quantity: Some(3),
            ..product("Alternator")
        }];
        normalize_products(&mut keep);
        assert_eq!(keep[0].product_id.as_deref(), Some("PRD-FIXO"));
        assert_eq!(keep[0].quantity, Some(3));
    }

    #[test]
    fn normalize_drops_vendor_info_without_identity() {
        let mut products = vec![Product {
            vendor_info: Some(VendorInfo {
                vendor_name: Some("   ".to_string()),
                vendor_location: None,
                vendor_address: Some("123 Main St".to_string()),
                vendor_phone: None,
                vendor_price: None,
            }),
            ..product("Radiator")
        }];
        normalize_products(&mut products);
        assert!(products[0].vendor_info.is_none());

        // Só a localização já basta para manter o bloco
        let mut keep = vec![Product {
            vendor_info: Some(VendorInfo {
                vendor_name: None,
                vendor_location: Some("Houston, TX".to_string()),
                vendor_address: None,
                vendor_phone: None,
                vendor_price: None,
            }),
            ..product("Radiator")
        }];
        normalize_products(&mut keep);
        assert!(keep[0].vendor_info.is_some());
    }

    #[test]
    fn apply_patch_only_touches_present_fields() {
        let mut lead = lead_fixture();
        lead.email = Some("old@acme.com".to_string());

        let patch = LeadPatch {
            status: Some(LeadStatus::FollowUp),
            city: Some("Dallas".to_string()),
            sales_price: Some(Decimal::new(150000, 2)),
            ..Default::default()
        };
        let changed = lead.apply_patch(&patch);

        assert_eq!(lead.status, LeadStatus::FollowUp);
        assert_eq!(lead.city.as_deref(), Some("Dallas"));
        assert_eq!(lead.email.as_deref(), Some("old@acme.com"));
        assert_eq!(changed, vec!["status", "city", "salesPrice"]);
    }

    #[test]
    fn apply_patch_skips_identical_values() {
        let mut lead = lead_fixture();
        let patch = LeadPatch {
            status: Some(LeadStatus::New),
            customer_name: Some("Acme Towing".to_string()),
            ..Default::default()
        };
        let changed = lead.apply_patch(&patch);
        assert!(changed.is_empty());
    }

    #[test]
    fn patch_ignores_unknown_wire_fields() {
        let raw = r#"{"status": "Contacted", "superPoderes": true, "history": [{"x": 1}]}"#;
        let patch: LeadPatch = serde_json::from_str(raw).unwrap();
        assert_eq!(patch.status, Some(LeadStatus::Contacted));
        // "history" não existe no patch: não há como o chamador reescrever a trilha
        let mut lead = lead_fixture();
        lead.apply_patch(&patch);
        assert!(lead.history.is_empty());
    }

    #[test]
    fn followup_set_membership() {
        let rules = TransitionRules::default();
        assert!(rules.needs_followup(&LeadStatus::FollowUp));
        assert!(rules.needs_followup(&LeadStatus::DecisionFollowUp));
        assert!(rules.needs_followup(&LeadStatus::PaymentFollowUp));
        assert!(!rules.needs_followup(&LeadStatus::New));
        assert!(!rules.needs_followup(&LeadStatus::SaleClosed));
    }
}

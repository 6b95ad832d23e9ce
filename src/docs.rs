// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Leads ---
        handlers::leads::list_leads,
        handlers::leads::create_lead,
        handlers::leads::get_lead,
        handlers::leads::update_lead,
        handlers::leads::delete_lead,
        handlers::leads::add_note,

        // --- Fulfillment ---
        handlers::fulfillment::list_vendor_orders,
        handlers::fulfillment::update_vendor_order_status,

        // --- Sales ---
        handlers::sales::list_followups,
        handlers::sales::list_sales,
        handlers::sales::create_target,
        handlers::sales::list_targets,

        // --- Analytics ---
        handlers::analytics::analytics_summary,

        // --- Users ---
        handlers::users::list_users,
    ),
    components(
        schemas(

            // --- Leads ---
            models::lead::Lead,
            models::lead::LeadPatch,
            models::lead::Product,
            models::lead::VendorInfo,
            models::lead::LeadNote,
            models::lead::HistoryEntry,
            models::filters::Paginated<models::lead::Lead>,
            handlers::leads::LeadMutationResponse,
            handlers::leads::AddNotePayload,

            // --- Fulfillment ---
            models::vendor_order::VendorOrderStatus,
            models::vendor_order::VendorOrder,
            models::filters::Paginated<models::vendor_order::VendorOrder>,
            handlers::fulfillment::UpdateVendorOrderStatusPayload,

            // --- Sales ---
            models::sales::Followup,
            models::sales::Sale,
            models::sales::Target,
            models::filters::Paginated<models::sales::Followup>,
            models::filters::Paginated<models::sales::Sale>,
            handlers::sales::CreateTargetPayload,

            // --- Analytics ---
            models::analytics::AnalyticsSummary,
            models::analytics::StatusCount,
            models::analytics::MonthlyTrendEntry,
            models::analytics::AgentPerformanceEntry,
            models::analytics::PaymentModeEntry,
            models::analytics::TopStateEntry,

            // --- Users ---
            models::auth::UserRole,
            models::auth::User,
        )
    ),
    tags(
        (name = "Leads", description = "Gestão de Leads e Pipeline de Vendas"),
        (name = "Fulfillment", description = "Pedidos junto a Fornecedores de Autopeças"),
        (name = "Sales", description = "Follow-ups, Vendas Fechadas e Metas"),
        (name = "Analytics", description = "Indicadores Agregados do Funil"),
        (name = "Users", description = "Usuários e Escopo de Atuação")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

// src/config.rs

use std::{env, sync::Arc, time::Duration};

use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::db::{
    AnalyticsRepository, LeadRepository, PaymentRepository, SalesRepository, UserRepository,
    VendorOrderRepository,
};
use crate::services::{
    AnalyticsService, AuthService, FulfillmentService, LeadService, SalesService,
    TracingActivityLog, UserService,
};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub bind_addr: String,
    pub auth_service: AuthService,
    pub lead_service: LeadService,
    pub fulfillment_service: FulfillmentService,
    pub sales_service: SalesService,
    pub analytics_service: AnalyticsService,
    pub user_service: UserService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL deve ser definida");
        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET deve ser definido");
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        let lead_repo = LeadRepository::new(db_pool.clone());
        let payment_repo = PaymentRepository::new(db_pool.clone());
        let vendor_order_repo = VendorOrderRepository::new(db_pool.clone());
        let sales_repo = SalesRepository::new(db_pool.clone());
        let user_repo = UserRepository::new(db_pool.clone());
        let analytics_repo = AnalyticsRepository::new(db_pool.clone());

        let activity_log = Arc::new(TracingActivityLog);

        let auth_service = AuthService::new(user_repo.clone(), jwt_secret);
        let lead_service = LeadService::new(
            db_pool.clone(),
            lead_repo,
            payment_repo,
            vendor_order_repo.clone(),
            sales_repo.clone(),
            activity_log.clone(),
        );
        let fulfillment_service =
            FulfillmentService::new(db_pool.clone(), vendor_order_repo, activity_log.clone());
        let sales_service = SalesService::new(db_pool.clone(), sales_repo, activity_log);
        let analytics_service = AnalyticsService::new(analytics_repo);
        let user_service = UserService::new(user_repo);

        Ok(Self {
            db_pool,
            bind_addr,
            auth_service,
            lead_service,
            fulfillment_service,
            sales_service,
            analytics_service,
            user_service,
        })
    }
}

use std::sync::Arc;

use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Connection, Executor, PgConnection, PgPool};
use url::Url;
use uuid::Uuid;

use autopecas_crm::db::{
    AnalyticsRepository, LeadRepository, PaymentRepository, SalesRepository, UserRepository,
    VendorOrderRepository,
};
use autopecas_crm::middleware::request_meta::RequestMeta;
use autopecas_crm::models::auth::{User, UserRole};
use autopecas_crm::models::lead::LeadPatch;
use autopecas_crm::services::{
    AnalyticsService, AuthService, FulfillmentService, LeadService, SalesService,
    TracingActivityLog, UserService,
};

// Um banco descartável por contexto. Cada teste roda isolado e o banco
// some no cleanup, então os testes podem rodar em paralelo.
pub struct PgTestContext {
    pub pool: PgPool,
    pub auth_service: AuthService,
    pub lead_service: LeadService,
    pub fulfillment_service: FulfillmentService,
    pub sales_service: SalesService,
    pub analytics_service: AnalyticsService,
    pub user_service: UserService,
    pub admin: User,
    pub manager: User,
    pub agent: User,
    // Agente fora do time do manager, para os testes de escopo
    pub outsider: User,
    admin_url: String,
    db_name: String,
}

impl PgTestContext {
    pub async fn new(suite: &str) -> Option<Self> {
        let base = match std::env::var("TEST_DATABASE_URL") {
            Ok(url) => url,
            Err(_) => {
                eprintln!("skipping Postgres {} tests: TEST_DATABASE_URL not set", suite);
                return None;
            }
        };

        let (admin_url, db_name, test_url) = build_urls(&base)?;

        let mut admin_conn = PgConnection::connect(&admin_url).await.ok()?;
        let drop_sql = format!("DROP DATABASE IF EXISTS \"{}\" WITH (FORCE);", db_name);
        let create_sql = format!("CREATE DATABASE \"{}\";", db_name);
        let _ = admin_conn.execute(drop_sql.as_str()).await;
        admin_conn.execute(create_sql.as_str()).await.ok()?;

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&test_url)
            .await
            .ok()?;

        sqlx::migrate!().run(&pool).await.ok()?;

        let agent = seed_user(&pool, "Rafaela Nunes", "rafaela@example.com", UserRole::Agent, &[])
            .await?;
        let outsider =
            seed_user(&pool, "Otávio Lima", "otavio@example.com", UserRole::Agent, &[]).await?;
        let manager = seed_user(
            &pool,
            "Caio Duarte",
            "caio@example.com",
            UserRole::Manager,
            &[agent.id],
        )
        .await?;
        let admin =
            seed_user(&pool, "Helena Prado", "helena@example.com", UserRole::Admin, &[]).await?;

        let lead_repo = LeadRepository::new(pool.clone());
        let payment_repo = PaymentRepository::new(pool.clone());
        let vendor_order_repo = VendorOrderRepository::new(pool.clone());
        let sales_repo = SalesRepository::new(pool.clone());
        let user_repo = UserRepository::new(pool.clone());
        let analytics_repo = AnalyticsRepository::new(pool.clone());

        let activity_log = Arc::new(TracingActivityLog);

        let auth_service = AuthService::new(user_repo.clone(), "segredo-de-teste".to_string());
        let lead_service = LeadService::new(
            pool.clone(),
            lead_repo,
            payment_repo,
            vendor_order_repo.clone(),
            sales_repo.clone(),
            activity_log.clone(),
        );
        let fulfillment_service =
            FulfillmentService::new(pool.clone(), vendor_order_repo, activity_log.clone());
        let sales_service = SalesService::new(pool.clone(), sales_repo, activity_log);
        let analytics_service = AnalyticsService::new(analytics_repo);
        let user_service = UserService::new(user_repo);

        Some(Self {
            pool,
            auth_service,
            lead_service,
            fulfillment_service,
            sales_service,
            analytics_service,
            user_service,
            admin,
            manager,
            agent,
            outsider,
            admin_url,
            db_name,
        })
    }

    pub async fn cleanup(self) {
        let Self {
            pool,
            admin_url,
            db_name,
            ..
        } = self;
        pool.close().await;
        if let Ok(mut admin_conn) = PgConnection::connect(&admin_url).await {
            let drop_sql = format!("DROP DATABASE IF EXISTS \"{}\" WITH (FORCE);", db_name);
            let _ = admin_conn.execute(drop_sql.as_str()).await;
        }
    }
}

async fn seed_user(
    pool: &PgPool,
    name: &str,
    email: &str,
    role: UserRole,
    assigned_agents: &[Uuid],
) -> Option<User> {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, name, email, role, assigned_agents) VALUES ($1, $2, $3, $4, $5)")
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(role)
        .bind(assigned_agents)
        .execute(pool)
        .await
        .ok()?;

    Some(User {
        id,
        name: name.to_string(),
        email: email.to_string(),
        role,
        assigned_agents: assigned_agents.to_vec(),
        is_active: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    })
}

fn build_urls(base: &str) -> Option<(String, String, String)> {
    let url = Url::parse(base).ok()?;
    let db_path = url.path().trim_start_matches('/').to_string();
    let base_name = if db_path.is_empty() {
        "autopecas_crm_test".to_string()
    } else {
        db_path
    };
    let db_name = format!("{}_{}", base_name, Uuid::new_v4().simple());
    let mut admin_url = url.clone();
    admin_url.set_path("/postgres");
    let mut test_url = url.clone();
    test_url.set_path(&format!("/{}", db_name));
    Some((admin_url.to_string(), db_name, test_url.to_string()))
}

// Monta o patch a partir do mesmo JSON camelCase que chega na API
pub fn patch(value: serde_json::Value) -> LeadPatch {
    serde_json::from_value(value).expect("payload de teste inválido")
}

pub fn meta() -> RequestMeta {
    RequestMeta::default()
}

pub mod activity_log;
pub mod analytics_service;
pub mod auth;
pub mod fulfillment_service;
pub mod lead_service;
pub mod permission;
pub mod sales_service;
pub mod user_service;

pub use activity_log::{ActivityLog, TracingActivityLog};
pub use analytics_service::AnalyticsService;
pub use auth::AuthService;
pub use fulfillment_service::FulfillmentService;
pub use lead_service::LeadService;
pub use permission::PermissionManager;
pub use sales_service::SalesService;
pub use user_service::UserService;

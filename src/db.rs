pub mod lead_repo;
pub use lead_repo::LeadRepository;
pub mod payment_repo;
pub use payment_repo::PaymentRepository;
pub mod vendor_order_repo;
pub use vendor_order_repo::VendorOrderRepository;
pub mod sales_repo;
pub use sales_repo::SalesRepository;
pub mod user_repo;
pub use user_repo::UserRepository;
pub mod analytics_repo;
pub use analytics_repo::AnalyticsRepository;

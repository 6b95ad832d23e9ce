pub mod analytics;
pub mod auth;
pub mod filters;
pub mod lead;
pub mod payment;
pub mod sales;
pub mod vendor_order;

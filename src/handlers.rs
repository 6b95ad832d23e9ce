// src/handlers.rs

pub mod analytics;
pub mod fulfillment;
pub mod leads;
pub mod sales;
pub mod users;

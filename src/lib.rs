// src/lib.rs

// Módulos expostos como biblioteca para que os testes de integração
// montem o mesmo grafo que o binário usa.
pub mod common;
pub mod config;
pub mod db;
pub mod docs;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

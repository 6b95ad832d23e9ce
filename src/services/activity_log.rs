// src/services/activity_log.rs

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::models::auth::UserRole;

// Uma entrada de auditoria por mutação. `changes` carrega o resumo do diff
// quando a operação tem um.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    pub user_id: Uuid,
    pub user_name: String,
    pub user_role: UserRole,
    pub action: String,
    pub module: String,
    pub description: String,
    pub target_id: Option<String>,
    pub target_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changes: Option<Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

// Sink de auditoria plugável. Registrar NUNCA derruba a operação que gerou o
// evento: implementações engolem as próprias falhas.
#[async_trait]
pub trait ActivityLog: Send + Sync {
    async fn record(&self, record: ActivityRecord);
}

// Implementação padrão: uma linha JSON por evento no log do processo
pub struct TracingActivityLog;

#[async_trait]
impl ActivityLog for TracingActivityLog {
    async fn record(&self, record: ActivityRecord) {
        match serde_json::to_string(&record) {
            Ok(json) => tracing::info!(target: "activity", "{}", json),
            Err(e) => tracing::warn!("⚠️ Falha ao serializar registro de atividade: {}", e),
        }
    }
}

// src/services/permission.rs

use uuid::Uuid;

use crate::models::auth::{User, UserRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Leads,
    Followups,
    Sales,
    VendorOrders,
    Targets,
    Analytics,
    Users,
}

// Quem o usuário enxerga nas listagens e agregações. As queries recebem isso
// como filtro obrigatório, antes de qualquer filtro pedido pelo usuário.
#[derive(Debug, Clone, PartialEq)]
pub enum DataScope {
    Unrestricted,
    Agents(Vec<Uuid>),
}

impl DataScope {
    pub fn agent_ids(&self) -> Option<Vec<Uuid>> {
        match self {
            DataScope::Unrestricted => None,
            DataScope::Agents(ids) => Some(ids.clone()),
        }
    }

    // Autorização pontual sobre um registro. Registro sem agente atribuído só
    // aparece para quem não tem restrição de escopo.
    pub fn permits(&self, agent: Option<Uuid>) -> bool {
        match self {
            DataScope::Unrestricted => true,
            DataScope::Agents(ids) => agent.is_some_and(|a| ids.contains(&a)),
        }
    }
}

// Tabela de capacidades derivada do papel. Montada por request a partir do
// usuário já autenticado; não toca no banco.
#[derive(Debug, Clone)]
pub struct PermissionManager {
    user_id: Uuid,
    role: UserRole,
    assigned_agents: Vec<Uuid>,
}

impl PermissionManager {
    pub fn for_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            role: user.role,
            assigned_agents: user.assigned_agents.clone(),
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn can(&self, action: Action, resource: Resource) -> bool {
        match (self.role, resource) {
            (UserRole::Admin, _) => true,

            // Manager gerencia a carteira dos seus agentes, mas não apaga
            // nada nem administra usuários
            (UserRole::Manager, Resource::Users) => action == Action::Read,
            (UserRole::Manager, Resource::Analytics) => action == Action::Read,
            (UserRole::Manager, Resource::Targets) => {
                matches!(action, Action::Read | Action::Create)
            }
            (UserRole::Manager, _) => action != Action::Delete,

            (UserRole::Agent, Resource::Leads) => action != Action::Delete,
            (
                UserRole::Agent,
                Resource::Followups | Resource::Sales | Resource::Targets | Resource::Analytics,
            ) => action == Action::Read,
            (UserRole::Agent, Resource::VendorOrders | Resource::Users) => false,
        }
    }

    pub fn data_scope(&self) -> DataScope {
        match self.role {
            UserRole::Admin => DataScope::Unrestricted,
            UserRole::Manager => {
                // O manager enxerga a si mesmo mais os agentes da carteira
                let mut ids = self.assigned_agents.clone();
                if !ids.contains(&self.user_id) {
                    ids.push(self.user_id);
                }
                DataScope::Agents(ids)
            }
            UserRole::Agent => DataScope::Agents(vec![self.user_id]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(role: UserRole, assigned: Vec<Uuid>) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Teste".to_string(),
            email: "teste@exemplo.com".to_string(),
            role,
            assigned_agents: assigned,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn admin_can_everything() {
        let pm = PermissionManager::for_user(&user(UserRole::Admin, vec![]));
        assert!(pm.can(Action::Delete, Resource::Leads));
        assert!(pm.can(Action::Create, Resource::Targets));
        assert!(pm.can(Action::Read, Resource::Users));
        assert_eq!(pm.data_scope(), DataScope::Unrestricted);
    }

    #[test]
    fn manager_cannot_delete_but_sees_team() {
        let agent_a = Uuid::new_v4();
        let agent_b = Uuid::new_v4();
        let manager = user(UserRole::Manager, vec![agent_a, agent_b]);
        let pm = PermissionManager::for_user(&manager);

        assert!(pm.can(Action::Update, Resource::Leads));
        assert!(!pm.can(Action::Delete, Resource::Leads));
        assert!(pm.can(Action::Create, Resource::Targets));
        assert!(!pm.can(Action::Update, Resource::Users));
        assert!(pm.can(Action::Read, Resource::VendorOrders));

        let scope = pm.data_scope();
        assert!(scope.permits(Some(agent_a)));
        assert!(scope.permits(Some(manager.id)));
        assert!(!scope.permits(Some(Uuid::new_v4())));
        assert!(!scope.permits(None));
    }

    #[test]
    fn agent_sees_only_own_records() {
        let agent = user(UserRole::Agent, vec![]);
        let pm = PermissionManager::for_user(&agent);

        assert!(pm.can(Action::Create, Resource::Leads));
        assert!(!pm.can(Action::Delete, Resource::Leads));
        assert!(!pm.can(Action::Read, Resource::VendorOrders));
        assert!(!pm.can(Action::Read, Resource::Users));
        assert!(!pm.can(Action::Create, Resource::Targets));
        assert!(pm.can(Action::Read, Resource::Analytics));

        assert_eq!(pm.data_scope(), DataScope::Agents(vec![agent.id]));
        assert_eq!(pm.data_scope().agent_ids(), Some(vec![agent.id]));
    }
}

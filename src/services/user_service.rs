// src/services/user_service.rs

use crate::{
    common::error::AppError,
    db::UserRepository,
    models::auth::User,
    services::permission::{Action, PermissionManager, Resource},
};

#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
}

impl UserService {
    pub fn new(user_repo: UserRepository) -> Self {
        Self { user_repo }
    }

    pub async fn list_users(&self, actor: &User) -> Result<Vec<User>, AppError> {
        let pm = PermissionManager::for_user(actor);
        if !pm.can(Action::Read, Resource::Users) {
            return Err(AppError::Forbidden);
        }

        let scope = pm.data_scope().agent_ids();
        self.user_repo.list_users(scope.as_deref()).await
    }
}

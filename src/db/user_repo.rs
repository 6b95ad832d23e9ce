// src/db/user_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, models::auth::User};

// O repositório de usuários, responsável por todas as interações com a tabela 'users'
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Usado na verificação do token: usuário desativado é tratado como
    // inexistente e o token dele para de valer na hora
    pub async fn find_active_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let maybe_user =
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND is_active = TRUE")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(maybe_user)
    }

    // Admin vê todo mundo (scope = None); manager só vê a si e aos seus agentes
    pub async fn list_users(&self, scope: Option<&[Uuid]>) -> Result<Vec<User>, AppError> {
        let users = match scope {
            Some(ids) => {
                sqlx::query_as::<_, User>(
                    "SELECT * FROM users WHERE is_active = TRUE AND id = ANY($1) ORDER BY name ASC",
                )
                .bind(ids.to_vec())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, User>("SELECT * FROM users WHERE is_active = TRUE ORDER BY name ASC")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(users)
    }
}

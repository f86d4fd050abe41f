use async_trait::async_trait;
use sqlx::PgPool;

use super::UserRepository;
use crate::database::models::UserRecord;
use crate::error::GatewayResult;

/// 用户存储库 Postgres 实现
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, user_id: &str) -> GatewayResult<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT
                id::text AS id,
                email,
                username,
                role::text AS role,
                is_active,
                is_banned,
                deleted_at
            FROM users
            WHERE id::text = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}

// User directory lookup against the org/user subsystem

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use leadhub_shared::OrgUser;

use crate::automation::store::StoreResult;

/// Directory of organization members, consumed by round-robin assignment
/// and assigned-user phone resolution.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Active members of the org in a stable order. Rotation fairness
    /// depends on that order staying consistent between calls.
    async fn list_org_users(&self, org_id: Uuid) -> StoreResult<Vec<OrgUser>>;

    async fn get_user(&self, org_id: Uuid, user_id: Uuid) -> StoreResult<Option<OrgUser>>;
}

pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn list_org_users(&self, org_id: Uuid) -> StoreResult<Vec<OrgUser>> {
        let users = sqlx::query_as::<_, OrgUser>(
            r#"
            SELECT id, name, email, phone
            FROM users
            WHERE org_id = $1 AND is_active = true
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(org_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn get_user(&self, org_id: Uuid, user_id: Uuid) -> StoreResult<Option<OrgUser>> {
        let user = sqlx::query_as::<_, OrgUser>(
            "SELECT id, name, email, phone FROM users WHERE id = $1 AND org_id = $2",
        )
        .bind(user_id)
        .bind(org_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}

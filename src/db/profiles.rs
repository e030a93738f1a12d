//! Database operations for user profiles.

use async_trait::async_trait;
use sea_orm::prelude::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, NotSet, QueryFilter, QueryOrder, QuerySelect,
    Set, SqlErr,
};

use crate::entity::user_profile;
use crate::error::{AppError, AppResult};
use crate::models::{NewProfile, Role, UserProfile};
use crate::services::profile_store::{MAX_LIST_LIMIT, ProfileStore};

use super::DbPool;

/// PostgreSQL-backed profile store.
#[derive(Clone)]
pub struct PgProfileStore {
    pool: DbPool,
}

impl PgProfileStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn get(&self, uid: &str) -> AppResult<Option<UserProfile>> {
        find_by_uid(self.pool.connection(), uid).await
    }

    async fn create(&self, profile: NewProfile) -> AppResult<()> {
        insert(self.pool.connection(), profile).await
    }

    async fn update_role(&self, uid: &str, role: Role) -> AppResult<UserProfile> {
        update_role(self.pool.connection(), uid, role).await
    }

    async fn list(&self, limit: u64) -> AppResult<Vec<UserProfile>> {
        list_recent(self.pool.connection(), limit).await
    }

    async fn ping(&self) -> AppResult<()> {
        self.pool.connection().ping().await?;
        Ok(())
    }
}

/// Find a profile by uid.
pub async fn find_by_uid(db: &DatabaseConnection, uid: &str) -> AppResult<Option<UserProfile>> {
    let result = user_profile::Entity::find_by_id(uid.to_string())
        .one(db)
        .await?;

    Ok(result.map(model_to_profile))
}

/// Insert a new profile. The primary key makes a second insert for the same uid fail.
///
/// Timestamps come from the column defaults so every instance shares the database clock.
pub async fn insert(db: &DatabaseConnection, profile: NewProfile) -> AppResult<()> {
    let uid = profile.uid.clone();

    let model = user_profile::ActiveModel {
        uid: Set(profile.uid),
        email: Set(profile.email),
        display_name: Set(profile.display_name),
        photo_url: Set(profile.photo_url),
        phone_number: Set(profile.phone_number),
        role: Set(profile.role.as_str().to_string()),
        created_at: NotSet,
        updated_at: NotSet,
    };

    match user_profile::Entity::insert(model).exec(db).await {
        Ok(_) => Ok(()),
        Err(err) => match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => Err(AppError::Conflict(format!(
                "Profile {} already exists",
                uid
            ))),
            _ => Err(err.into()),
        },
    }
}

/// Update role and updated_at only.
pub async fn update_role(db: &DatabaseConnection, uid: &str, role: Role) -> AppResult<UserProfile> {
    let result = user_profile::Entity::update_many()
        .col_expr(user_profile::Column::Role, Expr::value(role.as_str()))
        .col_expr(user_profile::Column::UpdatedAt, Expr::current_timestamp())
        .filter(user_profile::Column::Uid.eq(uid))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound(format!("Profile {}", uid)));
    }

    find_by_uid(db, uid)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {}", uid)))
}

/// Newest profiles first.
pub async fn list_recent(db: &DatabaseConnection, limit: u64) -> AppResult<Vec<UserProfile>> {
    let models = user_profile::Entity::find()
        .order_by_desc(user_profile::Column::CreatedAt)
        .order_by_asc(user_profile::Column::Uid)
        .limit(std::cmp::Ord::min(limit, MAX_LIST_LIMIT))
        .all(db)
        .await?;

    Ok(models.into_iter().map(model_to_profile).collect())
}

fn model_to_profile(m: user_profile::Model) -> UserProfile {
    UserProfile {
        uid: m.uid,
        email: m.email,
        display_name: m.display_name,
        photo_url: m.photo_url,
        phone_number: m.phone_number,
        role: Role::coerce(&m.role),
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}

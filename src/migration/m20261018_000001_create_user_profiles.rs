//! Migration: Create user_profiles table.
//!
//! Stores one profile per authenticated identity with its role.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE TABLE user_profiles (
                    uid VARCHAR(128) PRIMARY KEY,
                    email VARCHAR(320),
                    display_name VARCHAR(255),
                    photo_url VARCHAR(2048),
                    phone_number VARCHAR(32),
                    role VARCHAR(20) NOT NULL DEFAULT 'user'
                        CHECK (role IN ('user', 'admin', 'moderator')),

                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                CREATE INDEX idx_user_profiles_created_at
                    ON user_profiles(created_at DESC);

                CREATE INDEX idx_user_profiles_role
                    ON user_profiles(role);
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS user_profiles CASCADE;")
            .await?;

        Ok(())
    }
}

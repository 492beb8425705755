use anyhow::Result;
use sqlx::Row;
use uuid::Uuid;

use super::Database;
use crate::models::{CreateUser, User};

const USER_COLUMNS: &str =
    "id, username, email, mobile_number, password_hash, full_name, is_active, created_at, updated_at";

fn user_from_row(row: &sqlx::postgres::PgRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        mobile_number: row.get("mobile_number"),
        password_hash: row.get("password_hash"),
        full_name: row.get("full_name"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl Database {
    pub async fn create_user(&self, user: CreateUser) -> Result<User> {
        let password_hash = bcrypt::hash(&user.password, 12)?;

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO users (username, email, mobile_number, password_hash, full_name)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.mobile_number)
        .bind(&password_hash)
        .bind(&user.full_name)
        .fetch_one(&self.pool)
        .await?;

        Ok(user_from_row(&row))
    }

    pub async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Look up a user by username, email address, or mobile number.
    pub async fn get_user_by_identifier(&self, identifier: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE username = $1 OR email = $1 OR mobile_number = $1
            "#
        ))
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    pub async fn identity_exists(
        &self,
        username: &str,
        email: &str,
        mobile_number: Option<&str>,
    ) -> Result<bool> {
        let row = sqlx::query(
            r#"
            SELECT id FROM users
            WHERE username = $1 OR email = $2 OR ($3::VARCHAR IS NOT NULL AND mobile_number = $3)
            LIMIT 1
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(mobile_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }
}

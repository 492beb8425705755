use anyhow::Result;
use tracing::info;

use crate::db::Database;
use crate::models::CreateUser;

pub async fn seed_admin_user(db: &Database) -> Result<()> {
    let admin_username = "admin";
    let admin_email = "admin@hemoscan.local";
    let admin_password = "hemoscan2024";

    match db.get_user_by_username(admin_username).await {
        Ok(Some(_)) => {
            info!("Admin user already exists");
            return Ok(());
        }
        Ok(None) => {}
        Err(e) => {
            info!("Error checking for admin user: {}", e);
        }
    }

    let create_user = CreateUser {
        username: admin_username.to_string(),
        email: admin_email.to_string(),
        password: admin_password.to_string(),
        full_name: "Administrator".to_string(),
        mobile_number: None,
    };

    match db.create_user(create_user).await {
        Ok(user) => {
            info!("Admin user created (id {})", user.id);
            info!("Username: {} / Password: {}", admin_username, admin_password);
        }
        Err(e) => {
            info!("Failed to create admin user: {}", e);
        }
    }

    Ok(())
}

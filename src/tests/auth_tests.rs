use chrono::Utc;
use uuid::Uuid;

use crate::auth::{create_jwt, verify_jwt};
use crate::models::User;

fn test_user() -> User {
    User {
        id: Uuid::new_v4(),
        username: "alice".to_string(),
        email: "alice@example.com".to_string(),
        mobile_number: Some("+15551234567".to_string()),
        password_hash: "not-a-real-hash".to_string(),
        full_name: "Alice Example".to_string(),
        is_active: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[test]
fn test_jwt_roundtrip() {
    let user = test_user();
    let secret = "test-secret";

    let token = create_jwt(&user, secret).unwrap();
    let claims = verify_jwt(&token, secret).unwrap();

    assert_eq!(claims.sub, user.id);
    assert_eq!(claims.username, user.username);
}

#[test]
fn test_jwt_rejects_wrong_secret() {
    let user = test_user();
    let token = create_jwt(&user, "correct-secret").unwrap();

    assert!(verify_jwt(&token, "wrong-secret").is_err());
}

#[test]
fn test_jwt_rejects_garbage_token() {
    assert!(verify_jwt("not.a.token", "secret").is_err());
}

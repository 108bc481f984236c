mod common;

use account_service::domain::account::models::Role;
use account_service::domain::account::ports::AccountRepository;
use account_service::domain::account::tokens;
use chrono::Duration;
use chrono::Utc;
use common::TestApp;
use reqwest::StatusCode;
use serde_json::json;

/// Login attempt with an explicit client address, so tests can steer the
/// rate limiter key independently of the account under attack.
async fn login_from(
    app: &TestApp,
    email: &str,
    password: &str,
    client: &str,
) -> reqwest::Response {
    app.post("/api/auth/login")
        .header("X-Forwarded-For", client)
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to execute request")
}

#[tokio::test]
async fn test_register_success() {
    let app = TestApp::spawn().await;

    let response = app
        .post("/api/auth/register")
        .json(&json!({
            "name": "Alice",
            "email": "alice@example.com",
            "password": "CorrectHorse1"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::CREATED);

    let cookie = response
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .expect("Missing session cookie")
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("coursehub_session="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(cookie.contains("Max-Age=604800"));

    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert!(body["data"]["token"].is_string());
    assert_eq!(body["data"]["user"]["name"], "Alice");
    assert_eq!(body["data"]["user"]["email"], "alice@example.com");
    assert_eq!(body["data"]["user"]["role"], "standard");
    assert_eq!(body["data"]["user"]["email_verified"], false);
    assert!(body["data"]["user"]["id"].is_string());
}

#[tokio::test]
async fn test_register_never_returns_credential_material() {
    let app = TestApp::spawn().await;

    let response = app
        .post("/api/auth/register")
        .json(&json!({
            "name": "Alice",
            "email": "alice@example.com",
            "password": "CorrectHorse1"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert!(body["data"]["user"].get("secret_hash").is_none());
    assert!(body["data"]["user"].get("reset_token_hash").is_none());
    assert!(body["data"]["user"].get("verify_token_hash").is_none());
}

#[tokio::test]
async fn test_register_duplicate_email() {
    let app = TestApp::spawn().await;
    app.register_account("Alice", "alice@example.com", "CorrectHorse1")
        .await;

    // Same address in different casing still collides.
    let response = app
        .post("/api/auth/register")
        .json(&json!({
            "name": "Impostor",
            "email": "Alice@Example.com",
            "password": "OtherPassword2"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert!(body["data"]["message"]
        .as_str()
        .unwrap()
        .contains("already registered"));
}

#[tokio::test]
async fn test_register_rejects_common_password() {
    let app = TestApp::spawn().await;

    let response = app
        .post("/api/auth/register")
        .json(&json!({
            "name": "Alice",
            "email": "alice@example.com",
            "password": "password"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert!(body["data"]["message"]
        .as_str()
        .unwrap()
        .contains("too common"));
}

#[tokio::test]
async fn test_register_rejects_invalid_email() {
    let app = TestApp::spawn().await;

    let response = app
        .post("/api/auth/register")
        .json(&json!({
            "name": "Alice",
            "email": "not-an-email",
            "password": "CorrectHorse1"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_sends_verification_mail() {
    let app = TestApp::spawn().await;
    app.register_account("Alice", "alice@example.com", "CorrectHorse1")
        .await;

    let token = app
        .mailer
        .latest_verification_token("alice@example.com")
        .expect("No verification mail recorded");
    assert_eq!(token.len(), 64);
}

#[tokio::test]
async fn test_login_success_sets_cookie() {
    let app = TestApp::spawn().await;
    app.seed_account("Alice", "alice@example.com", "CorrectHorse1", |_| {})
        .await;

    let response = app
        .post("/api/auth/login")
        .json(&json!({ "email": "alice@example.com", "password": "CorrectHorse1" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .expect("Missing session cookie")
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("coursehub_session="));

    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert!(body["data"]["token"].is_string());
    assert_eq!(body["data"]["user"]["email"], "alice@example.com");
}

#[tokio::test]
async fn test_login_normalizes_email_case() {
    let app = TestApp::spawn().await;
    app.seed_account("Alice", "alice@example.com", "CorrectHorse1", |_| {})
        .await;

    let response = login_from(&app, "  ALICE@example.COM ", "CorrectHorse1", "203.0.113.1").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_email_and_wrong_password_are_indistinguishable() {
    let app = TestApp::spawn().await;
    app.seed_account("Alice", "alice@example.com", "CorrectHorse1", |_| {})
        .await;

    let unknown = login_from(&app, "nobody@example.com", "CorrectHorse1", "203.0.113.1").await;
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    let unknown_body: serde_json::Value = unknown.json().await.expect("Failed to parse response");

    let wrong = login_from(&app, "alice@example.com", "WrongPassword9", "203.0.113.2").await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    let wrong_body: serde_json::Value = wrong.json().await.expect("Failed to parse response");

    assert_eq!(unknown_body, wrong_body);
    assert_eq!(unknown_body["data"]["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn test_login_locks_account_after_five_failures() {
    let app = TestApp::spawn().await;
    app.seed_account("Alice", "alice@example.com", "CorrectHorse1", |_| {})
        .await;

    // Distinct client addresses keep the login rate limiter out of the way;
    // the lockout counter tracks the account, not the client.
    for attempt in 1..=4 {
        let client = format!("203.0.113.{}", attempt);
        let response = login_from(&app, "alice@example.com", "WrongPassword9", &client).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let fifth = login_from(&app, "alice@example.com", "WrongPassword9", "203.0.113.5").await;
    assert_eq!(fifth.status(), StatusCode::LOCKED);
    let body: serde_json::Value = fifth.json().await.expect("Failed to parse response");
    assert_eq!(body["data"]["code"], "ACCOUNT_LOCKED");
    assert!(body["data"]["message"]
        .as_str()
        .unwrap()
        .contains("15 minute"));

    // The correct password makes no difference while the lock holds.
    let correct = login_from(&app, "alice@example.com", "CorrectHorse1", "203.0.113.6").await;
    assert_eq!(correct.status(), StatusCode::LOCKED);
}

#[tokio::test]
async fn test_login_success_resets_failure_counter() {
    let app = TestApp::spawn().await;
    app.seed_account("Alice", "alice@example.com", "CorrectHorse1", |_| {})
        .await;

    for attempt in 1..=4 {
        let client = format!("203.0.113.{}", attempt);
        login_from(&app, "alice@example.com", "WrongPassword9", &client).await;
    }

    let success = login_from(&app, "alice@example.com", "CorrectHorse1", "203.0.113.5").await;
    assert_eq!(success.status(), StatusCode::OK);

    // A full set of four failures fits again without tripping the lock.
    for attempt in 6..=9 {
        let client = format!("203.0.113.{}", attempt);
        let response = login_from(&app, "alice@example.com", "WrongPassword9", &client).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn test_expired_lock_restarts_the_window() {
    let app = TestApp::spawn().await;
    app.seed_account("Alice", "alice@example.com", "CorrectHorse1", |account| {
        account.login_attempts = 5;
        account.lock_until = Some(Utc::now() - Duration::minutes(1));
    })
    .await;

    // First failure after expiry counts as one, not six.
    let response = login_from(&app, "alice@example.com", "WrongPassword9", "203.0.113.1").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["data"]["code"], "INVALID_CREDENTIALS");

    let correct = login_from(&app, "alice@example.com", "CorrectHorse1", "203.0.113.2").await;
    assert_eq!(correct.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_rejects_deactivated_account() {
    let app = TestApp::spawn().await;
    app.seed_account("Alice", "alice@example.com", "CorrectHorse1", |account| {
        account.is_active = false;
    })
    .await;

    let response = login_from(&app, "alice@example.com", "CorrectHorse1", "203.0.113.1").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["data"]["code"], "ACCOUNT_DEACTIVATED");
}

#[tokio::test]
async fn test_active_lock_reports_remaining_minutes() {
    let app = TestApp::spawn().await;
    app.seed_account("Alice", "alice@example.com", "CorrectHorse1", |account| {
        account.login_attempts = 5;
        account.lock_until = Some(Utc::now() + Duration::minutes(10));
    })
    .await;

    let response = login_from(&app, "alice@example.com", "CorrectHorse1", "203.0.113.1").await;
    assert_eq!(response.status(), StatusCode::LOCKED);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert!(body["data"]["message"]
        .as_str()
        .unwrap()
        .contains("10 minute"));
}

#[tokio::test]
async fn test_me_requires_token() {
    let app = TestApp::spawn().await;

    let response = app
        .get("/api/auth/me")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["data"]["code"], "NO_TOKEN");
}

#[tokio::test]
async fn test_me_rejects_garbage_token() {
    let app = TestApp::spawn().await;

    let response = app
        .get_authenticated("/api/auth/me", "not.a.token")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["data"]["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_me_rejects_expired_token() {
    let app = TestApp::spawn().await;
    let account = app
        .seed_account("Alice", "alice@example.com", "CorrectHorse1", |_| {})
        .await;

    let response = app
        .get_authenticated("/api/auth/me", &app.expired_token(&account))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["data"]["code"], "TOKEN_EXPIRED");
}

#[tokio::test]
async fn test_me_after_account_removed() {
    let app = TestApp::spawn().await;
    let account = app
        .seed_account("Alice", "alice@example.com", "CorrectHorse1", |_| {})
        .await;
    let token = app.login_account("alice@example.com", "CorrectHorse1").await;

    app.repository.remove(&account.id);

    let response = app
        .get_authenticated("/api/auth/me", &token)
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["data"]["code"], "USER_NOT_FOUND");
}

#[tokio::test]
async fn test_me_after_deactivation() {
    let app = TestApp::spawn().await;
    let account = app
        .seed_account("Alice", "alice@example.com", "CorrectHorse1", |_| {})
        .await;
    let token = app.login_account("alice@example.com", "CorrectHorse1").await;

    // A valid token stops working the moment the account is deactivated.
    app.repository
        .set_active(&account.id, false)
        .await
        .expect("Failed to deactivate");

    let response = app
        .get_authenticated("/api/auth/me", &token)
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["data"]["code"], "ACCOUNT_DEACTIVATED");
}

#[tokio::test]
async fn test_me_returns_safe_projection() {
    let app = TestApp::spawn().await;
    let token = app
        .register_account("Alice", "alice@example.com", "CorrectHorse1")
        .await;

    let response = app
        .get_authenticated("/api/auth/me", &token)
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["data"]["user"]["email"], "alice@example.com");
    assert_eq!(body["data"]["user"]["role"], "standard");
    assert!(body["data"]["user"]["trial_start_date"].is_string());
    assert!(body["data"]["user"].get("secret_hash").is_none());
    assert!(body["data"]["user"].get("login_attempts").is_none());
}

#[tokio::test]
async fn test_me_accepts_session_cookie() {
    let app = TestApp::spawn().await;
    app.register_account("Alice", "alice@example.com", "CorrectHorse1")
        .await;

    // No bearer header; the cookie captured at registration authenticates.
    let response = app
        .get("/api/auth/me")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["data"]["user"]["email"], "alice@example.com");
}

#[tokio::test]
async fn test_bearer_token_takes_precedence_over_cookie() {
    let app = TestApp::spawn().await;
    app.register_account("Alice", "alice@example.com", "CorrectHorse1")
        .await;

    // The cookie jar holds a valid session, but the explicit bearer header
    // is the one that gets verified.
    let response = app
        .get_authenticated("/api/auth/me", "not.a.token")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["data"]["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let app = TestApp::spawn().await;
    app.register_account("Alice", "alice@example.com", "CorrectHorse1")
        .await;

    let response = app
        .post("/api/auth/logout")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .expect("Missing clearing cookie")
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("coursehub_session=;"));
    assert!(cookie.contains("Max-Age=10"));

    // The emptied cookie no longer authenticates.
    let me = app
        .get("/api/auth/me")
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(me.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = me.json().await.expect("Failed to parse response");
    assert_eq!(body["data"]["code"], "NO_TOKEN");
}

#[tokio::test]
async fn test_update_password_rejects_wrong_current_password() {
    let app = TestApp::spawn().await;
    let token = app
        .register_account("Alice", "alice@example.com", "CorrectHorse1")
        .await;

    let response = app
        .put_authenticated("/api/auth/password", &token)
        .json(&json!({
            "current_password": "WrongPassword9",
            "new_password": "FreshPassword2"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert!(body["data"]["message"]
        .as_str()
        .unwrap()
        .contains("Current password is incorrect"));
}

#[tokio::test]
async fn test_update_password_rejects_reuse() {
    let app = TestApp::spawn().await;
    let token = app
        .register_account("Alice", "alice@example.com", "CorrectHorse1")
        .await;

    let response = app
        .put_authenticated("/api/auth/password", &token)
        .json(&json!({
            "current_password": "CorrectHorse1",
            "new_password": "CorrectHorse1"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert!(body["data"]["message"]
        .as_str()
        .unwrap()
        .contains("must be different"));
}

#[tokio::test]
async fn test_update_password_rotates_credentials() {
    let app = TestApp::spawn().await;
    let token = app
        .register_account("Alice", "alice@example.com", "CorrectHorse1")
        .await;

    let response = app
        .put_authenticated("/api/auth/password", &token)
        .json(&json!({
            "current_password": "CorrectHorse1",
            "new_password": "FreshPassword2"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert!(body["data"]["token"].is_string());

    let old = login_from(&app, "alice@example.com", "CorrectHorse1", "203.0.113.1").await;
    assert_eq!(old.status(), StatusCode::UNAUTHORIZED);

    let new = login_from(&app, "alice@example.com", "FreshPassword2", "203.0.113.2").await;
    assert_eq!(new.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_subscription_status_during_trial() {
    let app = TestApp::spawn().await;
    let token = app
        .register_account("Alice", "alice@example.com", "CorrectHorse1")
        .await;

    let response = app
        .get_authenticated("/api/auth/subscription", &token)
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["data"]["has_access"], true);
    assert_eq!(body["data"]["is_subscribed"], false);
    assert_eq!(body["data"]["trial_active"], true);
    assert_eq!(body["data"]["trial_days_left"], 7);
}

#[tokio::test]
async fn test_subscription_status_after_trial_expires() {
    let app = TestApp::spawn().await;
    app.seed_account("Alice", "alice@example.com", "CorrectHorse1", |account| {
        account.trial_start_date = Utc::now() - Duration::days(8);
    })
    .await;
    let token = app.login_account("alice@example.com", "CorrectHorse1").await;

    let response = app
        .get_authenticated("/api/auth/subscription", &token)
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["data"]["has_access"], false);
    assert_eq!(body["data"]["trial_active"], false);
    assert_eq!(body["data"]["trial_days_left"], 0);
}

#[tokio::test]
async fn test_subscription_status_for_subscriber() {
    let app = TestApp::spawn().await;
    let account = app
        .seed_account("Alice", "alice@example.com", "CorrectHorse1", |account| {
            account.trial_start_date = Utc::now() - Duration::days(30);
        })
        .await;

    // The checkout collaborator flips the flag through the repository.
    app.repository
        .set_subscription(&account.id, true, Some(Utc::now()), None)
        .await
        .expect("Failed to set subscription");

    let token = app.login_account("alice@example.com", "CorrectHorse1").await;
    let response = app
        .get_authenticated("/api/auth/subscription", &token)
        .send()
        .await
        .expect("Failed to execute request");

    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["data"]["has_access"], true);
    assert_eq!(body["data"]["is_subscribed"], true);
    assert_eq!(body["data"]["trial_active"], false);
}

#[tokio::test]
async fn test_subscription_gate_blocks_expired_trial() {
    let app = TestApp::spawn().await;
    app.seed_account("Alice", "alice@example.com", "CorrectHorse1", |account| {
        account.trial_start_date = Utc::now() - Duration::days(8);
    })
    .await;
    let token = app.login_account("alice@example.com", "CorrectHorse1").await;

    let response = app
        .get_authenticated("/api/content/sample", &token)
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["data"]["code"], "SUBSCRIPTION_REQUIRED");
}

#[tokio::test]
async fn test_subscription_gate_admits_active_trial() {
    let app = TestApp::spawn().await;
    let token = app
        .register_account("Alice", "alice@example.com", "CorrectHorse1")
        .await;

    let response = app
        .get_authenticated("/api/content/sample", &token)
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "sample content");
}

#[tokio::test]
async fn test_admin_gate() {
    let app = TestApp::spawn().await;
    app.seed_account("Alice", "alice@example.com", "CorrectHorse1", |_| {})
        .await;
    app.seed_account("Root", "root@example.com", "AdminSecret1", |account| {
        account.role = Role::Admin;
    })
    .await;

    let standard = app.login_account("alice@example.com", "CorrectHorse1").await;
    let response = app
        .get_authenticated("/api/admin/overview", &standard)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["data"]["code"], "ADMIN_REQUIRED");

    let admin = app.login_account("root@example.com", "AdminSecret1").await;
    let response = app
        .get_authenticated("/api/admin/overview", &admin)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_gated_routes_still_require_authentication() {
    let app = TestApp::spawn().await;

    let response = app
        .get("/api/content/sample")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["data"]["code"], "NO_TOKEN");
}

#[tokio::test]
async fn test_login_rate_limit_blocks_sixth_attempt() {
    let app = TestApp::spawn().await;

    // Unknown email: every attempt fails without touching any account.
    for _ in 0..5 {
        let response = login_from(&app, "nobody@example.com", "WrongPassword9", "198.51.100.7").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let blocked = login_from(&app, "nobody@example.com", "WrongPassword9", "198.51.100.7").await;
    assert_eq!(blocked.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(blocked.headers().contains_key("retry-after"));

    let body: serde_json::Value = blocked.json().await.expect("Failed to parse response");
    assert_eq!(body["data"]["code"], "RATE_LIMITED");
    assert!(body["data"]["retry_after_secs"].is_number());

    // Another client keeps its own budget.
    let other = login_from(&app, "nobody@example.com", "WrongPassword9", "198.51.100.8").await;
    assert_eq!(other.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_rate_limit_refunds_successful_attempts() {
    let app = TestApp::spawn().await;
    app.seed_account("Alice", "alice@example.com", "CorrectHorse1", |_| {})
        .await;

    // More successes than the failure budget allows, from one client.
    for _ in 0..8 {
        let response = login_from(&app, "alice@example.com", "CorrectHorse1", "198.51.100.7").await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn test_registration_rate_limit() {
    let app = TestApp::spawn().await;

    for n in 0..5 {
        let response = app
            .post("/api/auth/register")
            .header("X-Forwarded-For", "198.51.100.7")
            .json(&json!({
                "name": "Alice",
                "email": format!("alice{}@example.com", n),
                "password": "CorrectHorse1"
            }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let blocked = app
        .post("/api/auth/register")
        .header("X-Forwarded-For", "198.51.100.7")
        .json(&json!({
            "name": "Alice",
            "email": "alice5@example.com",
            "password": "CorrectHorse1"
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(blocked.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_forgot_password_is_silent_for_unknown_email() {
    let app = TestApp::spawn().await;
    app.seed_account("Alice", "alice@example.com", "CorrectHorse1", |_| {})
        .await;

    let known = app
        .post("/api/auth/forgot-password")
        .json(&json!({ "email": "alice@example.com" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(known.status(), StatusCode::OK);
    let known_body: serde_json::Value = known.json().await.expect("Failed to parse response");

    let unknown = app
        .post("/api/auth/forgot-password")
        .json(&json!({ "email": "nobody@example.com" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(unknown.status(), StatusCode::OK);
    let unknown_body: serde_json::Value = unknown.json().await.expect("Failed to parse response");

    assert_eq!(known_body, unknown_body);

    // Only the registered address got mail.
    assert_eq!(app.mailer.reset_mail_count(), 1);
    assert!(app.mailer.latest_reset_token("nobody@example.com").is_none());
}

#[tokio::test]
async fn test_forgot_password_rejects_malformed_email() {
    let app = TestApp::spawn().await;

    let response = app
        .post("/api/auth/forgot-password")
        .json(&json!({ "email": "not-an-email" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_password_reset_flow() {
    let app = TestApp::spawn().await;
    app.seed_account("Alice", "alice@example.com", "CorrectHorse1", |_| {})
        .await;

    app.post("/api/auth/forgot-password")
        .json(&json!({ "email": "alice@example.com" }))
        .send()
        .await
        .expect("Failed to execute request");

    let reset_token = app
        .mailer
        .latest_reset_token("alice@example.com")
        .expect("No reset mail recorded");

    let response = app
        .post("/api/auth/reset-password")
        .json(&json!({ "token": reset_token, "new_password": "FreshPassword2" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert!(body["data"]["token"].is_string());

    let old = login_from(&app, "alice@example.com", "CorrectHorse1", "203.0.113.1").await;
    assert_eq!(old.status(), StatusCode::UNAUTHORIZED);

    let new = login_from(&app, "alice@example.com", "FreshPassword2", "203.0.113.2").await;
    assert_eq!(new.status(), StatusCode::OK);

    // The token was consumed by the first redemption.
    let reuse = app
        .post("/api/auth/reset-password")
        .json(&json!({ "token": reset_token, "new_password": "AnotherPass3" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(reuse.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_password_reset_clears_lockout() {
    let app = TestApp::spawn().await;
    app.seed_account("Alice", "alice@example.com", "CorrectHorse1", |account| {
        account.login_attempts = 5;
        account.lock_until = Some(Utc::now() + Duration::minutes(15));
    })
    .await;

    app.post("/api/auth/forgot-password")
        .json(&json!({ "email": "alice@example.com" }))
        .send()
        .await
        .expect("Failed to execute request");

    let reset_token = app
        .mailer
        .latest_reset_token("alice@example.com")
        .expect("No reset mail recorded");

    let response = app
        .post("/api/auth/reset-password")
        .json(&json!({ "token": reset_token, "new_password": "FreshPassword2" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::OK);

    // The lock went away with the old credential.
    let login = login_from(&app, "alice@example.com", "FreshPassword2", "203.0.113.1").await;
    assert_eq!(login.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_expired_reset_token_is_rejected() {
    let app = TestApp::spawn().await;
    let account = app
        .seed_account("Alice", "alice@example.com", "CorrectHorse1", |_| {})
        .await;

    let raw_token = tokens::generate_token();
    app.repository
        .set_reset_token(
            &account.id,
            &tokens::hash_token(&raw_token),
            Utc::now() - Duration::minutes(1),
        )
        .await
        .expect("Failed to store reset token");

    let response = app
        .post("/api/auth/reset-password")
        .json(&json!({ "token": raw_token, "new_password": "FreshPassword2" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reset_password_enforces_password_policy() {
    let app = TestApp::spawn().await;
    app.seed_account("Alice", "alice@example.com", "CorrectHorse1", |_| {})
        .await;

    app.post("/api/auth/forgot-password")
        .json(&json!({ "email": "alice@example.com" }))
        .send()
        .await
        .expect("Failed to execute request");

    let reset_token = app
        .mailer
        .latest_reset_token("alice@example.com")
        .expect("No reset mail recorded");

    // Policy rejection happens before redemption, so the token survives.
    let weak = app
        .post("/api/auth/reset-password")
        .json(&json!({ "token": reset_token, "new_password": "password" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(weak.status(), StatusCode::BAD_REQUEST);

    let strong = app
        .post("/api/auth/reset-password")
        .json(&json!({ "token": reset_token, "new_password": "FreshPassword2" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(strong.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_verify_email_flow() {
    let app = TestApp::spawn().await;
    let token = app
        .register_account("Alice", "alice@example.com", "CorrectHorse1")
        .await;

    let verify_token = app
        .mailer
        .latest_verification_token("alice@example.com")
        .expect("No verification mail recorded");

    let response = app
        .post("/api/auth/verify-email")
        .json(&json!({ "token": verify_token }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::OK);

    let me = app
        .get_authenticated("/api/auth/me", &token)
        .send()
        .await
        .expect("Failed to execute request");
    let body: serde_json::Value = me.json().await.expect("Failed to parse response");
    assert_eq!(body["data"]["user"]["email_verified"], true);

    // Single use.
    let reuse = app
        .post("/api/auth/verify-email")
        .json(&json!({ "token": verify_token }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(reuse.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_verify_email_rejects_unknown_token() {
    let app = TestApp::spawn().await;

    let response = app
        .post("/api/auth/verify-email")
        .json(&json!({ "token": "0000000000000000000000000000000000000000000000000000000000000000" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

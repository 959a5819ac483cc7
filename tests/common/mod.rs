use std::sync::Arc;

use axum::body::Body;
use axum::http::header::SET_COOKIE;
use axum::http::Response;
use chrono::Utc;

use phoenix_iam::config::{IamConfig, KeyConfig, MongoConfig, RateLimitConfig, SmtpConfig};
use phoenix_iam::middleware::create_ip_rate_limiter;
use phoenix_iam::models::{Identity, NewIdentity, Tenant};
use phoenix_iam::oauth::code::AuthorizationCodeCodec;
use phoenix_iam::oauth::session::SessionStateCodec;
use phoenix_iam::roles::RoleRegistry;
use phoenix_iam::services::{
    ActivationService, AuthorizationFlow, ConsentManager, IdentityStore, MemoryStore,
    MockEmailService, TenantStore,
};
use phoenix_iam::utils::hash_password;
use phoenix_iam::AppState;

pub const SESSION_KEY: &[u8] = b"integration-session-key";
pub const CODE_KEY: &[u8] = b"integration-code-key";

pub fn test_config() -> IamConfig {
    IamConfig {
        port: 0,
        mongodb: MongoConfig {
            uri: "mongodb://localhost:27017".to_string(),
            database: "iam_test".to_string(),
        },
        smtp: SmtpConfig {
            host: "localhost".to_string(),
            port: 587,
            username: String::new(),
            password: String::new(),
            sender: "noreply@example.com".to_string(),
            enabled: false,
        },
        keys: KeyConfig {
            session_key: SESSION_KEY.to_vec(),
            code_key: CODE_KEY.to_vec(),
        },
        rate_limit: RateLimitConfig {
            per_second: 100,
            burst: 100,
        },
        role_names: vec![
            "admin".to_string(),
            "clinician".to_string(),
            "patient".to_string(),
        ],
        session_max_age: 1800,
        registration_max_age: 600,
    }
}

pub fn test_state(config: IamConfig) -> (AppState, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let roles = Arc::new(RoleRegistry::from_names(&config.role_names));
    let flow = AuthorizationFlow::new(
        store.clone(),
        store.clone(),
        ConsentManager::new(store.clone()),
        SessionStateCodec::new(config.keys.session_key.clone()),
        AuthorizationCodeCodec::new(config.keys.code_key.clone()),
        roles.clone(),
    );
    let activation = ActivationService::new(store.clone(), Arc::new(MockEmailService));
    let login_rate_limiter =
        create_ip_rate_limiter(config.rate_limit.per_second, config.rate_limit.burst);
    let register_rate_limiter =
        create_ip_rate_limiter(config.rate_limit.per_second, config.rate_limit.burst);

    let state = AppState {
        config: Arc::new(config),
        flow,
        activation,
        roles,
        login_rate_limiter,
        register_rate_limiter,
    };
    (state, store)
}

pub async fn seed_tenant(store: &MemoryStore) {
    store
        .save_tenant(&Tenant {
            id: "t-1".to_string(),
            name: "acme-portal".to_string(),
            secret: "s3cret".to_string(),
            redirect_uri: Some("https://acme.example/cb".to_string()),
            allowed_roles: 1,
            required_scopes: "resource.read".to_string(),
            supported_grant_types: Some("authorization_code".to_string()),
        })
        .await
        .unwrap();
}

pub async fn seed_activated_user(store: &MemoryStore, username: &str, password: &str) {
    let input = NewIdentity {
        username: username.to_string(),
        password: password.to_string(),
        email: format!("{username}@example.com"),
        phone: "+21612345678".to_string(),
        birth_date: chrono::NaiveDate::from_ymd_opt(1991, 4, 3).unwrap(),
    };
    let mut identity = Identity::new_pending(
        &input,
        hash_password(password).unwrap(),
        "123456".to_string(),
        Utc::now(),
    );
    identity.mark_activated();
    store.save_identity(&identity).await.unwrap();
}

/// Value of the `session_state` cookie from a `Set-Cookie` header.
pub fn session_cookie(response: &Response<Body>) -> String {
    let raw = response
        .headers()
        .get(SET_COOKIE)
        .expect("missing set-cookie header")
        .to_str()
        .unwrap();
    let pair = raw.split(';').next().unwrap();
    let (name, value) = pair.split_once('=').unwrap();
    assert_eq!(name, "session_state");
    value.to_string()
}

/// The `code` query parameter of a redirect location, percent-decoded.
pub fn code_from_location(location: &str) -> String {
    let raw = location
        .split("code=")
        .nth(1)
        .expect("location has no code parameter")
        .split('&')
        .next()
        .unwrap();
    urlencoding::decode(raw).unwrap().into_owned()
}

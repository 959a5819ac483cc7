mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use tower::util::ServiceExt;

use phoenix_iam::build_router;
use phoenix_iam::services::IdentityStore;

fn post_form(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

const REGISTER_BODY: &str = "username=newuser&password=pa55word%21&confirm_password=pa55word%21\
&email=newuser%40example.com&phone=%2B21612345678&birth_date=1993-02-11\
&client_id=acme-portal&response_type=code\
&code_challenge=E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM&code_challenge_method=S256";

#[tokio::test]
async fn register_page_preserves_authorization_parameters() {
    let (state, _) = common::test_state(common::test_config());
    let app = build_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/register?client_id=acme-portal&state=xyz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let html = String::from_utf8(body.to_vec()).unwrap();
    assert!(html.contains("name=\"client_id\" value=\"acme-portal\""));
    assert!(html.contains("name=\"state\" value=\"xyz\""));
}

#[tokio::test]
async fn registration_then_activation_resumes_the_flow() {
    let (state, store) = common::test_state(common::test_config());
    common::seed_tenant(&store).await;
    let app = build_router(state);

    let response = app.clone().oneshot(post_form("/register", REGISTER_BODY)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let html = String::from_utf8(body.to_vec()).unwrap();
    assert!(html.contains("Activate your account"));
    // The code never appears in the page.
    let stored = store.find_by_username("newuser").await.unwrap().unwrap();
    let code = stored.activation_code.clone().unwrap();
    assert!(!html.contains(&code));
    assert!(!stored.activated);

    let activate_body = format!(
        "username=newuser&code={code}&client_id=acme-portal&response_type=code\
&code_challenge=E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM&code_challenge_method=S256"
    );
    let response = app
        .oneshot(post_form("/register/activate", &activate_body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    // Session cookie restored so login can continue the flow.
    let session = common::session_cookie(&response);
    assert!(!session.is_empty());

    let stored = store.find_by_username("newuser").await.unwrap().unwrap();
    assert!(stored.activated);
}

#[tokio::test]
async fn mismatched_passwords_re_render_the_form() {
    let (state, _) = common::test_state(common::test_config());
    let app = build_router(state);

    let body = "username=newuser&password=pa55word%21&confirm_password=different\
&email=newuser%40example.com&phone=%2B21612345678&birth_date=1993-02-11";
    let response = app.oneshot(post_form("/register", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let html = String::from_utf8(body.to_vec()).unwrap();
    assert!(html.contains("Passwords do not match"));
}

#[tokio::test]
async fn invalid_email_re_renders_the_form() {
    let (state, _) = common::test_state(common::test_config());
    let app = build_router(state);

    let body = "username=newuser&password=pa55word%21&confirm_password=pa55word%21\
&email=not-an-email&phone=%2B21612345678&birth_date=1993-02-11";
    let response = app.oneshot(post_form("/register", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let html = String::from_utf8(body.to_vec()).unwrap();
    assert!(html.contains("email"));
    assert!(html.contains("Invalid value for"));
}

#[tokio::test]
async fn duplicate_username_re_renders_the_form() {
    let (state, store) = common::test_state(common::test_config());
    common::seed_activated_user(&store, "newuser", "pa55word!").await;
    let app = build_router(state);

    let response = app.oneshot(post_form("/register", REGISTER_BODY)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let html = String::from_utf8(body.to_vec()).unwrap();
    assert!(html.contains("already taken"));
}

#[tokio::test]
async fn wrong_activation_code_re_renders_with_a_message() {
    let (state, store) = common::test_state(common::test_config());
    common::seed_tenant(&store).await;
    let app = build_router(state);

    app.clone().oneshot(post_form("/register", REGISTER_BODY)).await.unwrap();

    let response = app
        .oneshot(post_form(
            "/register/activate",
            "username=newuser&code=000000",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let html = String::from_utf8(body.to_vec()).unwrap();
    assert!(html.contains("not valid"));

    let stored = store.find_by_username("newuser").await.unwrap().unwrap();
    assert!(!stored.activated);
}

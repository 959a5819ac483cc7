use axum::{
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::error::AppError;
use crate::handlers::{
    authorize::{expired_session_cookie, session_cookie},
    pages, SESSION_COOKIE,
};
use crate::services::flow::LoginOutcome;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// `POST /login/authorization` — authenticate against the session carried in
/// the cookie. Ends in one of: a 303 back to the client (grant on file), the
/// consent page (first login for this client), or the login page re-rendered
/// with a message.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let session = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .unwrap_or_default();

    match state.flow.login(&session, &form.username, &form.password).await {
        Ok(LoginOutcome::Authorized { location }) => {
            // Code issued: the session state is spent.
            let jar = jar.add(expired_session_cookie());
            Ok((jar, Redirect::to(&location)).into_response())
        }
        Ok(LoginOutcome::ConsentRequired { request, session }) => {
            let jar = jar.add(session_cookie(session, state.config.session_max_age));
            Ok((jar, Html(pages::consent_page(&request.client_id, &request.scope))).into_response())
        }
        Err(AppError::InvalidCredentials) => {
            tracing::info!(username = %form.username, "login rejected");
            Ok(Html(pages::login_page(Some("Invalid username or password."))).into_response())
        }
        Err(e) => Err(e),
    }
}

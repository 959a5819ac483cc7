use axum::{
    extract::{Query, State},
    response::Html,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::error::AppError;
use crate::handlers::{pages, SESSION_COOKIE};
use crate::oauth::request::AuthorizeQuery;
use crate::AppState;

/// `GET /authorize` — validate the client's request, stash it in the signed
/// session cookie and present the login page.
pub async fn authorize(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<AuthorizeQuery>,
) -> Result<(CookieJar, Html<String>), AppError> {
    let (request, session) = state.flow.authorize(query).await?;
    tracing::info!(client_id = %request.client_id, "authorization flow started");

    let jar = jar.add(session_cookie(session, state.config.session_max_age));
    Ok((jar, Html(pages::login_page(None))))
}

pub(crate) fn session_cookie(value: String, max_age_seconds: u64) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age_seconds as i64))
        .build()
}

/// Removal cookie for the responses that end the flow. The session state is
/// single-flow: once a code (or a denial) has gone back to the client, the
/// carried request must not outlive it.
pub(crate) fn expired_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::ZERO)
        .build()
}

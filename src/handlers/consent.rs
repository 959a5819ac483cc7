use axum::{
    extract::State,
    response::Redirect,
    Form,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::error::AppError;
use crate::handlers::{authorize::expired_session_cookie, SESSION_COOKIE};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ConsentForm {
    #[serde(default)]
    pub approved_scope: String,
    #[serde(default)]
    pub approval_status: String,
}

/// `POST /login/authorization/consent` (also exposed as
/// `PATCH /login/authorization`) — record the decision and 303 back to the
/// client with either a code or `error=access_denied`.
pub async fn consent(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<ConsentForm>,
) -> Result<(CookieJar, Redirect), AppError> {
    let session = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .unwrap_or_default();

    let location = state
        .flow
        .consent(&session, &form.approved_scope, &form.approval_status)
        .await?;

    // Whether the decision was approval or denial, the flow is over and the
    // session state with it.
    Ok((jar.add(expired_session_cookie()), Redirect::to(&location)))
}

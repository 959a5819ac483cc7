use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Response},
    Form,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::NaiveDate;
use serde::Deserialize;
use validator::Validate;

use crate::error::AppError;
use crate::handlers::{authorize::session_cookie, pages};
use crate::models::NewIdentity;
use crate::oauth::request::AuthorizeQuery;
use crate::AppState;

/// Registration form, with the authorization parameters passed through as
/// hidden fields so the flow can resume once the account is active.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterForm {
    #[validate(length(min = 3, max = 64))]
    pub username: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    pub confirm_password: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 7, max = 20))]
    pub phone: String,
    pub birth_date: String,
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub response_type: Option<String>,
    pub scope: Option<String>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
    pub state: Option<String>,
}

impl RegisterForm {
    fn oauth_query(&self) -> AuthorizeQuery {
        AuthorizeQuery {
            client_id: self.client_id.clone(),
            redirect_uri: self.redirect_uri.clone(),
            response_type: self.response_type.clone(),
            scope: self.scope.clone(),
            code_challenge: self.code_challenge.clone(),
            code_challenge_method: self.code_challenge_method.clone(),
            state: self.state.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ActivateForm {
    pub username: String,
    pub code: String,
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub response_type: Option<String>,
    pub scope: Option<String>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
    pub state: Option<String>,
}

impl ActivateForm {
    fn oauth_query(&self) -> AuthorizeQuery {
        AuthorizeQuery {
            client_id: self.client_id.clone(),
            redirect_uri: self.redirect_uri.clone(),
            response_type: self.response_type.clone(),
            scope: self.scope.clone(),
            code_challenge: self.code_challenge.clone(),
            code_challenge_method: self.code_challenge_method.clone(),
            state: self.state.clone(),
        }
    }
}

/// `GET /register` — registration form, preserving any authorization
/// parameters present on the query string.
pub async fn register_page(Query(query): Query<AuthorizeQuery>) -> Html<String> {
    Html(pages::register_page(&query, None))
}

/// `POST /register` — create a pending identity and move on to the
/// activation step. Every rejection re-renders the form with a message
/// rather than erroring out of the flow.
pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    let query = form.oauth_query();

    if form.password != form.confirm_password {
        return Ok(Html(pages::register_page(&query, Some("Passwords do not match."))).into_response());
    }
    if let Err(errors) = form.validate() {
        let mut fields: Vec<String> = errors.field_errors().keys().map(|k| k.to_string()).collect();
        fields.sort();
        let message = format!("Invalid value for: {}.", fields.join(", "));
        return Ok(Html(pages::register_page(&query, Some(&message))).into_response());
    }
    let birth_date = match NaiveDate::parse_from_str(&form.birth_date, "%Y-%m-%d") {
        Ok(d) => d,
        Err(_) => {
            return Ok(Html(pages::register_page(
                &query,
                Some("Birth date must be in YYYY-MM-DD format."),
            ))
            .into_response())
        }
    };

    let input = NewIdentity {
        username: form.username.clone(),
        password: form.password.clone(),
        email: form.email.clone(),
        phone: form.phone.clone(),
        birth_date,
    };

    match state.activation.register(input).await {
        Ok(_) => Ok(Html(pages::activation_page(&form.username, &query, None)).into_response()),
        Err(AppError::DuplicateUsername) => Ok(Html(pages::register_page(
            &query,
            Some("That username is already taken."),
        ))
        .into_response()),
        Err(e) => Err(e),
    }
}

/// `POST /register/activate` — redeem the emailed code. On success the
/// authorization session is re-established from the passed-through
/// parameters and the user lands back on the login page.
pub async fn activate(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<ActivateForm>,
) -> Result<Response, AppError> {
    let query = form.oauth_query();

    match state.activation.activate(&form.username, &form.code).await {
        Ok(()) => {}
        Err(AppError::InvalidCode) => {
            return Ok(Html(pages::activation_page(
                &form.username,
                &query,
                Some("That code is not valid. Check the digits and try again."),
            ))
            .into_response())
        }
        Err(AppError::ExpiredCode) => {
            return Ok(Html(pages::activation_page(
                &form.username,
                &query,
                Some("That code has expired. Register again to receive a new one."),
            ))
            .into_response())
        }
        Err(e) => return Err(e),
    }

    // Resume the authorization flow if the registration detour started from
    // /authorize; otherwise just show the login page.
    if query.client_id.is_some() {
        let (_, session) = state.flow.authorize(query).await?;
        let jar = jar.add(session_cookie(session, state.config.registration_max_age));
        Ok((jar, Html(pages::login_page(None))).into_response())
    } else {
        Ok(Html(pages::login_page(None)).into_response())
    }
}

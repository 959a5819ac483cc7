//! Server-rendered pages for the browser-facing flow.
//!
//! Plain `format!`-built HTML; every interpolated value goes through
//! [`escape`] so user- and client-supplied strings can never break out of
//! the markup.

use crate::oauth::request::AuthorizeQuery;

const STYLE: &str = "\
body{font-family:system-ui,sans-serif;background:#f4f6f8;margin:0;display:flex;\
justify-content:center;padding-top:4rem}\
main{background:#fff;border-radius:8px;box-shadow:0 1px 4px rgba(0,0,0,.12);\
padding:2rem;width:22rem}\
h1{font-size:1.25rem;margin-top:0}\
label{display:block;margin:.75rem 0 .25rem;font-size:.9rem}\
input[type=text],input[type=password],input[type=email],input[type=tel],input[type=date]\
{width:100%;padding:.5rem;border:1px solid #cbd2d9;border-radius:4px;box-sizing:border-box}\
button{margin-top:1rem;padding:.5rem 1.25rem;border:0;border-radius:4px;\
background:#1168bd;color:#fff;cursor:pointer}\
button.secondary{background:#6b7280}\
.message{color:#b42318;font-size:.9rem;margin:.5rem 0}\
ul.scopes{padding-left:1.25rem}";

/// HTML-escape for attribute and text positions.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n<main>\n{}\n</main>\n</body>\n</html>\n",
        escape(title),
        body
    )
}

fn message_block(message: Option<&str>) -> String {
    match message {
        Some(m) => format!("<p class=\"message\">{}</p>", escape(m)),
        None => String::new(),
    }
}

/// Hidden inputs carrying the authorization parameters through the
/// registration detour, so the flow can resume at login.
pub fn hidden_oauth_fields(query: &AuthorizeQuery) -> String {
    let mut fields = String::new();
    let pairs = [
        ("client_id", &query.client_id),
        ("redirect_uri", &query.redirect_uri),
        ("response_type", &query.response_type),
        ("scope", &query.scope),
        ("code_challenge", &query.code_challenge),
        ("code_challenge_method", &query.code_challenge_method),
        ("state", &query.state),
    ];
    for (name, value) in pairs {
        if let Some(value) = value {
            fields.push_str(&format!(
                "<input type=\"hidden\" name=\"{name}\" value=\"{}\">\n",
                escape(value)
            ));
        }
    }
    fields
}

pub fn login_page(message: Option<&str>) -> String {
    let body = format!(
        "<h1>Sign in</h1>\n{}\
         <form method=\"post\" action=\"/login/authorization\">\n\
         <label for=\"username\">Username</label>\n\
         <input type=\"text\" id=\"username\" name=\"username\" required autofocus>\n\
         <label for=\"password\">Password</label>\n\
         <input type=\"password\" id=\"password\" name=\"password\" required>\n\
         <button type=\"submit\">Sign in</button>\n\
         </form>",
        message_block(message)
    );
    page("Sign in", &body)
}

pub fn register_page(query: &AuthorizeQuery, message: Option<&str>) -> String {
    let body = format!(
        "<h1>Create account</h1>\n{}\
         <form method=\"post\" action=\"/register\">\n{}\
         <label for=\"username\">Username</label>\n\
         <input type=\"text\" id=\"username\" name=\"username\" required autofocus>\n\
         <label for=\"password\">Password</label>\n\
         <input type=\"password\" id=\"password\" name=\"password\" required>\n\
         <label for=\"confirm_password\">Confirm password</label>\n\
         <input type=\"password\" id=\"confirm_password\" name=\"confirm_password\" required>\n\
         <label for=\"email\">Email</label>\n\
         <input type=\"email\" id=\"email\" name=\"email\" required>\n\
         <label for=\"phone\">Phone</label>\n\
         <input type=\"tel\" id=\"phone\" name=\"phone\" required>\n\
         <label for=\"birth_date\">Date of birth</label>\n\
         <input type=\"date\" id=\"birth_date\" name=\"birth_date\" required>\n\
         <button type=\"submit\">Register</button>\n\
         </form>",
        message_block(message),
        hidden_oauth_fields(query)
    );
    page("Create account", &body)
}

pub fn activation_page(username: &str, query: &AuthorizeQuery, message: Option<&str>) -> String {
    let body = format!(
        "<h1>Activate your account</h1>\n{}\
         <p>We emailed a 6-digit code to your address. It expires in 10 minutes.</p>\n\
         <form method=\"post\" action=\"/register/activate\">\n{}\
         <input type=\"hidden\" name=\"username\" value=\"{}\">\n\
         <label for=\"code\">Activation code</label>\n\
         <input type=\"text\" id=\"code\" name=\"code\" inputmode=\"numeric\" \
         pattern=\"[0-9]{{6}}\" required autofocus>\n\
         <button type=\"submit\">Activate</button>\n\
         </form>",
        message_block(message),
        hidden_oauth_fields(query),
        escape(username)
    );
    page("Activate your account", &body)
}

pub fn consent_page(client_id: &str, scope: &str) -> String {
    let scope_items: String = scope
        .split_whitespace()
        .map(|s| format!("<li>{}</li>\n", escape(s)))
        .collect();
    let body = format!(
        "<h1>Authorize {}</h1>\n\
         <p><strong>{}</strong> is requesting access to:</p>\n\
         <ul class=\"scopes\">\n{}</ul>\n\
         <form method=\"post\" action=\"/login/authorization/consent\">\n\
         <input type=\"hidden\" name=\"approved_scope\" value=\"{}\">\n\
         <button type=\"submit\" name=\"approval_status\" value=\"YES\">Allow</button>\n\
         <button type=\"submit\" name=\"approval_status\" value=\"NO\" class=\"secondary\">Deny</button>\n\
         </form>",
        escape(client_id),
        escape(client_id),
        scope_items,
        escape(scope)
    );
    page("Authorize access", &body)
}

pub fn error_page(message: &str) -> String {
    let body = format!(
        "<h1>Something went wrong</h1>\n<p class=\"message\">{}</p>",
        escape(message)
    );
    page("Error", &body)
}

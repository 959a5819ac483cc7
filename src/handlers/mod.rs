pub mod authorize;
pub mod consent;
pub mod health;
pub mod login;
pub mod pages;
pub mod register;

/// Name of the cookie carrying the signed authorization session state.
pub const SESSION_COOKIE: &str = "session_state";

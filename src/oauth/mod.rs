pub mod code;
pub mod request;
pub mod session;

pub use code::{AuthorizationCodeClaims, AuthorizationCodeCodec};
pub use request::{AuthorizationRequest, AuthorizeQuery};
pub use session::SessionStateCodec;

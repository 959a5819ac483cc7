pub mod grant;
pub mod identity;
pub mod tenant;

pub use grant::Grant;
pub use identity::{Identity, NewIdentity};
pub use tenant::Tenant;

pub mod activation;
pub mod consent;
pub mod database;
pub mod email;
pub mod flow;

pub use activation::ActivationService;
pub use consent::ConsentManager;
pub use database::{GrantStore, IdentityStore, MemoryStore, MongoDb, TenantStore};
pub use email::{EmailSender, MockEmailService, SmtpEmailService};
pub use flow::{AuthorizationFlow, LoginOutcome};

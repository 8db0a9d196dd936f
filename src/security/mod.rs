pub mod auth_secret;
pub mod credential_context;
pub mod destination;

pub use auth_secret::{AuthSecret, Credentials, mask_token};
pub use credential_context::{CredentialContext, EphemeralConfig};
pub use destination::Destination;

mod claims;
mod config;
mod error;
mod extractors;
mod guards;
mod roles;
mod verifier;

pub use claims::Claims;
pub use config::JwtConfig;
pub use error::{AuthError, AuthResult};
pub use extractors::AuthContext;
pub use guards::{ensure_role, GuardError};
pub use roles::{ROLE_ADMIN, ROLE_STAFF, SALE_ROLES};
pub use verifier::JwtVerifier;

// Authentication module
// Resolves the per-request principal from a bearer JWT issued by the identity layer

pub mod error;
pub mod middleware;
pub mod models;
pub mod token;

// Re-export commonly used types
pub use error::AuthError;
pub use middleware::AuthenticatedUser;
pub use models::{Principal, User};
pub use token::TokenService;

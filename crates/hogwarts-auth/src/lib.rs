// Hogwarts Auth - Credentials for Hogwarts Artifacts Online

pub mod error;
pub mod password;
pub mod token;

pub use error::AuthError;
pub use password::PasswordHasher;
pub use token::{Claims, TokenAuthority, VerifiedToken};

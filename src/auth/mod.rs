//! Authentication core: password hashing, token issuance and the request gate.

pub mod gate;
pub mod handlers;
pub mod password;
pub mod token;

pub use gate::{resolve_bearer, AuthGate, Identity};
pub use password::{BcryptHasher, PasswordHasher, MAX_PASSWORD_BYTES};
pub use token::{Claims, JwtTokenService, TokenService, TokenType};

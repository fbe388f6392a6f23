//! Authentication
//!
//! User directory, JWT session tokens, and the signup/login handlers.
//! Passwords are bcrypt-hashed before storage; tokens are stateless and
//! verified by the middleware on every protected request.

/// User model and database operations
pub mod users;

/// JWT token generation and validation
pub mod sessions;

/// HTTP handlers for authentication endpoints
pub mod handlers;

pub use handlers::{login, signup, AuthResponse, LoginRequest, SignupRequest};
pub use sessions::{create_token, verify_token, Claims, Keys};
pub use users::{User, UserPublic};

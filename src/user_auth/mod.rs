//! Accounts: registration, login, profile, bearer-token auth

pub mod handlers;
pub mod middleware;
pub mod service;

pub use middleware::{admin_middleware, jwt_auth_middleware};
pub use service::{AuthUser, Claims, UserAuthService, UserView};

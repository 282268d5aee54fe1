pub mod auth;

pub use auth::{admin_auth_middleware, customer_auth_middleware, AdminClaims, CustomerClaims};

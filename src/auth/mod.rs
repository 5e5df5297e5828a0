mod claims;
pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod services;
pub mod token;

pub use extractors::AuthUser;
pub use middleware::require_auth;
pub use token::TokenService;

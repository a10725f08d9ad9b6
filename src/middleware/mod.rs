pub mod auth;
pub mod enforce;
pub mod response;

pub use auth::{jwt_auth_middleware, AuthUser};
pub use enforce::enforce_authority_middleware;
pub use response::{ApiResponse, ApiResult};

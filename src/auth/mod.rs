// Authentication and authorization

pub mod cookies;
pub mod errors;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod service;
pub mod social;

pub use errors::*;
pub use jwt::*;
pub use middleware::*;
pub use models::*;
pub use service::*;

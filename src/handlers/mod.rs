//! Session lifecycle handlers and the edge route guard

pub mod auth;
pub mod middleware;

pub use auth::{AuthHandler, LoginRequest, RegisterRequest};
pub use middleware::{authorize_request, handle_redirect, health, route_guard, EdgeDecision, RedirectTo};

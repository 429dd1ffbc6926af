//! HTTP surface: link creation, redirects and visit statistics.

pub mod middleware;
pub mod services;

pub use services::link_routes;

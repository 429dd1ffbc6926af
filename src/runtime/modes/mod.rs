//! Mode routing

#[cfg(feature = "server")]
pub mod server;

#[cfg(feature = "server")]
pub use server::run_server;

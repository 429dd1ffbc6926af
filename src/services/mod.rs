//! Service layer for business logic
//!
//! Shared by the HTTP API and by anything embedding the engine directly.

pub mod export;
pub mod resolver;
pub mod suffix;

pub use export::{distribution_csv, write_distribution_csv};
pub use resolver::{LinkResolver, LinkStats, ResolverOptions};
pub use suffix::SuffixGenerator;

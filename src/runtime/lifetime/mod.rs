pub mod startup;

pub use startup::{StartupContext, prepare_server_startup};

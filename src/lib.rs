//! Shortstat - URL shortener with per-link visit histograms
//!
//! Every short link carries a compact log-bucketed histogram of its visit
//! times, updated on each redirect and stored with the link record.
//!
//! # Features
//! - **server**: HTTP server mode (default)
//!
//! # Architecture
//! - `histogram`: Log-bucketed visit histogram and its binary codec
//! - `storage`: Key-value backends and the link record store
//! - `services`: Create-or-fetch, redirect and stats logic
//! - `analytics`: Sink for visits that could not be recorded
//! - `api`: HTTP services and middleware
//! - `config`: Configuration management
//! - `runtime`: Application lifecycle and execution modes
//! - `system`: Logging setup

pub mod analytics;
#[cfg(feature = "server")]
pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod histogram;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;

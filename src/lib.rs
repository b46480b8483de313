//! kibble-density: an HTTP service estimating grams per cup for dry pet food.
//!
//! The estimation pipeline lives in the `kibble-search` crate; this crate
//! adds configuration loading and the axum server that exposes it.

pub mod config;
pub mod error;
pub mod server;

pub use config::{Secrets, ServiceConfig};
pub use error::{Result, ServiceError};
pub use server::{EstimateServer, router};

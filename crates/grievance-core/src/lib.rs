//! grievance-core library.
//!
//! # Conventions
//!
//! - **Errors**: library operations return [`error::GrievanceError`];
//!   configuration loading uses `anyhow::Result`.
//! - **Logging**: use `tracing` macros (`info!`, `warn!`, `debug!`).
//! - **Persistence**: the local cache is authoritative; the remote sheet is a
//!   best-effort mirror (see [`store::Storage`]).

pub mod auth;
pub mod config;
pub mod error;
pub mod filter;
pub mod lock;
pub mod model;
pub mod report;
pub mod store;
pub mod tracker;
pub mod util;

pub use error::{ErrorCode, GrievanceError};
pub use tracker::Tracker;

#![allow(clippy::uninlined_format_args)]

pub mod app;
pub mod browse;
pub mod config;
pub mod controller;
pub mod error;
pub mod headline;
pub mod logging;
pub mod store;
pub mod surface;
pub mod ui;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::run;
pub use error::Error;

//! Daily pull of a paginated analytics report into a warehouse table.

pub mod config;
pub mod duck;
pub mod error;
pub mod fetch;
pub mod job;
pub mod load;
pub mod pipeline;
pub mod process;
pub mod report;
pub mod schedule;
pub mod sql;
pub mod trigger;

pub use error::{Error, Result};

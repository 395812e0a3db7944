pub mod page;
pub mod wire;

pub use page::{ColumnHeader, Continuation, ReportPage, ReportRow};
pub use wire::{BatchGetRequest, ReportRequest};

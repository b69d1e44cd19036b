//! Domain types for the dispatch pipeline.
//!
//! This module contains the core data structures:
//! - SourceRow: candidate rows from the analytics source
//! - DedupKey / ConversionEvent: event identity and outbound payloads
//! - DispatchReport: run outcomes

pub mod event;
pub mod report;
pub mod row;

// Re-export commonly used types
pub use event::{ConversionEvent, CustomData, DedupKey, UserData, EVENT_NAME};
pub use report::DispatchReport;
pub use row::SourceRow;

//! Display formatting functions and result types.
//!
//! Domain models implement [`std::fmt::Display`] directly (see [`models`]),
//! producing markdown that the terminal renders. Wrappers add context for
//! operation results and collections.
//!
//! ## Module Organization
//!
//! - [`collections`]: compact field listings ([`FieldList`])
//! - [`results`]: operation result types (CreateResult, UpdateResult, DeleteResult)
//! - [`reports`]: generation, chain, staleness and patch reports
//! - [`status`]: confirmation messages (OperationStatus)
//! - [`datetime`]: local time formatting
//! - [`models`]: Display implementations for the outline, sections and fields
//!
//! ## Usage Examples
//!
//! ```rust
//! use draftloom_core::{display::OperationStatus, outline::Outline};
//!
//! let mut outline = Outline::new();
//! outline.confirm();
//! println!("{}", OperationStatus::success("Outline confirmed"));
//! assert!(outline.to_string().starts_with("# Outline (confirmed)"));
//! ```

pub mod collections;
pub mod datetime;
pub mod models;
pub mod reports;
pub mod results;
pub mod status;

// Re-export commonly used types for convenience
pub use collections::FieldList;
pub use datetime::LocalDateTime;
pub use reports::SchedulerLine;
pub use results::{CreateResult, DeleteResult, UpdateResult};
pub use status::OperationStatus;

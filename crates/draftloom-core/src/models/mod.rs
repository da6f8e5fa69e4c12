//! Data models for outlines: sections, fields and their definitions.
//!
//! This module contains the domain records the orchestrator works on. Display
//! implementations live in [`crate::display::models`] so that formatting stays
//! separate from data.
//!
//! Records are plain data. All mutation of an outline goes through
//! [`crate::outline::Outline`] and [`crate::workflow::Workflow`], which hand
//! out shared references only, so status and content transitions have a
//! single writer.
//!
//! # Examples
//!
//! ```rust
//! use draftloom_core::models::{FieldDefinition, FieldStatus, SectionStatus};
//!
//! let definition = FieldDefinition::new("outline")
//!     .with_description("Bullet list of chapters")
//!     .depends_on(["title"]);
//! assert_eq!(definition.depends_on, vec!["title".to_string()]);
//!
//! let statuses = [FieldStatus::Completed, FieldStatus::Pending];
//! assert_eq!(SectionStatus::derive(statuses.iter()), SectionStatus::InProgress);
//! ```

pub mod definition;
pub mod field;
pub mod ids;
pub mod requests;
pub mod section;
pub mod status;
pub mod summary;


pub use definition::FieldDefinition;
pub use field::Field;
pub use ids::{FieldId, SectionId, WorkflowId};
pub use requests::FieldUpdate;
pub use section::Section;
pub use status::{FieldStatus, FieldType, SectionStatus};
pub use summary::Progress;

//! Core library for Draftloom, an orchestrator for AI-assisted outline
//! generation.
//!
//! A document is an [`Outline`] of sections holding ordered fields. Fields may
//! depend on one another's content. A [`Workflow`] generates pending fields
//! one at a time through a [`FieldGenerator`], can be paused between calls,
//! stops when the generator needs a clarification, and flags dependents as
//! stale whenever content they were built from changes.
//!
//! # Display Architecture
//!
//! - **Domain Models** ([`models`]): plain records; their
//!   [`std::fmt::Display`] impls live in [`display::models`]
//! - **Display Wrappers** ([`display`]): results of create/update/delete
//!   operations and generation reports
//! - **Terminal Rendering**: markdown output rendered by the CLI
//!
//! # Quick Start
//!
//! ```rust
//! use async_trait::async_trait;
//! use draftloom_core::{
//!     generator::{GenerationOutcome, GenerationRequest, GeneratorError},
//!     models::{FieldDefinition, FieldUpdate},
//!     FieldGenerator, WorkflowBuilder,
//! };
//!
//! struct Template;
//!
//! #[async_trait]
//! impl FieldGenerator for Template {
//!     async fn generate_field(
//!         &self,
//!         request: GenerationRequest,
//!     ) -> Result<GenerationOutcome, GeneratorError> {
//!         let inputs: Vec<_> = request.dependencies.iter().map(|d| d.content.as_str()).collect();
//!         Ok(GenerationOutcome::Completed {
//!             content: format!("{} from [{}]", request.field_name, inputs.join(", ")),
//!         })
//!     }
//! }
//!
//! # async fn example() -> draftloom_core::Result<()> {
//! let mut workflow = WorkflowBuilder::new().with_id("demo").build(Template)?;
//!
//! let section = workflow.outline_mut().add_section("Overview", "");
//! let fields = workflow.outline_mut().add_fields(
//!     &section.id,
//!     vec![
//!         FieldDefinition::new("title"),
//!         FieldDefinition::new("summary").depends_on(["title"]),
//!     ],
//! )?;
//!
//! // Generate everything, then edit the title by hand.
//! workflow.run().await?;
//! let updated = workflow
//!     .outline_mut()
//!     .update_field(&fields[0].id, FieldUpdate::content("A better title"))?;
//!
//! // The summary was built from the old title.
//! assert_eq!(updated.staleness.map(|r| r.marked), Some(vec![fields[1].id.clone()]));
//! println!("{}", workflow.outline());
//! # Ok(())
//! # }
//! ```

pub mod display;
pub mod error;
pub mod generator;
pub mod models;
pub mod outline;
pub mod params;
pub mod staleness;
pub mod wire;
pub mod workflow;

// Re-export commonly used types
pub use display::{CreateResult, DeleteResult, FieldList, OperationStatus, UpdateResult};
pub use error::{OrchestratorError, Result};
pub use generator::{
    ClarificationRequest, FieldGenerator, GenerationOutcome, GenerationRequest, GeneratorError,
};
pub use models::{
    Field, FieldDefinition, FieldId, FieldStatus, FieldType, FieldUpdate, Section, SectionId,
    SectionStatus, WorkflowId,
};
pub use outline::{Outline, OutlinePatch};
pub use staleness::StalenessReport;
pub use workflow::{
    GenerationControl, SchedulerState, Workflow, WorkflowBuilder, WorkflowEvent,
    WorkflowSnapshot,
};

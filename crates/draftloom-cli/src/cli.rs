//! Command-line interface definitions and handlers
//!
//! Argument structs carry the clap derives and convert into the core
//! parameter types; the [`Cli`] handler runs them against the loaded
//! workflow and renders the result.
//!
//! ```text
//! User Input → CLI Args (clap) → Core Params → Outline / Workflow → Markdown
//! ```
//!
//! Every command that changes the outline or the scheduler state saves the
//! workflow file before reporting, including generation runs that end in an
//! error, so a failed field is not lost.

use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand, ValueEnum};
use draftloom_core::{
    display::{CreateResult, DeleteResult, FieldList, OperationStatus, SchedulerLine, UpdateResult},
    generator::{GenerationOutcome, GenerationRequest},
    models::{FieldDefinition, FieldId, FieldType, SectionId},
    params::*,
    wire::{
        GenerateNextResponse, OutlineResponse, PatchOutlineRequest, RegenerateChainResponse,
        RegenerateFieldResponse,
    },
    FieldGenerator, OrchestratorError, Outline, Workflow, WorkflowBuilder,
};
use log::{info, warn};
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::{renderer::TerminalRenderer, store::WorkflowStore};

// ============================================================================
// Section commands
// ============================================================================

/// Section management commands
#[derive(Subcommand)]
pub enum SectionCommands {
    /// Append a section to the outline
    #[command(alias = "a")]
    Add(AddSectionArgs),
    /// Remove a section and all of its fields
    #[command(alias = "rm")]
    Remove(RemoveSectionArgs),
    /// Reorder all sections
    Reorder(ReorderSectionsArgs),
}

/// Append a section
#[derive(Args)]
pub struct AddSectionArgs {
    /// Title of the section
    pub name: String,
    /// What the section covers
    #[arg(short, long)]
    pub description: Option<String>,
}

impl From<AddSectionArgs> for AddSection {
    fn from(args: AddSectionArgs) -> Self {
        AddSection {
            name: args.name,
            description: args.description,
        }
    }
}

/// Remove a section
#[derive(Args)]
pub struct RemoveSectionArgs {
    /// ID of the section to remove
    pub section_id: String,
    /// Confirm the loss of completed content
    #[arg(long)]
    pub confirm: bool,
}

impl From<RemoveSectionArgs> for RemoveSection {
    fn from(args: RemoveSectionArgs) -> Self {
        RemoveSection {
            section_id: SectionId::from(args.section_id),
            confirm: args.confirm,
        }
    }
}

/// Reorder sections
#[derive(Args)]
pub struct ReorderSectionsArgs {
    /// Every section ID, in the new order
    #[arg(required = true)]
    pub section_ids: Vec<String>,
}

impl From<ReorderSectionsArgs> for ReorderSections {
    fn from(args: ReorderSectionsArgs) -> Self {
        ReorderSections {
            section_ids: args.section_ids.into_iter().map(SectionId::from).collect(),
        }
    }
}

// ============================================================================
// Field commands
// ============================================================================

/// Field management commands
#[derive(Subcommand)]
pub enum FieldCommands {
    /// Add a field to a section
    #[command(alias = "a")]
    Add(AddFieldArgs),
    /// Remove a field
    #[command(alias = "rm")]
    Remove(RemoveFieldArgs),
    /// Edit a field's content or labels
    #[command(alias = "e")]
    Edit(EditFieldArgs),
    /// Replace a field's dependency list
    Deps(FieldDepsArgs),
    /// Reorder the fields of a section
    Reorder(ReorderFieldsArgs),
    /// Mark or unmark a field as a chain head
    ChainHead(ChainHeadArgs),
}

/// Add a field
#[derive(Args)]
pub struct AddFieldArgs {
    /// ID of the section to add the field to
    pub section_id: String,
    /// Field name, unique within the section
    pub name: String,
    /// What the field should contain
    #[arg(short, long)]
    pub description: Option<String>,
    /// Content shape: text, list or freeform
    #[arg(short = 't', long, default_value = "text")]
    pub field_type: FieldType,
    /// Hint passed to the generator
    #[arg(long)]
    pub hint: Option<String>,
    /// Field IDs or sibling names this field depends on
    #[arg(long, value_delimiter = ',')]
    pub depends_on: Vec<String>,
    /// Question to ask before generating this field
    #[arg(long)]
    pub clarify: Option<String>,
    /// Mark the field as optional
    #[arg(long)]
    pub optional: bool,
}

impl From<AddFieldArgs> for AddFields {
    fn from(args: AddFieldArgs) -> Self {
        let mut definition = FieldDefinition::new(args.name)
            .with_type(args.field_type)
            .depends_on(args.depends_on);
        if let Some(description) = args.description {
            definition = definition.with_description(description);
        }
        if let Some(hint) = args.hint {
            definition = definition.with_ai_hint(hint);
        }
        if let Some(prompt) = args.clarify {
            definition = definition.with_clarification_prompt(prompt);
        }
        definition.required = !args.optional;

        AddFields {
            section_id: SectionId::from(args.section_id),
            fields: vec![definition],
        }
    }
}

/// Remove a field
#[derive(Args)]
pub struct RemoveFieldArgs {
    /// ID of the section holding the field
    pub section_id: String,
    /// ID of the field to remove
    pub field_id: String,
    /// Confirm the loss of completed content
    #[arg(long)]
    pub confirm: bool,
}

impl From<RemoveFieldArgs> for RemoveField {
    fn from(args: RemoveFieldArgs) -> Self {
        RemoveField {
            section_id: SectionId::from(args.section_id),
            field_id: FieldId::from(args.field_id),
            confirm: args.confirm,
        }
    }
}

/// Edit a field
///
/// Setting the content counts as a manual edit: the field becomes completed
/// and every field depending on it is marked stale.
#[derive(Args)]
pub struct EditFieldArgs {
    /// ID of the field to edit
    pub field_id: String,
    /// New content
    #[arg(short, long)]
    pub content: Option<String>,
    /// New display name
    #[arg(long)]
    pub name: Option<String>,
    /// New description
    #[arg(short, long)]
    pub description: Option<String>,
}

impl From<EditFieldArgs> for UpdateField {
    fn from(args: EditFieldArgs) -> Self {
        UpdateField {
            field_id: FieldId::from(args.field_id),
            content: args.content,
            display_name: args.name,
            description: args.description,
            depends_on: None,
        }
    }
}

/// Replace dependencies
#[derive(Args)]
pub struct FieldDepsArgs {
    /// ID of the field
    pub field_id: String,
    /// Field IDs it depends on; none clears the list
    pub depends_on: Vec<String>,
}

impl From<FieldDepsArgs> for UpdateField {
    fn from(args: FieldDepsArgs) -> Self {
        UpdateField {
            field_id: FieldId::from(args.field_id),
            depends_on: Some(args.depends_on.into_iter().map(FieldId::from).collect()),
            ..Default::default()
        }
    }
}

/// Reorder fields
#[derive(Args)]
pub struct ReorderFieldsArgs {
    /// ID of the section
    pub section_id: String,
    /// Every field ID of the section, in the new order
    #[arg(required = true)]
    pub field_ids: Vec<String>,
}

impl From<ReorderFieldsArgs> for ReorderFields {
    fn from(args: ReorderFieldsArgs) -> Self {
        ReorderFields {
            section_id: SectionId::from(args.section_id),
            field_ids: args.field_ids.into_iter().map(FieldId::from).collect(),
        }
    }
}

/// Mark a chain head
#[derive(Args)]
pub struct ChainHeadArgs {
    /// ID of the field
    pub field_id: String,
    /// Remove the chain head mark instead
    #[arg(long)]
    pub unset: bool,
}

impl From<ChainHeadArgs> for SetChainHead {
    fn from(args: ChainHeadArgs) -> Self {
        SetChainHead {
            field_id: FieldId::from(args.field_id),
            is_chain_head: !args.unset,
        }
    }
}

// ============================================================================
// Workflow commands
// ============================================================================

/// Discard the workflow
#[derive(Args)]
pub struct ResetArgs {
    /// Confirm the loss of completed content
    #[arg(long)]
    pub confirm: bool,
}

/// Import an outline
#[derive(Args)]
pub struct ImportArgs {
    /// JSON file in the `export` format
    pub file: PathBuf,
    /// Confirm replacing an outline with completed content
    #[arg(long)]
    pub confirm: bool,
}

/// Patch the outline
#[derive(Args)]
pub struct PatchArgs {
    /// JSON file holding `workflow_id`, `sections` and `confirm`
    pub file: PathBuf,
    /// Allow the patch to drop fields with completed content
    #[arg(long)]
    pub allow_destructive: bool,
}

/// Generate pending fields
#[derive(Args)]
pub struct GenerateArgs {
    /// Generate only the next pending field
    #[arg(long)]
    pub step: bool,
    /// Print the response as JSON
    #[arg(long)]
    pub json: bool,
}

/// Answer a clarification
#[derive(Args)]
pub struct AnswerArgs {
    /// ID of the field the question was asked for
    pub field_id: String,
    /// The answer
    pub answer: String,
    /// Print the response as JSON
    #[arg(long)]
    pub json: bool,
}

impl From<AnswerArgs> for SubmitAnswer {
    fn from(args: AnswerArgs) -> Self {
        SubmitAnswer {
            field_id: FieldId::from(args.field_id),
            answer: args.answer,
        }
    }
}

/// Regenerate one field
#[derive(Args)]
pub struct RegenerateArgs {
    /// ID of the field to regenerate
    pub field_id: String,
    /// Print the response as JSON
    #[arg(long)]
    pub json: bool,
}

impl From<RegenerateArgs> for FieldRef {
    fn from(args: RegenerateArgs) -> Self {
        FieldRef {
            field_id: FieldId::from(args.field_id),
        }
    }
}

/// Regenerate a chain
#[derive(Args)]
pub struct ChainArgs {
    /// ID of the field the chain starts at
    pub head_id: String,
    /// Confirm overwriting completed content
    #[arg(long)]
    pub confirm: bool,
    /// Print the response as JSON
    #[arg(long)]
    pub json: bool,
}

impl From<ChainArgs> for RegenerateChain {
    fn from(args: ChainArgs) -> Self {
        RegenerateChain {
            head_id: FieldId::from(args.head_id),
            confirm: args.confirm,
        }
    }
}

/// Protocol document to describe
#[derive(Clone, Copy, ValueEnum)]
pub enum SchemaKind {
    /// What the generator command receives
    Request,
    /// What the generator command must print
    Outcome,
    /// The `export` and `import` format
    Outline,
    /// The `patch` input format
    Patch,
}

/// Print a JSON schema
#[derive(Args)]
pub struct SchemaArgs {
    #[arg(value_enum, default_value = "request")]
    pub kind: SchemaKind,
}

// ============================================================================
// Handler
// ============================================================================

pub type DynGenerator = Arc<dyn FieldGenerator>;

/// Runs parsed commands against the stored workflow.
pub struct Cli {
    workflow: Workflow<DynGenerator>,
    store: WorkflowStore,
    renderer: TerminalRenderer,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize response")?;
    println!("{json}");
    Ok(())
}

fn conflict(message: impl Into<String>) -> anyhow::Error {
    OrchestratorError::Conflict {
        message: message.into(),
    }
    .into()
}

impl Cli {
    pub fn new(
        workflow: Workflow<DynGenerator>,
        store: WorkflowStore,
        renderer: TerminalRenderer,
    ) -> Self {
        Self {
            workflow,
            store,
            renderer,
        }
    }

    fn save(&self) -> Result<()> {
        self.store
            .save(&self.workflow.snapshot())
            .context("Failed to save workflow")
    }

    /// Pauses the workflow at its next checkpoint when Ctrl-C is pressed.
    fn pause_on_interrupt(&self) -> JoinHandle<()> {
        let control = self.workflow.control();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received");
                eprintln!("Pausing after the current field...");
                control.pause();
            }
        })
    }

    pub fn handle_section_command(&mut self, command: SectionCommands) -> Result<()> {
        match command {
            SectionCommands::Add(args) => self.add_section(args.into()),
            SectionCommands::Remove(args) => self.remove_section(&args.into()),
            SectionCommands::Reorder(args) => self.reorder_sections(&args.into()),
        }
    }

    pub fn handle_field_command(&mut self, command: FieldCommands) -> Result<()> {
        match command {
            FieldCommands::Add(args) => self.add_fields(args.into()),
            FieldCommands::Remove(args) => self.remove_field(&args.into()),
            FieldCommands::Edit(args) => self.update_field(args.into()),
            FieldCommands::Deps(args) => self.update_field(args.into()),
            FieldCommands::Reorder(args) => self.reorder_fields(&args.into()),
            FieldCommands::ChainHead(args) => self.set_chain_head(&args.into()),
        }
    }

    fn add_section(&mut self, params: AddSection) -> Result<()> {
        params.validate()?;
        let section = self
            .workflow
            .outline_mut()
            .add_section(params.name, params.description.unwrap_or_default());
        self.save()?;
        self.renderer.render(&CreateResult::new(section).to_string())
    }

    fn remove_section(&mut self, params: &RemoveSection) -> Result<()> {
        let removed = self
            .workflow
            .remove_section(&params.section_id, params.confirm)?;
        self.save()?;
        self.renderer.render(&DeleteResult::new(removed).to_string())
    }

    fn reorder_sections(&mut self, params: &ReorderSections) -> Result<()> {
        self.workflow
            .outline_mut()
            .reorder_sections(&params.section_ids)?;
        self.save()?;
        self.renderer
            .render(&OperationStatus::success("Sections reordered").to_string())
    }

    fn add_fields(&mut self, params: AddFields) -> Result<()> {
        let fields = self
            .workflow
            .outline_mut()
            .add_fields(&params.section_id, params.fields)?;
        self.save()?;
        self.renderer.render(&CreateResult::new(fields).to_string())
    }

    fn remove_field(&mut self, params: &RemoveField) -> Result<()> {
        let removed =
            self.workflow
                .remove_field(&params.section_id, &params.field_id, params.confirm)?;
        self.save()?;
        self.renderer.render(&DeleteResult::new(removed).to_string())
    }

    fn update_field(&mut self, params: UpdateField) -> Result<()> {
        let (field_id, update) = params.into_parts();
        let mut changes = Vec::new();
        if update.content.is_some() {
            changes.push("Content replaced".to_string());
        }
        if let Some(name) = &update.display_name {
            changes.push(format!("Display name: {name}"));
        }
        if update.description.is_some() {
            changes.push("Description updated".to_string());
        }
        if let Some(deps) = &update.depends_on {
            if deps.is_empty() {
                changes.push("Dependencies cleared".to_string());
            } else {
                let ids: Vec<&str> = deps.iter().map(FieldId::as_str).collect();
                changes.push(format!("Depends on: {}", ids.join(", ")));
            }
        }

        let updated = self.workflow.update_field(&field_id, update)?;
        self.save()?;
        self.renderer
            .render(&UpdateResult::with_changes(updated, changes).to_string())
    }

    fn reorder_fields(&mut self, params: &ReorderFields) -> Result<()> {
        self.workflow
            .outline_mut()
            .reorder_fields(&params.section_id, &params.field_ids)?;
        self.save()?;
        let message = format!("Fields of section {} reordered", params.section_id);
        self.renderer
            .render(&OperationStatus::success(message).to_string())
    }

    fn set_chain_head(&mut self, params: &SetChainHead) -> Result<()> {
        self.workflow
            .outline_mut()
            .set_chain_head(&params.field_id, params.is_chain_head)?;
        self.save()?;
        let message = if params.is_chain_head {
            format!("Field {} is now a chain head", params.field_id)
        } else {
            format!("Field {} is no longer a chain head", params.field_id)
        };
        self.renderer
            .render(&OperationStatus::success(message).to_string())
    }

    /// Renders the outline followed by the scheduler state.
    pub fn show(&self) -> Result<()> {
        let mut output = self.workflow.outline().to_string();
        output.push('\n');
        output.push_str(&SchedulerLine(self.workflow.state()).to_string());
        output.push('\n');
        if let Some(clarification) = self.workflow.pending_clarification() {
            output.push('\n');
            output.push_str(&clarification.to_string());
        }
        self.renderer.render(&output)
    }

    pub fn stale(&self) -> Result<()> {
        let stale = FieldList::new(self.workflow.outline().stale_fields(), "No stale fields.");
        let mut output = String::new();
        if !stale.is_empty() {
            output.push_str(&format!("# Stale fields ({})\n\n", stale.len()));
        }
        output.push_str(&stale.to_string());
        self.renderer.render(&output)
    }

    pub fn confirm(&mut self) -> Result<()> {
        self.workflow.outline_mut().confirm();
        self.save()?;
        self.renderer
            .render(&OperationStatus::success("Outline confirmed").to_string())
    }

    pub fn reset(&self, args: &ResetArgs) -> Result<()> {
        let completed = self.workflow.outline().progress().completed;
        if completed > 0 && !args.confirm {
            return Err(conflict(format!(
                "resetting discards {completed} completed field(s); pass --confirm"
            )));
        }
        let message = if self.store.reset()? {
            format!("Removed {}", self.store.path().display())
        } else {
            "Nothing to reset".to_string()
        };
        self.renderer
            .render(&OperationStatus::success(message).to_string())
    }

    pub fn export(&self) -> Result<()> {
        print_json(&OutlineResponse::from(self.workflow.outline()))
    }

    pub fn import(&mut self, args: &ImportArgs) -> Result<()> {
        let completed = self.workflow.outline().progress().completed;
        if completed > 0 && !args.confirm {
            return Err(conflict(format!(
                "importing replaces {completed} completed field(s); pass --confirm"
            )));
        }
        let json = fs::read_to_string(&args.file)
            .with_context(|| format!("Failed to read {}", args.file.display()))?;
        let response: OutlineResponse = serde_json::from_str(&json)
            .with_context(|| format!("Invalid outline in {}", args.file.display()))?;
        let outline = Outline::try_from(response)?;
        let (sections, fields) = (outline.sections().len(), outline.field_count());

        // The previous clarification refers to the replaced outline.
        self.workflow = WorkflowBuilder::new()
            .with_id(self.workflow.id().clone())
            .with_outline(outline)
            .build(Arc::clone(self.workflow.generator()))?;
        self.save()?;
        info!("Imported outline from {}", args.file.display());

        let message = format!("Imported {sections} section(s) with {fields} field(s)");
        self.renderer
            .render(&OperationStatus::success(message).to_string())
    }

    pub fn patch(&mut self, args: &PatchArgs) -> Result<()> {
        let json = fs::read_to_string(&args.file)
            .with_context(|| format!("Failed to read {}", args.file.display()))?;
        let request: PatchOutlineRequest = serde_json::from_str(&json)
            .with_context(|| format!("Invalid patch in {}", args.file.display()))?;
        if &request.workflow_id != self.workflow.id() {
            bail!(
                "Patch targets workflow '{}' but the open workflow is '{}'",
                request.workflow_id,
                self.workflow.id()
            );
        }

        let (patch, confirm) = request.into_patch();
        let summary = self
            .workflow
            .apply_patch(patch, confirm, args.allow_destructive)?;
        self.save()?;
        self.renderer.render(&summary.to_string())
    }

    pub async fn generate(&mut self, args: &GenerateArgs) -> Result<()> {
        let watcher = self.pause_on_interrupt();
        let output = if args.step {
            let result = self.workflow.generate_next().await;
            watcher.abort();
            self.save()?;
            let outcome = result?;
            if args.json {
                let pending = self.workflow.outline().pending_count();
                return print_json(&GenerateNextResponse::from_step(&outcome, pending));
            }
            outcome.to_string()
        } else {
            let result = self.workflow.run().await;
            watcher.abort();
            self.save()?;
            let report = result?;
            if args.json {
                return print_json(&GenerateNextResponse::from(&report));
            }
            report.to_string()
        };
        self.renderer.render(&output)
    }

    pub async fn answer(&mut self, params: SubmitAnswer, json: bool) -> Result<()> {
        let watcher = self.pause_on_interrupt();
        let result = self
            .workflow
            .submit_answer(&params.field_id, &params.answer)
            .await;
        watcher.abort();
        self.save()?;
        let report = result?;
        if json {
            return print_json(&GenerateNextResponse::from(&report));
        }
        self.renderer.render(&report.to_string())
    }

    pub fn skip(&mut self) -> Result<()> {
        let skipped = self.workflow.skip_clarification()?;
        self.save()?;
        let message = format!(
            "Skipped clarification for field '{}' (ID: {})",
            skipped.field_name, skipped.field_id
        );
        self.renderer
            .render(&OperationStatus::success(message).to_string())
    }

    pub async fn regenerate(&mut self, params: FieldRef, json: bool) -> Result<()> {
        let watcher = self.pause_on_interrupt();
        let result = self.workflow.regenerate_field(&params.field_id).await;
        watcher.abort();
        self.save()?;
        let report = result?;
        if json {
            return print_json(&RegenerateFieldResponse::from(&report));
        }
        self.renderer.render(&report.to_string())
    }

    pub async fn chain(&mut self, params: RegenerateChain, json: bool) -> Result<()> {
        let watcher = self.pause_on_interrupt();
        let result = self
            .workflow
            .regenerate_chain(&params.head_id, params.confirm)
            .await;
        watcher.abort();
        self.save()?;
        let report = result?;
        if json {
            return print_json(&RegenerateChainResponse::from(&report));
        }
        self.renderer.render(&report.to_string())
    }
}

/// Prints the JSON schema for one protocol document.
pub fn print_schema(args: &SchemaArgs) -> Result<()> {
    match args.kind {
        SchemaKind::Request => print_json(&schemars::schema_for!(GenerationRequest)),
        SchemaKind::Outcome => print_json(&schemars::schema_for!(GenerationOutcome)),
        SchemaKind::Outline => print_json(&schemars::schema_for!(OutlineResponse)),
        SchemaKind::Patch => print_json(&schemars::schema_for!(PatchOutlineRequest)),
    }
}

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::cli::{
    AnswerArgs, ChainArgs, FieldCommands, GenerateArgs, ImportArgs, PatchArgs, RegenerateArgs,
    ResetArgs, SchemaArgs, SectionCommands,
};

/// Main command-line interface for the Draftloom outline generator
///
/// Draftloom fills a document outline one field at a time, feeding each
/// field the content of the fields it depends on. Editing a field marks
/// everything downstream of it stale; chains can then be regenerated in one
/// go. Generation is delegated to an external command that speaks JSON on
/// stdin and stdout.
#[derive(Parser)]
#[command(version, about, name = "dl")]
pub struct Args {
    /// Path to the workflow file. Defaults to
    /// $XDG_DATA_HOME/draftloom/workflow.json
    #[arg(long, global = true)]
    pub workflow_file: Option<PathBuf>,

    /// Disable colored output and use plain text
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Command that generates one field per invocation
    #[arg(long, global = true, env = "DRAFTLOOM_GENERATOR")]
    pub generator: Option<String>,

    /// Seconds to wait for the generator command before giving up
    #[arg(long, global = true, default_value_t = 300)]
    pub timeout_secs: u64,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands for the Draftloom CLI
///
/// Commands fall into three groups:
/// - outline editing: `section`, `field`, `confirm`, `import`, `patch`
/// - inspection: `show`, `stale`, `export`, `schema`
/// - generation: `generate`, `answer`, `skip`, `regenerate`, `chain`
#[derive(Subcommand)]
pub enum Commands {
    /// Manage sections
    #[command(alias = "s")]
    Section {
        #[command(subcommand)]
        command: SectionCommands,
    },
    /// Manage fields within sections
    #[command(alias = "f")]
    Field {
        #[command(subcommand)]
        command: FieldCommands,
    },
    /// Show the outline with field status and content
    Show,
    /// List fields whose upstream content changed
    Stale,
    /// Mark the outline as confirmed
    Confirm,
    /// Discard the workflow file and start over
    Reset(ResetArgs),
    /// Replace the outline with one read from a JSON file
    Import(ImportArgs),
    /// Apply an outline patch read from a JSON file
    Patch(PatchArgs),
    /// Print the outline as JSON
    Export,
    /// Generate pending fields in document order
    #[command(alias = "g")]
    Generate(GenerateArgs),
    /// Answer the pending clarification question and continue
    Answer(AnswerArgs),
    /// Drop the pending clarification question
    Skip,
    /// Regenerate a single field
    Regenerate(RegenerateArgs),
    /// Regenerate a field and everything that depends on it
    Chain(ChainArgs),
    /// Print the JSON schema of the generator protocol
    Schema(SchemaArgs),
}

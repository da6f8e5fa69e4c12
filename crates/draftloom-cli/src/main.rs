//! Draftloom CLI Application
//!
//! Command-line shell around the orchestrator: edits the outline stored in
//! the workflow file and drives generation through an external command.

mod args;
mod cli;
mod generator;
mod renderer;
mod store;

use std::sync::Arc;

use anyhow::{Context, Result};
use args::{Args, Commands};
use clap::Parser;
use cli::{print_schema, Cli, DynGenerator};
use draftloom_core::WorkflowBuilder;
use generator::{CommandGenerator, Unconfigured};
use log::info;
use renderer::TerminalRenderer;
use store::WorkflowStore;
use Commands::*;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let Args {
        workflow_file,
        no_color,
        generator,
        timeout_secs,
        command,
    } = Args::parse();

    if let Some(Schema(args)) = &command {
        return print_schema(args);
    }

    let store = WorkflowStore::open(workflow_file)?;
    let generator: DynGenerator = match generator {
        Some(command) => Arc::new(CommandGenerator::new(command, timeout_secs)),
        None => Arc::new(Unconfigured),
    };
    let builder = match store.load()? {
        Some(snapshot) => WorkflowBuilder::new().with_snapshot(snapshot),
        None => WorkflowBuilder::new(),
    };
    let workflow = builder
        .build(generator)
        .with_context(|| format!("Failed to open workflow {}", store.path().display()))?;

    let renderer = TerminalRenderer::new(!no_color);

    info!("Draftloom started with {}", store.path().display());

    let mut cli = Cli::new(workflow, store, renderer);
    match command {
        Some(Section { command }) => cli.handle_section_command(command),
        Some(Field { command }) => cli.handle_field_command(command),
        Some(Show) | None => cli.show(),
        Some(Stale) => cli.stale(),
        Some(Confirm) => cli.confirm(),
        Some(Reset(args)) => cli.reset(&args),
        Some(Import(args)) => cli.import(&args),
        Some(Patch(args)) => cli.patch(&args),
        Some(Export) => cli.export(),
        Some(Generate(args)) => cli.generate(&args).await,
        Some(Answer(args)) => {
            let json = args.json;
            cli.answer(args.into(), json).await
        }
        Some(Skip) => cli.skip(),
        Some(Regenerate(args)) => {
            let json = args.json;
            cli.regenerate(args.into(), json).await
        }
        Some(Chain(args)) => {
            let json = args.json;
            cli.chain(args.into(), json).await
        }
        Some(Schema(args)) => print_schema(&args),
    }
}

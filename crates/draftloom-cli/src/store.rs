//! Workflow file persistence
//!
//! The shell keeps one workflow per file as a pretty-printed
//! [`WorkflowSnapshot`]. Writes go to a sibling temp file first and are then
//! renamed over the target so an interrupted save never truncates it.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use draftloom_core::WorkflowSnapshot;
use log::debug;

/// Location of the workflow file.
#[derive(Debug, Clone)]
pub struct WorkflowStore {
    path: PathBuf,
}

impl WorkflowStore {
    /// Uses `path`, or `$XDG_DATA_HOME/draftloom/workflow.json` when unset.
    pub fn open(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => xdg::BaseDirectories::with_prefix("draftloom")
                .place_data_file("workflow.json")
                .context("Failed to resolve XDG data directory")?,
        };
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored snapshot, or `None` when no file exists yet.
    pub fn load(&self) -> Result<Option<WorkflowSnapshot>> {
        if !self.path.exists() {
            debug!("No workflow file at {}", self.path.display());
            return Ok(None);
        }
        let json = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let snapshot = WorkflowSnapshot::from_json(&json)
            .with_context(|| format!("Invalid workflow file {}", self.path.display()))?;
        Ok(Some(snapshot))
    }

    /// Writes `snapshot`, replacing the previous file atomically.
    pub fn save(&self, snapshot: &WorkflowSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = snapshot
            .to_json()
            .context("Failed to serialize workflow")?;

        let temp = self.path.with_extension("json.tmp");
        fs::write(&temp, json).with_context(|| format!("Failed to write {}", temp.display()))?;
        fs::rename(&temp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        debug!("Saved workflow {} to {}", snapshot.workflow_id, self.path.display());
        Ok(())
    }

    /// Deletes the workflow file. Returns whether one existed.
    pub fn reset(&self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        fs::remove_file(&self.path)
            .with_context(|| format!("Failed to remove {}", self.path.display()))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use draftloom_core::{Outline, WorkflowId};
    use tempfile::TempDir;

    use super::*;

    fn snapshot() -> WorkflowSnapshot {
        let mut outline = Outline::new();
        outline.add_section("Intro", "");
        WorkflowSnapshot {
            workflow_id: WorkflowId::from("stored"),
            outline,
            pending_clarification: None,
        }
    }

    #[test]
    fn test_missing_file_loads_as_none() {
        let temp_dir = TempDir::new().unwrap();
        let store = WorkflowStore::open(Some(temp_dir.path().join("none.json"))).unwrap();
        assert!(store.load().unwrap().is_none());
        assert!(!store.reset().unwrap());
    }

    #[test]
    fn test_save_creates_parent_and_reloads() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested/dir/workflow.json");
        let store = WorkflowStore::open(Some(path.clone())).unwrap();

        store.save(&snapshot()).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
        assert_eq!(store.load().unwrap(), Some(snapshot()));

        assert!(store.reset().unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("workflow.json");
        fs::write(&path, "{not json").unwrap();
        let err = WorkflowStore::open(Some(path)).unwrap().load().unwrap_err();
        assert!(err.to_string().contains("Invalid workflow file"));
    }
}

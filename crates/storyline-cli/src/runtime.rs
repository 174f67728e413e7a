// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use std::path::PathBuf;
use storyline_app::{ImportedDocument, Workspace};
use storyline_files::StandardsLoad;
use storyline_tui::StandardsReport;

pub struct FileRuntime {
    export_path: PathBuf,
    import_path: Option<PathBuf>,
    standard_sources: Vec<PathBuf>,
}

impl FileRuntime {
    pub fn new(
        export_path: PathBuf,
        import_path: Option<PathBuf>,
        standard_sources: Vec<PathBuf>,
    ) -> Self {
        Self {
            export_path,
            import_path,
            standard_sources,
        }
    }

    /// Reads every configured standards source. Unreadable files are reported
    /// in the outcome, never as an error.
    pub fn load_standards(&self) -> Result<StandardsLoad> {
        let files = storyline_files::expand_standard_sources(&self.standard_sources)?;
        Ok(storyline_files::load_standard_files(&files))
    }
}

impl storyline_tui::AppRuntime for FileRuntime {
    fn export_document(&mut self, workspace: &Workspace) -> Result<PathBuf> {
        storyline_files::write_document(&self.export_path, workspace)?;
        Ok(self.export_path.clone())
    }

    fn import_document(&mut self) -> Result<(PathBuf, ImportedDocument)> {
        let path = self.import_path.clone().ok_or_else(|| {
            anyhow!("no import path; pass --import <path> or set [files].import_path")
        })?;
        let imported = storyline_files::read_document(&path)?;
        Ok((path, imported))
    }

    fn reload_standards(&mut self) -> Result<StandardsReport> {
        let outcome = self.load_standards()?;
        Ok(StandardsReport {
            failed: outcome.failed.len(),
            loaded: outcome
                .loaded
                .into_iter()
                .map(|standard| (standard.name, standard.paths))
                .collect(),
        })
    }
}

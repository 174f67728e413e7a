// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use storyline_app::document::{self, ImportedDocument};
use storyline_app::standards::{parse_standard_paths, standard_name_from_file_name};
use storyline_app::{LinkedDataEntry, Story, TimelineEvent, Workspace};
use tracing::{info, warn};

pub const EXPORT_FILE_NAME: &str = "patientOutput.json";
pub const EXPORT_PATH_ENV: &str = "STORYLINE_EXPORT_PATH";
const STANDARD_EXTENSION: &str = "json";

/// A standards file read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandardFile {
    pub name: String,
    pub paths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedStandard {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of loading several standards files. Failures never stop the rest
/// from loading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StandardsLoad {
    pub loaded: Vec<StandardFile>,
    pub failed: Vec<FailedStandard>,
}

pub fn read_document(path: &Path) -> Result<ImportedDocument> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read document {}", path.display()))?;
    let imported = parse_document(&raw)
        .with_context(|| format!("import document {}", path.display()))?;
    info!(
        path = %path.display(),
        rows = imported.timeline.len(),
        "document read"
    );
    Ok(imported)
}

pub fn parse_document(raw: &str) -> Result<ImportedDocument> {
    document::parse_document(raw)
}

/// Writes the workspace export to `path`, creating parent directories.
pub fn write_document(path: &Path, workspace: &Workspace) -> Result<()> {
    let json = workspace.export_json()?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create export directory {}", parent.display()))?;
    }
    fs::write(path, json).with_context(|| format!("write document {}", path.display()))?;
    info!(
        path = %path.display(),
        rows = workspace.timeline().len(),
        "document exported"
    );
    Ok(())
}

pub fn load_standard_file(path: &Path) -> Result<StandardFile> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("standards path {} has no file name", path.display()))?;
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read standards file {}", path.display()))?;
    let paths = parse_standard_paths(&raw)
        .with_context(|| format!("parse standards file {}", path.display()))?;
    Ok(StandardFile {
        name: standard_name_from_file_name(file_name),
        paths,
    })
}

pub fn load_standard_files<P: AsRef<Path>>(paths: &[P]) -> StandardsLoad {
    let mut outcome = StandardsLoad::default();
    for path in paths {
        let path = path.as_ref();
        match load_standard_file(path) {
            Ok(standard) => {
                info!(
                    path = %path.display(),
                    standard = %standard.name,
                    paths = standard.paths.len(),
                    "standards file read"
                );
                outcome.loaded.push(standard);
            }
            Err(error) => {
                warn!(path = %path.display(), error = %format!("{error:#}"), "standards file skipped");
                outcome.failed.push(FailedStandard {
                    path: path.to_path_buf(),
                    reason: format!("{error:#}"),
                });
            }
        }
    }
    outcome
}

/// The `*.json` files directly inside `dir`, sorted by path.
pub fn standard_files_in_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in
        fs::read_dir(dir).with_context(|| format!("read standards dir {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_file()
            && path
                .extension()
                .is_some_and(|extension| extension == STANDARD_EXTENSION)
        {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Expands each directory into its standards files; plain files pass through.
pub fn expand_standard_sources<P: AsRef<Path>>(sources: &[P]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for source in sources {
        let source = source.as_ref();
        if source.is_dir() {
            files.extend(standard_files_in_dir(source)?);
        } else {
            files.push(source.to_path_buf());
        }
    }
    Ok(files)
}

pub fn default_export_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os(EXPORT_PATH_ENV) {
        return Ok(PathBuf::from(override_path));
    }

    let root = dirs::document_dir().or_else(dirs::home_dir).ok_or_else(|| {
        anyhow!("cannot resolve a documents directory; set {EXPORT_PATH_ENV} to an export file path")
    })?;
    Ok(root.join(EXPORT_FILE_NAME))
}

/// Checks a path given for importing or exporting the story document. The
/// document is read and written with plain file I/O, so URIs and directory
/// paths are refused before any file is touched.
pub fn validate_document_path(path: &str) -> Result<()> {
    if path.trim().is_empty() {
        bail!("story document path is empty; give the JSON file to import from or export to");
    }

    if let Some(scheme) = uri_scheme(path) {
        bail!(
            "story document path {path:?} looks like a URI ({scheme}); \
             import or export a local JSON file instead"
        );
    }

    if path.ends_with('/') || path.ends_with(std::path::MAIN_SEPARATOR) {
        bail!(
            "story document path {path:?} names a directory; \
             add a file name such as {EXPORT_FILE_NAME}"
        );
    }

    Ok(())
}

/// Checks any other local path the tool reads or writes, such as the
/// standards directory or the log file. `what` names it in the message.
pub fn validate_local_path(what: &str, path: &str) -> Result<()> {
    if path.trim().is_empty() {
        bail!("{what} path is empty");
    }
    if let Some(scheme) = uri_scheme(path) {
        bail!("{what} path {path:?} looks like a URI ({scheme}); pass a local filesystem path");
    }
    Ok(())
}

/// `scheme://` or `file:` prefix of a URI-shaped path.
fn uri_scheme(path: &str) -> Option<&str> {
    if let Some(index) = path.find("://")
        && index > 0
        && path[..index].chars().all(char::is_alphabetic)
    {
        return Some(&path[..index + 3]);
    }
    path.starts_with("file:").then(|| &path[..5])
}

/// A small emergency-department story used by `--demo`.
pub fn demo_document() -> ImportedDocument {
    ImportedDocument {
        story: Story {
            summary: "Adult with acute chest pain".to_owned(),
            rationale: "Exercises vital signs, ECG findings and troponin results".to_owned(),
            story: "A 58 year old arrives at the emergency department with crushing chest \
                    pain radiating to the left arm."
                .to_owned(),
        },
        timeline: vec![
            TimelineEvent {
                time: "08:02".to_owned(),
                event: "Arrival at ED".to_owned(),
                standard: Some("FHIR".to_owned()),
                linked_data: vec![
                    LinkedDataEntry::new("Encounter.period.start", "2026-03-14T08:02:00Z"),
                    LinkedDataEntry::new("Encounter.class.code", "EMER"),
                ],
            },
            TimelineEvent {
                time: "08:10".to_owned(),
                event: "12-lead ECG".to_owned(),
                standard: Some("FHIR".to_owned()),
                linked_data: vec![LinkedDataEntry::new(
                    "Observation.component[].valueString",
                    "ST elevation V2-V4",
                )],
            },
            TimelineEvent {
                time: "08:25".to_owned(),
                event: "Troponin drawn".to_owned(),
                standard: None,
                linked_data: Vec::new(),
            },
        ],
    }
}

pub fn demo_standards() -> Vec<StandardFile> {
    vec![
        StandardFile {
            name: "FHIR".to_owned(),
            paths: [
                "Encounter.period.start",
                "Encounter.class.code",
                "Observation.code.coding[].code",
                "Observation.component[].valueString",
                "Observation.valueQuantity.value",
                "Patient.name[].given[]",
            ]
            .map(str::to_owned)
            .to_vec(),
        },
        StandardFile {
            name: "openEHR".to_owned(),
            paths: [
                "content[].data.events[].data.items[].value",
                "context.start_time",
            ]
            .map(str::to_owned)
            .to_vec(),
        },
    ]
}

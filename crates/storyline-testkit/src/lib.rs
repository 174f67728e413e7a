// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use storyline_app::{
    LinkedDataEntry, StoryField, TimelineField, TimelineId, Workspace, WorkspaceCommand,
    WorkspaceEvent,
};

/// A complete export document with two timeline events, one of them linked.
pub fn sample_document_value() -> Value {
    json!({
        "summary": "Sepsis in the ward",
        "rationale": "Early warning score escalation",
        "story": "Post-operative patient develops fever and tachycardia overnight.",
        "timeline": [
            {
                "time": "22:00",
                "event": "Observations recorded",
                "standard": "FHIR",
                "linked_data": [
                    {"dataPath": "Observation.code.coding[0].code", "exampleData": "8867-4"},
                    {"dataPath": "Observation.valueQuantity.value", "exampleData": "118"}
                ]
            },
            {
                "time": "22:15",
                "event": "Escalated to registrar",
                "standard": null,
                "linked_data": []
            }
        ]
    })
}

pub fn sample_document_json() -> String {
    sample_document_value().to_string()
}

pub fn sample_standards() -> Vec<(&'static str, Value)> {
    vec![
        (
            "FHIR.json",
            json!([
                "Observation.code.coding[].code",
                "Observation.valueQuantity.value",
                "",
                "Encounter.period.start"
            ]),
        ),
        ("LOINC.json", json!(["8867-4", "8310-5", null])),
    ]
}

/// Writes `contents` to `dir/name` and returns the file path.
pub fn write_file(dir: &Path, name: &str, contents: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, contents).with_context(|| format!("write fixture {}", path.display()))?;
    Ok(path)
}

/// A temp directory holding [`sample_standards`] plus one unreadable entry.
pub fn temp_standards_dir() -> Result<(tempfile::TempDir, Vec<PathBuf>)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let mut files = Vec::new();
    for (name, contents) in sample_standards() {
        files.push(write_file(dir.path(), name, &contents.to_string())?);
    }
    write_file(dir.path(), "notes.txt", "not a standard")?;
    Ok((dir, files))
}

pub fn temp_document_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let path = dir.path().join("patientOutput.json");
    Ok((dir, path))
}

/// A workspace with the FHIR standard loaded, a story, and one linked row.
pub fn populated_workspace() -> (Workspace, TimelineId) {
    let mut workspace = Workspace::new();
    workspace.dispatch(WorkspaceCommand::LoadStandard {
        name: "FHIR".to_owned(),
        paths: vec!["Observation.component[].code".to_owned()],
    });
    workspace.dispatch(WorkspaceCommand::SetStoryField {
        field: StoryField::Summary,
        value: "Fall at home".to_owned(),
    });

    let id = workspace
        .dispatch(WorkspaceCommand::AddTimelineRow)
        .into_iter()
        .find_map(|event| match event {
            WorkspaceEvent::TimelineRowAdded(id) => Some(id),
            _ => None,
        })
        .expect("adding a row reports its id");
    workspace.dispatch(WorkspaceCommand::SetTimelineField {
        id,
        field: TimelineField::Event,
        value: "Paramedics arrive".to_owned(),
    });
    workspace.dispatch(WorkspaceCommand::ToggleLinkedData(id));
    workspace.dispatch(WorkspaceCommand::AddLinkedRow);
    workspace.dispatch(WorkspaceCommand::SetLinkedPath {
        index: 0,
        value: sample_entry().data_path,
    });
    workspace.dispatch(WorkspaceCommand::SetLinkedExample {
        index: 0,
        value: sample_entry().example_data,
    });
    workspace.dispatch(WorkspaceCommand::CloseLinkedData);
    (workspace, id)
}

pub fn sample_entry() -> LinkedDataEntry {
    LinkedDataEntry::new("Encounter.period.start", "2026-01-05T10:00:00Z")
}

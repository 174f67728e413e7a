// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use serde_json::Value;
use tracing::{debug, info};

use crate::document::{self, ImportedDocument};
use crate::{
    EditorEvent, LinkedDataEditor, PathReport, SheetRow, StandardsCatalog, Story, StoryField,
    TimelineField, TimelineId, TimelineStore, timeline_path_reports,
};

/// Everything the user edits in one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workspace {
    story: Story,
    timeline: TimelineStore,
    standards: StandardsCatalog,
    editor: LinkedDataEditor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceCommand {
    SetStoryField { field: StoryField, value: String },
    AddTimelineRow,
    SetTimelineField {
        id: TimelineId,
        field: TimelineField,
        value: String,
    },
    DeleteTimelineRow(TimelineId),
    ToggleLinkedData(TimelineId),
    CloseLinkedData,
    BlurLinkedData,
    ResetLinkedData,
    AddLinkedRow,
    DeleteLinkedRow(usize),
    SetLinkedPath { index: usize, value: String },
    SetLinkedExample { index: usize, value: String },
    SelectStandard(Option<String>),
    CycleStandard(isize),
    SetPlaceholder { index: usize, value: String },
    FocusNextPlaceholder,
    FocusPrevPlaceholder,
    ClosePopup,
    ImportDocument(ImportedDocument),
    LoadStandard { name: String, paths: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceEvent {
    StoryChanged(StoryField),
    TimelineRowAdded(TimelineId),
    TimelineRowChanged(TimelineId),
    TimelineRowDeleted(TimelineId),
    Editor(EditorEvent),
    StandardLoaded { name: String, paths: usize },
    DocumentImported { rows: usize },
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn story(&self) -> &Story {
        &self.story
    }

    pub fn timeline(&self) -> &TimelineStore {
        &self.timeline
    }

    pub fn standards(&self) -> &StandardsCatalog {
        &self.standards
    }

    pub fn editor(&self) -> &LinkedDataEditor {
        &self.editor
    }

    pub fn dispatch(&mut self, command: WorkspaceCommand) -> Vec<WorkspaceEvent> {
        match command {
            WorkspaceCommand::SetStoryField { field, value } => {
                self.story.set(field, value);
                vec![WorkspaceEvent::StoryChanged(field)]
            }
            WorkspaceCommand::AddTimelineRow => {
                let id = self.timeline.create();
                debug!(row = %id, "timeline row added");
                vec![WorkspaceEvent::TimelineRowAdded(id)]
            }
            WorkspaceCommand::SetTimelineField { id, field, value } => {
                if self.timeline.update(id, field, value) {
                    vec![WorkspaceEvent::TimelineRowChanged(id)]
                } else {
                    debug!(row = %id, field = field.as_str(), "update of missing timeline row ignored");
                    Vec::new()
                }
            }
            WorkspaceCommand::DeleteTimelineRow(id) => self.delete_timeline_row(id),
            WorkspaceCommand::ToggleLinkedData(id) => {
                let events = self
                    .editor
                    .toggle(id, &mut self.timeline, &self.standards);
                editor_events(events)
            }
            WorkspaceCommand::CloseLinkedData => editor_events(self.editor.close(&mut self.timeline)),
            WorkspaceCommand::BlurLinkedData => editor_events(self.editor.blur(&mut self.timeline)),
            WorkspaceCommand::ResetLinkedData => editor_events(self.editor.reset(&mut self.timeline)),
            WorkspaceCommand::AddLinkedRow => {
                editor_events(self.editor.add_row(&self.standards))
            }
            WorkspaceCommand::DeleteLinkedRow(index) => {
                editor_events(self.editor.delete_row(index, &mut self.timeline))
            }
            WorkspaceCommand::SetLinkedPath { index, value } => {
                editor_events(self.editor.set_path_input(index, value))
            }
            WorkspaceCommand::SetLinkedExample { index, value } => {
                self.editor.set_example_data(index, value);
                Vec::new()
            }
            WorkspaceCommand::SelectStandard(name) => editor_events(self.editor.select_standard(
                name,
                &self.standards,
                &mut self.timeline,
            )),
            WorkspaceCommand::CycleStandard(delta) => {
                let Some(next) = self
                    .standards
                    .cycle(self.editor.selected_standard(), delta)
                    .map(str::to_owned)
                else {
                    debug!("no standards loaded to cycle through");
                    return Vec::new();
                };
                editor_events(self.editor.select_standard(
                    Some(next),
                    &self.standards,
                    &mut self.timeline,
                ))
            }
            WorkspaceCommand::SetPlaceholder { index, value } => {
                self.editor.set_placeholder(index, value);
                Vec::new()
            }
            WorkspaceCommand::FocusNextPlaceholder => {
                self.editor.popup_focus_next();
                Vec::new()
            }
            WorkspaceCommand::FocusPrevPlaceholder => {
                self.editor.popup_focus_prev();
                Vec::new()
            }
            WorkspaceCommand::ClosePopup => editor_events(self.editor.close_popup()),
            WorkspaceCommand::ImportDocument(imported) => self.import(imported),
            WorkspaceCommand::LoadStandard { name, paths } => {
                self.standards.insert(name.clone(), paths);
                self.editor.sync_catalog(&self.standards);
                let paths = self.standards.paths_for(Some(&name)).len();
                info!(standard = %name, paths, "standard loaded");
                vec![WorkspaceEvent::StandardLoaded { name, paths }]
            }
        }
    }

    pub fn export_json(&self) -> Result<String> {
        document::export_json(&self.story, &self.timeline)
    }

    pub fn export_value(&self) -> Result<Value> {
        document::export_value(&self.story, &self.timeline)
    }

    pub fn sheet_rows(&self) -> Vec<SheetRow> {
        self.timeline.sheet_rows()
    }

    /// Rows whose linked data has unresolved, unknown or repeated paths.
    pub fn path_reports(&self) -> Vec<(TimelineId, PathReport)> {
        timeline_path_reports(&self.timeline, &self.standards)
    }

    /// Live JSON of the story fields, as shown in the debug panel.
    pub fn story_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.story)?)
    }

    /// Live JSON of the timeline keyed by row id.
    pub fn timeline_json(&self) -> Result<String> {
        let rows: serde_json::Map<String, Value> = self
            .timeline
            .iter()
            .map(|(id, event)| -> Result<(String, Value)> {
                Ok((id.to_string(), serde_json::to_value(event)?))
            })
            .collect::<Result<_>>()?;
        Ok(serde_json::to_string_pretty(&rows)?)
    }

    fn delete_timeline_row(&mut self, id: TimelineId) -> Vec<WorkspaceEvent> {
        let mut events = Vec::new();
        if self.editor.current_row() == Some(id) {
            events.extend(self.editor.abandon().map(WorkspaceEvent::Editor));
        }
        if self.timeline.delete(id).is_some() {
            debug!(row = %id, "timeline row deleted");
            events.push(WorkspaceEvent::TimelineRowDeleted(id));
        }
        events
    }

    fn import(&mut self, imported: ImportedDocument) -> Vec<WorkspaceEvent> {
        let mut events: Vec<WorkspaceEvent> =
            self.editor.abandon().map(WorkspaceEvent::Editor).into_iter().collect();
        self.story = imported.story;
        let rows = imported.timeline.len();
        self.timeline.replace_all(imported.timeline);
        info!(rows, "document imported");
        events.push(WorkspaceEvent::DocumentImported { rows });
        events
    }
}

fn editor_events(events: impl IntoIterator<Item = EditorEvent>) -> Vec<WorkspaceEvent> {
    events.into_iter().map(WorkspaceEvent::Editor).collect()
}

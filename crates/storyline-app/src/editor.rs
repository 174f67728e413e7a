// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! The linked-data editor: a two-state machine bound to at most one timeline
//! event at a time.
//!
//! While open it keeps a working copy of the event's entries. Every commit
//! (blur, standard change, close, row delete) writes the whole working table
//! back to the [`TimelineStore`] together with the selected standard. Reset is
//! the only way out that skips the commit.

use tracing::debug;

use crate::bracket::BracketPopup;
use crate::{LinkedDataEntry, StandardsCatalog, TimelineId, TimelineStore};

/// One editable row of the working table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkingRow {
    /// Raw text of the path input.
    pub input: String,
    /// Path resolved through the placeholder popup, pending the next commit.
    pub edited_path: Option<String>,
    pub example_data: String,
    pub suggestions: Vec<String>,
}

impl WorkingRow {
    fn from_entry(entry: &LinkedDataEntry, suggestions: &[String]) -> Self {
        Self {
            input: entry.data_path.clone(),
            edited_path: None,
            example_data: entry.example_data.clone(),
            suggestions: suggestions.to_vec(),
        }
    }

    /// The path a commit would store for this row.
    pub fn resolved_path(&self) -> &str {
        self.edited_path.as_deref().unwrap_or(&self.input)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenSession {
    row_id: TimelineId,
    rows: Vec<WorkingRow>,
    popup: Option<BracketPopup>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EditorState {
    #[default]
    Closed,
    Open(OpenSession),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
    Opened(TimelineId),
    Committed(TimelineId),
    Closed(TimelineId),
    Reset(TimelineId),
    RowAdded { index: usize },
    RowDeleted { index: usize },
    PopupOpened { row: usize, placeholders: usize },
    PathAccepted { row: usize },
    PopupClosed { row: usize, resolved: String },
    StandardSelected(Option<String>),
}

/// Read-only view of an open editor for renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditorView<'a> {
    pub row_id: TimelineId,
    pub standard: Option<&'a str>,
    pub rows: &'a [WorkingRow],
    pub popup: Option<&'a BracketPopup>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkedDataEditor {
    state: EditorState,
    selected_standard: Option<String>,
}

impl LinkedDataEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn current_row(&self) -> Option<TimelineId> {
        match &self.state {
            EditorState::Open(session) => Some(session.row_id),
            EditorState::Closed => None,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, EditorState::Open(_))
    }

    pub fn popup(&self) -> Option<&BracketPopup> {
        match &self.state {
            EditorState::Open(session) => session.popup.as_ref(),
            EditorState::Closed => None,
        }
    }

    pub fn selected_standard(&self) -> Option<&str> {
        self.selected_standard.as_deref()
    }

    pub fn view(&self) -> Option<EditorView<'_>> {
        match &self.state {
            EditorState::Open(session) => Some(EditorView {
                row_id: session.row_id,
                standard: self.selected_standard.as_deref(),
                rows: &session.rows,
                popup: session.popup.as_ref(),
            }),
            EditorState::Closed => None,
        }
    }

    /// Opens the editor on `id`. Any other open row is committed and closed
    /// first. The dropdown selection keeps its value when the row has no
    /// standard; rows added afterwards suggest from that selection.
    pub fn toggle(
        &mut self,
        id: TimelineId,
        store: &mut TimelineStore,
        catalog: &StandardsCatalog,
    ) -> Vec<EditorEvent> {
        if !store.contains(id) {
            debug!(row = %id, "toggle on missing timeline row ignored");
            return Vec::new();
        }
        let mut events = self.close(store);
        let Some(event) = store.get(id) else {
            return events;
        };
        if let Some(standard) = &event.standard {
            self.selected_standard = Some(standard.clone());
        }
        // Stored rows suggest from the row's own standard, so a row without
        // one opens with empty suggestion lists.
        let suggestions = catalog.paths_for(event.standard.as_deref());
        let rows = event
            .linked_data
            .iter()
            .map(|entry| WorkingRow::from_entry(entry, suggestions))
            .collect();

        self.state = EditorState::Open(OpenSession {
            row_id: id,
            rows,
            popup: None,
        });
        events.push(EditorEvent::Opened(id));
        events
    }

    /// Writes the working table back to the bound event.
    pub fn commit(&mut self, store: &mut TimelineStore) -> Option<EditorEvent> {
        let EditorState::Open(session) = &mut self.state else {
            debug!("commit without an open row ignored");
            return None;
        };
        let entries = session
            .rows
            .iter()
            .map(|row| LinkedDataEntry::new(row.resolved_path(), row.example_data.clone()))
            .collect();
        if !store.replace_linked_data(session.row_id, entries, self.selected_standard.clone()) {
            debug!(row = %session.row_id, "commit target no longer exists");
            return None;
        }
        for row in &mut session.rows {
            if let Some(path) = row.edited_path.take() {
                row.input = path;
            }
        }
        debug!(row = %session.row_id, entries = session.rows.len(), "linked data committed");
        Some(EditorEvent::Committed(session.row_id))
    }

    pub fn blur(&mut self, store: &mut TimelineStore) -> Vec<EditorEvent> {
        self.commit(store).into_iter().collect()
    }

    pub fn standard_changed(&mut self, store: &mut TimelineStore) -> Vec<EditorEvent> {
        self.commit(store).into_iter().collect()
    }

    /// Commits and closes.
    pub fn close(&mut self, store: &mut TimelineStore) -> Vec<EditorEvent> {
        let Some(id) = self.current_row() else {
            return Vec::new();
        };
        let mut events: Vec<EditorEvent> = self.commit(store).into_iter().collect();
        self.state = EditorState::Closed;
        events.push(EditorEvent::Closed(id));
        events
    }

    /// Clears the bound event's linked data and standard and closes without
    /// committing the working table.
    pub fn reset(&mut self, store: &mut TimelineStore) -> Vec<EditorEvent> {
        let Some(id) = self.current_row() else {
            debug!("reset without an open row ignored");
            return Vec::new();
        };
        store.reset_linked_data(id);
        self.state = EditorState::Closed;
        vec![EditorEvent::Reset(id), EditorEvent::Closed(id)]
    }

    /// Closes without touching the store. Used when the bound row is deleted.
    pub fn abandon(&mut self) -> Option<EditorEvent> {
        let id = self.current_row()?;
        self.state = EditorState::Closed;
        Some(EditorEvent::Closed(id))
    }

    pub fn add_row(&mut self, catalog: &StandardsCatalog) -> Option<EditorEvent> {
        let suggestions = catalog
            .paths_for(self.selected_standard.as_deref())
            .to_vec();
        let EditorState::Open(session) = &mut self.state else {
            debug!("add row without an open row ignored");
            return None;
        };
        session.rows.push(WorkingRow {
            suggestions,
            ..WorkingRow::default()
        });
        Some(EditorEvent::RowAdded {
            index: session.rows.len() - 1,
        })
    }

    /// Removes working row `index`, splices the same index out of the stored
    /// entries right away, then commits.
    pub fn delete_row(&mut self, index: usize, store: &mut TimelineStore) -> Vec<EditorEvent> {
        let EditorState::Open(session) = &mut self.state else {
            debug!(index, "delete row without an open row ignored");
            return Vec::new();
        };
        if index >= session.rows.len() {
            debug!(index, rows = session.rows.len(), "delete of stale linked-data row ignored");
            return Vec::new();
        }
        session.rows.remove(index);
        store.remove_linked_entry(session.row_id, index);
        match session.popup.as_ref().map(BracketPopup::target_row) {
            Some(target) if target == index => session.popup = None,
            Some(target) if target > index => {
                if let Some(popup) = &mut session.popup {
                    popup.retarget(target - 1);
                }
            }
            _ => {}
        }

        let mut events = vec![EditorEvent::RowDeleted { index }];
        events.extend(self.commit(store));
        events
    }

    /// Sets the raw path text of row `index`. A value holding a bracket pair
    /// opens the placeholder popup for that row.
    pub fn set_path_input(&mut self, index: usize, value: impl Into<String>) -> Vec<EditorEvent> {
        let EditorState::Open(session) = &mut self.state else {
            debug!(index, "path input without an open row ignored");
            return Vec::new();
        };
        let Some(row) = session.rows.get_mut(index) else {
            debug!(index, "path input on stale linked-data row ignored");
            return Vec::new();
        };
        row.input = value.into();
        row.edited_path = None;

        match BracketPopup::open(index, &row.input) {
            Some(popup) => {
                let placeholders = popup.inputs().len();
                session.popup = Some(popup);
                vec![EditorEvent::PopupOpened {
                    row: index,
                    placeholders,
                }]
            }
            None => vec![EditorEvent::PathAccepted { row: index }],
        }
    }

    pub fn set_example_data(&mut self, index: usize, value: impl Into<String>) -> bool {
        let EditorState::Open(session) = &mut self.state else {
            return false;
        };
        match session.rows.get_mut(index) {
            Some(row) => {
                row.example_data = value.into();
                true
            }
            None => false,
        }
    }

    pub fn set_placeholder(&mut self, index: usize, value: impl Into<String>) -> bool {
        match self.popup_mut() {
            Some(popup) => popup.set_input(index, value),
            None => false,
        }
    }

    pub fn popup_focus_next(&mut self) {
        if let Some(popup) = self.popup_mut() {
            popup.focus_next();
        }
    }

    pub fn popup_focus_prev(&mut self) {
        if let Some(popup) = self.popup_mut() {
            popup.focus_prev();
        }
    }

    /// Resolves the target row's current input against the placeholder values
    /// and stashes the result as the row's edited path.
    pub fn close_popup(&mut self) -> Option<EditorEvent> {
        let EditorState::Open(session) = &mut self.state else {
            return None;
        };
        let popup = session.popup.take()?;
        let row_index = popup.target_row();
        let Some(row) = session.rows.get_mut(row_index) else {
            debug!(row = row_index, "popup target row no longer exists");
            return None;
        };
        let resolved = popup.resolve(&row.input);
        row.edited_path = Some(resolved.clone());
        Some(EditorEvent::PopupClosed {
            row: row_index,
            resolved,
        })
    }

    /// Selects the active standard, refreshes every row's suggestions, and
    /// commits when a row is open.
    pub fn select_standard(
        &mut self,
        name: Option<String>,
        catalog: &StandardsCatalog,
        store: &mut TimelineStore,
    ) -> Vec<EditorEvent> {
        self.selected_standard = name;
        self.refresh_suggestions(catalog);
        let mut events = vec![EditorEvent::StandardSelected(self.selected_standard.clone())];
        events.extend(self.standard_changed(store));
        events
    }

    /// Keeps the selection valid after the catalog changes and rebuilds the
    /// suggestion lists of the open rows.
    pub fn sync_catalog(&mut self, catalog: &StandardsCatalog) {
        if self.selected_standard.is_none() {
            self.selected_standard = catalog.first_name().map(str::to_owned);
        }
        self.refresh_suggestions(catalog);
    }

    fn refresh_suggestions(&mut self, catalog: &StandardsCatalog) {
        let paths = catalog.paths_for(self.selected_standard.as_deref());
        if let EditorState::Open(session) = &mut self.state {
            for row in &mut session.rows {
                row.suggestions = paths.to_vec();
            }
        }
    }

    fn popup_mut(&mut self) -> Option<&mut BracketPopup> {
        match &mut self.state {
            EditorState::Open(session) => session.popup.as_mut(),
            EditorState::Closed => None,
        }
    }
}

// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Tabs, Wrap};
use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use storyline_app::bracket::{BracketPopup, TemplateSegment, template_segments};
use storyline_app::{
    AppCommand, AppEvent, AppMode, AppState, EditorEvent, EditorView, ImportedDocument,
    JsonPanel, PaneKind, PathReport, StandardsCatalog, StoryField, TimelineEvent, TimelineField,
    TimelineId, Workspace, WorkspaceCommand, WorkspaceEvent,
};
use tracing::{debug, warn};

const STORY_COLUMNS: [&str; 2] = ["field", "value"];
const TIMELINE_COLUMNS: [&str; 5] = ["id", "time", "event", "standard", "linked data"];
const MODAL_COLUMNS: [&str; 3] = ["#", "data path", "example data"];
const TIMELINE_ACTION_COLUMN: usize = 4;
const MODAL_PATH_COLUMN: usize = 0;
const MODAL_EXAMPLE_COLUMN: usize = 1;
const EDIT_CARET: &str = "▏";
const RESOLVED_ARROW: &str = "→";
const STATUS_CLEAR_SECS: u64 = 4;

/// Standards read by the runtime for a reload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StandardsReport {
    pub loaded: Vec<(String, Vec<String>)>,
    pub failed: usize,
}

/// Disk and environment access the interface needs. The binary backs it with
/// real files; tests back it with memory.
pub trait AppRuntime {
    /// Writes the export document and returns where it went.
    fn export_document(&mut self, workspace: &Workspace) -> Result<PathBuf>;
    fn import_document(&mut self) -> Result<(PathBuf, ImportedDocument)>;
    fn reload_standards(&mut self) -> Result<StandardsReport>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditTarget {
    Story(StoryField),
    Timeline { id: TimelineId, field: TimelineField },
    LinkedPath { index: usize },
    LinkedExample { index: usize },
}

impl EditTarget {
    fn in_modal(self) -> bool {
        matches!(self, Self::LinkedPath { .. } | Self::LinkedExample { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CellEditor {
    target: EditTarget,
    buffer: String,
    /// Text typed before the first suggestion cycle.
    suggestion_query: Option<String>,
    suggestion_index: usize,
}

impl CellEditor {
    fn new(target: EditTarget, current: &str) -> Self {
        Self {
            target,
            buffer: current.to_owned(),
            suggestion_query: None,
            suggestion_index: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct TableCursor {
    row: usize,
    col: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct ViewData {
    story: TableCursor,
    timeline: TableCursor,
    modal: TableCursor,
    cell_editor: Option<CellEditor>,
    help_visible: bool,
    status_token: u64,
}

pub fn run_app<R: AppRuntime>(
    state: &mut AppState,
    workspace: &mut Workspace,
    runtime: &mut R,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();
    let (internal_tx, internal_rx) = mpsc::channel();

    let mut result = Ok(());
    loop {
        process_internal_events(state, &view_data, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, state, workspace, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    if handle_key_event(
                        state,
                        workspace,
                        runtime,
                        &mut view_data,
                        &internal_tx,
                        key,
                    ) {
                        break;
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events(
    state: &mut AppState,
    view_data: &ViewData,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(STATUS_CLEAR_SECS));
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.dispatch(AppCommand::SetStatus(message.into()));
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn dispatch_app(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    command: AppCommand,
) {
    let events = state.dispatch(command);
    if events
        .iter()
        .any(|event| matches!(event, AppEvent::StatusUpdated(_)))
    {
        view_data.status_token = view_data.status_token.saturating_add(1);
        schedule_status_clear(internal_tx, view_data.status_token);
    }
}

fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    workspace: &mut Workspace,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('s') => {
                export_workspace(state, workspace, runtime, view_data, internal_tx);
                return false;
            }
            KeyCode::Char('r') => {
                import_workspace(state, workspace, runtime, view_data, internal_tx);
                return false;
            }
            KeyCode::Char('l') => {
                reload_standards(state, workspace, runtime, view_data, internal_tx);
                return false;
            }
            _ => {}
        }
    }

    if view_data.help_visible {
        if key.code == KeyCode::Esc || key.code == KeyCode::Char('?') {
            view_data.help_visible = false;
            emit_status(state, view_data, internal_tx, "help hidden");
        }
        return false;
    }

    match state.mode {
        AppMode::Edit => handle_cell_edit_key(state, workspace, view_data, internal_tx, key),
        AppMode::Placeholder => handle_popup_key(state, workspace, view_data, internal_tx, key),
        AppMode::LinkedData => handle_modal_key(state, workspace, view_data, internal_tx, key),
        AppMode::Nav => handle_nav_key(state, workspace, view_data, internal_tx, key),
    }
    false
}

fn handle_nav_key(
    state: &mut AppState,
    workspace: &mut Workspace,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    match (key.code, key.modifiers) {
        (KeyCode::Tab, _) => dispatch_app(state, view_data, internal_tx, AppCommand::NextPane),
        (KeyCode::BackTab, _) => dispatch_app(state, view_data, internal_tx, AppCommand::PrevPane),
        (KeyCode::Char('1'), _) => dispatch_app(
            state,
            view_data,
            internal_tx,
            AppCommand::TogglePanel(JsonPanel::Story),
        ),
        (KeyCode::Char('2'), _) => dispatch_app(
            state,
            view_data,
            internal_tx,
            AppCommand::TogglePanel(JsonPanel::Timeline),
        ),
        (KeyCode::Char('?'), _) => {
            view_data.help_visible = true;
            emit_status(state, view_data, internal_tx, "help shown");
        }
        (KeyCode::Char('j'), _) | (KeyCode::Down, _) => move_row(state, workspace, view_data, 1),
        (KeyCode::Char('k'), _) | (KeyCode::Up, _) => move_row(state, workspace, view_data, -1),
        (KeyCode::Char('h'), _) | (KeyCode::Left, _) => move_column(state, view_data, -1),
        (KeyCode::Char('l'), _) | (KeyCode::Right, _) => move_column(state, view_data, 1),
        (KeyCode::Char('a'), _) if state.active_pane == PaneKind::Timeline => {
            let events = workspace.dispatch(WorkspaceCommand::AddTimelineRow);
            if let Some(id) = events.iter().find_map(|event| match event {
                WorkspaceEvent::TimelineRowAdded(id) => Some(*id),
                _ => None,
            }) {
                view_data.timeline.row = workspace.timeline().position(id).unwrap_or(0);
                emit_status(state, view_data, internal_tx, format!("added row {id}"));
            }
        }
        (KeyCode::Char('D'), _) if state.active_pane == PaneKind::Timeline => {
            let Some(id) = selected_timeline_id(workspace, view_data) else {
                emit_status(state, view_data, internal_tx, "no row to delete");
                return;
            };
            workspace.dispatch(WorkspaceCommand::DeleteTimelineRow(id));
            clamp_cursors(workspace, view_data);
            emit_status(state, view_data, internal_tx, format!("deleted row {id}"));
        }
        (KeyCode::Char('o'), _) if state.active_pane == PaneKind::Timeline => {
            open_linked_data(state, workspace, view_data, internal_tx);
        }
        (KeyCode::Enter, _)
            if state.active_pane == PaneKind::Timeline
                && view_data.timeline.col == TIMELINE_ACTION_COLUMN =>
        {
            open_linked_data(state, workspace, view_data, internal_tx);
        }
        (KeyCode::Char('i'), _) | (KeyCode::Enter, _) => {
            begin_table_edit(state, workspace, view_data, internal_tx);
        }
        _ => {}
    }
}

fn begin_table_edit(
    state: &mut AppState,
    workspace: &Workspace,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let target = match state.active_pane {
        PaneKind::Story => StoryField::ALL
            .get(view_data.story.row)
            .map(|field| EditTarget::Story(*field)),
        PaneKind::Timeline => {
            let field = match view_data.timeline.col {
                1 => Some(TimelineField::Time),
                2 => Some(TimelineField::Event),
                _ => None,
            };
            match (selected_timeline_id(workspace, view_data), field) {
                (Some(id), Some(field)) => Some(EditTarget::Timeline { id, field }),
                (None, _) => {
                    emit_status(state, view_data, internal_tx, "no timeline rows; press a to add");
                    return;
                }
                (Some(_), None) => {
                    emit_status(state, view_data, internal_tx, "column is not editable");
                    return;
                }
            }
        }
    };
    let Some(target) = target else {
        return;
    };
    let current = current_text(workspace, target);
    view_data.cell_editor = Some(CellEditor::new(target, &current));
    dispatch_app(state, view_data, internal_tx, AppCommand::EnterEditMode);
}

fn open_linked_data(
    state: &mut AppState,
    workspace: &mut Workspace,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let Some(id) = selected_timeline_id(workspace, view_data) else {
        emit_status(state, view_data, internal_tx, "no timeline rows; press a to add");
        return;
    };
    let events = workspace.dispatch(WorkspaceCommand::ToggleLinkedData(id));
    if workspace.editor().current_row() == Some(id) {
        view_data.modal = TableCursor::default();
        dispatch_app(state, view_data, internal_tx, AppCommand::OpenLinkedData);
        debug!(row = %id, events = events.len(), "linked data opened");
    }
}

fn handle_modal_key(
    state: &mut AppState,
    workspace: &mut Workspace,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(view) = workspace.editor().view() else {
        dispatch_app(state, view_data, internal_tx, AppCommand::ExitToNav);
        return;
    };
    let row_count = view.rows.len();

    match (key.code, key.modifiers) {
        (KeyCode::Esc, _) => {
            workspace.dispatch(WorkspaceCommand::CloseLinkedData);
            dispatch_app(state, view_data, internal_tx, AppCommand::ExitToNav);
        }
        (KeyCode::Char('j'), _) | (KeyCode::Down, _) => {
            view_data.modal.row = step(view_data.modal.row, 1, row_count);
        }
        (KeyCode::Char('k'), _) | (KeyCode::Up, _) => {
            view_data.modal.row = step(view_data.modal.row, -1, row_count);
        }
        (KeyCode::Char('h'), _) | (KeyCode::Left, _) => view_data.modal.col = MODAL_PATH_COLUMN,
        (KeyCode::Char('l'), _) | (KeyCode::Right, _) => {
            view_data.modal.col = MODAL_EXAMPLE_COLUMN;
        }
        (KeyCode::Char('a'), _) => {
            let events = workspace.dispatch(WorkspaceCommand::AddLinkedRow);
            if let Some(index) = events.iter().find_map(|event| match event {
                WorkspaceEvent::Editor(EditorEvent::RowAdded { index }) => Some(*index),
                _ => None,
            }) {
                view_data.modal = TableCursor {
                    row: index,
                    col: MODAL_PATH_COLUMN,
                };
            }
        }
        (KeyCode::Char('d'), _) => {
            if row_count == 0 {
                emit_status(state, view_data, internal_tx, "no linked data rows");
                return;
            }
            workspace.dispatch(WorkspaceCommand::DeleteLinkedRow(view_data.modal.row));
            clamp_cursors(workspace, view_data);
            emit_status(state, view_data, internal_tx, "linked data row deleted");
        }
        (KeyCode::Char('s'), _) | (KeyCode::Char('S'), _) => {
            let delta = if key.code == KeyCode::Char('s') { 1 } else { -1 };
            workspace.dispatch(WorkspaceCommand::CycleStandard(delta));
            let label = workspace
                .editor()
                .selected_standard()
                .map_or_else(|| "no standards loaded".to_owned(), |name| format!("standard {name}"));
            emit_status(state, view_data, internal_tx, label);
        }
        (KeyCode::Char('R'), _) => {
            workspace.dispatch(WorkspaceCommand::ResetLinkedData);
            dispatch_app(state, view_data, internal_tx, AppCommand::ExitToNav);
            emit_status(state, view_data, internal_tx, "linked data reset");
        }
        (KeyCode::Char('i'), _) | (KeyCode::Enter, _) => {
            let index = view_data.modal.row;
            let Some(row) = view.rows.get(index) else {
                emit_status(state, view_data, internal_tx, "no linked data rows; press a to add");
                return;
            };
            let (target, current) = if view_data.modal.col == MODAL_PATH_COLUMN {
                (
                    EditTarget::LinkedPath { index },
                    row.resolved_path().to_owned(),
                )
            } else {
                (
                    EditTarget::LinkedExample { index },
                    row.example_data.clone(),
                )
            };
            view_data.cell_editor = Some(CellEditor::new(target, &current));
            dispatch_app(state, view_data, internal_tx, AppCommand::EnterEditMode);
        }
        _ => {}
    }
}

fn handle_cell_edit_key(
    state: &mut AppState,
    workspace: &mut Workspace,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(editor) = view_data.cell_editor.as_mut() else {
        leave_edit_mode(state, workspace, view_data, internal_tx);
        return;
    };

    match (key.code, key.modifiers) {
        (KeyCode::Enter, _) => finish_cell_edit(state, workspace, view_data, internal_tx, true),
        (KeyCode::Esc, _) => finish_cell_edit(state, workspace, view_data, internal_tx, false),
        (KeyCode::Tab, _) | (KeyCode::BackTab, _) => {
            let EditTarget::LinkedPath { index } = editor.target else {
                return;
            };
            let suggestions = workspace
                .editor()
                .view()
                .and_then(|view| view.rows.get(index))
                .map(|row| row.suggestions.clone())
                .unwrap_or_default();
            let delta = if key.code == KeyCode::Tab { 1 } else { -1 };
            if !cycle_suggestion(editor, &suggestions, delta) {
                emit_status(state, view_data, internal_tx, "no matching suggestions");
            }
        }
        (KeyCode::Backspace, _) => {
            editor.buffer.pop();
            editor.suggestion_query = None;
        }
        (KeyCode::Char('u'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
            editor.buffer.clear();
            editor.suggestion_query = None;
        }
        (KeyCode::Char(ch), modifiers)
            if modifiers.is_empty() || modifiers == KeyModifiers::SHIFT =>
        {
            editor.buffer.push(ch);
            editor.suggestion_query = None;
        }
        _ => {}
    }
}

/// Moves the buffer to the next suggestion matching the text typed before
/// cycling began. Returns false when nothing matches.
fn cycle_suggestion(editor: &mut CellEditor, suggestions: &[String], delta: isize) -> bool {
    let query = editor
        .suggestion_query
        .get_or_insert_with(|| editor.buffer.clone())
        .clone();
    let matches = matching_suggestions(suggestions, &query);
    if matches.is_empty() {
        return false;
    }
    let len = matches.len() as isize;
    let first_cycle = editor.buffer == query && !matches.contains(&editor.buffer.as_str());
    let next = if first_cycle {
        if delta < 0 { len - 1 } else { 0 }
    } else {
        (editor.suggestion_index as isize + delta).rem_euclid(len)
    };
    editor.suggestion_index = next as usize;
    editor.buffer = matches[editor.suggestion_index].to_owned();
    true
}

fn matching_suggestions<'a>(suggestions: &'a [String], query: &str) -> Vec<&'a str> {
    let query = query.to_lowercase();
    suggestions
        .iter()
        .map(String::as_str)
        .filter(|suggestion| query.is_empty() || suggestion.to_lowercase().contains(&query))
        .collect()
}

fn finish_cell_edit(
    state: &mut AppState,
    workspace: &mut Workspace,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    keep: bool,
) {
    let Some(editor) = view_data.cell_editor.take() else {
        leave_edit_mode(state, workspace, view_data, internal_tx);
        return;
    };
    let value = editor.buffer;

    match editor.target {
        EditTarget::Story(field) if keep => {
            workspace.dispatch(WorkspaceCommand::SetStoryField { field, value });
        }
        EditTarget::Timeline { id, field } if keep => {
            workspace.dispatch(WorkspaceCommand::SetTimelineField { id, field, value });
        }
        EditTarget::LinkedExample { index } if keep => {
            workspace.dispatch(WorkspaceCommand::SetLinkedExample { index, value });
            workspace.dispatch(WorkspaceCommand::BlurLinkedData);
        }
        EditTarget::LinkedPath { index } if keep => {
            let events = workspace.dispatch(WorkspaceCommand::SetLinkedPath { index, value });
            let popup_opened = events.iter().any(|event| {
                matches!(
                    event,
                    WorkspaceEvent::Editor(EditorEvent::PopupOpened { .. })
                )
            });
            if popup_opened {
                dispatch_app(state, view_data, internal_tx, AppCommand::OpenPlaceholder);
                return;
            }
            workspace.dispatch(WorkspaceCommand::BlurLinkedData);
        }
        target if target.in_modal() => {
            workspace.dispatch(WorkspaceCommand::BlurLinkedData);
        }
        _ => {}
    }
    leave_edit_mode(state, workspace, view_data, internal_tx);
}

fn leave_edit_mode(
    state: &mut AppState,
    workspace: &Workspace,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    view_data.cell_editor = None;
    let command = if workspace.editor().is_open() {
        AppCommand::OpenLinkedData
    } else {
        AppCommand::ExitToNav
    };
    dispatch_app(state, view_data, internal_tx, command);
}

fn handle_popup_key(
    state: &mut AppState,
    workspace: &mut Workspace,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(popup) = workspace.editor().popup() else {
        leave_edit_mode(state, workspace, view_data, internal_tx);
        return;
    };
    let focus = popup.focus();
    let focused = popup.focused_input().map(str::to_owned);

    match (key.code, key.modifiers) {
        (KeyCode::Enter, _) | (KeyCode::Esc, _) => {
            let events = workspace.dispatch(WorkspaceCommand::ClosePopup);
            workspace.dispatch(WorkspaceCommand::BlurLinkedData);
            if let Some(resolved) = events.iter().find_map(|event| match event {
                WorkspaceEvent::Editor(EditorEvent::PopupClosed { resolved, .. }) => {
                    Some(resolved.clone())
                }
                _ => None,
            }) {
                emit_status(state, view_data, internal_tx, format!("path {resolved}"));
            }
            dispatch_app(state, view_data, internal_tx, AppCommand::ClosePlaceholder);
        }
        (KeyCode::Tab, _) | (KeyCode::Down, _) => {
            workspace.dispatch(WorkspaceCommand::FocusNextPlaceholder);
        }
        (KeyCode::BackTab, _) | (KeyCode::Up, _) => {
            workspace.dispatch(WorkspaceCommand::FocusPrevPlaceholder);
        }
        (KeyCode::Backspace, _) => {
            if let Some(mut value) = focused {
                value.pop();
                workspace.dispatch(WorkspaceCommand::SetPlaceholder { index: focus, value });
            }
        }
        (KeyCode::Char(ch), modifiers)
            if modifiers.is_empty() || modifiers == KeyModifiers::SHIFT =>
        {
            if let Some(mut value) = focused {
                value.push(ch);
                workspace.dispatch(WorkspaceCommand::SetPlaceholder { index: focus, value });
            }
        }
        _ => {}
    }
}

fn export_workspace<R: AppRuntime>(
    state: &mut AppState,
    workspace: &mut Workspace,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    workspace.dispatch(WorkspaceCommand::BlurLinkedData);
    match runtime.export_document(workspace) {
        Ok(path) => emit_status(
            state,
            view_data,
            internal_tx,
            format!("exported to {}", path.display()),
        ),
        Err(error) => {
            warn!(error = %format!("{error:#}"), "export failed");
            emit_status(state, view_data, internal_tx, format!("export failed: {error:#}"));
        }
    }
}

fn import_workspace<R: AppRuntime>(
    state: &mut AppState,
    workspace: &mut Workspace,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let (path, imported) = match runtime.import_document() {
        Ok(loaded) => loaded,
        Err(error) => {
            warn!(error = %format!("{error:#}"), "import failed");
            emit_status(state, view_data, internal_tx, format!("import failed: {error:#}"));
            return;
        }
    };
    let rows = imported.timeline.len();
    workspace.dispatch(WorkspaceCommand::ImportDocument(imported));
    *view_data = ViewData {
        status_token: view_data.status_token,
        help_visible: view_data.help_visible,
        ..ViewData::default()
    };
    if state.mode != AppMode::Nav {
        dispatch_app(state, view_data, internal_tx, AppCommand::ExitToNav);
    }
    emit_status(
        state,
        view_data,
        internal_tx,
        format!("imported {rows} rows from {}", path.display()),
    );
}

fn reload_standards<R: AppRuntime>(
    state: &mut AppState,
    workspace: &mut Workspace,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let report = match runtime.reload_standards() {
        Ok(report) => report,
        Err(error) => {
            warn!(error = %format!("{error:#}"), "standards reload failed");
            emit_status(
                state,
                view_data,
                internal_tx,
                format!("standards reload failed: {error:#}"),
            );
            return;
        }
    };
    let loaded = report.loaded.len();
    for (name, paths) in report.loaded {
        workspace.dispatch(WorkspaceCommand::LoadStandard { name, paths });
    }
    let message = if report.failed == 0 {
        format!("loaded {loaded} standards")
    } else {
        format!("loaded {loaded} standards; {} failed (see log)", report.failed)
    };
    emit_status(state, view_data, internal_tx, message);
}

fn current_text(workspace: &Workspace, target: EditTarget) -> String {
    match target {
        EditTarget::Story(field) => workspace.story().get(field).to_owned(),
        EditTarget::Timeline { id, field } => workspace
            .timeline()
            .get(id)
            .map(|event| event.get(field).to_owned())
            .unwrap_or_default(),
        EditTarget::LinkedPath { index } => workspace
            .editor()
            .view()
            .and_then(|view| view.rows.get(index).map(|row| row.resolved_path().to_owned()))
            .unwrap_or_default(),
        EditTarget::LinkedExample { index } => workspace
            .editor()
            .view()
            .and_then(|view| view.rows.get(index).map(|row| row.example_data.clone()))
            .unwrap_or_default(),
    }
}

fn selected_timeline_id(workspace: &Workspace, view_data: &ViewData) -> Option<TimelineId> {
    workspace.timeline().id_at(view_data.timeline.row)
}

fn move_row(state: &AppState, workspace: &Workspace, view_data: &mut ViewData, delta: isize) {
    match state.active_pane {
        PaneKind::Story => {
            view_data.story.row = step(view_data.story.row, delta, StoryField::ALL.len());
        }
        PaneKind::Timeline => {
            view_data.timeline.row =
                step(view_data.timeline.row, delta, workspace.timeline().len());
        }
    }
}

fn move_column(state: &AppState, view_data: &mut ViewData, delta: isize) {
    if state.active_pane == PaneKind::Timeline {
        view_data.timeline.col = step(view_data.timeline.col, delta, TIMELINE_COLUMNS.len());
    }
}

/// Moves `current` by `delta` within `0..len`, clamping at both ends.
fn step(current: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    current.saturating_add_signed(delta).min(len - 1)
}

fn clamp_cursors(workspace: &Workspace, view_data: &mut ViewData) {
    let timeline_len = workspace.timeline().len();
    view_data.timeline.row = view_data.timeline.row.min(timeline_len.saturating_sub(1));
    let modal_len = workspace
        .editor()
        .view()
        .map_or(0, |view| view.rows.len());
    view_data.modal.row = view_data.modal.row.min(modal_len.saturating_sub(1));
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, workspace: &Workspace, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let selected = PaneKind::ALL
        .iter()
        .position(|pane| *pane == state.active_pane)
        .unwrap_or(0);
    let pane_titles = PaneKind::ALL
        .iter()
        .map(|pane| pane_title(*pane, workspace))
        .collect::<Vec<String>>();
    let tabs = Tabs::new(pane_titles)
        .block(Block::default().title("storyline").borders(Borders::ALL))
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .select(selected);
    frame.render_widget(tabs, layout[0]);

    render_body(frame, layout[1], state, workspace, view_data);

    let status = Paragraph::new(status_text(state, workspace, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[2]);

    if let Some(view) = workspace.editor().view() {
        let area = centered_rect(84, 72, frame.area());
        frame.render_widget(Clear, area);
        render_modal(frame, area, workspace, view, view_data);

        if let Some(popup) = view.popup {
            let area = centered_rect(60, 34, frame.area());
            frame.render_widget(Clear, area);
            let body = Paragraph::new(render_popup_text(popup))
                .wrap(Wrap { trim: false })
                .block(
                    Block::default()
                        .title("fill placeholders")
                        .borders(Borders::ALL)
                        .style(Style::default().fg(Color::Cyan)),
                );
            frame.render_widget(body, area);
        }
    }

    if view_data.help_visible {
        let area = centered_rect(76, 60, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn render_body(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    state: &AppState,
    workspace: &Workspace,
    view_data: &ViewData,
) {
    let panels: Vec<(&str, String)> = [
        (state.show_story_json, "story JSON", JsonPanel::Story),
        (state.show_timeline_json, "timeline JSON", JsonPanel::Timeline),
    ]
    .into_iter()
    .filter(|(shown, _, _)| *shown)
    .map(|(_, title, panel)| (title, json_panel_text(workspace, panel)))
    .collect();

    let table_area = if panels.is_empty() {
        area
    } else {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(58), Constraint::Percentage(42)])
            .split(area);
        let stacked = Layout::default()
            .direction(Direction::Vertical)
            .constraints(vec![Constraint::Ratio(1, panels.len() as u32); panels.len()])
            .split(columns[1]);
        for ((title, text), panel_area) in panels.into_iter().zip(stacked.iter()) {
            let panel = Paragraph::new(text)
                .wrap(Wrap { trim: false })
                .block(Block::default().title(title).borders(Borders::ALL));
            frame.render_widget(panel, *panel_area);
        }
        columns[0]
    };

    match state.active_pane {
        PaneKind::Story => render_story_table(frame, table_area, state, workspace, view_data),
        PaneKind::Timeline => render_timeline_table(frame, table_area, state, workspace, view_data),
    }
}

fn render_story_table(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    state: &AppState,
    workspace: &Workspace,
    view_data: &ViewData,
) {
    let rows = story_rows(workspace, view_data)
        .into_iter()
        .enumerate()
        .map(|(row_index, cells)| {
            let selected = row_index == view_data.story.row && state.mode != AppMode::LinkedData;
            Row::new(cells.into_iter().enumerate().map(|(col, text)| {
                Cell::from(text).style(cell_style(selected, selected && col == 1))
            }))
        });
    let table = Table::new(rows, [Constraint::Length(10), Constraint::Min(20)])
        .header(header_row(&STORY_COLUMNS))
        .column_spacing(1)
        .block(Block::default().title("story").borders(Borders::ALL));
    frame.render_widget(table, area);
}

fn render_timeline_table(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    state: &AppState,
    workspace: &Workspace,
    view_data: &ViewData,
) {
    let rows = timeline_rows(workspace, view_data)
        .into_iter()
        .enumerate()
        .map(|(row_index, cells)| {
            let selected = row_index == view_data.timeline.row;
            Row::new(cells.into_iter().enumerate().map(|(col, text)| {
                let focused = selected && col == view_data.timeline.col && state.mode != AppMode::LinkedData;
                Cell::from(text).style(cell_style(selected, focused))
            }))
        });
    let widths = [
        Constraint::Length(4),
        Constraint::Length(12),
        Constraint::Min(16),
        Constraint::Length(12),
        Constraint::Length(18),
    ];
    let table = Table::new(rows, widths)
        .header(header_row(&TIMELINE_COLUMNS))
        .column_spacing(1)
        .block(
            Block::default()
                .title(format!("timeline ({} rows)", workspace.timeline().len()))
                .borders(Borders::ALL),
        );
    frame.render_widget(table, area);
}

fn render_modal(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    workspace: &Workspace,
    view: EditorView<'_>,
    view_data: &ViewData,
) {
    let suggestions = modal_suggestions(view, view_data);
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(if suggestions.is_empty() { 0 } else { 6 }),
        ])
        .margin(1)
        .split(area);

    frame.render_widget(
        Block::default()
            .title(modal_title(workspace, view))
            .borders(Borders::ALL),
        area,
    );
    frame.render_widget(
        Paragraph::new(standard_line(workspace, view)).style(Style::default().fg(Color::Cyan)),
        sections[0],
    );

    let rows = modal_rows(view, view_data)
        .into_iter()
        .enumerate()
        .map(|(row_index, cells)| {
            let selected = row_index == view_data.modal.row;
            Row::new(cells.into_iter().enumerate().map(|(col, text)| {
                let focused = selected && col == view_data.modal.col + 1;
                Cell::from(text).style(cell_style(selected, focused))
            }))
        });
    let table = Table::new(
        rows,
        [
            Constraint::Length(3),
            Constraint::Percentage(60),
            Constraint::Percentage(40),
        ],
    )
    .header(header_row(&MODAL_COLUMNS))
    .column_spacing(1);
    frame.render_widget(table, sections[1]);

    if !suggestions.is_empty() {
        let list = Paragraph::new(suggestions.join("\n"))
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().title("suggestions (tab)").borders(Borders::TOP));
        frame.render_widget(list, sections[2]);
    }
}

fn header_row(columns: &[&str]) -> Row<'static> {
    Row::new(columns.iter().map(|label| {
        Cell::from((*label).to_owned()).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }))
}

fn cell_style(selected_row: bool, focused: bool) -> Style {
    if focused {
        Style::default()
            .fg(Color::Black)
            .bg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    } else if selected_row {
        Style::default().bg(Color::DarkGray)
    } else {
        Style::default()
    }
}

fn pane_title(pane: PaneKind, workspace: &Workspace) -> String {
    match pane {
        PaneKind::Story => pane.label().to_owned(),
        PaneKind::Timeline => format!("{} ({})", pane.label(), workspace.timeline().len()),
    }
}

fn editing_text(view_data: &ViewData, target: EditTarget) -> Option<String> {
    view_data
        .cell_editor
        .as_ref()
        .filter(|editor| editor.target == target)
        .map(|editor| format!("{}{EDIT_CARET}", editor.buffer))
}

fn story_rows(workspace: &Workspace, view_data: &ViewData) -> Vec<[String; 2]> {
    StoryField::ALL
        .iter()
        .map(|field| {
            let value = editing_text(view_data, EditTarget::Story(*field))
                .unwrap_or_else(|| workspace.story().get(*field).to_owned());
            [field.as_str().to_owned(), value]
        })
        .collect()
}

fn timeline_rows(workspace: &Workspace, view_data: &ViewData) -> Vec<[String; 5]> {
    workspace
        .timeline()
        .iter()
        .map(|(id, event)| {
            let cell = |field: TimelineField| {
                editing_text(view_data, EditTarget::Timeline { id, field })
                    .unwrap_or_else(|| event.get(field).to_owned())
            };
            [
                id.to_string(),
                cell(TimelineField::Time),
                cell(TimelineField::Event),
                event.standard.clone().unwrap_or_default(),
                linked_data_label(event, workspace.standards()),
            ]
        })
        .collect()
}

fn linked_data_label(event: &TimelineEvent, catalog: &StandardsCatalog) -> String {
    let label = event.action_label().as_str();
    if event.linked_data.is_empty() {
        return label.to_owned();
    }
    let report = PathReport::for_event(event, catalog);
    let mut parts = vec![event.linked_data.len().to_string()];
    for (count, what) in [
        (report.unresolved, "unresolved"),
        (report.unknown.len(), "unknown"),
        (report.duplicates.len(), "duplicate"),
    ] {
        if count > 0 {
            parts.push(format!("{count} {what}"));
        }
    }
    format!("{label} ({})", parts.join(", "))
}

fn modal_rows(view: EditorView<'_>, view_data: &ViewData) -> Vec<[String; 3]> {
    view.rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let path = editing_text(view_data, EditTarget::LinkedPath { index }).unwrap_or_else(
                || match &row.edited_path {
                    Some(resolved) if *resolved != row.input => {
                        format!("{} {RESOLVED_ARROW} {resolved}", row.input)
                    }
                    _ => row.input.clone(),
                },
            );
            let example = editing_text(view_data, EditTarget::LinkedExample { index })
                .unwrap_or_else(|| row.example_data.clone());
            [index.to_string(), path, example]
        })
        .collect()
}

fn modal_title(workspace: &Workspace, view: EditorView<'_>) -> String {
    let event = workspace
        .timeline()
        .get(view.row_id)
        .map(|event| event.event.as_str())
        .filter(|event| !event.is_empty())
        .unwrap_or("untitled");
    format!("linked data: row {} ({event})", view.row_id)
}

fn standard_line(workspace: &Workspace, view: EditorView<'_>) -> String {
    let names = workspace.standards().names();
    match view.standard {
        Some(name) => {
            let position = names
                .iter()
                .position(|candidate| *candidate == name)
                .map_or_else(|| "not loaded".to_owned(), |index| format!("{}/{}", index + 1, names.len()));
            format!("standard: {name} [{position}]  s/S change")
        }
        None if names.is_empty() => "standard: none loaded (ctrl+l reload)".to_owned(),
        None => "standard: none  s/S choose".to_owned(),
    }
}

fn modal_suggestions(view: EditorView<'_>, view_data: &ViewData) -> Vec<String> {
    let Some(CellEditor {
        target: EditTarget::LinkedPath { index },
        buffer,
        suggestion_query,
        ..
    }) = &view_data.cell_editor
    else {
        return Vec::new();
    };
    let Some(row) = view.rows.get(*index) else {
        return Vec::new();
    };
    let query = suggestion_query.as_deref().unwrap_or(buffer);
    matching_suggestions(&row.suggestions, query)
        .into_iter()
        .map(|suggestion| {
            if suggestion == buffer {
                format!("> {suggestion}")
            } else {
                format!("  {suggestion}")
            }
        })
        .collect()
}

fn render_popup_text(popup: &BracketPopup) -> String {
    let mut lines = vec![format!("template: {}", popup.template()), String::new()];
    if popup.inputs().is_empty() {
        lines.push("no empty [] placeholders; enter keeps the path".to_owned());
    }
    for segment in template_segments(popup.template()) {
        let TemplateSegment::Placeholder(index) = segment else {
            continue;
        };
        let marker = if index == popup.focus() { ">" } else { " " };
        let value = popup.inputs().get(index).map(String::as_str).unwrap_or("");
        let caret = if index == popup.focus() { EDIT_CARET } else { "" };
        lines.push(format!("{marker} [{index}] {value}{caret}"));
    }
    lines.push(String::new());
    lines.push(format!("preview: {}", popup.preview()));
    lines.push("tab/shift+tab field | enter/esc apply".to_owned());
    lines.join("\n")
}

fn json_panel_text(workspace: &Workspace, panel: JsonPanel) -> String {
    let rendered = match panel {
        JsonPanel::Story => workspace.story_json(),
        JsonPanel::Timeline => workspace.timeline_json(),
    };
    rendered.unwrap_or_else(|error| format!("render failed: {error:#}"))
}

fn status_text(state: &AppState, workspace: &Workspace, view_data: &ViewData) -> String {
    if view_data.help_visible {
        return String::new();
    }

    let mode = match state.mode {
        AppMode::Nav => "NAV",
        AppMode::Edit => "EDIT",
        AppMode::LinkedData => "DATA",
        AppMode::Placeholder => "FILL",
    };
    let hints = match state.mode {
        AppMode::Nav => match state.active_pane {
            PaneKind::Story => "j/k i edit | tab pane | 1/2 json | ctrl+s export | ? help",
            PaneKind::Timeline => {
                "j/k/h/l i edit | a add D del | o data | tab pane | ctrl+s export | ? help"
            }
        },
        AppMode::Edit => match view_data.cell_editor.as_ref().map(|editor| editor.target) {
            Some(EditTarget::LinkedPath { .. }) => "enter keep | esc discard | tab suggest",
            _ => "enter keep | esc discard",
        },
        AppMode::LinkedData => "i edit | a add d del | s/S standard | R reset | esc close",
        AppMode::Placeholder => "type value | tab next | enter apply",
    };
    let standards = format!("{} standards", workspace.standards().len());
    match &state.status_line {
        Some(status) => format!("{mode} | {status} | {hints} | {standards}"),
        None => format!("{mode} | {hints} | {standards}"),
    }
}

fn help_overlay_text() -> &'static str {
    "global: ctrl+q quit | ctrl+s export | ctrl+r import | ctrl+l reload standards\n\
nav: j/k/h/l move | tab/shift+tab pane | 1 story json | 2 timeline json | ? help\n\
nav: i/enter edit cell | a add row | D delete row | o or enter on data column open linked data\n\
edit: type | backspace | ctrl+u clear | enter keep | esc discard\n\
linked data: j/k/h/l move | i/enter edit | tab cycle suggestions | a add | d delete\n\
linked data: s/S next/prev standard | R reset | esc close\n\
placeholders: type value | tab/down next | shift+tab/up prev | enter/esc apply"
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::{
        AppRuntime, CellEditor, EditTarget, StandardsReport, ViewData, cycle_suggestion,
        handle_key_event, help_overlay_text, linked_data_label, matching_suggestions, modal_rows,
        render_popup_text, standard_line, status_text, step, story_rows, timeline_rows,
    };
    use anyhow::{Result, anyhow};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use std::path::PathBuf;
    use std::sync::mpsc;
    use storyline_app::{
        AppMode, AppState, BracketPopup, ImportedDocument, LinkedDataEntry, PaneKind,
        StandardsCatalog, Story, StoryField, TimelineEvent, TimelineId, Workspace,
        WorkspaceCommand,
    };

    #[derive(Debug, Default)]
    struct TestRuntime {
        exports: Vec<String>,
        import: Option<ImportedDocument>,
        standards: StandardsReport,
        fail_export: bool,
    }

    impl AppRuntime for TestRuntime {
        fn export_document(&mut self, workspace: &Workspace) -> Result<PathBuf> {
            if self.fail_export {
                return Err(anyhow!("disk full"));
            }
            self.exports.push(workspace.export_json()?);
            Ok(PathBuf::from("/tmp/patientOutput.json"))
        }

        fn import_document(&mut self) -> Result<(PathBuf, ImportedDocument)> {
            let imported = self
                .import
                .clone()
                .ok_or_else(|| anyhow!("no import path configured"))?;
            Ok((PathBuf::from("/tmp/patient.json"), imported))
        }

        fn reload_standards(&mut self) -> Result<StandardsReport> {
            Ok(self.standards.clone())
        }
    }

    struct Harness {
        state: AppState,
        workspace: Workspace,
        runtime: TestRuntime,
        view_data: ViewData,
        tx: mpsc::Sender<super::InternalEvent>,
    }

    impl Harness {
        fn new() -> Self {
            let (tx, _rx) = mpsc::channel();
            let mut workspace = Workspace::new();
            workspace.dispatch(WorkspaceCommand::LoadStandard {
                name: "FHIR".to_owned(),
                paths: vec![
                    "Encounter.period.start".to_owned(),
                    "Observation.component[].code".to_owned(),
                    "Observation.valueQuantity.value".to_owned(),
                ],
            });
            Self {
                state: AppState::default(),
                workspace,
                runtime: TestRuntime::default(),
                view_data: ViewData::default(),
                tx,
            }
        }

        fn press(&mut self, code: KeyCode) -> bool {
            self.press_with(code, KeyModifiers::NONE)
        }

        fn press_with(&mut self, code: KeyCode, modifiers: KeyModifiers) -> bool {
            handle_key_event(
                &mut self.state,
                &mut self.workspace,
                &mut self.runtime,
                &mut self.view_data,
                &self.tx,
                KeyEvent::new(code, modifiers),
            )
        }

        fn type_text(&mut self, text: &str) {
            for ch in text.chars() {
                self.press(KeyCode::Char(ch));
            }
        }

        fn first_row(&self) -> TimelineId {
            self.workspace
                .timeline()
                .id_at(0)
                .expect("timeline has a row")
        }

        /// Switches to the timeline pane and adds a row.
        fn with_timeline_row(mut self) -> Self {
            self.press(KeyCode::Tab);
            self.press(KeyCode::Char('a'));
            self
        }
    }

    #[test]
    fn ctrl_q_quits() {
        let mut harness = Harness::new();
        assert!(harness.press_with(KeyCode::Char('q'), KeyModifiers::CONTROL));
        assert!(!harness.press(KeyCode::Char('q')));
    }

    #[test]
    fn tab_switches_panes() {
        let mut harness = Harness::new();
        harness.press(KeyCode::Tab);
        assert_eq!(harness.state.active_pane, PaneKind::Timeline);
        harness.press(KeyCode::BackTab);
        assert_eq!(harness.state.active_pane, PaneKind::Story);
    }

    #[test]
    fn editing_story_cell_keeps_on_enter_and_discards_on_esc() {
        let mut harness = Harness::new();
        harness.press(KeyCode::Char('i'));
        assert_eq!(harness.state.mode, AppMode::Edit);
        harness.type_text("Chest pain");
        harness.press(KeyCode::Enter);
        assert_eq!(harness.workspace.story().summary, "Chest pain");
        assert_eq!(harness.state.mode, AppMode::Nav);

        harness.press(KeyCode::Char('j'));
        harness.press(KeyCode::Char('i'));
        harness.type_text("dropped");
        harness.press(KeyCode::Esc);
        assert_eq!(harness.workspace.story().rationale, "");
    }

    #[test]
    fn timeline_add_edit_and_delete() {
        let mut harness = Harness::new().with_timeline_row();
        assert_eq!(harness.workspace.timeline().len(), 1);

        harness.press(KeyCode::Char('l'));
        harness.press(KeyCode::Enter);
        harness.type_text("08:00");
        harness.press(KeyCode::Enter);
        let id = harness.first_row();
        assert_eq!(
            harness.workspace.timeline().get(id).map(|event| event.time.as_str()),
            Some("08:00")
        );

        harness.press(KeyCode::Char('D'));
        assert!(harness.workspace.timeline().is_empty());
    }

    #[test]
    fn id_column_is_not_editable() {
        let mut harness = Harness::new().with_timeline_row();
        harness.press(KeyCode::Char('i'));
        assert_eq!(harness.state.mode, AppMode::Nav);
        assert_eq!(
            harness.state.status_line.as_deref(),
            Some("column is not editable")
        );
    }

    #[test]
    fn linked_data_session_with_placeholder_popup() {
        let mut harness = Harness::new().with_timeline_row();
        harness.press(KeyCode::Char('o'));
        assert_eq!(harness.state.mode, AppMode::LinkedData);

        harness.press(KeyCode::Char('a'));
        harness.press(KeyCode::Enter);
        harness.type_text("Observation.component[].code");
        harness.press(KeyCode::Enter);
        assert_eq!(harness.state.mode, AppMode::Placeholder);

        harness.type_text("2");
        harness.press(KeyCode::Enter);
        assert_eq!(harness.state.mode, AppMode::LinkedData);

        harness.press(KeyCode::Char('l'));
        harness.press(KeyCode::Enter);
        harness.type_text("ST elevation");
        harness.press(KeyCode::Enter);
        harness.press(KeyCode::Esc);
        assert_eq!(harness.state.mode, AppMode::Nav);

        let id = harness.first_row();
        let event = harness.workspace.timeline().get(id).expect("row exists");
        assert_eq!(
            event.linked_data,
            vec![LinkedDataEntry::new(
                "Observation.component[2].code",
                "ST elevation"
            )]
        );
        assert_eq!(event.standard.as_deref(), Some("FHIR"));
    }

    #[test]
    fn enter_on_data_column_opens_modal() {
        let mut harness = Harness::new().with_timeline_row();
        for _ in 0..4 {
            harness.press(KeyCode::Char('l'));
        }
        harness.press(KeyCode::Enter);
        assert_eq!(harness.state.mode, AppMode::LinkedData);
        assert_eq!(harness.workspace.editor().current_row(), Some(harness.first_row()));
    }

    #[test]
    fn reset_clears_linked_data_and_returns_to_nav() {
        let mut harness = Harness::new().with_timeline_row();
        harness.press(KeyCode::Char('o'));
        harness.press(KeyCode::Char('a'));
        harness.press(KeyCode::Enter);
        harness.type_text("Encounter.period.start");
        harness.press(KeyCode::Enter);

        harness.press(KeyCode::Char('R'));
        assert_eq!(harness.state.mode, AppMode::Nav);
        let event = harness
            .workspace
            .timeline()
            .get(harness.first_row())
            .expect("row exists");
        assert!(event.linked_data.is_empty());
        assert_eq!(event.standard, None);
    }

    #[test]
    fn tab_cycles_matching_suggestions_while_editing_path() {
        let mut harness = Harness::new().with_timeline_row();
        harness.press(KeyCode::Char('o'));
        harness.press(KeyCode::Char('a'));
        harness.press(KeyCode::Enter);
        harness.type_text("observation");
        harness.press(KeyCode::Tab);
        let buffer = |harness: &Harness| {
            harness
                .view_data
                .cell_editor
                .as_ref()
                .map(|editor| editor.buffer.clone())
        };
        assert_eq!(
            buffer(&harness).as_deref(),
            Some("Observation.component[].code")
        );
        harness.press(KeyCode::Tab);
        assert_eq!(
            buffer(&harness).as_deref(),
            Some("Observation.valueQuantity.value")
        );
        harness.press(KeyCode::Tab);
        assert_eq!(
            buffer(&harness).as_deref(),
            Some("Observation.component[].code")
        );
    }

    #[test]
    fn cycling_standards_with_none_loaded_reports_status() {
        let mut harness = Harness::new();
        harness.workspace = Workspace::new();
        harness.workspace.dispatch(WorkspaceCommand::AddTimelineRow);
        harness.press(KeyCode::Tab);
        harness.press(KeyCode::Char('o'));
        harness.press(KeyCode::Char('s'));
        assert_eq!(
            harness.state.status_line.as_deref(),
            Some("no standards loaded")
        );
    }

    #[test]
    fn export_flushes_open_editor_and_reports_path() {
        let mut harness = Harness::new().with_timeline_row();
        harness.press(KeyCode::Char('o'));
        harness.press(KeyCode::Char('a'));
        harness.press_with(KeyCode::Char('s'), KeyModifiers::CONTROL);

        assert_eq!(harness.runtime.exports.len(), 1);
        assert!(harness.runtime.exports[0].contains("\"dataPath\": \"\""));
        assert_eq!(
            harness.state.status_line.as_deref(),
            Some("exported to /tmp/patientOutput.json")
        );
    }

    #[test]
    fn export_failure_is_reported() {
        let mut harness = Harness::new();
        harness.runtime.fail_export = true;
        harness.press_with(KeyCode::Char('s'), KeyModifiers::CONTROL);
        assert_eq!(
            harness.state.status_line.as_deref(),
            Some("export failed: disk full")
        );
    }

    #[test]
    fn import_replaces_workspace_and_closes_modal() {
        let mut harness = Harness::new().with_timeline_row();
        harness.press(KeyCode::Char('o'));
        harness.runtime.import = Some(ImportedDocument {
            story: Story {
                summary: "imported".to_owned(),
                ..Story::default()
            },
            timeline: vec![TimelineEvent::default(), TimelineEvent::default()],
        });

        harness.press_with(KeyCode::Char('r'), KeyModifiers::CONTROL);
        assert_eq!(harness.state.mode, AppMode::Nav);
        assert!(!harness.workspace.editor().is_open());
        assert_eq!(harness.workspace.story().summary, "imported");
        assert_eq!(harness.workspace.timeline().len(), 2);
        assert_eq!(
            harness.state.status_line.as_deref(),
            Some("imported 2 rows from /tmp/patient.json")
        );
    }

    #[test]
    fn import_without_source_reports_error() {
        let mut harness = Harness::new();
        harness.press_with(KeyCode::Char('r'), KeyModifiers::CONTROL);
        assert_eq!(
            harness.state.status_line.as_deref(),
            Some("import failed: no import path configured")
        );
    }

    #[test]
    fn reload_standards_merges_and_reports_failures() {
        let mut harness = Harness::new();
        harness.runtime.standards = StandardsReport {
            loaded: vec![("LOINC".to_owned(), vec!["8867-4".to_owned()])],
            failed: 1,
        };
        harness.press_with(KeyCode::Char('l'), KeyModifiers::CONTROL);
        assert_eq!(harness.workspace.standards().names(), vec!["FHIR", "LOINC"]);
        assert_eq!(
            harness.state.status_line.as_deref(),
            Some("loaded 1 standards; 1 failed (see log)")
        );
    }

    #[test]
    fn json_panel_keys_toggle_panels() {
        let mut harness = Harness::new();
        harness.press(KeyCode::Char('1'));
        harness.press(KeyCode::Char('2'));
        assert!(harness.state.show_story_json);
        assert!(harness.state.show_timeline_json);
        harness.press(KeyCode::Char('1'));
        assert!(!harness.state.show_story_json);
    }

    #[test]
    fn help_overlay_swallows_keys_until_closed() {
        let mut harness = Harness::new();
        harness.press(KeyCode::Char('?'));
        assert!(harness.view_data.help_visible);
        harness.press(KeyCode::Tab);
        assert_eq!(harness.state.active_pane, PaneKind::Story);
        harness.press(KeyCode::Esc);
        assert!(!harness.view_data.help_visible);
        assert!(help_overlay_text().contains("ctrl+s export"));
    }

    #[test]
    fn rows_render_edit_buffer_in_place() {
        let mut harness = Harness::new();
        harness.press(KeyCode::Char('i'));
        harness.type_text("abc");
        let rows = story_rows(&harness.workspace, &harness.view_data);
        assert_eq!(rows[0], ["summary".to_owned(), "abc▏".to_owned()]);
        assert_eq!(rows[1][1], "");
    }

    #[test]
    fn timeline_rows_show_action_labels() {
        let mut harness = Harness::new().with_timeline_row();
        harness.press(KeyCode::Char('o'));
        harness.press(KeyCode::Char('a'));
        harness.press(KeyCode::Esc);

        let rows = timeline_rows(&harness.workspace, &harness.view_data);
        assert_eq!(rows[0][0], harness.first_row().to_string());
        assert_eq!(rows[0][3], "FHIR");
        assert_eq!(rows[0][4], "Edit (1)");
    }

    #[test]
    fn linked_data_label_counts_unresolved_entries() {
        let mut event = TimelineEvent::default();
        let catalog = StandardsCatalog::new();
        assert_eq!(linked_data_label(&event, &catalog), "Add");
        event.linked_data = vec![
            LinkedDataEntry::new("a[]", ""),
            LinkedDataEntry::new("b", ""),
        ];
        assert_eq!(linked_data_label(&event, &catalog), "Edit (2, 1 unresolved)");
    }

    #[test]
    fn linked_data_label_reports_unknown_and_repeated_paths() {
        let mut catalog = StandardsCatalog::new();
        catalog.insert("FHIR", vec!["Encounter.period.start".to_owned()]);
        let event = TimelineEvent {
            standard: Some("FHIR".to_owned()),
            linked_data: vec![
                LinkedDataEntry::new("encounter.PERIOD.start", ""),
                LinkedDataEntry::new("Encounter.status", ""),
                LinkedDataEntry::new("Encounter.status", ""),
                LinkedDataEntry::new("Encounter.class[]", ""),
            ],
            ..TimelineEvent::default()
        };
        assert_eq!(
            linked_data_label(&event, &catalog),
            "Edit (4, 1 unresolved, 2 unknown, 1 duplicate)"
        );
    }

    #[test]
    fn modal_rows_show_pending_resolution() {
        let mut harness = Harness::new().with_timeline_row();
        harness.press(KeyCode::Char('o'));
        harness.press(KeyCode::Char('a'));
        harness
            .workspace
            .dispatch(WorkspaceCommand::SetLinkedPath {
                index: 0,
                value: "a[].b".to_owned(),
            });
        harness.workspace.dispatch(WorkspaceCommand::SetPlaceholder {
            index: 0,
            value: "3".to_owned(),
        });
        harness.workspace.dispatch(WorkspaceCommand::ClosePopup);

        let view = harness.workspace.editor().view().expect("modal open");
        let rows = modal_rows(view, &harness.view_data);
        assert_eq!(rows[0][1], "a[].b → a[3].b");
    }

    #[test]
    fn standard_line_shows_position() {
        let mut harness = Harness::new().with_timeline_row();
        harness.press(KeyCode::Char('o'));
        let view = harness.workspace.editor().view().expect("modal open");
        assert_eq!(
            standard_line(&harness.workspace, view),
            "standard: FHIR [1/1]  s/S change"
        );
    }

    #[test]
    fn popup_text_lists_inputs_and_preview() {
        let mut popup = BracketPopup::open(0, "a[].b[]").expect("popup opens");
        popup.set_input(0, "1");
        let text = render_popup_text(&popup);
        assert!(text.contains("template: a[].b[]"));
        assert!(text.contains("> [0] 1▏"));
        assert!(text.contains("  [1] "));
        assert!(text.contains("preview: a[1].b[]"));
    }

    #[test]
    fn popup_text_for_filled_brackets_explains_passthrough() {
        let popup = BracketPopup::open(0, "records[abc].x").expect("popup opens");
        let text = render_popup_text(&popup);
        assert!(text.contains("no empty [] placeholders"));
        assert!(text.contains("preview: records[abc].x"));
    }

    #[test]
    fn status_text_includes_mode_status_and_hints() {
        let harness = Harness::new();
        let text = status_text(&harness.state, &harness.workspace, &harness.view_data);
        assert!(text.starts_with("NAV | "));
        assert!(text.ends_with("1 standards"));
    }

    #[test]
    fn suggestion_cycling_wraps_backwards_from_query() {
        let suggestions = vec!["alpha".to_owned(), "beta".to_owned(), "alphabet".to_owned()];
        let mut editor = CellEditor::new(EditTarget::LinkedPath { index: 0 }, "alp");
        assert!(cycle_suggestion(&mut editor, &suggestions, -1));
        assert_eq!(editor.buffer, "alphabet");
        assert!(cycle_suggestion(&mut editor, &suggestions, 1));
        assert_eq!(editor.buffer, "alpha");

        let mut missing = CellEditor::new(EditTarget::LinkedPath { index: 0 }, "zzz");
        assert!(!cycle_suggestion(&mut missing, &suggestions, 1));
        assert_eq!(missing.buffer, "zzz");
    }

    #[test]
    fn suggestions_match_case_insensitively() {
        let suggestions = vec!["Patient.name".to_owned(), "Encounter.id".to_owned()];
        assert_eq!(matching_suggestions(&suggestions, "PATIENT"), vec!["Patient.name"]);
        assert_eq!(matching_suggestions(&suggestions, "").len(), 2);
    }

    #[test]
    fn step_clamps_at_both_ends() {
        assert_eq!(step(0, -1, 3), 0);
        assert_eq!(step(2, 1, 3), 2);
        assert_eq!(step(1, 1, 3), 2);
        assert_eq!(step(4, 1, 0), 0);
    }

    #[test]
    fn story_field_edit_targets_selected_row() {
        let mut harness = Harness::new();
        harness.press(KeyCode::Char('j'));
        harness.press(KeyCode::Char('j'));
        harness.press(KeyCode::Char('i'));
        harness.type_text("Narrative");
        harness.press(KeyCode::Enter);
        assert_eq!(harness.workspace.story().get(StoryField::Story), "Narrative");
    }
}

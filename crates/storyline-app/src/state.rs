// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{AppMode, PaneKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonPanel {
    Story,
    Timeline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub mode: AppMode,
    pub active_pane: PaneKind,
    pub show_story_json: bool,
    pub show_timeline_json: bool,
    pub status_line: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            mode: AppMode::Nav,
            active_pane: PaneKind::Story,
            show_story_json: false,
            show_timeline_json: false,
            status_line: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    NextPane,
    PrevPane,
    FocusPane(PaneKind),
    EnterEditMode,
    ExitToNav,
    OpenLinkedData,
    OpenPlaceholder,
    ClosePlaceholder,
    TogglePanel(JsonPanel),
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    ModeChanged(AppMode),
    PaneChanged(PaneKind),
    PanelToggled(JsonPanel, bool),
    StatusUpdated(String),
    StatusCleared,
}

impl AppState {
    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::NextPane => self.rotate_pane(1),
            AppCommand::PrevPane => self.rotate_pane(-1),
            AppCommand::FocusPane(pane) => {
                self.active_pane = pane;
                vec![AppEvent::PaneChanged(pane)]
            }
            AppCommand::EnterEditMode => self.set_mode(AppMode::Edit),
            AppCommand::ExitToNav => {
                let mut events = self.set_mode(AppMode::Nav);
                events.push(self.set_status("nav"));
                events
            }
            AppCommand::OpenLinkedData => {
                self.active_pane = PaneKind::Timeline;
                self.set_mode(AppMode::LinkedData)
            }
            AppCommand::OpenPlaceholder => self.set_mode(AppMode::Placeholder),
            AppCommand::ClosePlaceholder => self.set_mode(AppMode::LinkedData),
            AppCommand::TogglePanel(panel) => {
                let slot = match panel {
                    JsonPanel::Story => &mut self.show_story_json,
                    JsonPanel::Timeline => &mut self.show_timeline_json,
                };
                *slot = !*slot;
                let shown = *slot;
                let label = match (panel, shown) {
                    (JsonPanel::Story, true) => "story JSON shown",
                    (JsonPanel::Story, false) => "story JSON hidden",
                    (JsonPanel::Timeline, true) => "timeline JSON shown",
                    (JsonPanel::Timeline, false) => "timeline JSON hidden",
                };
                vec![AppEvent::PanelToggled(panel, shown), self.set_status(label)]
            }
            AppCommand::SetStatus(message) => vec![self.set_status(message)],
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    fn set_status(&mut self, message: impl Into<String>) -> AppEvent {
        let message = message.into();
        self.status_line = Some(message.clone());
        AppEvent::StatusUpdated(message)
    }

    fn set_mode(&mut self, mode: AppMode) -> Vec<AppEvent> {
        self.mode = mode;
        vec![AppEvent::ModeChanged(mode)]
    }

    fn rotate_pane(&mut self, delta: isize) -> Vec<AppEvent> {
        let panes = PaneKind::ALL;
        let current = panes
            .iter()
            .position(|pane| *pane == self.active_pane)
            .unwrap_or(0) as isize;
        let len = panes.len() as isize;
        let next = (current + delta).rem_euclid(len) as usize;
        self.active_pane = panes[next];
        vec![AppEvent::PaneChanged(self.active_pane)]
    }
}

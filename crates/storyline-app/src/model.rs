// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::bracket;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoryField {
    Summary,
    Rationale,
    Story,
}

impl StoryField {
    pub const ALL: [Self; 3] = [Self::Summary, Self::Rationale, Self::Story];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::Rationale => "rationale",
            Self::Story => "story",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "summary" => Some(Self::Summary),
            "rationale" => Some(Self::Rationale),
            "story" => Some(Self::Story),
            _ => None,
        }
    }
}

/// The three free-text narrative fields of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
    pub summary: String,
    pub rationale: String,
    pub story: String,
}

impl Story {
    pub fn get(&self, field: StoryField) -> &str {
        match field {
            StoryField::Summary => &self.summary,
            StoryField::Rationale => &self.rationale,
            StoryField::Story => &self.story,
        }
    }

    pub fn set(&mut self, field: StoryField, value: impl Into<String>) {
        let slot = match field {
            StoryField::Summary => &mut self.summary,
            StoryField::Rationale => &mut self.rationale,
            StoryField::Story => &mut self.story,
        };
        *slot = value.into();
    }
}

/// Editable text columns of a timeline row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimelineField {
    Time,
    Event,
}

impl TimelineField {
    pub const ALL: [Self; 2] = [Self::Time, Self::Event];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Time => "time",
            Self::Event => "event",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "time" => Some(Self::Time),
            "event" => Some(Self::Event),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedDataEntry {
    #[serde(rename = "dataPath")]
    pub data_path: String,
    #[serde(rename = "exampleData")]
    pub example_data: String,
}

impl LinkedDataEntry {
    pub fn new(data_path: impl Into<String>, example_data: impl Into<String>) -> Self {
        Self {
            data_path: data_path.into(),
            example_data: example_data.into(),
        }
    }

    /// True while the path still carries a literal `[]` placeholder.
    pub fn is_unresolved(&self) -> bool {
        bracket::placeholder_count(&self.data_path) > 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub time: String,
    pub event: String,
    pub standard: Option<String>,
    pub linked_data: Vec<LinkedDataEntry>,
}

impl TimelineEvent {
    pub fn get(&self, field: TimelineField) -> &str {
        match field {
            TimelineField::Time => &self.time,
            TimelineField::Event => &self.event,
        }
    }

    pub fn set(&mut self, field: TimelineField, value: impl Into<String>) {
        let slot = match field {
            TimelineField::Time => &mut self.time,
            TimelineField::Event => &mut self.event,
        };
        *slot = value.into();
    }

    pub fn has_linked_data(&self) -> bool {
        !self.linked_data.is_empty()
    }

    pub fn action_label(&self) -> DataItemLabel {
        if self.has_linked_data() {
            DataItemLabel::Edit
        } else {
            DataItemLabel::Add
        }
    }

    pub fn unresolved_count(&self) -> usize {
        self.linked_data
            .iter()
            .filter(|entry| entry.is_unresolved())
            .count()
    }
}

/// Label of the per-row button that opens the linked-data editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataItemLabel {
    Add,
    Edit,
}

impl DataItemLabel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "Add",
            Self::Edit => "Edit",
        }
    }
}

/// Alternate export shape of a timeline row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetRow {
    pub time: String,
    pub event: String,
    pub sheet: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaneKind {
    Story,
    Timeline,
}

impl PaneKind {
    pub const ALL: [Self; 2] = [Self::Story, Self::Timeline];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Story => "story",
            Self::Timeline => "timeline",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "story" => Some(Self::Story),
            "timeline" => Some(Self::Timeline),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppMode {
    Nav,
    Edit,
    LinkedData,
    Placeholder,
}

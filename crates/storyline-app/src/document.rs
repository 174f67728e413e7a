// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! The single JSON document a workspace is exported to and imported from.
//!
//! Export is strict. Import is best-effort: unknown keys are ignored, missing
//! or mistyped fields fall back to empty values, and timeline ids are replaced
//! by array positions.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::{LinkedDataEntry, Story, StoryField, TimelineEvent, TimelineStore};

const TIMELINE_KEY: &str = "timeline";

#[derive(Debug, Serialize)]
struct ExportedDocument<'a> {
    summary: &'a str,
    rationale: &'a str,
    story: &'a str,
    timeline: Vec<&'a TimelineEvent>,
}

/// A document parsed for import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportedDocument {
    pub story: Story,
    pub timeline: Vec<TimelineEvent>,
}

pub fn export_value(story: &Story, timeline: &TimelineStore) -> Result<Value> {
    serde_json::to_value(exported(story, timeline)).context("encode document")
}

/// Pretty-printed export with two-space indentation.
pub fn export_json(story: &Story, timeline: &TimelineStore) -> Result<String> {
    serde_json::to_string_pretty(&exported(story, timeline)).context("encode document")
}

fn exported<'a>(story: &'a Story, timeline: &'a TimelineStore) -> ExportedDocument<'a> {
    ExportedDocument {
        summary: &story.summary,
        rationale: &story.rationale,
        story: &story.story,
        timeline: timeline.values().collect(),
    }
}

pub fn parse_document(raw: &str) -> Result<ImportedDocument> {
    let value: Value = serde_json::from_str(raw).context("parse document JSON")?;
    Ok(import_value(&value))
}

pub fn import_value(value: &Value) -> ImportedDocument {
    let Some(object) = value.as_object() else {
        warn!("imported document is not a JSON object; nothing copied");
        return ImportedDocument::default();
    };

    let mut story = Story::default();
    for field in StoryField::ALL {
        story.set(field, string_field(object, field.as_str()));
    }

    let timeline = match object.get(TIMELINE_KEY) {
        Some(Value::Array(items)) => items.iter().map(import_event).collect(),
        Some(_) => {
            warn!("imported timeline is not an array; timeline left empty");
            Vec::new()
        }
        None => {
            warn!("imported document has no timeline; timeline left empty");
            Vec::new()
        }
    };

    ImportedDocument { story, timeline }
}

fn import_event(value: &Value) -> TimelineEvent {
    let Some(object) = value.as_object() else {
        return TimelineEvent::default();
    };
    let linked_data = object
        .get("linked_data")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(import_entry).collect())
        .unwrap_or_default();

    TimelineEvent {
        time: string_field(object, "time"),
        event: string_field(object, "event"),
        standard: object
            .get("standard")
            .and_then(Value::as_str)
            .map(str::to_owned),
        linked_data,
    }
}

fn import_entry(value: &Value) -> LinkedDataEntry {
    match value.as_object() {
        Some(object) => LinkedDataEntry::new(
            string_field(object, "dataPath"),
            string_field(object, "exampleData"),
        ),
        None => LinkedDataEntry::default(),
    }
}

fn string_field(object: &Map<String, Value>, key: &str) -> String {
    match object.get(key) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

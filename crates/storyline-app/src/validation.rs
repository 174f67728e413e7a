// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Checks of stored linked-data paths against the loaded standards.

use indexmap::IndexSet;

use crate::{LinkedDataEntry, StandardsCatalog, TimelineEvent, TimelineId, TimelineStore};

/// Drops every bracket group from each dot-separated segment, keeping the
/// text before the first `[`. `a[0].b[].c` becomes `a.b.c`.
pub fn remove_indexing(path: &str) -> String {
    path.split('.')
        .map(|segment| segment.split('[').next().unwrap_or(segment))
        .collect::<Vec<_>>()
        .join(".")
}

/// Form used to compare a stored path with a standard template.
fn comparable(path: &str) -> String {
    remove_indexing(path).to_lowercase()
}

/// Paths that occur more than once, each reported once in first-seen order.
pub fn duplicate_paths<'a, I>(paths: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = IndexSet::new();
    let mut repeated = IndexSet::new();
    for path in paths {
        if !seen.insert(path) {
            repeated.insert(path);
        }
    }
    repeated.into_iter().map(str::to_owned).collect()
}

impl StandardsCatalog {
    /// Entry paths with no matching template in `standard`. Indices and case
    /// are ignored; empty paths are skipped. An unset or unloaded standard
    /// has nothing to compare against and reports nothing.
    pub fn unknown_paths(
        &self,
        standard: Option<&str>,
        entries: &[LinkedDataEntry],
    ) -> Vec<String> {
        let Some(known) = standard.and_then(|name| self.get(name)) else {
            return Vec::new();
        };
        let templates: IndexSet<String> =
            known.data_paths.iter().map(|path| comparable(path)).collect();
        let unknown = entries
            .iter()
            .map(|entry| entry.data_path.as_str())
            .filter(|path| !path.is_empty() && !templates.contains(&comparable(path)))
            .collect::<IndexSet<_>>();
        unknown.into_iter().map(str::to_owned).collect()
    }
}

/// Findings for one timeline event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathReport {
    pub unresolved: usize,
    pub unknown: Vec<String>,
    pub duplicates: Vec<String>,
}

impl PathReport {
    pub fn for_event(event: &TimelineEvent, catalog: &StandardsCatalog) -> Self {
        Self {
            unresolved: event.unresolved_count(),
            unknown: catalog.unknown_paths(event.standard.as_deref(), &event.linked_data),
            duplicates: duplicate_paths(
                event
                    .linked_data
                    .iter()
                    .map(|entry| entry.data_path.as_str())
                    .filter(|path| !path.is_empty()),
            ),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.unresolved == 0 && self.unknown.is_empty() && self.duplicates.is_empty()
    }
}

/// Reports for every event with at least one finding, in timeline order.
pub fn timeline_path_reports(
    store: &TimelineStore,
    catalog: &StandardsCatalog,
) -> Vec<(TimelineId, PathReport)> {
    store
        .iter()
        .map(|(id, event)| (id, PathReport::for_event(event, catalog)))
        .filter(|(_, report)| !report.is_clean())
        .collect()
}

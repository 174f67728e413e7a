// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Placeholder resolution for data-path templates such as `foo[].bar[]`.
//!
//! Only the literal two-character form `[]` is a placeholder. A path that
//! carries filled brackets (`foo[0]`, `foo[abc]`) still counts as containing a
//! bracket pair and opens the popup, but there is nothing to substitute and
//! the path resolves to itself.

pub const PLACEHOLDER: &str = "[]";

/// True when `value` holds a `[` followed somewhere later by a `]`.
pub fn has_bracket_pair(value: &str) -> bool {
    value
        .find('[')
        .is_some_and(|open| value[open + 1..].contains(']'))
}

pub fn placeholder_count(value: &str) -> usize {
    value.matches(PLACEHOLDER).count()
}

/// Replaces the next literal `[]` with `[value]` once per supplied value, in
/// order. Values beyond the number of placeholders are ignored. An empty value
/// writes `[]` back, so the following value lands on the same brackets.
pub fn resolve_placeholders<S: AsRef<str>>(path: &str, values: &[S]) -> String {
    let mut resolved = path.to_owned();
    for value in values {
        resolved = resolved.replacen(PLACEHOLDER, &format!("[{}]", value.as_ref()), 1);
    }
    resolved
}

/// A segment of a template as shown in the popup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSegment {
    Text(String),
    Placeholder(usize),
}

pub fn template_segments(path: &str) -> Vec<TemplateSegment> {
    let mut segments = Vec::new();
    let mut parts = path.split(PLACEHOLDER).peekable();
    let mut index = 0;
    while let Some(part) = parts.next() {
        if !part.is_empty() {
            segments.push(TemplateSegment::Text(part.to_owned()));
        }
        if parts.peek().is_some() {
            segments.push(TemplateSegment::Placeholder(index));
            index += 1;
        }
    }
    segments
}

/// Transient state of the placeholder popup. It never owns model data: it
/// points at one working row of the linked-data editor and keeps the scratch
/// text typed into each placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracketPopup {
    target_row: usize,
    template: String,
    inputs: Vec<String>,
    focus: usize,
}

impl BracketPopup {
    /// Opens a popup for `candidate` when it contains a bracket pair.
    pub fn open(target_row: usize, candidate: &str) -> Option<Self> {
        if !has_bracket_pair(candidate) {
            return None;
        }
        Some(Self {
            target_row,
            template: candidate.to_owned(),
            inputs: vec![String::new(); placeholder_count(candidate)],
            focus: 0,
        })
    }

    pub fn target_row(&self) -> usize {
        self.target_row
    }

    pub(crate) fn retarget(&mut self, row: usize) {
        self.target_row = row;
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn focused_input(&self) -> Option<&str> {
        self.inputs.get(self.focus).map(String::as_str)
    }

    pub fn set_input(&mut self, index: usize, value: impl Into<String>) -> bool {
        match self.inputs.get_mut(index) {
            Some(slot) => {
                *slot = value.into();
                true
            }
            None => false,
        }
    }

    pub fn focus_next(&mut self) {
        if !self.inputs.is_empty() {
            self.focus = (self.focus + 1) % self.inputs.len();
        }
    }

    pub fn focus_prev(&mut self) {
        if !self.inputs.is_empty() {
            self.focus = (self.focus + self.inputs.len() - 1) % self.inputs.len();
        }
    }

    pub fn preview(&self) -> String {
        resolve_placeholders(&self.template, &self.inputs)
    }

    /// Resolves `current` (the target input's value at close time) against the
    /// placeholder inputs.
    pub fn resolve(&self, current: &str) -> String {
        resolve_placeholders(current, &self.inputs)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        BracketPopup, TemplateSegment, has_bracket_pair, placeholder_count, resolve_placeholders,
        template_segments,
    };

    #[test]
    fn bracket_pair_detection_matches_any_brackets() {
        assert!(has_bracket_pair("records[].x"));
        assert!(has_bracket_pair("records[abc].x"));
        assert!(has_bracket_pair("a[b.c]d"));
        assert!(!has_bracket_pair("records.x"));
        assert!(!has_bracket_pair("records].x["));
        assert!(!has_bracket_pair("records[x"));
    }

    #[test]
    fn resolves_placeholders_left_to_right() {
        let resolved = resolve_placeholders("records[].value[].x", &["0", "2"]);
        assert_eq!(resolved, "records[0].value[2].x");
    }

    #[test]
    fn filled_brackets_resolve_unchanged() {
        assert_eq!(placeholder_count("records[abc].x"), 0);
        let resolved = resolve_placeholders::<&str>("records[abc].x", &[]);
        assert_eq!(resolved, "records[abc].x");
    }

    #[test]
    fn mixed_brackets_only_fill_empty_ones() {
        let resolved = resolve_placeholders("a[1].b[].c[]", &["x", "y"]);
        assert_eq!(resolved, "a[1].b[x].c[y]");
    }

    #[test]
    fn empty_placeholder_value_leaves_next_value_on_first_brackets() {
        let resolved = resolve_placeholders("a[].b[]", &["", "3"]);
        assert_eq!(resolved, "a[3].b[]");
    }

    #[test]
    fn popup_skipped_without_bracket_pair() {
        assert!(BracketPopup::open(0, "Patient.name").is_none());
    }

    #[test]
    fn popup_opens_with_one_input_per_placeholder() {
        let popup = BracketPopup::open(2, "records[].value[].x").expect("popup opens");
        assert_eq!(popup.target_row(), 2);
        assert_eq!(popup.inputs().len(), 2);
    }

    #[test]
    fn popup_opens_without_inputs_for_filled_brackets() {
        let popup = BracketPopup::open(0, "records[abc].x").expect("popup opens");
        assert!(popup.inputs().is_empty());
        assert_eq!(popup.resolve("records[abc].x"), "records[abc].x");
    }

    #[test]
    fn focus_wraps_in_both_directions() {
        let mut popup = BracketPopup::open(0, "a[].b[].c[]").expect("popup opens");
        popup.focus_prev();
        assert_eq!(popup.focus(), 2);
        popup.focus_next();
        assert_eq!(popup.focus(), 0);
    }

    #[test]
    fn preview_tracks_typed_values() {
        let mut popup = BracketPopup::open(0, "a[].b[]").expect("popup opens");
        assert!(popup.set_input(1, "7"));
        assert!(!popup.set_input(2, "9"));
        assert_eq!(popup.preview(), "a[7].b[]");
    }

    #[test]
    fn segments_split_template_around_placeholders() {
        assert_eq!(
            template_segments("a[].b[]"),
            vec![
                TemplateSegment::Text("a".to_owned()),
                TemplateSegment::Placeholder(0),
                TemplateSegment::Text(".b".to_owned()),
                TemplateSegment::Placeholder(1),
            ]
        );
    }
}

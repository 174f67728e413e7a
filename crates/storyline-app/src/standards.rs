// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const STANDARD_FILE_SUFFIX: &str = ".json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standard {
    #[serde(rename = "dataPaths")]
    pub data_paths: Vec<String>,
}

/// Named collections of data-path templates. Loading a standard merges into
/// the catalog; a name that is already present is overwritten in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardsCatalog {
    standards: IndexMap<String, Standard>,
}

impl StandardsCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, paths: Vec<String>) {
        self.standards.insert(
            name.into(),
            Standard {
                data_paths: clean_paths(paths),
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&Standard> {
        self.standards.get(name)
    }

    /// Paths of `name`, or an empty list when the standard is unknown.
    pub fn paths_for(&self, name: Option<&str>) -> &[String] {
        name.and_then(|name| self.standards.get(name))
            .map(|standard| standard.data_paths.as_slice())
            .unwrap_or(&[])
    }

    pub fn names(&self) -> Vec<&str> {
        self.standards.keys().map(String::as_str).collect()
    }

    pub fn first_name(&self) -> Option<&str> {
        self.standards.keys().next().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.standards.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.standards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.standards.is_empty()
    }

    /// Name following `current` in load order, wrapping around.
    pub fn cycle(&self, current: Option<&str>, delta: isize) -> Option<&str> {
        if self.standards.is_empty() {
            return None;
        }
        let len = self.standards.len() as isize;
        let next = match current.and_then(|name| self.standards.get_index_of(name)) {
            Some(index) => (index as isize + delta).rem_euclid(len),
            None if delta < 0 => len - 1,
            None => 0,
        };
        self.standards
            .get_index(next as usize)
            .map(|(name, _)| name.as_str())
    }
}

/// Derives a standard name from a file name by removing the first `.json`.
pub fn standard_name_from_file_name(file_name: &str) -> String {
    file_name.replacen(STANDARD_FILE_SUFFIX, "", 1)
}

/// Parses the contents of a standards file: a JSON array whose falsy entries
/// (`""`, `null`, `false`, `0`) are dropped.
pub fn parse_standard_paths(raw: &str) -> Result<Vec<String>> {
    let value: Value = serde_json::from_str(raw).context("parse standards JSON")?;
    let Value::Array(items) = value else {
        bail!("standards file must hold a JSON array of data paths");
    };
    Ok(items.into_iter().filter_map(path_from_value).collect())
}

fn path_from_value(value: Value) -> Option<String> {
    match value {
        Value::String(path) => Some(path),
        Value::Null | Value::Bool(false) => None,
        Value::Number(number) if number.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}

fn clean_paths(paths: Vec<String>) -> Vec<String> {
    paths
        .into_iter()
        .filter(|path| !path.is_empty())
        .collect::<IndexSet<String>>()
        .into_iter()
        .collect()
}

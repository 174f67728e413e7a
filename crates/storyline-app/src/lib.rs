// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod bracket;
pub mod document;
pub mod editor;
pub mod ids;
pub mod model;
pub mod standards;
pub mod state;
pub mod timeline;
pub mod validation;
pub mod workspace;

pub use bracket::{BracketPopup, TemplateSegment};
pub use document::ImportedDocument;
pub use editor::*;
pub use ids::*;
pub use model::*;
pub use standards::*;
pub use state::*;
pub use timeline::*;
pub use validation::{PathReport, duplicate_paths, remove_indexing, timeline_path_reports};
pub use workspace::*;

//! Core annotation data model.
//!
//! An [`Annotation`] is one marked span in one document: character offsets,
//! the surface text, a label, and (in entity-linking runs) a normalization
//! code. [`DocumentGroups`] holds the annotations of a whole run grouped by
//! source document, which is the unit the scorer works on.
//!
//! Two annotations are identical iff all present fields are pairwise equal.
//! Fields are typed: offsets are integers, everything else is a string, so
//! `"10"` in a text field never equals offset `10`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// Scoring Task
// =============================================================================

/// Which annotation shape a run scores.
///
/// The two shapes correspond to the two subtasks of the clinical shared
/// tasks: span detection (NER) and span+code linking (normalization).
/// A single run must use one shape for both the reference and the
/// prediction set; the loader enforces this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Task {
    /// Named-entity spans: `(document, start, end, text, label)`.
    #[default]
    Ner,

    /// Linked spans: `(document, start, end, text, label, code)`.
    Linking,
}

impl Task {
    /// Human-readable name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Task::Ner => "ner",
            Task::Linking => "linking",
        }
    }

    /// Whether annotations of this task carry a normalization code.
    #[must_use]
    pub fn has_code(&self) -> bool {
        matches!(self, Task::Linking)
    }
}

// =============================================================================
// Annotation
// =============================================================================

/// A single annotated span of a document.
///
/// `code` is `Some` only for [`Task::Linking`] runs. Equality is derived:
/// every present field must match, field by field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Annotation {
    /// Identifier of the source document (the shared tasks use filenames).
    pub document_id: String,
    /// Start character offset.
    pub start: usize,
    /// End character offset (exclusive).
    pub end: usize,
    /// Surface text of the span.
    pub text: String,
    /// Entity label (e.g. "SINTOMA", "ENFERMEDAD").
    pub label: String,
    /// Normalization code (SNOMED CT etc.), linking runs only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl Annotation {
    /// Create a span-detection annotation (no code).
    #[must_use]
    pub fn new(
        document_id: impl Into<String>,
        start: usize,
        end: usize,
        text: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            start,
            end,
            text: text.into(),
            label: label.into(),
            code: None,
        }
    }

    /// Attach a normalization code, turning this into a linking annotation.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Key used to deduplicate predictions: `(filename, label, start, end)`.
    #[must_use]
    pub fn dedup_key(&self) -> (&str, &str, usize, usize) {
        (&self.document_id, &self.label, self.start, self.end)
    }
}

// =============================================================================
// Document Grouping
// =============================================================================

/// Annotations of one record set, grouped by source document.
///
/// Documents iterate in sorted-id order, so scoring output is deterministic
/// regardless of input row order. Within a document, annotations keep the
/// order they were pushed in (input row order), which the matcher relies on
/// for its first-match-wins contract.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentGroups {
    groups: BTreeMap<String, Vec<Annotation>>,
}

impl DocumentGroups {
    /// Create an empty grouping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a grouping from a flat sequence of annotations.
    pub fn from_annotations(annotations: impl IntoIterator<Item = Annotation>) -> Self {
        let mut groups = Self::new();
        for annotation in annotations {
            groups.push(annotation);
        }
        groups
    }

    /// Add one annotation to its document's group.
    pub fn push(&mut self, annotation: Annotation) {
        self.groups
            .entry(annotation.document_id.clone())
            .or_default()
            .push(annotation);
    }

    /// Annotations of one document, if present.
    #[must_use]
    pub fn get(&self, document_id: &str) -> Option<&[Annotation]> {
        self.groups.get(document_id).map(Vec::as_slice)
    }

    /// Whether a document is present in this grouping.
    #[must_use]
    pub fn contains(&self, document_id: &str) -> bool {
        self.groups.contains_key(document_id)
    }

    /// Iterate `(document id, annotations)` in sorted-id order.
    pub fn documents(&self) -> impl Iterator<Item = (&str, &[Annotation])> {
        self.groups
            .iter()
            .map(|(id, anns)| (id.as_str(), anns.as_slice()))
    }

    /// Document ids in sorted order.
    pub fn document_ids(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Number of documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether the grouping holds no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of annotations across all documents.
    #[must_use]
    pub fn annotation_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}

// =============================================================================
// Tests
// =============================================================================

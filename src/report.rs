//! Score report: the engine's output contract.
//!
//! [`ScoreReport`] is created fresh by every scoring invocation and never
//! mutated after return. It carries the per-document and micro-averaged
//! scores, the raw confusion counts and diagnostics, the false-negative
//! frequency table, and the full TP/FP/FN entity buckets. Downstream writers
//! render it as a plain-text report or persist it as JSON; both renderings
//! live here so every consumer sees the same field set.
//!
//! Ratios are rounded to 4 decimal digits at report construction; the engine
//! computes with full precision up to that point.

use crate::annotation::Annotation;
use crate::{Error, Result};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::Path;

/// Round a ratio to 4 decimal digits.
#[must_use]
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

// =============================================================================
// Report Structure
// =============================================================================

/// Full output of one scoring run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreReport {
    /// Micro-averaged scores over cumulative counts.
    pub total: DocumentScore,
    /// Per-document scores, keyed by document id.
    pub documents: BTreeMap<String, DocumentScore>,
    /// Raw counts and diagnostic statistics.
    pub statistics: ScoreStatistics,
    /// False-negative surface texts by descending frequency.
    pub fn_freq: FnFrequency,
    /// The matched and unmatched annotations themselves.
    pub entities: EntityReport,
}

/// Precision/recall/F1 triple, rounded to 4 decimals.
///
/// Field order matches the reference scorer's output (recall first).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DocumentScore {
    /// TP / (TP + FN), 0 when the denominator is 0.
    pub recall: f64,
    /// TP / (TP + FP), 0 when the denominator is 0.
    pub precision: f64,
    /// Harmonic mean, 0 whenever either precision or recall is 0.
    pub f_score: f64,
}

impl DocumentScore {
    /// Compute rounded scores from confusion counts.
    ///
    /// F1 is defined as 0 when either component is 0, not just when both
    /// are: a perfect-recall/zero-precision document scores 0.
    #[must_use]
    pub fn from_counts(tp: usize, fp: usize, fn_: usize) -> Self {
        let precision = if tp + fp > 0 {
            tp as f64 / (tp + fp) as f64
        } else {
            0.0
        };
        let recall = if tp + fn_ > 0 {
            tp as f64 / (tp + fn_) as f64
        } else {
            0.0
        };
        let f_score = if precision == 0.0 || recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };
        Self {
            recall: round4(recall),
            precision: round4(precision),
            f_score: round4(f_score),
        }
    }
}

/// Raw counts and diagnostics accumulated over all reference documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreStatistics {
    /// Annotations in the reference set.
    pub total_gold_annotations: usize,
    /// Annotations in the prediction set (after dedup, reference docs only).
    pub total_predictions: usize,
    /// Exact-tuple matches.
    pub true_positives: usize,
    /// Unmatched predictions.
    pub false_positives: usize,
    /// Unmatched reference annotations.
    pub false_negatives: usize,
    /// Scanned pairs whose spans nearly but not exactly matched.
    pub fn_almost_tp: usize,
    /// Mean start offset of true + false positives, 0 when none.
    pub p_average_start_span: usize,
    /// Mean start offset of false negatives, 0 when none.
    pub fn_average_start_span: usize,
}

/// One confusion bucket, both flattened and grouped by document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EntityBucket {
    /// All annotations of the bucket, in document-sorted scan order.
    pub flat: Vec<Annotation>,
    /// The same annotations keyed by document id.
    pub by_document: BTreeMap<String, Vec<Annotation>>,
}

impl EntityBucket {
    /// Record one document's share of the bucket.
    pub fn extend(&mut self, document_id: &str, annotations: Vec<Annotation>) {
        self.flat.extend(annotations.iter().cloned());
        self.by_document
            .entry(document_id.to_string())
            .or_default()
            .extend(annotations);
    }
}

/// The three confusion buckets.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EntityReport {
    /// Matched predictions.
    pub true_positives: EntityBucket,
    /// Unmatched predictions.
    pub false_positives: EntityBucket,
    /// Unmatched reference annotations.
    pub false_negatives: EntityBucket,
}

// =============================================================================
// False-negative frequency table
// =============================================================================

/// Ordered mapping from false-negative surface text to occurrence count.
///
/// Sorted by descending count; ties keep first-encounter order (the sort is
/// stable). Serializes as a JSON map in that order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FnFrequency(Vec<(String, usize)>);

impl FnFrequency {
    /// Count surface-text occurrences over a flat annotation list.
    #[must_use]
    pub fn from_annotations(annotations: &[Annotation]) -> Self {
        let mut entries: Vec<(String, usize)> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();
        for annotation in annotations {
            match index.get(annotation.text.as_str()) {
                Some(&at) => entries[at].1 += 1,
                None => {
                    index.insert(&annotation.text, entries.len());
                    entries.push((annotation.text.clone(), 1));
                }
            }
        }
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        Self(entries)
    }

    /// Iterate `(surface text, count)` in table order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(text, count)| (text.as_str(), *count))
    }

    /// Count for one surface text, if present.
    #[must_use]
    pub fn get(&self, text: &str) -> Option<usize> {
        self.0
            .iter()
            .find(|(t, _)| t == text)
            .map(|(_, count)| *count)
    }

    /// Number of distinct surface texts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for FnFrequency {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        // A derived map type would re-sort keys; stream entries so the
        // descending-count order survives serialization.
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (text, count) in &self.0 {
            map.serialize_entry(text, count)?;
        }
        map.end()
    }
}

// =============================================================================
// Rendering
// =============================================================================

const RULE: &str = "-------------------------------------------------------------------";

impl ScoreReport {
    /// Render the plain-text report.
    ///
    /// `verbose` prepends a per-document score section, as the shared-task
    /// scorer does.
    #[must_use]
    pub fn render(&self, verbose: bool) -> String {
        let mut out = String::new();

        if verbose {
            for (document_id, scores) in &self.documents {
                out.push_str(&format!(
                    "{RULE}\nResults for document: {}\n{RULE}\n",
                    document_id
                ));
                out.push_str(&format!("Precision: {}\n", scores.precision));
                out.push_str(&format!("Recall: {}\n", scores.recall));
                out.push_str(&format!("F-score: {}\n", scores.f_score));
            }
        }

        out.push_str(&format!("{RULE}\nOverall results:\n{RULE}\n"));
        out.push_str(&format!(
            "Micro-average precision: {}\n",
            self.total.precision
        ));
        out.push_str(&format!("Micro-average recall: {}\n", self.total.recall));
        out.push_str(&format!("Micro-average F-score: {}\n", self.total.f_score));

        let s = &self.statistics;
        out.push_str(&format!("{RULE}\nStatistics:\n{RULE}\n"));
        out.push_str(&format!(
            "Total gold annotations: {}\n",
            s.total_gold_annotations
        ));
        out.push_str(&format!("Total predictions: {}\n", s.total_predictions));
        out.push_str(&format!("True positives: {}\n", s.true_positives));
        out.push_str(&format!("False positives: {}\n", s.false_positives));
        out.push_str(&format!("False negatives: {}\n", s.false_negatives));
        out.push_str(&format!(
            "False negatives that were almost true positives: {}\n",
            s.fn_almost_tp
        ));
        out.push_str(&format!(
            "Average \"span start\" of true + false positives: {}\n",
            s.p_average_start_span
        ));
        out.push_str(&format!(
            "Average \"span start\" of false negatives: {}\n",
            s.fn_average_start_span
        ));

        if !self.fn_freq.is_empty() {
            out.push_str(&format!("{RULE}\nFalse negative frequency:\n{RULE}\n"));
            for (text, count) in self.fn_freq.iter() {
                out.push_str(&format!("{} | {}\n", count, text));
            }
        }

        out
    }

    /// Export the report as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::evaluation(format!("JSON serialization failed: {}", e)))
    }

    /// Write the plain-text report to a file.
    pub fn write(&self, path: impl AsRef<Path>, verbose: bool) -> Result<()> {
        fs::write(path, self.render(verbose))?;
        Ok(())
    }

    /// Write the JSON report to a file.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

impl fmt::Display for ScoreReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render(false))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round4() {
        assert_eq!(round4(1.0 / 3.0), 0.3333);
        assert_eq!(round4(2.0 / 3.0), 0.6667);
        assert_eq!(round4(6.0 / 7.0), 0.8571);
        assert_eq!(round4(0.0), 0.0);
        assert_eq!(round4(1.0), 1.0);
    }

    #[test]
    fn test_document_score_from_counts() {
        let perfect = DocumentScore::from_counts(3, 0, 0);
        assert_eq!(perfect.precision, 1.0);
        assert_eq!(perfect.recall, 1.0);
        assert_eq!(perfect.f_score, 1.0);

        // Zero denominators score 0 by convention, not an error.
        let empty = DocumentScore::from_counts(0, 0, 0);
        assert_eq!(empty.precision, 0.0);
        assert_eq!(empty.recall, 0.0);
        assert_eq!(empty.f_score, 0.0);

        // Either component at 0 forces F1 to 0.
        let no_match = DocumentScore::from_counts(0, 2, 3);
        assert_eq!(no_match.f_score, 0.0);

        let mixed = DocumentScore::from_counts(2, 1, 1);
        assert_eq!(mixed.precision, 0.6667);
        assert_eq!(mixed.recall, 0.6667);
        assert_eq!(mixed.f_score, 0.6667);
    }

    #[test]
    fn test_fn_frequency_stable_descending() {
        let annotations = vec![
            Annotation::new("d1", 0, 1, "dolor", "L"),
            Annotation::new("d1", 2, 3, "tos", "L"),
            Annotation::new("d1", 4, 5, "fiebre", "L"),
            Annotation::new("d2", 0, 1, "tos", "L"),
        ];
        let freq = FnFrequency::from_annotations(&annotations);
        let entries: Vec<(&str, usize)> = freq.iter().collect();
        // "tos" leads on count; "dolor" and "fiebre" tie and keep the order
        // they were first seen in.
        assert_eq!(entries, vec![("tos", 2), ("dolor", 1), ("fiebre", 1)]);
        assert_eq!(freq.get("tos"), Some(2));
        assert_eq!(freq.get("disnea"), None);
    }

    #[test]
    fn test_fn_frequency_serializes_in_order() {
        let annotations = vec![
            Annotation::new("d1", 0, 1, "zeta", "L"),
            Annotation::new("d1", 2, 3, "alfa", "L"),
            Annotation::new("d2", 0, 1, "zeta", "L"),
        ];
        let freq = FnFrequency::from_annotations(&annotations);
        let json = serde_json::to_string(&freq).unwrap();
        // Count order, not key order.
        assert_eq!(json, r#"{"zeta":2,"alfa":1}"#);
    }

    #[test]
    fn test_render_contains_contract_fields() {
        let report = sample_report();
        let text = report.render(false);
        assert!(text.contains("Micro-average precision: 1"));
        assert!(text.contains("Total gold annotations: 1"));
        assert!(text.contains("False negatives that were almost true positives: 0"));
        assert!(!text.contains("Results for document"));

        let verbose = report.render(true);
        assert!(verbose.contains("Results for document: doc1"));
    }

    #[test]
    fn test_json_exposes_contract_fields() {
        let json = sample_report().to_json().unwrap();
        for key in [
            "\"total\"",
            "\"statistics\"",
            "\"fn_freq\"",
            "\"entities\"",
            "\"fn_almost_tp\"",
            "\"p_average_start_span\"",
            "\"fn_average_start_span\"",
            "\"true_positives\"",
        ] {
            assert!(json.contains(key), "missing {} in {}", key, json);
        }
    }

    fn sample_report() -> ScoreReport {
        let annotation = Annotation::new("doc1", 10, 15, "dolor", "SINTOMA");
        let mut tp = EntityBucket::default();
        tp.extend("doc1", vec![annotation]);
        ScoreReport {
            total: DocumentScore::from_counts(1, 0, 0),
            documents: BTreeMap::from([("doc1".to_string(), DocumentScore::from_counts(1, 0, 0))]),
            statistics: ScoreStatistics {
                total_gold_annotations: 1,
                total_predictions: 1,
                true_positives: 1,
                false_positives: 0,
                false_negatives: 0,
                fn_almost_tp: 0,
                p_average_start_span: 10,
                fn_average_start_span: 0,
            },
            fn_freq: FnFrequency::default(),
            entities: EntityReport {
                true_positives: tp,
                ..EntityReport::default()
            },
        }
    }
}

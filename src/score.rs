//! Annotation matching and scoring engine.
//!
//! The core of the crate: aligns predicted annotations against a reference
//! set per document, classifies them into true/false positives and false
//! negatives under an exact-match contract, and aggregates micro-averaged
//! precision/recall/F1 plus near-miss and frequency diagnostics into a
//! [`ScoreReport`].
//!
//! # Matching contract
//!
//! Matching is per document and first-match-wins: each reference annotation
//! claims the first not-yet-claimed prediction equal to it in every field.
//! This is deliberately not an optimal bipartite matching — it reproduces the
//! shared-task reference scorer, and the two only diverge when duplicate
//! annotations sit on overlapping offsets.
//!
//! While scanning, every (reference, prediction) pair is also tested against
//! a near-miss predicate (boundaries close but not identical). Near misses
//! are a diagnostic counter only; they never affect TP/FP/FN.
//!
//! ```rust
//! use medeval::{score, Annotation, DocumentGroups};
//!
//! let reference = DocumentGroups::from_annotations(vec![
//!     Annotation::new("doc1", 10, 15, "dolor", "SINTOMA"),
//! ]);
//! let predicted = reference.clone();
//!
//! let report = score(&reference, &predicted);
//! assert_eq!(report.total.f_score, 1.0);
//! ```

use crate::annotation::{Annotation, DocumentGroups};
use crate::report::{
    DocumentScore, EntityBucket, EntityReport, FnFrequency, ScoreReport, ScoreStatistics,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// Configuration
// =============================================================================

/// Near-miss thresholds for the scoring engine.
///
/// A prediction is a near miss of a reference annotation when its boundaries
/// are close but not identical: either exactly one boundary is off and by
/// less than `single_boundary`, or both are off and each by less than
/// `both_boundaries`. The defaults (20/5) are the shared-task convention;
/// scoring runs always use them, the knobs exist for diagnostics and tests.
///
/// # Example
///
/// ```rust
/// use medeval::ScoreConfig;
///
/// let config = ScoreConfig::new().with_both_boundaries(10);
/// assert_eq!(config.single_boundary, 20);
/// assert_eq!(config.both_boundaries, 10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreConfig {
    /// Maximum offset difference when only one boundary differs.
    pub single_boundary: usize,
    /// Maximum per-boundary difference when both boundaries differ.
    pub both_boundaries: usize,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            single_boundary: 20,
            both_boundaries: 5,
        }
    }
}

impl ScoreConfig {
    /// Create a configuration with the shared-task defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the single-boundary near-miss threshold.
    #[must_use]
    pub fn with_single_boundary(mut self, threshold: usize) -> Self {
        self.single_boundary = threshold;
        self
    }

    /// Set the both-boundaries near-miss threshold.
    #[must_use]
    pub fn with_both_boundaries(mut self, threshold: usize) -> Self {
        self.both_boundaries = threshold;
        self
    }
}

// =============================================================================
// Near-miss predicate
// =============================================================================

/// Check whether a prediction nearly but not exactly matches a reference
/// annotation's span.
///
/// With `sd = |gold_start - pred_start|` and `ed = |gold_end - pred_end|`:
/// exactly one of sd/ed nonzero and both under `single_boundary`, or both
/// nonzero and both under `both_boundaries`. An exact span match (sd and ed
/// both zero) is never a near miss.
#[must_use]
pub fn near_miss(gold: &Annotation, pred: &Annotation, config: &ScoreConfig) -> bool {
    let sd = gold.start.abs_diff(pred.start);
    let ed = gold.end.abs_diff(pred.end);
    ((sd != 0) ^ (ed != 0)) && sd < config.single_boundary && ed < config.single_boundary
        || sd != 0 && ed != 0 && sd < config.both_boundaries && ed < config.both_boundaries
}

// =============================================================================
// Per-document matching
// =============================================================================

/// Outcome of matching one document's predictions against its reference.
#[derive(Debug, Clone, Default)]
struct DocumentMatch {
    true_positives: Vec<Annotation>,
    false_positives: Vec<Annotation>,
    false_negatives: Vec<Annotation>,
    near_misses: usize,
}

/// Match one document.
///
/// Index-marking over immutable snapshots: a consumed prediction is skipped
/// for later reference annotations, which reproduces the reference scorer's
/// remove-from-list behavior without mutating during iteration.
fn match_document(
    gold: &[Annotation],
    predicted: &[Annotation],
    config: &ScoreConfig,
) -> DocumentMatch {
    let mut gold_consumed = vec![false; gold.len()];
    let mut pred_consumed = vec![false; predicted.len()];
    let mut result = DocumentMatch::default();

    for (gi, gold_ann) in gold.iter().enumerate() {
        for (pi, pred_ann) in predicted.iter().enumerate() {
            if pred_consumed[pi] {
                continue;
            }
            // Diagnostic check runs on every scanned pair, so one reference
            // annotation can contribute several near misses.
            if near_miss(gold_ann, pred_ann, config) {
                result.near_misses += 1;
            }
            if gold_ann == pred_ann {
                gold_consumed[gi] = true;
                pred_consumed[pi] = true;
                result.true_positives.push(pred_ann.clone());
                break;
            }
        }
    }

    for (pi, pred_ann) in predicted.iter().enumerate() {
        if !pred_consumed[pi] {
            result.false_positives.push(pred_ann.clone());
        }
    }
    for (gi, gold_ann) in gold.iter().enumerate() {
        if !gold_consumed[gi] {
            result.false_negatives.push(gold_ann.clone());
        }
    }

    result
}

// =============================================================================
// Scoring
// =============================================================================

/// Running totals folded over per-document match results.
#[derive(Debug, Clone, Default)]
struct Totals {
    gold: usize,
    predicted: usize,
    tp: usize,
    fp: usize,
    fn_: usize,
    near_misses: usize,
}

/// Score a prediction grouping against a reference grouping.
///
/// Pure function: no I/O, no state across invocations. Uses the shared-task
/// near-miss thresholds; see [`score_with_config`] to override them.
///
/// Every document of the reference grouping is matched independently; a
/// document absent from the predictions scores against an empty prediction
/// list. Documents present only in the predictions are dropped entirely —
/// they contribute to neither the counts nor the totals. That asymmetry
/// follows the shared-task reference scorer.
#[must_use]
pub fn score(reference: &DocumentGroups, predicted: &DocumentGroups) -> ScoreReport {
    score_with_config(reference, predicted, &ScoreConfig::default())
}

/// Score with explicit near-miss thresholds.
#[must_use]
pub fn score_with_config(
    reference: &DocumentGroups,
    predicted: &DocumentGroups,
    config: &ScoreConfig,
) -> ScoreReport {
    let mut totals = Totals::default();
    let mut documents = BTreeMap::new();
    let mut tp_bucket = EntityBucket::default();
    let mut fp_bucket = EntityBucket::default();
    let mut fn_bucket = EntityBucket::default();

    for (document_id, gold) in reference.documents() {
        let preds = predicted.get(document_id).unwrap_or(&[]);
        let matched = match_document(gold, preds, config);

        totals.gold += gold.len();
        totals.predicted += preds.len();
        totals.tp += matched.true_positives.len();
        totals.fp += matched.false_positives.len();
        totals.fn_ += matched.false_negatives.len();
        totals.near_misses += matched.near_misses;

        documents.insert(
            document_id.to_string(),
            DocumentScore::from_counts(
                matched.true_positives.len(),
                matched.false_positives.len(),
                matched.false_negatives.len(),
            ),
        );

        // The TP map only lists documents that produced a match; the FP/FN
        // maps carry every reference document, empty or not. This mirrors
        // the reference scorer's output shape.
        if !matched.true_positives.is_empty() {
            tp_bucket.extend(document_id, matched.true_positives);
        }
        fp_bucket.extend(document_id, matched.false_positives);
        fn_bucket.extend(document_id, matched.false_negatives);
    }

    let statistics = ScoreStatistics {
        total_gold_annotations: totals.gold,
        total_predictions: totals.predicted,
        true_positives: totals.tp,
        false_positives: totals.fp,
        false_negatives: totals.fn_,
        fn_almost_tp: totals.near_misses,
        p_average_start_span: average_start(tp_bucket.flat.iter().chain(fp_bucket.flat.iter())),
        fn_average_start_span: average_start(fn_bucket.flat.iter()),
    };

    ScoreReport {
        total: DocumentScore::from_counts(totals.tp, totals.fp, totals.fn_),
        documents,
        statistics,
        fn_freq: FnFrequency::from_annotations(&fn_bucket.flat),
        entities: EntityReport {
            true_positives: tp_bucket,
            false_positives: fp_bucket,
            false_negatives: fn_bucket,
        },
    }
}

/// Arithmetic mean of start offsets, rounded to the nearest integer.
/// 0 when the set is empty.
fn average_start<'a>(annotations: impl Iterator<Item = &'a Annotation>) -> usize {
    let (mut sum, mut count) = (0usize, 0usize);
    for annotation in annotations {
        sum += annotation.start;
        count += 1;
    }
    if count == 0 {
        0
    } else {
        (sum as f64 / count as f64).round() as usize
    }
}

// =============================================================================
// Tests
// =============================================================================


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_annotation() -> impl Strategy<Value = Annotation> {
        (
            prop_oneof![Just("doc1"), Just("doc2"), Just("doc3")],
            0usize..60,
            1usize..12,
            prop_oneof![Just("dolor"), Just("tos"), Just("fiebre"), Just("disnea")],
            prop_oneof![Just("SINTOMA"), Just("ENFERMEDAD")],
        )
            .prop_map(|(doc, start, len, text, label)| {
                Annotation::new(doc, start, start + len, text, label)
            })
    }

    fn arb_groups(max: usize) -> impl Strategy<Value = DocumentGroups> {
        prop::collection::vec(arb_annotation(), 0..max).prop_map(DocumentGroups::from_annotations)
    }

    proptest! {
        #[test]
        fn count_identities_hold(reference in arb_groups(20), predicted in arb_groups(20)) {
            let report = score(&reference, &predicted);
            let s = &report.statistics;
            prop_assert_eq!(s.true_positives + s.false_negatives, s.total_gold_annotations);
            prop_assert_eq!(s.true_positives + s.false_positives, s.total_predictions);
        }

        #[test]
        fn scoring_is_idempotent(reference in arb_groups(15), predicted in arb_groups(15)) {
            let first = score(&reference, &predicted);
            let second = score(&reference, &predicted);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn perfect_prediction_scores_one(reference in arb_groups(15)) {
            let report = score(&reference, &reference.clone());
            let s = &report.statistics;
            prop_assert_eq!(s.false_positives, 0);
            prop_assert_eq!(s.false_negatives, 0);
            if s.total_gold_annotations > 0 {
                prop_assert_eq!(report.total.precision, 1.0);
                prop_assert_eq!(report.total.recall, 1.0);
                prop_assert_eq!(report.total.f_score, 1.0);
            }
        }

        #[test]
        fn near_miss_count_monotone_in_thresholds(
            reference in arb_groups(12),
            predicted in arb_groups(12),
            single in 0usize..30,
            both in 0usize..10,
            bump in 0usize..15,
        ) {
            let narrow = ScoreConfig { single_boundary: single, both_boundaries: both };
            let wide = ScoreConfig {
                single_boundary: single + bump,
                both_boundaries: both + bump,
            };
            let narrow_count = score_with_config(&reference, &predicted, &narrow)
                .statistics
                .fn_almost_tp;
            let wide_count = score_with_config(&reference, &predicted, &wide)
                .statistics
                .fn_almost_tp;
            prop_assert!(narrow_count <= wide_count);
        }
    }
}

//! # medeval
//!
//! Shared-task scorer for clinical NER and entity-linking annotations.
//!
//! Evaluates automatically produced annotations (named-entity spans, and
//! span+code links) against a human-curated reference, producing micro-
//! averaged precision/recall/F1 and diagnostic statistics per document and
//! overall. Reproduces the scoring convention of the DisTEMIST/SympTEMIST/
//! MultiCardioNER family of shared tasks: exact-match counting, first-match-
//! wins pairing, near-miss and frequency diagnostics.
//!
//! ## Quick Start
//!
//! ```rust
//! use medeval::{score, RecordSetLoader, Task};
//!
//! let loader = RecordSetLoader::new(Task::Ner);
//! let reference = loader.parse_reference(
//!     "filename\tlabel\tstart_span\tend_span\ttext\n\
//!      doc1\tSINTOMA\t10\t15\tdolor\n",
//! )?;
//! let predicted = loader.parse_predictions(
//!     "filename\tlabel\tstart_span\tend_span\ttext\n\
//!      doc1\tSINTOMA\t10\t15\tdolor\n",
//! )?;
//!
//! let report = score(&reference, &predicted);
//! assert_eq!(report.total.f_score, 1.0);
//! println!("{}", report);
//! # Ok::<(), medeval::Error>(())
//! ```
//!
//! ## Pipeline
//!
//! ```text
//! reference.tsv ──┐
//!                 ├─ RecordSetLoader ─ DocumentGroups ─┐
//! predictions.tsv ┘                                    ├─ score() ─ ScoreReport
//!                                                      ┘
//! ```
//!
//! The loader is a thin boundary adapter over the shared-task TSV submission
//! format; the engine in [`score`] is a pure function over the two groupings.

#![warn(missing_docs)]

pub mod annotation;
pub mod cli;
pub mod error;
pub mod loader;
pub mod report;
pub mod score;

pub use annotation::{Annotation, DocumentGroups, Task};
pub use error::{Error, Result};
pub use loader::RecordSetLoader;
pub use report::{
    DocumentScore, EntityBucket, EntityReport, FnFrequency, ScoreReport, ScoreStatistics,
};
pub use score::{near_miss, score, score_with_config, ScoreConfig};

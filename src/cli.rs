//! CLI argument parsing and entry point.

use crate::annotation::Task;
use crate::loader::RecordSetLoader;
use crate::score::score;
use crate::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Score clinical annotation predictions against a reference set
#[derive(Parser, Debug)]
#[command(name = "medeval")]
#[command(
    author,
    version,
    about = "Score clinical annotation predictions against a reference set",
    long_about = r#"
medeval - shared-task scorer for clinical NER and entity-linking annotations

Compares a prediction TSV against a gold-standard TSV, per document, under
the exact-match contract of the DisTEMIST/SympTEMIST/MultiCardioNER family
of shared tasks, and reports micro-averaged precision/recall/F1 together
with confusion counts, near-miss and false-negative-frequency diagnostics.

Both files need a header row with the columns
  filename  start_span  end_span  text  label
plus `code` for the linking task. Column order is free; extra columns are
ignored. Predictions are deduplicated on (filename, label, start_span,
end_span) before scoring.

EXAMPLES:
  medeval -r gold.tsv -p preds.tsv
  medeval -r gold.tsv -p preds.tsv -o results.txt --verbose
  medeval --task linking -r gold.tsv -p preds.tsv -o results.json --json
"#
)]
pub struct Cli {
    /// TSV file with gold standard or reference annotations
    #[arg(short, long, value_name = "PATH")]
    pub reference: PathBuf,

    /// TSV file with predictions
    #[arg(short, long, value_name = "PATH")]
    pub prediction: PathBuf,

    /// Write the scoring results here instead of stdout
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Annotation shape to score
    #[arg(short, long, value_enum, default_value = "ner")]
    pub task: TaskArg,

    /// Emit the report as JSON instead of plain text
    #[arg(long)]
    pub json: bool,

    /// Include per-document scores in the text report
    #[arg(short, long)]
    pub verbose: bool,
}

/// Task selector for the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TaskArg {
    /// Named-entity spans (no code column)
    Ner,
    /// Spans with normalization codes
    Linking,
}

impl From<TaskArg> for Task {
    fn from(arg: TaskArg) -> Self {
        match arg {
            TaskArg::Ner => Task::Ner,
            TaskArg::Linking => Task::Linking,
        }
    }
}

/// Load both record sets, score them, and emit the report.
pub fn run(cli: Cli) -> Result<()> {
    let task = Task::from(cli.task);
    let loader = RecordSetLoader::new(task);

    let reference = loader.load_reference(&cli.reference)?;
    let predicted = loader.load_predictions(&cli.prediction)?;

    // The engine drops documents that only appear in the predictions (the
    // shared-task convention); surface them so the omission is visible.
    for document_id in predicted.document_ids() {
        if !reference.contains(document_id) {
            log::warn!(
                "document '{}' appears only in the predictions; its annotations are not scored",
                document_id
            );
        }
    }

    let report = score(&reference, &predicted);

    match &cli.output {
        Some(path) => {
            if cli.json {
                report.write_json(path)?;
            } else {
                report.write(path, cli.verbose)?;
            }
            println!("Written {} scores to {}", task.name(), path.display());
        }
        None => {
            if cli.json {
                println!("{}", report.to_json()?);
            } else {
                print!("{}", report.render(cli.verbose));
            }
        }
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

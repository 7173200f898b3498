//! TSV record-set loading.
//!
//! Turns a flat table of annotation rows into a [`DocumentGroups`], the
//! per-document shape the scorer consumes. This is a boundary adapter: the
//! columns and the prediction deduplication rule are fixed by the shared-task
//! submission format, everything downstream treats the result as opaque
//! structured input.
//!
//! Rows must carry the columns of the selected [`Task`]
//! (`filename, start_span, end_span, text, label[, code]`); extra columns are
//! ignored and column order is free. Malformed rows abort the load — a
//! scoring run over partially read data would be silently wrong.

use crate::annotation::{Annotation, DocumentGroups, Task};
use crate::{Error, Result};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Loads reference and prediction record sets from TSV files.
///
/// # Example
///
/// ```rust
/// use medeval::{RecordSetLoader, Task};
///
/// let tsv = "filename\tlabel\tstart_span\tend_span\ttext\n\
///            doc1\tSINTOMA\t10\t15\tdolor\n";
/// let loader = RecordSetLoader::new(Task::Ner);
/// let groups = loader.parse_reference(tsv).unwrap();
/// assert_eq!(groups.annotation_count(), 1);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RecordSetLoader {
    task: Task,
}

impl RecordSetLoader {
    /// Create a loader for the given task shape.
    #[must_use]
    pub fn new(task: Task) -> Self {
        Self { task }
    }

    /// Task this loader reads.
    #[must_use]
    pub fn task(&self) -> Task {
        self.task
    }

    /// Load a reference (gold standard) record set from a file.
    pub fn load_reference(&self, path: impl AsRef<Path>) -> Result<DocumentGroups> {
        let content = read_file(path.as_ref())?;
        self.parse_reference(&content)
    }

    /// Load a prediction record set from a file.
    ///
    /// Predictions are deduplicated on `(filename, label, start_span,
    /// end_span)`, first row wins, per the submission contract.
    pub fn load_predictions(&self, path: impl AsRef<Path>) -> Result<DocumentGroups> {
        let content = read_file(path.as_ref())?;
        self.parse_predictions(&content)
    }

    /// Parse a reference record set from TSV content.
    pub fn parse_reference(&self, content: &str) -> Result<DocumentGroups> {
        self.parse(content, false)
    }

    /// Parse a prediction record set from TSV content, deduplicating.
    pub fn parse_predictions(&self, content: &str) -> Result<DocumentGroups> {
        self.parse(content, true)
    }

    fn parse(&self, content: &str, dedup: bool) -> Result<DocumentGroups> {
        let mut lines = content.lines().enumerate();

        let header = match lines.next() {
            Some((_, line)) => line,
            None => return Err(Error::invalid_record("empty record set: no header row")),
        };
        let columns = ColumnIndex::from_header(header, self.task)?;

        let mut groups = DocumentGroups::new();
        let mut seen: HashSet<(String, String, usize, usize)> = HashSet::new();

        for (line_no, line) in lines {
            if line.is_empty() {
                continue;
            }
            let annotation = columns.parse_row(line, line_no + 1)?;

            if dedup {
                let key = {
                    let (doc, label, start, end) = annotation.dedup_key();
                    (doc.to_string(), label.to_string(), start, end)
                };
                if !seen.insert(key) {
                    log::debug!(
                        "line {}: duplicate prediction for ({}, {}, {}, {}), keeping first",
                        line_no + 1,
                        annotation.document_id,
                        annotation.label,
                        annotation.start,
                        annotation.end
                    );
                    continue;
                }
            }

            groups.push(annotation);
        }

        Ok(groups)
    }
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {}", path.display(), e),
        ))
    })
}

/// Positions of the required columns within a header row.
#[derive(Debug)]
struct ColumnIndex {
    filename: usize,
    start_span: usize,
    end_span: usize,
    text: usize,
    label: usize,
    code: Option<usize>,
}

impl ColumnIndex {
    fn from_header(header: &str, task: Task) -> Result<Self> {
        let names: Vec<&str> = header.split('\t').map(str::trim).collect();
        let find = |name: &str| -> Result<usize> {
            names.iter().position(|n| *n == name).ok_or_else(|| {
                Error::invalid_record(format!("missing required column '{}'", name))
            })
        };

        Ok(Self {
            filename: find("filename")?,
            start_span: find("start_span")?,
            end_span: find("end_span")?,
            text: find("text")?,
            label: find("label")?,
            code: if task.has_code() {
                Some(find("code")?)
            } else {
                None
            },
        })
    }

    fn parse_row(&self, line: &str, line_no: usize) -> Result<Annotation> {
        let fields: Vec<&str> = line.split('\t').collect();

        let mut annotation = Annotation::new(
            field(&fields, self.filename, "filename", line_no)?,
            parse_span(&fields, self.start_span, "start_span", line_no)?,
            parse_span(&fields, self.end_span, "end_span", line_no)?,
            field(&fields, self.text, "text", line_no)?,
            field(&fields, self.label, "label", line_no)?,
        );
        if let Some(idx) = self.code {
            annotation = annotation.with_code(field(&fields, idx, "code", line_no)?);
        }
        Ok(annotation)
    }
}

fn field<'a>(fields: &[&'a str], idx: usize, name: &str, line_no: usize) -> Result<&'a str> {
    fields.get(idx).copied().ok_or_else(|| {
        Error::invalid_record(format!("line {}: missing field '{}'", line_no, name))
    })
}

fn parse_span(fields: &[&str], idx: usize, name: &str, line_no: usize) -> Result<usize> {
    let raw = field(fields, idx, name, line_no)?;
    raw.trim().parse().map_err(|_| {
        Error::parse(format!(
            "line {}: {} '{}' is not an integer",
            line_no, name, raw
        ))
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const NER_TSV: &str = "filename\tlabel\tstart_span\tend_span\ttext\n\
                           doc2\tSINTOMA\t7\t12\tfiebre\n\
                           doc1\tSINTOMA\t10\t15\tdolor\n\
                           doc1\tENFERMEDAD\t30\t38\tneumonia\n";

    #[test]
    fn test_load_groups_by_document() {
        let loader = RecordSetLoader::new(Task::Ner);
        let groups = loader.parse_reference(NER_TSV).unwrap();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups.annotation_count(), 3);
        assert_eq!(groups.get("doc1").unwrap().len(), 2);
        assert_eq!(groups.get("doc2").unwrap()[0].text, "fiebre");

        // Document ids come out sorted, rows keep input order within a doc.
        let ids: Vec<&str> = groups.document_ids().collect();
        assert_eq!(ids, vec!["doc1", "doc2"]);
        assert_eq!(groups.get("doc1").unwrap()[0].label, "SINTOMA");
    }

    #[test]
    fn test_column_order_is_free_and_extras_ignored() {
        let tsv = "extra\ttext\tfilename\tend_span\tstart_span\tlabel\n\
                   x\tdolor\tdoc1\t15\t10\tSINTOMA\n";
        let groups = RecordSetLoader::new(Task::Ner)
            .parse_reference(tsv)
            .unwrap();
        let ann = &groups.get("doc1").unwrap()[0];
        assert_eq!(ann.start, 10);
        assert_eq!(ann.end, 15);
        assert_eq!(ann.text, "dolor");
    }

    #[test]
    fn test_predictions_deduplicate_first_wins() {
        let tsv = "filename\tlabel\tstart_span\tend_span\ttext\n\
                   doc1\tSINTOMA\t10\t15\tdolor\n\
                   doc1\tSINTOMA\t10\t15\tdolor\n\
                   doc1\tSINTOMA\t10\t15\tDOLOR\n";
        let loader = RecordSetLoader::new(Task::Ner);

        // Dedup key ignores text, so the later variant row also collapses.
        let preds = loader.parse_predictions(tsv).unwrap();
        assert_eq!(preds.annotation_count(), 1);
        assert_eq!(preds.get("doc1").unwrap()[0].text, "dolor");

        // Reference sets are taken as-is.
        let reference = loader.parse_reference(tsv).unwrap();
        assert_eq!(reference.annotation_count(), 3);
    }

    #[test]
    fn test_linking_requires_code_column() {
        let err = RecordSetLoader::new(Task::Linking)
            .parse_reference(NER_TSV)
            .unwrap_err();
        assert!(err.to_string().contains("code"));

        let tsv = "filename\tlabel\tstart_span\tend_span\ttext\tcode\n\
                   doc1\tSINTOMA\t10\t15\tdolor\t22253000\n";
        let groups = RecordSetLoader::new(Task::Linking)
            .parse_reference(tsv)
            .unwrap();
        assert_eq!(
            groups.get("doc1").unwrap()[0].code.as_deref(),
            Some("22253000")
        );
    }

    #[test]
    fn test_ner_ignores_code_column() {
        let tsv = "filename\tlabel\tstart_span\tend_span\ttext\tcode\n\
                   doc1\tSINTOMA\t10\t15\tdolor\t22253000\n";
        let groups = RecordSetLoader::new(Task::Ner)
            .parse_reference(tsv)
            .unwrap();
        assert_eq!(groups.get("doc1").unwrap()[0].code, None);
    }

    #[test]
    fn test_malformed_rows_fail_fast() {
        let loader = RecordSetLoader::new(Task::Ner);

        // Non-integer offset.
        let tsv = "filename\tlabel\tstart_span\tend_span\ttext\n\
                   doc1\tSINTOMA\tten\t15\tdolor\n";
        let err = loader.parse_reference(tsv).unwrap_err();
        assert!(matches!(err, Error::Parse(_)), "got: {}", err);
        assert!(err.to_string().contains("line 2"));

        // Short row.
        let tsv = "filename\tlabel\tstart_span\tend_span\ttext\n\
                   doc1\tSINTOMA\t10\n";
        let err = loader.parse_reference(tsv).unwrap_err();
        assert!(matches!(err, Error::InvalidRecord(_)), "got: {}", err);

        // Missing header column.
        let tsv = "filename\tstart_span\tend_span\ttext\ndoc1\t10\t15\tdolor\n";
        let err = loader.parse_reference(tsv).unwrap_err();
        assert!(err.to_string().contains("label"));
    }

    #[test]
    fn test_empty_content() {
        let loader = RecordSetLoader::new(Task::Ner);
        assert!(loader.parse_reference("").is_err());

        // Header only: a valid, empty record set.
        let groups = loader
            .parse_reference("filename\tlabel\tstart_span\tend_span\ttext\n")
            .unwrap();
        assert!(groups.is_empty());
    }
}

//! Dataset loading: `label,text` CSV rows into an ordered, read-only record set.

use std::fs;
use std::iter::Peekable;
use std::path::Path;
use std::str::Chars;

use crate::config::DatasetLayout;
use crate::error::DatasetError;

/// One input row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Ground-truth label, compared against the configured positive label.
    pub label: String,
    /// Free text handed to the evaluator.
    pub text: String,
}

impl Record {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Record {
            label: label.into(),
            text: text.into(),
        }
    }
}

/// The loaded record set. Never mutated after construction, so workers share
/// it by reference without synchronisation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    records: Vec<Record>,
}

impl Dataset {
    pub fn from_records(records: Vec<Record>) -> Self {
        Dataset { records }
    }

    /// Reads and parses a CSV file. An unreadable, malformed or empty file is an error.
    pub fn load(path: &Path, layout: DatasetLayout) -> Result<Self, DatasetError> {
        log::debug!("Loading dataset from {}", path.display());
        let contents = fs::read_to_string(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let dataset = Self::parse(&contents, layout)?;
        if dataset.is_empty() {
            return Err(DatasetError::Empty(path.to_path_buf()));
        }
        log::info!("Loaded {} records from {} ({:?})", dataset.len(), path.display(), layout);
        Ok(dataset)
    }

    /// Parses CSV text. Each row needs at least two fields: label, then text.
    /// Extra columns are ignored.
    pub fn parse(input: &str, layout: DatasetLayout) -> Result<Self, DatasetError> {
        let mut reader = CsvReader::new(input);
        let mut records = Vec::new();
        while let Some(row) = reader.next_row() {
            let (line, mut fields) = row?;
            if fields.len() < 2 {
                return Err(DatasetError::MissingColumns {
                    line,
                    found: fields.len(),
                });
            }
            fields.truncate(2);
            let text = fields.pop().unwrap_or_default();
            let label = fields.pop().unwrap_or_default();
            records.push(Record { label, text });
        }

        let mut dataset = Dataset { records };
        dataset.apply_layout(layout);
        Ok(dataset)
    }

    fn apply_layout(&mut self, layout: DatasetLayout) {
        match layout {
            DatasetLayout::Balanced => {}
            DatasetLayout::Imbalanced => self.records.sort_by_key(|r| r.text.len()),
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<Record> for Dataset {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Dataset::from_records(iter.into_iter().collect())
    }
}

enum FieldEnd {
    Comma,
    Row,
}

/// Minimal RFC 4180 reader: quoted fields may contain commas, newlines and
/// doubled quotes. Blank lines are skipped.
struct CsvReader<'s> {
    chars: Peekable<Chars<'s>>,
    line: usize,
}

impl<'s> CsvReader<'s> {
    fn new(input: &'s str) -> Self {
        CsvReader {
            chars: input.chars().peekable(),
            line: 1,
        }
    }

    /// Returns the next row and the line it starts on.
    fn next_row(&mut self) -> Option<Result<(usize, Vec<String>), DatasetError>> {
        loop {
            match self.chars.peek() {
                Some('\n') => {
                    self.chars.next();
                    self.line += 1;
                }
                Some('\r') => {
                    self.chars.next();
                }
                Some(_) => break,
                None => return None,
            }
        }

        let start = self.line;
        let mut fields = Vec::new();
        loop {
            match self.read_field() {
                Ok((field, FieldEnd::Comma)) => fields.push(field),
                Ok((field, FieldEnd::Row)) => {
                    fields.push(field);
                    return Some(Ok((start, fields)));
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }

    fn read_field(&mut self) -> Result<(String, FieldEnd), DatasetError> {
        if self.chars.peek() == Some(&'"') {
            self.chars.next();
            self.read_quoted()
        } else {
            self.read_unquoted()
        }
    }

    fn read_unquoted(&mut self) -> Result<(String, FieldEnd), DatasetError> {
        let mut field = String::new();
        loop {
            match self.chars.next() {
                None => return Ok((trim_cr(field), FieldEnd::Row)),
                Some(',') => return Ok((field, FieldEnd::Comma)),
                Some('\n') => {
                    self.line += 1;
                    return Ok((trim_cr(field), FieldEnd::Row));
                }
                Some('"') => {
                    return Err(DatasetError::Malformed {
                        line: self.line,
                        reason: "bare quote in unquoted field".to_string(),
                    })
                }
                Some(c) => field.push(c),
            }
        }
    }

    fn read_quoted(&mut self) -> Result<(String, FieldEnd), DatasetError> {
        let opened = self.line;
        let mut field = String::new();
        loop {
            match self.chars.next() {
                None => {
                    return Err(DatasetError::Malformed {
                        line: opened,
                        reason: "unterminated quoted field".to_string(),
                    })
                }
                Some('"') if self.chars.peek() == Some(&'"') => {
                    self.chars.next();
                    field.push('"');
                }
                Some('"') => break,
                Some('\n') => {
                    self.line += 1;
                    field.push('\n');
                }
                Some(c) => field.push(c),
            }
        }

        match self.chars.next() {
            None => Ok((field, FieldEnd::Row)),
            Some(',') => Ok((field, FieldEnd::Comma)),
            Some('\n') => {
                self.line += 1;
                Ok((field, FieldEnd::Row))
            }
            Some('\r') if self.chars.peek() == Some(&'\n') => {
                self.chars.next();
                self.line += 1;
                Ok((field, FieldEnd::Row))
            }
            Some(c) => Err(DatasetError::Malformed {
                line: self.line,
                reason: format!("unexpected {:?} after closing quote", c),
            }),
        }
    }
}

fn trim_cr(mut field: String) -> String {
    if field.ends_with('\r') {
        field.pop();
    }
    field
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn parse(input: &str) -> Vec<Record> {
        Dataset::parse(input, DatasetLayout::Balanced)
            .unwrap()
            .records()
            .to_vec()
    }

    #[test]
    fn test_plain_rows() {
        assert_eq!(
            parse("0,bad day\n4,great day\n"),
            vec![Record::new("0", "bad day"), Record::new("4", "great day")]
        );
    }

    #[test]
    fn test_quoted_fields() {
        let records = parse("0,\"well, \"\"that\"\" was\nawful\"\r\n4,\"ok\"");
        assert_eq!(records[0].text, "well, \"that\" was\nawful");
        assert_eq!(records[1], Record::new("4", "ok"));
    }

    #[test]
    fn test_blank_lines_and_crlf() {
        assert_eq!(
            parse("\r\n0,a\r\n\r\n\n4,b\r\n"),
            vec![Record::new("0", "a"), Record::new("4", "b")]
        );
    }

    #[test]
    fn test_extra_columns_ignored() {
        assert_eq!(parse("0,text,extra,more"), vec![Record::new("0", "text")]);
    }

    #[test]
    fn test_missing_text_column_reports_line() {
        let err = Dataset::parse("0,a\n\n4\n", DatasetLayout::Balanced).unwrap_err();
        assert!(matches!(err, DatasetError::MissingColumns { line: 3, found: 1 }));
    }

    #[test]
    fn test_malformed_quotes() {
        let err = Dataset::parse("0,\"open\n4,b", DatasetLayout::Balanced).unwrap_err();
        assert!(matches!(err, DatasetError::Malformed { line: 1, .. }));
        let err = Dataset::parse("0,a\n4,b\"c", DatasetLayout::Balanced).unwrap_err();
        assert!(matches!(err, DatasetError::Malformed { line: 2, .. }));
        let err = Dataset::parse("0,\"a\"b", DatasetLayout::Balanced).unwrap_err();
        assert!(matches!(err, DatasetError::Malformed { .. }));
    }

    #[test]
    fn test_imbalanced_layout_sorts_stably_by_length() {
        let dataset = Dataset::parse("0,ccc\n1,a\n2,bb\n3,x\n", DatasetLayout::Imbalanced).unwrap();
        let labels: Vec<&str> = dataset.records().iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["1", "3", "2", "0"]);
    }

    #[test]
    fn test_load_errors() {
        let missing = Dataset::load(Path::new("/no/such/dataset.csv"), DatasetLayout::Balanced);
        assert!(matches!(missing, Err(DatasetError::Io { .. })));

        let empty = NamedTempFile::new().unwrap();
        assert!(matches!(
            Dataset::load(empty.path(), DatasetLayout::Balanced),
            Err(DatasetError::Empty(_))
        ));
    }

    #[test]
    fn test_load_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "0,first\n4,second\n").unwrap();
        let dataset = Dataset::load(file.path(), DatasetLayout::Balanced).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.records()[1].text, "second");
    }
}

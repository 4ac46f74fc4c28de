use csv::{ReaderBuilder, StringRecord};
use csvpub_core::{IngestError, RawRecord};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Lazy reader over the rows of a comma-delimited file
///
/// Yields one [`RawRecord`] per row in file order. There is no header row and
/// rows may have any number of fields; shape checks happen downstream. A
/// blank line is a row with a single empty field, so every line of the file
/// is counted. A quoted field may span lines. The file handle lives inside
/// the reader and is closed when the reader is dropped, whether or not
/// iteration finished. The reader is consumed by iteration: open a new one to
/// read the file again.
pub struct RecordReader {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line: u64,
    failed: bool,
}

impl RecordReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, IngestError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(IngestError::MissingInput(path.to_path_buf()));
        }

        let file = File::open(path).map_err(|source| IngestError::Input {
            path: path.to_path_buf(),
            source,
        })?;

        debug!(path = %path.display(), "opened input");
        Ok(Self {
            path: path.to_path_buf(),
            lines: BufReader::new(file).lines(),
            line: 0,
            failed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn fail(&mut self, source: io::Error) -> Option<Result<RawRecord, IngestError>> {
        self.failed = true;
        Some(Err(IngestError::Input {
            path: self.path.clone(),
            source,
        }))
    }
}

impl Iterator for RecordReader {
    type Item = Result<RawRecord, IngestError>;

    fn next(&mut self) -> Option<Self::Item> {
        // a read failure ends the sequence
        if self.failed {
            return None;
        }

        let mut text = match self.lines.next()? {
            Ok(text) => text,
            Err(e) => return self.fail(e),
        };
        self.line += 1;
        let start = self.line;

        // an odd number of quotes leaves a quoted field open
        while text.matches('"').count() % 2 == 1 {
            match self.lines.next() {
                Some(Ok(more)) => {
                    self.line += 1;
                    text.push('\n');
                    text.push_str(&more);
                }
                Some(Err(e)) => return self.fail(e),
                None => break,
            }
        }

        match split_fields(&text) {
            Ok(fields) => Some(Ok(RawRecord::new(start, fields))),
            Err(e) => self.fail(e.into()),
        }
    }
}

/// Split one record's text into its fields
fn split_fields(text: &str) -> Result<Vec<String>, csv::Error> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .buffer_capacity(text.len() + 1)
        .from_reader(text.as_bytes());

    let mut record = StringRecord::new();
    if reader.read_record(&mut record)? {
        Ok(record.iter().map(str::to_owned).collect())
    } else {
        Ok(vec![String::new()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn input(content: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file.flush().unwrap();
        file
    }

    fn fields(records: &[RawRecord]) -> Vec<Vec<String>> {
        records.iter().map(|r| r.fields().to_vec()).collect()
    }

    #[test]
    fn test_rows_in_file_order() {
        let file = input(b"alice,1\nbob,x\ncarol,2\n");
        let records: Vec<RawRecord> = RecordReader::open(file.path())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(
            fields(&records),
            vec![
                vec!["alice".to_string(), "1".to_string()],
                vec!["bob".to_string(), "x".to_string()],
                vec!["carol".to_string(), "2".to_string()],
            ]
        );
        let lines: Vec<u64> = records.iter().map(RawRecord::line).collect();
        assert_eq!(lines, vec![1, 2, 3]);
    }

    #[test]
    fn test_ragged_rows_are_kept() {
        let file = input(b"alice\nbob,1,extra\ncarol,2");
        let records: Vec<RawRecord> = RecordReader::open(file.path())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        let lengths: Vec<usize> = records.iter().map(RawRecord::len).collect();
        assert_eq!(lengths, vec![1, 3, 2]);
    }

    #[test]
    fn test_quoted_fields_and_no_trimming() {
        let file = input(b"\"smith, john\",7\n\"say \"\"hi\"\"\", 8\n");
        let records: Vec<RawRecord> = RecordReader::open(file.path())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(records[0].fields(), ["smith, john", "7"]);
        assert_eq!(records[1].fields(), ["say \"hi\"", " 8"]);
    }

    #[test]
    fn test_blank_lines_are_single_empty_field_rows() {
        let file = input(b"alice,1\n\nbob,x\n\ncarol,2\n");
        let records: Vec<RawRecord> = RecordReader::open(file.path())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(records.len(), 5);
        assert_eq!(records[1].fields(), [""]);
        assert_eq!(records[3].fields(), [""]);
        let lines: Vec<u64> = records.iter().map(RawRecord::line).collect();
        assert_eq!(lines, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_quoted_field_spanning_lines() {
        let file = input(b"\"two\nlines\",1\r\nnext,2\r\n");
        let records: Vec<RawRecord> = RecordReader::open(file.path())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].fields(), ["two\nlines", "1"]);
        assert_eq!(records[1].fields(), ["next", "2"]);
        assert_eq!(records[1].line(), 3);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.csv");
        let err = RecordReader::open(&missing).err().unwrap();
        assert!(matches!(err, IngestError::MissingInput(ref p) if p == &missing));
    }

    #[test]
    fn test_invalid_utf8_ends_iteration() {
        let file = input(b"alice,1\n\xff\xfe,2\ncarol,3\n");
        let mut reader = RecordReader::open(file.path()).unwrap();

        assert!(reader.next().unwrap().is_ok());
        assert!(matches!(reader.next(), Some(Err(IngestError::Input { .. }))));
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_empty_file() {
        let file = input(b"");
        assert_eq!(RecordReader::open(file.path()).unwrap().count(), 0);
    }
}
